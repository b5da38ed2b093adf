// src/models/assignments.rs

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::FieldError,
    models::{auth::User, planning::PlanningRow, rbac::Role},
};

/// Horizonte de geração de planos para atribuições sem data final.
pub const OPEN_ENDED_HORIZON_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: Uuid,
    pub route_id: Uuid,
    pub route_name: String,
    pub salesperson_id: Uuid,
    pub salesperson_name: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AssignmentStatus {
    #[serde(rename = "pendiente")]
    Pending,
    #[serde(rename = "activa")]
    Active,
    #[serde(rename = "finalizada")]
    Finished,
}

/// Período de uma atribuição. Sem `end`, vale do início em diante.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

impl Period {
    pub fn new(start: NaiveDate, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn status(&self, today: NaiveDate) -> AssignmentStatus {
        if today < self.start {
            AssignmentStatus::Pending
        } else if self.end.is_some_and(|end| today > end) {
            AssignmentStatus::Finished
        } else {
            AssignmentStatus::Active
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && self.end.is_none_or(|end| day <= end)
    }

    pub fn overlaps(&self, other: &Period) -> bool {
        let starts_before_other_ends = other.end.is_none_or(|end| self.start <= end);
        let ends_after_other_starts = self.end.is_none_or(|end| end >= other.start);
        starts_before_other_ends && ends_after_other_starts
    }

    /// Dias do período, contando os dois extremos.
    pub fn days_assigned(&self) -> Option<i64> {
        self.end.map(|end| (end - self.start).num_days() + 1)
    }

    pub fn days_remaining(&self, today: NaiveDate) -> Option<i64> {
        let end = self.end?;
        if today > end {
            return Some(0);
        }
        let from = today.max(self.start);
        Some((end - from).num_days() + 1)
    }

    pub fn days_elapsed(&self, today: NaiveDate) -> i64 {
        if today < self.start {
            return 0;
        }
        let until = self.end.map_or(today, |end| today.min(end));
        (until - self.start).num_days() + 1
    }

    pub fn progress_percent(&self, today: NaiveDate) -> Option<i64> {
        let total = self.days_assigned()?;
        Some((self.days_elapsed(today) * 100 / total).clamp(0, 100))
    }

    /// Dias a gerar a partir de `from`: até o fim do período ou, sem fim, pelo horizonte.
    /// None quando não resta nenhum dia.
    pub fn generation_window(&self, from: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let from = from.max(self.start);
        let to = self
            .end
            .unwrap_or_else(|| from + Duration::days(OPEN_ENDED_HORIZON_DAYS - 1));
        (from <= to).then_some((from, to))
    }
}

impl Assignment {
    pub fn period(&self) -> Period {
        Period::new(self.start_date, self.end_date)
    }
}

/// Atribuição com os valores derivados do dia corrente.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentView {
    #[serde(flatten)]
    pub assignment: Assignment,
    pub status: AssignmentStatus,
    pub days_assigned: Option<i64>,
    pub days_remaining: Option<i64>,
    pub days_elapsed: i64,
    pub progress_percent: Option<i64>,
}

impl AssignmentView {
    pub fn new(assignment: Assignment, today: NaiveDate) -> Self {
        let period = assignment.period();
        Self {
            status: period.status(today),
            days_assigned: period.days_assigned(),
            days_remaining: period.days_remaining(today),
            days_elapsed: period.days_elapsed(today),
            progress_percent: period.progress_percent(today),
            assignment,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentDetail {
    pub assignment: AssignmentView,
    pub recent_plans: Vec<PlanningRow>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentPayload {
    pub route_id: Uuid,
    pub salesperson_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentFilter {
    pub page: Option<String>,
    pub salesperson_id: Option<Uuid>,
    pub route_id: Option<Uuid>,
    pub status: Option<AssignmentStatus>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedAssignment {
    pub assignment: AssignmentView,
    pub plans_created: u64,
}

/// Regras de criação que não dependem do banco além do vendedor e dos períodos já existentes.
pub fn validate_new_assignment(
    salesperson: &User,
    period: &Period,
    existing: &[Period],
) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    if salesperson.role != Role::Salesperson {
        errors.push(FieldError::new("salespersonId", "assignee_not_salesperson"));
    } else if !salesperson.active {
        errors.push(FieldError::new("salespersonId", "assignee_inactive"));
    }

    if period.end.is_some_and(|end| end < period.start) {
        errors.push(FieldError::new("endDate", "end_before_start"));
    }

    if let Some(clash) = existing.iter().find(|p| p.overlaps(period)) {
        let until = clash.end.map_or_else(|| "…".to_string(), |d| d.to_string());
        errors.push(
            FieldError::new("startDate", "assignment_overlap")
                .with_arg(clash.start.to_string())
                .with_arg(until),
        );
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::sample_user;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn status_follows_the_calendar() {
        let p = Period::new(day("2025-03-10"), Some(day("2025-03-20")));
        assert_eq!(p.status(day("2025-03-09")), AssignmentStatus::Pending);
        assert_eq!(p.status(day("2025-03-10")), AssignmentStatus::Active);
        assert_eq!(p.status(day("2025-03-20")), AssignmentStatus::Active);
        assert_eq!(p.status(day("2025-03-21")), AssignmentStatus::Finished);
        let open = Period::new(day("2025-03-10"), None);
        assert_eq!(open.status(day("2030-01-01")), AssignmentStatus::Active);
    }

    #[test]
    fn day_counters() {
        let p = Period::new(day("2025-03-01"), Some(day("2025-03-10")));
        assert_eq!(p.days_assigned(), Some(10));
        assert_eq!(p.days_elapsed(day("2025-03-05")), 5);
        assert_eq!(p.days_remaining(day("2025-03-05")), Some(6));
        assert_eq!(p.progress_percent(day("2025-03-05")), Some(50));
        assert_eq!(p.days_remaining(day("2025-04-01")), Some(0));
        assert_eq!(p.progress_percent(day("2025-04-01")), Some(100));
        assert_eq!(p.days_elapsed(day("2025-02-01")), 0);
        assert_eq!(p.days_remaining(day("2025-02-01")), Some(10));

        let open = Period::new(day("2025-03-01"), None);
        assert_eq!(open.days_assigned(), None);
        assert_eq!(open.progress_percent(day("2025-03-05")), None);
    }

    #[test]
    fn overlapping_periods() {
        let march = Period::new(day("2025-03-01"), Some(day("2025-03-31")));
        let april = Period::new(day("2025-04-01"), Some(day("2025-04-30")));
        let mid = Period::new(day("2025-03-15"), Some(day("2025-04-15")));
        let open_may = Period::new(day("2025-05-01"), None);
        let open_feb = Period::new(day("2025-02-01"), None);

        assert!(!march.overlaps(&april));
        assert!(march.overlaps(&mid) && mid.overlaps(&april));
        assert!(!april.overlaps(&open_may));
        assert!(open_feb.overlaps(&march) && march.overlaps(&open_feb));
        assert!(open_feb.overlaps(&open_may));
    }

    #[test]
    fn generation_window_uses_horizon_when_open_ended() {
        let open = Period::new(day("2025-03-01"), None);
        assert_eq!(open.generation_window(day("2025-02-20")), Some((day("2025-03-01"), day("2025-03-30"))));

        let closed = Period::new(day("2025-03-01"), Some(day("2025-03-05")));
        assert_eq!(closed.generation_window(day("2025-03-04")), Some((day("2025-03-04"), day("2025-03-05"))));
        assert_eq!(closed.generation_window(day("2025-03-06")), None);
    }

    #[test]
    fn only_active_salespeople_can_be_assigned() {
        let period = Period::new(day("2025-03-01"), None);

        let admin = sample_user(Role::Admin);
        let errors = validate_new_assignment(&admin, &period, &[]).unwrap_err();
        assert_eq!(errors[0].key, "assignee_not_salesperson");

        let mut seller = sample_user(Role::Salesperson);
        assert!(validate_new_assignment(&seller, &period, &[]).is_ok());
        seller.active = false;
        assert_eq!(validate_new_assignment(&seller, &period, &[]).unwrap_err()[0].key, "assignee_inactive");
    }

    #[test]
    fn end_before_start_and_overlap_are_reported() {
        let seller = sample_user(Role::Salesperson);
        let bad = Period::new(day("2025-03-10"), Some(day("2025-03-01")));
        assert_eq!(validate_new_assignment(&seller, &bad, &[]).unwrap_err()[0].key, "end_before_start");

        let existing = [Period::new(day("2025-03-01"), None)];
        let new = Period::new(day("2025-06-01"), Some(day("2025-06-30")));
        let errors = validate_new_assignment(&seller, &new, &existing).unwrap_err();
        assert_eq!(errors[0].key, "assignment_overlap");
        assert_eq!(errors[0].args, vec!["2025-03-01".to_string(), "…".to_string()]);
    }
}
