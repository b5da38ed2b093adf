// src/models/planning.rs

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::validation::{validate_latitude, validate_longitude},
    models::{assignments::AssignmentView, catalog::Client, routes::RouteDetail},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "plan_kind")]
pub enum PlanKind {
    #[sqlx(rename = "planificado")]
    #[serde(rename = "planificado")]
    Planned,
    // Cliente encontrado em campo, fora da rota do dia
    #[sqlx(rename = "no_planificado")]
    #[serde(rename = "no_planificado")]
    Unplanned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "visit_state")]
pub enum VisitState {
    #[default]
    #[sqlx(rename = "pendiente")]
    #[serde(rename = "pendiente")]
    Pending,
    #[sqlx(rename = "visitado")]
    #[serde(rename = "visitado")]
    Visited,
    #[sqlx(rename = "no_visitado")]
    #[serde(rename = "no_visitado")]
    NotVisited,
    #[sqlx(rename = "cerrado")]
    #[serde(rename = "cerrado")]
    Closed,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Planning {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub route_detail_id: Uuid,
    pub date: NaiveDate,
    pub kind: PlanKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanDetail {
    pub id: Uuid,
    pub planning_id: Uuid,
    #[schema(value_type = Option<f64>)]
    pub latitude: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub longitude: Option<Decimal>,
    pub photo: Option<String>,
    pub photo_hash: Option<String>,
    pub duplicate_photo: bool,
    pub location_valid: Option<bool>,
    pub state: VisitState,
    pub arrived_at: Option<DateTime<Utc>>,
    pub left_at: Option<DateTime<Utc>>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl PlanDetail {
    pub fn visit_in_progress(&self) -> bool {
        self.arrived_at.is_some() && self.left_at.is_none()
    }

    pub fn visit_finished(&self) -> bool {
        self.left_at.is_some()
    }

    pub fn visit_started(&self) -> bool {
        self.arrived_at.is_some()
    }

    pub fn visit_duration(&self) -> Option<Duration> {
        Some(self.left_at? - self.arrived_at?)
    }

    /// Chave do motivo pelo qual a visita não pode começar, se houver.
    pub fn start_blocker(&self) -> Option<&'static str> {
        if self.visit_in_progress() {
            Some("visit.already_in_progress")
        } else if self.visit_finished() {
            Some("visit.already_finished")
        } else if matches!(self.state, VisitState::NotVisited | VisitState::Closed) {
            Some("visit.already_marked")
        } else {
            None
        }
    }
}

/// Acrescenta as observações de fechamento às notas da visita.
pub fn append_closing_notes(notes: &str, closing: Option<&str>) -> String {
    match closing.map(str::trim).filter(|c| !c.is_empty()) {
        Some(closing) => format!("{}\n[Cierre] {}", notes, closing),
        None => notes.to_string(),
    }
}

// ---
// Geração de planos
// ---

/// Uma parada ativa da rota, como entra na geração.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct PlanStop {
    pub route_detail_id: Uuid,
    pub visit_order: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanSlot {
    pub route_detail_id: Uuid,
    pub date: NaiveDate,
    pub visit_order: i32,
}

/// Expande as paradas em um slot por (dia, parada), dia a dia e na ordem de visita.
pub fn expand_plans(stops: &[PlanStop], from: NaiveDate, to: NaiveDate) -> Vec<PlanSlot> {
    let mut ordered = stops.to_vec();
    ordered.sort_by_key(|s| (s.visit_order, s.route_detail_id));

    from.iter_days()
        .take_while(|day| *day <= to)
        .flat_map(|date| {
            ordered.iter().map(move |stop| PlanSlot {
                route_detail_id: stop.route_detail_id,
                date,
                visit_order: stop.visit_order,
            })
        })
        .collect()
}

// ---
// Leituras
// ---

// Plano na listagem de uma atribuição
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanningRow {
    pub id: Uuid,
    pub date: NaiveDate,
    pub kind: PlanKind,
    pub visit_order: i32,
    pub client_name: String,
    pub state: Option<VisitState>,
}

// Item do plano do dia do vendedor
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DayPlanEntry {
    #[sqlx(flatten)]
    pub detail: PlanDetail,
    pub plan_date: NaiveDate,
    pub kind: PlanKind,
    pub visit_order: i32,
    pub client_id: Uuid,
    pub client_name: String,
    pub client_nit: String,
    pub client_address: String,
    #[schema(value_type = Option<f64>)]
    pub client_latitude: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub client_longitude: Option<Decimal>,
    #[sqlx(skip)]
    pub is_unplanned: bool,
    #[sqlx(skip)]
    pub visit_in_progress: bool,
}

impl DayPlanEntry {
    pub fn with_flags(mut self) -> Self {
        self.is_unplanned = self.kind == PlanKind::Unplanned;
        self.visit_in_progress = self.detail.visit_in_progress();
        self
    }
}

/// Plano com o dono e o cliente, para as verificações do trabalho de campo.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VisitContext {
    pub planning_id: Uuid,
    pub date: NaiveDate,
    pub salesperson_id: Uuid,
    pub route_id: Uuid,
    pub client_id: Uuid,
    pub client_latitude: Option<Decimal>,
    pub client_longitude: Option<Decimal>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DayPlan {
    pub date: NaiveDate,
    pub assignment: AssignmentView,
    pub entries: Vec<DayPlanEntry>,
    pub visited: usize,
    pub in_progress: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub assignment_id: Uuid,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub plans_created: u64,
    pub plans_removed: u64,
}

// ---
// Payloads de campo
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartVisitPayload {
    #[validate(custom(function = "validate_latitude"))]
    #[schema(value_type = f64)]
    pub latitude: Decimal,

    #[validate(custom(function = "validate_longitude"))]
    #[schema(value_type = f64)]
    pub longitude: Decimal,

    /// Foto da visita em base64
    pub photo: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinishVisitPayload {
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
pub enum NotVisitedReason {
    #[serde(rename = "no_visitado")]
    NotVisited,
    #[serde(rename = "cerrado")]
    Closed,
}

impl From<NotVisitedReason> for VisitState {
    fn from(reason: NotVisitedReason) -> Self {
        match reason {
            NotVisitedReason::NotVisited => VisitState::NotVisited,
            NotVisitedReason::Closed => VisitState::Closed,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotVisitedPayload {
    pub reason: NotVisitedReason,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateForDatePayload {
    pub date: NaiveDate,
}

// Cliente cadastrado em campo: já entra na rota e no plano do dia
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewClientVisit {
    pub client: Client,
    pub stop: RouteDetail,
    pub planning_created: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn stop(order: i32) -> PlanStop {
        PlanStop { route_detail_id: Uuid::new_v4(), visit_order: order }
    }

    #[test]
    fn one_slot_per_stop_and_day_in_visit_order() {
        let a = stop(1);
        let b = stop(2);
        let slots = expand_plans(&[b, a], day("2025-03-10"), day("2025-03-10"));
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].route_detail_id, a.route_detail_id);
        assert_eq!(slots[1].route_detail_id, b.route_detail_id);
        assert!(slots.iter().all(|s| s.date == day("2025-03-10")));
    }

    #[test]
    fn expands_every_day_of_the_window() {
        let slots = expand_plans(&[stop(1), stop(2), stop(3)], day("2025-02-27"), day("2025-03-02"));
        assert_eq!(slots.len(), 12);
        assert_eq!(slots.first().map(|s| s.date), Some(day("2025-02-27")));
        assert_eq!(slots.last().map(|s| s.date), Some(day("2025-03-02")));
        let orders: Vec<i32> = slots.iter().take(3).map(|s| s.visit_order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[test]
    fn empty_inputs_produce_no_slots() {
        assert!(expand_plans(&[], day("2025-03-01"), day("2025-03-31")).is_empty());
        assert!(expand_plans(&[stop(1)], day("2025-03-02"), day("2025-03-01")).is_empty());
    }

    #[test]
    fn visit_lifecycle_flags() {
        let mut detail = PlanDetail::default();
        assert_eq!(detail.start_blocker(), None);

        detail.arrived_at = Some(Utc::now() - Duration::minutes(25));
        detail.state = VisitState::Visited;
        assert!(detail.visit_in_progress());
        assert_eq!(detail.start_blocker(), Some("visit.already_in_progress"));
        assert_eq!(detail.visit_duration(), None);

        detail.left_at = detail.arrived_at.map(|t| t + Duration::minutes(25));
        assert!(detail.visit_finished());
        assert_eq!(detail.visit_duration(), Some(Duration::minutes(25)));
        assert_eq!(detail.start_blocker(), Some("visit.already_finished"));

        let closed = PlanDetail { state: VisitState::Closed, ..PlanDetail::default() };
        assert_eq!(closed.start_blocker(), Some("visit.already_marked"));
    }

    #[test]
    fn closing_notes_are_appended() {
        assert_eq!(append_closing_notes("Llegada", Some("Pedido listo")), "Llegada\n[Cierre] Pedido listo");
        assert_eq!(append_closing_notes("Llegada", Some("  ")), "Llegada");
        assert_eq!(append_closing_notes("", None), "");
    }

    #[test]
    fn not_visited_reasons_map_to_states() {
        let reason: NotVisitedReason = serde_json::from_str("\"cerrado\"").unwrap();
        assert_eq!(VisitState::from(reason), VisitState::Closed);
        assert!(serde_json::from_str::<NotVisitedReason>("\"visitado\"").is_err());
    }
}
