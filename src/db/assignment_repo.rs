// src/db/assignment_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::PageWindow},
    models::{
        assignments::{Assignment, AssignmentStatus, Period},
        planning::PlanningRow,
    },
};

const ASSIGNMENT_SELECT: &str = r#"
    SELECT a.id, a.route_id, r.name AS route_name,
           a.salesperson_id,
           COALESCE(NULLIF(TRIM(u.first_name || ' ' || u.last_name), ''), u.username) AS salesperson_name,
           a.start_date, a.end_date, a.created_at
    FROM assignments a
    JOIN routes r ON r.id = a.route_id
    JOIN users u ON u.id = a.salesperson_id
"#;

// $4 = hoje; o status é resolvido em SQL para paginar corretamente
const LIST_FILTER: &str = r#"
    WHERE ($1::uuid IS NULL OR a.salesperson_id = $1)
      AND ($2::uuid IS NULL OR a.route_id = $2)
      AND ($3::text IS NULL
           OR ($3 = 'pendiente' AND a.start_date > $4)
           OR ($3 = 'activa' AND a.start_date <= $4 AND (a.end_date IS NULL OR a.end_date >= $4))
           OR ($3 = 'finalizada' AND a.end_date < $4))
"#;

fn status_code(status: Option<AssignmentStatus>) -> Option<&'static str> {
    status.map(|s| match s {
        AssignmentStatus::Pending => "pendiente",
        AssignmentStatus::Active => "activa",
        AssignmentStatus::Finished => "finalizada",
    })
}

pub struct AssignmentListFilter {
    pub salesperson_id: Option<Uuid>,
    pub route_id: Option<Uuid>,
    pub status: Option<AssignmentStatus>,
    pub today: NaiveDate,
}

#[derive(Clone)]
pub struct AssignmentRepository {
    pool: PgPool,
}

impl AssignmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Assignment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let assignment = sqlx::query_as::<_, Assignment>(&format!("{} WHERE a.id = $1", ASSIGNMENT_SELECT))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(assignment)
    }

    pub async fn count(&self, filter: &AssignmentListFilter) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM assignments a {}", LIST_FILTER))
            .bind(filter.salesperson_id)
            .bind(filter.route_id)
            .bind(status_code(filter.status))
            .bind(filter.today)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    pub async fn list(&self, filter: &AssignmentListFilter, window: PageWindow) -> Result<Vec<Assignment>, AppError> {
        let assignments = sqlx::query_as::<_, Assignment>(&format!(
            "{} {} ORDER BY a.start_date DESC, r.name, a.id LIMIT $5 OFFSET $6",
            ASSIGNMENT_SELECT, LIST_FILTER
        ))
        .bind(filter.salesperson_id)
        .bind(filter.route_id)
        .bind(status_code(filter.status))
        .bind(filter.today)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(assignments)
    }

    /// Períodos já atribuídos para a mesma (rota, vendedor).
    pub async fn periods_for<'e, E>(&self, executor: E, route_id: Uuid, salesperson_id: Uuid) -> Result<Vec<Period>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows: Vec<(NaiveDate, Option<NaiveDate>)> = sqlx::query_as(
            "SELECT start_date, end_date FROM assignments WHERE route_id = $1 AND salesperson_id = $2",
        )
        .bind(route_id)
        .bind(salesperson_id)
        .fetch_all(executor)
        .await?;
        Ok(rows.into_iter().map(|(start, end)| Period::new(start, end)).collect())
    }

    /// Atribuição vigente do vendedor no dia (a mais recente, se houver mais de uma rota).
    pub async fn active_for_salesperson(&self, salesperson_id: Uuid, today: NaiveDate) -> Result<Option<Assignment>, AppError> {
        let assignment = sqlx::query_as::<_, Assignment>(&format!(
            r#"{}
            WHERE a.salesperson_id = $1
              AND a.start_date <= $2
              AND (a.end_date IS NULL OR a.end_date >= $2)
            ORDER BY a.start_date DESC, a.id
            LIMIT 1"#,
            ASSIGNMENT_SELECT
        ))
        .bind(salesperson_id)
        .bind(today)
        .fetch_optional(&self.pool)
        .await?;
        Ok(assignment)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        route_id: Uuid,
        salesperson_id: Uuid,
        period: &Period,
    ) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO assignments (route_id, salesperson_id, start_date, end_date)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(route_id)
        .bind(salesperson_id)
        .bind(period.start)
        .bind(period.end)
        .fetch_one(executor)
        .await?;
        Ok(id)
    }

    pub async fn set_end_date<'e, E>(&self, executor: E, id: Uuid, end_date: NaiveDate) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE assignments SET end_date = $2 WHERE id = $1")
            .bind(id)
            .bind(end_date)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn recent_plans(&self, assignment_id: Uuid, limit: i64) -> Result<Vec<PlanningRow>, AppError> {
        let plans = sqlx::query_as::<_, PlanningRow>(
            r#"
            SELECT p.id, p.date, p.kind, rd.visit_order, c.name AS client_name, d.state
            FROM plannings p
            JOIN route_details rd ON rd.id = p.route_detail_id
            JOIN clients c ON c.id = rd.client_id
            LEFT JOIN plan_details d ON d.planning_id = p.id
            WHERE p.assignment_id = $1
            ORDER BY p.date DESC, rd.visit_order, p.id
            LIMIT $2
            "#,
        )
        .bind(assignment_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(plans)
    }
}
