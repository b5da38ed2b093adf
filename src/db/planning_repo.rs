// src/db/planning_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::planning::{DayPlanEntry, PlanDetail, PlanKind, VisitContext, VisitState},
};

const VISIT_CONTEXT_SELECT: &str = r#"
    SELECT p.id AS planning_id, p.date, a.salesperson_id, a.route_id, c.id AS client_id,
           c.latitude AS client_latitude, c.longitude AS client_longitude
    FROM plannings p
    JOIN assignments a ON a.id = p.assignment_id
    JOIN route_details rd ON rd.id = p.route_detail_id
    JOIN clients c ON c.id = rd.client_id
"#;

// Dados capturados na chegada ao cliente
pub struct ArrivalRecord<'a> {
    pub latitude: Decimal,
    pub longitude: Decimal,
    pub photo: Option<&'a str>,
    pub photo_hash: Option<&'a str>,
    pub duplicate_photo: bool,
    pub location_valid: Option<bool>,
}

#[derive(Clone)]
pub struct PlanningRepository {
    pool: PgPool,
}

impl PlanningRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Cria o plano e o seu detalhe pendente. Slot já existente não é duplicado (devolve false).
    pub async fn insert_slot<'e, E>(
        &self,
        executor: E,
        assignment_id: Uuid,
        route_detail_id: Uuid,
        date: NaiveDate,
        kind: PlanKind,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created: Option<Uuid> = sqlx::query_scalar(
            r#"
            WITH new_plan AS (
                INSERT INTO plannings (assignment_id, route_detail_id, date, kind)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT ON CONSTRAINT plannings_slot_key DO NOTHING
                RETURNING id
            )
            INSERT INTO plan_details (planning_id)
            SELECT id FROM new_plan
            RETURNING planning_id
            "#,
        )
        .bind(assignment_id)
        .bind(route_detail_id)
        .bind(date)
        .bind(kind)
        .fetch_optional(executor)
        .await?;
        Ok(created.is_some())
    }

    /// Apaga os planos a partir de `from` cuja visita nunca começou.
    pub async fn delete_unstarted_from<'e, E>(&self, executor: E, assignment_id: Uuid, from: NaiveDate) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            DELETE FROM plannings p
            WHERE p.assignment_id = $1
              AND p.date >= $2
              AND NOT EXISTS (
                  SELECT 1 FROM plan_details d
                  WHERE d.planning_id = p.id
                    AND (d.arrived_at IS NOT NULL OR d.state <> 'pendiente')
              )
            "#,
        )
        .bind(assignment_id)
        .bind(from)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Garante um detalhe para cada plano do dia (planos antigos podem não ter).
    pub async fn ensure_details_for_day(&self, assignment_id: Uuid, date: NaiveDate) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO plan_details (planning_id)
            SELECT p.id FROM plannings p
            WHERE p.assignment_id = $1 AND p.date = $2
            ON CONFLICT (planning_id) DO NOTHING
            "#,
        )
        .bind(assignment_id)
        .bind(date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn day_entries(&self, assignment_id: Uuid, date: NaiveDate) -> Result<Vec<DayPlanEntry>, AppError> {
        let entries = sqlx::query_as::<_, DayPlanEntry>(
            r#"
            SELECT d.*, p.date AS plan_date, p.kind, rd.visit_order,
                   c.id AS client_id, c.name AS client_name, c.nit AS client_nit,
                   c.address AS client_address,
                   c.latitude AS client_latitude, c.longitude AS client_longitude
            FROM plannings p
            JOIN plan_details d ON d.planning_id = p.id
            JOIN route_details rd ON rd.id = p.route_detail_id
            JOIN clients c ON c.id = rd.client_id
            WHERE p.assignment_id = $1 AND p.date = $2
            ORDER BY rd.visit_order, p.id
            "#,
        )
        .bind(assignment_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries.into_iter().map(DayPlanEntry::with_flags).collect())
    }

    pub async fn visit_context<'e, E>(&self, executor: E, planning_id: Uuid) -> Result<Option<VisitContext>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let context = sqlx::query_as::<_, VisitContext>(&format!("{} WHERE p.id = $1", VISIT_CONTEXT_SELECT))
            .bind(planning_id)
            .fetch_optional(executor)
            .await?;
        Ok(context)
    }

    pub async fn visit_context_by_detail<'e, E>(&self, executor: E, detail_id: Uuid) -> Result<Option<VisitContext>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let context = sqlx::query_as::<_, VisitContext>(&format!(
            "{} JOIN plan_details d ON d.planning_id = p.id WHERE d.id = $1",
            VISIT_CONTEXT_SELECT
        ))
        .bind(detail_id)
        .fetch_optional(executor)
        .await?;
        Ok(context)
    }

    /// Detalhe do plano, criado na hora se ainda não existir. Bloqueia a linha até o fim da transação.
    pub async fn lock_detail_for_planning(&self, conn: &mut PgConnection, planning_id: Uuid) -> Result<PlanDetail, AppError> {
        sqlx::query("INSERT INTO plan_details (planning_id) VALUES ($1) ON CONFLICT (planning_id) DO NOTHING")
            .bind(planning_id)
            .execute(&mut *conn)
            .await?;

        let detail = sqlx::query_as::<_, PlanDetail>("SELECT * FROM plan_details WHERE planning_id = $1 FOR UPDATE")
            .bind(planning_id)
            .fetch_one(&mut *conn)
            .await?;
        Ok(detail)
    }

    pub async fn lock_detail<'e, E>(&self, executor: E, detail_id: Uuid) -> Result<Option<PlanDetail>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let detail = sqlx::query_as::<_, PlanDetail>("SELECT * FROM plan_details WHERE id = $1 FOR UPDATE")
            .bind(detail_id)
            .fetch_optional(executor)
            .await?;
        Ok(detail)
    }

    /// Outra visita já usou a mesma foto?
    pub async fn photo_hash_exists<'e, E>(&self, executor: E, hash: &str, except_detail: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM plan_details WHERE photo_hash = $1 AND id <> $2)",
        )
        .bind(hash)
        .bind(except_detail)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    pub async fn record_arrival<'e, E>(&self, executor: E, detail_id: Uuid, arrival: &ArrivalRecord<'_>) -> Result<PlanDetail, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let detail = sqlx::query_as::<_, PlanDetail>(
            r#"
            UPDATE plan_details
            SET latitude = $2, longitude = $3,
                photo = COALESCE($4, photo), photo_hash = COALESCE($5, photo_hash),
                duplicate_photo = $6, location_valid = $7,
                state = 'visitado', arrived_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(detail_id)
        .bind(arrival.latitude)
        .bind(arrival.longitude)
        .bind(arrival.photo)
        .bind(arrival.photo_hash)
        .bind(arrival.duplicate_photo)
        .bind(arrival.location_valid)
        .fetch_one(executor)
        .await?;
        Ok(detail)
    }

    pub async fn record_departure<'e, E>(&self, executor: E, detail_id: Uuid, notes: &str) -> Result<PlanDetail, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let detail = sqlx::query_as::<_, PlanDetail>(
            "UPDATE plan_details SET left_at = NOW(), notes = $2 WHERE id = $1 RETURNING *",
        )
        .bind(detail_id)
        .bind(notes)
        .fetch_one(executor)
        .await?;
        Ok(detail)
    }

    pub async fn set_state<'e, E>(&self, executor: E, detail_id: Uuid, state: VisitState, notes: &str) -> Result<PlanDetail, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let detail = sqlx::query_as::<_, PlanDetail>(
            "UPDATE plan_details SET state = $2, notes = $3 WHERE id = $1 RETURNING *",
        )
        .bind(detail_id)
        .bind(state)
        .bind(notes)
        .fetch_one(executor)
        .await?;
        Ok(detail)
    }
}
