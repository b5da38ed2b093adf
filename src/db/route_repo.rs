// src/db/route_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::PageWindow},
    models::{
        planning::PlanStop,
        routes::{Route, RouteDetail, RouteStop, RouteSummary},
    },
};

#[derive(Clone)]
pub struct RouteRepository {
    pool: PgPool,
}

impl RouteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Route>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let route = sqlx::query_as::<_, Route>("SELECT * FROM routes WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(route)
    }

    pub async fn count(&self, include_inactive: bool) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM routes WHERE $1 OR active")
            .bind(include_inactive)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    pub async fn list(&self, include_inactive: bool, window: PageWindow) -> Result<Vec<RouteSummary>, AppError> {
        let routes = sqlx::query_as::<_, RouteSummary>(
            r#"
            SELECT r.id, r.name, r.description, r.active, r.created_at,
                   COUNT(rd.id) FILTER (WHERE rd.active) AS stop_count
            FROM routes r
            LEFT JOIN route_details rd ON rd.route_id = r.id
            WHERE $1 OR r.active
            GROUP BY r.id
            ORDER BY r.name, r.id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(include_inactive)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(routes)
    }

    pub async fn create(&self, name: &str, description: &str) -> Result<Route, AppError> {
        let route = sqlx::query_as::<_, Route>(
            "INSERT INTO routes (name, description) VALUES ($1, $2) RETURNING *",
        )
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(route)
    }

    pub async fn update(&self, id: Uuid, name: &str, description: &str) -> Result<Option<Route>, AppError> {
        let route = sqlx::query_as::<_, Route>(
            "UPDATE routes SET name = $2, description = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .fetch_optional(&self.pool)
        .await?;
        Ok(route)
    }

    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<Route>, AppError> {
        let route = sqlx::query_as::<_, Route>("UPDATE routes SET active = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(active)
            .fetch_optional(&self.pool)
            .await?;
        Ok(route)
    }

    // ---
    // Paradas (route_details)
    // ---

    pub async fn stops(&self, route_id: Uuid) -> Result<Vec<RouteStop>, AppError> {
        let stops = sqlx::query_as::<_, RouteStop>(
            r#"
            SELECT rd.id, rd.client_id, rd.visit_order, rd.active,
                   c.name AS client_name, c.nit AS client_nit, c.address AS client_address,
                   c.latitude AS client_latitude, c.longitude AS client_longitude
            FROM route_details rd
            JOIN clients c ON c.id = rd.client_id
            WHERE rd.route_id = $1
            ORDER BY rd.visit_order, rd.id
            "#,
        )
        .bind(route_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(stops)
    }

    /// Paradas ativas que entram na geração de planos.
    pub async fn plan_stops<'e, E>(&self, executor: E, route_id: Uuid) -> Result<Vec<PlanStop>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let stops = sqlx::query_as::<_, PlanStop>(
            r#"
            SELECT id AS route_detail_id, visit_order
            FROM route_details
            WHERE route_id = $1 AND active
            ORDER BY visit_order, id
            "#,
        )
        .bind(route_id)
        .fetch_all(executor)
        .await?;
        Ok(stops)
    }

    pub async fn max_order<'e, E>(&self, executor: E, route_id: Uuid) -> Result<Option<i32>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let max: Option<i32> = sqlx::query_scalar("SELECT MAX(visit_order) FROM route_details WHERE route_id = $1")
            .bind(route_id)
            .fetch_one(executor)
            .await?;
        Ok(max)
    }

    pub async fn add_stop<'e, E>(
        &self,
        executor: E,
        route_id: Uuid,
        client_id: Uuid,
        visit_order: i32,
    ) -> Result<Option<RouteDetail>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Parada desativada volta a valer; parada ativa repetida não devolve linha
        let detail = sqlx::query_as::<_, RouteDetail>(
            r#"
            INSERT INTO route_details (route_id, client_id, visit_order)
            VALUES ($1, $2, $3)
            ON CONFLICT ON CONSTRAINT route_details_route_client_key DO UPDATE
                SET active = TRUE, visit_order = EXCLUDED.visit_order, assigned_at = NOW()
                WHERE route_details.active = FALSE
            RETURNING *
            "#,
        )
        .bind(route_id)
        .bind(client_id)
        .bind(visit_order)
        .fetch_optional(executor)
        .await?;
        Ok(detail)
    }

    /// Tira o cliente da rota. Com planos já gerados a parada só é desativada,
    /// para não perder o histórico de visitas.
    pub async fn remove_stop<'e, E>(&self, executor: E, route_id: Uuid, detail_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let touched: Vec<Uuid> = sqlx::query_scalar(
            r#"
            WITH used AS (SELECT 1 FROM plannings WHERE route_detail_id = $2 LIMIT 1),
            deactivated AS (
                UPDATE route_details SET active = FALSE
                WHERE id = $2 AND route_id = $1 AND EXISTS (SELECT 1 FROM used)
                RETURNING id
            ),
            deleted AS (
                DELETE FROM route_details
                WHERE id = $2 AND route_id = $1 AND NOT EXISTS (SELECT 1 FROM used)
                RETURNING id
            )
            SELECT id FROM deactivated UNION ALL SELECT id FROM deleted
            "#,
        )
        .bind(route_id)
        .bind(detail_id)
        .fetch_all(executor)
        .await?;
        Ok(!touched.is_empty())
    }

    pub async fn detail_ids<'e, E>(&self, executor: E, route_id: Uuid) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM route_details WHERE route_id = $1 AND active ORDER BY visit_order, id",
        )
        .bind(route_id)
        .fetch_all(executor)
        .await?;
        Ok(ids)
    }

    pub async fn set_order<'e, E>(&self, executor: E, detail_id: Uuid, visit_order: i32) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE route_details SET visit_order = $2 WHERE id = $1")
            .bind(detail_id)
            .bind(visit_order)
            .execute(executor)
            .await?;
        Ok(())
    }
}
