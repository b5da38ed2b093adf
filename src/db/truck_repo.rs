// src/db/truck_repo.rs

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::PageWindow},
    models::trucks::{
        DaySummary, LoadLine, Reconciliation, ReconciliationLine, ReconciliationStatus, Truck, TruckLoad, TruckRoute,
    },
};

const TRUCK_FILTER: &str = r#"
    WHERE ($1::text IS NULL OR plate ILIKE '%' || $1 || '%' OR brand ILIKE '%' || $1 || '%'
           OR model ILIKE '%' || $1 || '%')
      AND ($2 OR active)
"#;

const TRUCK_ROUTE_SELECT: &str = r#"
    SELECT tr.id, tr.truck_id, tr.route_id, r.name AS route_name, tr.start_date, tr.end_date,
           tr.active, tr.notes, tr.created_at
    FROM truck_routes tr
    JOIN routes r ON r.id = tr.route_id
"#;

const LOAD_SELECT: &str = r#"
    SELECT l.id, l.truck_id, t.plate AS truck_plate, l.truck_route_id, tr.route_id, r.name AS route_name,
           l.date, l.notes, l.closed, l.created_at
    FROM truck_loads l
    JOIN trucks t ON t.id = l.truck_id
    JOIN truck_routes tr ON tr.id = l.truck_route_id
    JOIN routes r ON r.id = tr.route_id
"#;

const LOAD_FILTER: &str = r#"
    WHERE ($1::uuid IS NULL OR l.truck_id = $1)
      AND ($2::date IS NULL OR l.date = $2)
"#;

const RECONCILIATION_SELECT: &str = r#"
    SELECT c.id, c.load_id, t.plate AS truck_plate, tr.route_id, r.name AS route_name, l.date,
           c.status, c.notes, c.created_at
    FROM reconciliations c
    JOIN truck_loads l ON l.id = c.load_id
    JOIN trucks t ON t.id = l.truck_id
    JOIN truck_routes tr ON tr.id = l.truck_route_id
    JOIN routes r ON r.id = tr.route_id
"#;

/// Carga do camião no dia e o estoque atual dos produtos pedidos.
pub struct LoadStock {
    pub load_id: Uuid,
    pub stock: HashMap<Uuid, Decimal>,
}

#[derive(Clone)]
pub struct TruckRepository {
    pool: PgPool,
}

impl TruckRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Camiões
    // ---

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Truck>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let truck = sqlx::query_as::<_, Truck>("SELECT * FROM trucks WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(truck)
    }

    pub async fn count(&self, search: Option<&str>, include_inactive: bool) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM trucks {}", TRUCK_FILTER))
            .bind(search)
            .bind(include_inactive)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    pub async fn list(&self, search: Option<&str>, include_inactive: bool, window: PageWindow) -> Result<Vec<Truck>, AppError> {
        let trucks = sqlx::query_as::<_, Truck>(&format!(
            "SELECT * FROM trucks {} ORDER BY plate, id LIMIT $3 OFFSET $4",
            TRUCK_FILTER
        ))
        .bind(search)
        .bind(include_inactive)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(trucks)
    }

    pub async fn create(
        &self,
        plate: &str,
        brand: &str,
        model: &str,
        year: Option<i32>,
        capacity_kg: Option<Decimal>,
    ) -> Result<Truck, AppError> {
        let truck = sqlx::query_as::<_, Truck>(
            r#"
            INSERT INTO trucks (plate, brand, model, year, capacity_kg)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(plate)
        .bind(brand)
        .bind(model)
        .bind(year)
        .bind(capacity_kg)
        .fetch_one(&self.pool)
        .await?;
        Ok(truck)
    }

    pub async fn update(
        &self,
        id: Uuid,
        plate: &str,
        brand: &str,
        model: &str,
        year: Option<i32>,
        capacity_kg: Option<Decimal>,
    ) -> Result<Option<Truck>, AppError> {
        let truck = sqlx::query_as::<_, Truck>(
            r#"
            UPDATE trucks SET plate = $2, brand = $3, model = $4, year = $5, capacity_kg = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(plate)
        .bind(brand)
        .bind(model)
        .bind(year)
        .bind(capacity_kg)
        .fetch_optional(&self.pool)
        .await?;
        Ok(truck)
    }

    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<Truck>, AppError> {
        let truck = sqlx::query_as::<_, Truck>("UPDATE trucks SET active = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(active)
            .fetch_optional(&self.pool)
            .await?;
        Ok(truck)
    }

    // ---
    // Camião -> rota
    // ---

    pub async fn truck_routes(&self, truck_id: Uuid) -> Result<Vec<TruckRoute>, AppError> {
        let routes = sqlx::query_as::<_, TruckRoute>(&format!(
            "{} WHERE tr.truck_id = $1 ORDER BY tr.start_date DESC, tr.created_at DESC LIMIT 10",
            TRUCK_ROUTE_SELECT
        ))
        .bind(truck_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(routes)
    }

    pub async fn find_truck_route<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<TruckRoute>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let route = sqlx::query_as::<_, TruckRoute>(&format!("{} WHERE tr.id = $1", TRUCK_ROUTE_SELECT))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(route)
    }

    /// Atribuição aberta (ativa e sem data de fim) do camião na rota.
    pub async fn open_truck_route<'e, E>(&self, executor: E, truck_id: Uuid, route_id: Uuid) -> Result<Option<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar(
            r#"
            SELECT id FROM truck_routes
            WHERE truck_id = $1 AND route_id = $2 AND active AND end_date IS NULL
            ORDER BY start_date DESC
            LIMIT 1
            "#,
        )
        .bind(truck_id)
        .bind(route_id)
        .fetch_optional(executor)
        .await?;
        Ok(id)
    }

    pub async fn insert_truck_route<'e, E>(
        &self,
        executor: E,
        truck_id: Uuid,
        route_id: Uuid,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        notes: &str,
    ) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar(
            r#"
            INSERT INTO truck_routes (truck_id, route_id, start_date, end_date, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(truck_id)
        .bind(route_id)
        .bind(start_date)
        .bind(end_date)
        .bind(notes)
        .fetch_one(executor)
        .await?;
        Ok(id)
    }

    /// Camião que atende a rota na data (a atribuição mais recente vigente).
    pub async fn truck_for_route<'e, E>(&self, executor: E, route_id: Uuid, date: NaiveDate) -> Result<Option<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let truck_id = sqlx::query_scalar(
            r#"
            SELECT truck_id FROM truck_routes
            WHERE route_id = $1 AND active AND start_date <= $2
              AND (end_date IS NULL OR end_date >= $2)
            ORDER BY start_date DESC, created_at DESC
            LIMIT 1
            "#,
        )
        .bind(route_id)
        .bind(date)
        .fetch_optional(executor)
        .await?;
        Ok(truck_id)
    }

    // ---
    // Cargas
    // ---

    pub async fn count_loads(&self, truck_id: Option<Uuid>, date: Option<NaiveDate>) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM truck_loads l {}", LOAD_FILTER))
            .bind(truck_id)
            .bind(date)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    pub async fn list_loads(
        &self,
        truck_id: Option<Uuid>,
        date: Option<NaiveDate>,
        window: PageWindow,
    ) -> Result<Vec<TruckLoad>, AppError> {
        let loads = sqlx::query_as::<_, TruckLoad>(&format!(
            "{} {} ORDER BY l.date DESC, l.created_at DESC LIMIT $3 OFFSET $4",
            LOAD_SELECT, LOAD_FILTER
        ))
        .bind(truck_id)
        .bind(date)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(loads)
    }

    pub async fn find_load<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<TruckLoad>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let load = sqlx::query_as::<_, TruckLoad>(&format!("{} WHERE l.id = $1", LOAD_SELECT))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(load)
    }

    /// Trava a carga e devolve se já está fechada.
    pub async fn lock_load<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<bool>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let closed = sqlx::query_scalar("SELECT closed FROM truck_loads WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(closed)
    }

    pub async fn insert_load<'e, E>(
        &self,
        executor: E,
        truck_id: Uuid,
        truck_route_id: Uuid,
        date: NaiveDate,
        notes: &str,
    ) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar(
            r#"
            INSERT INTO truck_loads (truck_id, truck_route_id, date, notes)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(truck_id)
        .bind(truck_route_id)
        .bind(date)
        .bind(notes)
        .fetch_one(executor)
        .await?;
        Ok(id)
    }

    pub async fn recent_loads(&self, truck_id: Uuid) -> Result<Vec<TruckLoad>, AppError> {
        let loads = sqlx::query_as::<_, TruckLoad>(&format!(
            "{} WHERE l.truck_id = $1 ORDER BY l.date DESC LIMIT 10",
            LOAD_SELECT
        ))
        .bind(truck_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(loads)
    }

    pub async fn load_lines<'e, E>(&self, executor: E, load_id: Uuid) -> Result<Vec<LoadLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lines = sqlx::query_as::<_, LoadLine>(
            r#"
            SELECT ll.id, ll.product_id, p.name AS product_name, ll.loaded_qty, ll.current_qty,
                   p.sale_price AS unit_price
            FROM truck_load_lines ll
            JOIN products p ON p.id = ll.product_id
            WHERE ll.load_id = $1
            ORDER BY p.name, ll.id
            "#,
        )
        .bind(load_id)
        .fetch_all(executor)
        .await?;
        Ok(lines)
    }

    /// Produto repetido na carga devolve `None`.
    pub async fn insert_load_line<'e, E>(
        &self,
        executor: E,
        load_id: Uuid,
        product_id: Uuid,
        quantity: Decimal,
    ) -> Result<Option<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar(
            r#"
            INSERT INTO truck_load_lines (load_id, product_id, loaded_qty, current_qty)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (load_id, product_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(load_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_optional(executor)
        .await?;
        Ok(id)
    }

    pub async fn delete_load_line<'e, E>(&self, executor: E, load_id: Uuid, line_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM truck_load_lines WHERE id = $2 AND load_id = $1")
            .bind(load_id)
            .bind(line_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn close_load<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE truck_loads SET closed = TRUE WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Trava a carga do camião na data (FOR UPDATE) e lê o estoque dos produtos pedidos.
    /// Toda baixa de estoque passa por aqui, então a trava da carga serializa as vendas.
    pub async fn lock_stock<'e, E>(
        &self,
        executor: E,
        truck_id: Uuid,
        date: NaiveDate,
        product_ids: &[Uuid],
    ) -> Result<Option<LoadStock>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows: Vec<(Uuid, Option<Uuid>, Option<Decimal>)> = sqlx::query_as(
            r#"
            SELECT l.id, ll.product_id, ll.current_qty
            FROM truck_loads l
            LEFT JOIN truck_load_lines ll ON ll.load_id = l.id AND ll.product_id = ANY($3)
            WHERE l.truck_id = $1 AND l.date = $2
            FOR UPDATE OF l
            "#,
        )
        .bind(truck_id)
        .bind(date)
        .bind(product_ids)
        .fetch_all(executor)
        .await?;

        let Some((load_id, _, _)) = rows.first().copied() else {
            return Ok(None);
        };
        let stock = rows
            .into_iter()
            .filter_map(|(_, product_id, qty)| Some((product_id?, qty?)))
            .collect();
        Ok(Some(LoadStock { load_id, stock }))
    }

    pub async fn take_stock<'e, E>(&self, executor: E, load_id: Uuid, product_id: Uuid, quantity: Decimal) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE truck_load_lines SET current_qty = current_qty - $3 WHERE load_id = $1 AND product_id = $2",
        )
        .bind(load_id)
        .bind(product_id)
        .bind(quantity)
        .execute(executor)
        .await?;
        Ok(())
    }

    // ---
    // Cuadres
    // ---

    pub async fn count_reconciliations(&self) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reconciliations")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    pub async fn list_reconciliations(&self, window: PageWindow) -> Result<Vec<Reconciliation>, AppError> {
        let items = sqlx::query_as::<_, Reconciliation>(&format!(
            "{} ORDER BY c.created_at DESC, c.id LIMIT $1 OFFSET $2",
            RECONCILIATION_SELECT
        ))
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    pub async fn find_reconciliation<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Reconciliation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, Reconciliation>(&format!("{} WHERE c.id = $1", RECONCILIATION_SELECT))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(item)
    }

    /// Trava o cuadre e devolve o estado atual.
    pub async fn lock_reconciliation<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<ReconciliationStatus>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let status = sqlx::query_scalar("SELECT status FROM reconciliations WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(status)
    }

    /// Já existe cuadre para a carga? Devolve `None`.
    pub async fn insert_reconciliation<'e, E>(&self, executor: E, load_id: Uuid, notes: &str) -> Result<Option<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar(
            r#"
            INSERT INTO reconciliations (load_id, notes)
            VALUES ($1, $2)
            ON CONFLICT (load_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(load_id)
        .bind(notes)
        .fetch_optional(executor)
        .await?;
        Ok(id)
    }

    /// Uma linha por produto carregado; o retorno começa igual ao esperado.
    pub async fn copy_load_lines<'e, E>(&self, executor: E, reconciliation_id: Uuid, load_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO reconciliation_lines
                (reconciliation_id, product_id, loaded_qty, sold_qty, expected_qty, returned_qty, difference)
            SELECT $1, product_id, loaded_qty, loaded_qty - current_qty, current_qty, current_qty, 0
            FROM truck_load_lines
            WHERE load_id = $2
            "#,
        )
        .bind(reconciliation_id)
        .bind(load_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn reconciliation_lines<'e, E>(&self, executor: E, reconciliation_id: Uuid) -> Result<Vec<ReconciliationLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lines = sqlx::query_as::<_, ReconciliationLine>(
            r#"
            SELECT cl.id, cl.product_id, p.name AS product_name, cl.loaded_qty, cl.sold_qty,
                   cl.expected_qty, cl.returned_qty, cl.difference, cl.notes
            FROM reconciliation_lines cl
            JOIN products p ON p.id = cl.product_id
            WHERE cl.reconciliation_id = $1
            ORDER BY p.name, cl.id
            "#,
        )
        .bind(reconciliation_id)
        .fetch_all(executor)
        .await?;
        Ok(lines)
    }

    pub async fn expected_qty<'e, E>(&self, executor: E, reconciliation_id: Uuid, line_id: Uuid) -> Result<Option<Decimal>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let expected = sqlx::query_scalar(
            "SELECT expected_qty FROM reconciliation_lines WHERE id = $2 AND reconciliation_id = $1",
        )
        .bind(reconciliation_id)
        .bind(line_id)
        .fetch_optional(executor)
        .await?;
        Ok(expected)
    }

    pub async fn update_reconciliation_line<'e, E>(
        &self,
        executor: E,
        line_id: Uuid,
        returned_qty: Decimal,
        difference: Decimal,
        notes: &str,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE reconciliation_lines SET returned_qty = $2, difference = $3, notes = $4 WHERE id = $1",
        )
        .bind(line_id)
        .bind(returned_qty)
        .bind(difference)
        .bind(notes)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn set_reconciliation_status<'e, E>(&self, executor: E, id: Uuid, status: ReconciliationStatus) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE reconciliations SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Vendas saídas da carga e pedidos da rota na data da carga.
    pub async fn day_summary(&self, load_id: Uuid, route_id: Uuid, date: NaiveDate) -> Result<DaySummary, AppError> {
        let summary = sqlx::query_as::<_, DaySummary>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM sales s WHERE s.truck_load_id = $1) AS sales_count,
                (SELECT COALESCE(SUM(s.total), 0) FROM sales s WHERE s.truck_load_id = $1) AS sales_total,
                COUNT(o.id) AS orders_count,
                COALESCE(SUM(o.total), 0) AS orders_total
            FROM orders o
            JOIN plan_details d ON d.id = o.plan_detail_id
            JOIN plannings p ON p.id = d.planning_id
            JOIN assignments a ON a.id = p.assignment_id
            WHERE a.route_id = $2 AND p.date = $3
            "#,
        )
        .bind(load_id)
        .bind(route_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;
        Ok(summary)
    }
}
