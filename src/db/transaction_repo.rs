// src/db/transaction_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::PageWindow},
    models::transactions::{
        Order, OrderStatus, PricedLine, Sale, SaleStatus, TransactionKind, TransactionLine,
    },
};

// Cabeçalho + cliente + vendedor (vendedor vem da atribuição do plano)
const SALE_SELECT: &str = r#"
    SELECT t.id, t.plan_detail_id, t.client_id, c.name AS client_name, c.nit AS client_nit,
           a.salesperson_id,
           COALESCE(NULLIF(TRIM(u.first_name || ' ' || u.last_name), ''), u.username) AS salesperson_name,
           t.created_at, t.total, t.status, t.notes, t.truck_load_id
    FROM sales t
"#;

const ORDER_SELECT: &str = r#"
    SELECT t.id, t.plan_detail_id, t.client_id, c.name AS client_name, c.nit AS client_nit,
           a.salesperson_id,
           COALESCE(NULLIF(TRIM(u.first_name || ' ' || u.last_name), ''), u.username) AS salesperson_name,
           t.created_at, t.estimated_delivery, t.total, t.status, t.notes
    FROM orders t
"#;

const JOINS: &str = r#"
    JOIN clients c ON c.id = t.client_id
    JOIN plan_details d ON d.id = t.plan_detail_id
    JOIN plannings p ON p.id = d.planning_id
    JOIN assignments a ON a.id = p.assignment_id
    JOIN users u ON u.id = a.salesperson_id
"#;

const LIST_FILTER: &str = r#"
    WHERE ($1::date IS NULL OR t.created_at::date >= $1)
      AND ($2::date IS NULL OR t.created_at::date <= $2)
      AND ($3::text IS NULL OR t.status::text = $3)
      AND ($4::uuid IS NULL OR t.client_id = $4)
      AND ($5::uuid IS NULL OR a.salesperson_id = $5)
"#;

pub struct TransactionListFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<String>,
    pub client_id: Option<Uuid>,
    pub salesperson_id: Option<Uuid>,
}

fn tables(kind: TransactionKind) -> (&'static str, &'static str, &'static str) {
    match kind {
        TransactionKind::Sale => ("sales", "sale_lines", "sale_id"),
        TransactionKind::Order => ("orders", "order_lines", "order_id"),
    }
}

#[derive(Clone)]
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Escrita (sempre dentro da transação do serviço)
    // ---

    pub async fn insert_sale<'e, E>(
        &self,
        executor: E,
        plan_detail_id: Uuid,
        client_id: Uuid,
        truck_load_id: Uuid,
        total: Decimal,
        notes: &str,
    ) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO sales (plan_detail_id, client_id, truck_load_id, total, status, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(plan_detail_id)
        .bind(client_id)
        .bind(truck_load_id)
        .bind(total)
        .bind(SaleStatus::Completed)
        .bind(notes)
        .fetch_one(executor)
        .await?;
        Ok(id)
    }

    pub async fn insert_order<'e, E>(
        &self,
        executor: E,
        plan_detail_id: Uuid,
        client_id: Uuid,
        estimated_delivery: Option<NaiveDate>,
        total: Decimal,
        notes: &str,
    ) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO orders (plan_detail_id, client_id, estimated_delivery, total, status, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(plan_detail_id)
        .bind(client_id)
        .bind(estimated_delivery)
        .bind(total)
        .bind(OrderStatus::Pending)
        .bind(notes)
        .fetch_one(executor)
        .await?;
        Ok(id)
    }

    pub async fn insert_line<'e, E>(
        &self,
        executor: E,
        kind: TransactionKind,
        parent_id: Uuid,
        line: &PricedLine,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (_, lines_table, parent_column) = tables(kind);
        sqlx::query(&format!(
            "INSERT INTO {} ({}, product_id, quantity, unit_price, subtotal) VALUES ($1, $2, $3, $4, $5)",
            lines_table, parent_column
        ))
        .bind(parent_id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.subtotal)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---
    // Leitura
    // ---

    pub async fn find_sale(&self, id: Uuid) -> Result<Option<Sale>, AppError> {
        let sale = sqlx::query_as::<_, Sale>(&format!("{} {} WHERE t.id = $1", SALE_SELECT, JOINS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sale)
    }

    pub async fn find_order(&self, id: Uuid) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<_, Order>(&format!("{} {} WHERE t.id = $1", ORDER_SELECT, JOINS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    pub async fn lines(&self, kind: TransactionKind, parent_id: Uuid) -> Result<Vec<TransactionLine>, AppError> {
        let (_, lines_table, parent_column) = tables(kind);
        let lines = sqlx::query_as::<_, TransactionLine>(&format!(
            r#"
            SELECT l.id, l.product_id, pr.name AS product_name, l.quantity, l.unit_price, l.subtotal
            FROM {} l
            JOIN products pr ON pr.id = l.product_id
            WHERE l.{} = $1
            ORDER BY pr.name, l.id
            "#,
            lines_table, parent_column
        ))
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lines)
    }

    pub async fn count(&self, kind: TransactionKind, filter: &TransactionListFilter) -> Result<i64, AppError> {
        let (table, _, _) = tables(kind);
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {} t {} {}", table, JOINS, LIST_FILTER))
            .bind(filter.from)
            .bind(filter.to)
            .bind(filter.status.as_deref())
            .bind(filter.client_id)
            .bind(filter.salesperson_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    pub async fn list_sales(&self, filter: &TransactionListFilter, window: PageWindow) -> Result<Vec<Sale>, AppError> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "{} {} {} ORDER BY t.created_at DESC, t.id LIMIT $6 OFFSET $7",
            SALE_SELECT, JOINS, LIST_FILTER
        ))
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.status.as_deref())
        .bind(filter.client_id)
        .bind(filter.salesperson_id)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(sales)
    }

    pub async fn list_orders(&self, filter: &TransactionListFilter, window: PageWindow) -> Result<Vec<Order>, AppError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "{} {} {} ORDER BY t.created_at DESC, t.id LIMIT $6 OFFSET $7",
            ORDER_SELECT, JOINS, LIST_FILTER
        ))
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.status.as_deref())
        .bind(filter.client_id)
        .bind(filter.salesperson_id)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }
}
