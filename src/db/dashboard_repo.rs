// src/db/dashboard_repo.rs

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::dashboard::{ManagerSummary, SalespersonSummary},
};

#[derive(Clone)]
pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // 1. Resumo geral. Uma única consulta: os números saem do mesmo snapshot
    pub async fn manager_summary(&self, today: NaiveDate) -> Result<ManagerSummary, AppError> {
        let summary = sqlx::query_as::<_, ManagerSummary>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM clients WHERE active) AS active_clients,
                (SELECT COUNT(*) FROM routes WHERE active) AS active_routes,
                (SELECT COUNT(*) FROM assignments
                  WHERE start_date <= $1 AND (end_date IS NULL OR end_date >= $1)) AS active_assignments,
                (SELECT COUNT(*) FROM sales
                  WHERE status <> 'cancelada' AND date_trunc('month', created_at) = date_trunc('month', $1::date)
                ) AS month_sales_count,
                (SELECT COALESCE(SUM(total), 0) FROM sales
                  WHERE status <> 'cancelada' AND date_trunc('month', created_at) = date_trunc('month', $1::date)
                ) AS month_sales_total,
                (SELECT COUNT(*) FROM orders
                  WHERE status <> 'cancelado' AND date_trunc('month', created_at) = date_trunc('month', $1::date)
                ) AS month_orders_count,
                (SELECT COALESCE(SUM(total), 0) FROM orders
                  WHERE status <> 'cancelado' AND date_trunc('month', created_at) = date_trunc('month', $1::date)
                ) AS month_orders_total,
                (SELECT COUNT(*) FROM plan_details WHERE duplicate_photo) AS duplicate_photos,
                (SELECT COUNT(*) FROM plan_details WHERE location_valid = FALSE) AS invalid_locations
            "#,
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await?;
        Ok(summary)
    }

    // 2. Dia do vendedor
    pub async fn salesperson_summary(&self, salesperson_id: Uuid, today: NaiveDate) -> Result<SalespersonSummary, AppError> {
        let summary = sqlx::query_as::<_, SalespersonSummary>(
            r#"
            SELECT
                COUNT(p.id) AS plans_today,
                COUNT(p.id) FILTER (WHERE d.state = 'visitado') AS visited_today,
                COUNT(p.id) FILTER (WHERE d.state IS NULL OR d.state = 'pendiente') AS pending_today
            FROM plannings p
            JOIN assignments a ON a.id = p.assignment_id
            LEFT JOIN plan_details d ON d.planning_id = p.id
            WHERE a.salesperson_id = $1 AND p.date = $2
            "#,
        )
        .bind(salesperson_id)
        .bind(today)
        .fetch_one(&self.pool)
        .await?;
        Ok(summary)
    }
}
