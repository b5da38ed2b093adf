// src/models/dashboard.rs

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

// 1. Resumo para administração e secretaria (os cards do topo)
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagerSummary {
    pub active_clients: i64,
    pub active_routes: i64,
    pub active_assignments: i64,
    pub month_sales_count: i64,
    #[schema(value_type = f64)]
    pub month_sales_total: Decimal,
    pub month_orders_count: i64,
    #[schema(value_type = f64)]
    pub month_orders_total: Decimal,
    pub duplicate_photos: i64, // Visitas com foto repetida
    pub invalid_locations: i64, // Visitas fora da margem do cliente
}

// 2. Resumo do dia do vendedor
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalespersonSummary {
    pub plans_today: i64,
    pub visited_today: i64,
    pub pending_today: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Dashboard {
    Manager(ManagerSummary),
    Salesperson(SalespersonSummary),
}
