// src/models/trucks.rs

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::FieldError,
        validation::{validate_count, validate_not_blank, validate_quantity},
    },
    models::transactions::MergedLine,
};

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Truck {
    pub id: Uuid,
    pub plate: String,
    pub brand: String,
    pub model: String,
    pub year: Option<i32>,
    #[schema(value_type = Option<f64>)]
    pub capacity_kg: Option<Decimal>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TruckPayload {
    #[validate(length(min = 1, max = 15, message = "plate_length"), custom(function = "validate_not_blank"))]
    pub plate: String,
    #[validate(length(max = 50, message = "too_long"), custom(function = "validate_not_blank"))]
    pub brand: String,
    #[serde(default)]
    #[validate(length(max = 50, message = "too_long"))]
    pub model: String,
    #[validate(range(min = 1950, max = 2100, message = "year_range"))]
    pub year: Option<i32>,
    /// Capacidade em kg
    #[validate(custom(function = "validate_quantity"))]
    #[schema(value_type = Option<f64>)]
    pub capacity_kg: Option<Decimal>,
}

/// Placas são guardadas sem espaços nas pontas e em maiúsculas.
pub fn normalize_plate(plate: &str) -> String {
    plate.trim().to_uppercase()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruckFilter {
    pub page: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

// ---
// Atribuição camião -> rota
// ---

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TruckRoute {
    pub id: Uuid,
    pub truck_id: Uuid,
    pub route_id: Uuid,
    pub route_name: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub active: bool,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TruckRoutePayload {
    pub route_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TruckWithHistory {
    pub truck: Truck,
    /// Atribuições mais recentes primeiro
    pub routes: Vec<TruckRoute>,
    pub recent_loads: Vec<TruckLoad>,
}

// ---
// Carga diária
// ---

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TruckLoad {
    pub id: Uuid,
    pub truck_id: Uuid,
    pub truck_plate: String,
    pub truck_route_id: Uuid,
    pub route_id: Uuid,
    pub route_name: String,
    pub date: NaiveDate,
    pub notes: String,
    pub closed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    #[schema(value_type = f64)]
    pub loaded_qty: Decimal,
    #[schema(value_type = f64)]
    pub current_qty: Decimal,
    #[schema(value_type = f64)]
    pub unit_price: Decimal,
}

impl LoadLine {
    pub fn sold_qty(&self) -> Decimal {
        self.loaded_qty - self.current_qty
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadDetail {
    pub load: TruckLoad,
    pub lines: Vec<LoadLine>,
    #[schema(value_type = f64)]
    pub total_loaded: Decimal,
    /// Valor da carga a preço de venda atual
    #[schema(value_type = f64)]
    pub total_value: Decimal,
}

impl LoadDetail {
    pub fn new(load: TruckLoad, lines: Vec<LoadLine>) -> Self {
        let total_loaded = lines.iter().map(|l| l.loaded_qty).sum();
        let total_value = lines.iter().map(|l| (l.loaded_qty * l.unit_price).round_dp(2)).sum();
        Self { load, lines, total_loaded, total_value }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadPayload {
    pub truck_id: Uuid,
    pub route_id: Uuid,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadLinePayload {
    pub product_id: Uuid,
    #[validate(custom(function = "validate_quantity"))]
    #[schema(value_type = f64)]
    pub quantity: Decimal,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadFilter {
    pub page: Option<String>,
    pub truck_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
}

/// Confere o estoque da carga para as linhas da venda.
/// `stock` traz a quantidade atual de cada produto carregado.
pub fn check_stock(lines: &[MergedLine], stock: &HashMap<Uuid, Decimal>) -> Vec<FieldError> {
    lines
        .iter()
        .filter_map(|line| match stock.get(&line.product_id) {
            None => Some(FieldError::new(format!("lines[{}].productId", line.index), "product_not_loaded")),
            Some(available) if line.quantity > *available => Some(
                FieldError::new(format!("lines[{}].quantity", line.index), "insufficient_stock")
                    .with_arg(available.normalize().to_string()),
            ),
            Some(_) => None,
        })
        .collect()
}

// ---
// Cuadre diário
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "reconciliation_status")]
pub enum ReconciliationStatus {
    #[sqlx(rename = "pendiente")]
    #[serde(rename = "pendiente")]
    Pending,
    #[sqlx(rename = "cuadrado")]
    #[serde(rename = "cuadrado")]
    Balanced,
    #[sqlx(rename = "con_diferencia")]
    #[serde(rename = "con_diferencia")]
    WithDifference,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub id: Uuid,
    pub load_id: Uuid,
    pub truck_plate: String,
    pub route_id: Uuid,
    pub route_name: String,
    pub date: NaiveDate,
    pub status: ReconciliationStatus,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    #[schema(value_type = f64)]
    pub loaded_qty: Decimal,
    #[schema(value_type = f64)]
    pub sold_qty: Decimal,
    #[schema(value_type = f64)]
    pub expected_qty: Decimal,
    #[schema(value_type = f64)]
    pub returned_qty: Decimal,
    /// Positivo = sobra, negativo = falta
    #[schema(value_type = f64)]
    pub difference: Decimal,
    pub notes: String,
}

/// Vendas e pedidos do dia da carga, para conferência.
#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub sales_count: i64,
    #[schema(value_type = f64)]
    pub sales_total: Decimal,
    pub orders_count: i64,
    #[schema(value_type = f64)]
    pub orders_total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationDetail {
    pub reconciliation: Reconciliation,
    pub lines: Vec<ReconciliationLine>,
    #[schema(value_type = f64)]
    pub total_difference: Decimal,
    pub has_differences: bool,
    pub day: DaySummary,
}

impl ReconciliationDetail {
    pub fn new(reconciliation: Reconciliation, lines: Vec<ReconciliationLine>, day: DaySummary) -> Self {
        let total_difference = lines.iter().map(|l| l.difference).sum();
        let has_differences = lines.iter().any(|l| !l.difference.is_zero());
        Self { reconciliation, lines, total_difference, has_differences, day }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationLinePayload {
    /// Quantidade que realmente voltou no camião
    #[validate(custom(function = "validate_count"))]
    #[schema(value_type = f64)]
    pub returned_qty: Decimal,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationPayload {
    #[serde(default)]
    pub notes: String,
}

/// Diferença de uma linha: o que voltou menos o esperado.
pub fn line_difference(expected: Decimal, returned: Decimal) -> Decimal {
    returned - expected
}

/// Estado final do cuadre a partir das diferenças das linhas.
pub fn final_status<I>(differences: I) -> ReconciliationStatus
where
    I: IntoIterator<Item = Decimal>,
{
    if differences.into_iter().any(|d| !d.is_zero()) {
        ReconciliationStatus::WithDifference
    } else {
        ReconciliationStatus::Balanced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(v: &str) -> Decimal {
        Decimal::from_str(v).unwrap()
    }

    fn merged(product_id: Uuid, qty: &str, index: usize) -> MergedLine {
        MergedLine { index, product_id, quantity: d(qty) }
    }

    #[test]
    fn plates_are_trimmed_and_uppercased() {
        assert_eq!(normalize_plate("  p123abc "), "P123ABC");
    }

    #[test]
    fn truck_payload_limits() {
        let ok = TruckPayload {
            plate: "C-512BCD".into(),
            brand: "Isuzu".into(),
            model: String::new(),
            year: Some(2019),
            capacity_kg: Some(d("3500.00")),
        };
        assert!(ok.validate().is_ok());

        let bad = TruckPayload {
            plate: "C-512BCD-EXTRA-LONG".into(),
            brand: " ".into(),
            model: String::new(),
            year: Some(1890),
            capacity_kg: Some(d("-1")),
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("plate"));
        assert!(fields.contains_key("brand"));
        assert!(fields.contains_key("year"));
        assert!(fields.contains_key("capacity_kg"));
    }

    #[test]
    fn stock_is_checked_per_request_line() {
        let (soda, water, chips) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let stock = HashMap::from([(soda, d("10")), (water, d("2.50"))]);

        assert!(check_stock(&[merged(soda, "10", 0), merged(water, "2.5", 1)], &stock).is_empty());

        let errors = check_stock(&[merged(soda, "4", 0), merged(water, "3", 2), merged(chips, "1", 3)], &stock);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "lines[2].quantity");
        assert_eq!(errors[0].key, "insufficient_stock");
        assert_eq!(errors[0].args, vec!["2.5".to_string()]);
        assert_eq!(errors[1].field, "lines[3].productId");
        assert_eq!(errors[1].key, "product_not_loaded");
    }

    #[test]
    fn load_totals_use_loaded_quantities() {
        let line = |loaded: &str, current: &str, price: &str| LoadLine {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            product_name: "Gaseosa".into(),
            loaded_qty: d(loaded),
            current_qty: d(current),
            unit_price: d(price),
        };
        let load = TruckLoad {
            id: Uuid::new_v4(),
            truck_id: Uuid::new_v4(),
            truck_plate: "P123ABC".into(),
            truck_route_id: Uuid::new_v4(),
            route_id: Uuid::new_v4(),
            route_name: "Centro".into(),
            date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            notes: String::new(),
            closed: false,
            created_at: Utc::now(),
        };
        let lines = vec![line("24", "20", "5.50"), line("10", "10", "3.00")];
        assert_eq!(lines[0].sold_qty(), d("4"));

        let detail = LoadDetail::new(load, lines);
        assert_eq!(detail.total_loaded, d("34"));
        assert_eq!(detail.total_value, d("162.00"));
    }

    #[test]
    fn reconciliation_status_follows_differences() {
        assert_eq!(line_difference(d("6"), d("5")), d("-1"));
        assert_eq!(line_difference(d("6"), d("6.5")), d("0.5"));
        assert_eq!(final_status([d("0"), d("0.00")]), ReconciliationStatus::Balanced);
        assert_eq!(final_status([d("0"), d("-1")]), ReconciliationStatus::WithDifference);
        assert_eq!(final_status(Vec::<Decimal>::new()), ReconciliationStatus::Balanced);
    }

    #[test]
    fn returned_quantity_may_be_zero() {
        let zero = ReconciliationLinePayload { returned_qty: d("0"), notes: String::new() };
        assert!(zero.validate().is_ok());
        let negative = ReconciliationLinePayload { returned_qty: d("-2"), notes: String::new() };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(serde_json::to_string(&ReconciliationStatus::WithDifference).unwrap(), "\"con_diferencia\"");
    }
}
