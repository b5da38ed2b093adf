// src/models/transactions.rs

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::{
    error::FieldError,
    validation::{fits_amount, validate_quantity},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "sale_status")]
pub enum SaleStatus {
    #[sqlx(rename = "completada")]
    #[serde(rename = "completada")]
    Completed,
    #[sqlx(rename = "pendiente")]
    #[serde(rename = "pendiente")]
    Pending,
    #[sqlx(rename = "cancelada")]
    #[serde(rename = "cancelada")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "order_status")]
pub enum OrderStatus {
    #[sqlx(rename = "pendiente")]
    #[serde(rename = "pendiente")]
    Pending,
    #[sqlx(rename = "procesado")]
    #[serde(rename = "procesado")]
    Processed,
    #[sqlx(rename = "entregado")]
    #[serde(rename = "entregado")]
    Delivered,
    #[sqlx(rename = "cancelado")]
    #[serde(rename = "cancelado")]
    Cancelled,
}

/// Tipo de documento comercial: venda (entregue na hora) ou pedido (entrega futura).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Sale,
    Order,
}

// Cabeçalho de venda com os nomes usados nas listagens e no comprovante
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    pub plan_detail_id: Uuid,
    pub client_id: Uuid,
    pub client_name: String,
    pub client_nit: String,
    pub salesperson_id: Uuid,
    pub salesperson_name: String,
    pub created_at: DateTime<Utc>,
    #[schema(value_type = f64)]
    pub total: Decimal,
    pub status: SaleStatus,
    pub notes: String,
    /// Carga do camião de onde saiu a mercadoria
    pub truck_load_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub plan_detail_id: Uuid,
    pub client_id: Uuid,
    pub client_name: String,
    pub client_nit: String,
    pub salesperson_id: Uuid,
    pub salesperson_name: String,
    pub created_at: DateTime<Utc>,
    pub estimated_delivery: Option<NaiveDate>,
    #[schema(value_type = f64)]
    pub total: Decimal,
    pub status: OrderStatus,
    pub notes: String,
}

// Linha de venda ou de pedido (mesma forma nas duas tabelas)
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    #[schema(value_type = f64)]
    pub quantity: Decimal,
    #[schema(value_type = f64)]
    pub unit_price: Decimal,
    #[schema(value_type = f64)]
    pub subtotal: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    pub sale: Sale,
    pub lines: Vec<TransactionLine>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    pub order: Order,
    pub lines: Vec<TransactionLine>,
}

// ---
// Captura
// ---

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinePayload {
    pub product_id: Uuid,
    #[validate(custom(function = "validate_quantity"))]
    #[schema(value_type = f64)]
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalePayload {
    pub plan_detail_id: Uuid,
    #[validate(length(min = 1, message = "lines_required"), nested)]
    pub lines: Vec<LinePayload>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    pub plan_detail_id: Uuid,
    pub estimated_delivery: Option<NaiveDate>,
    #[validate(length(min = 1, message = "lines_required"), nested)]
    pub lines: Vec<LinePayload>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderStatusPayload {
    pub status: OrderStatus,
}

/// Linha com o preço já capturado do catálogo.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

/// Produto da requisição depois de juntar as linhas repetidas.
/// `index` é a posição da primeira linha do produto no pedido original.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergedLine {
    pub index: usize,
    pub product_id: Uuid,
    pub quantity: Decimal,
}

/// Junta linhas repetidas do mesmo produto, mantendo a ordem da primeira aparição.
pub fn merge_lines(lines: &[LinePayload]) -> Vec<MergedLine> {
    let mut merged: Vec<MergedLine> = Vec::with_capacity(lines.len());
    let mut position: HashMap<Uuid, usize> = HashMap::new();
    for (index, line) in lines.iter().enumerate() {
        match position.get(&line.product_id) {
            Some(&i) => merged[i].quantity += line.quantity,
            None => {
                position.insert(line.product_id, merged.len());
                merged.push(MergedLine { index, product_id: line.product_id, quantity: line.quantity });
            }
        }
    }
    merged
}

/// Aplica os preços de venda vigentes (`prices`: só produtos ativos) e calcula o total.
/// Produto ausente do mapa é erro de campo na linha correspondente; quantidade,
/// subtotal e total precisam caber em NUMERIC(10,2).
pub fn price_lines(
    lines: &[MergedLine],
    prices: &HashMap<Uuid, Decimal>,
) -> Result<(Vec<PricedLine>, Decimal), Vec<FieldError>> {
    let mut priced = Vec::with_capacity(lines.len());
    let mut errors = Vec::new();

    for line in lines {
        let Some(unit_price) = prices.get(&line.product_id) else {
            errors.push(
                FieldError::new(format!("lines[{}].productId", line.index), "product_unavailable")
                    .with_arg(line.product_id.to_string()),
            );
            continue;
        };

        let subtotal = (line.quantity * *unit_price).round_dp(2);
        if !fits_amount(&line.quantity) || !fits_amount(&subtotal) {
            errors.push(FieldError::new(format!("lines[{}].quantity", line.index), "amount_too_large"));
            continue;
        }
        priced.push(PricedLine {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: *unit_price,
            subtotal,
        });
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    let total = priced.iter().map(|l| l.subtotal).sum::<Decimal>().round_dp(2);
    if !fits_amount(&total) {
        return Err(vec![FieldError::new("lines", "amount_too_large")]);
    }
    Ok((priced, total))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    pub page: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<String>,
    pub client_id: Option<Uuid>,
    pub salesperson_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(v: &str) -> Decimal {
        Decimal::from_str(v).unwrap()
    }

    fn line(product_id: Uuid, qty: &str) -> LinePayload {
        LinePayload { product_id, quantity: d(qty) }
    }

    fn merged(product_id: Uuid, qty: &str, index: usize) -> MergedLine {
        MergedLine { index, product_id, quantity: d(qty) }
    }

    #[test]
    fn duplicate_products_are_merged() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let lines = merge_lines(&[line(a, "2"), line(b, "1"), line(a, "3.5")]);
        assert_eq!(lines, vec![merged(a, "5.5", 0), merged(b, "1", 1)]);
    }

    #[test]
    fn totals_use_captured_prices() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let prices = HashMap::from([(a, d("12.50")), (b, d("3.33"))]);
        let (priced, total) = price_lines(&[merged(a, "2", 0), merged(b, "3", 1)], &prices).unwrap();
        assert_eq!(priced[0].subtotal, d("25.00"));
        assert_eq!(priced[1].subtotal, d("9.99"));
        assert_eq!(priced[1].unit_price, d("3.33"));
        assert_eq!(total, d("34.99"));
    }

    #[test]
    fn inactive_or_unknown_products_fail_the_line() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let prices = HashMap::from([(a, d("1.00"))]);
        let errors = price_lines(&[merged(a, "1", 0), merged(b, "1", 1)], &prices).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "lines[1].productId");
        assert_eq!(errors[0].key, "product_unavailable");
    }

    #[test]
    fn errors_point_at_the_line_of_the_request() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let prices = HashMap::from([(a, d("1.00"))]);
        let lines = merge_lines(&[line(a, "1"), line(a, "2"), line(b, "1")]);
        let errors = price_lines(&lines, &prices).unwrap_err();
        assert_eq!(errors[0].field, "lines[2].productId");
    }

    #[test]
    fn amounts_beyond_the_column_are_field_errors() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let prices = HashMap::from([(a, d("50.00")), (b, d("50.00"))]);

        // Quantidade válida, mas o subtotal não cabe
        let errors = price_lines(&[merged(a, "9999999", 0)], &prices).unwrap_err();
        assert_eq!(errors[0].field, "lines[0].quantity");
        assert_eq!(errors[0].key, "amount_too_large");

        // Cada subtotal cabe, a soma não
        let errors = price_lines(&[merged(a, "1500000", 0), merged(b, "1500000", 1)], &prices).unwrap_err();
        assert_eq!(errors[0].field, "lines");

        // Linhas repetidas somadas além do limite
        let lines = merge_lines(&[line(a, "99999999.99"), line(a, "1")]);
        assert_eq!(price_lines(&lines, &prices).unwrap_err()[0].key, "amount_too_large");
    }

    #[test]
    fn quantity_precision_is_validated_per_line() {
        let payload = SalePayload {
            plan_detail_id: Uuid::new_v4(),
            lines: vec![line(Uuid::new_v4(), "1"), line(Uuid::new_v4(), "0.004")],
            notes: String::new(),
        };
        let errors = payload.validate().unwrap_err();
        let flat = crate::common::error::flatten_validation(&errors);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].0, "lines[1].quantity");
        assert_eq!(flat[0].1.code, "quantity_scale");
    }

    #[test]
    fn sale_needs_at_least_one_positive_line() {
        let empty = SalePayload { plan_detail_id: Uuid::new_v4(), lines: vec![], notes: String::new() };
        assert!(empty.validate().is_err());

        let zero = SalePayload {
            plan_detail_id: Uuid::new_v4(),
            lines: vec![line(Uuid::new_v4(), "0")],
            notes: String::new(),
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn order_status_wire_names() {
        assert_eq!(serde_json::to_string(&OrderStatus::Delivered).unwrap(), "\"entregado\"");
        assert_eq!(serde_json::from_str::<SaleStatus>("\"cancelada\"").unwrap(), SaleStatus::Cancelled);
    }
}
