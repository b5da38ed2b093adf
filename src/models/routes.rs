// src/models/routes.rs

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::{error::FieldError, validation::validate_not_blank};

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

// Linha da listagem de rotas
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub stop_count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteDetail {
    pub id: Uuid,
    pub route_id: Uuid,
    pub client_id: Uuid,
    pub visit_order: i32,
    pub active: bool,
    pub assigned_at: DateTime<Utc>,
}

// Parada da rota com os dados do cliente
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteStop {
    pub id: Uuid,
    pub client_id: Uuid,
    pub visit_order: i32,
    pub active: bool,
    pub client_name: String,
    pub client_nit: String,
    pub client_address: String,
    #[schema(value_type = Option<f64>)]
    pub client_latitude: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub client_longitude: Option<Decimal>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteWithStops {
    pub route: Route,
    pub stops: Vec<RouteStop>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoutePayload {
    #[validate(length(max = 100, message = "too_long"), custom(function = "validate_not_blank"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddStopPayload {
    pub client_id: Uuid,
    // Sem ordem informada, a parada vai para o final
    #[validate(range(min = 1, message = "visit_order_min"))]
    pub visit_order: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReorderPayload {
    /// IDs das paradas na nova ordem
    pub detail_ids: Vec<Uuid>,
}

/// Ordem sugerida para uma nova parada: a maior existente + 1.
pub fn suggested_order(current_max: Option<i32>) -> i32 {
    current_max.map_or(1, |max| max + 1)
}

/// Valida a nova ordem pedida e devolve os pares (parada, ordem) começando em 1.
/// Toda parada informada precisa pertencer à rota e não pode se repetir;
/// as paradas omitidas seguem depois, na ordem atual (`route_details` já vem ordenado).
pub fn plan_reorder(route_details: &[Uuid], requested: &[Uuid]) -> Result<Vec<(Uuid, i32)>, FieldError> {
    if requested.is_empty() {
        return Err(FieldError::new("detailIds", "required"));
    }

    let known: HashSet<&Uuid> = route_details.iter().collect();
    let mut seen = HashSet::new();
    for id in requested {
        if !known.contains(id) {
            return Err(FieldError::new("detailIds", "stop_not_in_route").with_arg(id.to_string()));
        }
        if !seen.insert(id) {
            return Err(FieldError::new("detailIds", "stop_repeated").with_arg(id.to_string()));
        }
    }

    let omitted = route_details.iter().filter(|id| !seen.contains(id));
    Ok(requested.iter().chain(omitted).zip(1..).map(|(id, order)| (*id, order)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_stop_goes_last() {
        assert_eq!(suggested_order(None), 1);
        assert_eq!(suggested_order(Some(4)), 5);
    }

    #[test]
    fn reorder_assigns_consecutive_orders() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let plan = plan_reorder(&[a, b, c], &[c, a, b]).unwrap();
        assert_eq!(plan, vec![(c, 1), (a, 2), (b, 3)]);
    }

    #[test]
    fn omitted_stops_keep_relative_order_at_the_end() {
        let (a, b, c, d) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let plan = plan_reorder(&[a, b, c, d], &[d, b]).unwrap();
        assert_eq!(plan, vec![(d, 1), (b, 2), (a, 3), (c, 4)]);
    }

    #[test]
    fn reorder_rejects_foreign_or_repeated_stops() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let foreign = plan_reorder(&[a], &[a, b]).unwrap_err();
        assert_eq!(foreign.key, "stop_not_in_route");
        let repeated = plan_reorder(&[a, b], &[a, a]).unwrap_err();
        assert_eq!(repeated.args, vec![a.to_string()]);
        assert_eq!(repeated.key, "stop_repeated");
        assert_eq!(plan_reorder(&[a], &[]).unwrap_err().key, "required");
    }
}
