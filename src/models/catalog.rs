// src/models/catalog.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::validation::{
    validate_latitude, validate_longitude, validate_not_blank, validate_not_negative, validate_phone,
};

// ---
// Clientes
// ---

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    #[schema(example = "1234567-8")]
    pub nit: String,
    pub name: String,
    pub contact_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub address: String,
    pub location_reference: String,
    #[schema(value_type = Option<f64>)]
    pub latitude: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub longitude: Option<Decimal>,
    // Caminho relativo ao MEDIA_ROOT
    pub reference_photo: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientPayload {
    #[validate(length(min = 1, max = 15, message = "nit_length"))]
    pub nit: String,

    #[validate(length(max = 200, message = "too_long"), custom(function = "validate_not_blank"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 100, message = "too_long"))]
    pub contact_name: String,

    #[validate(email(message = "email"))]
    pub email: Option<String>,

    #[validate(custom(function = "validate_phone"))]
    pub phone: String,

    #[validate(custom(function = "validate_not_blank"))]
    pub address: String,

    #[serde(default)]
    pub location_reference: String,

    #[validate(custom(function = "validate_latitude"))]
    #[schema(value_type = Option<f64>)]
    pub latitude: Option<Decimal>,

    #[validate(custom(function = "validate_longitude"))]
    #[schema(value_type = Option<f64>)]
    pub longitude: Option<Decimal>,

    /// Foto de referência em base64 (opcional)
    pub reference_photo: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientFilter {
    pub page: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

// ---
// Categorias
// ---

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPayload {
    #[validate(length(max = 100, message = "too_long"), custom(function = "validate_not_blank"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

// ---
// Produtos
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "product_status")]
pub enum ProductStatus {
    #[sqlx(rename = "activo")]
    #[serde(rename = "activo")]
    Active,
    #[sqlx(rename = "inactivo")]
    #[serde(rename = "inactivo")]
    Inactive,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category_id: Uuid,
    pub category_name: String,
    #[schema(value_type = f64)]
    pub purchase_price: Decimal,
    #[schema(value_type = f64)]
    pub sale_price: Decimal,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn margin_percent(&self) -> Decimal {
        margin_percent(self.purchase_price, self.sale_price)
    }
}

/// Margem sobre o preço de compra, em %, com 2 casas. Compra zero dá margem zero.
pub fn margin_percent(purchase: Decimal, sale: Decimal) -> Decimal {
    if purchase.is_zero() {
        return Decimal::ZERO;
    }
    ((sale - purchase) / purchase * Decimal::from(100)).round_dp(2)
}

// Produto como sai pela API, com a margem calculada
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    #[schema(value_type = f64)]
    pub margin_percent: Decimal,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        let margin_percent = product.margin_percent();
        Self { product, margin_percent }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    #[validate(length(max = 200, message = "too_long"), custom(function = "validate_not_blank"))]
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub category_id: Uuid,

    #[validate(custom(function = "validate_not_negative"))]
    #[schema(value_type = f64)]
    pub purchase_price: Decimal,

    #[validate(custom(function = "validate_not_negative"))]
    #[schema(value_type = f64)]
    pub sale_price: Decimal,

    pub status: Option<ProductStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    pub page: Option<String>,
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub status: Option<ProductStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(v: &str) -> Decimal {
        Decimal::from_str(v).unwrap()
    }

    #[test]
    fn margin_over_purchase_price() {
        assert_eq!(margin_percent(d("10.00"), d("12.50")), d("25.00"));
        assert_eq!(margin_percent(d("3.00"), d("4.00")), d("33.33"));
        assert_eq!(margin_percent(d("0"), d("4.00")), Decimal::ZERO);
        assert_eq!(margin_percent(d("8.00"), d("6.00")), d("-25.00"));
    }

    #[test]
    fn client_payload_validation() {
        let payload: ClientPayload = serde_json::from_value(serde_json::json!({
            "nit": "1234567-8901234567",
            "name": "   ",
            "phone": "5555-1234",
            "address": "Zona 1",
            "latitude": 95.0
        }))
        .unwrap();
        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("nit"));
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("latitude"));
        assert!(!fields.contains_key("phone"));
    }

    #[test]
    fn product_status_wire_names() {
        assert_eq!(serde_json::to_string(&ProductStatus::Inactive).unwrap(), "\"inactivo\"");
    }

    #[test]
    fn product_payload_rejects_negative_prices() {
        let payload = ProductPayload {
            name: "Agua pura 600ml".into(),
            description: String::new(),
            category_id: Uuid::new_v4(),
            purchase_price: d("-1"),
            sale_price: d("5"),
            status: None,
        };
        assert!(payload.validate().unwrap_err().field_errors().contains_key("purchase_price"));
    }
}
