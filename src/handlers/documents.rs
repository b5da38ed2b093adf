// src/handlers/documents.rs

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
};

fn pdf_response(filename: String, pdf_bytes: Vec<u8>) -> Response {
    // Inline: o navegador mostra, o app móvel pode baixar
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (header::CONTENT_DISPOSITION, format!("inline; filename=\"{}\"", filename)),
    ];
    (headers, pdf_bytes).into_response()
}

// GET /api/sales/{id}/receipt
#[utoipa::path(
    get,
    path = "/api/sales/{id}/receipt",
    tag = "Documents",
    params(("id" = Uuid, Path, description = "ID da venda")),
    responses(
        (status = 200, description = "Comprovante em PDF", content_type = "application/pdf"),
        (status = 403, description = "Venda de outro vendedor"),
        (status = 404, description = "Não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn sale_receipt(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(sale_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let pdf_bytes = app_state
        .document_service
        .sale_receipt(&user, sale_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(pdf_response(format!("venta_{}.pdf", sale_id), pdf_bytes))
}

// GET /api/orders/{id}/receipt
#[utoipa::path(
    get,
    path = "/api/orders/{id}/receipt",
    tag = "Documents",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    responses(
        (status = 200, description = "Comprovante em PDF", content_type = "application/pdf"),
        (status = 403, description = "Pedido de outro vendedor"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn order_receipt(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(order_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let pdf_bytes = app_state
        .document_service
        .order_receipt(&user, order_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(pdf_response(format!("pedido_{}.pdf", order_id), pdf_bytes))
}
