// src/handlers/transactions.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    handlers::notice,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermFieldWork, PermManageOrders, RequirePermission},
    },
    models::transactions::{
        OrderDetail, OrderPayload, OrderStatusPayload, SaleDetail, SalePayload, TransactionFilter,
    },
};

// ---
// Vendas
// ---

// GET /api/sales
#[utoipa::path(
    get,
    path = "/api/sales",
    tag = "Sales",
    params(
        ("page" = Option<String>, Query, description = "Página (padrão 1)"),
        ("from" = Option<String>, Query, description = "Data inicial (AAAA-MM-DD)"),
        ("to" = Option<String>, Query, description = "Data final (AAAA-MM-DD)"),
        ("status" = Option<String>, Query, description = "completada, pendiente ou cancelada"),
        ("clientId" = Option<Uuid>, Query, description = "Filtra pelo cliente"),
        ("salespersonId" = Option<Uuid>, Query, description = "Filtra pelo vendedor (ignorado para vendedores)")
    ),
    responses((status = 200, description = "Vendas, das mais recentes")),
    security(("api_jwt" = []))
)]
pub async fn list_sales(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(filter): Query<TransactionFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .transaction_service
        .list_sales(&user, &filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(page))
}

// GET /api/sales/{id}
#[utoipa::path(
    get,
    path = "/api/sales/{id}",
    tag = "Sales",
    params(("id" = Uuid, Path, description = "ID da venda")),
    responses(
        (status = 200, description = "Venda com as linhas", body = SaleDetail),
        (status = 403, description = "Venda de outro vendedor"),
        (status = 404, description = "Não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_sale(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .transaction_service
        .get_sale(&user, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(detail))
}

// POST /api/sales
#[utoipa::path(
    post,
    path = "/api/sales",
    tag = "Sales",
    request_body = SalePayload,
    responses(
        (status = 201, description = "Venda registrada com todas as linhas"),
        (status = 400, description = "Produto indisponível ou linhas inválidas"),
        (status = 409, description = "Visita não está em andamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_sale(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermFieldWork>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<SalePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let detail = app_state
        .transaction_service
        .create_sale(&user, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let total = detail.sale.total.to_string();
    let body = notice(&app_state.i18n_store, &locale, "messages.sale_created", &[&total], &detail);
    Ok((StatusCode::CREATED, body))
}

// ---
// Pedidos
// ---

// GET /api/orders
#[utoipa::path(
    get,
    path = "/api/orders",
    tag = "Orders",
    params(
        ("page" = Option<String>, Query, description = "Página (padrão 1)"),
        ("from" = Option<String>, Query, description = "Data inicial (AAAA-MM-DD)"),
        ("to" = Option<String>, Query, description = "Data final (AAAA-MM-DD)"),
        ("status" = Option<String>, Query, description = "pendiente, procesado, entregado ou cancelado"),
        ("clientId" = Option<Uuid>, Query, description = "Filtra pelo cliente"),
        ("salespersonId" = Option<Uuid>, Query, description = "Filtra pelo vendedor (ignorado para vendedores)")
    ),
    responses((status = 200, description = "Pedidos, dos mais recentes")),
    security(("api_jwt" = []))
)]
pub async fn list_orders(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(filter): Query<TransactionFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .transaction_service
        .list_orders(&user, &filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(page))
}

// GET /api/orders/{id}
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    responses(
        (status = 200, description = "Pedido com as linhas", body = OrderDetail),
        (status = 403, description = "Pedido de outro vendedor"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .transaction_service
        .get_order(&user, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(detail))
}

// POST /api/orders
#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "Orders",
    request_body = OrderPayload,
    responses(
        (status = 201, description = "Pedido registrado com todas as linhas"),
        (status = 400, description = "Produto indisponível ou linhas inválidas"),
        (status = 409, description = "Visita não está em andamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermFieldWork>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<OrderPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let detail = app_state
        .transaction_service
        .create_order(&user, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let total = detail.order.total.to_string();
    let body = notice(&app_state.i18n_store, &locale, "messages.order_created", &[&total], &detail);
    Ok((StatusCode::CREATED, body))
}

// PUT /api/orders/{id}/status
#[utoipa::path(
    put,
    path = "/api/orders/{id}/status",
    tag = "Orders",
    request_body = OrderStatusPayload,
    params(("id" = Uuid, Path, description = "ID do pedido")),
    responses(
        (status = 200, description = "Status atualizado"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_order_status(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageOrders>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OrderStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .transaction_service
        .set_order_status(id, payload.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(notice(&app_state.i18n_store, &locale, "messages.order_status_changed", &[], &detail))
}
