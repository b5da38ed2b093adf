// src/handlers/routes.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        pagination::PageParams,
    },
    config::AppState,
    handlers::notice,
    middleware::{
        i18n::Locale,
        rbac::{PermManageRoutes, RequirePermission},
    },
    models::routes::{AddStopPayload, ReorderPayload, RoutePayload, RouteWithStops},
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteListQuery {
    pub page: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

// GET /api/routes
#[utoipa::path(
    get,
    path = "/api/routes",
    tag = "Routes",
    params(
        ("page" = Option<String>, Query, description = "Página (padrão 1)"),
        ("includeInactive" = Option<bool>, Query, description = "Inclui rotas desativadas")
    ),
    responses((status = 200, description = "Rotas com a quantidade de paradas")),
    security(("api_jwt" = []))
)]
pub async fn list_routes(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Query(query): Query<RouteListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let params = PageParams { page: query.page };
    let page = app_state
        .route_service
        .list_routes(&params, query.include_inactive)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(page))
}

// GET /api/routes/{id}
#[utoipa::path(
    get,
    path = "/api/routes/{id}",
    tag = "Routes",
    params(("id" = Uuid, Path, description = "ID da rota")),
    responses(
        (status = 200, description = "Rota com as paradas em ordem de visita", body = RouteWithStops),
        (status = 404, description = "Não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_route(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let route = app_state
        .route_service
        .get_route(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(route))
}

// POST /api/routes
#[utoipa::path(
    post,
    path = "/api/routes",
    tag = "Routes",
    request_body = RoutePayload,
    responses(
        (status = 201, description = "Rota criada"),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_route(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Json(payload): Json<RoutePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let route = app_state
        .route_service
        .create_route(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let body = notice(&app_state.i18n_store, &locale, "messages.route_created", &[&route.name], &route);
    Ok((StatusCode::CREATED, body))
}

// PUT /api/routes/{id}
#[utoipa::path(
    put,
    path = "/api/routes/{id}",
    tag = "Routes",
    request_body = RoutePayload,
    params(("id" = Uuid, Path, description = "ID da rota")),
    responses((status = 200, description = "Rota atualizada")),
    security(("api_jwt" = []))
)]
pub async fn update_route(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoutePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let route = app_state
        .route_service
        .update_route(id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(notice(&app_state.i18n_store, &locale, "messages.route_updated", &[&route.name], &route))
}

// POST /api/routes/{id}/activate
#[utoipa::path(
    post,
    path = "/api/routes/{id}/activate",
    tag = "Routes",
    params(("id" = Uuid, Path, description = "ID da rota")),
    responses((status = 200, description = "Rota ativada")),
    security(("api_jwt" = []))
)]
pub async fn activate_route(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let route = app_state
        .route_service
        .set_route_active(id, true)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(notice(&app_state.i18n_store, &locale, "messages.route_activated", &[&route.name], &route))
}

// POST /api/routes/{id}/deactivate
#[utoipa::path(
    post,
    path = "/api/routes/{id}/deactivate",
    tag = "Routes",
    params(("id" = Uuid, Path, description = "ID da rota")),
    responses((status = 200, description = "Rota desativada")),
    security(("api_jwt" = []))
)]
pub async fn deactivate_route(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let route = app_state
        .route_service
        .set_route_active(id, false)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(notice(&app_state.i18n_store, &locale, "messages.route_deactivated", &[&route.name], &route))
}

// POST /api/routes/{id}/stops
#[utoipa::path(
    post,
    path = "/api/routes/{id}/stops",
    tag = "Routes",
    request_body = AddStopPayload,
    params(("id" = Uuid, Path, description = "ID da rota")),
    responses(
        (status = 201, description = "Cliente adicionado à rota"),
        (status = 400, description = "Cliente já está na rota")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_stop(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddStopPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let stop = app_state
        .route_service
        .add_stop(id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let order = stop.visit_order.to_string();
    let body = notice(&app_state.i18n_store, &locale, "messages.stop_added", &[&order], &stop);
    Ok((StatusCode::CREATED, body))
}

// DELETE /api/routes/{id}/stops/{detail_id}
#[utoipa::path(
    delete,
    path = "/api/routes/{id}/stops/{detail_id}",
    tag = "Routes",
    params(
        ("id" = Uuid, Path, description = "ID da rota"),
        ("detail_id" = Uuid, Path, description = "ID da parada")
    ),
    responses(
        (status = 200, description = "Cliente retirado da rota"),
        (status = 404, description = "Parada não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn remove_stop(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Path((id, detail_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .route_service
        .remove_stop(id, detail_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(notice(&app_state.i18n_store, &locale, "messages.stop_removed", &[], ()))
}

// PUT /api/routes/{id}/stops/order
#[utoipa::path(
    put,
    path = "/api/routes/{id}/stops/order",
    tag = "Routes",
    request_body = ReorderPayload,
    params(("id" = Uuid, Path, description = "ID da rota")),
    responses(
        (status = 200, description = "Paradas reordenadas"),
        (status = 400, description = "Parada de outra rota ou repetida")
    ),
    security(("api_jwt" = []))
)]
pub async fn reorder_stops(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReorderPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let route = app_state
        .route_service
        .reorder_stops(id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(notice(&app_state.i18n_store, &locale, "messages.stops_reordered", &[], &route))
}
