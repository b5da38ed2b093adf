// src/handlers/planning.rs

use axum::{
    extract::{Path, State},
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
        rbac::{PermFieldWork, RequirePermission},
    },
    models::{
        catalog::ClientPayload,
        planning::{DayPlan, FinishVisitPayload, NotVisitedPayload, StartVisitPayload},
    },
    services::planning_service::today,
};

// GET /api/planning/today
#[utoipa::path(
    get,
    path = "/api/planning/today",
    tag = "Planning",
    responses(
        (status = 200, description = "Plano do dia em ordem de visita", body = DayPlan),
        (status = 403, description = "Conta inativa"),
        (status = 409, description = "Sem atribuição ativa")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_day_plan(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermFieldWork>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let plan = app_state
        .planning_service
        .day_plan(&user, today())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(plan))
}

// POST /api/planning/{id}/start
#[utoipa::path(
    post,
    path = "/api/planning/{id}/start",
    tag = "Planning",
    request_body = StartVisitPayload,
    params(("id" = Uuid, Path, description = "ID do plano")),
    responses(
        (status = 200, description = "Visita iniciada"),
        (status = 403, description = "Plano de outro vendedor"),
        (status = 409, description = "Visita em andamento ou já encerrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn start_visit(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermFieldWork>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<StartVisitPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let detail = app_state
        .planning_service
        .start_visit(&user, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let key = if detail.duplicate_photo {
        "messages.visit_started_duplicate_photo"
    } else {
        "messages.visit_started"
    };
    Ok(notice(&app_state.i18n_store, &locale, key, &[], &detail))
}

// POST /api/planning/{id}/not-visited
#[utoipa::path(
    post,
    path = "/api/planning/{id}/not-visited",
    tag = "Planning",
    request_body = NotVisitedPayload,
    params(("id" = Uuid, Path, description = "ID do plano")),
    responses(
        (status = 200, description = "Plano marcado como não visitado ou fechado"),
        (status = 409, description = "Visita já iniciada ou marcada")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_not_visited(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermFieldWork>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<NotVisitedPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .planning_service
        .mark_not_visited(&user, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(notice(&app_state.i18n_store, &locale, "messages.visit_marked", &[], &detail))
}

// POST /api/visits/{detail_id}/finish
#[utoipa::path(
    post,
    path = "/api/visits/{detail_id}/finish",
    tag = "Planning",
    request_body = FinishVisitPayload,
    params(("detail_id" = Uuid, Path, description = "ID do detalhe da visita")),
    responses(
        (status = 200, description = "Visita encerrada"),
        (status = 409, description = "Visita não está em andamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn finish_visit(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermFieldWork>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(detail_id): Path<Uuid>,
    Json(payload): Json<FinishVisitPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .planning_service
        .finish_visit(&user, detail_id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let minutes = detail
        .visit_duration()
        .map(|d| d.num_minutes().to_string())
        .unwrap_or_default();
    Ok(notice(&app_state.i18n_store, &locale, "messages.visit_finished", &[&minutes], &detail))
}

// POST /api/planning/new-client
#[utoipa::path(
    post,
    path = "/api/planning/new-client",
    tag = "Planning",
    request_body = ClientPayload,
    responses(
        (status = 201, description = "Cliente criado, incluído na rota e no plano de hoje"),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Sem atribuição ativa")
    ),
    security(("api_jwt" = []))
)]
pub async fn register_new_client(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermFieldWork>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<ClientPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let created = app_state
        .planning_service
        .register_new_client(&user, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let body = notice(
        &app_state.i18n_store,
        &locale,
        "messages.field_client_created",
        &[&created.client.name],
        &created,
    );
    Ok((StatusCode::CREATED, body))
}
