// src/handlers/assignments.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    handlers::notice,
    middleware::{
        i18n::Locale,
        rbac::{PermManageAssignments, RequirePermission},
    },
    models::{
        assignments::{AssignmentDetail, AssignmentFilter, AssignmentPayload, AssignmentStatus},
        planning::GenerateForDatePayload,
    },
};

// GET /api/assignments
#[utoipa::path(
    get,
    path = "/api/assignments",
    tag = "Assignments",
    params(
        ("page" = Option<String>, Query, description = "Página (padrão 1)"),
        ("salespersonId" = Option<Uuid>, Query, description = "Filtra pelo vendedor"),
        ("routeId" = Option<Uuid>, Query, description = "Filtra pela rota"),
        ("status" = Option<AssignmentStatus>, Query, description = "pendiente, activa ou finalizada")
    ),
    responses((status = 200, description = "Atribuições, das mais recentes")),
    security(("api_jwt" = []))
)]
pub async fn list_assignments(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageAssignments>,
    Query(filter): Query<AssignmentFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .assignment_service
        .list_assignments(&filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(page))
}

// GET /api/assignments/{id}
#[utoipa::path(
    get,
    path = "/api/assignments/{id}",
    tag = "Assignments",
    params(("id" = Uuid, Path, description = "ID da atribuição")),
    responses(
        (status = 200, description = "Atribuição com os últimos planos", body = AssignmentDetail),
        (status = 404, description = "Não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_assignment(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageAssignments>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .assignment_service
        .get_assignment(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(detail))
}

// POST /api/assignments
#[utoipa::path(
    post,
    path = "/api/assignments",
    tag = "Assignments",
    request_body = AssignmentPayload,
    responses(
        (status = 201, description = "Atribuição criada com os planos do período"),
        (status = 400, description = "Vendedor inválido, datas invertidas ou sobreposição"),
        (status = 409, description = "Rota sem paradas")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_assignment(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageAssignments>,
    Json(payload): Json<AssignmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let created = app_state
        .assignment_service
        .create_assignment(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let plans = created.plans_created.to_string();
    let body = notice(&app_state.i18n_store, &locale, "messages.assignment_created", &[&plans], &created);
    Ok((StatusCode::CREATED, body))
}

// POST /api/assignments/{id}/finish
#[utoipa::path(
    post,
    path = "/api/assignments/{id}/finish",
    tag = "Assignments",
    params(("id" = Uuid, Path, description = "ID da atribuição")),
    responses(
        (status = 200, description = "Atribuição encerrada hoje; vendedor desativado"),
        (status = 409, description = "Já estava finalizada")
    ),
    security(("api_jwt" = []))
)]
pub async fn finish_assignment(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageAssignments>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let view = app_state
        .assignment_service
        .finish_assignment(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let name = view.assignment.salesperson_name.clone();
    Ok(notice(&app_state.i18n_store, &locale, "messages.assignment_finished", &[&name], &view))
}

// POST /api/assignments/{id}/regenerate
#[utoipa::path(
    post,
    path = "/api/assignments/{id}/regenerate",
    tag = "Assignments",
    params(("id" = Uuid, Path, description = "ID da atribuição")),
    responses(
        (status = 200, description = "Planos futuros não iniciados refeitos a partir de hoje"),
        (status = 409, description = "Atribuição finalizada ou rota sem paradas")
    ),
    security(("api_jwt" = []))
)]
pub async fn regenerate_plans(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageAssignments>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = app_state
        .assignment_service
        .regenerate_plans(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let (removed, created) = (result.plans_removed.to_string(), result.plans_created.to_string());
    Ok(notice(&app_state.i18n_store, &locale, "messages.plans_regenerated", &[&removed, &created], &result))
}

// POST /api/assignments/{id}/plans
#[utoipa::path(
    post,
    path = "/api/assignments/{id}/plans",
    tag = "Assignments",
    request_body = GenerateForDatePayload,
    params(("id" = Uuid, Path, description = "ID da atribuição")),
    responses(
        (status = 200, description = "Planos do dia gerados"),
        (status = 400, description = "Data fora do período")
    ),
    security(("api_jwt" = []))
)]
pub async fn generate_for_date(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageAssignments>,
    Path(id): Path<Uuid>,
    Json(payload): Json<GenerateForDatePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let result = app_state
        .planning_service
        .generate_for_date(id, payload.date)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let (created, date) = (result.plans_created.to_string(), payload.date.to_string());
    Ok(notice(&app_state.i18n_store, &locale, "messages.plans_generated", &[&created, &date], &result))
}
