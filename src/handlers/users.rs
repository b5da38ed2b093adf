// src/handlers/users.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
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
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermManageUsers, RequirePermission},
    },
    models::{auth::User, users::UserPayload},
};

// GET /api/users
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    params(("page" = Option<String>, Query, description = "Página (padrão 1)")),
    responses((status = 200, description = "Usuários ativos, por username")),
    security(("api_jwt" = []))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageUsers>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .user_service
        .list_users(&params, true)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(page))
}

// GET /api/users/inactive
#[utoipa::path(
    get,
    path = "/api/users/inactive",
    tag = "Users",
    params(("page" = Option<String>, Query, description = "Página (padrão 1)")),
    responses((status = 200, description = "Usuários desativados")),
    security(("api_jwt" = []))
)]
pub async fn list_inactive_users(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageUsers>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .user_service
        .list_users(&params, false)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(page))
}

// GET /api/users/{id}
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "ID do usuário")),
    responses(
        (status = 200, description = "Usuário", body = User),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_user(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageUsers>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user = app_state
        .user_service
        .get_user(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(user))
}

// POST /api/users
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    request_body = UserPayload,
    responses(
        (status = 201, description = "Usuário criado"),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_user(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageUsers>,
    Json(payload): Json<UserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let user = app_state
        .user_service
        .create_user(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let body = notice(&app_state.i18n_store, &locale, "messages.user_created", &[&user.username], &user);
    Ok((StatusCode::CREATED, body))
}

// PUT /api/users/{id}
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "Users",
    request_body = UserPayload,
    params(("id" = Uuid, Path, description = "ID do usuário")),
    responses(
        (status = 200, description = "Usuário atualizado"),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_user(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageUsers>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let user = app_state
        .user_service
        .update_user(id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(notice(&app_state.i18n_store, &locale, "messages.user_updated", &[&user.username], &user))
}

// POST /api/users/{id}/toggle-active
#[utoipa::path(
    post,
    path = "/api/users/{id}/toggle-active",
    tag = "Users",
    params(("id" = Uuid, Path, description = "ID do usuário")),
    responses(
        (status = 200, description = "Estado ativo alternado"),
        (status = 409, description = "Não é possível desativar a si mesmo")
    ),
    security(("api_jwt" = []))
)]
pub async fn toggle_user_active(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageUsers>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user = app_state
        .user_service
        .toggle_user_active(&actor, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let key = if user.active { "messages.user_activated" } else { "messages.user_deactivated" };
    Ok(notice(&app_state.i18n_store, &locale, key, &[&user.username], &user))
}

// DELETE /api/users/{id} (desativação, nunca apaga)
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "ID do usuário")),
    responses(
        (status = 200, description = "Usuário desativado"),
        (status = 409, description = "Não é possível desativar a si mesmo")
    ),
    security(("api_jwt" = []))
)]
pub async fn deactivate_user(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageUsers>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user = app_state
        .user_service
        .deactivate_user(&actor, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(notice(&app_state.i18n_store, &locale, "messages.user_deactivated", &[&user.username], &user))
}
