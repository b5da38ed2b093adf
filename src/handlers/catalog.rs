// src/handlers/catalog.rs

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
        rbac::{PermManageCatalog, RequirePermission},
    },
    models::catalog::{
        Category, CategoryPayload, Client, ClientFilter, ClientPayload, ProductFilter, ProductPayload,
        ProductStatus, ProductView,
    },
};

// =============================================================================
//  CLIENTES
// =============================================================================

// GET /api/clients
#[utoipa::path(
    get,
    path = "/api/clients",
    tag = "Catalog",
    params(
        ("page" = Option<String>, Query, description = "Página (padrão 1)"),
        ("search" = Option<String>, Query, description = "Busca por nome ou NIT"),
        ("includeInactive" = Option<bool>, Query, description = "Inclui clientes desativados")
    ),
    responses((status = 200, description = "Clientes, por nome")),
    security(("api_jwt" = []))
)]
pub async fn list_clients(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Query(filter): Query<ClientFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .catalog_service
        .list_clients(&filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(page))
}

// GET /api/clients/{id}
#[utoipa::path(
    get,
    path = "/api/clients/{id}",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Cliente", body = Client),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_client(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let client = app_state
        .catalog_service
        .get_client(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(client))
}

// POST /api/clients
#[utoipa::path(
    post,
    path = "/api/clients",
    tag = "Catalog",
    request_body = ClientPayload,
    responses(
        (status = 201, description = "Cliente criado"),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_client(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageCatalog>,
    Json(payload): Json<ClientPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let client = app_state
        .catalog_service
        .create_client(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let body = notice(&app_state.i18n_store, &locale, "messages.client_created", &[&client.name], &client);
    Ok((StatusCode::CREATED, body))
}

// PUT /api/clients/{id}
#[utoipa::path(
    put,
    path = "/api/clients/{id}",
    tag = "Catalog",
    request_body = ClientPayload,
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Cliente atualizado"),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_client(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageCatalog>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ClientPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let client = app_state
        .catalog_service
        .update_client(id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(notice(&app_state.i18n_store, &locale, "messages.client_updated", &[&client.name], &client))
}

// POST /api/clients/{id}/activate
#[utoipa::path(
    post,
    path = "/api/clients/{id}/activate",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses((status = 200, description = "Cliente ativado")),
    security(("api_jwt" = []))
)]
pub async fn activate_client(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageCatalog>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let client = app_state
        .catalog_service
        .set_client_active(id, true)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(notice(&app_state.i18n_store, &locale, "messages.client_activated", &[&client.name], &client))
}

// POST /api/clients/{id}/deactivate
#[utoipa::path(
    post,
    path = "/api/clients/{id}/deactivate",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses((status = 200, description = "Cliente desativado")),
    security(("api_jwt" = []))
)]
pub async fn deactivate_client(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageCatalog>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let client = app_state
        .catalog_service
        .set_client_active(id, false)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(notice(&app_state.i18n_store, &locale, "messages.client_deactivated", &[&client.name], &client))
}

// =============================================================================
//  CATEGORIAS
// =============================================================================

// GET /api/categories
#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "Catalog",
    responses((status = 200, description = "Categorias", body = Vec<Category>)),
    security(("api_jwt" = []))
)]
pub async fn list_categories(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let categories = app_state
        .catalog_service
        .list_categories()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(categories))
}

// POST /api/categories
#[utoipa::path(
    post,
    path = "/api/categories",
    tag = "Catalog",
    request_body = CategoryPayload,
    responses(
        (status = 201, description = "Categoria criada"),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_category(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageCatalog>,
    Json(payload): Json<CategoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let category = app_state
        .catalog_service
        .create_category(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let body = notice(&app_state.i18n_store, &locale, "messages.category_created", &[&category.name], &category);
    Ok((StatusCode::CREATED, body))
}

// PUT /api/categories/{id}
#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    tag = "Catalog",
    request_body = CategoryPayload,
    params(("id" = Uuid, Path, description = "ID da categoria")),
    responses((status = 200, description = "Categoria atualizada")),
    security(("api_jwt" = []))
)]
pub async fn update_category(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageCatalog>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let category = app_state
        .catalog_service
        .update_category(id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(notice(&app_state.i18n_store, &locale, "messages.category_updated", &[&category.name], &category))
}

// DELETE /api/categories/{id}
#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "ID da categoria")),
    responses(
        (status = 200, description = "Categoria apagada"),
        (status = 409, description = "Categoria com produtos")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_category(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageCatalog>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .catalog_service
        .delete_category(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(notice(&app_state.i18n_store, &locale, "messages.category_deleted", &[], ()))
}

// =============================================================================
//  PRODUTOS
// =============================================================================

// GET /api/products
#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Catalog",
    params(
        ("page" = Option<String>, Query, description = "Página (padrão 1)"),
        ("search" = Option<String>, Query, description = "Busca por nome"),
        ("categoryId" = Option<Uuid>, Query, description = "Filtra pela categoria"),
        ("status" = Option<ProductStatus>, Query, description = "activo (padrão) ou inactivo")
    ),
    responses((status = 200, description = "Produtos com a margem calculada")),
    security(("api_jwt" = []))
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Query(filter): Query<ProductFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .catalog_service
        .list_products(&filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(page))
}

// GET /api/products/{id}
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Produto", body = ProductView),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_product(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = app_state
        .catalog_service
        .get_product(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(product))
}

// POST /api/products
#[utoipa::path(
    post,
    path = "/api/products",
    tag = "Catalog",
    request_body = ProductPayload,
    responses(
        (status = 201, description = "Produto criado"),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageCatalog>,
    Json(payload): Json<ProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let product = app_state
        .catalog_service
        .create_product(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let body = notice(&app_state.i18n_store, &locale, "messages.product_created", &[&product.product.name], &product);
    Ok((StatusCode::CREATED, body))
}

// PUT /api/products/{id}
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    tag = "Catalog",
    request_body = ProductPayload,
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses((status = 200, description = "Produto atualizado")),
    security(("api_jwt" = []))
)]
pub async fn update_product(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageCatalog>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let product = app_state
        .catalog_service
        .update_product(id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(notice(&app_state.i18n_store, &locale, "messages.product_updated", &[&product.product.name], &product))
}

// POST /api/products/{id}/activate
#[utoipa::path(
    post,
    path = "/api/products/{id}/activate",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses((status = 200, description = "Produto ativado")),
    security(("api_jwt" = []))
)]
pub async fn activate_product(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageCatalog>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = app_state
        .catalog_service
        .set_product_status(id, ProductStatus::Active)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(notice(&app_state.i18n_store, &locale, "messages.product_activated", &[&product.product.name], &product))
}

// POST /api/products/{id}/deactivate
#[utoipa::path(
    post,
    path = "/api/products/{id}/deactivate",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses((status = 200, description = "Produto desativado")),
    security(("api_jwt" = []))
)]
pub async fn deactivate_product(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageCatalog>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = app_state
        .catalog_service
        .set_product_status(id, ProductStatus::Inactive)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(notice(&app_state.i18n_store, &locale, "messages.product_deactivated", &[&product.product.name], &product))
}
