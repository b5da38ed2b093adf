// src/handlers/trucks.rs

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
        i18n::Locale,
        rbac::{PermManageRoutes, RequirePermission},
    },
    models::trucks::{
        LoadDetail, LoadFilter, LoadLinePayload, LoadPayload, ReconciliationDetail, ReconciliationLinePayload,
        ReconciliationPayload, TruckFilter, TruckPayload, TruckRoutePayload, TruckWithHistory,
    },
};

// ---
// Camiões
// ---

// GET /api/trucks
#[utoipa::path(
    get,
    path = "/api/trucks",
    tag = "Trucks",
    params(
        ("page" = Option<String>, Query, description = "Página (padrão 1)"),
        ("search" = Option<String>, Query, description = "Busca por placa, marca ou modelo"),
        ("includeInactive" = Option<bool>, Query, description = "Inclui camiões desativados")
    ),
    responses((status = 200, description = "Camiões ordenados pela placa")),
    security(("api_jwt" = []))
)]
pub async fn list_trucks(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Query(filter): Query<TruckFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .truck_service
        .list_trucks(&filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(page))
}

// GET /api/trucks/{id}
#[utoipa::path(
    get,
    path = "/api/trucks/{id}",
    tag = "Trucks",
    params(("id" = Uuid, Path, description = "ID do camião")),
    responses(
        (status = 200, description = "Camião com atribuições e cargas recentes", body = TruckWithHistory),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_truck(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let truck = app_state
        .truck_service
        .get_truck(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(truck))
}

// POST /api/trucks
#[utoipa::path(
    post,
    path = "/api/trucks",
    tag = "Trucks",
    request_body = TruckPayload,
    responses(
        (status = 201, description = "Camião cadastrado"),
        (status = 400, description = "Dados inválidos ou placa repetida")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_truck(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Json(payload): Json<TruckPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let truck = app_state
        .truck_service
        .create_truck(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let body = notice(&app_state.i18n_store, &locale, "messages.truck_created", &[&truck.plate], &truck);
    Ok((StatusCode::CREATED, body))
}

// PUT /api/trucks/{id}
#[utoipa::path(
    put,
    path = "/api/trucks/{id}",
    tag = "Trucks",
    request_body = TruckPayload,
    params(("id" = Uuid, Path, description = "ID do camião")),
    responses((status = 200, description = "Camião atualizado")),
    security(("api_jwt" = []))
)]
pub async fn update_truck(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TruckPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let truck = app_state
        .truck_service
        .update_truck(id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(notice(&app_state.i18n_store, &locale, "messages.truck_updated", &[&truck.plate], &truck))
}

// POST /api/trucks/{id}/activate
#[utoipa::path(
    post,
    path = "/api/trucks/{id}/activate",
    tag = "Trucks",
    params(("id" = Uuid, Path, description = "ID do camião")),
    responses((status = 200, description = "Camião ativado")),
    security(("api_jwt" = []))
)]
pub async fn activate_truck(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let truck = app_state
        .truck_service
        .set_truck_active(id, true)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(notice(&app_state.i18n_store, &locale, "messages.truck_activated", &[&truck.plate], &truck))
}

// POST /api/trucks/{id}/deactivate
#[utoipa::path(
    post,
    path = "/api/trucks/{id}/deactivate",
    tag = "Trucks",
    params(("id" = Uuid, Path, description = "ID do camião")),
    responses((status = 200, description = "Camião desativado")),
    security(("api_jwt" = []))
)]
pub async fn deactivate_truck(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let truck = app_state
        .truck_service
        .set_truck_active(id, false)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(notice(&app_state.i18n_store, &locale, "messages.truck_deactivated", &[&truck.plate], &truck))
}

// POST /api/trucks/{id}/routes
#[utoipa::path(
    post,
    path = "/api/trucks/{id}/routes",
    tag = "Trucks",
    request_body = TruckRoutePayload,
    params(("id" = Uuid, Path, description = "ID do camião")),
    responses(
        (status = 201, description = "Camião atribuído à rota"),
        (status = 400, description = "Rota inativa ou datas invertidas")
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_route(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TruckRoutePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let assigned = app_state
        .truck_service
        .assign_route(id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let body = notice(&app_state.i18n_store, &locale, "messages.truck_assigned", &[&assigned.route_name], &assigned);
    Ok((StatusCode::CREATED, body))
}

// ---
// Cargas
// ---

// GET /api/loads
#[utoipa::path(
    get,
    path = "/api/loads",
    tag = "Trucks",
    params(
        ("page" = Option<String>, Query, description = "Página (padrão 1)"),
        ("truckId" = Option<Uuid>, Query, description = "Filtra por camião"),
        ("date" = Option<String>, Query, description = "Filtra pela data da carga (AAAA-MM-DD)")
    ),
    responses((status = 200, description = "Cargas, mais recentes primeiro")),
    security(("api_jwt" = []))
)]
pub async fn list_loads(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Query(filter): Query<LoadFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .truck_service
        .list_loads(&filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(page))
}

// GET /api/loads/{id}
#[utoipa::path(
    get,
    path = "/api/loads/{id}",
    tag = "Trucks",
    params(("id" = Uuid, Path, description = "ID da carga")),
    responses(
        (status = 200, description = "Carga com os produtos e o estoque atual", body = LoadDetail),
        (status = 404, description = "Não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_load(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let load = app_state
        .truck_service
        .get_load(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(load))
}

// POST /api/loads
#[utoipa::path(
    post,
    path = "/api/loads",
    tag = "Trucks",
    request_body = LoadPayload,
    responses(
        (status = 201, description = "Carga aberta"),
        (status = 400, description = "Camião ou rota inválidos, ou carga do dia já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_load(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Json(payload): Json<LoadPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let load = app_state
        .truck_service
        .create_load(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let body = notice(&app_state.i18n_store, &locale, "messages.load_created", &[&load.load.truck_plate], &load);
    Ok((StatusCode::CREATED, body))
}

// POST /api/loads/{id}/lines
#[utoipa::path(
    post,
    path = "/api/loads/{id}/lines",
    tag = "Trucks",
    request_body = LoadLinePayload,
    params(("id" = Uuid, Path, description = "ID da carga")),
    responses(
        (status = 201, description = "Produto carregado"),
        (status = 409, description = "Carga fechada")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_load_line(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Path(id): Path<Uuid>,
    Json(payload): Json<LoadLinePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let load = app_state
        .truck_service
        .add_load_line(id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let body = notice(&app_state.i18n_store, &locale, "messages.load_line_added", &[], &load);
    Ok((StatusCode::CREATED, body))
}

// DELETE /api/loads/{id}/lines/{line_id}
#[utoipa::path(
    delete,
    path = "/api/loads/{id}/lines/{line_id}",
    tag = "Trucks",
    params(
        ("id" = Uuid, Path, description = "ID da carga"),
        ("line_id" = Uuid, Path, description = "ID da linha da carga")
    ),
    responses(
        (status = 200, description = "Produto retirado da carga"),
        (status = 409, description = "Carga fechada")
    ),
    security(("api_jwt" = []))
)]
pub async fn remove_load_line(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Path((id, line_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let load = app_state
        .truck_service
        .remove_load_line(id, line_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(notice(&app_state.i18n_store, &locale, "messages.load_line_removed", &[], &load))
}

// POST /api/loads/{id}/close
#[utoipa::path(
    post,
    path = "/api/loads/{id}/close",
    tag = "Trucks",
    params(("id" = Uuid, Path, description = "ID da carga")),
    responses(
        (status = 200, description = "Carga fechada"),
        (status = 409, description = "Carga vazia ou já fechada")
    ),
    security(("api_jwt" = []))
)]
pub async fn close_load(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let load = app_state
        .truck_service
        .close_load(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let total = load.total_loaded.normalize().to_string();
    Ok(notice(&app_state.i18n_store, &locale, "messages.load_closed", &[&total], &load))
}

// POST /api/loads/{id}/reconciliation
#[utoipa::path(
    post,
    path = "/api/loads/{id}/reconciliation",
    tag = "Trucks",
    request_body = ReconciliationPayload,
    params(("id" = Uuid, Path, description = "ID da carga")),
    responses(
        (status = 201, description = "Cuadre criado a partir da carga", body = ReconciliationDetail),
        (status = 409, description = "Carga aberta ou cuadre já existente")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_reconciliation(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReconciliationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let reconciliation = app_state
        .truck_service
        .create_reconciliation(id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let body = notice(&app_state.i18n_store, &locale, "messages.reconciliation_created", &[], &reconciliation);
    Ok((StatusCode::CREATED, body))
}

// ---
// Cuadres
// ---

// GET /api/reconciliations
#[utoipa::path(
    get,
    path = "/api/reconciliations",
    tag = "Trucks",
    params(("page" = Option<String>, Query, description = "Página (padrão 1)")),
    responses((status = 200, description = "Cuadres, mais recentes primeiro")),
    security(("api_jwt" = []))
)]
pub async fn list_reconciliations(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .truck_service
        .list_reconciliations(&params)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(page))
}

// GET /api/reconciliations/{id}
#[utoipa::path(
    get,
    path = "/api/reconciliations/{id}",
    tag = "Trucks",
    params(("id" = Uuid, Path, description = "ID do cuadre")),
    responses(
        (status = 200, description = "Cuadre com diferenças e o resumo de vendas e pedidos do dia", body = ReconciliationDetail),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_reconciliation(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let reconciliation = app_state
        .truck_service
        .get_reconciliation(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(reconciliation))
}

// PUT /api/reconciliations/{id}/lines/{line_id}
#[utoipa::path(
    put,
    path = "/api/reconciliations/{id}/lines/{line_id}",
    tag = "Trucks",
    request_body = ReconciliationLinePayload,
    params(
        ("id" = Uuid, Path, description = "ID do cuadre"),
        ("line_id" = Uuid, Path, description = "ID da linha do cuadre")
    ),
    responses(
        (status = 200, description = "Retorno registrado"),
        (status = 409, description = "Cuadre já finalizado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_reconciliation_line(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Path((id, line_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ReconciliationLinePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let reconciliation = app_state
        .truck_service
        .update_reconciliation_line(id, line_id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(notice(&app_state.i18n_store, &locale, "messages.reconciliation_updated", &[], &reconciliation))
}

// POST /api/reconciliations/{id}/finalize
#[utoipa::path(
    post,
    path = "/api/reconciliations/{id}/finalize",
    tag = "Trucks",
    params(("id" = Uuid, Path, description = "ID do cuadre")),
    responses(
        (status = 200, description = "Cuadre finalizado: cuadrado ou con_diferencia"),
        (status = 409, description = "Cuadre já finalizado")
    ),
    security(("api_jwt" = []))
)]
pub async fn finalize_reconciliation(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermManageRoutes>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let reconciliation = app_state
        .truck_service
        .finalize_reconciliation(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let key = if reconciliation.has_differences {
        "messages.reconciliation_with_difference"
    } else {
        "messages.reconciliation_balanced"
    };
    Ok(notice(&app_state.i18n_store, &locale, key, &[], &reconciliation))
}
