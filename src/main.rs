//src/main.rs

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post, put},
    Json, Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::common::media::MAX_REQUEST_BYTES;
use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

/// Monta o roteador completo. Tudo fora de login, health e docs passa pelo `auth_guard`.
pub fn build_router(app_state: AppState) -> Router {
    // Rotas públicas
    let public_routes = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .route("/api/auth/login", post(handlers::auth::login));

    // Guard no MethodRouter: só o POST é protegido, GET cai no 405
    let logout_route = Router::new().route(
        "/api/auth/logout",
        post(handlers::auth::logout)
            .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard)),
    );

    let user_routes = Router::new()
        .route("/", get(handlers::users::list_users).post(handlers::users::create_user))
        .route("/inactive", get(handlers::users::list_inactive_users))
        .route(
            "/{id}",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::deactivate_user),
        )
        .route("/{id}/toggle-active", post(handlers::users::toggle_user_active));

    let client_routes = Router::new()
        .route("/", get(handlers::catalog::list_clients).post(handlers::catalog::create_client))
        .route("/{id}", get(handlers::catalog::get_client).put(handlers::catalog::update_client))
        .route("/{id}/activate", post(handlers::catalog::activate_client))
        .route("/{id}/deactivate", post(handlers::catalog::deactivate_client));

    let category_routes = Router::new()
        .route("/", get(handlers::catalog::list_categories).post(handlers::catalog::create_category))
        .route(
            "/{id}",
            put(handlers::catalog::update_category).delete(handlers::catalog::delete_category),
        );

    let product_routes = Router::new()
        .route("/", get(handlers::catalog::list_products).post(handlers::catalog::create_product))
        .route("/{id}", get(handlers::catalog::get_product).put(handlers::catalog::update_product))
        .route("/{id}/activate", post(handlers::catalog::activate_product))
        .route("/{id}/deactivate", post(handlers::catalog::deactivate_product));

    let route_routes = Router::new()
        .route("/", get(handlers::routes::list_routes).post(handlers::routes::create_route))
        .route("/{id}", get(handlers::routes::get_route).put(handlers::routes::update_route))
        .route("/{id}/activate", post(handlers::routes::activate_route))
        .route("/{id}/deactivate", post(handlers::routes::deactivate_route))
        .route("/{id}/stops", post(handlers::routes::add_stop))
        .route("/{id}/stops/order", put(handlers::routes::reorder_stops))
        .route("/{id}/stops/{detail_id}", axum::routing::delete(handlers::routes::remove_stop));

    let assignment_routes = Router::new()
        .route(
            "/",
            get(handlers::assignments::list_assignments).post(handlers::assignments::create_assignment),
        )
        .route("/{id}", get(handlers::assignments::get_assignment))
        .route("/{id}/finish", post(handlers::assignments::finish_assignment))
        .route("/{id}/regenerate", post(handlers::assignments::regenerate_plans))
        .route("/{id}/plans", post(handlers::assignments::generate_for_date));

    let planning_routes = Router::new()
        .route("/today", get(handlers::planning::get_day_plan))
        .route("/new-client", post(handlers::planning::register_new_client))
        .route("/{id}/start", post(handlers::planning::start_visit))
        .route("/{id}/not-visited", post(handlers::planning::mark_not_visited));

    let sale_routes = Router::new()
        .route("/", get(handlers::transactions::list_sales).post(handlers::transactions::create_sale))
        .route("/{id}", get(handlers::transactions::get_sale))
        .route("/{id}/receipt", get(handlers::documents::sale_receipt));

    let order_routes = Router::new()
        .route("/", get(handlers::transactions::list_orders).post(handlers::transactions::create_order))
        .route("/{id}", get(handlers::transactions::get_order))
        .route("/{id}/status", put(handlers::transactions::set_order_status))
        .route("/{id}/receipt", get(handlers::documents::order_receipt));

    let truck_routes = Router::new()
        .route("/", get(handlers::trucks::list_trucks).post(handlers::trucks::create_truck))
        .route("/{id}", get(handlers::trucks::get_truck).put(handlers::trucks::update_truck))
        .route("/{id}/activate", post(handlers::trucks::activate_truck))
        .route("/{id}/deactivate", post(handlers::trucks::deactivate_truck))
        .route("/{id}/routes", post(handlers::trucks::assign_route));

    let load_routes = Router::new()
        .route("/", get(handlers::trucks::list_loads).post(handlers::trucks::create_load))
        .route("/{id}", get(handlers::trucks::get_load))
        .route("/{id}/lines", post(handlers::trucks::add_load_line))
        .route("/{id}/lines/{line_id}", axum::routing::delete(handlers::trucks::remove_load_line))
        .route("/{id}/close", post(handlers::trucks::close_load))
        .route("/{id}/reconciliation", post(handlers::trucks::create_reconciliation));

    let reconciliation_routes = Router::new()
        .route("/", get(handlers::trucks::list_reconciliations))
        .route("/{id}", get(handlers::trucks::get_reconciliation))
        .route("/{id}/lines/{line_id}", put(handlers::trucks::update_reconciliation_line))
        .route("/{id}/finalize", post(handlers::trucks::finalize_reconciliation));

    let protected_routes = Router::new()
        .route("/api/auth/me", get(handlers::auth::get_me))
        .nest("/api/users", user_routes)
        .nest("/api/clients", client_routes)
        .nest("/api/categories", category_routes)
        .nest("/api/products", product_routes)
        .nest("/api/routes", route_routes)
        .nest("/api/assignments", assignment_routes)
        .nest("/api/planning", planning_routes)
        .route("/api/visits/{detail_id}/finish", post(handlers::planning::finish_visit))
        .nest("/api/sales", sale_routes)
        .nest("/api/orders", order_routes)
        .nest("/api/trucks", truck_routes)
        .nest("/api/loads", load_routes)
        .nest("/api/reconciliations", reconciliation_routes)
        .route("/api/dashboard", get(handlers::dashboard::get_dashboard))
        .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    Router::new()
        .merge(public_routes)
        .merge(logout_route)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let app_state = AppState::new().await.context("Falha ao inicializar o estado da aplicação")?;

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados")?;

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let addr = app_state.settings.bind_addr.clone();
    let app = build_router(app_state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("Erro no servidor Axum")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_settings;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let settings = test_settings();
        // Pool preguiçoso: nenhuma destas rotas chega ao banco
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy(&settings.database_url)
            .unwrap();
        build_router(AppState::build(settings, pool).unwrap())
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = test_router()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn logout_only_accepts_post() {
        let response = test_router()
            .oneshot(Request::get("/api/auth/logout").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn logout_still_requires_a_token() {
        let response = test_router()
            .oneshot(Request::post("/api/auth/logout").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    fn login_body(size: usize) -> Body {
        // username vazio: a validação responde antes de tocar no banco
        let padding = "x".repeat(size);
        Body::from(format!(r#"{{"username":"","password":"","padding":"{}"}}"#, padding))
    }

    #[tokio::test]
    async fn bodies_the_size_of_an_encoded_photo_are_accepted() {
        let response = test_router()
            .oneshot(
                Request::post("/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(login_body(7 * 1024 * 1024))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = test_router()
            .oneshot(
                Request::post("/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(login_body(9 * 1024 * 1024))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        for uri in ["/api/auth/me", "/api/routes", "/api/planning/today", "/api/dashboard", "/api/trucks"] {
            let response = test_router()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }

    #[tokio::test]
    async fn malformed_token_is_rejected_before_the_database() {
        let response = test_router()
            .oneshot(
                Request::get("/api/sales")
                    .header(header::AUTHORIZATION, "Bearer nao-e-um-jwt")
                    .header(header::ACCEPT_LANGUAGE, "en")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let response = test_router()
            .oneshot(Request::get("/api/docs/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
