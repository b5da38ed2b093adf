// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::get_me,

        // --- Users ---
        handlers::users::list_users,
        handlers::users::list_inactive_users,
        handlers::users::get_user,
        handlers::users::create_user,
        handlers::users::update_user,
        handlers::users::toggle_user_active,
        handlers::users::deactivate_user,

        // --- Catálogo ---
        handlers::catalog::list_clients,
        handlers::catalog::get_client,
        handlers::catalog::create_client,
        handlers::catalog::update_client,
        handlers::catalog::activate_client,
        handlers::catalog::deactivate_client,
        handlers::catalog::list_categories,
        handlers::catalog::create_category,
        handlers::catalog::update_category,
        handlers::catalog::delete_category,
        handlers::catalog::list_products,
        handlers::catalog::get_product,
        handlers::catalog::create_product,
        handlers::catalog::update_product,
        handlers::catalog::activate_product,
        handlers::catalog::deactivate_product,

        // --- Rotas ---
        handlers::routes::list_routes,
        handlers::routes::get_route,
        handlers::routes::create_route,
        handlers::routes::update_route,
        handlers::routes::activate_route,
        handlers::routes::deactivate_route,
        handlers::routes::add_stop,
        handlers::routes::remove_stop,
        handlers::routes::reorder_stops,

        // --- Atribuições ---
        handlers::assignments::list_assignments,
        handlers::assignments::get_assignment,
        handlers::assignments::create_assignment,
        handlers::assignments::finish_assignment,
        handlers::assignments::regenerate_plans,
        handlers::assignments::generate_for_date,

        // --- Trabalho de campo ---
        handlers::planning::get_day_plan,
        handlers::planning::start_visit,
        handlers::planning::mark_not_visited,
        handlers::planning::finish_visit,
        handlers::planning::register_new_client,

        // --- Vendas e pedidos ---
        handlers::transactions::list_sales,
        handlers::transactions::get_sale,
        handlers::transactions::create_sale,
        handlers::transactions::list_orders,
        handlers::transactions::get_order,
        handlers::transactions::create_order,
        handlers::transactions::set_order_status,
        handlers::documents::sale_receipt,
        handlers::documents::order_receipt,

        // --- Camiões ---
        handlers::trucks::list_trucks,
        handlers::trucks::get_truck,
        handlers::trucks::create_truck,
        handlers::trucks::update_truck,
        handlers::trucks::activate_truck,
        handlers::trucks::deactivate_truck,
        handlers::trucks::assign_route,
        handlers::trucks::list_loads,
        handlers::trucks::get_load,
        handlers::trucks::create_load,
        handlers::trucks::add_load_line,
        handlers::trucks::remove_load_line,
        handlers::trucks::close_load,
        handlers::trucks::create_reconciliation,
        handlers::trucks::list_reconciliations,
        handlers::trucks::get_reconciliation,
        handlers::trucks::update_reconciliation_line,
        handlers::trucks::finalize_reconciliation,

        // --- Dashboard ---
        handlers::dashboard::get_dashboard,
    ),
    components(
        schemas(
            // --- Auth ---
            models::rbac::Role,
            models::auth::User,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,
            models::users::UserPayload,

            // --- Catálogo ---
            models::catalog::Client,
            models::catalog::ClientPayload,
            models::catalog::Category,
            models::catalog::CategoryPayload,
            models::catalog::ProductStatus,
            models::catalog::Product,
            models::catalog::ProductView,
            models::catalog::ProductPayload,

            // --- Rotas ---
            models::routes::Route,
            models::routes::RouteSummary,
            models::routes::RouteDetail,
            models::routes::RouteStop,
            models::routes::RouteWithStops,
            models::routes::RoutePayload,
            models::routes::AddStopPayload,
            models::routes::ReorderPayload,

            // --- Atribuições ---
            models::assignments::Assignment,
            models::assignments::AssignmentStatus,
            models::assignments::AssignmentView,
            models::assignments::AssignmentDetail,
            models::assignments::AssignmentPayload,
            models::assignments::CreatedAssignment,

            // --- Planejamento ---
            models::planning::PlanKind,
            models::planning::VisitState,
            models::planning::Planning,
            models::planning::PlanDetail,
            models::planning::PlanningRow,
            models::planning::DayPlanEntry,
            models::planning::DayPlan,
            models::planning::GenerationResult,
            models::planning::StartVisitPayload,
            models::planning::FinishVisitPayload,
            models::planning::NotVisitedReason,
            models::planning::NotVisitedPayload,
            models::planning::GenerateForDatePayload,
            models::planning::NewClientVisit,

            // --- Vendas e pedidos ---
            models::transactions::SaleStatus,
            models::transactions::OrderStatus,
            models::transactions::Sale,
            models::transactions::Order,
            models::transactions::TransactionLine,
            models::transactions::SaleDetail,
            models::transactions::OrderDetail,
            models::transactions::LinePayload,
            models::transactions::SalePayload,
            models::transactions::OrderPayload,
            models::transactions::OrderStatusPayload,

            // --- Camiões ---
            models::trucks::Truck,
            models::trucks::TruckPayload,
            models::trucks::TruckRoute,
            models::trucks::TruckRoutePayload,
            models::trucks::TruckWithHistory,
            models::trucks::TruckLoad,
            models::trucks::LoadLine,
            models::trucks::LoadDetail,
            models::trucks::LoadPayload,
            models::trucks::LoadLinePayload,
            models::trucks::ReconciliationStatus,
            models::trucks::Reconciliation,
            models::trucks::ReconciliationLine,
            models::trucks::DaySummary,
            models::trucks::ReconciliationDetail,
            models::trucks::ReconciliationLinePayload,
            models::trucks::ReconciliationPayload,

            // --- Dashboard ---
            models::dashboard::ManagerSummary,
            models::dashboard::SalespersonSummary,
            models::dashboard::Dashboard,
        )
    ),
    tags(
        (name = "Auth", description = "Login, logout e sessão"),
        (name = "Users", description = "Gestão de usuários (admin)"),
        (name = "Catalog", description = "Clientes, categorias e produtos"),
        (name = "Routes", description = "Rotas e paradas"),
        (name = "Assignments", description = "Atribuição de rotas a vendedores e geração de planos"),
        (name = "Planning", description = "Execução do plano do dia pelo vendedor"),
        (name = "Sales", description = "Vendas capturadas em visita"),
        (name = "Orders", description = "Pedidos capturados em visita"),
        (name = "Trucks", description = "Camiões, carga diária e cuadre de fim de dia"),
        (name = "Documents", description = "Comprovantes em PDF"),
        (name = "Dashboard", description = "Indicadores da página inicial")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
