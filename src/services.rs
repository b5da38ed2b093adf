pub mod assignment_service;
pub mod auth;
pub mod catalog_service;
pub mod dashboard_service;
pub mod document_service;
pub mod planning_service;
pub mod route_service;
pub mod transaction_service;
pub mod truck_service;
pub mod user_service;
