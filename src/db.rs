pub mod assignment_repo;
pub mod client_repo;
pub mod dashboard_repo;
pub mod planning_repo;
pub mod product_repo;
pub mod route_repo;
pub mod transaction_repo;
pub mod truck_repo;
pub mod user_repo;

pub use assignment_repo::AssignmentRepository;
pub use client_repo::ClientRepository;
pub use dashboard_repo::DashboardRepository;
pub use planning_repo::PlanningRepository;
pub use product_repo::ProductRepository;
pub use route_repo::RouteRepository;
pub use transaction_repo::TransactionRepository;
pub use truck_repo::TruckRepository;
pub use user_repo::UserRepository;

#[cfg(test)]
pub mod fixtures;
