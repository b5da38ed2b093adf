pub mod assignments;
pub mod auth;
pub mod catalog;
pub mod dashboard;
pub mod planning;
pub mod rbac;
pub mod routes;
pub mod transactions;
pub mod trucks;
pub mod users;
