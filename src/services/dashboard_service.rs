// src/services/dashboard_service.rs

use crate::{
    common::error::AppError,
    db::DashboardRepository,
    models::{auth::User, dashboard::Dashboard, rbac::Action},
    services::planning_service::today,
};

#[derive(Clone)]
pub struct DashboardService {
    repo: DashboardRepository,
}

impl DashboardService {
    pub fn new(repo: DashboardRepository) -> Self {
        Self { repo }
    }

    /// Painel inicial: gestão vê os números gerais, o vendedor o seu dia.
    pub async fn get_dashboard(&self, user: &User) -> Result<Dashboard, AppError> {
        let today = today();
        if user.can(Action::ViewReports) {
            return Ok(Dashboard::Manager(self.repo.manager_summary(today).await?));
        }
        Ok(Dashboard::Salesperson(self.repo.salesperson_summary(user.id, today).await?))
    }
}
