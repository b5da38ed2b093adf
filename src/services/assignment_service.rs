// src/services/assignment_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::{self, Page, PageParams},
    },
    db::{assignment_repo::AssignmentListFilter, AssignmentRepository, RouteRepository, UserRepository},
    models::{
        assignments::{
            validate_new_assignment, AssignmentDetail, AssignmentFilter, AssignmentPayload, AssignmentStatus,
            AssignmentView, CreatedAssignment, Period,
        },
        planning::GenerationResult,
    },
    services::planning_service::{today, PlanningService},
};

// Planos exibidos no detalhe da atribuição
const RECENT_PLANS: i64 = 30;

#[derive(Clone)]
pub struct AssignmentService {
    assignment_repo: AssignmentRepository,
    route_repo: RouteRepository,
    user_repo: UserRepository,
    planning_service: PlanningService,
    pool: PgPool,
}

impl AssignmentService {
    pub fn new(
        assignment_repo: AssignmentRepository,
        route_repo: RouteRepository,
        user_repo: UserRepository,
        planning_service: PlanningService,
        pool: PgPool,
    ) -> Self {
        Self { assignment_repo, route_repo, user_repo, planning_service, pool }
    }

    pub async fn list_assignments(&self, filter: &AssignmentFilter) -> Result<Page<AssignmentView>, AppError> {
        let today = today();
        let list_filter = AssignmentListFilter {
            salesperson_id: filter.salesperson_id,
            route_id: filter.route_id,
            status: filter.status,
            today,
        };
        let params = PageParams { page: filter.page.clone() };

        let total = self.assignment_repo.count(&list_filter).await?;
        let window = pagination::window(&params, total);
        let assignments = self.assignment_repo.list(&list_filter, window).await?;

        let views = assignments.into_iter().map(|a| AssignmentView::new(a, today)).collect();
        Ok(Page::new(views, window, total))
    }

    pub async fn get_assignment(&self, id: Uuid) -> Result<AssignmentDetail, AppError> {
        let assignment = self
            .assignment_repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::ResourceNotFound("assignment"))?;
        let recent_plans = self.assignment_repo.recent_plans(id, RECENT_PLANS).await?;
        Ok(AssignmentDetail { assignment: AssignmentView::new(assignment, today()), recent_plans })
    }

    /// Cria a atribuição e gera os planos do período na mesma transação.
    pub async fn create_assignment(&self, payload: &AssignmentPayload) -> Result<CreatedAssignment, AppError> {
        let period = Period::new(payload.start_date, payload.end_date);
        let mut tx = self.pool.begin().await?;

        // O bloqueio do vendedor serializa atribuições concorrentes para ele
        let salesperson = self
            .user_repo
            .lock_by_id(&mut *tx, payload.salesperson_id)
            .await?
            .ok_or_else(|| AppError::field("salespersonId", "assignee_not_found"))?;

        let route = self
            .route_repo
            .find_by_id(&mut *tx, payload.route_id)
            .await?
            .filter(|r| r.active)
            .ok_or_else(|| AppError::field("routeId", "route_not_found"))?;

        let existing = self.assignment_repo.periods_for(&mut *tx, route.id, salesperson.id).await?;
        validate_new_assignment(&salesperson, &period, &existing).map_err(AppError::FieldErrors)?;

        let id = self.assignment_repo.create(&mut *tx, route.id, salesperson.id, &period).await?;

        let plans_created = match period.generation_window(period.start) {
            Some((from, to)) => self.planning_service.persist_window(&mut tx, id, route.id, from, to).await?,
            None => 0,
        };

        tx.commit().await?;
        tracing::info!(
            "Atribuição {} criada: rota {} para o vendedor {} ({} planos)",
            id,
            route.id,
            salesperson.id,
            plans_created
        );

        let assignment = self
            .assignment_repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::ResourceNotFound("assignment"))?;
        Ok(CreatedAssignment { assignment: AssignmentView::new(assignment, today()), plans_created })
    }

    /// Encerra hoje a atribuição e desativa o vendedor.
    pub async fn finish_assignment(&self, id: Uuid) -> Result<AssignmentView, AppError> {
        let today = today();
        let mut tx = self.pool.begin().await?;

        let assignment = self
            .assignment_repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or(AppError::ResourceNotFound("assignment"))?;

        if assignment.period().status(today) == AssignmentStatus::Finished {
            return Err(AppError::conflict("assignments.already_finished"));
        }

        // Atribuição futura termina no próprio início
        let end_date = today.max(assignment.start_date);
        self.assignment_repo.set_end_date(&mut *tx, id, end_date).await?;
        self.user_repo.set_active(&mut *tx, assignment.salesperson_id, false).await?;

        tx.commit().await?;
        tracing::info!(
            "Atribuição {} encerrada em {}; vendedor {} desativado",
            id,
            end_date,
            assignment.salesperson_id
        );

        let assignment = self
            .assignment_repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::ResourceNotFound("assignment"))?;
        Ok(AssignmentView::new(assignment, today))
    }

    /// Apaga os planos futuros ainda não iniciados e gera de novo a partir de hoje.
    pub async fn regenerate_plans(&self, id: Uuid) -> Result<GenerationResult, AppError> {
        let today = today();
        let mut tx = self.pool.begin().await?;

        let assignment = self
            .assignment_repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or(AppError::ResourceNotFound("assignment"))?;

        let period = assignment.period();
        let (from, to) = period
            .generation_window(today)
            .ok_or_else(|| AppError::conflict("assignments.already_finished"))?;

        let plans_removed = self.planning_service.remove_unstarted(&mut tx, id, from).await?;
        let plans_created = self
            .planning_service
            .persist_window(&mut tx, id, assignment.route_id, from, to)
            .await?;

        tx.commit().await?;
        tracing::info!(
            "Planos da atribuição {} regenerados de {} a {}: {} removidos, {} criados",
            id,
            from,
            to,
            plans_removed,
            plans_created
        );
        Ok(GenerationResult { assignment_id: id, from, to, plans_removed, plans_created })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::fixtures, models::rbac::Role};
    use chrono::Duration;

    #[sqlx::test]
    #[ignore = "requer PostgreSQL"]
    async fn three_days_three_stops_make_nine_visits(pool: PgPool) {
        let seller = fixtures::user(&pool, "vend1", Role::Salesperson).await;
        let (route_id, stops) = fixtures::route_with_clients(&pool, "Oriente", 3).await;
        let state = fixtures::state(pool.clone());
        let start = today();

        let created = state
            .assignment_service
            .create_assignment(&AssignmentPayload {
                route_id,
                salesperson_id: seller.id,
                start_date: start,
                end_date: Some(start + Duration::days(2)),
            })
            .await
            .unwrap();
        assert_eq!(created.plans_created, 9);
        assert_eq!(fixtures::count(&pool, "plannings").await, 9);

        // Gerar de novo o mesmo dia não duplica
        let again = state
            .planning_service
            .generate_for_date(created.assignment.assignment.id, start + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(again.plans_created, 0);

        let day = state.planning_service.day_plan(&seller, start).await.unwrap();
        let orders: Vec<i32> = day.entries.iter().map(|e| e.visit_order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
        assert_eq!(day.entries[0].detail.planning_id, planning_of(&pool, stops[0], start).await);
        assert_eq!(day.visited, 0);
        assert!(day.in_progress.is_none());
    }

    async fn planning_of(pool: &PgPool, route_detail_id: Uuid, date: chrono::NaiveDate) -> Uuid {
        sqlx::query_scalar("SELECT id FROM plannings WHERE route_detail_id = $1 AND date = $2")
            .bind(route_detail_id)
            .bind(date)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test]
    #[ignore = "requer PostgreSQL"]
    async fn overlapping_assignment_is_rejected(pool: PgPool) {
        let seller = fixtures::user(&pool, "vend1", Role::Salesperson).await;
        let (route_id, _) = fixtures::route_with_clients(&pool, "Oriente", 1).await;
        fixtures::assignment(&pool, route_id, seller.id, today(), None).await;
        let service = fixtures::state(pool.clone()).assignment_service;

        let err = service
            .create_assignment(&AssignmentPayload {
                route_id,
                salesperson_id: seller.id,
                start_date: today() + Duration::days(5),
                end_date: None,
            })
            .await
            .unwrap_err();
        match err {
            AppError::FieldErrors(errors) => assert_eq!(errors[0].key, "assignment_overlap"),
            other => panic!("erro inesperado: {:?}", other),
        }
        assert_eq!(fixtures::count(&pool, "assignments").await, 1);
    }

    #[sqlx::test]
    #[ignore = "requer PostgreSQL"]
    async fn finishing_deactivates_the_salesperson(pool: PgPool) {
        let seller = fixtures::user(&pool, "vend1", Role::Salesperson).await;
        let (route_id, _) = fixtures::route_with_clients(&pool, "Oriente", 1).await;
        let id = fixtures::assignment(&pool, route_id, seller.id, today(), None).await;
        let state = fixtures::state(pool.clone());

        let view = state.assignment_service.finish_assignment(id).await.unwrap();
        assert_eq!(view.assignment.end_date, Some(today()));
        assert!(!state.user_service.get_user(seller.id).await.unwrap().active);
    }
}
