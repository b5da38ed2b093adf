// src/services/planning_service.rs

use chrono::{Local, NaiveDate};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        geo::{check_location, VISIT_MARGIN_M},
        media::StoredPhoto,
    },
    db::{planning_repo::ArrivalRecord, AssignmentRepository, PlanningRepository, RouteRepository},
    models::{
        assignments::AssignmentView,
        auth::User,
        catalog::ClientPayload,
        planning::{
            append_closing_notes, expand_plans, DayPlan, FinishVisitPayload, GenerationResult, NewClientVisit,
            NotVisitedPayload, PlanDetail, PlanKind, StartVisitPayload, VisitContext, VisitState,
        },
        routes::suggested_order,
    },
    services::catalog_service::CatalogService,
};

/// Data de hoje no fuso do servidor.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Clone)]
pub struct PlanningService {
    planning_repo: PlanningRepository,
    assignment_repo: AssignmentRepository,
    route_repo: RouteRepository,
    catalog_service: CatalogService,
    pool: PgPool,
}

impl PlanningService {
    pub fn new(
        planning_repo: PlanningRepository,
        assignment_repo: AssignmentRepository,
        route_repo: RouteRepository,
        catalog_service: CatalogService,
        pool: PgPool,
    ) -> Self {
        Self { planning_repo, assignment_repo, route_repo, catalog_service, pool }
    }

    // ---
    // Geração
    // ---

    /// Grava os planos de [from, to] para as paradas ativas da rota, na conexão de quem chama.
    /// Devolve quantas visitas novas foram criadas.
    pub async fn persist_window(
        &self,
        conn: &mut PgConnection,
        assignment_id: Uuid,
        route_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<u64, AppError> {
        let stops = self.route_repo.plan_stops(&mut *conn, route_id).await?;
        if stops.is_empty() {
            return Err(AppError::conflict("routes.no_stops"));
        }

        let mut created = 0;
        for slot in expand_plans(&stops, from, to) {
            if self
                .planning_repo
                .insert_slot(&mut *conn, assignment_id, slot.route_detail_id, slot.date, PlanKind::Planned)
                .await?
            {
                created += 1;
            }
        }
        Ok(created)
    }

    pub async fn remove_unstarted(
        &self,
        conn: &mut PgConnection,
        assignment_id: Uuid,
        from: NaiveDate,
    ) -> Result<u64, AppError> {
        self.planning_repo.delete_unstarted_from(&mut *conn, assignment_id, from).await
    }

    /// Gera os planos de um único dia da atribuição.
    pub async fn generate_for_date(&self, assignment_id: Uuid, date: NaiveDate) -> Result<GenerationResult, AppError> {
        let mut tx = self.pool.begin().await?;

        let assignment = self
            .assignment_repo
            .find_by_id(&mut *tx, assignment_id)
            .await?
            .ok_or(AppError::ResourceNotFound("assignment"))?;

        if !assignment.period().contains(date) {
            return Err(AppError::field("date", "date_outside_assignment"));
        }

        let plans_created = self
            .persist_window(&mut tx, assignment.id, assignment.route_id, date, date)
            .await?;

        tx.commit().await?;
        tracing::info!("{} planos gerados para a atribuição {} em {}", plans_created, assignment.id, date);
        Ok(GenerationResult { assignment_id, from: date, to: date, plans_created, plans_removed: 0 })
    }

    // ---
    // Trabalho de campo
    // ---

    /// O plano do dia do vendedor, com o detalhe de cada visita.
    pub async fn day_plan(&self, user: &User, date: NaiveDate) -> Result<DayPlan, AppError> {
        if !user.active {
            return Err(AppError::InactiveAccount);
        }

        let assignment = self
            .assignment_repo
            .active_for_salesperson(user.id, date)
            .await?
            .ok_or_else(|| AppError::conflict("planning.no_active_assignment"))?;

        self.planning_repo.ensure_details_for_day(assignment.id, date).await?;
        let entries = self.planning_repo.day_entries(assignment.id, date).await?;

        let visited = entries.iter().filter(|e| e.detail.visit_finished()).count();
        let in_progress = entries.iter().find(|e| e.visit_in_progress).map(|e| e.detail.planning_id);

        Ok(DayPlan {
            date,
            assignment: AssignmentView::new(assignment, date),
            entries,
            visited,
            in_progress,
        })
    }

    // Só o vendedor da atribuição mexe nos planos dela
    pub(crate) fn ensure_owner(user: &User, context: &VisitContext) -> Result<(), AppError> {
        if context.salesperson_id != user.id {
            tracing::warn!("Usuário {} tentou operar o plano {} de outro vendedor", user.id, context.planning_id);
            return Err(AppError::Forbidden("forbidden.plan_owner"));
        }
        Ok(())
    }

    pub async fn start_visit(
        &self,
        user: &User,
        planning_id: Uuid,
        payload: &StartVisitPayload,
    ) -> Result<PlanDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let context = self
            .planning_repo
            .visit_context(&mut *tx, planning_id)
            .await?
            .ok_or(AppError::ResourceNotFound("planning"))?;
        Self::ensure_owner(user, &context)?;

        let detail = self.planning_repo.lock_detail_for_planning(&mut tx, planning_id).await?;
        if let Some(key) = detail.start_blocker() {
            return Err(AppError::conflict(key));
        }

        let photo = match payload.photo.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            Some(encoded) => Some(self.catalog_service.media().save_photo("visits", encoded).await?),
            None => None,
        };

        let result = self.record_start(tx, &context, detail.id, payload, photo.as_ref()).await;
        if let (Err(_), Some(stored)) = (&result, &photo) {
            self.catalog_service.media().discard(&stored.path).await;
        }
        let (detail, duplicate_photo) = result?;
        tracing::info!("Visita {} iniciada pelo vendedor {} (foto repetida: {})", detail.id, user.id, duplicate_photo);
        Ok(detail)
    }

    // Grava a chegada e faz o commit; a foto já está em disco
    async fn record_start(
        &self,
        mut tx: sqlx::Transaction<'_, sqlx::Postgres>,
        context: &VisitContext,
        detail_id: Uuid,
        payload: &StartVisitPayload,
        photo: Option<&StoredPhoto>,
    ) -> Result<(PlanDetail, bool), AppError> {
        let duplicate_photo = match photo {
            Some(stored) => self.planning_repo.photo_hash_exists(&mut *tx, &stored.hash, detail_id).await?,
            None => false,
        };

        let location = check_location(
            (context.client_latitude, context.client_longitude),
            (Some(payload.latitude), Some(payload.longitude)),
            VISIT_MARGIN_M,
        );
        if let Some(check) = &location {
            if !check.valid {
                tracing::warn!("Visita {} a {:.0} m do cliente {}", detail_id, check.distance_m, context.client_id);
            }
        }

        let arrival = ArrivalRecord {
            latitude: payload.latitude,
            longitude: payload.longitude,
            photo: photo.map(|p| p.path.as_str()),
            photo_hash: photo.map(|p| p.hash.as_str()),
            duplicate_photo,
            location_valid: location.map(|c| c.valid),
        };
        let detail = self.planning_repo.record_arrival(&mut *tx, detail_id, &arrival).await?;

        tx.commit().await?;
        Ok((detail, duplicate_photo))
    }

    pub async fn finish_visit(
        &self,
        user: &User,
        detail_id: Uuid,
        payload: &FinishVisitPayload,
    ) -> Result<PlanDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let context = self
            .planning_repo
            .visit_context_by_detail(&mut *tx, detail_id)
            .await?
            .ok_or(AppError::ResourceNotFound("visit"))?;
        Self::ensure_owner(user, &context)?;

        let detail = self
            .planning_repo
            .lock_detail(&mut *tx, detail_id)
            .await?
            .ok_or(AppError::ResourceNotFound("visit"))?;
        if !detail.visit_in_progress() {
            return Err(AppError::conflict("visit.not_in_progress"));
        }

        let notes = append_closing_notes(&detail.notes, payload.notes.as_deref());
        let detail = self.planning_repo.record_departure(&mut *tx, detail.id, &notes).await?;

        tx.commit().await?;
        tracing::info!("Visita {} encerrada pelo vendedor {}", detail.id, user.id);
        Ok(detail)
    }

    pub async fn mark_not_visited(
        &self,
        user: &User,
        planning_id: Uuid,
        payload: &NotVisitedPayload,
    ) -> Result<PlanDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let context = self
            .planning_repo
            .visit_context(&mut *tx, planning_id)
            .await?
            .ok_or(AppError::ResourceNotFound("planning"))?;
        Self::ensure_owner(user, &context)?;

        let detail = self.planning_repo.lock_detail_for_planning(&mut tx, planning_id).await?;
        if let Some(key) = detail.start_blocker() {
            return Err(AppError::conflict(key));
        }

        let state = VisitState::from(payload.reason);
        let detail = self
            .planning_repo
            .set_state(&mut *tx, detail.id, state, payload.notes.trim())
            .await?;

        tx.commit().await?;
        tracing::info!("Plano {} marcado como {:?}", planning_id, state);
        Ok(detail)
    }

    /// Cadastro de cliente em campo: cliente novo, parada no fim da rota e visita não planejada hoje.
    pub async fn register_new_client(&self, user: &User, payload: &ClientPayload) -> Result<NewClientVisit, AppError> {
        let date = today();
        let assignment = self
            .assignment_repo
            .active_for_salesperson(user.id, date)
            .await?
            .ok_or_else(|| AppError::conflict("planning.no_active_assignment"))?;

        let mut tx = self.pool.begin().await?;

        let client = self.catalog_service.insert_client(&mut *tx, payload).await?;
        let visit_order = suggested_order(self.route_repo.max_order(&mut *tx, assignment.route_id).await?);

        let stop = self
            .route_repo
            .add_stop(&mut *tx, assignment.route_id, client.id, visit_order)
            .await?
            .ok_or_else(|| AppError::field("clientId", "client_already_in_route"))?;

        let planning_created = self
            .planning_repo
            .insert_slot(&mut *tx, assignment.id, stop.id, date, PlanKind::Unplanned)
            .await?;

        tx.commit().await?;
        tracing::info!(
            "Cliente {} cadastrado em campo por {} na rota {} (ordem {})",
            client.id,
            user.id,
            assignment.route_id,
            visit_order
        );
        Ok(NewClientVisit { client, stop, planning_created })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::fixtures, models::rbac::Role};
    use rust_decimal::Decimal;

    #[sqlx::test]
    #[ignore = "requer PostgreSQL"]
    async fn visit_goes_from_arrival_to_departure_once(pool: PgPool) {
        let seller = fixtures::user(&pool, "vend1", Role::Salesperson).await;
        let (route_id, _) = fixtures::route_with_clients(&pool, "Occidente", 1).await;
        let assignment_id = fixtures::assignment(&pool, route_id, seller.id, today(), None).await;
        let service = fixtures::state(pool.clone()).planning_service;

        service.generate_for_date(assignment_id, today()).await.unwrap();
        let planning_id: Uuid = sqlx::query_scalar("SELECT id FROM plannings WHERE assignment_id = $1")
            .bind(assignment_id)
            .fetch_one(&pool)
            .await
            .unwrap();

        let at_client = StartVisitPayload {
            latitude: Decimal::new(146349, 4),
            longitude: Decimal::new(-905069, 4),
            photo: None,
        };
        let started = service.start_visit(&seller, planning_id, &at_client).await.unwrap();
        assert_eq!(started.state, VisitState::Visited);
        assert_eq!(started.location_valid, Some(true));
        assert!(matches!(
            service.start_visit(&seller, planning_id, &at_client).await,
            Err(AppError::Conflict { key: "visit.already_in_progress", .. })
        ));

        let day = service.day_plan(&seller, today()).await.unwrap();
        assert_eq!(day.in_progress, Some(planning_id));

        let finished = service
            .finish_visit(&seller, started.id, &FinishVisitPayload { notes: Some("Pidió más producto".into()) })
            .await
            .unwrap();
        assert!(finished.left_at.is_some());
        assert!(matches!(
            service.finish_visit(&seller, started.id, &FinishVisitPayload { notes: None }).await,
            Err(AppError::Conflict { key: "visit.not_in_progress", .. })
        ));
    }

    #[sqlx::test]
    #[ignore = "requer PostgreSQL"]
    async fn failed_arrival_leaves_no_photo_behind(pool: PgPool) {
        let seller = fixtures::user(&pool, "vend1", Role::Salesperson).await;
        let (route_id, _) = fixtures::route_with_clients(&pool, "Oriente", 1).await;
        let assignment_id = fixtures::assignment(&pool, route_id, seller.id, today(), None).await;
        let media_root = std::env::temp_dir().join(format!("rutas-media-{}", Uuid::new_v4()));
        let service = fixtures::state_with_media(pool.clone(), &media_root).planning_service;

        service.generate_for_date(assignment_id, today()).await.unwrap();
        let planning_id: Uuid = sqlx::query_scalar("SELECT id FROM plannings WHERE assignment_id = $1")
            .bind(assignment_id)
            .fetch_one(&pool)
            .await
            .unwrap();

        // Latitude fora de NUMERIC(10,7): o UPDATE falha depois da foto gravada
        let payload = StartVisitPayload {
            latitude: Decimal::new(12345, 0),
            longitude: Decimal::new(-905069, 4),
            photo: Some(fixtures::JPEG_BASE64.to_string()),
        };
        assert!(service.start_visit(&seller, planning_id, &payload).await.is_err());

        let leftover = match std::fs::read_dir(media_root.join("visits")) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        };
        assert_eq!(leftover, 0);

        let state: VisitState = sqlx::query_scalar(
            "SELECT rd.state FROM plan_details rd WHERE rd.planning_id = $1",
        )
        .bind(planning_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_ne!(state, VisitState::Visited);
        let _ = std::fs::remove_dir_all(&media_root);
    }

    #[sqlx::test]
    #[ignore = "requer PostgreSQL"]
    async fn field_client_goes_after_the_highest_stop(pool: PgPool) {
        let seller = fixtures::user(&pool, "vend1", Role::Salesperson).await;
        let (route_id, stops) = fixtures::route_with_clients(&pool, "Norte", 3).await;
        fixtures::assignment(&pool, route_id, seller.id, today(), None).await;
        let state = fixtures::state(pool.clone());

        // Sobram as ordens 2 e 3: contar paradas daria 3 de novo
        state.route_service.remove_stop(route_id, stops[0]).await.unwrap();

        let payload: ClientPayload = serde_json::from_value(serde_json::json!({
            "nit": "CF-9001",
            "name": "Tienda Nueva",
            "phone": "55551234",
            "address": "Aldea El Rosario"
        }))
        .unwrap();
        let created = state.planning_service.register_new_client(&seller, &payload).await.unwrap();
        assert_eq!(created.stop.visit_order, 4);
        assert!(created.planning_created);
    }

    #[sqlx::test]
    #[ignore = "requer PostgreSQL"]
    async fn salesperson_without_assignment_has_no_day_plan(pool: PgPool) {
        let seller = fixtures::user(&pool, "vend1", Role::Salesperson).await;
        let service = fixtures::state(pool.clone()).planning_service;

        assert!(matches!(
            service.day_plan(&seller, today()).await,
            Err(AppError::Conflict { key: "planning.no_active_assignment", .. })
        ));
    }
}
