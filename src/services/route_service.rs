// src/services/route_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::{unique_to_field, AppError},
        pagination::{self, Page, PageParams},
    },
    db::{ClientRepository, RouteRepository},
    models::routes::{
        plan_reorder, suggested_order, AddStopPayload, ReorderPayload, Route, RouteDetail, RoutePayload,
        RouteSummary, RouteWithStops,
    },
};

const ROUTE_UNIQUE_FIELDS: &[(&str, &str, &'static str)] = &[("routes_name_key", "name", "route_name_taken")];

#[derive(Clone)]
pub struct RouteService {
    route_repo: RouteRepository,
    client_repo: ClientRepository,
    pool: PgPool,
}

impl RouteService {
    pub fn new(route_repo: RouteRepository, client_repo: ClientRepository, pool: PgPool) -> Self {
        Self { route_repo, client_repo, pool }
    }

    pub async fn list_routes(&self, params: &PageParams, include_inactive: bool) -> Result<Page<RouteSummary>, AppError> {
        let total = self.route_repo.count(include_inactive).await?;
        let window = pagination::window(params, total);
        let routes = self.route_repo.list(include_inactive, window).await?;
        Ok(Page::new(routes, window, total))
    }

    pub async fn get_route(&self, id: Uuid) -> Result<RouteWithStops, AppError> {
        let route = self
            .route_repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::ResourceNotFound("route"))?;
        let stops = self.route_repo.stops(id).await?;
        Ok(RouteWithStops { route, stops })
    }

    pub async fn create_route(&self, payload: &RoutePayload) -> Result<Route, AppError> {
        let route = self
            .route_repo
            .create(payload.name.trim(), payload.description.trim())
            .await
            .map_err(|e| unique_to_field(e, ROUTE_UNIQUE_FIELDS))?;
        tracing::info!("Rota {} criada ({})", route.id, route.name);
        Ok(route)
    }

    pub async fn update_route(&self, id: Uuid, payload: &RoutePayload) -> Result<Route, AppError> {
        let route = self
            .route_repo
            .update(id, payload.name.trim(), payload.description.trim())
            .await
            .map_err(|e| unique_to_field(e, ROUTE_UNIQUE_FIELDS))?
            .ok_or(AppError::ResourceNotFound("route"))?;
        tracing::info!("Rota {} atualizada", route.id);
        Ok(route)
    }

    pub async fn set_route_active(&self, id: Uuid, active: bool) -> Result<Route, AppError> {
        let route = self
            .route_repo
            .set_active(id, active)
            .await?
            .ok_or(AppError::ResourceNotFound("route"))?;
        tracing::info!("Rota {} ativa = {}", route.id, active);
        Ok(route)
    }

    /// Adiciona o cliente à rota. Sem ordem informada, vai para o final.
    pub async fn add_stop(&self, route_id: Uuid, payload: &AddStopPayload) -> Result<RouteDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        self.route_repo
            .find_by_id(&mut *tx, route_id)
            .await?
            .ok_or(AppError::ResourceNotFound("route"))?;

        let client = self
            .client_repo
            .find_by_id(&mut *tx, payload.client_id)
            .await?
            .filter(|c| c.active)
            .ok_or_else(|| AppError::field("clientId", "client_not_found"))?;

        let visit_order = match payload.visit_order {
            Some(order) => order,
            None => suggested_order(self.route_repo.max_order(&mut *tx, route_id).await?),
        };

        let detail = self
            .route_repo
            .add_stop(&mut *tx, route_id, client.id, visit_order)
            .await?
            .ok_or_else(|| AppError::field("clientId", "client_already_in_route"))?;

        tx.commit().await?;
        tracing::info!("Cliente {} adicionado à rota {} na ordem {}", client.id, route_id, visit_order);
        Ok(detail)
    }

    pub async fn remove_stop(&self, route_id: Uuid, detail_id: Uuid) -> Result<(), AppError> {
        if !self.route_repo.remove_stop(&self.pool, route_id, detail_id).await? {
            return Err(AppError::ResourceNotFound("route_stop"));
        }
        tracing::info!("Parada {} removida da rota {}", detail_id, route_id);
        Ok(())
    }

    /// Reordena as paradas ativas numa única transação.
    pub async fn reorder_stops(&self, route_id: Uuid, payload: &ReorderPayload) -> Result<RouteWithStops, AppError> {
        let mut tx = self.pool.begin().await?;

        self.route_repo
            .find_by_id(&mut *tx, route_id)
            .await?
            .ok_or(AppError::ResourceNotFound("route"))?;

        let current = self.route_repo.detail_ids(&mut *tx, route_id).await?;
        let plan = plan_reorder(&current, &payload.detail_ids).map_err(|e| AppError::FieldErrors(vec![e]))?;

        for (detail_id, visit_order) in &plan {
            self.route_repo.set_order(&mut *tx, *detail_id, *visit_order).await?;
        }

        tx.commit().await?;
        tracing::info!("Rota {} reordenada ({} paradas)", route_id, plan.len());
        self.get_route(route_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures;

    #[sqlx::test]
    #[ignore = "requer PostgreSQL"]
    async fn stops_go_to_the_end_and_never_repeat(pool: PgPool) {
        let (route_id, stops) = fixtures::route_with_clients(&pool, "Sur", 2).await;
        let existing: Uuid = sqlx::query_scalar("SELECT client_id FROM route_details WHERE id = $1")
            .bind(stops[0])
            .fetch_one(&pool)
            .await
            .unwrap();
        let newcomer = fixtures::client(&pool, "9988776-5").await;
        let service = fixtures::state(pool.clone()).route_service;

        let detail = service
            .add_stop(route_id, &AddStopPayload { client_id: newcomer, visit_order: None })
            .await
            .unwrap();
        assert_eq!(detail.visit_order, 3);

        let err = service
            .add_stop(route_id, &AddStopPayload { client_id: existing, visit_order: Some(1) })
            .await
            .unwrap_err();
        match err {
            AppError::FieldErrors(errors) => {
                assert_eq!(errors[0].field, "clientId");
                assert_eq!(errors[0].key, "client_already_in_route");
            }
            other => panic!("erro inesperado: {:?}", other),
        }
        assert_eq!(fixtures::count(&pool, "route_details").await, 3);
    }
}
