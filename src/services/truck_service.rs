// src/services/truck_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::{unique_to_field, AppError, FieldError},
        pagination::{self, Page, PageParams},
        validation::clean_optional,
    },
    db::{ProductRepository, RouteRepository, TruckRepository},
    models::trucks::{
        final_status, line_difference, normalize_plate, LoadDetail, LoadFilter, LoadLinePayload, LoadPayload,
        Reconciliation, ReconciliationDetail, ReconciliationLinePayload, ReconciliationPayload, ReconciliationStatus,
        Truck, TruckFilter, TruckLoad, TruckPayload, TruckRoute, TruckRoutePayload, TruckWithHistory,
    },
};

const TRUCK_UNIQUE_FIELDS: &[(&str, &str, &'static str)] = &[("trucks_plate_key", "plate", "plate_taken")];
const LOAD_UNIQUE_FIELDS: &[(&str, &str, &'static str)] = &[("truck_loads_truck_date_key", "date", "load_exists")];

#[derive(Clone)]
pub struct TruckService {
    truck_repo: TruckRepository,
    product_repo: ProductRepository,
    route_repo: RouteRepository,
    pool: PgPool,
}

impl TruckService {
    pub fn new(truck_repo: TruckRepository, product_repo: ProductRepository, route_repo: RouteRepository, pool: PgPool) -> Self {
        Self { truck_repo, product_repo, route_repo, pool }
    }

    // ---
    // Camiões
    // ---

    pub async fn list_trucks(&self, filter: &TruckFilter) -> Result<Page<Truck>, AppError> {
        let search = clean_optional(filter.search.as_deref());
        let params = PageParams { page: filter.page.clone() };

        let total = self.truck_repo.count(search.as_deref(), filter.include_inactive).await?;
        let window = pagination::window(&params, total);
        let trucks = self.truck_repo.list(search.as_deref(), filter.include_inactive, window).await?;
        Ok(Page::new(trucks, window, total))
    }

    pub async fn get_truck(&self, id: Uuid) -> Result<TruckWithHistory, AppError> {
        let truck = self
            .truck_repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::ResourceNotFound("truck"))?;
        let routes = self.truck_repo.truck_routes(id).await?;
        let recent_loads = self.truck_repo.recent_loads(id).await?;
        Ok(TruckWithHistory { truck, routes, recent_loads })
    }

    pub async fn create_truck(&self, payload: &TruckPayload) -> Result<Truck, AppError> {
        let truck = self
            .truck_repo
            .create(
                &normalize_plate(&payload.plate),
                payload.brand.trim(),
                payload.model.trim(),
                payload.year,
                payload.capacity_kg,
            )
            .await
            .map_err(|e| unique_to_field(e, TRUCK_UNIQUE_FIELDS))?;
        tracing::info!("Camião {} cadastrado ({})", truck.id, truck.plate);
        Ok(truck)
    }

    pub async fn update_truck(&self, id: Uuid, payload: &TruckPayload) -> Result<Truck, AppError> {
        let truck = self
            .truck_repo
            .update(
                id,
                &normalize_plate(&payload.plate),
                payload.brand.trim(),
                payload.model.trim(),
                payload.year,
                payload.capacity_kg,
            )
            .await
            .map_err(|e| unique_to_field(e, TRUCK_UNIQUE_FIELDS))?
            .ok_or(AppError::ResourceNotFound("truck"))?;
        tracing::info!("Camião {} atualizado", truck.id);
        Ok(truck)
    }

    /// Desativação é lógica: cargas e cuadres antigos continuam consultáveis.
    pub async fn set_truck_active(&self, id: Uuid, active: bool) -> Result<Truck, AppError> {
        let truck = self
            .truck_repo
            .set_active(id, active)
            .await?
            .ok_or(AppError::ResourceNotFound("truck"))?;
        tracing::info!("Camião {} ativo = {}", truck.id, active);
        Ok(truck)
    }

    pub async fn assign_route(&self, truck_id: Uuid, payload: &TruckRoutePayload) -> Result<TruckRoute, AppError> {
        if payload.end_date.is_some_and(|end| end < payload.start_date) {
            return Err(AppError::field("endDate", "end_before_start"));
        }

        let mut tx = self.pool.begin().await?;

        self.truck_repo
            .find_by_id(&mut *tx, truck_id)
            .await?
            .filter(|t| t.active)
            .ok_or(AppError::ResourceNotFound("truck"))?;
        self.active_route(&mut tx, payload.route_id).await?;

        let id = self
            .truck_repo
            .insert_truck_route(&mut *tx, truck_id, payload.route_id, payload.start_date, payload.end_date, payload.notes.trim())
            .await?;
        let assigned = self
            .truck_repo
            .find_truck_route(&mut *tx, id)
            .await?
            .ok_or(AppError::ResourceNotFound("truck_route"))?;

        tx.commit().await?;
        tracing::info!("Camião {} atribuído à rota {} a partir de {}", truck_id, payload.route_id, payload.start_date);
        Ok(assigned)
    }

    async fn active_route(&self, tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, route_id: Uuid) -> Result<(), AppError> {
        self.route_repo
            .find_by_id(&mut **tx, route_id)
            .await?
            .filter(|r| r.active)
            .ok_or_else(|| AppError::field("routeId", "route_not_found"))?;
        Ok(())
    }

    // ---
    // Cargas
    // ---

    pub async fn list_loads(&self, filter: &LoadFilter) -> Result<Page<TruckLoad>, AppError> {
        let params = PageParams { page: filter.page.clone() };
        let total = self.truck_repo.count_loads(filter.truck_id, filter.date).await?;
        let window = pagination::window(&params, total);
        let loads = self.truck_repo.list_loads(filter.truck_id, filter.date, window).await?;
        Ok(Page::new(loads, window, total))
    }

    pub async fn get_load(&self, id: Uuid) -> Result<LoadDetail, AppError> {
        let load = self
            .truck_repo
            .find_load(&self.pool, id)
            .await?
            .ok_or(AppError::ResourceNotFound("load"))?;
        let lines = self.truck_repo.load_lines(&self.pool, id).await?;
        Ok(LoadDetail::new(load, lines))
    }

    /// Abre a carga do dia. Sem atribuição aberta do camião na rota, cria uma a partir da data.
    pub async fn create_load(&self, payload: &LoadPayload) -> Result<LoadDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        self.truck_repo
            .find_by_id(&mut *tx, payload.truck_id)
            .await?
            .filter(|t| t.active)
            .ok_or_else(|| AppError::field("truckId", "truck_not_found"))?;
        self.active_route(&mut tx, payload.route_id).await?;

        let truck_route_id = match self.truck_repo.open_truck_route(&mut *tx, payload.truck_id, payload.route_id).await? {
            Some(id) => id,
            None => {
                self.truck_repo
                    .insert_truck_route(&mut *tx, payload.truck_id, payload.route_id, payload.date, None, "")
                    .await?
            }
        };

        let id = self
            .truck_repo
            .insert_load(&mut *tx, payload.truck_id, truck_route_id, payload.date, payload.notes.trim())
            .await
            .map_err(|e| unique_to_field(e, LOAD_UNIQUE_FIELDS))?;

        tx.commit().await?;
        tracing::info!("Carga {} aberta para o camião {} em {}", id, payload.truck_id, payload.date);
        self.get_load(id).await
    }

    // Trava a carga e garante que ainda aceita alterações
    async fn open_load(&self, tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, load_id: Uuid) -> Result<(), AppError> {
        let closed = self
            .truck_repo
            .lock_load(&mut **tx, load_id)
            .await?
            .ok_or(AppError::ResourceNotFound("load"))?;
        if closed {
            return Err(AppError::conflict("loads.closed"));
        }
        Ok(())
    }

    pub async fn add_load_line(&self, load_id: Uuid, payload: &LoadLinePayload) -> Result<LoadDetail, AppError> {
        let mut tx = self.pool.begin().await?;
        self.open_load(&mut tx, load_id).await?;

        let prices = self.product_repo.active_prices(&mut *tx, &[payload.product_id]).await?;
        if !prices.contains_key(&payload.product_id) {
            return Err(AppError::FieldErrors(vec![
                FieldError::new("productId", "product_unavailable").with_arg(payload.product_id.to_string()),
            ]));
        }

        self.truck_repo
            .insert_load_line(&mut *tx, load_id, payload.product_id, payload.quantity)
            .await?
            .ok_or_else(|| AppError::field("productId", "product_already_loaded"))?;

        tx.commit().await?;
        tracing::info!("Produto {} carregado ({}) na carga {}", payload.product_id, payload.quantity, load_id);
        self.get_load(load_id).await
    }

    pub async fn remove_load_line(&self, load_id: Uuid, line_id: Uuid) -> Result<LoadDetail, AppError> {
        let mut tx = self.pool.begin().await?;
        self.open_load(&mut tx, load_id).await?;

        if !self.truck_repo.delete_load_line(&mut *tx, load_id, line_id).await? {
            return Err(AppError::ResourceNotFound("load_line"));
        }

        tx.commit().await?;
        tracing::info!("Linha {} retirada da carga {}", line_id, load_id);
        self.get_load(load_id).await
    }

    /// Fecha a carga; carga vazia não fecha.
    pub async fn close_load(&self, load_id: Uuid) -> Result<LoadDetail, AppError> {
        let mut tx = self.pool.begin().await?;
        self.open_load(&mut tx, load_id).await?;

        if self.truck_repo.load_lines(&mut *tx, load_id).await?.is_empty() {
            return Err(AppError::conflict("loads.empty"));
        }
        self.truck_repo.close_load(&mut *tx, load_id).await?;

        tx.commit().await?;
        tracing::info!("Carga {} fechada", load_id);
        self.get_load(load_id).await
    }

    // ---
    // Cuadres
    // ---

    pub async fn list_reconciliations(&self, params: &PageParams) -> Result<Page<Reconciliation>, AppError> {
        let total = self.truck_repo.count_reconciliations().await?;
        let window = pagination::window(params, total);
        let items = self.truck_repo.list_reconciliations(window).await?;
        Ok(Page::new(items, window, total))
    }

    pub async fn get_reconciliation(&self, id: Uuid) -> Result<ReconciliationDetail, AppError> {
        let reconciliation = self
            .truck_repo
            .find_reconciliation(&self.pool, id)
            .await?
            .ok_or(AppError::ResourceNotFound("reconciliation"))?;
        let lines = self.truck_repo.reconciliation_lines(&self.pool, id).await?;
        let day = self
            .truck_repo
            .day_summary(reconciliation.load_id, reconciliation.route_id, reconciliation.date)
            .await?;
        Ok(ReconciliationDetail::new(reconciliation, lines, day))
    }

    /// Cuadre da carga fechada, uma linha por produto carregado.
    pub async fn create_reconciliation(&self, load_id: Uuid, payload: &ReconciliationPayload) -> Result<ReconciliationDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let closed = self
            .truck_repo
            .lock_load(&mut *tx, load_id)
            .await?
            .ok_or(AppError::ResourceNotFound("load"))?;
        if !closed {
            return Err(AppError::conflict("loads.not_closed"));
        }

        let id = self
            .truck_repo
            .insert_reconciliation(&mut *tx, load_id, payload.notes.trim())
            .await?
            .ok_or_else(|| AppError::conflict("reconciliations.exists"))?;
        let copied = self.truck_repo.copy_load_lines(&mut *tx, id, load_id).await?;

        tx.commit().await?;
        tracing::info!("Cuadre {} criado para a carga {} ({} produtos)", id, load_id, copied);
        self.get_reconciliation(id).await
    }

    // Trava o cuadre; finalizado não muda mais
    async fn pending_reconciliation(&self, tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, id: Uuid) -> Result<(), AppError> {
        let status = self
            .truck_repo
            .lock_reconciliation(&mut **tx, id)
            .await?
            .ok_or(AppError::ResourceNotFound("reconciliation"))?;
        if status != ReconciliationStatus::Pending {
            return Err(AppError::conflict("reconciliations.finalized"));
        }
        Ok(())
    }

    pub async fn update_reconciliation_line(
        &self,
        id: Uuid,
        line_id: Uuid,
        payload: &ReconciliationLinePayload,
    ) -> Result<ReconciliationDetail, AppError> {
        let mut tx = self.pool.begin().await?;
        self.pending_reconciliation(&mut tx, id).await?;

        let expected = self
            .truck_repo
            .expected_qty(&mut *tx, id, line_id)
            .await?
            .ok_or(AppError::ResourceNotFound("reconciliation_line"))?;
        let difference = line_difference(expected, payload.returned_qty);
        self.truck_repo
            .update_reconciliation_line(&mut *tx, line_id, payload.returned_qty, difference, payload.notes.trim())
            .await?;

        tx.commit().await?;
        tracing::info!("Cuadre {}: linha {} com retorno {} (diferença {})", id, line_id, payload.returned_qty, difference);
        self.get_reconciliation(id).await
    }

    pub async fn finalize_reconciliation(&self, id: Uuid) -> Result<ReconciliationDetail, AppError> {
        let mut tx = self.pool.begin().await?;
        self.pending_reconciliation(&mut tx, id).await?;

        let lines = self.truck_repo.reconciliation_lines(&mut *tx, id).await?;
        let status = final_status(lines.iter().map(|l| l.difference));
        self.truck_repo.set_reconciliation_status(&mut *tx, id, status).await?;

        tx.commit().await?;
        tracing::info!("Cuadre {} finalizado: {:?}", id, status);
        self.get_reconciliation(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::fixtures, services::planning_service::today};
    use rust_decimal::Decimal;

    fn truck_payload(plate: &str) -> TruckPayload {
        TruckPayload {
            plate: plate.into(),
            brand: "Isuzu".into(),
            model: "NPR".into(),
            year: Some(2020),
            capacity_kg: Some(Decimal::new(350000, 2)),
        }
    }

    #[sqlx::test]
    #[ignore = "requer PostgreSQL"]
    async fn plate_is_normalized_and_unique(pool: PgPool) {
        let service = fixtures::state(pool.clone()).truck_service;

        let truck = service.create_truck(&truck_payload(" p-123abc ")).await.unwrap();
        assert_eq!(truck.plate, "P-123ABC");

        match service.create_truck(&truck_payload("P-123ABC")).await.unwrap_err() {
            AppError::FieldErrors(errors) => assert_eq!(errors[0].key, "plate_taken"),
            other => panic!("erro inesperado: {:?}", other),
        }
    }

    #[sqlx::test]
    #[ignore = "requer PostgreSQL"]
    async fn load_reuses_the_open_route_assignment(pool: PgPool) {
        let (route_id, _) = fixtures::route_with_clients(&pool, "Sur", 1).await;
        let service = fixtures::state(pool.clone()).truck_service;
        let truck = service.create_truck(&truck_payload("C-100AAA")).await.unwrap();

        let first = service
            .create_load(&LoadPayload { truck_id: truck.id, route_id, date: today(), notes: String::new() })
            .await
            .unwrap();
        let next_day = today().succ_opt().unwrap();
        let second = service
            .create_load(&LoadPayload { truck_id: truck.id, route_id, date: next_day, notes: String::new() })
            .await
            .unwrap();
        assert_eq!(first.load.truck_route_id, second.load.truck_route_id);
        assert_eq!(fixtures::count(&pool, "truck_routes").await, 1);

        // Uma carga por camião e dia
        match service
            .create_load(&LoadPayload { truck_id: truck.id, route_id, date: today(), notes: String::new() })
            .await
            .unwrap_err()
        {
            AppError::FieldErrors(errors) => assert_eq!(errors[0].key, "load_exists"),
            other => panic!("erro inesperado: {:?}", other),
        }
    }

    #[sqlx::test]
    #[ignore = "requer PostgreSQL"]
    async fn closed_load_is_frozen(pool: PgPool) {
        let (route_id, _) = fixtures::route_with_clients(&pool, "Este", 1).await;
        let soda = fixtures::product(&pool, "Gaseosa", Decimal::new(550, 2), true).await;
        let retired = fixtures::product(&pool, "Refresco viejo", Decimal::new(400, 2), false).await;
        let service = fixtures::state(pool.clone()).truck_service;
        let truck = service.create_truck(&truck_payload("C-200BBB")).await.unwrap();
        let load = service
            .create_load(&LoadPayload { truck_id: truck.id, route_id, date: today(), notes: String::new() })
            .await
            .unwrap()
            .load;

        assert!(matches!(
            service.close_load(load.id).await,
            Err(AppError::Conflict { key: "loads.empty", .. })
        ));
        assert!(matches!(
            service.add_load_line(load.id, &LoadLinePayload { product_id: retired, quantity: Decimal::ONE }).await,
            Err(AppError::FieldErrors(_))
        ));

        let line = LoadLinePayload { product_id: soda, quantity: Decimal::from(24) };
        let detail = service.add_load_line(load.id, &line).await.unwrap();
        assert_eq!(detail.lines[0].current_qty, Decimal::from(24));
        match service.add_load_line(load.id, &line).await.unwrap_err() {
            AppError::FieldErrors(errors) => assert_eq!(errors[0].key, "product_already_loaded"),
            other => panic!("erro inesperado: {:?}", other),
        }

        service.close_load(load.id).await.unwrap();
        assert!(matches!(
            service.add_load_line(load.id, &line).await,
            Err(AppError::Conflict { key: "loads.closed", .. })
        ));
        assert!(matches!(
            service.remove_load_line(load.id, detail.lines[0].id).await,
            Err(AppError::Conflict { key: "loads.closed", .. })
        ));
    }

    #[sqlx::test]
    #[ignore = "requer PostgreSQL"]
    async fn reconciliation_records_returns_and_finalizes_once(pool: PgPool) {
        let (route_id, _) = fixtures::route_with_clients(&pool, "Oeste", 1).await;
        let soda = fixtures::product(&pool, "Gaseosa", Decimal::new(550, 2), true).await;
        let load_id = fixtures::truck_load(&pool, route_id, today(), &[(soda, Decimal::from(10))]).await;
        let service = fixtures::state(pool.clone()).truck_service;

        assert!(matches!(
            service.create_reconciliation(load_id, &ReconciliationPayload::default()).await,
            Err(AppError::Conflict { key: "loads.not_closed", .. })
        ));

        // Quatro vendidos durante o dia
        sqlx::query("UPDATE truck_load_lines SET current_qty = 6 WHERE load_id = $1")
            .bind(load_id)
            .execute(&pool)
            .await
            .unwrap();
        service.close_load(load_id).await.unwrap();

        let created = service.create_reconciliation(load_id, &ReconciliationPayload::default()).await.unwrap();
        assert_eq!(created.reconciliation.status, ReconciliationStatus::Pending);
        assert_eq!(created.lines[0].sold_qty, Decimal::from(4));
        assert_eq!(created.lines[0].expected_qty, Decimal::from(6));
        assert!(!created.has_differences);
        assert!(matches!(
            service.create_reconciliation(load_id, &ReconciliationPayload::default()).await,
            Err(AppError::Conflict { key: "reconciliations.exists", .. })
        ));

        let id = created.reconciliation.id;
        let line_id = created.lines[0].id;
        let updated = service
            .update_reconciliation_line(id, line_id, &ReconciliationLinePayload { returned_qty: Decimal::from(5), notes: "Lata rota".into() })
            .await
            .unwrap();
        assert_eq!(updated.lines[0].difference, Decimal::from(-1));
        assert_eq!(updated.total_difference, Decimal::from(-1));

        let finished = service.finalize_reconciliation(id).await.unwrap();
        assert_eq!(finished.reconciliation.status, ReconciliationStatus::WithDifference);
        assert!(matches!(
            service.update_reconciliation_line(id, line_id, &ReconciliationLinePayload { returned_qty: Decimal::from(6), notes: String::new() }).await,
            Err(AppError::Conflict { key: "reconciliations.finalized", .. })
        ));
    }
}
