// src/services/transaction_service.rs

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::{self, Page, PageParams},
    },
    db::{
        transaction_repo::TransactionListFilter, PlanningRepository, ProductRepository, TransactionRepository,
        TruckRepository,
    },
    models::{
        auth::User,
        planning::{PlanDetail, VisitContext},
        rbac::Action,
        transactions::{
            merge_lines, price_lines, LinePayload, MergedLine, Order, OrderDetail, OrderPayload, OrderStatus, Sale,
            SaleDetail, SalePayload, SaleStatus, TransactionFilter, TransactionKind,
        },
        trucks::check_stock,
    },
    services::planning_service::PlanningService,
};

/// Vendedor só enxerga o que ele mesmo capturou; gestão enxerga tudo.
/// Devolve o filtro de vendedor efetivo da listagem.
pub fn visible_salesperson(user: &User, requested: Option<Uuid>) -> Result<Option<Uuid>, AppError> {
    if user.is_salesperson() {
        return Ok(Some(user.id));
    }
    if !user.can(Action::ViewTransactions) {
        return Err(AppError::Forbidden(Action::ViewTransactions.forbidden_key()));
    }
    Ok(requested)
}

pub fn ensure_can_see(user: &User, salesperson_id: Uuid) -> Result<(), AppError> {
    if user.can(Action::ViewTransactions) || (user.is_salesperson() && user.id == salesperson_id) {
        return Ok(());
    }
    Err(AppError::Forbidden(Action::ViewTransactions.forbidden_key()))
}

// Valida o status do filtro contra os valores do tipo de documento
fn parse_status<T: DeserializeOwned>(raw: Option<&str>) -> Result<Option<String>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => serde_json::from_value::<T>(serde_json::Value::String(value.to_string()))
            .map(|_| Some(value.to_string()))
            .map_err(|_| AppError::field("status", "invalid_status")),
    }
}

#[derive(Clone)]
pub struct TransactionService {
    transaction_repo: TransactionRepository,
    product_repo: ProductRepository,
    planning_repo: PlanningRepository,
    truck_repo: TruckRepository,
    pool: PgPool,
}

// Cabeçalho comum à venda e ao pedido
struct Capture<'a> {
    kind: TransactionKind,
    plan_detail_id: Uuid,
    lines: &'a [LinePayload],
    notes: &'a str,
    estimated_delivery: Option<NaiveDate>,
}

impl TransactionService {
    pub fn new(
        transaction_repo: TransactionRepository,
        product_repo: ProductRepository,
        planning_repo: PlanningRepository,
        truck_repo: TruckRepository,
        pool: PgPool,
    ) -> Self {
        Self { transaction_repo, product_repo, planning_repo, truck_repo, pool }
    }

    // ---
    // Captura
    // ---

    pub async fn create_sale(&self, user: &User, payload: &SalePayload) -> Result<SaleDetail, AppError> {
        let capture = Capture {
            kind: TransactionKind::Sale,
            plan_detail_id: payload.plan_detail_id,
            lines: &payload.lines,
            notes: &payload.notes,
            estimated_delivery: None,
        };
        let id = self.capture(user, &capture).await?;
        tracing::info!("Venda {} registrada pelo vendedor {}", id, user.id);
        self.sale_detail(id).await
    }

    pub async fn create_order(&self, user: &User, payload: &OrderPayload) -> Result<OrderDetail, AppError> {
        let capture = Capture {
            kind: TransactionKind::Order,
            plan_detail_id: payload.plan_detail_id,
            lines: &payload.lines,
            notes: &payload.notes,
            estimated_delivery: payload.estimated_delivery,
        };
        let id = self.capture(user, &capture).await?;
        tracing::info!("Pedido {} registrado pelo vendedor {}", id, user.id);
        self.order_detail(id).await
    }

    /// Cabeçalho e linhas numa só transação: qualquer falha desfaz tudo.
    async fn capture(&self, user: &User, capture: &Capture<'_>) -> Result<Uuid, AppError> {
        if !user.is_salesperson() {
            return Err(AppError::Forbidden(Action::FieldWork.forbidden_key()));
        }

        let mut tx = self.pool.begin().await?;

        let (context, detail) = self.locked_visit(&mut tx, user, capture.plan_detail_id).await?;
        if !detail.visit_in_progress() {
            return Err(AppError::conflict("visit.not_in_progress"));
        }

        let merged = merge_lines(capture.lines);
        let ids: Vec<Uuid> = merged.iter().map(|l| l.product_id).collect();
        let prices = self.product_repo.active_prices(&mut *tx, &ids).await?;
        let (priced, total) = price_lines(&merged, &prices).map_err(AppError::FieldErrors)?;

        let notes = capture.notes.trim();
        let id = match capture.kind {
            TransactionKind::Sale => {
                let load_id = self.take_from_truck(&mut tx, &context, &merged).await?;
                self.transaction_repo
                    .insert_sale(&mut *tx, detail.id, context.client_id, load_id, total, notes)
                    .await?
            }
            TransactionKind::Order => {
                self.transaction_repo
                    .insert_order(&mut *tx, detail.id, context.client_id, capture.estimated_delivery, total, notes)
                    .await?
            }
        };

        for line in &priced {
            self.transaction_repo.insert_line(&mut *tx, capture.kind, id, line).await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    /// A venda sai da carga do camião que atende a rota no dia da visita.
    /// Pedido não mexe no estoque.
    async fn take_from_truck(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        context: &VisitContext,
        lines: &[MergedLine],
    ) -> Result<Uuid, AppError> {
        let truck_id = self
            .truck_repo
            .truck_for_route(&mut **tx, context.route_id, context.date)
            .await?
            .ok_or_else(|| AppError::conflict("trucks.no_truck_for_route"))?;

        let ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
        let load = self
            .truck_repo
            .lock_stock(&mut **tx, truck_id, context.date, &ids)
            .await?
            .ok_or_else(|| AppError::conflict("trucks.no_load_for_date"))?;

        let errors = check_stock(lines, &load.stock);
        if !errors.is_empty() {
            return Err(AppError::FieldErrors(errors));
        }
        for line in lines {
            self.truck_repo.take_stock(&mut **tx, load.load_id, line.product_id, line.quantity).await?;
        }
        Ok(load.load_id)
    }

    async fn locked_visit(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user: &User,
        plan_detail_id: Uuid,
    ) -> Result<(VisitContext, PlanDetail), AppError> {
        let context = self
            .planning_repo
            .visit_context_by_detail(&mut **tx, plan_detail_id)
            .await?
            .ok_or_else(|| AppError::field("planDetailId", "visit_not_found"))?;
        PlanningService::ensure_owner(user, &context)?;

        let detail = self
            .planning_repo
            .lock_detail(&mut **tx, plan_detail_id)
            .await?
            .ok_or_else(|| AppError::field("planDetailId", "visit_not_found"))?;
        Ok((context, detail))
    }

    // ---
    // Consulta
    // ---

    fn list_filter(&self, user: &User, filter: &TransactionFilter, status: Option<String>) -> Result<TransactionListFilter, AppError> {
        Ok(TransactionListFilter {
            from: filter.from,
            to: filter.to,
            status,
            client_id: filter.client_id,
            salesperson_id: visible_salesperson(user, filter.salesperson_id)?,
        })
    }

    pub async fn list_sales(&self, user: &User, filter: &TransactionFilter) -> Result<Page<Sale>, AppError> {
        let status = parse_status::<SaleStatus>(filter.status.as_deref())?;
        let list_filter = self.list_filter(user, filter, status)?;
        let params = PageParams { page: filter.page.clone() };

        let total = self.transaction_repo.count(TransactionKind::Sale, &list_filter).await?;
        let window = pagination::window(&params, total);
        let sales = self.transaction_repo.list_sales(&list_filter, window).await?;
        Ok(Page::new(sales, window, total))
    }

    pub async fn list_orders(&self, user: &User, filter: &TransactionFilter) -> Result<Page<Order>, AppError> {
        let status = parse_status::<OrderStatus>(filter.status.as_deref())?;
        let list_filter = self.list_filter(user, filter, status)?;
        let params = PageParams { page: filter.page.clone() };

        let total = self.transaction_repo.count(TransactionKind::Order, &list_filter).await?;
        let window = pagination::window(&params, total);
        let orders = self.transaction_repo.list_orders(&list_filter, window).await?;
        Ok(Page::new(orders, window, total))
    }

    async fn sale_detail(&self, id: Uuid) -> Result<SaleDetail, AppError> {
        let sale = self
            .transaction_repo
            .find_sale(id)
            .await?
            .ok_or(AppError::ResourceNotFound("sale"))?;
        let lines = self.transaction_repo.lines(TransactionKind::Sale, id).await?;
        Ok(SaleDetail { sale, lines })
    }

    async fn order_detail(&self, id: Uuid) -> Result<OrderDetail, AppError> {
        let order = self
            .transaction_repo
            .find_order(id)
            .await?
            .ok_or(AppError::ResourceNotFound("order"))?;
        let lines = self.transaction_repo.lines(TransactionKind::Order, id).await?;
        Ok(OrderDetail { order, lines })
    }

    pub async fn get_sale(&self, user: &User, id: Uuid) -> Result<SaleDetail, AppError> {
        let detail = self.sale_detail(id).await?;
        ensure_can_see(user, detail.sale.salesperson_id)?;
        Ok(detail)
    }

    pub async fn get_order(&self, user: &User, id: Uuid) -> Result<OrderDetail, AppError> {
        let detail = self.order_detail(id).await?;
        ensure_can_see(user, detail.order.salesperson_id)?;
        Ok(detail)
    }

    pub async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<OrderDetail, AppError> {
        if !self.transaction_repo.set_order_status(id, status).await? {
            return Err(AppError::ResourceNotFound("order"));
        }
        tracing::info!("Pedido {} agora {:?}", id, status);
        self.order_detail(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{auth::sample_user, rbac::Role};

    #[test]
    fn salesperson_listing_is_forced_to_own_rows() {
        let seller = sample_user(Role::Salesperson);
        let other = Uuid::new_v4();
        assert_eq!(visible_salesperson(&seller, Some(other)).unwrap(), Some(seller.id));
        assert_eq!(visible_salesperson(&seller, None).unwrap(), Some(seller.id));
    }

    #[test]
    fn managers_keep_the_requested_filter() {
        let admin = sample_user(Role::Admin);
        let secretary = sample_user(Role::Secretary);
        let seller = Uuid::new_v4();
        assert_eq!(visible_salesperson(&admin, None).unwrap(), None);
        assert_eq!(visible_salesperson(&secretary, Some(seller)).unwrap(), Some(seller));
    }

    #[test]
    fn only_owner_or_management_sees_a_document() {
        let seller = sample_user(Role::Salesperson);
        assert!(ensure_can_see(&seller, seller.id).is_ok());
        assert!(matches!(
            ensure_can_see(&seller, Uuid::new_v4()),
            Err(AppError::Forbidden("forbidden.transactions"))
        ));
        assert!(ensure_can_see(&sample_user(Role::Secretary), Uuid::new_v4()).is_ok());
    }

    #[test]
    fn status_filter_must_match_the_document_kind() {
        assert_eq!(parse_status::<SaleStatus>(Some("completada")).unwrap(), Some("completada".to_string()));
        assert_eq!(parse_status::<SaleStatus>(Some("  ")).unwrap(), None);
        assert!(matches!(parse_status::<SaleStatus>(Some("entregado")), Err(AppError::FieldErrors(_))));
        assert!(parse_status::<OrderStatus>(Some("entregado")).is_ok());
    }

    // ---
    // Com banco (DATABASE_URL apontando para um PostgreSQL descartável)
    // ---

    mod db {
        use super::*;
        use crate::{
            db::fixtures,
            models::transactions::{LinePayload, SalePayload},
            services::planning_service::today,
        };
        use rust_decimal::Decimal;
        use sqlx::PgPool;

        struct Visit {
            seller: User,
            detail_id: Uuid,
            route_id: Uuid,
            assignment_id: Uuid,
        }

        async fn seller_in_visit(pool: &PgPool) -> Visit {
            let seller = fixtures::user(pool, "vend1", Role::Salesperson).await;
            let (route_id, stops) = fixtures::route_with_clients(pool, "Centro", 1).await;
            let assignment_id = fixtures::assignment(pool, route_id, seller.id, today(), None).await;
            let detail_id = fixtures::visit_in_progress(pool, assignment_id, stops[0], today()).await;
            Visit { seller, detail_id, route_id, assignment_id }
        }

        fn sale(detail_id: Uuid, lines: &[(Uuid, i64)]) -> SalePayload {
            SalePayload {
                plan_detail_id: detail_id,
                lines: lines
                    .iter()
                    .map(|(product_id, qty)| LinePayload { product_id: *product_id, quantity: Decimal::from(*qty) })
                    .collect(),
                notes: String::new(),
            }
        }

        #[sqlx::test]
        #[ignore = "requer PostgreSQL"]
        async fn sale_total_is_priced_from_the_catalog(pool: PgPool) {
            let visit = seller_in_visit(&pool).await;
            let soda = fixtures::product(&pool, "Gaseosa", Decimal::new(550, 2), true).await;
            let water = fixtures::product(&pool, "Agua", Decimal::new(300, 2), true).await;
            let load_id = fixtures::truck_load(&pool, visit.route_id, today(), &[(soda, Decimal::from(10)), (water, Decimal::from(10))]).await;
            let service = fixtures::state(pool.clone()).transaction_service;

            let mut payload = sale(visit.detail_id, &[(soda, 2), (water, 1), (soda, 1)]);
            payload.notes = "  ".into();
            let detail = service.create_sale(&visit.seller, &payload).await.unwrap();

            // 3 x 5.50 + 1 x 3.00, linhas repetidas somadas
            assert_eq!(detail.sale.total, Decimal::new(1950, 2));
            assert_eq!(detail.lines.len(), 2);
            assert_eq!(detail.sale.notes, "");
            assert_eq!(detail.sale.truck_load_id, Some(load_id));
        }

        #[sqlx::test]
        #[ignore = "requer PostgreSQL"]
        async fn sale_takes_stock_from_the_truck_and_orders_do_not(pool: PgPool) {
            let visit = seller_in_visit(&pool).await;
            let soda = fixtures::product(&pool, "Gaseosa", Decimal::new(550, 2), true).await;
            let load_id = fixtures::truck_load(&pool, visit.route_id, today(), &[(soda, Decimal::from(10))]).await;
            let service = fixtures::state(pool.clone()).transaction_service;

            service.create_sale(&visit.seller, &sale(visit.detail_id, &[(soda, 4)])).await.unwrap();
            assert_eq!(fixtures::stock(&pool, load_id, soda).await, Decimal::from(6));

            let order = OrderPayload {
                plan_detail_id: visit.detail_id,
                estimated_delivery: None,
                lines: vec![LinePayload { product_id: soda, quantity: Decimal::from(50) }],
                notes: String::new(),
            };
            service.create_order(&visit.seller, &order).await.unwrap();
            assert_eq!(fixtures::stock(&pool, load_id, soda).await, Decimal::from(6));
        }

        #[sqlx::test]
        #[ignore = "requer PostgreSQL"]
        async fn sale_beyond_the_truck_stock_changes_nothing(pool: PgPool) {
            let visit = seller_in_visit(&pool).await;
            let soda = fixtures::product(&pool, "Gaseosa", Decimal::new(550, 2), true).await;
            let water = fixtures::product(&pool, "Agua", Decimal::new(300, 2), true).await;
            let load_id = fixtures::truck_load(&pool, visit.route_id, today(), &[(soda, Decimal::from(3))]).await;
            let service = fixtures::state(pool.clone()).transaction_service;

            let err = service
                .create_sale(&visit.seller, &sale(visit.detail_id, &[(soda, 2), (water, 1), (soda, 2)]))
                .await
                .unwrap_err();
            match err {
                AppError::FieldErrors(errors) => {
                    assert_eq!(errors[0].field, "lines[0].quantity");
                    assert_eq!(errors[0].key, "insufficient_stock");
                    assert_eq!(errors[1].field, "lines[1].productId");
                    assert_eq!(errors[1].key, "product_not_loaded");
                }
                other => panic!("erro inesperado: {:?}", other),
            }
            assert_eq!(fixtures::stock(&pool, load_id, soda).await, Decimal::from(3));
            assert_eq!(fixtures::count(&pool, "sales").await, 0);
        }

        #[sqlx::test]
        #[ignore = "requer PostgreSQL"]
        async fn sale_needs_a_truck_load_for_the_day(pool: PgPool) {
            let visit = seller_in_visit(&pool).await;
            let soda = fixtures::product(&pool, "Gaseosa", Decimal::new(550, 2), true).await;
            let service = fixtures::state(pool.clone()).transaction_service;

            assert!(matches!(
                service.create_sale(&visit.seller, &sale(visit.detail_id, &[(soda, 1)])).await,
                Err(AppError::Conflict { key: "trucks.no_truck_for_route", .. })
            ));

            // Camião na rota, mas a carga é de ontem
            let yesterday = today().pred_opt().unwrap();
            fixtures::truck_load(&pool, visit.route_id, yesterday, &[(soda, Decimal::from(5))]).await;
            assert!(matches!(
                service.create_sale(&visit.seller, &sale(visit.detail_id, &[(soda, 1)])).await,
                Err(AppError::Conflict { key: "trucks.no_load_for_date", .. })
            ));
            assert_eq!(fixtures::count(&pool, "sales").await, 0);
        }

        #[sqlx::test]
        #[ignore = "requer PostgreSQL"]
        async fn inactive_product_rolls_back_the_whole_sale(pool: PgPool) {
            let visit = seller_in_visit(&pool).await;
            let soda = fixtures::product(&pool, "Gaseosa", Decimal::new(550, 2), true).await;
            let retired = fixtures::product(&pool, "Refresco viejo", Decimal::new(400, 2), false).await;
            let load_id = fixtures::truck_load(&pool, visit.route_id, today(), &[(soda, Decimal::from(10))]).await;
            let service = fixtures::state(pool.clone()).transaction_service;

            let err = service
                .create_sale(&visit.seller, &sale(visit.detail_id, &[(soda, 1), (retired, 1)]))
                .await
                .unwrap_err();

            match err {
                AppError::FieldErrors(errors) => assert_eq!(errors[0].key, "product_unavailable"),
                other => panic!("erro inesperado: {:?}", other),
            }
            assert_eq!(fixtures::count(&pool, "sales").await, 0);
            assert_eq!(fixtures::count(&pool, "sale_lines").await, 0);
            assert_eq!(fixtures::stock(&pool, load_id, soda).await, Decimal::from(10));
        }

        #[sqlx::test]
        #[ignore = "requer PostgreSQL"]
        async fn another_salesperson_cannot_sell_on_the_visit(pool: PgPool) {
            let visit = seller_in_visit(&pool).await;
            let intruder = fixtures::user(&pool, "vend2", Role::Salesperson).await;
            let soda = fixtures::product(&pool, "Gaseosa", Decimal::new(550, 2), true).await;
            fixtures::truck_load(&pool, visit.route_id, today(), &[(soda, Decimal::from(10))]).await;
            let service = fixtures::state(pool.clone()).transaction_service;

            assert!(matches!(
                service.create_sale(&intruder, &sale(visit.detail_id, &[(soda, 1)])).await,
                Err(AppError::Forbidden("forbidden.plan_owner"))
            ));
            assert_eq!(fixtures::count(&pool, "sales").await, 0);
        }

        #[sqlx::test]
        #[ignore = "requer PostgreSQL"]
        async fn deactivated_salesperson_keeps_history(pool: PgPool) {
            let admin = fixtures::user(&pool, "admin", Role::Admin).await;
            let visit = seller_in_visit(&pool).await;
            let soda = fixtures::product(&pool, "Gaseosa", Decimal::new(550, 2), true).await;
            fixtures::truck_load(&pool, visit.route_id, today(), &[(soda, Decimal::from(10))]).await;
            let state = fixtures::state(pool.clone());

            let sold = state
                .transaction_service
                .create_sale(&visit.seller, &sale(visit.detail_id, &[(soda, 2)]))
                .await
                .unwrap();
            state.user_service.deactivate_user(&admin, visit.seller.id).await.unwrap();

            let assignment = state.assignment_service.get_assignment(visit.assignment_id).await.unwrap();
            assert_eq!(assignment.assignment.assignment.salesperson_id, visit.seller.id);
            assert_eq!(assignment.recent_plans.len(), 1);

            let again = state.transaction_service.get_sale(&admin, sold.sale.id).await.unwrap();
            assert_eq!(again.sale.salesperson_id, visit.seller.id);
            assert_eq!(again.sale.total, Decimal::new(1100, 2));
            assert_eq!(again.lines.len(), 1);
        }
    }
}
