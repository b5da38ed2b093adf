// src/services/catalog_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::{unique_to_field, AppError},
        media::MediaStore,
        pagination::{self, Page, PageParams},
        validation::clean_optional,
    },
    db::{
        client_repo::ClientRecord,
        product_repo::ProductRecord,
        ClientRepository, ProductRepository,
    },
    models::catalog::{
        Category, CategoryPayload, Client, ClientFilter, ClientPayload, ProductFilter, ProductPayload,
        ProductStatus, ProductView,
    },
};

const CLIENT_UNIQUE_FIELDS: &[(&str, &str, &'static str)] = &[("clients_nit_key", "nit", "nit_taken")];
const CATEGORY_UNIQUE_FIELDS: &[(&str, &str, &'static str)] =
    &[("categories_name_key", "name", "category_name_taken")];

// Categoria inexistente no produto vira erro do campo
fn category_fk_to_field(err: AppError) -> AppError {
    match err {
        AppError::ForeignKeyViolation(_) => AppError::field("categoryId", "category_not_found"),
        other => other,
    }
}

#[derive(Clone)]
pub struct CatalogService {
    client_repo: ClientRepository,
    product_repo: ProductRepository,
    media: MediaStore,
    pool: PgPool,
}

impl CatalogService {
    pub fn new(
        client_repo: ClientRepository,
        product_repo: ProductRepository,
        media: MediaStore,
        pool: PgPool,
    ) -> Self {
        Self { client_repo, product_repo, media, pool }
    }

    pub fn media(&self) -> &MediaStore {
        &self.media
    }

    // ---
    // Clientes
    // ---

    pub async fn list_clients(&self, filter: &ClientFilter) -> Result<Page<Client>, AppError> {
        let search = clean_optional(filter.search.as_deref());
        let params = PageParams { page: filter.page.clone() };

        let total = self.client_repo.count(search.as_deref(), filter.include_inactive).await?;
        let window = pagination::window(&params, total);
        let clients = self
            .client_repo
            .list(search.as_deref(), filter.include_inactive, window)
            .await?;
        Ok(Page::new(clients, window, total))
    }

    pub async fn get_client(&self, id: Uuid) -> Result<Client, AppError> {
        self.client_repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::ResourceNotFound("client"))
    }

    /// Salva a foto de referência (se veio) e devolve o caminho.
    async fn store_reference_photo(&self, payload: &ClientPayload) -> Result<Option<String>, AppError> {
        match clean_optional(payload.reference_photo.as_deref()) {
            Some(encoded) => Ok(Some(self.media.save_photo("clients", &encoded).await?.path)),
            None => Ok(None),
        }
    }

    /// Cria o cliente usando o executor informado (pool ou transação de quem chama).
    pub async fn insert_client<'e, E>(&self, executor: E, payload: &ClientPayload) -> Result<Client, AppError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let photo = self.store_reference_photo(payload).await?;
        let email = clean_optional(payload.email.as_deref());
        let record = ClientRecord {
            nit: payload.nit.trim(),
            name: payload.name.trim(),
            contact_name: payload.contact_name.trim(),
            email: email.as_deref(),
            phone: payload.phone.trim(),
            address: payload.address.trim(),
            location_reference: payload.location_reference.trim(),
            latitude: payload.latitude,
            longitude: payload.longitude,
            reference_photo: photo.as_deref(),
        };

        self.client_repo
            .create(executor, &record)
            .await
            .map_err(|e| unique_to_field(e, CLIENT_UNIQUE_FIELDS))
    }

    pub async fn create_client(&self, payload: &ClientPayload) -> Result<Client, AppError> {
        let client = self.insert_client(&self.pool, payload).await?;
        tracing::info!("Cliente {} criado (NIT {})", client.id, client.nit);
        Ok(client)
    }

    pub async fn update_client(&self, id: Uuid, payload: &ClientPayload) -> Result<Client, AppError> {
        let photo = self.store_reference_photo(payload).await?;
        let email = clean_optional(payload.email.as_deref());
        let record = ClientRecord {
            nit: payload.nit.trim(),
            name: payload.name.trim(),
            contact_name: payload.contact_name.trim(),
            email: email.as_deref(),
            phone: payload.phone.trim(),
            address: payload.address.trim(),
            location_reference: payload.location_reference.trim(),
            latitude: payload.latitude,
            longitude: payload.longitude,
            reference_photo: photo.as_deref(),
        };

        let client = self
            .client_repo
            .update(&self.pool, id, &record)
            .await
            .map_err(|e| unique_to_field(e, CLIENT_UNIQUE_FIELDS))?
            .ok_or(AppError::ResourceNotFound("client"))?;

        tracing::info!("Cliente {} atualizado", client.id);
        Ok(client)
    }

    pub async fn set_client_active(&self, id: Uuid, active: bool) -> Result<Client, AppError> {
        let client = self
            .client_repo
            .set_active(id, active)
            .await?
            .ok_or(AppError::ResourceNotFound("client"))?;
        tracing::info!("Cliente {} ativo = {}", client.id, active);
        Ok(client)
    }

    // ---
    // Categorias
    // ---

    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        self.product_repo.list_categories().await
    }

    pub async fn create_category(&self, payload: &CategoryPayload) -> Result<Category, AppError> {
        let category = self
            .product_repo
            .create_category(payload.name.trim(), payload.description.trim())
            .await
            .map_err(|e| unique_to_field(e, CATEGORY_UNIQUE_FIELDS))?;
        tracing::info!("Categoria {} criada", category.id);
        Ok(category)
    }

    pub async fn update_category(&self, id: Uuid, payload: &CategoryPayload) -> Result<Category, AppError> {
        self.product_repo
            .update_category(id, payload.name.trim(), payload.description.trim())
            .await
            .map_err(|e| unique_to_field(e, CATEGORY_UNIQUE_FIELDS))?
            .ok_or(AppError::ResourceNotFound("category"))
    }

    /// Categoria com produtos não pode ser apagada.
    pub async fn delete_category(&self, id: Uuid) -> Result<(), AppError> {
        let products = self.product_repo.count_products_in_category(id).await?;
        if products > 0 {
            return Err(AppError::Conflict {
                key: "categories.in_use",
                args: vec![products.to_string()],
            });
        }

        if !self.product_repo.delete_category(id).await? {
            return Err(AppError::ResourceNotFound("category"));
        }
        tracing::info!("Categoria {} apagada", id);
        Ok(())
    }

    // ---
    // Produtos
    // ---

    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Page<ProductView>, AppError> {
        let search = clean_optional(filter.search.as_deref());
        let status = filter.status.unwrap_or(ProductStatus::Active);
        let params = PageParams { page: filter.page.clone() };

        let total = self.product_repo.count(search.as_deref(), filter.category_id, status).await?;
        let window = pagination::window(&params, total);
        let products = self
            .product_repo
            .list(search.as_deref(), filter.category_id, status, window)
            .await?;
        Ok(Page::new(products.into_iter().map(ProductView::from).collect(), window, total))
    }

    pub async fn get_product(&self, id: Uuid) -> Result<ProductView, AppError> {
        self.product_repo
            .find_by_id(id)
            .await?
            .map(ProductView::from)
            .ok_or(AppError::ResourceNotFound("product"))
    }

    fn product_record(payload: &ProductPayload) -> ProductRecord<'_> {
        ProductRecord {
            name: payload.name.trim(),
            description: payload.description.trim(),
            category_id: payload.category_id,
            purchase_price: payload.purchase_price.round_dp(2),
            sale_price: payload.sale_price.round_dp(2),
            status: payload.status.unwrap_or(ProductStatus::Active),
        }
    }

    pub async fn create_product(&self, payload: &ProductPayload) -> Result<ProductView, AppError> {
        let id = self
            .product_repo
            .create(&Self::product_record(payload))
            .await
            .map_err(category_fk_to_field)?;
        tracing::info!("Produto {} criado", id);
        self.get_product(id).await
    }

    pub async fn update_product(&self, id: Uuid, payload: &ProductPayload) -> Result<ProductView, AppError> {
        let updated = self
            .product_repo
            .update(id, &Self::product_record(payload))
            .await
            .map_err(category_fk_to_field)?;
        if !updated {
            return Err(AppError::ResourceNotFound("product"));
        }
        tracing::info!("Produto {} atualizado", id);
        self.get_product(id).await
    }

    pub async fn set_product_status(&self, id: Uuid, status: ProductStatus) -> Result<ProductView, AppError> {
        if !self.product_repo.set_status(id, status).await? {
            return Err(AppError::ResourceNotFound("product"));
        }
        tracing::info!("Produto {} agora {:?}", id, status);
        self.get_product(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures;

    #[sqlx::test]
    #[ignore = "requer PostgreSQL"]
    async fn deactivated_client_keeps_its_history(pool: PgPool) {
        let (_, stops) = fixtures::route_with_clients(&pool, "Norte", 2).await;
        let client_id: Uuid = sqlx::query_scalar("SELECT client_id FROM route_details WHERE id = $1")
            .bind(stops[0])
            .fetch_one(&pool)
            .await
            .unwrap();
        let service = fixtures::state(pool.clone()).catalog_service;

        let client = service.set_client_active(client_id, false).await.unwrap();
        assert!(!client.active);

        // Continua consultável e na rota, só some da listagem padrão
        assert_eq!(service.get_client(client_id).await.unwrap().id, client_id);
        assert_eq!(fixtures::count(&pool, "route_details").await, 2);

        let default_page = service.list_clients(&ClientFilter::default()).await.unwrap();
        assert_eq!(default_page.total, 1);
        assert!(default_page.items.iter().all(|c| c.id != client_id));

        let all = ClientFilter { include_inactive: true, ..Default::default() };
        assert_eq!(service.list_clients(&all).await.unwrap().total, 2);
    }

    #[sqlx::test]
    #[ignore = "requer PostgreSQL"]
    async fn category_with_products_cannot_be_deleted(pool: PgPool) {
        fixtures::product(&pool, "Gaseosa", rust_decimal::Decimal::new(550, 2), true).await;
        let category_id: Uuid = sqlx::query_scalar("SELECT id FROM categories WHERE name = 'Bebidas'")
            .fetch_one(&pool)
            .await
            .unwrap();
        let service = fixtures::state(pool.clone()).catalog_service;

        assert!(matches!(
            service.delete_category(category_id).await,
            Err(AppError::Conflict { key: "categories.in_use", .. })
        ));
        assert_eq!(fixtures::count(&pool, "categories").await, 1);
    }
}
