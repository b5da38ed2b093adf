// src/db/product_repo.rs

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::PageWindow},
    models::catalog::{Category, Product, ProductStatus},
};

// Produto sempre sai com o nome da categoria
const PRODUCT_SELECT: &str = r#"
    SELECT p.id, p.name, p.description, p.category_id, c.name AS category_name,
           p.purchase_price, p.sale_price, p.status, p.created_at
    FROM products p
    JOIN categories c ON c.id = p.category_id
"#;

const LIST_FILTER: &str = r#"
    WHERE ($1::text IS NULL OR p.name ILIKE '%' || $1 || '%')
      AND ($2::uuid IS NULL OR p.category_id = $2)
      AND p.status = $3
"#;

pub struct ProductRecord<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub category_id: Uuid,
    pub purchase_price: Decimal,
    pub sale_price: Decimal,
    pub status: ProductStatus,
}

#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Categorias
    // ---

    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    pub async fn create_category(&self, name: &str, description: &str) -> Result<Category, AppError> {
        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, description) VALUES ($1, $2) RETURNING *",
        )
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    pub async fn update_category(&self, id: Uuid, name: &str, description: &str) -> Result<Option<Category>, AppError> {
        let category = sqlx::query_as::<_, Category>(
            "UPDATE categories SET name = $2, description = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    pub async fn count_products_in_category(&self, category_id: Uuid) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = $1")
            .bind(category_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    pub async fn delete_category(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---
    // Produtos
    // ---

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(&format!("{} WHERE p.id = $1", PRODUCT_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    pub async fn count(
        &self,
        search: Option<&str>,
        category_id: Option<Uuid>,
        status: ProductStatus,
    ) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM products p {}", LIST_FILTER))
            .bind(search)
            .bind(category_id)
            .bind(status)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    pub async fn list(
        &self,
        search: Option<&str>,
        category_id: Option<Uuid>,
        status: ProductStatus,
        window: PageWindow,
    ) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "{} {} ORDER BY p.name, p.id LIMIT $4 OFFSET $5",
            PRODUCT_SELECT, LIST_FILTER
        ))
        .bind(search)
        .bind(category_id)
        .bind(status)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    pub async fn create(&self, record: &ProductRecord<'_>) -> Result<Uuid, AppError> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO products (name, description, category_id, purchase_price, sale_price, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(record.name)
        .bind(record.description)
        .bind(record.category_id)
        .bind(record.purchase_price)
        .bind(record.sale_price)
        .bind(record.status)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn update(&self, id: Uuid, record: &ProductRecord<'_>) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, description = $3, category_id = $4, purchase_price = $5, sale_price = $6, status = $7
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(record.name)
        .bind(record.description)
        .bind(record.category_id)
        .bind(record.purchase_price)
        .bind(record.sale_price)
        .bind(record.status)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_status(&self, id: Uuid, status: ProductStatus) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE products SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Preços de venda vigentes dos produtos ativos entre os pedidos.
    pub async fn active_prices<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<HashMap<Uuid, Decimal>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows: Vec<(Uuid, Decimal)> = sqlx::query_as(
            "SELECT id, sale_price FROM products WHERE id = ANY($1) AND status = 'activo'",
        )
        .bind(ids)
        .fetch_all(executor)
        .await?;
        Ok(rows.into_iter().collect())
    }
}
