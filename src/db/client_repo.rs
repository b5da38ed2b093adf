// src/db/client_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::PageWindow},
    models::catalog::Client,
};

pub struct ClientRecord<'a> {
    pub nit: &'a str,
    pub name: &'a str,
    pub contact_name: &'a str,
    pub email: Option<&'a str>,
    pub phone: &'a str,
    pub address: &'a str,
    pub location_reference: &'a str,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub reference_photo: Option<&'a str>,
}

// Filtro comum à contagem e à listagem
const LIST_FILTER: &str = r#"
    WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%' OR nit ILIKE '%' || $1 || '%')
      AND ($2 OR active)
"#;

#[derive(Clone)]
pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(client)
    }

    pub async fn count(&self, search: Option<&str>, include_inactive: bool) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM clients {}", LIST_FILTER))
            .bind(search)
            .bind(include_inactive)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    pub async fn list(
        &self,
        search: Option<&str>,
        include_inactive: bool,
        window: PageWindow,
    ) -> Result<Vec<Client>, AppError> {
        let clients = sqlx::query_as::<_, Client>(&format!(
            "SELECT * FROM clients {} ORDER BY name, id LIMIT $3 OFFSET $4",
            LIST_FILTER
        ))
        .bind(search)
        .bind(include_inactive)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(clients)
    }

    pub async fn create<'e, E>(&self, executor: E, record: &ClientRecord<'_>) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (nit, name, contact_name, email, phone, address, location_reference,
                                 latitude, longitude, reference_photo)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(record.nit)
        .bind(record.name)
        .bind(record.contact_name)
        .bind(record.email)
        .bind(record.phone)
        .bind(record.address)
        .bind(record.location_reference)
        .bind(record.latitude)
        .bind(record.longitude)
        .bind(record.reference_photo)
        .fetch_one(executor)
        .await?;
        Ok(client)
    }

    /// `reference_photo` None mantém a foto atual.
    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        record: &ClientRecord<'_>,
    ) -> Result<Option<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, Client>(
            r#"
            UPDATE clients
            SET nit = $2, name = $3, contact_name = $4, email = $5, phone = $6, address = $7,
                location_reference = $8, latitude = $9, longitude = $10,
                reference_photo = COALESCE($11, reference_photo),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(record.nit)
        .bind(record.name)
        .bind(record.contact_name)
        .bind(record.email)
        .bind(record.phone)
        .bind(record.address)
        .bind(record.location_reference)
        .bind(record.latitude)
        .bind(record.longitude)
        .bind(record.reference_photo)
        .fetch_optional(executor)
        .await?;
        Ok(client)
    }

    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<Client>, AppError> {
        let client = sqlx::query_as::<_, Client>(
            "UPDATE clients SET active = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(client)
    }
}
