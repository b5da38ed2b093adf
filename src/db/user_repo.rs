// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::PageWindow},
    models::{auth::User, rbac::Role},
};

// Dados já validados para gravar um usuário
pub struct UserRecord<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub dpi: Option<&'a str>,
    pub employee_code: Option<&'a str>,
    pub phone: &'a str,
    pub role: Role,
}

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let maybe_user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(maybe_user)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let maybe_user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(maybe_user)
    }

    /// Lê e bloqueia o usuário até o fim da transação.
    pub async fn lock_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let maybe_user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(maybe_user)
    }

    pub async fn count(&self, active: bool) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE active = $1")
            .bind(active)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    pub async fn list(&self, active: bool, window: PageWindow) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE active = $1 ORDER BY username, id LIMIT $2 OFFSET $3",
        )
        .bind(active)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        record: &UserRecord<'_>,
        password_hash: &str,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, first_name, last_name, password_hash, dpi, employee_code, phone, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(record.username)
        .bind(record.email)
        .bind(record.first_name)
        .bind(record.last_name)
        .bind(password_hash)
        .bind(record.dpi)
        .bind(record.employee_code)
        .bind(record.phone)
        .bind(record.role)
        .fetch_one(executor)
        .await?;
        Ok(user)
    }

    /// Atualiza os dados; `password_hash` None mantém a senha atual.
    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        record: &UserRecord<'_>,
        password_hash: Option<&str>,
    ) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = $2, email = $3, first_name = $4, last_name = $5,
                password_hash = COALESCE($6, password_hash),
                dpi = $7, employee_code = $8, phone = $9, role = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(record.username)
        .bind(record.email)
        .bind(record.first_name)
        .bind(record.last_name)
        .bind(password_hash)
        .bind(record.dpi)
        .bind(record.employee_code)
        .bind(record.phone)
        .bind(record.role)
        .fetch_optional(executor)
        .await?;
        Ok(user)
    }

    /// Liga/desliga a conta. Toda mudança invalida os tokens já emitidos.
    pub async fn set_active<'e, E>(&self, executor: E, id: Uuid, active: bool) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET active = $2, session_version = session_version + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(active)
        .fetch_optional(executor)
        .await?;
        Ok(user)
    }

    pub async fn bump_session_version(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET session_version = session_version + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
