// src/services/user_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::{unique_to_field, AppError},
        pagination::{self, Page, PageParams},
    },
    db::{user_repo::UserRecord, UserRepository},
    models::{auth::User, users::UserPayload},
    services::auth::hash_password,
};

const USER_UNIQUE_FIELDS: &[(&str, &str, &'static str)] = &[
    ("users_username_key", "username", "username_taken"),
    ("users_dpi_key", "dpi", "dpi_taken"),
    ("users_employee_code_key", "employeeCode", "employee_code_taken"),
];

#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    pool: PgPool,
}

impl UserService {
    pub fn new(user_repo: UserRepository, pool: PgPool) -> Self {
        Self { user_repo, pool }
    }

    pub async fn list_users(&self, params: &PageParams, active: bool) -> Result<Page<User>, AppError> {
        let total = self.user_repo.count(active).await?;
        let window = pagination::window(params, total);
        let users = self.user_repo.list(active, window).await?;
        Ok(Page::new(users, window, total))
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User, AppError> {
        self.user_repo.find_by_id(id).await?.ok_or(AppError::ResourceNotFound("user"))
    }

    pub async fn create_user(&self, payload: &UserPayload) -> Result<User, AppError> {
        let identity = payload.clean_identity().map_err(AppError::FieldErrors)?;
        let password = payload
            .new_password()
            .ok_or_else(|| AppError::field("password", "required"))?;
        let password_hash = hash_password(password).await?;

        let record = UserRecord {
            username: payload.username.trim(),
            email: payload.email.trim(),
            first_name: payload.first_name.trim(),
            last_name: payload.last_name.trim(),
            dpi: identity.dpi.as_deref(),
            employee_code: identity.employee_code.as_deref(),
            phone: &identity.phone,
            role: payload.role,
        };

        let user = self
            .user_repo
            .create(&self.pool, &record, &password_hash)
            .await
            .map_err(|e| unique_to_field(e, USER_UNIQUE_FIELDS))?;

        tracing::info!("Usuário {} criado ({:?})", user.id, user.role);
        Ok(user)
    }

    pub async fn update_user(&self, id: Uuid, payload: &UserPayload) -> Result<User, AppError> {
        let identity = payload.clean_identity().map_err(AppError::FieldErrors)?;
        let password_hash = match payload.new_password() {
            Some(password) => Some(hash_password(password).await?),
            None => None,
        };

        let record = UserRecord {
            username: payload.username.trim(),
            email: payload.email.trim(),
            first_name: payload.first_name.trim(),
            last_name: payload.last_name.trim(),
            dpi: identity.dpi.as_deref(),
            employee_code: identity.employee_code.as_deref(),
            phone: &identity.phone,
            role: payload.role,
        };

        let user = self
            .user_repo
            .update(&self.pool, id, &record, password_hash.as_deref())
            .await
            .map_err(|e| unique_to_field(e, USER_UNIQUE_FIELDS))?
            .ok_or(AppError::ResourceNotFound("user"))?;

        tracing::info!("Usuário {} atualizado", user.id);
        Ok(user)
    }

    /// Alterna o estado ativo. Nada que referencia o usuário é apagado.
    pub async fn toggle_user_active(&self, actor: &User, id: Uuid) -> Result<User, AppError> {
        let current = self.get_user(id).await?;
        self.set_active(actor, current.id, !current.active).await
    }

    /// "Eliminar" usuário: desativação lógica.
    pub async fn deactivate_user(&self, actor: &User, id: Uuid) -> Result<User, AppError> {
        self.set_active(actor, id, false).await
    }

    async fn set_active(&self, actor: &User, id: Uuid, active: bool) -> Result<User, AppError> {
        if !active && actor.id == id {
            return Err(AppError::conflict("users.cannot_deactivate_self"));
        }

        let user = self
            .user_repo
            .set_active(&self.pool, id, active)
            .await?
            .ok_or(AppError::ResourceNotFound("user"))?;

        tracing::info!("Usuário {} agora está {}", user.id, if active { "ativo" } else { "inativo" });
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::fixtures, models::rbac::Role};

    #[sqlx::test]
    #[ignore = "requer PostgreSQL"]
    async fn deactivation_is_logical_and_never_on_self(pool: PgPool) {
        let admin = fixtures::user(&pool, "admin", Role::Admin).await;
        let seller = fixtures::user(&pool, "vend1", Role::Salesperson).await;
        let service = fixtures::state(pool.clone()).user_service;

        assert!(matches!(
            service.deactivate_user(&admin, admin.id).await,
            Err(AppError::Conflict { key: "users.cannot_deactivate_self", .. })
        ));

        let deactivated = service.deactivate_user(&admin, seller.id).await.unwrap();
        assert!(!deactivated.active);
        assert_eq!(fixtures::count(&pool, "users").await, 2);

        let back = service.toggle_user_active(&admin, seller.id).await.unwrap();
        assert!(back.active);
    }
}
