// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::rbac::{is_allowed, Action, Role};

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    #[schema(example = "jperez")]
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub password_hash: String,

    #[schema(example = "1234567890101")]
    pub dpi: Option<String>,
    #[schema(example = "V-001")]
    pub employee_code: Option<String>,
    pub phone: String,
    pub role: Role,
    pub active: bool,

    // Incrementado no logout e na desativação: invalida tokens emitidos antes
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub session_version: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name).trim().to_string();
        if name.is_empty() { self.username.clone() } else { name }
    }

    pub fn can(&self, action: Action) -> bool {
        is_allowed(self.role, action)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_secretary(&self) -> bool {
        self.role == Role::Secretary
    }

    pub fn is_salesperson(&self) -> bool {
        self.role == Role::Salesperson
    }

    pub fn can_manage_routes(&self) -> bool {
        self.can(Action::ManageRoutes)
    }

    pub fn can_view_reports(&self) -> bool {
        self.can(Action::ViewReports)
    }
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "jperez")]
    pub username: String,
    #[validate(length(min = 1, message = "required"))]
    pub password: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub ver: i32,   // session_version no momento da emissão
    pub exp: usize, // Expiration time
    pub iat: usize, // Issued At
}

#[cfg(test)]
pub(crate) fn sample_user(role: Role) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        username: "jperez".into(),
        email: "jperez@example.com".into(),
        first_name: "Juan".into(),
        last_name: "Pérez".into(),
        password_hash: "x".into(),
        dpi: Some("1234567890101".into()),
        employee_code: Some("V-001".into()),
        phone: "5555-1234".into(),
        role,
        active: true,
        session_version: 0,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_falls_back_to_username() {
        let mut user = sample_user(Role::Admin);
        assert_eq!(user.full_name(), "Juan Pérez");
        user.first_name.clear();
        user.last_name.clear();
        assert_eq!(user.full_name(), "jperez");
    }

    #[test]
    fn secrets_are_not_serialized() {
        let json = serde_json::to_value(sample_user(Role::Salesperson)).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("sessionVersion").is_none());
        assert_eq!(json["role"], "vendedor");
    }

    #[test]
    fn role_predicates() {
        let seller = sample_user(Role::Salesperson);
        assert!(seller.is_salesperson());
        assert!(!seller.can_manage_routes());
        let secretary = sample_user(Role::Secretary);
        assert!(secretary.is_secretary());
        assert!(secretary.can_manage_routes());
        assert!(secretary.can_view_reports());
        assert!(!secretary.is_admin());
    }
}
