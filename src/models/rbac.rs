// src/models/rbac.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Papel do usuário. Os valores no banco e na API seguem os nomes usados pela operação.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role")]
pub enum Role {
    #[sqlx(rename = "admin")]
    #[serde(rename = "admin")]
    Admin,

    // Supervisão administrativa: gerencia catálogo, rotas e atribuições
    #[sqlx(rename = "secretaria")]
    #[serde(rename = "secretaria")]
    Secretary,

    #[sqlx(rename = "vendedor")]
    #[serde(rename = "vendedor")]
    Salesperson,
}

/// Ações protegidas da aplicação.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ManageUsers,
    ManageCatalog,
    ManageRoutes,
    ManageAssignments,
    ViewTransactions,
    ManageOrders,
    ViewReports,
    FieldWork,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::ManageUsers,
        Action::ManageCatalog,
        Action::ManageRoutes,
        Action::ManageAssignments,
        Action::ViewTransactions,
        Action::ManageOrders,
        Action::ViewReports,
        Action::FieldWork,
    ];

    /// Chave da mensagem de recusa
    pub fn forbidden_key(self) -> &'static str {
        match self {
            Action::ManageUsers => "forbidden.users",
            Action::ManageCatalog => "forbidden.catalog",
            Action::ManageRoutes => "forbidden.routes",
            Action::ManageAssignments => "forbidden.assignments",
            Action::ViewTransactions => "forbidden.transactions",
            Action::ManageOrders => "forbidden.orders",
            Action::ViewReports => "forbidden.reports",
            Action::FieldWork => "forbidden.field_work",
        }
    }
}

/// O predicado de permissão: (papel, ação) -> permitido?
pub fn is_allowed(role: Role, action: Action) -> bool {
    match action {
        Action::ManageUsers => role == Role::Admin,
        Action::ManageCatalog
        | Action::ManageRoutes
        | Action::ManageAssignments
        | Action::ViewTransactions
        | Action::ManageOrders
        | Action::ViewReports => matches!(role, Role::Admin | Role::Secretary),
        Action::FieldWork => role == Role::Salesperson,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_admin_manages_users() {
        assert!(is_allowed(Role::Admin, Action::ManageUsers));
        assert!(!is_allowed(Role::Secretary, Action::ManageUsers));
        assert!(!is_allowed(Role::Salesperson, Action::ManageUsers));
    }

    #[test]
    fn managers_handle_routes_and_assignments() {
        for role in [Role::Admin, Role::Secretary] {
            assert!(is_allowed(role, Action::ManageRoutes));
            assert!(is_allowed(role, Action::ManageAssignments));
            assert!(is_allowed(role, Action::ManageCatalog));
            assert!(!is_allowed(role, Action::FieldWork));
        }
    }

    #[test]
    fn salesperson_only_does_field_work() {
        for action in Action::ALL {
            assert_eq!(
                is_allowed(Role::Salesperson, action),
                action == Action::FieldWork,
                "ação {:?}",
                action
            );
        }
    }

    #[test]
    fn every_action_has_a_refusal_message() {
        for action in Action::ALL {
            assert!(action.forbidden_key().starts_with("forbidden."));
        }
    }

    #[test]
    fn role_wire_names() {
        assert_eq!(serde_json::to_string(&Role::Salesperson).unwrap(), "\"vendedor\"");
        assert_eq!(serde_json::from_str::<Role>("\"secretaria\"").unwrap(), Role::Secretary);
    }
}
