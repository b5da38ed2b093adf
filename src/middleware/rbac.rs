// src/middleware/rbac.rs

use std::{marker::PhantomData, sync::Arc};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{
    common::{error::{ApiError, AppError}, i18n::I18nStore},
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::rbac::{is_allowed, Action},
};

/// 1. O Trait que define o que é uma Permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn action() -> Action;
}

/// 2. O Extractor (Guardião). Roda antes do corpo do handler: sem permissão, nada é alterado.
pub struct RequirePermission<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    Arc<I18nStore>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;

        let action = T::action();
        if is_allowed(user.role, action) {
            return Ok(RequirePermission(PhantomData));
        }

        tracing::warn!("Usuário {} ({:?}) sem permissão para {:?}", user.id, user.role, action);
        let Ok(locale) = Locale::from_request_parts(parts, state).await;
        let store = Arc::<I18nStore>::from_ref(state);
        Err(AppError::Forbidden(action.forbidden_key()).to_api_error(&locale, &store))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

macro_rules! permission {
    ($name:ident, $action:expr) => {
        pub struct $name;
        impl PermissionDef for $name {
            fn action() -> Action {
                $action
            }
        }
    };
}

permission!(PermManageUsers, Action::ManageUsers);
permission!(PermManageCatalog, Action::ManageCatalog);
permission!(PermManageRoutes, Action::ManageRoutes);
permission!(PermManageAssignments, Action::ManageAssignments);
permission!(PermManageOrders, Action::ManageOrders);
permission!(PermFieldWork, Action::FieldWork);
