// src/middleware/auth.rs

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    typed_header::TypedHeaderRejection,
    TypedHeader,
};

use crate::{
    common::{error::{ApiError, AppError}, i18n::I18nStore},
    config::AppState,
    middleware::i18n::Locale,
    models::auth::User,
};

// Guardião das rotas protegidas: valida o Bearer token e injeta o usuário na requisição
pub async fn auth_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) =
        bearer.map_err(|_| AppError::InvalidToken.to_api_error(&locale, &app_state.i18n_store))?;

    let user = app_state
        .auth_service
        .validate_token(bearer.token())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    // Insere o usuário nos "extensions" da requisição
    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    Arc<I18nStore>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(user.clone());
        }

        let Ok(locale) = Locale::from_request_parts(parts, state).await;
        let store = Arc::<I18nStore>::from_ref(state);
        Err(AppError::InvalidToken.to_api_error(&locale, &store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{auth::sample_user, rbac::Role};
    use axum::http::{Request as HttpRequest, StatusCode};

    fn state() -> Arc<I18nStore> {
        Arc::new(I18nStore::load("es").unwrap())
    }

    #[tokio::test]
    async fn reads_user_inserted_by_the_guard() {
        let (mut parts, _) = HttpRequest::builder().body(()).unwrap().into_parts();
        let user = sample_user(Role::Secretary);
        parts.extensions.insert(AuthenticatedUser(user.clone()));

        let AuthenticatedUser(found) = AuthenticatedUser::from_request_parts(&mut parts, &state())
            .await
            .expect("usuário presente");
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn missing_user_is_unauthorized() {
        let (mut parts, _) = HttpRequest::builder().body(()).unwrap().into_parts();
        let err = AuthenticatedUser::from_request_parts(&mut parts, &state())
            .await
            .expect_err("sem usuário");
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }
}
