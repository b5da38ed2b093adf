// src/common/error.rs

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{common::i18n::I18nStore, middleware::i18n::Locale};

// Códigos de erro do Postgres que tratamos de forma especial
const PG_UNIQUE_VIOLATION: &str = "23505";
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";
const PG_CHECK_VIOLATION: &str = "23514";

/// Erro de um campo específico do formulário (chave de tradução + argumentos).
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub key: &'static str,
    pub args: Vec<String>,
}

impl FieldError {
    pub fn new(field: impl Into<String>, key: &'static str) -> Self {
        Self { field: field.into(), key, args: Vec::new() }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Campos inválidos: {0:?}")]
    FieldErrors(Vec<FieldError>),

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Conta de usuário inativa")]
    InactiveAccount,

    // A chave identifica a ação recusada (ex: "forbidden.routes")
    #[error("Ação não permitida: {0}")]
    Forbidden(&'static str),

    #[error("Recurso não encontrado: {0}")]
    ResourceNotFound(&'static str),

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    #[error("Violação de chave estrangeira: {0}")]
    ForeignKeyViolation(String),

    // Regra de negócio violada, com mensagem traduzível
    #[error("Conflito: {key} {args:?}")]
    Conflict { key: &'static str, args: Vec<String> },

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Erro de E/S: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Fonte não encontrada: {0}")]
    FontNotFound(String),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn conflict(key: &'static str) -> Self {
        AppError::Conflict { key, args: Vec::new() }
    }

    pub fn field(field: &str, key: &'static str) -> Self {
        AppError::FieldErrors(vec![FieldError::new(field, key)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::FieldErrors(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::InactiveAccount | AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            AppError::UniqueConstraintViolation(_)
            | AppError::ForeignKeyViolation(_)
            | AppError::Conflict { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converte o erro interno em uma resposta traduzida para o idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        let lang = locale.0.as_str();
        let status = self.status();

        match self {
            AppError::ValidationError(errors) => {
                let mut details: HashMap<String, Vec<String>> = HashMap::new();
                for (field, e) in flatten_validation(errors) {
                    let code = e.message.as_deref().unwrap_or(e.code.as_ref());
                    details
                        .entry(field)
                        .or_default()
                        .push(store.translate(lang, &format!("validation.{}", code), &[]));
                }
                ApiError {
                    status,
                    error: store.translate(lang, "errors.validation", &[]),
                    details: Some(json!(details)),
                }
            }
            AppError::FieldErrors(errors) => {
                let mut details: HashMap<String, Vec<String>> = HashMap::new();
                for e in errors {
                    let args: Vec<&str> = e.args.iter().map(String::as_str).collect();
                    details
                        .entry(e.field.clone())
                        .or_default()
                        .push(store.translate(lang, &format!("validation.{}", e.key), &args));
                }
                ApiError {
                    status,
                    error: store.translate(lang, "errors.validation", &[]),
                    details: Some(json!(details)),
                }
            }
            AppError::InvalidCredentials => ApiError::simple(status, store.translate(lang, "errors.invalid_credentials", &[])),
            AppError::InvalidToken => ApiError::simple(status, store.translate(lang, "errors.invalid_token", &[])),
            AppError::InactiveAccount => ApiError::simple(status, store.translate(lang, "errors.inactive_account", &[])),
            AppError::Forbidden(key) => {
                tracing::warn!("Acesso negado: {}", key);
                ApiError::simple(status, store.translate(lang, key, &[]))
            }
            AppError::ResourceNotFound(resource) => {
                let what = store.translate(lang, &format!("resources.{}", resource), &[]);
                ApiError::simple(status, store.translate(lang, "errors.not_found", &[what.as_str()]))
            }
            AppError::UniqueConstraintViolation(constraint) | AppError::ForeignKeyViolation(constraint) => {
                tracing::warn!("Violação de restrição no banco: {}", constraint);
                ApiError::simple(status, store.translate(lang, "errors.constraint", &[]))
            }
            AppError::Conflict { key, args } => {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                ApiError::simple(status, store.translate(lang, key, &args))
            }
            e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                ApiError::simple(status, store.translate(lang, "errors.internal", &[]))
            }
        }
    }
}

/// Achata erros aninhados (`nested`) em caminhos como `lines[1].quantity`.
pub fn flatten_validation(errors: &validator::ValidationErrors) -> Vec<(String, &validator::ValidationError)> {
    fn walk<'a>(prefix: &str, errors: &'a validator::ValidationErrors, out: &mut Vec<(String, &'a validator::ValidationError)>) {
        for (field, kind) in errors.errors() {
            let path = if prefix.is_empty() { field.to_string() } else { format!("{}.{}", prefix, field) };
            match kind {
                validator::ValidationErrorsKind::Field(list) => out.extend(list.iter().map(|e| (path.clone(), e))),
                validator::ValidationErrorsKind::Struct(inner) => walk(&path, inner, out),
                validator::ValidationErrorsKind::List(items) => {
                    for (index, inner) in items {
                        walk(&format!("{}[{}]", path, index), inner, out);
                    }
                }
            }
        }
    }

    let mut out = Vec::new();
    walk("", errors, &mut out);
    out
}

// Conversão central dos erros do sqlx: violações de restrição viram erros de negócio
impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            match db_err.code().as_deref() {
                Some(PG_UNIQUE_VIOLATION) => return AppError::UniqueConstraintViolation(constraint),
                Some(PG_FOREIGN_KEY_VIOLATION) => return AppError::ForeignKeyViolation(constraint),
                Some(PG_CHECK_VIOLATION) => {
                    return AppError::Conflict { key: "errors.check_violation", args: vec![constraint] };
                }
                _ => {}
            }
        }
        AppError::DatabaseError(e)
    }
}

/// Traduz violações de unicidade conhecidas em erros de campo.
/// `mapping` = (nome da constraint, campo, chave de validação).
pub fn unique_to_field(err: AppError, mapping: &[(&str, &str, &'static str)]) -> AppError {
    if let AppError::UniqueConstraintViolation(constraint) = &err {
        if let Some((_, field, key)) = mapping.iter().find(|(c, _, _)| c == constraint) {
            return AppError::field(field, key);
        }
    }
    err
}

// O erro que de fato sai pela API
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn simple(status: StatusCode, error: String) -> Self {
        Self { status, error, details: None }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> I18nStore {
        I18nStore::load("es").expect("catálogos embutidos")
    }

    #[test]
    fn status_codes_follow_error_category() {
        assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("forbidden.routes").status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::ResourceNotFound("route").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::UniqueConstraintViolation("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::field("dpi", "dpi_length").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::InternalServerError(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn field_errors_are_grouped_and_translated() {
        let err = AppError::FieldErrors(vec![
            FieldError::new("dpi", "dpi_length"),
            FieldError::new("dpi", "dpi_digits"),
            FieldError::new("phone", "phone_digits"),
        ]);
        let api = err.to_api_error(&Locale("en".into()), &store());
        let details = api.details.expect("details");
        assert_eq!(details["dpi"].as_array().map(Vec::len), Some(2));
        assert_eq!(details["phone"].as_array().map(Vec::len), Some(1));
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::InternalServerError(anyhow::anyhow!("senha do banco vazou"));
        let api = err.to_api_error(&Locale("es".into()), &store());
        assert!(!api.error.contains("senha"));
        assert!(api.details.is_none());
    }

    #[test]
    fn known_unique_constraints_become_field_errors() {
        let err = AppError::UniqueConstraintViolation("clients_nit_key".into());
        let mapped = unique_to_field(err, &[("clients_nit_key", "nit", "nit_taken")]);
        match mapped {
            AppError::FieldErrors(errors) => assert_eq!(errors[0].field, "nit"),
            other => panic!("esperava erro de campo, veio {:?}", other),
        }

        let other = unique_to_field(
            AppError::UniqueConstraintViolation("outra".into()),
            &[("clients_nit_key", "nit", "nit_taken")],
        );
        assert!(matches!(other, AppError::UniqueConstraintViolation(_)));
    }
}
