pub mod assignments;
pub mod auth;
pub mod catalog;
pub mod dashboard;
pub mod documents;
pub mod planning;
pub mod routes;
pub mod transactions;
pub mod trucks;
pub mod users;

use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::{common::i18n::I18nStore, middleware::i18n::Locale};

/// Envelope das respostas de sucesso: mensagem traduzida + dados.
pub fn notice<T: Serialize>(store: &I18nStore, locale: &Locale, key: &str, args: &[&str], data: T) -> Json<Value> {
    Json(json!({
        "message": store.t_args(locale, key, args),
        "data": data,
    }))
}
