// src/middleware/i18n.rs

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header, request::Parts};

use crate::common::i18n::I18nStore;

// Extrator de idioma
#[derive(Debug, Clone, PartialEq)]
pub struct Locale(pub String);

impl Locale {
    /// Lê o primeiro idioma do Accept-Language, mantendo só a subtag primária.
    pub fn from_header(value: Option<&str>, default_lang: &str) -> Self {
        let lang = value
            .and_then(|header_str| {
                accept_language::parse(header_str)
                    .first() // Pega o primeiro idioma (ex: "es-GT")
                    .map(|tag| {
                        // "es-GT" -> "es"
                        tag.split('-').next().unwrap_or(tag.as_str()).to_lowercase()
                    })
            })
            .filter(|lang| !lang.is_empty() && lang != "*")
            .unwrap_or_else(|| default_lang.to_string());

        Locale(lang)
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
    Arc<I18nStore>: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let store = Arc::<I18nStore>::from_ref(state);
        let header_value = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|header_value| header_value.to_str().ok());

        Ok(Locale::from_header(header_value, store.default_lang()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn keeps_primary_subtag_of_preferred_language() {
        assert_eq!(Locale::from_header(Some("en-US,en;q=0.9,es;q=0.8"), "es").0, "en");
        assert_eq!(Locale::from_header(Some("es;q=0.5,en-GB;q=0.9"), "es").0, "en");
    }

    #[test]
    fn missing_header_uses_default() {
        assert_eq!(Locale::from_header(None, "es").0, "es");
        assert_eq!(Locale::from_header(Some(""), "es").0, "es");
    }

    #[tokio::test]
    async fn extracts_from_request() {
        let state = Arc::new(I18nStore::load("es").unwrap());
        let (mut parts, _) = Request::builder()
            .header(header::ACCEPT_LANGUAGE, "en-GB")
            .body(())
            .unwrap()
            .into_parts();

        let Ok(locale) = Locale::from_request_parts(&mut parts, &state).await;
        assert_eq!(locale, Locale("en".into()));
    }
}
