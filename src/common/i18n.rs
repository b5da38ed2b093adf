// src/common/i18n.rs

use std::collections::HashMap;

use anyhow::Context;

use crate::middleware::i18n::Locale;

// Catálogos embutidos no binário
const CATALOGS: &[(&str, &str)] = &[
    ("es", include_str!("../../locales/es.json")),
    ("en", include_str!("../../locales/en.json")),
];

/// Mensagens traduzidas, indexadas por idioma e chave ("errors.not_found").
#[derive(Debug)]
pub struct I18nStore {
    default_lang: String,
    catalogs: HashMap<String, HashMap<String, String>>,
}

impl I18nStore {
    pub fn load(default_lang: &str) -> anyhow::Result<Self> {
        let mut catalogs = HashMap::new();
        for (lang, raw) in CATALOGS {
            let messages: HashMap<String, String> = serde_json::from_str(raw)
                .with_context(|| format!("Catálogo de mensagens '{}' inválido", lang))?;
            catalogs.insert(lang.to_string(), messages);
        }

        if !catalogs.contains_key(default_lang) {
            anyhow::bail!("Idioma padrão '{}' não possui catálogo", default_lang);
        }

        Ok(Self { default_lang: default_lang.to_string(), catalogs })
    }

    pub fn default_lang(&self) -> &str {
        &self.default_lang
    }

    /// Busca a mensagem no idioma pedido, depois no idioma padrão e, por fim, devolve a própria chave.
    /// Os marcadores `{0}`, `{1}`... são substituídos pelos argumentos na ordem.
    pub fn translate(&self, lang: &str, key: &str, args: &[&str]) -> String {
        let template = self
            .catalogs
            .get(lang)
            .and_then(|c| c.get(key))
            .or_else(|| self.catalogs.get(&self.default_lang).and_then(|c| c.get(key)))
            .map(String::as_str)
            .unwrap_or(key);

        args.iter()
            .enumerate()
            .fold(template.to_string(), |acc, (i, arg)| acc.replace(&format!("{{{}}}", i), arg))
    }

    pub fn t_args(&self, locale: &Locale, key: &str, args: &[&str]) -> String {
        self.translate(&locale.0, key, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_language_then_key() {
        let store = I18nStore::load("es").unwrap();
        let es = store.translate("es", "errors.invalid_token", &[]);
        let fr = store.translate("fr", "errors.invalid_token", &[]);
        assert_eq!(es, fr);
        assert_eq!(store.translate("en", "chave.que.nao.existe", &[]), "chave.que.nao.existe");
    }

    #[test]
    fn substitutes_positional_arguments() {
        let store = I18nStore::load("es").unwrap();
        let msg = store.translate("en", "errors.not_found", &["Route"]);
        assert!(msg.contains("Route"));
        assert!(!msg.contains("{0}"));
    }

    #[test]
    fn every_catalog_has_the_same_keys() {
        let store = I18nStore::load("es").unwrap();
        let es = &store.catalogs["es"];
        let en = &store.catalogs["en"];
        let mut missing: Vec<&String> = es.keys().filter(|k| !en.contains_key(*k)).collect();
        missing.extend(en.keys().filter(|k| !es.contains_key(*k)));
        assert!(missing.is_empty(), "chaves sem tradução: {:?}", missing);
    }

    #[test]
    fn rejects_unknown_default_language() {
        assert!(I18nStore::load("xx").is_err());
    }
}
