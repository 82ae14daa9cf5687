// src/common/i18n.rs

use std::collections::HashMap;

pub const DEFAULT_LANG: &str = "es";

// Catálogos embebidos en el binario
const CATALOGS: &[(&str, &str)] = &[
    ("es", include_str!("../../locales/es.json")),
    ("en", include_str!("../../locales/en.json")),
];

/// Mensajes de error por idioma. Se carga una vez y se comparte en el `AppState`.
#[derive(Debug, Clone)]
pub struct I18nStore {
    messages: HashMap<String, HashMap<String, String>>,
}

impl I18nStore {
    pub fn load() -> anyhow::Result<Self> {
        let mut messages = HashMap::new();
        for (lang, raw) in CATALOGS {
            let catalog: HashMap<String, String> = serde_json::from_str(raw)
                .map_err(|e| anyhow::anyhow!("Catálogo '{}' inválido: {}", lang, e))?;
            messages.insert(lang.to_string(), catalog);
        }
        Ok(Self { messages })
    }

    pub fn supports(&self, lang: &str) -> bool {
        self.messages.contains_key(lang)
    }

    /// Busca `key` en `lang`, cae al idioma por defecto y por último a la clave.
    pub fn translate(&self, lang: &str, key: &str, params: &[(&str, &str)]) -> String {
        let template = self
            .messages
            .get(lang)
            .and_then(|catalog| catalog.get(key))
            .or_else(|| self.messages.get(DEFAULT_LANG).and_then(|c| c.get(key)))
            .cloned()
            .unwrap_or_else(|| key.to_string());

        params.iter().fold(template, |acc, (name, value)| {
            acc.replace(&format!("{{{}}}", name), value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_language_falls_back_to_spanish() {
        let store = I18nStore::load().unwrap();
        assert_eq!(
            store.translate("de", "password_mismatch", &[]),
            "Las contraseñas no coinciden."
        );
    }

    #[test]
    fn params_are_substituted() {
        let store = I18nStore::load().unwrap();
        let msg = store.translate("en", "invalid_status", &[("status", "done")]);
        assert_eq!(msg, "Invalid status: 'done'.");
    }

    #[test]
    fn catalogs_share_the_same_keys() {
        let store = I18nStore::load().unwrap();
        let es: Vec<_> = store.messages["es"].keys().collect();
        for key in es {
            assert!(store.messages["en"].contains_key(key), "falta '{}' en en.json", key);
        }
    }
}
