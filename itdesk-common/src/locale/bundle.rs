//! One locale's string tables

use crate::locale::CATEGORIES;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, warn};

/// Locales compiled into the binary
pub const EMBEDDED_LOCALES: &[&str] = &["en", "es"];

macro_rules! embedded_locale {
    ($locale:literal) => {
        vec![
            ("common", include_str!(concat!("../../locales/", $locale, "/common.json"))),
            ("auth", include_str!(concat!("../../locales/", $locale, "/auth.json"))),
            ("dashboard", include_str!(concat!("../../locales/", $locale, "/dashboard.json"))),
            ("tickets", include_str!(concat!("../../locales/", $locale, "/tickets.json"))),
            ("assets", include_str!(concat!("../../locales/", $locale, "/assets.json"))),
            ("users", include_str!(concat!("../../locales/", $locale, "/users.json"))),
            ("navigation", include_str!(concat!("../../locales/", $locale, "/navigation.json"))),
            ("notifications", include_str!(concat!("../../locales/", $locale, "/notifications.json"))),
            ("search", include_str!(concat!("../../locales/", $locale, "/search.json"))),
        ]
    };
}

static EMBEDDED: Lazy<HashMap<&'static str, Vec<(&'static str, &'static str)>>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert("en", embedded_locale!("en"));
    map.insert("es", embedded_locale!("es"));
    map
});

/// Category tables for one locale
#[derive(Debug, Clone, PartialEq)]
pub struct LocaleBundle {
    locale: String,
    categories: BTreeMap<String, Map<String, Value>>,
}

impl LocaleBundle {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            categories: BTreeMap::new(),
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Add or replace a category; the value must be a JSON object
    pub fn insert_category(&mut self, category: &str, value: Value) -> Result<()> {
        match value {
            Value::Object(map) => {
                self.categories.insert(category.to_string(), map);
                Ok(())
            }
            _ => Err(Error::Locale(format!(
                "{}/{}.json must contain a JSON object",
                self.locale, category
            ))),
        }
    }

    /// Parse a category from JSON text
    pub fn insert_category_json(&mut self, category: &str, json: &str) -> Result<()> {
        let value: Value = serde_json::from_str(json).map_err(|e| {
            Error::Locale(format!("{}/{}.json is not valid JSON: {}", self.locale, category, e))
        })?;
        self.insert_category(category, value)
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    pub fn category(&self, category: &str) -> Option<&Map<String, Value>> {
        self.categories.get(category)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Raw value at a dotted key (`category.key[.sub...]`)
    pub fn value(&self, key: &str) -> Option<&Value> {
        let mut parts = key.split('.');
        let category = parts.next()?;
        let mut current = self.categories.get(category)?;
        let mut parts = parts.peekable();

        while let Some(part) = parts.next() {
            let value = current.get(part)?;
            if parts.peek().is_none() {
                return Some(value);
            }
            current = value.as_object()?;
        }
        None
    }

    /// Non-empty string at a dotted key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.value(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Every leaf key of a category, dotted relative to the category
    pub fn keys(&self, category: &str) -> Vec<String> {
        let mut keys = Vec::new();
        if let Some(map) = self.categories.get(category) {
            collect_keys(map, "", &mut keys);
        }
        keys
    }

    /// Keys present in `reference` but absent here, per reference category
    pub(crate) fn missing_keys(&self, reference: &LocaleBundle, category: &str) -> Vec<String> {
        reference
            .keys(category)
            .into_iter()
            .filter(|key| self.value(&format!("{}.{}", category, key)).is_none())
            .collect()
    }

    /// Built-in bundle, if this locale is compiled in
    pub fn embedded(locale: &str) -> Result<Option<LocaleBundle>> {
        let Some(files) = EMBEDDED.get(locale) else {
            return Ok(None);
        };

        let mut bundle = LocaleBundle::new(locale);
        for (category, json) in files {
            bundle.insert_category_json(category, json)?;
        }
        Ok(Some(bundle))
    }

    /// Bundle from `<dir>/<locale>/<category>.json`, `None` if no file exists
    pub fn load_dir(dir: &Path, locale: &str) -> Result<Option<LocaleBundle>> {
        let locale_dir = dir.join(locale);
        if !locale_dir.is_dir() {
            return Ok(None);
        }

        let mut bundle = LocaleBundle::new(locale);
        for category in CATEGORIES {
            let path = locale_dir.join(format!("{}.json", category));
            if !path.exists() {
                debug!("Locale file missing: {}", path.display());
                continue;
            }
            let json = std::fs::read_to_string(&path)
                .map_err(|e| Error::Locale(format!("Read {} failed: {}", path.display(), e)))?;
            bundle.insert_category_json(category, &json)?;
        }

        if bundle.is_empty() {
            warn!("Locale directory {} has no category files", locale_dir.display());
            return Ok(None);
        }
        Ok(Some(bundle))
    }

    /// Replace categories with those from `overrides`
    pub fn apply_overrides(&mut self, overrides: LocaleBundle) {
        for (category, map) in overrides.categories {
            self.categories.insert(category, map);
        }
    }

    /// Copy in every key of `fallback` this bundle lacks
    pub fn fill_missing_from(&mut self, fallback: &LocaleBundle) {
        for (category, fallback_map) in &fallback.categories {
            let target = self.categories.entry(category.clone()).or_default();
            merge_missing(target, fallback_map);
        }
    }

    /// All categories as one JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.categories
                .iter()
                .map(|(k, v)| (k.clone(), Value::Object(v.clone())))
                .collect(),
        )
    }
}

fn collect_keys(map: &Map<String, Value>, prefix: &str, out: &mut Vec<String>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::Object(nested) => collect_keys(nested, &path, out),
            _ => out.push(path),
        }
    }
}

fn merge_missing(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        match (target.get_mut(key), value) {
            (Some(Value::Object(t)), Value::Object(s)) => merge_missing(t, s),
            (Some(Value::String(t)), Value::String(s)) if t.is_empty() => *t = s.clone(),
            (Some(_), _) => {}
            (None, _) => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_embedded_bundles_have_every_category() {
        for locale in EMBEDDED_LOCALES {
            let bundle = LocaleBundle::embedded(locale).unwrap().unwrap();
            for category in CATEGORIES {
                assert!(bundle.has_category(category), "{} lacks {}", locale, category);
            }
        }
        assert!(LocaleBundle::embedded("fr").unwrap().is_none());
    }

    #[test]
    fn test_dotted_lookup() {
        let bundle = LocaleBundle::embedded("en").unwrap().unwrap();
        assert_eq!(bundle.get("common.save"), Some("Save"));
        assert_eq!(bundle.get("dashboard.charts.noData"), Some("No data available"));
        assert_eq!(bundle.get("dashboard.charts"), None);
        assert_eq!(bundle.get("common.nope"), None);
        assert_eq!(bundle.get("nope"), None);
    }

    #[test]
    fn test_empty_string_is_missing() {
        let mut bundle = LocaleBundle::new("xx");
        bundle.insert_category("common", json!({"save": ""})).unwrap();
        assert_eq!(bundle.get("common.save"), None);
        assert!(bundle.value("common.save").is_some());
    }

    #[test]
    fn test_keys_are_flattened() {
        let mut bundle = LocaleBundle::new("xx");
        bundle
            .insert_category("dashboard", json!({"title": "T", "charts": {"count": "C"}}))
            .unwrap();
        let mut keys = bundle.keys("dashboard");
        keys.sort();
        assert_eq!(keys, vec!["charts.count", "title"]);
    }

    #[test]
    fn test_fill_missing_is_deep() {
        let mut partial = LocaleBundle::new("xx");
        partial
            .insert_category("dashboard", json!({"title": "Tablero", "charts": {}}))
            .unwrap();
        let en = LocaleBundle::embedded("en").unwrap().unwrap();
        partial.fill_missing_from(&en);

        assert_eq!(partial.get("dashboard.title"), Some("Tablero"));
        assert_eq!(partial.get("dashboard.charts.count"), Some("Count"));
        assert_eq!(partial.get("common.cancel"), Some("Cancel"));
    }

    #[test]
    fn test_non_object_category_rejected() {
        let mut bundle = LocaleBundle::new("xx");
        assert!(bundle.insert_category("common", json!(["a"])).is_err());
        assert!(bundle.insert_category_json("common", "{not json").is_err());
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        let fr = dir.path().join("fr");
        std::fs::create_dir_all(&fr).unwrap();
        std::fs::write(fr.join("common.json"), r#"{"save": "Enregistrer"}"#).unwrap();
        std::fs::write(fr.join("extras.json"), r#"{"hello": "Bonjour"}"#).unwrap();

        let bundle = LocaleBundle::load_dir(dir.path(), "fr").unwrap().unwrap();
        assert_eq!(bundle.get("common.save"), Some("Enregistrer"));
        assert!(!bundle.has_category("auth"));
        // Only known category files are read
        assert!(!bundle.has_category("extras"));
        assert_eq!(bundle.get("extras.hello"), None);
        assert!(LocaleBundle::load_dir(dir.path(), "de").unwrap().is_none());
    }
}
