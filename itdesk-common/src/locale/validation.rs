//! Locale completeness checks against a reference locale

use crate::locale::registry::LocaleRegistry;
use crate::locale::{required_locale_files, CATEGORIES};
use serde::Serialize;
use std::fmt::Write;
use std::sync::PoisonError;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryMissingKeys {
    pub category: String,
    pub keys: Vec<String>,
}

/// Outcome of comparing one locale with the reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocaleValidationResult {
    pub locale: String,
    pub is_complete: bool,
    pub missing_files: Vec<String>,
    pub missing_keys: Vec<CategoryMissingKeys>,
    pub warnings: Vec<String>,
}

impl LocaleValidationResult {
    fn new(locale: &str) -> Self {
        Self {
            locale: locale.to_string(),
            is_complete: true,
            missing_files: Vec::new(),
            missing_keys: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Total number of missing keys across categories
    pub fn missing_key_count(&self) -> usize {
        self.missing_keys.iter().map(|c| c.keys.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
    pub results: Vec<LocaleValidationResult>,
}

/// Compare every category and nested key of `reference` against `locale`
///
/// Results are cached per `(locale, reference)` until the registry cache
/// is cleared.
pub fn validate_locale(
    registry: &LocaleRegistry,
    locale: &str,
    reference: &str,
) -> LocaleValidationResult {
    let cache_key = (locale.to_string(), reference.to_string());
    if let Some(cached) = registry
        .validation_cache
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&cache_key)
    {
        return cached.clone();
    }

    let result = compare(registry, locale, reference);
    if !result.is_complete {
        warn!(
            "Locale '{}' is incomplete: {} missing files, {} missing keys",
            locale,
            result.missing_files.len(),
            result.missing_key_count()
        );
    }

    registry
        .validation_cache
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(cache_key, result.clone());
    result
}

fn compare(registry: &LocaleRegistry, locale: &str, reference: &str) -> LocaleValidationResult {
    let mut result = LocaleValidationResult::new(locale);

    let Some(locale_data) = registry.try_load(locale) else {
        result.is_complete = false;
        result
            .warnings
            .push(format!("Failed to load locale data for '{}'", locale));
        result.missing_files = required_locale_files();
        return result;
    };

    let Some(reference_data) = registry.try_load(reference) else {
        result
            .warnings
            .push(format!("Failed to load reference locale '{}'", reference));
        return result;
    };

    for category in CATEGORIES {
        if !locale_data.has_category(category) {
            result.is_complete = false;
            result.missing_files.push(format!("{}.json", category));
            let keys = reference_data.keys(category);
            if !keys.is_empty() {
                result.missing_keys.push(CategoryMissingKeys {
                    category: category.to_string(),
                    keys,
                });
            }
            continue;
        }

        let missing = locale_data.missing_keys(&reference_data, category);
        if !missing.is_empty() {
            result.is_complete = false;
            result.missing_keys.push(CategoryMissingKeys {
                category: category.to_string(),
                keys: missing,
            });
        }
    }

    result
}

/// Validate several locales against one reference
pub fn validate_all(
    registry: &LocaleRegistry,
    locales: &[String],
    reference: &str,
) -> ValidationSummary {
    let results: Vec<LocaleValidationResult> = locales
        .iter()
        .map(|locale| validate_locale(registry, locale, reference))
        .collect();

    let (valid, invalid): (Vec<_>, Vec<_>) = results.iter().partition(|r| r.is_complete);

    ValidationSummary {
        valid: valid.into_iter().map(|r| r.locale.clone()).collect(),
        invalid: invalid.into_iter().map(|r| r.locale.clone()).collect(),
        results,
    }
}

/// Human-readable report, validated against the registry's default locale
pub fn validation_report(registry: &LocaleRegistry, locales: &[String]) -> String {
    let summary = validate_all(registry, locales, registry.default_locale());
    let mut report = String::from("=== Locale Validation Report ===\n\n");

    let _ = writeln!(report, "Total locales: {}", locales.len());
    let _ = writeln!(
        report,
        "Valid: {} ({})",
        summary.valid.len(),
        summary.valid.join(", ")
    );
    let _ = writeln!(
        report,
        "Invalid: {} ({})\n",
        summary.invalid.len(),
        summary.invalid.join(", ")
    );

    for result in &summary.results {
        let _ = writeln!(report, "--- {} ---", result.locale.to_uppercase());
        let status = if result.is_complete {
            "✅ Complete"
        } else {
            "❌ Incomplete"
        };
        let _ = writeln!(report, "Status: {}", status);

        if !result.missing_files.is_empty() {
            let _ = writeln!(report, "Missing files: {}", result.missing_files.join(", "));
        }
        if !result.missing_keys.is_empty() {
            report.push_str("Missing keys:\n");
            for category in &result.missing_keys {
                let _ = writeln!(report, "  {}: {}", category.category, category.keys.join(", "));
            }
        }
        if !result.warnings.is_empty() {
            let _ = writeln!(report, "Warnings: {}", result.warnings.join("; "));
        }
        report.push('\n');
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_partial_fr() -> (tempfile::TempDir, LocaleRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let fr = dir.path().join("fr");
        std::fs::create_dir_all(&fr).unwrap();
        std::fs::write(fr.join("common.json"), r#"{"save": "Enregistrer"}"#).unwrap();
        std::fs::write(
            fr.join("dashboard.json"),
            r#"{"title": "Tableau de bord", "charts": {"count": "Nombre"}}"#,
        )
        .unwrap();
        let registry = LocaleRegistry::new("en", Some(dir.path().to_path_buf()));
        (dir, registry)
    }

    #[test]
    fn test_builtin_locales_are_complete() {
        let registry = LocaleRegistry::embedded();
        let result = validate_locale(&registry, "es", "en");
        assert!(result.is_complete, "{:?}", result);
        assert!(result.missing_files.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_partial_locale_reports_files_and_keys() {
        let (_dir, registry) = registry_with_partial_fr();
        let result = validate_locale(&registry, "fr", "en");

        assert!(!result.is_complete);
        assert!(result.missing_files.contains(&"auth.json".to_string()));
        assert!(!result.missing_files.contains(&"common.json".to_string()));

        let common = result
            .missing_keys
            .iter()
            .find(|c| c.category == "common")
            .unwrap();
        assert!(common.keys.contains(&"cancel".to_string()));
        assert!(!common.keys.contains(&"save".to_string()));

        let dashboard = result
            .missing_keys
            .iter()
            .find(|c| c.category == "dashboard")
            .unwrap();
        assert!(dashboard.keys.contains(&"charts.noData".to_string()));
        assert!(!dashboard.keys.contains(&"charts.count".to_string()));
    }

    #[test]
    fn test_unloadable_locale() {
        let registry = LocaleRegistry::embedded();
        let result = validate_locale(&registry, "xx", "en");
        assert!(!result.is_complete);
        assert_eq!(result.missing_files, required_locale_files());
        assert_eq!(result.warnings, vec!["Failed to load locale data for 'xx'"]);
    }

    #[test]
    fn test_unloadable_reference_only_warns() {
        let registry = LocaleRegistry::embedded();
        let result = validate_locale(&registry, "es", "xx");
        assert!(result.is_complete);
        assert_eq!(result.warnings, vec!["Failed to load reference locale 'xx'"]);
    }

    #[test]
    fn test_results_are_cached_until_cleared() {
        let (dir, registry) = registry_with_partial_fr();
        assert!(!validate_locale(&registry, "fr", "en").is_complete);

        // Completing the locale on disk is not seen until the cache is cleared
        let en = crate::locale::LocaleBundle::embedded("en").unwrap().unwrap();
        for category in CATEGORIES {
            let json = serde_json::to_string(en.category(category).unwrap()).unwrap();
            std::fs::write(dir.path().join("fr").join(format!("{}.json", category)), json).unwrap();
        }
        assert!(!validate_locale(&registry, "fr", "en").is_complete);

        registry.clear_cache();
        assert!(validate_locale(&registry, "fr", "en").is_complete);
    }

    #[test]
    fn test_validate_all_and_report() {
        let (_dir, registry) = registry_with_partial_fr();
        let locales = registry.available_locales();
        let summary = validate_all(&registry, &locales, "en");
        assert_eq!(summary.valid, vec!["en", "es"]);
        assert_eq!(summary.invalid, vec!["fr"]);
        assert_eq!(summary.results.len(), 3);

        let report = validation_report(&registry, &locales);
        assert!(report.starts_with("=== Locale Validation Report ===\n\nTotal locales: 3\n"));
        assert!(report.contains("Valid: 2 (en, es)\n"));
        assert!(report.contains("Invalid: 1 (fr)\n\n"));
        assert!(report.contains("--- FR ---\nStatus: ❌ Incomplete\n"));
        assert!(report.contains("--- EN ---\nStatus: ✅ Complete\n"));
        assert!(report.contains("Missing keys:\n  common: "));
    }
}
