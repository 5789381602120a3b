//! Locale discovery and the process-wide bundle cache

use crate::locale::bundle::{LocaleBundle, EMBEDDED_LOCALES};
use crate::locale::fallback::FallbackChain;
use crate::locale::validation::LocaleValidationResult;
use crate::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Known locales plus lazily loaded bundles
///
/// Bundles are loaded on first use and kept until `clear_cache`. The
/// built-in `en` and `es` bundles are always available; a locales
/// directory may add new locales or replace individual categories of the
/// built-in ones.
pub struct LocaleRegistry {
    default_locale: String,
    locales_dir: Option<PathBuf>,
    available: RwLock<Vec<String>>,
    cache: RwLock<HashMap<String, Arc<LocaleBundle>>>,
    pub(crate) validation_cache: RwLock<HashMap<(String, String), LocaleValidationResult>>,
}

impl LocaleRegistry {
    pub fn new(default_locale: impl Into<String>, locales_dir: Option<PathBuf>) -> Self {
        let registry = Self {
            default_locale: default_locale.into(),
            locales_dir,
            available: RwLock::new(Vec::new()),
            cache: RwLock::new(HashMap::new()),
            validation_cache: RwLock::new(HashMap::new()),
        };
        registry.discover();
        registry
    }

    /// Built-in locales only, English default
    pub fn embedded() -> Self {
        Self::new("en", None)
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn locales_dir(&self) -> Option<&Path> {
        self.locales_dir.as_deref()
    }

    /// Chain that ends in the default locale
    pub fn fallback_chain(&self) -> FallbackChain {
        FallbackChain::new(&self.default_locale, vec![self.default_locale.clone()])
    }

    /// Rescan built-in and directory locales
    pub fn discover(&self) {
        let mut found: Vec<String> = EMBEDDED_LOCALES.iter().map(|l| l.to_string()).collect();

        if let Some(dir) = &self.locales_dir {
            match std::fs::read_dir(dir) {
                Ok(entries) => {
                    for entry in entries.flatten() {
                        if !entry.path().is_dir() {
                            continue;
                        }
                        let name = entry.file_name().to_string_lossy().to_string();
                        if is_locale_code(&name) {
                            found.push(name);
                        } else {
                            debug!("Skipping non-locale directory {}", entry.path().display());
                        }
                    }
                }
                Err(e) => warn!("Cannot read locales directory {}: {}", dir.display(), e),
            }
        }

        let mut available = self.available.write().unwrap_or_else(PoisonError::into_inner);
        for locale in found {
            if !available.contains(&locale) {
                available.push(locale);
            }
        }
        sort_locales(&mut available, &self.default_locale);
        info!("Available locales: {}", available.join(", "));
    }

    /// Default locale first, the rest alphabetically
    pub fn available_locales(&self) -> Vec<String> {
        self.available
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_supported(&self, locale: &str) -> bool {
        self.available
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|l| l == locale)
    }

    /// Add a locale at runtime; its bundle is read from the locales directory
    pub fn register_locale(&self, locale: &str) -> bool {
        if !is_locale_code(locale) {
            warn!("Refusing to register invalid locale code '{}'", locale);
            return false;
        }

        let mut available = self.available.write().unwrap_or_else(PoisonError::into_inner);
        if available.iter().any(|l| l == locale) {
            return false;
        }
        available.push(locale.to_string());
        sort_locales(&mut available, &self.default_locale);
        info!("Registered new locale: {}", locale);
        true
    }

    /// Bundle for a locale, from cache when possible
    pub fn load(&self, locale: &str) -> Result<Arc<LocaleBundle>> {
        if let Some(bundle) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(locale)
        {
            return Ok(Arc::clone(bundle));
        }

        if !self.is_supported(locale) {
            return Err(Error::Locale(format!("Unsupported locale '{}'", locale)));
        }

        let bundle = Arc::new(self.read_bundle(locale)?);
        debug!("Loaded locale {}", locale);

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let entry = cache
            .entry(locale.to_string())
            .or_insert_with(|| Arc::clone(&bundle));
        Ok(Arc::clone(entry))
    }

    /// `load` that logs and swallows failures
    pub fn try_load(&self, locale: &str) -> Option<Arc<LocaleBundle>> {
        match self.load(locale) {
            Ok(bundle) => Some(bundle),
            Err(e) => {
                warn!("Failed to load locale '{}': {}", locale, e);
                None
            }
        }
    }

    /// Bundle with every missing key filled from the fallback chain
    pub fn load_resolved(&self, locale: &str, chain: &FallbackChain) -> Result<LocaleBundle> {
        let mut bundle = (*self.load(locale)?).clone();
        for fallback in chain.candidates(locale).into_iter().skip(1) {
            if let Some(other) = self.try_load(fallback) {
                bundle.fill_missing_from(&other);
            }
        }
        Ok(bundle)
    }

    /// Forget loaded bundles and validation results, then rediscover
    pub fn clear_cache(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.validation_cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.discover();
        info!("Locale caches cleared");
    }

    fn read_bundle(&self, locale: &str) -> Result<LocaleBundle> {
        let embedded = LocaleBundle::embedded(locale)?;
        let from_dir = match &self.locales_dir {
            Some(dir) => LocaleBundle::load_dir(dir, locale)?,
            None => None,
        };

        match (embedded, from_dir) {
            (Some(mut base), Some(overrides)) => {
                base.apply_overrides(overrides);
                Ok(base)
            }
            (Some(base), None) => Ok(base),
            (None, Some(bundle)) => Ok(bundle),
            (None, None) => Err(Error::Locale(format!("No data found for locale '{}'", locale))),
        }
    }
}

/// `en`, `es`, `pt-BR` style codes
pub fn is_locale_code(value: &str) -> bool {
    let mut parts = value.split('-');
    let primary = parts.next().unwrap_or_default();
    (2..=3).contains(&primary.len())
        && primary.chars().all(|c| c.is_ascii_lowercase())
        && parts.all(|p| (2..=8).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphanumeric()))
}

fn sort_locales(locales: &mut [String], default_locale: &str) {
    locales.sort_by(|a, b| {
        (a != default_locale)
            .cmp(&(b != default_locale))
            .then_with(|| a.cmp(b))
    });
}
