//! String lookup across a chain of locales, placeholder interpolation and
//! enum labels

use crate::db::models::{AssetStatus, Priority, Role, TicketStatus};
use crate::locale::registry::LocaleRegistry;
use tracing::{debug, warn};

/// Locales consulted, in order, when a key is missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackChain {
    pub primary: String,
    pub fallbacks: Vec<String>,
}

impl Default for FallbackChain {
    fn default() -> Self {
        Self::new("en", vec!["en".to_string()])
    }
}

impl FallbackChain {
    pub fn new(primary: &str, fallbacks: Vec<String>) -> Self {
        Self {
            primary: primary.to_string(),
            fallbacks,
        }
    }

    /// `[locale, fallbacks...]` with duplicates removed, order kept
    pub fn candidates<'a>(&'a self, locale: &'a str) -> Vec<&'a str> {
        let mut out: Vec<&str> = Vec::with_capacity(self.fallbacks.len() + 1);
        for candidate in std::iter::once(locale).chain(self.fallbacks.iter().map(String::as_str)) {
            if !out.contains(&candidate) {
                out.push(candidate);
            }
        }
        out
    }
}

/// First non-empty value for `key` along the chain
pub fn get_string_with_fallback(
    registry: &LocaleRegistry,
    locale: &str,
    key: &str,
    chain: &FallbackChain,
) -> Option<String> {
    let candidates = chain.candidates(locale);

    for candidate in &candidates {
        let Some(bundle) = registry.try_load(candidate) else {
            continue;
        };
        if let Some(value) = bundle.get(key) {
            if *candidate != locale {
                debug!(
                    "Using fallback locale '{}' for {} (requested: '{}')",
                    candidate, key, locale
                );
            }
            return Some(value.to_string());
        }
    }

    warn!(
        "Missing translation: {} for locale chain: {}",
        key,
        candidates.join(" → ")
    );
    None
}

/// Lookup that always yields something displayable
pub fn get_safe_string(
    registry: &LocaleRegistry,
    locale: &str,
    key: &str,
    chain: &FallbackChain,
    error_fallback: Option<&str>,
) -> String {
    get_string_with_fallback(registry, locale, key, chain)
        .or_else(|| error_fallback.filter(|s| !s.is_empty()).map(str::to_string))
        .unwrap_or_else(|| format!("[Missing: {}]", key))
}

/// Replace `{name}` placeholders
///
/// Placeholders without a value (or with an empty one) are left as they
/// are.
pub fn interpolate(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let name_len = after
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let name = &after[..name_len];

        if name_len > 0 && after[name_len..].starts_with('}') {
            match values.iter().find(|(k, _)| *k == name) {
                Some((_, value)) if !value.is_empty() => out.push_str(value),
                _ => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
            }
            rest = &after[name_len + 1..];
        } else {
            out.push('{');
            rest = after;
        }
    }

    out.push_str(rest);
    out
}

/// `IN_PROGRESS` -> `InProgress`
fn pascal_case(value: &str) -> String {
    value
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let lower = part.to_ascii_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn label(registry: &LocaleRegistry, locale: &str, key: &str, raw: &str) -> String {
    get_string_with_fallback(registry, locale, key, &registry.fallback_chain())
        .unwrap_or_else(|| raw.to_string())
}

pub fn priority_label(registry: &LocaleRegistry, locale: &str, priority: Priority) -> String {
    let key = format!("common.priority{}", pascal_case(priority.as_str()));
    label(registry, locale, &key, priority.as_str())
}

pub fn ticket_status_label(registry: &LocaleRegistry, locale: &str, status: TicketStatus) -> String {
    let key = format!("common.status{}", pascal_case(status.as_str()));
    label(registry, locale, &key, status.as_str())
}

pub fn asset_status_label(registry: &LocaleRegistry, locale: &str, status: AssetStatus) -> String {
    let key = format!("common.status{}", pascal_case(status.as_str()));
    label(registry, locale, &key, status.as_str())
}

pub fn role_label(registry: &LocaleRegistry, locale: &str, role: Role) -> String {
    let key = match role {
        Role::Admin => "common.admin",
        Role::EndUser => "common.endUser",
    };
    label(registry, locale, key, role.as_str())
}

/// Ticket categories with a translation; anything else is shown raw
pub const TICKET_CATEGORIES: &[&str] = &["HARDWARE", "SOFTWARE", "NETWORK", "ACCESS", "OTHER"];

/// Asset types with a translation; anything else is shown raw
pub const ASSET_TYPES: &[&str] = &[
    "COMPUTER",
    "MONITOR",
    "KEYBOARD",
    "MOUSE",
    "NETWORK_EQUIPMENT",
    "PRINTER",
    "OTHER",
];

pub fn category_label(registry: &LocaleRegistry, locale: &str, category: &str) -> String {
    let normalized = category.trim().to_ascii_uppercase();
    if !TICKET_CATEGORIES.contains(&normalized.as_str()) {
        return category.to_string();
    }
    let key = format!("tickets.category{}", pascal_case(&normalized));
    label(registry, locale, &key, category)
}

pub fn asset_type_label(registry: &LocaleRegistry, locale: &str, asset_type: &str) -> String {
    let normalized = asset_type.trim().to_ascii_uppercase().replace(' ', "_");
    if !ASSET_TYPES.contains(&normalized.as_str()) {
        return asset_type.to_string();
    }
    let key = format!("assets.type{}", pascal_case(&normalized));
    label(registry, locale, &key, asset_type)
}
