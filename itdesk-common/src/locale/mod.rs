//! Locale bundles, fallback lookup, completeness validation and detection
//!
//! A locale is a set of category tables (`common`, `auth`, ...), each a JSON
//! object of strings or nested objects. Strings are addressed with dotted
//! keys such as `dashboard.charts.noData`.

pub mod bundle;
pub mod detect;
pub mod fallback;
pub mod registry;
pub mod validation;

pub use bundle::{LocaleBundle, EMBEDDED_LOCALES};
pub use detect::{
    canonical_path, detect_locale, is_excluded_path, locale_cookie, locale_from_path,
    match_accept_language, parse_accept_language, read_cookie, strip_locale_prefix,
    LOCALE_COOKIE, LOCALE_COOKIE_MAX_AGE,
};
pub use fallback::{
    asset_status_label, asset_type_label, category_label, get_safe_string,
    get_string_with_fallback, interpolate, priority_label, role_label, ticket_status_label,
    FallbackChain,
};
pub use registry::{is_locale_code, LocaleRegistry};
pub use validation::{
    validate_all, validate_locale, validation_report, CategoryMissingKeys, LocaleValidationResult,
    ValidationSummary,
};

/// Category tables every complete locale provides
pub const CATEGORIES: &[&str] = &[
    "common",
    "auth",
    "dashboard",
    "tickets",
    "assets",
    "users",
    "navigation",
    "notifications",
    "search",
];

/// File names a complete locale directory contains
pub fn required_locale_files() -> Vec<String> {
    CATEGORIES.iter().map(|c| format!("{}.json", c)).collect()
}
