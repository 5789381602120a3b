//! Locale discovery, bundles and completeness reports

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use itdesk_common::locale::{validate_all, ValidationSummary};
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::middleware::RequestLocale;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct LocaleList {
    pub locales: Vec<String>,
    pub default: String,
    pub current: String,
}

/// GET /api/locales
pub async fn list_locales(
    State(state): State<AppState>,
    Extension(locale): Extension<RequestLocale>,
) -> Json<LocaleList> {
    Json(LocaleList {
        locales: state.registry.available_locales(),
        default: state.registry.default_locale().to_string(),
        current: locale.0,
    })
}

/// GET /api/locales/:locale
///
/// Full bundle; keys the locale lacks are filled from the fallback chain.
pub async fn get_locale_bundle(
    State(state): State<AppState>,
    Path(locale): Path<String>,
) -> ApiResult<Json<Value>> {
    if !state.registry.is_supported(&locale) {
        return Err(ApiError::NotFound(format!("Locale '{}'", locale)));
    }
    let bundle = state
        .registry
        .load_resolved(&locale, &state.registry.fallback_chain())?;
    Ok(Json(bundle.to_json()))
}

/// GET /api/locales/validation
///
/// Every available locale checked against the default locale.
pub async fn locale_validation(State(state): State<AppState>) -> Json<ValidationSummary> {
    let locales = state.registry.available_locales();
    Json(validate_all(
        &state.registry,
        &locales,
        state.registry.default_locale(),
    ))
}
