//! HTTP API handlers for itdesk-portal

pub mod assets;
pub mod auth;
pub mod buildinfo;
pub mod dashboard;
pub mod health;
pub mod licenses;
pub mod locales;
pub mod search;
pub mod sse;
pub mod tickets;
pub mod ui;
pub mod users;

pub use assets::{assign_asset, create_asset, get_asset, list_assets, update_asset_status};
pub use auth::{login, logout, me};
pub use buildinfo::get_build_info;
pub use dashboard::{dashboard, dashboard_charts};
pub use health::health_routes;
pub use licenses::{assign_license, create_license, list_licenses};
pub use locales::{get_locale_bundle, list_locales, locale_validation};
pub use search::{quick_search, search};
pub use sse::event_stream;
pub use tickets::{assign_ticket, create_ticket, get_ticket, list_tickets, update_ticket_status};
pub use ui::{not_found, serve_home, serve_localized_page, serve_page, serve_portal_css};
pub use users::{create_user, get_user, list_admins, list_users, update_user_role};

use crate::error::{ApiError, ApiResult};
use crate::AppState;
use itdesk_common::events::DeskEvent;
use itdesk_common::locale::{get_safe_string, interpolate};
use itdesk_common::validation::validate_id;
use std::str::FromStr;

/// Message from the locale bundles, `{name}` placeholders filled in
pub(crate) fn localized(state: &AppState, locale: &str, key: &str, values: &[(&str, &str)]) -> String {
    let chain = state.registry.fallback_chain();
    let template = get_safe_string(&state.registry, locale, key, &chain, None);
    interpolate(&template, values)
}

/// Optional enum filter from a query string; blank means "no filter"
pub(crate) fn optional_filter<T: FromStr>(field: &str, value: Option<&str>) -> ApiResult<Option<T>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("Invalid {} filter: {}", field, raw))),
    }
}

/// Path ids must be UUIDs
pub(crate) fn path_id(id: &str, message: &str) -> ApiResult<()> {
    validate_id("id", id, message).map_err(ApiError::from)
}

/// Broadcast without caring whether anyone listens
pub(crate) fn publish(state: &AppState, event: DeskEvent) {
    state.event_bus.emit_lossy(event);
}
