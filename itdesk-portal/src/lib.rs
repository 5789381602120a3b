//! itdesk-portal library - IT service desk HTTP service
//!
//! JSON API, localized HTML shell pages and an SSE notification stream
//! over the shared `itdesk-common` database and locale system.

use axum::Router;
use itdesk_common::config::PortalConfig;
use itdesk_common::events::EventBus;
use itdesk_common::locale::LocaleRegistry;
use itdesk_common::rate_limit::RateLimiter;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

pub mod api;
pub mod error;
pub mod middleware;
pub mod pagination;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Broadcast capacity of the event bus
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub registry: Arc<LocaleRegistry>,
    pub rate_limiter: Arc<RateLimiter>,
    pub event_bus: Arc<EventBus>,
    pub config: Arc<PortalConfig>,
    pub startup_time: Instant,
    /// Flips to `true` once shutdown begins; open event streams end on it
    pub shutdown: Arc<watch::Sender<bool>>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: PortalConfig) -> Self {
        let registry = LocaleRegistry::new(config.default_locale.clone(), config.locales_dir.clone());
        Self {
            db,
            registry: Arc::new(registry),
            rate_limiter: Arc::new(RateLimiter::new(&config.rate_limits)),
            event_bus: Arc::new(EventBus::new(EVENT_BUS_CAPACITY)),
            config: Arc::new(config),
            startup_time: Instant::now(),
            shutdown: Arc::new(watch::channel(false).0),
        }
    }

    /// Tell long-lived responses to finish so graceful shutdown can complete
    pub fn begin_shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}

/// Build application router
///
/// Public: health, build info, login, locale endpoints, pages and the
/// stylesheet. Everything else under `/api` needs a session.
pub fn build_router(state: AppState) -> Router {
    use axum::extract::DefaultBodyLimit;
    use axum::middleware;
    use axum::routing::{get, patch, post};
    use tower_http::trace::TraceLayer;

    let protected = Router::new()
        .route("/api/auth/logout", post(api::logout))
        .route("/api/auth/me", get(api::me))
        .route("/api/tickets", get(api::list_tickets).post(api::create_ticket))
        .route("/api/tickets/:id", get(api::get_ticket))
        .route("/api/tickets/:id/status", patch(api::update_ticket_status))
        .route("/api/tickets/:id/assign", patch(api::assign_ticket))
        .route("/api/assets", get(api::list_assets).post(api::create_asset))
        .route("/api/assets/:id", get(api::get_asset))
        .route("/api/assets/:id/status", patch(api::update_asset_status))
        .route("/api/assets/:id/assign", patch(api::assign_asset))
        .route("/api/users", get(api::list_users).post(api::create_user))
        .route("/api/users/admins", get(api::list_admins))
        .route("/api/users/:id", get(api::get_user))
        .route("/api/users/:id/role", patch(api::update_user_role))
        .route("/api/licenses", get(api::list_licenses).post(api::create_license))
        .route("/api/licenses/:id/assign", patch(api::assign_license))
        .route("/api/search", get(api::search))
        .route("/api/search/quick", get(api::quick_search))
        .route("/api/dashboard", get(api::dashboard))
        .route("/api/dashboard/charts", get(api::dashboard_charts))
        .route("/api/events", get(api::event_stream))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::session_middleware,
        ));

    let public = Router::new()
        .route("/api/auth/login", post(api::login))
        .route("/api/buildinfo", get(api::get_build_info))
        .route("/api/locales", get(api::list_locales))
        .route("/api/locales/validation", get(api::locale_validation))
        .route("/api/locales/:locale", get(api::get_locale_bundle))
        .route("/static/portal.css", get(api::serve_portal_css))
        .route("/", get(api::serve_home))
        .route("/:page", get(api::serve_page))
        .route("/:locale/:page", get(api::serve_localized_page))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .fallback(api::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::locale_middleware,
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
