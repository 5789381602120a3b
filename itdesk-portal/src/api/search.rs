//! Unified search endpoints

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use itdesk_common::search::{
    flatten_results, unified_search, SearchLimits, SearchResult, UnifiedSearchResults,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiResult;
use crate::middleware::{CurrentUser, RequestLocale};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    #[serde(flatten)]
    pub results: UnifiedSearchResults,
}

#[derive(Debug, Serialize)]
pub struct QuickSearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
    pub total: usize,
}

async fn run_search(
    state: &AppState,
    current: &CurrentUser,
    query: &str,
) -> ApiResult<UnifiedSearchResults> {
    let limits = SearchLimits::load(&state.db).await?;
    let results = unified_search(&state.db, query, &current.viewer(), limits).await?;
    debug!("Search '{}' by {}: {} results", query, current.user.email, results.total);
    Ok(results)
}

/// GET /api/search?q=
///
/// Tickets, assets and users grouped by entity.
pub async fn search(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let query = params.q.unwrap_or_default();
    let results = run_search(&state, &current, &query).await?;
    Ok(Json(SearchResponse { query, results }))
}

/// GET /api/search/quick?q=
///
/// Flat rows for the header dropdown, labels in the request locale.
pub async fn quick_search(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(locale): Extension<RequestLocale>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<Json<QuickSearchResponse>> {
    let query = params.q.unwrap_or_default();
    let results = run_search(&state, &current, &query).await?;
    let rows = flatten_results(&results, &state.registry, locale.as_str());
    Ok(Json(QuickSearchResponse {
        query,
        total: rows.len(),
        results: rows,
    }))
}
