//! Dashboard endpoints

use axum::{extract::State, Extension, Json};
use itdesk_common::dashboard::{self as aggregate, DashboardCharts, DashboardOverview};

use crate::error::ApiResult;
use crate::middleware::{CurrentUser, RequestLocale};
use crate::AppState;

/// GET /api/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<DashboardOverview>> {
    let overview = aggregate::dashboard_overview(&state.db, &current.viewer()).await?;
    Ok(Json(overview))
}

/// GET /api/dashboard/charts
pub async fn dashboard_charts(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(locale): Extension<RequestLocale>,
) -> ApiResult<Json<DashboardCharts>> {
    let charts = aggregate::dashboard_charts(
        &state.db,
        &current.viewer(),
        &state.registry,
        locale.as_str(),
    )
    .await?;
    Ok(Json(charts))
}
