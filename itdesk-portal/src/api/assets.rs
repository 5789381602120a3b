//! Asset endpoints
//!
//! Every signed-in user may browse the inventory; changes are admin-only.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use itdesk_common::db::assets::{self as repo, AssetFilter};
use itdesk_common::db::models::{AssetDetail, AssetStatus};
use itdesk_common::db::Paginated;
use itdesk_common::events::DeskEvent;
use itdesk_common::rate_limit::RateLimitRule;
use itdesk_common::validation::{
    parse_enum, validate_create_asset, validate_optional_id, CreateAssetInput,
};
use serde::{Deserialize, Serialize};

use super::{localized, optional_filter, path_id, publish};
use crate::error::{ApiError, ApiResult};
use crate::middleware::{CurrentUser, RequestLocale};
use crate::pagination::PageQuery;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AssetListQuery {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub asset_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssetStatusUpdate {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssetAssignRequest {
    #[serde(default)]
    pub assigned_user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AssetResponse {
    pub asset: AssetDetail,
    pub message: String,
}

/// GET /api/assets
pub async fn list_assets(
    State(state): State<AppState>,
    Query(query): Query<AssetListQuery>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Paginated<AssetDetail>>> {
    let filter = AssetFilter {
        status: optional_filter::<AssetStatus>("status", query.status.as_deref())?,
        asset_type: query.asset_type,
    };
    let assets = repo::list_assets(&state.db, &filter, page.page, page.page_size).await?;
    Ok(Json(assets))
}

/// POST /api/assets
pub async fn create_asset(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(locale): Extension<RequestLocale>,
    Json(input): Json<CreateAssetInput>,
) -> ApiResult<(StatusCode, Json<AssetResponse>)> {
    current.require_admin()?;
    state
        .rate_limiter
        .check(RateLimitRule::CreateAsset, &current.user.id)?;

    let new_asset = validate_create_asset(&input)?;
    let asset = repo::create_asset(&state.db, &new_asset).await?;

    publish(
        &state,
        DeskEvent::AssetCreated {
            asset_id: asset.id.clone(),
            name: asset.name.clone(),
            timestamp: Utc::now(),
        },
    );

    let detail = repo::get_asset(&state.db, &asset.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Asset".to_string()))?;
    let message = localized(
        &state,
        locale.as_str(),
        "notifications.assetCreated",
        &[("name", asset.name.as_str())],
    );

    Ok((
        StatusCode::CREATED,
        Json(AssetResponse {
            asset: detail,
            message,
        }),
    ))
}

/// GET /api/assets/:id
pub async fn get_asset(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AssetDetail>> {
    path_id(&id, "Invalid asset ID")?;
    repo::get_asset(&state.db, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Asset".to_string()))
}

/// PATCH /api/assets/:id/status
pub async fn update_asset_status(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(locale): Extension<RequestLocale>,
    Path(id): Path<String>,
    Json(body): Json<AssetStatusUpdate>,
) -> ApiResult<Json<AssetResponse>> {
    current.require_admin()?;
    path_id(&id, "Invalid asset ID")?;
    let status: AssetStatus = parse_enum("status", body.status.as_deref(), "Invalid status")?;

    let asset = repo::update_asset_status(&state.db, &id, status).await?;
    publish(
        &state,
        DeskEvent::AssetStatusChanged {
            asset_id: asset.asset.id.clone(),
            status,
            timestamp: Utc::now(),
        },
    );

    Ok(Json(AssetResponse {
        asset,
        message: localized(&state, locale.as_str(), "notifications.assetStatusUpdated", &[]),
    }))
}

/// PATCH /api/assets/:id/assign
///
/// `assigned_user_id: null` unassigns and makes the asset AVAILABLE again.
pub async fn assign_asset(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(locale): Extension<RequestLocale>,
    Path(id): Path<String>,
    Json(body): Json<AssetAssignRequest>,
) -> ApiResult<Json<AssetResponse>> {
    current.require_admin()?;
    path_id(&id, "Invalid asset ID")?;
    let user_id = validate_optional_id("assigned_user_id", body.assigned_user_id.as_deref())?;

    let asset = repo::assign_asset(&state.db, &id, user_id.as_deref()).await?;
    publish(
        &state,
        DeskEvent::AssetAssigned {
            asset_id: asset.asset.id.clone(),
            assigned_user_id: user_id,
            timestamp: Utc::now(),
        },
    );

    Ok(Json(AssetResponse {
        asset,
        message: localized(
            &state,
            locale.as_str(),
            "notifications.assetAssignmentUpdated",
            &[],
        ),
    }))
}
