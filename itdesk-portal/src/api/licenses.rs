//! Software license endpoints (admin-only)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use itdesk_common::db::licenses as repo;
use itdesk_common::db::models::LicenseDetail;
use itdesk_common::events::DeskEvent;
use itdesk_common::validation::{validate_create_license, validate_optional_id, CreateLicenseInput};
use serde::{Deserialize, Serialize};

use super::{localized, path_id, publish};
use crate::error::{ApiError, ApiResult};
use crate::middleware::{CurrentUser, RequestLocale};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LicenseListQuery {
    pub expiring_within_days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LicenseAssignRequest {
    #[serde(default)]
    pub assigned_user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LicenseResponse {
    pub license: LicenseDetail,
    pub message: String,
}

/// GET /api/licenses[?expiring_within_days=N]
pub async fn list_licenses(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<LicenseListQuery>,
) -> ApiResult<Json<Vec<LicenseDetail>>> {
    current.require_admin()?;

    let licenses = match query.expiring_within_days {
        Some(days) if days < 0 => {
            return Err(ApiError::BadRequest(
                "expiring_within_days must not be negative".to_string(),
            ))
        }
        Some(days) => repo::expiring_licenses(&state.db, days).await?,
        None => repo::list_licenses(&state.db).await?,
    };
    Ok(Json(licenses))
}

/// POST /api/licenses
pub async fn create_license(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(locale): Extension<RequestLocale>,
    Json(input): Json<CreateLicenseInput>,
) -> ApiResult<(StatusCode, Json<LicenseResponse>)> {
    current.require_admin()?;

    let new_license = validate_create_license(&input)?;
    let license = repo::create_license(&state.db, &new_license).await?;

    publish(
        &state,
        DeskEvent::LicenseCreated {
            license_id: license.id.clone(),
            name: license.name.clone(),
            timestamp: Utc::now(),
        },
    );

    let detail = repo::get_license(&state.db, &license.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("License".to_string()))?;
    let message = localized(
        &state,
        locale.as_str(),
        "notifications.licenseCreated",
        &[("name", license.name.as_str())],
    );

    Ok((
        StatusCode::CREATED,
        Json(LicenseResponse {
            license: detail,
            message,
        }),
    ))
}

/// PATCH /api/licenses/:id/assign
pub async fn assign_license(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(locale): Extension<RequestLocale>,
    Path(id): Path<String>,
    Json(body): Json<LicenseAssignRequest>,
) -> ApiResult<Json<LicenseResponse>> {
    current.require_admin()?;
    path_id(&id, "Invalid license ID")?;
    let user_id = validate_optional_id("assigned_user_id", body.assigned_user_id.as_deref())?;

    let license = repo::assign_license(&state.db, &id, user_id.as_deref()).await?;
    Ok(Json(LicenseResponse {
        license,
        message: localized(&state, locale.as_str(), "notifications.licenseAssigned", &[]),
    }))
}
