//! User management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use itdesk_common::auth::new_user_from_draft;
use itdesk_common::db::models::{Role, User, UserProfile, UserSummary, UserWithCounts};
use itdesk_common::db::users as repo;
use itdesk_common::events::DeskEvent;
use itdesk_common::rate_limit::RateLimitRule;
use itdesk_common::validation::{parse_enum, validate_create_user, CreateUserInput};
use serde::{Deserialize, Serialize};

use super::{localized, path_id, publish};
use crate::error::{ApiError, ApiResult};
use crate::middleware::{CurrentUser, RequestLocale};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RoleUpdate {
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
    pub message: String,
}

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<UserWithCounts>>> {
    current.require_admin()?;
    Ok(Json(repo::list_users_with_counts(&state.db).await?))
}

/// GET /api/users/admins
///
/// Candidates for ticket assignment.
pub async fn list_admins(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<UserSummary>>> {
    current.require_admin()?;
    Ok(Json(repo::list_admins(&state.db).await?))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(locale): Extension<RequestLocale>,
    Json(input): Json<CreateUserInput>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    current.require_admin()?;
    state
        .rate_limiter
        .check(RateLimitRule::CreateUser, &current.user.id)?;

    let draft = validate_create_user(&input)?;
    let user = repo::create_user(&state.db, &new_user_from_draft(&draft)).await?;

    publish(
        &state,
        DeskEvent::UserCreated {
            user_id: user.id.clone(),
            name: user.name.clone(),
            role: user.role,
            timestamp: Utc::now(),
        },
    );

    let message = localized(
        &state,
        locale.as_str(),
        "notifications.userCreated",
        &[("name", user.name.as_str())],
    );
    Ok((StatusCode::CREATED, Json(UserResponse { user, message })))
}

/// GET /api/users/:id
///
/// Profile with tickets and assets; callers may read their own, admins any.
pub async fn get_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<UserProfile>> {
    path_id(&id, "Invalid user ID")?;
    if !current.is_admin() && current.user.id != id {
        return Err(ApiError::forbidden());
    }

    repo::get_user_profile(&state.db, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("User".to_string()))
}

/// PATCH /api/users/:id/role
pub async fn update_user_role(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(locale): Extension<RequestLocale>,
    Path(id): Path<String>,
    Json(body): Json<RoleUpdate>,
) -> ApiResult<Json<UserResponse>> {
    current.require_admin()?;
    path_id(&id, "Invalid user ID")?;
    let role: Role = parse_enum("role", body.role.as_deref(), "Invalid role")?;

    let user = repo::update_user_role(&state.db, &id, role).await?;
    publish(
        &state,
        DeskEvent::UserRoleChanged {
            user_id: user.id.clone(),
            role,
            timestamp: Utc::now(),
        },
    );

    Ok(Json(UserResponse {
        user,
        message: localized(&state, locale.as_str(), "notifications.userUpdated", &[]),
    }))
}
