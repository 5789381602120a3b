//! Login, logout and the current-user endpoint

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use itdesk_common::auth::{authenticate, generate_session_token};
use itdesk_common::db::models::User;
use itdesk_common::db::sessions::{create_session, delete_session};
use itdesk_common::rate_limit::RateLimitRule;
use itdesk_common::validation::sanitize_email;
use itdesk_common::FieldError;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::localized;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{CurrentUser, RequestLocale, SESSION_COOKIE};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
    pub expires_at: String,
    pub message: String,
}

fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, token, max_age_secs
    )
}

/// POST /api/auth/login
///
/// Rate limited per email address. Unknown email and wrong password give
/// the same 401.
pub async fn login(
    State(state): State<AppState>,
    Extension(locale): Extension<RequestLocale>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Response> {
    let email = body.email.as_deref().map(sanitize_email).unwrap_or_default();
    let password = body.password.unwrap_or_default();

    let mut missing = Vec::new();
    if email.is_empty() {
        missing.push(FieldError::new(
            "email",
            localized(&state, locale.as_str(), "users.emailRequired", &[]),
        ));
    }
    if password.is_empty() {
        missing.push(FieldError::new(
            "password",
            localized(&state, locale.as_str(), "users.passwordRequired", &[]),
        ));
    }
    if !missing.is_empty() {
        return Err(ApiError::Validation(missing));
    }

    state.rate_limiter.check(RateLimitRule::Login, &email)?;

    let Some(user) = authenticate(&state.db, &email, &password).await? else {
        return Err(ApiError::Unauthorized(localized(
            &state,
            locale.as_str(),
            "auth.loginError",
            &[],
        )));
    };

    let ttl_hours = state.config.session_ttl_hours;
    let session = create_session(&state.db, &generate_session_token(), &user.id, ttl_hours).await?;
    info!("User {} signed in", user.email);

    let message = localized(
        &state,
        locale.as_str(),
        "auth.welcomeMessage",
        &[("name", user.name.as_str())],
    );
    let cookie = session_cookie(&session.token, ttl_hours * 3600);
    let body = LoginResponse {
        user,
        token: session.token,
        expires_at: session.expires_at,
        message,
    };

    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(locale): Extension<RequestLocale>,
) -> ApiResult<Response> {
    delete_session(&state.db, &current.token).await?;
    info!("User {} signed out", current.user.email);

    let message = localized(&state, locale.as_str(), "notifications.logoutSuccess", &[]);
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie("", 0))],
        Json(serde_json::json!({ "message": message })),
    )
        .into_response())
}

/// GET /api/auth/me
pub async fn me(Extension(current): Extension<CurrentUser>) -> Json<User> {
    Json(current.user)
}
