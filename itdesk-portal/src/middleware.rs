//! Request middleware: session authentication and locale handling

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use itdesk_common::db::models::{User, Viewer};
use itdesk_common::db::sessions::find_session_user;
use itdesk_common::locale::{
    canonical_path, detect_locale, is_excluded_path, locale_cookie, locale_from_path, read_cookie,
    strip_locale_prefix, LOCALE_COOKIE,
};
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Cookie carrying the session token for browser clients
pub const SESSION_COOKIE: &str = "itdesk-session";

/// Response header naming the locale the request was served in
pub const LOCALE_HEADER: &str = "x-locale";

/// Authenticated caller, inserted by `session_middleware`
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

impl CurrentUser {
    pub fn viewer(&self) -> Viewer {
        Viewer::from(&self.user)
    }

    pub fn is_admin(&self) -> bool {
        self.viewer().is_admin()
    }

    /// 403 unless the caller is an admin
    pub fn require_admin(&self) -> ApiResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            warn!("Admin operation refused for {}", self.user.email);
            Err(ApiError::forbidden())
        }
    }
}

/// Locale chosen for this request, inserted by `locale_middleware`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLocale(pub String);

impl RequestLocale {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Session token from `Authorization: Bearer` or the session cookie
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| read_cookie(cookies, SESSION_COOKIE))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Rejects requests without a live session
///
/// Applied to the protected API routes only.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = session_token(request.headers()) else {
        return Err(ApiError::Unauthorized("Authentication required".to_string()));
    };

    let user = find_session_user(&state.db, &token)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Session expired or invalid".to_string()))?;

    debug!("Request by {} ({})", user.email, user.role);
    request.extensions_mut().insert(CurrentUser { user, token });

    Ok(next.run(request).await)
}

/// Picks the request locale and keeps page URLs canonical
///
/// API and static requests get a locale from the cookie, then
/// `Accept-Language`, then the default; the path is ignored. Page requests
/// also honor a locale path prefix and are redirected (307) when their path
/// is not the canonical one for that locale.
pub async fn locale_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let registry = &state.registry;
    let supported = registry.available_locales();
    let default_locale = registry.default_locale().to_string();

    let path = request.uri().path().to_string();
    let headers = request.headers();
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|c| read_cookie(c, LOCALE_COOKIE))
        .map(str::to_string);
    let accept_language = headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if is_excluded_path(&path) {
        let locale = detect_locale(
            "",
            cookie.as_deref(),
            accept_language.as_deref(),
            &supported,
            &default_locale,
        );
        request.extensions_mut().insert(RequestLocale(locale.clone()));
        let mut response = next.run(request).await;
        set_header(&mut response, LOCALE_HEADER, &locale);
        return response;
    }

    let locale = detect_locale(
        &path,
        cookie.as_deref(),
        accept_language.as_deref(),
        &supported,
        &default_locale,
    );

    let bare_path = match locale_from_path(&path, &supported) {
        Some(path_locale) => strip_locale_prefix(&path, &path_locale),
        None => path.clone(),
    };
    let canonical = canonical_path(&bare_path, &locale, &default_locale);

    if canonical != path {
        let target = match request.uri().query() {
            Some(query) => format!("{}?{}", canonical, query),
            None => canonical,
        };
        debug!("Locale redirect {} -> {}", path, target);
        let mut response = (StatusCode::TEMPORARY_REDIRECT, Body::empty()).into_response();
        set_header(&mut response, header::LOCATION.as_str(), &target);
        set_header(&mut response, header::SET_COOKIE.as_str(), &locale_cookie(&locale));
        return response;
    }

    request.extensions_mut().insert(RequestLocale(locale.clone()));
    let mut response = next.run(request).await;
    set_header(&mut response, header::SET_COOKIE.as_str(), &locale_cookie(&locale));
    set_header(&mut response, LOCALE_HEADER, &locale);
    response
}

fn set_header(response: &mut Response, name: &str, value: &str) {
    let (Ok(name), Ok(value)) = (
        header::HeaderName::from_bytes(name.as_bytes()),
        HeaderValue::from_str(value),
    ) else {
        warn!("Dropping unrepresentable header {}: {}", name, value);
        return;
    };
    response.headers_mut().append(name, value);
}
