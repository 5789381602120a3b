//! Localized HTML shell pages
//!
//! Pages are rendered server-side from the request's locale bundle. Data
//! is fetched by the browser from the JSON API.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    Extension,
};
use itdesk_common::locale::canonical_path;
use std::fmt::Write;

use super::localized;
use crate::error::ApiError;
use crate::middleware::RequestLocale;
use crate::AppState;

const PORTAL_CSS: &str = include_str!("../ui/portal.css");

/// Pages served under `/` and `/<locale>/`
pub const PAGES: &[&str] = &["dashboard", "tickets", "assets", "users", "search"];

/// GET /static/portal.css
pub async fn serve_portal_css() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        PORTAL_CSS,
    )
        .into_response()
}

/// GET /
pub async fn serve_home(
    State(state): State<AppState>,
    Extension(locale): Extension<RequestLocale>,
) -> Html<String> {
    Html(render_page(&state, locale.as_str(), None))
}

/// GET /:page
///
/// `/es` lands here too and renders the Spanish home page.
pub async fn serve_page(
    State(state): State<AppState>,
    Extension(locale): Extension<RequestLocale>,
    Path(page): Path<String>,
) -> Response {
    if state.registry.is_supported(&page) {
        return Html(render_page(&state, &page, None)).into_response();
    }
    page_or_not_found(&state, locale.as_str(), &page)
}

/// GET /:locale/:page
pub async fn serve_localized_page(
    State(state): State<AppState>,
    Extension(locale): Extension<RequestLocale>,
    Path((path_locale, page)): Path<(String, String)>,
) -> Response {
    if !state.registry.is_supported(&path_locale) {
        return not_found_page(&state, locale.as_str());
    }
    page_or_not_found(&state, &path_locale, &page)
}

/// Router fallback: JSON 404 under `/api`, HTML elsewhere
pub async fn not_found(
    State(state): State<AppState>,
    locale: Option<Extension<RequestLocale>>,
    uri: Uri,
) -> Response {
    if uri.path() == "/api" || uri.path().starts_with("/api/") {
        return ApiError::NotFound(format!("Route {}", uri.path())).into_response();
    }
    let locale = locale
        .map(|Extension(l)| l.0)
        .unwrap_or_else(|| state.registry.default_locale().to_string());
    not_found_page(&state, &locale)
}

fn page_or_not_found(state: &AppState, locale: &str, page: &str) -> Response {
    if PAGES.contains(&page) {
        Html(render_page(state, locale, Some(page))).into_response()
    } else {
        not_found_page(state, locale)
    }
}

fn not_found_page(state: &AppState, locale: &str) -> Response {
    let title = localized(state, locale, "common.notFound", &[]);
    let body = format!("<h1>{}</h1>", escape_html(&title));
    (
        StatusCode::NOT_FOUND,
        Html(shell(state, locale, None, &title, &body)),
    )
        .into_response()
}

/// Whole document for `page` (`None` = home)
pub fn render_page(state: &AppState, locale: &str, page: Option<&str>) -> String {
    let t = |key: &str| escape_html(&localized(state, locale, key, &[]));

    let (title, body) = match page {
        None => {
            let cards = [
                ("ticketsCardTitle", "ticketsCardDescription", "viewTickets", "/tickets"),
                ("assetsCardTitle", "assetsCardDescription", "viewAssets", "/assets"),
                ("usersCardTitle", "usersCardDescription", "manageUsers", "/users"),
            ];
            let mut body = format!(
                "<h1>{}</h1>\n<p class=\"subtitle\">{}</p>\n<div class=\"cards\">\n",
                t("navigation.welcomeTitle"),
                t("navigation.welcomeSubtitle")
            );
            for (card_title, description, link, path) in cards {
                let _ = writeln!(
                    body,
                    "<div class=\"card\"><h2>{}</h2><p>{}</p><a href=\"{}\">{}</a></div>",
                    t(&format!("navigation.{}", card_title)),
                    t(&format!("navigation.{}", description)),
                    page_href(state, locale, path),
                    t(&format!("navigation.{}", link)),
                );
            }
            body.push_str("</div>");
            (localized(state, locale, "navigation.itServiceDesk", &[]), body)
        }
        Some(page) => {
            let subtitle = if page == "search" {
                t("search.placeholder")
            } else {
                t(&format!("{}.subtitle", page))
            };
            let body = format!(
                "<h1>{}</h1>\n<p class=\"subtitle\">{}</p>\n<section id=\"{}-root\" data-locale=\"{}\"></section>",
                t(&format!("{}.title", page)),
                subtitle,
                page,
                escape_html(locale)
            );
            let title = format!(
                "{} | {}",
                localized(state, locale, &format!("navigation.{}", page), &[]),
                localized(state, locale, "navigation.itServiceDesk", &[])
            );
            (title, body)
        }
    };

    shell(state, locale, page, &title, &body)
}

fn page_href(state: &AppState, locale: &str, path: &str) -> String {
    canonical_path(path, locale, state.registry.default_locale())
}

fn shell(state: &AppState, locale: &str, page: Option<&str>, title: &str, body: &str) -> String {
    let mut nav = String::new();
    for item in PAGES {
        let class = if page == Some(*item) { " class=\"active\"" } else { "" };
        let _ = write!(
            nav,
            "<a href=\"{}\"{}>{}</a>",
            page_href(state, locale, &format!("/{}", item)),
            class,
            escape_html(&localized(state, locale, &format!("navigation.{}", item), &[]))
        );
    }

    let current_path = page.map(|p| format!("/{}", p)).unwrap_or_else(|| "/".to_string());
    let mut languages = String::new();
    for available in state.registry.available_locales() {
        let class = if available == locale { " class=\"active\"" } else { "" };
        let _ = write!(
            languages,
            "<a href=\"{}\" hreflang=\"{}\"{}>{}</a>",
            page_href(state, &available, &current_path),
            escape_html(&available),
            class,
            escape_html(&available.to_uppercase())
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="{lang}">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<link rel="stylesheet" href="/static/portal.css">
</head>
<body>
<header class="topbar">
<a class="brand" href="{home}">{brand}</a>
<nav class="sidebar">{nav}</nav>
<nav class="languages" aria-label="{language}">{languages}</nav>
</header>
<main>
{body}
</main>
</body>
</html>
"#,
        lang = escape_html(locale),
        title = escape_html(title),
        home = page_href(state, locale, "/"),
        brand = escape_html(&localized(state, locale, "navigation.itServiceDesk", &[])),
        nav = nav,
        language = escape_html(&localized(state, locale, "common.language", &[])),
        languages = languages,
        body = body,
    )
}

/// Minimal escaping for text and attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
