//! Request locale detection and canonical page paths

/// Cookie remembering the visitor's locale
pub const LOCALE_COOKIE: &str = "preferred-locale";

/// One year
pub const LOCALE_COOKIE_MAX_AGE: u64 = 60 * 60 * 24 * 365;

const EXCLUDED_PREFIXES: &[&str] = &[
    "/api",
    "/static",
    "/health",
    "/_next",
    "/favicon.ico",
    "/robots.txt",
    "/sitemap.xml",
    "/manifest.json",
];

const STATIC_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico", ".css", ".js", ".json",
];

/// Paths that never get locale handling
pub fn is_excluded_path(path: &str) -> bool {
    let prefixed = EXCLUDED_PREFIXES.iter().any(|prefix| {
        path == *prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/') || rest.starts_with('?'))
    });
    if prefixed {
        return true;
    }

    let lower = path.to_ascii_lowercase();
    STATIC_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

fn first_segment(path: &str) -> Option<&str> {
    path.trim_start_matches('/')
        .split('/')
        .next()
        .filter(|s| !s.is_empty())
}

/// Supported locale named by the first path segment
pub fn locale_from_path(path: &str, supported: &[String]) -> Option<String> {
    first_segment(path)
        .filter(|segment| supported.iter().any(|l| l == segment))
        .map(str::to_string)
}

/// `/es/tickets` -> `/tickets`, `/es` -> `/`
pub fn strip_locale_prefix(path: &str, locale: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    match trimmed.strip_prefix(locale) {
        Some("") => "/".to_string(),
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => path.to_string(),
    }
}

/// Language tags from an `Accept-Language` header, in header order
///
/// Quality parameters are dropped rather than used for ordering.
pub fn parse_accept_language(header: &str) -> Vec<String> {
    header
        .split(',')
        .filter_map(|entry| {
            let tag = entry.split(';').next().unwrap_or_default().trim();
            (!tag.is_empty() && tag != "*").then(|| tag.to_ascii_lowercase())
        })
        .collect()
}

/// Best supported match for an `Accept-Language` header
pub fn match_accept_language(header: &str, supported: &[String]) -> Option<String> {
    for tag in parse_accept_language(header) {
        if let Some(exact) = supported.iter().find(|l| l.to_ascii_lowercase() == tag) {
            return Some(exact.clone());
        }
        let primary = tag.split('-').next().unwrap_or_default();
        if let Some(prefix) = supported.iter().find(|l| l.as_str() == primary) {
            return Some(prefix.clone());
        }
    }
    None
}

/// Locale for a request
///
/// Path segment, then cookie, then `Accept-Language`, then the default.
pub fn detect_locale(
    path: &str,
    cookie: Option<&str>,
    accept_language: Option<&str>,
    supported: &[String],
    default_locale: &str,
) -> String {
    if let Some(locale) = locale_from_path(path, supported) {
        return locale;
    }

    if let Some(cookie) = cookie.map(str::trim).filter(|c| supported.iter().any(|l| l == c)) {
        return cookie.to_string();
    }

    if let Some(locale) = accept_language.and_then(|h| match_accept_language(h, supported)) {
        return locale;
    }

    default_locale.to_string()
}

/// Page path for `locale`: unprefixed for the default locale
pub fn canonical_path(path_without_locale: &str, locale: &str, default_locale: &str) -> String {
    let path = if path_without_locale.is_empty() {
        "/"
    } else {
        path_without_locale
    };

    if locale == default_locale {
        path.to_string()
    } else if path == "/" {
        format!("/{}", locale)
    } else {
        format!("/{}{}", locale, path)
    }
}

/// `Set-Cookie` value for the locale cookie
pub fn locale_cookie(locale: &str) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; SameSite=Lax",
        LOCALE_COOKIE, locale, LOCALE_COOKIE_MAX_AGE
    )
}

/// Value of one cookie from a `Cookie` header
pub fn read_cookie<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key.trim() == name).then(|| value.trim())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supported() -> Vec<String> {
        vec!["en".to_string(), "es".to_string()]
    }

    #[test]
    fn test_excluded_paths() {
        assert!(is_excluded_path("/api/tickets"));
        assert!(is_excluded_path("/api"));
        assert!(is_excluded_path("/health"));
        assert!(is_excluded_path("/static/portal.css"));
        assert!(is_excluded_path("/favicon.ico"));
        assert!(is_excluded_path("/images/logo.PNG"));
        assert!(!is_excluded_path("/apiary"));
        assert!(!is_excluded_path("/tickets"));
        assert!(!is_excluded_path("/"));
        assert!(!is_excluded_path("/es/dashboard"));
    }

    #[test]
    fn test_path_locale() {
        assert_eq!(locale_from_path("/es/tickets", &supported()), Some("es".into()));
        assert_eq!(locale_from_path("/es", &supported()), Some("es".into()));
        assert_eq!(locale_from_path("/fr/tickets", &supported()), None);
        assert_eq!(locale_from_path("/", &supported()), None);
        assert_eq!(locale_from_path("/essay", &supported()), None);
    }

    #[test]
    fn test_strip_locale_prefix() {
        assert_eq!(strip_locale_prefix("/es/tickets", "es"), "/tickets");
        assert_eq!(strip_locale_prefix("/es", "es"), "/");
        assert_eq!(strip_locale_prefix("/es/", "es"), "/");
        assert_eq!(strip_locale_prefix("/essay", "es"), "/essay");
        assert_eq!(strip_locale_prefix("/tickets", "es"), "/tickets");
    }

    #[test]
    fn test_accept_language() {
        assert_eq!(
            parse_accept_language("es-MX,es;q=0.9, en;q=0.8,*;q=0.1"),
            vec!["es-mx", "es", "en"]
        );
        assert_eq!(match_accept_language("fr-FR, es-ES;q=0.5", &supported()), Some("es".into()));
        assert_eq!(match_accept_language("fr-FR, de", &supported()), None);
        assert_eq!(match_accept_language("", &supported()), None);
    }

    #[test]
    fn test_detection_order() {
        let s = supported();
        assert_eq!(detect_locale("/es/x", Some("en"), Some("en"), &s, "en"), "es");
        assert_eq!(detect_locale("/x", Some("es"), Some("en"), &s, "en"), "es");
        assert_eq!(detect_locale("/x", Some("fr"), Some("es-AR"), &s, "en"), "es");
        assert_eq!(detect_locale("/x", None, Some("de"), &s, "en"), "en");
        assert_eq!(detect_locale("/x", None, None, &s, "es"), "es");
    }

    #[test]
    fn test_canonical_path() {
        assert_eq!(canonical_path("/tickets", "en", "en"), "/tickets");
        assert_eq!(canonical_path("/tickets", "es", "en"), "/es/tickets");
        assert_eq!(canonical_path("/", "es", "en"), "/es");
        assert_eq!(canonical_path("", "en", "en"), "/");
    }

    #[test]
    fn test_cookies() {
        assert_eq!(
            locale_cookie("es"),
            "preferred-locale=es; Path=/; Max-Age=31536000; SameSite=Lax"
        );
        let header = "a=1; preferred-locale=es ; itdesk-session=abc";
        assert_eq!(read_cookie(header, LOCALE_COOKIE), Some("es"));
        assert_eq!(read_cookie(header, "itdesk-session"), Some("abc"));
        assert_eq!(read_cookie(header, "missing"), None);
    }
}
