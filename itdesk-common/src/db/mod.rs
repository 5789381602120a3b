//! Database schema, models and repositories

pub mod assets;
pub mod init;
pub mod licenses;
pub mod migrations;
pub mod models;
pub mod pagination;
pub mod sessions;
pub mod tickets;
pub mod users;

pub use init::*;
pub use migrations::run_migrations;
pub use models::*;
pub use pagination::{Page, Paginated};

/// Escape `%`, `_` and `\` so user text is literal inside a `LIKE ... ESCAPE '\'` pattern
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Fresh random identifier
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
