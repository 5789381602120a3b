//! Unified search across tickets, assets and users
//!
//! The three entity queries run concurrently against the pool. Each uses an
//! escaped `LIKE` pattern to narrow rows in SQLite, then the rows are
//! re-checked in Rust with a case-insensitive substring match over the same
//! fields before being truncated to the result limit.

use crate::db::assets::{asset_detail_from_row, ASSET_DETAIL_SELECT};
use crate::db::init::get_setting;
use crate::db::models::{AssetDetail, TicketDetail, UserWithCounts, Viewer};
use crate::db::tickets::{ticket_detail_from_row, TICKET_DETAIL_SELECT};
use crate::db::users::with_counts_from_row;
use crate::db::like_pattern;
use crate::locale::{
    asset_status_label, asset_type_label, canonical_path, category_label, priority_label,
    role_label, ticket_status_label, LocaleRegistry,
};
use crate::Result;
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::BTreeMap;
use tracing::debug;

/// Row limits for each entity search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    /// Tickets returned (applied in SQL)
    pub ticket_limit: i64,
    /// Asset rows fetched before re-filtering
    pub asset_fetch: i64,
    /// User rows fetched before re-filtering
    pub user_fetch: i64,
    /// Assets and users kept after re-filtering
    pub result_limit: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            ticket_limit: 10,
            asset_fetch: 20,
            user_fetch: 20,
            result_limit: 10,
        }
    }
}

impl SearchLimits {
    /// Limits from the settings table, defaults for anything unset
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            ticket_limit: get_setting(pool, "search_ticket_limit")
                .await?
                .unwrap_or(defaults.ticket_limit),
            asset_fetch: get_setting(pool, "search_asset_fetch")
                .await?
                .unwrap_or(defaults.asset_fetch),
            user_fetch: get_setting(pool, "search_user_fetch")
                .await?
                .unwrap_or(defaults.user_fetch),
            result_limit: get_setting(pool, "search_result_limit")
                .await?
                .unwrap_or(defaults.result_limit),
        })
    }
}

/// Grouped search results
#[derive(Debug, Clone, Default, Serialize)]
pub struct UnifiedSearchResults {
    pub tickets: Vec<TicketDetail>,
    pub assets: Vec<AssetDetail>,
    pub users: Vec<UserWithCounts>,
    pub total: usize,
}

impl UnifiedSearchResults {
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Search all three entities for `query`
///
/// A blank query returns empty results without touching the database.
/// End users only see their own tickets; assets and users are not scoped.
pub async fn unified_search(
    pool: &SqlitePool,
    query: &str,
    viewer: &Viewer,
    limits: SearchLimits,
) -> Result<UnifiedSearchResults> {
    let term = query.trim().to_lowercase();
    if term.is_empty() {
        return Ok(UnifiedSearchResults::default());
    }

    let (tickets, assets, users) = tokio::try_join!(
        search_tickets(pool, &term, viewer, limits),
        search_assets(pool, &term, limits),
        search_users(pool, &term, limits),
    )?;

    let total = tickets.len() + assets.len() + users.len();
    debug!(
        "Search '{}': {} tickets, {} assets, {} users",
        term,
        tickets.len(),
        assets.len(),
        users.len()
    );

    Ok(UnifiedSearchResults {
        tickets,
        assets,
        users,
        total,
    })
}

async fn search_tickets(
    pool: &SqlitePool,
    term: &str,
    viewer: &Viewer,
    limits: SearchLimits,
) -> Result<Vec<TicketDetail>> {
    let pattern = like_pattern(term);

    let mut qb = QueryBuilder::<Sqlite>::new(TICKET_DETAIL_SELECT);
    qb.push(" WHERE (");
    for (i, column) in ["t.title", "t.description", "t.category", "u.name", "u.email"]
        .iter()
        .enumerate()
    {
        if i > 0 {
            qb.push(" OR ");
        }
        qb.push(*column)
            .push(" LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\'");
    }
    qb.push(")");
    if !viewer.is_admin() {
        qb.push(" AND t.user_id = ").push_bind(viewer.id.clone());
    }
    qb.push(" ORDER BY t.created_at DESC LIMIT ")
        .push_bind(limits.ticket_limit);

    let rows = qb.build().fetch_all(pool).await?;
    let tickets = rows
        .iter()
        .map(ticket_detail_from_row)
        .collect::<Result<Vec<_>>>()?;

    Ok(tickets
        .into_iter()
        .filter(|t| {
            contains(&t.ticket.title, term)
                || contains(&t.ticket.description, term)
                || contains(&t.ticket.category, term)
                || contains(&t.user.name, term)
                || contains(&t.user.email, term)
        })
        .collect())
}

async fn search_assets(
    pool: &SqlitePool,
    term: &str,
    limits: SearchLimits,
) -> Result<Vec<AssetDetail>> {
    let pattern = like_pattern(term);

    let mut qb = QueryBuilder::<Sqlite>::new(ASSET_DETAIL_SELECT);
    qb.push(" WHERE (");
    for (i, column) in ["a.name", "a.type", "a.serial_number", "u.name", "u.email"]
        .iter()
        .enumerate()
    {
        if i > 0 {
            qb.push(" OR ");
        }
        qb.push(*column)
            .push(" LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\'");
    }
    qb.push(") ORDER BY a.created_at DESC LIMIT ")
        .push_bind(limits.asset_fetch);

    let rows = qb.build().fetch_all(pool).await?;
    let assets = rows
        .iter()
        .map(asset_detail_from_row)
        .collect::<Result<Vec<_>>>()?;

    Ok(assets
        .into_iter()
        .filter(|a| {
            contains(&a.asset.name, term)
                || contains(&a.asset.asset_type, term)
                || a.asset.serial_number.as_deref().is_some_and(|s| contains(s, term))
                || a.assigned_user.as_ref().is_some_and(|u| {
                    contains(&u.name, term) || contains(&u.email, term)
                })
        })
        .take(limits.result_limit)
        .collect())
}

async fn search_users(
    pool: &SqlitePool,
    term: &str,
    limits: SearchLimits,
) -> Result<Vec<UserWithCounts>> {
    let pattern = like_pattern(term);
    let rows = sqlx::query(
        r#"
        SELECT u.id, u.name, u.email, u.role, u.created_at,
               (SELECT COUNT(*) FROM tickets t WHERE t.user_id = u.id) AS ticket_count,
               (SELECT COUNT(*) FROM assets a WHERE a.assigned_user_id = u.id) AS asset_count
        FROM users u
        WHERE u.name LIKE ?1 ESCAPE '\' OR u.email LIKE ?1 ESCAPE '\'
        ORDER BY u.created_at DESC
        LIMIT ?2
        "#,
    )
    .bind(pattern)
    .bind(limits.user_fetch)
    .fetch_all(pool)
    .await?;

    let users = rows
        .iter()
        .map(with_counts_from_row)
        .collect::<Result<Vec<_>>>()?;

    Ok(users
        .into_iter()
        .filter(|u| contains(&u.user.name, term) || contains(&u.user.email, term))
        .take(limits.result_limit)
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchResultKind {
    Ticket,
    Asset,
    User,
}

/// One row of the quick-search dropdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    #[serde(rename = "type")]
    pub kind: SearchResultKind,
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub metadata: BTreeMap<String, String>,
    pub url: String,
}

/// Flatten grouped results into dropdown rows with localized labels
///
/// Rows are ordered tickets, then assets, then users. Links point at the
/// list page of each entity in the requested locale.
pub fn flatten_results(
    results: &UnifiedSearchResults,
    registry: &LocaleRegistry,
    locale: &str,
) -> Vec<SearchResult> {
    let default_locale = registry.default_locale();
    let tickets_url = canonical_path("/tickets", locale, default_locale);
    let assets_url = canonical_path("/assets", locale, default_locale);
    let users_url = canonical_path("/users", locale, default_locale);

    let mut out = Vec::with_capacity(results.total);

    for t in &results.tickets {
        let mut metadata = BTreeMap::new();
        metadata.insert(
            "priority".to_string(),
            priority_label(registry, locale, t.ticket.priority),
        );
        metadata.insert(
            "status".to_string(),
            ticket_status_label(registry, locale, t.ticket.status),
        );
        out.push(SearchResult {
            kind: SearchResultKind::Ticket,
            id: t.ticket.id.clone(),
            title: t.ticket.title.clone(),
            subtitle: format!(
                "{} • {}",
                category_label(registry, locale, &t.ticket.category),
                t.user.name
            ),
            metadata,
            url: tickets_url.clone(),
        });
    }

    for a in &results.assets {
        let mut subtitle = asset_type_label(registry, locale, &a.asset.asset_type);
        if let Some(serial) = a.asset.serial_number.as_deref().filter(|s| !s.is_empty()) {
            subtitle.push_str(" • ");
            subtitle.push_str(serial);
        }
        let mut metadata = BTreeMap::new();
        metadata.insert(
            "status".to_string(),
            asset_status_label(registry, locale, a.asset.status),
        );
        if let Some(user) = &a.assigned_user {
            metadata.insert("assignedTo".to_string(), user.name.clone());
        }
        out.push(SearchResult {
            kind: SearchResultKind::Asset,
            id: a.asset.id.clone(),
            title: a.asset.name.clone(),
            subtitle,
            metadata,
            url: assets_url.clone(),
        });
    }

    for u in &results.users {
        let mut metadata = BTreeMap::new();
        metadata.insert("role".to_string(), role_label(registry, locale, u.user.role));
        metadata.insert("tickets".to_string(), u.ticket_count.to_string());
        metadata.insert("assets".to_string(), u.asset_count.to_string());
        out.push(SearchResult {
            kind: SearchResultKind::User,
            id: u.user.id.clone(),
            title: u.user.name.clone(),
            subtitle: u.user.email.clone(),
            metadata,
            url: users_url.clone(),
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hash_password;
    use crate::db::models::{AssetStatus, NewAsset, NewTicket, NewUser, Priority, Role};
    use crate::db::{assets, init_memory_database, tickets, users};

    async fn user(pool: &SqlitePool, name: &str, email: &str, role: Role) -> Viewer {
        let (password_hash, password_salt) = hash_password("Password1");
        let created = users::create_user(
            pool,
            &NewUser {
                name: name.into(),
                email: email.into(),
                role,
                password_hash,
                password_salt,
            },
        )
        .await
        .unwrap();
        Viewer::from(&created)
    }

    async fn ticket(pool: &SqlitePool, owner: &Viewer, title: &str, category: &str) {
        tickets::create_ticket(
            pool,
            &NewTicket {
                title: title.into(),
                description: "Something is not working as expected".into(),
                priority: Priority::Medium,
                category: category.into(),
                user_id: owner.id.clone(),
            },
        )
        .await
        .unwrap();
    }

    async fn asset(pool: &SqlitePool, name: &str, serial: Option<&str>) -> String {
        assets::create_asset(
            pool,
            &NewAsset {
                name: name.into(),
                asset_type: "COMPUTER".into(),
                serial_number: serial.map(str::to_string),
                status: AssetStatus::Available,
                purchase_date: None,
            },
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_blank_query_is_empty() {
        let pool = init_memory_database().await.unwrap();
        let viewer = Viewer::new("nobody", Role::Admin);
        let results = unified_search(&pool, "   ", &viewer, SearchLimits::default())
            .await
            .unwrap();
        assert!(results.is_empty());
        assert!(results.tickets.is_empty());
    }

    #[tokio::test]
    async fn test_end_user_sees_own_tickets_only() {
        let pool = init_memory_database().await.unwrap();
        let admin = user(&pool, "Admin", "admin@company.com", Role::Admin).await;
        let alice = user(&pool, "Alice", "alice@company.com", Role::EndUser).await;
        let bob = user(&pool, "Bob", "bob@company.com", Role::EndUser).await;
        ticket(&pool, &alice, "Laptop screen flickers", "HARDWARE").await;
        ticket(&pool, &bob, "Laptop will not boot", "HARDWARE").await;

        let as_alice = unified_search(&pool, "laptop", &alice, SearchLimits::default())
            .await
            .unwrap();
        assert_eq!(as_alice.tickets.len(), 1);
        assert_eq!(as_alice.tickets[0].user.id, alice.id);
        assert!(as_alice.users.is_empty());

        let colleague = unified_search(&pool, "bob", &alice, SearchLimits::default())
            .await
            .unwrap();
        assert!(colleague.tickets.is_empty());
        assert_eq!(colleague.users.len(), 1);
        assert_eq!(colleague.users[0].user.id, bob.id);
        assert_eq!(colleague.total, 1);

        let as_admin = unified_search(&pool, "LAPTOP", &admin, SearchLimits::default())
            .await
            .unwrap();
        assert_eq!(as_admin.tickets.len(), 2);
        assert_eq!(as_admin.total, 2);
    }

    #[tokio::test]
    async fn test_matches_owner_and_assignee_fields() {
        let pool = init_memory_database().await.unwrap();
        let admin = user(&pool, "Admin", "admin@company.com", Role::Admin).await;
        let carol = user(&pool, "Carol Diaz", "carol@company.com", Role::EndUser).await;
        ticket(&pool, &carol, "VPN drops", "NETWORK").await;
        let asset_id = asset(&pool, "ThinkPad", Some("SN-1")).await;
        assets::assign_asset(&pool, &asset_id, Some(&carol.id)).await.unwrap();

        let results = unified_search(&pool, "diaz", &admin, SearchLimits::default())
            .await
            .unwrap();
        assert_eq!(results.tickets.len(), 1);
        assert_eq!(results.assets.len(), 1);
        assert_eq!(results.users.len(), 1);
        assert_eq!(results.users[0].ticket_count, 1);
        assert_eq!(results.users[0].asset_count, 1);
        assert_eq!(results.total, 3);
    }

    #[tokio::test]
    async fn test_wildcards_are_literal() {
        let pool = init_memory_database().await.unwrap();
        let admin = user(&pool, "Admin", "admin@company.com", Role::Admin).await;
        asset(&pool, "Monitor 100%", None).await;
        asset(&pool, "Monitor 1000", None).await;

        let results = unified_search(&pool, "100%", &admin, SearchLimits::default())
            .await
            .unwrap();
        assert_eq!(results.assets.len(), 1);
        assert_eq!(results.assets[0].asset.name, "Monitor 100%");

        let results = unified_search(&pool, "_", &admin, SearchLimits::default())
            .await
            .unwrap();
        assert!(results.assets.is_empty());
    }

    #[tokio::test]
    async fn test_result_limit_applies_after_filter() {
        let pool = init_memory_database().await.unwrap();
        let admin = user(&pool, "Admin", "admin@company.com", Role::Admin).await;
        for i in 0..5 {
            asset(&pool, &format!("Dock {}", i), None).await;
        }
        let limits = SearchLimits {
            result_limit: 3,
            ..SearchLimits::default()
        };
        let results = unified_search(&pool, "dock", &admin, limits).await.unwrap();
        assert_eq!(results.assets.len(), 3);
    }

    #[tokio::test]
    async fn test_limits_from_settings() {
        let pool = init_memory_database().await.unwrap();
        assert_eq!(SearchLimits::load(&pool).await.unwrap(), SearchLimits::default());
        crate::db::set_setting(&pool, "search_result_limit", "4").await.unwrap();
        assert_eq!(SearchLimits::load(&pool).await.unwrap().result_limit, 4);
    }

    #[tokio::test]
    async fn test_flatten_results() {
        let pool = init_memory_database().await.unwrap();
        let admin = user(&pool, "Admin", "admin@company.com", Role::Admin).await;
        ticket(&pool, &admin, "Printer offline", "HARDWARE").await;
        asset(&pool, "Printer HP", Some("HP-42")).await;

        let results = unified_search(&pool, "printer", &admin, SearchLimits::default())
            .await
            .unwrap();
        let registry = LocaleRegistry::embedded();

        let rows = flatten_results(&results, &registry, "en");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].kind, SearchResultKind::Ticket);
        assert_eq!(rows[0].url, "/tickets");
        assert!(rows[0].subtitle.ends_with(" • Admin"));
        assert_eq!(rows[0].metadata["priority"], "Medium");
        assert_eq!(rows[1].kind, SearchResultKind::Asset);
        assert!(rows[1].subtitle.ends_with(" • HP-42"));

        let rows = flatten_results(&results, &registry, "es");
        assert_eq!(rows[0].url, "/es/tickets");
        assert_eq!(rows[1].url, "/es/assets");

        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["type"], "ticket");
    }
}
