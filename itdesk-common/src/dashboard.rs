//! Dashboard statistics and chart series
//!
//! Ticket figures respect the viewer's visibility; asset figures cover the
//! whole inventory.

use crate::db::models::{AssetStatus, Priority, TicketDetail, TicketStatus, Viewer};
use crate::db::tickets::recent_tickets;
use crate::locale::{
    asset_status_label, asset_type_label, priority_label, ticket_status_label, LocaleRegistry,
};
use crate::time::days_ago_string;
use crate::Result;
use serde::Serialize;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashMap;

/// Tickets shown in the dashboard's recent list
pub const RECENT_TICKET_COUNT: i64 = 5;

/// Days covered by the created-over-time series
pub const TIMELINE_DAYS: i64 = 30;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_tickets: i64,
    pub open_tickets: i64,
    pub total_assets: i64,
    pub assigned_assets: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardOverview {
    pub stats: DashboardStats,
    pub recent_tickets: Vec<TicketDetail>,
}

/// One bar or slice: raw key, localized label, count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartPoint {
    pub key: String,
    pub label: String,
    pub count: i64,
}

/// Items created on one calendar day (`YYYY-MM-DD`, UTC)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardCharts {
    pub ticket_status: Vec<ChartPoint>,
    pub ticket_priority: Vec<ChartPoint>,
    pub asset_status: Vec<ChartPoint>,
    pub asset_type: Vec<ChartPoint>,
    pub tickets_over_time: Vec<DailyCount>,
    pub assets_over_time: Vec<DailyCount>,
}

async fn count_tickets(
    pool: &SqlitePool,
    viewer: &Viewer,
    status: Option<TicketStatus>,
) -> Result<i64> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM tickets");
    if viewer.is_admin() {
        qb.push(" WHERE 1 = 1");
    } else {
        qb.push(" WHERE user_id = ").push_bind(viewer.id.clone());
    }
    if let Some(status) = status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    Ok(qb.build_query_scalar().fetch_one(pool).await?)
}

pub async fn dashboard_stats(pool: &SqlitePool, viewer: &Viewer) -> Result<DashboardStats> {
    let total_tickets = count_tickets(pool, viewer, None).await?;
    let open_tickets = count_tickets(pool, viewer, Some(TicketStatus::Open)).await?;

    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS total,
               COALESCE(SUM(CASE WHEN status = 'ASSIGNED' THEN 1 ELSE 0 END), 0) AS assigned
        FROM assets
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(DashboardStats {
        total_tickets,
        open_tickets,
        total_assets: row.try_get("total")?,
        assigned_assets: row.try_get("assigned")?,
    })
}

/// Stats plus the viewer's newest tickets
pub async fn dashboard_overview(pool: &SqlitePool, viewer: &Viewer) -> Result<DashboardOverview> {
    let stats = dashboard_stats(pool, viewer).await?;
    let recent_tickets = recent_tickets(pool, viewer, RECENT_TICKET_COUNT).await?;
    Ok(DashboardOverview {
        stats,
        recent_tickets,
    })
}

async fn grouped_counts(
    pool: &SqlitePool,
    table: &str,
    column: &str,
    scope: Option<&Viewer>,
) -> Result<HashMap<String, i64>> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {column} AS bucket, COUNT(*) AS n FROM {table}"
    ));
    if let Some(viewer) = scope.filter(|v| !v.is_admin()) {
        qb.push(" WHERE user_id = ").push_bind(viewer.id.clone());
    }
    qb.push(format!(" GROUP BY {column}"));

    let rows = qb.build().fetch_all(pool).await?;
    let mut counts = HashMap::with_capacity(rows.len());
    for row in rows {
        counts.insert(row.try_get::<String, _>("bucket")?, row.try_get::<i64, _>("n")?);
    }
    Ok(counts)
}

async fn daily_counts(
    pool: &SqlitePool,
    table: &str,
    scope: Option<&Viewer>,
) -> Result<Vec<DailyCount>> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        "SELECT substr(created_at, 1, 10) AS day, COUNT(*) AS n FROM {table} WHERE created_at >= "
    ));
    qb.push_bind(days_ago_string(TIMELINE_DAYS));
    if let Some(viewer) = scope.filter(|v| !v.is_admin()) {
        qb.push(" AND user_id = ").push_bind(viewer.id.clone());
    }
    qb.push(" GROUP BY day ORDER BY day ASC");

    let rows = qb.build().fetch_all(pool).await?;
    rows.iter()
        .map(|row| {
            Ok(DailyCount {
                date: row.try_get("day")?,
                count: row.try_get("n")?,
            })
        })
        .collect()
}

/// Enum-ordered points, zero counts omitted
fn enum_series<T: Copy>(
    all: &[T],
    as_str: impl Fn(T) -> &'static str,
    label: impl Fn(T) -> String,
    counts: &HashMap<String, i64>,
) -> Vec<ChartPoint> {
    all.iter()
        .filter_map(|value| {
            let key = as_str(*value);
            let count = counts.get(key).copied().unwrap_or(0);
            (count > 0).then(|| ChartPoint {
                key: key.to_string(),
                label: label(*value),
                count,
            })
        })
        .collect()
}

/// All chart series, labels in `locale`
pub async fn dashboard_charts(
    pool: &SqlitePool,
    viewer: &Viewer,
    registry: &LocaleRegistry,
    locale: &str,
) -> Result<DashboardCharts> {
    let ticket_status_counts = grouped_counts(pool, "tickets", "status", Some(viewer)).await?;
    let ticket_priority_counts = grouped_counts(pool, "tickets", "priority", Some(viewer)).await?;
    let asset_status_counts = grouped_counts(pool, "assets", "status", None).await?;
    let asset_type_counts = grouped_counts(pool, "assets", "type", None).await?;

    let ticket_status = enum_series(
        TicketStatus::ALL,
        |s| s.as_str(),
        |s| ticket_status_label(registry, locale, s),
        &ticket_status_counts,
    );
    let ticket_priority = enum_series(
        Priority::ALL,
        |p| p.as_str(),
        |p| priority_label(registry, locale, p),
        &ticket_priority_counts,
    );
    let asset_status = enum_series(
        AssetStatus::ALL,
        |s| s.as_str(),
        |s| asset_status_label(registry, locale, s),
        &asset_status_counts,
    );

    let mut asset_type: Vec<ChartPoint> = asset_type_counts
        .into_iter()
        .map(|(key, count)| ChartPoint {
            label: asset_type_label(registry, locale, &key),
            key,
            count,
        })
        .collect();
    asset_type.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));

    let tickets_over_time = daily_counts(pool, "tickets", Some(viewer)).await?;
    let assets_over_time = daily_counts(pool, "assets", None).await?;

    Ok(DashboardCharts {
        ticket_status,
        ticket_priority,
        asset_status,
        asset_type,
        tickets_over_time,
        assets_over_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hash_password;
    use crate::db::models::{NewAsset, NewTicket, NewUser, Role};
    use crate::db::{assets, init_memory_database, tickets, users};

    async fn add_user(pool: &SqlitePool, email: &str, role: Role) -> Viewer {
        let (password_hash, password_salt) = hash_password("Password1");
        let user = users::create_user(
            pool,
            &NewUser {
                name: email.split('@').next().unwrap_or_default().to_string(),
                email: email.into(),
                role,
                password_hash,
                password_salt,
            },
        )
        .await
        .unwrap();
        Viewer::from(&user)
    }

    async fn add_ticket(pool: &SqlitePool, owner: &Viewer, priority: Priority) -> String {
        tickets::create_ticket(
            pool,
            &NewTicket {
                title: "Keyboard missing keys".into(),
                description: "Several keys stopped responding".into(),
                priority,
                category: "HARDWARE".into(),
                user_id: owner.id.clone(),
            },
        )
        .await
        .unwrap()
        .id
    }

    async fn add_asset(pool: &SqlitePool, asset_type: &str) -> String {
        assets::create_asset(
            pool,
            &NewAsset {
                name: format!("{} unit", asset_type),
                asset_type: asset_type.into(),
                serial_number: None,
                status: AssetStatus::Available,
                purchase_date: None,
            },
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_stats_respect_visibility() {
        let pool = init_memory_database().await.unwrap();
        let admin = add_user(&pool, "admin@company.com", Role::Admin).await;
        let alice = add_user(&pool, "alice@company.com", Role::EndUser).await;
        let bob = add_user(&pool, "bob@company.com", Role::EndUser).await;

        let t1 = add_ticket(&pool, &alice, Priority::High).await;
        add_ticket(&pool, &alice, Priority::Low).await;
        add_ticket(&pool, &bob, Priority::Low).await;
        tickets::update_ticket_status(&pool, &t1, TicketStatus::Resolved)
            .await
            .unwrap();

        let laptop = add_asset(&pool, "COMPUTER").await;
        add_asset(&pool, "MONITOR").await;
        assets::assign_asset(&pool, &laptop, Some(&bob.id)).await.unwrap();

        let admin_stats = dashboard_stats(&pool, &admin).await.unwrap();
        assert_eq!(
            admin_stats,
            DashboardStats {
                total_tickets: 3,
                open_tickets: 2,
                total_assets: 2,
                assigned_assets: 1,
            }
        );

        let alice_stats = dashboard_stats(&pool, &alice).await.unwrap();
        assert_eq!(alice_stats.total_tickets, 2);
        assert_eq!(alice_stats.open_tickets, 1);
        assert_eq!(alice_stats.total_assets, 2);

        let overview = dashboard_overview(&pool, &bob).await.unwrap();
        assert_eq!(overview.recent_tickets.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_database() {
        let pool = init_memory_database().await.unwrap();
        let viewer = Viewer::new("nobody", Role::Admin);
        assert_eq!(dashboard_stats(&pool, &viewer).await.unwrap(), DashboardStats::default());

        let registry = LocaleRegistry::embedded();
        let charts = dashboard_charts(&pool, &viewer, &registry, "en").await.unwrap();
        assert!(charts.ticket_status.is_empty());
        assert!(charts.asset_type.is_empty());
        assert!(charts.tickets_over_time.is_empty());
    }

    #[tokio::test]
    async fn test_chart_series() {
        let pool = init_memory_database().await.unwrap();
        let admin = add_user(&pool, "admin@company.com", Role::Admin).await;
        add_ticket(&pool, &admin, Priority::Critical).await;
        add_ticket(&pool, &admin, Priority::Low).await;
        add_ticket(&pool, &admin, Priority::Low).await;
        add_asset(&pool, "MONITOR").await;
        add_asset(&pool, "MONITOR").await;
        add_asset(&pool, "Projector").await;

        let registry = LocaleRegistry::embedded();
        let charts = dashboard_charts(&pool, &admin, &registry, "en").await.unwrap();

        assert_eq!(charts.ticket_status.len(), 1);
        assert_eq!(charts.ticket_status[0].key, "OPEN");
        assert_eq!(charts.ticket_status[0].label, "Open");
        assert_eq!(charts.ticket_status[0].count, 3);

        let priorities: Vec<_> = charts.ticket_priority.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(priorities, vec!["LOW", "CRITICAL"]);

        assert_eq!(charts.asset_type[0].key, "MONITOR");
        assert_eq!(charts.asset_type[0].count, 2);
        assert_eq!(charts.asset_type[1].label, "Projector");

        assert_eq!(charts.tickets_over_time.len(), 1);
        assert_eq!(charts.tickets_over_time[0].count, 3);
        assert_eq!(charts.assets_over_time[0].count, 3);
    }
}
