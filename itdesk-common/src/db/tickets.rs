//! Ticket repository
//!
//! Visibility rule used throughout: ADMIN viewers see every ticket,
//! END_USER viewers see only tickets they filed.

use crate::db::models::{
    NewTicket, Priority, Role, Ticket, TicketDetail, TicketStatus, Viewer,
};
use crate::db::pagination::{Page, Paginated};
use crate::db::users::{get_user, summary_from_row};
use crate::db::new_id;
use crate::time::now_string;
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::info;

pub(crate) const TICKET_DETAIL_SELECT: &str = r#"
    SELECT t.id, t.title, t.description, t.priority, t.category, t.status,
           t.user_id, t.assigned_to, t.created_at, t.updated_at,
           u.id AS owner_id, u.name AS owner_name, u.email AS owner_email,
           a.id AS assignee_id, a.name AS assignee_name, a.email AS assignee_email
    FROM tickets t
    JOIN users u ON u.id = t.user_id
    LEFT JOIN users a ON a.id = t.assigned_to
"#;

/// Optional list filters
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
}

pub(crate) fn ticket_from_row(row: &SqliteRow) -> Result<Ticket> {
    let priority: String = row.try_get("priority")?;
    let status: String = row.try_get("status")?;
    Ok(Ticket {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        priority: priority.parse().map_err(Error::Internal)?,
        category: row.try_get("category")?,
        status: status.parse().map_err(Error::Internal)?,
        user_id: row.try_get("user_id")?,
        assigned_to: row.try_get("assigned_to")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn ticket_detail_from_row(row: &SqliteRow) -> Result<TicketDetail> {
    let user = summary_from_row(row, "owner")?
        .ok_or_else(|| Error::Internal("Ticket without owner".to_string()))?;
    Ok(TicketDetail {
        ticket: ticket_from_row(row)?,
        user,
        assignee: summary_from_row(row, "assignee")?,
    })
}

fn push_visibility(qb: &mut QueryBuilder<'_, Sqlite>, viewer: &Viewer) {
    if viewer.is_admin() {
        qb.push(" WHERE 1 = 1");
    } else {
        qb.push(" WHERE t.user_id = ").push_bind(viewer.id.clone());
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &TicketFilter) {
    if let Some(status) = filter.status {
        qb.push(" AND t.status = ").push_bind(status.as_str());
    }
    if let Some(priority) = filter.priority {
        qb.push(" AND t.priority = ").push_bind(priority.as_str());
    }
    if let Some(category) = filter.category.as_ref().filter(|c| !c.trim().is_empty()) {
        qb.push(" AND t.category = ").push_bind(category.trim().to_string());
    }
}

/// Insert a ticket owned by `new_ticket.user_id`, status OPEN
pub async fn create_ticket(pool: &SqlitePool, new_ticket: &NewTicket) -> Result<Ticket> {
    if get_user(pool, &new_ticket.user_id).await?.is_none() {
        return Err(Error::NotFound("User".to_string()));
    }

    let now = now_string();
    let ticket = Ticket {
        id: new_id(),
        title: new_ticket.title.clone(),
        description: new_ticket.description.clone(),
        priority: new_ticket.priority,
        category: new_ticket.category.clone(),
        status: TicketStatus::Open,
        user_id: new_ticket.user_id.clone(),
        assigned_to: None,
        created_at: now.clone(),
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO tickets (id, title, description, priority, category, status,
                             user_id, assigned_to, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, NULL, ?, ?)
        "#,
    )
    .bind(&ticket.id)
    .bind(&ticket.title)
    .bind(&ticket.description)
    .bind(ticket.priority.as_str())
    .bind(&ticket.category)
    .bind(ticket.status.as_str())
    .bind(&ticket.user_id)
    .bind(&ticket.created_at)
    .bind(&ticket.updated_at)
    .execute(pool)
    .await?;

    info!("Created ticket {} for user {}", ticket.id, ticket.user_id);
    Ok(ticket)
}

/// Ticket with owner and assignee summaries
pub async fn get_ticket(pool: &SqlitePool, id: &str) -> Result<Option<TicketDetail>> {
    let row = sqlx::query(&format!("{} WHERE t.id = ?", TICKET_DETAIL_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(ticket_detail_from_row).transpose()
}

/// Visible tickets, newest first, one page at a time
pub async fn list_tickets(
    pool: &SqlitePool,
    viewer: &Viewer,
    filter: &TicketFilter,
    requested_page: i64,
    page_size: i64,
) -> Result<Paginated<TicketDetail>> {
    let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM tickets t");
    push_visibility(&mut count_qb, viewer);
    push_filter(&mut count_qb, filter);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let page = Page::calculate(total, requested_page, page_size);

    let mut qb = QueryBuilder::<Sqlite>::new(TICKET_DETAIL_SELECT);
    push_visibility(&mut qb, viewer);
    push_filter(&mut qb, filter);
    qb.push(" ORDER BY t.created_at DESC LIMIT ")
        .push_bind(page.page_size)
        .push(" OFFSET ")
        .push_bind(page.offset());

    let rows = qb.build().fetch_all(pool).await?;
    let items = rows
        .iter()
        .map(ticket_detail_from_row)
        .collect::<Result<Vec<_>>>()?;

    Ok(Paginated { items, page })
}

/// Newest visible tickets
pub async fn recent_tickets(
    pool: &SqlitePool,
    viewer: &Viewer,
    limit: i64,
) -> Result<Vec<TicketDetail>> {
    let mut qb = QueryBuilder::<Sqlite>::new(TICKET_DETAIL_SELECT);
    push_visibility(&mut qb, viewer);
    qb.push(" ORDER BY t.created_at DESC LIMIT ").push_bind(limit);

    let rows = qb.build().fetch_all(pool).await?;
    rows.iter().map(ticket_detail_from_row).collect()
}

/// Tickets filed by one user, newest first
pub async fn tickets_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<Ticket>> {
    let rows = sqlx::query("SELECT * FROM tickets WHERE user_id = ? ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    rows.iter().map(ticket_from_row).collect()
}

pub async fn update_ticket_status(
    pool: &SqlitePool,
    id: &str,
    status: TicketStatus,
) -> Result<TicketDetail> {
    let result = sqlx::query("UPDATE tickets SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(now_string())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("Ticket".to_string()));
    }

    info!("Ticket {} status -> {}", id, status);
    get_ticket(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound("Ticket".to_string()))
}

/// Assign a ticket to an ADMIN user, or clear the assignment with `None`
pub async fn assign_ticket(
    pool: &SqlitePool,
    id: &str,
    assignee_id: Option<&str>,
) -> Result<TicketDetail> {
    if let Some(assignee_id) = assignee_id {
        let assignee = get_user(pool, assignee_id)
            .await?
            .ok_or_else(|| Error::NotFound("Assignee".to_string()))?;
        if assignee.role != Role::Admin {
            return Err(Error::InvalidInput(
                "Only admin users can be assigned tickets".to_string(),
            ));
        }
    }

    let result = sqlx::query("UPDATE tickets SET assigned_to = ?, updated_at = ? WHERE id = ?")
        .bind(assignee_id)
        .bind(now_string())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("Ticket".to_string()));
    }

    info!("Ticket {} assigned to {:?}", id, assignee_id);
    get_ticket(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound("Ticket".to_string()))
}
