//! Ticket endpoints
//!
//! End users see and file their own tickets; triage (status, assignment)
//! is admin-only.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use itdesk_common::db::models::{Priority, TicketDetail, TicketStatus};
use itdesk_common::db::tickets::{self as repo, TicketFilter};
use itdesk_common::db::Paginated;
use itdesk_common::events::DeskEvent;
use itdesk_common::rate_limit::RateLimitRule;
use itdesk_common::validation::{
    parse_enum, validate_create_ticket, validate_optional_id, CreateTicketInput,
};
use serde::{Deserialize, Serialize};

use super::{localized, optional_filter, path_id, publish};
use crate::error::{ApiError, ApiResult};
use crate::middleware::{CurrentUser, RequestLocale};
use crate::pagination::PageQuery;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TicketListQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    #[serde(default)]
    pub assignee_id: Option<String>,
}

/// Mutation result with a localized notification
#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub ticket: TicketDetail,
    pub message: String,
}

/// GET /api/tickets
pub async fn list_tickets(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<TicketListQuery>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Paginated<TicketDetail>>> {
    let filter = TicketFilter {
        status: optional_filter::<TicketStatus>("status", query.status.as_deref())?,
        priority: optional_filter::<Priority>("priority", query.priority.as_deref())?,
        category: query.category.filter(|c| !c.trim().is_empty()),
    };

    let tickets = repo::list_tickets(
        &state.db,
        &current.viewer(),
        &filter,
        page.page,
        page.page_size,
    )
    .await?;
    Ok(Json(tickets))
}

/// POST /api/tickets
///
/// The caller owns the new ticket; it always starts OPEN.
pub async fn create_ticket(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(locale): Extension<RequestLocale>,
    Json(input): Json<CreateTicketInput>,
) -> ApiResult<(StatusCode, Json<TicketResponse>)> {
    state
        .rate_limiter
        .check(RateLimitRule::CreateTicket, &current.user.id)?;

    let new_ticket = validate_create_ticket(&input, &current.user.id)?;
    let ticket = repo::create_ticket(&state.db, &new_ticket).await?;

    publish(
        &state,
        DeskEvent::TicketCreated {
            ticket_id: ticket.id.clone(),
            owner_id: ticket.user_id.clone(),
            title: ticket.title.clone(),
            priority: ticket.priority,
            timestamp: Utc::now(),
        },
    );

    let detail = repo::get_ticket(&state.db, &ticket.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Ticket".to_string()))?;
    let message = localized(
        &state,
        locale.as_str(),
        "notifications.ticketCreated",
        &[("title", ticket.title.as_str())],
    );

    Ok((
        StatusCode::CREATED,
        Json(TicketResponse {
            ticket: detail,
            message,
        }),
    ))
}

/// GET /api/tickets/:id
///
/// Owners and admins only.
pub async fn get_ticket(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<TicketDetail>> {
    path_id(&id, "Invalid ticket ID")?;

    let ticket = repo::get_ticket(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Ticket".to_string()))?;

    if !current.is_admin() && ticket.ticket.user_id != current.user.id {
        return Err(ApiError::forbidden());
    }
    Ok(Json(ticket))
}

/// PATCH /api/tickets/:id/status
pub async fn update_ticket_status(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(locale): Extension<RequestLocale>,
    Path(id): Path<String>,
    Json(body): Json<StatusUpdate>,
) -> ApiResult<Json<TicketResponse>> {
    current.require_admin()?;
    path_id(&id, "Invalid ticket ID")?;
    let status: TicketStatus = parse_enum("status", body.status.as_deref(), "Invalid status")?;

    let ticket = repo::update_ticket_status(&state.db, &id, status).await?;
    publish(
        &state,
        DeskEvent::TicketStatusChanged {
            ticket_id: ticket.ticket.id.clone(),
            owner_id: ticket.ticket.user_id.clone(),
            status,
            timestamp: Utc::now(),
        },
    );

    Ok(Json(TicketResponse {
        ticket,
        message: localized(&state, locale.as_str(), "notifications.ticketUpdated", &[]),
    }))
}

/// PATCH /api/tickets/:id/assign
///
/// `assignee_id` must name an admin; null or blank clears the assignment.
pub async fn assign_ticket(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Extension(locale): Extension<RequestLocale>,
    Path(id): Path<String>,
    Json(body): Json<AssignRequest>,
) -> ApiResult<Json<TicketResponse>> {
    current.require_admin()?;
    path_id(&id, "Invalid ticket ID")?;
    let assignee_id = validate_optional_id("assignee_id", body.assignee_id.as_deref())?;

    let ticket = repo::assign_ticket(&state.db, &id, assignee_id.as_deref()).await?;
    publish(
        &state,
        DeskEvent::TicketAssigned {
            ticket_id: ticket.ticket.id.clone(),
            owner_id: ticket.ticket.user_id.clone(),
            assignee_id,
            timestamp: Utc::now(),
        },
    );

    Ok(Json(TicketResponse {
        ticket,
        message: localized(&state, locale.as_str(), "notifications.ticketAssigned", &[]),
    }))
}
