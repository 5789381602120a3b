//! Desk events and the in-process event bus
//!
//! Handlers emit a `DeskEvent` after every successful write. The SSE
//! endpoint forwards events to connected browsers, filtered by what the
//! viewer is allowed to see.

use crate::db::models::{AssetStatus, Priority, Role, TicketStatus, Viewer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Something that changed in the desk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DeskEvent {
    TicketCreated {
        ticket_id: String,
        owner_id: String,
        title: String,
        priority: Priority,
        timestamp: DateTime<Utc>,
    },

    TicketStatusChanged {
        ticket_id: String,
        owner_id: String,
        status: TicketStatus,
        timestamp: DateTime<Utc>,
    },

    /// `assignee_id` is `None` when the assignment was cleared
    TicketAssigned {
        ticket_id: String,
        owner_id: String,
        assignee_id: Option<String>,
        timestamp: DateTime<Utc>,
    },

    AssetCreated {
        asset_id: String,
        name: String,
        timestamp: DateTime<Utc>,
    },

    AssetStatusChanged {
        asset_id: String,
        status: AssetStatus,
        timestamp: DateTime<Utc>,
    },

    AssetAssigned {
        asset_id: String,
        assigned_user_id: Option<String>,
        timestamp: DateTime<Utc>,
    },

    UserCreated {
        user_id: String,
        name: String,
        role: Role,
        timestamp: DateTime<Utc>,
    },

    UserRoleChanged {
        user_id: String,
        role: Role,
        timestamp: DateTime<Utc>,
    },

    LicenseCreated {
        license_id: String,
        name: String,
        timestamp: DateTime<Utc>,
    },
}

impl DeskEvent {
    /// Name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            DeskEvent::TicketCreated { .. } => "TicketCreated",
            DeskEvent::TicketStatusChanged { .. } => "TicketStatusChanged",
            DeskEvent::TicketAssigned { .. } => "TicketAssigned",
            DeskEvent::AssetCreated { .. } => "AssetCreated",
            DeskEvent::AssetStatusChanged { .. } => "AssetStatusChanged",
            DeskEvent::AssetAssigned { .. } => "AssetAssigned",
            DeskEvent::UserCreated { .. } => "UserCreated",
            DeskEvent::UserRoleChanged { .. } => "UserRoleChanged",
            DeskEvent::LicenseCreated { .. } => "LicenseCreated",
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DeskEvent::TicketCreated { timestamp, .. }
            | DeskEvent::TicketStatusChanged { timestamp, .. }
            | DeskEvent::TicketAssigned { timestamp, .. }
            | DeskEvent::AssetCreated { timestamp, .. }
            | DeskEvent::AssetStatusChanged { timestamp, .. }
            | DeskEvent::AssetAssigned { timestamp, .. }
            | DeskEvent::UserCreated { timestamp, .. }
            | DeskEvent::UserRoleChanged { timestamp, .. }
            | DeskEvent::LicenseCreated { timestamp, .. } => *timestamp,
        }
    }

    /// Admins see everything; end users see events about their own tickets,
    /// assets assigned to them and their own account
    pub fn is_visible_to(&self, viewer: &Viewer) -> bool {
        if viewer.is_admin() {
            return true;
        }
        match self {
            DeskEvent::TicketCreated { owner_id, .. }
            | DeskEvent::TicketStatusChanged { owner_id, .. }
            | DeskEvent::TicketAssigned { owner_id, .. } => *owner_id == viewer.id,
            DeskEvent::AssetAssigned {
                assigned_user_id, ..
            } => assigned_user_id.as_deref() == Some(viewer.id.as_str()),
            DeskEvent::UserRoleChanged { user_id, .. } => *user_id == viewer.id,
            _ => false,
        }
    }
}

/// Broadcast channel shared by all handlers
///
/// Slow subscribers lose the oldest events once `capacity` is exceeded.
pub struct EventBus {
    tx: broadcast::Sender<DeskEvent>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Receiver for events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<DeskEvent> {
        self.tx.subscribe()
    }

    /// Send to all subscribers; fails when nobody is listening
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: DeskEvent) -> Result<usize, broadcast::error::SendError<DeskEvent>> {
        self.tx.send(event)
    }

    /// Send, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: DeskEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
