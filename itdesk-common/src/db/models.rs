//! Database models
//!
//! Enumerations are stored and serialized as their SCREAMING_SNAKE_CASE
//! names. Row structs are mapped by hand from `SqliteRow` in the
//! repository modules.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declares a text-backed enum with `as_str`, `FromStr` and `Display`
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("Invalid {}: {}", stringify!($name), other)),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum! {
    /// Account role
    Role {
        EndUser => "END_USER",
        Admin => "ADMIN",
    }
}

text_enum! {
    /// Ticket urgency
    Priority {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
        Critical => "CRITICAL",
    }
}

text_enum! {
    /// Ticket lifecycle state
    TicketStatus {
        Open => "OPEN",
        InProgress => "IN_PROGRESS",
        Resolved => "RESOLVED",
        Closed => "CLOSED",
    }
}

text_enum! {
    /// Asset lifecycle state
    AssetStatus {
        Available => "AVAILABLE",
        Assigned => "ASSIGNED",
        UnderMaintenance => "UNDER_MAINTENANCE",
        Retired => "RETIRED",
    }
}

/// Who is asking; drives row-level visibility
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub id: String,
    pub role: Role,
}

impl Viewer {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for Viewer {
    fn from(user: &User) -> Self {
        Viewer::new(user.id.clone(), user.role)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

/// Account without credential columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: String,
}

/// Name and email of a related user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// User row plus related-row counts
#[derive(Debug, Clone, Serialize)]
pub struct UserWithCounts {
    #[serde(flatten)]
    pub user: User,
    pub ticket_count: i64,
    pub asset_count: i64,
}

/// User with the tickets they filed and the assets they hold
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub tickets: Vec<Ticket>,
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub category: String,
    pub status: TicketStatus,
    pub user_id: String,
    pub assigned_to: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Ticket with owner and assignee summaries
#[derive(Debug, Clone, Serialize)]
pub struct TicketDetail {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub user: UserSummary,
    pub assignee: Option<UserSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub asset_type: String,
    pub serial_number: Option<String>,
    pub status: AssetStatus,
    pub assigned_user_id: Option<String>,
    pub purchase_date: Option<String>,
    pub created_at: String,
}

/// Asset with its assignee summary
#[derive(Debug, Clone, Serialize)]
pub struct AssetDetail {
    #[serde(flatten)]
    pub asset: Asset,
    pub assigned_user: Option<UserSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftwareLicense {
    pub id: String,
    pub name: String,
    pub vendor: String,
    pub license_key: String,
    pub expiry_date: Option<String>,
    pub assigned_user_id: Option<String>,
    pub created_at: String,
}

/// License with its assignee summary
#[derive(Debug, Clone, Serialize)]
pub struct LicenseDetail {
    #[serde(flatten)]
    pub license: SoftwareLicense,
    pub assigned_user: Option<UserSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub created_at: String,
    pub expires_at: String,
}

/// Validated input for a new ticket
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub category: String,
    pub user_id: String,
}

/// Validated input for a new asset
#[derive(Debug, Clone, PartialEq)]
pub struct NewAsset {
    pub name: String,
    pub asset_type: String,
    pub serial_number: Option<String>,
    pub status: AssetStatus,
    pub purchase_date: Option<String>,
}

/// Validated input for a new user (password already hashed)
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
    pub password_salt: String,
}

/// Validated input for a new software license
#[derive(Debug, Clone, PartialEq)]
pub struct NewLicense {
    pub name: String,
    pub vendor: String,
    pub license_key: String,
    pub expiry_date: Option<String>,
    pub assigned_user_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_text_round_trip() {
        for status in TicketStatus::ALL {
            assert_eq!(status.as_str().parse::<TicketStatus>().unwrap(), *status);
        }
        assert_eq!(AssetStatus::UnderMaintenance.as_str(), "UNDER_MAINTENANCE");
    }

    #[test]
    fn test_enum_rejects_unknown_and_lowercase() {
        assert!("open".parse::<TicketStatus>().is_err());
        assert!("URGENT".parse::<Priority>().is_err());
    }

    #[test]
    fn test_asset_serializes_type_field() {
        let asset = Asset {
            id: "a".into(),
            name: "Laptop".into(),
            asset_type: "Hardware".into(),
            serial_number: None,
            status: AssetStatus::Available,
            assigned_user_id: None,
            purchase_date: None,
            created_at: "2024-01-01T00:00:00.000Z".into(),
        };
        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(json["type"], "Hardware");
        assert_eq!(json["status"], "AVAILABLE");
    }
}
