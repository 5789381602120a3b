//! Demo data for development and demos
//!
//! Relationships are declared by email and resolved to ids at insert time.
//! All writes of one call happen in a single transaction.

use crate::auth::hash_password;
use crate::db::models::{AssetStatus, Priority, Role, TicketStatus};
use crate::db::new_id;
use crate::time::{now, to_db_string};
use crate::{Error, Result};
use chrono::Duration;
use serde::Serialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;
use tracing::info;

struct SeedUser {
    name: &'static str,
    email: &'static str,
    role: Role,
    password: &'static str,
}

struct SeedTicket {
    title: &'static str,
    description: &'static str,
    priority: Priority,
    category: &'static str,
    status: TicketStatus,
    user_email: &'static str,
    assigned_to_email: Option<&'static str>,
}

struct SeedAsset {
    name: &'static str,
    asset_type: &'static str,
    serial_number: &'static str,
    status: AssetStatus,
    purchase_date: &'static str,
    assigned_to_email: Option<&'static str>,
}

struct SeedLicense {
    name: &'static str,
    vendor: &'static str,
    license_key: &'static str,
    /// Expiry relative to the seeding day
    expires_in_days: i64,
    assigned_to_email: Option<&'static str>,
}

/// The two accounts used to sign in to the demo
const LOGIN_USERS: [SeedUser; 2] = [
    SeedUser {
        name: "End User",
        email: "user@company.com",
        role: Role::EndUser,
        password: "password123",
    },
    SeedUser {
        name: "Admin User",
        email: "admin@company.com",
        role: Role::Admin,
        password: "admin123",
    },
];

const DEMO_USERS: [SeedUser; 8] = [
    SeedUser {
        name: "Sarah Johnson",
        email: "sarah.johnson@company.com",
        role: Role::EndUser,
        password: "password123",
    },
    SeedUser {
        name: "Michael Chen",
        email: "michael.chen@company.com",
        role: Role::EndUser,
        password: "password123",
    },
    SeedUser {
        name: "Emma Williams",
        email: "emma.williams@company.com",
        role: Role::EndUser,
        password: "password123",
    },
    SeedUser {
        name: "David Rodriguez",
        email: "david.rodriguez@company.com",
        role: Role::Admin,
        password: "admin123",
    },
    SeedUser {
        name: "Lisa Thompson",
        email: "lisa.thompson@company.com",
        role: Role::EndUser,
        password: "password123",
    },
    SeedUser {
        name: "James Wilson",
        email: "james.wilson@company.com",
        role: Role::Admin,
        password: "admin123",
    },
    SeedUser {
        name: "Anna Garcia",
        email: "anna.garcia@company.com",
        role: Role::EndUser,
        password: "password123",
    },
    SeedUser {
        name: "Robert Brown",
        email: "robert.brown@company.com",
        role: Role::EndUser,
        password: "password123",
    },
];

const TICKETS: [SeedTicket; 10] = [
    SeedTicket {
        title: "Unable to connect to Wi-Fi",
        description: "I cannot connect to the office Wi-Fi network from my laptop. It shows the network but fails to authenticate with the password. This started happening after the recent Windows update.",
        priority: Priority::Medium,
        category: "Network",
        status: TicketStatus::Open,
        user_email: "sarah.johnson@company.com",
        assigned_to_email: None,
    },
    SeedTicket {
        title: "Printer not responding",
        description: "The HP printer on the 3rd floor is not responding to print jobs. The queue shows jobs pending but nothing prints. Power cycling the printer did not help.",
        priority: Priority::High,
        category: "Hardware",
        status: TicketStatus::InProgress,
        user_email: "michael.chen@company.com",
        assigned_to_email: Some("admin@company.com"),
    },
    SeedTicket {
        title: "Password reset for CRM system",
        description: "I need my password reset for the CRM system. I have been locked out after multiple failed login attempts. My username is e.williams.",
        priority: Priority::Medium,
        category: "Access",
        status: TicketStatus::Resolved,
        user_email: "emma.williams@company.com",
        assigned_to_email: Some("david.rodriguez@company.com"),
    },
    SeedTicket {
        title: "Software installation request",
        description: "I need Adobe Photoshop installed on my workstation for the marketing campaign project. I have the license key available.",
        priority: Priority::Low,
        category: "Software",
        status: TicketStatus::Open,
        user_email: "lisa.thompson@company.com",
        assigned_to_email: None,
    },
    SeedTicket {
        title: "Computer running very slowly",
        description: "My computer has become extremely slow over the past week. It takes several minutes to boot up and applications are very sluggish. I have tried restarting multiple times.",
        priority: Priority::High,
        category: "Hardware",
        status: TicketStatus::Open,
        user_email: "anna.garcia@company.com",
        assigned_to_email: None,
    },
    SeedTicket {
        title: "Email not syncing on mobile",
        description: "My company email is not syncing properly on my iPhone. I can receive emails but cannot send them. The error message says \"Cannot send mail. The message was rejected by the server.\"",
        priority: Priority::Medium,
        category: "Software",
        status: TicketStatus::InProgress,
        user_email: "robert.brown@company.com",
        assigned_to_email: Some("james.wilson@company.com"),
    },
    SeedTicket {
        title: "VPN connection issues",
        description: "I cannot establish a VPN connection to access company resources from home. The connection times out during the authentication phase.",
        priority: Priority::High,
        category: "Network",
        status: TicketStatus::Open,
        user_email: "user@company.com",
        assigned_to_email: None,
    },
    SeedTicket {
        title: "Request for dual monitor setup",
        description: "I would like to request an additional monitor for my workstation to improve productivity. I do a lot of spreadsheet work and would benefit from the extra screen space.",
        priority: Priority::Low,
        category: "Hardware",
        status: TicketStatus::Closed,
        user_email: "sarah.johnson@company.com",
        assigned_to_email: Some("admin@company.com"),
    },
    SeedTicket {
        title: "Antivirus blocking legitimate software",
        description: "The antivirus software is blocking our development tools and flagging them as malicious. This is preventing our team from working effectively.",
        priority: Priority::Critical,
        category: "Software",
        status: TicketStatus::InProgress,
        user_email: "michael.chen@company.com",
        assigned_to_email: Some("david.rodriguez@company.com"),
    },
    SeedTicket {
        title: "Keyboard keys not working",
        description: "Several keys on my keyboard (Q, W, E, R) are not working properly. Sometimes they dont register presses, other times they repeat multiple times.",
        priority: Priority::Medium,
        category: "Hardware",
        status: TicketStatus::Resolved,
        user_email: "emma.williams@company.com",
        assigned_to_email: Some("james.wilson@company.com"),
    },
];

const ASSETS: [SeedAsset; 12] = [
    SeedAsset {
        name: "MacBook Pro 16-inch",
        asset_type: "Computer",
        serial_number: "MBP16-2023-001",
        status: AssetStatus::Assigned,
        purchase_date: "2023-01-15",
        assigned_to_email: Some("sarah.johnson@company.com"),
    },
    SeedAsset {
        name: "Dell OptiPlex 7090",
        asset_type: "Computer",
        serial_number: "DOT7090-2022-045",
        status: AssetStatus::Assigned,
        purchase_date: "2022-11-20",
        assigned_to_email: Some("michael.chen@company.com"),
    },
    SeedAsset {
        name: "iPad Pro 12.9-inch",
        asset_type: "Computer",
        serial_number: "IPD129-2023-012",
        status: AssetStatus::Available,
        purchase_date: "2023-03-10",
        assigned_to_email: None,
    },
    SeedAsset {
        name: "HP LaserJet Pro M404n",
        asset_type: "Printer",
        serial_number: "HPLJ404-2022-003",
        status: AssetStatus::Assigned,
        purchase_date: "2022-08-05",
        assigned_to_email: Some("emma.williams@company.com"),
    },
    SeedAsset {
        name: "Dell UltraSharp U2722DE",
        asset_type: "Monitor",
        serial_number: "DUS2722-2023-089",
        status: AssetStatus::Assigned,
        purchase_date: "2023-02-18",
        assigned_to_email: Some("lisa.thompson@company.com"),
    },
    SeedAsset {
        name: "Logitech MX Master 3",
        asset_type: "Mouse",
        serial_number: "LMX3-2023-156",
        status: AssetStatus::Available,
        purchase_date: "2023-04-22",
        assigned_to_email: None,
    },
    SeedAsset {
        name: "Cisco Meraki MR46",
        asset_type: "Network Equipment",
        serial_number: "CMR46-2022-008",
        status: AssetStatus::Assigned,
        purchase_date: "2022-09-12",
        assigned_to_email: None,
    },
    SeedAsset {
        name: "Surface Pro 9",
        asset_type: "Computer",
        serial_number: "SP9-2023-034",
        status: AssetStatus::UnderMaintenance,
        purchase_date: "2023-01-30",
        assigned_to_email: Some("anna.garcia@company.com"),
    },
    SeedAsset {
        name: "iPhone 14 Pro",
        asset_type: "Other",
        serial_number: "IP14P-2023-067",
        status: AssetStatus::Assigned,
        purchase_date: "2023-05-15",
        assigned_to_email: Some("robert.brown@company.com"),
    },
    SeedAsset {
        name: "ThinkPad X1 Carbon",
        asset_type: "Computer",
        serial_number: "TPX1C-2022-091",
        status: AssetStatus::Retired,
        purchase_date: "2022-06-10",
        assigned_to_email: None,
    },
    SeedAsset {
        name: "BenQ PD3200U",
        asset_type: "Monitor",
        serial_number: "BQPD32-2023-045",
        status: AssetStatus::Available,
        purchase_date: "2023-03-25",
        assigned_to_email: None,
    },
    SeedAsset {
        name: "Mechanical Keyboard",
        asset_type: "Keyboard",
        serial_number: "MK-2023-178",
        status: AssetStatus::Assigned,
        purchase_date: "2023-06-01",
        assigned_to_email: Some("user@company.com"),
    },
];

const LICENSES: [SeedLicense; 5] = [
    SeedLicense {
        name: "Microsoft Office 365",
        vendor: "Microsoft",
        license_key: "XXXXX-XXXXX-XXXXX-XXXXX-XXXXX",
        expires_in_days: 240,
        assigned_to_email: Some("sarah.johnson@company.com"),
    },
    SeedLicense {
        name: "Adobe Creative Suite",
        vendor: "Adobe",
        license_key: "ACS-XXXXX-XXXXX-XXXXX",
        expires_in_days: 21,
        assigned_to_email: Some("lisa.thompson@company.com"),
    },
    SeedLicense {
        name: "Slack Pro",
        vendor: "Slack",
        license_key: "SLACK-PRO-XXXXX-XXXXX",
        expires_in_days: 180,
        assigned_to_email: None,
    },
    SeedLicense {
        name: "Zoom Pro",
        vendor: "Zoom",
        license_key: "ZOOM-PRO-XXXXX-XXXXX",
        expires_in_days: 60,
        assigned_to_email: Some("michael.chen@company.com"),
    },
    SeedLicense {
        name: "Visual Studio Professional",
        vendor: "Microsoft",
        license_key: "VS-PRO-XXXXX-XXXXX-XXXXX",
        expires_in_days: 9,
        assigned_to_email: Some("emma.williams@company.com"),
    },
];

/// Rows written by `seed_database`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedCounts {
    pub users: usize,
    pub tickets: usize,
    pub assets: usize,
    pub licenses: usize,
}

/// Delete every row in foreign-key order
async fn clear_tables(tx: &mut Transaction<'_, Sqlite>) -> Result<()> {
    for table in ["software_licenses", "assets", "tickets", "sessions", "users"] {
        sqlx::query(&format!("DELETE FROM {}", table))
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

async fn insert_user(
    tx: &mut Transaction<'_, Sqlite>,
    user: &SeedUser,
    created_at: &str,
) -> Result<String> {
    let id = new_id();
    let (password_hash, password_salt) = hash_password(user.password);
    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, role, password_hash, password_salt, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(user.name)
    .bind(user.email)
    .bind(user.role.as_str())
    .bind(password_hash)
    .bind(password_salt)
    .bind(created_at)
    .execute(&mut **tx)
    .await?;
    Ok(id)
}

fn resolve<'a>(ids: &'a HashMap<&str, String>, email: &str) -> Result<&'a String> {
    ids.get(email)
        .ok_or_else(|| Error::Internal(format!("Seed data references unknown user {}", email)))
}

/// Replace all data with the demo data set
pub async fn seed_database(pool: &SqlitePool) -> Result<SeedCounts> {
    info!("Starting database seed");
    let mut tx = pool.begin().await?;
    clear_tables(&mut tx).await?;

    let start = now() - Duration::days(14);
    let stamp = |step: usize| to_db_string(start + Duration::hours(step as i64 * 6));

    let mut ids: HashMap<&str, String> = HashMap::new();
    for (i, user) in LOGIN_USERS.iter().chain(DEMO_USERS.iter()).enumerate() {
        let id = insert_user(&mut tx, user, &stamp(i)).await?;
        ids.insert(user.email, id);
    }
    info!("Seeded {} users", ids.len());

    for (i, ticket) in TICKETS.iter().enumerate() {
        let user_id = resolve(&ids, ticket.user_email)?.clone();
        let assigned_to = ticket
            .assigned_to_email
            .map(|email| resolve(&ids, email).cloned())
            .transpose()?;
        let created_at = stamp(ids.len() + i * 4);

        sqlx::query(
            r#"
            INSERT INTO tickets (id, title, description, priority, category, status,
                                 user_id, assigned_to, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new_id())
        .bind(ticket.title)
        .bind(ticket.description)
        .bind(ticket.priority.as_str())
        .bind(ticket.category)
        .bind(ticket.status.as_str())
        .bind(user_id)
        .bind(assigned_to)
        .bind(&created_at)
        .bind(&created_at)
        .execute(&mut *tx)
        .await?;
    }
    info!("Seeded {} tickets", TICKETS.len());

    for (i, asset) in ASSETS.iter().enumerate() {
        let assigned_user_id = asset
            .assigned_to_email
            .map(|email| resolve(&ids, email).cloned())
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO assets (id, name, type, serial_number, status, assigned_user_id,
                                purchase_date, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new_id())
        .bind(asset.name)
        .bind(asset.asset_type)
        .bind(asset.serial_number)
        .bind(asset.status.as_str())
        .bind(assigned_user_id)
        .bind(asset.purchase_date)
        .bind(stamp(ids.len() + i * 3))
        .execute(&mut *tx)
        .await?;
    }
    info!("Seeded {} assets", ASSETS.len());

    let today = now().date_naive();
    for (i, license) in LICENSES.iter().enumerate() {
        let assigned_user_id = license
            .assigned_to_email
            .map(|email| resolve(&ids, email).cloned())
            .transpose()?;
        let expiry = (today + Duration::days(license.expires_in_days))
            .format("%Y-%m-%d")
            .to_string();

        sqlx::query(
            r#"
            INSERT INTO software_licenses (id, name, vendor, license_key, expiry_date,
                                           assigned_user_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new_id())
        .bind(license.name)
        .bind(license.vendor)
        .bind(license.license_key)
        .bind(expiry)
        .bind(assigned_user_id)
        .bind(stamp(ids.len() + i))
        .execute(&mut *tx)
        .await?;
    }
    info!("Seeded {} software licenses", LICENSES.len());

    tx.commit().await?;

    let counts = SeedCounts {
        users: ids.len(),
        tickets: TICKETS.len(),
        assets: ASSETS.len(),
        licenses: LICENSES.len(),
    };
    info!("Database seed completed: {:?}", counts);
    Ok(counts)
}

/// Remove all desk data; settings and schema are kept
pub async fn reset_database(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;
    clear_tables(&mut tx).await?;
    tx.commit().await?;
    info!("Database reset completed");
    Ok(())
}

/// Create the two login accounts when neither exists yet
///
/// Returns the number of accounts created.
pub async fn seed_minimal(pool: &SqlitePool) -> Result<usize> {
    let emails: Vec<&str> = LOGIN_USERS.iter().map(|u| u.email).collect();
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email IN (?, ?)")
        .bind(emails[0])
        .bind(emails[1])
        .fetch_one(pool)
        .await?;

    if existing > 0 {
        info!("Basic auth users already exist");
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let created_at = to_db_string(now());
    for user in &LOGIN_USERS {
        insert_user(&mut tx, user, &created_at).await?;
    }
    tx.commit().await?;

    info!("Created basic auth users");
    Ok(LOGIN_USERS.len())
}
