//! User repository

use crate::db::models::{Asset, NewUser, Role, User, UserProfile, UserSummary, UserWithCounts};
use crate::db::{assets, new_id, tickets};
use crate::time::now_string;
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

const USER_COLUMNS: &str = "id, name, email, role, created_at";

pub(crate) fn user_from_row(row: &SqliteRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        role: role.parse().map_err(Error::Internal)?,
        created_at: row.try_get("created_at")?,
    })
}

/// Build a summary from `<prefix>_id`, `<prefix>_name`, `<prefix>_email` columns
///
/// Returns `None` when the id column is NULL (LEFT JOIN without a match).
pub(crate) fn summary_from_row(row: &SqliteRow, prefix: &str) -> Result<Option<UserSummary>> {
    let id: Option<String> = row.try_get(format!("{}_id", prefix).as_str())?;
    let Some(id) = id else {
        return Ok(None);
    };
    Ok(Some(UserSummary {
        id,
        name: row.try_get(format!("{}_name", prefix).as_str())?,
        email: row.try_get(format!("{}_email", prefix).as_str())?,
    }))
}

/// Insert a user; email must be unique
pub async fn create_user(pool: &SqlitePool, new_user: &NewUser) -> Result<User> {
    if get_user_by_email(pool, &new_user.email).await?.is_some() {
        return Err(Error::Conflict("A user with this email already exists".to_string()));
    }

    let user = User {
        id: new_id(),
        name: new_user.name.clone(),
        email: new_user.email.clone(),
        role: new_user.role,
        created_at: now_string(),
    };

    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, role, password_hash, password_salt, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(user.role.as_str())
    .bind(&new_user.password_hash)
    .bind(&new_user.password_salt)
    .bind(&user.created_at)
    .execute(pool)
    .await?;

    info!("Created user {} ({})", user.email, user.role);
    Ok(user)
}

pub async fn get_user(pool: &SqlitePool, id: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(user_from_row).transpose()
}

/// Look up by email (compared lower-cased)
pub async fn get_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(user_from_row).transpose()
}

/// User plus stored password hash and salt
pub async fn get_user_credentials(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<(User, String, String)>> {
    let row = sqlx::query(&format!(
        "SELECT {}, password_hash, password_salt FROM users WHERE email = ?",
        USER_COLUMNS
    ))
    .bind(email.trim().to_lowercase())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some((
            user_from_row(&row)?,
            row.try_get("password_hash")?,
            row.try_get("password_salt")?,
        ))),
        None => Ok(None),
    }
}

pub async fn user_exists(pool: &SqlitePool, id: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// User with the tickets they filed and the assets assigned to them
pub async fn get_user_profile(pool: &SqlitePool, id: &str) -> Result<Option<UserProfile>> {
    let Some(user) = get_user(pool, id).await? else {
        return Ok(None);
    };

    let tickets = tickets::tickets_for_user(pool, id).await?;
    let assets: Vec<Asset> = assets::assets_for_user(pool, id).await?;

    Ok(Some(UserProfile {
        user,
        tickets,
        assets,
    }))
}

/// All users with ticket and asset counts, newest first
pub async fn list_users_with_counts(pool: &SqlitePool) -> Result<Vec<UserWithCounts>> {
    let rows = sqlx::query(
        r#"
        SELECT u.id, u.name, u.email, u.role, u.created_at,
               (SELECT COUNT(*) FROM tickets t WHERE t.user_id = u.id) AS ticket_count,
               (SELECT COUNT(*) FROM assets a WHERE a.assigned_user_id = u.id) AS asset_count
        FROM users u
        ORDER BY u.created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(with_counts_from_row).collect()
}

pub(crate) fn with_counts_from_row(row: &SqliteRow) -> Result<UserWithCounts> {
    Ok(UserWithCounts {
        user: user_from_row(row)?,
        ticket_count: row.try_get("ticket_count")?,
        asset_count: row.try_get("asset_count")?,
    })
}

pub async fn update_user_role(pool: &SqlitePool, id: &str, role: Role) -> Result<User> {
    let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
        .bind(role.as_str())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("User".to_string()));
    }

    info!("Changed role of user {} to {}", id, role);
    get_user(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound("User".to_string()))
}

/// Admin accounts, used to populate assignee pickers
pub async fn list_admins(pool: &SqlitePool) -> Result<Vec<UserSummary>> {
    let rows = sqlx::query("SELECT id, name, email FROM users WHERE role = 'ADMIN' ORDER BY name")
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| {
            Ok(UserSummary {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                email: row.try_get("email")?,
            })
        })
        .collect()
}
