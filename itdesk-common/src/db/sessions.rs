//! Login session repository

use crate::db::models::{Session, User};
use crate::db::users::user_from_row;
use crate::time::{hours_from_now_string, now_string};
use crate::Result;
use sqlx::SqlitePool;
use tracing::{debug, info};

/// Store a new session for `user_id` lasting `ttl_hours`
pub async fn create_session(
    pool: &SqlitePool,
    token: &str,
    user_id: &str,
    ttl_hours: i64,
) -> Result<Session> {
    let session = Session {
        token: token.to_string(),
        user_id: user_id.to_string(),
        created_at: now_string(),
        expires_at: hours_from_now_string(ttl_hours),
    };

    sqlx::query("INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)")
        .bind(&session.token)
        .bind(&session.user_id)
        .bind(&session.created_at)
        .bind(&session.expires_at)
        .execute(pool)
        .await?;

    debug!("Created session for user {}", user_id);
    Ok(session)
}

/// User owning an unexpired session, if any
pub async fn find_session_user(pool: &SqlitePool, token: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT u.id, u.name, u.email, u.role, u.created_at
        FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.token = ? AND s.expires_at > ?
        "#,
    )
    .bind(token)
    .bind(now_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Returns true if a session was removed
pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete expired sessions, returning how many were removed
pub async fn purge_expired_sessions(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(now_string())
        .execute(pool)
        .await?;

    let removed = result.rows_affected();
    if removed > 0 {
        info!("Purged {} expired sessions", removed);
    }
    Ok(removed)
}
