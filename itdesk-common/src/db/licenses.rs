//! Software license repository

use crate::db::models::{LicenseDetail, NewLicense, SoftwareLicense};
use crate::db::users::{get_user, summary_from_row};
use crate::db::new_id;
use crate::time::now_string;
use crate::{Error, Result};
use chrono::{Duration, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

const LICENSE_DETAIL_SELECT: &str = r#"
    SELECT l.id, l.name, l.vendor, l.license_key, l.expiry_date, l.assigned_user_id,
           l.created_at,
           u.id AS assignee_id, u.name AS assignee_name, u.email AS assignee_email
    FROM software_licenses l
    LEFT JOIN users u ON u.id = l.assigned_user_id
"#;

fn license_detail_from_row(row: &SqliteRow) -> Result<LicenseDetail> {
    Ok(LicenseDetail {
        license: SoftwareLicense {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            vendor: row.try_get("vendor")?,
            license_key: row.try_get("license_key")?,
            expiry_date: row.try_get("expiry_date")?,
            assigned_user_id: row.try_get("assigned_user_id")?,
            created_at: row.try_get("created_at")?,
        },
        assigned_user: summary_from_row(row, "assignee")?,
    })
}

pub async fn create_license(pool: &SqlitePool, new_license: &NewLicense) -> Result<SoftwareLicense> {
    if let Some(user_id) = &new_license.assigned_user_id {
        if get_user(pool, user_id).await?.is_none() {
            return Err(Error::NotFound("User".to_string()));
        }
    }

    let license = SoftwareLicense {
        id: new_id(),
        name: new_license.name.clone(),
        vendor: new_license.vendor.clone(),
        license_key: new_license.license_key.clone(),
        expiry_date: new_license.expiry_date.clone(),
        assigned_user_id: new_license.assigned_user_id.clone(),
        created_at: now_string(),
    };

    sqlx::query(
        r#"
        INSERT INTO software_licenses (id, name, vendor, license_key, expiry_date,
                                       assigned_user_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&license.id)
    .bind(&license.name)
    .bind(&license.vendor)
    .bind(&license.license_key)
    .bind(&license.expiry_date)
    .bind(&license.assigned_user_id)
    .bind(&license.created_at)
    .execute(pool)
    .await?;

    info!("Created license {} ({})", license.name, license.vendor);
    Ok(license)
}

pub async fn get_license(pool: &SqlitePool, id: &str) -> Result<Option<LicenseDetail>> {
    let row = sqlx::query(&format!("{} WHERE l.id = ?", LICENSE_DETAIL_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(license_detail_from_row).transpose()
}

/// All licenses, newest first
pub async fn list_licenses(pool: &SqlitePool) -> Result<Vec<LicenseDetail>> {
    let rows = sqlx::query(&format!("{} ORDER BY l.created_at DESC", LICENSE_DETAIL_SELECT))
        .fetch_all(pool)
        .await?;
    rows.iter().map(license_detail_from_row).collect()
}

/// Licenses whose expiry date falls between today and `within_days` from now
///
/// Soonest expiry first. Licenses without an expiry date never match.
pub async fn expiring_licenses(pool: &SqlitePool, within_days: i64) -> Result<Vec<LicenseDetail>> {
    let today = Utc::now().date_naive();
    let until = Duration::try_days(within_days.max(0))
        .and_then(|span| today.checked_add_signed(span))
        .ok_or_else(|| {
            Error::InvalidInput(format!("expiring_within_days is out of range: {}", within_days))
        })?;

    let rows = sqlx::query(&format!(
        "{} WHERE l.expiry_date IS NOT NULL AND l.expiry_date >= ? AND l.expiry_date <= ? \
         ORDER BY l.expiry_date ASC",
        LICENSE_DETAIL_SELECT
    ))
    .bind(today.format("%Y-%m-%d").to_string())
    .bind(until.format("%Y-%m-%d").to_string())
    .fetch_all(pool)
    .await?;
    rows.iter().map(license_detail_from_row).collect()
}

pub async fn assign_license(
    pool: &SqlitePool,
    id: &str,
    user_id: Option<&str>,
) -> Result<LicenseDetail> {
    if let Some(user_id) = user_id {
        if get_user(pool, user_id).await?.is_none() {
            return Err(Error::NotFound("User".to_string()));
        }
    }

    let result = sqlx::query("UPDATE software_licenses SET assigned_user_id = ? WHERE id = ?")
        .bind(user_id)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("License".to_string()));
    }

    info!("License {} assigned to {:?}", id, user_id);
    get_license(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound("License".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;

    fn license(name: &str, expiry_date: Option<String>) -> NewLicense {
        NewLicense {
            name: name.to_string(),
            vendor: "Acme".to_string(),
            license_key: format!("KEY-{}", name),
            expiry_date,
            assigned_user_id: None,
        }
    }

    fn days_from_today(days: i64) -> String {
        (Utc::now().date_naive() + Duration::days(days))
            .format("%Y-%m-%d")
            .to_string()
    }

    #[tokio::test]
    async fn test_expiring_window() {
        let pool = init_memory_database().await.unwrap();
        create_license(&pool, &license("soon", Some(days_from_today(3)))).await.unwrap();
        create_license(&pool, &license("later", Some(days_from_today(90)))).await.unwrap();
        create_license(&pool, &license("lapsed", Some(days_from_today(-2)))).await.unwrap();
        create_license(&pool, &license("perpetual", None)).await.unwrap();

        let within_week = expiring_licenses(&pool, 7).await.unwrap();
        assert_eq!(within_week.len(), 1);
        assert_eq!(within_week[0].license.name, "soon");

        let within_year = expiring_licenses(&pool, 365).await.unwrap();
        let names: Vec<&str> = within_year.iter().map(|l| l.license.name.as_str()).collect();
        assert_eq!(names, vec!["soon", "later"]);
    }

    #[tokio::test]
    async fn test_expiring_window_out_of_range() {
        let pool = init_memory_database().await.unwrap();
        create_license(&pool, &license("soon", Some(days_from_today(3)))).await.unwrap();

        for days in [100_000_000, i64::MAX] {
            let err = expiring_licenses(&pool, days).await.unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "{} days: {:?}", days, err);
        }
    }
}
