//! Asset repository

use crate::db::models::{Asset, AssetDetail, AssetStatus, NewAsset};
use crate::db::pagination::{Page, Paginated};
use crate::db::users::{get_user, summary_from_row};
use crate::db::new_id;
use crate::time::now_string;
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::info;

pub(crate) const ASSET_DETAIL_SELECT: &str = r#"
    SELECT a.id, a.name, a.type, a.serial_number, a.status, a.assigned_user_id,
           a.purchase_date, a.created_at,
           u.id AS assignee_id, u.name AS assignee_name, u.email AS assignee_email
    FROM assets a
    LEFT JOIN users u ON u.id = a.assigned_user_id
"#;

/// Optional list filters
#[derive(Debug, Clone, Default)]
pub struct AssetFilter {
    pub status: Option<AssetStatus>,
    pub asset_type: Option<String>,
}

pub(crate) fn asset_from_row(row: &SqliteRow) -> Result<Asset> {
    let status: String = row.try_get("status")?;
    Ok(Asset {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        asset_type: row.try_get("type")?,
        serial_number: row.try_get("serial_number")?,
        status: status.parse().map_err(Error::Internal)?,
        assigned_user_id: row.try_get("assigned_user_id")?,
        purchase_date: row.try_get("purchase_date")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(crate) fn asset_detail_from_row(row: &SqliteRow) -> Result<AssetDetail> {
    Ok(AssetDetail {
        asset: asset_from_row(row)?,
        assigned_user: summary_from_row(row, "assignee")?,
    })
}

pub async fn serial_number_exists(pool: &SqlitePool, serial_number: &str) -> Result<bool> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM assets WHERE serial_number = ?)")
            .bind(serial_number)
            .fetch_one(pool)
            .await?;
    Ok(exists)
}

/// Insert an asset; serial number must be unique when present
pub async fn create_asset(pool: &SqlitePool, new_asset: &NewAsset) -> Result<Asset> {
    if let Some(serial) = &new_asset.serial_number {
        if serial_number_exists(pool, serial).await? {
            return Err(Error::Conflict(
                "An asset with this serial number already exists".to_string(),
            ));
        }
    }

    let asset = Asset {
        id: new_id(),
        name: new_asset.name.clone(),
        asset_type: new_asset.asset_type.clone(),
        serial_number: new_asset.serial_number.clone(),
        status: new_asset.status,
        assigned_user_id: None,
        purchase_date: new_asset.purchase_date.clone(),
        created_at: now_string(),
    };

    sqlx::query(
        r#"
        INSERT INTO assets (id, name, type, serial_number, status, assigned_user_id,
                            purchase_date, created_at)
        VALUES (?, ?, ?, ?, ?, NULL, ?, ?)
        "#,
    )
    .bind(&asset.id)
    .bind(&asset.name)
    .bind(&asset.asset_type)
    .bind(&asset.serial_number)
    .bind(asset.status.as_str())
    .bind(&asset.purchase_date)
    .bind(&asset.created_at)
    .execute(pool)
    .await?;

    info!("Created asset {} ({})", asset.name, asset.id);
    Ok(asset)
}

pub async fn get_asset(pool: &SqlitePool, id: &str) -> Result<Option<AssetDetail>> {
    let row = sqlx::query(&format!("{} WHERE a.id = ?", ASSET_DETAIL_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(asset_detail_from_row).transpose()
}

/// Assets, newest first, one page at a time
pub async fn list_assets(
    pool: &SqlitePool,
    filter: &AssetFilter,
    requested_page: i64,
    page_size: i64,
) -> Result<Paginated<AssetDetail>> {
    fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &AssetFilter) {
        qb.push(" WHERE 1 = 1");
        if let Some(status) = filter.status {
            qb.push(" AND a.status = ").push_bind(status.as_str());
        }
        if let Some(asset_type) = filter.asset_type.as_ref().filter(|t| !t.trim().is_empty()) {
            qb.push(" AND a.type = ").push_bind(asset_type.trim().to_string());
        }
    }

    let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM assets a");
    push_filter(&mut count_qb, filter);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let page = Page::calculate(total, requested_page, page_size);

    let mut qb = QueryBuilder::<Sqlite>::new(ASSET_DETAIL_SELECT);
    push_filter(&mut qb, filter);
    qb.push(" ORDER BY a.created_at DESC LIMIT ")
        .push_bind(page.page_size)
        .push(" OFFSET ")
        .push_bind(page.offset());

    let rows = qb.build().fetch_all(pool).await?;
    let items = rows
        .iter()
        .map(asset_detail_from_row)
        .collect::<Result<Vec<_>>>()?;

    Ok(Paginated { items, page })
}

/// Assets currently assigned to one user
pub async fn assets_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<Asset>> {
    let rows = sqlx::query(
        "SELECT * FROM assets WHERE assigned_user_id = ? ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(asset_from_row).collect()
}

pub async fn update_asset_status(
    pool: &SqlitePool,
    id: &str,
    status: AssetStatus,
) -> Result<AssetDetail> {
    let result = sqlx::query("UPDATE assets SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("Asset".to_string()));
    }

    info!("Asset {} status -> {}", id, status);
    get_asset(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound("Asset".to_string()))
}

/// Assign an asset to a user (status ASSIGNED) or unassign it (status AVAILABLE)
pub async fn assign_asset(
    pool: &SqlitePool,
    id: &str,
    user_id: Option<&str>,
) -> Result<AssetDetail> {
    if let Some(user_id) = user_id {
        if get_user(pool, user_id).await?.is_none() {
            return Err(Error::NotFound("User".to_string()));
        }
    }

    let status = if user_id.is_some() {
        AssetStatus::Assigned
    } else {
        AssetStatus::Available
    };

    let result = sqlx::query("UPDATE assets SET assigned_user_id = ?, status = ? WHERE id = ?")
        .bind(user_id)
        .bind(status.as_str())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("Asset".to_string()));
    }

    info!("Asset {} assigned to {:?}", id, user_id);
    get_asset(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound("Asset".to_string()))
}
