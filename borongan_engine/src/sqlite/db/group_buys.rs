use chrono::{DateTime, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{GroupBuy, GroupBuyId, GroupBuyStatus};

/// Inserts a new group buy. This is not atomic. Embed the call in a transaction and pass `&mut *tx` if you need it to
/// be.
pub async fn insert_group_buy(group_buy: &GroupBuy, conn: &mut SqliteConnection) -> Result<GroupBuy, sqlx::Error> {
    let group_buy = sqlx::query_as(
        r#"
            INSERT INTO group_buys (
                id,
                organizer_id,
                title,
                description,
                unit_price,
                unit,
                target_quantity,
                current_quantity,
                deadline,
                status,
                pickup_point_address,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *;
        "#,
    )
    .bind(&group_buy.id)
    .bind(&group_buy.organizer_id)
    .bind(&group_buy.title)
    .bind(&group_buy.description)
    .bind(group_buy.unit_price)
    .bind(&group_buy.unit)
    .bind(group_buy.target_quantity)
    .bind(group_buy.current_quantity)
    .bind(group_buy.deadline)
    .bind(group_buy.status)
    .bind(&group_buy.pickup_point_address)
    .bind(group_buy.created_at)
    .bind(group_buy.updated_at)
    .fetch_one(conn)
    .await?;
    Ok(group_buy)
}

pub async fn fetch_group_buy(id: &GroupBuyId, conn: &mut SqliteConnection) -> Result<Option<GroupBuy>, sqlx::Error> {
    let group_buy = sqlx::query_as("SELECT * FROM group_buys WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(group_buy)
}

/// Takes the write lock and returns the group buy as it stands under that lock.
pub async fn lock_group_buy(id: &GroupBuyId, conn: &mut SqliteConnection) -> Result<Option<GroupBuy>, sqlx::Error> {
    trace!("🗃️ Locking group buy {id}");
    let group_buy = sqlx::query_as("UPDATE group_buys SET id = id WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(group_buy)
}

/// Writes the quantity and status of `group_buy` back to the database.
pub async fn save_quantity_and_status(
    group_buy: &GroupBuy,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<GroupBuy, sqlx::Error> {
    let group_buy = sqlx::query_as(
        r#"
            UPDATE group_buys SET current_quantity = $1, status = $2, updated_at = $3
            WHERE id = $4
            RETURNING *;
        "#,
    )
    .bind(group_buy.current_quantity)
    .bind(group_buy.status)
    .bind(now)
    .bind(&group_buy.id)
    .fetch_one(conn)
    .await?;
    Ok(group_buy)
}

pub async fn update_status(
    id: &GroupBuyId,
    status: GroupBuyStatus,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<GroupBuy, sqlx::Error> {
    let group_buy = sqlx::query_as("UPDATE group_buys SET status = $1, updated_at = $2 WHERE id = $3 RETURNING *")
        .bind(status)
        .bind(now)
        .bind(id)
        .fetch_one(conn)
        .await?;
    Ok(group_buy)
}

/// Flips every active group buy whose deadline is at or before `now` to `failed`, returning the flipped rows.
///
/// This is a single statement, so the status and deadline are re-checked under the write lock and a join that
/// committed first is never overwritten.
pub async fn expire_overdue(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<GroupBuy>, sqlx::Error> {
    let expired = sqlx::query_as(
        r#"
            UPDATE group_buys SET status = 'failed', updated_at = $1
            WHERE status = 'active' AND julianday(deadline) <= julianday($2)
            RETURNING *;
        "#,
    )
    .bind(now)
    .bind(now)
    .fetch_all(conn)
    .await?;
    Ok(expired)
}
