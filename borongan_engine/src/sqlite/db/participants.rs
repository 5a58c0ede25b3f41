use chrono::{DateTime, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{GroupBuyId, Participant, ParticipantId, PaymentStatus, PickupStatus, UserId};

pub async fn insert_participant(
    participant: &Participant,
    conn: &mut SqliteConnection,
) -> Result<Participant, sqlx::Error> {
    let participant = sqlx::query_as(
        r#"
            INSERT INTO group_buy_participants (
                id,
                group_buy_id,
                user_id,
                display_name,
                quantity_ordered,
                total_price,
                payment_status,
                payment_reference,
                pickup_status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *;
        "#,
    )
    .bind(&participant.id)
    .bind(&participant.group_buy_id)
    .bind(&participant.user_id)
    .bind(&participant.display_name)
    .bind(participant.quantity_ordered)
    .bind(participant.total_price)
    .bind(participant.payment_status)
    .bind(&participant.payment_reference)
    .bind(participant.pickup_status)
    .bind(participant.created_at)
    .bind(participant.updated_at)
    .fetch_one(conn)
    .await?;
    Ok(participant)
}

pub async fn fetch_participant(
    id: &ParticipantId,
    conn: &mut SqliteConnection,
) -> Result<Option<Participant>, sqlx::Error> {
    let participant =
        sqlx::query_as("SELECT * FROM group_buy_participants WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(participant)
}

/// Takes the write lock and returns the participant as it stands under that lock.
pub async fn lock_participant(
    id: &ParticipantId,
    conn: &mut SqliteConnection,
) -> Result<Option<Participant>, sqlx::Error> {
    trace!("🗃️ Locking participant {id}");
    let participant = sqlx::query_as("UPDATE group_buy_participants SET id = id WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(participant)
}

pub async fn participant_exists(
    group_buy_id: &GroupBuyId,
    user_id: &UserId,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM group_buy_participants WHERE group_buy_id = $1 AND user_id = $2")
            .bind(group_buy_id)
            .bind(user_id)
            .fetch_one(conn)
            .await?;
    Ok(count > 0)
}

pub async fn fetch_participants_for_group_buy(
    group_buy_id: &GroupBuyId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Participant>, sqlx::Error> {
    let participants =
        sqlx::query_as("SELECT * FROM group_buy_participants WHERE group_buy_id = $1 ORDER BY created_at ASC")
            .bind(group_buy_id)
            .fetch_all(conn)
            .await?;
    Ok(participants)
}

/// The sum of `quantity_ordered` over every participant of the group buy that has not failed.
pub async fn committed_quantity(group_buy_id: &GroupBuyId, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let total: i64 = sqlx::query_scalar(
        r#"
            SELECT COALESCE(SUM(quantity_ordered), 0) FROM group_buy_participants
            WHERE group_buy_id = $1 AND payment_status != 'failed'
        "#,
    )
    .bind(group_buy_id)
    .fetch_one(conn)
    .await?;
    Ok(total)
}

pub async fn update_payment_status(
    id: &ParticipantId,
    status: PaymentStatus,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Participant, sqlx::Error> {
    let participant = sqlx::query_as(
        "UPDATE group_buy_participants SET payment_status = $1, updated_at = $2 WHERE id = $3 RETURNING *",
    )
    .bind(status)
    .bind(now)
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(participant)
}

pub async fn update_pickup_status(
    id: &ParticipantId,
    status: PickupStatus,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Participant, sqlx::Error> {
    let participant = sqlx::query_as(
        "UPDATE group_buy_participants SET pickup_status = $1, updated_at = $2 WHERE id = $3 RETURNING *",
    )
    .bind(status)
    .bind(now)
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(participant)
}

/// Returns the number of rows updated (0 or 1).
pub async fn set_payment_reference(
    id: &ParticipantId,
    reference: &str,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("UPDATE group_buy_participants SET payment_reference = $1, updated_at = $2 WHERE id = $3")
            .bind(reference)
            .bind(now)
            .bind(id)
            .execute(conn)
            .await?;
    Ok(result.rows_affected())
}

pub async fn delete_participant(id: &ParticipantId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM group_buy_participants WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected())
}
