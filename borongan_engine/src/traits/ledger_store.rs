use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{GatewayStatus, GroupBuy, GroupBuyId, NewGroupBuy, Participant, ParticipantId, UserId},
    traits::data_objects::{JoinRequest, QuantityAudit, ReconcileOutcome, Reservation},
};

/// Durable storage for group buys and their participants.
///
/// Implementations must serialize all mutations against the same group buy. Each mutating method below runs as one
/// transaction that takes an exclusive lock on the rows it is about to modify *before* reading the quantity or status
/// fields it will write, and releases it only on commit or rollback.
#[allow(async_fn_in_trait)]
pub trait LedgerStore: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Persists a validated group buy for `organizer_id`.
    async fn insert_group_buy(&self, organizer_id: &UserId, group_buy: NewGroupBuy)
        -> Result<GroupBuy, BoronganError>;

    async fn fetch_group_buy(&self, id: &GroupBuyId) -> Result<Option<GroupBuy>, BoronganError>;

    async fn fetch_participants(&self, id: &GroupBuyId) -> Result<Vec<Participant>, BoronganError>;

    async fn fetch_participant(&self, id: &ParticipantId) -> Result<Option<Participant>, BoronganError>;

    /// The recorded quantity of a group buy next to the sum over its non-failed participants.
    async fn audit_quantity(&self, id: &GroupBuyId) -> Result<QuantityAudit, BoronganError>;

    /// Locks the group buy, runs the join checks against the locked row, then inserts a `pending` participant and
    /// increments the group buy's quantity (flipping it to `successful` when the target is met), all in one
    /// transaction. The deadline is checked against the time the lock was acquired.
    async fn reserve_quantity(&self, request: &JoinRequest) -> Result<Reservation, BoronganError>;

    /// Compensates a reservation whose payment could not be initiated. The participant row is deleted and its
    /// quantity handed back to the group buy. Returns the updated group buy, or `None` if there was nothing to undo.
    async fn release_reservation(&self, participant_id: &ParticipantId) -> Result<Option<GroupBuy>, BoronganError>;

    async fn attach_payment_reference(
        &self,
        participant_id: &ParticipantId,
        reference: &str,
    ) -> Result<(), BoronganError>;

    /// Applies a gateway status report to a participant. Returns `None` if the participant does not exist.
    async fn reconcile_payment(
        &self,
        participant_id: &ParticipantId,
        status: &GatewayStatus,
    ) -> Result<Option<ReconcileOutcome>, BoronganError>;

    /// Marks every `active` group buy whose deadline is at or before `now` as `failed`. Returns the expired rows.
    async fn expire_group_buys(&self, now: DateTime<Utc>) -> Result<Vec<GroupBuy>, BoronganError>;

    /// Organizer closes a `successful` group buy.
    async fn complete_group_buy(&self, id: &GroupBuyId, organizer_id: &UserId) -> Result<GroupBuy, BoronganError>;

    /// Organizer records that a paid participant has picked up their order.
    async fn mark_collected(
        &self,
        participant_id: &ParticipantId,
        organizer_id: &UserId,
    ) -> Result<Participant, BoronganError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), BoronganError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoronganError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("Payment gateway failure. {0}")]
    DependencyFailure(String),
}

impl BoronganError {
    pub fn group_buy_not_found() -> Self {
        Self::NotFound("Group buy session not found.".into())
    }

    pub fn participant_not_found() -> Self {
        Self::NotFound("Participant not found.".into())
    }
}

impl From<sqlx::Error> for BoronganError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                Self::Conflict("You have already joined this group buy.".into())
            },
            e => Self::DatabaseError(e.to_string()),
        }
    }
}
