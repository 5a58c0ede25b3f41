//! `SqliteDatabase` is a concrete implementation of a Borongan ledger backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements the [`LedgerStore`] trait.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{db_url, group_buys, new_pool, participants};
use crate::{
    db_types::{
        GatewayStatus,
        GroupBuy,
        GroupBuyId,
        GroupBuyStatus,
        NewGroupBuy,
        Participant,
        ParticipantId,
        PaymentStatus,
        PaymentTransition,
        PickupStatus,
        UserId,
    },
    traits::{BoronganError, JoinRequest, LedgerStore, QuantityAudit, ReconcileOutcome, Reservation},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl LedgerStore for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_group_buy(
        &self,
        organizer_id: &UserId,
        group_buy: NewGroupBuy,
    ) -> Result<GroupBuy, BoronganError> {
        let mut conn = self.pool.acquire().await?;
        let group_buy = group_buy.into_group_buy(organizer_id.clone(), Utc::now());
        let group_buy = group_buys::insert_group_buy(&group_buy, &mut conn).await?;
        debug!("🗃️ Group buy {} saved for organizer {organizer_id}", group_buy.id);
        Ok(group_buy)
    }

    async fn fetch_group_buy(&self, id: &GroupBuyId) -> Result<Option<GroupBuy>, BoronganError> {
        let mut conn = self.pool.acquire().await?;
        let group_buy = group_buys::fetch_group_buy(id, &mut conn).await?;
        Ok(group_buy)
    }

    async fn fetch_participants(&self, id: &GroupBuyId) -> Result<Vec<Participant>, BoronganError> {
        let mut conn = self.pool.acquire().await?;
        let participants = participants::fetch_participants_for_group_buy(id, &mut conn).await?;
        Ok(participants)
    }

    async fn fetch_participant(&self, id: &ParticipantId) -> Result<Option<Participant>, BoronganError> {
        let mut conn = self.pool.acquire().await?;
        let participant = participants::fetch_participant(id, &mut conn).await?;
        Ok(participant)
    }

    async fn audit_quantity(&self, id: &GroupBuyId) -> Result<QuantityAudit, BoronganError> {
        let mut tx = self.pool.begin().await?;
        let group_buy = group_buys::fetch_group_buy(id, &mut tx).await?.ok_or_else(BoronganError::group_buy_not_found)?;
        let committed = participants::committed_quantity(id, &mut tx).await?;
        tx.commit().await?;
        Ok(QuantityAudit { recorded: group_buy.current_quantity, committed })
    }

    /// In a single atomic transaction,
    /// * locks the group buy row,
    /// * runs the join checks against the locked row,
    /// * inserts a `pending` participant,
    /// * increments the group buy quantity, flipping the status to `successful` if the target is met.
    async fn reserve_quantity(&self, request: &JoinRequest) -> Result<Reservation, BoronganError> {
        let mut tx = self.pool.begin().await?;
        let mut group_buy = group_buys::lock_group_buy(&request.group_buy_id, &mut tx)
            .await?
            .ok_or_else(BoronganError::group_buy_not_found)?;
        let now = Utc::now();
        let already_joined = participants::participant_exists(&request.group_buy_id, &request.user_id, &mut tx).await?;
        // Returning early drops `tx`, which rolls back and releases the lock
        group_buy.check_join(&request.user_id, request.quantity, already_joined, now)?;
        let previous_status = group_buy.status;
        let participant = Participant::new_pending(
            &group_buy,
            request.user_id.clone(),
            request.display_name.clone(),
            request.quantity,
            now,
        )?;
        let participant = participants::insert_participant(&participant, &mut tx).await?;
        group_buy.reserve(request.quantity);
        let group_buy = group_buys::save_quantity_and_status(&group_buy, now, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ Reserved {} unit(s) of {} for participant {}. Now {}/{} ({})",
            participant.quantity_ordered,
            group_buy.id,
            participant.id,
            group_buy.current_quantity,
            group_buy.target_quantity,
            group_buy.status
        );
        Ok(Reservation { participant, group_buy, previous_status })
    }

    async fn release_reservation(&self, participant_id: &ParticipantId) -> Result<Option<GroupBuy>, BoronganError> {
        let mut tx = self.pool.begin().await?;
        let participant = match participants::lock_participant(participant_id, &mut tx).await? {
            Some(p) => p,
            None => {
                debug!("🗃️ Participant {participant_id} is already gone. Nothing to release.");
                return Ok(None);
            },
        };
        if participant.payment_status != PaymentStatus::Pending {
            warn!(
                "🗃️ Participant {participant_id} is {} and cannot be released. Leaving it alone.",
                participant.payment_status
            );
            return Ok(None);
        }
        let mut group_buy = group_buys::lock_group_buy(&participant.group_buy_id, &mut tx)
            .await?
            .ok_or_else(BoronganError::group_buy_not_found)?;
        participants::delete_participant(participant_id, &mut tx).await?;
        group_buy.release(participant.quantity_ordered);
        let group_buy = group_buys::save_quantity_and_status(&group_buy, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ Released {} unit(s) of {} held by participant {participant_id}. Now {}/{} ({})",
            participant.quantity_ordered,
            group_buy.id,
            group_buy.current_quantity,
            group_buy.target_quantity,
            group_buy.status
        );
        Ok(Some(group_buy))
    }

    async fn attach_payment_reference(
        &self,
        participant_id: &ParticipantId,
        reference: &str,
    ) -> Result<(), BoronganError> {
        let mut conn = self.pool.acquire().await?;
        let updated = participants::set_payment_reference(participant_id, reference, Utc::now(), &mut conn).await?;
        if updated == 0 {
            return Err(BoronganError::participant_not_found());
        }
        trace!("🗃️ Participant {participant_id} linked to payment reference {reference}");
        Ok(())
    }

    /// In a single atomic transaction, locks the participant and applies the transition implied by `status`. A
    /// terminal failure also locks the group buy and hands the participant's quantity back to it.
    async fn reconcile_payment(
        &self,
        participant_id: &ParticipantId,
        status: &GatewayStatus,
    ) -> Result<Option<ReconcileOutcome>, BoronganError> {
        let mut tx = self.pool.begin().await?;
        let participant = match participants::lock_participant(participant_id, &mut tx).await? {
            Some(p) => p,
            None => return Ok(None),
        };
        let previous_status = participant.payment_status;
        let transition = previous_status.transition_for(status);
        let now = Utc::now();
        let mut group_buy = None;
        let mut previous_group_buy_status = None;
        let participant = match &transition {
            PaymentTransition::MarkPaid => {
                participants::update_payment_status(participant_id, PaymentStatus::Paid, now, &mut tx).await?
            },
            PaymentTransition::MarkPending => {
                participants::update_payment_status(participant_id, PaymentStatus::Pending, now, &mut tx).await?
            },
            PaymentTransition::MarkFailed => {
                let participant =
                    participants::update_payment_status(participant_id, PaymentStatus::Failed, now, &mut tx).await?;
                match group_buys::lock_group_buy(&participant.group_buy_id, &mut tx).await? {
                    Some(mut gb) => {
                        previous_group_buy_status = Some(gb.status);
                        gb.release(participant.quantity_ordered);
                        group_buy = Some(group_buys::save_quantity_and_status(&gb, now, &mut tx).await?);
                    },
                    None => {
                        warn!("🗃️ Group buy {} for participant {participant_id} no longer exists.", participant.group_buy_id)
                    },
                }
                participant
            },
            PaymentTransition::NoOp(_) => participant,
        };
        tx.commit().await?;
        Ok(Some(ReconcileOutcome { participant, previous_status, transition, group_buy, previous_group_buy_status }))
    }

    async fn expire_group_buys(&self, now: DateTime<Utc>) -> Result<Vec<GroupBuy>, BoronganError> {
        let mut tx = self.pool.begin().await?;
        let expired = group_buys::expire_overdue(now, &mut tx).await?;
        tx.commit().await?;
        trace!("🗃️ {} group buys expired", expired.len());
        Ok(expired)
    }

    async fn complete_group_buy(&self, id: &GroupBuyId, organizer_id: &UserId) -> Result<GroupBuy, BoronganError> {
        let mut tx = self.pool.begin().await?;
        let group_buy =
            group_buys::lock_group_buy(id, &mut tx).await?.ok_or_else(BoronganError::group_buy_not_found)?;
        if &group_buy.organizer_id != organizer_id {
            return Err(BoronganError::Forbidden("Only the organizer can complete this group buy.".into()));
        }
        if group_buy.status != GroupBuyStatus::Successful {
            return Err(BoronganError::InvalidState(format!(
                "Only a successful group buy can be completed. This one is {}.",
                group_buy.status
            )));
        }
        let group_buy = group_buys::update_status(id, GroupBuyStatus::Completed, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        Ok(group_buy)
    }

    async fn mark_collected(
        &self,
        participant_id: &ParticipantId,
        organizer_id: &UserId,
    ) -> Result<Participant, BoronganError> {
        let mut tx = self.pool.begin().await?;
        let participant = participants::lock_participant(participant_id, &mut tx)
            .await?
            .ok_or_else(BoronganError::participant_not_found)?;
        let group_buy = group_buys::fetch_group_buy(&participant.group_buy_id, &mut tx)
            .await?
            .ok_or_else(BoronganError::group_buy_not_found)?;
        if &group_buy.organizer_id != organizer_id {
            return Err(BoronganError::Forbidden("Only the organizer can record a pickup.".into()));
        }
        if participant.payment_status != PaymentStatus::Paid {
            return Err(BoronganError::InvalidState("Only paid orders can be marked as collected.".into()));
        }
        if participant.pickup_status == PickupStatus::Collected {
            return Ok(participant);
        }
        let participant =
            participants::update_pickup_status(participant_id, PickupStatus::Collected, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        Ok(participant)
    }

    async fn close(&mut self) -> Result<(), BoronganError> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
