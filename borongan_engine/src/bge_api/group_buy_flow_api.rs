use std::{fmt::Debug, time::Duration};

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    bge_api::{
        group_buy_objects::{GroupBuyDetail, JoinConfirmation, JOINED_MESSAGE, TARGET_REACHED_MESSAGE},
        payment_objects::{Payer, TransactionOutcome, TransactionRequest},
    },
    db_types::{GroupBuy, GroupBuyId, GroupBuyStatus, NewGroupBuy, Participant, ParticipantId, UserId},
    events::{EventProducers, GroupBuyStatusChangedEvent},
    traits::{BoronganError, JoinRequest, LedgerStore, PaymentGateway, QuantityAudit, Reservation},
};

pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(15);

/// `GroupBuyFlowApi` coordinates the lifecycle of a group buy: creation, joins (with their payment initiation and
/// compensation), deadline expiry and completion.
pub struct GroupBuyFlowApi<B, G> {
    db: B,
    gateway: G,
    producers: EventProducers,
    gateway_timeout: Duration,
}

impl<B, G> Debug for GroupBuyFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GroupBuyFlowApi")
    }
}

impl<B, G> GroupBuyFlowApi<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers) -> Self {
        Self { db, gateway, producers, gateway_timeout: DEFAULT_GATEWAY_TIMEOUT }
    }

    /// Overrides how long a join waits on the gateway before giving up and rolling back.
    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }
}

impl<B, G> GroupBuyFlowApi<B, G>
where
    B: LedgerStore,
    G: PaymentGateway,
{
    pub async fn create_group_buy(
        &self,
        organizer_id: &UserId,
        group_buy: NewGroupBuy,
    ) -> Result<GroupBuy, BoronganError> {
        group_buy.validate(Utc::now())?;
        let group_buy = self.db.insert_group_buy(organizer_id, group_buy).await?;
        info!(
            "🛒️ Group buy {} ('{}') opened by {organizer_id}. Target {} {} by {}",
            group_buy.id, group_buy.title, group_buy.target_quantity, group_buy.unit, group_buy.deadline
        );
        Ok(group_buy)
    }

    pub async fn group_buy_detail(&self, id: &GroupBuyId) -> Result<GroupBuyDetail, BoronganError> {
        let group_buy = self.db.fetch_group_buy(id).await?.ok_or_else(BoronganError::group_buy_not_found)?;
        let participants = self.db.fetch_participants(id).await?;
        Ok(GroupBuyDetail::new(group_buy, participants))
    }

    /// Reserves `quantity` units of the group buy for `payer` and opens a payment for them.
    ///
    /// The reservation is committed *before* the gateway is called, so no lock is held across the network call. If the
    /// gateway rejects the request, errors or does not answer within the configured timeout, the reservation is
    /// compensated (the participant row is removed and the quantity handed back) and a `DependencyFailure` is
    /// returned. The caller never sees a success without a payment URL.
    pub async fn join(
        &self,
        group_buy_id: &GroupBuyId,
        payer: &Payer,
        quantity: i64,
    ) -> Result<JoinConfirmation, BoronganError> {
        if quantity < 1 {
            return Err(BoronganError::InvalidArgument("You must order at least 1 unit.".into()));
        }
        let request = JoinRequest {
            group_buy_id: group_buy_id.clone(),
            user_id: UserId::from(payer.user_id.as_str()),
            display_name: Some(payer.display_name()),
            quantity,
        };
        let reservation = self.db.reserve_quantity(&request).await?;
        let reached_target = reservation.reached_target();
        if reached_target {
            info!("🛒️ Group buy {group_buy_id} has reached its target of {}", reservation.group_buy.target_quantity);
            let event = GroupBuyStatusChangedEvent::new(reservation.group_buy.clone(), reservation.previous_status);
            self.producers.publish_status_changed(event).await;
        }
        let tx_request = TransactionRequest::for_participant(&reservation.participant, &reservation.group_buy, payer);
        let outcome = match tokio::time::timeout(self.gateway_timeout, self.gateway.create_transaction(&tx_request)).await
        {
            Ok(outcome) => outcome,
            Err(_) => TransactionOutcome::failed(format!(
                "The payment gateway did not respond within {} seconds.",
                self.gateway_timeout.as_secs()
            )),
        };
        let participant = &reservation.participant;
        match outcome {
            TransactionOutcome::Created(tx) => {
                if let Err(e) = self.db.attach_payment_reference(&participant.id, &tx.reference).await {
                    // The callback is keyed by participant id, so reconciliation still works without the reference
                    error!(
                        "🛒️ Could not store payment reference {} for participant {}: {e}. The join stands.",
                        tx.reference, participant.id
                    );
                }
                debug!("🛒️ Participant {} joined {group_buy_id} with payment {}", participant.id, tx.reference);
                let message = if reached_target { TARGET_REACHED_MESSAGE } else { JOINED_MESSAGE };
                Ok(JoinConfirmation {
                    participant_id: participant.id.clone(),
                    message: message.to_string(),
                    payment_url: tx.checkout_url,
                    group_buy_status: reservation.group_buy.status,
                    total_price: participant.total_price,
                })
            },
            TransactionOutcome::Failed { message } => {
                warn!(
                    "🛒️ Payment initiation failed for participant {} on {group_buy_id}: {message}. Rolling back.",
                    participant.id
                );
                self.compensate(&reservation).await;
                Err(BoronganError::DependencyFailure(message))
            },
        }
    }

    async fn compensate(&self, reservation: &Reservation) {
        let participant_id = &reservation.participant.id;
        match self.db.release_reservation(participant_id).await {
            Ok(Some(group_buy)) => {
                debug!(
                    "🛒️ Reservation for participant {participant_id} released. {} is at {}/{}",
                    group_buy.id, group_buy.current_quantity, group_buy.target_quantity
                );
                let old_status = reservation.group_buy.status;
                if group_buy.status != old_status {
                    info!("🛒️ Group buy {} reverted from {old_status} to {}", group_buy.id, group_buy.status);
                    self.producers.publish_status_changed(GroupBuyStatusChangedEvent::new(group_buy, old_status)).await;
                }
            },
            Ok(None) => {
                warn!("🛒️ Nothing to release for participant {participant_id}. It was already settled or removed.")
            },
            Err(e) => {
                error!(
                    "🛒️ Could not release the reservation for participant {participant_id} ({} units of {}): {e}. \
                     The quantity must be corrected manually.",
                    reservation.participant.quantity_ordered, reservation.group_buy.id
                );
            },
        }
    }

    /// Flips every overdue `active` group buy to `failed`. Returns the group buys that expired on this pass.
    pub async fn expire_group_buys(&self, now: DateTime<Utc>) -> Result<Vec<GroupBuy>, BoronganError> {
        let expired = self.db.expire_group_buys(now).await?;
        for group_buy in &expired {
            info!(
                "🛒️ Group buy {} expired at {}/{} {}",
                group_buy.id, group_buy.current_quantity, group_buy.target_quantity, group_buy.unit
            );
            let event = GroupBuyStatusChangedEvent::new(group_buy.clone(), GroupBuyStatus::Active);
            self.producers.publish_status_changed(event).await;
        }
        Ok(expired)
    }

    pub async fn complete_group_buy(&self, id: &GroupBuyId, organizer_id: &UserId) -> Result<GroupBuy, BoronganError> {
        let group_buy = self.db.complete_group_buy(id, organizer_id).await?;
        info!("🛒️ Group buy {id} completed by its organizer");
        let event = GroupBuyStatusChangedEvent::new(group_buy.clone(), GroupBuyStatus::Successful);
        self.producers.publish_status_changed(event).await;
        Ok(group_buy)
    }

    pub async fn mark_collected(
        &self,
        participant_id: &ParticipantId,
        organizer_id: &UserId,
    ) -> Result<Participant, BoronganError> {
        let participant = self.db.mark_collected(participant_id, organizer_id).await?;
        debug!("🛒️ Participant {participant_id} has collected their order");
        Ok(participant)
    }

    pub async fn audit_quantity(&self, id: &GroupBuyId) -> Result<QuantityAudit, BoronganError> {
        self.db.audit_quantity(id).await
    }
}
