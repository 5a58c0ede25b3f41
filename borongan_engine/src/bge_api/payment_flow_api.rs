use std::{fmt::Debug, str::FromStr, time::Duration};

use log::*;

use crate::{
    bge_api::{
        group_buy_flow_api::DEFAULT_GATEWAY_TIMEOUT,
        payment_objects::{NotificationAck, PaymentCallback, PaymentChannel, PaymentStatusReport},
    },
    db_types::{GatewayStatus, NoOpReason, ParticipantId, PaymentStatus, PaymentTransition},
    events::{EventProducers, GroupBuyStatusChangedEvent, PaymentSettledEvent},
    traits::{BoronganError, LedgerStore, PaymentGateway, ReconcileOutcome},
};

/// The only callback event that carries a payment status.
pub const PAYMENT_STATUS_EVENT: &str = "payment_status";
pub const PARTICIPANT_NOT_FOUND_ACK: &str = "Participant not found, ignoring";
pub const PROCESSING_FAILED_ACK: &str = "Webhook received but processing failed. Please check logs.";

/// `PaymentFlowApi` reconciles participant payment state with what the gateway reports, whether pushed through a
/// callback or pulled on a status check.
pub struct PaymentFlowApi<B, G> {
    db: B,
    gateway: G,
    producers: EventProducers,
    gateway_timeout: Duration,
}

impl<B, G> Debug for PaymentFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi")
    }
}

impl<B, G> PaymentFlowApi<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers) -> Self {
        Self { db, gateway, producers, gateway_timeout: DEFAULT_GATEWAY_TIMEOUT }
    }

    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, G> PaymentFlowApi<B, G>
where
    B: LedgerStore,
    G: PaymentGateway,
{
    /// Handles one gateway callback.
    ///
    /// The signature is checked over `raw_body` exactly as received, before any parsing. Failures to authenticate or
    /// parse are returned as errors. Everything after that is acknowledged: an unknown participant, an unrecognised
    /// status and even an internal failure all produce an `Ok` so the gateway does not retry forever.
    pub async fn handle_notification(
        &self,
        raw_body: &[u8],
        signature: Option<&str>,
        event: Option<&str>,
    ) -> Result<NotificationAck, BoronganError> {
        if !self.gateway.verify_callback_signature(raw_body, signature) {
            let reason = if signature.is_some() { "Invalid signature" } else { "Missing callback signature" };
            warn!("🧾️ Rejected a payment callback. {reason}");
            return Err(BoronganError::Unauthorized(reason.into()));
        }
        if let Some(event) = event.map(str::trim).filter(|e| *e != PAYMENT_STATUS_EVENT) {
            info!("🧾️ Ignoring '{event}' callback");
            return Ok(NotificationAck::new(format!("Event '{event}' ignored")));
        }
        let callback = serde_json::from_slice::<PaymentCallback>(raw_body).map_err(|e| {
            warn!("🧾️ Could not parse payment callback: {e}");
            BoronganError::InvalidArgument("Invalid JSON payload".into())
        })?;
        let merchant_ref = callback
            .merchant_ref
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| BoronganError::InvalidArgument("Merchant reference not found in callback".into()))?;
        let status = GatewayStatus::from(callback.status.as_deref().unwrap_or_default());
        info!(
            "🧾️ Payment callback: status={status}, merchant_ref={merchant_ref}, reference={}",
            callback.reference.as_deref().unwrap_or("-")
        );
        let participant_id = match ParticipantId::from_str(merchant_ref) {
            Ok(id) => id,
            Err(_) => {
                warn!("🧾️ Merchant reference '{merchant_ref}' is not a participant id. Ignoring callback.");
                return Ok(NotificationAck::new(PARTICIPANT_NOT_FOUND_ACK));
            },
        };
        match self.apply_gateway_status(&participant_id, &status).await {
            Ok(Some(outcome)) => Ok(NotificationAck::new(format!(
                "Webhook processed successfully. Status updated to {}",
                outcome.participant.payment_status
            ))),
            Ok(None) => {
                warn!("🧾️ Participant {participant_id} not found. Ignoring callback.");
                Ok(NotificationAck::new(PARTICIPANT_NOT_FOUND_ACK))
            },
            Err(e) => {
                error!("🧾️ Error processing payment callback for participant {participant_id}: {e}");
                Ok(NotificationAck::new(PROCESSING_FAILED_ACK))
            },
        }
    }

    /// Applies a gateway status to a participant through the ledger's locked transition, logs what happened and
    /// notifies subscribers.
    async fn apply_gateway_status(
        &self,
        participant_id: &ParticipantId,
        status: &GatewayStatus,
    ) -> Result<Option<ReconcileOutcome>, BoronganError> {
        let outcome = match self.db.reconcile_payment(participant_id, status).await? {
            Some(o) => o,
            None => return Ok(None),
        };
        let participant = &outcome.participant;
        match &outcome.transition {
            PaymentTransition::NoOp(NoOpReason::LatePaymentAfterRollback) => {
                error!(
                    "🧾️ Participant {participant_id} paid {} after their reservation was rolled back. The quantity \
                     was NOT re-reserved. This payment needs a manual refund.",
                    participant.total_price
                );
            },
            PaymentTransition::NoOp(NoOpReason::UnrecognizedStatus(s)) => {
                warn!("🧾️ Unknown payment status '{s}' for participant {participant_id}. Ignoring.");
            },
            PaymentTransition::NoOp(reason) => {
                debug!("🧾️ Status {status} for participant {participant_id} changes nothing: {reason}");
            },
            PaymentTransition::MarkPaid => {
                info!("🧾️ Payment for participant {participant_id} confirmed as paid");
            },
            PaymentTransition::MarkPending => {
                debug!("🧾️ Payment for participant {participant_id} is still pending");
            },
            PaymentTransition::MarkFailed => match &outcome.group_buy {
                Some(gb) => info!(
                    "🧾️ Payment for participant {participant_id} {status}. Rolled back {} units from {}. Now {}/{} ({})",
                    participant.quantity_ordered,
                    gb.id,
                    gb.current_quantity,
                    gb.target_quantity,
                    gb.status
                ),
                None => info!("🧾️ Payment for participant {participant_id} {status}. No group buy to roll back."),
            },
        }
        if outcome.changed() && participant.payment_status != PaymentStatus::Pending {
            let event = PaymentSettledEvent::new(participant.clone(), outcome.previous_status);
            self.producers.publish_payment_settled(event).await;
        }
        if let (Some(gb), Some(old_status)) = (&outcome.group_buy, outcome.previous_group_buy_status) {
            if gb.status != old_status {
                info!("🧾️ Group buy {} reverted from {old_status} to {}", gb.id, gb.status);
                self.producers.publish_status_changed(GroupBuyStatusChangedEvent::new(gb.clone(), old_status)).await;
            }
        }
        Ok(Some(outcome))
    }

    /// Reports a participant's payment state.
    ///
    /// With `refresh` set and a gateway reference on file, the gateway is asked first and whatever it reports is
    /// applied through the same locked transition as a callback. Gateway trouble is logged and the local state is
    /// returned.
    pub async fn payment_status(
        &self,
        participant_id: &ParticipantId,
        refresh: bool,
    ) -> Result<PaymentStatusReport, BoronganError> {
        let participant =
            self.db.fetch_participant(participant_id).await?.ok_or_else(BoronganError::participant_not_found)?;
        let reference = match (&participant.payment_reference, refresh) {
            (Some(reference), true) => reference.clone(),
            _ => return Ok(PaymentStatusReport::new(&participant, None)),
        };
        let report = match tokio::time::timeout(self.gateway_timeout, self.gateway.query_transaction(&reference)).await {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                warn!("🧾️ Failed to sync with the gateway for reference {reference}: {e}");
                return Ok(PaymentStatusReport::new(&participant, None));
            },
            Err(_) => {
                warn!("🧾️ Gateway did not answer a status query for reference {reference} in time");
                return Ok(PaymentStatusReport::new(&participant, None));
            },
        };
        if let Some(merchant_ref) = report.merchant_ref.as_deref() {
            if merchant_ref != participant_id.as_str() {
                error!(
                    "🧾️ Gateway reference {reference} belongs to '{merchant_ref}', not participant {participant_id}. \
                     Not applying its status."
                );
                return Ok(PaymentStatusReport::new(&participant, Some(report.status.to_string())));
            }
        }
        let gateway_status = Some(report.status.to_string());
        let participant = match self.apply_gateway_status(participant_id, &report.status).await? {
            Some(outcome) => outcome.participant,
            None => return Err(BoronganError::participant_not_found()),
        };
        Ok(PaymentStatusReport::new(&participant, gateway_status))
    }

    pub async fn payment_channels(&self) -> Result<Vec<PaymentChannel>, BoronganError> {
        match tokio::time::timeout(self.gateway_timeout, self.gateway.payment_channels()).await {
            Ok(Ok(channels)) => Ok(channels),
            Ok(Err(e)) => {
                error!("🧾️ Failed to fetch payment channels: {e}");
                Err(BoronganError::DependencyFailure(e.to_string()))
            },
            Err(_) => {
                error!("🧾️ Gateway did not return payment channels in time");
                Err(BoronganError::DependencyFailure("Timed out fetching payment channels.".into()))
            },
        }
    }
}
