use chrono::{DateTime, Utc};
use lapak_common::Rupiah;
use serde::{Deserialize, Serialize};

use crate::db_types::{GatewayStatus, GroupBuy, GroupBuyId, Participant, ParticipantId, PaymentStatus};

/// The authenticated user behind a join, as far as the payment gateway needs to know them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payer {
    pub user_id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

impl Payer {
    /// The name shown to the gateway and stored on the participant row. Falls back to the email address.
    pub fn display_name(&self) -> String {
        self.full_name.as_deref().map(str::trim).filter(|n| !n.is_empty()).unwrap_or(&self.email).to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionItem {
    pub sku: String,
    pub name: String,
    /// Whole rupiah
    pub price: i64,
    pub quantity: i64,
}

/// A provider-agnostic request to open a payment for one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Always the participant id, so callbacks can be routed back without a lookup table.
    pub merchant_ref: String,
    /// Whole rupiah
    pub amount: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub items: Vec<TransactionItem>,
}

impl TransactionRequest {
    /// Builds the request for a freshly reserved participant.
    ///
    /// Gateways only accept whole rupiah. If the unit price is whole, the order is itemised as `quantity` units at
    /// the unit price. Otherwise it becomes a single line for the whole (truncated) amount, so the item lines always
    /// sum to `amount`.
    pub fn for_participant(participant: &Participant, group_buy: &GroupBuy, payer: &Payer) -> Self {
        let amount = participant.total_price.whole_rupiah();
        let item = if group_buy.unit_price.is_whole() {
            TransactionItem {
                sku: group_buy.id.to_string(),
                name: format!("{} ({})", group_buy.title, group_buy.unit),
                price: group_buy.unit_price.whole_rupiah(),
                quantity: participant.quantity_ordered,
            }
        } else {
            TransactionItem {
                sku: group_buy.id.to_string(),
                name: format!("{} ({} x {})", group_buy.title, participant.quantity_ordered, group_buy.unit),
                price: amount,
                quantity: 1,
            }
        };
        Self {
            merchant_ref: participant.id.to_string(),
            amount,
            customer_name: payer.display_name(),
            customer_email: payer.email.clone(),
            customer_phone: payer.phone.clone(),
            items: vec![item],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedTransaction {
    pub reference: String,
    pub checkout_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    Created(CreatedTransaction),
    Failed { message: String },
}

impl TransactionOutcome {
    pub fn failed<S: Into<String>>(message: S) -> Self {
        Self::Failed { message: message.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionStatusReport {
    pub reference: String,
    pub merchant_ref: Option<String>,
    pub status: GatewayStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentChannel {
    pub group: String,
    pub code: String,
    pub name: String,
    pub active: bool,
    pub icon_url: Option<String>,
}

/// The fields of a gateway callback body that reconciliation cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCallback {
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub merchant_ref: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_method_code: Option<String>,
    #[serde(default)]
    pub paid_at: Option<i64>,
}

/// The acknowledgement returned to the gateway for every callback that passed authentication and parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAck {
    pub message: String,
}

impl NotificationAck {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusReport {
    pub participant_id: ParticipantId,
    pub group_buy_id: GroupBuyId,
    pub payment_status: PaymentStatus,
    /// The raw gateway status, when it was queried
    pub gateway_status: Option<String>,
    pub payment_reference: Option<String>,
    pub total_price: Rupiah,
    pub checked_at: DateTime<Utc>,
}

impl PaymentStatusReport {
    pub fn new(participant: &Participant, gateway_status: Option<String>) -> Self {
        Self {
            participant_id: participant.id.clone(),
            group_buy_id: participant.group_buy_id.clone(),
            payment_status: participant.payment_status,
            gateway_status,
            payment_reference: participant.payment_reference.clone(),
            total_price: participant.total_price,
            checked_at: Utc::now(),
        }
    }
}
