use serde::{Deserialize, Serialize};

use crate::db_types::{GroupBuy, GroupBuyStatus, Participant, PaymentStatus};

/// A group buy moved between statuses: reaching its target, dropping back below it, expiring or completing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBuyStatusChangedEvent {
    pub group_buy: GroupBuy,
    pub old_status: GroupBuyStatus,
}

impl GroupBuyStatusChangedEvent {
    pub fn new(group_buy: GroupBuy, old_status: GroupBuyStatus) -> Self {
        Self { group_buy, old_status }
    }
}

/// A participant's payment reached a terminal state (`paid` or `failed`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSettledEvent {
    pub participant: Participant,
    pub old_status: PaymentStatus,
}

impl PaymentSettledEvent {
    pub fn new(participant: Participant, old_status: PaymentStatus) -> Self {
        Self { participant, old_status }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    GroupBuyStatusChanged(GroupBuyStatusChangedEvent),
    PaymentSettled(PaymentSettledEvent),
}
