use serde::{Deserialize, Serialize};

use crate::db_types::{
    GroupBuy,
    GroupBuyId,
    GroupBuyStatus,
    Participant,
    PaymentStatus,
    PaymentTransition,
    UserId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub group_buy_id: GroupBuyId,
    pub user_id: UserId,
    pub display_name: Option<String>,
    pub quantity: i64,
}

/// The result of a committed reservation.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub participant: Participant,
    /// The group buy as it stands after the reservation.
    pub group_buy: GroupBuy,
    pub previous_status: GroupBuyStatus,
}

impl Reservation {
    pub fn reached_target(&self) -> bool {
        self.previous_status != self.group_buy.status && self.group_buy.status == GroupBuyStatus::Successful
    }
}

/// The effect of applying one gateway status report to a participant.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// The participant after the transition.
    pub participant: Participant,
    pub previous_status: PaymentStatus,
    pub transition: PaymentTransition,
    /// Set when a rollback handed quantity back to the group buy.
    pub group_buy: Option<GroupBuy>,
    pub previous_group_buy_status: Option<GroupBuyStatus>,
}

impl ReconcileOutcome {
    pub fn changed(&self) -> bool {
        self.previous_status != self.participant.payment_status
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityAudit {
    pub recorded: i64,
    pub committed: i64,
}

impl QuantityAudit {
    pub fn is_consistent(&self) -> bool {
        self.recorded == self.committed
    }
}
