use lapak_common::Rupiah;
use serde::{Deserialize, Serialize};

use crate::db_types::{GroupBuy, GroupBuyStatus, Participant, ParticipantId, PaymentStatus, PickupStatus, UserId};

pub const TARGET_REACHED_MESSAGE: &str = "Successfully joined! Target reached! Please complete the payment.";
pub const JOINED_MESSAGE: &str = "Successfully joined! Please complete the payment.";

/// Returned to a user who has successfully reserved a share of a group buy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinConfirmation {
    pub participant_id: ParticipantId,
    pub message: String,
    pub payment_url: String,
    pub group_buy_status: GroupBuyStatus,
    pub total_price: Rupiah,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSummary {
    pub id: ParticipantId,
    pub user_id: UserId,
    pub display_name: Option<String>,
    pub quantity_ordered: i64,
    pub total_price: Rupiah,
    pub payment_status: PaymentStatus,
    pub pickup_status: PickupStatus,
}

impl From<Participant> for ParticipantSummary {
    fn from(p: Participant) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            display_name: p.display_name,
            quantity_ordered: p.quantity_ordered,
            total_price: p.total_price,
            payment_status: p.payment_status,
            pickup_status: p.pickup_status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBuyDetail {
    #[serde(flatten)]
    pub group_buy: GroupBuy,
    pub participants_count: usize,
    pub participants: Vec<ParticipantSummary>,
}

impl GroupBuyDetail {
    pub fn new(group_buy: GroupBuy, participants: Vec<Participant>) -> Self {
        let participants = participants.into_iter().map(ParticipantSummary::from).collect::<Vec<_>>();
        Self { group_buy, participants_count: participants.len(), participants }
    }
}
