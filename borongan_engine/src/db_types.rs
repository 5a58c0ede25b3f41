//! Data types stored in and returned from the ledger.
//!
//! Besides plain records, this module holds the pure state-machine rules for group buys and participant payments.
//! Backends call these rules on rows they have already locked, so the rules themselves never touch storage.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use lapak_common::Rupiah;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use uuid::Uuid;

use crate::traits::BoronganError;

pub const MAX_TITLE_LENGTH: usize = 255;
pub const MAX_UNIT_LENGTH: usize = 20;

//--------------------------------------      Identifiers     --------------------------------------------------------
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("'{0}' is not a valid identifier. Expected a UUID.")]
pub struct InvalidId(pub String);

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
        #[sqlx(transparent)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn random() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl FromStr for $name {
            type Err = InvalidId;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(|u| Self(u.to_string())).map_err(|_| InvalidId(s.to_string()))
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

uuid_id!(GroupBuyId);
uuid_id!(ParticipantId);

/// The identity of a user, as issued by the external identity service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//--------------------------------------    GroupBuyStatus    --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GroupBuyStatus {
    /// Accepting participants.
    Active,
    /// The target quantity has been reached.
    Successful,
    /// The deadline passed before the target was reached.
    Failed,
    /// Closed by the organizer after a successful run.
    Completed,
}

impl GroupBuyStatus {
    /// Failed and completed group buys never change status again.
    pub fn is_frozen(&self) -> bool {
        matches!(self, Self::Failed | Self::Completed)
    }
}

impl Display for GroupBuyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Successful => write!(f, "successful"),
            Self::Failed => write!(f, "failed"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for GroupBuyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "successful" => Ok(Self::Successful),
            "failed" => Ok(Self::Failed),
            "completed" => Ok(Self::Completed),
            s => Err(format!("Invalid group buy status: {s}")),
        }
    }
}

//--------------------------------------     PaymentStatus    --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            s => Err(format!("Invalid payment status: {s}")),
        }
    }
}

/// What a gateway status report means for a participant in a given payment state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentTransition {
    MarkPaid,
    /// Mark the participant failed and hand its quantity back to the group buy.
    MarkFailed,
    /// The gateway reports the payment as open again. Paid and pending both hold their quantity.
    MarkPending,
    NoOp(NoOpReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoOpReason {
    AlreadyInState,
    /// Failed participants are inert.
    ParticipantFailed,
    /// A paid notification for a participant whose reservation was already rolled back. Needs a manual refund.
    LatePaymentAfterRollback,
    UnrecognizedStatus(String),
}

impl Display for NoOpReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyInState => write!(f, "status unchanged"),
            Self::ParticipantFailed => write!(f, "participant has already failed"),
            Self::LatePaymentAfterRollback => write!(f, "payment arrived after the reservation was rolled back"),
            Self::UnrecognizedStatus(s) => write!(f, "unrecognized gateway status '{s}'"),
        }
    }
}

impl PaymentStatus {
    /// Every quantity mutation is keyed off the status *before* the transition, so each confirmation or rollback can
    /// fire at most once per participant no matter how often, or in which order, the gateway reports.
    pub fn transition_for(&self, gateway: &GatewayStatus) -> PaymentTransition {
        use PaymentTransition::*;
        match (self, gateway.category()) {
            (_, GatewayStatusCategory::Unrecognized) => NoOp(NoOpReason::UnrecognizedStatus(gateway.to_string())),
            (PaymentStatus::Failed, GatewayStatusCategory::Paid) => NoOp(NoOpReason::LatePaymentAfterRollback),
            (PaymentStatus::Failed, GatewayStatusCategory::TerminalFailure) => NoOp(NoOpReason::AlreadyInState),
            (PaymentStatus::Failed, GatewayStatusCategory::Pending) => NoOp(NoOpReason::ParticipantFailed),
            (PaymentStatus::Paid, GatewayStatusCategory::Paid) => NoOp(NoOpReason::AlreadyInState),
            (PaymentStatus::Pending, GatewayStatusCategory::Pending) => NoOp(NoOpReason::AlreadyInState),
            (_, GatewayStatusCategory::Paid) => MarkPaid,
            (_, GatewayStatusCategory::TerminalFailure) => MarkFailed,
            (_, GatewayStatusCategory::Pending) => MarkPending,
        }
    }
}

//--------------------------------------     PickupStatus     --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PickupStatus {
    Pending,
    Collected,
}

impl Display for PickupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Collected => write!(f, "collected"),
        }
    }
}

//--------------------------------------     GatewayStatus    --------------------------------------------------------
/// A transaction status as reported by the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayStatus {
    Paid,
    Unpaid,
    Expired,
    Failed,
    Canceled,
    Refund,
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayStatusCategory {
    Paid,
    TerminalFailure,
    Pending,
    Unrecognized,
}

impl GatewayStatus {
    pub fn category(&self) -> GatewayStatusCategory {
        match self {
            Self::Paid => GatewayStatusCategory::Paid,
            Self::Expired | Self::Failed | Self::Canceled => GatewayStatusCategory::TerminalFailure,
            Self::Unpaid => GatewayStatusCategory::Pending,
            Self::Refund | Self::Other(_) => GatewayStatusCategory::Unrecognized,
        }
    }
}

impl From<&str> for GatewayStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "PAID" => Self::Paid,
            "UNPAID" => Self::Unpaid,
            "EXPIRED" => Self::Expired,
            "FAILED" => Self::Failed,
            "CANCELED" | "CANCELLED" => Self::Canceled,
            "REFUND" => Self::Refund,
            _ => Self::Other(value.to_string()),
        }
    }
}

impl Display for GatewayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Paid => write!(f, "PAID"),
            Self::Unpaid => write!(f, "UNPAID"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Canceled => write!(f, "CANCELED"),
            Self::Refund => write!(f, "REFUND"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

//--------------------------------------        GroupBuy      --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct GroupBuy {
    pub id: GroupBuyId,
    pub organizer_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub unit_price: Rupiah,
    pub unit: String,
    pub target_quantity: i64,
    pub current_quantity: i64,
    pub deadline: DateTime<Utc>,
    pub status: GroupBuyStatus,
    pub pickup_point_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GroupBuy {
    pub fn remaining_capacity(&self) -> i64 {
        (self.target_quantity - self.current_quantity).max(0)
    }

    /// Checks whether `user_id` may join with `quantity` units. Must be called on a locked row; the checks run in
    /// order and the first failure wins.
    pub fn check_join(
        &self,
        user_id: &UserId,
        quantity: i64,
        already_joined: bool,
        now: DateTime<Utc>,
    ) -> Result<(), BoronganError> {
        if self.status != GroupBuyStatus::Active {
            return Err(BoronganError::InvalidState("This group buy is no longer active.".into()));
        }
        if self.deadline <= now {
            return Err(BoronganError::InvalidState("The deadline for this group buy has passed.".into()));
        }
        if &self.organizer_id == user_id {
            return Err(BoronganError::Forbidden("You cannot join a group buy that you created.".into()));
        }
        if already_joined {
            return Err(BoronganError::Conflict("You have already joined this group buy.".into()));
        }
        let remaining = self.remaining_capacity();
        if quantity > remaining {
            return Err(BoronganError::InvalidArgument(format!(
                "Cannot order that many. Only {remaining} unit(s) left to reach target."
            )));
        }
        Ok(())
    }

    /// Adds a reservation of `quantity` units. Returns true if this pushed the group buy to `successful`.
    pub fn reserve(&mut self, quantity: i64) -> bool {
        self.current_quantity += quantity;
        if self.status == GroupBuyStatus::Active && self.current_quantity >= self.target_quantity {
            self.status = GroupBuyStatus::Successful;
            return true;
        }
        false
    }

    /// Hands `quantity` units back. Returns true if this reverted a `successful` group buy to `active`. Frozen group
    /// buys keep their status.
    pub fn release(&mut self, quantity: i64) -> bool {
        self.current_quantity = (self.current_quantity - quantity).max(0);
        if self.status == GroupBuyStatus::Successful && self.current_quantity < self.target_quantity {
            self.status = GroupBuyStatus::Active;
            return true;
        }
        false
    }
}

//--------------------------------------      NewGroupBuy     --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGroupBuy {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub unit_price: Rupiah,
    pub unit: String,
    pub target_quantity: i64,
    pub deadline: DateTime<Utc>,
    pub pickup_point_address: String,
}

impl NewGroupBuy {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), BoronganError> {
        let title = self.title.trim();
        if title.is_empty() || title.chars().count() > MAX_TITLE_LENGTH {
            return Err(BoronganError::InvalidArgument(format!(
                "The title must be between 1 and {MAX_TITLE_LENGTH} characters."
            )));
        }
        let unit = self.unit.trim();
        if unit.is_empty() || unit.chars().count() > MAX_UNIT_LENGTH {
            return Err(BoronganError::InvalidArgument(format!(
                "The unit must be between 1 and {MAX_UNIT_LENGTH} characters."
            )));
        }
        if !self.unit_price.is_positive() {
            return Err(BoronganError::InvalidArgument("The unit price must be greater than zero.".into()));
        }
        if self.target_quantity < 1 {
            return Err(BoronganError::InvalidArgument("The target quantity must be at least 1.".into()));
        }
        if self.deadline <= now {
            return Err(BoronganError::InvalidArgument("The deadline must be in the future.".into()));
        }
        if self.pickup_point_address.trim().is_empty() {
            return Err(BoronganError::InvalidArgument("A pickup point address is required.".into()));
        }
        Ok(())
    }

    pub fn into_group_buy(self, organizer_id: UserId, now: DateTime<Utc>) -> GroupBuy {
        GroupBuy {
            id: GroupBuyId::random(),
            organizer_id,
            title: self.title.trim().to_string(),
            description: self.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            unit_price: self.unit_price,
            unit: self.unit.trim().to_string(),
            target_quantity: self.target_quantity,
            current_quantity: 0,
            deadline: self.deadline,
            status: GroupBuyStatus::Active,
            pickup_point_address: self.pickup_point_address.trim().to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

//--------------------------------------      Participant     --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub group_buy_id: GroupBuyId,
    pub user_id: UserId,
    pub display_name: Option<String>,
    pub quantity_ordered: i64,
    pub total_price: Rupiah,
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
    pub pickup_status: PickupStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Participant {
    /// A fresh `pending` participant for `group_buy`. The total price is computed exactly from the unit price.
    pub fn new_pending(
        group_buy: &GroupBuy,
        user_id: UserId,
        display_name: Option<String>,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> Result<Self, BoronganError> {
        let total_price = group_buy
            .unit_price
            .checked_mul(quantity)
            .ok_or_else(|| BoronganError::InvalidArgument("The order total is too large.".into()))?;
        Ok(Self {
            id: ParticipantId::random(),
            group_buy_id: group_buy.id.clone(),
            user_id,
            display_name,
            quantity_ordered: quantity,
            total_price,
            payment_status: PaymentStatus::Pending,
            payment_reference: None,
            pickup_status: PickupStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }
}
