//! Borongan Engine
//!
//! The Borongan Engine coordinates neighbourhood group buys ("borongan"): an organizer offers goods at a bulk unit
//! price with a quantity target and a deadline, and residents join by reserving a share and paying for it through an
//! external payment gateway. This library holds the core logic. It is provider-agnostic.
//!
//! The library is divided into these sections:
//! 1. The backend contracts ([`mod@traits`]). A [`traits::LedgerStore`] persists group buys and participants and
//!    serializes every quantity mutation. A [`traits::PaymentGateway`] creates and queries transactions and
//!    authenticates gateway callbacks. [`SqliteDatabase`] is the shipped ledger.
//! 2. The public API ([`mod@bge_api`]). [`GroupBuyFlowApi`] handles group buy lifecycles and joins, including the
//!    rollback when a payment cannot be opened. [`PaymentFlowApi`] reconciles payment state from gateway callbacks and
//!    status queries.
//! 3. Shared data types ([`mod@db_types`]).
//!
//! The engine also publishes events ([`mod@events`]) when a group buy changes status or a payment settles. A simple
//! channel-backed handler lets you hook into these and run your own async callbacks.
pub mod bge_api;
pub mod db_types;
pub mod events;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;


pub use bge_api::{
    group_buy_flow_api::GroupBuyFlowApi,
    group_buy_objects,
    payment_flow_api::PaymentFlowApi,
    payment_objects,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{BoronganError, GatewayError, LedgerStore, PaymentGateway};
