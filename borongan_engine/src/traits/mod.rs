//! # Backend contracts
//!
//! The engine is provider-agnostic. It talks to durable storage through [`LedgerStore`] and to the payment provider
//! through [`PaymentGateway`]; concrete implementations live elsewhere (see [`crate::SqliteDatabase`] and the
//! server's Tripay adapter).
//!
//! * [`LedgerStore`] owns GroupBuy and Participant records. Every mutating method is a single atomic transaction that
//!   holds an exclusive lock on the rows it reads before writing them.
//! * [`PaymentGateway`] creates and queries external transactions and authenticates gateway callbacks.
mod data_objects;
mod ledger_store;
mod payment_gateway;

pub use data_objects::{JoinRequest, QuantityAudit, ReconcileOutcome, Reservation};
pub use ledger_store::{BoronganError, LedgerStore};
pub use payment_gateway::{GatewayError, PaymentGateway};
