//! A client for the parts of the Tripay payment gateway API that group buys need: opening closed-payment
//! transactions, reading their status back, listing payment channels and authenticating callbacks.
mod api;
mod config;
mod error;

pub mod data_objects;
pub mod helpers;

pub use api::TripayApi;
pub use config::TripayConfig;
pub use data_objects::{CallbackPayload, NewTransaction, OrderItem, PaymentChannel, Transaction, TransactionDraft};
pub use error::TripayApiError;
