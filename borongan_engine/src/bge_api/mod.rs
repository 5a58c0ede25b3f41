//! # Borongan engine public API
//!
//! * [`group_buy_flow_api`] is the coordinator. It opens group buys, reserves quantity for joins and opens their
//!   payments (rolling back when the gateway cannot), expires overdue group buys and closes completed ones.
//! * [`payment_flow_api`] is the reconciler. It authenticates and applies gateway callbacks and answers payment
//!   status queries, optionally syncing with the gateway first.
//!
//! Both are created from a [`crate::traits::LedgerStore`] backend, a [`crate::traits::PaymentGateway`] and a set of
//! event producers:
//!
//! ```rust,ignore
//! use borongan_engine::{events::EventProducers, GroupBuyFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = GroupBuyFlowApi::new(db, my_gateway, EventProducers::default());
//! let confirmation = api.join(&group_buy_id, &payer, 3).await?;
//! ```
pub mod group_buy_flow_api;
pub mod group_buy_objects;
pub mod payment_flow_api;
pub mod payment_objects;
