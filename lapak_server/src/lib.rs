//! # Lapak server
//! The HTTP front end for Lapak Warga group buys ("borongan"). It is responsible for:
//! * Letting signed-in residents open group buys, join them and pay through Tripay.
//! * Receiving Tripay payment callbacks and reconciling participant payment state.
//! * Expiring group buys whose deadline has passed, either on a timer or on demand.
//!
//! All the business rules live in `borongan_engine`; this crate wires them to actix-web.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/v1/borongan/...`: Group buy creation, detail, joins and completion.
//! * `/api/v1/payments/...`: The Tripay callback, payment status and the list of payment channels.
//! * `/internal/trigger-deadline-check`: Runs one deadline sweep.
pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod routes;
pub mod server;
pub mod sweeper_worker;

#[cfg(test)]
mod endpoint_tests;
