//! Primitives shared by the Lapak Warga crates: the `Rupiah` money type, secret wrappers and HMAC signing helpers.
mod rupiah;

pub mod helpers;
mod secret;
pub mod signature;

pub use rupiah::{Rupiah, RupiahParseError, RUPIAH_CURRENCY_CODE};
pub use secret::Secret;
