use lapak_common::signature::{hmac_sha256_hex, verify_hmac_sha256_hex};

use crate::TripayApiError;

/// The signature Tripay expects on `transaction/create`: the hex HMAC-SHA256 of
/// `merchant_code + merchant_ref + amount` under the merchant's private key.
pub fn transaction_signature(
    private_key: &str,
    merchant_code: &str,
    merchant_ref: &str,
    amount: i64,
) -> Result<String, TripayApiError> {
    let message = format!("{merchant_code}{merchant_ref}{amount}");
    hmac_sha256_hex(private_key.as_bytes(), message.as_bytes()).map_err(|e| TripayApiError::Signature(e.to_string()))
}

/// Checks the `X-Callback-Signature` header against the raw callback body. A missing header, or an unset private key,
/// never verifies.
pub fn verify_callback_signature(private_key: &str, raw_body: &[u8], signature: Option<&str>) -> bool {
    match signature {
        Some(sig) if !private_key.is_empty() => verify_hmac_sha256_hex(private_key.as_bytes(), raw_body, sig).is_ok(),
        _ => false,
    }
}
