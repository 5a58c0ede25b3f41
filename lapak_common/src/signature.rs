//! HMAC-SHA256 helpers used to sign outgoing gateway requests and to authenticate incoming callbacks.
//!
//! Signatures are exchanged as lowercase hex strings.
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Invalid signing key. {0}")]
    InvalidKey(String),
    #[error("Signature is not valid hex. {0}")]
    InvalidEncoding(String),
    #[error("Signature does not match the message")]
    Mismatch,
}

fn new_mac(key: &[u8]) -> Result<HmacSha256, SignatureError> {
    HmacSha256::new_from_slice(key).map_err(|e| SignatureError::InvalidKey(e.to_string()))
}

/// Returns the hex-encoded HMAC-SHA256 of `message` under `key`.
pub fn hmac_sha256_hex(key: &[u8], message: &[u8]) -> Result<String, SignatureError> {
    let mut mac = new_mac(key)?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks a hex-encoded HMAC-SHA256 signature. The comparison runs in constant time.
pub fn verify_hmac_sha256_hex(key: &[u8], message: &[u8], signature: &str) -> Result<(), SignatureError> {
    let provided = hex::decode(signature.trim()).map_err(|e| SignatureError::InvalidEncoding(e.to_string()))?;
    let mut mac = new_mac(key)?;
    mac.update(message);
    mac.verify_slice(&provided).map_err(|_| SignatureError::Mismatch)
}
