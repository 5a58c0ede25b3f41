use std::time::Duration;

use lapak_common::Secret;
use log::*;

pub const DEFAULT_API_URL: &str = "https://tripay.co.id/api-sandbox";
pub const DEFAULT_PAYMENT_METHOD: &str = "QRISC";
pub const DEFAULT_EXPIRY_MINUTES: i64 = 60;
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
/// Tripay requires a phone number on every transaction. Used when the payer has none on file.
pub const DEFAULT_CUSTOMER_PHONE: &str = "081234567890";

#[derive(Debug, Clone)]
pub struct TripayConfig {
    pub api_url: String,
    pub merchant_code: String,
    pub api_key: Secret<String>,
    pub private_key: Secret<String>,
    pub payment_method: String,
    pub expiry_minutes: i64,
    pub return_url: Option<String>,
    pub default_phone: String,
    pub timeout: Duration,
}

impl Default for TripayConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            merchant_code: String::default(),
            api_key: Secret::default(),
            private_key: Secret::default(),
            payment_method: DEFAULT_PAYMENT_METHOD.to_string(),
            expiry_minutes: DEFAULT_EXPIRY_MINUTES,
            return_url: None,
            default_phone: DEFAULT_CUSTOMER_PHONE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl TripayConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("LAPAK_TRIPAY_API_URL").unwrap_or_else(|_| {
            warn!("LAPAK_TRIPAY_API_URL not set, using the sandbox at {DEFAULT_API_URL}");
            DEFAULT_API_URL.to_string()
        });
        let merchant_code = std::env::var("LAPAK_TRIPAY_MERCHANT_CODE").unwrap_or_else(|_| {
            warn!("LAPAK_TRIPAY_MERCHANT_CODE not set, using (probably useless) default");
            "T00000".to_string()
        });
        let api_key = Secret::new(std::env::var("LAPAK_TRIPAY_API_KEY").unwrap_or_else(|_| {
            warn!("LAPAK_TRIPAY_API_KEY not set, using (probably useless) default");
            "DEV-0000000000".to_string()
        }));
        let private_key = Secret::new(std::env::var("LAPAK_TRIPAY_PRIVATE_KEY").unwrap_or_else(|_| {
            warn!("LAPAK_TRIPAY_PRIVATE_KEY not set. Callbacks will not verify.");
            String::default()
        }));
        let payment_method =
            std::env::var("LAPAK_TRIPAY_PAYMENT_METHOD").unwrap_or_else(|_| DEFAULT_PAYMENT_METHOD.to_string());
        let expiry_minutes = std::env::var("LAPAK_TRIPAY_EXPIRY_MINUTES")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("Invalid LAPAK_TRIPAY_EXPIRY_MINUTES '{s}': {e}. Using the default."))
                    .ok()
            })
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_EXPIRY_MINUTES);
        let return_url = std::env::var("LAPAK_TRIPAY_RETURN_URL").ok().filter(|s| !s.trim().is_empty());
        let default_phone =
            std::env::var("LAPAK_TRIPAY_DEFAULT_PHONE").unwrap_or_else(|_| DEFAULT_CUSTOMER_PHONE.to_string());
        let timeout = std::env::var("LAPAK_GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("Invalid LAPAK_GATEWAY_TIMEOUT_SECS '{s}': {e}. Using the default."))
                    .ok()
            })
            .filter(|t| *t > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        Self {
            api_url,
            merchant_code,
            api_key,
            private_key,
            payment_method,
            expiry_minutes,
            return_url,
            default_phone,
            timeout,
        }
    }
}
