use std::fmt::Display;

use borongan_engine::payment_objects::PaymentChannel;
use chrono::{DateTime, Utc};
use lapak_common::helpers::parse_boolean_flag;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinParams {
    pub quantity_ordered: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusQuery {
    #[serde(default)]
    pub refresh: Option<String>,
}

impl StatusQuery {
    /// Whether to ask the gateway before answering. Defaults to true.
    pub fn refresh(&self) -> bool {
        parse_boolean_flag(self.refresh.clone(), true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethods {
    pub success: bool,
    pub data: Vec<PaymentChannel>,
}

impl PaymentMethods {
    pub fn new(data: Vec<PaymentChannel>) -> Self {
        Self { success: true, data }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlineCheckResult {
    pub message: String,
    pub expired: usize,
    pub timestamp: DateTime<Utc>,
}

impl DeadlineCheckResult {
    pub fn new(expired: usize, timestamp: DateTime<Utc>) -> Self {
        Self { message: "Deadline check completed".into(), expired, timestamp }
    }
}
