use serde::{Deserialize, Serialize};

use crate::TripayApiError;

/// Every Tripay response is wrapped in this envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TripayResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> TripayResponse<T> {
    pub fn into_data(self) -> Result<T, TripayApiError> {
        if !self.success {
            let message = if self.message.is_empty() { "no reason given".to_string() } else { self.message };
            return Err(TripayApiError::Rejected(message));
        }
        self.data.ok_or(TripayApiError::EmptyResponse)
    }
}

/// The error body Tripay sends with non-2xx statuses. Every field is optional since proxies in front of Tripay
/// return their own bodies.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrderItem {
    pub sku: String,
    pub name: String,
    /// Whole rupiah
    pub price: i64,
    pub quantity: i64,
}

/// What the caller knows about a transaction. [`crate::TripayApi::create_transaction`] adds the merchant-level
/// fields and the signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDraft {
    pub merchant_ref: String,
    /// Whole rupiah
    pub amount: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub order_items: Vec<OrderItem>,
}

/// The body of `POST /transaction/create`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NewTransaction {
    pub method: String,
    pub merchant_ref: String,
    pub amount: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub order_items: Vec<OrderItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
    /// Unix timestamp, seconds
    pub expired_time: i64,
    pub signature: String,
}

/// A transaction as returned by `transaction/create` and `transaction/detail`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Transaction {
    pub reference: String,
    #[serde(default)]
    pub merchant_ref: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    pub status: String,
    #[serde(default)]
    pub checkout_url: Option<String>,
    #[serde(default)]
    pub pay_url: Option<String>,
    #[serde(default)]
    pub expired_time: Option<i64>,
}

impl Transaction {
    /// The page the customer should be sent to. Closed-payment transactions always carry a checkout URL; some
    /// direct channels only return a pay URL.
    pub fn customer_url(&self) -> Option<&str> {
        self.checkout_url.as_deref().or(self.pay_url.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PaymentChannel {
    #[serde(default)]
    pub group: String,
    pub code: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub active: bool,
}

/// The body of a Tripay `payment_status` callback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CallbackPayload {
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub merchant_ref: Option<String>,
    #[serde(default)]
    pub payment_method_code: Option<String>,
    #[serde(default)]
    pub total_amount: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub paid_at: Option<i64>,
}
