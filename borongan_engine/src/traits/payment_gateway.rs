use thiserror::Error;

use crate::bge_api::payment_objects::{PaymentChannel, TransactionOutcome, TransactionRequest, TransactionStatusReport};

/// A payment provider that can create and query transactions and authenticate its own callbacks.
///
/// Implementations hold their own credentials and are constructed once, then handed to the engine APIs.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    /// Creates a transaction for the request. Transport errors, non-2xx responses and gateway rejections are all
    /// reported as [`TransactionOutcome::Failed`], never as a panic or error value.
    async fn create_transaction(&self, request: &TransactionRequest) -> TransactionOutcome;

    /// Fetches the current gateway-side state of a transaction. Idempotent.
    async fn query_transaction(&self, reference: &str) -> Result<TransactionStatusReport, GatewayError>;

    /// Checks the callback signature over the raw, unparsed body. A missing signature is a failure.
    fn verify_callback_signature(&self, raw_body: &[u8], signature: Option<&str>) -> bool;

    async fn payment_channels(&self) -> Result<Vec<PaymentChannel>, GatewayError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct GatewayError(pub String);
