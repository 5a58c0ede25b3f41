//! Adapts the Tripay client to the engine's [`PaymentGateway`] contract.
use borongan_engine::{
    db_types::GatewayStatus,
    payment_objects::{
        CreatedTransaction,
        PaymentChannel,
        TransactionOutcome,
        TransactionRequest,
        TransactionStatusReport,
    },
    GatewayError,
    PaymentGateway,
};
use log::*;
use tripay_tools::{OrderItem, TripayApi, TripayApiError, TripayConfig, TransactionDraft};

#[derive(Clone)]
pub struct TripayGateway {
    api: TripayApi,
}

impl TripayGateway {
    pub fn new(config: TripayConfig) -> Result<Self, TripayApiError> {
        if config.merchant_code.is_empty() || config.private_key.is_empty() {
            warn!("💳️ The Tripay merchant code or private key is not set. Payments and callbacks will be rejected.");
        }
        let api = TripayApi::new(config)?;
        Ok(Self { api })
    }
}

pub fn draft_from_request(request: &TransactionRequest) -> TransactionDraft {
    TransactionDraft {
        merchant_ref: request.merchant_ref.clone(),
        amount: request.amount,
        customer_name: request.customer_name.clone(),
        customer_email: request.customer_email.clone(),
        customer_phone: request.customer_phone.clone(),
        order_items: request
            .items
            .iter()
            .map(|i| OrderItem { sku: i.sku.clone(), name: i.name.clone(), price: i.price, quantity: i.quantity })
            .collect(),
    }
}

fn channel_from_tripay(channel: tripay_tools::PaymentChannel) -> PaymentChannel {
    PaymentChannel {
        group: channel.group,
        code: channel.code,
        name: channel.name,
        active: channel.active,
        icon_url: channel.icon_url,
    }
}

impl PaymentGateway for TripayGateway {
    async fn create_transaction(&self, request: &TransactionRequest) -> TransactionOutcome {
        let tx = match self.api.create_transaction(draft_from_request(request)).await {
            Ok(tx) => tx,
            Err(e) => {
                warn!("💳️ Tripay did not create a transaction for {}. {e}", request.merchant_ref);
                return TransactionOutcome::failed(e.to_string());
            },
        };
        match tx.customer_url() {
            Some(url) => TransactionOutcome::Created(CreatedTransaction {
                reference: tx.reference.clone(),
                checkout_url: url.to_string(),
            }),
            None => {
                warn!("💳️ Tripay transaction {} came back without a checkout URL", tx.reference);
                TransactionOutcome::failed("The payment gateway did not return a checkout URL.")
            },
        }
    }

    async fn query_transaction(&self, reference: &str) -> Result<TransactionStatusReport, GatewayError> {
        let tx = self.api.transaction_detail(reference).await.map_err(|e| GatewayError(e.to_string()))?;
        Ok(TransactionStatusReport {
            reference: tx.reference,
            merchant_ref: tx.merchant_ref,
            status: GatewayStatus::from(tx.status.as_str()),
        })
    }

    fn verify_callback_signature(&self, raw_body: &[u8], signature: Option<&str>) -> bool {
        self.api.verify_callback(raw_body, signature)
    }

    async fn payment_channels(&self) -> Result<Vec<PaymentChannel>, GatewayError> {
        let channels = self.api.payment_channels().await.map_err(|e| GatewayError(e.to_string()))?;
        Ok(channels.into_iter().map(channel_from_tripay).collect())
    }
}
