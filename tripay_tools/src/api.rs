use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::TripayConfig,
    data_objects::{ErrorBody, NewTransaction, PaymentChannel, Transaction, TransactionDraft, TripayResponse},
    helpers::{transaction_signature, verify_callback_signature},
    TripayApiError,
};

#[derive(Clone)]
pub struct TripayApi {
    config: TripayConfig,
    client: Arc<Client>,
}

impl TripayApi {
    pub fn new(config: TripayConfig) -> Result<Self, TripayApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key.reveal()))
            .map_err(|e| TripayApiError::Initialization(e.to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| TripayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &TripayConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url.trim_end_matches('/'))
    }

    /// Sends a request and unwraps the `{success, message, data}` envelope. Transport failures, non-2xx statuses
    /// and `success: false` all come back as errors.
    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<B>,
    ) -> Result<T, TripayApiError> {
        let url = self.url(path);
        trace!("💳️ Sending REST query: {method} {url}");
        let mut req = self.client.request(method, url);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| TripayApiError::RestResponseError(e.to_string()))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| TripayApiError::RestResponseError(e.to_string()))?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text).ok().and_then(|b| b.message).unwrap_or(text);
            return Err(TripayApiError::QueryError { status: status.as_u16(), message });
        }
        trace!("💳️ REST query successful. {status}");
        let envelope =
            serde_json::from_str::<TripayResponse<T>>(&text).map_err(|e| TripayApiError::JsonError(e.to_string()))?;
        envelope.into_data()
    }

    /// Fills in the merchant-level fields of a draft and signs it.
    pub fn new_transaction(
        &self,
        draft: TransactionDraft,
        now: DateTime<Utc>,
    ) -> Result<NewTransaction, TripayApiError> {
        let signature = transaction_signature(
            self.config.private_key.reveal(),
            &self.config.merchant_code,
            &draft.merchant_ref,
            draft.amount,
        )?;
        let expired_time = (now + Duration::minutes(self.config.expiry_minutes)).timestamp();
        let customer_phone = draft
            .customer_phone
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| self.config.default_phone.clone());
        Ok(NewTransaction {
            method: self.config.payment_method.clone(),
            merchant_ref: draft.merchant_ref,
            amount: draft.amount,
            customer_name: draft.customer_name,
            customer_email: draft.customer_email,
            customer_phone,
            order_items: draft.order_items,
            return_url: self.config.return_url.clone(),
            expired_time,
            signature,
        })
    }

    pub async fn create_transaction(&self, draft: TransactionDraft) -> Result<Transaction, TripayApiError> {
        let merchant_ref = draft.merchant_ref.clone();
        let body = self.new_transaction(draft, Utc::now())?;
        debug!("💳️ Creating transaction for {merchant_ref} ({} IDR)", body.amount);
        let tx = self.rest_query::<Transaction, _>(Method::POST, "/transaction/create", &[], Some(body)).await?;
        info!("💳️ Created transaction {} for {merchant_ref}", tx.reference);
        Ok(tx)
    }

    pub async fn transaction_detail(&self, reference: &str) -> Result<Transaction, TripayApiError> {
        debug!("💳️ Fetching transaction {reference}");
        let tx = self
            .rest_query::<Transaction, ()>(Method::GET, "/transaction/detail", &[("reference", reference)], None)
            .await?;
        trace!("💳️ Transaction {reference} is {}", tx.status);
        Ok(tx)
    }

    pub async fn payment_channels(&self) -> Result<Vec<PaymentChannel>, TripayApiError> {
        debug!("💳️ Fetching payment channels");
        self.rest_query::<Vec<PaymentChannel>, ()>(Method::GET, "/merchant/payment-channel", &[], None).await
    }

    pub fn verify_callback(&self, raw_body: &[u8], signature: Option<&str>) -> bool {
        verify_callback_signature(self.config.private_key.reveal(), raw_body, signature)
    }
}
