use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use lapak_common::signature::{hmac_sha256_hex, verify_hmac_sha256_hex};

use crate::{
    bge_api::payment_objects::{
        CreatedTransaction,
        PaymentChannel,
        TransactionOutcome,
        TransactionRequest,
        TransactionStatusReport,
    },
    db_types::GatewayStatus,
    traits::{GatewayError, PaymentGateway},
};

/// How the fake answers `create_transaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeMode {
    Succeed,
    Reject(String),
    /// Sleeps this long, then fails. Use with a shorter coordinator timeout to simulate an unresponsive gateway.
    Hang(Duration),
}

#[derive(Debug)]
struct FakeState {
    mode: FakeMode,
    requests: Vec<TransactionRequest>,
    references: HashMap<String, String>,
    query_status: Result<GatewayStatus, String>,
    channels: Result<Vec<PaymentChannel>, String>,
}

/// An in-memory [`PaymentGateway`] for tests. Clones share state.
#[derive(Debug, Clone)]
pub struct FakeGateway {
    callback_key: String,
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self::new("fake-private-key")
    }
}

impl FakeGateway {
    pub fn new(callback_key: &str) -> Self {
        let channel = PaymentChannel {
            group: "E-Wallet".into(),
            code: "QRISC".into(),
            name: "QRIS (Customizable)".into(),
            active: true,
            icon_url: None,
        };
        let state = FakeState {
            mode: FakeMode::Succeed,
            requests: Vec::new(),
            references: HashMap::new(),
            query_status: Ok(GatewayStatus::Unpaid),
            channels: Ok(vec![channel]),
        };
        Self { callback_key: callback_key.to_string(), state: Arc::new(Mutex::new(state)) }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        let mut state = self.state.lock().expect("fake gateway state poisoned");
        f(&mut state)
    }

    pub fn set_mode(&self, mode: FakeMode) {
        self.with_state(|s| s.mode = mode);
    }

    pub fn set_query_status(&self, status: GatewayStatus) {
        self.with_state(|s| s.query_status = Ok(status));
    }

    pub fn fail_queries(&self, message: &str) {
        self.with_state(|s| s.query_status = Err(message.to_string()));
    }

    pub fn fail_channels(&self, message: &str) {
        self.with_state(|s| s.channels = Err(message.to_string()));
    }

    /// Every request that reached `create_transaction`, in order.
    pub fn requests(&self) -> Vec<TransactionRequest> {
        self.with_state(|s| s.requests.clone())
    }

    /// Signs `body` the way the gateway signs its callbacks.
    pub fn sign(&self, body: &[u8]) -> String {
        hmac_sha256_hex(self.callback_key.as_bytes(), body).expect("HMAC accepts any key length")
    }
}

impl PaymentGateway for FakeGateway {
    async fn create_transaction(&self, request: &TransactionRequest) -> TransactionOutcome {
        let mode = self.with_state(|s| {
            s.requests.push(request.clone());
            s.mode.clone()
        });
        match mode {
            FakeMode::Succeed => {
                let reference = self.with_state(|s| {
                    let reference = format!("FAKE{:05}", s.references.len() + 1);
                    s.references.insert(reference.clone(), request.merchant_ref.clone());
                    reference
                });
                let checkout_url = format!("https://pay.example.test/checkout/{reference}");
                TransactionOutcome::Created(CreatedTransaction { reference, checkout_url })
            },
            FakeMode::Reject(message) => TransactionOutcome::failed(message),
            FakeMode::Hang(duration) => {
                tokio::time::sleep(duration).await;
                TransactionOutcome::failed("gateway hung up")
            },
        }
    }

    async fn query_transaction(&self, reference: &str) -> Result<TransactionStatusReport, GatewayError> {
        self.with_state(|s| {
            let status = s.query_status.clone().map_err(GatewayError)?;
            let merchant_ref = s.references.get(reference).cloned();
            Ok(TransactionStatusReport { reference: reference.to_string(), merchant_ref, status })
        })
    }

    fn verify_callback_signature(&self, raw_body: &[u8], signature: Option<&str>) -> bool {
        match signature {
            Some(sig) => verify_hmac_sha256_hex(self.callback_key.as_bytes(), raw_body, sig).is_ok(),
            None => false,
        }
    }

    async fn payment_channels(&self) -> Result<Vec<PaymentChannel>, GatewayError> {
        self.with_state(|s| s.channels.clone().map_err(GatewayError))
    }
}
