use std::sync::Arc;

use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use borongan_engine::{
    events::EventProducers,
    test_utils::{FakeGateway, TestDatabase},
    GroupBuyFlowApi,
    PaymentFlowApi,
    SqliteDatabase,
};
use lapak_common::Secret;
use log::debug;
use serde_json::Value;

use super::mocks::authenticator;
use crate::{
    auth::Authenticator,
    routes::InternalApiKey,
    server::configure_routes,
};

pub const INTERNAL_KEY: &str = "internal-test-key";

/// A full app over a fresh SQLite database and a scriptable gateway.
pub struct TestApp {
    pub test_db: TestDatabase,
    pub gateway: FakeGateway,
    pub internal_key: Option<String>,
}

impl TestApp {
    pub async fn new() -> Self {
        let _ = env_logger::try_init().ok();
        let test_db = TestDatabase::new().await;
        Self { test_db, gateway: FakeGateway::default(), internal_key: Some(INTERNAL_KEY.to_string()) }
    }

    pub fn db(&self) -> SqliteDatabase {
        self.test_db.db.clone()
    }

    pub async fn send(&self, req: TestRequest) -> (StatusCode, String) {
        let producers = EventProducers::default();
        let group_buy_api = GroupBuyFlowApi::new(self.db(), self.gateway.clone(), producers.clone());
        let payment_api = PaymentFlowApi::new(self.db(), self.gateway.clone(), producers);
        let authenticator = Arc::new(authenticator()) as Arc<dyn Authenticator>;
        let internal_key = InternalApiKey(self.internal_key.clone().map(Secret::new));
        let app = App::new()
            .app_data(web::Data::new(group_buy_api))
            .app_data(web::Data::new(payment_api))
            .app_data(web::Data::new(internal_key))
            .app_data(web::Data::from(authenticator))
            .configure(configure_routes::<SqliteDatabase, FakeGateway>);
        let service = test::init_service(app).await;
        debug!("Making request");
        let res = test::call_service(&service, req.to_request()).await;
        let status = res.status();
        let body = test::read_body(res).await;
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, String) {
        self.send(with_token(TestRequest::get().uri(path), token)).await
    }

    pub async fn post_json(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, String) {
        self.send(with_token(TestRequest::post().uri(path), token).set_json(body)).await
    }

    pub async fn post_raw(&self, path: &str, headers: &[(&str, &str)], body: &str) -> (StatusCode, String) {
        let mut req = TestRequest::post().uri(path).set_payload(body.to_string());
        for (name, value) in headers {
            req = req.insert_header((*name, *value));
        }
        self.send(req).await
    }

    /// Opens a group buy as the organizer and returns its id.
    pub async fn open_group_buy(&self, target: i64) -> String {
        let (status, body) = self.post_json("/api/v1/borongan", Some(super::mocks::ORGANIZER_TOKEN), new_group_buy(target)).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        json(&body)["id"].as_str().unwrap().to_string()
    }

    pub async fn join(&self, group_buy_id: &str, token: &str, quantity: i64) -> (StatusCode, String) {
        let path = format!("/api/v1/borongan/{group_buy_id}/join");
        self.post_json(&path, Some(token), serde_json::json!({ "quantity_ordered": quantity })).await
    }

    /// Sends a correctly signed payment callback.
    pub async fn notify(&self, merchant_ref: &str, status: &str) -> (StatusCode, String) {
        let body = serde_json::json!({
            "reference": "FAKE00001",
            "merchant_ref": merchant_ref,
            "status": status,
            "payment_method_code": "QRISC"
        })
        .to_string();
        let signature = self.gateway.sign(body.as_bytes());
        let headers = [("X-Callback-Signature", signature.as_str()), ("X-Callback-Event", "payment_status")];
        self.post_raw("/api/v1/payments/tripay/webhook", &headers, &body).await
    }
}

fn with_token(req: TestRequest, token: Option<&str>) -> TestRequest {
    match token {
        Some(t) => req.insert_header(("Authorization", format!("Bearer {t}"))),
        None => req,
    }
}

pub fn new_group_buy(target: i64) -> Value {
    let deadline = chrono::Utc::now() + chrono::Duration::days(3);
    serde_json::json!({
        "title": "Beras Pandan Wangi",
        "description": "Langsung dari penggilingan",
        "unit_price": "15000.00",
        "unit": "kg",
        "target_quantity": target,
        "deadline": deadline,
        "pickup_point_address": "Balai warga RT 03"
    })
}

pub fn json(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Not JSON ({e}): {body}"))
}
