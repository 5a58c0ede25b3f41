use actix_web::{http::StatusCode, test::TestRequest};
use borongan_engine::test_utils::FakeMode;
use serde_json::json;

use super::{
    helpers::{json, new_group_buy, TestApp},
    mocks::{BUDI_TOKEN, ORGANIZER_TOKEN, SITI_TOKEN},
};
use crate::errors::GATEWAY_UNAVAILABLE_MESSAGE;

#[actix_web::test]
async fn health_check() {
    let app = TestApp::new().await;
    let (status, body) = app.send(TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn create_requires_a_valid_token() {
    let app = TestApp::new().await;
    let (status, body) = app.post_json("/api/v1/borongan", None, new_group_buy(10)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body)["error"], "Authentication Error. No bearer token was provided.");
    let (status, _) = app.post_json("/api/v1/borongan", Some("forged"), new_group_buy(10)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn create_and_fetch_group_buy() {
    let app = TestApp::new().await;
    let (status, body) = app.post_json("/api/v1/borongan", Some(ORGANIZER_TOKEN), new_group_buy(10)).await;
    assert_eq!(status, StatusCode::CREATED);
    let created = json(&body);
    assert_eq!(created["organizer_id"], "user-organizer");
    assert_eq!(created["status"], "active");
    assert_eq!(created["current_quantity"], 0);
    assert_eq!(created["unit_price"], "15000.00");

    let id = created["id"].as_str().unwrap();
    let (status, body) = app.get(&format!("/api/v1/borongan/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let detail = json(&body);
    assert_eq!(detail["title"], "Beras Pandan Wangi");
    assert_eq!(detail["participants_count"], 0);
    assert_eq!(detail["participants"], json!([]));
}

#[actix_web::test]
async fn create_rejects_invalid_input() {
    let app = TestApp::new().await;
    let mut body = new_group_buy(10);
    body["target_quantity"] = json!(0);
    let (status, res) = app.post_json("/api/v1/borongan", Some(ORGANIZER_TOKEN), body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&res)["error"], "The target quantity must be at least 1.");

    let mut body = new_group_buy(10);
    body["deadline"] = json!(chrono::Utc::now() - chrono::Duration::hours(1));
    let (status, res) = app.post_json("/api/v1/borongan", Some(ORGANIZER_TOKEN), body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&res)["error"], "The deadline must be in the future.");
}

#[actix_web::test]
async fn detail_of_unknown_or_malformed_ids() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/v1/borongan/6a0b1f83-2f7e-4d55-9c59-0e3f2e4d0a11", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"], "Group buy session not found.");
    let (status, _) = app.get("/api/v1/borongan/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn join_returns_a_payment_url() {
    let app = TestApp::new().await;
    let id = app.open_group_buy(10).await;
    let (status, body) = app.join(&id, BUDI_TOKEN, 2).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let confirmation = json(&body);
    assert_eq!(confirmation["message"], "Successfully joined! Please complete the payment.");
    assert_eq!(confirmation["payment_url"], "https://pay.example.test/checkout/FAKE00001");
    assert_eq!(confirmation["group_buy_status"], "active");
    assert_eq!(confirmation["total_price"], "30000.00");

    let requests = app.gateway.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].merchant_ref, confirmation["participant_id"].as_str().unwrap());
    assert_eq!(requests[0].amount, 30_000);
    assert_eq!(requests[0].customer_email, "budi@warga.test");

    let (_, body) = app.get(&format!("/api/v1/borongan/{id}"), None).await;
    let detail = json(&body);
    assert_eq!(detail["current_quantity"], 2);
    assert_eq!(detail["participants_count"], 1);
    assert_eq!(detail["participants"][0]["payment_status"], "pending");
    assert_eq!(detail["participants"][0]["display_name"], "budi");
}

#[actix_web::test]
async fn join_that_reaches_the_target() {
    let app = TestApp::new().await;
    let id = app.open_group_buy(5).await;
    let (status, _) = app.join(&id, BUDI_TOKEN, 3).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.join(&id, SITI_TOKEN, 2).await;
    assert_eq!(status, StatusCode::OK);
    let confirmation = json(&body);
    assert_eq!(confirmation["message"], "Successfully joined! Target reached! Please complete the payment.");
    assert_eq!(confirmation["group_buy_status"], "successful");
}

#[actix_web::test]
async fn join_rule_violations() {
    let app = TestApp::new().await;
    let id = app.open_group_buy(5).await;

    let (status, body) = app.join(&id, ORGANIZER_TOKEN, 1).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json(&body)["error"], "You cannot join a group buy that you created.");

    let (status, body) = app.join(&id, BUDI_TOKEN, 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "You must order at least 1 unit.");

    let (status, body) = app.join(&id, BUDI_TOKEN, 6).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "Cannot order that many. Only 5 unit(s) left to reach target.");

    let (status, _) = app.join(&id, BUDI_TOKEN, 2).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.join(&id, BUDI_TOKEN, 1).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json(&body)["error"], "You have already joined this group buy.");

    let (status, _) = app.join("6a0b1f83-2f7e-4d55-9c59-0e3f2e4d0a11", BUDI_TOKEN, 1).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.join(&id, "forged", 1).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn gateway_rejection_rolls_the_join_back() {
    let app = TestApp::new().await;
    let id = app.open_group_buy(5).await;
    app.gateway.set_mode(FakeMode::Reject("Merchant is not active".into()));
    let (status, body) = app.join(&id, BUDI_TOKEN, 5).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json(&body)["error"], GATEWAY_UNAVAILABLE_MESSAGE);

    let (_, body) = app.get(&format!("/api/v1/borongan/{id}"), None).await;
    let detail = json(&body);
    assert_eq!(detail["current_quantity"], 0);
    assert_eq!(detail["status"], "active");
    assert_eq!(detail["participants_count"], 0);

    // The user can try again once the gateway recovers
    app.gateway.set_mode(FakeMode::Succeed);
    let (status, _) = app.join(&id, BUDI_TOKEN, 5).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn organizer_completes_a_successful_group_buy() {
    let app = TestApp::new().await;
    let id = app.open_group_buy(2).await;
    let path = format!("/api/v1/borongan/{id}/complete");

    let (status, body) = app.post_json(&path, Some(ORGANIZER_TOKEN), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "Only a successful group buy can be completed. This one is active.");

    app.join(&id, BUDI_TOKEN, 2).await;
    let (status, body) = app.post_json(&path, Some(BUDI_TOKEN), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json(&body)["error"], "Only the organizer can complete this group buy.");

    let (status, body) = app.post_json(&path, Some(ORGANIZER_TOKEN), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "completed");
}

#[actix_web::test]
async fn organizer_records_pickups_of_paid_orders() {
    let app = TestApp::new().await;
    let id = app.open_group_buy(10).await;
    let (_, body) = app.join(&id, BUDI_TOKEN, 2).await;
    let participant_id = json(&body)["participant_id"].as_str().unwrap().to_string();
    let path = format!("/api/v1/participants/{participant_id}/collected");

    let (status, body) = app.post_json(&path, Some(ORGANIZER_TOKEN), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "Only paid orders can be marked as collected.");

    let (status, _) = app.notify(&participant_id, "PAID").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.post_json(&path, Some(SITI_TOKEN), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json(&body)["error"], "Only the organizer can record a pickup.");

    let (status, body) = app.post_json(&path, Some(ORGANIZER_TOKEN), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["pickup_status"], "collected");

    let (status, _) = app.post_json("/api/v1/participants/nope/collected", Some(ORGANIZER_TOKEN), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
