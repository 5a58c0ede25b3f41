use actix_web::http::StatusCode;
use borongan_engine::db_types::GatewayStatus;

use super::{
    helpers::{json, TestApp},
    mocks::{BUDI_TOKEN, SITI_TOKEN},
};
use crate::errors::GATEWAY_UNAVAILABLE_MESSAGE;

const WEBHOOK: &str = "/api/v1/payments/tripay/webhook";

async fn joined(app: &TestApp, target: i64, quantity: i64) -> (String, String) {
    let id = app.open_group_buy(target).await;
    let (status, body) = app.join(&id, BUDI_TOKEN, quantity).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    (id, json(&body)["participant_id"].as_str().unwrap().to_string())
}

#[actix_web::test]
async fn paid_callback_marks_the_participant_paid() {
    let app = TestApp::new().await;
    let (id, participant_id) = joined(&app, 10, 3).await;
    let (status, body) = app.notify(&participant_id, "PAID").await;
    assert_eq!(status, StatusCode::OK);
    let ack = json(&body);
    assert_eq!(ack["success"], true);
    assert_eq!(ack["message"], "Webhook processed successfully. Status updated to paid");

    // Redelivery changes nothing
    let (status, _) = app.notify(&participant_id, "PAID").await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get(&format!("/api/v1/borongan/{id}"), None).await;
    let detail = json(&body);
    assert_eq!(detail["current_quantity"], 3);
    assert_eq!(detail["participants"][0]["payment_status"], "paid");
}

#[actix_web::test]
async fn callbacks_are_acknowledged_when_processing_fails() {
    let app = TestApp::new().await;
    let (_, participant_id) = joined(&app, 10, 3).await;
    app.db().pool().close().await;

    let (status, body) = app.notify(&participant_id, "FAILED").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let ack = json(&body);
    assert_eq!(ack["success"], true);
    assert_eq!(ack["message"], "Webhook received but processing failed. Please check logs.");
}

#[actix_web::test]
async fn failed_callback_releases_the_quantity() {
    let app = TestApp::new().await;
    let (id, participant_id) = joined(&app, 3, 3).await;
    let (_, body) = app.get(&format!("/api/v1/borongan/{id}"), None).await;
    assert_eq!(json(&body)["status"], "successful");

    let (status, body) = app.notify(&participant_id, "EXPIRED").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["message"], "Webhook processed successfully. Status updated to failed");
    let (_, body) = app.get(&format!("/api/v1/borongan/{id}"), None).await;
    let detail = json(&body);
    assert_eq!(detail["current_quantity"], 0);
    assert_eq!(detail["status"], "active");
    assert_eq!(detail["participants"][0]["payment_status"], "failed");

    // A late payment does not bring the reservation back
    let (status, body) = app.notify(&participant_id, "PAID").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["message"], "Webhook processed successfully. Status updated to failed");
    let (_, body) = app.get(&format!("/api/v1/borongan/{id}"), None).await;
    assert_eq!(json(&body)["current_quantity"], 0);

    // The freed capacity is available to others
    let (status, _) = app.join(&id, SITI_TOKEN, 3).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn callbacks_must_be_signed() {
    let app = TestApp::new().await;
    let (_, participant_id) = joined(&app, 10, 1).await;
    let body = format!(r#"{{"merchant_ref":"{participant_id}","status":"PAID"}}"#);

    let (status, res) = app.post_raw(WEBHOOK, &[("X-Callback-Signature", "00ff")], &body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&res)["error"], "Authentication Error. Invalid signature");

    let (status, res) = app.post_raw(WEBHOOK, &[], &body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&res)["error"], "Authentication Error. Missing callback signature");

    // A valid signature over a different body does not carry over
    let signature = app.gateway.sign(br#"{"merchant_ref":"x","status":"UNPAID"}"#);
    let (status, _) = app.post_raw(WEBHOOK, &[("X-Callback-Signature", signature.as_str())], &body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, res) = app.get(&format!("/api/v1/payments/status/{participant_id}?refresh=false"), None).await;
    assert_eq!(json(&res)["payment_status"], "pending");
}

#[actix_web::test]
async fn malformed_callbacks_are_bad_requests() {
    let app = TestApp::new().await;
    let body = "{not json";
    let signature = app.gateway.sign(body.as_bytes());
    let (status, res) = app.post_raw(WEBHOOK, &[("X-Callback-Signature", signature.as_str())], body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&res)["error"], "Invalid JSON payload");

    let body = r#"{"status":"PAID"}"#;
    let signature = app.gateway.sign(body.as_bytes());
    let (status, res) = app.post_raw(WEBHOOK, &[("X-Callback-Signature", signature.as_str())], body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&res)["error"], "Merchant reference not found in callback");
}

#[actix_web::test]
async fn unknown_participants_and_other_events_are_acknowledged() {
    let app = TestApp::new().await;
    let (status, body) = app.notify("5c3f9b1e-7a66-4a8f-9e1c-2d3b4a5c6d7e", "PAID").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["message"], "Participant not found, ignoring");

    let body = r#"{"merchant_ref":"whatever"}"#;
    let signature = app.gateway.sign(body.as_bytes());
    let headers = [("X-Callback-Signature", signature.as_str()), ("X-Callback-Event", "settlement")];
    let (status, res) = app.post_raw(WEBHOOK, &headers, body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&res)["message"], "Event 'settlement' ignored");
}

#[actix_web::test]
async fn status_check_syncs_with_the_gateway() {
    let app = TestApp::new().await;
    let (id, participant_id) = joined(&app, 4, 4).await;
    let path = format!("/api/v1/payments/status/{participant_id}");

    let (status, body) = app.get(&path, None).await;
    assert_eq!(status, StatusCode::OK);
    let report = json(&body);
    assert_eq!(report["payment_status"], "pending");
    assert_eq!(report["gateway_status"], "UNPAID");
    assert_eq!(report["payment_reference"], "FAKE00001");
    assert_eq!(report["group_buy_id"], id.as_str());
    assert_eq!(report["total_price"], "60000.00");

    app.gateway.set_query_status(GatewayStatus::Canceled);
    let (_, body) = app.get(&format!("{path}?refresh=false"), None).await;
    assert_eq!(json(&body)["payment_status"], "pending");
    assert!(json(&body)["gateway_status"].is_null());

    let (_, body) = app.get(&path, None).await;
    assert_eq!(json(&body)["payment_status"], "failed");
    let (_, body) = app.get(&format!("/api/v1/borongan/{id}"), None).await;
    let detail = json(&body);
    assert_eq!(detail["current_quantity"], 0);
    assert_eq!(detail["status"], "active");
}

#[actix_web::test]
async fn status_check_falls_back_to_local_state() {
    let app = TestApp::new().await;
    let (_, participant_id) = joined(&app, 10, 1).await;
    app.gateway.fail_queries("connection reset by peer");
    let (status, body) = app.get(&format!("/api/v1/payments/status/{participant_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let report = json(&body);
    assert_eq!(report["payment_status"], "pending");
    assert!(report["gateway_status"].is_null());

    let (status, _) = app.get("/api/v1/payments/status/5c3f9b1e-7a66-4a8f-9e1c-2d3b4a5c6d7e", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get("/api/v1/payments/status/12345", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn payment_methods() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/v1/payments/methods", None).await;
    assert_eq!(status, StatusCode::OK);
    let methods = json(&body);
    assert_eq!(methods["success"], true);
    assert_eq!(methods["data"][0]["code"], "QRISC");

    app.gateway.fail_channels("503 Service Unavailable");
    let (status, body) = app.get("/api/v1/payments/methods", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json(&body)["error"], GATEWAY_UNAVAILABLE_MESSAGE);
}
