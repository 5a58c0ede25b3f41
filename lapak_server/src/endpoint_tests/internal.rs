use actix_web::{http::StatusCode, test::TestRequest};
use borongan_engine::{
    db_types::{NewGroupBuy, UserId},
    LedgerStore,
};
use chrono::{Duration, Utc};
use lapak_common::Rupiah;

use super::helpers::{json, TestApp, INTERNAL_KEY};

const TRIGGER: &str = "/internal/trigger-deadline-check";

async fn overdue_group_buy(app: &TestApp) {
    let new_group_buy = NewGroupBuy {
        title: "Telur ayam kampung".into(),
        description: None,
        unit_price: Rupiah::from_rupiah(2_500),
        unit: "butir".into(),
        target_quantity: 100,
        deadline: Utc::now() - Duration::minutes(1),
        pickup_point_address: "Warung Bu Tini".into(),
    };
    app.db().insert_group_buy(&UserId::from("user-organizer"), new_group_buy).await.unwrap();
}

#[actix_web::test]
async fn deadline_check_needs_the_internal_key() {
    let app = TestApp::new().await;
    let (status, body) = app.send(TestRequest::post().uri(TRIGGER)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json(&body)["error"], "Authentication Error. Invalid internal API key.");
    for guess in ["guess", "internal-test-kez", "internal-test", "internal-test-key2", ""] {
        let req = TestRequest::post().uri(TRIGGER).insert_header(("X-Internal-Key", guess));
        let (status, _) = app.send(req).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "'{guess}' was accepted");
    }
    let req = TestRequest::post().uri(TRIGGER).insert_header(("X-Internal-Key", INTERNAL_KEY));
    let (status, _) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn deadline_check_expires_overdue_group_buys() {
    let app = TestApp::new().await;
    overdue_group_buy(&app).await;
    let open = app.open_group_buy(5).await;
    let req = TestRequest::post().uri(TRIGGER).insert_header(("X-Internal-Key", INTERNAL_KEY));
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);
    let result = json(&body);
    assert_eq!(result["message"], "Deadline check completed");
    assert_eq!(result["expired"], 1);
    assert!(result["timestamp"].is_string());

    let (_, body) = app.get(&format!("/api/v1/borongan/{open}"), None).await;
    assert_eq!(json(&body)["status"], "active");

    let req = TestRequest::post().uri(TRIGGER).insert_header(("X-Internal-Key", INTERNAL_KEY));
    let (_, body) = app.send(req).await;
    assert_eq!(json(&body)["expired"], 0);
}

#[actix_web::test]
async fn deadline_check_is_open_without_a_configured_key() {
    let mut app = TestApp::new().await;
    app.internal_key = None;
    overdue_group_buy(&app).await;
    let (status, body) = app.send(TestRequest::post().uri(TRIGGER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["expired"], 1);
}
