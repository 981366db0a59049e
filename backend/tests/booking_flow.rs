//! Booking lifecycle over HTTP: creation, overlap, status changes,
//! payments and reviews.

mod support;

use axum::http::StatusCode;
use serde_json::{json, Value};
use support::TestApp;

use homestay_backend::services::messages;

fn guest_booking(homestay_id: i64, room_id: i64, check_in: &str, check_out: &str) -> Value {
    json!({
        "homestayId": homestay_id,
        "customerName": "Nguyen Lan",
        "customerPhone": "0911222333",
        "checkIn": check_in,
        "checkOut": check_out,
        "guests": 2,
        "paymentMethod": "bank_transfer",
        "paidAmount": 300.0,
        "rooms": [{"id": room_id}]
    })
}

struct Scene {
    app: TestApp,
    host: String,
    guest: String,
    homestay_id: i64,
    room_id: i64,
}

async fn scene() -> Scene {
    let app = TestApp::new();
    let host = app.signup("Host Minh", "host@example.com", "host").await;
    let guest = app.signup("Nguyen Lan", "lan@example.com", "guest").await;
    let (homestay_id, room_id) = app.listed_homestay(&host, 600.0).await;
    Scene {
        app,
        host,
        guest,
        homestay_id,
        room_id,
    }
}

#[tokio::test]
async fn test_guest_booking_is_created_pending() {
    let s = scene().await;
    let (status, body) = s
        .app
        .post(
            "/api/guest/booking",
            Some(&s.guest),
            guest_booking(s.homestay_id, s.room_id, "2026-12-20", "2026-12-23"),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["code"], 0);
    let booking = &body["data"]["booking"];
    assert_eq!(booking["status"], "pending");
    assert_eq!(booking["customerEmail"], "lan@example.com");
    assert_eq!(booking["nights"], 3);
    assert_eq!(booking["totalAmount"], 1800.0);
    assert_eq!(booking["rooms"][0]["subtotal"], 1800.0);
    assert!(booking["bookingCode"].as_str().unwrap().starts_with("BK"));
    assert!(booking["review"].is_null());
}

#[tokio::test]
async fn test_overlapping_booking_is_conflict() {
    let s = scene().await;
    let (status, _) = s
        .app
        .post(
            "/api/guest/booking",
            Some(&s.guest),
            guest_booking(s.homestay_id, s.room_id, "2026-12-20", "2026-12-23"),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = s
        .app
        .post(
            "/api/host/booking",
            Some(&s.host),
            json!({
                "homestayId": s.homestay_id,
                "customerName": "Walk In",
                "customerEmail": "walkin@example.com",
                "customerPhone": "0900",
                "checkIn": "2026-12-22",
                "checkOut": "2026-12-24",
                "guests": 1,
                "paymentMethod": "cash",
                "rooms": [{"id": s.room_id}]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], messages::ROOM_TAKEN);
}

#[tokio::test]
async fn test_invalid_dates_rejected() {
    let s = scene().await;
    let (status, body) = s
        .app
        .post(
            "/api/guest/booking",
            Some(&s.guest),
            guest_booking(s.homestay_id, s.room_id, "2026-12-23", "2026-12-20"),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], messages::DATE_ORDER);

    let (status, body) = s
        .app
        .post(
            "/api/guest/booking",
            Some(&s.guest),
            guest_booking(s.homestay_id, s.room_id, "20-12-2026", "2026-12-23"),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], messages::BAD_CHECK_IN);
}

#[tokio::test]
async fn test_full_lifecycle_with_payments_and_review() {
    let s = scene().await;
    let (_, body) = s
        .app
        .post(
            "/api/guest/booking",
            Some(&s.guest),
            guest_booking(s.homestay_id, s.room_id, "2026-11-02", "2026-11-04"),
        )
        .await;
    let id = body["data"]["booking"]["id"].as_i64().unwrap();

    let (status, body) = s
        .app
        .put(
            &format!("/api/host/booking/{}/status", id),
            Some(&s.host),
            json!({"status": "confirmed"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["success"], true);
    let mail = s.app.mailer.last_to("lan@example.com").unwrap();
    assert!(mail.body.contains("02-11-2026"));
    assert!(mail.body.contains("http://app.test/bookings"));

    let (status, _) = s
        .app
        .put(
            &format!("/api/host/booking/{}/status", id),
            Some(&s.host),
            json!({"status": "completed"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = s
        .app
        .get(&format!("/api/guest/booking/{}", id), Some(&s.guest))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["booking"]["status"], "completed");
    assert_eq!(body["data"]["booking"]["paidAmount"], 1200.0);
    assert_eq!(body["data"]["payments"].as_array().unwrap().len(), 2);

    let (status, body) = s
        .app
        .get("/api/host/payments?pageSize=5", Some(&s.host))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["pageSize"], 5);

    let (status, body) = s
        .app
        .post(
            "/api/guest/review",
            Some(&s.guest),
            json!({"bookingId": id, "rating": 5, "comment": "Peaceful and spotless"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["review"]["homestayId"], s.homestay_id);

    let (status, body) = s
        .app
        .post(
            "/api/guest/review",
            Some(&s.guest),
            json!({"bookingId": id, "rating": 4, "comment": "Again"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 409);

    let (_, body) = s
        .app
        .get(&format!("/api/public/homestays/{}", s.homestay_id), None)
        .await;
    assert_eq!(body["data"]["homestay"]["totalReviews"], 1);
    assert_eq!(body["data"]["homestay"]["rating"], 5.0);
}

#[tokio::test]
async fn test_guest_can_only_cancel() {
    let s = scene().await;
    let (_, body) = s
        .app
        .post(
            "/api/guest/booking",
            Some(&s.guest),
            guest_booking(s.homestay_id, s.room_id, "2026-10-10", "2026-10-11"),
        )
        .await;
    let id = body["data"]["booking"]["id"].as_i64().unwrap();

    let (status, _) = s
        .app
        .put(
            &format!("/api/guest/booking/{}/status", id),
            Some(&s.guest),
            json!({"status": "confirmed"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = s
        .app
        .put(
            &format!("/api/guest/booking/{}/status", id),
            Some(&s.guest),
            json!({"status": "cancelled"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = s
        .app
        .put(
            &format!("/api/host/booking/{}/status", id),
            Some(&s.host),
            json!({"status": "confirmed"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], messages::INVALID_STATUS);
}

#[tokio::test]
async fn test_booking_listing_scopes() {
    let s = scene().await;
    s.app
        .post(
            "/api/guest/booking",
            Some(&s.guest),
            guest_booking(s.homestay_id, s.room_id, "2026-09-01", "2026-09-02"),
        )
        .await;

    let other_guest = s.app.signup("Other", "other@example.com", "guest").await;
    let (_, body) = s.app.get("/api/guest/booking", Some(&other_guest)).await;
    assert_eq!(body["data"]["total"], 0);

    let (_, body) = s.app.get("/api/guest/booking", Some(&s.guest)).await;
    assert_eq!(body["data"]["total"], 1);

    let (_, body) = s
        .app
        .get("/api/host/booking?status=pending&customerName=lan", Some(&s.host))
        .await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["page"], 1);

    let (_, body) = s
        .app
        .get(
            &format!("/api/host/homestays/{}/bookings", s.homestay_id),
            Some(&s.host),
        )
        .await;
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test]
async fn test_booking_request_round_trip() {
    let s = scene().await;
    let (status, body) = s
        .app
        .post(
            "/api/guest/booking-requests",
            Some(&s.guest),
            json!({
                "roomId": s.room_id,
                "checkIn": "2026-08-01",
                "checkOut": "2026-08-03",
                "numGuests": 2,
                "guestNote": "Vegetarian breakfast please"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let request_id = body["data"]["request"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["request"]["totalAmount"], 1200.0);

    let (_, body) = s.app.get("/api/host/booking-requests", Some(&s.host)).await;
    assert_eq!(body["data"]["total"], 1);

    let (status, body) = s
        .app
        .put(
            &format!("/api/host/booking-requests/{}", request_id),
            Some(&s.host),
            json!({"status": "approved", "hostNote": "Confirmed"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["request"]["status"], "approved");

    let (_, body) = s.app.get("/api/guest/booking-requests", Some(&s.guest)).await;
    assert_eq!(body["data"]["requests"][0]["hostNote"], "Confirmed");
}
