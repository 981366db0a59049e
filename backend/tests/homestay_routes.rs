//! Host management and public browsing of homestays and rooms.

mod support;

use axum::http::{Method, StatusCode};
use serde_json::json;
use support::TestApp;

use homestay_backend::services::messages;

#[tokio::test]
async fn test_health_reports_database() {
    let app = TestApp::new();
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["database"], "connected");
}

#[tokio::test]
async fn test_created_homestay_starts_inactive_and_hidden() {
    let app = TestApp::new();
    let host = app.signup("Host", "host@example.com", "host").await;
    let (status, body) = app
        .post(
            "/api/host/homestays",
            Some(&host),
            json!({
                "name": "Da Lat Pine Hill",
                "description": "Cottage among pine trees",
                "address": "7 Hoa Hong",
                "city": "Da Lat",
                "district": "Ward 4",
                "ward": "Ward 4"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["homestay"]["status"], "inactive");
    let id = body["data"]["homestay"]["id"].as_i64().unwrap();

    let (status, body) = app.get(&format!("/api/public/homestays/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], messages::HOMESTAY_NOT_FOUND);

    let (_, body) = app.get("/api/public/homestays", None).await;
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn test_homestay_validation_and_empty_update() {
    let app = TestApp::new();
    let host = app.signup("Host", "host@example.com", "host").await;
    let (status, body) = app
        .post(
            "/api/host/homestays",
            Some(&host),
            json!({
                "name": "X",
                "description": "short",
                "address": "1",
                "city": "D",
                "district": "D",
                "ward": "W"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], messages::INVALID_DATA);

    let (homestay_id, _) = app.listed_homestay(&host, 200.0).await;
    let (status, body) = app
        .put(&format!("/api/host/homestays/{}", homestay_id), Some(&host), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], messages::NOTHING_TO_UPDATE);
}

#[tokio::test]
async fn test_other_host_is_forbidden() {
    let app = TestApp::new();
    let owner = app.signup("Owner", "owner@example.com", "host").await;
    let intruder = app.signup("Intruder", "intruder@example.com", "host").await;
    let (homestay_id, room_id) = app.listed_homestay(&owner, 200.0).await;

    let (status, _) = app
        .get(&format!("/api/host/homestays/{}", homestay_id), Some(&intruder))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/host/rooms/{}", room_id),
            Some(&intruder),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = app.get("/api/host/homestays", Some(&intruder)).await;
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn test_non_numeric_id_is_invalid() {
    let app = TestApp::new();
    let host = app.signup("Host", "host@example.com", "host").await;
    let (status, body) = app.get("/api/host/homestays/abc", Some(&host)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], messages::INVALID_ID);
}

#[tokio::test]
async fn test_public_listing_and_stay_search() {
    let app = TestApp::new();
    let host = app.signup("Host", "host@example.com", "host").await;
    let guest = app.signup("Guest", "guest@example.com", "guest").await;
    let (homestay_id, room_id) = app.listed_homestay(&host, 450.0).await;

    let (_, body) = app.get("/api/public/homestays?city=sapa", None).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["totalPage"], 1);
    assert_eq!(body["data"]["homestays"][0]["rooms"].as_array().unwrap().len(), 1);

    let (_, body) = app
        .get("/api/public/homestays?checkIn=2026-07-01&checkOut=2026-07-03&guests=5", None)
        .await;
    assert_eq!(body["data"]["total"], 0);

    let (status, body) = app
        .get("/api/public/homestays?checkIn=2026-07-03&checkOut=2026-07-01", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], messages::DATE_ORDER);

    let (status, body) = app
        .get(&format!("/api/guest/rooms?homestayId={}", homestay_id), Some(&guest))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["rooms"][0]["id"], room_id);

    let (_, body) = app.get("/api/public/homestays/top?limit=3", None).await;
    assert_eq!(body["data"]["homestays"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_availability_rules() {
    let app = TestApp::new();
    let host = app.signup("Host", "host@example.com", "host").await;
    let (_, room_id) = app.listed_homestay(&host, 300.0).await;

    let (status, body) = app
        .post(
            "/api/host/rooms/availability",
            Some(&host),
            json!({"roomId": room_id, "date": "2020-01-01", "status": "blocked"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], messages::PAST_AVAILABILITY);

    let future = (chrono::Utc::now().date_naive() + chrono::Duration::days(30))
        .format("%Y-%m-%d")
        .to_string();
    let (status, body) = app
        .post(
            "/api/host/rooms/availability",
            Some(&host),
            json!({"roomId": room_id, "date": future, "status": "blocked", "price": 350.0}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let availability_id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = app
        .post(
            "/api/host/rooms/availability",
            Some(&host),
            json!({"roomId": room_id, "date": future, "status": "available"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .put(
            &format!("/api/host/rooms/availability/{}", availability_id),
            Some(&host),
            json!({"status": "available"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "available");

    let from = (chrono::Utc::now().date_naive() + chrono::Duration::days(40))
        .format("%Y-%m-%d")
        .to_string();
    let to = (chrono::Utc::now().date_naive() + chrono::Duration::days(46))
        .format("%Y-%m-%d")
        .to_string();
    let skip = (chrono::Utc::now().date_naive() + chrono::Duration::days(42))
        .format("%Y-%m-%d")
        .to_string();
    let (status, body) = app
        .post(
            "/api/host/rooms/availability/bulk",
            Some(&host),
            json!({
                "roomId": room_id,
                "startDate": from,
                "endDate": to,
                "status": "blocked",
                "excludeDates": [skip]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["updated"], 6);

    let (_, body) = app.get(&format!("/api/host/rooms/{}", room_id), Some(&host)).await;
    assert_eq!(body["data"]["availabilities"].as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn test_stats_after_booking() {
    let app = TestApp::new();
    let host = app.signup("Host", "host@example.com", "host").await;
    let (homestay_id, room_id) = app.listed_homestay(&host, 500.0).await;
    let (status, _) = app
        .post(
            "/api/host/booking",
            Some(&host),
            json!({
                "homestayId": homestay_id,
                "customerName": "Walk In",
                "customerEmail": "walkin@example.com",
                "customerPhone": "0900",
                "checkIn": "2026-07-01",
                "checkOut": "2026-07-03",
                "guests": 1,
                "paymentMethod": "cash",
                "rooms": [{"id": room_id}]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app.get("/api/host/homestays/stats", Some(&host)).await;
    assert_eq!(body["data"]["totalHomestays"], 1);
    assert_eq!(body["data"]["activeHomestays"], 1);
    assert_eq!(body["data"]["totalBookings"], 1);
    assert_eq!(body["data"]["totalRevenue"], 1000.0);

    let (_, body) = app
        .get(&format!("/api/host/homestays/{}/rooms/stats", homestay_id), Some(&host))
        .await;
    assert_eq!(body["data"]["totalRooms"], 1);
    assert_eq!(body["data"]["averagePrice"], 500.0);
}

#[tokio::test]
async fn test_huge_page_number_returns_empty_page() {
    let app = TestApp::new();
    let host = app.signup("Host", "host@example.com", "host").await;
    app.listed_homestay(&host, 300.0).await;

    let (status, body) = app
        .get("/api/public/homestays?page=9223372036854775807&pageSize=100", None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["total"], 1);
    assert!(body["data"]["homestays"].as_array().unwrap().is_empty());

    let (status, _) = app
        .get("/api/host/booking?page=9223372036854775807", Some(&host))
        .await;
    assert_eq!(status, StatusCode::OK);
}
