//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Request bodies are small JSON documents.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/verify", get(handlers::verify_email))
        .route(
            "/profile",
            get(handlers::profile).put(handlers::update_profile),
        )
        .route("/logout", post(handlers::logout))
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/homestays/top", get(handlers::top_homestays))
        .route("/homestays", get(handlers::public_homestays))
        .route("/homestays/{id}", get(handlers::public_homestay))
}

fn host_routes() -> Router<AppState> {
    Router::new()
        // Homestays
        .route(
            "/homestays",
            get(handlers::list_homestays).post(handlers::create_homestay),
        )
        .route("/homestays/stats", get(handlers::host_stats))
        .route(
            "/homestays/{id}",
            get(handlers::get_homestay)
                .put(handlers::update_homestay)
                .delete(handlers::delete_homestay),
        )
        .route("/homestays/{id}/toggle-status", put(handlers::toggle_homestay))
        .route("/homestays/{id}/stats", get(handlers::homestay_stats))
        .route("/homestays/{id}/reviews", get(handlers::homestay_reviews))
        .route("/homestays/{id}/rooms/stats", get(handlers::room_stats))
        .route("/homestays/{id}/bookings", get(handlers::homestay_bookings))
        // Rooms and availability
        .route("/rooms", get(handlers::list_rooms).post(handlers::create_room))
        .route(
            "/rooms/{id}",
            get(handlers::get_room)
                .put(handlers::update_room)
                .delete(handlers::delete_room),
        )
        .route("/rooms/availability", post(handlers::create_availability))
        .route("/rooms/availability/{id}", put(handlers::update_availability))
        .route("/rooms/availability/bulk", post(handlers::bulk_availability))
        // Bookings and payments
        .route(
            "/booking",
            get(handlers::host_bookings).post(handlers::host_create_booking),
        )
        .route("/booking/{id}", get(handlers::host_booking_detail))
        .route("/booking/{id}/status", put(handlers::host_update_booking_status))
        .route("/payments", get(handlers::host_payments))
        // Booking requests
        .route("/booking-requests", get(handlers::host_booking_requests))
        .route("/booking-requests/{id}", put(handlers::update_booking_request))
}

fn guest_routes() -> Router<AppState> {
    Router::new()
        .route("/homestays", get(handlers::guest_homestays))
        .route("/homestays/{id}", get(handlers::guest_homestay))
        .route("/rooms", get(handlers::guest_rooms))
        .route(
            "/booking",
            get(handlers::guest_bookings).post(handlers::guest_create_booking),
        )
        .route("/booking/{id}", get(handlers::guest_booking_detail))
        .route("/booking/{id}/status", put(handlers::guest_update_booking_status))
        .route("/review", post(handlers::create_review))
        .route(
            "/booking-requests",
            get(handlers::guest_booking_requests).post(handlers::create_booking_request),
        )
}

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let api = Router::new()
        .nest("/auth", auth_routes())
        .nest("/public", public_routes())
        .nest("/host", host_routes())
        .nest("/guest", guest_routes());

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api)
        .fallback(handlers::unknown_endpoint)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::repositories::LocalRepository;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn router() -> Router {
        let repo = Arc::new(LocalRepository::new()) as Arc<dyn crate::db::repository::FullRepository>;
        create_router(AppState::with_log_mailer(repo, AppConfig::default()))
    }

    #[tokio::test]
    async fn test_unknown_route_uses_envelope() {
        let response = router()
            .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], 404);
        assert_eq!(json["message"], crate::services::messages::UNKNOWN_ENDPOINT);
    }

    #[tokio::test]
    async fn test_host_routes_require_token() {
        let response = router()
            .oneshot(Request::get("/api/host/homestays").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
