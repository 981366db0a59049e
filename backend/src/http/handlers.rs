//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! service layer for business logic.

use axum::{extract::State, http::StatusCode, Json};

use super::dto::{HealthResponse, TopQuery, VerifyQuery};
use super::error::{ApiResponse, AppError};
use super::extract::{ApiJson, ApiQuery, CurrentUser, GuestUser, HostUser, IdPath};
use super::state::AppState;
use crate::services::auth::{
    self, LoginInput, LoginResponse, ProfileResponse, RegisterInput, UpdateProfileInput, UserInfo,
};
use crate::services::booking::{
    self, BookingDetail, BookingEnvelope, BookingListResponse, BookingQuery, BookingScope,
    CreateBookingInput, HomestayBookings, StatusUpdated, UpdateStatusInput,
};
use crate::services::booking_request::{
    self, BookingRequestEnvelope, BookingRequestList, CreateBookingRequestInput,
    UpdateBookingRequestInput,
};
use crate::services::homestay::{
    self, CreateHomestayInput, HomestayEnvelope, HomestayListResponse, HomestayStats,
    HostHomestayQuery, PublicHomestayQuery, ReviewList, TopHomestays, UpdateHomestayInput,
};
use crate::services::payment::{self, PaymentListResponse, PaymentQuery};
use crate::services::review::{self, CreateReviewInput, ReviewEnvelope};
use crate::services::room::{
    self, BulkAvailabilityInput, BulkAvailabilityResult, CreateAvailabilityInput,
    CreateRoomInput, RoomDetail, RoomListResponse, RoomQuery, RoomStats, UpdateAvailabilityInput,
    UpdateRoomInput,
};
use crate::models::RoomAvailability;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<ApiResponse<T>>, AppError>;

fn ok<T>(data: T) -> HandlerResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let database = match state.repository.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };
    ok(HealthResponse {
        status: "ok".to_string(),
        database,
    })
}

// =============================================================================
// Auth
// =============================================================================

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RegisterInput>,
) -> HandlerResult<UserInfo> {
    ok(auth::register(
        state.repository.as_ref(),
        &state.auth,
        state.mailer.as_ref(),
        state.frontend_url(),
        input,
    )
    .await?)
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<LoginInput>,
) -> HandlerResult<LoginResponse> {
    ok(auth::login(state.repository.as_ref(), &state.auth, input).await?)
}

/// GET /api/auth/verify?token=…
pub async fn verify_email(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<VerifyQuery>,
) -> HandlerResult<UserInfo> {
    ok(auth::verify_email(state.repository.as_ref(), &state.auth, &query.token).await?)
}

/// GET /api/auth/profile
pub async fn profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> HandlerResult<ProfileResponse> {
    ok(auth::profile(state.repository.as_ref(), user.actor.user_id).await?)
}

/// PUT /api/auth/profile
pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<UpdateProfileInput>,
) -> HandlerResult<ProfileResponse> {
    ok(auth::update_profile(state.repository.as_ref(), user.actor.user_id, input).await?)
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<()>>, AppError> {
    auth::logout(&state.auth, &user.token)?;
    Ok(Json(ApiResponse::empty()))
}

// =============================================================================
// Public homestays
// =============================================================================

/// GET /api/public/homestays/top
pub async fn top_homestays(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TopQuery>,
) -> HandlerResult<TopHomestays> {
    ok(homestay::top(state.repository.as_ref(), query.limit).await?)
}

/// GET /api/public/homestays
pub async fn public_homestays(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PublicHomestayQuery>,
) -> HandlerResult<HomestayListResponse> {
    ok(homestay::public_list(state.repository.as_ref(), query).await?)
}

/// GET /api/public/homestays/{id}
pub async fn public_homestay(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> HandlerResult<HomestayEnvelope> {
    ok(homestay::public_detail(state.repository.as_ref(), id).await?)
}

// =============================================================================
// Host: homestays
// =============================================================================

/// GET /api/host/homestays
pub async fn list_homestays(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
    ApiQuery(query): ApiQuery<HostHomestayQuery>,
) -> HandlerResult<HomestayListResponse> {
    ok(homestay::list_for_host(state.repository.as_ref(), &actor, query).await?)
}

/// POST /api/host/homestays
pub async fn create_homestay(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
    ApiJson(input): ApiJson<CreateHomestayInput>,
) -> HandlerResult<HomestayEnvelope> {
    ok(homestay::create(state.repository.as_ref(), &actor, input).await?)
}

/// GET /api/host/homestays/stats
pub async fn host_stats(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
) -> HandlerResult<HomestayStats> {
    ok(homestay::stats_for_host(state.repository.as_ref(), &actor).await?)
}

/// GET /api/host/homestays/{id}
pub async fn get_homestay(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
    IdPath(id): IdPath,
) -> HandlerResult<HomestayEnvelope> {
    ok(homestay::get_for_host(state.repository.as_ref(), &actor, id).await?)
}

/// PUT /api/host/homestays/{id}
pub async fn update_homestay(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
    IdPath(id): IdPath,
    ApiJson(input): ApiJson<UpdateHomestayInput>,
) -> HandlerResult<HomestayEnvelope> {
    ok(homestay::update(state.repository.as_ref(), &actor, id, input).await?)
}

/// DELETE /api/host/homestays/{id}
pub async fn delete_homestay(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
    IdPath(id): IdPath,
) -> Result<Json<ApiResponse<()>>, AppError> {
    homestay::delete(state.repository.as_ref(), &actor, id).await?;
    Ok(Json(ApiResponse::empty()))
}

/// PUT /api/host/homestays/{id}/toggle-status
pub async fn toggle_homestay(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
    IdPath(id): IdPath,
) -> HandlerResult<HomestayEnvelope> {
    ok(homestay::toggle_status(state.repository.as_ref(), &actor, id).await?)
}

/// GET /api/host/homestays/{id}/stats
pub async fn homestay_stats(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
    IdPath(id): IdPath,
) -> HandlerResult<HomestayStats> {
    ok(homestay::stats_for_homestay(state.repository.as_ref(), &actor, id).await?)
}

/// GET /api/host/homestays/{id}/reviews
pub async fn homestay_reviews(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
    IdPath(id): IdPath,
) -> HandlerResult<ReviewList> {
    ok(homestay::reviews(state.repository.as_ref(), &actor, id).await?)
}

/// GET /api/host/homestays/{id}/rooms/stats
pub async fn room_stats(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
    IdPath(id): IdPath,
) -> HandlerResult<RoomStats> {
    ok(room::stats(state.repository.as_ref(), &actor, id).await?)
}

/// GET /api/host/homestays/{id}/bookings
pub async fn homestay_bookings(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
    IdPath(id): IdPath,
) -> HandlerResult<HomestayBookings> {
    ok(booking::by_homestay(state.repository.as_ref(), &actor, id).await?)
}

// =============================================================================
// Host: rooms and availability
// =============================================================================

/// GET /api/host/rooms
pub async fn list_rooms(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
    ApiQuery(query): ApiQuery<RoomQuery>,
) -> HandlerResult<RoomListResponse> {
    ok(room::list(state.repository.as_ref(), &actor, query).await?)
}

/// POST /api/host/rooms
pub async fn create_room(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
    ApiJson(input): ApiJson<CreateRoomInput>,
) -> HandlerResult<RoomDetail> {
    ok(room::create(state.repository.as_ref(), &actor, input).await?)
}

/// GET /api/host/rooms/{id}
pub async fn get_room(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
    IdPath(id): IdPath,
) -> HandlerResult<RoomDetail> {
    ok(room::get(state.repository.as_ref(), &actor, id).await?)
}

/// PUT /api/host/rooms/{id}
pub async fn update_room(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
    IdPath(id): IdPath,
    ApiJson(input): ApiJson<UpdateRoomInput>,
) -> HandlerResult<RoomDetail> {
    ok(room::update(state.repository.as_ref(), &actor, id, input).await?)
}

/// DELETE /api/host/rooms/{id}
pub async fn delete_room(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
    IdPath(id): IdPath,
) -> Result<Json<ApiResponse<()>>, AppError> {
    room::delete(state.repository.as_ref(), &actor, id).await?;
    Ok(Json(ApiResponse::empty()))
}

/// POST /api/host/rooms/availability
pub async fn create_availability(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
    ApiJson(input): ApiJson<CreateAvailabilityInput>,
) -> HandlerResult<RoomAvailability> {
    ok(room::create_availability(state.repository.as_ref(), &actor, input).await?)
}

/// PUT /api/host/rooms/availability/{id}
pub async fn update_availability(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
    IdPath(id): IdPath,
    ApiJson(input): ApiJson<UpdateAvailabilityInput>,
) -> HandlerResult<RoomAvailability> {
    ok(room::update_availability(state.repository.as_ref(), &actor, id, input).await?)
}

/// POST /api/host/rooms/availability/bulk
pub async fn bulk_availability(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
    ApiJson(input): ApiJson<BulkAvailabilityInput>,
) -> HandlerResult<BulkAvailabilityResult> {
    ok(room::bulk_availability(state.repository.as_ref(), &actor, input).await?)
}

// =============================================================================
// Bookings
// =============================================================================

fn created(envelope: BookingEnvelope) -> (StatusCode, Json<ApiResponse<BookingEnvelope>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(envelope)))
}

/// GET /api/host/booking
pub async fn host_bookings(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
    ApiQuery(query): ApiQuery<BookingQuery>,
) -> HandlerResult<BookingListResponse> {
    ok(booking::filter(state.repository.as_ref(), &BookingScope::of(&actor), query).await?)
}

/// POST /api/host/booking
pub async fn host_create_booking(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
    ApiJson(input): ApiJson<CreateBookingInput>,
) -> Result<(StatusCode, Json<ApiResponse<BookingEnvelope>>), AppError> {
    Ok(created(
        booking::create_for_host(state.repository.as_ref(), &actor, input).await?,
    ))
}

/// GET /api/host/booking/{id}
pub async fn host_booking_detail(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
    IdPath(id): IdPath,
) -> HandlerResult<BookingDetail> {
    ok(booking::detail(state.repository.as_ref(), &BookingScope::of(&actor), id).await?)
}

/// PUT /api/host/booking/{id}/status
pub async fn host_update_booking_status(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
    IdPath(id): IdPath,
    ApiJson(input): ApiJson<UpdateStatusInput>,
) -> HandlerResult<StatusUpdated> {
    update_status(&state, &BookingScope::of(&actor), id, input).await
}

/// GET /api/guest/booking
pub async fn guest_bookings(
    State(state): State<AppState>,
    GuestUser(actor): GuestUser,
    ApiQuery(query): ApiQuery<BookingQuery>,
) -> HandlerResult<BookingListResponse> {
    ok(booking::filter(state.repository.as_ref(), &BookingScope::of(&actor), query).await?)
}

/// POST /api/guest/booking
pub async fn guest_create_booking(
    State(state): State<AppState>,
    GuestUser(actor): GuestUser,
    ApiJson(input): ApiJson<CreateBookingInput>,
) -> Result<(StatusCode, Json<ApiResponse<BookingEnvelope>>), AppError> {
    Ok(created(
        booking::create_for_guest(state.repository.as_ref(), &actor, input).await?,
    ))
}

/// GET /api/guest/booking/{id}
pub async fn guest_booking_detail(
    State(state): State<AppState>,
    GuestUser(actor): GuestUser,
    IdPath(id): IdPath,
) -> HandlerResult<BookingDetail> {
    ok(booking::detail(state.repository.as_ref(), &BookingScope::of(&actor), id).await?)
}

/// PUT /api/guest/booking/{id}/status
pub async fn guest_update_booking_status(
    State(state): State<AppState>,
    GuestUser(actor): GuestUser,
    IdPath(id): IdPath,
    ApiJson(input): ApiJson<UpdateStatusInput>,
) -> HandlerResult<StatusUpdated> {
    update_status(&state, &BookingScope::of(&actor), id, input).await
}

async fn update_status(
    state: &AppState,
    scope: &BookingScope,
    id: i64,
    input: UpdateStatusInput,
) -> HandlerResult<StatusUpdated> {
    ok(booking::update_status(
        state.repository.as_ref(),
        state.mailer.as_ref(),
        state.frontend_url(),
        scope,
        id,
        input,
    )
    .await?)
}

/// GET /api/host/payments
pub async fn host_payments(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
    ApiQuery(query): ApiQuery<PaymentQuery>,
) -> HandlerResult<PaymentListResponse> {
    ok(payment::filter_for_host(state.repository.as_ref(), &actor, query).await?)
}

// =============================================================================
// Booking requests
// =============================================================================

/// GET /api/host/booking-requests
pub async fn host_booking_requests(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
) -> HandlerResult<BookingRequestList> {
    ok(booking_request::list_for_host(state.repository.as_ref(), &actor).await?)
}

/// PUT /api/host/booking-requests/{id}
pub async fn update_booking_request(
    State(state): State<AppState>,
    HostUser(actor): HostUser,
    IdPath(id): IdPath,
    ApiJson(input): ApiJson<UpdateBookingRequestInput>,
) -> HandlerResult<BookingRequestEnvelope> {
    ok(booking_request::update(state.repository.as_ref(), &actor, id, input).await?)
}

/// GET /api/guest/booking-requests
pub async fn guest_booking_requests(
    State(state): State<AppState>,
    GuestUser(actor): GuestUser,
) -> HandlerResult<BookingRequestList> {
    ok(booking_request::list_for_guest(state.repository.as_ref(), &actor).await?)
}

/// POST /api/guest/booking-requests
pub async fn create_booking_request(
    State(state): State<AppState>,
    GuestUser(actor): GuestUser,
    ApiJson(input): ApiJson<CreateBookingRequestInput>,
) -> HandlerResult<BookingRequestEnvelope> {
    ok(booking_request::create(state.repository.as_ref(), &actor, input).await?)
}

// =============================================================================
// Guest browsing and reviews
// =============================================================================

/// GET /api/guest/homestays
pub async fn guest_homestays(
    State(state): State<AppState>,
    GuestUser(_): GuestUser,
    ApiQuery(query): ApiQuery<PublicHomestayQuery>,
) -> HandlerResult<HomestayListResponse> {
    ok(homestay::public_list(state.repository.as_ref(), query).await?)
}

/// GET /api/guest/homestays/{id}
pub async fn guest_homestay(
    State(state): State<AppState>,
    GuestUser(_): GuestUser,
    IdPath(id): IdPath,
) -> HandlerResult<HomestayEnvelope> {
    ok(homestay::public_detail(state.repository.as_ref(), id).await?)
}

/// GET /api/guest/rooms?homestayId=
pub async fn guest_rooms(
    State(state): State<AppState>,
    GuestUser(_): GuestUser,
    ApiQuery(query): ApiQuery<RoomQuery>,
) -> HandlerResult<RoomListResponse> {
    ok(room::guest_list(state.repository.as_ref(), query).await?)
}

/// POST /api/guest/review
pub async fn create_review(
    State(state): State<AppState>,
    GuestUser(actor): GuestUser,
    ApiJson(input): ApiJson<CreateReviewInput>,
) -> HandlerResult<ReviewEnvelope> {
    ok(review::create(state.repository.as_ref(), &actor, input).await?)
}

/// Fallback for unmatched routes.
pub async fn unknown_endpoint() -> AppError {
    AppError::NotFound(crate::services::messages::UNKNOWN_ENDPOINT.to_string())
}
