//! Booking request persistence.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{BookingRequest, BookingRequestChanges, NewBookingRequest};

#[async_trait]
pub trait BookingRequestRepository: Send + Sync {
    /// Insert a request in `pending` status.
    async fn create_booking_request(
        &self,
        request: &NewBookingRequest,
    ) -> RepositoryResult<BookingRequest>;

    async fn get_booking_request(&self, request_id: i64) -> RepositoryResult<BookingRequest>;

    async fn update_booking_request(
        &self,
        request_id: i64,
        changes: &BookingRequestChanges,
    ) -> RepositoryResult<BookingRequest>;

    /// Requests filed by a guest, newest first.
    async fn booking_requests_for_user(&self, user_id: i64)
        -> RepositoryResult<Vec<BookingRequest>>;

    /// Requests on rooms of homestays owned by a host, newest first.
    async fn booking_requests_for_owner(
        &self,
        owner_id: i64,
    ) -> RepositoryResult<Vec<BookingRequest>>;
}
