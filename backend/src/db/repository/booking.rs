//! Booking persistence.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::error::RepositoryResult;
use crate::models::{Booking, BookingFilter, BookingRoom, NewBooking, Page, StatusChange};

/// Unique constraint on `bookings.booking_code`. Conflicts raised for a
/// reused code name it as their entity.
pub const BOOKING_CODE_CONSTRAINT: &str = "bookings_booking_code_key";

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert a booking with its rooms and optional initial payment in one
    /// transaction.
    async fn create_booking(&self, booking: &NewBooking) -> RepositoryResult<Booking>;

    /// Fetch a booking by id (`NotFound` when missing).
    async fn get_booking(&self, booking_id: i64) -> RepositoryResult<Booking>;

    /// Rooms booked under a booking, in insertion order.
    async fn booking_rooms(&self, booking_id: i64) -> RepositoryResult<Vec<BookingRoom>>;

    /// Whether `room_id` is held by a non-cancelled booking overlapping
    /// `[check_in, check_out)`.
    async fn room_has_overlap(
        &self,
        room_id: i64,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> RepositoryResult<bool>;

    /// Filtered listing ordered by `created_at` DESC.
    async fn search_bookings(&self, filter: &BookingFilter) -> RepositoryResult<Page<Booking>>;

    /// Distinct bookings that include the room.
    async fn bookings_for_room(&self, room_id: i64) -> RepositoryResult<Vec<Booking>>;

    /// Apply a status transition together with its paid amount and
    /// payment side effects in one transaction.
    async fn apply_status_change(
        &self,
        booking_id: i64,
        change: &StatusChange,
    ) -> RepositoryResult<Booking>;
}
