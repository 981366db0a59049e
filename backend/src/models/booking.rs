use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{NewPayment, PageRequest};
use crate::define_text_enum;

define_text_enum!(
    /// Booking lifecycle: `pending → confirmed → completed`, and
    /// `pending | confirmed → cancelled`.
    BookingStatus {
        Pending => "pending",
        Confirmed => "confirmed",
        Completed => "completed",
        Cancelled => "cancelled",
    }
);

impl BookingStatus {
    /// Whether a booking currently in `self` may move to `next`.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Confirmed, BookingStatus::Completed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
        )
    }

    /// Statuses whose amount counts as revenue.
    pub fn is_revenue(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Completed)
    }

    /// Statuses that hold their rooms.
    pub fn holds_rooms(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

define_text_enum!(
    BookingRequestStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Cancelled => "cancelled",
    }
);

/// Half-open date ranges `[a_start, a_end)` and `[b_start, b_end)` share a night.
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Nights between two dates, never negative.
pub fn nights_between(check_in: NaiveDate, check_out: NaiveDate) -> i64 {
    (check_out - check_in).num_days().max(0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: i64,
    pub booking_code: String,
    pub homestay_id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub num_guests: i32,
    pub total_amount: f64,
    pub paid_amount: f64,
    pub payment_method: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn nights(&self) -> i64 {
        nights_between(self.check_in, self.check_out)
    }

    pub fn outstanding(&self) -> f64 {
        (self.total_amount - self.paid_amount).max(0.0)
    }
}

/// Snapshot of a room at booking time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRoom {
    pub id: i64,
    pub booking_id: i64,
    pub room_id: i64,
    pub room_name: String,
    pub room_type: String,
    pub capacity: i32,
    pub price: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBookingRoom {
    pub room_id: i64,
    pub room_name: String,
    pub room_type: String,
    pub capacity: i32,
    pub price: f64,
}

/// Booking insert payload. Rooms and the optional initial payment are
/// written together with the booking row.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub booking_code: String,
    pub homestay_id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub num_guests: i32,
    pub total_amount: f64,
    pub paid_amount: f64,
    pub payment_method: String,
    pub status: BookingStatus,
    pub rooms: Vec<NewBookingRoom>,
    pub initial_payment: Option<NewPayment>,
}

/// Booking listing filter.
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    /// Restrict to bookings on homestays owned by this host.
    pub owner_id: Option<i64>,
    pub homestay_id: Option<i64>,
    pub status: Option<BookingStatus>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    /// Exact match.
    pub customer_email: Option<String>,
    /// `check_in >= date_from`
    pub date_from: Option<NaiveDate>,
    /// `check_out <= date_to`
    pub date_to: Option<NaiveDate>,
    pub page: PageRequest,
}

/// A status transition applied atomically with its payment side effects.
///
/// Applied only while the stored status still equals `from`.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub from: BookingStatus,
    pub status: BookingStatus,
    pub paid_amount: Option<f64>,
    pub payment: Option<NewPayment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub id: i64,
    pub user_id: i64,
    pub room_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub num_guests: i32,
    pub total_amount: f64,
    pub status: BookingRequestStatus,
    pub host_note: String,
    pub guest_note: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_name: Option<String>,
    pub room_name: Option<String>,
    pub homestay_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewBookingRequest {
    pub user_id: i64,
    pub room_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub num_guests: i32,
    pub total_amount: f64,
    pub guest_note: String,
}

#[derive(Debug, Clone, Default)]
pub struct BookingRequestChanges {
    pub status: Option<BookingRequestStatus>,
    pub host_note: Option<String>,
    pub guest_note: Option<String>,
}

impl BookingRequestChanges {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.host_note.is_none() && self.guest_note.is_none()
    }
}
