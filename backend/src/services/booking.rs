//! Booking creation, listing and the status state machine.
//!
//! A room is never held by two non-cancelled bookings with overlapping
//! `[check_in, check_out)` windows. Status moves along
//! `pending → confirmed → completed`, or to `cancelled` from either of the
//! first two; completing a booking settles the outstanding amount.

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{error, info, warn};

use super::error::{conflicting, missing, ServiceError, ServiceResult};
use super::homestay::parse_date;
use super::payment::PaymentView;
use super::{messages, owned_homestay, require_id, Actor};
use crate::db::repository::{FullRepository, BOOKING_CODE_CONSTRAINT};
use crate::mail::{BookingConfirmation, Mailer};
use crate::models::{
    nights_between, Booking, BookingFilter, BookingRoom, BookingStatus, HomestayStatus,
    NewBooking, NewBookingRoom, NewPayment, PageRequest, Review, StatusChange,
    DEFAULT_PAGE_SIZE,
};

/// Fresh codes tried before giving up on a booking insert.
const BOOKING_CODE_ATTEMPTS: u32 = 5;

/// Page size used when listing every booking of one homestay.
pub const HOMESTAY_BOOKINGS_LIMIT: i64 = 100;

/// Who is asking, and therefore which bookings are visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingScope {
    /// Bookings on homestays owned by this host.
    Host(i64),
    /// Bookings made with this e-mail.
    Guest(String),
}

impl BookingScope {
    pub fn of(actor: &Actor) -> Self {
        if actor.is_host() {
            BookingScope::Host(actor.user_id)
        } else {
            BookingScope::Guest(actor.email.clone())
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRoomInput {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub room_type: String,
    #[serde(default)]
    pub capacity: i32,
    #[serde(default)]
    pub price_per_night: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingInput {
    #[serde(default)]
    pub homestay_id: i64,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub check_in: String,
    #[serde(default)]
    pub check_out: String,
    #[serde(default)]
    pub guests: i32,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub paid_amount: f64,
    #[serde(default)]
    pub rooms: Vec<BookingRoomInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingQuery {
    pub status: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusInput {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRoomView {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub room_type: String,
    pub capacity: i32,
    pub price_per_night: f64,
    pub nights: i64,
    pub subtotal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    pub id: i64,
    pub booking_code: String,
    pub homestay_id: i64,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub check_in: String,
    pub check_out: String,
    pub nights: i64,
    pub guests: i32,
    pub total_amount: f64,
    pub paid_amount: f64,
    pub status: BookingStatus,
    pub booking_date: String,
    pub payment_method: String,
    pub rooms: Vec<BookingRoomView>,
    pub review: Option<Review>,
}

impl BookingView {
    pub fn new(booking: Booking, rooms: Vec<BookingRoom>, review: Option<Review>) -> Self {
        let nights = booking.nights();
        Self {
            id: booking.id,
            rooms: rooms
                .into_iter()
                .map(|r| BookingRoomView {
                    id: r.room_id,
                    name: r.room_name,
                    room_type: r.room_type,
                    capacity: r.capacity,
                    price_per_night: r.price,
                    nights,
                    subtotal: r.price * nights as f64,
                })
                .collect(),
            booking_code: booking.booking_code,
            homestay_id: booking.homestay_id,
            customer_name: booking.name,
            customer_phone: booking.phone,
            customer_email: booking.email,
            check_in: booking.check_in.format("%Y-%m-%d").to_string(),
            check_out: booking.check_out.format("%Y-%m-%d").to_string(),
            nights,
            guests: booking.num_guests,
            total_amount: booking.total_amount,
            paid_amount: booking.paid_amount,
            status: booking.status,
            booking_date: booking.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            payment_method: booking.payment_method,
            review,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingEnvelope {
    pub booking: BookingView,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingDetail {
    pub booking: BookingView,
    pub payments: Vec<PaymentView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingListResponse {
    pub bookings: Vec<BookingView>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HomestayBookings {
    pub bookings: Vec<BookingView>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdated {
    pub success: bool,
}

/// `BK` + `YYYYMMDDHHMMSS` + four random characters.
pub fn generate_booking_code() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "BK{}{}",
        Utc::now().format("%Y%m%d%H%M%S"),
        suffix[..4].to_uppercase()
    )
}

async fn view<R: FullRepository + ?Sized>(repo: &R, booking: Booking) -> ServiceResult<BookingView> {
    let rooms = repo.booking_rooms(booking.id).await?;
    let review = repo.review_for_booking(booking.id).await?;
    Ok(BookingView::new(booking, rooms, review))
}

async fn views<R: FullRepository + ?Sized>(
    repo: &R,
    bookings: Vec<Booking>,
) -> ServiceResult<Vec<BookingView>> {
    let mut out = Vec::with_capacity(bookings.len());
    for booking in bookings {
        out.push(view(repo, booking).await?);
    }
    Ok(out)
}

/// Load a booking visible to `scope`.
async fn scoped_booking<R: FullRepository + ?Sized>(
    repo: &R,
    scope: &BookingScope,
    booking_id: i64,
) -> ServiceResult<Booking> {
    let booking = repo
        .get_booking(require_id(booking_id)?)
        .await
        .map_err(missing(messages::BOOKING_NOT_FOUND))?;
    let visible = match scope {
        BookingScope::Host(owner_id) => repo
            .get_homestay(booking.homestay_id)
            .await
            .map(|h| h.owner_id == *owner_id)
            .or_else(|e| if e.is_not_found() { Ok(false) } else { Err(e) })?,
        BookingScope::Guest(email) => booking.email.eq_ignore_ascii_case(email),
    };
    if !visible {
        warn!(booking_id, ?scope, "booking outside the caller's scope");
        return Err(ServiceError::forbidden());
    }
    Ok(booking)
}

struct ValidatedStay {
    check_in: NaiveDate,
    check_out: NaiveDate,
    rooms: Vec<NewBookingRoom>,
}

/// Shared checks of both creation paths: required fields, dates, and per
/// room existence, homestay membership and overlap.
async fn validate_stay<R: FullRepository + ?Sized>(
    repo: &R,
    homestay_id: i64,
    input: &CreateBookingInput,
) -> ServiceResult<ValidatedStay> {
    if input.customer_name.trim().is_empty()
        || input.customer_email.trim().is_empty()
        || input.check_in.trim().is_empty()
        || input.check_out.trim().is_empty()
        || input.rooms.is_empty()
    {
        return Err(ServiceError::validation(messages::REQUIRED_FIELDS));
    }
    let check_in = parse_date(&input.check_in, messages::BAD_CHECK_IN)?;
    let check_out = parse_date(&input.check_out, messages::BAD_CHECK_OUT)?;
    if check_in >= check_out {
        return Err(ServiceError::validation(messages::DATE_ORDER));
    }
    if input.paid_amount < 0.0 || input.total_amount < 0.0 {
        return Err(ServiceError::validation(messages::INVALID_DATA));
    }

    let mut seen = HashSet::new();
    let mut rooms = Vec::with_capacity(input.rooms.len());
    for requested in &input.rooms {
        if requested.id <= 0 || !seen.insert(requested.id) {
            return Err(ServiceError::validation(messages::INVALID_ROOM));
        }
        let room = repo
            .get_room(requested.id)
            .await
            .map_err(missing(messages::ROOM_NOT_FOUND))?;
        if room.homestay_id != homestay_id {
            warn!(room_id = room.id, homestay_id, "room does not belong to the homestay");
            return Err(ServiceError::validation(messages::INVALID_ROOM));
        }
        if repo.room_has_overlap(room.id, check_in, check_out).await? {
            warn!(room_id = room.id, %check_in, %check_out, "room already booked");
            return Err(ServiceError::conflict(messages::ROOM_TAKEN));
        }
        rooms.push(NewBookingRoom {
            room_id: room.id,
            room_name: room.name,
            room_type: room.room_type.to_string(),
            capacity: room.capacity,
            price: room.price,
        });
    }
    Ok(ValidatedStay {
        check_in,
        check_out,
        rooms,
    })
}

fn derived_total(rooms: &[NewBookingRoom], nights: i64) -> f64 {
    rooms.iter().map(|r| r.price * nights as f64).sum()
}

async fn insert<R: FullRepository + ?Sized>(
    repo: &R,
    homestay_id: i64,
    input: CreateBookingInput,
    stay: ValidatedStay,
    total_amount: f64,
    status: BookingStatus,
) -> ServiceResult<BookingEnvelope> {
    let payment_method = input.payment_method.trim().to_string();
    let initial_payment = (input.paid_amount > 0.0)
        .then(|| NewPayment::completed(input.paid_amount, payment_method.clone()));
    let mut new_booking = NewBooking {
        booking_code: generate_booking_code(),
        homestay_id,
        name: input.customer_name.trim().to_string(),
        email: input.customer_email.trim().to_string(),
        phone: input.customer_phone.trim().to_string(),
        check_in: stay.check_in,
        check_out: stay.check_out,
        num_guests: input.guests.max(1),
        total_amount,
        paid_amount: input.paid_amount,
        payment_method,
        status,
        rooms: stay.rooms,
        initial_payment,
    };
    let mut attempt = 1;
    let booking = loop {
        match repo.create_booking(&new_booking).await {
            Ok(booking) => break booking,
            Err(e) if e.is_conflict_on(BOOKING_CODE_CONSTRAINT) => {
                if attempt == BOOKING_CODE_ATTEMPTS {
                    error!(attempts = attempt, "no free booking code");
                    return Err(ServiceError::Internal(
                        "booking code space exhausted".to_string(),
                    ));
                }
                warn!(code = %new_booking.booking_code, "booking code reused, regenerating");
                new_booking.booking_code = generate_booking_code();
                attempt += 1;
            }
            Err(e) => return Err(conflicting(messages::ROOM_TAKEN)(e)),
        }
    };
    info!(
        booking_id = booking.id,
        code = %booking.booking_code,
        status = %booking.status,
        "booking created"
    );
    Ok(BookingEnvelope {
        booking: view(repo, booking).await?,
    })
}

/// Walk-in or phone booking entered by the host. Stored `confirmed`, or
/// `completed` when already paid in full.
pub async fn create_for_host<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    input: CreateBookingInput,
) -> ServiceResult<BookingEnvelope> {
    let stay = validate_stay(repo, input.homestay_id, &input).await?;
    let homestay = owned_homestay(repo, input.homestay_id, actor).await?;

    let nights = nights_between(stay.check_in, stay.check_out);
    let total_amount = if input.total_amount > 0.0 {
        input.total_amount
    } else {
        derived_total(&stay.rooms, nights)
    };
    let status = if input.paid_amount >= total_amount {
        BookingStatus::Completed
    } else {
        BookingStatus::Confirmed
    };
    insert(repo, homestay.id, input, stay, total_amount, status).await
}

/// Booking placed by a guest. Stored `pending` until the host confirms it.
pub async fn create_for_guest<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    mut input: CreateBookingInput,
) -> ServiceResult<BookingEnvelope> {
    if input.customer_email.trim().is_empty() {
        input.customer_email = actor.email.clone();
    }
    let stay = validate_stay(repo, input.homestay_id, &input).await?;
    let homestay = repo
        .get_homestay(input.homestay_id)
        .await
        .map_err(missing(messages::HOMESTAY_NOT_FOUND))?;
    if homestay.status != HomestayStatus::Active {
        warn!(homestay_id = homestay.id, "booking on inactive homestay");
        return Err(ServiceError::validation(messages::HOMESTAY_UNAVAILABLE));
    }

    let nights = nights_between(stay.check_in, stay.check_out);
    let total_amount = if input.total_amount > 0.0 {
        input.total_amount
    } else {
        derived_total(&stay.rooms, nights)
    };
    insert(repo, homestay.id, input, stay, total_amount, BookingStatus::Pending).await
}

fn optional_date(value: Option<&str>, message: &'static str) -> ServiceResult<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => parse_date(v, message).map(Some),
        None => Ok(None),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub async fn filter<R: FullRepository + ?Sized>(
    repo: &R,
    scope: &BookingScope,
    query: BookingQuery,
) -> ServiceResult<BookingListResponse> {
    let status = match non_blank(query.status) {
        Some(s) => Some(
            s.parse::<BookingStatus>()
                .map_err(|_| ServiceError::validation(messages::INVALID_STATUS))?,
        ),
        None => None,
    };
    let page = PageRequest::new(query.page, query.page_size, DEFAULT_PAGE_SIZE);
    let mut filter = BookingFilter {
        owner_id: None,
        homestay_id: None,
        status,
        customer_name: non_blank(query.customer_name),
        customer_phone: non_blank(query.customer_phone),
        customer_email: non_blank(query.customer_email),
        date_from: optional_date(query.date_from.as_deref(), messages::BAD_CHECK_IN)?,
        date_to: optional_date(query.date_to.as_deref(), messages::BAD_CHECK_OUT)?,
        page,
    };
    match scope {
        BookingScope::Host(owner_id) => filter.owner_id = Some(*owner_id),
        BookingScope::Guest(email) => filter.customer_email = Some(email.clone()),
    }

    let result = repo.search_bookings(&filter).await?;
    Ok(BookingListResponse {
        bookings: views(repo, result.items).await?,
        total: result.total,
        page: page.page,
        page_size: page.page_size,
    })
}

pub async fn detail<R: FullRepository + ?Sized>(
    repo: &R,
    scope: &BookingScope,
    booking_id: i64,
) -> ServiceResult<BookingDetail> {
    let booking = scoped_booking(repo, scope, booking_id).await?;
    let payments = repo
        .payments_for_booking(booking.id)
        .await?
        .into_iter()
        .map(PaymentView::from)
        .collect();
    Ok(BookingDetail {
        booking: view(repo, booking).await?,
        payments,
    })
}

/// Move a booking to `confirmed`, `cancelled` or `completed`.
///
/// Guests may only cancel. Completion records a top-up payment for the
/// outstanding amount; confirmation e-mails the guest.
pub async fn update_status<R: FullRepository + ?Sized>(
    repo: &R,
    mailer: &dyn Mailer,
    frontend_url: &str,
    scope: &BookingScope,
    booking_id: i64,
    input: UpdateStatusInput,
) -> ServiceResult<StatusUpdated> {
    let target = match input.status.trim().parse::<BookingStatus>() {
        Ok(s @ (BookingStatus::Confirmed | BookingStatus::Cancelled | BookingStatus::Completed)) => s,
        _ => return Err(ServiceError::validation(messages::INVALID_STATUS)),
    };
    let booking = scoped_booking(repo, scope, booking_id).await?;
    if matches!(scope, BookingScope::Guest(_)) && target != BookingStatus::Cancelled {
        warn!(booking_id, status = %target, "guest attempted a host-only transition");
        return Err(ServiceError::forbidden());
    }
    if !booking.status.can_transition_to(target) {
        warn!(booking_id, from = %booking.status, to = %target, "invalid booking transition");
        return Err(ServiceError::validation(messages::INVALID_STATUS));
    }

    let mut change = StatusChange {
        from: booking.status,
        status: target,
        paid_amount: None,
        payment: None,
    };
    if target == BookingStatus::Completed {
        let outstanding = booking.outstanding();
        if outstanding > 0.0 {
            change.payment = Some(NewPayment::completed(
                outstanding,
                booking.payment_method.clone(),
            ));
        }
        change.paid_amount = Some(booking.total_amount.max(booking.paid_amount));
    }
    let updated = repo
        .apply_status_change(booking.id, &change)
        .await
        .map_err(|e| {
            if e.is_conflict() {
                warn!(booking_id, from = %booking.status, to = %target, "booking status changed underneath");
                ServiceError::validation(messages::INVALID_STATUS)
            } else {
                missing(messages::BOOKING_NOT_FOUND)(e)
            }
        })?;
    info!(booking_id, from = %booking.status, to = %updated.status, "booking status changed");

    if target == BookingStatus::Confirmed {
        send_confirmation(repo, mailer, frontend_url, &updated).await;
    }
    Ok(StatusUpdated { success: true })
}

async fn send_confirmation<R: FullRepository + ?Sized>(
    repo: &R,
    mailer: &dyn Mailer,
    frontend_url: &str,
    booking: &Booking,
) {
    let homestay_name = match repo.get_homestay(booking.homestay_id).await {
        Ok(h) => h.name,
        Err(e) => {
            error!(booking_id = booking.id, error = %e, "failed to load homestay for confirmation");
            String::new()
        }
    };
    let room_count = match repo.booking_rooms(booking.id).await {
        Ok(rooms) => rooms.len(),
        Err(e) => {
            error!(booking_id = booking.id, error = %e, "failed to load booked rooms for confirmation");
            0
        }
    };
    let data = BookingConfirmation {
        guest_name: booking.name.clone(),
        homestay_name,
        booking_code: booking.booking_code.clone(),
        check_in: booking.check_in,
        check_out: booking.check_out,
        nights: booking.nights(),
        room_count,
        total_amount: booking.total_amount,
        link: format!("{}/bookings", frontend_url.trim_end_matches('/')),
        year: booking.created_at.year(),
    };
    if let Err(e) = mailer.send_booking_confirmation(&booking.email, &data).await {
        error!(booking_id = booking.id, error = %e, "failed to send booking confirmation");
    }
}

pub async fn by_homestay<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    homestay_id: i64,
) -> ServiceResult<HomestayBookings> {
    owned_homestay(repo, homestay_id, actor).await?;
    let result = repo
        .search_bookings(&BookingFilter {
            homestay_id: Some(homestay_id),
            page: PageRequest::fixed(1, HOMESTAY_BOOKINGS_LIMIT),
            ..Default::default()
        })
        .await?;
    Ok(HomestayBookings {
        bookings: views(repo, result.items).await?,
        total: result.total,
    })
}
