use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde_json::Value;

use super::schema::{
    booking_requests, booking_rooms, bookings, homestays, payments, reviews, room_availability,
    rooms, users,
};
use crate::db::repository::{RepositoryError, RepositoryResult};
use crate::models::*;

fn strings_to_json(values: &[String]) -> Value {
    Value::Array(values.iter().cloned().map(Value::String).collect())
}

fn json_to_strings(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> RepositoryResult<Self> {
        Ok(User {
            id: row.id,
            name: row.name,
            phone: row.phone,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse()?,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct NewUserRow {
    pub name: String,
    pub phone: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub status: String,
}

impl From<&NewUser> for NewUserRow {
    fn from(user: &NewUser) -> Self {
        Self {
            name: user.name.clone(),
            phone: user.phone.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role.as_str().to_string(),
            status: user.status.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
pub struct UserChangeset {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<Option<String>>,
    pub status: Option<String>,
}

impl From<&UserChanges> for UserChangeset {
    fn from(changes: &UserChanges) -> Self {
        Self {
            name: changes.name.clone(),
            email: changes.email.clone(),
            phone: changes.phone.clone(),
            status: changes.status.map(|s| s.as_str().to_string()),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = homestays)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct HomestayRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub address: String,
    pub city: String,
    pub district: String,
    pub ward: String,
    pub latitude: f64,
    pub longitude: f64,
    pub owner_id: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HomestayRow {
    pub fn into_homestay(self, owner_name: Option<String>) -> RepositoryResult<Homestay> {
        Ok(Homestay {
            id: self.id,
            name: self.name,
            description: self.description,
            address: self.address,
            city: self.city,
            district: self.district,
            ward: self.ward,
            latitude: self.latitude,
            longitude: self.longitude,
            owner_id: self.owner_id,
            status: self.status.parse()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
            owner_name,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = homestays)]
pub struct NewHomestayRow {
    pub name: String,
    pub description: String,
    pub address: String,
    pub city: String,
    pub district: String,
    pub ward: String,
    pub latitude: f64,
    pub longitude: f64,
    pub owner_id: i64,
    pub status: String,
}

impl From<&NewHomestay> for NewHomestayRow {
    fn from(h: &NewHomestay) -> Self {
        Self {
            name: h.name.clone(),
            description: h.description.clone(),
            address: h.address.clone(),
            city: h.city.clone(),
            district: h.district.clone(),
            ward: h.ward.clone(),
            latitude: h.latitude,
            longitude: h.longitude,
            owner_id: h.owner_id,
            status: h.status.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = homestays)]
pub struct HomestayChangeset {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub ward: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<&HomestayChanges> for HomestayChangeset {
    fn from(c: &HomestayChanges) -> Self {
        Self {
            name: c.name.clone(),
            description: c.description.clone(),
            address: c.address.clone(),
            city: c.city.clone(),
            district: c.district.clone(),
            ward: c.ward.clone(),
            latitude: c.latitude,
            longitude: c.longitude,
            status: c.status.map(|s| s.as_str().to_string()),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = rooms)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RoomRow {
    pub id: i64,
    pub homestay_id: i64,
    pub name: String,
    pub description: String,
    pub room_type: String,
    pub capacity: i32,
    pub price: f64,
    pub price_type: String,
    pub status: String,
    pub images: Value,
    pub amenities: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomRow {
    pub fn into_room(self, homestay_name: Option<String>) -> RepositoryResult<Room> {
        Ok(Room {
            id: self.id,
            homestay_id: self.homestay_id,
            name: self.name,
            description: self.description,
            room_type: self.room_type.parse()?,
            capacity: self.capacity,
            price: self.price,
            price_type: self.price_type.parse()?,
            status: self.status.parse()?,
            images: json_to_strings(self.images),
            amenities: json_to_strings(self.amenities),
            created_at: self.created_at,
            updated_at: self.updated_at,
            homestay_name,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = rooms)]
pub struct NewRoomRow {
    pub homestay_id: i64,
    pub name: String,
    pub description: String,
    pub room_type: String,
    pub capacity: i32,
    pub price: f64,
    pub price_type: String,
    pub status: String,
    pub images: Value,
    pub amenities: Value,
}

impl From<&NewRoom> for NewRoomRow {
    fn from(r: &NewRoom) -> Self {
        Self {
            homestay_id: r.homestay_id,
            name: r.name.clone(),
            description: r.description.clone(),
            room_type: r.room_type.as_str().to_string(),
            capacity: r.capacity,
            price: r.price,
            price_type: r.price_type.as_str().to_string(),
            status: r.status.as_str().to_string(),
            images: strings_to_json(&r.images),
            amenities: strings_to_json(&r.amenities),
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = rooms)]
pub struct RoomChangeset {
    pub name: Option<String>,
    pub description: Option<String>,
    pub room_type: Option<String>,
    pub capacity: Option<i32>,
    pub price: Option<f64>,
    pub price_type: Option<String>,
    pub status: Option<String>,
    pub images: Option<Value>,
    pub amenities: Option<Value>,
    pub updated_at: DateTime<Utc>,
}

impl From<&RoomChanges> for RoomChangeset {
    fn from(c: &RoomChanges) -> Self {
        Self {
            name: c.name.clone(),
            description: c.description.clone(),
            room_type: c.room_type.map(|t| t.as_str().to_string()),
            capacity: c.capacity,
            price: c.price,
            price_type: c.price_type.map(|t| t.as_str().to_string()),
            status: c.status.map(|s| s.as_str().to_string()),
            images: c.images.as_deref().map(strings_to_json),
            amenities: c.amenities.as_deref().map(strings_to_json),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = room_availability)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AvailabilityRow {
    pub id: i64,
    pub room_id: i64,
    pub date: NaiveDate,
    pub status: String,
    pub price: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AvailabilityRow> for RoomAvailability {
    type Error = RepositoryError;

    fn try_from(row: AvailabilityRow) -> RepositoryResult<Self> {
        Ok(RoomAvailability {
            id: row.id,
            room_id: row.room_id,
            date: row.date,
            status: row.status.parse()?,
            price: row.price,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = room_availability)]
pub struct NewAvailabilityRow {
    pub room_id: i64,
    pub date: NaiveDate,
    pub status: String,
    pub price: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl From<&NewAvailability> for NewAvailabilityRow {
    fn from(a: &NewAvailability) -> Self {
        Self {
            room_id: a.room_id,
            date: a.date,
            status: a.status.as_str().to_string(),
            price: a.price,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = room_availability)]
pub struct AvailabilityChangeset {
    pub status: Option<String>,
    pub price: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl From<&AvailabilityChanges> for AvailabilityChangeset {
    fn from(c: &AvailabilityChanges) -> Self {
        Self {
            status: c.status.map(|s| s.as_str().to_string()),
            price: c.price,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = bookings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BookingRow {
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
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = RepositoryError;

    fn try_from(row: BookingRow) -> RepositoryResult<Self> {
        Ok(Booking {
            id: row.id,
            booking_code: row.booking_code,
            homestay_id: row.homestay_id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            check_in: row.check_in,
            check_out: row.check_out,
            num_guests: row.num_guests,
            total_amount: row.total_amount,
            paid_amount: row.paid_amount,
            payment_method: row.payment_method,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bookings)]
pub struct NewBookingRow {
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
    pub status: String,
}

impl From<&NewBooking> for NewBookingRow {
    fn from(b: &NewBooking) -> Self {
        Self {
            booking_code: b.booking_code.clone(),
            homestay_id: b.homestay_id,
            name: b.name.clone(),
            email: b.email.clone(),
            phone: b.phone.clone(),
            check_in: b.check_in,
            check_out: b.check_out,
            num_guests: b.num_guests,
            total_amount: b.total_amount,
            paid_amount: b.paid_amount,
            payment_method: b.payment_method.clone(),
            status: b.status.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = bookings)]
pub struct BookingStatusChangeset {
    pub status: String,
    pub paid_amount: Option<f64>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = booking_rooms)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BookingRoomRow {
    pub id: i64,
    pub booking_id: i64,
    pub room_id: i64,
    pub room_name: String,
    pub room_type: String,
    pub capacity: i32,
    pub price: f64,
    pub created_at: DateTime<Utc>,
}

impl From<BookingRoomRow> for BookingRoom {
    fn from(row: BookingRoomRow) -> Self {
        BookingRoom {
            id: row.id,
            booking_id: row.booking_id,
            room_id: row.room_id,
            room_name: row.room_name,
            room_type: row.room_type,
            capacity: row.capacity,
            price: row.price,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = booking_rooms)]
pub struct NewBookingRoomRow {
    pub booking_id: i64,
    pub room_id: i64,
    pub room_name: String,
    pub room_type: String,
    pub capacity: i32,
    pub price: f64,
}

impl NewBookingRoomRow {
    pub fn new(booking_id: i64, room: &NewBookingRoom) -> Self {
        Self {
            booking_id,
            room_id: room.room_id,
            room_name: room.room_name.clone(),
            room_type: room.room_type.clone(),
            capacity: room.capacity,
            price: room.price,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = booking_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BookingRequestRow {
    pub id: i64,
    pub user_id: i64,
    pub room_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub num_guests: i32,
    pub total_amount: f64,
    pub status: String,
    pub host_note: String,
    pub guest_note: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRequestRow> for BookingRequest {
    type Error = RepositoryError;

    fn try_from(row: BookingRequestRow) -> RepositoryResult<Self> {
        Ok(BookingRequest {
            id: row.id,
            user_id: row.user_id,
            room_id: row.room_id,
            check_in: row.check_in,
            check_out: row.check_out,
            num_guests: row.num_guests,
            total_amount: row.total_amount,
            status: row.status.parse()?,
            host_note: row.host_note,
            guest_note: row.guest_note,
            created_at: row.created_at,
            updated_at: row.updated_at,
            user_name: None,
            room_name: None,
            homestay_name: None,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = booking_requests)]
pub struct NewBookingRequestRow {
    pub user_id: i64,
    pub room_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub num_guests: i32,
    pub total_amount: f64,
    pub status: String,
    pub guest_note: String,
}

impl From<&NewBookingRequest> for NewBookingRequestRow {
    fn from(r: &NewBookingRequest) -> Self {
        Self {
            user_id: r.user_id,
            room_id: r.room_id,
            check_in: r.check_in,
            check_out: r.check_out,
            num_guests: r.num_guests,
            total_amount: r.total_amount,
            status: BookingRequestStatus::Pending.as_str().to_string(),
            guest_note: r.guest_note.clone(),
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = booking_requests)]
pub struct BookingRequestChangeset {
    pub status: Option<String>,
    pub host_note: Option<String>,
    pub guest_note: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<&BookingRequestChanges> for BookingRequestChangeset {
    fn from(c: &BookingRequestChanges) -> Self {
        Self {
            status: c.status.map(|s| s.as_str().to_string()),
            host_note: c.host_note.clone(),
            guest_note: c.guest_note.clone(),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentRow {
    pub id: i64,
    pub booking_id: i64,
    pub amount: f64,
    pub payment_method: String,
    pub payment_status: String,
    pub transaction_id: String,
    pub payment_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl PaymentRow {
    pub fn into_payment(self, booking_code: String) -> RepositoryResult<Payment> {
        Ok(Payment {
            id: self.id,
            booking_id: self.booking_id,
            booking_code,
            amount: self.amount,
            payment_method: self.payment_method,
            payment_status: self.payment_status.parse()?,
            transaction_id: self.transaction_id,
            payment_date: self.payment_date,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payments)]
pub struct NewPaymentRow {
    pub booking_id: i64,
    pub amount: f64,
    pub payment_method: String,
    pub payment_status: String,
    pub transaction_id: String,
    pub payment_date: DateTime<Utc>,
}

impl NewPaymentRow {
    pub fn new(booking_id: i64, payment: &NewPayment) -> Self {
        Self {
            booking_id,
            amount: payment.amount,
            payment_method: payment.payment_method.clone(),
            payment_status: payment.payment_status.as_str().to_string(),
            transaction_id: payment.transaction_id.clone(),
            payment_date: payment.payment_date,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = reviews)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ReviewRow {
    pub id: i64,
    pub booking_id: i64,
    pub homestay_id: i64,
    pub user_id: i64,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl ReviewRow {
    pub fn into_review(self, guest_name: Option<String>) -> Review {
        Review {
            id: self.id,
            booking_id: self.booking_id,
            homestay_id: self.homestay_id,
            user_id: self.user_id,
            guest_name,
            rating: self.rating,
            comment: self.comment,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = reviews)]
pub struct NewReviewRow {
    pub booking_id: i64,
    pub homestay_id: i64,
    pub user_id: i64,
    pub rating: i32,
    pub comment: String,
}

impl From<&NewReview> for NewReviewRow {
    fn from(r: &NewReview) -> Self {
        Self {
            booking_id: r.booking_id,
            homestay_id: r.homestay_id,
            user_id: r.user_id,
            rating: r.rating,
            comment: r.comment.clone(),
        }
    }
}
