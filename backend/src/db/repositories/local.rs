//! In-memory local repository implementation.
//!
//! This module provides a local implementation of all repository traits
//! suitable for unit testing and local development. Tables are kept in
//! ordered maps behind a single lock, so every trait method observes and
//! mutates a consistent snapshot, which is what gives `create_booking` and
//! `apply_status_change` their all-or-nothing behaviour here.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::db::repository::*;
use crate::models::*;

/// In-memory local repository.
///
/// # Example
/// ```
/// use homestay_backend::db::repositories::LocalRepository;
/// use homestay_backend::db::repository::HomestayRepository;
///
/// # tokio_test_block(async {
/// let repo = LocalRepository::new();
/// assert!(repo.health_check().await.unwrap());
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone, Default)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

#[derive(Default)]
struct Sequences {
    user: i64,
    homestay: i64,
    room: i64,
    availability: i64,
    booking: i64,
    booking_room: i64,
    booking_request: i64,
    payment: i64,
    review: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

struct LocalData {
    users: BTreeMap<i64, User>,
    homestays: BTreeMap<i64, Homestay>,
    rooms: BTreeMap<i64, Room>,
    availabilities: BTreeMap<i64, RoomAvailability>,
    bookings: BTreeMap<i64, Booking>,
    booking_rooms: BTreeMap<i64, BookingRoom>,
    booking_requests: BTreeMap<i64, BookingRequest>,
    payments: BTreeMap<i64, Payment>,
    reviews: BTreeMap<i64, Review>,
    seq: Sequences,
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            homestays: BTreeMap::new(),
            rooms: BTreeMap::new(),
            availabilities: BTreeMap::new(),
            bookings: BTreeMap::new(),
            booking_rooms: BTreeMap::new(),
            booking_requests: BTreeMap::new(),
            payments: BTreeMap::new(),
            reviews: BTreeMap::new(),
            seq: Sequences::default(),
            is_healthy: true,
        }
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl LocalData {
    fn owner_of(&self, homestay_id: i64) -> Option<i64> {
        self.homestays.get(&homestay_id).map(|h| h.owner_id)
    }

    fn with_owner_name(&self, mut homestay: Homestay) -> Homestay {
        homestay.owner_name = self.users.get(&homestay.owner_id).map(|u| u.name.clone());
        homestay
    }

    fn with_homestay_name(&self, mut room: Room) -> Room {
        room.homestay_name = self.homestays.get(&room.homestay_id).map(|h| h.name.clone());
        room
    }

    fn with_guest_name(&self, mut review: Review) -> Review {
        review.guest_name = self.users.get(&review.user_id).map(|u| u.name.clone());
        review
    }

    fn with_booking_code(&self, mut payment: Payment) -> Payment {
        payment.booking_code = self
            .bookings
            .get(&payment.booking_id)
            .map(|b| b.booking_code.clone())
            .unwrap_or_default();
        payment
    }

    fn with_request_names(&self, mut request: BookingRequest) -> BookingRequest {
        request.user_name = self.users.get(&request.user_id).map(|u| u.name.clone());
        if let Some(room) = self.rooms.get(&request.room_id) {
            request.room_name = Some(room.name.clone());
            request.homestay_name = self.homestays.get(&room.homestay_id).map(|h| h.name.clone());
        }
        request
    }

    fn matches_homestay(&self, homestay: &Homestay, filter: &HomestayFilter) -> bool {
        if let Some(owner) = filter.owner_id {
            if homestay.owner_id != owner {
                return false;
            }
        }
        if let Some(name) = non_empty(&filter.name) {
            if !contains_ci(&homestay.name, name) {
                return false;
            }
        }
        if let Some(city) = non_empty(&filter.city) {
            if !contains_ci(&homestay.city, city) {
                return false;
            }
        }
        if let Some(district) = non_empty(&filter.district) {
            if !contains_ci(&homestay.district, district) {
                return false;
            }
        }
        if let Some(status) = filter.status {
            if homestay.status != status {
                return false;
            }
        }
        true
    }

    /// Whether a non-cancelled booking holds `room_id` somewhere in the window.
    fn room_held(&self, room_id: i64, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        self.booking_rooms
            .values()
            .filter(|br| br.room_id == room_id)
            .filter_map(|br| self.bookings.get(&br.booking_id))
            .any(|b| {
                b.status.holds_rooms()
                    && ranges_overlap(b.check_in, b.check_out, check_in, check_out)
            })
    }

    /// Rooms held by a confirmed booking overlapping the window.
    fn confirmed_rooms_in(&self, check_in: NaiveDate, check_out: NaiveDate) -> HashSet<i64> {
        self.booking_rooms
            .values()
            .filter(|br| {
                self.bookings.get(&br.booking_id).is_some_and(|b| {
                    b.status == BookingStatus::Confirmed
                        && ranges_overlap(b.check_in, b.check_out, check_in, check_out)
                })
            })
            .map(|br| br.room_id)
            .collect()
    }

    fn page_homestays<'a>(
        &self,
        candidates: impl Iterator<Item = &'a Homestay>,
        page: &PageRequest,
    ) -> Page<Homestay> {
        let mut matched: Vec<Homestay> = candidates.cloned().collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = matched.len() as i64;
        let items = page
            .apply(&matched)
            .into_iter()
            .map(|h| self.with_owner_name(h))
            .collect();
        Page::new(items, total)
    }

    fn matches_booking(&self, booking: &Booking, filter: &BookingFilter) -> bool {
        if let Some(owner) = filter.owner_id {
            if self.owner_of(booking.homestay_id) != Some(owner) {
                return false;
            }
        }
        if let Some(homestay_id) = filter.homestay_id {
            if booking.homestay_id != homestay_id {
                return false;
            }
        }
        if let Some(status) = filter.status {
            if booking.status != status {
                return false;
            }
        }
        if let Some(name) = non_empty(&filter.customer_name) {
            if !contains_ci(&booking.name, name) {
                return false;
            }
        }
        if let Some(phone) = non_empty(&filter.customer_phone) {
            if !contains_ci(&booking.phone, phone) {
                return false;
            }
        }
        if let Some(email) = non_empty(&filter.customer_email) {
            if booking.email != email {
                return false;
            }
        }
        if let Some(from) = filter.date_from {
            if booking.check_in < from {
                return false;
            }
        }
        if let Some(to) = filter.date_to {
            if booking.check_out > to {
                return false;
            }
        }
        true
    }

    fn insert_payment(&mut self, booking_id: i64, payment: &NewPayment) -> Payment {
        let id = next_id(&mut self.seq.payment);
        let stored = Payment {
            id,
            booking_id,
            booking_code: String::new(),
            amount: payment.amount,
            payment_method: payment.payment_method.clone(),
            payment_status: payment.payment_status,
            transaction_id: payment.transaction_id.clone(),
            payment_date: payment.payment_date,
            created_at: Utc::now(),
        };
        self.payments.insert(id, stored.clone());
        self.with_booking_code(stored)
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write();
        let healthy = data.is_healthy;
        *data = LocalData {
            is_healthy: healthy,
            ..Default::default()
        };
    }

    /// Get the number of bookings stored.
    pub fn booking_count(&self) -> usize {
        self.data.read().bookings.len()
    }

    /// Get the number of payments stored.
    pub fn payment_count(&self) -> usize {
        self.data.read().payments.len()
    }
}

#[async_trait]
impl UserRepository for LocalRepository {
    async fn create_user(&self, user: &NewUser) -> RepositoryResult<User> {
        let mut data = self.data.write();
        if data.users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::conflict_with_context(
                "email already registered",
                ErrorContext::new("create_user").with_entity("user"),
            ));
        }
        let id = next_id(&mut data.seq.user);
        let stored = User {
            id,
            name: user.name.clone(),
            phone: user.phone.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            status: user.status,
            created_at: Utc::now(),
        };
        data.users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_user(&self, user_id: i64) -> RepositoryResult<User> {
        self.data
            .read()
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| RepositoryError::missing("get_user", "user", user_id))
    }

    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        Ok(self
            .data
            .read()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update_user(&self, user_id: i64, changes: &UserChanges) -> RepositoryResult<User> {
        let mut data = self.data.write();
        if let Some(ref email) = changes.email {
            if data
                .users
                .values()
                .any(|u| u.id != user_id && &u.email == email)
            {
                return Err(RepositoryError::conflict_with_context(
                    "email already registered",
                    ErrorContext::new("update_user").with_entity_id(user_id),
                ));
            }
        }
        let user = data
            .users
            .get_mut(&user_id)
            .ok_or_else(|| RepositoryError::missing("update_user", "user", user_id))?;
        if let Some(ref name) = changes.name {
            user.name = name.clone();
        }
        if let Some(ref email) = changes.email {
            user.email = email.clone();
        }
        if let Some(ref phone) = changes.phone {
            user.phone = phone.clone();
        }
        if let Some(status) = changes.status {
            user.status = status;
        }
        Ok(user.clone())
    }
}

#[async_trait]
impl HomestayRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn create_homestay(&self, homestay: &NewHomestay) -> RepositoryResult<Homestay> {
        let mut data = self.data.write();
        let id = next_id(&mut data.seq.homestay);
        let now = Utc::now();
        let stored = Homestay {
            id,
            name: homestay.name.clone(),
            description: homestay.description.clone(),
            address: homestay.address.clone(),
            city: homestay.city.clone(),
            district: homestay.district.clone(),
            ward: homestay.ward.clone(),
            latitude: homestay.latitude,
            longitude: homestay.longitude,
            owner_id: homestay.owner_id,
            status: homestay.status,
            created_at: now,
            updated_at: now,
            owner_name: None,
        };
        data.homestays.insert(id, stored.clone());
        Ok(data.with_owner_name(stored))
    }

    async fn get_homestay(&self, homestay_id: i64) -> RepositoryResult<Homestay> {
        let data = self.data.read();
        data.homestays
            .get(&homestay_id)
            .cloned()
            .map(|h| data.with_owner_name(h))
            .ok_or_else(|| RepositoryError::missing("get_homestay", "homestay", homestay_id))
    }

    async fn update_homestay(
        &self,
        homestay_id: i64,
        changes: &HomestayChanges,
    ) -> RepositoryResult<Homestay> {
        if changes.is_empty() {
            return Err(RepositoryError::validation_with_context(
                "no fields to update",
                ErrorContext::new("update_homestay").with_entity_id(homestay_id),
            ));
        }
        let mut data = self.data.write();
        let homestay = data
            .homestays
            .get_mut(&homestay_id)
            .ok_or_else(|| RepositoryError::missing("update_homestay", "homestay", homestay_id))?;
        if let Some(ref v) = changes.name {
            homestay.name = v.clone();
        }
        if let Some(ref v) = changes.description {
            homestay.description = v.clone();
        }
        if let Some(ref v) = changes.address {
            homestay.address = v.clone();
        }
        if let Some(ref v) = changes.city {
            homestay.city = v.clone();
        }
        if let Some(ref v) = changes.district {
            homestay.district = v.clone();
        }
        if let Some(ref v) = changes.ward {
            homestay.ward = v.clone();
        }
        if let Some(v) = changes.latitude {
            homestay.latitude = v;
        }
        if let Some(v) = changes.longitude {
            homestay.longitude = v;
        }
        if let Some(v) = changes.status {
            homestay.status = v;
        }
        homestay.updated_at = Utc::now();
        let updated = homestay.clone();
        Ok(data.with_owner_name(updated))
    }

    async fn delete_homestay(&self, homestay_id: i64) -> RepositoryResult<()> {
        let mut data = self.data.write();
        if data.homestays.remove(&homestay_id).is_none() {
            return Err(RepositoryError::missing(
                "delete_homestay",
                "homestay",
                homestay_id,
            ));
        }
        let room_ids: HashSet<i64> = data
            .rooms
            .values()
            .filter(|r| r.homestay_id == homestay_id)
            .map(|r| r.id)
            .collect();
        data.rooms.retain(|_, r| r.homestay_id != homestay_id);
        data.availabilities
            .retain(|_, a| !room_ids.contains(&a.room_id));
        Ok(())
    }

    async fn search_homestays(&self, filter: &HomestayFilter) -> RepositoryResult<Page<Homestay>> {
        let data = self.data.read();
        let candidates = data
            .homestays
            .values()
            .filter(|h| data.matches_homestay(h, filter));
        Ok(data.page_homestays(candidates, &filter.page))
    }

    async fn search_available_homestays(
        &self,
        filter: &HomestayFilter,
        stay: &StayQuery,
    ) -> RepositoryResult<Page<Homestay>> {
        let data = self.data.read();
        let taken = match (stay.check_in, stay.check_out) {
            (Some(check_in), Some(check_out)) => data.confirmed_rooms_in(check_in, check_out),
            _ => HashSet::new(),
        };

        let mut free_capacity: HashMap<i64, (usize, i64)> = HashMap::new();
        for room in data.rooms.values() {
            if room.status == RoomStatus::Available && !taken.contains(&room.id) {
                let entry = free_capacity.entry(room.homestay_id).or_insert((0, 0));
                entry.0 += 1;
                entry.1 += i64::from(room.capacity);
            }
        }

        let candidates = data.homestays.values().filter(|h| {
            h.status == HomestayStatus::Active
                && data.matches_homestay(h, filter)
                && free_capacity
                    .get(&h.id)
                    .is_some_and(|(rooms, beds)| *rooms > 0 && *beds >= i64::from(stay.guests))
        });
        Ok(data.page_homestays(candidates, &filter.page))
    }

    async fn top_homestays(&self, limit: i64) -> RepositoryResult<Vec<Homestay>> {
        let data = self.data.read();
        let mut totals: HashMap<i64, i64> = HashMap::new();
        for review in data.reviews.values() {
            *totals.entry(review.homestay_id).or_insert(0) += i64::from(review.rating);
        }
        let mut active: Vec<Homestay> = data
            .homestays
            .values()
            .filter(|h| h.status == HomestayStatus::Active)
            .cloned()
            .collect();
        active.sort_by(|a, b| {
            let ta = totals.get(&a.id).copied().unwrap_or(0);
            let tb = totals.get(&b.id).copied().unwrap_or(0);
            tb.cmp(&ta).then(a.id.cmp(&b.id))
        });
        Ok(active
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|h| data.with_owner_name(h))
            .collect())
    }
}

#[async_trait]
impl RoomRepository for LocalRepository {
    async fn create_room(&self, room: &NewRoom) -> RepositoryResult<Room> {
        let mut data = self.data.write();
        if !data.homestays.contains_key(&room.homestay_id) {
            return Err(RepositoryError::validation_with_context(
                "homestay does not exist",
                ErrorContext::new("create_room").with_entity_id(room.homestay_id),
            ));
        }
        let id = next_id(&mut data.seq.room);
        let now = Utc::now();
        let stored = Room {
            id,
            homestay_id: room.homestay_id,
            name: room.name.clone(),
            description: room.description.clone(),
            room_type: room.room_type,
            capacity: room.capacity,
            price: room.price,
            price_type: room.price_type,
            status: room.status,
            images: room.images.clone(),
            amenities: room.amenities.clone(),
            created_at: now,
            updated_at: now,
            homestay_name: None,
        };
        data.rooms.insert(id, stored.clone());
        Ok(data.with_homestay_name(stored))
    }

    async fn get_room(&self, room_id: i64) -> RepositoryResult<Room> {
        let data = self.data.read();
        data.rooms
            .get(&room_id)
            .cloned()
            .map(|r| data.with_homestay_name(r))
            .ok_or_else(|| RepositoryError::missing("get_room", "room", room_id))
    }

    async fn update_room(&self, room_id: i64, changes: &RoomChanges) -> RepositoryResult<Room> {
        if changes.is_empty() {
            return Err(RepositoryError::validation_with_context(
                "no fields to update",
                ErrorContext::new("update_room").with_entity_id(room_id),
            ));
        }
        let mut data = self.data.write();
        let room = data
            .rooms
            .get_mut(&room_id)
            .ok_or_else(|| RepositoryError::missing("update_room", "room", room_id))?;
        if let Some(ref v) = changes.name {
            room.name = v.clone();
        }
        if let Some(ref v) = changes.description {
            room.description = v.clone();
        }
        if let Some(v) = changes.room_type {
            room.room_type = v;
        }
        if let Some(v) = changes.capacity {
            room.capacity = v;
        }
        if let Some(v) = changes.price {
            room.price = v;
        }
        if let Some(v) = changes.price_type {
            room.price_type = v;
        }
        if let Some(v) = changes.status {
            room.status = v;
        }
        if let Some(ref v) = changes.images {
            room.images = v.clone();
        }
        if let Some(ref v) = changes.amenities {
            room.amenities = v.clone();
        }
        room.updated_at = Utc::now();
        let updated = room.clone();
        Ok(data.with_homestay_name(updated))
    }

    async fn delete_room(&self, room_id: i64) -> RepositoryResult<()> {
        let mut data = self.data.write();
        if data.rooms.remove(&room_id).is_none() {
            return Err(RepositoryError::missing("delete_room", "room", room_id));
        }
        data.availabilities.retain(|_, a| a.room_id != room_id);
        Ok(())
    }

    async fn search_rooms(&self, filter: &RoomFilter) -> RepositoryResult<Page<Room>> {
        let data = self.data.read();
        let mut matched: Vec<Room> = data
            .rooms
            .values()
            .rev()
            .filter(|r| filter.homestay_id.is_none_or(|id| r.homestay_id == id))
            .filter(|r| {
                filter
                    .owner_id
                    .is_none_or(|owner| data.owner_of(r.homestay_id) == Some(owner))
            })
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .filter(|r| filter.room_type.is_none_or(|t| r.room_type == t))
            .filter(|r| filter.min_price.is_none_or(|p| r.price >= p))
            .filter(|r| filter.max_price.is_none_or(|p| r.price <= p))
            .cloned()
            .collect();
        let total = matched.len() as i64;
        matched = filter.page.apply(&matched);
        Ok(Page::new(
            matched
                .into_iter()
                .map(|r| data.with_homestay_name(r))
                .collect(),
            total,
        ))
    }

    async fn rooms_for_homestay(&self, homestay_id: i64) -> RepositoryResult<Vec<Room>> {
        let data = self.data.read();
        Ok(data
            .rooms
            .values()
            .rev()
            .filter(|r| r.homestay_id == homestay_id)
            .cloned()
            .map(|r| data.with_homestay_name(r))
            .collect())
    }
}

#[async_trait]
impl AvailabilityRepository for LocalRepository {
    async fn create_availability(
        &self,
        availability: &NewAvailability,
    ) -> RepositoryResult<RoomAvailability> {
        let mut data = self.data.write();
        if data
            .availabilities
            .values()
            .any(|a| a.room_id == availability.room_id && a.date == availability.date)
        {
            return Err(RepositoryError::conflict_with_context(
                "availability already exists for this date",
                ErrorContext::new("create_availability")
                    .with_entity("room_availability")
                    .with_details(format!(
                        "room_id={}, date={}",
                        availability.room_id, availability.date
                    )),
            ));
        }
        let id = next_id(&mut data.seq.availability);
        let now = Utc::now();
        let stored = RoomAvailability {
            id,
            room_id: availability.room_id,
            date: availability.date,
            status: availability.status,
            price: availability.price,
            created_at: now,
            updated_at: now,
        };
        data.availabilities.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_availability(&self, availability_id: i64) -> RepositoryResult<RoomAvailability> {
        self.data
            .read()
            .availabilities
            .get(&availability_id)
            .cloned()
            .ok_or_else(|| {
                RepositoryError::missing("get_availability", "room_availability", availability_id)
            })
    }

    async fn update_availability(
        &self,
        availability_id: i64,
        changes: &AvailabilityChanges,
    ) -> RepositoryResult<RoomAvailability> {
        if changes.is_empty() {
            return Err(RepositoryError::validation_with_context(
                "no fields to update",
                ErrorContext::new("update_availability").with_entity_id(availability_id),
            ));
        }
        let mut data = self.data.write();
        let entry = data.availabilities.get_mut(&availability_id).ok_or_else(|| {
            RepositoryError::missing("update_availability", "room_availability", availability_id)
        })?;
        if let Some(status) = changes.status {
            entry.status = status;
        }
        if let Some(price) = changes.price {
            entry.price = Some(price);
        }
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn upsert_availabilities(&self, entries: &[NewAvailability]) -> RepositoryResult<usize> {
        let mut guard = self.data.write();
        let data = &mut *guard;
        let now = Utc::now();
        for entry in entries {
            let existing = data
                .availabilities
                .values_mut()
                .find(|a| a.room_id == entry.room_id && a.date == entry.date);
            match existing {
                Some(current) => {
                    current.status = entry.status;
                    current.price = entry.price;
                    current.updated_at = now;
                }
                None => {
                    let id = next_id(&mut data.seq.availability);
                    data.availabilities.insert(
                        id,
                        RoomAvailability {
                            id,
                            room_id: entry.room_id,
                            date: entry.date,
                            status: entry.status,
                            price: entry.price,
                            created_at: now,
                            updated_at: now,
                        },
                    );
                }
            }
        }
        Ok(entries.len())
    }

    async fn availabilities_for_room(
        &self,
        room_id: i64,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> RepositoryResult<Vec<RoomAvailability>> {
        let data = self.data.read();
        let mut entries: Vec<RoomAvailability> = data
            .availabilities
            .values()
            .filter(|a| a.room_id == room_id)
            .filter(|a| from.is_none_or(|d| a.date >= d))
            .filter(|a| to.is_none_or(|d| a.date <= d))
            .cloned()
            .collect();
        entries.sort_by_key(|a| a.date);
        Ok(entries)
    }
}

#[async_trait]
impl BookingRepository for LocalRepository {
    async fn create_booking(&self, booking: &NewBooking) -> RepositoryResult<Booking> {
        let mut data = self.data.write();
        if data
            .bookings
            .values()
            .any(|b| b.booking_code == booking.booking_code)
        {
            return Err(RepositoryError::conflict_with_context(
                "booking code already used",
                ErrorContext::new("create_booking")
                    .with_entity(BOOKING_CODE_CONSTRAINT)
                    .with_details(booking.booking_code.clone()),
            ));
        }
        if let Some(missing) = booking
            .rooms
            .iter()
            .find(|r| !data.rooms.contains_key(&r.room_id))
        {
            return Err(RepositoryError::validation_with_context(
                "room does not exist",
                ErrorContext::new("create_booking").with_entity_id(missing.room_id),
            ));
        }
        if booking.status.holds_rooms() {
            if let Some(taken) = booking
                .rooms
                .iter()
                .find(|r| data.room_held(r.room_id, booking.check_in, booking.check_out))
            {
                return Err(RepositoryError::conflict_with_context(
                    "room already booked for these dates",
                    ErrorContext::new("create_booking").with_entity_id(taken.room_id),
                ));
            }
        }

        let id = next_id(&mut data.seq.booking);
        let now = Utc::now();
        let stored = Booking {
            id,
            booking_code: booking.booking_code.clone(),
            homestay_id: booking.homestay_id,
            name: booking.name.clone(),
            email: booking.email.clone(),
            phone: booking.phone.clone(),
            check_in: booking.check_in,
            check_out: booking.check_out,
            num_guests: booking.num_guests,
            total_amount: booking.total_amount,
            paid_amount: booking.paid_amount,
            payment_method: booking.payment_method.clone(),
            status: booking.status,
            created_at: now,
        };
        data.bookings.insert(id, stored.clone());

        for room in &booking.rooms {
            let room_row_id = next_id(&mut data.seq.booking_room);
            data.booking_rooms.insert(
                room_row_id,
                BookingRoom {
                    id: room_row_id,
                    booking_id: id,
                    room_id: room.room_id,
                    room_name: room.room_name.clone(),
                    room_type: room.room_type.clone(),
                    capacity: room.capacity,
                    price: room.price,
                    created_at: now,
                },
            );
        }

        if let Some(ref payment) = booking.initial_payment {
            data.insert_payment(id, payment);
        }

        Ok(stored)
    }

    async fn get_booking(&self, booking_id: i64) -> RepositoryResult<Booking> {
        self.data
            .read()
            .bookings
            .get(&booking_id)
            .cloned()
            .ok_or_else(|| RepositoryError::missing("get_booking", "booking", booking_id))
    }

    async fn booking_rooms(&self, booking_id: i64) -> RepositoryResult<Vec<BookingRoom>> {
        Ok(self
            .data
            .read()
            .booking_rooms
            .values()
            .filter(|br| br.booking_id == booking_id)
            .cloned()
            .collect())
    }

    async fn room_has_overlap(
        &self,
        room_id: i64,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> RepositoryResult<bool> {
        Ok(self.data.read().room_held(room_id, check_in, check_out))
    }

    async fn search_bookings(&self, filter: &BookingFilter) -> RepositoryResult<Page<Booking>> {
        let data = self.data.read();
        let mut matched: Vec<Booking> = data
            .bookings
            .values()
            .filter(|b| data.matches_booking(b, filter))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = matched.len() as i64;
        Ok(Page::new(filter.page.apply(&matched), total))
    }

    async fn bookings_for_room(&self, room_id: i64) -> RepositoryResult<Vec<Booking>> {
        let data = self.data.read();
        let ids: HashSet<i64> = data
            .booking_rooms
            .values()
            .filter(|br| br.room_id == room_id)
            .map(|br| br.booking_id)
            .collect();
        Ok(data
            .bookings
            .values()
            .filter(|b| ids.contains(&b.id))
            .cloned()
            .collect())
    }

    async fn apply_status_change(
        &self,
        booking_id: i64,
        change: &StatusChange,
    ) -> RepositoryResult<Booking> {
        let mut data = self.data.write();
        let current = match data.bookings.get(&booking_id) {
            Some(b) => b.status,
            None => {
                return Err(RepositoryError::missing(
                    "apply_status_change",
                    "booking",
                    booking_id,
                ))
            }
        };
        if current != change.from {
            return Err(RepositoryError::conflict_with_context(
                format!("booking is {}, not {}", current, change.from),
                ErrorContext::new("apply_status_change")
                    .with_entity("booking")
                    .with_entity_id(booking_id),
            ));
        }
        if let Some(ref payment) = change.payment {
            data.insert_payment(booking_id, payment);
        }
        let booking = data
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| RepositoryError::missing("apply_status_change", "booking", booking_id))?;
        booking.status = change.status;
        if let Some(paid) = change.paid_amount {
            booking.paid_amount = paid;
        }
        Ok(booking.clone())
    }
}

#[async_trait]
impl BookingRequestRepository for LocalRepository {
    async fn create_booking_request(
        &self,
        request: &NewBookingRequest,
    ) -> RepositoryResult<BookingRequest> {
        let mut data = self.data.write();
        let id = next_id(&mut data.seq.booking_request);
        let now = Utc::now();
        let stored = BookingRequest {
            id,
            user_id: request.user_id,
            room_id: request.room_id,
            check_in: request.check_in,
            check_out: request.check_out,
            num_guests: request.num_guests,
            total_amount: request.total_amount,
            status: BookingRequestStatus::Pending,
            host_note: String::new(),
            guest_note: request.guest_note.clone(),
            created_at: now,
            updated_at: now,
            user_name: None,
            room_name: None,
            homestay_name: None,
        };
        data.booking_requests.insert(id, stored.clone());
        Ok(data.with_request_names(stored))
    }

    async fn get_booking_request(&self, request_id: i64) -> RepositoryResult<BookingRequest> {
        let data = self.data.read();
        data.booking_requests
            .get(&request_id)
            .cloned()
            .map(|r| data.with_request_names(r))
            .ok_or_else(|| {
                RepositoryError::missing("get_booking_request", "booking_request", request_id)
            })
    }

    async fn update_booking_request(
        &self,
        request_id: i64,
        changes: &BookingRequestChanges,
    ) -> RepositoryResult<BookingRequest> {
        if changes.is_empty() {
            return Err(RepositoryError::validation_with_context(
                "no fields to update",
                ErrorContext::new("update_booking_request").with_entity_id(request_id),
            ));
        }
        let mut data = self.data.write();
        let request = data.booking_requests.get_mut(&request_id).ok_or_else(|| {
            RepositoryError::missing("update_booking_request", "booking_request", request_id)
        })?;
        if let Some(status) = changes.status {
            request.status = status;
        }
        if let Some(ref note) = changes.host_note {
            request.host_note = note.clone();
        }
        if let Some(ref note) = changes.guest_note {
            request.guest_note = note.clone();
        }
        request.updated_at = Utc::now();
        let updated = request.clone();
        Ok(data.with_request_names(updated))
    }

    async fn booking_requests_for_user(
        &self,
        user_id: i64,
    ) -> RepositoryResult<Vec<BookingRequest>> {
        let data = self.data.read();
        Ok(data
            .booking_requests
            .values()
            .rev()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .map(|r| data.with_request_names(r))
            .collect())
    }

    async fn booking_requests_for_owner(
        &self,
        owner_id: i64,
    ) -> RepositoryResult<Vec<BookingRequest>> {
        let data = self.data.read();
        Ok(data
            .booking_requests
            .values()
            .rev()
            .filter(|r| {
                data.rooms
                    .get(&r.room_id)
                    .and_then(|room| data.owner_of(room.homestay_id))
                    == Some(owner_id)
            })
            .cloned()
            .map(|r| data.with_request_names(r))
            .collect())
    }
}

#[async_trait]
impl PaymentRepository for LocalRepository {
    async fn create_payment(
        &self,
        booking_id: i64,
        payment: &NewPayment,
    ) -> RepositoryResult<Payment> {
        let mut data = self.data.write();
        if !data.bookings.contains_key(&booking_id) {
            return Err(RepositoryError::validation_with_context(
                "booking does not exist",
                ErrorContext::new("create_payment").with_entity_id(booking_id),
            ));
        }
        Ok(data.insert_payment(booking_id, payment))
    }

    async fn payments_for_booking(&self, booking_id: i64) -> RepositoryResult<Vec<Payment>> {
        let data = self.data.read();
        Ok(data
            .payments
            .values()
            .rev()
            .filter(|p| p.booking_id == booking_id)
            .cloned()
            .map(|p| data.with_booking_code(p))
            .collect())
    }

    async fn search_payments(&self, filter: &PaymentFilter) -> RepositoryResult<Page<Payment>> {
        let data = self.data.read();
        let mut matched: Vec<Payment> = data
            .payments
            .values()
            .cloned()
            .map(|p| data.with_booking_code(p))
            .filter(|p| {
                filter.owner_id.is_none_or(|owner| {
                    data.bookings
                        .get(&p.booking_id)
                        .and_then(|b| data.owner_of(b.homestay_id))
                        == Some(owner)
                })
            })
            .filter(|p| non_empty(&filter.booking_code).is_none_or(|c| p.booking_code.contains(c)))
            .filter(|p| non_empty(&filter.method).is_none_or(|m| p.payment_method == m))
            .filter(|p| filter.date_from.is_none_or(|d| p.payment_date.date_naive() >= d))
            .filter(|p| filter.date_to.is_none_or(|d| p.payment_date.date_naive() <= d))
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = matched.len() as i64;
        Ok(Page::new(filter.page.apply(&matched), total))
    }
}

#[async_trait]
impl ReviewRepository for LocalRepository {
    async fn create_review(&self, review: &NewReview) -> RepositoryResult<Review> {
        let mut data = self.data.write();
        if data
            .reviews
            .values()
            .any(|r| r.booking_id == review.booking_id)
        {
            return Err(RepositoryError::conflict_with_context(
                "booking already reviewed",
                ErrorContext::new("create_review").with_entity_id(review.booking_id),
            ));
        }
        let id = next_id(&mut data.seq.review);
        let stored = Review {
            id,
            booking_id: review.booking_id,
            homestay_id: review.homestay_id,
            user_id: review.user_id,
            guest_name: None,
            rating: review.rating,
            comment: review.comment.clone(),
            created_at: Utc::now(),
        };
        data.reviews.insert(id, stored.clone());
        Ok(data.with_guest_name(stored))
    }

    async fn reviews_for_homestay(&self, homestay_id: i64) -> RepositoryResult<Vec<Review>> {
        let data = self.data.read();
        Ok(data
            .reviews
            .values()
            .rev()
            .filter(|r| r.homestay_id == homestay_id)
            .cloned()
            .map(|r| data.with_guest_name(r))
            .collect())
    }

    async fn review_for_booking(&self, booking_id: i64) -> RepositoryResult<Option<Review>> {
        let data = self.data.read();
        Ok(data
            .reviews
            .values()
            .find(|r| r.booking_id == booking_id)
            .cloned()
            .map(|r| data.with_guest_name(r)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    async fn seed_host(repo: &LocalRepository) -> User {
        repo.create_user(&NewUser {
            name: "Minh Host".into(),
            phone: None,
            email: "host@example.com".into(),
            password_hash: "hash".into(),
            role: UserRole::Host,
            status: UserStatus::Active,
        })
        .await
        .unwrap()
    }

    async fn seed_homestay(repo: &LocalRepository, owner_id: i64, status: HomestayStatus) -> Homestay {
        repo.create_homestay(&NewHomestay {
            name: "Sapa Cloud House".into(),
            description: "Wooden house above the valley".into(),
            address: "12 Fansipan Road".into(),
            city: "Lao Cai".into(),
            district: "Sapa".into(),
            ward: "Cau May".into(),
            latitude: 22.33,
            longitude: 103.84,
            owner_id,
            status,
        })
        .await
        .unwrap()
    }

    async fn seed_room(repo: &LocalRepository, homestay_id: i64, capacity: i32) -> Room {
        repo.create_room(&NewRoom {
            homestay_id,
            name: "Valley room".into(),
            description: "Double room with balcony".into(),
            room_type: RoomType::Double,
            capacity,
            price: 500_000.0,
            price_type: PriceType::PerNight,
            status: RoomStatus::Available,
            images: vec![],
            amenities: vec!["wifi".into()],
        })
        .await
        .unwrap()
    }

    fn new_booking(code: &str, homestay_id: i64, room_id: i64, status: BookingStatus) -> NewBooking {
        NewBooking {
            booking_code: code.into(),
            homestay_id,
            name: "Guest".into(),
            email: "guest@example.com".into(),
            phone: "0901".into(),
            check_in: date("2026-07-01"),
            check_out: date("2026-07-04"),
            num_guests: 2,
            total_amount: 1_500_000.0,
            paid_amount: 0.0,
            payment_method: "cash".into(),
            status,
            rooms: vec![NewBookingRoom {
                room_id,
                room_name: "Valley room".into(),
                room_type: "double".into(),
                capacity: 2,
                price: 500_000.0,
            }],
            initial_payment: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let repo = LocalRepository::new();
        seed_host(&repo).await;
        let err = repo
            .create_user(&NewUser {
                name: "Other".into(),
                phone: None,
                email: "host@example.com".into(),
                password_hash: "x".into(),
                role: UserRole::Guest,
                status: UserStatus::Inactive,
            })
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_homestay_joins_owner_name() {
        let repo = LocalRepository::new();
        let host = seed_host(&repo).await;
        let homestay = seed_homestay(&repo, host.id, HomestayStatus::Active).await;
        let fetched = repo.get_homestay(homestay.id).await.unwrap();
        assert_eq!(fetched.owner_name.as_deref(), Some("Minh Host"));
    }

    #[tokio::test]
    async fn test_empty_update_is_rejected() {
        let repo = LocalRepository::new();
        let host = seed_host(&repo).await;
        let homestay = seed_homestay(&repo, host.id, HomestayStatus::Active).await;
        let err = repo
            .update_homestay(homestay.id, &HomestayChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn test_search_filters_case_insensitively() {
        let repo = LocalRepository::new();
        let host = seed_host(&repo).await;
        seed_homestay(&repo, host.id, HomestayStatus::Active).await;
        let page = repo
            .search_homestays(&HomestayFilter {
                city: Some("lao".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 1);

        let page = repo
            .search_homestays(&HomestayFilter {
                city: Some("hanoi".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_overlap_ignores_cancelled_bookings() {
        let repo = LocalRepository::new();
        let host = seed_host(&repo).await;
        let homestay = seed_homestay(&repo, host.id, HomestayStatus::Active).await;
        let room = seed_room(&repo, homestay.id, 2).await;
        let booking = repo
            .create_booking(&new_booking("BK1", homestay.id, room.id, BookingStatus::Pending))
            .await
            .unwrap();

        assert!(repo
            .room_has_overlap(room.id, date("2026-07-03"), date("2026-07-05"))
            .await
            .unwrap());
        assert!(!repo
            .room_has_overlap(room.id, date("2026-07-04"), date("2026-07-06"))
            .await
            .unwrap());

        repo.apply_status_change(
            booking.id,
            &StatusChange {
                from: booking.status,
                status: BookingStatus::Cancelled,
                paid_amount: None,
                payment: None,
            },
        )
        .await
        .unwrap();
        assert!(!repo
            .room_has_overlap(room.id, date("2026-07-03"), date("2026-07-05"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_create_booking_rejects_held_room() {
        let repo = LocalRepository::new();
        let host = seed_host(&repo).await;
        let homestay = seed_homestay(&repo, host.id, HomestayStatus::Active).await;
        let room = seed_room(&repo, homestay.id, 2).await;
        repo.create_booking(&new_booking("BK1", homestay.id, room.id, BookingStatus::Pending))
            .await
            .unwrap();

        let err = repo
            .create_booking(&new_booking("BK2", homestay.id, room.id, BookingStatus::Confirmed))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_available_search_excludes_confirmed_rooms() {
        let repo = LocalRepository::new();
        let host = seed_host(&repo).await;
        let homestay = seed_homestay(&repo, host.id, HomestayStatus::Active).await;
        let room = seed_room(&repo, homestay.id, 2).await;
        repo.create_booking(&new_booking("BK2", homestay.id, room.id, BookingStatus::Confirmed))
            .await
            .unwrap();

        let stay = StayQuery {
            check_in: Some(date("2026-07-02")),
            check_out: Some(date("2026-07-03")),
            guests: 1,
        };
        let page = repo
            .search_available_homestays(&HomestayFilter::default(), &stay)
            .await
            .unwrap();
        assert_eq!(page.total, 0);

        let later = StayQuery {
            check_in: Some(date("2026-08-01")),
            check_out: Some(date("2026-08-03")),
            guests: 2,
        };
        let page = repo
            .search_available_homestays(&HomestayFilter::default(), &later)
            .await
            .unwrap();
        assert_eq!(page.total, 1);

        let crowd = StayQuery { guests: 3, ..later };
        let page = repo
            .search_available_homestays(&HomestayFilter::default(), &crowd)
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_status_change_records_payment() {
        let repo = LocalRepository::new();
        let host = seed_host(&repo).await;
        let homestay = seed_homestay(&repo, host.id, HomestayStatus::Active).await;
        let room = seed_room(&repo, homestay.id, 2).await;
        let booking = repo
            .create_booking(&new_booking("BK3", homestay.id, room.id, BookingStatus::Confirmed))
            .await
            .unwrap();

        let updated = repo
            .apply_status_change(
                booking.id,
                &StatusChange {
                    from: BookingStatus::Confirmed,
                    status: BookingStatus::Completed,
                    paid_amount: Some(booking.total_amount),
                    payment: Some(NewPayment::completed(booking.total_amount, "cash")),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, BookingStatus::Completed);
        assert_eq!(updated.paid_amount, 1_500_000.0);

        let payments = repo.payments_for_booking(booking.id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].booking_code, "BK3");
    }

    #[tokio::test]
    async fn test_stale_status_change_is_rejected() {
        let repo = LocalRepository::new();
        let host = seed_host(&repo).await;
        let homestay = seed_homestay(&repo, host.id, HomestayStatus::Active).await;
        let room = seed_room(&repo, homestay.id, 2).await;
        let booking = repo
            .create_booking(&new_booking("BK4", homestay.id, room.id, BookingStatus::Confirmed))
            .await
            .unwrap();
        let complete = StatusChange {
            from: BookingStatus::Confirmed,
            status: BookingStatus::Completed,
            paid_amount: Some(booking.total_amount),
            payment: Some(NewPayment::completed(booking.total_amount, "cash")),
        };

        repo.apply_status_change(booking.id, &complete).await.unwrap();
        let err = repo
            .apply_status_change(booking.id, &complete)
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let cancel = StatusChange {
            from: BookingStatus::Confirmed,
            status: BookingStatus::Cancelled,
            paid_amount: None,
            payment: None,
        };
        assert!(repo.apply_status_change(booking.id, &cancel).await.unwrap_err().is_conflict());

        let stored = repo.get_booking(booking.id).await.unwrap();
        assert_eq!(stored.status, BookingStatus::Completed);
        assert_eq!(repo.payments_for_booking(booking.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_availability_overwrites_by_date() {
        let repo = LocalRepository::new();
        let host = seed_host(&repo).await;
        let homestay = seed_homestay(&repo, host.id, HomestayStatus::Active).await;
        let room = seed_room(&repo, homestay.id, 2).await;
        let entry = |status| NewAvailability {
            room_id: room.id,
            date: date("2026-09-01"),
            status,
            price: None,
        };
        repo.upsert_availabilities(&[entry(AvailabilityStatus::Available)])
            .await
            .unwrap();
        repo.upsert_availabilities(&[entry(AvailabilityStatus::Blocked)])
            .await
            .unwrap();

        let entries = repo
            .availabilities_for_room(room.id, None, None)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, AvailabilityStatus::Blocked);
    }

    #[tokio::test]
    async fn test_health_flag() {
        let repo = LocalRepository::new();
        repo.set_healthy(false);
        assert!(!repo.health_check().await.unwrap());
        repo.clear();
        assert!(!repo.health_check().await.unwrap());
    }
}
