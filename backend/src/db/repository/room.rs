//! Room and room-calendar persistence.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::error::RepositoryResult;
use crate::models::{
    AvailabilityChanges, NewAvailability, NewRoom, Page, Room, RoomAvailability, RoomChanges,
    RoomFilter,
};

#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn create_room(&self, room: &NewRoom) -> RepositoryResult<Room>;

    /// Fetch a room with its homestay name joined (`NotFound` when missing).
    async fn get_room(&self, room_id: i64) -> RepositoryResult<Room>;

    async fn update_room(&self, room_id: i64, changes: &RoomChanges) -> RepositoryResult<Room>;

    async fn delete_room(&self, room_id: i64) -> RepositoryResult<()>;

    /// Filtered listing ordered by id DESC.
    async fn search_rooms(&self, filter: &RoomFilter) -> RepositoryResult<Page<Room>>;

    /// Every room of a homestay, ordered by id DESC.
    async fn rooms_for_homestay(&self, homestay_id: i64) -> RepositoryResult<Vec<Room>>;
}

#[async_trait]
pub trait AvailabilityRepository: Send + Sync {
    /// Insert one calendar entry.
    ///
    /// # Returns
    /// * `Err(RepositoryError::Conflict)` - If the room already has an entry for that date
    async fn create_availability(
        &self,
        availability: &NewAvailability,
    ) -> RepositoryResult<RoomAvailability>;

    async fn get_availability(&self, availability_id: i64) -> RepositoryResult<RoomAvailability>;

    async fn update_availability(
        &self,
        availability_id: i64,
        changes: &AvailabilityChanges,
    ) -> RepositoryResult<RoomAvailability>;

    /// Insert or overwrite entries keyed on `(room_id, date)`.
    ///
    /// # Returns
    /// Number of rows written.
    async fn upsert_availabilities(&self, entries: &[NewAvailability]) -> RepositoryResult<usize>;

    /// Calendar entries of a room between two dates (inclusive), ordered by date.
    async fn availabilities_for_room(
        &self,
        room_id: i64,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> RepositoryResult<Vec<RoomAvailability>>;
}
