//! Room and room-calendar use cases.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};
use validator::Validate;

use super::error::{conflicting, missing, ServiceError, ServiceResult};
use super::homestay::parse_date;
use super::{messages, owned_homestay, require_id, Actor};
use crate::db::repository::FullRepository;
use crate::models::{
    total_pages, AvailabilityChanges, AvailabilityStatus, Booking, HomestayStatus,
    NewAvailability, NewRoom, PageRequest, PriceType, Room, RoomAvailability, RoomChanges,
    RoomFilter, RoomStatus, RoomType, DEFAULT_PAGE_SIZE,
};

/// Longest date range a bulk calendar update may cover.
pub const MAX_BULK_DAYS: i64 = 366;

#[derive(Debug, Clone, Serialize)]
pub struct HomestayRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomDetail {
    pub room: Room,
    pub availabilities: Vec<RoomAvailability>,
    pub homestay: HomestayRef,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListResponse {
    pub rooms: Vec<Room>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_page: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStats {
    pub total_rooms: i64,
    pub available_rooms: i64,
    pub occupied_rooms: i64,
    pub maintenance_rooms: i64,
    pub average_price: f64,
    pub total_revenue: f64,
    pub occupancy_rate: f64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomInput {
    pub homestay_id: i64,
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(length(min = 10, max = 500))]
    pub description: String,
    #[serde(rename = "type")]
    pub room_type: String,
    #[validate(range(min = 1, max = 20))]
    pub capacity: i32,
    #[validate(range(min = 0.0))]
    pub price: f64,
    pub price_type: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoomInput {
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 10, max = 500))]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub room_type: Option<String>,
    #[validate(range(min = 1, max = 20))]
    pub capacity: Option<i32>,
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
    pub price_type: Option<String>,
    pub status: Option<String>,
    pub images: Option<Vec<String>>,
    pub amenities: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomQuery {
    pub homestay_id: Option<i64>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub room_type: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAvailabilityInput {
    pub room_id: i64,
    pub date: String,
    pub status: String,
    #[serde(default)]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAvailabilityInput {
    pub status: Option<String>,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAvailabilityInput {
    pub room_id: i64,
    pub start_date: String,
    pub end_date: String,
    pub status: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub exclude_dates: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkAvailabilityResult {
    pub updated: usize,
}

fn parse_text<T: std::str::FromStr>(value: &str) -> ServiceResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ServiceError::validation(messages::INVALID_DATA))
}

fn parse_optional<T: std::str::FromStr>(value: Option<&str>) -> ServiceResult<Option<T>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => parse_text(v).map(Some),
        None => Ok(None),
    }
}

fn check_price(price: Option<f64>) -> ServiceResult<Option<f64>> {
    match price {
        Some(p) if p.is_nan() || p < 0.0 => Err(ServiceError::validation(messages::INVALID_DATA)),
        other => Ok(other),
    }
}

/// Load a room and check that `actor` owns its homestay.
pub(crate) async fn owned_room<R: FullRepository + ?Sized>(
    repo: &R,
    room_id: i64,
    actor: &Actor,
) -> ServiceResult<(Room, HomestayRef)> {
    let room = repo
        .get_room(require_id(room_id)?)
        .await
        .map_err(missing(messages::ROOM_NOT_FOUND))?;
    let homestay = owned_homestay(repo, room.homestay_id, actor).await?;
    Ok((
        room,
        HomestayRef {
            id: homestay.id,
            name: homestay.name,
        },
    ))
}

pub async fn create<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    input: CreateRoomInput,
) -> ServiceResult<RoomDetail> {
    input.validate()?;
    let room_type: RoomType = parse_text(&input.room_type)?;
    let price_type: PriceType = parse_text(&input.price_type)?;
    let homestay = owned_homestay(repo, input.homestay_id, actor).await?;

    let room = repo
        .create_room(&NewRoom {
            homestay_id: homestay.id,
            name: input.name,
            description: input.description,
            room_type,
            capacity: input.capacity,
            price: input.price,
            price_type,
            status: RoomStatus::Available,
            images: input.images,
            amenities: input.amenities,
        })
        .await?;
    info!(room_id = room.id, homestay_id = homestay.id, "room created");
    Ok(RoomDetail {
        room,
        availabilities: Vec::new(),
        homestay: HomestayRef {
            id: homestay.id,
            name: homestay.name,
        },
    })
}

pub async fn get<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    room_id: i64,
) -> ServiceResult<RoomDetail> {
    let (room, homestay) = owned_room(repo, room_id, actor).await?;
    let availabilities = repo.availabilities_for_room(room.id, None, None).await?;
    Ok(RoomDetail {
        room,
        availabilities,
        homestay,
    })
}

fn room_filter(query: &RoomQuery) -> ServiceResult<RoomFilter> {
    Ok(RoomFilter {
        homestay_id: query.homestay_id,
        owner_id: None,
        status: parse_optional(query.status.as_deref())?,
        room_type: parse_optional(query.room_type.as_deref())?,
        min_price: query.min_price,
        max_price: query.max_price,
        page: PageRequest::new(query.page, query.page_size, DEFAULT_PAGE_SIZE),
    })
}

fn room_list(rooms: Vec<Room>, total: i64, page: PageRequest) -> RoomListResponse {
    RoomListResponse {
        rooms,
        total,
        page: page.page,
        page_size: page.page_size,
        total_page: total_pages(total, page.page_size),
    }
}

/// Rooms of the caller's homestays.
pub async fn list<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    query: RoomQuery,
) -> ServiceResult<RoomListResponse> {
    let mut filter = room_filter(&query)?;
    if let Some(homestay_id) = filter.homestay_id {
        owned_homestay(repo, homestay_id, actor).await?;
    }
    filter.owner_id = Some(actor.user_id);
    let page = filter.page;
    let result = repo.search_rooms(&filter).await?;
    Ok(room_list(result.items, result.total, page))
}

pub async fn update<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    room_id: i64,
    input: UpdateRoomInput,
) -> ServiceResult<RoomDetail> {
    input.validate()?;
    let changes = RoomChanges {
        name: input.name,
        description: input.description,
        room_type: parse_optional(input.room_type.as_deref())?,
        capacity: input.capacity,
        price: input.price,
        price_type: parse_optional(input.price_type.as_deref())?,
        status: parse_optional(input.status.as_deref())?,
        images: input.images,
        amenities: input.amenities,
    };
    if changes.is_empty() {
        return Err(ServiceError::validation(messages::NOTHING_TO_UPDATE));
    }

    let (_, homestay) = owned_room(repo, room_id, actor).await?;
    let room = repo
        .update_room(room_id, &changes)
        .await
        .map_err(missing(messages::ROOM_NOT_FOUND))?;
    let availabilities = repo.availabilities_for_room(room.id, None, None).await?;
    info!(room_id, "room updated");
    Ok(RoomDetail {
        room,
        availabilities,
        homestay,
    })
}

pub async fn delete<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    room_id: i64,
) -> ServiceResult<()> {
    owned_room(repo, room_id, actor).await?;
    repo.delete_room(room_id)
        .await
        .map_err(missing(messages::ROOM_NOT_FOUND))?;
    info!(room_id, "room deleted");
    Ok(())
}

/// Rooms of an active homestay, for guests.
pub async fn guest_list<R: FullRepository + ?Sized>(
    repo: &R,
    query: RoomQuery,
) -> ServiceResult<RoomListResponse> {
    let homestay_id = require_id(query.homestay_id.unwrap_or(0))?;
    let homestay = repo
        .get_homestay(homestay_id)
        .await
        .map_err(missing(messages::HOMESTAY_NOT_FOUND))?;
    if homestay.status != HomestayStatus::Active {
        warn!(homestay_id, "room listing requested for inactive homestay");
        return Err(ServiceError::validation(messages::HOMESTAY_UNAVAILABLE));
    }
    let filter = room_filter(&query)?;
    let page = filter.page;
    let result = repo.search_rooms(&filter).await?;
    Ok(room_list(result.items, result.total, page))
}

pub async fn stats<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    homestay_id: i64,
) -> ServiceResult<RoomStats> {
    owned_homestay(repo, homestay_id, actor).await?;
    let rooms = repo.rooms_for_homestay(homestay_id).await?;

    let mut stats = RoomStats {
        total_rooms: rooms.len() as i64,
        ..Default::default()
    };
    let mut bookings: HashMap<i64, Booking> = HashMap::new();
    let mut price_sum = 0.0;
    for room in &rooms {
        price_sum += room.price;
        match room.status {
            RoomStatus::Available => stats.available_rooms += 1,
            RoomStatus::Occupied => stats.occupied_rooms += 1,
            RoomStatus::Maintenance => stats.maintenance_rooms += 1,
        }
        for booking in repo.bookings_for_room(room.id).await? {
            bookings.entry(booking.id).or_insert(booking);
        }
    }
    if !rooms.is_empty() {
        stats.average_price = price_sum / rooms.len() as f64;
        stats.occupancy_rate = stats.occupied_rooms as f64 / rooms.len() as f64 * 100.0;
    }
    stats.total_revenue = bookings
        .values()
        .filter(|b| b.status.is_revenue())
        .map(|b| b.total_amount)
        .sum();
    Ok(stats)
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub async fn create_availability<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    input: CreateAvailabilityInput,
) -> ServiceResult<RoomAvailability> {
    let date = parse_date(&input.date, messages::INVALID_DATA)?;
    let status: AvailabilityStatus = parse_text(&input.status)?;
    let price = check_price(input.price)?;
    let (room, _) = owned_room(repo, input.room_id, actor).await?;
    if date < today() {
        warn!(room_id = room.id, %date, "availability in the past rejected");
        return Err(ServiceError::validation(messages::PAST_AVAILABILITY));
    }

    let availability = repo
        .create_availability(&NewAvailability {
            room_id: room.id,
            date,
            status,
            price,
        })
        .await
        .map_err(conflicting(messages::AVAILABILITY_EXISTS))?;
    info!(room_id = room.id, %date, status = %status, "availability created");
    Ok(availability)
}

pub async fn update_availability<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    availability_id: i64,
    input: UpdateAvailabilityInput,
) -> ServiceResult<RoomAvailability> {
    let changes = AvailabilityChanges {
        status: parse_optional(input.status.as_deref())?,
        price: check_price(input.price)?,
    };
    if changes.is_empty() {
        return Err(ServiceError::validation(messages::NOTHING_TO_UPDATE));
    }
    let current = repo
        .get_availability(require_id(availability_id)?)
        .await
        .map_err(missing(messages::AVAILABILITY_NOT_FOUND))?;
    owned_room(repo, current.room_id, actor).await?;

    let availability = repo
        .update_availability(availability_id, &changes)
        .await
        .map_err(missing(messages::AVAILABILITY_NOT_FOUND))?;
    info!(availability_id, "availability updated");
    Ok(availability)
}

/// Upsert every date of `[start, end]` except the excluded ones.
pub async fn bulk_availability<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    input: BulkAvailabilityInput,
) -> ServiceResult<BulkAvailabilityResult> {
    let start = parse_date(&input.start_date, messages::INVALID_DATA)?;
    let end = parse_date(&input.end_date, messages::INVALID_DATA)?;
    if start > end || (end - start).num_days() >= MAX_BULK_DAYS {
        return Err(ServiceError::validation(messages::INVALID_DATA));
    }
    if start < today() {
        return Err(ServiceError::validation(messages::PAST_AVAILABILITY));
    }
    let status: AvailabilityStatus = parse_text(&input.status)?;
    let price = check_price(input.price)?;
    let excluded = input
        .exclude_dates
        .iter()
        .map(|d| parse_date(d, messages::INVALID_DATA))
        .collect::<ServiceResult<HashSet<NaiveDate>>>()?;
    let (room, _) = owned_room(repo, input.room_id, actor).await?;

    let entries: Vec<NewAvailability> = start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !excluded.contains(d))
        .map(|date| NewAvailability {
            room_id: room.id,
            date,
            status,
            price,
        })
        .collect();
    let updated = repo.upsert_availabilities(&entries).await?;
    info!(room_id = room.id, %start, %end, updated, "availability range written");
    Ok(BulkAvailabilityResult { updated })
}
