//! Homestay use cases for hosts and the public catalogue.

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};
use validator::Validate;

use super::error::{missing, ServiceError, ServiceResult};
use super::{messages, owned_homestay, require_id, Actor};
use crate::db::repository::FullRepository;
use crate::models::{
    total_pages, Booking, Homestay, HomestayChanges, HomestayFilter, HomestayStatus,
    NewHomestay, PageRequest, RatingSummary, Review, Room, RoomStatus, StayQuery,
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};

pub const DEFAULT_TOP_LIMIT: i64 = 8;

/// A homestay with its rooms and review aggregate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomestayView {
    #[serde(flatten)]
    pub homestay: Homestay,
    pub rooms: Vec<Room>,
    pub reviews: Vec<Review>,
    pub rating: f64,
    pub total_reviews: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HomestayEnvelope {
    pub homestay: HomestayView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomestayListResponse {
    pub homestays: Vec<HomestayView>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_page: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomestayStats {
    pub total_homestays: i64,
    pub active_homestays: i64,
    pub total_rooms: i64,
    pub available_rooms: i64,
    pub total_bookings: i64,
    pub total_revenue: f64,
    pub monthly_revenue: f64,
    /// Percentage of rooms not currently `available`.
    pub occupancy_rate: f64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateHomestayInput {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(length(min = 10, max = 1000))]
    pub description: String,
    #[validate(length(min = 5, max = 200))]
    pub address: String,
    #[validate(length(min = 2, max = 50))]
    pub city: String,
    #[validate(length(min = 2, max = 50))]
    pub district: String,
    #[validate(length(min = 2, max = 50))]
    pub ward: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateHomestayInput {
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 10, max = 1000))]
    pub description: Option<String>,
    #[validate(length(min = 5, max = 200))]
    pub address: Option<String>,
    #[validate(length(min = 2, max = 50))]
    pub city: Option<String>,
    #[validate(length(min = 2, max = 50))]
    pub district: Option<String>,
    #[validate(length(min = 2, max = 50))]
    pub ward: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostHomestayQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub search: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicHomestayQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub search: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub guests: Option<i32>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub(crate) fn parse_status(value: &str) -> ServiceResult<HomestayStatus> {
    value
        .parse()
        .map_err(|_| ServiceError::validation(messages::INVALID_DATA))
}

pub(crate) fn parse_date(value: &str, message: &'static str) -> ServiceResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ServiceError::validation(message))
}

/// Attach rooms, reviews and the average rating.
async fn decorate<R: FullRepository + ?Sized>(
    repo: &R,
    homestay: Homestay,
    with_rooms: bool,
) -> ServiceResult<HomestayView> {
    let rooms = if with_rooms {
        repo.rooms_for_homestay(homestay.id).await?
    } else {
        Vec::new()
    };
    let reviews = repo.reviews_for_homestay(homestay.id).await?;
    let summary = RatingSummary::from_reviews(&reviews);
    Ok(HomestayView {
        homestay,
        rooms,
        reviews,
        rating: summary.average,
        total_reviews: summary.count,
    })
}

async fn decorate_all<R: FullRepository + ?Sized>(
    repo: &R,
    homestays: Vec<Homestay>,
) -> ServiceResult<Vec<HomestayView>> {
    let mut views = Vec::with_capacity(homestays.len());
    for homestay in homestays {
        views.push(decorate(repo, homestay, true).await?);
    }
    Ok(views)
}

pub async fn create<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    input: CreateHomestayInput,
) -> ServiceResult<HomestayEnvelope> {
    input.validate()?;
    let homestay = repo
        .create_homestay(&NewHomestay {
            name: input.name,
            description: input.description,
            address: input.address,
            city: input.city,
            district: input.district,
            ward: input.ward,
            latitude: input.latitude,
            longitude: input.longitude,
            owner_id: actor.user_id,
            status: HomestayStatus::Inactive,
        })
        .await?;
    info!(homestay_id = homestay.id, owner_id = actor.user_id, "homestay created");
    Ok(HomestayEnvelope {
        homestay: decorate(repo, homestay, false).await?,
    })
}

pub async fn get_for_host<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    homestay_id: i64,
) -> ServiceResult<HomestayEnvelope> {
    let homestay = owned_homestay(repo, homestay_id, actor).await?;
    Ok(HomestayEnvelope {
        homestay: decorate(repo, homestay, true).await?,
    })
}

pub async fn list_for_host<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    query: HostHomestayQuery,
) -> ServiceResult<HomestayListResponse> {
    let status = match non_blank(query.status) {
        Some(s) => Some(parse_status(&s)?),
        None => None,
    };
    let page = PageRequest::new(query.page, query.page_size, DEFAULT_PAGE_SIZE);
    let result = repo
        .search_homestays(&HomestayFilter {
            owner_id: Some(actor.user_id),
            name: non_blank(query.search),
            city: non_blank(query.city),
            district: non_blank(query.district),
            status,
            page,
        })
        .await?;
    Ok(HomestayListResponse {
        homestays: decorate_all(repo, result.items).await?,
        total: result.total,
        page: page.page,
        page_size: page.page_size,
        total_page: total_pages(result.total, page.page_size),
    })
}

pub async fn update<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    homestay_id: i64,
    input: UpdateHomestayInput,
) -> ServiceResult<HomestayEnvelope> {
    input.validate()?;
    let status = match input.status {
        Some(ref s) => Some(parse_status(s)?),
        None => None,
    };
    let changes = HomestayChanges {
        name: input.name,
        description: input.description,
        address: input.address,
        city: input.city,
        district: input.district,
        ward: input.ward,
        latitude: input.latitude,
        longitude: input.longitude,
        status,
    };
    if changes.is_empty() {
        return Err(ServiceError::validation(messages::NOTHING_TO_UPDATE));
    }

    owned_homestay(repo, homestay_id, actor).await?;
    let homestay = repo
        .update_homestay(homestay_id, &changes)
        .await
        .map_err(missing(messages::HOMESTAY_NOT_FOUND))?;
    info!(homestay_id, "homestay updated");
    Ok(HomestayEnvelope {
        homestay: decorate(repo, homestay, false).await?,
    })
}

pub async fn delete<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    homestay_id: i64,
) -> ServiceResult<()> {
    owned_homestay(repo, homestay_id, actor).await?;
    repo.delete_homestay(homestay_id)
        .await
        .map_err(missing(messages::HOMESTAY_NOT_FOUND))?;
    info!(homestay_id, "homestay deleted");
    Ok(())
}

pub async fn toggle_status<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    homestay_id: i64,
) -> ServiceResult<HomestayEnvelope> {
    let current = owned_homestay(repo, homestay_id, actor).await?;
    let homestay = repo
        .update_homestay(
            homestay_id,
            &HomestayChanges {
                status: Some(current.status.toggled()),
                ..Default::default()
            },
        )
        .await
        .map_err(missing(messages::HOMESTAY_NOT_FOUND))?;
    info!(homestay_id, status = %homestay.status, "homestay status toggled");
    Ok(HomestayEnvelope {
        homestay: decorate(repo, homestay, false).await?,
    })
}

/// Fold the rooms and bookings of `homestays` into one set of figures.
///
/// A booking spanning several rooms is counted once.
async fn collect_stats<R: FullRepository + ?Sized>(
    repo: &R,
    homestays: &[Homestay],
) -> ServiceResult<HomestayStats> {
    let today = Utc::now().date_naive();
    let mut stats = HomestayStats {
        total_homestays: homestays.len() as i64,
        active_homestays: homestays
            .iter()
            .filter(|h| h.status == HomestayStatus::Active)
            .count() as i64,
        ..Default::default()
    };

    let mut bookings: HashMap<i64, Booking> = HashMap::new();
    for homestay in homestays {
        let rooms = repo.rooms_for_homestay(homestay.id).await?;
        stats.total_rooms += rooms.len() as i64;
        stats.available_rooms += rooms
            .iter()
            .filter(|r| r.status == RoomStatus::Available)
            .count() as i64;
        for room in &rooms {
            for booking in repo.bookings_for_room(room.id).await? {
                bookings.entry(booking.id).or_insert(booking);
            }
        }
    }

    stats.total_bookings = bookings.len() as i64;
    for booking in bookings.values().filter(|b| b.status.is_revenue()) {
        stats.total_revenue += booking.total_amount;
        if booking.check_in.year() == today.year() && booking.check_in.month() == today.month() {
            stats.monthly_revenue += booking.total_amount;
        }
    }
    if stats.total_rooms > 0 {
        stats.occupancy_rate = (stats.total_rooms - stats.available_rooms) as f64
            / stats.total_rooms as f64
            * 100.0;
    }
    Ok(stats)
}

pub async fn stats_for_host<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
) -> ServiceResult<HomestayStats> {
    let mut homestays = Vec::new();
    let mut page = 1;
    loop {
        let result = repo
            .search_homestays(&HomestayFilter {
                owner_id: Some(actor.user_id),
                page: PageRequest::fixed(page, MAX_PAGE_SIZE),
                ..Default::default()
            })
            .await?;
        let fetched = result.items.len() as i64;
        homestays.extend(result.items);
        if fetched < MAX_PAGE_SIZE || homestays.len() as i64 >= result.total {
            break;
        }
        page += 1;
    }
    collect_stats(repo, &homestays).await
}

pub async fn stats_for_homestay<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    homestay_id: i64,
) -> ServiceResult<HomestayStats> {
    let homestay = owned_homestay(repo, homestay_id, actor).await?;
    collect_stats(repo, std::slice::from_ref(&homestay)).await
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewList {
    pub reviews: Vec<Review>,
    pub total: i64,
    pub rating: f64,
}

pub async fn reviews<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    homestay_id: i64,
) -> ServiceResult<ReviewList> {
    owned_homestay(repo, homestay_id, actor).await?;
    let reviews = repo.reviews_for_homestay(homestay_id).await?;
    let summary = RatingSummary::from_reviews(&reviews);
    Ok(ReviewList {
        reviews,
        total: summary.count,
        rating: summary.average,
    })
}

/// Active homestays, optionally narrowed to those with free rooms for a stay.
pub async fn public_list<R: FullRepository + ?Sized>(
    repo: &R,
    query: PublicHomestayQuery,
) -> ServiceResult<HomestayListResponse> {
    let page = PageRequest::new(query.page, query.page_size, DEFAULT_PAGE_SIZE);
    let filter = HomestayFilter {
        owner_id: None,
        name: non_blank(query.search),
        city: non_blank(query.city),
        district: non_blank(query.district),
        status: Some(HomestayStatus::Active),
        page,
    };

    let check_in = match non_blank(query.check_in) {
        Some(s) => Some(parse_date(&s, messages::BAD_CHECK_IN)?),
        None => None,
    };
    let check_out = match non_blank(query.check_out) {
        Some(s) => Some(parse_date(&s, messages::BAD_CHECK_OUT)?),
        None => None,
    };
    if let (Some(a), Some(b)) = (check_in, check_out) {
        if a >= b {
            return Err(ServiceError::validation(messages::DATE_ORDER));
        }
    }

    let result = if check_in.is_some() || check_out.is_some() || query.guests.is_some() {
        let stay = StayQuery {
            check_in,
            check_out,
            guests: query.guests.unwrap_or(0).max(0),
        };
        repo.search_available_homestays(&filter, &stay).await?
    } else {
        repo.search_homestays(&filter).await?
    };

    Ok(HomestayListResponse {
        homestays: decorate_all(repo, result.items).await?,
        total: result.total,
        page: page.page,
        page_size: page.page_size,
        total_page: total_pages(result.total, page.page_size),
    })
}

/// Public view of one homestay. Inactive homestays are hidden.
pub async fn public_detail<R: FullRepository + ?Sized>(
    repo: &R,
    homestay_id: i64,
) -> ServiceResult<HomestayEnvelope> {
    let homestay = repo
        .get_homestay(require_id(homestay_id)?)
        .await
        .map_err(missing(messages::HOMESTAY_NOT_FOUND))?;
    if homestay.status != HomestayStatus::Active {
        warn!(homestay_id, "public access to inactive homestay");
        return Err(ServiceError::not_found(messages::HOMESTAY_NOT_FOUND));
    }
    Ok(HomestayEnvelope {
        homestay: decorate(repo, homestay, true).await?,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct TopHomestays {
    pub homestays: Vec<HomestayView>,
}

pub async fn top<R: FullRepository + ?Sized>(
    repo: &R,
    limit: Option<i64>,
) -> ServiceResult<TopHomestays> {
    let limit = limit
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_TOP_LIMIT)
        .min(MAX_PAGE_SIZE);
    let homestays = repo.top_homestays(limit).await?;
    Ok(TopHomestays {
        homestays: decorate_all(repo, homestays).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use crate::db::repository::{BookingRepository, ReviewRepository, RoomRepository};
    use crate::models::*;
    use crate::services::fixtures;

    fn create_input() -> CreateHomestayInput {
        CreateHomestayInput {
            name: "Sapa Cloud House".into(),
            description: "Wooden house facing the rice terraces".into(),
            address: "5 Fansipan Road".into(),
            city: "Sapa".into(),
            district: "Sa Pa".into(),
            ward: "Cau May".into(),
            latitude: 22.33,
            longitude: 103.84,
        }
    }

    #[tokio::test]
    async fn test_created_homestay_is_inactive() {
        let repo = LocalRepository::new();
        let host = fixtures::user(&repo, "host@example.com", UserRole::Host).await;
        let created = create(&repo, &host, create_input()).await.unwrap();
        assert_eq!(created.homestay.homestay.status, HomestayStatus::Inactive);
        assert_eq!(created.homestay.homestay.owner_id, host.user_id);
    }

    #[tokio::test]
    async fn test_short_description_is_rejected() {
        let repo = LocalRepository::new();
        let host = fixtures::user(&repo, "host@example.com", UserRole::Host).await;
        let mut input = create_input();
        input.description = "short".into();
        let err = create(&repo, &host, input).await.unwrap_err();
        assert_eq!(err.public_message(), messages::INVALID_DATA);
    }

    #[tokio::test]
    async fn test_other_host_is_forbidden() {
        let repo = LocalRepository::new();
        let owner = fixtures::user(&repo, "owner@example.com", UserRole::Host).await;
        let other = fixtures::user(&repo, "other@example.com", UserRole::Host).await;
        let homestay = fixtures::homestay(&repo, &owner, HomestayStatus::Active).await;

        let err = get_for_host(&repo, &other, homestay.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        let err = delete(&repo, &other, homestay.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        let err = get_for_host(&repo, &owner, 999).await.unwrap_err();
        assert_eq!(err.public_message(), messages::HOMESTAY_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_without_fields() {
        let repo = LocalRepository::new();
        let host = fixtures::user(&repo, "host@example.com", UserRole::Host).await;
        let homestay = fixtures::homestay(&repo, &host, HomestayStatus::Active).await;
        let err = update(&repo, &host, homestay.id, UpdateHomestayInput::default())
            .await
            .unwrap_err();
        assert_eq!(err.public_message(), messages::NOTHING_TO_UPDATE);

        let err = update(
            &repo,
            &host,
            homestay.id,
            UpdateHomestayInput {
                status: Some("archived".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.public_message(), messages::INVALID_DATA);
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_status() {
        let repo = LocalRepository::new();
        let host = fixtures::user(&repo, "host@example.com", UserRole::Host).await;
        let homestay = fixtures::homestay(&repo, &host, HomestayStatus::Inactive).await;
        let first = toggle_status(&repo, &host, homestay.id).await.unwrap();
        assert_eq!(first.homestay.homestay.status, HomestayStatus::Active);
        let second = toggle_status(&repo, &host, homestay.id).await.unwrap();
        assert_eq!(second.homestay.homestay.status, HomestayStatus::Inactive);
    }

    #[tokio::test]
    async fn test_host_list_pagination() {
        let repo = LocalRepository::new();
        let host = fixtures::user(&repo, "host@example.com", UserRole::Host).await;
        for _ in 0..3 {
            fixtures::homestay(&repo, &host, HomestayStatus::Active).await;
        }
        let list = list_for_host(
            &repo,
            &host,
            HostHomestayQuery {
                page: Some(2),
                page_size: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(list.total, 3);
        assert_eq!(list.homestays.len(), 1);
        assert_eq!(list.total_page, 2);
    }

    #[tokio::test]
    async fn test_stats_count_revenue_and_occupancy() {
        let repo = LocalRepository::new();
        let host = fixtures::user(&repo, "host@example.com", UserRole::Host).await;
        let homestay = fixtures::homestay(&repo, &host, HomestayStatus::Active).await;
        let r1 = fixtures::room(&repo, homestay.id, 300.0, 2).await;
        let r2 = fixtures::room(&repo, homestay.id, 500.0, 2).await;
        repo.update_room(
            r2.id,
            &RoomChanges {
                status: Some(RoomStatus::Occupied),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let today = Utc::now().date_naive();
        for (code, status, total) in [
            ("BK1", BookingStatus::Confirmed, 600.0),
            ("BK2", BookingStatus::Cancelled, 900.0),
        ] {
            repo.create_booking(&NewBooking {
                booking_code: code.into(),
                homestay_id: homestay.id,
                name: "Guest".into(),
                email: "g@example.com".into(),
                phone: String::new(),
                check_in: today,
                check_out: today + chrono::Duration::days(2),
                num_guests: 2,
                total_amount: total,
                paid_amount: 0.0,
                payment_method: "cash".into(),
                status,
                rooms: vec![
                    NewBookingRoom {
                        room_id: r1.id,
                        room_name: r1.name.clone(),
                        room_type: "double".into(),
                        capacity: 2,
                        price: 300.0,
                    },
                    NewBookingRoom {
                        room_id: r2.id,
                        room_name: r2.name.clone(),
                        room_type: "double".into(),
                        capacity: 2,
                        price: 500.0,
                    },
                ],
                initial_payment: None,
            })
            .await
            .unwrap();
        }

        let stats = stats_for_host(&repo, &host).await.unwrap();
        assert_eq!(stats.total_homestays, 1);
        assert_eq!(stats.active_homestays, 1);
        assert_eq!(stats.total_rooms, 2);
        assert_eq!(stats.available_rooms, 1);
        assert_eq!(stats.total_bookings, 2);
        assert!((stats.total_revenue - 600.0).abs() < f64::EPSILON);
        assert!((stats.monthly_revenue - 600.0).abs() < f64::EPSILON);
        assert!((stats.occupancy_rate - 50.0).abs() < f64::EPSILON);

        let single = stats_for_homestay(&repo, &host, homestay.id).await.unwrap();
        assert_eq!(single, stats);
    }

    #[tokio::test]
    async fn test_public_views_hide_inactive() {
        let repo = LocalRepository::new();
        let host = fixtures::user(&repo, "host@example.com", UserRole::Host).await;
        let active = fixtures::homestay(&repo, &host, HomestayStatus::Active).await;
        let hidden = fixtures::homestay(&repo, &host, HomestayStatus::Inactive).await;
        fixtures::room(&repo, active.id, 250.0, 2).await;

        let list = public_list(&repo, PublicHomestayQuery::default()).await.unwrap();
        assert_eq!(list.total, 1);
        assert_eq!(list.homestays[0].homestay.id, active.id);
        assert_eq!(list.homestays[0].rooms.len(), 1);

        assert!(public_detail(&repo, active.id).await.is_ok());
        let err = public_detail(&repo, hidden.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_public_list_filters_by_capacity() {
        let repo = LocalRepository::new();
        let host = fixtures::user(&repo, "host@example.com", UserRole::Host).await;
        let small = fixtures::homestay(&repo, &host, HomestayStatus::Active).await;
        let large = fixtures::homestay(&repo, &host, HomestayStatus::Active).await;
        fixtures::room(&repo, small.id, 200.0, 2).await;
        fixtures::room(&repo, large.id, 200.0, 4).await;
        fixtures::room(&repo, large.id, 200.0, 2).await;

        let list = public_list(
            &repo,
            PublicHomestayQuery {
                check_in: Some("2026-08-01".into()),
                check_out: Some("2026-08-03".into()),
                guests: Some(5),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(list.total, 1);
        assert_eq!(list.homestays[0].homestay.id, large.id);

        let err = public_list(
            &repo,
            PublicHomestayQuery {
                check_in: Some("2026-08-03".into()),
                check_out: Some("2026-08-01".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.public_message(), messages::DATE_ORDER);
    }

    #[tokio::test]
    async fn test_top_orders_by_rating_total() {
        let repo = LocalRepository::new();
        let host = fixtures::user(&repo, "host@example.com", UserRole::Host).await;
        let guest = fixtures::user(&repo, "guest@example.com", UserRole::Guest).await;
        let first = fixtures::homestay(&repo, &host, HomestayStatus::Active).await;
        let second = fixtures::homestay(&repo, &host, HomestayStatus::Active).await;
        let room = fixtures::room(&repo, second.id, 100.0, 2).await;
        let booking = repo
            .create_booking(&NewBooking {
                booking_code: "BKTOP".into(),
                homestay_id: second.id,
                name: "Guest".into(),
                email: guest.email.clone(),
                phone: String::new(),
                check_in: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                check_out: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
                num_guests: 1,
                total_amount: 100.0,
                paid_amount: 100.0,
                payment_method: "cash".into(),
                status: BookingStatus::Completed,
                rooms: vec![NewBookingRoom {
                    room_id: room.id,
                    room_name: room.name.clone(),
                    room_type: "double".into(),
                    capacity: 2,
                    price: 100.0,
                }],
                initial_payment: None,
            })
            .await
            .unwrap();
        repo.create_review(&NewReview {
            booking_id: booking.id,
            homestay_id: second.id,
            user_id: guest.user_id,
            rating: 5,
            comment: "Lovely".into(),
        })
        .await
        .unwrap();

        let ranked = top(&repo, None).await.unwrap();
        assert_eq!(ranked.homestays[0].homestay.id, second.id);
        assert_eq!(ranked.homestays[1].homestay.id, first.id);
        assert!((ranked.homestays[0].rating - 5.0).abs() < f64::EPSILON);
    }
}
