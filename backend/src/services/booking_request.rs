//! Booking requests: a guest asks for a room, the host answers.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use super::error::{missing, ServiceError, ServiceResult};
use super::homestay::parse_date;
use super::{messages, require_id, Actor};
use crate::db::repository::FullRepository;
use crate::models::{
    nights_between, BookingRequest, BookingRequestChanges, BookingRequestStatus, HomestayStatus,
    NewBookingRequest,
};

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequestInput {
    #[serde(default)]
    pub room_id: i64,
    #[serde(default)]
    pub check_in: String,
    #[serde(default)]
    pub check_out: String,
    #[validate(range(min = 1, max = 100))]
    #[serde(default = "one")]
    pub num_guests: i32,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub guest_note: String,
}

fn one() -> i32 {
    1
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingRequestInput {
    pub status: Option<String>,
    pub host_note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingRequestEnvelope {
    pub request: BookingRequest,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingRequestList {
    pub requests: Vec<BookingRequest>,
    pub total: usize,
}

impl From<Vec<BookingRequest>> for BookingRequestList {
    fn from(requests: Vec<BookingRequest>) -> Self {
        Self {
            total: requests.len(),
            requests,
        }
    }
}

pub async fn create<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    input: CreateBookingRequestInput,
) -> ServiceResult<BookingRequestEnvelope> {
    if input.check_in.trim().is_empty() || input.check_out.trim().is_empty() {
        return Err(ServiceError::validation(messages::REQUIRED_FIELDS));
    }
    input.validate()?;
    let check_in = parse_date(&input.check_in, messages::BAD_CHECK_IN)?;
    let check_out = parse_date(&input.check_out, messages::BAD_CHECK_OUT)?;
    if check_in >= check_out {
        return Err(ServiceError::validation(messages::DATE_ORDER));
    }

    let room = repo
        .get_room(require_id(input.room_id)?)
        .await
        .map_err(missing(messages::ROOM_NOT_FOUND))?;
    let homestay = repo
        .get_homestay(room.homestay_id)
        .await
        .map_err(missing(messages::HOMESTAY_NOT_FOUND))?;
    if homestay.status != HomestayStatus::Active {
        warn!(room_id = room.id, homestay_id = homestay.id, "request on inactive homestay");
        return Err(ServiceError::validation(messages::HOMESTAY_UNAVAILABLE));
    }

    let request = repo
        .create_booking_request(&NewBookingRequest {
            user_id: actor.user_id,
            room_id: room.id,
            check_in,
            check_out,
            num_guests: input.num_guests,
            total_amount: room.price * nights_between(check_in, check_out) as f64,
            guest_note: input.guest_note.trim().to_string(),
        })
        .await?;
    info!(request_id = request.id, room_id = room.id, "booking request created");
    Ok(BookingRequestEnvelope { request })
}

pub async fn list_for_guest<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
) -> ServiceResult<BookingRequestList> {
    Ok(repo.booking_requests_for_user(actor.user_id).await?.into())
}

pub async fn list_for_host<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
) -> ServiceResult<BookingRequestList> {
    Ok(repo.booking_requests_for_owner(actor.user_id).await?.into())
}

/// Host answer to a request on one of their rooms.
pub async fn update<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    request_id: i64,
    input: UpdateBookingRequestInput,
) -> ServiceResult<BookingRequestEnvelope> {
    let existing = repo
        .get_booking_request(require_id(request_id)?)
        .await
        .map_err(missing(messages::BOOKING_REQUEST_NOT_FOUND))?;
    let room = repo
        .get_room(existing.room_id)
        .await
        .map_err(missing(messages::ROOM_NOT_FOUND))?;
    super::owned_homestay(repo, room.homestay_id, actor).await?;

    let status = match input.status.as_deref().map(str::trim) {
        Some(s) => Some(
            s.parse::<BookingRequestStatus>()
                .map_err(|_| ServiceError::validation(messages::INVALID_STATUS))?,
        ),
        None => None,
    };
    let changes = BookingRequestChanges {
        status,
        host_note: input.host_note.map(|n| n.trim().to_string()),
        guest_note: None,
    };
    if changes.is_empty() {
        return Err(ServiceError::validation(messages::NOTHING_TO_UPDATE));
    }

    let request = repo
        .update_booking_request(existing.id, &changes)
        .await
        .map_err(missing(messages::BOOKING_REQUEST_NOT_FOUND))?;
    info!(request_id, status = %request.status, "booking request updated");
    Ok(BookingRequestEnvelope { request })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use crate::models::{Room, UserRole};
    use crate::services::fixtures;

    async fn setup(status: HomestayStatus) -> (LocalRepository, Actor, Actor, Room) {
        let repo = LocalRepository::new();
        let host = fixtures::user(&repo, "host@example.com", UserRole::Host).await;
        let guest = fixtures::user(&repo, "guest@example.com", UserRole::Guest).await;
        let homestay = fixtures::homestay(&repo, &host, status).await;
        let room = fixtures::room(&repo, homestay.id, 250.0, 3).await;
        (repo, host, guest, room)
    }

    fn input(room_id: i64) -> CreateBookingRequestInput {
        CreateBookingRequestInput {
            room_id,
            check_in: "2026-06-10".into(),
            check_out: "2026-06-14".into(),
            num_guests: 2,
            guest_note: "Late arrival".into(),
        }
    }

    #[tokio::test]
    async fn test_create_derives_total_and_is_pending() {
        let (repo, _, guest, room) = setup(HomestayStatus::Active).await;
        let created = create(&repo, &guest, input(room.id)).await.unwrap().request;
        assert_eq!(created.status, BookingRequestStatus::Pending);
        assert!((created.total_amount - 1000.0).abs() < f64::EPSILON);
        assert_eq!(created.user_id, guest.user_id);
    }

    #[tokio::test]
    async fn test_inactive_homestay_rejects_request() {
        let (repo, _, guest, room) = setup(HomestayStatus::Inactive).await;
        let err = create(&repo, &guest, input(room.id)).await.unwrap_err();
        assert_eq!(err.public_message(), messages::HOMESTAY_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_dates_checked_before_room() {
        let (repo, _, guest, _) = setup(HomestayStatus::Active).await;
        let mut bad = input(9999);
        bad.check_out = "2026-06-10".into();
        let err = create(&repo, &guest, bad).await.unwrap_err();
        assert_eq!(err.public_message(), messages::DATE_ORDER);

        let err = create(&repo, &guest, input(9999)).await.unwrap_err();
        assert_eq!(err.public_message(), messages::ROOM_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_host_answers_request() {
        let (repo, host, guest, room) = setup(HomestayStatus::Active).await;
        let created = create(&repo, &guest, input(room.id)).await.unwrap().request;

        assert_eq!(list_for_host(&repo, &host).await.unwrap().total, 1);
        assert_eq!(list_for_guest(&repo, &guest).await.unwrap().total, 1);

        let updated = update(
            &repo,
            &host,
            created.id,
            UpdateBookingRequestInput {
                status: Some("approved".into()),
                host_note: Some("See you soon".into()),
            },
        )
        .await
        .unwrap()
        .request;
        assert_eq!(updated.status, BookingRequestStatus::Approved);
        assert_eq!(updated.host_note, "See you soon");
    }

    #[tokio::test]
    async fn test_update_rejects_foreign_host_and_bad_status() {
        let (repo, host, guest, room) = setup(HomestayStatus::Active).await;
        let created = create(&repo, &guest, input(room.id)).await.unwrap().request;
        let other = fixtures::user(&repo, "other@example.com", UserRole::Host).await;

        let err = update(
            &repo,
            &other,
            created.id,
            UpdateBookingRequestInput {
                status: Some("rejected".into()),
                host_note: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let err = update(
            &repo,
            &host,
            created.id,
            UpdateBookingRequestInput {
                status: Some("done".into()),
                host_note: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.public_message(), messages::INVALID_STATUS);

        let err = update(&repo, &host, created.id, UpdateBookingRequestInput::default())
            .await
            .unwrap_err();
        assert_eq!(err.public_message(), messages::NOTHING_TO_UPDATE);
    }
}
