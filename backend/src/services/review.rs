//! Guest reviews. A booking carries at most one review.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::{conflicting, missing, ServiceError, ServiceResult};
use super::{messages, Actor};
use crate::db::repository::FullRepository;
use crate::models::{NewReview, Review, MAX_RATING, MIN_RATING};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewInput {
    #[serde(default)]
    pub booking_id: i64,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub rating: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewEnvelope {
    pub review: Review,
}

pub async fn create<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    input: CreateReviewInput,
) -> ServiceResult<ReviewEnvelope> {
    let comment = input.comment.trim();
    if input.booking_id <= 0
        || comment.is_empty()
        || !(MIN_RATING..=MAX_RATING).contains(&input.rating)
    {
        return Err(ServiceError::validation(messages::REVIEW_FIELDS));
    }

    let booking = repo
        .get_booking(input.booking_id)
        .await
        .map_err(missing(messages::BOOKING_NOT_FOUND))?;
    if !booking.email.eq_ignore_ascii_case(&actor.email) {
        warn!(
            booking_id = booking.id,
            user_id = actor.user_id,
            "review on a booking made by someone else"
        );
        return Err(ServiceError::forbidden());
    }
    if repo.booking_rooms(booking.id).await?.is_empty() {
        return Err(ServiceError::validation(messages::BOOKING_WITHOUT_ROOMS));
    }

    let review = repo
        .create_review(&NewReview {
            booking_id: booking.id,
            homestay_id: booking.homestay_id,
            user_id: actor.user_id,
            rating: input.rating,
            comment: comment.to_string(),
        })
        .await
        .map_err(conflicting(messages::REVIEW_EXISTS))?;
    info!(
        review_id = review.id,
        booking_id = booking.id,
        rating = review.rating,
        "review created"
    );
    Ok(ReviewEnvelope { review })
}
