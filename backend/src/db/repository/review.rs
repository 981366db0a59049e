//! Review persistence.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{NewReview, Review};

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Insert a review.
    ///
    /// # Returns
    /// * `Err(RepositoryError::Conflict)` - If the booking already has a review
    async fn create_review(&self, review: &NewReview) -> RepositoryResult<Review>;

    /// Reviews of a homestay with guest names joined, newest first.
    async fn reviews_for_homestay(&self, homestay_id: i64) -> RepositoryResult<Vec<Review>>;

    async fn review_for_booking(&self, booking_id: i64) -> RepositoryResult<Option<Review>>;
}
