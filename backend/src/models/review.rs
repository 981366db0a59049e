use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: i64,
    pub booking_id: i64,
    pub homestay_id: i64,
    #[serde(rename = "guestId")]
    pub user_id: i64,
    pub guest_name: Option<String>,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub booking_id: i64,
    pub homestay_id: i64,
    pub user_id: i64,
    pub rating: i32,
    pub comment: String,
}

/// Aggregate rating of a set of reviews.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RatingSummary {
    pub average: f64,
    pub count: i64,
}

impl RatingSummary {
    pub fn from_reviews(reviews: &[Review]) -> Self {
        if reviews.is_empty() {
            return Self::default();
        }
        let sum: i64 = reviews.iter().map(|r| i64::from(r.rating)).sum();
        let count = reviews.len() as i64;
        Self {
            average: sum as f64 / count as f64,
            count,
        }
    }
}
