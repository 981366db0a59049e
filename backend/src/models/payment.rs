use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::PageRequest;
use crate::define_text_enum;

define_text_enum!(
    PaymentStatus {
        Pending => "pending",
        Completed => "completed",
        Failed => "failed",
        Refunded => "refunded",
    }
);

/// A recorded payment. `booking_code` is joined from the booking row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    pub booking_id: i64,
    pub booking_code: String,
    pub amount: f64,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub transaction_id: String,
    pub payment_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Payment insert payload; the booking id is supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub amount: f64,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub transaction_id: String,
    pub payment_date: DateTime<Utc>,
}

impl NewPayment {
    /// A settled payment stamped now with a fresh transaction id.
    pub fn completed(amount: f64, payment_method: impl Into<String>) -> Self {
        Self {
            amount,
            payment_method: payment_method.into(),
            payment_status: PaymentStatus::Completed,
            transaction_id: format!("TX-{}", uuid::Uuid::new_v4().simple()),
            payment_date: Utc::now(),
        }
    }
}

/// Payment listing filter. `owner_id` scopes to bookings on a host's homestays.
#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub owner_id: Option<i64>,
    pub booking_code: Option<String>,
    pub method: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub page: PageRequest,
}
