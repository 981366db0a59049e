//! Payment persistence.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{NewPayment, Page, Payment, PaymentFilter};

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create_payment(&self, booking_id: i64, payment: &NewPayment)
        -> RepositoryResult<Payment>;

    /// Payments of one booking, newest first.
    async fn payments_for_booking(&self, booking_id: i64) -> RepositoryResult<Vec<Payment>>;

    /// Filtered listing ordered by `created_at` DESC.
    ///
    /// `booking_code` matches as a substring; the date bounds apply to
    /// `payment_date` inclusively.
    async fn search_payments(&self, filter: &PaymentFilter) -> RepositoryResult<Page<Payment>>;
}
