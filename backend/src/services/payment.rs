//! Payment listing for hosts.

use serde::{Deserialize, Serialize};

use super::booking::BookingScope;
use super::error::ServiceResult;
use super::homestay::parse_date;
use super::{messages, Actor};
use crate::db::repository::FullRepository;
use crate::models::{PageRequest, Payment, PaymentFilter, PaymentStatus, DEFAULT_PAGE_SIZE};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    pub id: i64,
    pub booking_code: String,
    pub booking_id: i64,
    pub amount: f64,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub transaction_id: String,
    pub payment_date: String,
}

impl From<Payment> for PaymentView {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            booking_code: p.booking_code,
            booking_id: p.booking_id,
            amount: p.amount,
            payment_method: p.payment_method,
            payment_status: p.payment_status,
            transaction_id: p.transaction_id,
            payment_date: p.payment_date.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQuery {
    pub booking_code: Option<String>,
    pub method: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentListResponse {
    pub payments: Vec<PaymentView>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Payments on bookings of the host's homestays, newest first.
pub async fn filter_for_host<R: FullRepository + ?Sized>(
    repo: &R,
    actor: &Actor,
    query: PaymentQuery,
) -> ServiceResult<PaymentListResponse> {
    let owner_id = match BookingScope::of(actor) {
        BookingScope::Host(id) => id,
        BookingScope::Guest(_) => return Err(super::ServiceError::forbidden()),
    };
    let page = PageRequest::new(query.page, query.page_size, DEFAULT_PAGE_SIZE);
    let date_from = match non_blank(query.date_from) {
        Some(v) => Some(parse_date(&v, messages::INVALID_DATA)?),
        None => None,
    };
    let date_to = match non_blank(query.date_to) {
        Some(v) => Some(parse_date(&v, messages::INVALID_DATA)?),
        None => None,
    };
    let result = repo
        .search_payments(&PaymentFilter {
            owner_id: Some(owner_id),
            booking_code: non_blank(query.booking_code),
            method: non_blank(query.method),
            date_from,
            date_to,
            page,
        })
        .await?;
    Ok(PaymentListResponse {
        payments: result.items.into_iter().map(PaymentView::from).collect(),
        total: result.total,
        page: page.page,
        page_size: page.page_size,
    })
}
