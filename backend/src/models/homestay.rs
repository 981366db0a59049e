use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::PageRequest;
use crate::define_text_enum;

define_text_enum!(
    /// Only `active` homestays are visible to guests.
    HomestayStatus {
        Active => "active",
        Inactive => "inactive",
    }
);

impl HomestayStatus {
    pub fn toggled(&self) -> Self {
        match self {
            HomestayStatus::Active => HomestayStatus::Inactive,
            HomestayStatus::Inactive => HomestayStatus::Active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Homestay {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub address: String,
    pub city: String,
    pub district: String,
    pub ward: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "hostId")]
    pub owner_id: i64,
    pub status: HomestayStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewHomestay {
    pub name: String,
    pub description: String,
    pub address: String,
    pub city: String,
    pub district: String,
    pub ward: String,
    pub latitude: f64,
    pub longitude: f64,
    pub owner_id: i64,
    pub status: HomestayStatus,
}

/// Partial update; only `Some` fields are written.
#[derive(Debug, Clone, Default)]
pub struct HomestayChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub ward: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: Option<HomestayStatus>,
}

impl HomestayChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.address.is_none()
            && self.city.is_none()
            && self.district.is_none()
            && self.ward.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
            && self.status.is_none()
    }
}

/// Listing filter. Text filters match case-insensitively on substrings.
#[derive(Debug, Clone, Default)]
pub struct HomestayFilter {
    pub owner_id: Option<i64>,
    pub name: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub status: Option<HomestayStatus>,
    pub page: PageRequest,
}

/// Stay window used by the availability search. Missing bounds default to
/// an empty window, which no booking overlaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StayQuery {
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guests: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_flips_status() {
        assert_eq!(HomestayStatus::Active.toggled(), HomestayStatus::Inactive);
        assert_eq!(HomestayStatus::Inactive.toggled(), HomestayStatus::Active);
    }

    #[test]
    fn test_empty_changes() {
        assert!(HomestayChanges::default().is_empty());
        let changes = HomestayChanges {
            latitude: Some(10.5),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }
}
