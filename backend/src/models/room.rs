use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::PageRequest;
use crate::define_text_enum;

define_text_enum!(
    RoomType {
        Single => "single",
        Double => "double",
        Family => "family",
        Dormitory => "dormitory",
    }
);

define_text_enum!(
    PriceType {
        PerNight => "per_night",
        PerPerson => "per_person",
    }
);

define_text_enum!(
    RoomStatus {
        Available => "available",
        Occupied => "occupied",
        Maintenance => "maintenance",
    }
);

define_text_enum!(
    /// Per-date state of a room calendar entry.
    AvailabilityStatus {
        Available => "available",
        Booked => "booked",
        Blocked => "blocked",
    }
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: i64,
    pub homestay_id: i64,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    pub capacity: i32,
    pub price: f64,
    pub price_type: PriceType,
    pub status: RoomStatus,
    pub images: Vec<String>,
    pub amenities: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homestay_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewRoom {
    pub homestay_id: i64,
    pub name: String,
    pub description: String,
    pub room_type: RoomType,
    pub capacity: i32,
    pub price: f64,
    pub price_type: PriceType,
    pub status: RoomStatus,
    pub images: Vec<String>,
    pub amenities: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RoomChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub room_type: Option<RoomType>,
    pub capacity: Option<i32>,
    pub price: Option<f64>,
    pub price_type: Option<PriceType>,
    pub status: Option<RoomStatus>,
    pub images: Option<Vec<String>>,
    pub amenities: Option<Vec<String>>,
}

impl RoomChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.room_type.is_none()
            && self.capacity.is_none()
            && self.price.is_none()
            && self.price_type.is_none()
            && self.status.is_none()
            && self.images.is_none()
            && self.amenities.is_none()
    }
}

/// Room listing filter. `owner_id` restricts to homestays owned by a host.
#[derive(Debug, Clone, Default)]
pub struct RoomFilter {
    pub homestay_id: Option<i64>,
    pub owner_id: Option<i64>,
    pub status: Option<RoomStatus>,
    pub room_type: Option<RoomType>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub page: PageRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomAvailability {
    pub id: i64,
    pub room_id: i64,
    pub date: NaiveDate,
    pub status: AvailabilityStatus,
    pub price: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAvailability {
    pub room_id: i64,
    pub date: NaiveDate,
    pub status: AvailabilityStatus,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct AvailabilityChanges {
    pub status: Option<AvailabilityStatus>,
    pub price: Option<f64>,
}

impl AvailabilityChanges {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.price.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_type_serializes_as_type() {
        let room = Room {
            id: 3,
            homestay_id: 1,
            name: "Garden view".into(),
            description: "Quiet double room".into(),
            room_type: RoomType::Double,
            capacity: 2,
            price: 450_000.0,
            price_type: PriceType::PerNight,
            status: RoomStatus::Available,
            images: vec!["a.jpg".into()],
            amenities: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
            homestay_name: None,
        };
        let json = serde_json::to_value(&room).unwrap();
        assert_eq!(json["type"], "double");
        assert_eq!(json["priceType"], "per_night");
        assert!(json.get("homestayName").is_none());
    }

    #[test]
    fn test_price_type_wire_names() {
        assert_eq!("per_person".parse::<PriceType>().unwrap(), PriceType::PerPerson);
        assert!("per_week".parse::<PriceType>().is_err());
    }
}
