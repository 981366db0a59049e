//! Service layer for business logic and orchestration.
//!
//! Services sit between the HTTP handlers and the repository traits. They
//! validate input, enforce role and ownership rules, compose repository
//! calls and shape the views handed back to clients. Every use case is a
//! free function generic over [`FullRepository`], so the same code runs on
//! the in-memory and the Postgres backend.

pub mod auth;
pub mod booking;
pub mod booking_request;
pub mod error;
pub mod homestay;
pub mod messages;
pub mod payment;
pub mod review;
pub mod room;

pub use auth::{AuthService, Claims, TokenPurpose};
pub use error::{ServiceError, ServiceResult};

use tracing::warn;

use crate::db::repository::FullRepository;
use crate::models::{Homestay, UserRole};

/// The authenticated caller of a use case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub email: String,
    pub role: UserRole,
}

impl Actor {
    pub fn is_host(&self) -> bool {
        self.role.is_host_like()
    }
}

/// Reject ids that can never name a stored row.
pub(crate) fn require_id(id: i64) -> ServiceResult<i64> {
    if id > 0 {
        Ok(id)
    } else {
        Err(ServiceError::validation(messages::INVALID_ID))
    }
}

/// Load a homestay and check that `actor` owns it.
pub(crate) async fn owned_homestay<R: FullRepository + ?Sized>(
    repo: &R,
    homestay_id: i64,
    actor: &Actor,
) -> ServiceResult<Homestay> {
    let homestay = repo
        .get_homestay(require_id(homestay_id)?)
        .await
        .map_err(error::missing(messages::HOMESTAY_NOT_FOUND))?;
    if homestay.owner_id != actor.user_id {
        warn!(
            homestay_id,
            user_id = actor.user_id,
            "access to a homestay owned by another host"
        );
        return Err(ServiceError::forbidden());
    }
    Ok(homestay)
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Seed helpers shared by the service tests.

    use super::Actor;
    use crate::db::repositories::LocalRepository;
    use crate::db::repository::{HomestayRepository, RoomRepository, UserRepository};
    use crate::models::*;

    pub async fn user(repo: &LocalRepository, email: &str, role: UserRole) -> Actor {
        let user = repo
            .create_user(&NewUser {
                name: format!("User {}", email),
                phone: None,
                email: email.to_string(),
                password_hash: String::new(),
                role,
                status: UserStatus::Active,
            })
            .await
            .unwrap();
        Actor {
            user_id: user.id,
            email: user.email,
            role: user.role,
        }
    }

    pub async fn homestay(
        repo: &LocalRepository,
        owner: &Actor,
        status: HomestayStatus,
    ) -> Homestay {
        repo.create_homestay(&NewHomestay {
            name: "Hoi An Garden".into(),
            description: "Quiet garden homestay near the old town".into(),
            address: "12 Tran Phu".into(),
            city: "Hoi An".into(),
            district: "Minh An".into(),
            ward: "Ward 1".into(),
            latitude: 15.87,
            longitude: 108.33,
            owner_id: owner.user_id,
            status,
        })
        .await
        .unwrap()
    }

    pub async fn room(repo: &LocalRepository, homestay_id: i64, price: f64, capacity: i32) -> Room {
        repo.create_room(&NewRoom {
            homestay_id,
            name: format!("Room {}", price),
            description: "Double room with balcony".into(),
            room_type: RoomType::Double,
            capacity,
            price,
            price_type: PriceType::PerNight,
            status: RoomStatus::Available,
            images: vec![],
            amenities: vec!["wifi".into()],
        })
        .await
        .unwrap()
    }
}
