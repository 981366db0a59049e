//! Repository trait definitions for database operations.
//!
//! Each trait covers one aggregate of the relational schema. Backends
//! implement all of them; callers that need everything use the
//! [`FullRepository`] bound.
//!
//! # Module Organization
//!
//! - [`error`]: Error types for repository operations
//! - [`user`]: Accounts
//! - [`homestay`]: Homestays, health check and availability search
//! - [`room`]: Rooms and their per-date availability calendar
//! - [`booking`]: Bookings, booked rooms and status transitions
//! - [`booking_request`]: Guest booking requests awaiting host approval
//! - [`payment`]: Payment records
//! - [`review`]: Stay reviews
//!
//! # Convenience Trait Bound
//!
//! ```ignore
//! async fn confirm<R: FullRepository + ?Sized>(repo: &R, id: i64) -> RepositoryResult<()> {
//!     let booking = repo.get_booking(id).await?;
//!     let rooms = repo.booking_rooms(booking.id).await?;
//!     Ok(())
//! }
//! ```

pub mod booking;
pub mod booking_request;
pub mod error;
pub mod homestay;
pub mod payment;
pub mod review;
pub mod room;
pub mod user;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

pub use booking::{BookingRepository, BOOKING_CODE_CONSTRAINT};
pub use booking_request::BookingRequestRepository;
pub use homestay::HomestayRepository;
pub use payment::PaymentRepository;
pub use review::ReviewRepository;
pub use room::{AvailabilityRepository, RoomRepository};
pub use user::UserRepository;

/// Composite trait bound for a complete repository implementation.
pub trait FullRepository:
    UserRepository
    + HomestayRepository
    + RoomRepository
    + AvailabilityRepository
    + BookingRepository
    + BookingRequestRepository
    + PaymentRepository
    + ReviewRepository
{
}

// Blanket implementation: any type implementing every aggregate trait is a FullRepository
impl<T> FullRepository for T where
    T: UserRepository
        + HomestayRepository
        + RoomRepository
        + AvailabilityRepository
        + BookingRepository
        + BookingRequestRepository
        + PaymentRepository
        + ReviewRepository
{
}
