//! Domain entities shared by the repository, service and HTTP layers.
//!
//! Every entity maps onto one relational table. Status-like columns are
//! modelled as closed enums generated by [`define_text_enum!`](crate::define_text_enum)
//! so that unknown values are rejected at the boundary instead of leaking
//! into business rules.

pub mod booking;
pub mod homestay;
pub mod macros;
pub mod pagination;
pub mod payment;
pub mod review;
pub mod room;
pub mod user;

pub use booking::*;
pub use homestay::*;
pub use pagination::*;
pub use payment::*;
pub use review::*;
pub use room::*;
pub use user::*;

/// Returned when a stored or submitted string does not name any variant of
/// a text enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
