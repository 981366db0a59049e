//! HTTP server module for the homestay backend.
//!
//! An axum router over the service layer. Every response uses the
//! `{code, message, data}` envelope from [`error::ApiResponse`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  HTTP Layer (axum handlers)                               │
//! │  - Bearer authentication and role guards                  │
//! │  - JSON/query decoding into service inputs                │
//! │  - CORS, compression, tracing, envelope                   │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Service Layer (services/)                                │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Repository Layer (db/)                                   │
//! │  - LocalRepository / PostgresRepository                   │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::{ApiResponse, AppError};
pub use router::create_router;
pub use state::AppState;
