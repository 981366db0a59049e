//! # Homestay Backend
//!
//! REST backend for a homestay booking platform: hosts publish homestays
//! and rooms, guests search and book them, and the service keeps room
//! calendars, payments and reviews consistent.
//!
//! ## Architecture
//!
//! - [`config`]: TOML configuration with environment overrides
//! - [`models`]: Domain entities and closed status enums
//! - [`db`]: Repository traits with in-memory and Postgres backends
//! - [`services`]: Use cases, ownership rules and the booking state machine
//! - [`mail`]: Outgoing e-mail seam
//! - [`http`]: Axum-based HTTP server and request handlers

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod config;
pub mod db;
pub mod mail;
pub mod models;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
