//! Request and response types owned by the HTTP layer.
//!
//! Use case inputs and views live next to their services; only the shapes
//! that exist purely for transport are declared here.

use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// `connected`, `disconnected` or `error: …`
    pub database: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyQuery {
    #[serde(default)]
    pub token: String,
}
