//! Homestay persistence and search.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{Homestay, HomestayChanges, HomestayFilter, NewHomestay, Page, StayQuery};

/// Repository trait for homestays.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait HomestayRepository: Send + Sync {
    // ==================== Health & Connection ====================

    /// Check if the backing store is reachable.
    ///
    /// # Returns
    /// - `Ok(true)` if the store is healthy
    /// - `Ok(false)` if it is unhealthy but no error occurred
    /// - `Err(RepositoryError)` if the check itself failed
    async fn health_check(&self) -> RepositoryResult<bool>;

    // ==================== Homestay Operations ====================

    async fn create_homestay(&self, homestay: &NewHomestay) -> RepositoryResult<Homestay>;

    /// Fetch a homestay with its owner name joined.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the homestay doesn't exist
    async fn get_homestay(&self, homestay_id: i64) -> RepositoryResult<Homestay>;

    /// Write the `Some` fields of `changes` and bump `updated_at`.
    ///
    /// # Returns
    /// * `Err(RepositoryError::ValidationError)` - If `changes` is empty
    /// * `Err(RepositoryError::NotFound)` - If no row was affected
    async fn update_homestay(
        &self,
        homestay_id: i64,
        changes: &HomestayChanges,
    ) -> RepositoryResult<Homestay>;

    async fn delete_homestay(&self, homestay_id: i64) -> RepositoryResult<()>;

    /// Filtered listing ordered by `created_at` DESC.
    async fn search_homestays(&self, filter: &HomestayFilter) -> RepositoryResult<Page<Homestay>>;

    /// Active homestays with enough free capacity for `stay`.
    ///
    /// A room counts when it is `available` and not part of a confirmed
    /// booking overlapping the stay window; the free rooms of a homestay
    /// must sum to at least `stay.guests` beds.
    async fn search_available_homestays(
        &self,
        filter: &HomestayFilter,
        stay: &StayQuery,
    ) -> RepositoryResult<Page<Homestay>>;

    /// Active homestays ordered by the sum of their review ratings DESC.
    async fn top_homestays(&self, limit: i64) -> RepositoryResult<Vec<Homestay>>;
}
