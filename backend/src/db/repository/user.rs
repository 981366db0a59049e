//! Account persistence.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{NewUser, User, UserChanges};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account.
    ///
    /// # Returns
    /// * `Err(RepositoryError::Conflict)` - If the e-mail is already registered
    async fn create_user(&self, user: &NewUser) -> RepositoryResult<User>;

    /// Fetch an account by id (`NotFound` when missing).
    async fn get_user(&self, user_id: i64) -> RepositoryResult<User>;

    /// Look up an account by exact e-mail.
    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;

    /// Apply a partial update and return the stored row.
    async fn update_user(&self, user_id: i64, changes: &UserChanges) -> RepositoryResult<User>;
}
