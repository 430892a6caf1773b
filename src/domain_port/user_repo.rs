use super::RepoError;
use crate::domain_model::*;

/// The user directory. Owns every user record, including the digest of the
/// one live refresh token per user.
#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    /// Insert a new user. Fails with `RepoError::Duplicate` when the email or
    /// phone is already taken.
    async fn create(&self, user: &User) -> Result<(), RepoError>;

    async fn get_by_id(&self, user_id: UserId) -> Result<Option<User>, RepoError>;

    /// Look a user up by email or phone.
    async fn get_by_identifier(&self, identifier: &str) -> Result<Option<User>, RepoError>;

    /// Report which unique field, if any, is already held by a user other
    /// than `exclude`. Email is checked before phone.
    async fn find_conflict(
        &self,
        email: &str,
        phone: &str,
        exclude: Option<UserId>,
    ) -> Result<Option<UniqueField>, RepoError>;

    /// Persist profile fields and password hash. Leaves the refresh token
    /// untouched.
    async fn update_profile(&self, user: &User) -> Result<(), RepoError>;

    async fn id_exists(&self, user_id: UserId) -> Result<bool, RepoError>;

    async fn get_authors(&self, ids: &[UserId]) -> Result<Vec<Author>, RepoError>;

    /// Overwrite the stored refresh token digest (`None` clears it).
    /// Returns `false` when the user does not exist.
    async fn set_refresh_token(
        &self,
        user_id: UserId,
        token_hash: Option<&str>,
    ) -> Result<bool, RepoError>;

    /// Atomically replace the stored digest with `new_hash`, but only if it
    /// currently equals `expected_hash`. Returns whether the swap happened.
    async fn replace_refresh_token(
        &self,
        user_id: UserId,
        expected_hash: &str,
        new_hash: &str,
    ) -> Result<bool, RepoError>;
}
