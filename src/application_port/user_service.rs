use crate::application_port::AuthError;
use crate::domain_model::{PublicUser, UniqueField, UserId};
use crate::domain_port::{ImageStoreError, ImageUpload, RepoError};

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("user not found")]
    NotFound,
    #[error("email already registered")]
    EmailTaken,
    #[error("phone number already registered")]
    PhoneTaken,
    #[error("current password is incorrect")]
    IncorrectPassword,
    #[error("{0}")]
    Validation(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<RepoError> for UserError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate(UniqueField::Email) => UserError::EmailTaken,
            RepoError::Duplicate(UniqueField::Phone) => UserError::PhoneTaken,
            RepoError::Store(e) => UserError::Store(e),
        }
    }
}

impl From<ImageStoreError> for UserError {
    fn from(err: ImageStoreError) -> Self {
        UserError::Store(err.to_string())
    }
}

impl From<AuthError> for UserError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(e) => UserError::Store(e),
            other => UserError::InternalError(other.to_string()),
        }
    }
}

/// Fields a user may change on their own profile. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// JSON array of category names; ignored when it does not parse.
    pub preferences: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    pub image: Option<ImageUpload>,
}

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    async fn get_profile(&self, user_id: UserId) -> Result<PublicUser, UserError>;
    async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<PublicUser, UserError>;
}
