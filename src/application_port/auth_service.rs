use crate::domain_model::{PublicUser, UniqueField, UserId};
use crate::domain_port::{ImageStoreError, ImageUpload, RepoError};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email already registered")]
    EmailTaken,
    #[error("phone number already registered")]
    PhoneTaken,
    #[error("{0}")]
    Validation(String),
    #[error("user not found")]
    UserNotFound,
    #[error("token missing")]
    MissingToken,
    #[error("token invalid")]
    TokenInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("token stale or revoked")]
    TokenStale,
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    /// Whether the error means "present a better credential", as opposed to a
    /// server-side failure.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::UserNotFound
                | AuthError::MissingToken
                | AuthError::TokenInvalid
                | AuthError::TokenExpired
                | AuthError::TokenStale
        )
    }
}

impl From<RepoError> for AuthError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate(UniqueField::Email) => AuthError::EmailTaken,
            RepoError::Duplicate(UniqueField::Phone) => AuthError::PhoneTaken,
            RepoError::Store(e) => AuthError::Store(e),
        }
    }
}

impl From<ImageStoreError> for AuthError {
    fn from(err: ImageStoreError) -> Self {
        AuthError::Store(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub date_of_birth: String,
    /// JSON array of category names, as sent by the client.
    pub preferences: Option<String>,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    /// Email or phone.
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub user: PublicUser,
    pub tokens: AuthTokens,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshToken(pub String);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TokenVerifyResult {
    pub user_id: UserId,
}

/// Signs and checks bearer tokens. Implementations are pure: no storage, no
/// clock other than the system time.
pub trait TokenCodec: Send + Sync {
    fn issue_access_token(&self, user: UserId)
    -> Result<(AccessToken, DateTime<Utc>), AuthError>;
    fn issue_refresh_token(
        &self,
        user: UserId,
    ) -> Result<(RefreshToken, DateTime<Utc>), AuthError>;
    fn verify_access_token(&self, token: &AccessToken) -> Result<TokenVerifyResult, AuthError>;
    fn verify_refresh_token(&self, token: &RefreshToken)
    -> Result<TokenVerifyResult, AuthError>;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Create an account and open its first session. If the session cannot
    /// be stored the account still exists; the client should log in.
    async fn register(&self, request: RegisterInput) -> Result<LoginResult, AuthError>;
    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError>;
    /// Check an access token and that its user still exists.
    async fn verify_token(&self, token: &str) -> Result<UserId, AuthError>;
    /// Exchange the live refresh token for a new pair.
    async fn refresh_token(&self, refresh_token: &str) -> Result<AuthTokens, AuthError>;
    /// Drop the user's live refresh token.
    async fn logout(&self, user_id: UserId) -> Result<(), AuthError>;
}
