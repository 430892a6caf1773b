use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use crate::logger::*;
use serde::Serialize;
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let failure = if let Some(failure) = err.find::<ApiFailure>() {
        failure.clone()
    } else if err.is_not_found() {
        ApiFailure::new(ApiErrorCode::NotFound, "Route not found")
    } else if let Some(e) = err.find::<warp::body::BodyDeserializeError>() {
        ApiFailure::new(ApiErrorCode::ValidationFailed, e.to_string())
    } else if let Some(e) = err.find::<reject::InvalidQuery>() {
        ApiFailure::new(ApiErrorCode::ValidationFailed, e.to_string())
    } else if err.find::<reject::PayloadTooLarge>().is_some() {
        ApiFailure::new(ApiErrorCode::PayloadTooLarge, "File too large")
    } else if err.find::<reject::UnsupportedMediaType>().is_some() {
        ApiFailure::new(ApiErrorCode::ValidationFailed, "Unsupported content type")
    } else if err.find::<reject::LengthRequired>().is_some() {
        ApiFailure::new(ApiErrorCode::ValidationFailed, "Content-Length required")
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        ApiFailure::new(ApiErrorCode::MethodNotAllowed, "Method not allowed")
    } else {
        ApiFailure::internal(format!("unhandled rejection: {:?}", err))
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(&failure));
    Ok(warp::reply::with_status(json, failure.code.status()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorCode {
    ValidationFailed,
    Unauthenticated,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    PayloadTooLarge,
    InternalError,
}

impl ApiErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ApiErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
            ApiErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A failed request: the code picks the status, the message goes to the
/// client as is.
#[derive(Debug, Clone, Serialize)]
pub struct ApiFailure {
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiFailure {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiFailure {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::ValidationFailed, message)
    }

    /// Logs the cause and hides it from the client.
    pub fn internal<E: std::fmt::Display>(error: E) -> Self {
        warn!("Internal error: {}", error);
        Self::new(ApiErrorCode::InternalError, "Internal server error")
    }
}

impl reject::Reject for ApiFailure {}

impl From<AuthError> for ApiFailure {
    fn from(error: AuthError) -> Self {
        use ApiErrorCode::*;
        match error {
            AuthError::InvalidCredentials => ApiFailure::new(Unauthenticated, "Invalid credentials"),
            AuthError::EmailTaken => ApiFailure::validation("Email already registered"),
            AuthError::PhoneTaken => ApiFailure::validation("Phone number already registered"),
            AuthError::Validation(message) => ApiFailure::validation(message),
            AuthError::UserNotFound => ApiFailure::new(Unauthenticated, "User not found"),
            AuthError::MissingToken => ApiFailure::new(Unauthenticated, "Token required"),
            AuthError::TokenExpired => ApiFailure::new(Unauthenticated, "Token expired"),
            AuthError::TokenInvalid | AuthError::TokenStale => {
                debug!("rejected token: {}", error);
                ApiFailure::new(Unauthenticated, "Invalid token")
            }
            AuthError::Store(e) => ApiFailure::internal(e),
            AuthError::InternalError(e) => ApiFailure::internal(e),
        }
    }
}

impl From<UserError> for ApiFailure {
    fn from(error: UserError) -> Self {
        match error {
            UserError::NotFound => ApiFailure::new(ApiErrorCode::NotFound, "User not found"),
            UserError::EmailTaken => ApiFailure::validation("Email already registered"),
            UserError::PhoneTaken => ApiFailure::validation("Phone number already registered"),
            UserError::IncorrectPassword => {
                ApiFailure::validation("Current password is incorrect")
            }
            UserError::Validation(message) => ApiFailure::validation(message),
            UserError::Store(e) => ApiFailure::internal(e),
            UserError::InternalError(e) => ApiFailure::internal(e),
        }
    }
}

impl From<ArticleError> for ApiFailure {
    fn from(error: ArticleError) -> Self {
        match error {
            ArticleError::NotFound => ApiFailure::new(ApiErrorCode::NotFound, "Article not found"),
            ArticleError::Blocked => {
                ApiFailure::new(ApiErrorCode::Forbidden, "Article is not available")
            }
            ArticleError::ImageRequired => ApiFailure::validation("Image is required"),
            ArticleError::Validation(message) => ApiFailure::validation(message),
            ArticleError::Store(e) => ApiFailure::internal(e),
        }
    }
}
