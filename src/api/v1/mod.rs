mod error;
mod form;
mod handler;
mod router;

pub use error::{ApiErrorCode, ApiFailure, recover_error};
pub use handler::ApiResponse;
pub use router::routes;
