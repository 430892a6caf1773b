//! Tracing setup plus the macros the rest of the crate logs with.
//! Token values and passwords are never passed to these macros.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
