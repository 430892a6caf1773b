//! In-process backends for local runs and tests. State is lost on restart.

mod article_repo_memory;
mod repo_tx_memory;
mod user_repo_memory;

pub use article_repo_memory::*;
pub use repo_tx_memory::*;
pub use user_repo_memory::*;
