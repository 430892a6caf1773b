// store

mod image_store;

pub use image_store::*;

// repo

mod article_repo;
mod repo_error;
mod user_repo;

mod repo_tx;

pub use article_repo::*;
pub use repo_error::*;
pub use user_repo::*;

pub use repo_tx::*;
