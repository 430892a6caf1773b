//! MySQL backends. Schema lives in `sql/schema.sql`.

mod article_repo_mysql;
mod user_repo_mysql;

pub use article_repo_mysql::*;
pub use user_repo_mysql::*;

mod repo_tx_mysql;

pub use repo_tx_mysql::*;

mod util;
