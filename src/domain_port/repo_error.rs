use crate::domain_model::UniqueField;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("duplicate {0}")]
    Duplicate(UniqueField),
    #[error("store error: {0}")]
    Store(String),
}

impl From<anyhow::Error> for RepoError {
    fn from(err: anyhow::Error) -> Self {
        RepoError::Store(err.to_string())
    }
}
