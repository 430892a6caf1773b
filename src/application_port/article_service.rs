use crate::domain_model::{ArticleId, ArticleView, Page, Reaction, UserId};
use crate::domain_port::{ImageStoreError, ImageUpload, RepoError};

#[derive(Debug, thiserror::Error)]
pub enum ArticleError {
    #[error("article not found")]
    NotFound,
    #[error("article is not available")]
    Blocked,
    #[error("image is required")]
    ImageRequired,
    #[error("{0}")]
    Validation(String),
    #[error("store error: {0}")]
    Store(String),
}

impl From<RepoError> for ArticleError {
    fn from(err: RepoError) -> Self {
        ArticleError::Store(err.to_string())
    }
}

impl From<ImageStoreError> for ArticleError {
    fn from(err: ImageStoreError) -> Self {
        ArticleError::Store(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub description: String,
    pub category: String,
    /// JSON array of tag strings.
    pub tags: Option<String>,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone, Default)]
pub struct ArticleUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    /// JSON array of tag strings; an unparseable value clears the tags.
    pub tags: Option<String>,
    pub remove_image: bool,
    pub image: Option<ImageUpload>,
}

#[async_trait::async_trait]
pub trait ArticleService: Send + Sync {
    async fn create(&self, author: UserId, input: NewArticle) -> Result<ArticleView, ArticleError>;
    async fn list(&self, page: Page) -> Result<Vec<ArticleView>, ArticleError>;
    async fn list_by_author(
        &self,
        author: UserId,
        page: Page,
    ) -> Result<Vec<ArticleView>, ArticleError>;
    /// Fetch for `viewer`; fails with `Blocked` if the viewer blocked it.
    async fn get(&self, viewer: UserId, id: ArticleId) -> Result<ArticleView, ArticleError>;
    /// Fetch without the block check.
    async fn get_any(&self, id: ArticleId) -> Result<ArticleView, ArticleError>;
    async fn update(
        &self,
        author: UserId,
        id: ArticleId,
        input: ArticleUpdate,
    ) -> Result<ArticleView, ArticleError>;
    async fn delete(&self, author: UserId, id: ArticleId) -> Result<(), ArticleError>;
    async fn toggle_block(&self, user: UserId, id: ArticleId) -> Result<ArticleView, ArticleError>;
    async fn react(
        &self,
        user: UserId,
        id: ArticleId,
        reaction: Reaction,
    ) -> Result<ArticleView, ArticleError>;
}
