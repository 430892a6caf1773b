use super::{RepoError, StorageTx};
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait ArticleRepo: Send + Sync {
    async fn insert(&self, article: &Article) -> Result<(), RepoError>;

    /// Fetch an article, soft-deleted ones included.
    async fn get(&self, id: ArticleId) -> Result<Option<Article>, RepoError>;

    /// Non-deleted articles, newest first, optionally restricted to one author.
    async fn list(&self, author: Option<UserId>, page: Page) -> Result<Vec<Article>, RepoError>;

    /// Fetch an article and hold it until the transaction ends.
    async fn get_for_update_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        id: ArticleId,
    ) -> Result<Option<Article>, RepoError>;

    async fn update_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        article: &Article,
    ) -> Result<(), RepoError>;
}
