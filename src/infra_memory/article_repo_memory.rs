use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;

#[derive(Default)]
pub struct MemoryArticleRepo {
    articles: DashMap<ArticleId, Article>,
}

impl MemoryArticleRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ArticleRepo for MemoryArticleRepo {
    async fn insert(&self, article: &Article) -> Result<(), RepoError> {
        self.articles.insert(article.id, article.clone());
        Ok(())
    }

    async fn get(&self, id: ArticleId) -> Result<Option<Article>, RepoError> {
        Ok(self.articles.get(&id).map(|a| a.value().clone()))
    }

    async fn list(&self, author: Option<UserId>, page: Page) -> Result<Vec<Article>, RepoError> {
        let mut articles: Vec<Article> = self
            .articles
            .iter()
            .filter(|a| !a.deleted && author.is_none_or(|id| a.author == id))
            .map(|a| a.value().clone())
            .collect();
        articles.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(articles
            .into_iter()
            .skip(page.skip as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn get_for_update_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        id: ArticleId,
    ) -> Result<Option<Article>, RepoError> {
        self.get(id).await
    }

    async fn update_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        article: &Article,
    ) -> Result<(), RepoError> {
        match self.articles.get_mut(&article.id) {
            Some(mut stored) => {
                *stored = article.clone();
                Ok(())
            }
            None => Err(RepoError::Store(format!("article {} vanished", article.id))),
        }
    }
}
