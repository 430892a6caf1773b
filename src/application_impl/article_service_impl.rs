use super::validation;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

pub struct RealArticleService {
    article_repo: Arc<dyn ArticleRepo>,
    user_repo: Arc<dyn UserRepo>,
    image_store: Arc<dyn ImageStore>,
    tx_manager: Arc<dyn TxManager>,
}

impl RealArticleService {
    pub fn new(
        article_repo: Arc<dyn ArticleRepo>,
        user_repo: Arc<dyn UserRepo>,
        image_store: Arc<dyn ImageStore>,
        tx_manager: Arc<dyn TxManager>,
    ) -> Self {
        Self {
            article_repo,
            user_repo,
            image_store,
            tx_manager,
        }
    }

    async fn views(&self, articles: Vec<Article>) -> Result<Vec<ArticleView>, ArticleError> {
        let mut ids: Vec<UserId> = articles.iter().map(|a| a.author).collect();
        ids.sort();
        ids.dedup();
        let authors: HashMap<UserId, Author> = self
            .user_repo
            .get_authors(&ids)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        Ok(articles
            .into_iter()
            .map(|a| {
                let author = authors.get(&a.author).cloned();
                ArticleView::new(a, author)
            })
            .collect())
    }

    async fn view(&self, article: Article) -> Result<ArticleView, ArticleError> {
        let mut views = self.views(vec![article]).await?;
        views.pop().ok_or(ArticleError::NotFound)
    }

    async fn get_live(&self, id: ArticleId) -> Result<Article, ArticleError> {
        self.article_repo
            .get(id)
            .await?
            .filter(|a| !a.deleted)
            .ok_or(ArticleError::NotFound)
    }

    /// Read-modify-write of one live article inside a transaction. `change`
    /// sees the current row and may refuse it, which rolls the transaction
    /// back.
    async fn modify<F>(&self, id: ArticleId, change: F) -> Result<Article, ArticleError>
    where
        F: FnOnce(&mut Article) -> Result<(), ArticleError> + Send,
    {
        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| ArticleError::Store(e.to_string()))?;

        let outcome = async {
            let mut article = self
                .article_repo
                .get_for_update_in_tx(tx.as_mut(), id)
                .await?
                .filter(|a| !a.deleted)
                .ok_or(ArticleError::NotFound)?;
            change(&mut article)?;
            self.article_repo.update_in_tx(tx.as_mut(), &article).await?;
            Ok::<_, ArticleError>(article)
        }
        .await;

        match outcome {
            Ok(article) => {
                tx.commit()
                    .await
                    .map_err(|e| ArticleError::Store(e.to_string()))?;
                Ok(article)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(article_id = %id, "rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    async fn discard_image(&self, path: &str) {
        if let Err(e) = self.image_store.remove(path).await {
            warn!(path, "could not remove image: {}", e);
        }
    }
}

fn owned_by(author: UserId) -> impl Fn(&Article) -> Result<(), ArticleError> {
    move |article| {
        if article.author == author {
            Ok(())
        } else {
            Err(ArticleError::NotFound)
        }
    }
}

#[async_trait::async_trait]
impl ArticleService for RealArticleService {
    async fn create(&self, author: UserId, input: NewArticle) -> Result<ArticleView, ArticleError> {
        let upload = input.image.as_ref().ok_or(ArticleError::ImageRequired)?;

        let title = input.title.trim();
        let description = input.description.trim();
        if title.is_empty() || description.is_empty() || input.category.trim().is_empty() {
            return Err(ArticleError::Validation(
                "Title, description, and category are required".to_string(),
            ));
        }
        let category =
            validation::parse_category(&input.category).map_err(ArticleError::Validation)?;
        let tags = match input.tags.as_deref() {
            Some(raw) if !raw.trim().is_empty() => {
                validation::parse_tags(raw).map_err(ArticleError::Validation)?
            }
            _ => Vec::new(),
        };

        let image = self.image_store.save(upload).await?;
        let article = Article {
            id: ArticleId::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            category,
            image: Some(image.clone()),
            tags,
            author,
            blocks: Vec::new(),
            likes: Vec::new(),
            dislikes: Vec::new(),
            deleted: false,
            created_at: Utc::now(),
        };
        if let Err(e) = self.article_repo.insert(&article).await {
            self.discard_image(&image).await;
            return Err(e.into());
        }

        info!(article_id = %article.id, author = %author, "article created");
        self.view(article).await
    }

    async fn list(&self, page: Page) -> Result<Vec<ArticleView>, ArticleError> {
        let articles = self.article_repo.list(None, page.clamped()).await?;
        self.views(articles).await
    }

    async fn list_by_author(
        &self,
        author: UserId,
        page: Page,
    ) -> Result<Vec<ArticleView>, ArticleError> {
        let articles = self.article_repo.list(Some(author), page.clamped()).await?;
        self.views(articles).await
    }

    async fn get(&self, viewer: UserId, id: ArticleId) -> Result<ArticleView, ArticleError> {
        let article = self.get_live(id).await?;
        if article.is_blocked_by(viewer) {
            return Err(ArticleError::Blocked);
        }
        self.view(article).await
    }

    async fn get_any(&self, id: ArticleId) -> Result<ArticleView, ArticleError> {
        let article = self.get_live(id).await?;
        self.view(article).await
    }

    async fn update(
        &self,
        author: UserId,
        id: ArticleId,
        input: ArticleUpdate,
    ) -> Result<ArticleView, ArticleError> {
        let category = match input.category.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                Some(validation::parse_category(raw).map_err(ArticleError::Validation)?)
            }
            _ => None,
        };

        // a removal request wins over a new upload
        let new_image = match (&input.image, input.remove_image) {
            (Some(upload), false) => Some(self.image_store.save(upload).await?),
            _ => None,
        };

        let mut old_image = None;
        let check_owner = owned_by(author);
        let result = self
            .modify(id, |article| {
                check_owner(article)?;
                if input.remove_image {
                    old_image = article.image.take();
                } else if let Some(path) = &new_image {
                    old_image = article.image.replace(path.clone());
                }

                if let Some(title) = input.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                    article.title = title.to_string();
                }
                if let Some(description) =
                    input.description.as_deref().filter(|d| !d.trim().is_empty())
                {
                    article.description = description.trim().to_string();
                }
                if let Some(category) = category {
                    article.category = category;
                }
                if let Some(raw) = input.tags.as_deref() {
                    article.tags = validation::parse_tags(raw).unwrap_or_default();
                }
                Ok(())
            })
            .await;

        let article = match result {
            Ok(article) => article,
            Err(e) => {
                if let Some(path) = &new_image {
                    self.discard_image(path).await;
                }
                return Err(e);
            }
        };
        if let Some(path) = &old_image {
            self.discard_image(path).await;
        }

        info!(article_id = %id, "article updated");
        self.view(article).await
    }

    async fn delete(&self, author: UserId, id: ArticleId) -> Result<(), ArticleError> {
        let check_owner = owned_by(author);
        self.modify(id, |article| {
            check_owner(article)?;
            article.deleted = true;
            Ok(())
        })
        .await?;
        info!(article_id = %id, "article deleted");
        Ok(())
    }

    async fn toggle_block(&self, user: UserId, id: ArticleId) -> Result<ArticleView, ArticleError> {
        let article = self
            .modify(id, |article| {
                article.toggle_block(user);
                Ok(())
            })
            .await?;
        self.view(article).await
    }

    async fn react(
        &self,
        user: UserId,
        id: ArticleId,
        reaction: Reaction,
    ) -> Result<ArticleView, ArticleError> {
        let article = self
            .modify(id, |article| {
                article.toggle_reaction(user, reaction);
                Ok(())
            })
            .await?;
        self.view(article).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_fs::FsImageStore;
    use crate::infra_memory::{MemoryArticleRepo, MemoryTxManager, MemoryUserRepo};
    use chrono::NaiveDate;

    struct Fixture {
        service: RealArticleService,
        images: Arc<FsImageStore>,
        author: UserId,
        reader: UserId,
    }

    async fn fixture() -> Fixture {
        let users = Arc::new(MemoryUserRepo::new());
        let images = Arc::new(FsImageStore::new(
            std::env::temp_dir().join(format!("inkwell-article-{}", uuid::Uuid::new_v4())),
        ));
        let mut ids = Vec::new();
        for (first, email, phone) in [
            ("Ursula", "ursula@example.com", "1111111111"),
            ("Terry", "terry@example.com", "2222222222"),
        ] {
            let now = Utc::now();
            let user = User {
                id: UserId::new_v4(),
                first_name: first.into(),
                last_name: "Writer".into(),
                email: email.into(),
                phone: phone.into(),
                password_hash: "unused".into(),
                image: None,
                date_of_birth: NaiveDate::from_ymd_opt(1950, 1, 1).unwrap(),
                preferences: vec![],
                created_at: now,
                updated_at: now,
                refresh_token_hash: None,
            };
            users.create(&user).await.unwrap();
            ids.push(user.id);
        }
        let service = RealArticleService::new(
            Arc::new(MemoryArticleRepo::new()),
            users,
            images.clone(),
            Arc::new(MemoryTxManager::new()),
        );
        Fixture {
            service,
            images,
            author: ids[0],
            reader: ids[1],
        }
    }

    fn gif() -> ImageUpload {
        ImageUpload {
            file_name: Some("cover.gif".into()),
            content_type: "image/gif".into(),
            data: b"GIF89a".to_vec(),
        }
    }

    fn new_article(title: &str) -> NewArticle {
        NewArticle {
            title: format!("  {title}  "),
            description: "A story".into(),
            category: "space".into(),
            tags: Some(r#"["stars","moon"]"#.into()),
            image: Some(gif()),
        }
    }

    fn on_disk(f: &Fixture, public: &str) -> bool {
        f.images
            .dir()
            .join(public.trim_start_matches("/uploads/"))
            .exists()
    }

    #[tokio::test]
    async fn create_requires_image_and_fields() {
        let f = fixture().await;

        let mut input = new_article("Orbit");
        input.image = None;
        assert!(matches!(
            f.service.create(f.author, input).await,
            Err(ArticleError::ImageRequired)
        ));

        let mut input = new_article("Orbit");
        input.description = " ".into();
        assert!(matches!(
            f.service.create(f.author, input).await,
            Err(ArticleError::Validation(_))
        ));

        let mut input = new_article("Orbit");
        input.category = "astrology".into();
        assert!(matches!(
            f.service.create(f.author, input).await,
            Err(ArticleError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn create_resolves_author_and_stores_image() {
        let f = fixture().await;
        let view = f.service.create(f.author, new_article("Orbit")).await.unwrap();

        assert_eq!(view.title, "Orbit");
        assert_eq!(view.category, Category::Space);
        assert_eq!(view.tags, vec!["stars".to_string(), "moon".to_string()]);
        let author = view.author.unwrap();
        assert_eq!(author.id, f.author);
        assert_eq!(author.first_name, "Ursula");
        assert!(on_disk(&f, view.image.as_deref().unwrap()));
    }

    #[tokio::test]
    async fn listings_are_newest_first_and_skip_deleted() {
        let f = fixture().await;
        let first = f.service.create(f.author, new_article("one")).await.unwrap();
        let second = f.service.create(f.author, new_article("two")).await.unwrap();
        let theirs = f.service.create(f.reader, new_article("three")).await.unwrap();
        f.service.delete(f.author, first.id).await.unwrap();

        let all: Vec<_> = f
            .service
            .list(Page::default())
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(all.len(), 2);
        assert!(all.contains(&second.id) && all.contains(&theirs.id));

        let mine = f
            .service
            .list_by_author(f.author, Page::default())
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, second.id);

        let page = f
            .service
            .list(Page { skip: 1, limit: 1 })
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
    }

    #[tokio::test]
    async fn blocked_article_is_hidden_from_blocker_only() {
        let f = fixture().await;
        let article = f.service.create(f.author, new_article("Orbit")).await.unwrap();

        let blocked = f.service.toggle_block(f.reader, article.id).await.unwrap();
        assert_eq!(blocked.blocks, vec![f.reader]);
        assert!(matches!(
            f.service.get(f.reader, article.id).await,
            Err(ArticleError::Blocked)
        ));
        assert!(f.service.get(f.author, article.id).await.is_ok());
        assert!(f.service.get_any(article.id).await.is_ok());

        f.service.toggle_block(f.reader, article.id).await.unwrap();
        assert!(f.service.get(f.reader, article.id).await.is_ok());
    }

    #[tokio::test]
    async fn only_author_may_update_or_delete() {
        let f = fixture().await;
        let article = f.service.create(f.author, new_article("Orbit")).await.unwrap();

        let err = f
            .service
            .update(
                f.reader,
                article.id,
                ArticleUpdate {
                    title: Some("Hijacked".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ArticleError::NotFound));
        assert!(matches!(
            f.service.delete(f.reader, article.id).await,
            Err(ArticleError::NotFound)
        ));

        f.service.delete(f.author, article.id).await.unwrap();
        assert!(matches!(
            f.service.get_any(article.id).await,
            Err(ArticleError::NotFound)
        ));
    }

    #[tokio::test]
    async fn refused_change_is_rolled_back_and_releases_the_row() {
        let f = fixture().await;
        let article = f.service.create(f.author, new_article("Orbit")).await.unwrap();

        let err = f
            .service
            .update(
                f.reader,
                article.id,
                ArticleUpdate {
                    title: Some("Hijacked".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ArticleError::NotFound));

        // the next transaction on the same row is not blocked
        let renamed = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            f.service.update(
                f.author,
                article.id,
                ArticleUpdate {
                    title: Some("Orbit II".into()),
                    ..Default::default()
                },
            ),
        )
        .await
        .expect("row still locked")
        .unwrap();
        assert_eq!(renamed.title, "Orbit II");
    }

    #[tokio::test]
    async fn update_replaces_or_removes_image() {
        let f = fixture().await;
        let article = f.service.create(f.author, new_article("Orbit")).await.unwrap();
        let original = article.image.clone().unwrap();

        let replaced = f
            .service
            .update(
                f.author,
                article.id,
                ArticleUpdate {
                    tags: Some("not json".into()),
                    image: Some(gif()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let replacement = replaced.image.clone().unwrap();
        assert_ne!(replacement, original);
        assert!(replaced.tags.is_empty());
        assert!(!on_disk(&f, &original));
        assert!(on_disk(&f, &replacement));

        let removed = f
            .service
            .update(
                f.author,
                article.id,
                ArticleUpdate {
                    remove_image: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(removed.image.is_none());
        assert!(!on_disk(&f, &replacement));
    }

    #[tokio::test]
    async fn reactions_are_exclusive_toggles() {
        let f = fixture().await;
        let article = f.service.create(f.author, new_article("Orbit")).await.unwrap();

        let v = f
            .service
            .react(f.reader, article.id, Reaction::Like)
            .await
            .unwrap();
        assert_eq!(v.likes, vec![f.reader]);

        let v = f
            .service
            .react(f.reader, article.id, Reaction::Dislike)
            .await
            .unwrap();
        assert!(v.likes.is_empty());
        assert_eq!(v.dislikes, vec![f.reader]);

        let v = f
            .service
            .react(f.reader, article.id, Reaction::Dislike)
            .await
            .unwrap();
        assert!(v.dislikes.is_empty());
    }
}
