use super::util::{downcast, store_err};
use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::mysql::MySqlRow;
use sqlx::types::Json;
use sqlx::{MySqlPool, Row};

const ARTICLE_COLUMNS: &str = "article_id, title, description, category, image, tags, author_id, \
blocks, likes, dislikes, deleted, created_at";

pub struct MySqlArticleRepo {
    pool: MySqlPool,
}

impl MySqlArticleRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlArticleRepo { pool }
    }

    fn row_to_article(row: MySqlRow) -> Result<Article, RepoError> {
        let category: String = row.try_get("category").map_err(store_err)?;
        let category = category
            .parse::<Category>()
            .map_err(|e| RepoError::Store(e.to_string()))?;
        let tags: Json<Vec<String>> = row.try_get("tags").map_err(store_err)?;
        let blocks: Json<Vec<UserId>> = row.try_get("blocks").map_err(store_err)?;
        let likes: Json<Vec<UserId>> = row.try_get("likes").map_err(store_err)?;
        let dislikes: Json<Vec<UserId>> = row.try_get("dislikes").map_err(store_err)?;

        Ok(Article {
            id: row.try_get("article_id").map_err(store_err)?,
            title: row.try_get("title").map_err(store_err)?,
            description: row.try_get("description").map_err(store_err)?,
            category,
            image: row.try_get("image").map_err(store_err)?,
            tags: tags.0,
            author: row.try_get("author_id").map_err(store_err)?,
            blocks: blocks.0,
            likes: likes.0,
            dislikes: dislikes.0,
            deleted: row.try_get("deleted").map_err(store_err)?,
            created_at: row.try_get("created_at").map_err(store_err)?,
        })
    }
}

#[async_trait::async_trait]
impl ArticleRepo for MySqlArticleRepo {
    async fn insert(&self, article: &Article) -> Result<(), RepoError> {
        sqlx::query(
            r#"
INSERT INTO articles (article_id, title, description, category, image, tags, author_id,
                      blocks, likes, dislikes, deleted, created_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(article.id)
        .bind(&article.title)
        .bind(&article.description)
        .bind(article.category.as_str())
        .bind(&article.image)
        .bind(Json(&article.tags))
        .bind(article.author)
        .bind(Json(&article.blocks))
        .bind(Json(&article.likes))
        .bind(Json(&article.dislikes))
        .bind(article.deleted)
        .bind(article.created_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn get(&self, id: ArticleId) -> Result<Option<Article>, RepoError> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE article_id = ?");
        sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .map(Self::row_to_article)
            .transpose()
    }

    async fn list(&self, author: Option<UserId>, page: Page) -> Result<Vec<Article>, RepoError> {
        let sql = format!(
            r#"
SELECT {ARTICLE_COLUMNS}
FROM articles
WHERE deleted = FALSE AND (? IS NULL OR author_id = ?)
ORDER BY created_at DESC, article_id DESC
LIMIT ? OFFSET ?
"#
        );
        let rows = sqlx::query(&sql)
            .bind(author)
            .bind(author)
            .bind(page.limit)
            .bind(page.skip)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        rows.into_iter().map(Self::row_to_article).collect()
    }

    async fn get_for_update_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        id: ArticleId,
    ) -> Result<Option<Article>, RepoError> {
        let tx = downcast(tx);

        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE article_id = ? FOR UPDATE");
        sqlx::query(&sql)
            .bind(id)
            .fetch_optional(tx.conn())
            .await
            .map_err(store_err)?
            .map(Self::row_to_article)
            .transpose()
    }

    async fn update_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        article: &Article,
    ) -> Result<(), RepoError> {
        let tx = downcast(tx);

        sqlx::query(
            r#"
UPDATE articles
SET title = ?, description = ?, category = ?, image = ?, tags = ?,
    blocks = ?, likes = ?, dislikes = ?, deleted = ?
WHERE article_id = ?
"#,
        )
        .bind(&article.title)
        .bind(&article.description)
        .bind(article.category.as_str())
        .bind(&article.image)
        .bind(Json(&article.tags))
        .bind(Json(&article.blocks))
        .bind(Json(&article.likes))
        .bind(Json(&article.dislikes))
        .bind(article.deleted)
        .bind(article.id)
        .execute(tx.conn())
        .await
        .map_err(store_err)?;

        Ok(())
    }
}
