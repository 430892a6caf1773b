use super::{Author, Category, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct ArticleId(pub uuid::Uuid);

impl ArticleId {
    pub fn new_v4() -> Self {
        ArticleId(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ArticleId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(ArticleId)
    }
}

#[derive(Debug, Clone)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub author: UserId,
    pub blocks: Vec<UserId>,
    pub likes: Vec<UserId>,
    pub dislikes: Vec<UserId>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Like,
    Dislike,
}

impl Article {
    pub fn is_blocked_by(&self, user: UserId) -> bool {
        self.blocks.contains(&user)
    }

    /// Adds `user` to the block list, or removes it if already present.
    pub fn toggle_block(&mut self, user: UserId) {
        toggle(&mut self.blocks, user);
    }

    /// Toggles `user`'s reaction. A user holds at most one reaction, so
    /// setting one clears the other.
    pub fn toggle_reaction(&mut self, user: UserId, reaction: Reaction) {
        let (target, other) = match reaction {
            Reaction::Like => (&mut self.likes, &mut self.dislikes),
            Reaction::Dislike => (&mut self.dislikes, &mut self.likes),
        };
        other.retain(|u| *u != user);
        toggle(target, user);
    }
}

fn toggle(list: &mut Vec<UserId>, user: UserId) {
    if let Some(pos) = list.iter().position(|u| *u == user) {
        list.remove(pos);
    } else {
        list.push(user);
    }
}

/// An article as returned to clients, with the author resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleView {
    pub id: ArticleId,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub author: Option<Author>,
    pub blocks: Vec<UserId>,
    pub likes: Vec<UserId>,
    pub dislikes: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl ArticleView {
    pub fn new(article: Article, author: Option<Author>) -> Self {
        ArticleView {
            id: article.id,
            title: article.title,
            description: article.description,
            category: article.category,
            image: article.image,
            tags: article.tags,
            author,
            blocks: article.blocks,
            likes: article.likes,
            dislikes: article.dislikes,
            created_at: article.created_at,
        }
    }
}
