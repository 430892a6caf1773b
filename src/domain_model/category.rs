use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Sports,
    Politics,
    Space,
    Technology,
    Entertainment,
    Health,
    Science,
    Business,
    Education,
    Travel,
    Food,
    Fashion,
    Art,
    Music,
    Gaming,
    Environment,
}

impl Category {
    pub const ALL: [Category; 16] = [
        Category::Sports,
        Category::Politics,
        Category::Space,
        Category::Technology,
        Category::Entertainment,
        Category::Health,
        Category::Science,
        Category::Business,
        Category::Education,
        Category::Travel,
        Category::Food,
        Category::Fashion,
        Category::Art,
        Category::Music,
        Category::Gaming,
        Category::Environment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Sports => "sports",
            Category::Politics => "politics",
            Category::Space => "space",
            Category::Technology => "technology",
            Category::Entertainment => "entertainment",
            Category::Health => "health",
            Category::Science => "science",
            Category::Business => "business",
            Category::Education => "education",
            Category::Travel => "travel",
            Category::Food => "food",
            Category::Fashion => "fashion",
            Category::Art => "art",
            Category::Music => "music",
            Category::Gaming => "gaming",
            Category::Environment => "environment",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}
