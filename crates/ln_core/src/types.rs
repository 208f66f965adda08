use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::slug::slugify;
use crate::Error;

/// Closed set of section labels an article can carry.
///
/// Declaration order is the classifier scan order; `Local` is the fallback
/// and is never scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Category {
    Politics,
    Education,
    Business,
    Sports,
    Crime,
    Health,
    Weather,
    Entertainment,
    Technology,
    Community,
    Local,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Politics,
        Category::Education,
        Category::Business,
        Category::Sports,
        Category::Crime,
        Category::Health,
        Category::Weather,
        Category::Entertainment,
        Category::Technology,
        Category::Community,
        Category::Local,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Politics => "Politics",
            Category::Education => "Education",
            Category::Business => "Business",
            Category::Sports => "Sports",
            Category::Crime => "Crime",
            Category::Health => "Health",
            Category::Weather => "Weather",
            Category::Entertainment => "Entertainment",
            Category::Technology => "Technology",
            Category::Community => "Community",
            Category::Local => "Local",
        }
    }

    pub fn slug(&self) -> String {
        self.as_str().to_lowercase()
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Local
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::InvalidInput(format!("Unknown category: {}", s)))
    }
}

impl TryFrom<String> for Category {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub community: Option<String>,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub featured: bool,
}

impl Article {
    /// Builds an article with the slug derived from `title`.
    pub fn new(id: impl Into<String>, title: impl Into<String>, published_at: DateTime<Utc>) -> Self {
        let title = title.into();
        Self {
            id: id.into(),
            slug: slugify(&title),
            title,
            excerpt: String::new(),
            body: String::new(),
            image_url: None,
            category: Category::default(),
            author: String::new(),
            source: String::new(),
            url: None,
            community: None,
            published_at,
            tags: Vec::new(),
            featured: false,
        }
    }

    /// Text the classifier looks at.
    pub fn classification_text(&self) -> String {
        format!("{} {}", self.title, self.excerpt)
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.slug = slugify(&self.title);
    }
}

/// Fresh id for an article created through the admin console.
pub fn new_story_id(now: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("story-{}-{}", now.timestamp_millis(), &suffix[..8])
}

/// Admin-console input for creating or replacing a story.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleDraft {
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub community: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub featured: bool,
}

impl ArticleDraft {
    pub fn validate(&self) -> crate::Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidInput("title must not be empty".to_string()));
        }
        Ok(())
    }

    /// Turns the draft into an article. A missing category is filled in by `classify`.
    pub fn into_article<F>(self, id: String, now: DateTime<Utc>, classify: F) -> Article
    where
        F: FnOnce(&str) -> Category,
    {
        let mut article = Article::new(id, self.title.trim(), self.published_at.unwrap_or(now));
        article.excerpt = self.excerpt;
        article.body = self.body;
        article.image_url = self.image_url;
        article.author = self.author.unwrap_or_else(|| "Staff".to_string());
        article.source = "admin".to_string();
        article.url = self.url;
        article.community = self.community;
        article.tags = self.tags;
        article.featured = self.featured;
        article.category = match self.category {
            Some(category) => category,
            None => classify(&article.classification_text()),
        };
        article
    }

    /// Overwrites the editable fields of `article`, keeping its id and source.
    pub fn apply_to(self, article: &mut Article) {
        if article.title != self.title.trim() {
            article.set_title(self.title.trim());
        }
        article.excerpt = self.excerpt;
        article.body = self.body;
        article.image_url = self.image_url;
        if let Some(category) = self.category {
            article.category = category;
        }
        if let Some(author) = self.author {
            article.author = author;
        }
        article.url = self.url;
        article.community = self.community;
        if let Some(published_at) = self.published_at {
            article.published_at = published_at;
        }
        article.tags = self.tags;
        article.featured = self.featured;
    }
}

/// An article waiting for its publish time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPublish {
    pub article: Article,
    pub publish_at: DateTime<Utc>,
    pub scheduled_at: DateTime<Utc>,
}

impl ScheduledPublish {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.publish_at <= now
    }
}
