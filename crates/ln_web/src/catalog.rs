use std::collections::HashSet;

use ln_core::seed::{bundled_articles, COMMUNITIES};
use ln_core::slug::slugify;
use ln_core::{Article, Category, Repository, Result};
use serde::{Deserialize, Serialize};

pub const HOME_FEATURED: usize = 3;
pub const HOME_LATEST: usize = 12;
pub const RELATED_LIMIT: usize = 4;

/// Everything readers can see: bundled seed articles, admin stories and
/// imported items, newest first.
pub async fn published(repo: &Repository) -> Result<Vec<Article>> {
    let mut all = bundled_articles();
    all.extend(repo.admin_stories().await?);
    all.extend(repo.imported().await?);
    all.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    Ok(all)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleQuery {
    pub category: Option<String>,
    pub community: Option<String>,
    pub q: Option<String>,
    pub limit: Option<usize>,
}

fn community_matches(article: &Article, wanted: &str) -> bool {
    article
        .community
        .as_deref()
        .is_some_and(|c| c.eq_ignore_ascii_case(wanted) || slugify(c) == slugify(wanted))
}

fn text_matches(article: &Article, needle: &str) -> bool {
    article.title.to_lowercase().contains(needle) || article.excerpt.to_lowercase().contains(needle)
}

/// Applies the list filters in order: category, community, text, limit.
/// An unknown category name is an error rather than an empty list.
pub fn filter(articles: Vec<Article>, query: &ArticleQuery) -> Result<Vec<Article>> {
    let category = query
        .category
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(str::parse::<Category>)
        .transpose()?;
    let needle = query
        .q
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());

    let filtered = articles
        .into_iter()
        .filter(|a| category.map_or(true, |c| a.category == c))
        .filter(|a| {
            query
                .community
                .as_deref()
                .map_or(true, |wanted| community_matches(a, wanted))
        })
        .filter(|a| needle.as_deref().map_or(true, |n| text_matches(a, n)))
        .take(query.limit.unwrap_or(usize::MAX));
    Ok(filtered.collect())
}

pub fn by_slug<'a>(articles: &'a [Article], slug: &str) -> Option<&'a Article> {
    articles.iter().find(|a| a.slug == slug)
}

/// Same category, excluding `article` itself, newest first.
pub fn related(articles: &[Article], article: &Article, limit: usize) -> Vec<Article> {
    articles
        .iter()
        .filter(|a| a.category == article.category && a.id != article.id)
        .take(limit)
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: Category,
    pub slug: String,
    pub count: usize,
}

pub fn category_counts(articles: &[Article]) -> Vec<CategoryCount> {
    Category::ALL
        .iter()
        .map(|category| CategoryCount {
            category: *category,
            slug: category.slug(),
            count: articles.iter().filter(|a| a.category == *category).count(),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct HomePage {
    pub featured: Vec<Article>,
    pub latest: Vec<Article>,
    pub categories: Vec<CategoryCount>,
    pub communities: Vec<&'static str>,
}

/// Featured stories first, then the latest of the rest.
pub fn home(articles: &[Article]) -> HomePage {
    let featured: Vec<Article> = articles
        .iter()
        .filter(|a| a.featured)
        .take(HOME_FEATURED)
        .cloned()
        .collect();
    let shown: HashSet<&str> = featured.iter().map(|a| a.id.as_str()).collect();
    let latest = articles
        .iter()
        .filter(|a| !shown.contains(a.id.as_str()))
        .take(HOME_LATEST)
        .cloned()
        .collect();
    HomePage {
        categories: category_counts(articles),
        communities: COMMUNITIES.to_vec(),
        featured,
        latest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn sample() -> Vec<Article> {
        let base = Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap();
        let make = |id: &str, title: &str, category: Category, hours: i64| {
            let mut a = Article::new(id, title, base - Duration::hours(hours));
            a.category = category;
            a
        };
        let mut items = vec![
            make("1", "Council sets budget hearing", Category::Politics, 1),
            make("2", "Mayor race heats up", Category::Politics, 2),
            make("3", "Oak Hill bakery opens", Category::Business, 3),
            make("4", "Vote on parks bond", Category::Politics, 4),
            make("5", "Election office hours", Category::Politics, 5),
            make("6", "Ward map redrawn", Category::Politics, 6),
        ];
        items[2].community = Some("Oak Hill".to_string());
        items[2].excerpt = "Fresh bread on Main".to_string();
        items[3].featured = true;
        items
    }

    #[test]
    fn test_filters() {
        let query = ArticleQuery {
            category: Some("politics".to_string()),
            limit: Some(2),
            ..Default::default()
        };
        let ids: Vec<String> = filter(sample(), &query).unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["1", "2"]);

        let query = ArticleQuery {
            community: Some("oak-hill".to_string()),
            ..Default::default()
        };
        assert_eq!(filter(sample(), &query).unwrap().len(), 1);

        let query = ArticleQuery {
            q: Some("BREAD".to_string()),
            ..Default::default()
        };
        assert_eq!(filter(sample(), &query).unwrap()[0].id, "3");

        let query = ArticleQuery {
            category: Some("gardening".to_string()),
            ..Default::default()
        };
        assert!(filter(sample(), &query).is_err());
    }

    #[test]
    fn test_related_excludes_self_and_caps() {
        let items = sample();
        let related = related(&items, &items[0], RELATED_LIMIT);
        let ids: Vec<&str> = related.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "4", "5", "6"]);
    }

    #[test]
    fn test_home_puts_featured_first() {
        let page = home(&sample());
        assert_eq!(page.featured.len(), 1);
        assert_eq!(page.featured[0].id, "4");
        assert!(page.latest.iter().all(|a| a.id != "4"));
        let politics = page
            .categories
            .iter()
            .find(|c| c.category == Category::Politics)
            .unwrap();
        assert_eq!(politics.count, 5);
        assert_eq!(page.categories.len(), Category::ALL.len());
    }

    #[test]
    fn test_by_slug() {
        let items = sample();
        assert_eq!(by_slug(&items, "oak-hill-bakery-opens").unwrap().id, "3");
        assert!(by_slug(&items, "nope").is_none());
    }
}
