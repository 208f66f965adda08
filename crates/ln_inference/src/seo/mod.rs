use std::ops::RangeInclusive;

use ln_core::Article;
use serde::Serialize;

use crate::readability::{readability, strip_tags, words, ReadabilityReport};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeoCheck {
    pub name: &'static str,
    pub passed: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeoReport {
    /// Percentage of passed checks, 0-100.
    pub score: u8,
    pub checks: Vec<SeoCheck>,
    pub readability: ReadabilityReport,
}

impl SeoReport {
    pub fn failed(&self) -> impl Iterator<Item = &SeoCheck> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

/// Rule-of-thumb checks for a story before it goes out.
#[derive(Debug, Clone)]
pub struct SeoAnalyzer {
    pub title_chars: RangeInclusive<usize>,
    pub excerpt_chars: RangeInclusive<usize>,
    pub min_body_words: usize,
    pub max_slug_chars: usize,
}

impl Default for SeoAnalyzer {
    fn default() -> Self {
        Self {
            title_chars: 30..=60,
            excerpt_chars: 50..=160,
            min_body_words: 300,
            max_slug_chars: 75,
        }
    }
}

fn check(name: &'static str, passed: bool, ok: &str, fail: String) -> SeoCheck {
    SeoCheck {
        name,
        passed,
        message: if passed { ok.to_string() } else { fail },
    }
}

/// First title word of at least four letters, lowercased.
fn focus_keyword(title: &str) -> Option<String> {
    title
        .split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .find(|w| w.chars().count() >= 4)
}

impl SeoAnalyzer {
    pub fn analyze(&self, article: &Article) -> SeoReport {
        let body_text = strip_tags(&article.body);
        let body_words = words(&body_text).len();
        let title_len = article.title.trim().chars().count();
        let excerpt_len = article.excerpt.trim().chars().count();
        let slug_len = article.slug.chars().count();

        let mut checks = vec![
            check(
                "title_length",
                self.title_chars.contains(&title_len),
                "Title length is in range",
                format!(
                    "Title is {} characters; aim for {}-{}",
                    title_len,
                    self.title_chars.start(),
                    self.title_chars.end()
                ),
            ),
            check(
                "excerpt_length",
                self.excerpt_chars.contains(&excerpt_len),
                "Excerpt length is in range",
                format!(
                    "Excerpt is {} characters; aim for {}-{}",
                    excerpt_len,
                    self.excerpt_chars.start(),
                    self.excerpt_chars.end()
                ),
            ),
            check(
                "body_length",
                body_words >= self.min_body_words,
                "Body is long enough",
                format!("Body has {} words; aim for at least {}", body_words, self.min_body_words),
            ),
            check(
                "image",
                article.image_url.as_deref().is_some_and(|u| !u.trim().is_empty()),
                "Has a lead image",
                "Add a lead image".to_string(),
            ),
            check(
                "tags",
                !article.tags.is_empty(),
                "Has tags",
                "Add at least one tag".to_string(),
            ),
            check(
                "slug_length",
                slug_len > 0 && slug_len <= self.max_slug_chars,
                "Slug length is fine",
                format!("Slug is {} characters; keep it under {}", slug_len, self.max_slug_chars),
            ),
        ];

        let keyword_check = match focus_keyword(&article.title) {
            Some(keyword) => check(
                "keyword_in_body",
                body_text.to_lowercase().contains(&keyword),
                "Title keyword appears in the body",
                format!("Mention \"{}\" in the body", keyword),
            ),
            None => check(
                "keyword_in_body",
                false,
                "",
                "Title has no word of four or more letters to use as a keyword".to_string(),
            ),
        };
        checks.push(keyword_check);

        let passed = checks.iter().filter(|c| c.passed).count();
        let score = ((passed * 100) as f64 / checks.len() as f64).round() as u8;
        SeoReport {
            score,
            checks,
            readability: readability(&article.body),
        }
    }
}
