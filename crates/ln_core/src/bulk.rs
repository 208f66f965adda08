use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::Article;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    Delete,
    Feature,
    Unfeature,
    /// Removes the selected articles, exactly like `Delete`. There is no separate archive store.
    Archive,
}

impl fmt::Display for BulkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BulkAction::Delete => "delete",
            BulkAction::Feature => "feature",
            BulkAction::Unfeature => "unfeature",
            BulkAction::Archive => "archive",
        };
        f.write_str(name)
    }
}

impl FromStr for BulkAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "delete" => Ok(BulkAction::Delete),
            "feature" => Ok(BulkAction::Feature),
            "unfeature" => Ok(BulkAction::Unfeature),
            "archive" => Ok(BulkAction::Archive),
            other => Err(Error::InvalidInput(format!("Unknown bulk action: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkOutcome {
    pub items: Vec<Article>,
    pub affected: usize,
    pub summary: String,
}

fn stories(n: usize) -> String {
    if n == 1 {
        "1 story".to_string()
    } else {
        format!("{} stories", n)
    }
}

/// Applies `action` to every article whose id is in `selected`.
pub fn apply_bulk(items: Vec<Article>, selected: &HashSet<String>, action: BulkAction) -> BulkOutcome {
    let (items, affected) = match action {
        BulkAction::Delete | BulkAction::Archive => {
            let before = items.len();
            let kept: Vec<Article> = items.into_iter().filter(|a| !selected.contains(&a.id)).collect();
            let removed = before - kept.len();
            (kept, removed)
        }
        BulkAction::Feature | BulkAction::Unfeature => {
            let featured = action == BulkAction::Feature;
            let mut affected = 0;
            let items: Vec<Article> = items
                .into_iter()
                .map(|mut a| {
                    if selected.contains(&a.id) {
                        a.featured = featured;
                        affected += 1;
                    }
                    a
                })
                .collect();
            (items, affected)
        }
    };

    let verb = match action {
        BulkAction::Delete => "Deleted",
        BulkAction::Feature => "Featured",
        BulkAction::Unfeature => "Unfeatured",
        BulkAction::Archive => "Archived",
    };
    BulkOutcome {
        items,
        affected,
        summary: format!("{} {}", verb, stories(affected)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn items() -> Vec<Article> {
        let at = Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap();
        ["a", "b", "c"]
            .iter()
            .map(|id| Article::new(*id, format!("Title {}", id), at))
            .collect()
    }

    fn select(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_delete_removes_selected() {
        let outcome = apply_bulk(items(), &select(&["a", "c", "missing"]), BulkAction::Delete);
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0].id, "b");
        assert_eq!(outcome.affected, 2);
        assert_eq!(outcome.summary, "Deleted 2 stories");
    }

    #[test]
    fn test_archive_matches_delete() {
        let selection = select(&["b"]);
        let deleted = apply_bulk(items(), &selection, BulkAction::Delete);
        let archived = apply_bulk(items(), &selection, BulkAction::Archive);
        assert_eq!(deleted.items, archived.items);
        assert_eq!(archived.summary, "Archived 1 story");
    }

    #[test]
    fn test_feature_and_unfeature() {
        let featured = apply_bulk(items(), &select(&["a", "b"]), BulkAction::Feature);
        assert_eq!(featured.items.iter().filter(|a| a.featured).count(), 2);
        assert_eq!(featured.summary, "Featured 2 stories");

        let unfeatured = apply_bulk(featured.items, &select(&["a"]), BulkAction::Unfeature);
        let flags: Vec<bool> = unfeatured.items.iter().map(|a| a.featured).collect();
        assert_eq!(flags, vec![false, true, false]);
    }

    #[test]
    fn test_parse_action() {
        assert_eq!("Archive".parse::<BulkAction>().unwrap(), BulkAction::Archive);
        assert!("publish".parse::<BulkAction>().is_err());
    }
}
