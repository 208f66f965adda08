use ln_core::{Category, Classifier};

/// Bundled keyword table, in scan order.
///
/// Keywords are matched as lowercase substrings, so `vote` also counts
/// inside `voters` and `bill` inside `billion`.
pub const DEFAULT_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Politics,
        &[
            "council", "mayor", "election", "vote", "legislat", "governor", "senator", "bill",
            "ordinance", "campaign", "government", "policy",
        ],
    ),
    (
        Category::Education,
        &[
            "school", "student", "teacher", "education", "university", "college", "classroom",
            "campus", "graduat", "tuition",
        ],
    ),
    (
        Category::Business,
        &[
            "business", "company", "economy", "market", "jobs", "startup", "retail", "restaurant",
            "shop", "investment",
        ],
    ),
    (
        Category::Sports,
        &[
            "game", "team", "score", "season", "coach", "playoff", "championship", "tournament",
            "league", "stadium",
        ],
    ),
    (
        Category::Crime,
        &[
            "police", "arrest", "crime", "suspect", "court", "theft", "robbery", "shooting",
            "investigation", "sheriff",
        ],
    ),
    (
        Category::Health,
        &[
            "health", "hospital", "doctor", "vaccine", "clinic", "medical", "patient", "disease",
            "wellness", "covid",
        ],
    ),
    (
        Category::Weather,
        &[
            "weather", "storm", "rain", "snow", "forecast", "temperature", "flood", "hurricane",
            "tornado", "heat wave",
        ],
    ),
    (
        Category::Entertainment,
        &[
            "concert", "festival", "movie", "film", "music", "theater", "museum", "gallery",
            "exhibit", "celebrity",
        ],
    ),
    (
        Category::Technology,
        &[
            "tech", "software", "internet", "digital", "cyber", "broadband", "smartphone",
            "computer", "robot", "data center",
        ],
    ),
    (
        Category::Community,
        &[
            "community", "volunteer", "neighborhood", "charity", "fundraiser", "nonprofit",
            "library", "parade", "residents",
        ],
    ),
];

/// Scores each category by counting keyword occurrences in the text.
///
/// The highest non-zero score wins. Categories are scanned in table order
/// and a later category only replaces the current best with a strictly
/// higher score, so ties go to whichever category comes first in the table.
/// With no hits at all the default category is returned.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    table: Vec<(Category, Vec<String>)>,
    default: Category,
}

impl KeywordClassifier {
    pub fn new<I, K, S>(table: I, default: Category) -> Self
    where
        I: IntoIterator<Item = (Category, K)>,
        K: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let table = table
            .into_iter()
            .map(|(category, keywords)| {
                let keywords = keywords
                    .into_iter()
                    .map(|k| k.as_ref().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                (category, keywords)
            })
            .collect();
        Self { table, default }
    }

    /// Per-category scores in table order.
    pub fn scores(&self, text: &str) -> Vec<(Category, usize)> {
        let text = text.to_lowercase();
        self.table
            .iter()
            .map(|(category, keywords)| {
                let score = keywords.iter().map(|k| text.matches(k.as_str()).count()).sum();
                (*category, score)
            })
            .collect()
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(
            DEFAULT_KEYWORDS.iter().map(|(c, k)| (*c, k.iter().copied())),
            Category::Local,
        )
    }
}

impl Classifier for KeywordClassifier {
    fn name(&self) -> &str {
        "keyword"
    }

    fn classify(&self, text: &str) -> Category {
        let mut best: Option<(Category, usize)> = None;
        for (category, score) in self.scores(text) {
            if score == 0 {
                continue;
            }
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((category, score)),
            }
        }
        best.map(|(category, _)| category).unwrap_or(self.default)
    }
}
