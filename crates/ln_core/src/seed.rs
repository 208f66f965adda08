use chrono::{TimeZone, Utc};

use crate::types::{Article, Category};

/// Communities that get their own listing page.
pub const COMMUNITIES: &[&str] = &["Downtown", "Riverside", "Northgate", "Oak Hill", "Lakeview"];

struct SeedEntry {
    id: &'static str,
    title: &'static str,
    excerpt: &'static str,
    body: &'static str,
    category: Category,
    author: &'static str,
    community: Option<&'static str>,
    // (year, month, day, hour)
    published: (i32, u32, u32, u32),
    tags: &'static [&'static str],
    featured: bool,
}

const SEED: &[SeedEntry] = &[
    SeedEntry {
        id: "seed-1",
        title: "City Council Approves Downtown Parking Overhaul",
        excerpt: "The council voted 6-1 to replace meters with a pay-by-plate system.",
        body: "<p>After months of debate, the city council approved a plan to modernize downtown parking.</p>",
        category: Category::Politics,
        author: "Maria Lopez",
        community: Some("Downtown"),
        published: (2024, 5, 20, 9),
        tags: &["council", "parking"],
        featured: true,
    },
    SeedEntry {
        id: "seed-2",
        title: "Riverside High Robotics Team Heads to State Finals",
        excerpt: "Students built a robot that sorts recycling in under ten seconds.",
        body: "<p>The Riverside High robotics club qualified for the state championship for the first time.</p>",
        category: Category::Education,
        author: "James Carter",
        community: Some("Riverside"),
        published: (2024, 5, 19, 14),
        tags: &["students", "robotics"],
        featured: false,
    },
    SeedEntry {
        id: "seed-3",
        title: "New Bakery Brings Sourdough to Northgate",
        excerpt: "A family-owned shop opened its doors on Elm Street this weekend.",
        body: "<p>Lines stretched around the block as the bakery opened for business on Saturday.</p>",
        category: Category::Business,
        author: "Priya Shah",
        community: Some("Northgate"),
        published: (2024, 5, 18, 8),
        tags: &["small business", "food"],
        featured: false,
    },
    SeedEntry {
        id: "seed-4",
        title: "Tigers Clinch Playoff Spot With Late Goal",
        excerpt: "A stoppage-time header sent the home crowd into celebration.",
        body: "<p>The Tigers secured a playoff berth with a dramatic 2-1 win over the visiting Hawks.</p>",
        category: Category::Sports,
        author: "Dan Wu",
        community: Some("Oak Hill"),
        published: (2024, 5, 17, 21),
        tags: &["soccer", "playoffs"],
        featured: true,
    },
    SeedEntry {
        id: "seed-5",
        title: "Storm Watch Issued for Lakeview Shoreline",
        excerpt: "Forecasters expect heavy rain and gusts up to 50 mph through Tuesday.",
        body: "<p>Residents near the lake are advised to secure outdoor furniture and avoid the pier.</p>",
        category: Category::Weather,
        author: "Newsroom",
        community: Some("Lakeview"),
        published: (2024, 5, 16, 6),
        tags: &["storm", "forecast"],
        featured: false,
    },
    SeedEntry {
        id: "seed-6",
        title: "Volunteers Plant 300 Trees Along Mill Creek",
        excerpt: "Neighbors turned out for the spring restoration day despite the drizzle.",
        body: "<p>The volunteer effort is part of a five-year plan to restore the creek's canopy.</p>",
        category: Category::Community,
        author: "Ellen Brooks",
        community: Some("Riverside"),
        published: (2024, 5, 15, 11),
        tags: &["volunteers", "environment"],
        featured: false,
    },
];

/// Articles bundled with the site and always part of the published set.
pub fn bundled_articles() -> Vec<Article> {
    SEED.iter()
        .filter_map(|entry| {
            let (y, m, d, h) = entry.published;
            let published_at = Utc.with_ymd_and_hms(y, m, d, h, 0, 0).single()?;
            let mut article = Article::new(entry.id, entry.title, published_at);
            article.excerpt = entry.excerpt.to_string();
            article.body = entry.body.to_string();
            article.category = entry.category;
            article.author = entry.author.to_string();
            article.source = "bundled".to_string();
            article.community = entry.community.map(str::to_string);
            article.tags = entry.tags.iter().map(|t| t.to_string()).collect();
            article.featured = entry.featured;
            Some(article)
        })
        .collect()
}
