use scraper::{Html, Selector};
use serde_json::Value;

/// Article fields found in `<script type="application/ld+json">` blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonLd {
    pub headline: Option<String>,
    pub description: Option<String>,
    pub date_published: Option<String>,
    pub image: Option<String>,
    pub authors: Vec<String>,
}

/// Every JSON-LD node in the document, with `@graph` and top-level arrays flattened.
fn nodes(document: &Html) -> Vec<Value> {
    let mut out = Vec::new();
    let Ok(script_selector) = Selector::parse("script[type='application/ld+json']") else {
        return out;
    };
    for script in document.select(&script_selector) {
        let Ok(json) = serde_json::from_str::<Value>(script.text().collect::<String>().trim()) else {
            continue;
        };
        let mut pending = vec![json];
        while let Some(node) = pending.pop() {
            match node {
                Value::Array(items) => pending.extend(items.into_iter().rev()),
                Value::Object(mut obj) => {
                    if let Some(graph) = obj.remove("@graph") {
                        pending.push(graph);
                    }
                    out.push(Value::Object(obj));
                }
                _ => {}
            }
        }
    }
    out
}

fn names(value: &Value, into: &mut Vec<String>) {
    match value {
        Value::Array(arr) => arr.iter().for_each(|v| names(v, into)),
        Value::Object(obj) => {
            if let Some(name) = obj.get("name").and_then(Value::as_str) {
                into.push(name.trim().to_string());
            }
        }
        Value::String(s) => into.push(s.trim().to_string()),
        _ => {}
    }
}

fn string_field(node: &Value, key: &str) -> Option<String> {
    match node.get(key)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Object(obj) => obj.get("url").and_then(Value::as_str).map(|s| s.trim().to_string()),
        Value::Array(items) => items.iter().find_map(|i| match i {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Object(obj) => obj.get("url").and_then(Value::as_str).map(|s| s.trim().to_string()),
            _ => None,
        }),
        _ => None,
    }
    .filter(|s| !s.is_empty())
}

/// Extracts authors from JSON-LD metadata in the HTML document.
pub fn extract_authors(document: &Html) -> Vec<String> {
    let mut authors = Vec::new();
    for node in nodes(document) {
        if let Some(author) = node.get("author") {
            names(author, &mut authors);
        }
    }
    authors.retain(|a| !a.is_empty());
    authors.dedup();
    authors
}

/// First non-empty value of each field across all nodes.
pub fn extract(document: &Html) -> JsonLd {
    let all = nodes(document);
    let first = |key: &str| all.iter().find_map(|n| string_field(n, key));
    JsonLd {
        headline: first("headline"),
        description: first("description"),
        date_published: first("datePublished"),
        image: first("image"),
        authors: extract_authors(document),
    }
}
