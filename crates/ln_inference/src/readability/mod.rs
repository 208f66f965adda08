use scraper::Html;
use serde::Serialize;

/// Visible text of an HTML fragment, with entities decoded.
///
/// `<script>` and `<style>` contents are dropped. Text nodes are joined with
/// a space so adjacent block elements never run words together.
pub fn strip_tags(markup: &str) -> String {
    let fragment = Html::parse_fragment(markup);
    fragment
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|el| matches!(el.name(), "script" | "style"))
            });
            (!hidden).then_some(&**text)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn words(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .collect()
}

pub fn count_sentences(text: &str) -> usize {
    text.split(['.', '!', '?'])
        .filter(|s| s.chars().any(char::is_alphanumeric))
        .count()
}

/// Vowel-group syllable estimate, at least one per word.
pub fn count_syllables(word: &str) -> usize {
    let word: String = word
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect();
    if word.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut prev_vowel = false;
    for c in word.chars() {
        let vowel = matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
        if vowel && !prev_vowel {
            count += 1;
        }
        prev_vowel = vowel;
    }
    if word.ends_with('e') && !word.ends_with("le") && count > 1 {
        count -= 1;
    }
    count.max(1)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadabilityReport {
    pub words: usize,
    pub sentences: usize,
    pub avg_words_per_sentence: f64,
    pub flesch_reading_ease: f64,
    pub grade: &'static str,
}

fn grade_label(score: f64) -> &'static str {
    match score {
        s if s >= 90.0 => "Very easy",
        s if s >= 70.0 => "Easy",
        s if s >= 60.0 => "Standard",
        s if s >= 50.0 => "Fairly difficult",
        s if s >= 30.0 => "Difficult",
        _ => "Very difficult",
    }
}

/// Flesch reading ease of `markup` after stripping tags.
pub fn readability(markup: &str) -> ReadabilityReport {
    let text = strip_tags(markup);
    let words = words(&text);
    if words.is_empty() {
        return ReadabilityReport {
            words: 0,
            sentences: 0,
            avg_words_per_sentence: 0.0,
            flesch_reading_ease: 0.0,
            grade: grade_label(0.0),
        };
    }
    let sentences = count_sentences(&text).max(1);
    let syllables: usize = words.iter().map(|w| count_syllables(w)).sum();
    let wps = words.len() as f64 / sentences as f64;
    let spw = syllables as f64 / words.len() as f64;
    let score = 206.835 - 1.015 * wps - 84.6 * spw;
    ReadabilityReport {
        words: words.len(),
        sentences,
        avg_words_per_sentence: (wps * 10.0).round() / 10.0,
        flesch_reading_ease: (score * 10.0).round() / 10.0,
        grade: grade_label(score),
    }
}
