//! Rule-based intent classification: regex patterns over raw natural
//! language text, no LLM involved.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Action, Comparator, Filter, Ordering, SortDirection};

static COUNT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(count|how\s+many)\b").expect("invalid regex")
});

static ASK_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(is\s+there|does|do|are\s+there)\b").expect("invalid regex")
});

static LIMIT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\blimit\s+(\d+)\b").expect("invalid regex")
});

/// Matches e.g. "after 2000", "before 1950", "over 1000000", "above 18".
static COMPARISON_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(after|before|over|above|under|below|at\s+least|at\s+most)\s+(\d+(?:\.\d+)?)\b")
        .expect("invalid regex")
});

static STOPWORDS: &[&str] = &[
    "a", "an", "the", "of", "in", "on", "for", "to", "is", "are", "was", "were", "with",
    "and", "or", "that", "this", "what", "which", "who", "whom", "me", "please", "show",
    "find", "give", "list", "all",
];

/// Classify the SPARQL form an utterance wants, per the ordered rule below.
pub fn classify_action(text: &str) -> Action {
    if COUNT_PREFIX.is_match(text) {
        Action::Count
    } else if ASK_PREFIX.is_match(text) {
        Action::Ask
    } else {
        Action::Select
    }
}

/// Lowercase, split on non-alphanumerics, drop stopwords and a leading
/// action word already consumed by [`classify_action`].
pub fn extract_keywords(text: &str) -> Vec<String> {
    text.to_ascii_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|tok| !tok.is_empty())
        .filter(|tok| !STOPWORDS.contains(tok))
        .map(str::to_string)
        .collect()
}

/// Extract a `LIMIT N` hint, if present.
pub fn extract_limit(text: &str) -> Option<u64> {
    LIMIT_PATTERN.captures(text)?.get(1)?.as_str().parse().ok()
}

fn comparator_for_word(word: &str) -> (Comparator, Option<SortDirection>) {
    match word.to_ascii_lowercase().as_str() {
        "after" | "over" | "above" | "at least" => (Comparator::Gte, Some(SortDirection::Desc)),
        "before" | "under" | "below" | "at most" => (Comparator::Lte, Some(SortDirection::Asc)),
        _ => (Comparator::Eq, None),
    }
}

/// Extract `"after 2000"`-style comparison filters. The matched variable is
/// left as a placeholder (`value`) for the Query Builder to bind against a
/// concrete SPARQL variable once it knows which one the comparison targets.
pub fn extract_filters(text: &str) -> Vec<Filter> {
    COMPARISON_PATTERN
        .captures_iter(text)
        .map(|c| {
            let word = &c[1];
            let value = c[2].to_string();
            let (comparator, _) = comparator_for_word(word);
            Filter { variable: "value".to_string(), comparator, value }
        })
        .collect()
}

/// `"largest first"` / `"smallest first"`-style ordering hints, derived
/// from the same comparison words used for filters.
pub fn extract_ordering(text: &str) -> Option<Ordering> {
    let lower = text.to_ascii_lowercase();
    if lower.contains("largest") || lower.contains("most") || lower.contains("highest") {
        Some(Ordering { variable: "value".to_string(), direction: SortDirection::Desc })
    } else if lower.contains("smallest") || lower.contains("least") || lower.contains("lowest") {
        Some(Ordering { variable: "value".to_string(), direction: SortDirection::Asc })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_count_prefix() {
        assert_eq!(classify_action("how many countries are there"), Action::Count);
        assert_eq!(classify_action("count the rivers"), Action::Count);
    }

    #[test]
    fn classifies_ask_prefix() {
        assert_eq!(classify_action("is there a capital of France"), Action::Ask);
        assert_eq!(classify_action("does Germany have a president"), Action::Ask);
    }

    #[test]
    fn defaults_to_select() {
        assert_eq!(classify_action("list the capitals of Europe"), Action::Select);
    }

    #[test]
    fn extracts_keywords_without_stopwords() {
        let keywords = extract_keywords("show me the capital of France");
        assert!(keywords.contains(&"capital".to_string()));
        assert!(keywords.contains(&"france".to_string()));
        assert!(!keywords.contains(&"the".to_string()));
    }

    #[test]
    fn extracts_limit_hint() {
        assert_eq!(extract_limit("list 10 rivers, limit 25"), Some(25));
        assert_eq!(extract_limit("no limit here"), None);
    }

    #[test]
    fn extracts_numeric_comparison_filter() {
        let filters = extract_filters("cities with population over 1000000");
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].comparator, Comparator::Gte);
        assert_eq!(filters[0].value, "1000000");
    }

    #[test]
    fn extracts_ordering_hint() {
        let ordering = extract_ordering("largest cities first").unwrap();
        assert_eq!(ordering.direction, SortDirection::Desc);
    }
}
