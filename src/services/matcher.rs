// src/services/matcher.rs

//! Fuzzy matching of registry names onto the reference index.
//!
//! Scores live in `[0, 100]`. The best candidate is accepted only when its
//! score is strictly above the threshold, so a candidate scoring exactly
//! the threshold is rejected. Near the threshold this is a heuristic:
//! false positives and negatives are expected.

use std::sync::Arc;

use regex::Regex;

use crate::models::{MatchingConfig, ReferenceRecord};
use crate::services::reference::ReferenceIndex;

/// String similarity on a 0–100 scale.
pub trait Scorer: Send + Sync {
    /// Canonical form both sides are scored in.
    fn normalize(&self, text: &str) -> String {
        text.to_string()
    }

    fn score(&self, query: &str, candidate: &str) -> f64;
}

/// Weighted blend of plain, partial and token-based ratios.
///
/// Text is lowercased and every run of non-alphanumeric characters becomes
/// one space, so `"Apple, raw"` is scored as `"apple raw"`.
pub struct WeightedRatio {
    separators: Regex,
}

impl WeightedRatio {
    pub fn new() -> Self {
        Self {
            separators: Regex::new(r"[^\p{L}\p{N}]+").expect("static pattern"),
        }
    }
}

impl Default for WeightedRatio {
    fn default() -> Self {
        Self::new()
    }
}

impl Scorer for WeightedRatio {
    fn normalize(&self, text: &str) -> String {
        self.separators
            .replace_all(&text.to_lowercase(), " ")
            .trim()
            .to_string()
    }

    fn score(&self, query: &str, candidate: &str) -> f64 {
        let (len_q, len_c) = (query.chars().count(), candidate.chars().count());
        if len_q == 0 || len_c == 0 {
            return 0.0;
        }

        let base = ratio(query, candidate);
        let token = token_sort_ratio(query, candidate).max(token_set_ratio(query, candidate));
        let len_ratio = len_q.max(len_c) as f64 / len_q.min(len_c) as f64;

        let best = if len_ratio < 1.5 {
            base.max(token * 0.95)
        } else {
            let scale = if len_ratio < 8.0 { 0.9 } else { 0.6 };
            base.max(partial_ratio(query, candidate) * scale)
                .max(token * scale * 0.95)
        };

        best.clamp(0.0, 100.0)
    }
}

fn ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// Best alignment of the shorter text against same-width token windows of
/// the longer one.
fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let width = short.split(' ').count();
    let tokens: Vec<&str> = long.split(' ').collect();
    if tokens.len() <= width {
        return ratio(short, long);
    }

    tokens
        .windows(width)
        .map(|window| ratio(short, &window.join(" ")))
        .fold(0.0, f64::max)
}

fn sorted_tokens(text: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = text.split(' ').filter(|t| !t.is_empty()).collect();
    tokens.sort_unstable();
    tokens.dedup();
    tokens
}

fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a).join(" "), &sorted_tokens(b).join(" "))
}

fn token_set_ratio(a: &str, b: &str) -> f64 {
    let (tokens_a, tokens_b) = (sorted_tokens(a), sorted_tokens(b));
    let common: Vec<&str> = tokens_a
        .iter()
        .filter(|t| tokens_b.contains(t))
        .copied()
        .collect();
    let only_a: Vec<&str> = tokens_a
        .iter()
        .filter(|t| !common.contains(t))
        .copied()
        .collect();
    let only_b: Vec<&str> = tokens_b
        .iter()
        .filter(|t| !common.contains(t))
        .copied()
        .collect();

    if !common.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 100.0;
    }

    let sect = common.join(" ");
    let join = |rest: &[&str]| {
        if sect.is_empty() {
            rest.join(" ")
        } else if rest.is_empty() {
            sect.clone()
        } else {
            format!("{} {}", sect, rest.join(" "))
        }
    };
    let (combined_a, combined_b) = (join(&only_a), join(&only_b));

    ratio(&combined_a, &combined_b)
        .max(if sect.is_empty() { 0.0 } else { ratio(&sect, &combined_a) })
        .max(if sect.is_empty() { 0.0 } else { ratio(&sect, &combined_b) })
}

/// Maps names onto the reference index.
pub struct FuzzyMatcher<S: Scorer = WeightedRatio> {
    index: Arc<ReferenceIndex>,
    /// Normalized description paired with the index key, in index order
    candidates: Vec<(String, String)>,
    threshold: f64,
    scorer: S,
}

impl FuzzyMatcher<WeightedRatio> {
    pub fn new(index: Arc<ReferenceIndex>, config: &MatchingConfig) -> Self {
        Self::with_scorer(index, config.threshold, WeightedRatio::new())
    }
}

impl<S: Scorer> FuzzyMatcher<S> {
    pub fn with_scorer(index: Arc<ReferenceIndex>, threshold: f64, scorer: S) -> Self {
        let candidates = index
            .descriptions()
            .map(|d| (scorer.normalize(d), d.to_string()))
            .collect();
        Self {
            index,
            candidates,
            threshold,
            scorer,
        }
    }

    /// Best-scoring description and its score, regardless of the threshold.
    ///
    /// Ties keep the first candidate in index order.
    pub fn best_candidate(&self, name: &str) -> Option<(&str, f64)> {
        if name.trim().is_empty() {
            return None;
        }
        let query = self.scorer.normalize(name);

        let mut best: Option<(&str, f64)> = None;
        for (normalized, key) in &self.candidates {
            let score = self.scorer.score(&query, normalized);
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((key.as_str(), score));
            }
        }
        best
    }

    /// The reference record for `name`, if the best candidate clears the
    /// threshold.
    pub fn best_match(&self, name: &str) -> Option<&ReferenceRecord> {
        let (key, score) = self.best_candidate(name)?;
        if score > self.threshold {
            self.index.get(key)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn index(descriptions: &[&str]) -> Arc<ReferenceIndex> {
        let mut index = ReferenceIndex::new();
        let items: Vec<_> = descriptions
            .iter()
            .map(|d| json!({ "description": d }))
            .collect();
        index.ingest(&json!(items));
        Arc::new(index)
    }

    struct FixedScore(f64);

    impl Scorer for FixedScore {
        fn score(&self, _query: &str, _candidate: &str) -> f64 {
            self.0
        }
    }

    #[test]
    fn normalizes_punctuation_and_case() {
        let scorer = WeightedRatio::new();
        assert_eq!(scorer.normalize("  Apple, RAW (peeled) "), "apple raw peeled");
        assert_eq!(scorer.normalize("Äpple, rått"), "äpple rått");
    }

    #[test]
    fn scores_are_bounded() {
        let scorer = WeightedRatio::new();
        for (a, b) in [("apple", "apple"), ("apple", "zzz"), ("a", "a b c d e f g h i j")] {
            let score = scorer.score(a, b);
            assert!((0.0..=100.0).contains(&score), "{a} / {b}: {score}");
        }
        assert_eq!(scorer.score("apple", "apple"), 100.0);
        assert_eq!(scorer.score("", "apple"), 0.0);
    }

    #[test]
    fn apple_matches_apple_raw() {
        let matcher = FuzzyMatcher::new(
            index(&["Apple, raw", "Beef, ground", "Milk, whole"]),
            &MatchingConfig::default(),
        );

        let record = matcher.best_match("Apple").unwrap();
        assert_eq!(record.description, "Apple, raw");
    }

    #[test]
    fn unrelated_names_do_not_match() {
        let matcher = FuzzyMatcher::new(index(&["Apple, raw"]), &MatchingConfig::default());
        assert!(matcher.best_match("Sill, inlagd").is_none());
    }

    #[test]
    fn empty_names_never_match() {
        let matcher = FuzzyMatcher::with_scorer(index(&["Milk"]), 70.0, FixedScore(100.0));
        assert!(matcher.best_match("").is_none());
        assert!(matcher.best_match("   ").is_none());
    }

    #[test]
    fn score_at_threshold_is_rejected() {
        let matcher = FuzzyMatcher::with_scorer(index(&["Milk"]), 70.0, FixedScore(70.0));
        assert!(matcher.best_match("Milk").is_none());
    }

    #[test]
    fn score_above_threshold_is_accepted() {
        let matcher = FuzzyMatcher::with_scorer(index(&["Milk"]), 70.0, FixedScore(71.0));
        assert_eq!(matcher.best_match("Milk").unwrap().description, "Milk");
    }

    #[test]
    fn matching_is_idempotent() {
        let matcher = FuzzyMatcher::new(
            index(&["Apple, raw", "Apples, dried", "Pineapple, raw"]),
            &MatchingConfig::default(),
        );

        let first = matcher.best_candidate("Apple juice");
        let second = matcher.best_candidate("Apple juice");
        assert_eq!(first, second);
    }

    #[test]
    fn empty_index_matches_nothing() {
        let matcher = FuzzyMatcher::new(index(&[]), &MatchingConfig::default());
        assert!(matcher.best_match("Apple").is_none());
    }
}
