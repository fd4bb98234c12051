use crate::models::Candidate;
use crate::utils::long_substr;

/// Similarity between two address strings on a 0..=100 scale.
fn similarity(a: &str, b: &str) -> i64 {
    (strsim::normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase()) * 100.0).round() as i64
}

/// A set of reverse-geocode responses for one query point, across every
/// provider that answered. Exposes set-wise operations: deduplication,
/// longest common substring, and best-match extraction against an expected
/// address.
#[derive(Debug, Clone, Default)]
pub struct Address {
    candidates: Vec<Candidate>,
}

impl Address {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn addresses(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.address.as_str()).collect()
    }

    /// Fuzzily de-duplicated address strings. The threshold is the
    /// similarity score (0..=100) at or above which two addresses are
    /// considered the same; it defaults high (95) because small edit
    /// distances between addresses can mean large physical distances.
    /// The first occurrence of each duplicate group is kept.
    pub fn dedupe(&self, threshold: Option<i64>) -> Vec<String> {
        let threshold = threshold.unwrap_or(95);
        let mut kept: Vec<String> = Vec::new();
        for address in self.addresses() {
            if !kept.iter().any(|k| similarity(k, address) >= threshold) {
                kept.push(address.to_string());
            }
        }
        kept
    }

    /// Longest substring common to all candidate addresses; empty when the
    /// set is empty or nothing is shared.
    pub fn longest_common_substring(&self, dedupe: bool) -> String {
        if dedupe {
            let deduped = self.dedupe(None);
            long_substr(&deduped.iter().map(String::as_str).collect::<Vec<_>>())
        } else {
            long_substr(&self.addresses())
        }
    }

    /// The candidates best matching an expected address, scored 0..=100,
    /// best first. At most `limit` distinct address strings are considered,
    /// but every candidate sharing a considered string is returned.
    pub fn extract(&self, expectation: &str, limit: usize) -> Vec<(&Candidate, i64)> {
        let mut distinct: Vec<&str> = Vec::new();
        for address in self.addresses() {
            if !distinct.contains(&address) {
                distinct.push(address);
            }
        }
        let mut scored: Vec<(&str, i64)> = distinct
            .into_iter()
            .map(|a| (a, similarity(expectation, a)))
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored.truncate(limit);

        let mut result = Vec::new();
        for (address, score) in scored {
            for candidate in &self.candidates {
                if candidate.address == address {
                    result.push((candidate, score));
                }
            }
        }
        result
    }
}
