//! Argument completion results and the fuzzy matcher used for enumerations.

use serde::{Deserialize, Serialize};

/// Protocol cap on suggested values in one completion response.
pub const MAX_COMPLETION_VALUES: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
}

impl CompletionResult {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from candidate values, truncating to the protocol cap.
    pub fn from_values(mut values: Vec<String>) -> Self {
        let total = values.len();
        let has_more = total > MAX_COMPLETION_VALUES;
        values.truncate(MAX_COMPLETION_VALUES);
        Self {
            values,
            total: Some(total),
            has_more: Some(has_more),
        }
    }

    /// Re-apply the cap to a result produced by a user completer.
    pub fn capped(self) -> Self {
        if self.values.len() <= MAX_COMPLETION_VALUES {
            return self;
        }
        let total = self.total.unwrap_or(self.values.len()).max(self.values.len());
        let mut values = self.values;
        values.truncate(MAX_COMPLETION_VALUES);
        Self {
            values,
            total: Some(total),
            has_more: Some(true),
        }
    }
}

impl From<Vec<String>> for CompletionResult {
    fn from(values: Vec<String>) -> Self {
        Self::from_values(values)
    }
}

/// Rank `candidates` against a partially typed `input`.
///
/// Prefix matches come first, then substring matches, then near-misses within
/// a small edit distance of the candidate's leading characters. An empty
/// input matches everything in declaration order.
pub fn fuzzy_match(input: &str, candidates: &[String]) -> Vec<String> {
    let needle = input.to_lowercase();
    if needle.is_empty() {
        return candidates.to_vec();
    }
    let needle_len = needle.chars().count();
    let tolerance = (needle_len / 3).max(1);

    let mut scored: Vec<(usize, usize, &String)> = candidates
        .iter()
        .enumerate()
        .filter_map(|(index, candidate)| {
            let hay = candidate.to_lowercase();
            let score = if hay.starts_with(&needle) {
                0
            } else if hay.contains(&needle) {
                1
            } else {
                let head: String = hay.chars().take(needle_len).collect();
                let dist = levenshtein(&needle, &head).min(levenshtein(&needle, &hay));
                if dist > tolerance {
                    return None;
                }
                1 + dist
            };
            Some((score, index, candidate))
        })
        .collect();

    scored.sort_by_key(|(score, index, _)| (*score, *index));
    scored.into_iter().map(|(_, _, c)| c.clone()).collect()
}

/// Compute Levenshtein distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_len = a.chars().count();
    let b_len = b.chars().count();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut previous: Vec<usize> = (0..=b_len).collect();
    let mut current = vec![0usize; b_len + 1];

    for (i, a_char) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b.chars().enumerate() {
            let cost = usize::from(a_char != b_char);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_len]
}
