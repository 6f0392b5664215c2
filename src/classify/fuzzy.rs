//! Approximate re-clustering of exact groups.
//!
//! Each group is represented by its earliest member's body. Bodies are split into tokens
//! (whitespace and markup punctuation) and diffed as token sequences with `similar`:
//!
//! ```text
//! similarity = 2 * matched_tokens / (len_a + len_b)      (two empty bodies score 1.0)
//! ```
//!
//! Two groups are linked when their similarity is strictly greater than the threshold
//! (0.95 by default); the merged partition is the set of connected components of that
//! graph. Because components depend only on pairwise scores, the result does not depend on
//! input order, and a second pass over the output merges nothing new.
//!
//! Each diff runs under a deadline so that very large pages cannot stall the pass.

use crate::classify::signature::sort_groups;
use crate::config::{ScanConfig, DEFAULT_FUZZY_THRESHOLD};
use crate::models::{Group, ScanRecord};
use rayon::prelude::*;
use similar::TextDiff;
use std::time::{Duration, Instant};
use tracing::debug;

/// Upper bound on the time spent diffing one pair of bodies.
const DIFF_DEADLINE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct FuzzyClusterer {
    threshold: f64,
}

impl FuzzyClusterer {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.fuzzy_threshold)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Merge groups whose representative bodies are near-identical. Output is in presentation order.
    pub fn cluster(&self, mut groups: Vec<Group>) -> Vec<Group> {
        // Canonical order so that union roots never depend on how the input was arranged
        groups.sort_by(|a, b| {
            a.first_seen()
                .cmp(&b.first_seen())
                .then_with(|| a.signature.cmp(&b.signature))
        });

        let n = groups.len();
        let tokens: Vec<Option<Vec<&str>>> = groups
            .iter()
            .map(|g| g.representative().and_then(body_of).map(tokenize))
            .collect();
        let digests: Vec<Option<&str>> = groups
            .iter()
            .map(|g| {
                g.representative()
                    .and_then(ScanRecord::response)
                    .map(|c| c.body_digest.as_str())
            })
            .collect();

        let tokens = &tokens;
        let digests = &digests;
        let threshold = self.threshold;
        let edges: Vec<(usize, usize)> = (0..n)
            .into_par_iter()
            .flat_map_iter(|i| {
                (i + 1..n)
                    .filter(move |&j| linked(i, j, tokens, digests, threshold))
                    .map(move |j| (i, j))
            })
            .collect();

        let mut parent: Vec<usize> = (0..n).collect();
        for &(i, j) in &edges {
            let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
            if ri != rj {
                // Earliest group stays the root
                let (lo, hi) = if ri < rj { (ri, rj) } else { (rj, ri) };
                parent[hi] = lo;
            }
        }

        let mut components: Vec<Vec<usize>> = vec![Vec::new(); n];
        for i in 0..n {
            let root = find(&mut parent, i);
            components[root].push(i);
        }

        let mut slots: Vec<Option<Group>> = groups.into_iter().map(Some).collect();
        let mut merged = Vec::new();
        for component in components.into_iter().filter(|c| !c.is_empty()) {
            let mut parts = component.into_iter().filter_map(|i| slots[i].take());
            let Some(mut root) = parts.next() else {
                continue;
            };
            for part in parts {
                debug!(into = ?root.signature, from = ?part.signature, "fuzzy merge");
                root.merged_signatures.push(part.signature);
                root.merged_signatures.extend(part.merged_signatures);
                root.members.extend(part.members);
            }
            root.merged_signatures.sort();
            root.merged_signatures.dedup();
            root.members.sort_by_key(|m| m.index);
            merged.push(root);
        }

        sort_groups(&mut merged);
        merged
    }
}

fn body_of(record: &ScanRecord) -> Option<&str> {
    record.response().and_then(|c| c.body.as_deref())
}

fn linked(
    i: usize,
    j: usize,
    tokens: &[Option<Vec<&str>>],
    digests: &[Option<&str>],
    threshold: f64,
) -> bool {
    if digests[i].is_some() && digests[i] == digests[j] {
        return true;
    }
    let (Some(a), Some(b)) = (&tokens[i], &tokens[j]) else {
        return false;
    };
    // At most `short` tokens can match, which bounds the score from above
    let (short, long) = if a.len() <= b.len() { (a.len(), b.len()) } else { (b.len(), a.len()) };
    if long > 0 && (2 * short) as f64 / (short + long) as f64 <= threshold {
        return false;
    }
    token_similarity(a, b) > threshold
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

pub fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| c.is_whitespace() || matches!(c, '<' | '>' | '"' | '\'' | '=' | ';' | ','))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Normalised similarity of two bodies in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    token_similarity(&tokenize(a), &tokenize(b))
}

fn token_similarity(a: &[&str], b: &[&str]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let diff = TextDiff::configure()
        .deadline(Instant::now() + DIFF_DEADLINE)
        .diff_slices(a, b);
    f64::from(diff.ratio())
}

impl Default for FuzzyClusterer {
    fn default() -> Self {
        Self::new(DEFAULT_FUZZY_THRESHOLD)
    }
}
