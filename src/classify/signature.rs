use crate::config::{ScanConfig, SignatureMode};
use crate::models::{Group, ResponseCapture, ScanRecord, Signature};
use ahash::AHashMap;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Exact grouping of the raw record sequence.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Presentation order: ascending count, ties by first occurrence.
    pub groups: Vec<Group>,
    pub filtered_count: usize,
    pub error_count: usize,
}

#[derive(Debug, Clone)]
pub struct SignatureClassifier {
    ignore_http_codes: BTreeSet<u16>,
    ignore_content_length: u64,
    mode: SignatureMode,
}

impl SignatureClassifier {
    pub fn new(ignore_http_codes: BTreeSet<u16>, ignore_content_length: u64, mode: SignatureMode) -> Self {
        Self { ignore_http_codes, ignore_content_length, mode }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(
            config.ignore_http_codes.clone(),
            config.ignore_content_length,
            config.signature_mode,
        )
    }

    /// A filtered response is dropped from every group. Content length `0` disables the length filter.
    pub fn is_filtered(&self, capture: &ResponseCapture) -> bool {
        self.ignore_http_codes.contains(&capture.status_code)
            || (self.ignore_content_length > 0 && capture.content_length == self.ignore_content_length)
    }

    pub fn signature_of(&self, capture: &ResponseCapture) -> Signature {
        Signature {
            status_code: capture.status_code,
            content_length: capture.content_length,
            digest: match self.mode {
                SignatureMode::StatusLength => None,
                SignatureMode::ContentDigest => Some(capture.body_digest.clone()),
            },
        }
    }

    /// Streaming fold over `records`: each surviving record is appended to its signature's group,
    /// creating the group on first occurrence.
    pub fn classify(&self, records: &[Arc<ScanRecord>]) -> Classification {
        let mut by_signature: AHashMap<Signature, usize> = AHashMap::new();
        let mut out = Classification::default();

        for record in records {
            let Some(capture) = record.response() else {
                out.error_count += 1;
                continue;
            };
            if self.is_filtered(capture) {
                out.filtered_count += 1;
                continue;
            }

            let signature = self.signature_of(capture);
            match by_signature.get(&signature) {
                Some(&slot) => out.groups[slot].members.push(record.clone()),
                None => {
                    by_signature.insert(signature.clone(), out.groups.len());
                    out.groups.push(Group::new(signature, record.clone()));
                }
            }
        }

        sort_groups(&mut out.groups);
        out
    }
}

/// Rarest groups first; equal counts keep the order their signatures were first seen.
pub fn sort_groups(groups: &mut [Group]) {
    groups.sort_by_key(|g| (g.count(), g.first_seen()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{RequestError, RequestErrorKind};
    use crate::models::{Candidate, Outcome};

    fn record(index: usize, host: &str, status: u16, body: &str) -> Arc<ScanRecord> {
        Arc::new(ScanRecord {
            index,
            candidate: Candidate::new(host),
            host: host.to_string(),
            outcome: Outcome::Response(ResponseCapture {
                status_code: status,
                content_length: body.len() as u64,
                body_digest: format!("digest-of-{}", body),
                body: None,
                headers: Vec::new(),
            }),
        })
    }

    fn failed(index: usize, host: &str) -> Arc<ScanRecord> {
        Arc::new(ScanRecord {
            index,
            candidate: Candidate::new(host),
            host: host.to_string(),
            outcome: Outcome::Failed(RequestError::new(RequestErrorKind::Timeout, "timed out")),
        })
    }

    fn hosts(group: &Group) -> Vec<&str> {
        group.hosts().collect()
    }

    fn default_classifier() -> SignatureClassifier {
        SignatureClassifier::from_config(&ScanConfig::new("t"))
    }

    #[test]
    fn rare_response_surfaces_first() {
        let big = "x".repeat(500);
        let records = vec![
            record(0, "a", 200, &big),
            record(1, "b", 200, &big),
            record(2, "c", 200, "twelve bytes"),
            record(3, "d", 200, &big),
        ];
        let out = default_classifier().classify(&records);

        assert_eq!(out.groups.len(), 2);
        assert_eq!(hosts(&out.groups[0]), vec!["c"]);
        assert_eq!(out.groups[0].signature.content_length, 12);
        assert_eq!(hosts(&out.groups[1]), vec!["a", "b", "d"]);
        assert_eq!(out.groups[1].count(), 3);
        assert_eq!(out.filtered_count, 0);
    }

    #[test]
    fn ignored_status_codes_are_filtered() {
        let records = vec![record(0, "x", 404, "not found"), record(1, "y", 200, "ok")];
        let out = default_classifier().classify(&records);
        assert_eq!(out.filtered_count, 1);
        assert!(out.groups.iter().all(|g| g.members.iter().all(|m| m.host != "x")));
    }

    #[test]
    fn content_length_filter_and_zero_opt_out() {
        let records = vec![record(0, "a", 200, "12345"), record(1, "b", 200, "123")];

        let classifier = SignatureClassifier::new(BTreeSet::new(), 5, SignatureMode::StatusLength);
        let out = classifier.classify(&records);
        assert_eq!(out.filtered_count, 1);
        assert_eq!(hosts(&out.groups[0]), vec!["b"]);

        let empty = vec![record(0, "e", 200, "")];
        let classifier = SignatureClassifier::new(BTreeSet::new(), 0, SignatureMode::StatusLength);
        let out = classifier.classify(&empty);
        assert_eq!(out.filtered_count, 0);
        assert_eq!(out.groups.len(), 1);
    }

    #[test]
    fn errors_are_counted_apart_from_groups() {
        let records = vec![failed(0, "a"), record(1, "b", 200, "ok"), failed(2, "c")];
        let out = default_classifier().classify(&records);
        assert_eq!(out.error_count, 2);
        assert_eq!(out.groups.len(), 1);
        let grouped: usize = out.groups.iter().map(Group::count).sum();
        assert_eq!(grouped + out.filtered_count + out.error_count, records.len());
    }

    #[test]
    fn equal_counts_keep_first_seen_order() {
        let records = vec![
            record(0, "p", 302, "redirect"),
            record(1, "q", 200, "home page"),
            record(2, "r", 500, "boom"),
        ];
        let out = default_classifier().classify(&records);
        let order: Vec<_> = out.groups.iter().map(|g| g.signature.status_code).collect();
        assert_eq!(order, vec![302, 200, 500]);
    }

    #[test]
    fn digest_mode_splits_same_length_bodies() {
        let records = vec![record(0, "a", 200, "aaaa"), record(1, "b", 200, "bbbb")];
        assert_eq!(default_classifier().classify(&records).groups.len(), 1);

        let classifier = SignatureClassifier::new(BTreeSet::new(), 0, SignatureMode::ContentDigest);
        let out = classifier.classify(&records);
        assert_eq!(out.groups.len(), 2);
        assert_eq!(out.groups[0].signature.digest.as_deref(), Some("digest-of-aaaa"));
    }

    #[test]
    fn classification_is_repeatable() {
        let records: Vec<_> = ["a", "b", "c", "d", "e"]
            .iter()
            .enumerate()
            .map(|(i, h)| record(i, h, 200, if i % 2 == 0 { "even" } else { "odd!!" }))
            .collect();
        let classifier = default_classifier();
        let first = classifier.classify(&records);
        let second = classifier.classify(&records);
        assert_eq!(first.groups, second.groups);
    }
}
