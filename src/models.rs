//! Data carried from the dispatcher through classification to the formatter.
//!
//! Serialized field names here are the output schema consumed by `output::*` writers:
//! `status_code`, `content_length`, `body_digest`, `host`, `candidate.name`, `count`.

use crate::errors::RequestError;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::net::IpAddr;
use std::sync::Arc;

/// A single probe unit. Duplicates are legal and simply produce duplicate records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Candidate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<IpAddr>,
}

impl Candidate {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), source_ip: None }
    }
}

impl From<&str> for Candidate {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Candidate {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// What a successful request returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseCapture {
    pub status_code: u16,
    /// Length of the received (decoded) body in bytes.
    pub content_length: u64,
    /// Lowercase hex SHA-256 of the body.
    pub body_digest: String,
    /// Raw body text, retained only when the fuzzy pass needs it.
    #[serde(skip)]
    pub body: Option<Arc<str>>,
    /// Response headers as the HTTP stack hands them over. Repeated names are adjacent,
    /// so interleaving across different names is not guaranteed to match the wire.
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Response(ResponseCapture),
    Failed(RequestError),
}

/// One outcome per dispatched request. Never mutated after the dispatcher creates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRecord {
    /// Position of the candidate in the submitted sequence.
    pub index: usize,
    pub candidate: Candidate,
    /// Host header value actually sent (after `%s` substitution, without port).
    pub host: String,
    pub outcome: Outcome,
}

impl ScanRecord {
    pub fn response(&self) -> Option<&ResponseCapture> {
        match &self.outcome {
            Outcome::Response(r) => Some(r),
            Outcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&RequestError> {
        match &self.outcome {
            Outcome::Response(_) => None,
            Outcome::Failed(e) => Some(e),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error().is_some()
    }
}

/// Exact grouping key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Signature {
    pub status_code: u16,
    pub content_length: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Records sharing a signature (or, after the fuzzy pass, approximate content).
/// Never empty; members are kept in scan order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub signature: Signature,
    /// Signatures of exact groups folded into this one by the fuzzy pass.
    pub merged_signatures: Vec<Signature>,
    pub members: Vec<Arc<ScanRecord>>,
}

impl Group {
    pub fn new(signature: Signature, first: Arc<ScanRecord>) -> Self {
        Self { signature, merged_signatures: Vec::new(), members: vec![first] }
    }

    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// Scan index of the earliest member.
    pub fn first_seen(&self) -> usize {
        self.members.first().map(|m| m.index).unwrap_or(usize::MAX)
    }

    /// The member whose body stands in for the whole group during fuzzy comparison.
    pub fn representative(&self) -> Option<&ScanRecord> {
        self.members.first().map(|m| m.as_ref())
    }

    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.host.as_str())
    }

    pub fn is_fuzzy_merge(&self) -> bool {
        !self.merged_signatures.is_empty()
    }
}

impl Serialize for Group {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Group", 4)?;
        s.serialize_field("signature", &self.signature)?;
        s.serialize_field("count", &self.count())?;
        s.serialize_field("merged_signatures", &self.merged_signatures)?;
        s.serialize_field("members", &self.members)?;
        s.end()
    }
}

/// Finished product of one scan against one target address.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub target: String,
    /// Raw audit sequence in candidate submission order.
    pub records: Vec<Arc<ScanRecord>>,
    /// Presentation order: ascending count, ties by first occurrence.
    pub groups: Vec<Group>,
    pub filtered_count: usize,
    pub unique_depth: usize,
    pub fuzzy_applied: bool,
    /// Set when the scan stopped early; the result covers what was collected.
    pub cancelled: bool,
}

impl ResultSet {
    /// Groups with `count <= unique_depth`, in presentation order.
    pub fn likely_groups(&self) -> Vec<&Group> {
        self.groups
            .iter()
            .filter(|g| g.count() <= self.unique_depth)
            .collect()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ScanRecord> {
        self.records.iter().map(|r| r.as_ref()).filter(|r| r.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn scanned(&self) -> usize {
        self.records.len()
    }

    pub fn grouped_count(&self) -> usize {
        self.groups.iter().map(Group::count).sum()
    }
}

impl Serialize for ResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let errors: Vec<&ScanRecord> = self.errors().collect();
        let mut s = serializer.serialize_struct("ResultSet", 10)?;
        s.serialize_field("target", &self.target)?;
        s.serialize_field("scanned", &self.scanned())?;
        s.serialize_field("filtered_count", &self.filtered_count)?;
        s.serialize_field("error_count", &errors.len())?;
        s.serialize_field("unique_depth", &self.unique_depth)?;
        s.serialize_field("fuzzy_applied", &self.fuzzy_applied)?;
        s.serialize_field("cancelled", &self.cancelled)?;
        s.serialize_field("groups", &self.groups)?;
        s.serialize_field("likely", &self.likely_groups())?;
        s.serialize_field("errors", &errors)?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RequestErrorKind;

    fn ok(index: usize, host: &str, status: u16, len: u64) -> Arc<ScanRecord> {
        Arc::new(ScanRecord {
            index,
            candidate: Candidate::new(host),
            host: host.to_string(),
            outcome: Outcome::Response(ResponseCapture {
                status_code: status,
                content_length: len,
                body_digest: String::new(),
                body: None,
                headers: Vec::new(),
            }),
        })
    }

    #[test]
    fn result_set_counts() {
        let failed = Arc::new(ScanRecord {
            index: 2,
            candidate: Candidate::new("c"),
            host: "c".into(),
            outcome: Outcome::Failed(RequestError::new(RequestErrorKind::Connect, "refused")),
        });
        let a = ok(0, "a", 200, 5);
        let b = ok(1, "b", 200, 9);
        let sig = |len| Signature { status_code: 200, content_length: len, digest: None };
        let rs = ResultSet {
            target: "t".into(),
            records: vec![a.clone(), b.clone(), failed],
            groups: vec![Group::new(sig(5), a), Group::new(sig(9), b)],
            filtered_count: 0,
            unique_depth: 1,
            ..Default::default()
        };
        assert_eq!(rs.scanned(), 3);
        assert_eq!(rs.error_count(), 1);
        assert_eq!(rs.likely_groups().len(), 2);
        assert_eq!(rs.grouped_count() + rs.filtered_count + rs.error_count(), rs.scanned());
    }

    #[test]
    fn serialized_group_carries_count_and_hides_body() {
        let mut rec = (*ok(0, "dev.example.com", 200, 3)).clone();
        if let Outcome::Response(r) = &mut rec.outcome {
            r.body = Some(Arc::from("abc"));
        }
        let group = Group::new(
            Signature { status_code: 200, content_length: 3, digest: None },
            Arc::new(rec),
        );
        let v = serde_json::to_value(&group).unwrap();
        assert_eq!(v["count"], 1);
        assert_eq!(v["members"][0]["host"], "dev.example.com");
        assert_eq!(v["members"][0]["outcome"]["response"]["status_code"], 200);
        assert!(v["members"][0]["outcome"]["response"].get("body").is_none());
    }
}
