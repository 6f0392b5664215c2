use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised while validating a [`crate::config::ScanConfig`]. A scan never starts when one of these
/// is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("invalid port {0} (expected 1-65535)")]
    InvalidPort(u32),

    #[error("cannot build request URL from {scheme}://{address}:{port}: {reason}")]
    InvalidUrl {
        scheme: String,
        address: String,
        port: u16,
        reason: String,
    },

    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// Malformed or unknown fields in a loose configuration document.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Coarse classification of a per-candidate failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestErrorKind {
    Timeout,
    Connect,
    Tls,
    Body,
    Other,
}

/// A network, timeout or TLS failure for one candidate. Recorded on the scan record, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind:?}: {message}")]
pub struct RequestError {
    pub kind: RequestErrorKind,
    pub message: String,
}

impl RequestError {
    pub fn new(kind: RequestErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    /// Map a reqwest failure onto the error kinds the result set reports.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        let message = error_chain(err);
        let kind = if err.is_timeout() {
            RequestErrorKind::Timeout
        } else if looks_like_tls(&message) {
            RequestErrorKind::Tls
        } else if err.is_connect() {
            RequestErrorKind::Connect
        } else if err.is_body() || err.is_decode() {
            RequestErrorKind::Body
        } else {
            RequestErrorKind::Other
        };
        Self { kind, message }
    }
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        parts.push(inner.to_string());
        source = inner.source();
    }
    parts.join(": ")
}

fn looks_like_tls(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["certificate", "tls", "ssl", "handshake"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// Top-level error returned by the scanner API.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tls_messages_are_detected() {
        assert!(looks_like_tls("invalid peer certificate: UnknownIssuer"));
        assert!(looks_like_tls("TLS handshake eof"));
        assert!(!looks_like_tls("connection refused"));
    }

    #[test]
    fn request_error_display_includes_kind() {
        let err = RequestError::new(RequestErrorKind::Timeout, "operation timed out");
        assert_eq!(err.to_string(), "Timeout: operation timed out");
    }
}
