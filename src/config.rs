use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Default similarity a pair of groups must exceed to be merged by the fuzzy pass.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.95;

/// Longest accepted rate limit or timeout, in seconds (one day).
pub const MAX_INTERVAL_SECS: f64 = 86_400.0;

/// Which response attributes form the exact grouping key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureMode {
    /// `(status code, content length)`.
    #[default]
    StatusLength,
    /// `(status code, content length, sha256 of the body)`.
    ContentDigest,
}

/// Fully resolved scan configuration, built once by the caller and validated by the scanner.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Host, IP literal, or IPv4 last-octet range such as `10.11.1.1-255`.
    pub target: String,
    /// Substituted for `%s` in candidate names. Falls back to the probed address.
    pub base_host: Option<String>,
    pub port: u16,
    /// Logical port announced to the server when scanning through a forwarder.
    pub real_port: Option<u16>,
    pub ssl: bool,
    pub ignore_http_codes: BTreeSet<u16>,
    /// Exact content length to drop. `0` disables the filter.
    pub ignore_content_length: u64,
    pub unique_depth: usize,
    pub fuzzy_logic: bool,
    pub fuzzy_threshold: f64,
    /// Minimum seconds between two requests issued by the same worker.
    pub rate_limit: f64,
    pub add_waf_bypass_headers: bool,
    pub concurrency: usize,
    /// Per-request timeout in seconds.
    pub timeout: f64,
    pub signature_mode: SignatureMode,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            base_host: None,
            port: 80,
            real_port: None,
            ssl: false,
            ignore_http_codes: BTreeSet::from([404]),
            ignore_content_length: 0,
            unique_depth: 1,
            fuzzy_logic: false,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            rate_limit: 0.0,
            add_waf_bypass_headers: false,
            concurrency: 1,
            timeout: 10.0,
            signature_mode: SignatureMode::StatusLength,
        }
    }
}

impl ScanConfig {
    pub fn new(target: impl Into<String>) -> Self {
        Self { target: target.into(), ..Default::default() }
    }

    /// Build a configuration from a loose key/value document. Unknown keys are rejected.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_value(value).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value =
            serde_json::from_str(s).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Self::from_json_value(value)
    }

    pub fn scheme(&self) -> &'static str {
        if self.ssl { "https" } else { "http" }
    }

    pub fn real_port(&self) -> u16 {
        self.real_port.unwrap_or(self.port)
    }

    /// Value substituted for `%s` when probing `address`.
    pub fn base_host_for<'a>(&'a self, address: &'a str) -> &'a str {
        self.base_host.as_deref().unwrap_or(address)
    }

    /// Zero when the value is out of range; `validate` rejects such configurations.
    pub fn rate_limit_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.rate_limit).unwrap_or(Duration::ZERO)
    }

    /// Falls back to ten seconds when the value is out of range.
    pub fn timeout_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout).unwrap_or(Duration::from_secs(10))
    }

    /// Expand the target into the ordered list of addresses to probe.
    pub fn targets(&self) -> Result<Vec<String>, ConfigError> {
        let target = self.target.trim();
        if target.is_empty() {
            return Err(invalid_target(target, "target is empty"));
        }

        if let Some((first, last)) = target.rsplit_once('-') {
            if let Ok(start) = first.parse::<Ipv4Addr>() {
                let end: u8 = last
                    .parse()
                    .map_err(|_| invalid_target(target, "range end must be an octet (0-255)"))?;
                let [a, b, c, from] = start.octets();
                if end < from {
                    return Err(invalid_target(target, "range end is below range start"));
                }
                return Ok((from..=end)
                    .map(|d| Ipv4Addr::new(a, b, c, d).to_string())
                    .collect());
            }
        }

        if target.parse::<IpAddr>().is_ok() || is_hostname(target) {
            Ok(vec![target.to_string()])
        } else {
            Err(invalid_target(target, "not a hostname, IP address or IPv4 range"))
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.targets()?;

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(0));
        }
        if self.real_port == Some(0) {
            return Err(ConfigError::InvalidPort(0));
        }
        if let Some(base) = &self.base_host {
            if base.trim().is_empty() {
                return Err(invalid_value("base_host", "must not be empty"));
            }
        }
        if self.concurrency == 0 {
            return Err(invalid_value("concurrency", "must be at least 1"));
        }
        if !self.rate_limit.is_finite() || self.rate_limit < 0.0 {
            return Err(invalid_value("rate_limit", "must be a non-negative number of seconds"));
        }
        check_interval("rate_limit", self.rate_limit)?;
        if !self.timeout.is_finite() || self.timeout <= 0.0 {
            return Err(invalid_value("timeout", "must be a positive number of seconds"));
        }
        check_interval("timeout", self.timeout)?;
        if !(self.fuzzy_threshold > 0.0 && self.fuzzy_threshold <= 1.0) {
            return Err(invalid_value("fuzzy_threshold", "must be within (0, 1]"));
        }
        Ok(())
    }
}

fn is_hostname(s: &str) -> bool {
    s.len() <= 253
        && s.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
}

fn check_interval(field: &'static str, secs: f64) -> Result<(), ConfigError> {
    if secs > MAX_INTERVAL_SECS || Duration::try_from_secs_f64(secs).is_err() {
        return Err(invalid_value(field, "must not exceed one day"));
    }
    Ok(())
}

fn invalid_target(target: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidTarget { target: target.to_string(), reason: reason.to_string() }
}

fn invalid_value(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue { field, reason: reason.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_documented_values() {
        let c = ScanConfig::new("example.com");
        assert_eq!(c.port, 80);
        assert_eq!(c.real_port(), 80);
        assert_eq!(c.ignore_http_codes, BTreeSet::from([404]));
        assert_eq!(c.ignore_content_length, 0);
        assert_eq!(c.unique_depth, 1);
        assert_eq!(c.concurrency, 1);
        assert!(!c.fuzzy_logic);
        assert_eq!(c.rate_limit_duration(), Duration::ZERO);
        assert_eq!(c.base_host_for("example.com"), "example.com");
        assert!(c.validate().is_ok());
    }

    #[test]
    fn expands_last_octet_range() {
        let c = ScanConfig::new("10.11.1.250-252");
        assert_eq!(
            c.targets().unwrap(),
            vec!["10.11.1.250", "10.11.1.251", "10.11.1.252"]
        );
    }

    #[test]
    fn rejects_inverted_range() {
        let c = ScanConfig::new("10.0.0.9-3");
        assert!(matches!(c.validate(), Err(ConfigError::InvalidTarget { .. })));
    }

    #[test]
    fn hyphenated_hostname_is_not_a_range() {
        let c = ScanConfig::new("dev-box.internal");
        assert_eq!(c.targets().unwrap(), vec!["dev-box.internal"]);
    }

    #[test]
    fn rejects_bad_values() {
        let mut c = ScanConfig::new("example.com");
        c.port = 0;
        assert_eq!(c.validate(), Err(ConfigError::InvalidPort(0)));

        let mut c = ScanConfig::new("example.com");
        c.concurrency = 0;
        assert!(matches!(c.validate(), Err(ConfigError::InvalidValue { field: "concurrency", .. })));

        let mut c = ScanConfig::new("example.com");
        c.rate_limit = -1.0;
        assert!(c.validate().is_err());

        assert!(ScanConfig::new("not a host!").validate().is_err());
        assert!(ScanConfig::new("").validate().is_err());
    }

    #[test]
    fn oversized_intervals_are_rejected() {
        let mut c = ScanConfig::new("example.com");
        c.rate_limit = 1e300;
        assert!(matches!(c.validate(), Err(ConfigError::InvalidValue { field: "rate_limit", .. })));
        assert_eq!(c.rate_limit_duration(), Duration::ZERO);

        let mut c = ScanConfig::new("example.com");
        c.timeout = 1e30;
        assert!(matches!(c.validate(), Err(ConfigError::InvalidValue { field: "timeout", .. })));

        let mut c = ScanConfig::new("example.com");
        c.rate_limit = MAX_INTERVAL_SECS;
        assert!(c.validate().is_ok());
    }

    #[test]
    fn loose_document_rejects_unknown_fields() {
        let err = ScanConfig::from_json_value(json!({"target": "example.com", "treads": 4}));
        assert!(matches!(err, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn loose_document_fills_defaults() {
        let c = ScanConfig::from_json_str(
            r#"{"target": "10.0.0.1", "port": 8080, "ignore_http_codes": [404, 400], "signature_mode": "content_digest"}"#,
        )
        .unwrap();
        assert_eq!(c.port, 8080);
        assert_eq!(c.real_port(), 8080);
        assert_eq!(c.ignore_http_codes, BTreeSet::from([400, 404]));
        assert_eq!(c.signature_mode, SignatureMode::ContentDigest);
        assert_eq!(c.unique_depth, 1);
    }
}
