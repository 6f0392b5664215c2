use crate::config::ScanConfig;
use crate::errors::ConfigError;
use crate::models::Candidate;
use crate::waf::WafBypass;
use std::net::Ipv6Addr;
use url::Url;

/// Placeholder in candidate names replaced by the base host (`%s.example.com` style wordlists).
pub const BASE_HOST_PLACEHOLDER: &str = "%s";

/// Outbound request descriptor. Always a GET against the target root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub url: Url,
    /// Substituted name, without any port suffix.
    pub host: String,
    /// Header list in send order. `Host` is always first.
    pub headers: Vec<(String, String)>,
}

impl ProbeRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Turns candidates into requests against one target address. Pure construction.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    url: Url,
    base_host: String,
    port: u16,
    real_port: u16,
    ssl: bool,
    extra_headers: Vec<(String, String)>,
}

impl RequestBuilder {
    pub fn new(config: &ScanConfig, address: &str) -> Result<Self, ConfigError> {
        let authority = if address.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]", address)
        } else {
            address.to_string()
        };
        let invalid = |reason: String| ConfigError::InvalidUrl {
            scheme: config.scheme().to_string(),
            address: address.to_string(),
            port: config.port,
            reason,
        };

        let url = Url::parse(&format!("{}://{}:{}/", config.scheme(), authority, config.port))
            .map_err(|e| invalid(e.to_string()))?;
        if url.host_str().map_or(true, str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }

        let extra_headers = if config.add_waf_bypass_headers {
            WafBypass::new().headers()
        } else {
            Vec::new()
        };

        Ok(Self {
            url,
            base_host: config.base_host_for(address).to_string(),
            port: config.port,
            real_port: config.real_port(),
            ssl: config.ssl,
            extra_headers,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn build(&self, candidate: &Candidate) -> ProbeRequest {
        let host = candidate.name.replace(BASE_HOST_PLACEHOLDER, &self.base_host);

        let mut headers = Vec::with_capacity(3 + self.extra_headers.len());
        headers.push(("Host".to_string(), self.host_header(&host)));
        headers.push(("Accept".to_string(), "*/*".to_string()));
        if self.real_port != self.port {
            headers.push(("X-Forwarded-Port".to_string(), self.real_port.to_string()));
        }
        headers.extend(self.extra_headers.iter().cloned());

        ProbeRequest { url: self.url.clone(), host, headers }
    }

    // RFC 2616 14.23: the port is part of Host unless it is the scheme default.
    fn host_header(&self, host: &str) -> String {
        let default_port = if self.ssl { 443 } else { 80 };
        if self.real_port == default_port {
            host.to_string()
        } else {
            format!("{}:{}", host, self.real_port)
        }
    }
}
