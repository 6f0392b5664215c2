use crate::config::ScanConfig;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Create the scanning client for a configuration.
///
/// Redirects are never followed so the signature reflects the direct response,
/// and HTTP/1.1 is forced so the `Host` header we set is the one the server sees.
pub fn create_scan_client(config: &ScanConfig) -> reqwest::Result<Client> {
    let timeout = config.timeout_duration();
    ClientBuilder::new()
        .http1_only()
        // One idle connection per worker is enough; vhost probes all hit the same socket address
        .pool_max_idle_per_host(config.concurrency)
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .tcp_nodelay(true)

        // Timeouts
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(5)))

        // Compression
        .gzip(true)
        .brotli(true)

        // Self-signed targets are the norm; handshake failures still surface as request errors
        .use_rustls_tls()
        .danger_accept_invalid_certs(true)

        .redirect(reqwest::redirect::Policy::none())
        .user_agent(USER_AGENT)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let mut config = ScanConfig::new("127.0.0.1");
        config.timeout = 2.5;
        config.concurrency = 4;
        assert!(create_scan_client(&config).is_ok());
    }
}
