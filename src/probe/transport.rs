use crate::config::ScanConfig;
use crate::errors::RequestError;
use crate::http_client::create_scan_client;
use crate::models::ResponseCapture;
use crate::probe::request::ProbeRequest;
use async_trait::async_trait;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Status, headers and body exactly as the server sent them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Reduce to the captured form. The body text is kept only when `keep_body` is set.
    pub fn into_capture(self, keep_body: bool) -> ResponseCapture {
        let body_digest = format!("{:x}", Sha256::digest(&self.body));
        let body = keep_body.then(|| Arc::<str>::from(String::from_utf8_lossy(&self.body).into_owned()));
        ResponseCapture {
            status_code: self.status,
            content_length: self.body.len() as u64,
            body_digest,
            body,
            headers: self.headers,
        }
    }
}

/// Sends one probe. Implementations must report failures as values, never panic.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ProbeRequest) -> Result<RawResponse, RequestError>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &ScanConfig) -> reqwest::Result<Self> {
        Ok(Self::new(create_scan_client(config)?))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ProbeRequest) -> Result<RawResponse, RequestError> {
        let mut builder = self.client.get(request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RequestError::from_reqwest(&e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| RequestError::from_reqwest(&e))?;

        Ok(RawResponse { status, headers, body: body.to_vec() })
    }
}
