use anyhow::{anyhow, Context};
use serde_json::Value;
use std::time::Duration;

/// Thin reqwest wrapper that unwraps the API's success envelope
pub struct ApiClient {
    http: reqwest::Client,
    base_url: url::Url,
}

impl ApiClient {
    pub fn new(server: &str) -> anyhow::Result<Self> {
        let base_url = url::Url::parse(server).with_context(|| format!("invalid server URL '{}'", server))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { http, base_url })
    }

    pub fn url(&self, path: &str) -> anyhow::Result<url::Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("cannot build URL for '{}'", path))
    }

    /// GET `path` and return the `data` member of the envelope. Error
    /// envelopes become errors carrying the server's message.
    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> anyhow::Result<Value> {
        let url = self.url(path)?;
        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(url.clone())
            .query(query)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .with_context(|| format!("{} returned a non-JSON body ({})", url, status))?;

        if body.get("error").and_then(Value::as_bool).unwrap_or(false) || !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("request failed");
            let code = body.get("code").and_then(Value::as_str).unwrap_or("UNKNOWN");
            return Err(anyhow!("{} ({}, HTTP {})", message, code, status.as_u16()));
        }

        Ok(body.get("data").cloned().unwrap_or(Value::Null))
    }
}
