#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};

use energy_admin_api::config::{AppConfig, StoreBackend};
use energy_admin_api::database::MemoryStore;
use energy_admin_api::ean::{EanDetails, EanLookup, EanLookupError};
use energy_admin_api::routes::app;
use energy_admin_api::state::AppState;
use energy_admin_api::types::ConnectionType;

/// EAN known to the stub lookup
pub const KNOWN_EAN: &str = "871234567890123456";
/// Dutch EAN the stub lookup reports as unknown
pub const UNKNOWN_EAN: &str = "879999999999999999";

/// Answers `KNOWN_EAN` with fixed details, everything else is not found
pub struct StubLookup;

#[async_trait]
impl EanLookup for StubLookup {
    async fn lookup(&self, ean: &str) -> Result<EanDetails, EanLookupError> {
        if ean != KNOWN_EAN {
            return Err(EanLookupError::NotFound(ean.to_string()));
        }
        Ok(EanDetails {
            ean: Some(ean.to_string()),
            address: Some("Stationsplein 1".to_string()),
            city: Some("Utrecht".to_string()),
            postal_code: Some("3511 ED".to_string()),
            capacity: Some("3x25A".to_string()),
            grid_operator: Some("Stedin".to_string()),
            connection_type: Some(ConnectionType::Electricity),
        })
    }
}

pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        let res = self.client.get(self.url(path)).send().await?;
        Ok((res.status(), res.json().await?))
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = self.client.post(self.url(path)).json(&body).send().await?;
        Ok((res.status(), res.json().await?))
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = self.client.put(self.url(path)).json(&body).send().await?;
        Ok((res.status(), res.json().await?))
    }

    pub async fn patch(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = self.client.patch(self.url(path)).json(&body).send().await?;
        Ok((res.status(), res.json().await?))
    }

    pub async fn delete(&self, path: &str) -> Result<(StatusCode, Value)> {
        let res = self.client.delete(self.url(path)).send().await?;
        Ok((res.status(), res.json().await?))
    }

    /// Create a hierarchy node and return its id
    pub async fn node(&self, level: &str, name: &str, parent_id: Option<&str>) -> Result<String> {
        let (status, body) = self
            .post(&format!("/api/hierarchy/{}", level), json!({ "name": name, "parent_id": parent_id }))
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "creating {} failed: {} {}", level, status, body);
        body["data"]["id"].as_str().map(str::to_string).context("node id missing")
    }

    /// Organization down to object; ids in level order
    pub async fn chain(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = Vec::new();
        for level in ["organizations", "entities", "categories", "projects", "complexes", "objects"] {
            let id = self.node(level, &format!("Test {}", level), ids.last().map(String::as_str)).await?;
            ids.push(id);
        }
        Ok(ids)
    }
}

/// Serve the full router on a free port, backed by a fresh in-memory store
pub async fn spawn_server() -> Result<TestServer> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;

    let mut config = AppConfig::development();
    config.store = StoreBackend::Memory;
    config.api.port = port;
    config.api.enable_request_logging = false;

    let state = AppState::new(config, Arc::new(MemoryStore::new()), Arc::new(StubLookup));
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app(state)).await;
    });

    let server = TestServer {
        base_url: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
    };
    server.wait_ready(Duration::from_secs(5)).await?;
    Ok(server)
}

impl TestServer {
    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}
