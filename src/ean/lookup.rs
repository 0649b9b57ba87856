use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::EanConfig;
use crate::services::connection_service::ConnectionRequest;
use crate::types::ConnectionType;

#[derive(Debug, Error)]
pub enum EanLookupError {
    #[error("No connection found for EAN {0}")]
    NotFound(String),

    #[error("EAN lookup is not configured")]
    Disabled,

    #[error("EAN lookup service returned {0}")]
    Upstream(StatusCode),

    #[error("EAN lookup request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid EAN lookup URL: {0}")]
    InvalidUrl(String),
}

/// Connection point details returned by the lookup service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EanDetails {
    pub ean: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    #[serde(alias = "postalCode")]
    pub postal_code: Option<String>,
    pub capacity: Option<String>,
    #[serde(alias = "gridOperator")]
    pub grid_operator: Option<String>,
    #[serde(alias = "type", alias = "connectionType")]
    pub connection_type: Option<ConnectionType>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn fill(slot: &mut Option<String>, value: &Option<String>) -> bool {
    if is_blank(slot) && !is_blank(value) {
        *slot = value.clone();
        return true;
    }
    false
}

impl EanDetails {
    /// Copy looked-up values into fields the request left empty.
    /// Returns the names of the fields that were filled.
    pub fn apply_to(&self, request: &mut ConnectionRequest) -> Vec<&'static str> {
        let mut filled = Vec::new();
        if fill(&mut request.address, &self.address) {
            filled.push("address");
        }
        if fill(&mut request.city, &self.city) {
            filled.push("city");
        }
        if fill(&mut request.postal_code, &self.postal_code) {
            filled.push("postal_code");
        }
        if fill(&mut request.grid_operator, &self.grid_operator) {
            filled.push("grid_operator");
        }
        if request.connection_type.is_none() && self.connection_type.is_some() {
            request.connection_type = self.connection_type;
            filled.push("connection_type");
        }
        // Capacity options depend on the type, so only accept a known option
        let capacity_fits = match (request.connection_type, self.capacity.as_deref()) {
            (Some(kind), Some(capacity)) => kind.accepts_capacity(capacity),
            _ => false,
        };
        if capacity_fits && fill(&mut request.capacity, &self.capacity) {
            filled.push("capacity");
        }
        filled
    }
}

#[async_trait]
pub trait EanLookup: Send + Sync {
    async fn lookup(&self, ean: &str) -> Result<EanDetails, EanLookupError>;

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Used when no lookup URL is configured
pub struct DisabledLookup;

#[async_trait]
impl EanLookup for DisabledLookup {
    async fn lookup(&self, _ean: &str) -> Result<EanDetails, EanLookupError> {
        Err(EanLookupError::Disabled)
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Looks codes up with `GET {base}/{ean}`
pub struct HttpEanLookup {
    client: reqwest::Client,
    base_url: url::Url,
}

impl HttpEanLookup {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, EanLookupError> {
        let mut base_url =
            url::Url::parse(base_url).map_err(|e| EanLookupError::InvalidUrl(e.to_string()))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// Build the lookup configured in `ean`, or a disabled one
    pub fn from_config(config: &EanConfig) -> Result<Box<dyn EanLookup>, EanLookupError> {
        match config.lookup_url.as_deref() {
            Some(url) => Ok(Box::new(Self::new(
                url,
                Duration::from_secs(config.lookup_timeout_secs),
            )?)),
            None => Ok(Box::new(DisabledLookup)),
        }
    }

    fn url_for(&self, ean: &str) -> Result<url::Url, EanLookupError> {
        self.base_url
            .join(ean)
            .map_err(|e| EanLookupError::InvalidUrl(e.to_string()))
    }
}

#[async_trait]
impl EanLookup for HttpEanLookup {
    async fn lookup(&self, ean: &str) -> Result<EanDetails, EanLookupError> {
        let url = self.url_for(ean)?;
        tracing::debug!("EAN lookup: GET {}", url);

        let response = self.client.get(url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(EanLookupError::NotFound(ean.to_string())),
            status if status.is_success() => {
                let mut details: EanDetails = response.json().await?;
                details.ean.get_or_insert_with(|| ean.to_string());
                Ok(details)
            }
            status => Err(EanLookupError::Upstream(status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_only_empty_fields() {
        let mut request = ConnectionRequest {
            address: Some("Kerkstraat 1".into()),
            city: Some("  ".into()),
            connection_type: Some(ConnectionType::Electricity),
            ..Default::default()
        };
        let details = EanDetails {
            address: Some("Elders 9".into()),
            city: Some("Utrecht".into()),
            postal_code: Some("3511AB".into()),
            capacity: Some("3x25A".into()),
            grid_operator: Some("Stedin".into()),
            connection_type: Some(ConnectionType::Gas),
            ..Default::default()
        };

        let filled = details.apply_to(&mut request);

        assert_eq!(request.address.as_deref(), Some("Kerkstraat 1"));
        assert_eq!(request.city.as_deref(), Some("Utrecht"));
        assert_eq!(request.connection_type, Some(ConnectionType::Electricity));
        assert_eq!(request.capacity.as_deref(), Some("3x25A"));
        assert_eq!(filled, vec!["city", "postal_code", "grid_operator", "capacity"]);
    }

    #[test]
    fn skips_capacity_that_does_not_fit_the_type() {
        let mut request = ConnectionRequest {
            connection_type: Some(ConnectionType::Gas),
            ..Default::default()
        };
        let details = EanDetails { capacity: Some("3x25A".into()), ..Default::default() };
        assert!(details.apply_to(&mut request).is_empty());
        assert_eq!(request.capacity, None);
    }

    #[test]
    fn accepts_camel_case_payloads() {
        let details: EanDetails = serde_json::from_value(serde_json::json!({
            "address": "Kerkstraat 1",
            "postalCode": "3511AB",
            "gridOperator": "Enexis",
            "type": "electricity"
        }))
        .unwrap();
        assert_eq!(details.postal_code.as_deref(), Some("3511AB"));
        assert_eq!(details.grid_operator.as_deref(), Some("Enexis"));
        assert_eq!(details.connection_type, Some(ConnectionType::Electricity));
    }

    #[test]
    fn joins_code_onto_base_path() {
        let lookup = HttpEanLookup::new("http://lookup.local/api/ean", Duration::from_secs(1)).unwrap();
        assert_eq!(
            lookup.url_for("871685900012345678").unwrap().as_str(),
            "http://lookup.local/api/ean/871685900012345678"
        );
    }

    #[tokio::test]
    async fn disabled_lookup_reports_disabled() {
        let lookup = DisabledLookup;
        assert!(!lookup.is_enabled());
        assert!(matches!(lookup.lookup("871685900012345678").await, Err(EanLookupError::Disabled)));
    }
}
