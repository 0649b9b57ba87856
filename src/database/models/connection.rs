use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::PipelineItem;
use crate::types::ConnectionType;

/// Energy connection (request). Never hard-deleted; `marked_at` flags it instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: Uuid,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub connection_type: ConnectionType,
    pub status: String,
    pub ean: Option<String>,
    pub capacity: Option<String>,
    pub grid_operator: Option<String>,
    pub supplier: Option<String>,
    pub metering_company: Option<String>,
    pub metering_type: Option<String>,
    pub object_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub entity_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    /// Joined from `organizations`, read-only
    pub organization_name: Option<String>,
    pub marked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PipelineItem for Connection {
    fn status(&self) -> &str {
        &self.status
    }

    fn search_fields(&self) -> [Option<&str>; 4] {
        [
            Some(self.address.as_str()),
            Some(self.city.as_str()),
            self.organization_name.as_deref(),
            self.ean.as_deref(),
        ]
    }
}

/// Validated insert payload produced by the connection service
#[derive(Debug, Clone)]
pub struct NewConnection {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub connection_type: ConnectionType,
    pub status: String,
    pub ean: Option<String>,
    pub capacity: Option<String>,
    pub grid_operator: Option<String>,
    pub supplier: Option<String>,
    pub metering_company: Option<String>,
    pub metering_type: Option<String>,
    pub object_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub entity_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
}

/// Body of a connection edit. Blank optional fields clear the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectionPatch {
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub ean: Option<String>,
    pub capacity: Option<String>,
    pub grid_operator: Option<String>,
    pub supplier: Option<String>,
    pub metering_company: Option<String>,
    pub metering_type: Option<String>,
}

/// Validated changes to a stored connection. For nullable columns
/// `Some(None)` clears the value.
#[derive(Debug, Clone, Default)]
pub struct ConnectionUpdate {
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub ean: Option<Option<String>>,
    pub capacity: Option<Option<String>>,
    pub grid_operator: Option<Option<String>>,
    pub supplier: Option<Option<String>>,
    pub metering_company: Option<Option<String>>,
    pub metering_type: Option<Option<String>>,
}

impl ConnectionUpdate {
    /// Nullable columns paired with their new value
    pub fn nullable_columns(&self) -> [(&'static str, &Option<Option<String>>); 6] {
        [
            ("ean", &self.ean),
            ("capacity", &self.capacity),
            ("grid_operator", &self.grid_operator),
            ("supplier", &self.supplier),
            ("metering_company", &self.metering_company),
            ("metering_type", &self.metering_type),
        ]
    }

    pub fn apply(self, connection: &mut Connection) {
        if let Some(v) = self.address {
            connection.address = v;
        }
        if let Some(v) = self.city {
            connection.city = v;
        }
        if let Some(v) = self.postal_code {
            connection.postal_code = v;
        }
        if let Some(v) = self.ean {
            connection.ean = v;
        }
        if let Some(v) = self.capacity {
            connection.capacity = v;
        }
        if let Some(v) = self.grid_operator {
            connection.grid_operator = v;
        }
        if let Some(v) = self.supplier {
            connection.supplier = v;
        }
        if let Some(v) = self.metering_company {
            connection.metering_company = v;
        }
        if let Some(v) = self.metering_type {
            connection.metering_type = v;
        }
    }
}
