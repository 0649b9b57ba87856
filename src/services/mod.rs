pub mod billing_service;
pub mod connection_service;
pub mod hierarchy_service;
pub mod organization_service;
pub mod task_service;

pub use billing_service::{BillingService, BillingSettingsRequest, InvoiceRequest};
pub use connection_service::{
    ConnectionCreated, ConnectionRequest, ConnectionService, PipelinePage, PipelineQuery,
};
pub use hierarchy_service::{DeleteOutcome, HierarchyService};
pub use organization_service::OrganizationService;
pub use task_service::{TaskRequest, TaskService};

use std::collections::HashMap;
use thiserror::Error;

use crate::database::DatabaseError;
use crate::hierarchy::HierarchyError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{message}")]
    Validation {
        message: String,
        field_errors: HashMap<String, String>,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl ServiceError {
    /// Validation failure on a single field
    pub fn invalid(message: &str, field: &str, detail: impl Into<String>) -> Self {
        let mut field_errors = HashMap::new();
        field_errors.insert(field.to_string(), detail.into());
        ServiceError::Validation { message: message.to_string(), field_errors }
    }
}

/// Collects per-field validation messages before failing once
#[derive(Debug, Default)]
pub struct FieldErrors(HashMap<String, String>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self, message: &str) -> Result<(), ServiceError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation { message: message.to_string(), field_errors: self.0 })
        }
    }
}

/// Trim a string and turn blanks into `None`
pub fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
