use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::InvoiceStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub invoice_number: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: InvoiceStatus,
    pub description: Option<String>,
    pub issued_at: NaiveDate,
    pub due_at: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub organization_id: Uuid,
    pub invoice_number: String,
    pub amount: Decimal,
    pub currency: String,
    pub description: Option<String>,
    pub issued_at: NaiveDate,
    pub due_at: NaiveDate,
}

/// Per-organization billing preferences, one row per organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct BillingSettings {
    pub organization_id: Uuid,
    pub billing_email: Option<String>,
    pub payment_term_days: i32,
    pub currency: String,
    pub auto_invoice: bool,
    pub updated_at: DateTime<Utc>,
}

impl BillingSettings {
    pub fn defaults_for(organization_id: Uuid) -> Self {
        Self {
            organization_id,
            billing_email: None,
            payment_term_days: 30,
            currency: "EUR".to_string(),
            auto_invoice: false,
            updated_at: Utc::now(),
        }
    }
}
