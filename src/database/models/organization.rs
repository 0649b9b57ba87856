use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub iban: Option<String>,
    pub bic: Option<String>,
    pub vat_number: Option<String>,
    pub invoice_address: Option<String>,
    pub invoice_postal_code: Option<String>,
    pub invoice_city: Option<String>,
    pub invoice_email: Option<String>,
    pub pending_deletion: bool,
    pub scheduled_deletion_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Billing fields written together by the billing form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationBilling {
    pub iban: Option<String>,
    pub bic: Option<String>,
    pub vat_number: Option<String>,
    pub invoice_address: Option<String>,
    pub invoice_postal_code: Option<String>,
    pub invoice_city: Option<String>,
    pub invoice_email: Option<String>,
}

impl From<&Organization> for OrganizationBilling {
    fn from(org: &Organization) -> Self {
        Self {
            iban: org.iban.clone(),
            bic: org.bic.clone(),
            vat_number: org.vat_number.clone(),
            invoice_address: org.invoice_address.clone(),
            invoice_postal_code: org.invoice_postal_code.clone(),
            invoice_city: org.invoice_city.clone(),
            invoice_email: org.invoice_email.clone(),
        }
    }
}
