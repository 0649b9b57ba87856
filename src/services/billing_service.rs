use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::organization_service::validate_email;
use super::{normalize, FieldErrors, ServiceError};
use crate::database::models::{BillingSettings, Invoice, NewInvoice};
use crate::database::{DatabaseError, Store};
use crate::types::InvoiceStatus;

const MAX_PAYMENT_TERM_DAYS: i32 = 365;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillingSettingsRequest {
    pub billing_email: Option<String>,
    pub payment_term_days: Option<i32>,
    pub currency: Option<String>,
    pub auto_invoice: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceRequest {
    pub invoice_number: String,
    pub amount: Decimal,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub issued_at: Option<NaiveDate>,
    pub due_at: Option<NaiveDate>,
}

fn valid_currency(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase())
}

/// Billing settings and invoices of an organization
#[derive(Clone)]
pub struct BillingService {
    store: Arc<dyn Store>,
}

impl BillingService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn require_organization(&self, id: Uuid) -> Result<(), ServiceError> {
        match self.store.get_organization(id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::NotFound(format!("Organization {}", id))),
        }
    }

    /// Stored settings, or the defaults when none were saved yet
    pub async fn settings(&self, organization_id: Uuid) -> Result<BillingSettings, ServiceError> {
        self.require_organization(organization_id).await?;
        Ok(self
            .store
            .get_billing_settings(organization_id)
            .await?
            .unwrap_or_else(|| BillingSettings::defaults_for(organization_id)))
    }

    /// Merge the request into the current settings and save them
    pub async fn update_settings(
        &self,
        organization_id: Uuid,
        request: BillingSettingsRequest,
    ) -> Result<BillingSettings, ServiceError> {
        let mut settings = self.settings(organization_id).await?;
        let mut errors = FieldErrors::default();

        if let Some(email) = request.billing_email {
            settings.billing_email = match normalize(Some(email)) {
                Some(email) => match validate_email(&email) {
                    Ok(email) => Some(email),
                    Err(message) => {
                        errors.add("billing_email", message);
                        None
                    }
                },
                None => None,
            };
        }
        if let Some(days) = request.payment_term_days {
            if !(0..=MAX_PAYMENT_TERM_DAYS).contains(&days) {
                errors.add(
                    "payment_term_days",
                    format!("Payment term must be between 0 and {} days", MAX_PAYMENT_TERM_DAYS),
                );
            }
            settings.payment_term_days = days;
        }
        if let Some(currency) = request.currency {
            let currency = currency.trim().to_ascii_uppercase();
            if !valid_currency(&currency) {
                errors.add("currency", "Currency must be a three letter ISO code");
            }
            settings.currency = currency;
        }
        if let Some(auto_invoice) = request.auto_invoice {
            settings.auto_invoice = auto_invoice;
        }
        errors.into_result("Invalid billing settings")?;

        Ok(self.store.upsert_billing_settings(settings).await?)
    }

    pub async fn invoices(&self, organization_id: Uuid) -> Result<Vec<Invoice>, ServiceError> {
        self.require_organization(organization_id).await?;
        Ok(self.store.list_invoices(organization_id).await?)
    }

    /// Create a draft invoice. Currency and due date default from the
    /// organization's billing settings.
    pub async fn create_invoice(
        &self,
        organization_id: Uuid,
        request: InvoiceRequest,
    ) -> Result<Invoice, ServiceError> {
        let settings = self.settings(organization_id).await?;
        let mut errors = FieldErrors::default();

        let invoice_number = request.invoice_number.trim().to_string();
        if invoice_number.is_empty() {
            errors.add("invoice_number", "Invoice number is required");
        }
        if request.amount <= Decimal::ZERO {
            errors.add("amount", "Amount must be greater than zero");
        }
        let currency = request
            .currency
            .map(|c| c.trim().to_ascii_uppercase())
            .unwrap_or_else(|| settings.currency.clone());
        if !valid_currency(&currency) {
            errors.add("currency", "Currency must be a three letter ISO code");
        }

        let issued_at = request.issued_at.unwrap_or_else(|| Utc::now().date_naive());
        let due_at = match request.due_at {
            Some(due) => due,
            None => issued_at
                .checked_add_days(Days::new(settings.payment_term_days.max(0) as u64))
                .unwrap_or(issued_at),
        };
        if due_at < issued_at {
            errors.add("due_at", "Due date cannot be before the issue date");
        }
        errors.into_result("Invalid invoice")?;

        let invoice = NewInvoice {
            organization_id,
            invoice_number,
            amount: request.amount.round_dp(2),
            currency,
            description: normalize(request.description),
            issued_at,
            due_at,
        };
        match self.store.insert_invoice(invoice).await {
            Ok(invoice) => {
                tracing::info!("Created invoice {} for organization {}", invoice.invoice_number, organization_id);
                Ok(invoice)
            }
            Err(DatabaseError::Conflict(message)) => Err(ServiceError::Conflict(message)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn set_invoice_status(&self, id: Uuid, status: InvoiceStatus) -> Result<Invoice, ServiceError> {
        let invoice = self
            .store
            .set_invoice_status(id, status)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Invoice {}", id)))?;
        tracing::info!("Invoice {} is now {}", invoice.invoice_number, status.as_str());
        Ok(invoice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::NewNode;
    use crate::database::{HierarchyStore, MemoryStore};
    use crate::hierarchy::HierarchyLevel;
    use std::str::FromStr;

    async fn setup() -> (BillingService, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let org = store
            .insert_node(
                HierarchyLevel::Organization,
                NewNode { name: "Woonstichting Oost".into(), description: None, parent_id: None },
            )
            .await
            .unwrap();
        (BillingService::new(store), org.id)
    }

    fn invoice(number: &str, amount: &str) -> InvoiceRequest {
        InvoiceRequest {
            invoice_number: number.into(),
            amount: Decimal::from_str(amount).unwrap(),
            currency: None,
            description: None,
            issued_at: NaiveDate::from_ymd_opt(2024, 3, 1),
            due_at: None,
        }
    }

    #[tokio::test]
    async fn settings_default_until_saved() {
        let (service, org) = setup().await;
        let settings = service.settings(org).await.unwrap();
        assert_eq!(settings.payment_term_days, 30);
        assert_eq!(settings.currency, "EUR");

        let saved = service
            .update_settings(
                org,
                BillingSettingsRequest { payment_term_days: Some(14), currency: Some("usd".into()), ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(saved.payment_term_days, 14);
        assert_eq!(saved.currency, "USD");

        let rejected = service
            .update_settings(org, BillingSettingsRequest { payment_term_days: Some(-1), ..Default::default() })
            .await;
        assert!(matches!(rejected, Err(ServiceError::Validation { .. })));
        assert!(matches!(service.settings(Uuid::new_v4()).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn invoice_due_date_follows_payment_term() {
        let (service, org) = setup().await;
        let created = service.create_invoice(org, invoice("2024-001", "125.50")).await.unwrap();
        assert_eq!(created.due_at, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(created.currency, "EUR");
        assert_eq!(created.status, InvoiceStatus::Draft);

        let duplicate = service.create_invoice(org, invoice("2024-001", "10")).await;
        assert!(matches!(duplicate, Err(ServiceError::Conflict(_))));

        let paid = service.set_invoice_status(created.id, InvoiceStatus::Paid).await.unwrap();
        assert_eq!(paid.status, InvoiceStatus::Paid);
        assert_eq!(service.invoices(org).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invoice_validation() {
        let (service, org) = setup().await;
        let mut request = invoice(" ", "0");
        request.due_at = NaiveDate::from_ymd_opt(2024, 2, 1);

        match service.create_invoice(org, request).await {
            Err(ServiceError::Validation { field_errors, .. }) => {
                assert!(field_errors.contains_key("invoice_number"));
                assert!(field_errors.contains_key("amount"));
                assert!(field_errors.contains_key("due_at"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
