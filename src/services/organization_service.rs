use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{normalize, FieldErrors, HierarchyService, ServiceError};
use crate::database::models::{Organization, OrganizationBilling};
use crate::database::Store;
use crate::hierarchy::{DeletePolicy, HierarchyLevel};

/// Validate an IBAN with the ISO 13616 mod-97 check. Returns the compact,
/// upper-case form.
pub fn validate_iban(input: &str) -> Result<String, String> {
    let iban: String = input
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();

    if !(15..=34).contains(&iban.len()) {
        return Err(format!("IBAN must be 15 to 34 characters (got {})", iban.len()));
    }
    let bytes = iban.as_bytes();
    if !bytes[..2].iter().all(u8::is_ascii_alphabetic) || !bytes[2..4].iter().all(u8::is_ascii_digit) {
        return Err("IBAN must start with a country code and two check digits".to_string());
    }
    if !bytes.iter().all(u8::is_ascii_alphanumeric) {
        return Err("IBAN may only contain letters and digits".to_string());
    }

    let rearranged = iban[4..].chars().chain(iban[..4].chars());
    let mut remainder: u32 = 0;
    for c in rearranged {
        let value = c.to_digit(36).unwrap_or(0);
        remainder = if value >= 10 {
            (remainder * 100 + value) % 97
        } else {
            (remainder * 10 + value) % 97
        };
    }

    if remainder == 1 {
        Ok(iban)
    } else {
        Err("IBAN checksum is invalid".to_string())
    }
}

/// BIC/SWIFT: 4 bank letters, 2 country letters, 2 location characters and
/// an optional 3 character branch code
pub fn validate_bic(input: &str) -> Result<String, String> {
    let bic = input.trim().to_ascii_uppercase();
    let bytes = bic.as_bytes();
    if bytes.len() != 8 && bytes.len() != 11 {
        return Err(format!("BIC must be 8 or 11 characters (got {})", bytes.len()));
    }
    if !bytes[..6].iter().all(u8::is_ascii_alphabetic) || !bytes[6..].iter().all(u8::is_ascii_alphanumeric) {
        return Err("BIC format is invalid".to_string());
    }
    Ok(bic)
}

/// Dutch VAT number: `NL` + 9 digits + `B` + 2 digits. Spaces and dots are ignored.
pub fn validate_vat_number(input: &str) -> Result<String, String> {
    let vat: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect::<String>()
        .to_ascii_uppercase();
    let bytes = vat.as_bytes();
    let valid = bytes.len() == 14
        && vat.starts_with("NL")
        && bytes[2..11].iter().all(u8::is_ascii_digit)
        && bytes[11] == b'B'
        && bytes[12..].iter().all(u8::is_ascii_digit);
    if valid {
        Ok(vat)
    } else {
        Err("VAT number must look like NL123456789B01".to_string())
    }
}

pub fn validate_email(input: &str) -> Result<String, String> {
    let email = input.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if valid {
        Ok(email.to_string())
    } else {
        Err("Invalid email address".to_string())
    }
}

fn checked(
    value: Option<String>,
    field: &str,
    check: fn(&str) -> Result<String, String>,
    errors: &mut FieldErrors,
) -> Option<String> {
    let value = normalize(value)?;
    match check(&value) {
        Ok(normalized) => Some(normalized),
        Err(message) => {
            errors.add(field, message);
            None
        }
    }
}

/// Organization billing details and scheduled deletion
#[derive(Clone)]
pub struct OrganizationService {
    store: Arc<dyn Store>,
    hierarchy: HierarchyService,
    grace: Duration,
}

impl OrganizationService {
    pub fn new(store: Arc<dyn Store>, deletion_grace_hours: i64) -> Self {
        let hierarchy = HierarchyService::new(store.clone(), DeletePolicy::Cascade);
        Self { store, hierarchy, grace: Duration::hours(deletion_grace_hours) }
    }

    pub async fn get(&self, id: Uuid) -> Result<Organization, ServiceError> {
        self.store
            .get_organization(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Organization {}", id)))
    }

    pub async fn billing(&self, id: Uuid) -> Result<OrganizationBilling, ServiceError> {
        Ok(OrganizationBilling::from(&self.get(id).await?))
    }

    /// Replace the billing fields. Blank values clear the field.
    pub async fn update_billing(
        &self,
        id: Uuid,
        billing: OrganizationBilling,
    ) -> Result<OrganizationBilling, ServiceError> {
        let mut errors = FieldErrors::default();
        let billing = OrganizationBilling {
            iban: checked(billing.iban, "iban", validate_iban, &mut errors),
            bic: checked(billing.bic, "bic", validate_bic, &mut errors),
            vat_number: checked(billing.vat_number, "vat_number", validate_vat_number, &mut errors),
            invoice_address: normalize(billing.invoice_address),
            invoice_postal_code: normalize(billing.invoice_postal_code),
            invoice_city: normalize(billing.invoice_city),
            invoice_email: checked(billing.invoice_email, "invoice_email", validate_email, &mut errors),
        };
        errors.into_result("Invalid billing details")?;

        let org = self
            .store
            .update_billing(id, billing)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Organization {}", id)))?;
        tracing::info!("Updated billing details of organization {}", id);
        Ok(OrganizationBilling::from(&org))
    }

    /// Mark the organization for deletion once the grace period has passed.
    /// An existing schedule is kept.
    pub async fn schedule_deletion(&self, id: Uuid) -> Result<Organization, ServiceError> {
        let org = self.get(id).await?;
        if org.pending_deletion {
            return Ok(org);
        }

        let when = Utc::now() + self.grace;
        let org = self
            .store
            .set_deletion(id, Some(when))
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Organization {}", id)))?;
        tracing::warn!("Organization {} ({}) scheduled for deletion at {}", org.name, id, when);
        Ok(org)
    }

    pub async fn cancel_deletion(&self, id: Uuid) -> Result<Organization, ServiceError> {
        let org = self.get(id).await?;
        if !org.pending_deletion {
            return Err(ServiceError::Conflict(format!(
                "Organization {} has no scheduled deletion",
                id
            )));
        }
        let org = self
            .store
            .set_deletion(id, None)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Organization {}", id)))?;
        tracing::info!("Cancelled deletion of organization {}", id);
        Ok(org)
    }

    /// Delete every organization whose scheduled time is at or before `now`,
    /// including its whole hierarchy. Returns the ids that were removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, ServiceError> {
        let due = self.store.organizations_due_for_deletion(now).await?;
        let mut purged = Vec::with_capacity(due.len());

        for id in due {
            match self
                .hierarchy
                .delete_with(HierarchyLevel::Organization, id, DeletePolicy::Cascade)
                .await
            {
                Ok(outcome) => {
                    tracing::info!("Purged organization {} ({} node(s))", id, outcome.deleted_nodes);
                    purged.push(id);
                }
                Err(e) => tracing::error!("Failed to purge organization {}: {}", id, e),
            }
        }
        Ok(purged)
    }

    /// Run [`purge_expired`](Self::purge_expired) every `every`
    pub fn spawn_purge_task(&self, every: std::time::Duration) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            tracing::info!("Organization purge task started (every {:?})", every);
            loop {
                ticker.tick().await;
                if let Err(e) = service.purge_expired(Utc::now()).await {
                    tracing::error!("Organization purge failed: {}", e);
                }
            }
        })
    }
}
