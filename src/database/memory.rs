use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{
    BillingSettings, Connection, ConnectionUpdate, HierarchyNode, Invoice, NewConnection,
    NewInvoice, NewNode, NewTask, NodePatch, Organization, OrganizationBilling, Task, TaskPatch,
};
use super::store::{BillingStore, ConnectionStore, HierarchyStore, OrganizationStore, Store, TaskStore};
use crate::hierarchy::HierarchyLevel;
use crate::types::{InvoiceStatus, TaskStatus};

#[derive(Default)]
struct Tables {
    organizations: HashMap<Uuid, Organization>,
    /// Every level except organizations
    nodes: HashMap<HierarchyLevel, HashMap<Uuid, HierarchyNode>>,
    connections: HashMap<Uuid, Connection>,
    billing_settings: HashMap<Uuid, BillingSettings>,
    invoices: HashMap<Uuid, Invoice>,
    tasks: HashMap<Uuid, Task>,
}

impl Tables {
    fn organization_node(org: &Organization) -> HierarchyNode {
        HierarchyNode {
            id: org.id,
            name: org.name.clone(),
            description: org.description.clone(),
            parent_id: None,
            created_at: org.created_at,
            updated_at: org.updated_at,
        }
    }

    fn node(&self, level: HierarchyLevel, id: Uuid) -> Option<HierarchyNode> {
        match level {
            HierarchyLevel::Organization => self.organizations.get(&id).map(Self::organization_node),
            _ => self.nodes.get(&level).and_then(|nodes| nodes.get(&id)).cloned(),
        }
    }

    fn exists(&self, level: HierarchyLevel, id: Uuid) -> bool {
        match level {
            HierarchyLevel::Organization => self.organizations.contains_key(&id),
            _ => self.nodes.get(&level).is_some_and(|nodes| nodes.contains_key(&id)),
        }
    }

    fn children_of(&self, level: HierarchyLevel, id: Uuid) -> i64 {
        let Some(child) = level.child() else {
            return 0;
        };
        self.nodes
            .get(&child)
            .map(|nodes| nodes.values().filter(|n| n.parent_id == Some(id)).count() as i64)
            .unwrap_or(0)
    }

    /// Fill the joined organization name the way the SQL read does
    fn with_organization_name(&self, mut connection: Connection) -> Connection {
        connection.organization_name = connection
            .organization_id
            .and_then(|id| self.organizations.get(&id))
            .map(|org| org.name.clone());
        connection
    }

    fn connection(&self, id: Uuid) -> Option<Connection> {
        self.connections
            .get(&id)
            .cloned()
            .map(|c| self.with_organization_name(c))
    }

    /// Mirrors `ON DELETE SET NULL` on the connection foreign keys
    fn detach_connections(&mut self, level: HierarchyLevel, id: Uuid) {
        for connection in self.connections.values_mut() {
            let slot = match level {
                HierarchyLevel::Organization => &mut connection.organization_id,
                HierarchyLevel::Entity => &mut connection.entity_id,
                HierarchyLevel::Project => &mut connection.project_id,
                HierarchyLevel::Object => &mut connection.object_id,
                HierarchyLevel::Category | HierarchyLevel::Complex => continue,
            };
            if *slot == Some(id) {
                *slot = None;
            }
        }
    }
}

/// In-process store used by tests and `STORE=memory` runs
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HierarchyStore for MemoryStore {
    async fn list_nodes(
        &self,
        level: HierarchyLevel,
        parent_id: Option<Uuid>,
    ) -> Result<Vec<HierarchyNode>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut nodes: Vec<HierarchyNode> = match level {
            HierarchyLevel::Organization => tables
                .organizations
                .values()
                .map(Tables::organization_node)
                .collect(),
            _ => tables
                .nodes
                .get(&level)
                .map(|nodes| {
                    nodes
                        .values()
                        .filter(|n| parent_id.is_none() || n.parent_id == parent_id)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
        };
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(nodes)
    }

    async fn get_node(&self, level: HierarchyLevel, id: Uuid) -> Result<Option<HierarchyNode>, DatabaseError> {
        Ok(self.tables.read().await.node(level, id))
    }

    async fn insert_node(&self, level: HierarchyLevel, node: NewNode) -> Result<HierarchyNode, DatabaseError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let id = Uuid::new_v4();

        if let Some(parent_level) = level.parent() {
            let parent_ok = node.parent_id.is_some_and(|p| tables.exists(parent_level, p));
            if !parent_ok {
                return Err(DatabaseError::Conflict(format!("parent of {} does not exist", level)));
            }
        }

        if level == HierarchyLevel::Organization {
            let org = Organization {
                id,
                name: node.name,
                description: node.description,
                iban: None,
                bic: None,
                vat_number: None,
                invoice_address: None,
                invoice_postal_code: None,
                invoice_city: None,
                invoice_email: None,
                pending_deletion: false,
                scheduled_deletion_time: None,
                created_at: now,
                updated_at: now,
            };
            let inserted = Tables::organization_node(&org);
            tables.organizations.insert(id, org);
            return Ok(inserted);
        }

        let inserted = HierarchyNode {
            id,
            name: node.name,
            description: node.description,
            parent_id: node.parent_id,
            created_at: now,
            updated_at: now,
        };
        tables.nodes.entry(level).or_default().insert(id, inserted.clone());
        Ok(inserted)
    }

    async fn update_node(
        &self,
        level: HierarchyLevel,
        id: Uuid,
        patch: NodePatch,
    ) -> Result<Option<HierarchyNode>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        if level == HierarchyLevel::Organization {
            let Some(org) = tables.organizations.get_mut(&id) else {
                return Ok(None);
            };
            if let Some(name) = patch.name {
                org.name = name;
            }
            if let Some(description) = patch.description {
                org.description = Some(description);
            }
            org.updated_at = now;
            return Ok(Some(Tables::organization_node(org)));
        }

        let Some(node) = tables.nodes.get_mut(&level).and_then(|nodes| nodes.get_mut(&id)) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            node.name = name;
        }
        if let Some(description) = patch.description {
            node.description = Some(description);
        }
        node.updated_at = now;
        Ok(Some(node.clone()))
    }

    async fn delete_node(&self, level: HierarchyLevel, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.exists(level, id) {
            return Ok(false);
        }
        if tables.children_of(level, id) > 0 {
            return Err(DatabaseError::Conflict(format!("{} {} still has children", level, id)));
        }

        if level == HierarchyLevel::Organization {
            tables.organizations.remove(&id);
            tables.billing_settings.remove(&id);
            tables.invoices.retain(|_, invoice| invoice.organization_id != id);
            tables.tasks.retain(|_, task| task.organization_id != id);
        } else if let Some(nodes) = tables.nodes.get_mut(&level) {
            nodes.remove(&id);
        }
        tables.detach_connections(level, id);
        Ok(true)
    }

    async fn count_children(&self, level: HierarchyLevel, id: Uuid) -> Result<i64, DatabaseError> {
        Ok(self.tables.read().await.children_of(level, id))
    }
}

#[async_trait]
impl ConnectionStore for MemoryStore {
    async fn list_connections(&self) -> Result<Vec<Connection>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut connections: Vec<Connection> = tables
            .connections
            .values()
            .cloned()
            .map(|c| tables.with_organization_name(c))
            .collect();
        connections.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(connections)
    }

    async fn get_connection(&self, id: Uuid) -> Result<Option<Connection>, DatabaseError> {
        Ok(self.tables.read().await.connection(id))
    }

    async fn insert_connection(&self, connection: NewConnection) -> Result<Connection, DatabaseError> {
        let mut tables = self.tables.write().await;

        let references = [
            (HierarchyLevel::Object, connection.object_id),
            (HierarchyLevel::Project, connection.project_id),
            (HierarchyLevel::Entity, connection.entity_id),
            (HierarchyLevel::Organization, connection.organization_id),
        ];
        for (level, id) in references {
            if let Some(id) = id {
                if !tables.exists(level, id) {
                    return Err(DatabaseError::Conflict(
                        "connection references a missing hierarchy node".to_string(),
                    ));
                }
            }
        }

        let now = Utc::now();
        let id = Uuid::new_v4();
        let stored = Connection {
            id,
            address: connection.address,
            city: connection.city,
            postal_code: connection.postal_code,
            connection_type: connection.connection_type,
            status: connection.status,
            ean: connection.ean,
            capacity: connection.capacity,
            grid_operator: connection.grid_operator,
            supplier: connection.supplier,
            metering_company: connection.metering_company,
            metering_type: connection.metering_type,
            object_id: connection.object_id,
            project_id: connection.project_id,
            entity_id: connection.entity_id,
            organization_id: connection.organization_id,
            organization_name: None,
            marked_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.connections.insert(id, stored);
        tables
            .connection(id)
            .ok_or_else(|| DatabaseError::NotFound(format!("connection {}", id)))
    }

    async fn update_connection(
        &self,
        id: Uuid,
        update: ConnectionUpdate,
    ) -> Result<Option<Connection>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(connection) = tables.connections.get_mut(&id) else {
            return Ok(None);
        };
        update.apply(connection);
        connection.updated_at = Utc::now();
        Ok(tables.connection(id))
    }

    async fn set_connection_status(&self, id: Uuid, status: &str) -> Result<Option<Connection>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(connection) = tables.connections.get_mut(&id) else {
            return Ok(None);
        };
        connection.status = status.to_string();
        connection.updated_at = Utc::now();
        Ok(tables.connection(id))
    }

    async fn set_connection_marked(
        &self,
        id: Uuid,
        marked_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Connection>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(connection) = tables.connections.get_mut(&id) else {
            return Ok(None);
        };
        connection.marked_at = marked_at;
        connection.updated_at = Utc::now();
        Ok(tables.connection(id))
    }

    async fn count_object_connections(&self, object_id: Uuid) -> Result<i64, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .connections
            .values()
            .filter(|c| c.object_id == Some(object_id))
            .count() as i64)
    }
}

#[async_trait]
impl OrganizationStore for MemoryStore {
    async fn get_organization(&self, id: Uuid) -> Result<Option<Organization>, DatabaseError> {
        Ok(self.tables.read().await.organizations.get(&id).cloned())
    }

    async fn update_billing(
        &self,
        id: Uuid,
        billing: OrganizationBilling,
    ) -> Result<Option<Organization>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(org) = tables.organizations.get_mut(&id) else {
            return Ok(None);
        };
        org.iban = billing.iban;
        org.bic = billing.bic;
        org.vat_number = billing.vat_number;
        org.invoice_address = billing.invoice_address;
        org.invoice_postal_code = billing.invoice_postal_code;
        org.invoice_city = billing.invoice_city;
        org.invoice_email = billing.invoice_email;
        org.updated_at = Utc::now();
        Ok(Some(org.clone()))
    }

    async fn set_deletion(
        &self,
        id: Uuid,
        scheduled: Option<DateTime<Utc>>,
    ) -> Result<Option<Organization>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(org) = tables.organizations.get_mut(&id) else {
            return Ok(None);
        };
        org.pending_deletion = scheduled.is_some();
        org.scheduled_deletion_time = scheduled;
        org.updated_at = Utc::now();
        Ok(Some(org.clone()))
    }

    async fn organizations_due_for_deletion(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .organizations
            .values()
            .filter(|org| org.pending_deletion && org.scheduled_deletion_time.is_some_and(|t| t <= now))
            .map(|org| org.id)
            .collect())
    }
}

#[async_trait]
impl BillingStore for MemoryStore {
    async fn get_billing_settings(&self, organization_id: Uuid) -> Result<Option<BillingSettings>, DatabaseError> {
        Ok(self.tables.read().await.billing_settings.get(&organization_id).cloned())
    }

    async fn upsert_billing_settings(&self, mut settings: BillingSettings) -> Result<BillingSettings, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.organizations.contains_key(&settings.organization_id) {
            return Err(DatabaseError::Conflict(format!(
                "organization {} does not exist",
                settings.organization_id
            )));
        }
        settings.updated_at = Utc::now();
        tables
            .billing_settings
            .insert(settings.organization_id, settings.clone());
        Ok(settings)
    }

    async fn list_invoices(&self, organization_id: Uuid) -> Result<Vec<Invoice>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut invoices: Vec<Invoice> = tables
            .invoices
            .values()
            .filter(|i| i.organization_id == organization_id)
            .cloned()
            .collect();
        invoices.sort_by(|a, b| {
            b.issued_at
                .cmp(&a.issued_at)
                .then_with(|| a.invoice_number.cmp(&b.invoice_number))
        });
        Ok(invoices)
    }

    async fn insert_invoice(&self, invoice: NewInvoice) -> Result<Invoice, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.organizations.contains_key(&invoice.organization_id) {
            return Err(DatabaseError::Conflict(format!(
                "organization {} does not exist",
                invoice.organization_id
            )));
        }
        if tables
            .invoices
            .values()
            .any(|i| i.invoice_number == invoice.invoice_number)
        {
            return Err(DatabaseError::Conflict(format!(
                "invoice number {} already exists",
                invoice.invoice_number
            )));
        }

        let stored = Invoice {
            id: Uuid::new_v4(),
            organization_id: invoice.organization_id,
            invoice_number: invoice.invoice_number,
            amount: invoice.amount,
            currency: invoice.currency,
            status: InvoiceStatus::Draft,
            description: invoice.description,
            issued_at: invoice.issued_at,
            due_at: invoice.due_at,
            created_at: Utc::now(),
        };
        tables.invoices.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn set_invoice_status(&self, id: Uuid, status: InvoiceStatus) -> Result<Option<Invoice>, DatabaseError> {
        let mut tables = self.tables.write().await;
        Ok(tables.invoices.get_mut(&id).map(|invoice| {
            invoice.status = status;
            invoice.clone()
        }))
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn list_tasks(&self, organization_id: Uuid) -> Result<Vec<Task>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut tasks: Vec<Task> = tables
            .tasks
            .values()
            .filter(|t| t.organization_id == organization_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(tasks)
    }

    async fn insert_task(&self, task: NewTask) -> Result<Task, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.organizations.contains_key(&task.organization_id) {
            return Err(DatabaseError::Conflict(format!(
                "organization {} does not exist",
                task.organization_id
            )));
        }
        let now = Utc::now();
        let stored = Task {
            id: Uuid::new_v4(),
            organization_id: task.organization_id,
            title: task.title,
            description: task.description,
            assignee: task.assignee,
            status: TaskStatus::Todo,
            due_date: task.due_date,
            created_at: now,
            updated_at: now,
        };
        tables.tasks.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_task(&self, id: Uuid, patch: TaskPatch) -> Result<Option<Task>, DatabaseError> {
        let mut tables = self.tables.write().await;
        Ok(tables.tasks.get_mut(&id).map(|task| {
            patch.apply(task);
            task.updated_at = Utc::now();
            task.clone()
        }))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConnectionType;

    async fn node(store: &MemoryStore, level: HierarchyLevel, parent_id: Option<Uuid>) -> HierarchyNode {
        store
            .insert_node(level, NewNode { name: format!("{}", level), description: None, parent_id })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn insert_requires_existing_parent() {
        let store = MemoryStore::new();
        let err = store
            .insert_node(
                HierarchyLevel::Entity,
                NewNode { name: "orphan".into(), description: None, parent_id: Some(Uuid::new_v4()) },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_refuses_nodes_with_children() {
        let store = MemoryStore::new();
        let org = node(&store, HierarchyLevel::Organization, None).await;
        node(&store, HierarchyLevel::Entity, Some(org.id)).await;

        assert_eq!(store.count_children(HierarchyLevel::Organization, org.id).await.unwrap(), 1);
        let err = store.delete_node(HierarchyLevel::Organization, org.id).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn deleting_an_organization_detaches_connections() {
        let store = MemoryStore::new();
        let org = node(&store, HierarchyLevel::Organization, None).await;
        let connection = store
            .insert_connection(NewConnection {
                address: "Kerkstraat 1".into(),
                city: "Utrecht".into(),
                postal_code: "3511AB".into(),
                connection_type: ConnectionType::Gas,
                status: "NEW".into(),
                ean: None,
                capacity: None,
                grid_operator: None,
                supplier: None,
                metering_company: None,
                metering_type: None,
                object_id: None,
                project_id: None,
                entity_id: None,
                organization_id: Some(org.id),
            })
            .await
            .unwrap();
        assert_eq!(connection.organization_name.as_deref(), Some("organization"));

        assert!(store.delete_node(HierarchyLevel::Organization, org.id).await.unwrap());
        let after = store.get_connection(connection.id).await.unwrap().unwrap();
        assert_eq!(after.organization_id, None);
        assert_eq!(after.organization_name, None);
    }
}
