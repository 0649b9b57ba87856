//! Table access traits. [`PgStore`](super::postgres::PgStore) backs them with
//! PostgreSQL, [`MemoryStore`](super::memory::MemoryStore) keeps everything in
//! process for tests and demos.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{
    BillingSettings, Connection, ConnectionUpdate, HierarchyNode, Invoice, NewConnection,
    NewInvoice, NewNode, NewTask, NodePatch, Organization, OrganizationBilling, Task, TaskPatch,
};
use crate::hierarchy::HierarchyLevel;
use crate::types::InvoiceStatus;

#[async_trait]
pub trait HierarchyStore: Send + Sync {
    /// Nodes at `level`; with a parent id only that parent's children
    async fn list_nodes(
        &self,
        level: HierarchyLevel,
        parent_id: Option<Uuid>,
    ) -> Result<Vec<HierarchyNode>, DatabaseError>;

    async fn get_node(&self, level: HierarchyLevel, id: Uuid) -> Result<Option<HierarchyNode>, DatabaseError>;

    async fn insert_node(&self, level: HierarchyLevel, node: NewNode) -> Result<HierarchyNode, DatabaseError>;

    async fn update_node(
        &self,
        level: HierarchyLevel,
        id: Uuid,
        patch: NodePatch,
    ) -> Result<Option<HierarchyNode>, DatabaseError>;

    /// Delete one node. Connections referencing it lose that reference.
    /// Fails with `Conflict` while the node still has children.
    async fn delete_node(&self, level: HierarchyLevel, id: Uuid) -> Result<bool, DatabaseError>;

    /// Number of nodes one level below whose parent is `id`
    async fn count_children(&self, level: HierarchyLevel, id: Uuid) -> Result<i64, DatabaseError>;
}

#[async_trait]
pub trait ConnectionStore: Send + Sync {
    async fn list_connections(&self) -> Result<Vec<Connection>, DatabaseError>;

    async fn get_connection(&self, id: Uuid) -> Result<Option<Connection>, DatabaseError>;

    async fn insert_connection(&self, connection: NewConnection) -> Result<Connection, DatabaseError>;

    async fn update_connection(
        &self,
        id: Uuid,
        update: ConnectionUpdate,
    ) -> Result<Option<Connection>, DatabaseError>;

    async fn set_connection_status(&self, id: Uuid, status: &str) -> Result<Option<Connection>, DatabaseError>;

    async fn set_connection_marked(
        &self,
        id: Uuid,
        marked_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Connection>, DatabaseError>;

    async fn count_object_connections(&self, object_id: Uuid) -> Result<i64, DatabaseError>;
}

#[async_trait]
pub trait OrganizationStore: Send + Sync {
    async fn get_organization(&self, id: Uuid) -> Result<Option<Organization>, DatabaseError>;

    async fn update_billing(
        &self,
        id: Uuid,
        billing: OrganizationBilling,
    ) -> Result<Option<Organization>, DatabaseError>;

    /// `Some(time)` schedules deletion, `None` cancels it
    async fn set_deletion(
        &self,
        id: Uuid,
        scheduled: Option<DateTime<Utc>>,
    ) -> Result<Option<Organization>, DatabaseError>;

    async fn organizations_due_for_deletion(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, DatabaseError>;
}

#[async_trait]
pub trait BillingStore: Send + Sync {
    async fn get_billing_settings(&self, organization_id: Uuid) -> Result<Option<BillingSettings>, DatabaseError>;

    async fn upsert_billing_settings(&self, settings: BillingSettings) -> Result<BillingSettings, DatabaseError>;

    async fn list_invoices(&self, organization_id: Uuid) -> Result<Vec<Invoice>, DatabaseError>;

    /// Fails with `Conflict` when the invoice number is already taken
    async fn insert_invoice(&self, invoice: NewInvoice) -> Result<Invoice, DatabaseError>;

    async fn set_invoice_status(&self, id: Uuid, status: InvoiceStatus) -> Result<Option<Invoice>, DatabaseError>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list_tasks(&self, organization_id: Uuid) -> Result<Vec<Task>, DatabaseError>;

    async fn insert_task(&self, task: NewTask) -> Result<Task, DatabaseError>;

    async fn update_task(&self, id: Uuid, patch: TaskPatch) -> Result<Option<Task>, DatabaseError>;
}

/// Everything the HTTP layer needs from a backend
#[async_trait]
pub trait Store: HierarchyStore + ConnectionStore + OrganizationStore + BillingStore + TaskStore {
    async fn health_check(&self) -> Result<(), DatabaseError>;
}
