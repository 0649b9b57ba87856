use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::manager::{DatabaseError, DatabaseManager};
use super::models::{
    BillingSettings, Connection, ConnectionUpdate, HierarchyNode, Invoice, NewConnection,
    NewInvoice, NewNode, NewTask, NodePatch, Organization, OrganizationBilling, Task, TaskPatch,
};
use super::store::{BillingStore, ConnectionStore, HierarchyStore, OrganizationStore, Store, TaskStore};
use crate::hierarchy::HierarchyLevel;
use crate::types::InvoiceStatus;

const FOREIGN_KEY_VIOLATION: &str = "23503";
const UNIQUE_VIOLATION: &str = "23505";

const CONNECTION_SELECT: &str = "SELECT c.id, c.address, c.city, c.postal_code, c.connection_type, \
     c.status, c.ean, c.capacity, c.grid_operator, c.supplier, c.metering_company, c.metering_type, \
     c.object_id, c.project_id, c.entity_id, c.organization_id, o.name AS organization_name, \
     c.marked_at, c.created_at, c.updated_at \
     FROM connections c LEFT JOIN organizations o ON o.id = c.organization_id";

const ORGANIZATION_SELECT: &str = "SELECT id, name, description, iban, bic, vat_number, invoice_address, \
     invoice_postal_code, invoice_city, invoice_email, pending_deletion, scheduled_deletion_time, \
     created_at, updated_at FROM organizations";

const INVOICE_COLUMNS: &str = "id, organization_id, invoice_number, amount, currency, status, \
     description, issued_at, due_at, created_at";

const TASK_COLUMNS: &str = "id, organization_id, title, description, assignee, status, due_date, \
     created_at, updated_at";

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn node_columns(level: HierarchyLevel) -> String {
        let parent = level.parent_column().unwrap_or("NULL::uuid");
        format!("id, name, description, {} AS parent_id, created_at, updated_at", parent)
    }
}

/// Map constraint violations onto store-level conflicts
fn map_constraint(err: sqlx::Error, message: impl FnOnce() -> String) -> DatabaseError {
    if let sqlx::Error::Database(db_err) = &err {
        if let Some(code) = db_err.code() {
            if code == FOREIGN_KEY_VIOLATION || code == UNIQUE_VIOLATION {
                return DatabaseError::Conflict(message());
            }
        }
    }
    DatabaseError::Sqlx(err)
}

#[derive(FromRow)]
struct ConnectionRow {
    id: Uuid,
    address: String,
    city: String,
    postal_code: String,
    connection_type: String,
    status: String,
    ean: Option<String>,
    capacity: Option<String>,
    grid_operator: Option<String>,
    supplier: Option<String>,
    metering_company: Option<String>,
    metering_type: Option<String>,
    object_id: Option<Uuid>,
    project_id: Option<Uuid>,
    entity_id: Option<Uuid>,
    organization_id: Option<Uuid>,
    organization_name: Option<String>,
    marked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ConnectionRow> for Connection {
    type Error = DatabaseError;

    fn try_from(row: ConnectionRow) -> Result<Self, Self::Error> {
        Ok(Connection {
            id: row.id,
            address: row.address,
            city: row.city,
            postal_code: row.postal_code,
            connection_type: row.connection_type.parse().map_err(DatabaseError::QueryError)?,
            status: row.status,
            ean: row.ean,
            capacity: row.capacity,
            grid_operator: row.grid_operator,
            supplier: row.supplier,
            metering_company: row.metering_company,
            metering_type: row.metering_type,
            object_id: row.object_id,
            project_id: row.project_id,
            entity_id: row.entity_id,
            organization_id: row.organization_id,
            organization_name: row.organization_name,
            marked_at: row.marked_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct InvoiceRow {
    id: Uuid,
    organization_id: Uuid,
    invoice_number: String,
    amount: Decimal,
    currency: String,
    status: String,
    description: Option<String>,
    issued_at: NaiveDate,
    due_at: NaiveDate,
    created_at: DateTime<Utc>,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = DatabaseError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        Ok(Invoice {
            id: row.id,
            organization_id: row.organization_id,
            invoice_number: row.invoice_number,
            amount: row.amount,
            currency: row.currency,
            status: row.status.parse().map_err(DatabaseError::QueryError)?,
            description: row.description,
            issued_at: row.issued_at,
            due_at: row.due_at,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct TaskRow {
    id: Uuid,
    organization_id: Uuid,
    title: String,
    description: Option<String>,
    assignee: Option<String>,
    status: String,
    due_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = DatabaseError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: row.id,
            organization_id: row.organization_id,
            title: row.title,
            description: row.description,
            assignee: row.assignee,
            status: row.status.parse().map_err(DatabaseError::QueryError)?,
            due_date: row.due_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl HierarchyStore for PgStore {
    async fn list_nodes(
        &self,
        level: HierarchyLevel,
        parent_id: Option<Uuid>,
    ) -> Result<Vec<HierarchyNode>, DatabaseError> {
        let columns = Self::node_columns(level);
        let nodes = match (level.parent_column(), parent_id) {
            (Some(parent_column), Some(parent_id)) => {
                let sql = format!(
                    "SELECT {} FROM {} WHERE {} = $1 ORDER BY name",
                    columns,
                    level.table_name(),
                    parent_column
                );
                sqlx::query_as::<_, HierarchyNode>(&sql)
                    .bind(parent_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            _ => {
                let sql = format!("SELECT {} FROM {} ORDER BY name", columns, level.table_name());
                sqlx::query_as::<_, HierarchyNode>(&sql).fetch_all(&self.pool).await?
            }
        };
        Ok(nodes)
    }

    async fn get_node(&self, level: HierarchyLevel, id: Uuid) -> Result<Option<HierarchyNode>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            Self::node_columns(level),
            level.table_name()
        );
        let node = sqlx::query_as::<_, HierarchyNode>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(node)
    }

    async fn insert_node(&self, level: HierarchyLevel, node: NewNode) -> Result<HierarchyNode, DatabaseError> {
        let id = Uuid::new_v4();
        let returning = Self::node_columns(level);
        let inserted = match level.parent_column() {
            Some(parent_column) => {
                let sql = format!(
                    "INSERT INTO {} (id, {}, name, description) VALUES ($1, $2, $3, $4) RETURNING {}",
                    level.table_name(),
                    parent_column,
                    returning
                );
                sqlx::query_as::<_, HierarchyNode>(&sql)
                    .bind(id)
                    .bind(node.parent_id)
                    .bind(&node.name)
                    .bind(&node.description)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| map_constraint(e, || format!("parent of {} does not exist", level)))?
            }
            None => {
                let sql = format!(
                    "INSERT INTO {} (id, name, description) VALUES ($1, $2, $3) RETURNING {}",
                    level.table_name(),
                    returning
                );
                sqlx::query_as::<_, HierarchyNode>(&sql)
                    .bind(id)
                    .bind(&node.name)
                    .bind(&node.description)
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(inserted)
    }

    async fn update_node(
        &self,
        level: HierarchyLevel,
        id: Uuid,
        patch: NodePatch,
    ) -> Result<Option<HierarchyNode>, DatabaseError> {
        let sql = format!(
            "UPDATE {} SET name = COALESCE($2, name), description = COALESCE($3, description), \
             updated_at = now() WHERE id = $1 RETURNING {}",
            level.table_name(),
            Self::node_columns(level)
        );
        let node = sqlx::query_as::<_, HierarchyNode>(&sql)
            .bind(id)
            .bind(patch.name)
            .bind(patch.description)
            .fetch_optional(&self.pool)
            .await?;
        Ok(node)
    }

    async fn delete_node(&self, level: HierarchyLevel, id: Uuid) -> Result<bool, DatabaseError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", level.table_name());
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_constraint(e, || format!("{} {} still has children", level, id)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_children(&self, level: HierarchyLevel, id: Uuid) -> Result<i64, DatabaseError> {
        let Some(child) = level.child() else {
            return Ok(0);
        };
        let Some(parent_column) = child.parent_column() else {
            return Ok(0);
        };
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} = $1",
            child.table_name(),
            parent_column
        );
        let count: (i64,) = sqlx::query_as(&sql).bind(id).fetch_one(&self.pool).await?;
        Ok(count.0)
    }
}

#[async_trait]
impl ConnectionStore for PgStore {
    async fn list_connections(&self) -> Result<Vec<Connection>, DatabaseError> {
        let sql = format!("{} ORDER BY c.created_at DESC", CONNECTION_SELECT);
        let rows = sqlx::query_as::<_, ConnectionRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Connection::try_from).collect()
    }

    async fn get_connection(&self, id: Uuid) -> Result<Option<Connection>, DatabaseError> {
        let sql = format!("{} WHERE c.id = $1", CONNECTION_SELECT);
        let row = sqlx::query_as::<_, ConnectionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Connection::try_from).transpose()
    }

    async fn insert_connection(&self, connection: NewConnection) -> Result<Connection, DatabaseError> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO connections (id, address, city, postal_code, connection_type, status, ean, \
             capacity, grid_operator, supplier, metering_company, metering_type, object_id, project_id, \
             entity_id, organization_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
        )
        .bind(id)
        .bind(&connection.address)
        .bind(&connection.city)
        .bind(&connection.postal_code)
        .bind(connection.connection_type.as_str())
        .bind(&connection.status)
        .bind(&connection.ean)
        .bind(&connection.capacity)
        .bind(&connection.grid_operator)
        .bind(&connection.supplier)
        .bind(&connection.metering_company)
        .bind(&connection.metering_type)
        .bind(connection.object_id)
        .bind(connection.project_id)
        .bind(connection.entity_id)
        .bind(connection.organization_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_constraint(e, || "connection references a missing hierarchy node".to_string()))?;

        self.get_connection(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("connection {}", id)))
    }

    async fn update_connection(
        &self,
        id: Uuid,
        update: ConnectionUpdate,
    ) -> Result<Option<Connection>, DatabaseError> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE connections SET updated_at = now()");
        for (column, value) in [
            ("address", &update.address),
            ("city", &update.city),
            ("postal_code", &update.postal_code),
        ] {
            if let Some(value) = value {
                query.push(format!(", {} = ", column)).push_bind(value.clone());
            }
        }
        for (column, value) in update.nullable_columns() {
            if let Some(value) = value {
                query.push(format!(", {} = ", column)).push_bind(value.clone());
            }
        }
        query.push(" WHERE id = ").push_bind(id);

        let result = query.build().execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_connection(id).await
    }

    async fn set_connection_status(&self, id: Uuid, status: &str) -> Result<Option<Connection>, DatabaseError> {
        let result = sqlx::query("UPDATE connections SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_connection(id).await
    }

    async fn set_connection_marked(
        &self,
        id: Uuid,
        marked_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Connection>, DatabaseError> {
        let result = sqlx::query("UPDATE connections SET marked_at = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(marked_at)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_connection(id).await
    }

    async fn count_object_connections(&self, object_id: Uuid) -> Result<i64, DatabaseError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM connections WHERE object_id = $1")
            .bind(object_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}

#[async_trait]
impl OrganizationStore for PgStore {
    async fn get_organization(&self, id: Uuid) -> Result<Option<Organization>, DatabaseError> {
        let sql = format!("{} WHERE id = $1", ORGANIZATION_SELECT);
        let org = sqlx::query_as::<_, Organization>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(org)
    }

    async fn update_billing(
        &self,
        id: Uuid,
        billing: OrganizationBilling,
    ) -> Result<Option<Organization>, DatabaseError> {
        let result = sqlx::query(
            "UPDATE organizations SET iban = $2, bic = $3, vat_number = $4, invoice_address = $5, \
             invoice_postal_code = $6, invoice_city = $7, invoice_email = $8, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(billing.iban)
        .bind(billing.bic)
        .bind(billing.vat_number)
        .bind(billing.invoice_address)
        .bind(billing.invoice_postal_code)
        .bind(billing.invoice_city)
        .bind(billing.invoice_email)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_organization(id).await
    }

    async fn set_deletion(
        &self,
        id: Uuid,
        scheduled: Option<DateTime<Utc>>,
    ) -> Result<Option<Organization>, DatabaseError> {
        let result = sqlx::query(
            "UPDATE organizations SET pending_deletion = $2, scheduled_deletion_time = $3, \
             updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(scheduled.is_some())
        .bind(scheduled)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_organization(id).await
    }

    async fn organizations_due_for_deletion(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, DatabaseError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM organizations WHERE pending_deletion AND scheduled_deletion_time <= $1",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

#[async_trait]
impl BillingStore for PgStore {
    async fn get_billing_settings(&self, organization_id: Uuid) -> Result<Option<BillingSettings>, DatabaseError> {
        let settings = sqlx::query_as::<_, BillingSettings>(
            "SELECT organization_id, billing_email, payment_term_days, currency, auto_invoice, updated_at \
             FROM billing_settings WHERE organization_id = $1",
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(settings)
    }

    async fn upsert_billing_settings(&self, settings: BillingSettings) -> Result<BillingSettings, DatabaseError> {
        let saved = sqlx::query_as::<_, BillingSettings>(
            "INSERT INTO billing_settings (organization_id, billing_email, payment_term_days, currency, auto_invoice) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (organization_id) DO UPDATE SET billing_email = EXCLUDED.billing_email, \
             payment_term_days = EXCLUDED.payment_term_days, currency = EXCLUDED.currency, \
             auto_invoice = EXCLUDED.auto_invoice, updated_at = now() \
             RETURNING organization_id, billing_email, payment_term_days, currency, auto_invoice, updated_at",
        )
        .bind(settings.organization_id)
        .bind(&settings.billing_email)
        .bind(settings.payment_term_days)
        .bind(&settings.currency)
        .bind(settings.auto_invoice)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint(e, || format!("organization {} does not exist", settings.organization_id)))?;
        Ok(saved)
    }

    async fn list_invoices(&self, organization_id: Uuid) -> Result<Vec<Invoice>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM invoices WHERE organization_id = $1 ORDER BY issued_at DESC, invoice_number",
            INVOICE_COLUMNS
        );
        let rows = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Invoice::try_from).collect()
    }

    async fn insert_invoice(&self, invoice: NewInvoice) -> Result<Invoice, DatabaseError> {
        let sql = format!(
            "INSERT INTO invoices (id, organization_id, invoice_number, amount, currency, status, description, \
             issued_at, due_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {}",
            INVOICE_COLUMNS
        );
        let row = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(invoice.organization_id)
            .bind(&invoice.invoice_number)
            .bind(invoice.amount)
            .bind(&invoice.currency)
            .bind(InvoiceStatus::Draft.as_str())
            .bind(&invoice.description)
            .bind(invoice.issued_at)
            .bind(invoice.due_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_constraint(e, || format!("invoice number {} already exists", invoice.invoice_number)))?;
        Invoice::try_from(row)
    }

    async fn set_invoice_status(&self, id: Uuid, status: InvoiceStatus) -> Result<Option<Invoice>, DatabaseError> {
        let sql = format!(
            "UPDATE invoices SET status = $2 WHERE id = $1 RETURNING {}",
            INVOICE_COLUMNS
        );
        let row = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Invoice::try_from).transpose()
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn list_tasks(&self, organization_id: Uuid) -> Result<Vec<Task>, DatabaseError> {
        let sql = format!("SELECT {} FROM tasks WHERE organization_id = $1 ORDER BY created_at", TASK_COLUMNS);
        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Task::try_from).collect()
    }

    async fn insert_task(&self, task: NewTask) -> Result<Task, DatabaseError> {
        let sql = format!(
            "INSERT INTO tasks (id, organization_id, title, description, assignee, due_date) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            TASK_COLUMNS
        );
        let row = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(task.organization_id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(&task.assignee)
            .bind(task.due_date)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_constraint(e, || format!("organization {} does not exist", task.organization_id)))?;
        Task::try_from(row)
    }

    async fn update_task(&self, id: Uuid, patch: TaskPatch) -> Result<Option<Task>, DatabaseError> {
        let sql = format!(
            "UPDATE tasks SET title = COALESCE($2, title), description = COALESCE($3, description), \
             assignee = COALESCE($4, assignee), status = COALESCE($5, status), \
             due_date = COALESCE($6, due_date), updated_at = now() WHERE id = $1 RETURNING {}",
            TASK_COLUMNS
        );
        let row = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(id)
            .bind(patch.title)
            .bind(patch.description)
            .bind(patch.assignee)
            .bind(patch.status.map(|s| s.as_str()))
            .bind(patch.due_date)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Task::try_from).transpose()
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}
