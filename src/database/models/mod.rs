pub mod billing;
pub mod connection;
pub mod hierarchy;
pub mod organization;
pub mod task;

pub use billing::{BillingSettings, Invoice, NewInvoice};
pub use connection::{Connection, ConnectionPatch, ConnectionUpdate, NewConnection};
pub use hierarchy::{HierarchyNode, NewNode, NodePatch};
pub use organization::{Organization, OrganizationBilling};
pub use task::{NewTask, Task, TaskPatch};
