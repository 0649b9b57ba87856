//! Shared application state. Handlers extract the service they need through
//! axum's `FromRef`, so each one only sees its own slice.

use axum::extract::FromRef;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::Store;
use crate::ean::EanLookup;
use crate::hierarchy::HierarchyResolver;
use crate::services::{BillingService, ConnectionService, HierarchyService, OrganizationService, TaskService};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub lookup: Arc<dyn EanLookup>,
    pub resolver: HierarchyResolver,
    pub hierarchy: HierarchyService,
    pub connections: ConnectionService,
    pub organizations: OrganizationService,
    pub billing: BillingService,
    pub tasks: TaskService,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>, lookup: Arc<dyn EanLookup>) -> Self {
        let resolver = HierarchyResolver::new(store.clone());
        let hierarchy = HierarchyService::new(store.clone(), config.hierarchy.delete_policy);
        let connections =
            ConnectionService::new(store.clone(), lookup.clone(), config.ean.auto_lookup_on_create);
        let organizations =
            OrganizationService::new(store.clone(), config.organization.deletion_grace_hours);
        let billing = BillingService::new(store.clone());
        let tasks = TaskService::new(store.clone());

        Self {
            config: Arc::new(config),
            store,
            lookup,
            resolver,
            hierarchy,
            connections,
            organizations,
            billing,
            tasks,
        }
    }
}

impl FromRef<AppState> for HierarchyResolver {
    fn from_ref(state: &AppState) -> Self {
        state.resolver.clone()
    }
}

impl FromRef<AppState> for HierarchyService {
    fn from_ref(state: &AppState) -> Self {
        state.hierarchy.clone()
    }
}

impl FromRef<AppState> for ConnectionService {
    fn from_ref(state: &AppState) -> Self {
        state.connections.clone()
    }
}

impl FromRef<AppState> for OrganizationService {
    fn from_ref(state: &AppState) -> Self {
        state.organizations.clone()
    }
}

impl FromRef<AppState> for BillingService {
    fn from_ref(state: &AppState) -> Self {
        state.billing.clone()
    }
}

impl FromRef<AppState> for TaskService {
    fn from_ref(state: &AppState) -> Self {
        state.tasks.clone()
    }
}

impl FromRef<AppState> for Arc<dyn EanLookup> {
    fn from_ref(state: &AppState) -> Self {
        state.lookup.clone()
    }
}

impl FromRef<AppState> for Arc<dyn Store> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}
