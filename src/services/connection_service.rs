use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::{normalize, FieldErrors, ServiceError};
use crate::database::models::{Connection, ConnectionPatch, ConnectionUpdate, NewConnection};
use crate::database::Store;
use crate::ean::{should_auto_lookup, validate_ean, EanLookup};
use crate::hierarchy::{HierarchyLevel, HierarchyResolver};
use crate::pipeline::{
    filter_tab, group_by_status, search, BoardCounts, ConnectionStatus, PipelineBoard, PipelineTab,
    PipelineView,
};
use crate::types::ConnectionType;

/// Status given to every newly created connection request
pub const INITIAL_STATUS: ConnectionStatus = ConnectionStatus::New;

/// Body of a connection request as submitted by the form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectionRequest {
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub connection_type: Option<ConnectionType>,
    pub ean: Option<String>,
    pub capacity: Option<String>,
    pub grid_operator: Option<String>,
    pub supplier: Option<String>,
    pub metering_company: Option<String>,
    pub metering_type: Option<String>,
    pub object_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub entity_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
}

impl ConnectionRequest {
    fn normalized(self) -> Self {
        Self {
            address: normalize(self.address),
            city: normalize(self.city),
            postal_code: normalize(self.postal_code),
            ean: normalize(self.ean),
            capacity: normalize(self.capacity),
            grid_operator: normalize(self.grid_operator),
            supplier: normalize(self.supplier),
            metering_company: normalize(self.metering_company),
            metering_type: normalize(self.metering_type),
            ..self
        }
    }

    fn reference(&self, level: HierarchyLevel) -> Option<Uuid> {
        match level {
            HierarchyLevel::Object => self.object_id,
            HierarchyLevel::Project => self.project_id,
            HierarchyLevel::Entity => self.entity_id,
            HierarchyLevel::Organization => self.organization_id,
            _ => None,
        }
    }

    fn reference_mut(&mut self, level: HierarchyLevel) -> Option<&mut Option<Uuid>> {
        match level {
            HierarchyLevel::Object => Some(&mut self.object_id),
            HierarchyLevel::Project => Some(&mut self.project_id),
            HierarchyLevel::Entity => Some(&mut self.entity_id),
            HierarchyLevel::Organization => Some(&mut self.organization_id),
            _ => None,
        }
    }
}

/// Hierarchy levels a connection keeps a direct reference to, deepest first
const REFERENCED_LEVELS: [HierarchyLevel; 4] = [
    HierarchyLevel::Object,
    HierarchyLevel::Project,
    HierarchyLevel::Entity,
    HierarchyLevel::Organization,
];

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionCreated {
    #[serde(flatten)]
    pub connection: Connection,
    /// Fields filled from the EAN lookup
    pub autofilled: Vec<&'static str>,
    pub lookup_warning: Option<String>,
}

/// Query string of the pipeline board
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineQuery {
    pub q: Option<String>,
    pub tab: Option<String>,
    pub view: Option<PipelineView>,
    /// Comma separated statuses to show as columns, all when absent
    pub statuses: Option<String>,
    #[serde(default)]
    pub include_marked: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum PipelinePage {
    List {
        items: Vec<Connection>,
        counts: BoardCounts,
    },
    Kanban {
        board: PipelineBoard<Connection>,
        counts: BoardCounts,
    },
}

impl PipelinePage {
    pub fn counts(&self) -> &BoardCounts {
        match self {
            PipelinePage::List { counts, .. } | PipelinePage::Kanban { counts, .. } => counts,
        }
    }
}

fn parse_statuses(raw: Option<&str>) -> Result<Vec<ConnectionStatus>, ServiceError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(ConnectionStatus::ALL.to_vec());
    };
    raw.split(',')
        .map(|s| s.trim().parse::<ConnectionStatus>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|message| ServiceError::invalid("Invalid pipeline query", "statuses", message))
}

/// Trim an optional update value; a present but blank value is an error
fn non_blank(value: Option<String>, field: &str, errors: &mut FieldErrors) -> Option<String> {
    let value = value.map(|v| v.trim().to_string());
    if value.as_deref() == Some("") {
        errors.add(field, "Cannot be empty");
    }
    value
}

/// Connection requests: creation with EAN auto-fill, edits, status moves
/// and the pipeline board
#[derive(Clone)]
pub struct ConnectionService {
    store: Arc<dyn Store>,
    lookup: Arc<dyn EanLookup>,
    resolver: HierarchyResolver,
    auto_lookup: bool,
}

impl ConnectionService {
    pub fn new(store: Arc<dyn Store>, lookup: Arc<dyn EanLookup>, auto_lookup: bool) -> Self {
        let resolver = HierarchyResolver::new(store.clone());
        Self { store, lookup, resolver, auto_lookup }
    }

    pub async fn get(&self, id: Uuid) -> Result<Connection, ServiceError> {
        self.store
            .get_connection(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Connection {}", id)))
    }

    pub async fn create(&self, request: ConnectionRequest) -> Result<ConnectionCreated, ServiceError> {
        let mut request = request.normalized();
        let mut errors = FieldErrors::default();

        let ean = match request.ean.as_deref().map(validate_ean) {
            Some(Ok(code)) => Some(code.to_string()),
            Some(Err(e)) => {
                errors.add("ean", e.to_string());
                None
            }
            None => None,
        };
        request.ean = ean.clone();

        let mut autofilled = Vec::new();
        let mut lookup_warning = None;
        if let Some(code) = ean.as_deref() {
            if self.auto_lookup && self.lookup.is_enabled() && should_auto_lookup(code) {
                match self.lookup.lookup(code).await {
                    Ok(details) => autofilled = details.apply_to(&mut request),
                    Err(e) => {
                        tracing::warn!("EAN lookup for {} failed, continuing without it: {}", code, e);
                        lookup_warning = Some(e.to_string());
                    }
                }
            }
        }

        if request.address.is_none() {
            errors.add("address", "Address is required");
        }
        if request.city.is_none() {
            errors.add("city", "City is required");
        }
        if request.postal_code.is_none() {
            errors.add("postal_code", "Postal code is required");
        }
        match (request.connection_type, request.capacity.as_deref()) {
            (None, _) => errors.add("connection_type", "Connection type is required"),
            (Some(kind), Some(capacity)) if !kind.accepts_capacity(capacity) => errors.add(
                "capacity",
                format!("'{}' is not a {} capacity option", capacity, kind),
            ),
            _ => {}
        }
        errors.into_result("Invalid connection request")?;

        self.fill_references(&mut request).await?;

        let connection = NewConnection {
            address: request.address.unwrap_or_default(),
            city: request.city.unwrap_or_default(),
            postal_code: request.postal_code.unwrap_or_default(),
            connection_type: request.connection_type.unwrap_or(ConnectionType::Electricity),
            status: INITIAL_STATUS.as_str().to_string(),
            ean: request.ean,
            capacity: request.capacity,
            grid_operator: request.grid_operator,
            supplier: request.supplier,
            metering_company: request.metering_company,
            metering_type: request.metering_type,
            object_id: request.object_id,
            project_id: request.project_id,
            entity_id: request.entity_id,
            organization_id: request.organization_id,
        };

        let connection = self.store.insert_connection(connection).await?;
        tracing::info!(
            "Created {} connection {} at {} ({} field(s) auto-filled)",
            connection.connection_type,
            connection.id,
            connection.address,
            autofilled.len()
        );

        Ok(ConnectionCreated { connection, autofilled, lookup_warning })
    }

    /// Fill the hierarchy references above the deepest one given. An explicit
    /// id that is not on that path is rejected.
    async fn fill_references(&self, request: &mut ConnectionRequest) -> Result<(), ServiceError> {
        let Some((level, id)) = REFERENCED_LEVELS
            .iter()
            .find_map(|&level| request.reference(level).map(|id| (level, id)))
        else {
            return Ok(());
        };

        let path = self.resolver.ancestry(level, id).await?;
        let mut errors = FieldErrors::default();
        for &above in REFERENCED_LEVELS.iter().filter(|l| **l < level) {
            let expected = path.id_at(above);
            if let Some(slot) = request.reference_mut(above) {
                match (*slot, expected) {
                    (Some(given), Some(expected)) if given != expected => errors.add(
                        &format!("{}_id", above),
                        format!("Does not match the {} of the selected {}", above, level),
                    ),
                    _ => *slot = expected,
                }
            }
        }
        errors.into_result("Conflicting hierarchy references")
    }

    pub async fn update(&self, id: Uuid, patch: ConnectionPatch) -> Result<Connection, ServiceError> {
        let existing = self.get(id).await?;
        let mut errors = FieldErrors::default();

        let address = non_blank(patch.address, "address", &mut errors);
        let city = non_blank(patch.city, "city", &mut errors);
        let postal_code = non_blank(patch.postal_code, "postal_code", &mut errors);

        let ean = match patch.ean.map(|raw| normalize(Some(raw))) {
            Some(Some(raw)) => match validate_ean(&raw) {
                Ok(code) => Some(Some(code.to_string())),
                Err(e) => {
                    errors.add("ean", e.to_string());
                    None
                }
            },
            other => other,
        };

        let capacity = patch.capacity.map(|c| normalize(Some(c)));
        if let Some(Some(capacity)) = capacity.as_ref() {
            if !existing.connection_type.accepts_capacity(capacity) {
                errors.add(
                    "capacity",
                    format!("'{}' is not a {} capacity option", capacity, existing.connection_type),
                );
            }
        }
        errors.into_result("Invalid connection update")?;

        let update = ConnectionUpdate {
            address,
            city,
            postal_code,
            ean,
            capacity,
            grid_operator: patch.grid_operator.map(|v| normalize(Some(v))),
            supplier: patch.supplier.map(|v| normalize(Some(v))),
            metering_company: patch.metering_company.map(|v| normalize(Some(v))),
            metering_type: patch.metering_type.map(|v| normalize(Some(v))),
        };
        self.store
            .update_connection(id, update)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Connection {}", id)))
    }

    /// Move a connection to `status`. Strings outside the pipeline are stored
    /// as given; the board only shows them under "all".
    pub async fn set_status(&self, id: Uuid, status: &str) -> Result<Connection, ServiceError> {
        let status = status.trim();
        if status.is_empty() {
            return Err(ServiceError::invalid("Invalid status", "status", "Status is required"));
        }
        if status.parse::<ConnectionStatus>().is_err() {
            tracing::warn!("Connection {} moved to unrecognized status '{}'", id, status);
        }

        let connection = self
            .store
            .set_connection_status(id, status)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Connection {}", id)))?;
        tracing::info!("Connection {} is now {}", id, connection.status);
        Ok(connection)
    }

    pub async fn mark(&self, id: Uuid) -> Result<Connection, ServiceError> {
        self.store
            .set_connection_marked(id, Some(Utc::now()))
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Connection {}", id)))
    }

    pub async fn unmark(&self, id: Uuid) -> Result<Connection, ServiceError> {
        self.store
            .set_connection_marked(id, None)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Connection {}", id)))
    }

    /// Load everything, then search, then filter by tab. Counts reflect the
    /// search result before the tab filter so every tab can show its badge.
    pub async fn board(&self, query: &PipelineQuery) -> Result<PipelinePage, ServiceError> {
        let tab: PipelineTab = query
            .tab
            .as_deref()
            .unwrap_or("all")
            .parse()
            .map_err(|message: String| ServiceError::invalid("Invalid pipeline query", "tab", message))?;
        let statuses = parse_statuses(query.statuses.as_deref())?;

        let mut records = self.store.list_connections().await?;
        if !query.include_marked {
            records.retain(|c| c.marked_at.is_none());
        }

        let found = search(&records, query.q.as_deref().unwrap_or(""));
        let counts = group_by_status(&found, &statuses).counts();
        let visible = filter_tab(&found, tab);

        Ok(match query.view.unwrap_or_default() {
            PipelineView::List => PipelinePage::List { items: visible, counts },
            PipelineView::Kanban => PipelinePage::Kanban { board: group_by_status(&visible, &statuses), counts },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::NewNode;
    use crate::database::{HierarchyStore, MemoryStore};
    use crate::ean::{DisabledLookup, EanDetails, EanLookupError};
    use async_trait::async_trait;

    const DUTCH_EAN: &str = "871685900012345678";

    struct StubLookup;

    #[async_trait]
    impl EanLookup for StubLookup {
        async fn lookup(&self, ean: &str) -> Result<EanDetails, EanLookupError> {
            if ean == DUTCH_EAN {
                Ok(EanDetails {
                    ean: Some(ean.to_string()),
                    address: Some("Kerkstraat 1".into()),
                    city: Some("Utrecht".into()),
                    postal_code: Some("3511AB".into()),
                    capacity: Some("3x25A".into()),
                    grid_operator: Some("Stedin".into()),
                    connection_type: Some(ConnectionType::Electricity),
                })
            } else {
                Err(EanLookupError::NotFound(ean.to_string()))
            }
        }
    }

    fn service(store: Arc<MemoryStore>) -> ConnectionService {
        ConnectionService::new(store, Arc::new(StubLookup), true)
    }

    fn request(address: &str) -> ConnectionRequest {
        ConnectionRequest {
            address: Some(address.into()),
            city: Some("Utrecht".into()),
            postal_code: Some("3511AB".into()),
            connection_type: Some(ConnectionType::Gas),
            ..Default::default()
        }
    }

    async fn chain(store: &MemoryStore) -> Vec<Uuid> {
        let mut ids = Vec::new();
        let mut parent = None;
        for level in HierarchyLevel::ALL {
            let node = store
                .insert_node(level, NewNode { name: level.to_string(), description: None, parent_id: parent })
                .await
                .unwrap();
            ids.push(node.id);
            parent = Some(node.id);
        }
        ids
    }

    #[tokio::test]
    async fn create_autofills_from_dutch_ean() {
        let service = service(Arc::new(MemoryStore::new()));
        let created = service
            .create(ConnectionRequest { ean: Some(format!(" {} ", DUTCH_EAN)), ..Default::default() })
            .await
            .unwrap();

        assert_eq!(created.connection.status, "NEW");
        assert_eq!(created.connection.ean.as_deref(), Some(DUTCH_EAN));
        assert_eq!(created.connection.address, "Kerkstraat 1");
        assert_eq!(created.connection.capacity.as_deref(), Some("3x25A"));
        assert!(created.autofilled.contains(&"connection_type"));
        assert!(created.lookup_warning.is_none());
    }

    #[tokio::test]
    async fn lookup_failure_is_a_warning() {
        let service = service(Arc::new(MemoryStore::new()));
        let mut req = request("Dorpsstraat 5");
        req.ean = Some("871685900000000000".into());

        let created = service.create(req).await.unwrap();
        assert!(created.autofilled.is_empty());
        assert!(created.lookup_warning.is_some());
        assert_eq!(created.connection.address, "Dorpsstraat 5");
    }

    #[tokio::test]
    async fn non_dutch_ean_skips_lookup() {
        let service = ConnectionService::new(Arc::new(MemoryStore::new()), Arc::new(DisabledLookup), true);
        let mut req = request("Dorpsstraat 5");
        req.ean = Some("541234567890123456".into());

        let created = service.create(req).await.unwrap();
        assert!(created.lookup_warning.is_none());
    }

    #[tokio::test]
    async fn create_reports_field_errors() {
        let service = service(Arc::new(MemoryStore::new()));
        let mut req = request("  ");
        req.ean = Some("1234".into());
        req.capacity = Some("3x25A".into());

        match service.create(req).await {
            Err(ServiceError::Validation { field_errors, .. }) => {
                assert!(field_errors.contains_key("address"));
                assert!(field_errors.contains_key("capacity"));
                assert_eq!(field_errors["ean"], "EAN code must be exactly 18 digits (got 4)");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn blank_optional_fields_clear_on_update() {
        let service = service(Arc::new(MemoryStore::new()));
        let created = service.create(request("Kerkstraat 1")).await.unwrap().connection;

        let patch = ConnectionPatch {
            ean: Some(format!(" {} ", DUTCH_EAN)),
            supplier: Some(" Eneco ".into()),
            ..Default::default()
        };
        let updated = service.update(created.id, patch).await.unwrap();
        assert_eq!(updated.ean.as_deref(), Some(DUTCH_EAN));
        assert_eq!(updated.supplier.as_deref(), Some("Eneco"));

        let patch = ConnectionPatch {
            ean: Some("".into()),
            supplier: Some("   ".into()),
            ..Default::default()
        };
        let updated = service.update(created.id, patch).await.unwrap();
        assert_eq!(updated.ean, None);
        assert_eq!(updated.supplier, None);
        assert_eq!(updated.address, "Kerkstraat 1");

        let patch = ConnectionPatch { ean: Some("1234".into()), ..Default::default() };
        assert!(matches!(service.update(created.id, patch).await, Err(ServiceError::Validation { .. })));
    }

    #[tokio::test]
    async fn references_are_filled_from_the_object() {
        let store = Arc::new(MemoryStore::new());
        let ids = chain(&store).await;
        let service = service(store);

        let mut req = request("Kerkstraat 1");
        req.object_id = Some(ids[5]);
        let created = service.create(req).await.unwrap().connection;
        assert_eq!(created.project_id, Some(ids[3]));
        assert_eq!(created.entity_id, Some(ids[1]));
        assert_eq!(created.organization_id, Some(ids[0]));

        let mut req = request("Kerkstraat 2");
        req.object_id = Some(ids[5]);
        req.organization_id = Some(Uuid::new_v4());
        assert!(matches!(service.create(req).await, Err(ServiceError::Validation { .. })));
    }

    #[tokio::test]
    async fn board_searches_then_filters_tab() {
        let service = service(Arc::new(MemoryStore::new()));
        let kerk = service.create(request("Kerkstraat 1")).await.unwrap().connection;
        let dorp = service.create(request("Dorpsstraat 5")).await.unwrap().connection;
        service.set_status(dorp.id, "COMPLETED").await.unwrap();

        let page = service
            .board(&PipelineQuery { q: Some("kerk".into()), ..Default::default() })
            .await
            .unwrap();
        match page {
            PipelinePage::List { items, counts } => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].id, kerk.id);
                assert_eq!(counts.total, 1);
            }
            other => panic!("expected list view, got {:?}", other),
        }

        let page = service
            .board(&PipelineQuery { tab: Some("COMPLETED".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(page.counts().total, 2);
        assert!(matches!(page, PipelinePage::List { ref items, .. } if items.len() == 1 && items[0].id == dorp.id));
    }

    #[tokio::test]
    async fn marked_and_unknown_statuses_on_the_board() {
        let service = service(Arc::new(MemoryStore::new()));
        let a = service.create(request("Kerkstraat 1")).await.unwrap().connection;
        let b = service.create(request("Dorpsstraat 5")).await.unwrap().connection;
        service.set_status(a.id, "ON_HOLD").await.unwrap();
        service.mark(b.id).await.unwrap();

        let query = PipelineQuery { view: Some(PipelineView::Kanban), ..Default::default() };
        let PipelinePage::Kanban { board, .. } = service.board(&query).await.unwrap() else {
            panic!("expected kanban view");
        };
        assert_eq!(board.all.len(), 1);
        assert!(board.columns.iter().all(|c| c.items.is_empty()));

        service.unmark(b.id).await.unwrap();
        let PipelinePage::Kanban { board, .. } = service.board(&query).await.unwrap() else {
            panic!("expected kanban view");
        };
        assert_eq!(board.column(ConnectionStatus::New).unwrap().len(), 1);

        assert!(matches!(service.set_status(a.id, "  ").await, Err(ServiceError::Validation { .. })));
    }
}
