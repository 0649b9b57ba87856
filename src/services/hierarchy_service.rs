use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{normalize, ServiceError};
use crate::database::models::{HierarchyNode, NewNode, NodePatch};
use crate::database::{DatabaseError, Store};
use crate::hierarchy::{DeletePolicy, HierarchyError, HierarchyLevel};

#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutcome {
    pub level: HierarchyLevel,
    pub id: Uuid,
    pub policy: DeletePolicy,
    /// Nodes removed including the requested one
    pub deleted_nodes: usize,
}

/// Create, rename and delete hierarchy nodes
#[derive(Clone)]
pub struct HierarchyService {
    store: Arc<dyn Store>,
    policy: DeletePolicy,
}

impl HierarchyService {
    pub fn new(store: Arc<dyn Store>, policy: DeletePolicy) -> Self {
        Self { store, policy }
    }

    pub async fn get(&self, level: HierarchyLevel, id: Uuid) -> Result<HierarchyNode, ServiceError> {
        self.store
            .get_node(level, id)
            .await?
            .ok_or_else(|| HierarchyError::NotFound { level, id }.into())
    }

    pub async fn create(&self, level: HierarchyLevel, node: NewNode) -> Result<HierarchyNode, ServiceError> {
        let Some(name) = normalize(Some(node.name)) else {
            return Err(ServiceError::invalid("Invalid hierarchy node", "name", "Name is required"));
        };

        match (level.parent(), node.parent_id) {
            (None, Some(_)) => return Err(HierarchyError::UnexpectedParent.into()),
            (Some(parent), None) => return Err(HierarchyError::ParentRequired(parent).into()),
            (Some(parent), Some(parent_id)) => {
                if self.store.get_node(parent, parent_id).await?.is_none() {
                    return Err(HierarchyError::NotFound { level: parent, id: parent_id }.into());
                }
            }
            (None, None) => {}
        }

        let node = NewNode {
            name,
            description: normalize(node.description),
            parent_id: node.parent_id,
        };
        let created = self.store.insert_node(level, node).await?;
        tracing::info!("Created {} {} ({})", level, created.id, created.name);
        Ok(created)
    }

    pub async fn update(
        &self,
        level: HierarchyLevel,
        id: Uuid,
        patch: NodePatch,
    ) -> Result<HierarchyNode, ServiceError> {
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ServiceError::invalid("Invalid hierarchy node", "name", "Name cannot be empty"));
        }
        let patch = NodePatch {
            name: patch.name.map(|n| n.trim().to_string()),
            description: patch.description.map(|d| d.trim().to_string()),
        };
        self.store
            .update_node(level, id, patch)
            .await?
            .ok_or_else(|| HierarchyError::NotFound { level, id }.into())
    }

    /// Delete with the configured policy
    pub async fn delete(&self, level: HierarchyLevel, id: Uuid) -> Result<DeleteOutcome, ServiceError> {
        self.delete_with(level, id, self.policy).await
    }

    pub async fn delete_with(
        &self,
        level: HierarchyLevel,
        id: Uuid,
        policy: DeletePolicy,
    ) -> Result<DeleteOutcome, ServiceError> {
        if self.store.get_node(level, id).await?.is_none() {
            return Err(HierarchyError::NotFound { level, id }.into());
        }

        let deleted_nodes = match policy {
            DeletePolicy::Restrict => {
                let mut children = self.store.count_children(level, id).await?;
                if level == HierarchyLevel::Object {
                    children += self.store.count_object_connections(id).await?;
                }
                if children > 0 {
                    return Err(HierarchyError::HasChildren { level, id, children }.into());
                }
                self.delete_one(level, id).await?;
                1
            }
            DeletePolicy::Cascade => self.delete_subtree(level, id).await?,
        };

        tracing::info!("Deleted {} {} ({:?}, {} node(s))", level, id, policy, deleted_nodes);
        Ok(DeleteOutcome { level, id, policy, deleted_nodes })
    }

    async fn delete_one(&self, level: HierarchyLevel, id: Uuid) -> Result<(), ServiceError> {
        match self.store.delete_node(level, id).await {
            Ok(_) => Ok(()),
            Err(DatabaseError::Conflict(msg)) => Err(ServiceError::Conflict(msg)),
            Err(e) => Err(e.into()),
        }
    }

    /// Collect the subtree level by level, then delete from the leaves up
    async fn delete_subtree(&self, level: HierarchyLevel, id: Uuid) -> Result<usize, ServiceError> {
        let mut layers: Vec<(HierarchyLevel, Vec<Uuid>)> = vec![(level, vec![id])];

        while let Some((current, ids)) = layers.last() {
            let Some(child) = current.child() else { break };
            let mut child_ids = Vec::new();
            for parent_id in ids {
                let nodes = self.store.list_nodes(child, Some(*parent_id)).await?;
                child_ids.extend(nodes.into_iter().map(|n| n.id));
            }
            if child_ids.is_empty() {
                break;
            }
            layers.push((child, child_ids));
        }

        let mut deleted = 0;
        for (layer_level, ids) in layers.iter().rev() {
            for node_id in ids {
                self.delete_one(*layer_level, *node_id).await?;
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::NewConnection;
    use crate::database::{ConnectionStore, HierarchyStore, MemoryStore};
    use crate::types::ConnectionType;

    async fn build_tree(service: &HierarchyService) -> Vec<HierarchyNode> {
        let mut nodes = Vec::new();
        let mut parent = None;
        for level in HierarchyLevel::ALL {
            let node = service
                .create(level, NewNode { name: format!(" {} ", level), description: None, parent_id: parent })
                .await
                .unwrap();
            parent = Some(node.id);
            nodes.push(node);
        }
        nodes
    }

    #[tokio::test]
    async fn create_trims_and_requires_parent() {
        let store = Arc::new(MemoryStore::new());
        let service = HierarchyService::new(store, DeletePolicy::Restrict);

        let nodes = build_tree(&service).await;
        assert_eq!(nodes[0].name, "organization");

        let missing_parent = service
            .create(HierarchyLevel::Entity, NewNode { name: "x".into(), description: None, parent_id: None })
            .await;
        assert!(matches!(
            missing_parent,
            Err(ServiceError::Hierarchy(HierarchyError::ParentRequired(HierarchyLevel::Organization)))
        ));

        let unknown_parent = service
            .create(
                HierarchyLevel::Entity,
                NewNode { name: "x".into(), description: None, parent_id: Some(Uuid::new_v4()) },
            )
            .await;
        assert!(matches!(unknown_parent, Err(ServiceError::Hierarchy(HierarchyError::NotFound { .. }))));

        let blank = service
            .create(HierarchyLevel::Organization, NewNode { name: "  ".into(), description: None, parent_id: None })
            .await;
        assert!(matches!(blank, Err(ServiceError::Validation { .. })));
    }

    #[tokio::test]
    async fn restrict_blocks_parents_and_objects_with_connections() {
        let store = Arc::new(MemoryStore::new());
        let service = HierarchyService::new(store.clone(), DeletePolicy::Restrict);
        let nodes = build_tree(&service).await;

        let blocked = service.delete(HierarchyLevel::Project, nodes[3].id).await;
        assert!(matches!(
            blocked,
            Err(ServiceError::Hierarchy(HierarchyError::HasChildren { children: 1, .. }))
        ));

        store
            .insert_connection(NewConnection {
                address: "Kerkstraat 1".into(),
                city: "Utrecht".into(),
                postal_code: "3511AB".into(),
                connection_type: ConnectionType::Electricity,
                status: "NEW".into(),
                ean: None,
                capacity: None,
                grid_operator: None,
                supplier: None,
                metering_company: None,
                metering_type: None,
                object_id: Some(nodes[5].id),
                project_id: None,
                entity_id: None,
                organization_id: None,
            })
            .await
            .unwrap();
        let blocked = service.delete(HierarchyLevel::Object, nodes[5].id).await;
        assert!(matches!(blocked, Err(ServiceError::Hierarchy(HierarchyError::HasChildren { .. }))));
    }

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let service = HierarchyService::new(Arc::new(MemoryStore::new()), DeletePolicy::Restrict);
        let nodes = build_tree(&service).await;

        let org = service
            .update(
                HierarchyLevel::Organization,
                nodes[0].id,
                NodePatch { name: Some(" Acme ".into()), description: Some(" Head office ".into()) },
            )
            .await
            .unwrap();
        assert_eq!(org.name, "Acme");
        assert_eq!(org.description.as_deref(), Some("Head office"));

        let org = service
            .update(
                HierarchyLevel::Organization,
                nodes[0].id,
                NodePatch { name: Some("Acme BV".into()), description: None },
            )
            .await
            .unwrap();
        assert_eq!(org.name, "Acme BV");
        assert_eq!(org.description.as_deref(), Some("Head office"));

        let project = service
            .update(HierarchyLevel::Project, nodes[3].id, NodePatch { name: None, description: Some("Phase 1".into()) })
            .await
            .unwrap();
        assert_eq!(project.name, "project");
        assert_eq!(project.description.as_deref(), Some("Phase 1"));

        let blank = service
            .update(HierarchyLevel::Project, nodes[3].id, NodePatch { name: Some(" ".into()), description: None })
            .await;
        assert!(matches!(blank, Err(ServiceError::Validation { .. })));
    }

    #[tokio::test]
    async fn cascade_removes_the_subtree() {
        let store = Arc::new(MemoryStore::new());
        let service = HierarchyService::new(store.clone(), DeletePolicy::Cascade);
        let nodes = build_tree(&service).await;
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
                object_id: Some(nodes[5].id),
                project_id: Some(nodes[3].id),
                entity_id: Some(nodes[1].id),
                organization_id: Some(nodes[0].id),
            })
            .await
            .unwrap();

        let outcome = service.delete(HierarchyLevel::Category, nodes[2].id).await.unwrap();
        assert_eq!(outcome.deleted_nodes, 4);
        assert!(store.get_node(HierarchyLevel::Object, nodes[5].id).await.unwrap().is_none());
        assert!(store.get_node(HierarchyLevel::Entity, nodes[1].id).await.unwrap().is_some());
        assert_eq!(store.count_children(HierarchyLevel::Entity, nodes[1].id).await.unwrap(), 0);

        let detached = store.get_connection(connection.id).await.unwrap().unwrap();
        assert_eq!(detached.object_id, None);
        assert_eq!(detached.project_id, None);
        assert_eq!(detached.entity_id, Some(nodes[1].id));
        assert_eq!(detached.organization_id, Some(nodes[0].id));
    }
}
