use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{HierarchyError, HierarchyLevel, HierarchySelection};
use crate::database::models::HierarchyNode;
use crate::database::Store;

/// Children loaded for one level of a selection
#[derive(Debug, Clone, Serialize)]
pub struct LevelOptions {
    pub level: HierarchyLevel,
    pub parent_id: Option<Uuid>,
    pub selected: Option<Uuid>,
    pub nodes: Vec<HierarchyNode>,
    /// Set when loading this level failed; other levels are unaffected
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HierarchyOptions {
    pub selection: HierarchySelection,
    pub levels: Vec<LevelOptions>,
}

impl HierarchyOptions {
    pub fn level(&self, level: HierarchyLevel) -> Option<&LevelOptions> {
        self.levels.iter().find(|l| l.level == level)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PathEntry {
    pub level: HierarchyLevel,
    pub node: HierarchyNode,
}

/// A node and all of its ancestors, root first
#[derive(Debug, Clone, Serialize)]
pub struct HierarchyPath {
    pub entries: Vec<PathEntry>,
}

impl HierarchyPath {
    pub fn id_at(&self, level: HierarchyLevel) -> Option<Uuid> {
        self.entries.iter().find(|e| e.level == level).map(|e| e.node.id)
    }

    pub fn selection(&self) -> HierarchySelection {
        let mut selection = HierarchySelection::default();
        for entry in &self.entries {
            selection.select(entry.level, Some(entry.node.id));
        }
        selection
    }
}

/// Loads hierarchy levels from the store. Every level is its own round trip;
/// nothing is cached.
#[derive(Clone)]
pub struct HierarchyResolver {
    store: Arc<dyn Store>,
}

impl HierarchyResolver {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Nodes at `level` under `parent_id`. Organizations take no parent.
    pub async fn children(
        &self,
        level: HierarchyLevel,
        parent_id: Option<Uuid>,
    ) -> Result<Vec<HierarchyNode>, HierarchyError> {
        match (level.parent(), parent_id) {
            (None, Some(_)) => Err(HierarchyError::UnexpectedParent),
            (Some(parent), None) => Err(HierarchyError::ParentRequired(parent)),
            _ => Ok(self.store.list_nodes(level, parent_id).await?),
        }
    }

    /// Load options for every level whose parent is selected, concurrently.
    /// A failing level is reported in its own entry and logged.
    pub async fn resolve(&self, selection: &HierarchySelection) -> HierarchyOptions {
        let wanted: Vec<(HierarchyLevel, Option<Uuid>)> = HierarchyLevel::ALL
            .iter()
            .filter_map(|&level| match level.parent() {
                None => Some((level, None)),
                Some(parent) => selection.get(parent).map(|id| (level, Some(id))),
            })
            .collect();

        let fetches = wanted.iter().map(|&(level, parent_id)| async move {
            (level, parent_id, self.children(level, parent_id).await)
        });

        let levels = join_all(fetches)
            .await
            .into_iter()
            .map(|(level, parent_id, result)| {
                let (nodes, error) = match result {
                    Ok(nodes) => (nodes, None),
                    Err(e) => {
                        tracing::error!("Failed to load {} options: {}", level, e);
                        (Vec::new(), Some(e.to_string()))
                    }
                };
                LevelOptions {
                    level,
                    parent_id,
                    selected: selection.get(level),
                    nodes,
                    error,
                }
            })
            .collect();

        HierarchyOptions { selection: selection.clone(), levels }
    }

    /// Walk parent links from a node up to its organization
    pub async fn ancestry(&self, level: HierarchyLevel, id: Uuid) -> Result<HierarchyPath, HierarchyError> {
        let mut entries = Vec::new();
        let mut cursor = Some((level, id));

        while let Some((level, id)) = cursor {
            let node = self
                .store
                .get_node(level, id)
                .await?
                .ok_or(HierarchyError::NotFound { level, id })?;
            cursor = level.parent().zip(node.parent_id);
            entries.push(PathEntry { level, node });
        }

        entries.reverse();
        Ok(HierarchyPath { entries })
    }
}
