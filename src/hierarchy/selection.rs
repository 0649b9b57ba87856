use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{HierarchyError, HierarchyLevel};

/// Cascading picker state: at most one selected id per level.
///
/// Changing the id at a level clears every level below it, so a selection
/// never holds a child that belongs to a previously selected parent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchySelection {
    pub organization_id: Option<Uuid>,
    pub entity_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub complex_id: Option<Uuid>,
    pub object_id: Option<Uuid>,
}

impl HierarchySelection {
    pub fn get(&self, level: HierarchyLevel) -> Option<Uuid> {
        match level {
            HierarchyLevel::Organization => self.organization_id,
            HierarchyLevel::Entity => self.entity_id,
            HierarchyLevel::Category => self.category_id,
            HierarchyLevel::Project => self.project_id,
            HierarchyLevel::Complex => self.complex_id,
            HierarchyLevel::Object => self.object_id,
        }
    }

    fn slot(&mut self, level: HierarchyLevel) -> &mut Option<Uuid> {
        match level {
            HierarchyLevel::Organization => &mut self.organization_id,
            HierarchyLevel::Entity => &mut self.entity_id,
            HierarchyLevel::Category => &mut self.category_id,
            HierarchyLevel::Project => &mut self.project_id,
            HierarchyLevel::Complex => &mut self.complex_id,
            HierarchyLevel::Object => &mut self.object_id,
        }
    }

    /// Select `id` at `level`. Returns the levels that were cleared.
    pub fn select(&mut self, level: HierarchyLevel, id: Option<Uuid>) -> Vec<HierarchyLevel> {
        if self.get(level) == id {
            return Vec::new();
        }
        *self.slot(level) = id;
        self.clear_below(level)
    }

    /// Clear `level` and everything below it
    pub fn clear(&mut self, level: HierarchyLevel) -> Vec<HierarchyLevel> {
        let mut cleared = Vec::new();
        if self.slot(level).take().is_some() {
            cleared.push(level);
        }
        cleared.extend(self.clear_below(level));
        cleared
    }

    fn clear_below(&mut self, level: HierarchyLevel) -> Vec<HierarchyLevel> {
        level
            .descendants()
            .iter()
            .copied()
            .filter(|&child| self.slot(child).take().is_some())
            .collect()
    }

    /// Deepest level that currently has a selection
    pub fn deepest(&self) -> Option<HierarchyLevel> {
        HierarchyLevel::ALL
            .iter()
            .rev()
            .copied()
            .find(|&level| self.get(level).is_some())
    }

    /// Reject selections with a level set below an unset one
    pub fn check(&self) -> Result<(), HierarchyError> {
        if self.is_contiguous() {
            return Ok(());
        }
        let below_gap = HierarchyLevel::ALL
            .iter()
            .copied()
            .skip_while(|&level| self.get(level).is_some())
            .find(|&level| self.get(level).is_some());
        Err(HierarchyError::InvalidInput(match below_gap {
            Some(level) => format!("{} selected without its parent levels", level),
            None => "selection skips a level".to_string(),
        }))
    }

    /// A selection is consistent when no level is set below an unset one
    pub fn is_contiguous(&self) -> bool {
        let mut gap = false;
        for level in HierarchyLevel::ALL {
            match (self.get(level), gap) {
                (Some(_), true) => return false,
                (None, _) => gap = true,
                _ => {}
            }
        }
        true
    }
}
