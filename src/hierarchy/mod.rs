//! Organization → Entity → Category → Project → Complex → Object.
//!
//! [`HierarchySelection`] holds the cascading picker state, [`HierarchyResolver`]
//! loads the options for every selected level from the store.

pub mod resolver;
pub mod selection;

pub use resolver::{HierarchyOptions, HierarchyPath, HierarchyResolver, LevelOptions};
pub use selection::HierarchySelection;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::database::DatabaseError;

/// One level of the organizational hierarchy, ordered from root to leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HierarchyLevel {
    Organization,
    Entity,
    Category,
    Project,
    Complex,
    Object,
}

impl HierarchyLevel {
    pub const ALL: [HierarchyLevel; 6] = [
        HierarchyLevel::Organization,
        HierarchyLevel::Entity,
        HierarchyLevel::Category,
        HierarchyLevel::Project,
        HierarchyLevel::Complex,
        HierarchyLevel::Object,
    ];

    pub fn depth(self) -> usize {
        self as usize
    }

    pub fn parent(self) -> Option<HierarchyLevel> {
        match self {
            HierarchyLevel::Organization => None,
            other => Some(Self::ALL[other.depth() - 1]),
        }
    }

    pub fn child(self) -> Option<HierarchyLevel> {
        Self::ALL.get(self.depth() + 1).copied()
    }

    /// Levels strictly below this one, nearest first
    pub fn descendants(self) -> &'static [HierarchyLevel] {
        &Self::ALL[self.depth() + 1..]
    }

    pub fn table_name(self) -> &'static str {
        match self {
            HierarchyLevel::Organization => "organizations",
            HierarchyLevel::Entity => "entities",
            HierarchyLevel::Category => "categories",
            HierarchyLevel::Project => "projects",
            HierarchyLevel::Complex => "complexes",
            HierarchyLevel::Object => "objects",
        }
    }

    /// Foreign key column pointing at the parent row
    pub fn parent_column(self) -> Option<&'static str> {
        match self {
            HierarchyLevel::Organization => None,
            HierarchyLevel::Entity => Some("organization_id"),
            HierarchyLevel::Category => Some("entity_id"),
            HierarchyLevel::Project => Some("category_id"),
            HierarchyLevel::Complex => Some("project_id"),
            HierarchyLevel::Object => Some("complex_id"),
        }
    }

    /// URL segment used by the HTTP routes (the table name)
    pub fn segment(self) -> &'static str {
        self.table_name()
    }
}

impl fmt::Display for HierarchyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HierarchyLevel::Organization => "organization",
            HierarchyLevel::Entity => "entity",
            HierarchyLevel::Category => "category",
            HierarchyLevel::Project => "project",
            HierarchyLevel::Complex => "complex",
            HierarchyLevel::Object => "object",
        };
        f.write_str(name)
    }
}

impl FromStr for HierarchyLevel {
    type Err = HierarchyError;

    /// Accepts both the singular name and the plural URL segment
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "organization" | "organizations" => Ok(HierarchyLevel::Organization),
            "entity" | "entities" => Ok(HierarchyLevel::Entity),
            "category" | "categories" => Ok(HierarchyLevel::Category),
            "project" | "projects" => Ok(HierarchyLevel::Project),
            "complex" | "complexes" => Ok(HierarchyLevel::Complex),
            "object" | "objects" => Ok(HierarchyLevel::Object),
            other => Err(HierarchyError::UnknownLevel(other.to_string())),
        }
    }
}

/// What happens to children when a hierarchy node is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Refuse to delete nodes that still have children or connections
    Restrict,
    /// Delete the subtree bottom-up and detach connections from removed objects
    Cascade,
}

impl FromStr for DeletePolicy {
    type Err = HierarchyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "restrict" | "block" => Ok(DeletePolicy::Restrict),
            "cascade" => Ok(DeletePolicy::Cascade),
            other => Err(HierarchyError::InvalidInput(format!("unknown delete policy '{}'", other))),
        }
    }
}

#[derive(Debug, Error)]
pub enum HierarchyError {
    #[error("Unknown hierarchy level: {0}")]
    UnknownLevel(String),

    #[error("A parent {0} id is required")]
    ParentRequired(HierarchyLevel),

    #[error("Organizations have no parent")]
    UnexpectedParent,

    #[error("{level} {id} not found")]
    NotFound { level: HierarchyLevel, id: Uuid },

    #[error("{level} {id} still has {children} child record(s)")]
    HasChildren { level: HierarchyLevel, id: Uuid, children: i64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_and_child_walk_the_chain() {
        assert_eq!(HierarchyLevel::Organization.parent(), None);
        assert_eq!(HierarchyLevel::Entity.parent(), Some(HierarchyLevel::Organization));
        assert_eq!(HierarchyLevel::Complex.child(), Some(HierarchyLevel::Object));
        assert_eq!(HierarchyLevel::Object.child(), None);
    }

    #[test]
    fn descendants_exclude_self() {
        assert_eq!(
            HierarchyLevel::Project.descendants(),
            &[HierarchyLevel::Complex, HierarchyLevel::Object]
        );
        assert!(HierarchyLevel::Object.descendants().is_empty());
    }

    #[test]
    fn parses_singular_and_plural_names() {
        assert_eq!("categories".parse::<HierarchyLevel>().unwrap(), HierarchyLevel::Category);
        assert_eq!("complex".parse::<HierarchyLevel>().unwrap(), HierarchyLevel::Complex);
        assert!("buildings".parse::<HierarchyLevel>().is_err());
    }

    #[test]
    fn parses_delete_policy() {
        assert_eq!("Cascade".parse::<DeletePolicy>().unwrap(), DeletePolicy::Cascade);
        assert_eq!("block".parse::<DeletePolicy>().unwrap(), DeletePolicy::Restrict);
        assert!("orphan".parse::<DeletePolicy>().is_err());
    }
}
