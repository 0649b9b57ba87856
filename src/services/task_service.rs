use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{normalize, ServiceError};
use crate::database::models::{NewTask, Task, TaskPatch};
use crate::database::Store;

#[derive(Debug, Clone, Deserialize)]
pub struct TaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn Store>,
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self, organization_id: Uuid) -> Result<Vec<Task>, ServiceError> {
        if self.store.get_organization(organization_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("Organization {}", organization_id)));
        }
        Ok(self.store.list_tasks(organization_id).await?)
    }

    pub async fn create(&self, organization_id: Uuid, request: TaskRequest) -> Result<Task, ServiceError> {
        let Some(title) = normalize(Some(request.title)) else {
            return Err(ServiceError::invalid("Invalid task", "title", "Title is required"));
        };
        if self.store.get_organization(organization_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("Organization {}", organization_id)));
        }

        let task = self
            .store
            .insert_task(NewTask {
                organization_id,
                title,
                description: normalize(request.description),
                assignee: normalize(request.assignee),
                due_date: request.due_date,
            })
            .await?;
        tracing::info!("Created task {} for organization {}", task.id, organization_id);
        Ok(task)
    }

    pub async fn update(&self, id: Uuid, patch: TaskPatch) -> Result<Task, ServiceError> {
        if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ServiceError::invalid("Invalid task", "title", "Title cannot be empty"));
        }
        let patch = TaskPatch { title: patch.title.map(|t| t.trim().to_string()), ..patch };
        self.store
            .update_task(id, patch)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Task {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::NewNode;
    use crate::database::{HierarchyStore, MemoryStore};
    use crate::hierarchy::HierarchyLevel;
    use crate::types::TaskStatus;

    #[tokio::test]
    async fn tasks_start_as_todo_and_move() {
        let store = Arc::new(MemoryStore::new());
        let org = store
            .insert_node(
                HierarchyLevel::Organization,
                NewNode { name: "Woonstichting Oost".into(), description: None, parent_id: None },
            )
            .await
            .unwrap();
        let service = TaskService::new(store);

        let task = service
            .create(
                org.id,
                TaskRequest { title: " Call grid operator ".into(), description: None, assignee: None, due_date: None },
            )
            .await
            .unwrap();
        assert_eq!(task.title, "Call grid operator");
        assert_eq!(task.status, TaskStatus::Todo);

        let done = service
            .update(task.id, TaskPatch { status: Some(TaskStatus::Done), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(done.status, TaskStatus::Done);
        assert_eq!(service.list(org.id).await.unwrap().len(), 1);

        let missing = service
            .create(Uuid::new_v4(), TaskRequest { title: "x".into(), description: None, assignee: None, due_date: None })
            .await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }
}
