//! Task collaborator interface
//!
//! The task-management service owns the Task entity. Both ledgers consume it
//! through this narrow trait: read a snapshot, transition the status, assign
//! a tasker. An in-memory implementation is provided for tests and demos.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::{FlextaskerError, Result};
use crate::types::task::{TaskSnapshot, TaskStatus};

/// Narrow interface to the external task-management service
#[async_trait]
pub trait TaskDirectory: Send + Sync {
    /// Fetch a point-in-time snapshot of a task
    async fn get(&self, task_id: &Uuid) -> Result<Option<TaskSnapshot>>;

    /// Transition a task's status; `at` is the transition timestamp
    async fn set_status(&self, task_id: &Uuid, status: TaskStatus, at: i64) -> Result<()>;

    /// Record the assigned tasker
    async fn set_assignee(&self, task_id: &Uuid, assignee_id: &str) -> Result<()>;
}

/// In-memory task directory backed by a DashMap
pub struct InMemoryTaskDirectory {
    tasks: DashMap<Uuid, TaskSnapshot>,
}

impl InMemoryTaskDirectory {
    pub fn new() -> Self {
        Self {
            tasks: DashMap::new(),
        }
    }

    /// Insert or replace a task snapshot
    pub fn upsert(&self, task: TaskSnapshot) {
        self.tasks.insert(task.id, task);
    }
}

impl Default for InMemoryTaskDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskDirectory for InMemoryTaskDirectory {
    async fn get(&self, task_id: &Uuid) -> Result<Option<TaskSnapshot>> {
        Ok(self.tasks.get(task_id).map(|t| t.clone()))
    }

    async fn set_status(&self, task_id: &Uuid, status: TaskStatus, _at: i64) -> Result<()> {
        let mut task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| FlextaskerError::Storage(format!("task {task_id} not in directory")))?;
        task.status = status;
        Ok(())
    }

    async fn set_assignee(&self, task_id: &Uuid, assignee_id: &str) -> Result<()> {
        let mut task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| FlextaskerError::Storage(format!("task {task_id} not in directory")))?;
        task.assignee_id = Some(assignee_id.to_string());
        Ok(())
    }
}
