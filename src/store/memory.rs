use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{ReadyState, Store};
use crate::errors::StoreError;
use crate::models::sprint::sort_sprints;
use crate::models::task::sort_by_position;
use crate::models::{ChatMessage, Project, Reaction, Sprint, SprintStatus, Task, User, Zone};

#[derive(Default)]
struct Collections {
    users: HashMap<String, User>,
    projects: HashMap<String, Project>,
    sprints: HashMap<String, Sprint>,
    tasks: HashMap<String, Task>,
    messages: HashMap<String, ChatMessage>,
}

/// In-process store with the same per-document semantics as `MongoStore`.
pub struct MemoryStore {
    inner: RwLock<Collections>,
    state: AtomicU8,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            inner: RwLock::new(Collections::default()),
            state: AtomicU8::new(ReadyState::Connected.code()),
        }
    }

    /// Overrides the reported connection state.
    pub fn set_ready_state(&self, state: ReadyState) {
        self.state.store(state.code(), Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ready_state(&self) -> ReadyState {
        ReadyState::from_code(self.state.load(Ordering::SeqCst))
    }

    async fn shutdown(&self) {
        self.set_ready_state(ReadyState::Disconnected);
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate("username"));
        }
        inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.users.get(id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }

    async fn search_users_by_email(&self, query: &str) -> Result<Vec<User>, StoreError> {
        let needle = query.to_lowercase();
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner
            .users
            .values()
            .filter(|u| u.email.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn insert_project(&self, project: &Project) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.projects.insert(project.id.clone(), project.clone());
        Ok(())
    }

    async fn find_project(&self, id: &str) -> Result<Option<Project>, StoreError> {
        Ok(self.inner.read().await.projects.get(id).cloned())
    }

    async fn list_projects_for_member(&self, user_id: &str) -> Result<Vec<Project>, StoreError> {
        let inner = self.inner.read().await;
        let mut projects: Vec<Project> = inner
            .projects
            .values()
            .filter(|p| p.is_member(user_id))
            .cloned()
            .collect();
        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(projects)
    }

    async fn replace_project(&self, project: &Project) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.projects.get_mut(&project.id) {
            Some(existing) => {
                *existing = project.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_project(&self, id: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.projects.remove(id).is_none() {
            return Ok(false);
        }
        inner.sprints.retain(|_, s| s.project != id);
        inner.tasks.retain(|_, t| t.project != id);
        Ok(true)
    }

    async fn insert_sprint(&self, sprint: &Sprint) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.sprints.insert(sprint.id.clone(), sprint.clone());
        Ok(())
    }

    async fn find_sprint(&self, id: &str) -> Result<Option<Sprint>, StoreError> {
        Ok(self.inner.read().await.sprints.get(id).cloned())
    }

    async fn list_sprints(&self, project_id: &str) -> Result<Vec<Sprint>, StoreError> {
        let inner = self.inner.read().await;
        let mut sprints: Vec<Sprint> = inner
            .sprints
            .values()
            .filter(|s| s.project == project_id)
            .cloned()
            .collect();
        sort_sprints(&mut sprints);
        Ok(sprints)
    }

    async fn update_sprint_fields(&self, sprint: &Sprint) -> Result<Option<Sprint>, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner.sprints.get_mut(&sprint.id).map(|existing| {
            existing.name = sprint.name.clone();
            existing.goal = sprint.goal.clone();
            existing.start_date = sprint.start_date;
            existing.end_date = sprint.end_date;
            existing.updated_at = sprint.updated_at;
            existing.clone()
        }))
    }

    async fn transition_sprint(
        &self,
        id: &str,
        from: SprintStatus,
        to: SprintStatus,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.sprints.get_mut(id) {
            Some(sprint) if sprint.status == from => {
                sprint.status = to;
                sprint.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_sprint(&self, id: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.sprints.remove(id).is_none() {
            return Ok(false);
        }
        let now = Utc::now();
        for task in inner.tasks.values_mut() {
            if task.sprint.as_deref() == Some(id) {
                task.sprint = None;
                task.updated_at = now;
            }
        }
        Ok(true)
    }

    async fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.tasks.insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn find_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        Ok(self.inner.read().await.tasks.get(id).cloned())
    }

    async fn list_tasks(&self, project_id: &str) -> Result<Vec<Task>, StoreError> {
        let inner = self.inner.read().await;
        let mut tasks: Vec<Task> = inner
            .tasks
            .values()
            .filter(|t| t.project == project_id)
            .cloned()
            .collect();
        sort_by_position(&mut tasks);
        Ok(tasks)
    }

    async fn replace_task(&self, task: &Task) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.tasks.get_mut(&task.id) {
            Some(existing) => {
                *existing = task.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn move_task(&self, id: &str, zone: &Zone, position: f64) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.tasks.get_mut(id) {
            Some(task) => {
                task.sprint = zone.sprint.clone();
                task.column = zone.column.clone();
                task.position = position;
                task.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn unassign_tasks(&self, project_id: &str, user_id: &str) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let mut changed = 0;
        for task in inner.tasks.values_mut() {
            if task.project == project_id && task.assignee.as_deref() == Some(user_id) {
                task.assignee = None;
                task.updated_at = now;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete_task(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.tasks.remove(id).is_some())
    }

    async fn insert_message(&self, message: &ChatMessage) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.messages.insert(message.id.clone(), message.clone());
        Ok(())
    }

    async fn find_message(&self, id: &str) -> Result<Option<ChatMessage>, StoreError> {
        Ok(self.inner.read().await.messages.get(id).cloned())
    }

    async fn list_messages(
        &self,
        project: Option<&str>,
        pinned_only: bool,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let inner = self.inner.read().await;
        let mut messages: Vec<ChatMessage> = inner
            .messages
            .values()
            .filter(|m| m.project.as_deref() == project)
            .filter(|m| !pinned_only || m.is_pinned)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }

    async fn set_pinned(&self, id: &str, pinned: bool) -> Result<Option<ChatMessage>, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner.messages.get_mut(id).map(|m| {
            m.is_pinned = pinned;
            m.clone()
        }))
    }

    async fn add_reaction(
        &self,
        id: &str,
        reaction: &Reaction,
    ) -> Result<Option<ChatMessage>, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner.messages.get_mut(id).map(|m| {
            m.add_reaction(reaction.clone());
            m.clone()
        }))
    }

    async fn remove_reaction(
        &self,
        id: &str,
        reaction: &Reaction,
    ) -> Result<Option<ChatMessage>, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner.messages.get_mut(id).map(|m| {
            m.remove_reaction(reaction);
            m.clone()
        }))
    }

    async fn delete_message(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.messages.remove(id).is_some())
    }
}
