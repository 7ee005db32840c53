//! The data-store handle injected into every handler.
//!
//! `MongoStore` is the production backend. `MemoryStore` keeps everything in
//! process and backs development runs without a database and the test suite.
//! Every write touches a single document except the cascades noted on
//! `delete_project` and `delete_sprint`.

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::models::{ChatMessage, Project, Reaction, Sprint, SprintStatus, Task, User, Zone};

/// Connection state, numbered the way the health endpoint reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Disconnected = 0,
    Connected = 1,
    Connecting = 2,
    Disconnecting = 3,
}

impl ReadyState {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            ReadyState::Disconnected => "disconnected",
            ReadyState::Connected => "connected",
            ReadyState::Connecting => "connecting",
            ReadyState::Disconnecting => "disconnecting",
        }
    }

    pub fn is_live(self) -> bool {
        matches!(self, ReadyState::Connected | ReadyState::Connecting)
    }

    pub(crate) fn from_code(code: u8) -> Self {
        match code {
            1 => ReadyState::Connected,
            2 => ReadyState::Connecting,
            3 => ReadyState::Disconnecting,
            _ => ReadyState::Disconnected,
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn ready_state(&self) -> ReadyState;

    /// Releases the connection. Called once after the HTTP server stops.
    async fn shutdown(&self);

    // Users. Fails with `StoreError::Duplicate("username")` on a taken username.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;
    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn search_users_by_email(&self, query: &str) -> Result<Vec<User>, StoreError>;

    // Projects
    async fn insert_project(&self, project: &Project) -> Result<(), StoreError>;
    async fn find_project(&self, id: &str) -> Result<Option<Project>, StoreError>;
    async fn list_projects_for_member(&self, user_id: &str) -> Result<Vec<Project>, StoreError>;
    async fn replace_project(&self, project: &Project) -> Result<bool, StoreError>;
    /// Also deletes the project's sprints and tasks.
    async fn delete_project(&self, id: &str) -> Result<bool, StoreError>;

    // Sprints
    async fn insert_sprint(&self, sprint: &Sprint) -> Result<(), StoreError>;
    async fn find_sprint(&self, id: &str) -> Result<Option<Sprint>, StoreError>;
    /// Ordered by start date ascending.
    async fn list_sprints(&self, project_id: &str) -> Result<Vec<Sprint>, StoreError>;
    /// Writes name, goal, dates and `updatedAt` only. Status is left to
    /// `transition_sprint`. Returns the stored sprint.
    async fn update_sprint_fields(&self, sprint: &Sprint) -> Result<Option<Sprint>, StoreError>;
    /// Sets `to` only if the sprint is still in `from`.
    async fn transition_sprint(
        &self,
        id: &str,
        from: SprintStatus,
        to: SprintStatus,
    ) -> Result<bool, StoreError>;
    /// Also moves the sprint's tasks back to the project backlog.
    async fn delete_sprint(&self, id: &str) -> Result<bool, StoreError>;

    // Tasks
    async fn insert_task(&self, task: &Task) -> Result<(), StoreError>;
    async fn find_task(&self, id: &str) -> Result<Option<Task>, StoreError>;
    /// Ordered by position ascending.
    async fn list_tasks(&self, project_id: &str) -> Result<Vec<Task>, StoreError>;
    async fn replace_task(&self, task: &Task) -> Result<bool, StoreError>;
    async fn move_task(&self, id: &str, zone: &Zone, position: f64) -> Result<bool, StoreError>;
    /// Clears `assignee` on the project's tasks held by `user_id`. Returns how many changed.
    async fn unassign_tasks(&self, project_id: &str, user_id: &str) -> Result<u64, StoreError>;
    async fn delete_task(&self, id: &str) -> Result<bool, StoreError>;

    // Chat
    async fn insert_message(&self, message: &ChatMessage) -> Result<(), StoreError>;
    async fn find_message(&self, id: &str) -> Result<Option<ChatMessage>, StoreError>;
    /// Oldest first. `project: None` lists the global chat.
    async fn list_messages(
        &self,
        project: Option<&str>,
        pinned_only: bool,
    ) -> Result<Vec<ChatMessage>, StoreError>;
    async fn set_pinned(&self, id: &str, pinned: bool) -> Result<Option<ChatMessage>, StoreError>;
    /// No-op if the same reaction is already present.
    async fn add_reaction(
        &self,
        id: &str,
        reaction: &Reaction,
    ) -> Result<Option<ChatMessage>, StoreError>;
    async fn remove_reaction(
        &self,
        id: &str,
        reaction: &Reaction,
    ) -> Result<Option<ChatMessage>, StoreError>;
    async fn delete_message(&self, id: &str) -> Result<bool, StoreError>;
}
