use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::TryStreamExt;
use futures_util::StreamExt;
use log::{debug, info, warn};
use mongodb::bson::{doc, to_bson, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};

use super::{ReadyState, Store};
use crate::errors::StoreError;
use crate::models::sprint::sort_sprints;
use crate::models::task::sort_by_position;
use crate::models::{
    ChatMessage, LegacyChatMessage, Project, Reaction, Sprint, SprintStatus, Task, User, Zone,
};

const USERS: &str = "users";
const PROJECTS: &str = "projects";
const SPRINTS: &str = "sprints";
const TASKS: &str = "tasks";
const CHAT_MESSAGES: &str = "chat_messages";
const LEGACY_CHATS: &str = "chats";

const DUPLICATE_KEY: i32 = 11000;
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

pub struct MongoStore {
    client: Client,
    db: Database,
    state: AtomicU8,
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY
    )
}

fn now_bson() -> Result<Bson, StoreError> {
    Ok(to_bson(&Utc::now())?)
}

impl MongoStore {
    /// Builds the client. The driver connects lazily, so the store starts out `Connecting`.
    pub async fn init(uri: &str, db_name: &str) -> Result<Self, StoreError> {
        let mut client_options = ClientOptions::parse(uri).await?;
        client_options.app_name = Some("taskboard".to_string());
        client_options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);
        let store = MongoStore {
            client,
            db,
            state: AtomicU8::new(ReadyState::Connecting.code()),
        };
        if let Err(e) = store.ensure_indexes().await {
            warn!("Could not create indexes, continuing without them: {}", e);
        }
        Ok(store)
    }

    async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let unique = IndexOptions::builder().unique(true).build();
        self.users()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "username": 1 })
                    .options(unique)
                    .build(),
            )
            .await?;
        self.sprints()
            .create_index(IndexModel::builder().keys(doc! { "project": 1 }).build())
            .await?;
        self.tasks()
            .create_index(IndexModel::builder().keys(doc! { "project": 1, "sprint": 1 }).build())
            .await?;
        self.messages()
            .create_index(IndexModel::builder().keys(doc! { "project": 1 }).build())
            .await?;
        self.state.store(ReadyState::Connected.code(), Ordering::SeqCst);
        debug!("Indexes ensured on {}", self.db.name());
        Ok(())
    }

    /// Converts `{ post, User }` documents from the legacy `chats` collection into
    /// canonical messages and removes the originals. Returns how many were moved.
    pub async fn migrate_legacy_messages(&self) -> Result<u64, StoreError> {
        let legacy = self.db.collection::<LegacyChatMessage>(LEGACY_CHATS);
        let canonical = self.messages();
        let mut cursor = legacy.find(doc! { "post": { "$exists": true } }).await?;
        let mut migrated = 0;
        while let Some(res) = cursor.next().await {
            let old = match res {
                Ok(old) => old,
                Err(e) => {
                    warn!("Skipping unreadable legacy chat document: {}", e);
                    continue;
                }
            };
            let legacy_id = old.id.clone();
            let message = match ChatMessage::try_from(old) {
                Ok(m) => m,
                Err(e) => {
                    warn!("Skipping legacy chat document {}: {}", legacy_id, e);
                    continue;
                }
            };
            canonical
                .replace_one(doc! { "_id": &message.id }, &message)
                .upsert(true)
                .await?;
            legacy.delete_one(doc! { "_id": legacy_id }).await?;
            migrated += 1;
        }
        info!("Migrated {} legacy chat messages", migrated);
        Ok(migrated)
    }

    fn users(&self) -> Collection<User> {
        self.db.collection(USERS)
    }

    fn projects(&self) -> Collection<Project> {
        self.db.collection(PROJECTS)
    }

    fn sprints(&self) -> Collection<Sprint> {
        self.db.collection(SPRINTS)
    }

    fn tasks(&self) -> Collection<Task> {
        self.db.collection(TASKS)
    }

    fn messages(&self) -> Collection<ChatMessage> {
        self.db.collection(CHAT_MESSAGES)
    }

    async fn update_message(
        &self,
        id: &str,
        update: Document,
    ) -> Result<Option<ChatMessage>, StoreError> {
        Ok(self
            .messages()
            .find_one_and_update(doc! { "_id": id }, update)
            .return_document(ReturnDocument::After)
            .await?)
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn ready_state(&self) -> ReadyState {
        let current = ReadyState::from_code(self.state.load(Ordering::SeqCst));
        if current == ReadyState::Disconnecting {
            return current;
        }
        let next = match self.db.run_command(doc! { "ping": 1 }).await {
            Ok(_) => ReadyState::Connected,
            Err(e) => {
                warn!("Database ping failed: {}", e);
                ReadyState::Disconnected
            }
        };
        self.state.store(next.code(), Ordering::SeqCst);
        next
    }

    async fn shutdown(&self) {
        self.state.store(ReadyState::Disconnecting.code(), Ordering::SeqCst);
        self.client.clone().shutdown().await;
        self.state.store(ReadyState::Disconnected.code(), Ordering::SeqCst);
        info!("MongoDB client shut down");
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        match self.users().insert_one(user).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::Duplicate("username")),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users().find_one(doc! { "_id": id }).await?)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users().find_one(doc! { "username": username }).await?)
    }

    async fn search_users_by_email(&self, query: &str) -> Result<Vec<User>, StoreError> {
        let filter = doc! { "email": { "$regex": regex::escape(query), "$options": "i" } };
        Ok(self.users().find(filter).await?.try_collect().await?)
    }

    async fn insert_project(&self, project: &Project) -> Result<(), StoreError> {
        self.projects().insert_one(project).await?;
        Ok(())
    }

    async fn find_project(&self, id: &str) -> Result<Option<Project>, StoreError> {
        Ok(self.projects().find_one(doc! { "_id": id }).await?)
    }

    async fn list_projects_for_member(&self, user_id: &str) -> Result<Vec<Project>, StoreError> {
        let mut projects: Vec<Project> = self
            .projects()
            .find(doc! { "members": user_id })
            .await?
            .try_collect()
            .await?;
        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(projects)
    }

    async fn replace_project(&self, project: &Project) -> Result<bool, StoreError> {
        let res = self
            .projects()
            .replace_one(doc! { "_id": &project.id }, project)
            .await?;
        Ok(res.matched_count == 1)
    }

    async fn delete_project(&self, id: &str) -> Result<bool, StoreError> {
        let res = self.projects().delete_one(doc! { "_id": id }).await?;
        if res.deleted_count == 0 {
            return Ok(false);
        }
        let sprints = self.sprints().delete_many(doc! { "project": id }).await?;
        let tasks = self.tasks().delete_many(doc! { "project": id }).await?;
        debug!(
            "Project {} removed with {} sprints and {} tasks",
            id, sprints.deleted_count, tasks.deleted_count
        );
        Ok(true)
    }

    async fn insert_sprint(&self, sprint: &Sprint) -> Result<(), StoreError> {
        self.sprints().insert_one(sprint).await?;
        Ok(())
    }

    async fn find_sprint(&self, id: &str) -> Result<Option<Sprint>, StoreError> {
        Ok(self.sprints().find_one(doc! { "_id": id }).await?)
    }

    async fn list_sprints(&self, project_id: &str) -> Result<Vec<Sprint>, StoreError> {
        let mut sprints: Vec<Sprint> = self
            .sprints()
            .find(doc! { "project": project_id })
            .await?
            .try_collect()
            .await?;
        // Dates are stored as RFC 3339 strings, which do not sort reliably server side.
        sort_sprints(&mut sprints);
        Ok(sprints)
    }

    async fn update_sprint_fields(&self, sprint: &Sprint) -> Result<Option<Sprint>, StoreError> {
        let update = doc! { "$set": {
            "name": &sprint.name,
            "goal": sprint.goal.clone(),
            "startDate": to_bson(&sprint.start_date)?,
            "endDate": to_bson(&sprint.end_date)?,
            "updatedAt": to_bson(&sprint.updated_at)?,
        } };
        Ok(self
            .sprints()
            .find_one_and_update(doc! { "_id": &sprint.id }, update)
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn transition_sprint(
        &self,
        id: &str,
        from: SprintStatus,
        to: SprintStatus,
    ) -> Result<bool, StoreError> {
        let res = self
            .sprints()
            .update_one(
                doc! { "_id": id, "status": from.as_str() },
                doc! { "$set": { "status": to.as_str(), "updatedAt": now_bson()? } },
            )
            .await?;
        Ok(res.matched_count == 1)
    }

    async fn delete_sprint(&self, id: &str) -> Result<bool, StoreError> {
        let res = self.sprints().delete_one(doc! { "_id": id }).await?;
        if res.deleted_count == 0 {
            return Ok(false);
        }
        let moved = self
            .tasks()
            .update_many(
                doc! { "sprint": id },
                doc! { "$set": { "sprint": Bson::Null, "updatedAt": now_bson()? } },
            )
            .await?;
        debug!("Sprint {} removed, {} tasks back in backlog", id, moved.modified_count);
        Ok(true)
    }

    async fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        self.tasks().insert_one(task).await?;
        Ok(())
    }

    async fn find_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks().find_one(doc! { "_id": id }).await?)
    }

    async fn list_tasks(&self, project_id: &str) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self
            .tasks()
            .find(doc! { "project": project_id })
            .await?
            .try_collect()
            .await?;
        sort_by_position(&mut tasks);
        Ok(tasks)
    }

    async fn replace_task(&self, task: &Task) -> Result<bool, StoreError> {
        let res = self
            .tasks()
            .replace_one(doc! { "_id": &task.id }, task)
            .await?;
        Ok(res.matched_count == 1)
    }

    async fn move_task(&self, id: &str, zone: &Zone, position: f64) -> Result<bool, StoreError> {
        let res = self
            .tasks()
            .update_one(
                doc! { "_id": id },
                doc! { "$set": {
                    "sprint": zone.sprint.clone(),
                    "column": &zone.column,
                    "position": position,
                    "updatedAt": now_bson()?,
                } },
            )
            .await?;
        Ok(res.matched_count == 1)
    }

    async fn unassign_tasks(&self, project_id: &str, user_id: &str) -> Result<u64, StoreError> {
        let res = self
            .tasks()
            .update_many(
                doc! { "project": project_id, "assignee": user_id },
                doc! { "$set": { "assignee": Bson::Null, "updatedAt": now_bson()? } },
            )
            .await?;
        Ok(res.modified_count)
    }

    async fn delete_task(&self, id: &str) -> Result<bool, StoreError> {
        let res = self.tasks().delete_one(doc! { "_id": id }).await?;
        Ok(res.deleted_count == 1)
    }

    async fn insert_message(&self, message: &ChatMessage) -> Result<(), StoreError> {
        self.messages().insert_one(message).await?;
        Ok(())
    }

    async fn find_message(&self, id: &str) -> Result<Option<ChatMessage>, StoreError> {
        Ok(self.messages().find_one(doc! { "_id": id }).await?)
    }

    async fn list_messages(
        &self,
        project: Option<&str>,
        pinned_only: bool,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let mut filter = match project {
            Some(p) => doc! { "project": p },
            None => doc! { "project": Bson::Null },
        };
        if pinned_only {
            filter.insert("isPinned", true);
        }
        let mut messages: Vec<ChatMessage> =
            self.messages().find(filter).await?.try_collect().await?;
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }

    async fn set_pinned(&self, id: &str, pinned: bool) -> Result<Option<ChatMessage>, StoreError> {
        self.update_message(id, doc! { "$set": { "isPinned": pinned } })
            .await
    }

    async fn add_reaction(
        &self,
        id: &str,
        reaction: &Reaction,
    ) -> Result<Option<ChatMessage>, StoreError> {
        self.update_message(id, doc! { "$addToSet": { "reactions": to_bson(reaction)? } })
            .await
    }

    async fn remove_reaction(
        &self,
        id: &str,
        reaction: &Reaction,
    ) -> Result<Option<ChatMessage>, StoreError> {
        self.update_message(
            id,
            doc! { "$pull": { "reactions": { "user": &reaction.user, "kind": &reaction.kind } } },
        )
        .await
    }

    async fn delete_message(&self, id: &str) -> Result<bool, StoreError> {
        let res = self.messages().delete_one(doc! { "_id": id }).await?;
        Ok(res.deleted_count == 1)
    }
}
