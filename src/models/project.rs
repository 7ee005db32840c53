use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ValidationError;

pub const DEFAULT_COLUMNS: [&str; 3] = ["todo", "inProgress", "done"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectStatus {
    #[default]
    Active,
    OnHold,
    Completed,
    Archived,
}

/// A project owns its sprints and tasks. The owner is always one of the members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub owner: String,
    pub members: Vec<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    /// Board columns, left to right.
    pub columns: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(
        title: &str,
        description: Option<String>,
        owner: &str,
        members: Vec<String>,
        columns: Option<Vec<String>>,
    ) -> Result<Self, ValidationError> {
        let now = Utc::now();
        let mut project = Self {
            id: Uuid::new_v4().to_string(),
            title: String::new(),
            description,
            owner: owner.to_string(),
            members: Vec::new(),
            status: ProjectStatus::default(),
            columns: DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            created_at: now,
            updated_at: now,
        };
        project.set_title(title)?;
        project.members = normalize_members(owner, members);
        if let Some(columns) = columns {
            project.set_columns(columns)?;
        }
        Ok(project)
    }

    pub fn set_title(&mut self, title: &str) -> Result<(), ValidationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::Missing("title"));
        }
        self.title = title.to_string();
        Ok(())
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner == user_id
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m == user_id)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Returns false when the user was already a member.
    pub fn add_member(&mut self, user_id: &str) -> bool {
        if self.is_member(user_id) {
            return false;
        }
        self.members.push(user_id.to_string());
        true
    }

    /// Returns false when the user was not a member.
    pub fn remove_member(&mut self, user_id: &str) -> Result<bool, ValidationError> {
        if self.is_owner(user_id) {
            return Err(ValidationError::OwnerNotMember);
        }
        let before = self.members.len();
        self.members.retain(|m| m != user_id);
        Ok(self.members.len() != before)
    }

    pub fn set_columns(&mut self, columns: Vec<String>) -> Result<(), ValidationError> {
        let mut cleaned: Vec<String> = Vec::with_capacity(columns.len());
        for column in columns {
            let column = column.trim().to_string();
            if column.is_empty() {
                return Err(ValidationError::Missing("column name"));
            }
            if cleaned.contains(&column) {
                return Err(ValidationError::DuplicateColumn(column));
            }
            cleaned.push(column);
        }
        if cleaned.is_empty() {
            return Err(ValidationError::Missing("columns"));
        }
        self.columns = cleaned;
        Ok(())
    }
}

/// Owner first, then the remaining members in their given order, without duplicates.
fn normalize_members(owner: &str, members: Vec<String>) -> Vec<String> {
    let mut out = vec![owner.to_string()];
    for member in members {
        if !out.contains(&member) {
            out.push(member);
        }
    }
    out
}
