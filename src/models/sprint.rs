use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::errors::ValidationError;

/// Ordered: a sprint only ever moves towards `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SprintStatus {
    #[default]
    Planned,
    Active,
    Completed,
}

impl SprintStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SprintStatus::Planned => "planned",
            SprintStatus::Active => "active",
            SprintStatus::Completed => "completed",
        }
    }

    /// Forward moves, skips included, and staying put are allowed.
    pub fn can_transition_to(self, next: SprintStatus) -> bool {
        next >= self
    }
}

impl fmt::Display for SprintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("Sprint cannot move from {from} back to {to}")]
pub struct TransitionError {
    pub from: SprintStatus,
    pub to: SprintStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprint {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub goal: Option<String>,
    pub project: String,
    #[serde(default)]
    pub status: SprintStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sprint {
    pub fn new(
        name: &str,
        goal: Option<String>,
        project: &str,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        created_by: &str,
    ) -> Result<Self, ValidationError> {
        let now = Utc::now();
        let sprint = Self {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            goal,
            project: project.to_string(),
            status: SprintStatus::Planned,
            start_date,
            end_date,
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        };
        sprint.validate()?;
        Ok(sprint)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::Missing("name"));
        }
        if self.project.is_empty() {
            return Err(ValidationError::Missing("project"));
        }
        if self.created_by.is_empty() {
            return Err(ValidationError::Missing("createdBy"));
        }
        if self.start_date > self.end_date {
            return Err(ValidationError::DateOrder);
        }
        Ok(())
    }

    pub fn check_transition(&self, next: SprintStatus) -> Result<(), TransitionError> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(TransitionError { from: self.status, to: next })
        }
    }
}

/// Start date ascending; creation time and id break ties so the order is stable.
pub fn sort_sprints(sprints: &mut [Sprint]) {
    sprints.sort_by(|a, b| {
        a.start_date
            .cmp(&b.start_date)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
}
