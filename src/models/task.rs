use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ValidationError;

/// A droppable area of the board: one column of the backlog or of a sprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    /// `None` is the project backlog.
    pub sprint: Option<String>,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: String,
    pub project: String,
    pub sprint: Option<String>,
    pub column: String,
    pub title: String,
    pub description: Option<String>,
    pub assignee: Option<String>,
    /// Order key within the zone; lower sorts first.
    pub position: f64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        project: &str,
        zone: Zone,
        title: &str,
        description: Option<String>,
        position: f64,
        created_by: &str,
    ) -> Result<Self, ValidationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::Missing("title"));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            project: project.to_string(),
            sprint: zone.sprint,
            column: zone.column,
            title: title.to_string(),
            description,
            assignee: None,
            position,
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn zone(&self) -> Zone {
        Zone {
            sprint: self.sprint.clone(),
            column: self.column.clone(),
        }
    }

    pub fn in_zone(&self, zone: &Zone) -> bool {
        self.sprint == zone.sprint && self.column == zone.column
    }
}

/// Position ascending, creation time breaking ties.
pub fn sort_by_position(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        a.position
            .total_cmp(&b.position)
            .then(a.created_at.cmp(&b.created_at))
    });
}
