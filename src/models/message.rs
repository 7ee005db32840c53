use chrono::{DateTime, Utc};
use mongodb::bson::{self, Bson};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ValidationError;

const MAX_REACTION_LEN: usize = 32;

/// Role of the poster at the time the message was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChatRole {
    Admin,
    CoAdmin,
    #[default]
    Member,
}

impl ChatRole {
    /// The role recorded on a new message. Elevated roles are kept only for the
    /// project owner; everyone else posts as a member.
    pub fn granted(requested: Option<ChatRole>, is_project_owner: bool) -> ChatRole {
        match requested {
            Some(role) if is_project_owner => role,
            _ => ChatRole::Member,
        }
    }
}

/// One user's reaction. A user holds each kind at most once per message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub user: String,
    pub kind: String,
}

impl Reaction {
    pub fn new(user: &str, kind: &str) -> Result<Self, ValidationError> {
        let kind = kind.trim();
        if kind.is_empty() {
            return Err(ValidationError::Missing("reaction"));
        }
        if kind.chars().count() > MAX_REACTION_LEN {
            return Err(ValidationError::Invalid {
                field: "reaction",
                reason: format!("longer than {} characters", MAX_REACTION_LEN),
            });
        }
        Ok(Self {
            user: user.to_string(),
            kind: kind.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub message: String,
    pub author: String,
    /// `None` for the global chat.
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub role: ChatRole,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(
        message: &str,
        author: &str,
        project: Option<String>,
        role: Option<ChatRole>,
    ) -> Result<Self, ValidationError> {
        if message.trim().is_empty() {
            return Err(ValidationError::Missing("message"));
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            message: message.to_string(),
            author: author.to_string(),
            project,
            role: role.unwrap_or_default(),
            is_pinned: false,
            reactions: Vec::new(),
            created_at: Utc::now(),
        })
    }

    /// Returns false if the same user already left this kind of reaction.
    pub fn add_reaction(&mut self, reaction: Reaction) -> bool {
        if self.reactions.contains(&reaction) {
            return false;
        }
        self.reactions.push(reaction);
        true
    }

    pub fn remove_reaction(&mut self, reaction: &Reaction) -> bool {
        let before = self.reactions.len();
        self.reactions.retain(|r| r != reaction);
        self.reactions.len() != before
    }
}

/// The older chat document shape, `{ post, User }`. Read only by the migration.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyChatMessage {
    #[serde(rename = "_id")]
    pub id: Bson,
    pub post: String,
    #[serde(rename = "User")]
    pub user: Bson,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<bson::DateTime>,
}

fn bson_id(value: &Bson) -> Option<String> {
    match value {
        Bson::ObjectId(oid) => Some(oid.to_hex()),
        Bson::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

impl TryFrom<LegacyChatMessage> for ChatMessage {
    type Error = ValidationError;

    fn try_from(legacy: LegacyChatMessage) -> Result<Self, Self::Error> {
        let author = bson_id(&legacy.user).ok_or(ValidationError::Missing("User"))?;
        let id = bson_id(&legacy.id).unwrap_or_else(|| Uuid::new_v4().to_string());
        let created_at = legacy
            .created_at
            .and_then(|t| DateTime::<Utc>::from_timestamp_millis(t.timestamp_millis()))
            .unwrap_or_else(Utc::now);
        Ok(Self {
            id,
            message: legacy.post,
            author,
            project: None,
            role: ChatRole::Member,
            is_pinned: false,
            reactions: Vec::new(),
            created_at,
        })
    }
}
