use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ValidationError;

/// A registered account. The password field holds the bcrypt hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
}

/// What we expose to other users.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            created_at: u.created_at,
        }
    }
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"))
}

fn username_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").expect("valid username regex"))
}

impl User {
    /// Validates signup input and builds the account around an already hashed password.
    pub fn new(username: &str, email: &str, password_hash: String) -> Result<Self, ValidationError> {
        let username = username.trim();
        let email = email.trim();
        if !username_pattern().is_match(username) {
            return Err(ValidationError::Invalid {
                field: "username",
                reason: "3-32 letters, digits, '.', '_' or '-'".to_string(),
            });
        }
        if !email_pattern().is_match(email) {
            return Err(ValidationError::Invalid {
                field: "email",
                reason: format!("{} is not an email address", email),
            });
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: email.to_lowercase(),
            password: password_hash,
            created_at: Utc::now(),
        })
    }
}

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::Invalid {
            field: "password",
            reason: format!("must be at least {} characters", MIN_PASSWORD_LEN),
        });
    }
    Ok(())
}
