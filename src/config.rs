use std::env;

use crate::errors::ConfigError;

const DEFAULT_DATABASE: &str = "taskboard";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` only in development, where the in-memory store stands in.
    pub mongo_uri: Option<String>,
    pub database_name: String,
    pub environment: Environment,
    /// CORS origin allowed in production.
    pub frontend_url: Option<String>,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub migrate_legacy_chat: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let environment = match get("NODE_ENV").as_deref() {
            Some("production") => Environment::Production,
            _ => Environment::Development,
        };
        let production = environment == Environment::Production;

        let mongo_uri = get("MONGO_URI");
        if production && mongo_uri.is_none() {
            return Err(ConfigError::Missing("MONGO_URI"));
        }

        let frontend_url = get("FRONTEND_URL");
        if production && frontend_url.is_none() {
            return Err(ConfigError::Missing("FRONTEND_URL"));
        }

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None if production => return Err(ConfigError::Missing("JWT_SECRET")),
            None => DEV_JWT_SECRET.to_string(),
        };

        let migrate_legacy_chat = match get("MIGRATE_LEGACY_CHAT") {
            None => false,
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "MIGRATE_LEGACY_CHAT",
                value,
            })?,
        };

        Ok(Self {
            mongo_uri,
            database_name: get("DATABASE_NAME").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            environment,
            frontend_url,
            jwt_secret,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            migrate_legacy_chat,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}
