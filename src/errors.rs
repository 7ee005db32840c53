use std::fmt::Display;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::error;
use thiserror::Error;

/// Rejections of malformed input. Always surfaced as 400.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("startDate must not be after endDate")]
    DateOrder,

    #[error("Referenced project {0} does not exist")]
    UnknownProject(String),

    #[error("Referenced user {0} does not exist")]
    UnknownUser(String),

    #[error("Sprint {0} does not belong to this project")]
    ForeignSprint(String),

    #[error("Sprint {0} is completed and takes no tasks")]
    ClosedSprint(String),

    #[error("Unknown column {0}")]
    UnknownColumn(String),

    #[error("Duplicate column {0}")]
    DuplicateColumn(String),

    #[error("Column {0} still holds tasks")]
    ColumnInUse(String),

    #[error("The project owner must stay a member")]
    OwnerNotMember,

    #[error("Assignee {0} is not a project member")]
    AssigneeNotMember(String),

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ResponseError for ValidationError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::BadRequest().body(self.to_string())
    }
}

/// Failures of the backing document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("document encoding error: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),

    #[error("duplicate value for {0}")]
    Duplicate(&'static str),
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Logs the cause and answers with a generic 500.
pub fn internal_error(what: &str, err: impl Display) -> HttpResponse {
    error!("{}: {}", what, err);
    HttpResponse::InternalServerError().body(what.to_string())
}
