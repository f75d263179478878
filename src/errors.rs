use crate::core::permissions::{ResourceKind, Verb};
use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The store could not be reached or rejected the statement at the driver level.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Permission denied: cannot {verb} {resource}")]
    AuthorizationDenied { verb: Verb, resource: ResourceKind },

    #[error("Validation failed for `{field}`: {message}")]
    Validation { field: String, message: String },

    #[error("{entity} #{id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Notification delivery failed: {message}")]
    NotificationDelivery { message: String },

    /// The reminder scheduler's background task could not be controlled.
    #[error("Scheduler error: {message}")]
    Scheduler { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    pub(crate) fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
