//! Errors raised while setting up shared infrastructure

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    /// Connecting to or querying the database failed
    #[error("Database error: {0}")]
    Database(String),

    #[error("Schema migration failed: {0}")]
    Migration(String),

    #[error("Invalid {setting}: {message}")]
    Configuration {
        setting: &'static str,
        message: String,
    },
}

impl ServiceError {
    pub fn config(setting: &'static str, message: impl Into<String>) -> Self {
        Self::Configuration {
            setting,
            message: message.into(),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
