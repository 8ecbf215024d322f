//! Core utilities and types shared across all Apiflow crates

pub mod config;
pub mod error;
pub mod id;
pub mod problemdetails;

pub use config::*;
pub use error::*;
pub use id::{Id, IdGenerator, IdParseError, WorkspaceId, ID_TEXT_LEN};
pub use problemdetails::{Problem, ProblemDetails};

/// Canonical datetime type for persisted timestamps
pub type UtcDateTime = chrono::DateTime<chrono::Utc>;
