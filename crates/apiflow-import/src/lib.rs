//! Import pipeline: validation, input resolution, storage and the HTTP adapter
//!
//! [`ImportCoordinator`] runs one import call end to end. Everything it
//! writes goes through [`ImporterStorage`] in a single transaction, and
//! the resulting events are published only after that transaction commits.

pub mod handlers;
pub mod services;

pub use handlers::{configure_routes, create_import_app_state, ImportApiDoc, ImportAppState};
pub use services::*;
