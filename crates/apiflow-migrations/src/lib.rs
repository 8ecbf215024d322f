//! Database migrations for the Apiflow toolkit
//!
//! The schema only uses portable column types so the same migrations run
//! on PostgreSQL in production and on SQLite in tests.

pub use sea_orm_migration::prelude::*;

mod migration;
pub use migration::Migrator;
