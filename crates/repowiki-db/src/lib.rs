//! Repowiki DB - SQLite storage for repositories and their documentation tree.

mod database;
mod error;
mod migrations;
mod operations;

pub use database::Database;
pub use error::{DbError, DbResult};
