//! Repowiki Core - Domain types and collaborator traits shared by the
//! ingestion pipeline, storage and host clients.

mod error;
pub mod traits;
mod types;

pub use error::{Error, Result};
pub use traits::{RateLimiter, RepositoryHost};
pub use types::*;
