pub mod flat_file;
pub mod memory;
pub mod schema;
pub mod sqlite;

use crate::model::election::{Candidate, Voter};
use async_trait::async_trait;

pub use flat_file::FlatFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("SQLite error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Data integrity error: {0}")]
    Integrity(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Everything a store holds, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Records {
    pub candidates: Vec<Candidate>,
    pub voters: Vec<Voter>,
}

/// Persistence collaborator behind the entity registry.
///
/// Stores follow a "load all, rewrite all" contract: `save` replaces the
/// whole previous content rather than appending to it.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn load(&self) -> Result<Records>;

    async fn save(&self, records: &Records) -> Result<()>;

    /// Human readable location, used in log lines.
    fn describe(&self) -> String;
}
