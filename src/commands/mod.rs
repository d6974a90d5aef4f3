mod listing;
mod register;
mod run;

pub use listing::{candidates, results, voters, CandidateView};
pub use register::{register_candidate, register_voter, CandidateForm};
pub use run::run;

use election_sim::database::{FlatFileStore, RecordStore, SqliteStore, StoreError};
use election_sim::ElectionError;
use std::path::Path;
use std::sync::Arc;

pub type CommandResult = std::result::Result<(), Box<dyn std::error::Error>>;

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// candidate.txt and voter.txt in the data directory
    FlatFile,
    /// election.db in the data directory
    Sqlite,
}

pub const SQLITE_FILE: &str = "election.db";

pub async fn open_store(
    backend: Backend,
    data_dir: &Path,
) -> std::result::Result<Arc<dyn RecordStore>, StoreError> {
    tokio::fs::create_dir_all(data_dir).await?;

    let store: Arc<dyn RecordStore> = match backend {
        Backend::FlatFile => Arc::new(FlatFileStore::new(data_dir)),
        Backend::Sqlite => Arc::new(SqliteStore::open(&data_dir.join(SQLITE_FILE)).await?),
    };
    Ok(store)
}

/// Reject values the record format cannot hold.
pub fn validate_field(label: &str, value: &str) -> election_sim::Result<()> {
    if value.trim().is_empty() {
        return Err(ElectionError::Validation(format!("{} must not be empty", label)));
    }
    if value.contains(',') {
        return Err(ElectionError::Validation(format!(
            "{} must not contain ',' (got '{}')",
            label, value
        )));
    }
    Ok(())
}
