use crate::database::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ElectionError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("voter {name} (ID: {id}) not found")]
    VoterNotFound { name: String, id: String },

    #[error("candidate {0} not found")]
    CandidateNotFound(String),

    #[error("election is already running")]
    AlreadyRunning,

    #[error("election is not running")]
    NotRunning,

    #[error("voter {0} has already voted")]
    AlreadyVoted(String),

    #[error("campaign is not running")]
    CampaignNotRunning,

    #[error("results are available once the election has ended")]
    ResultsNotReady,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ElectionError>;
