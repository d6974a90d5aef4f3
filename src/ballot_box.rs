//! At-most-once vote recording.

use crate::error::{ElectionError, Result};
use crate::model::election::VoterRef;
use crate::registry::EntityStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Proof of a recorded vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteReceipt {
    pub voter: VoterRef,
    pub candidate: String,
    pub candidate_votes: u64,
    pub cast_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct BallotBox {
    registry: Arc<Mutex<EntityStore>>,
}

impl BallotBox {
    pub fn new(registry: Arc<Mutex<EntityStore>>) -> Self {
        Self { registry }
    }

    /// Record one vote for `candidate_name`.
    ///
    /// The voter lookup, the already-voted check, the tally increment, the
    /// flag update and the persist all happen under the registry lock, so
    /// concurrent casts for the same voter count at most once. An unknown
    /// candidate leaves the voter free to vote again.
    pub async fn cast_vote(&self, voter: &VoterRef, candidate_name: &str) -> Result<VoteReceipt> {
        let mut registry = self.registry.lock().await;

        let voter_index = registry
            .voter_position(&voter.name, &voter.id)
            .ok_or_else(|| ElectionError::VoterNotFound {
                name: voter.name.clone(),
                id: voter.id.clone(),
            })?;

        if registry.voters()[voter_index].has_voted {
            return Err(ElectionError::AlreadyVoted(voter.to_string()));
        }

        let candidate_votes = match registry.find_candidate_by_name_mut(candidate_name) {
            Some(candidate) => {
                candidate.votes += 1;
                candidate.votes
            }
            None => {
                tracing::warn!(voter = %voter, candidate = candidate_name, "vote for unknown candidate dropped");
                return Err(ElectionError::CandidateNotFound(candidate_name.to_string()));
            }
        };
        registry.voter_at_mut(voter_index).has_voted = true;

        registry.persist().await;

        tracing::debug!(voter = %voter, candidate = candidate_name, votes = candidate_votes, "vote recorded");

        Ok(VoteReceipt {
            voter: voter.clone(),
            candidate: candidate_name.to_string(),
            candidate_votes,
            cast_at: Utc::now(),
        })
    }
}
