//! The command/query surface a presentation layer drives.
//!
//! A [`Session`] owns the registry, the election controller and the campaign
//! flag for one election; nothing here is process-global.

use crate::ballot_box::VoteReceipt;
use crate::campaign::{CampaignChange, CampaignFlag};
use crate::database::RecordStore;
use crate::election::{ElectionConfig, ElectionController, ElectionPhase, Ending};
use crate::error::{ElectionError, Result};
use crate::model::election::{Candidate, Voter, VoterRef};
use crate::registry::EntityStore;
use crate::reports::{ElectionReport, TallyEntry, TallySnapshot, Winner};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Result of a voter login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoterStatus {
    CanVote,
    AlreadyVoted,
}

pub struct Session {
    registry: Arc<Mutex<EntityStore>>,
    controller: ElectionController,
    campaign: CampaignFlag,
}

impl Session {
    pub async fn open(store: Arc<dyn RecordStore>, config: ElectionConfig) -> Self {
        let registry = Arc::new(Mutex::new(EntityStore::load(store).await));
        let controller = ElectionController::new(registry.clone(), config);

        Self {
            registry,
            controller,
            campaign: CampaignFlag::new(),
        }
    }

    // Commands

    pub async fn register_candidate(&self, candidate: Candidate) -> Result<()> {
        self.registry.lock().await.upsert_candidate(candidate).await;
        Ok(())
    }

    pub async fn register_voter(&self, voter: Voter) -> Result<()> {
        self.registry.lock().await.add_voter(voter).await;
        Ok(())
    }

    pub async fn cast_vote(&self, voter: &VoterRef, candidate_name: &str) -> Result<VoteReceipt> {
        self.controller.cast_vote(voter, candidate_name).await
    }

    pub async fn start_election(&self, duration: Duration) -> Result<()> {
        self.controller.start(duration).await
    }

    pub async fn end_election(&self) -> Result<Ending> {
        self.controller.end().await
    }

    pub fn start_campaign(&self) -> CampaignChange {
        self.campaign.start()
    }

    pub fn end_campaign(&self) -> CampaignChange {
        self.campaign.end()
    }

    /// Replace a candidate's manifesto; only allowed while the campaign runs.
    pub async fn set_manifesto(&self, name: &str, id: &str, text: &str) -> Result<()> {
        if !self.campaign.is_active() {
            return Err(ElectionError::CampaignNotRunning);
        }

        let mut registry = self.registry.lock().await;
        let candidate = registry
            .find_candidate_mut(name, id)
            .ok_or_else(|| ElectionError::CandidateNotFound(name.to_string()))?;
        candidate.manifesto = text.to_string();
        tracing::info!(name, id, "manifesto updated");

        registry.persist().await;
        Ok(())
    }

    // Queries

    pub async fn live_total(&self) -> u64 {
        self.controller.reporter().live_total().await
    }

    /// Per-candidate tallies, available once the election has ended.
    pub async fn vote_breakdown(&self) -> Result<Vec<TallyEntry>> {
        self.ensure_ended().await?;
        Ok(self.controller.reporter().vote_breakdown().await)
    }

    /// Final winner, available once the election has ended.
    pub async fn winner(&self) -> Result<Winner> {
        self.ensure_ended().await?;
        Ok(self.controller.reporter().winner().await)
    }

    /// Breakdown and winner regardless of phase, for offline reporting.
    pub async fn report(&self) -> ElectionReport {
        let phase = self.controller.phase().await;
        self.controller.reporter().report(phase.name()).await
    }

    pub async fn voter_list(&self) -> Vec<String> {
        let registry = self.registry.lock().await;
        registry
            .voters()
            .iter()
            .map(|v| VoterRef::from(v).to_string())
            .collect()
    }

    pub async fn candidate_list(&self) -> Vec<String> {
        let registry = self.registry.lock().await;
        registry.candidates().iter().map(|c| c.name.clone()).collect()
    }

    /// `name | party | symbol` per candidate.
    pub async fn candidate_summary(&self) -> Vec<String> {
        let registry = self.registry.lock().await;
        registry.candidates().iter().map(Candidate::summary).collect()
    }

    pub async fn candidate_details(&self) -> Vec<String> {
        let registry = self.registry.lock().await;
        registry
            .candidates()
            .iter()
            .map(|c| {
                format!(
                    "Name: {}, Place: {}, Party: {}, Assets: {}, Criminal Cases: {}",
                    c.name, c.place, c.party, c.assets, c.criminal_cases
                )
            })
            .collect()
    }

    /// `(name, manifesto)` per candidate.
    pub async fn candidate_manifestos(&self) -> Vec<(String, String)> {
        let registry = self.registry.lock().await;
        registry
            .candidates()
            .iter()
            .map(|c| (c.name.clone(), c.manifesto.clone()))
            .collect()
    }

    /// Check voter credentials ahead of a vote.
    pub async fn login_voter(&self, name: &str, id: &str) -> Result<VoterStatus> {
        let registry = self.registry.lock().await;
        match registry.find_voter(name, id) {
            Some(voter) if voter.has_voted => Ok(VoterStatus::AlreadyVoted),
            Some(_) => Ok(VoterStatus::CanVote),
            None => Err(ElectionError::VoterNotFound {
                name: name.to_string(),
                id: id.to_string(),
            }),
        }
    }

    pub async fn login_candidate(&self, name: &str, id: &str) -> Result<Candidate> {
        let registry = self.registry.lock().await;
        registry
            .find_candidate(name, id)
            .cloned()
            .ok_or_else(|| ElectionError::CandidateNotFound(name.to_string()))
    }

    pub async fn phase(&self) -> ElectionPhase {
        self.controller.phase().await
    }

    pub async fn remaining(&self) -> Option<Duration> {
        self.controller.remaining().await
    }

    pub fn campaign_active(&self) -> bool {
        self.campaign.is_active()
    }

    pub fn snapshots(&self) -> Vec<TallySnapshot> {
        self.controller.snapshots()
    }

    pub fn controller(&self) -> &ElectionController {
        &self.controller
    }

    /// Every voter who has voted is reflected in exactly one tally.
    pub async fn tallies_consistent(&self) -> bool {
        let registry = self.registry.lock().await;
        let votes: u64 = registry.candidates().iter().map(|c| c.votes).sum();
        let voted = registry.voters().iter().filter(|v| v.has_voted).count() as u64;
        votes == voted
    }

    async fn ensure_ended(&self) -> Result<()> {
        if self.controller.is_ended().await {
            Ok(())
        } else {
            Err(ElectionError::ResultsNotReady)
        }
    }
}
