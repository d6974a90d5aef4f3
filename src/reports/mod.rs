use crate::model::election::Candidate;
use crate::registry::EntityStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

pub mod monitor;
pub mod tabulation;

pub use monitor::{SnapshotCollector, TallySnapshot};
pub use tabulation::{decide_winner, TallyEntry, Winner};

/// Full results report, rendered by `results --json`
#[derive(Debug, Serialize, Deserialize)]
pub struct ElectionReport {
    #[serde(rename = "generatedAt")]
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub phase: String,
    #[serde(rename = "totalVotes")]
    pub total_votes: u64,
    #[serde(rename = "votersTurnedOut")]
    pub voters_turned_out: usize,
    #[serde(rename = "registeredVoters")]
    pub registered_voters: usize,
    pub breakdown: Vec<TallyEntry>,
    pub winner: Winner,
}

/// Read-only view over the registry's tallies.
#[derive(Clone)]
pub struct TallyReporter {
    registry: Arc<Mutex<EntityStore>>,
}

impl TallyReporter {
    pub fn new(registry: Arc<Mutex<EntityStore>>) -> Self {
        Self { registry }
    }

    /// Sum of every candidate's tally.
    pub async fn live_total(&self) -> u64 {
        tabulation::total_votes(&self.vote_breakdown().await)
    }

    /// Tallies in registration order.
    pub async fn vote_breakdown(&self) -> Vec<TallyEntry> {
        let registry = self.registry.lock().await;
        breakdown_of(registry.candidates())
    }

    pub async fn winner(&self) -> Winner {
        decide_winner(&self.vote_breakdown().await)
    }

    pub async fn report(&self, phase: &str) -> ElectionReport {
        let registry = self.registry.lock().await;
        let breakdown = breakdown_of(registry.candidates());

        ElectionReport {
            generated_at: chrono::Utc::now(),
            phase: phase.to_string(),
            total_votes: tabulation::total_votes(&breakdown),
            voters_turned_out: registry.voters().iter().filter(|v| v.has_voted).count(),
            registered_voters: registry.voters().len(),
            winner: decide_winner(&breakdown),
            breakdown,
        }
    }
}

fn breakdown_of(candidates: &[Candidate]) -> Vec<TallyEntry> {
    candidates
        .iter()
        .map(|c| TallyEntry::new(&c.name, c.votes))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::database::Records;
    use crate::model::election::Voter;

    async fn reporter(tallies: &[(&str, u64)]) -> TallyReporter {
        let mut records = Records::default();
        for (i, (name, votes)) in tallies.iter().enumerate() {
            let mut candidate = Candidate::new(name, "P", &i.to_string(), "Party", "Sym", "0", "0");
            candidate.votes = *votes;
            records.candidates.push(candidate);
            for _ in 0..*votes {
                let mut voter = Voter::new("v", &records.voters.len().to_string());
                voter.has_voted = true;
                records.voters.push(voter);
            }
        }
        let store = EntityStore::load(Arc::new(MemoryStore::with_records(records))).await;
        TallyReporter::new(Arc::new(Mutex::new(store)))
    }

    #[tokio::test]
    async fn totals_and_breakdown_follow_registration_order() {
        let reporter = reporter(&[("A", 5), ("B", 3), ("C", 5)]).await;

        assert_eq!(reporter.live_total().await, 13);
        let names: Vec<String> = reporter
            .vote_breakdown()
            .await
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn report_counts_turnout() {
        let reporter = reporter(&[("A", 2), ("B", 1)]).await;

        let report = reporter.report("ended").await;
        assert_eq!(report.total_votes, 3);
        assert_eq!(report.voters_turned_out, 3);
        assert!(matches!(report.winner, Winner::Decided { ref name, .. } if name == "A"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["winner"]["status"], "decided");
        assert_eq!(json["totalVotes"], 3);
    }

    #[tokio::test]
    async fn empty_registry_has_no_candidates() {
        let reporter = reporter(&[]).await;
        assert_eq!(reporter.live_total().await, 0);
        assert_eq!(reporter.winner().await, Winner::NoCandidates);
    }
}
