//! In-memory registry of candidates and voters, mirrored to a [`RecordStore`]
//! after every mutation.

use crate::database::{RecordStore, Records};
use crate::model::election::{Candidate, Voter};
use std::sync::Arc;

pub struct EntityStore {
    candidates: Vec<Candidate>,
    voters: Vec<Voter>,
    store: Arc<dyn RecordStore>,
}

impl EntityStore {
    /// Load every record from `store`. An unreadable store is logged and the
    /// registry starts empty.
    pub async fn load(store: Arc<dyn RecordStore>) -> Self {
        let records = match store.load().await {
            Ok(records) => {
                tracing::info!(
                    store = %store.describe(),
                    candidates = records.candidates.len(),
                    voters = records.voters.len(),
                    "loaded election records"
                );
                records
            }
            Err(e) => {
                tracing::error!(store = %store.describe(), error = %e, "failed to load records, starting empty");
                Records::default()
            }
        };

        Self {
            candidates: records.candidates,
            voters: records.voters,
            store,
        }
    }

    /// Register a candidate, replacing any entry with the same id.
    ///
    /// A replaced entry keeps its vote count and manifesto so tallies never
    /// move backwards.
    pub async fn upsert_candidate(&mut self, mut candidate: Candidate) {
        match self.candidates.iter_mut().find(|c| c.id == candidate.id) {
            Some(existing) => {
                candidate.votes = existing.votes;
                candidate.manifesto = std::mem::take(&mut existing.manifesto);
                tracing::info!(id = %candidate.id, name = %candidate.name, "candidate updated");
                *existing = candidate;
            }
            None => {
                tracing::info!(id = %candidate.id, name = %candidate.name, "candidate registered");
                self.candidates.push(candidate);
            }
        }

        self.persist().await;
    }

    /// Register a voter. Duplicate `(name, id)` pairs are accepted.
    pub async fn add_voter(&mut self, voter: Voter) {
        if self.find_voter(&voter.name, &voter.id).is_some() {
            tracing::warn!(name = %voter.name, id = %voter.id, "voter registered twice");
        } else {
            tracing::info!(name = %voter.name, id = %voter.id, "voter registered");
        }
        self.voters.push(voter);

        self.persist().await;
    }

    pub fn find_candidate(&self, name: &str, id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.matches(name, id))
    }

    pub fn find_candidate_mut(&mut self, name: &str, id: &str) -> Option<&mut Candidate> {
        self.candidates.iter_mut().find(|c| c.matches(name, id))
    }

    pub fn find_candidate_by_name_mut(&mut self, name: &str) -> Option<&mut Candidate> {
        self.candidates.iter_mut().find(|c| c.name == name)
    }

    pub fn find_voter(&self, name: &str, id: &str) -> Option<&Voter> {
        self.voters.iter().find(|v| v.matches(name, id))
    }

    pub(crate) fn voter_position(&self, name: &str, id: &str) -> Option<usize> {
        self.voters.iter().position(|v| v.matches(name, id))
    }

    pub(crate) fn voter_at_mut(&mut self, index: usize) -> &mut Voter {
        &mut self.voters[index]
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn voters(&self) -> &[Voter] {
        &self.voters
    }

    pub fn records(&self) -> Records {
        Records {
            candidates: self.candidates.clone(),
            voters: self.voters.clone(),
        }
    }

    /// Rewrite the backing store with the full registry.
    ///
    /// Failures are logged and the in-memory state is kept.
    pub async fn persist(&self) {
        if let Err(e) = self.store.save(&self.records()).await {
            tracing::error!(store = %self.store.describe(), error = %e, "failed to persist election records");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    async fn registry() -> (Arc<MemoryStore>, EntityStore) {
        let memory = Arc::new(MemoryStore::new());
        let store = EntityStore::load(memory.clone()).await;
        (memory, store)
    }

    #[tokio::test]
    async fn upsert_replaces_by_id_and_keeps_order() {
        let (memory, mut store) = registry().await;
        store.upsert_candidate(Candidate::new("X", "A", "1", "P", "S", "0", "0")).await;
        store.upsert_candidate(Candidate::new("Y", "B", "2", "Q", "T", "0", "0")).await;
        store.upsert_candidate(Candidate::new("X2", "C", "1", "R", "U", "9", "1")).await;

        let names: Vec<&str> = store.candidates().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["X2", "Y"]);
        assert_eq!(memory.save_count(), 3);
        assert_eq!(memory.snapshot().candidates[0].party, "R");
    }

    #[tokio::test]
    async fn upsert_keeps_tally_and_manifesto() {
        let (_memory, mut store) = registry().await;
        store.upsert_candidate(Candidate::new("X", "A", "1", "P", "S", "0", "0")).await;
        {
            let x = store.find_candidate_mut("X", "1").unwrap();
            x.votes = 4;
            x.manifesto = "Lower taxes".to_string();
        }

        store.upsert_candidate(Candidate::new("X", "A", "1", "New", "S", "0", "0")).await;

        let x = store.find_candidate("X", "1").unwrap();
        assert_eq!(x.votes, 4);
        assert_eq!(x.manifesto, "Lower taxes");
        assert_eq!(x.party, "New");
    }

    #[tokio::test]
    async fn duplicate_voters_are_accepted() {
        let (memory, mut store) = registry().await;
        store.add_voter(Voter::new("Alice", "9")).await;
        store.add_voter(Voter::new("Alice", "9")).await;

        assert_eq!(store.voters().len(), 2);
        assert_eq!(memory.snapshot().voters.len(), 2);
    }

    #[tokio::test]
    async fn lookups_need_both_name_and_id() {
        let (_memory, mut store) = registry().await;
        store.add_voter(Voter::new("Alice", "9")).await;
        store.upsert_candidate(Candidate::new("X", "A", "1", "P", "S", "0", "0")).await;

        assert!(store.find_voter("Alice", "9").is_some());
        assert!(store.find_voter("Alice", "10").is_none());
        assert!(store.find_candidate("X", "1").is_some());
        assert!(store.find_candidate("X", "2").is_none());
    }

    #[tokio::test]
    async fn failed_save_keeps_in_memory_state() {
        let (memory, mut store) = registry().await;
        memory.fail_saves(true);

        store.add_voter(Voter::new("Alice", "9")).await;

        assert_eq!(store.voters().len(), 1);
        assert!(memory.snapshot().voters.is_empty());
    }
}
