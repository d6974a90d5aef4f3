/// Periodic tally snapshots taken while an election runs
use super::{tabulation, TallyEntry, TallyReporter};
use chrono::{DateTime, Utc};
use instant::Instant;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TallySnapshot {
    pub taken_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub total_votes: u64,
    pub breakdown: Vec<TallyEntry>,
}

/// Bounded history of snapshots, shared between the loop and readers.
#[derive(Clone)]
pub struct SnapshotCollector {
    history: Arc<Mutex<VecDeque<TallySnapshot>>>,
    capacity: usize,
}

impl SnapshotCollector {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&self, snapshot: TallySnapshot) {
        if let Ok(mut history) = self.history.lock() {
            while history.len() >= self.capacity {
                history.pop_front();
            }
            history.push_back(snapshot);
        }
    }

    /// Oldest first.
    pub fn snapshots(&self) -> Vec<TallySnapshot> {
        self.history
            .lock()
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn latest(&self) -> Option<TallySnapshot> {
        self.history
            .lock()
            .ok()
            .and_then(|history| history.back().cloned())
    }

    pub fn clear(&self) {
        if let Ok(mut history) = self.history.lock() {
            history.clear();
        }
    }

    /// Print a snapshot summary
    pub fn print_summary(&self) {
        use colored::*;

        println!("\n{}", "📊 Live Tally Summary".bright_cyan().bold());
        println!("{}", "=".repeat(50).bright_cyan());

        match self.latest() {
            Some(snapshot) => {
                for entry in &snapshot.breakdown {
                    println!(
                        "{} - {} votes",
                        entry.name.bright_white(),
                        entry.votes.to_string().bright_yellow()
                    );
                }
                println!("{}", "-".repeat(50).bright_cyan());
                println!(
                    "{}: {} after {} ms",
                    "Total Votes".bright_white().bold(),
                    snapshot.total_votes.to_string().bright_green().bold(),
                    snapshot.elapsed_ms
                );
            }
            None => println!("{}", "No snapshots taken yet".yellow()),
        }

        println!();
    }
}

/// Take a snapshot now, log it and keep it in `collector`.
pub async fn take_snapshot(
    reporter: &TallyReporter,
    collector: &SnapshotCollector,
    started: Instant,
) -> TallySnapshot {
    let breakdown = reporter.vote_breakdown().await;
    let snapshot = TallySnapshot {
        taken_at: Utc::now(),
        elapsed_ms: started.elapsed().as_millis() as u64,
        total_votes: tabulation::total_votes(&breakdown),
        breakdown,
    };

    let counts = snapshot
        .breakdown
        .iter()
        .map(|entry| format!("{}={}", entry.name, entry.votes))
        .collect::<Vec<_>>()
        .join(" ");
    tracing::info!(total = snapshot.total_votes, elapsed_ms = snapshot.elapsed_ms, %counts, "vote count update");

    collector.record(snapshot.clone());
    snapshot
}

/// Snapshot every `interval` until `cancel` fires. The first snapshot is taken
/// immediately.
pub async fn run_tally_loop(
    reporter: TallyReporter,
    collector: SnapshotCollector,
    interval: Duration,
    cancel: CancellationToken,
) {
    let started = Instant::now();
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("tally loop stopped");
                break;
            }
            _ = ticker.tick() => {
                take_snapshot(&reporter, &collector, started).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MemoryStore, Records};
    use crate::model::election::Candidate;
    use crate::registry::EntityStore;
    use tokio::sync::Mutex as AsyncMutex;

    fn snapshot(total: u64) -> TallySnapshot {
        TallySnapshot {
            taken_at: Utc::now(),
            elapsed_ms: 0,
            total_votes: total,
            breakdown: Vec::new(),
        }
    }

    async fn reporter() -> TallyReporter {
        let mut candidate = Candidate::new("X", "P", "1", "Party", "Sym", "0", "0");
        candidate.votes = 2;
        let records = Records {
            candidates: vec![candidate],
            voters: Vec::new(),
        };
        let store = EntityStore::load(Arc::new(MemoryStore::with_records(records))).await;
        TallyReporter::new(Arc::new(AsyncMutex::new(store)))
    }

    #[test]
    fn history_is_bounded() {
        let collector = SnapshotCollector::new(2);
        collector.record(snapshot(1));
        collector.record(snapshot(2));
        collector.record(snapshot(3));

        let totals: Vec<u64> = collector.snapshots().iter().map(|s| s.total_votes).collect();
        assert_eq!(totals, vec![2, 3]);
        assert_eq!(collector.latest().unwrap().total_votes, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_snapshots_on_each_interval_until_cancelled() {
        let collector = SnapshotCollector::new(16);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_tally_loop(
            reporter().await,
            collector.clone(),
            Duration::from_secs(5),
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        cancel.cancel();
        handle.await.unwrap();

        // ticks at 0s, 5s and 10s
        let snapshots = collector.snapshots();
        assert_eq!(snapshots.len(), 3);
        assert!(snapshots.iter().all(|s| s.total_votes == 2));

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(collector.snapshots().len(), 3);
    }
}
