//! Election lifecycle: Idle → Running → Ended, with a deadline timer and a
//! periodic tally loop while Running.

pub mod timer;

use crate::ballot_box::{BallotBox, VoteReceipt};
use crate::error::{ElectionError, Result};
use crate::model::election::{EndReason, VoterRef};
use crate::registry::EntityStore;
use crate::reports::monitor::run_tally_loop;
use crate::reports::{SnapshotCollector, TallyReporter, TallySnapshot, Winner};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use timer::{ElectionTasks, ScheduledTask};
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct ElectionConfig {
    /// Pause between live tally snapshots.
    pub tally_interval: Duration,
    /// Snapshots kept in memory.
    pub snapshot_history: usize,
}

impl ElectionConfig {
    /// Replace settings the tally loop cannot run with.
    fn normalized(mut self) -> Self {
        if self.tally_interval.is_zero() {
            let fallback = ElectionConfig::default().tally_interval;
            tracing::warn!(
                fallback_secs = fallback.as_secs(),
                "tally interval of zero is not usable; using the default"
            );
            self.tally_interval = fallback;
        }
        self
    }
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            tally_interval: Duration::from_secs(5),
            snapshot_history: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ElectionPhase {
    Idle,
    Running {
        duration: Duration,
        started_at: DateTime<Utc>,
    },
    Ended {
        ended_at: DateTime<Utc>,
        reason: EndReason,
    },
}

impl ElectionPhase {
    pub fn name(&self) -> &'static str {
        match self {
            ElectionPhase::Idle => "idle",
            ElectionPhase::Running { .. } => "running",
            ElectionPhase::Ended { .. } => "ended",
        }
    }
}

impl std::fmt::Display for ElectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElectionPhase::Idle => write!(f, "Election has not started."),
            ElectionPhase::Running {
                duration,
                started_at,
            } => write!(
                f,
                "Election running since {} for {} seconds.",
                started_at.format("%H:%M:%S"),
                duration.as_secs()
            ),
            ElectionPhase::Ended { ended_at, reason } => write!(
                f,
                "Election ended at {} ({}).",
                ended_at.format("%H:%M:%S"),
                reason
            ),
        }
    }
}

/// What `end()` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ending {
    Closed { reason: EndReason, winner: Winner },
    AlreadyEnded,
}

struct PhaseState {
    phase: ElectionPhase,
    /// Bumped on every start so a stale deadline cannot end a later election.
    generation: u64,
    tasks: Option<ElectionTasks>,
}

struct Inner {
    state: RwLock<PhaseState>,
    registry: Arc<Mutex<EntityStore>>,
    ballot_box: BallotBox,
    reporter: TallyReporter,
    snapshots: SnapshotCollector,
    config: ElectionConfig,
}

#[derive(Clone)]
pub struct ElectionController {
    inner: Arc<Inner>,
}

impl ElectionController {
    pub fn new(registry: Arc<Mutex<EntityStore>>, config: ElectionConfig) -> Self {
        let config = config.normalized();
        let inner = Inner {
            state: RwLock::new(PhaseState {
                phase: ElectionPhase::Idle,
                generation: 0,
                tasks: None,
            }),
            ballot_box: BallotBox::new(registry.clone()),
            reporter: TallyReporter::new(registry.clone()),
            snapshots: SnapshotCollector::new(config.snapshot_history),
            registry,
            config,
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Open the polls for `duration`. Fails with `AlreadyRunning`, leaving the
    /// current deadline untouched, if an election is in progress.
    pub async fn start(&self, duration: Duration) -> Result<()> {
        let mut state = self.inner.state.write().await;
        if let ElectionPhase::Running { .. } = state.phase {
            return Err(ElectionError::AlreadyRunning);
        }

        state.generation += 1;
        let generation = state.generation;
        let cancel = CancellationToken::new();
        self.inner.snapshots.clear();

        let tally_loop = ScheduledTask::spawn(
            "tally-loop",
            cancel.clone(),
            run_tally_loop(
                self.inner.reporter.clone(),
                self.inner.snapshots.clone(),
                self.inner.config.tally_interval,
                cancel.clone(),
            ),
        );

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let deadline = ScheduledTask::once("deadline", duration, cancel, async move {
            if let Some(inner) = weak.upgrade() {
                let controller = ElectionController { inner };
                if let Err(e) = controller.finish(EndReason::Deadline, Some(generation)).await {
                    tracing::warn!(error = %e, "deadline could not end the election");
                }
            }
        });

        state.tasks = Some(ElectionTasks {
            deadline,
            tally_loop,
        });
        state.phase = ElectionPhase::Running {
            duration,
            started_at: Utc::now(),
        };

        tracing::info!(duration_secs = duration.as_secs(), generation, "election started");
        Ok(())
    }

    /// Close the polls early. A no-op once the election has ended.
    pub async fn end(&self) -> Result<Ending> {
        self.finish(EndReason::Manual, None).await
    }

    async fn finish(&self, reason: EndReason, generation: Option<u64>) -> Result<Ending> {
        let mut state = self.inner.state.write().await;
        match state.phase {
            ElectionPhase::Running { .. } => {}
            ElectionPhase::Ended { .. } => return Ok(Ending::AlreadyEnded),
            ElectionPhase::Idle => return Err(ElectionError::NotRunning),
        }
        if generation.map_or(false, |g| g != state.generation) {
            return Ok(Ending::AlreadyEnded);
        }

        if let Some(tasks) = state.tasks.take() {
            tasks.cancel();
        }

        let winner = self.inner.reporter.winner().await;
        self.inner.registry.lock().await.persist().await;

        state.phase = ElectionPhase::Ended {
            ended_at: Utc::now(),
            reason,
        };

        match &winner {
            Winner::Decided { name, votes, .. } => {
                tracing::info!(%reason, winner = %name, votes, "election ended")
            }
            _ => tracing::info!(%reason, "election ended with no winner"),
        }

        Ok(Ending::Closed { reason, winner })
    }

    /// Admit a vote. The phase stays read-locked for the whole cast so `end()`
    /// waits for in-flight votes.
    ///
    /// Outside the voting window a voter who already voted is told so rather
    /// than that the polls are closed.
    pub async fn cast_vote(&self, voter: &VoterRef, candidate_name: &str) -> Result<VoteReceipt> {
        let state = self.inner.state.read().await;
        if !matches!(state.phase, ElectionPhase::Running { .. }) {
            let registry = self.inner.registry.lock().await;
            return match registry.find_voter(&voter.name, &voter.id) {
                Some(v) if v.has_voted => Err(ElectionError::AlreadyVoted(voter.to_string())),
                _ => Err(ElectionError::NotRunning),
            };
        }

        self.inner.ballot_box.cast_vote(voter, candidate_name).await
    }

    pub async fn phase(&self) -> ElectionPhase {
        self.inner.state.read().await.phase.clone()
    }

    pub async fn is_running(&self) -> bool {
        matches!(self.phase().await, ElectionPhase::Running { .. })
    }

    pub async fn is_ended(&self) -> bool {
        matches!(self.phase().await, ElectionPhase::Ended { .. })
    }

    /// Time left before the deadline, if running.
    pub async fn remaining(&self) -> Option<Duration> {
        match self.phase().await {
            ElectionPhase::Running {
                duration,
                started_at,
            } => {
                let elapsed = (Utc::now() - started_at).to_std().unwrap_or_default();
                Some(duration.saturating_sub(elapsed))
            }
            _ => None,
        }
    }

    pub fn reporter(&self) -> &TallyReporter {
        &self.inner.reporter
    }

    pub fn snapshots(&self) -> Vec<TallySnapshot> {
        self.inner.snapshots.snapshots()
    }

    pub fn snapshot_collector(&self) -> &SnapshotCollector {
        &self.inner.snapshots
    }
}

/// Parse a duration in whole seconds, as typed by an operator.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let seconds: u64 = input.trim().parse().map_err(|_| {
        ElectionError::Validation(format!(
            "election duration must be a whole number of seconds, got '{}'",
            input.trim()
        ))
    })?;
    if seconds == 0 {
        return Err(ElectionError::Validation(
            "election duration must be at least one second".to_string(),
        ));
    }

    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MemoryStore, Records};
    use crate::model::election::{Candidate, Voter};

    async fn controller() -> (Arc<MemoryStore>, ElectionController) {
        controller_with(ElectionConfig::default()).await
    }

    async fn controller_with(config: ElectionConfig) -> (Arc<MemoryStore>, ElectionController) {
        let records = Records {
            candidates: vec![
                Candidate::new("X", "A", "1", "P", "S", "0", "0"),
                Candidate::new("Y", "B", "2", "Q", "T", "0", "0"),
            ],
            voters: vec![Voter::new("V", "9"), Voter::new("W", "10")],
        };
        let memory = Arc::new(MemoryStore::with_records(records));
        let registry = EntityStore::load(memory.clone()).await;
        let controller = ElectionController::new(Arc::new(Mutex::new(registry)), config);
        (memory, controller)
    }

    #[test]
    fn parse_duration_rejects_non_numeric_input() {
        assert_eq!(parse_duration(" 30 ").unwrap(), Duration::from_secs(30));
        assert!(matches!(parse_duration("ten"), Err(ElectionError::Validation(_))));
        assert!(matches!(parse_duration("-5"), Err(ElectionError::Validation(_))));
        assert!(matches!(parse_duration("0"), Err(ElectionError::Validation(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn votes_only_accepted_while_running() {
        let (_memory, controller) = controller().await;
        let voter = VoterRef::new("V", "9");

        let err = controller.cast_vote(&voter, "X").await.unwrap_err();
        assert!(matches!(err, ElectionError::NotRunning));

        controller.start(Duration::from_secs(60)).await.unwrap();
        controller.cast_vote(&voter, "X").await.unwrap();
        controller.end().await.unwrap();

        let err = controller
            .cast_vote(&VoterRef::new("W", "10"), "X")
            .await
            .unwrap_err();
        assert!(matches!(err, ElectionError::NotRunning));
        let err = controller.cast_vote(&voter, "X").await.unwrap_err();
        assert!(matches!(err, ElectionError::AlreadyVoted(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn start_while_running_keeps_original_deadline() {
        let (_memory, controller) = controller().await;
        controller.start(Duration::from_secs(10)).await.unwrap();
        let before = controller.phase().await;

        let err = controller.start(Duration::from_secs(1000)).await.unwrap_err();
        assert!(matches!(err, ElectionError::AlreadyRunning));
        assert_eq!(controller.phase().await, before);

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(controller.is_ended().await);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_ends_election_and_persists() {
        let (memory, controller) = controller().await;
        controller.start(Duration::from_secs(3)).await.unwrap();
        controller.cast_vote(&VoterRef::new("V", "9"), "Y").await.unwrap();
        let saves_before = memory.save_count();

        tokio::time::sleep(Duration::from_secs(4)).await;

        match controller.phase().await {
            ElectionPhase::Ended { reason, .. } => assert_eq!(reason, EndReason::Deadline),
            other => panic!("unexpected phase {:?}", other),
        }
        assert!(memory.save_count() > saves_before);
        assert_eq!(controller.end().await.unwrap(), Ending::AlreadyEnded);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_end_cancels_deadline() {
        let (_memory, controller) = controller().await;
        controller.start(Duration::from_secs(5)).await.unwrap();

        match controller.end().await.unwrap() {
            Ending::Closed { reason, winner } => {
                assert_eq!(reason, EndReason::Manual);
                assert_eq!(winner, Winner::NotStarted);
            }
            other => panic!("unexpected ending {:?}", other),
        }

        // a restarted election must not be closed by the first deadline
        controller.start(Duration::from_secs(60)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(controller.is_running().await);
        assert_eq!(controller.remaining().await.map(|d| d <= Duration::from_secs(60)), Some(true));
    }

    #[tokio::test]
    async fn end_before_start_is_not_running() {
        let (_memory, controller) = controller().await;
        assert!(matches!(controller.end().await, Err(ElectionError::NotRunning)));
    }

    #[tokio::test(start_paused = true)]
    async fn tally_loop_runs_only_while_running() {
        let (_memory, controller) = controller().await;
        controller.start(Duration::from_secs(12)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(20)).await;
        // 0s, 5s and 10s; the deadline at 12s stops the loop
        assert_eq!(controller.snapshots().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_a_running_controller_stops_the_tally_loop() {
        let (_memory, controller) = controller().await;
        let registry = controller.inner.registry.clone();
        let collector = controller.snapshot_collector().clone();
        controller.start(Duration::from_secs(10)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        drop(controller);
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(collector.snapshots().len(), 1);
        assert_eq!(Arc::strong_count(&registry), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_tally_interval_falls_back_to_default() {
        let config = ElectionConfig {
            tally_interval: Duration::ZERO,
            ..ElectionConfig::default()
        };
        let (_memory, controller) = controller_with(config).await;
        controller.start(Duration::from_secs(30)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(11)).await;
        // 0s, 5s and 10s
        assert_eq!(controller.snapshots().len(), 3);
        controller.end().await.unwrap();
    }
}
