//! Traversal driver: pulls events, hands them to a sink, persists checkpoints.

use crate::config::DriverConfig;
use crate::error::{DriverError, DriverResult};
use crate::store::{CheckpointStore, DocumentSink};
use crate::traverser::Traverser;
use crawlfeed_core::{Checkpoint, DocumentSequence};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// The current state of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Not running.
    Idle,
    /// A batch is in progress.
    Running,
    /// The last run finished.
    Completed,
    /// The last run stopped on an error.
    Failed,
}

impl DriverState {
    /// Returns true if a new run may start.
    pub fn can_start(&self) -> bool {
        !matches!(self, DriverState::Running)
    }
}

/// Cumulative statistics across runs.
#[derive(Debug, Clone, Default)]
pub struct DriverStats {
    /// Batches processed.
    pub batches: u64,
    /// Events accepted by the sink.
    pub delivered: u64,
    /// Records skipped by the traversal.
    pub skipped: u64,
    /// Items that failed in the traversal or in the sink.
    pub failed: u64,
    /// Checkpoint writes.
    pub checkpoints_saved: u64,
    /// When the last batch finished.
    pub last_batch_time: Option<Instant>,
    /// Last fatal error message.
    pub last_error: Option<String>,
}

/// Result of one batch.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Whether the traverser found anything after the checkpoint.
    pub found_changes: bool,
    /// Events accepted by the sink.
    pub delivered: u64,
    /// Records skipped by the traversal.
    pub skipped: u64,
    /// Items that failed in the traversal or in the sink.
    pub failed: u64,
    /// Serialized checkpoint at the start of the batch.
    pub start_checkpoint: String,
    /// Serialized checkpoint at the end of the batch.
    pub checkpoint: String,
    /// Duration of the batch.
    pub duration: Duration,
}

impl BatchOutcome {
    /// Returns true if the batch moved the checkpoint.
    pub fn made_progress(&self) -> bool {
        self.checkpoint != self.start_checkpoint
    }
}

/// Why [`TraversalDriver::run_to_completion`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The traverser found nothing after the checkpoint.
    Exhausted,
    /// A batch ended without moving the checkpoint.
    NoProgress,
    /// The configured batch limit was reached.
    BatchLimit,
}

/// Result of a multi-batch run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Batches processed.
    pub batches: u64,
    /// Events accepted by the sink.
    pub delivered: u64,
    /// Records skipped by the traversal.
    pub skipped: u64,
    /// Items that failed in the traversal or in the sink.
    pub failed: u64,
    /// Final serialized checkpoint.
    pub checkpoint: String,
    /// Why the run stopped.
    pub stop_reason: StopReason,
    /// Duration of the run.
    pub duration: Duration,
}

/// Drives a [`Traverser`] against a checkpoint store and a document sink.
///
/// Each batch loads the persisted checkpoint, asks the traverser for the
/// next document list, delivers its events one by one and persists the
/// checkpoint after each of them. Stopping at any point loses no progress
/// that was already persisted.
pub struct TraversalDriver<T: Traverser> {
    traverser: T,
    config: DriverConfig,
    state: RwLock<DriverState>,
    stats: RwLock<DriverStats>,
    cancelled: AtomicBool,
}

impl<T: Traverser> TraversalDriver<T> {
    /// Creates a new driver.
    pub fn new(traverser: T, config: DriverConfig) -> Self {
        Self {
            traverser,
            config,
            state: RwLock::new(DriverState::Idle),
            stats: RwLock::new(DriverStats::default()),
            cancelled: AtomicBool::new(false),
        }
    }

    /// The wrapped traverser.
    pub fn traverser(&self) -> &T {
        &self.traverser
    }

    /// Gets the current state.
    pub fn state(&self) -> DriverState {
        *self.state.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> DriverStats {
        self.stats.read().clone()
    }

    /// Stops the current run after the event in progress.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Resets the cancelled flag.
    pub fn reset_cancel(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    fn check_cancelled(&self) -> DriverResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(DriverError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn set_state(&self, state: DriverState) {
        *self.state.write() = state;
    }

    fn begin(&self) -> DriverResult<()> {
        let mut state = self.state.write();
        if !state.can_start() {
            return Err(DriverError::InvalidStateTransition {
                from: format!("{:?}", *state),
                to: "run".into(),
            });
        }
        *state = DriverState::Running;
        Ok(())
    }

    fn finish<R>(&self, result: DriverResult<R>) -> DriverResult<R> {
        match &result {
            Ok(_) => self.set_state(DriverState::Completed),
            Err(e) => {
                self.set_state(DriverState::Failed);
                self.stats.write().last_error = Some(e.to_string());
            }
        }
        result
    }

    /// Processes one batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored checkpoint is malformed, the traversal
    /// hits a fatal error, the checkpoint cannot be saved, or the run is
    /// cancelled. Progress made before the error is already persisted.
    pub fn run_batch(
        &self,
        store: &dyn CheckpointStore,
        sink: &dyn DocumentSink,
    ) -> DriverResult<BatchOutcome> {
        self.begin()?;
        self.reset_cancel();
        let result = self.batch(store, sink);
        self.finish(result)
    }

    /// Processes batches until the traverser has nothing new.
    ///
    /// # Errors
    ///
    /// Returns the first error of any batch; see [`Self::run_batch`].
    pub fn run_to_completion(
        &self,
        store: &dyn CheckpointStore,
        sink: &dyn DocumentSink,
    ) -> DriverResult<RunSummary> {
        self.begin()?;
        self.reset_cancel();
        let result = self.run_batches(store, sink);
        self.finish(result)
    }

    fn run_batches(
        &self,
        store: &dyn CheckpointStore,
        sink: &dyn DocumentSink,
    ) -> DriverResult<RunSummary> {
        let start = Instant::now();
        let mut summary = RunSummary {
            batches: 0,
            delivered: 0,
            skipped: 0,
            failed: 0,
            checkpoint: String::new(),
            stop_reason: StopReason::Exhausted,
            duration: Duration::ZERO,
        };

        loop {
            if let Some(max) = self.config.max_batches {
                if summary.batches >= max as u64 {
                    summary.stop_reason = StopReason::BatchLimit;
                    break;
                }
            }

            let outcome = self.batch(store, sink)?;
            summary.checkpoint = outcome.checkpoint.clone();
            if !outcome.found_changes {
                summary.stop_reason = StopReason::Exhausted;
                break;
            }

            summary.batches += 1;
            summary.delivered += outcome.delivered;
            summary.skipped += outcome.skipped;
            summary.failed += outcome.failed;

            if !outcome.made_progress() {
                warn!(
                    traverser = self.traverser.name(),
                    "batch did not advance the checkpoint, stopping"
                );
                summary.stop_reason = StopReason::NoProgress;
                break;
            }
        }

        summary.duration = start.elapsed();
        info!(
            traverser = self.traverser.name(),
            batches = summary.batches,
            delivered = summary.delivered,
            skipped = summary.skipped,
            failed = summary.failed,
            "traversal run finished: {:?}",
            summary.stop_reason
        );
        Ok(summary)
    }

    fn load_checkpoint(&self, store: &dyn CheckpointStore) -> DriverResult<Checkpoint> {
        match store.load()? {
            Some(stored) => Ok(Checkpoint::parse(&stored)?),
            None => {
                debug!(traverser = self.traverser.name(), "no stored checkpoint, starting fresh");
                Ok(Checkpoint::new())
            }
        }
    }

    fn batch(
        &self,
        store: &dyn CheckpointStore,
        sink: &dyn DocumentSink,
    ) -> DriverResult<BatchOutcome> {
        let start = Instant::now();
        let checkpoint = self.load_checkpoint(store)?;
        let start_checkpoint = checkpoint.serialize();

        let mut outcome = BatchOutcome {
            found_changes: false,
            delivered: 0,
            skipped: 0,
            failed: 0,
            checkpoint: start_checkpoint.clone(),
            start_checkpoint,
            duration: Duration::ZERO,
        };

        let Some(mut list) = self.traverser.get_document_list(&checkpoint)? else {
            outcome.duration = start.elapsed();
            return Ok(outcome);
        };
        outcome.found_changes = true;

        let mut saver = Saver {
            store,
            last: outcome.start_checkpoint.clone(),
            saves: 0,
        };

        let result = self.pump(&mut list, sink, &mut saver, &mut outcome);
        // Whatever happened, the checkpoint reflects only completed events.
        let final_save = saver.save(list.checkpoint());
        {
            let mut stats = self.stats.write();
            stats.batches += 1;
            stats.delivered += outcome.delivered;
            stats.skipped += outcome.skipped;
            stats.failed += outcome.failed;
            stats.checkpoints_saved += saver.saves;
            stats.last_batch_time = Some(Instant::now());
        }
        result?;
        final_save?;

        outcome.checkpoint = saver.last;
        outcome.duration = start.elapsed();
        info!(
            traverser = self.traverser.name(),
            delivered = outcome.delivered,
            skipped = outcome.skipped,
            failed = outcome.failed,
            "batch finished"
        );
        Ok(outcome)
    }

    fn pump(
        &self,
        list: &mut T::List,
        sink: &dyn DocumentSink,
        saver: &mut Saver<'_>,
        outcome: &mut BatchOutcome,
    ) -> DriverResult<()> {
        loop {
            self.check_cancelled()?;

            match list.next_document() {
                Ok(Some(event)) => match sink.deliver(&event) {
                    Ok(()) => {
                        outcome.delivered += 1;
                        debug!(kind = event.label(), id = %event.doc_id(), "delivered");
                    }
                    Err(e) => {
                        outcome.failed += 1;
                        warn!(kind = event.label(), id = %event.doc_id(), "delivery failed: {e}");
                    }
                },
                Ok(None) => return Ok(()),
                Err(e) if e.is_skipped() => {
                    outcome.skipped += 1;
                    debug!("{e}");
                }
                Err(e) if e.is_per_item() => {
                    outcome.failed += 1;
                    warn!("{e}");
                }
                Err(e) => return Err(e.into()),
            }

            if self.config.persist_every_event {
                saver.save(list.checkpoint())?;
            }
        }
    }
}

/// Writes the checkpoint only when it changed.
struct Saver<'a> {
    store: &'a dyn CheckpointStore,
    last: String,
    saves: u64,
}

impl Saver<'_> {
    fn save(&mut self, checkpoint: String) -> DriverResult<()> {
        if checkpoint == self.last {
            return Ok(());
        }
        self.store.save(&checkpoint)?;
        self.last = checkpoint;
        self.saves += 1;
        Ok(())
    }
}
