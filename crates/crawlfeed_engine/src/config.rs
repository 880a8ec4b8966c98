//! Configuration for the traversal driver.

/// Configuration for driver runs.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Upper bound on batches in [`crate::TraversalDriver::run_to_completion`].
    /// `None` runs until the repository has nothing new.
    pub max_batches: Option<usize>,
    /// Persist the checkpoint after every event, or only at the end of a batch.
    pub persist_every_event: bool,
}

impl DriverConfig {
    /// Creates a new driver configuration.
    pub fn new() -> Self {
        Self {
            max_batches: None,
            persist_every_event: true,
        }
    }

    /// Caps the number of batches per run.
    pub fn with_max_batches(mut self, max_batches: usize) -> Self {
        self.max_batches = Some(max_batches);
        self
    }

    /// Sets whether the checkpoint is persisted after every event.
    pub fn with_persist_every_event(mut self, enabled: bool) -> Self {
        self.persist_every_event = enabled;
        self
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self::new()
    }
}
