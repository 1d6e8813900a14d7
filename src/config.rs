use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a queue handle.
///
/// Every process that shares the same `root` cooperates on the same queue;
/// the remaining settings only affect how this process behaves.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Root of the shared queue directory tree.
    pub root: PathBuf,
    /// How many times a worker re-lists and retries after losing a claim race.
    pub claim_retries: u32,
    /// How many times a status transition re-locates a record that moved
    /// underneath it before giving up.
    pub relocate_retries: u32,
    /// Interval between dequeue attempts while waiting for work.
    pub poll_interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("queue"),
            claim_retries: 8,
            relocate_retries: 3,
            poll_interval_ms: 5_000,
        }
    }
}

impl QueueConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    pub fn with_claim_retries(mut self, retries: u32) -> Self {
        self.claim_retries = retries.max(1);
        self
    }

    pub fn with_poll_interval_ms(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_config_default() {
        let cfg = QueueConfig::default();
        assert_eq!(cfg.root, PathBuf::from("queue"));
        assert_eq!(cfg.claim_retries, 8);
        assert_eq!(cfg.relocate_retries, 3);
        assert_eq!(cfg.poll_interval_ms, 5_000);
    }

    #[test]
    fn queue_config_new_keeps_defaults() {
        let cfg = QueueConfig::new("/mnt/farm/queue");
        assert_eq!(cfg.root, PathBuf::from("/mnt/farm/queue"));
        assert_eq!(cfg.claim_retries, 8);
    }

    #[test]
    fn claim_retries_never_zero() {
        let cfg = QueueConfig::default().with_claim_retries(0);
        assert_eq!(cfg.claim_retries, 1);
    }

    #[test]
    fn poll_interval_never_zero() {
        let cfg = QueueConfig::default().with_poll_interval_ms(0);
        assert_eq!(cfg.poll_interval(), Duration::from_millis(1));
    }
}
