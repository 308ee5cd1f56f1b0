//! Configuration for the sync engine.

use std::collections::HashMap;

/// How a table's pull phase treats remote rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullPolicy {
    /// Upsert remote rows locally.
    Merge,
    /// Upsert remote rows and drop synced local rows the remote lacks.
    ReplaceAll,
    /// Do not pull; only push local changes.
    PushOnly,
}

/// Tables that are append-style logs and are not pulled by default.
const PUSH_ONLY_TABLES: [&str; 3] = ["transactions", "loan_entries", "planned_payments"];

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Keep a journaled tombstone for deletes that did not reach the
    /// remote and retry them on the next run.
    pub track_remote_deletes: bool,
    /// Maximum rows per upsert call. `None` pushes everything in one call.
    pub push_batch_size: Option<usize>,
    /// Start a background run after every local add or update.
    pub auto_sync: bool,
    pull_policies: HashMap<String, PullPolicy>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            track_remote_deletes: false,
            push_batch_size: None,
            auto_sync: true,
            pull_policies: HashMap::new(),
        }
    }
}

impl SyncConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables pending remote delete tracking.
    pub fn with_track_remote_deletes(mut self, enabled: bool) -> Self {
        self.track_remote_deletes = enabled;
        self
    }

    /// Splits pushes into calls of at most `size` rows.
    pub fn with_push_batch_size(mut self, size: usize) -> Self {
        self.push_batch_size = Some(size.max(1));
        self
    }

    /// Enables or disables background runs after local writes.
    pub fn with_auto_sync(mut self, enabled: bool) -> Self {
        self.auto_sync = enabled;
        self
    }

    /// Overrides the pull policy of one table.
    pub fn with_pull_policy(mut self, table: impl Into<String>, policy: PullPolicy) -> Self {
        self.pull_policies.insert(table.into(), policy);
        self
    }

    /// Returns the pull policy of `table`.
    pub fn pull_policy(&self, table: &str) -> PullPolicy {
        match self.pull_policies.get(table) {
            Some(policy) => *policy,
            None if PUSH_ONLY_TABLES.contains(&table) => PullPolicy::PushOnly,
            None => PullPolicy::Merge,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policies() {
        let config = SyncConfig::default();
        assert_eq!(config.pull_policy("wallets"), PullPolicy::Merge);
        assert_eq!(config.pull_policy("users"), PullPolicy::Merge);
        assert_eq!(config.pull_policy("transactions"), PullPolicy::PushOnly);
        assert_eq!(config.pull_policy("planned_payments"), PullPolicy::PushOnly);
        assert!(!config.track_remote_deletes);
        assert!(config.auto_sync);
    }

    #[test]
    fn builder_overrides() {
        let config = SyncConfig::new()
            .with_pull_policy("transactions", PullPolicy::Merge)
            .with_pull_policy("goals", PullPolicy::ReplaceAll)
            .with_push_batch_size(0)
            .with_track_remote_deletes(true);
        assert_eq!(config.pull_policy("transactions"), PullPolicy::Merge);
        assert_eq!(config.pull_policy("goals"), PullPolicy::ReplaceAll);
        assert_eq!(config.push_batch_size, Some(1));
        assert!(config.track_remote_deletes);
    }
}
