//! Tracker configuration.

/// Behaviour switches for a [`TreeChangeEvent`](crate::TreeChangeEvent).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Drop the removal of a leaf when an adjacent leaf with the same text was inserted in the
    /// same transaction (and drop that insertion too).
    pub coalesce_leaves: bool,
    /// Re-check the event's structural invariants after every recorded change.
    ///
    /// Defaults to `true` in debug builds.
    pub verify_invariants: bool,
}

impl TrackerConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self {
            coalesce_leaves: true,
            verify_invariants: cfg!(debug_assertions),
        }
    }

    /// Enable or disable leaf coalescing.
    pub fn with_leaf_coalescing(mut self, enabled: bool) -> Self {
        self.coalesce_leaves = enabled;
        self
    }

    /// Enable or disable invariant checks after every change.
    pub fn with_invariant_checks(mut self, enabled: bool) -> Self {
        self.verify_invariants = enabled;
        self
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::new()
    }
}
