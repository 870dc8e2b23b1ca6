//! Configuration for the history system.

/// Maximum number of undo states kept per document.
/// The oldest state is evicted when this limit is exceeded.
pub const DEFAULT_MAX_ENTRIES: usize = 50;

/// Configuration for the history system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Max undo states per document. Values below 1 are treated as 1.
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl HistoryConfig {
    /// Creates a config with the given capacity.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
        }
    }

    /// Effective capacity, never zero.
    pub fn capacity(&self) -> usize {
        self.max_entries.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HistoryConfig::default();
        assert_eq!(config.max_entries, 50);
        assert_eq!(config.capacity(), 50);
    }

    #[test]
    fn test_with_max_entries_clamps_zero() {
        assert_eq!(HistoryConfig::with_max_entries(0).max_entries, 1);
        assert_eq!(HistoryConfig::with_max_entries(7).max_entries, 7);
    }

    #[test]
    fn test_capacity_never_zero() {
        let config = HistoryConfig { max_entries: 0 };
        assert_eq!(config.capacity(), 1);
    }
}
