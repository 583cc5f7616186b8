//! Per-run counters surfaced to progress callbacks and the final report.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Cumulative statistics for one document-processing run.
///
/// Created fresh at the start of every run and only mutated by the walker
/// and the content rewriter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EraseStats {
    pub pages_processed: u64,
    pub pages_skipped: u64,
    pub boxes_removed: u64,
    pub objects_processed: u64,
    pub quick_matches: u64,
}

impl EraseStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pages that reached a terminal state (processed or skipped).
    pub fn pages_seen(&self) -> u64 {
        self.pages_processed + self.pages_skipped
    }
}

impl fmt::Display for EraseStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pages processed: {}, pages skipped: {}, boxes removed: {}, objects processed: {}, quick matches: {}",
            self.pages_processed,
            self.pages_skipped,
            self.boxes_removed,
            self.objects_processed,
            self.quick_matches
        )
    }
}

/// Progress reporter callback: `(fraction_complete, stats_snapshot)`.
///
/// Invoked synchronously after every page; a slow callback stalls the run.
pub type ProgressReporter = Box<dyn Fn(f64, &EraseStats) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats_are_zero() {
        let stats = EraseStats::new();
        assert_eq!(stats.pages_processed, 0);
        assert_eq!(stats.boxes_removed, 0);
        assert_eq!(stats.pages_seen(), 0);
    }

    #[test]
    fn test_pages_seen() {
        let stats = EraseStats {
            pages_processed: 3,
            pages_skipped: 2,
            ..Default::default()
        };
        assert_eq!(stats.pages_seen(), 5);
    }

    #[test]
    fn test_display_lists_all_counters() {
        let stats = EraseStats {
            pages_processed: 1,
            pages_skipped: 2,
            boxes_removed: 3,
            objects_processed: 4,
            quick_matches: 5,
        };
        let text = stats.to_string();
        assert!(text.contains("boxes removed: 3"));
        assert!(text.contains("quick matches: 5"));
    }

    #[test]
    fn test_stats_serialize_field_names() {
        let json = serde_json::to_string(&EraseStats::new()).unwrap();
        assert!(json.contains("\"pages_processed\":0"));
        assert!(json.contains("\"quick_matches\":0"));
    }
}
