//! Per-run state: the visited set and the statistics.
//!
//! A context is created at the start of a document run and dropped at its
//! end; starting a new run means constructing a new context.

use std::collections::HashSet;

use eraser_core::stats::EraseStats;

use crate::identity::{Namespace, ObjectKey, VisitKey};
use crate::walker::VisitOutcome;

/// One recorded decision about a resource, form or content stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitEvent {
    pub namespace: Namespace,
    pub key: ObjectKey,
    pub outcome: VisitOutcome,
}

#[derive(Debug, Default)]
pub struct EraseContext {
    visited: HashSet<VisitKey>,
    events: Option<Vec<VisitEvent>>,
    pub stats: EraseStats,
}

impl EraseContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that also keeps every visit decision, for inspection.
    pub fn with_event_log() -> Self {
        Self {
            events: Some(Vec::new()),
            ..Self::default()
        }
    }

    /// Record a visit. Returns `false` if `key` was already visited in
    /// `namespace` during this run.
    pub fn mark_visited(&mut self, namespace: Namespace, key: ObjectKey) -> bool {
        self.visited.insert((namespace, key))
    }

    pub fn is_visited(&self, namespace: Namespace, key: ObjectKey) -> bool {
        self.visited.contains(&(namespace, key))
    }

    /// Number of distinct (namespace, object) pairs visited so far.
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Append to the event log. No-op unless built with [`Self::with_event_log`].
    pub fn record(&mut self, namespace: Namespace, key: ObjectKey, outcome: VisitOutcome) {
        if let Some(events) = self.events.as_mut() {
            events.push(VisitEvent {
                namespace,
                key,
                outcome,
            });
        }
    }

    pub fn events(&self) -> &[VisitEvent] {
        self.events.as_deref().unwrap_or(&[])
    }
}
