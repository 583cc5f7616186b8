//! Quick box detection on raw content-stream bytes.
//!
//! A cheap pre-filter deciding whether a stream is worth a full rewrite.
//! Every construct the catalog removes contains `re` followed by a painting
//! operator, so the `Basic` probe alone keeps the filter free of false
//! negatives; the other probes only name what was found.

use once_cell::sync::Lazy;
use regex::bytes::Regex;

use crate::patterns::{PAINT_OP, WS};

/// Which broad probe fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    /// `re` followed by a painting operator anywhere.
    Basic,
    /// A rectangle inside a `q ... Q` block.
    Styled,
    /// A rectangle after `BT`.
    Text,
}

/// Result of scanning one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    Found(ProbeKind),
    NotFound,
    /// The probes could not be evaluated. Callers treat this as a hit.
    Unavailable,
}

impl Detection {
    /// Fail-open: only a definite `NotFound` rules a stream out.
    pub fn worth_processing(&self) -> bool {
        !matches!(self, Detection::NotFound)
    }
}

fn probe_sources() -> Vec<(ProbeKind, String)> {
    let tail = format!(r"{WS}re{WS}(?:h{WS})?(?:W\*?{WS})?(?:h|{PAINT_OP})");
    vec![
        (ProbeKind::Basic, format!("(?-u){tail}")),
        (ProbeKind::Styled, format!("(?s-u)q.*?{tail}.*?Q")),
        (ProbeKind::Text, format!("(?s-u)BT.*?{tail}")),
    ]
}

static PROBES: Lazy<Option<Vec<(ProbeKind, Regex)>>> = Lazy::new(|| {
    let mut probes = Vec::new();
    for (kind, source) in probe_sources() {
        match Regex::new(&source) {
            Ok(regex) => probes.push((kind, regex)),
            Err(e) => {
                log::warn!("Box probe {:?} failed to compile: {}", kind, e);
                return None;
            }
        }
    }
    Some(probes)
});

/// Scan raw stream bytes with the probes in order, stopping at the first hit.
pub fn scan(content: &[u8]) -> Detection {
    if content.is_empty() {
        return Detection::NotFound;
    }

    let Some(probes) = PROBES.as_ref() else {
        return Detection::Unavailable;
    };

    for (kind, regex) in probes {
        if regex.is_match(content) {
            log::debug!("Found {:?} box pattern", kind);
            return Detection::Found(*kind);
        }
    }

    log::debug!("No box patterns detected");
    Detection::NotFound
}

/// True unless the stream definitely contains no box construct.
pub fn has_boxes(content: &[u8]) -> bool {
    scan(content).worth_processing()
}
