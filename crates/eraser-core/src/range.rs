//! 1-based inclusive page ranges.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EraseError, Result};

/// A 1-based inclusive page range. Always satisfies `1 <= start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    start: u32,
    end: u32,
}

impl PageRange {
    /// Clamp a requested range into `[1, total_pages]`.
    ///
    /// A missing start means page 1, a missing end means the last page.
    /// Out-of-range bounds are clamped rather than rejected; the end is never
    /// allowed below the clamped start. Fails only for an empty document.
    pub fn clamp(start: Option<i64>, end: Option<i64>, total_pages: u32) -> Result<Self> {
        if total_pages == 0 {
            return Err(EraseError::PageRange(
                "document has no pages".to_string(),
            ));
        }

        let total = i64::from(total_pages);
        let start = start.map_or(1, |s| s.clamp(1, total));
        let end = end.map_or(total, |e| e.clamp(start, total));

        Ok(Self {
            start: start as u32,
            end: end as u32,
        })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    /// Number of pages in the range.
    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }

    /// Fraction of the range completed once `page` has been handled.
    pub fn fraction_after(&self, page: u32) -> f64 {
        let done = page.saturating_sub(self.start) + 1;
        (f64::from(done) / f64::from(self.len())).min(1.0)
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
