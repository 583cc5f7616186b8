//! Shared types for the PDF box eraser: errors, options, page ranges and statistics.

pub mod error;
pub mod options;
pub mod range;
pub mod stats;
