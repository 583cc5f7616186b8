//! Box eraser for PDF content streams.
//!
//! Removes rectangle drawing constructs (borders, filled boxes, clipping
//! rectangles) from page and Form XObject content streams while keeping
//! text, images and other vector content.

pub mod context;
pub mod detect;
pub mod identity;
pub mod patterns;
pub mod processor;
pub mod render;
pub mod rewrite;
pub mod walker;

pub use context::EraseContext;
pub use detect::{has_boxes, Detection};
pub use processor::{open_pdf, page_count, BoxEraser, EraseReport, PageReport, ProcessedFile};
pub use rewrite::{remove_boxes, rewrite};
pub use walker::{PageOutcome, StreamOutcome, VisitOutcome, Walker};
