//! Errors raised by the timeline model.

use std::path::PathBuf;

use crate::item::Frame;

/// Errors that can occur when working with timelines.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Placing an item would overlap an item already on the track.
    #[error("Item '{item}' ({item_in} - {item_out}) clashes with '{existing}' ({existing_in} - {existing_out})")]
    ItemClash {
        item: String,
        item_in: Frame,
        item_out: Frame,
        existing: String,
        existing_in: Frame,
        existing_out: Frame,
    },
}
