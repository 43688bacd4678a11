//! Timeline documents: a sequence plus the items selected for export.
//!
//! The host application exports its edit as a JSON document so the cut
//! engine can run outside the host session.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TimelineError;
use crate::item::ItemId;
use crate::sequence::Sequence;

/// Top-level timeline file (`timeline.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineDocument {
    /// Schema version.
    pub version: String,

    pub sequence: Sequence,

    /// Items selected for export. Empty means every enabled video item.
    #[serde(default)]
    pub export_items: Vec<ItemId>,
}

impl TimelineDocument {
    pub fn new(sequence: Sequence) -> Self {
        Self {
            version: "1.0".to_string(),
            sequence,
            export_items: vec![],
        }
    }

    /// Load a document and restore per-track ordering.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TimelineError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| TimelineError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut document: Self =
            serde_json::from_str(&json).map_err(|e| TimelineError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;
        document.sequence.normalize();
        Ok(document)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TimelineError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|e| TimelineError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| TimelineError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// The items an export run should process, in track/time order.
    pub fn items_to_export(&self) -> Vec<ItemId> {
        if !self.export_items.is_empty() {
            return self.export_items.clone();
        }
        self.sequence
            .video_items()
            .into_iter()
            .filter(|r| r.item.enabled)
            .map(|r| r.item.id)
            .collect()
    }

    /// Check structural consistency. Returns a list of human-readable
    /// issues; an empty list means the document is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = vec![];
        let mut ids = HashSet::new();

        if !self.sequence.frame_rate.is_valid() {
            errors.push(format!(
                "Sequence '{}' has invalid frame rate {}/{}",
                self.sequence.name,
                self.sequence.frame_rate.numerator,
                self.sequence.frame_rate.denominator
            ));
        }

        for track in &self.sequence.tracks {
            for item in &track.items {
                if !ids.insert(item.id) {
                    errors.push(format!("Duplicate item id {} ('{}')", item.id, item.name));
                }
                if item.timeline_out < item.timeline_in {
                    errors.push(format!(
                        "Item '{}' ends before it starts on the timeline ({} - {})",
                        item.name, item.timeline_in, item.timeline_out
                    ));
                }
                if item.source_out < item.source_in {
                    errors.push(format!(
                        "Item '{}' ends before it starts in its source ({} - {})",
                        item.name, item.source_in, item.source_out
                    ));
                }
                if item.handle_in_length < 0 || item.handle_out_length < 0 {
                    errors.push(format!("Item '{}' has negative available handles", item.name));
                }
                if item.playback_speed == 0.0 {
                    errors.push(format!("Item '{}' has zero playback speed", item.name));
                }
            }

            for pair in track.items.windows(2) {
                if pair[0].overlaps(&pair[1]) {
                    errors.push(format!(
                        "Items '{}' and '{}' overlap on track '{}'",
                        pair[0].name, pair[1].name, track.name
                    ));
                }
            }
        }

        for track in &self.sequence.tracks {
            for item in &track.items {
                for linked in &item.linked {
                    if !ids.contains(linked) {
                        errors.push(format!(
                            "Item '{}' links to missing item {}",
                            item.name, linked
                        ));
                    }
                }
            }
        }

        for id in &self.export_items {
            if !ids.contains(id) {
                errors.push(format!("Export item {id} is not in the sequence"));
            }
        }

        errors
    }
}
