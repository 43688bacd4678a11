//! Non-fatal conditions attached to the item that caused them.

use std::fmt;

use cutsync_timeline::Frame;
use serde::Serialize;

/// A clone that could not be placed on the composite sequence because it
/// overlapped a clone already on the same track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollationConflict {
    pub item: String,
    pub item_in: Frame,
    pub item_out: Frame,
    pub existing: String,
    pub existing_in: Frame,
    pub existing_out: Frame,
}

impl fmt::Display for CollationConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to add shot {} ({} - {}) due to clash with collated shot {} ({} - {}); \
             likely caused by handle expansion of the hero shot",
            self.item, self.item_in, self.item_out, self.existing, self.existing_in, self.existing_out
        )
    }
}

/// Warnings surfaced on a specific item so it can be inspected and re-run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportWarning {
    /// Cut and edit lengths differ, which means the item carries a retime
    /// the Cut model cannot represent.
    RetimeMismatch {
        item: String,
        cut_duration: Frame,
        edit_duration: Frame,
    },

    /// An item was dropped from its composite sequence.
    CollationConflict(CollationConflict),

    /// Handles would have produced negative frame numbers; the first
    /// rendered frame was clamped to 0.
    NegativeStartClamped { item: String, frames: Frame },

    /// The tracking entity was resolved but its thumbnail was not refreshed.
    ThumbnailFailed { entity: String, message: String },
}

impl fmt::Display for ExportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RetimeMismatch {
                item,
                cut_duration,
                edit_duration,
            } => write!(
                f,
                "{item}: cut duration {cut_duration} differs from edit duration {edit_duration} (retimed item)"
            ),
            Self::CollationConflict(conflict) => write!(f, "{conflict}"),
            Self::NegativeStartClamped { item, frames } => write!(
                f,
                "{item}: {frames} frames of handles would give a negative frame index; first frame clamped to 0"
            ),
            Self::ThumbnailFailed { entity, message } => {
                write!(f, "thumbnail for {entity} was not refreshed: {message}")
            }
        }
    }
}
