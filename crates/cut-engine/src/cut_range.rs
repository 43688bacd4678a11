//! Cut range calculation.
//!
//! Every exported item gets one [`CutRangeRecord`] describing three frame
//! spaces:
//!
//! - **head/tail:** the window of the rendered media, handles included
//! - **cut:** the part of that window used by the edit
//! - **edit:** where the item sits in the record timecode of the sequence
//!
//! Non-collated items are computed from their own source range. Collated
//! members all share the record of their group's composite, un-shifted back
//! to natural output frames.

use cutsync_common::{CutsyncError, CutsyncResult, ExportSettings};
use cutsync_timeline::{Frame, ItemId, Sequence, TrackItem};
use serde::{Deserialize, Serialize};

use crate::composite::CompositeSequence;
use crate::warning::ExportWarning;

/// Frame ranges computed for one item of one export run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutRangeRecord {
    pub item: ItemId,

    /// Hero of the item's collation group, if collated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_hero: Option<ItemId>,

    pub head_in: Frame,
    pub tail_out: Frame,
    pub cut_in: Frame,
    pub cut_out: Frame,
    pub cut_duration: Frame,
    pub edit_in: Frame,
    pub edit_out: Frame,
    pub edit_duration: Frame,
    pub working_duration: Frame,
    pub in_handle: Frame,
    pub out_handle: Frame,
}

impl CutRangeRecord {
    fn from_ranges(item: ItemId, group_hero: Option<ItemId>, ranges: Ranges) -> Self {
        Self {
            item,
            group_hero,
            head_in: ranges.head_in,
            tail_out: ranges.tail_out,
            cut_in: ranges.cut_in,
            cut_out: ranges.cut_out,
            cut_duration: ranges.cut_out - ranges.cut_in + 1,
            edit_in: ranges.edit_in,
            edit_out: ranges.edit_out,
            edit_duration: ranges.edit_out - ranges.edit_in + 1,
            working_duration: ranges.tail_out - ranges.head_in + 1,
            in_handle: ranges.in_handle,
            out_handle: ranges.out_handle,
        }
    }

    pub fn is_collated(&self) -> bool {
        self.group_hero.is_some()
    }

    /// A retimed item plays a different number of source frames than it
    /// covers on the timeline.
    pub fn has_retime_mismatch(&self) -> bool {
        self.cut_duration != self.edit_duration
    }

    /// Ordering and duration relationships every record must satisfy.
    pub fn is_consistent(&self) -> bool {
        self.cut_out >= self.cut_in
            && self.edit_out >= self.edit_in
            && self.head_in <= self.cut_in
            && self.tail_out >= self.cut_out
            && self.in_handle >= 0
            && self.out_handle >= 0
            && self.cut_duration == self.cut_out - self.cut_in + 1
            && self.edit_duration == self.edit_out - self.edit_in + 1
            && self.working_duration == self.tail_out - self.head_in + 1
    }
}

#[derive(Debug, Clone, Copy)]
struct Ranges {
    head_in: Frame,
    tail_out: Frame,
    cut_in: Frame,
    cut_out: Frame,
    edit_in: Frame,
    edit_out: Frame,
    in_handle: Frame,
    out_handle: Frame,
}

/// A record plus the warnings raised while computing it.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculatedRange {
    pub record: CutRangeRecord,
    pub warnings: Vec<ExportWarning>,
}

/// Computes [`CutRangeRecord`]s from export settings.
#[derive(Debug, Clone)]
pub struct RangeCalculator {
    settings: ExportSettings,
}

impl RangeCalculator {
    pub fn new(settings: &ExportSettings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }

    /// Compute the record for `item`. Pass the group's composite when the
    /// item is collated.
    ///
    /// Fails with a precondition error if the item is missing or its ranges
    /// cannot be ordered (for example a zero or reversed timeline range).
    pub fn calculate(
        &self,
        sequence: &Sequence,
        item: ItemId,
        composite: Option<&CompositeSequence>,
    ) -> CutsyncResult<CalculatedRange> {
        let track_item = sequence.find_item(item).ok_or_else(|| {
            CutsyncError::precondition(format!("item {item} is not in sequence '{}'", sequence.name))
        })?;

        let mut warnings = vec![];
        let (mut ranges, group_hero) = match composite {
            Some(composite) => (self.collated_ranges(sequence, composite), Some(composite.hero)),
            None => (self.item_ranges(sequence, track_item), None),
        };

        if ranges.head_in < 0 && self.settings.custom_start_frame.map_or(true, |start| start >= 0) {
            let clamped = ranges.head_in.abs();
            tracing::warn!(
                "{}: first frame {} is negative, clamping to 0",
                track_item.name,
                ranges.head_in
            );
            ranges.head_in = 0.min(ranges.cut_in);
            ranges.in_handle = ranges.cut_in - ranges.head_in;
            warnings.push(ExportWarning::NegativeStartClamped {
                item: track_item.name.clone(),
                frames: clamped,
            });
        }

        let record = CutRangeRecord::from_ranges(item, group_hero, ranges);
        if !record.is_consistent() {
            return Err(CutsyncError::precondition(format!(
                "{}: inconsistent cut range (head {} cut {}-{} tail {} edit {}-{})",
                track_item.name,
                record.head_in,
                record.cut_in,
                record.cut_out,
                record.tail_out,
                record.edit_in,
                record.edit_out
            )));
        }

        if record.has_retime_mismatch() {
            tracing::warn!(
                "{}: cut duration {} does not match edit duration {}; retimes are not supported by cuts",
                track_item.name,
                record.cut_duration,
                record.edit_duration
            );
            warnings.push(ExportWarning::RetimeMismatch {
                item: track_item.name.clone(),
                cut_duration: record.cut_duration,
                edit_duration: record.edit_duration,
            });
        }

        tracing::debug!(
            "{}: head {} cut {}-{} tail {} edit {}-{}",
            track_item.name,
            record.head_in,
            record.cut_in,
            record.cut_out,
            record.tail_out,
            record.edit_in,
            record.edit_out
        );

        Ok(CalculatedRange { record, warnings })
    }

    /// Frame added to timeline frames to get record frames.
    fn edit_shift(&self, sequence: &Sequence) -> Frame {
        self.settings
            .custom_start_frame
            .unwrap_or(sequence.start_timecode)
    }

    /// Ranges of a collated member: the composite's render window in natural
    /// output frames. Identical for every member and both export modes.
    ///
    /// Head and tail come from the unclamped natural window, trimmed to what
    /// the composite actually renders but never past the cut itself.
    fn collated_ranges(&self, sequence: &Sequence, composite: &CompositeSequence) -> Ranges {
        let cut_in = composite.sequence_in + composite.offset;
        let cut_out = composite.sequence_out + composite.offset;
        let (natural_head, natural_tail) = composite.natural_window();
        let head_in = natural_head
            .max(composite.to_output(composite.in_time()))
            .min(cut_in);
        let tail_out = natural_tail
            .min(composite.to_output(composite.out_time()))
            .max(cut_out);
        let edit_shift = self.edit_shift(sequence);

        Ranges {
            head_in,
            tail_out,
            cut_in,
            cut_out,
            edit_in: composite.sequence_in + edit_shift,
            edit_out: composite.sequence_out + edit_shift,
            in_handle: cut_in - head_in,
            out_handle: tail_out - cut_out,
        }
    }

    fn item_ranges(&self, sequence: &Sequence, item: &TrackItem) -> Ranges {
        let (in_handle, out_handle) = self.clamped_handles(item);
        let edit_shift = self.edit_shift(sequence);
        let edit_in = item.timeline_in + edit_shift;
        let edit_out = item.timeline_out + edit_shift;

        if self.settings.cut_length_export {
            let (head_in, cut_in) = match self.settings.custom_start_frame {
                Some(start) if self.settings.custom_start_includes_handles => {
                    (start, start + in_handle)
                }
                Some(start) => (start - in_handle, start),
                None => (item.source_in - in_handle, item.source_in),
            };
            let cut_out = cut_in + (item.source_out - item.source_in);
            Ranges {
                head_in,
                tail_out: cut_out + out_handle,
                cut_in,
                cut_out,
                edit_in,
                edit_out,
                in_handle,
                out_handle,
            }
        } else {
            // the whole clip is written; the cut keeps its source frames
            let media_first = item.source_in - item.handle_in_length.max(0);
            let media_last = item.source_out + item.handle_out_length.max(0);
            let rebase = match self.settings.custom_start_frame {
                Some(start) if self.settings.custom_start_includes_handles => start - media_first,
                Some(start) => start - item.source_in,
                None => 0,
            };
            Ranges {
                head_in: media_first + rebase,
                tail_out: media_last + rebase,
                cut_in: item.source_in + rebase,
                cut_out: item.source_out + rebase,
                edit_in,
                edit_out,
                in_handle,
                out_handle,
            }
        }
    }

    /// Configured handles clamped to the media available on each side.
    ///
    /// Without black padding the in handle also never reaches before source
    /// frame 0.
    pub fn clamped_handles(&self, item: &TrackItem) -> (Frame, Frame) {
        let handles = self.settings.handles();
        let mut in_handle = handles.min(item.handle_in_length).max(0);
        let out_handle = handles.min(item.handle_out_length).max(0);
        if !self.settings.pads_with_black && item.source_in < in_handle {
            in_handle = item.source_in.max(0);
        }
        (in_handle, out_handle)
    }
}
