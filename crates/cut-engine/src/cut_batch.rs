//! Cut and CutItem payloads.
//!
//! One Cut is created per run for the sequence, with one CutItem per
//! persisted item. CutItems are written as a single batch so a failed run
//! never leaves a partial cut behind.

use cutsync_timeline::{frames_to_timecode, Frame, Sequence};
use serde::Serialize;

use crate::collaborators::EntityRef;
use crate::cut_range::CutRangeRecord;
use crate::version::VersionData;

pub const CUT_ITEM_TYPE: &str = "CutItem";
pub const CUT_TYPE: &str = "Cut";

const CUT_DESCRIPTION: &str = "Automatically created by the cutsync export.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutData {
    pub code: String,

    /// The shot parent the cut is filed under.
    pub entity: EntityRef,
    pub sg_cut_type: String,
    pub description: String,
    pub revision_number: u32,
    pub fps: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timecode_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timecode_end: Option<String>,
    pub duration: Frame,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutItemData {
    pub code: String,
    pub shot: EntityRef,
    pub cut_order: u32,
    pub cut_item_in: Frame,
    pub cut_item_out: Frame,
    pub cut_item_duration: Frame,
    pub edit_in: Frame,
    pub edit_out: Frame,
    pub timecode_cut_item_in: String,
    pub timecode_cut_item_out: String,
    pub timecode_edit_in: String,
    pub timecode_edit_out: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cut: Option<EntityRef>,
}

/// A batch create request for one CutItem.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRequest {
    pub request_type: String,
    pub entity_type: String,
    pub data: CutItemData,
}

/// Points a created CutItem at the Version rendered for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionLink {
    pub cut_item: EntityRef,
    pub version: EntityRef,
}

/// Input for one CutItem.
#[derive(Debug, Clone, Copy)]
pub struct CutEntry<'a> {
    pub code: &'a str,
    pub shot: &'a EntityRef,
    pub record: &'a CutRangeRecord,
    pub cut_order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutBatch {
    pub cut: CutData,
    pub items: Vec<CutItemData>,
}

impl CutBatch {
    /// Build the cut for `sequence` from its entries. Items are sorted by
    /// cut order; the cut's timecodes come from the first and last item.
    pub fn assemble(
        sequence: &Sequence,
        parent: &EntityRef,
        revision_number: u32,
        cut_type: &str,
        entries: &[CutEntry<'_>],
    ) -> Self {
        let timecode =
            |frame: Frame| frames_to_timecode(frame, sequence.frame_rate, sequence.drop_frame);

        let mut entries = entries.to_vec();
        entries.sort_by_key(|entry| entry.cut_order);

        let items: Vec<CutItemData> = entries
            .iter()
            .map(|entry| {
                let record = entry.record;
                CutItemData {
                    code: entry.code.to_string(),
                    shot: entry.shot.clone(),
                    cut_order: entry.cut_order,
                    cut_item_in: record.cut_in,
                    cut_item_out: record.cut_out,
                    cut_item_duration: record.cut_duration,
                    edit_in: record.edit_in,
                    edit_out: record.edit_out,
                    timecode_cut_item_in: timecode(record.cut_in),
                    timecode_cut_item_out: timecode(record.cut_out),
                    timecode_edit_in: timecode(record.edit_in),
                    timecode_edit_out: timecode(record.edit_out),
                    cut: None,
                }
            })
            .collect();

        let cut = CutData {
            code: sequence.name.clone(),
            entity: parent.clone(),
            sg_cut_type: cut_type.to_string(),
            description: CUT_DESCRIPTION.to_string(),
            revision_number,
            fps: sequence.frame_rate.fps(),
            timecode_start: items.first().map(|item| item.timecode_edit_in.clone()),
            timecode_end: items.last().map(|item| item.timecode_edit_out.clone()),
            duration: items.iter().map(|item| item.cut_item_duration).sum(),
        };

        Self { cut, items }
    }

    /// Create requests for every CutItem, linked to the created `cut`.
    pub fn batch_requests(&self, cut: &EntityRef) -> Vec<BatchRequest> {
        self.items
            .iter()
            .map(|item| BatchRequest {
                request_type: "create".to_string(),
                entity_type: CUT_ITEM_TYPE.to_string(),
                data: CutItemData {
                    cut: Some(cut.clone()),
                    ..item.clone()
                },
            })
            .collect()
    }

    /// Match created CutItems to created versions by cut order.
    ///
    /// `created` holds the CutItems in the order of [`CutBatch::items`].
    /// Versions without a cut order, or whose cut order has no CutItem, are
    /// left unlinked.
    pub fn version_links(
        &self,
        created: &[EntityRef],
        versions: &[(VersionData, EntityRef)],
    ) -> Vec<VersionLink> {
        versions
            .iter()
            .filter_map(|(data, version)| {
                let cut_order = data.cut_order?;
                let position = self.items.iter().position(|item| item.cut_order == cut_order)?;
                let cut_item = created.get(position)?;
                Some(VersionLink {
                    cut_item: cut_item.clone(),
                    version: version.clone(),
                })
            })
            .collect()
    }
}
