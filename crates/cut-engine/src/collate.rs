//! Collation: deciding which track items make up one shot.
//!
//! # Algorithm
//!
//! 1. **Whole sequence:** every video item joins the group.
//! 2. **Name matches:** start from the target; with name collation add every
//!    other video item with exactly the same name.
//! 3. **Scan:** walk all video items in track/time order. With overlap
//!    collation an item joins if it starts at or before a name match and
//!    ends at or after that match's start, or starts strictly inside it.
//!    Without overlap collation only the name matches themselves join.
//!
//! A single-item result means "not collated", never a one-item group.

use std::cmp::Reverse;

use cutsync_common::{CutsyncError, CutsyncResult, ExportSettings};
use cutsync_timeline::{ItemId, ItemRef, Sequence, TrackItem};
use serde::Serialize;

/// Which collation rules are active for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollateOptions {
    pub by_overlap: bool,
    pub by_name: bool,
    pub whole_sequence: bool,
}

impl From<&ExportSettings> for CollateOptions {
    fn from(settings: &ExportSettings) -> Self {
        Self {
            by_overlap: settings.collate_by_overlap,
            by_name: settings.collate_by_name,
            whole_sequence: settings.collate_whole_sequence,
        }
    }
}

impl CollateOptions {
    pub fn is_enabled(&self) -> bool {
        self.by_overlap || self.by_name || self.whole_sequence
    }
}

/// Two or more items that represent one real-world shot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollationGroup {
    members: Vec<ItemId>,
    hero: ItemId,
}

impl CollationGroup {
    /// Build a group from collated members. Returns `None` for fewer than
    /// two members. Fails if a member is not on a video track.
    pub fn from_members(sequence: &Sequence, members: Vec<ItemId>) -> CutsyncResult<Option<Self>> {
        if members.len() < 2 {
            return Ok(None);
        }
        let hero = select_hero(sequence, &members)?;
        Ok(Some(Self { members, hero }))
    }

    /// Members in track/time order.
    pub fn members(&self) -> &[ItemId] {
        &self.members
    }

    pub fn hero(&self) -> ItemId {
        self.hero
    }

    pub fn is_hero(&self, id: ItemId) -> bool {
        self.hero == id
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.members.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Collate `target` against the video items of `sequence`.
///
/// The result always contains the target when any rule is active. With
/// every rule off the result is just the target.
pub fn collated_items(
    sequence: &Sequence,
    target: ItemId,
    options: CollateOptions,
) -> CutsyncResult<Vec<ItemId>> {
    let video_items = sequence.video_items();
    let target_item = video_items
        .iter()
        .find(|r| r.item.id == target)
        .map(|r| r.item)
        .ok_or_else(|| {
            CutsyncError::precondition(format!("item {target} is not on a video track"))
        })?;

    if options.whole_sequence {
        return Ok(video_items.iter().map(|r| r.item.id).collect());
    }

    if !options.by_name && !options.by_overlap {
        return Ok(vec![target]);
    }

    let mut name_matches: Vec<&TrackItem> = vec![target_item];
    if options.by_name {
        name_matches.extend(
            video_items
                .iter()
                .map(|r| r.item)
                .filter(|item| item.id != target && item.name == target_item.name),
        );
    }

    let collated = video_items
        .iter()
        .filter(|candidate| {
            name_matches
                .iter()
                .any(|matched| joins(candidate.item, matched, options.by_overlap))
        })
        .map(|r| r.item.id)
        .collect();

    Ok(collated)
}

/// Whether `candidate` collates with the name match `matched`.
fn joins(candidate: &TrackItem, matched: &TrackItem, by_overlap: bool) -> bool {
    if !by_overlap {
        return candidate.id == matched.id;
    }
    if candidate.timeline_in <= matched.timeline_in {
        // starts before or together, ends at or after the match starts
        candidate.timeline_out >= matched.timeline_in
    } else {
        // starts inside the match
        candidate.timeline_in < matched.timeline_out
    }
}

/// The group member with the earliest timeline in. Ties go to the highest
/// video track.
///
/// Equivalent to maximising `(MAX - timeline_in) * 1000 + track_rank` for
/// any sequence with fewer than 1000 video tracks.
pub fn select_hero(sequence: &Sequence, members: &[ItemId]) -> CutsyncResult<ItemId> {
    let located = members
        .iter()
        .map(|id| {
            sequence
                .locate(*id)
                .filter(|r| r.track.is_video())
                .ok_or_else(|| {
                    CutsyncError::precondition(format!(
                        "collated item {id} is not on a video track"
                    ))
                })
        })
        .collect::<CutsyncResult<Vec<ItemRef<'_>>>>()?;

    located
        .iter()
        .max_by_key(|r| (Reverse(r.item.timeline_in), r.track_rank))
        .map(|r| r.item.id)
        .ok_or_else(|| CutsyncError::precondition("cannot pick a hero from an empty group"))
}

/// Collate `target` and wrap the result in a group when more than one item
/// collated.
pub fn collate(
    sequence: &Sequence,
    target: ItemId,
    options: CollateOptions,
) -> CutsyncResult<Option<CollationGroup>> {
    let members = collated_items(sequence, target, options)?;
    let group = CollationGroup::from_members(sequence, members)?;
    if let Some(group) = &group {
        tracing::debug!(
            "Collated {} items for {} (hero {})",
            group.len(),
            target,
            group.hero()
        );
    }
    Ok(group)
}
