//! Composite sequences for collated groups.
//!
//! A composite holds clones of every group member, trimmed out by handles at
//! the group edges and shifted so that the hero lands on its natural output
//! frames plus [`HEAD_ROOM_OFFSET`]. The head room keeps handle-extended
//! frames from going negative while the composite is being laid out; output
//! coordinates subtract it again.

use std::collections::{BTreeMap, HashMap};

use cutsync_common::{CutsyncError, CutsyncResult, ExportSettings};
use cutsync_timeline::{Frame, ItemId, Sequence, TimelineError, TrackId, TrackItem};
use serde::Serialize;

use crate::collate::CollationGroup;
use crate::warning::CollationConflict;

/// Frames of padding added to every composite placement.
pub const HEAD_ROOM_OFFSET: Frame = 1000;

/// Where a clone was placed on the composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    /// Index into the composite's track list.
    pub track_index: usize,
    pub timeline_in: Frame,
    pub timeline_out: Frame,
}

/// The offset sequence rendered for a collation group.
#[derive(Debug, Clone)]
pub struct CompositeSequence {
    pub sequence: Sequence,
    pub hero: ItemId,

    /// Original timeline frame to natural output frame.
    pub offset: Frame,

    /// Union of the members' timeline ranges, in original timeline frames.
    pub sequence_in: Frame,
    pub sequence_out: Frame,

    /// Handle length the composite was built with.
    pub handles: Frame,

    pub placements: BTreeMap<ItemId, Placement>,

    /// Members (or their linked audio) dropped because of a clash.
    pub conflicts: Vec<CollationConflict>,
}

impl CompositeSequence {
    /// Render window start on the composite.
    pub fn in_time(&self) -> Frame {
        self.sequence.in_time.unwrap_or(0)
    }

    /// Render window end on the composite (inclusive).
    pub fn out_time(&self) -> Frame {
        self.sequence.out_time.unwrap_or(0)
    }

    /// Handle-extended render window in natural output frames, before the
    /// composite's `max(0, ..)` clamp.
    pub fn natural_window(&self) -> (Frame, Frame) {
        (
            self.sequence_in + self.offset - self.handles,
            self.sequence_out + self.offset + self.handles,
        )
    }

    /// Convert a composite frame to natural output coordinates.
    pub fn to_output(&self, composite_frame: Frame) -> Frame {
        composite_frame - HEAD_ROOM_OFFSET
    }

    /// Convert an original timeline frame to a composite frame.
    pub fn to_composite(&self, timeline_frame: Frame) -> Frame {
        timeline_frame + self.offset + HEAD_ROOM_OFFSET
    }

    pub fn is_placed(&self, id: ItemId) -> bool {
        self.placements.contains_key(&id)
    }
}

/// Builds [`CompositeSequence`]s from collation groups.
#[derive(Debug, Clone)]
pub struct CompositeBuilder {
    handles: Frame,
    custom_start_frame: Option<Frame>,
    custom_start_includes_handles: bool,
}

impl CompositeBuilder {
    pub fn new(settings: &ExportSettings) -> Self {
        Self {
            handles: settings.handles(),
            custom_start_frame: settings.custom_start_frame,
            custom_start_includes_handles: settings.custom_start_includes_handles,
        }
    }

    /// Build the composite for `group`.
    ///
    /// The composite is named after the group's hero, not after whichever
    /// member asked for it, and its offset is taken from the hero too. Every
    /// member of a group therefore shares one composite with one name.
    pub fn build(&self, original: &Sequence, group: &CollationGroup) -> CutsyncResult<CompositeSequence> {
        let hero = original.find_item(group.hero()).ok_or_else(|| {
            CutsyncError::precondition(format!("hero {} is not in the sequence", group.hero()))
        })?;

        let members = group
            .members()
            .iter()
            .map(|id| {
                original
                    .locate(*id)
                    .ok_or_else(|| CutsyncError::precondition(format!("collated item {id} is not in the sequence")))
            })
            .collect::<CutsyncResult<Vec<_>>>()?;

        let sequence_in = members
            .iter()
            .map(|r| r.item.timeline_in)
            .min()
            .unwrap_or(hero.timeline_in);
        let sequence_out = members
            .iter()
            .map(|r| r.item.timeline_out)
            .max()
            .unwrap_or(hero.timeline_out);

        let offset = self.offset_for(hero);
        let shift = offset + HEAD_ROOM_OFFSET;

        let mut composite = Sequence::new(hero.name.clone(), original.frame_rate);
        composite.drop_frame = original.drop_frame;
        composite.start_timecode = original.start_timecode;
        composite.tags = original.tags.clone();
        composite.format = hero.source.format.clone().or_else(|| original.format.clone());
        if let Some(rate) = hero.source.frame_rate.filter(|rate| rate.is_valid()) {
            composite.frame_rate = rate;
        }

        let mut track_map: HashMap<TrackId, usize> = HashMap::new();
        let mut placements = BTreeMap::new();
        let mut conflicts = vec![];

        for member in &members {
            let mut clone = member.item.clone();
            let (trim_in, trim_out) = self.edge_trims(&clone, sequence_in, sequence_out);
            if trim_in > 0 {
                tracing::debug!("Expanding {} in by {} frames", clone.name, trim_in);
                clone.extend_in(trim_in);
            }
            if trim_out > 0 {
                tracing::debug!("Expanding {} out by {} frames", clone.name, trim_out);
                clone.extend_out(trim_out);
            }
            clone.shift(shift);

            let track_index = cloned_track(&mut composite, &mut track_map, member.track);
            let placement = Placement {
                track_index,
                timeline_in: clone.timeline_in,
                timeline_out: clone.timeline_out,
            };

            if let Err(err) = composite.tracks[track_index].add_item(clone) {
                conflicts.push(record_conflict(err)?);
                continue;
            }
            placements.insert(member.item.id, placement);

            for linked_id in &member.item.linked {
                let Some(linked) = original.locate(*linked_id) else {
                    tracing::warn!("{} links to missing item {}", member.item.name, linked_id);
                    continue;
                };
                let mut linked_clone = linked.item.clone();
                if trim_in > 0 {
                    linked_clone.extend_in(trim_in);
                }
                if trim_out > 0 {
                    linked_clone.extend_out(trim_out);
                }
                linked_clone.shift(shift);

                let linked_track = cloned_track(&mut composite, &mut track_map, linked.track);
                if let Err(err) = composite.tracks[linked_track].add_item(linked_clone) {
                    conflicts.push(record_conflict(err)?);
                }
            }
        }

        let in_time = (sequence_in + shift - self.handles).max(0);
        composite.in_time = Some(in_time);
        composite.out_time = Some((sequence_out + shift + self.handles).max(in_time));
        composite.poster_frame = hero
            .source
            .poster_frame
            .map(|poster| hero.timeline_in + poster + shift);

        tracing::info!(
            "Built composite '{}' with {} of {} members (offset {}, window {:?}..{:?})",
            composite.name,
            placements.len(),
            members.len(),
            offset,
            composite.in_time,
            composite.out_time
        );

        Ok(CompositeSequence {
            sequence: composite,
            hero: hero.id,
            offset,
            sequence_in,
            sequence_out,
            handles: self.handles,
            placements,
            conflicts,
        })
    }

    /// Offset taking the hero's timeline in to its natural output frame.
    fn offset_for(&self, hero: &TrackItem) -> Frame {
        match self.custom_start_frame {
            Some(start) => {
                let start = if self.custom_start_includes_handles {
                    start + self.handles.min(hero.handle_in_length).max(0)
                } else {
                    start
                };
                start - hero.timeline_in
            }
            None => hero.source_in - hero.timeline_in,
        }
    }

    /// Handle frames to add at the group edges, clamped to available media.
    fn edge_trims(&self, item: &TrackItem, sequence_in: Frame, sequence_out: Frame) -> (Frame, Frame) {
        if self.handles <= 0 {
            return (0, 0);
        }
        let trim_in = if item.timeline_in <= sequence_in {
            self.handles.min(item.handle_in_length).max(0)
        } else {
            0
        };
        let trim_out = if item.timeline_out >= sequence_out {
            self.handles.min(item.handle_out_length).max(0)
        } else {
            0
        };
        (trim_in, trim_out)
    }
}

/// Index of the composite track cloned from `source`, creating it on first
/// use.
fn cloned_track(
    composite: &mut Sequence,
    track_map: &mut HashMap<TrackId, usize>,
    source: &cutsync_timeline::Track,
) -> usize {
    *track_map
        .entry(source.id)
        .or_insert_with(|| composite.add_track(source.clone_empty()))
}

fn record_conflict(err: TimelineError) -> CutsyncResult<CollationConflict> {
    match err {
        TimelineError::ItemClash {
            item,
            item_in,
            item_out,
            existing,
            existing_in,
            existing_out,
        } => {
            let conflict = CollationConflict {
                item,
                item_in,
                item_out,
                existing,
                existing_in,
                existing_out,
            };
            tracing::error!("{}", conflict);
            Ok(conflict)
        }
        other => Err(CutsyncError::timeline(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collate::{collate, CollateOptions};
    use cutsync_timeline::{FrameRate, Track, TrackKind};

    fn settings(handles: u32) -> ExportSettings {
        ExportSettings {
            collate_by_overlap: true,
            collate_by_name: true,
            handle_length: handles,
            ..Default::default()
        }
    }

    /// Hero on V1 at 100..199 reading source 1001, a foreground element on
    /// V2 overlapping its tail.
    fn layered_sequence() -> Sequence {
        let mut sequence = Sequence::new("reel", FrameRate::FPS_24);
        let mut v1 = Track::new(1, "V1", TrackKind::Video);
        let mut hero = TrackItem::new(1, "sh010", 100, 199, 1001).with_available_handles(20, 20);
        hero.linked.push(ItemId(10));
        v1.add_item(hero).unwrap();
        let mut v2 = Track::new(2, "V2", TrackKind::Video);
        v2.add_item(TrackItem::new(2, "sh010", 150, 249, 500).with_available_handles(4, 4))
            .unwrap();
        let mut a1 = Track::new(3, "A1", TrackKind::Audio);
        a1.add_item(TrackItem::new(10, "sh010", 100, 199, 0).with_available_handles(20, 20))
            .unwrap();
        sequence.add_track(v1);
        sequence.add_track(v2);
        sequence.add_track(a1);
        sequence
    }

    fn group_for(sequence: &Sequence) -> CollationGroup {
        collate(sequence, ItemId(1), CollateOptions::from(&settings(0)))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_hero_lands_on_source_frames_plus_head_room() {
        let sequence = layered_sequence();
        let composite = CompositeBuilder::new(&settings(0))
            .build(&sequence, &group_for(&sequence))
            .unwrap();

        assert_eq!(composite.offset, 901);
        let hero = composite.placements[&ItemId(1)];
        assert_eq!(hero.timeline_in, 1001 + HEAD_ROOM_OFFSET);
        assert_eq!(composite.to_output(hero.timeline_in), 1001);
        assert_eq!(composite.sequence.name, "sh010");
        assert_eq!(composite.in_time(), 2001);
        assert_eq!(composite.out_time(), 2150);
    }

    #[test]
    fn test_edges_are_extended_by_clamped_handles() {
        let sequence = layered_sequence();
        let composite = CompositeBuilder::new(&settings(10))
            .build(&sequence, &group_for(&sequence))
            .unwrap();

        // hero starts the group: extended in by 10, not out
        let hero = composite.placements[&ItemId(1)];
        assert_eq!(hero.timeline_in, 100 - 10 + 901 + HEAD_ROOM_OFFSET);
        assert_eq!(hero.timeline_out, 199 + 901 + HEAD_ROOM_OFFSET);

        // V2 ends the group but only has 4 frames of handle
        let fg = composite.placements[&ItemId(2)];
        assert_eq!(fg.timeline_out, 249 + 4 + 901 + HEAD_ROOM_OFFSET);

        // window uses the raw handle length
        assert_eq!(composite.in_time(), 100 + 901 + HEAD_ROOM_OFFSET - 10);
        assert_eq!(composite.out_time(), 249 + 901 + HEAD_ROOM_OFFSET + 10);
    }

    #[test]
    fn test_linked_audio_follows_its_video() {
        let sequence = layered_sequence();
        let composite = CompositeBuilder::new(&settings(10))
            .build(&sequence, &group_for(&sequence))
            .unwrap();

        let audio: Vec<&Track> = composite.sequence.audio_tracks().collect();
        assert_eq!(audio.len(), 1);
        let clip = &audio[0].items[0];
        assert_eq!(clip.timeline_in, 90 + 901 + HEAD_ROOM_OFFSET);
        assert_eq!(clip.source_in, -10);
    }

    #[test]
    fn test_custom_start_including_handles() {
        let sequence = layered_sequence();
        let settings = ExportSettings {
            custom_start_frame: Some(1001),
            custom_start_includes_handles: true,
            ..settings(8)
        };
        let composite = CompositeBuilder::new(&settings)
            .build(&sequence, &group_for(&sequence))
            .unwrap();

        // first frame of the render window is the custom start
        assert_eq!(composite.to_output(composite.in_time()), 1001);
        assert_eq!(composite.offset, 1001 + 8 - 100);
    }

    #[test]
    fn test_window_never_negative() {
        let mut sequence = Sequence::new("reel", FrameRate::FPS_24);
        let mut v1 = Track::new(1, "V1", TrackKind::Video);
        v1.add_item(TrackItem::new(1, "sh", 5000, 5010, 0)).unwrap();
        let mut v2 = Track::new(2, "V2", TrackKind::Video);
        v2.add_item(TrackItem::new(2, "sh", 5000, 5005, 0)).unwrap();
        sequence.add_track(v1);
        sequence.add_track(v2);

        let settings = ExportSettings {
            custom_start_frame: Some(-3000),
            custom_start_includes_handles: false,
            ..settings(10)
        };
        let group = collate(&sequence, ItemId(1), CollateOptions::from(&settings))
            .unwrap()
            .unwrap();
        let composite = CompositeBuilder::new(&settings).build(&sequence, &group).unwrap();
        assert_eq!(composite.in_time(), 0);
        assert!(composite.out_time() >= composite.in_time());
        assert_eq!(composite.natural_window(), (-3010, -2980));
    }

    #[test]
    fn test_named_after_hero_when_member_is_target() {
        let mut sequence = layered_sequence();
        sequence.tracks[1].items[0].name = "fg010".to_string();
        let options = CollateOptions {
            by_overlap: true,
            ..Default::default()
        };
        let group = collate(&sequence, ItemId(2), options).unwrap().unwrap();
        let composite = CompositeBuilder::new(&settings(0)).build(&sequence, &group).unwrap();
        assert_eq!(composite.hero, ItemId(1));
        assert_eq!(composite.sequence.name, "sh010");
        assert_eq!(composite.offset, 901);
    }

    #[test]
    fn test_clash_is_recorded_and_item_dropped() {
        // two clones that end up on one track
        let mut sequence = Sequence::new("reel", FrameRate::FPS_24);
        let mut v1 = Track::new(1, "V1", TrackKind::Video);
        v1.add_item(TrackItem::new(1, "sh", 100, 149, 0).with_available_handles(0, 10))
            .unwrap();
        v1.add_item(TrackItem::new(2, "sh", 150, 199, 0).with_available_handles(10, 0))
            .unwrap();
        sequence.add_track(v1);
        let mut v2 = Track::new(2, "V2", TrackKind::Video);
        v2.add_item(TrackItem::new(3, "sh", 120, 180, 0)).unwrap();
        sequence.add_track(v2);

        let group = collate(&sequence, ItemId(1), CollateOptions::from(&settings(5)))
            .unwrap()
            .unwrap();
        assert_eq!(group.len(), 3);

        // move item 2 so it overlaps item 1 once both are cloned
        sequence.tracks[0].items[1].timeline_in = 149;
        let composite = CompositeBuilder::new(&settings(5)).build(&sequence, &group).unwrap();
        assert_eq!(composite.conflicts.len(), 1);
        assert!(!composite.is_placed(ItemId(2)));
        assert!(composite.is_placed(ItemId(1)));
    }

    #[test]
    fn test_poster_frame_is_offset() {
        let mut sequence = layered_sequence();
        sequence.tracks[0].items[0].source.poster_frame = Some(12);
        let composite = CompositeBuilder::new(&settings(0))
            .build(&sequence, &group_for(&sequence))
            .unwrap();
        assert_eq!(
            composite.sequence.poster_frame,
            Some(100 + 12 + HEAD_ROOM_OFFSET + 901)
        );
        assert_eq!(composite.to_output(composite.in_time()), 1001);
    }
}
