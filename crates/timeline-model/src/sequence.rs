//! Sequences and frame rates.

use serde::{Deserialize, Serialize};

use crate::item::{Format, Frame, ItemId, TrackItem};
use crate::track::{Track, TrackKind};

/// Rational frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    pub numerator: u32,
    pub denominator: u32,
}

impl FrameRate {
    pub const FPS_23_976: Self = Self::new(24000, 1001);
    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_25: Self = Self::new(25, 1);
    pub const FPS_29_97: Self = Self::new(30000, 1001);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_59_94: Self = Self::new(60000, 1001);
    pub const FPS_60: Self = Self::new(60, 1);

    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Frames per second as a float.
    pub fn fps(&self) -> f64 {
        if self.denominator == 0 {
            return 0.0;
        }
        f64::from(self.numerator) / f64::from(self.denominator)
    }

    /// Integer frame count used for timecode display (29.97 -> 30).
    pub fn nominal(&self) -> u32 {
        self.fps().round() as u32
    }

    /// Drop-frame timecode exists only for the NTSC 30 and 60 families.
    pub fn supports_drop_frame(&self) -> bool {
        self.denominator == 1001 && matches!(self.nominal(), 30 | 60)
    }

    pub fn is_valid(&self) -> bool {
        self.numerator > 0 && self.denominator > 0
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_24
    }
}

/// A borrowed view of an item together with the track that owns it.
#[derive(Debug, Clone, Copy)]
pub struct ItemRef<'a> {
    /// Index of the owning track among tracks of the same kind.
    pub track_rank: usize,
    pub track: &'a Track,
    pub item: &'a TrackItem,
}

impl<'a> ItemRef<'a> {
    pub fn id(&self) -> ItemId {
        self.item.id
    }
}

/// An edited sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: String,

    #[serde(default)]
    pub frame_rate: FrameRate,

    #[serde(default)]
    pub drop_frame: bool,

    #[serde(default)]
    pub format: Option<Format>,

    /// Record timecode of timeline frame 0, in frames.
    #[serde(default)]
    pub start_timecode: Frame,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub tracks: Vec<Track>,

    /// Explicit render window start.
    #[serde(default)]
    pub in_time: Option<Frame>,

    /// Explicit render window end (inclusive).
    #[serde(default)]
    pub out_time: Option<Frame>,

    #[serde(default)]
    pub poster_frame: Option<Frame>,
}

impl Sequence {
    pub fn new(name: impl Into<String>, frame_rate: FrameRate) -> Self {
        Self {
            name: name.into(),
            frame_rate,
            drop_frame: false,
            format: None,
            start_timecode: 0,
            tags: vec![],
            tracks: vec![],
            in_time: None,
            out_time: None,
            poster_frame: None,
        }
    }

    /// Append a track and return its index.
    pub fn add_track(&mut self, track: Track) -> usize {
        self.tracks.push(track);
        self.tracks.len() - 1
    }

    pub fn video_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(|track| track.kind == TrackKind::Video)
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(|track| track.kind == TrackKind::Audio)
    }

    /// Every video item, in track order then timeline order.
    pub fn video_items(&self) -> Vec<ItemRef<'_>> {
        self.video_tracks()
            .enumerate()
            .flat_map(|(track_rank, track)| {
                track.items.iter().map(move |item| ItemRef {
                    track_rank,
                    track,
                    item,
                })
            })
            .collect()
    }

    /// Find an item on any track.
    pub fn locate(&self, id: ItemId) -> Option<ItemRef<'_>> {
        for kind in [TrackKind::Video, TrackKind::Audio] {
            let tracks = self.tracks.iter().filter(|track| track.kind == kind);
            for (track_rank, track) in tracks.enumerate() {
                if let Some(item) = track.item(id) {
                    return Some(ItemRef {
                        track_rank,
                        track,
                        item,
                    });
                }
            }
        }
        None
    }

    pub fn find_item(&self, id: ItemId) -> Option<&TrackItem> {
        self.locate(id).map(|found| found.item)
    }

    /// Number of timeline frames up to the last item's out frame.
    pub fn duration(&self) -> Frame {
        self.tracks
            .iter()
            .flat_map(|track| track.items.iter())
            .map(|item| item.timeline_out + 1)
            .max()
            .unwrap_or(0)
    }

    /// Restore per-track timeline order after deserialization.
    pub fn normalize(&mut self) {
        for track in &mut self.tracks {
            track.sort_items();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_track_sequence() -> Sequence {
        let mut sequence = Sequence::new("reel1", FrameRate::FPS_24);

        let mut v1 = Track::new(1, "V1", TrackKind::Video);
        v1.add_item(TrackItem::new(1, "sh010", 0, 47, 1001)).unwrap();
        v1.add_item(TrackItem::new(2, "sh020", 48, 95, 1001)).unwrap();

        let mut a1 = Track::new(2, "A1", TrackKind::Audio);
        a1.add_item(TrackItem::new(10, "sh010_audio", 0, 47, 0)).unwrap();

        let mut v2 = Track::new(3, "V2", TrackKind::Video);
        v2.add_item(TrackItem::new(3, "sh010_fg", 10, 30, 1001)).unwrap();

        sequence.add_track(v1);
        sequence.add_track(a1);
        sequence.add_track(v2);
        sequence
    }

    #[test]
    fn test_frame_rate_nominal_and_drop_frame() {
        assert_eq!(FrameRate::FPS_29_97.nominal(), 30);
        assert!(FrameRate::FPS_29_97.supports_drop_frame());
        assert!(FrameRate::FPS_59_94.supports_drop_frame());
        assert!(!FrameRate::FPS_23_976.supports_drop_frame());
        assert!(!FrameRate::FPS_30.supports_drop_frame());
        assert!((FrameRate::FPS_23_976.fps() - 23.976).abs() < 1e-3);
        assert!(!FrameRate::new(24, 0).is_valid());
    }

    #[test]
    fn test_video_items_skip_audio_and_rank_video_tracks() {
        let sequence = two_track_sequence();
        let items = sequence.video_items();
        let summary: Vec<(usize, &str)> = items
            .iter()
            .map(|r| (r.track_rank, r.item.name.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![(0, "sh010"), (0, "sh020"), (1, "sh010_fg")]
        );
    }

    #[test]
    fn test_locate_finds_audio_items() {
        let sequence = two_track_sequence();
        let found = sequence.locate(ItemId(10)).unwrap();
        assert_eq!(found.track.name, "A1");
        assert_eq!(found.track_rank, 0);
        assert!(sequence.locate(ItemId(99)).is_none());
    }

    #[test]
    fn test_duration_is_last_out_plus_one() {
        assert_eq!(two_track_sequence().duration(), 96);
        assert_eq!(Sequence::new("empty", FrameRate::FPS_25).duration(), 0);
    }
}
