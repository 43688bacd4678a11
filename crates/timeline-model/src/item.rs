//! Track items and the media they reference.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sequence::FrameRate;

/// Integer frame number. Ranges built from frames are inclusive.
pub type Frame = i64;

/// Stable identity of a track item within one timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Image format of a media source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Format {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_pixel_aspect")]
    pub pixel_aspect: f64,
}

fn default_pixel_aspect() -> f64 {
    1.0
}

impl Format {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixel_aspect: 1.0,
        }
    }
}

/// The clip a track item plays from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSource {
    /// Clip name.
    pub name: String,

    /// Native image format, if known.
    pub format: Option<Format>,

    /// Native frame rate, if known.
    pub frame_rate: Option<FrameRate>,

    /// Poster frame, relative to the start of the clip.
    pub poster_frame: Option<Frame>,
}

/// A placed unit of media on a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackItem {
    pub id: ItemId,

    pub name: String,

    /// First frame on the sequence timeline.
    pub timeline_in: Frame,

    /// Last frame on the sequence timeline (inclusive).
    pub timeline_out: Frame,

    /// First frame used from the source media.
    pub source_in: Frame,

    /// Last frame used from the source media (inclusive).
    pub source_out: Frame,

    /// Media available before `source_in`.
    #[serde(default)]
    pub handle_in_length: Frame,

    /// Media available after `source_out`.
    #[serde(default)]
    pub handle_out_length: Frame,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_playback_speed")]
    pub playback_speed: f64,

    /// Items (usually audio) that move in lockstep with this one.
    #[serde(default)]
    pub linked: Vec<ItemId>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub source: MediaSource,
}

fn default_enabled() -> bool {
    true
}

fn default_playback_speed() -> f64 {
    1.0
}

impl TrackItem {
    /// Create an item whose source range starts at `source_in` and runs
    /// for the same length as its timeline range.
    pub fn new(
        id: u64,
        name: impl Into<String>,
        timeline_in: Frame,
        timeline_out: Frame,
        source_in: Frame,
    ) -> Self {
        Self {
            id: ItemId(id),
            name: name.into(),
            timeline_in,
            timeline_out,
            source_in,
            source_out: source_in + (timeline_out - timeline_in),
            handle_in_length: 0,
            handle_out_length: 0,
            enabled: true,
            playback_speed: 1.0,
            linked: vec![],
            tags: vec![],
            source: MediaSource::default(),
        }
    }

    /// Set the media available on either side of the used range.
    pub fn with_available_handles(mut self, handle_in: Frame, handle_out: Frame) -> Self {
        self.handle_in_length = handle_in;
        self.handle_out_length = handle_out;
        self
    }

    /// Number of timeline frames covered.
    pub fn duration(&self) -> Frame {
        self.timeline_out - self.timeline_in + 1
    }

    /// Number of source frames used.
    pub fn source_duration(&self) -> Frame {
        self.source_out - self.source_in + 1
    }

    pub fn is_retimed(&self) -> bool {
        (self.playback_speed - 1.0).abs() > f64::EPSILON
    }

    /// Move the in point earlier by `frames`, consuming available handle.
    pub fn extend_in(&mut self, frames: Frame) {
        self.timeline_in -= frames;
        self.source_in -= frames;
        self.handle_in_length = (self.handle_in_length - frames).max(0);
    }

    /// Move the out point later by `frames`, consuming available handle.
    pub fn extend_out(&mut self, frames: Frame) {
        self.timeline_out += frames;
        self.source_out += frames;
        self.handle_out_length = (self.handle_out_length - frames).max(0);
    }

    /// Move the item along the timeline without touching its source range.
    pub fn shift(&mut self, delta: Frame) {
        self.timeline_in += delta;
        self.timeline_out += delta;
    }

    /// Whether the two items share at least one timeline frame.
    pub fn overlaps(&self, other: &TrackItem) -> bool {
        self.timeline_in <= other.timeline_out && other.timeline_in <= self.timeline_out
    }

    /// Source range to read, widened by `handles` on both sides. With
    /// `clamp_to_source` the widening never exceeds the available media.
    pub fn input_range(&self, handles: Frame, clamp_to_source: bool) -> (Frame, Frame) {
        let (handle_in, handle_out) = if clamp_to_source {
            (
                handles.min(self.handle_in_length).max(0),
                handles.min(self.handle_out_length).max(0),
            )
        } else {
            (handles, handles)
        };
        (self.source_in - handle_in, self.source_out + handle_out)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_source_matches_timeline_length() {
        let item = TrackItem::new(1, "sh010", 100, 149, 1001);
        assert_eq!(item.duration(), 50);
        assert_eq!(item.source_duration(), 50);
        assert_eq!(item.source_out, 1050);
        assert!(!item.is_retimed());
    }

    #[test]
    fn test_extend_consumes_available_handles() {
        let mut item = TrackItem::new(1, "sh010", 100, 149, 1001).with_available_handles(8, 20);
        item.extend_in(8);
        item.extend_out(10);
        assert_eq!((item.timeline_in, item.timeline_out), (92, 159));
        assert_eq!((item.source_in, item.source_out), (993, 1060));
        assert_eq!(item.handle_in_length, 0);
        assert_eq!(item.handle_out_length, 10);
    }

    #[test]
    fn test_input_range_clamps_to_available_media() {
        let item = TrackItem::new(1, "sh010", 0, 9, 5).with_available_handles(5, 100);
        assert_eq!(item.input_range(10, true), (0, 24));
        assert_eq!(item.input_range(10, false), (-5, 24));
        assert_eq!(item.input_range(0, true), (5, 14));
    }

    #[test]
    fn test_overlap_is_inclusive_of_out_frame() {
        let a = TrackItem::new(1, "a", 100, 200, 0);
        let b = TrackItem::new(2, "b", 200, 250, 0);
        let c = TrackItem::new(3, "c", 201, 250, 0);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_item_json_defaults() {
        let raw = r#"{
            "id": 7, "name": "sh070",
            "timeline_in": 0, "timeline_out": 23,
            "source_in": 1001, "source_out": 1024
        }"#;
        let item: TrackItem = serde_json::from_str(raw).unwrap();
        assert_eq!(item.id, ItemId(7));
        assert!(item.enabled);
        assert!((item.playback_speed - 1.0).abs() < 1e-9);
        assert!(item.linked.is_empty());
        assert_eq!(item.source, MediaSource::default());
    }
}
