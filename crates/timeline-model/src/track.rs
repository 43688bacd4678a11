//! Tracks: ordered runs of non-overlapping items.

use serde::{Deserialize, Serialize};

use crate::error::TimelineError;
use crate::item::{ItemId, TrackItem};

/// Stable identity of a track within one timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u64);

/// What kind of media a track carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

/// A track on a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,

    pub name: String,

    pub kind: TrackKind,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Items sorted by timeline in.
    #[serde(default)]
    pub items: Vec<TrackItem>,
}

impl Track {
    pub fn new(id: u64, name: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: TrackId(id),
            name: name.into(),
            kind,
            tags: vec![],
            items: vec![],
        }
    }

    /// An empty track with the same identity, name, kind, and tags.
    pub fn clone_empty(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind,
            tags: self.tags.clone(),
            items: vec![],
        }
    }

    /// Insert an item, keeping timeline order. Fails without modifying the
    /// track when the item would overlap one already placed.
    pub fn add_item(&mut self, item: TrackItem) -> Result<(), TimelineError> {
        if let Some(existing) = self.items.iter().find(|existing| existing.overlaps(&item)) {
            return Err(TimelineError::ItemClash {
                item: item.name.clone(),
                item_in: item.timeline_in,
                item_out: item.timeline_out,
                existing: existing.name.clone(),
                existing_in: existing.timeline_in,
                existing_out: existing.timeline_out,
            });
        }

        let position = self
            .items
            .partition_point(|existing| existing.timeline_in < item.timeline_in);
        self.items.insert(position, item);
        Ok(())
    }

    pub fn item(&self, id: ItemId) -> Option<&TrackItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn is_video(&self) -> bool {
        self.kind == TrackKind::Video
    }

    /// Restore timeline order after deserialization.
    pub fn sort_items(&mut self) {
        self.items.sort_by_key(|item| item.timeline_in);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_item_keeps_timeline_order() {
        let mut track = Track::new(1, "V1", TrackKind::Video);
        track.add_item(TrackItem::new(2, "b", 50, 59, 0)).unwrap();
        track.add_item(TrackItem::new(1, "a", 0, 9, 0)).unwrap();
        track.add_item(TrackItem::new(3, "c", 20, 29, 0)).unwrap();

        let names: Vec<&str> = track.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_add_item_rejects_overlap() {
        let mut track = Track::new(1, "V1", TrackKind::Video);
        track.add_item(TrackItem::new(1, "a", 0, 9, 0)).unwrap();

        let err = track
            .add_item(TrackItem::new(2, "b", 9, 19, 0))
            .unwrap_err();
        match err {
            TimelineError::ItemClash {
                item,
                existing,
                existing_out,
                ..
            } => {
                assert_eq!(item, "b");
                assert_eq!(existing, "a");
                assert_eq!(existing_out, 9);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(track.items.len(), 1);
    }

    #[test]
    fn test_clone_empty_preserves_tags() {
        let mut track = Track::new(4, "FG", TrackKind::Video);
        track.tags.push("Final".to_string());
        track.add_item(TrackItem::new(1, "a", 0, 9, 0)).unwrap();

        let clone = track.clone_empty();
        assert_eq!(clone.id, track.id);
        assert_eq!(clone.tags, vec!["Final".to_string()]);
        assert!(clone.items.is_empty());
    }
}
