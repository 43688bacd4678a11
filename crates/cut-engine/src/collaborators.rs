//! Typed interfaces to the production tracking service.
//!
//! The engine never talks to a tracker directly. The caller hands in
//! implementations of these traits; [`crate::memory::MemoryTracking`] is the
//! in-memory one used for dry runs and tests.

use cutsync_common::{CutsyncError, CutsyncResult};
use cutsync_timeline::Frame;
use serde::{Deserialize, Serialize};

/// Reference to an entity in the tracking service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, id: u64) -> Self {
        Self {
            entity_type: entity_type.into(),
            id,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// `Shot 12 (sh010)` style label for logs and warnings.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{} {} ({})", self.entity_type, self.id, name),
            None => format!("{} {}", self.entity_type, self.id),
        }
    }
}

/// Image to upload as an entity thumbnail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThumbnailSource {
    /// Clip or sequence the thumbnail is taken from.
    pub name: String,
    pub frame: Option<Frame>,
}

/// Finds and creates the entities shots are filed under.
pub trait ShotResolver {
    /// Entities of the shot-parent type named `name`.
    fn find_shot_parents(&mut self, name: &str) -> CutsyncResult<Vec<EntityRef>>;

    fn create_shot_parent(&mut self, name: &str) -> CutsyncResult<EntityRef>;

    /// Shots named `name` filed under `parent`.
    fn find_shots(&mut self, name: &str, parent: &EntityRef) -> CutsyncResult<Vec<EntityRef>>;

    fn create_shot(&mut self, name: &str, parent: &EntityRef) -> CutsyncResult<EntityRef>;

    /// Highest revision number of the cut `code` under `parent`.
    fn latest_cut_revision(&mut self, code: &str, parent: &EntityRef) -> CutsyncResult<Option<u32>>;
}

pub trait TaskTemplateResolver {
    fn find_task_templates(&mut self, entity_type: &str, code: &str) -> CutsyncResult<Vec<EntityRef>>;
}

pub trait ThumbnailUploader {
    fn upload_thumbnail(&mut self, entity: &EntityRef, source: &ThumbnailSource) -> CutsyncResult<()>;
}

/// The collaborators one export run talks to.
pub struct Collaborators<'a> {
    pub shots: &'a mut dyn ShotResolver,
    pub templates: &'a mut dyn TaskTemplateResolver,
    pub thumbnails: &'a mut dyn ThumbnailUploader,
}

/// Expect at most one match. More than one is ambiguous and must not be
/// guessed at.
pub fn unique_match(
    entity_type: &str,
    name: &str,
    mut candidates: Vec<EntityRef>,
) -> CutsyncResult<Option<EntityRef>> {
    match candidates.len() {
        0 => Ok(None),
        1 => Ok(candidates.pop()),
        count => Err(CutsyncError::ambiguous(entity_type, name, count)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_match() {
        assert_eq!(unique_match("Shot", "sh010", vec![]).unwrap(), None);

        let one = vec![EntityRef::new("Shot", 3)];
        assert_eq!(
            unique_match("Shot", "sh010", one).unwrap(),
            Some(EntityRef::new("Shot", 3))
        );

        let two = vec![EntityRef::new("Shot", 3), EntityRef::new("Shot", 4)];
        let err = unique_match("Shot", "sh010", two).unwrap_err();
        assert!(matches!(err, CutsyncError::AmbiguousEntity { count: 2, .. }));
    }

    #[test]
    fn test_entity_ref_serializes_type_key() {
        let json = serde_json::to_value(EntityRef::new("Sequence", 7).with_name("reel1")).unwrap();
        assert_eq!(json["type"], "Sequence");
        assert_eq!(json["id"], 7);
        assert_eq!(json["name"], "reel1");
        assert_eq!(EntityRef::new("Shot", 1).label(), "Shot 1");
    }
}
