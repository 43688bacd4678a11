//! Version payloads for rendered media.
//!
//! Once an item's media has been rendered it is registered as a Version on
//! the shot it publishes to. Versions of persisted items carry their cut
//! order so the CutItem created for the same item can point at them.

use std::path::{Path, PathBuf};

use cutsync_common::{CutsyncError, CutsyncResult};
use cutsync_timeline::{Frame, ItemId};
use serde::Serialize;

use crate::collaborators::EntityRef;
use crate::cut_range::CutRangeRecord;

pub const VERSION_TYPE: &str = "Version";

/// Media written for one item by the render step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedMedia {
    pub item: ItemId,
    pub path: PathBuf,
}

impl RenderedMedia {
    pub fn new(item: ItemId, path: impl Into<PathBuf>) -> Self {
        Self {
            item,
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionData {
    pub code: String,

    /// Shot the media is filed against.
    pub entity: EntityRef,
    pub sg_path_to_movie: String,
    pub sg_first_frame: Frame,
    pub sg_last_frame: Frame,
    pub frame_count: Frame,

    /// Cut order of the CutItem this version belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cut_order: Option<u32>,
}

impl VersionData {
    /// Version for `media`, spanning the rendered head to tail frames.
    pub fn new(
        media: &RenderedMedia,
        shot: &EntityRef,
        record: &CutRangeRecord,
        cut_order: Option<u32>,
    ) -> CutsyncResult<Self> {
        let code = version_code(&media.path).ok_or_else(|| {
            CutsyncError::precondition(format!(
                "rendered media '{}' has no file name",
                media.path.display()
            ))
        })?;
        Ok(Self {
            code,
            entity: shot.clone(),
            sg_path_to_movie: media.path.display().to_string(),
            sg_first_frame: record.head_in,
            sg_last_frame: record.tail_out,
            frame_count: record.working_duration,
            cut_order,
        })
    }
}

/// File stem with its first letter upper-cased and the rest lower-cased.
pub fn version_code(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let mut chars = stem.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_code_from_file_name() {
        assert_eq!(
            version_code(Path::new("/renders/reel1/SH010_comp_v003.mov")).as_deref(),
            Some("Sh010_comp_v003")
        );
        assert_eq!(version_code(Path::new("plate.1001.exr")).as_deref(), Some("Plate.1001"));
        assert_eq!(version_code(Path::new("")), None);
    }
}
