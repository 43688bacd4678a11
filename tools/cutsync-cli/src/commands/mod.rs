pub mod collate;
pub mod info;
pub mod plan;
pub mod template;
pub mod validate;

use std::path::Path;

use cutsync_timeline::TimelineDocument;

pub(crate) fn load_timeline(path: &Path) -> anyhow::Result<TimelineDocument> {
    TimelineDocument::load(path).map_err(|e| anyhow::anyhow!("Failed to load timeline: {e}"))
}
