//! Plan an export and dry-run the tracking writes.

use std::path::PathBuf;

use clap::Args;
use cutsync_common::{ExportSettings, ShotUpdateSettings};
use cutsync_cut_engine::memory::MemoryTracking;
use cutsync_cut_engine::version::RenderedMedia;
use cutsync_cut_engine::{ExportAssembler, ExportPlanner, RunContext};
use cutsync_timeline::ItemId;
use serde_json::json;

/// Export options that override the config file.
#[derive(Args, Debug, Default)]
pub struct ExportArgs {
    /// Handle length in frames
    #[arg(long)]
    pub handles: Option<u32>,

    /// Frame the exported media starts at
    #[arg(long, allow_hyphen_values = true)]
    pub start_frame: Option<i64>,

    /// The start frame is the first handle frame rather than the cut in
    #[arg(long)]
    pub start_includes_handles: Option<bool>,

    /// Collate items that overlap on other tracks
    #[arg(long)]
    pub collate_tracks: bool,

    /// Collate items that share a name
    #[arg(long)]
    pub collate_names: bool,

    /// Collate the whole sequence into one shot
    #[arg(long)]
    pub collate_sequence: bool,

    /// Export the full source clip instead of the cut length
    #[arg(long)]
    pub clip_length: bool,
}

impl ExportArgs {
    pub fn apply(self, mut settings: ExportSettings) -> ExportSettings {
        if let Some(handles) = self.handles {
            settings.handle_length = handles;
        }
        if self.start_frame.is_some() {
            settings.custom_start_frame = self.start_frame;
        }
        if let Some(includes) = self.start_includes_handles {
            settings.custom_start_includes_handles = includes;
        }
        settings.collate_by_overlap |= self.collate_tracks;
        settings.collate_by_name |= self.collate_names;
        settings.collate_whole_sequence |= self.collate_sequence;
        if self.clip_length {
            settings.cut_length_export = false;
        }
        settings
    }
}

fn parse_rendered(raw: &str) -> anyhow::Result<RenderedMedia> {
    let (item, path) = raw
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Expected ITEM=PATH, got '{raw}'"))?;
    let item = item
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid item id in '{raw}': {e}"))?;
    if path.is_empty() {
        anyhow::bail!("Missing media path in '{raw}'");
    }
    Ok(RenderedMedia::new(ItemId(item), path))
}

pub fn run(
    path: PathBuf,
    items: Vec<u64>,
    rendered: &[String],
    export: ExportSettings,
    shot_update: ShotUpdateSettings,
) -> anyhow::Result<()> {
    let rendered = rendered
        .iter()
        .map(|raw| parse_rendered(raw))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let document = super::load_timeline(&path)?;
    let issues = document.validate();
    if !issues.is_empty() {
        anyhow::bail!("Timeline is invalid: {}", issues.join("; "));
    }

    let sequence = &document.sequence;
    let items: Vec<ItemId> = if items.is_empty() {
        document.items_to_export()
    } else {
        items.into_iter().map(ItemId).collect()
    };

    let plan = ExportPlanner::new(&export)
        .plan(sequence, &items)
        .map_err(|e| anyhow::anyhow!("Failed to plan export: {e}"))?;
    tracing::info!(
        "Planned {} items in {} groups with {} warnings",
        plan.items.len(),
        plan.groups.len(),
        plan.warning_count()
    );

    let mut tracking = MemoryTracking::new();
    let mut ctx = RunContext::new();
    let assembler = ExportAssembler::new(&shot_update);
    let batch = assembler
        .assemble(sequence, &plan, &mut ctx, &mut tracking.collaborators())
        .map_err(|e| anyhow::anyhow!("Export run aborted: {e}"))?;

    let versions = assembler
        .versions(&plan, &batch, &rendered)
        .map_err(|e| anyhow::anyhow!("Failed to register rendered media: {e}"))?;
    let created_versions: Vec<_> = versions
        .iter()
        .map(|version| (version.clone(), tracking.create_version(version)))
        .collect();

    let mut cut_items = vec![];
    let mut version_links = vec![];
    if let Some(cut) = &batch.cut {
        let created = tracking.create_cut(&cut.cut);
        let requests = cut.batch_requests(&created);
        cut_items = tracking
            .batch_create(&requests)
            .map_err(|e| anyhow::anyhow!("Failed to create cut items: {e}"))?;
        version_links = cut.version_links(&cut_items, &created_versions);
        tracking
            .link_versions(&version_links)
            .map_err(|e| anyhow::anyhow!("Failed to link versions: {e}"))?;
    }

    let groups: Vec<_> = plan
        .groups
        .iter()
        .map(|planned| {
            let composite = &planned.composite;
            json!({
                "name": composite.sequence.name,
                "members": planned.group.members(),
                "hero": planned.group.hero(),
                "offset": composite.offset,
                "in_time": composite.in_time(),
                "out_time": composite.out_time(),
                "poster_frame": composite.sequence.poster_frame,
                "conflicts": composite.conflicts.len(),
            })
        })
        .collect();

    let report = json!({
        "run_id": ctx.run_id(),
        "sequence": plan.sequence_name,
        "items": plan.items,
        "groups": groups,
        "batch": batch,
        "created_cut_items": cut_items,
        "versions": versions,
        "version_links": version_links,
        "tracking": tracking.entities(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !batch.is_complete() {
        tracing::warn!(
            "{} item(s) failed, the cut was not created",
            batch.failures.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rendered() {
        let media = parse_rendered("3=/renders/sh030_v002.mov").unwrap();
        assert_eq!(media, RenderedMedia::new(ItemId(3), "/renders/sh030_v002.mov"));
        assert!(parse_rendered("/renders/sh030.mov").is_err());
        assert!(parse_rendered("x=/renders/sh030.mov").is_err());
        assert!(parse_rendered("3=").is_err());
    }

    #[test]
    fn test_export_args_override_settings() {
        let args = ExportArgs {
            handles: Some(12),
            start_frame: Some(-50),
            collate_tracks: true,
            clip_length: true,
            ..Default::default()
        };
        let settings = args.apply(ExportSettings::default());
        assert_eq!(settings.handle_length, 12);
        assert_eq!(settings.custom_start_frame, Some(-50));
        assert!(settings.collate_by_overlap);
        assert!(!settings.collate_by_name);
        assert!(!settings.cut_length_export);
        assert!(settings.custom_start_includes_handles);
    }
}
