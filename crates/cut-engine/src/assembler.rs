//! Turns an [`ExportPlan`] into tracking writes.
//!
//! Every persisted item resolves its shot through the collaborators and gets
//! a Shot update. Item failures are collected instead of aborting the run,
//! but a run with any failure does not produce a Cut: CutItems are created
//! in one batch and a partial cut is never written.

use std::collections::HashMap;

use cutsync_common::{CutsyncError, CutsyncResult, ShotUpdateSettings};
use cutsync_timeline::{ItemId, Sequence};
use serde::Serialize;

use crate::collaborators::{Collaborators, EntityRef, ThumbnailSource};
use crate::context::RunContext;
use crate::cut_batch::{CutBatch, CutEntry};
use crate::planner::{ExportPlan, ItemPlan};
use crate::shot::{status_for_tags, template_for_tags, ShotFields, ShotUpdate};
use crate::version::{RenderedMedia, VersionData};
use crate::warning::ExportWarning;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemFailure {
    pub item: ItemId,
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemWarning {
    pub item: ItemId,
    pub name: String,
    pub warning: ExportWarning,
}

/// Shot that an item's published media is filed against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishTarget {
    pub item: ItemId,
    pub shot: EntityRef,
}

/// Everything an export run writes to the tracking service.
#[derive(Debug, Clone, Serialize)]
pub struct ExportBatch {
    pub run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shot_parent: Option<EntityRef>,
    pub shot_updates: Vec<ShotUpdate>,
    pub publish_targets: Vec<PublishTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cut: Option<CutBatch>,
    pub failures: Vec<ItemFailure>,
    pub warnings: Vec<ItemWarning>,
}

impl ExportBatch {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

struct ProcessedItem {
    parent: EntityRef,
    update: ShotUpdate,
    warnings: Vec<ExportWarning>,
}

#[derive(Debug, Clone)]
pub struct ExportAssembler {
    settings: ShotUpdateSettings,
}

impl ExportAssembler {
    pub fn new(settings: &ShotUpdateSettings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }

    /// Resolve entities and build the writes for `plan`.
    ///
    /// Errors that invalidate the whole run (configuration, I/O) are
    /// returned; everything else becomes an [`ItemFailure`].
    pub fn assemble(
        &self,
        sequence: &Sequence,
        plan: &ExportPlan,
        ctx: &mut RunContext,
        collab: &mut Collaborators<'_>,
    ) -> CutsyncResult<ExportBatch> {
        let mut batch = ExportBatch {
            run_id: ctx.run_id().to_string(),
            shot_parent: None,
            shot_updates: vec![],
            publish_targets: vec![],
            cut: None,
            failures: vec![],
            warnings: vec![],
        };

        for item_plan in &plan.items {
            for warning in &item_plan.warnings {
                batch.warnings.push(ItemWarning {
                    item: item_plan.item,
                    name: item_plan.name.clone(),
                    warning: warning.clone(),
                });
            }
        }

        let parent_thumbnail = ThumbnailSource {
            name: sequence.name.clone(),
            frame: sequence.poster_frame,
        };
        let mut shots: HashMap<ItemId, EntityRef> = HashMap::new();

        for (index, item_plan) in plan.persisted().into_iter().enumerate() {
            ctx.begin_item(index == 0);
            if index == 0 {
                batch.run_id = ctx.run_id().to_string();
            }

            match self.process_item(sequence, plan, item_plan, &parent_thumbnail, ctx, collab) {
                Ok(processed) => {
                    for warning in processed.warnings {
                        self.push_warning(&mut batch, item_plan, warning);
                    }
                    batch.shot_parent = Some(processed.parent);
                    shots.insert(item_plan.item, processed.update.shot.clone());
                    tracing::info!(
                        "Updated {} for {}",
                        processed.update.shot.label(),
                        item_plan.name
                    );
                    batch.shot_updates.push(processed.update);
                }
                Err(err) if err.is_fatal_to_run() => return Err(err),
                Err(err) => {
                    tracing::error!("Failed to process {}: {}", item_plan.name, err);
                    batch.failures.push(ItemFailure {
                        item: item_plan.item,
                        name: item_plan.name.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }

        batch.publish_targets = plan
            .items
            .iter()
            .filter_map(|item_plan| {
                shots.get(&item_plan.publish_item()).map(|shot| PublishTarget {
                    item: item_plan.item,
                    shot: shot.clone(),
                })
            })
            .collect();

        if self.settings.create_cut {
            batch.cut = self.cut_batch(sequence, plan, &batch, &shots, collab)?;
        }

        Ok(batch)
    }

    /// Version payloads for media rendered during the run.
    ///
    /// Each version is filed against the item's publish target. Media for
    /// an item whose shot could not be resolved is skipped.
    pub fn versions(
        &self,
        plan: &ExportPlan,
        batch: &ExportBatch,
        rendered: &[RenderedMedia],
    ) -> CutsyncResult<Vec<VersionData>> {
        let mut versions = vec![];
        for media in rendered {
            let item_plan = plan.item(media.item).ok_or_else(|| {
                CutsyncError::precondition(format!(
                    "rendered item {} is not part of the export",
                    media.item
                ))
            })?;
            let Some(target) = batch.publish_targets.iter().find(|t| t.item == media.item) else {
                tracing::warn!(
                    "Skipping version for {}: no shot to publish to",
                    item_plan.name
                );
                continue;
            };
            let version = VersionData::new(media, &target.shot, &item_plan.record, item_plan.cut_order)?;
            tracing::debug!("Version '{}' for {}", version.code, target.shot.label());
            versions.push(version);
        }
        Ok(versions)
    }

    fn push_warning(&self, batch: &mut ExportBatch, item_plan: &ItemPlan, warning: ExportWarning) {
        batch.warnings.push(ItemWarning {
            item: item_plan.item,
            name: item_plan.name.clone(),
            warning,
        });
    }

    fn process_item(
        &self,
        sequence: &Sequence,
        plan: &ExportPlan,
        item_plan: &ItemPlan,
        parent_thumbnail: &ThumbnailSource,
        ctx: &mut RunContext,
        collab: &mut Collaborators<'_>,
    ) -> CutsyncResult<ProcessedItem> {
        let parent = ctx.resolve_shot_parent(&sequence.name, parent_thumbnail, collab)?;
        let (update, shot_warning) =
            self.shot_update(sequence, plan, item_plan, &parent.entity, ctx, collab)?;
        Ok(ProcessedItem {
            parent: parent.entity,
            update,
            warnings: parent.warning.into_iter().chain(shot_warning).collect(),
        })
    }

    fn shot_update(
        &self,
        sequence: &Sequence,
        plan: &ExportPlan,
        item_plan: &ItemPlan,
        parent: &EntityRef,
        ctx: &mut RunContext,
        collab: &mut Collaborators<'_>,
    ) -> CutsyncResult<(ShotUpdate, Option<ExportWarning>)> {
        let item = sequence.find_item(item_plan.item).ok_or_else(|| {
            CutsyncError::precondition(format!("item {} is not in the sequence", item_plan.item))
        })?;
        let cut_order = item_plan.cut_order.ok_or_else(|| {
            CutsyncError::precondition(format!("{} has no cut order", item_plan.name))
        })?;

        let thumbnail = match plan.composite_for(item_plan.item) {
            Some(composite) => ThumbnailSource {
                name: composite.sequence.name.clone(),
                frame: composite.sequence.poster_frame,
            },
            None => ThumbnailSource {
                name: item.source.name.clone(),
                frame: item.source.poster_frame,
            },
        };
        let shot = ctx.resolve_shot(&item.name, parent, &thumbnail, collab)?;

        let mut fields = ShotFields::from_record(&item_plan.record, cut_order, &self.settings);
        fields.sg_status_list = status_for_tags(&item.tags, &self.settings.status_tag_map);
        if let Some(code) = template_for_tags(
            &item.tags,
            &self.settings.task_template_map,
            self.settings.default_task_template.as_deref(),
        ) {
            fields.task_template = ctx.resolve_task_template(code, collab)?;
        }

        let update = ShotUpdate {
            item: item_plan.item,
            shot: shot.entity,
            fields,
        };
        Ok((update, shot.warning))
    }

    /// The Cut for the run, withheld when any persisted item failed.
    fn cut_batch(
        &self,
        sequence: &Sequence,
        plan: &ExportPlan,
        batch: &ExportBatch,
        shots: &HashMap<ItemId, EntityRef>,
        collab: &mut Collaborators<'_>,
    ) -> CutsyncResult<Option<CutBatch>> {
        if !batch.failures.is_empty() {
            tracing::warn!(
                "Not creating a cut for '{}': {} items failed",
                sequence.name,
                batch.failures.len()
            );
            return Ok(None);
        }
        let Some(parent) = &batch.shot_parent else {
            return Ok(None);
        };

        let entries: Vec<CutEntry<'_>> = plan
            .persisted()
            .into_iter()
            .filter_map(|item_plan| {
                let shot = shots.get(&item_plan.item)?;
                let cut_order = item_plan.cut_order?;
                Some(CutEntry {
                    code: &item_plan.name,
                    shot,
                    record: &item_plan.record,
                    cut_order,
                })
            })
            .collect();
        if entries.is_empty() {
            return Ok(None);
        }

        let revision = collab
            .shots
            .latest_cut_revision(&sequence.name, parent)?
            .map_or(1, |latest| latest + 1);
        let cut = CutBatch::assemble(sequence, parent, revision, &self.settings.cut_type, &entries);
        tracing::info!(
            "Cut '{}' revision {} with {} items",
            cut.cut.code,
            revision,
            cut.items.len()
        );
        Ok(Some(cut))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{SHOT_PARENT_TYPE, SHOT_TYPE, TASK_TEMPLATE_TYPE};
    use crate::memory::MemoryTracking;
    use crate::planner::ExportPlanner;
    use cutsync_common::ExportSettings;
    use cutsync_timeline::{FrameRate, Track, TrackItem, TrackKind};

    fn sequence() -> Sequence {
        let mut sequence = Sequence::new("reel1", FrameRate::FPS_24);
        sequence.start_timecode = 86_400;
        let mut v1 = Track::new(1, "V1", TrackKind::Video);
        let mut sh010 = TrackItem::new(1, "sh010", 0, 47, 1001).with_available_handles(20, 20);
        sh010.tags.push("Final".to_string());
        v1.add_item(sh010).unwrap();
        v1.add_item(TrackItem::new(2, "sh020", 48, 95, 1001).with_available_handles(20, 20))
            .unwrap();
        sequence.add_track(v1);
        sequence
    }

    fn plan(sequence: &Sequence) -> ExportPlan {
        let settings = ExportSettings {
            handle_length: 8,
            ..Default::default()
        };
        ExportPlanner::new(&settings)
            .plan(sequence, &[ItemId(2), ItemId(1)])
            .unwrap()
    }

    #[test]
    fn test_creates_shots_and_cut() {
        let sequence = sequence();
        let plan = plan(&sequence);
        let mut tracking = MemoryTracking::new();
        let parent = tracking.add_entity(SHOT_PARENT_TYPE, "reel1", None);
        tracking.add_cut("reel1", &parent, 2);
        tracking.add_entity(TASK_TEMPLATE_TYPE, "Basic shot template", None);

        let settings = ShotUpdateSettings {
            default_task_template: Some("Basic shot template".to_string()),
            ..Default::default()
        };
        let mut ctx = RunContext::new();
        let batch = ExportAssembler::new(&settings)
            .assemble(&sequence, &plan, &mut ctx, &mut tracking.collaborators())
            .unwrap();

        assert!(batch.is_complete());
        assert_eq!(batch.shot_parent, Some(parent));
        assert_eq!(batch.shot_updates.len(), 2);

        // updates come out in cut order
        let first = &batch.shot_updates[0];
        assert_eq!(first.item, ItemId(1));
        assert_eq!(first.fields.sg_cut_order, Some(1));
        assert_eq!(first.fields.sg_status_list.as_deref(), Some("fin"));
        assert_eq!(first.fields.sg_head_in, Some(993));
        assert!(batch.shot_updates[1].fields.task_template.is_some());

        let cut = batch.cut.unwrap();
        assert_eq!(cut.cut.revision_number, 3);
        assert_eq!(cut.cut.duration, 96);
        assert_eq!(cut.cut.timecode_start.as_deref(), Some("01:00:00:00"));
        assert_eq!(cut.items[1].code, "sh020");
        assert_eq!(tracking.entities_of_type(SHOT_TYPE).count(), 2);
        assert_eq!(batch.publish_targets.len(), 2);
    }

    #[test]
    fn test_ambiguous_shot_withholds_cut() {
        let sequence = sequence();
        let plan = plan(&sequence);
        let mut tracking = MemoryTracking::new();
        let parent = tracking.add_entity(SHOT_PARENT_TYPE, "reel1", None);
        tracking.add_entity(SHOT_TYPE, "sh020", Some(&parent));
        tracking.add_entity(SHOT_TYPE, "sh020", Some(&parent));

        let mut ctx = RunContext::new();
        let batch = ExportAssembler::new(&ShotUpdateSettings::default())
            .assemble(&sequence, &plan, &mut ctx, &mut tracking.collaborators())
            .unwrap();

        assert_eq!(batch.shot_updates.len(), 1);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].name, "sh020");
        assert!(batch.failures[0].message.contains("Ambiguous Shot"));
        assert!(batch.cut.is_none());
    }

    #[test]
    fn test_cut_creation_can_be_disabled() {
        let sequence = sequence();
        let plan = plan(&sequence);
        let mut tracking = MemoryTracking::new();
        let settings = ShotUpdateSettings {
            create_cut: false,
            ..Default::default()
        };

        let mut ctx = RunContext::new();
        let batch = ExportAssembler::new(&settings)
            .assemble(&sequence, &plan, &mut ctx, &mut tracking.collaborators())
            .unwrap();
        assert!(batch.cut.is_none());
        assert_eq!(tracking.entities_of_type(SHOT_PARENT_TYPE).count(), 1);
    }

    #[test]
    fn test_versions_follow_publish_targets() {
        let sequence = sequence();
        let plan = plan(&sequence);
        let mut tracking = MemoryTracking::new();
        let mut ctx = RunContext::new();
        let assembler = ExportAssembler::new(&ShotUpdateSettings::default());
        let batch = assembler
            .assemble(&sequence, &plan, &mut ctx, &mut tracking.collaborators())
            .unwrap();

        let rendered = vec![
            RenderedMedia::new(ItemId(2), "/renders/reel1/sh020_v001.mov"),
            RenderedMedia::new(ItemId(1), "/renders/reel1/sh010_v001.mov"),
        ];
        let versions = assembler.versions(&plan, &batch, &rendered).unwrap();
        assert_eq!(versions.len(), 2);

        let sh020 = &versions[0];
        assert_eq!(sh020.code, "Sh020_v001");
        assert_eq!(sh020.entity, batch.shot_updates[1].shot);
        assert_eq!(sh020.sg_path_to_movie, "/renders/reel1/sh020_v001.mov");
        assert_eq!(sh020.cut_order, Some(2));
        assert_eq!((sh020.sg_first_frame, sh020.sg_last_frame), (993, 1056));
        assert_eq!(sh020.frame_count, 64);

        // versions reach their cut items through the cut order
        let cut = batch.cut.as_ref().unwrap();
        let created_cut = tracking.create_cut(&cut.cut);
        let cut_items = tracking.batch_create(&cut.batch_requests(&created_cut)).unwrap();
        let created: Vec<(VersionData, EntityRef)> = versions
            .iter()
            .map(|version| (version.clone(), tracking.create_version(version)))
            .collect();
        let links = cut.version_links(&cut_items, &created);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].cut_item, cut_items[1]);
        assert_eq!(links[0].version, created[0].1);
        tracking.link_versions(&links).unwrap();
        assert_eq!(tracking.version_links().len(), 2);
    }

    #[test]
    fn test_versions_skip_failed_items() {
        let sequence = sequence();
        let plan = plan(&sequence);
        let mut tracking = MemoryTracking::new();
        let parent = tracking.add_entity(SHOT_PARENT_TYPE, "reel1", None);
        tracking.add_entity(SHOT_TYPE, "sh020", Some(&parent));
        tracking.add_entity(SHOT_TYPE, "sh020", Some(&parent));

        let mut ctx = RunContext::new();
        let assembler = ExportAssembler::new(&ShotUpdateSettings::default());
        let batch = assembler
            .assemble(&sequence, &plan, &mut ctx, &mut tracking.collaborators())
            .unwrap();
        let rendered = vec![
            RenderedMedia::new(ItemId(1), "sh010.mov"),
            RenderedMedia::new(ItemId(2), "sh020.mov"),
        ];
        let versions = assembler.versions(&plan, &batch, &rendered).unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].code, "Sh010");

        let unknown = vec![RenderedMedia::new(ItemId(9), "sh090.mov")];
        let err = assembler.versions(&plan, &batch, &unknown).unwrap_err();
        assert!(matches!(err, CutsyncError::Precondition { .. }));
    }

    #[test]
    fn test_thumbnail_failures_are_warnings() {
        let sequence = sequence();
        let plan = plan(&sequence);
        let mut tracking = MemoryTracking::new();
        tracking.set_fail_thumbnails(true);

        let mut ctx = RunContext::new();
        let batch = ExportAssembler::new(&ShotUpdateSettings::default())
            .assemble(&sequence, &plan, &mut ctx, &mut tracking.collaborators())
            .unwrap();

        assert!(batch.is_complete());
        assert!(batch.cut.is_some());
        // one for the shot parent, one per shot
        assert_eq!(batch.warnings.len(), 3);
    }
}
