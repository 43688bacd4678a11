//! Per-run state.
//!
//! A [`RunContext`] is created for one export run and threaded through every
//! call that resolves tracking entities. Its caches are cleared whenever the
//! caller signals the first item of a new run.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use cutsync_common::CutsyncResult;

use crate::collaborators::{unique_match, Collaborators, EntityRef, ThumbnailSource};
use crate::warning::ExportWarning;

/// Entity type shots are filed under.
pub const SHOT_PARENT_TYPE: &str = "Sequence";
pub const SHOT_TYPE: &str = "Shot";
pub const TASK_TEMPLATE_TYPE: &str = "TaskTemplate";

/// An entity found or created through a collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub entity: EntityRef,
    pub created: bool,

    /// Set when the entity was resolved but its thumbnail upload failed.
    pub warning: Option<ExportWarning>,
}

#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: String,
    started_at: DateTime<Utc>,
    items_processed: usize,
    parents: HashMap<String, EntityRef>,
    shots: HashMap<(u64, String), EntityRef>,
    templates: HashMap<String, Option<EntityRef>>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    pub fn new() -> Self {
        let started_at = Utc::now();
        Self {
            run_id: run_id_for(started_at),
            started_at,
            items_processed: 0,
            parents: HashMap::new(),
            shots: HashMap::new(),
            templates: HashMap::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn items_processed(&self) -> usize {
        self.items_processed
    }

    /// Mark the start of an item. The first item of a run discards every
    /// cached lookup and starts a new run id.
    pub fn begin_item(&mut self, first_of_run: bool) {
        if first_of_run {
            self.started_at = Utc::now();
            self.run_id = run_id_for(self.started_at);
            self.items_processed = 0;
            self.parents.clear();
            self.shots.clear();
            self.templates.clear();
            tracing::debug!("Starting export run {}", self.run_id);
        }
        self.items_processed += 1;
    }

    /// Find or create the shot parent named `name`. Fails when more than
    /// one exists.
    pub fn resolve_shot_parent(
        &mut self,
        name: &str,
        thumbnail: &ThumbnailSource,
        collab: &mut Collaborators<'_>,
    ) -> CutsyncResult<Resolved> {
        if let Some(entity) = self.parents.get(name) {
            return Ok(Resolved {
                entity: entity.clone(),
                created: false,
                warning: None,
            });
        }

        let found = unique_match(SHOT_PARENT_TYPE, name, collab.shots.find_shot_parents(name)?)?;
        let created = found.is_none();
        let entity = match found {
            Some(entity) => entity,
            None => {
                let entity = collab.shots.create_shot_parent(name)?;
                tracing::info!("Created {}", entity.label());
                entity
            }
        };

        let warning = refresh_thumbnail(&entity, thumbnail, collab);
        self.parents.insert(name.to_string(), entity.clone());
        Ok(Resolved {
            entity,
            created,
            warning,
        })
    }

    /// Find or create the shot `name` under `parent`.
    pub fn resolve_shot(
        &mut self,
        name: &str,
        parent: &EntityRef,
        thumbnail: &ThumbnailSource,
        collab: &mut Collaborators<'_>,
    ) -> CutsyncResult<Resolved> {
        let key = (parent.id, name.to_string());
        if let Some(entity) = self.shots.get(&key) {
            return Ok(Resolved {
                entity: entity.clone(),
                created: false,
                warning: None,
            });
        }

        let found = unique_match(SHOT_TYPE, name, collab.shots.find_shots(name, parent)?)?;
        let created = found.is_none();
        let entity = match found {
            Some(entity) => entity,
            None => {
                let entity = collab.shots.create_shot(name, parent)?;
                tracing::info!("Created {} under {}", entity.label(), parent.label());
                entity
            }
        };

        let warning = refresh_thumbnail(&entity, thumbnail, collab);
        self.shots.insert(key, entity.clone());
        Ok(Resolved {
            entity,
            created,
            warning,
        })
    }

    /// Look up the shot task template `code`. A template that does not
    /// exist leaves the shot's template unset.
    pub fn resolve_task_template(
        &mut self,
        code: &str,
        collab: &mut Collaborators<'_>,
    ) -> CutsyncResult<Option<EntityRef>> {
        if let Some(entity) = self.templates.get(code) {
            return Ok(entity.clone());
        }

        let found = collab.templates.find_task_templates(SHOT_TYPE, code)?;
        let entity = unique_match(TASK_TEMPLATE_TYPE, code, found)?;
        if entity.is_none() {
            tracing::warn!("Task template '{}' does not exist", code);
        }
        self.templates.insert(code.to_string(), entity.clone());
        Ok(entity)
    }
}

fn run_id_for(started_at: DateTime<Utc>) -> String {
    format!("run-{}", started_at.format("%Y%m%dT%H%M%S%.3fZ"))
}

fn refresh_thumbnail(
    entity: &EntityRef,
    thumbnail: &ThumbnailSource,
    collab: &mut Collaborators<'_>,
) -> Option<ExportWarning> {
    match collab.thumbnails.upload_thumbnail(entity, thumbnail) {
        Ok(()) => None,
        Err(err) => {
            tracing::info!("Thumbnail for {} was not refreshed: {}", entity.label(), err);
            Some(ExportWarning::ThumbnailFailed {
                entity: entity.label(),
                message: err.to_string(),
            })
        }
    }
}
