//! In-memory tracking service for dry runs and tests.

use cutsync_common::{CutsyncError, CutsyncResult};
use serde::Serialize;

use crate::collaborators::{
    Collaborators, EntityRef, ShotResolver, TaskTemplateResolver, ThumbnailSource,
    ThumbnailUploader,
};
use crate::context::{SHOT_PARENT_TYPE, SHOT_TYPE, TASK_TEMPLATE_TYPE};
use crate::cut_batch::{BatchRequest, CutData, VersionLink, CUT_ITEM_TYPE, CUT_TYPE};
use crate::version::{VersionData, VERSION_TYPE};

/// An entity held by [`MemoryTracking`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredEntity {
    pub entity: EntityRef,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<u32>,
}

#[derive(Debug, Default)]
struct EntityStore {
    next_id: u64,
    entities: Vec<StoredEntity>,
}

impl EntityStore {
    fn insert(
        &mut self,
        entity_type: &str,
        code: &str,
        parent: Option<&EntityRef>,
        revision: Option<u32>,
    ) -> EntityRef {
        self.next_id += 1;
        let entity = EntityRef::new(entity_type, self.next_id).with_name(code);
        self.entities.push(StoredEntity {
            entity: entity.clone(),
            code: code.to_string(),
            parent: parent.cloned(),
            revision,
        });
        entity
    }

    fn find(&self, entity_type: &str, code: &str, parent: Option<&EntityRef>) -> Vec<EntityRef> {
        self.entities
            .iter()
            .filter(|stored| stored.entity.entity_type == entity_type && stored.code == code)
            .filter(|stored| parent.map_or(true, |p| stored.parent.as_ref() == Some(p)))
            .map(|stored| stored.entity.clone())
            .collect()
    }
}

impl ShotResolver for EntityStore {
    fn find_shot_parents(&mut self, name: &str) -> CutsyncResult<Vec<EntityRef>> {
        Ok(self.find(SHOT_PARENT_TYPE, name, None))
    }

    fn create_shot_parent(&mut self, name: &str) -> CutsyncResult<EntityRef> {
        Ok(self.insert(SHOT_PARENT_TYPE, name, None, None))
    }

    fn find_shots(&mut self, name: &str, parent: &EntityRef) -> CutsyncResult<Vec<EntityRef>> {
        Ok(self.find(SHOT_TYPE, name, Some(parent)))
    }

    fn create_shot(&mut self, name: &str, parent: &EntityRef) -> CutsyncResult<EntityRef> {
        Ok(self.insert(SHOT_TYPE, name, Some(parent), None))
    }

    fn latest_cut_revision(&mut self, code: &str, parent: &EntityRef) -> CutsyncResult<Option<u32>> {
        Ok(self
            .entities
            .iter()
            .filter(|stored| stored.entity.entity_type == CUT_TYPE && stored.code == code)
            .filter(|stored| stored.parent.as_ref() == Some(parent))
            .filter_map(|stored| stored.revision)
            .max())
    }
}

#[derive(Debug, Default)]
struct TemplateStore {
    templates: Vec<StoredEntity>,
}

impl TaskTemplateResolver for TemplateStore {
    fn find_task_templates(&mut self, _entity_type: &str, code: &str) -> CutsyncResult<Vec<EntityRef>> {
        Ok(self
            .templates
            .iter()
            .filter(|stored| stored.code == code)
            .map(|stored| stored.entity.clone())
            .collect())
    }
}

#[derive(Debug, Default)]
struct ThumbnailLog {
    fail: bool,
    uploads: Vec<(EntityRef, ThumbnailSource)>,
}

impl ThumbnailUploader for ThumbnailLog {
    fn upload_thumbnail(&mut self, entity: &EntityRef, source: &ThumbnailSource) -> CutsyncResult<()> {
        if self.fail {
            return Err(CutsyncError::tracking(format!(
                "no image available for {}",
                source.name
            )));
        }
        self.uploads.push((entity.clone(), source.clone()));
        Ok(())
    }
}

/// Tracking service that lives entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryTracking {
    store: EntityStore,
    templates: TemplateStore,
    thumbnails: ThumbnailLog,
    version_links: Vec<VersionLink>,
}

impl MemoryTracking {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow all three collaborators for one run.
    pub fn collaborators(&mut self) -> Collaborators<'_> {
        Collaborators {
            shots: &mut self.store,
            templates: &mut self.templates,
            thumbnails: &mut self.thumbnails,
        }
    }

    /// Seed an entity. Task templates go to the template store.
    pub fn add_entity(&mut self, entity_type: &str, code: &str, parent: Option<&EntityRef>) -> EntityRef {
        if entity_type == TASK_TEMPLATE_TYPE {
            let id = self.templates.templates.len() as u64 + 1;
            let entity = EntityRef::new(TASK_TEMPLATE_TYPE, id).with_name(code);
            self.templates.templates.push(StoredEntity {
                entity: entity.clone(),
                code: code.to_string(),
                parent: None,
                revision: None,
            });
            return entity;
        }
        self.store.insert(entity_type, code, parent, None)
    }

    /// Seed an existing cut revision.
    pub fn add_cut(&mut self, code: &str, parent: &EntityRef, revision: u32) -> EntityRef {
        self.store.insert(CUT_TYPE, code, Some(parent), Some(revision))
    }

    pub fn set_fail_thumbnails(&mut self, fail: bool) {
        self.thumbnails.fail = fail;
    }

    /// Create the Cut described by `cut`.
    pub fn create_cut(&mut self, cut: &CutData) -> EntityRef {
        self.store
            .insert(CUT_TYPE, &cut.code, Some(&cut.entity), Some(cut.revision_number))
    }

    /// Apply a batch of create requests, all or nothing.
    pub fn batch_create(&mut self, requests: &[BatchRequest]) -> CutsyncResult<Vec<EntityRef>> {
        if let Some(bad) = requests.iter().find(|r| r.request_type != "create") {
            return Err(CutsyncError::tracking(format!(
                "unsupported batch request type '{}'",
                bad.request_type
            )));
        }
        Ok(requests
            .iter()
            .map(|request| {
                self.store.insert(
                    &request.entity_type,
                    &request.data.code,
                    request.data.cut.as_ref(),
                    None,
                )
            })
            .collect())
    }

    /// Create a Version filed under its shot.
    pub fn create_version(&mut self, version: &VersionData) -> EntityRef {
        self.store
            .insert(VERSION_TYPE, &version.code, Some(&version.entity), None)
    }

    /// Point CutItems at their versions. Both sides must already exist.
    pub fn link_versions(&mut self, links: &[VersionLink]) -> CutsyncResult<()> {
        for link in links {
            for (entity, entity_type) in [(&link.cut_item, CUT_ITEM_TYPE), (&link.version, VERSION_TYPE)] {
                let known = self
                    .store
                    .entities
                    .iter()
                    .any(|stored| &stored.entity == entity && stored.entity.entity_type == entity_type);
                if !known {
                    return Err(CutsyncError::tracking(format!(
                        "cannot link unknown {}",
                        entity.label()
                    )));
                }
            }
        }
        self.version_links.extend_from_slice(links);
        Ok(())
    }

    pub fn version_links(&self) -> &[VersionLink] {
        &self.version_links
    }

    pub fn entities(&self) -> &[StoredEntity] {
        &self.store.entities
    }

    pub fn entities_of_type<'a>(&'a self, entity_type: &'a str) -> impl Iterator<Item = &'a StoredEntity> + 'a {
        self.store
            .entities
            .iter()
            .filter(move |stored| stored.entity.entity_type == entity_type)
    }

    pub fn uploads(&self) -> &[(EntityRef, ThumbnailSource)] {
        &self.thumbnails.uploads
    }
}
