//! Shot update payloads.

use cutsync_common::ShotUpdateSettings;
use cutsync_timeline::{Frame, ItemId};
use serde::Serialize;

use crate::collaborators::EntityRef;
use crate::cut_range::CutRangeRecord;

/// Fields written to a Shot. Frame fields are only present when their
/// update toggle is on.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShotFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sg_head_in: Option<Frame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sg_cut_in: Option<Frame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sg_cut_out: Option<Frame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sg_tail_out: Option<Frame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sg_cut_duration: Option<Frame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sg_working_duration: Option<Frame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sg_cut_order: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sg_status_list: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_template: Option<EntityRef>,
}

impl ShotFields {
    pub fn from_record(record: &CutRangeRecord, cut_order: u32, toggles: &ShotUpdateSettings) -> Self {
        let pick = |enabled: bool, value: Frame| enabled.then_some(value);
        Self {
            sg_head_in: pick(toggles.update_head_in, record.head_in),
            sg_cut_in: pick(toggles.update_cut_in, record.cut_in),
            sg_cut_out: pick(toggles.update_cut_out, record.cut_out),
            sg_tail_out: pick(toggles.update_tail_out, record.tail_out),
            sg_cut_duration: pick(toggles.update_cut_duration, record.cut_duration),
            sg_working_duration: pick(toggles.update_working_duration, record.working_duration),
            sg_cut_order: Some(cut_order),
            sg_status_list: None,
            task_template: None,
        }
    }
}

/// One Shot write produced by an export run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShotUpdate {
    pub item: ItemId,
    pub shot: EntityRef,
    pub fields: ShotFields,
}

/// Status code for the first of `tags` present in `map`.
pub fn status_for_tags(tags: &[String], map: &[(String, String)]) -> Option<String> {
    tags.iter()
        .find_map(|tag| map.iter().find(|(name, _)| name == tag))
        .map(|(_, status)| status.clone())
}

/// Task template for the first of `tags` present in `map`, falling back to
/// `default`.
pub fn template_for_tags<'a>(
    tags: &[String],
    map: &'a [(String, String)],
    default: Option<&'a str>,
) -> Option<&'a str> {
    tags.iter()
        .find_map(|tag| map.iter().find(|(name, _)| name == tag))
        .map(|(_, template)| template.as_str())
        .or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CutRangeRecord {
        CutRangeRecord {
            item: ItemId(1),
            group_hero: None,
            head_in: 993,
            tail_out: 1056,
            cut_in: 1001,
            cut_out: 1048,
            cut_duration: 48,
            edit_in: 86_400,
            edit_out: 86_447,
            edit_duration: 48,
            working_duration: 64,
            in_handle: 8,
            out_handle: 8,
        }
    }

    #[test]
    fn test_toggles_control_frame_fields() {
        let toggles = ShotUpdateSettings {
            update_head_in: false,
            update_working_duration: false,
            ..Default::default()
        };
        let fields = ShotFields::from_record(&record(), 3, &toggles);

        assert_eq!(fields.sg_head_in, None);
        assert_eq!(fields.sg_cut_in, Some(1001));
        assert_eq!(fields.sg_tail_out, Some(1056));
        assert_eq!(fields.sg_working_duration, None);
        assert_eq!(fields.sg_cut_order, Some(3));

        let json = serde_json::to_value(&fields).unwrap();
        assert!(json.get("sg_head_in").is_none());
        assert_eq!(json["sg_cut_out"], 1048);
    }

    #[test]
    fn test_status_uses_first_mapped_tag() {
        let map = ShotUpdateSettings::default().status_tag_map;
        let tags = vec!["Editorial".to_string(), "Final".to_string(), "On Hold".to_string()];
        assert_eq!(status_for_tags(&tags, &map), Some("fin".to_string()));
        assert_eq!(status_for_tags(&["Editorial".to_string()], &map), None);
    }

    #[test]
    fn test_template_falls_back_to_default() {
        let map = vec![("Comp".to_string(), "Comp template".to_string())];
        let comp = vec!["Comp".to_string()];
        assert_eq!(template_for_tags(&comp, &map, Some("Basic")), Some("Comp template"));
        assert_eq!(template_for_tags(&[], &map, Some("Basic")), Some("Basic"));
        assert_eq!(template_for_tags(&[], &map, None), None);
    }
}
