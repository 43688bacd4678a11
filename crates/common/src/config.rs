//! Application configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{CutsyncError, CutsyncResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Per-run export settings (collation, handles, start frame, mode).
    pub export: ExportSettings,

    /// What gets written back to Shot and Cut records.
    pub shot_update: ShotUpdateSettings,

    /// Export path template settings.
    pub templates: TemplateSettings,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Static per-run export configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Collate items on other tracks that overlap in time.
    pub collate_by_overlap: bool,

    /// Collate items sharing the target's name.
    pub collate_by_name: bool,

    /// Collate every video item in the sequence. Takes priority over the
    /// other two flags.
    pub collate_whole_sequence: bool,

    /// Uniform handle length in frames (0 = no handles).
    pub handle_length: u32,

    /// Explicit first frame for the rendered media.
    pub custom_start_frame: Option<i64>,

    /// The custom start frame is the first handle frame, not the first
    /// cut frame.
    pub custom_start_includes_handles: bool,

    /// Rendered media is trimmed to the cut plus handles (`true`) or holds
    /// the full source range (`false`).
    pub cut_length_export: bool,

    /// The renderer pads missing pre-roll with black frames.
    pub pads_with_black: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            collate_by_overlap: false,
            collate_by_name: false,
            collate_whole_sequence: false,
            handle_length: 0,
            custom_start_frame: None,
            custom_start_includes_handles: true,
            cut_length_export: true,
            pads_with_black: false,
        }
    }
}

impl ExportSettings {
    /// Handle length as a signed frame count for range arithmetic.
    pub fn handles(&self) -> i64 {
        i64::from(self.handle_length)
    }
}

/// Controls which Shot fields are written and how Cut records are created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShotUpdateSettings {
    pub update_head_in: bool,
    pub update_cut_in: bool,
    pub update_cut_out: bool,
    pub update_tail_out: bool,
    pub update_cut_duration: bool,
    pub update_working_duration: bool,

    /// Create a Cut plus one CutItem per shot.
    pub create_cut: bool,

    /// Value of the Cut type field (may be empty).
    pub cut_type: String,

    /// Item tag name -> Shot status code. First matching tag wins.
    pub status_tag_map: Vec<(String, String)>,

    /// Item tag name -> task template code. First matching tag wins.
    pub task_template_map: Vec<(String, String)>,

    /// Template applied when no tag maps to one.
    pub default_task_template: Option<String>,
}

impl Default for ShotUpdateSettings {
    fn default() -> Self {
        Self {
            update_head_in: true,
            update_cut_in: true,
            update_cut_out: true,
            update_tail_out: true,
            update_cut_duration: true,
            update_working_duration: true,
            create_cut: true,
            cut_type: String::new(),
            status_tag_map: vec![
                ("Ready To Start".to_string(), "rdy".to_string()),
                ("In Progress".to_string(), "ip".to_string()),
                ("On Hold".to_string(), "hld".to_string()),
                ("Final".to_string(), "fin".to_string()),
            ],
            task_template_map: vec![],
            default_task_template: None,
        }
    }
}

/// Export path template configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSettings {
    /// Extra `{keyword}` tokens resolvable in export paths.
    pub custom_template_fields: Vec<CustomTemplateField>,
}

/// A user-defined export path token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTemplateField {
    pub keyword: String,
    #[serde(default)]
    pub description: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "cutsync=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load and validate config from an explicit path.
    pub fn load_from(path: impl AsRef<Path>) -> CutsyncResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CutsyncError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configuration that would make a run ambiguous or unresolvable.
    pub fn validate(&self) -> CutsyncResult<()> {
        validate_tag_map("status_tag_map", &self.shot_update.status_tag_map)?;
        validate_tag_map("task_template_map", &self.shot_update.task_template_map)?;

        if let Some(template) = &self.shot_update.default_task_template {
            if template.trim().is_empty() {
                return Err(CutsyncError::config(
                    "default_task_template must not be blank",
                ));
            }
        }

        let mut keywords = HashSet::new();
        for field in &self.templates.custom_template_fields {
            let valid = !field.keyword.is_empty()
                && field
                    .keyword
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return Err(CutsyncError::config(format!(
                    "invalid custom template keyword '{}'",
                    field.keyword
                )));
            }
            if !keywords.insert(field.keyword.as_str()) {
                return Err(CutsyncError::config(format!(
                    "duplicate custom template keyword '{}'",
                    field.keyword
                )));
            }
        }

        Ok(())
    }
}

fn validate_tag_map(label: &str, map: &[(String, String)]) -> CutsyncResult<()> {
    let mut seen = HashSet::new();
    for (tag, value) in map {
        if tag.trim().is_empty() {
            return Err(CutsyncError::config(format!(
                "{label}: empty tag name mapped to '{value}'"
            )));
        }
        if !seen.insert(tag.as_str()) {
            return Err(CutsyncError::config(format!(
                "{label}: tag '{tag}' mapped more than once"
            )));
        }
    }
    Ok(())
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("cutsync").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_shot_preset() {
        let config = AppConfig::default();
        assert!(config.export.custom_start_includes_handles);
        assert!(config.export.cut_length_export);
        assert!(!config.export.collate_by_overlap);
        assert!(!config.export.collate_by_name);
        assert!(!config.export.collate_whole_sequence);
        assert_eq!(config.shot_update.status_tag_map.len(), 4);
        assert_eq!(
            config.shot_update.status_tag_map[3],
            ("Final".to_string(), "fin".to_string())
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let raw = r#"{ "export": { "handle_length": 12, "collate_by_name": true } }"#;
        let config: AppConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.export.handle_length, 12);
        assert!(config.export.collate_by_name);
        assert!(config.export.cut_length_export);
        assert!(config.shot_update.update_head_in);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_duplicate_status_tag_is_rejected() {
        let mut config = AppConfig::default();
        config
            .shot_update
            .status_tag_map
            .push(("Final".to_string(), "omt".to_string()));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("'Final'"));
    }

    #[test]
    fn test_invalid_custom_keyword_is_rejected() {
        let mut config = AppConfig::default();
        config.templates.custom_template_fields.push(CustomTemplateField {
            keyword: "shot code".to_string(),
            description: String::new(),
        });
        assert!(matches!(
            config.validate(),
            Err(CutsyncError::Config { .. })
        ));
    }

    #[test]
    fn test_load_from_missing_file() {
        let path = std::env::temp_dir().join("cutsync_missing_config.json");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(CutsyncError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_load_from_round_trip() {
        let path = std::env::temp_dir().join("cutsync_test_config.json");
        let mut config = AppConfig::default();
        config.export.handle_length = 8;
        config.shot_update.cut_type = "Turnover".to_string();
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.export.handle_length, 8);
        assert_eq!(loaded.shot_update.cut_type, "Turnover");

        std::fs::remove_file(&path).ok();
    }
}
