//! Export path templates.
//!
//! Pipeline path templates use their own field names (`{Sequence}`,
//! `{Shot}`, `{SEQ}`...). Before a path can be handed to the host exporter
//! it is translated to the host's tokens and checked for leftovers. An
//! unknown token aborts the run.

use std::collections::BTreeSet;

use cutsync_common::{CutsyncError, CutsyncResult, TemplateSettings};

/// Tokens the host exporter resolves itself.
pub const HOST_EXPORT_TOKENS: &[&str] = &[
    "ampm",
    "binpath",
    "clip",
    "day",
    "event",
    "ext",
    "filebase",
    "fileext",
    "filehead",
    "filename",
    "filepadding",
    "fullbinpath",
    "fullday",
    "fullmonth",
    "hiero_version",
    "hour12",
    "hour24",
    "minute",
    "month",
    "project",
    "projectroot",
    "second",
    "sequence",
    "shot",
    "tag",
    "timestamp",
    "track",
    "user",
    "version",
    "year",
];

/// Token added by the exporter itself for pipeline version strings.
pub const TK_VERSION_TOKEN: &str = "tk_version";

const FIELD_MAPPING: &[(&str, &str)] = &[
    ("{Sequence}", "{sequence}"),
    ("{Shot}", "{shot}"),
    ("{name}", "{clip}"),
];

/// A frame-number field such as `{SEQ}`, rendered as `#` padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceKey {
    pub name: String,
    pub padding: usize,
}

impl SequenceKey {
    pub fn new(name: impl Into<String>, padding: usize) -> Self {
        Self {
            name: name.into(),
            padding,
        }
    }

    fn hashes(&self) -> String {
        "#".repeat(self.padding.max(1))
    }
}

/// Translate a pipeline template definition into a host export path.
pub fn translate_template(definition: &str, sequence_keys: &[SequenceKey]) -> String {
    let mut translated = definition.to_string();
    for (from, to) in FIELD_MAPPING {
        translated = translated.replace(from, to);
    }
    for key in sequence_keys {
        translated = translated.replace(&format!("{{{}}}", key.name), &key.hashes());
    }
    translated
}

/// The `{token}` names used in `path`, in order of appearance.
pub fn template_tokens(path: &str) -> CutsyncResult<Vec<&str>> {
    let mut tokens = vec![];
    let mut open: Option<usize> = None;

    for (index, ch) in path.char_indices() {
        match (ch, open) {
            ('{', None) => open = Some(index),
            ('{', Some(_)) => {
                return Err(CutsyncError::config(format!(
                    "nested '{{' at byte {index} in template '{path}'"
                )))
            }
            ('}', Some(start)) => {
                let token = &path[start + 1..index];
                if token.is_empty() {
                    return Err(CutsyncError::config(format!(
                        "empty token in template '{path}'"
                    )));
                }
                tokens.push(token);
                open = None;
            }
            ('}', None) => {
                return Err(CutsyncError::config(format!(
                    "unmatched '}}' at byte {index} in template '{path}'"
                )))
            }
            _ => {}
        }
    }

    if open.is_some() {
        return Err(CutsyncError::config(format!(
            "unclosed '{{' in template '{path}'"
        )));
    }
    Ok(tokens)
}

/// Checks translated paths against the tokens the exporter can resolve.
#[derive(Debug, Clone)]
pub struct TemplateValidator {
    known: BTreeSet<String>,
}

impl TemplateValidator {
    pub fn new(settings: &TemplateSettings) -> Self {
        let known = HOST_EXPORT_TOKENS
            .iter()
            .copied()
            .chain(std::iter::once(TK_VERSION_TOKEN))
            .map(str::to_string)
            .chain(
                settings
                    .custom_template_fields
                    .iter()
                    .map(|field| field.keyword.clone()),
            )
            .collect();
        Self { known }
    }

    pub fn is_known(&self, token: &str) -> bool {
        self.known.contains(token)
    }

    /// Fail on the first token the exporter would leave unresolved.
    pub fn validate(&self, path: &str) -> CutsyncResult<()> {
        if let Some(unknown) = template_tokens(path)?
            .into_iter()
            .find(|token| !self.is_known(token))
        {
            return Err(CutsyncError::config(format!(
                "template '{path}' contains unknown token {{{unknown}}}"
            )));
        }
        Ok(())
    }
}

/// Translate then validate.
pub fn validate_template(
    definition: &str,
    sequence_keys: &[SequenceKey],
    settings: &TemplateSettings,
) -> CutsyncResult<String> {
    let translated = translate_template(definition, sequence_keys);
    TemplateValidator::new(settings).validate(&translated)?;
    tracing::debug!("Translated template '{}' to '{}'", definition, translated);
    Ok(translated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutsync_common::CustomTemplateField;

    #[test]
    fn test_translate_maps_fields_and_sequence_keys() {
        let translated = translate_template(
            "sequences/{Sequence}/{Shot}/editorial/{name}_v{version}.{SEQ}.exr",
            &[SequenceKey::new("SEQ", 4)],
        );
        assert_eq!(
            translated,
            "sequences/{sequence}/{shot}/editorial/{clip}_v{version}.####.exr"
        );
    }

    #[test]
    fn test_unpadded_sequence_key_is_single_hash() {
        assert_eq!(translate_template("{SEQ}", &[SequenceKey::new("SEQ", 0)]), "#");
    }

    #[test]
    fn test_leftover_field_is_a_config_error() {
        let err = validate_template(
            "{Sequence}/{Shot}/{Step}/{name}.{ext}",
            &[],
            &TemplateSettings::default(),
        )
        .unwrap_err();
        assert!(err.is_fatal_to_run());
        assert!(err.to_string().contains("{Step}"));
    }

    #[test]
    fn test_custom_fields_and_tk_version_are_known() {
        let settings = TemplateSettings {
            custom_template_fields: vec![CustomTemplateField {
                keyword: "Step".to_string(),
                description: "pipeline step".to_string(),
            }],
        };
        let translated =
            validate_template("{Shot}/{Step}/{name}_{tk_version}.{ext}", &[], &settings).unwrap();
        assert_eq!(translated, "{shot}/{Step}/{clip}_{tk_version}.{ext}");
    }

    #[test]
    fn test_token_parsing_rejects_malformed_braces() {
        assert!(template_tokens("{shot").is_err());
        assert!(template_tokens("shot}").is_err());
        assert!(template_tokens("{sh{ot}}").is_err());
        assert!(template_tokens("{}").is_err());
        assert_eq!(template_tokens("a/{shot}/{clip}").unwrap(), vec!["shot", "clip"]);
    }
}
