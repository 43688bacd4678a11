//! Translate and check an export path template.

use cutsync_common::TemplateSettings;
use cutsync_cut_engine::template::{validate_template, SequenceKey};

fn parse_sequence_key(raw: &str) -> anyhow::Result<SequenceKey> {
    let (name, padding) = raw
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Expected NAME=PADDING, got '{raw}'"))?;
    let padding = padding
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid padding in '{raw}': {e}"))?;
    Ok(SequenceKey::new(name, padding))
}

pub fn run(definition: &str, seq_keys: &[String], settings: &TemplateSettings) -> anyhow::Result<()> {
    let keys = seq_keys
        .iter()
        .map(|raw| parse_sequence_key(raw))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let translated = validate_template(definition, &keys, settings)
        .map_err(|e| anyhow::anyhow!("Template rejected: {e}"))?;
    println!("{translated}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sequence_key() {
        assert_eq!(parse_sequence_key("SEQ=4").unwrap(), SequenceKey::new("SEQ", 4));
        assert!(parse_sequence_key("SEQ").is_err());
        assert!(parse_sequence_key("SEQ=x").is_err());
    }
}
