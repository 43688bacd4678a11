//! Validate a timeline document.

use std::path::PathBuf;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating timeline at: {}", path.display());

    let document = super::load_timeline(&path)?;
    let sequence = &document.sequence;
    println!("  Sequence: {}", sequence.name);
    println!("  Video tracks: {}", sequence.video_tracks().count());
    println!("  Audio tracks: {}", sequence.audio_tracks().count());
    println!("  Video items: {}", sequence.video_items().len());

    let issues = document.validate();
    if issues.is_empty() {
        println!("\nTimeline is valid.");
        return Ok(());
    }

    println!("\nValidation issues:");
    for issue in &issues {
        println!("  - {issue}");
    }
    anyhow::bail!("{} issue(s) found", issues.len())
}
