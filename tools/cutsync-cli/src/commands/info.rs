//! Show sequence information.

use std::path::PathBuf;

use cutsync_timeline::frames_to_timecode;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let document = super::load_timeline(&path)?;
    let sequence = &document.sequence;

    println!("Sequence: {}", sequence.name);
    println!("  Document version: {}", document.version);
    println!(
        "  Frame rate: {:.3} fps{}",
        sequence.frame_rate.fps(),
        if sequence.drop_frame { " (drop frame)" } else { "" }
    );
    if let Some(format) = &sequence.format {
        println!("  Format: {}x{}", format.width, format.height);
    }
    println!(
        "  Start: {}",
        frames_to_timecode(sequence.start_timecode, sequence.frame_rate, sequence.drop_frame)
    );
    println!("  Duration: {} frames", sequence.duration());
    if !sequence.tags.is_empty() {
        println!("  Tags: {}", sequence.tags.join(", "));
    }

    for track in &sequence.tracks {
        println!("\n  {} ({:?}, {} items)", track.name, track.kind, track.items.len());
        for item in &track.items {
            let retime = if item.is_retimed() {
                format!(" retimed x{}", item.playback_speed)
            } else {
                String::new()
            };
            println!(
                "    {} {:<12} {:>7}-{:<7} src {}-{} handles {}/{}{}",
                item.id,
                item.name,
                item.timeline_in,
                item.timeline_out,
                item.source_in,
                item.source_out,
                item.handle_in_length,
                item.handle_out_length,
                retime
            );
        }
    }

    let export_items = document.items_to_export();
    println!("\n  Items to export: {}", export_items.len());

    Ok(())
}
