//! Show the collation group of one item.

use std::path::PathBuf;

use cutsync_common::ExportSettings;
use cutsync_cut_engine::collate::{collate, CollateOptions};
use cutsync_cut_engine::CompositeBuilder;
use cutsync_timeline::ItemId;

pub fn run(path: PathBuf, item: u64, export: ExportSettings) -> anyhow::Result<()> {
    let document = super::load_timeline(&path)?;
    let sequence = &document.sequence;
    let target = ItemId(item);

    let options = CollateOptions::from(&export);
    if !options.is_enabled() {
        println!("Collation is disabled; pass --collate-tracks, --collate-names or --collate-sequence.");
        return Ok(());
    }

    let group = collate(sequence, target, options)
        .map_err(|e| anyhow::anyhow!("Failed to collate {target}: {e}"))?;
    let Some(group) = group else {
        println!("{target} is not collated with any other item.");
        return Ok(());
    };

    println!("Collation group for {target}:");
    for id in group.members() {
        let name = sequence.find_item(*id).map_or("?", |item| item.name.as_str());
        let marker = if group.is_hero(*id) { " (hero)" } else { "" };
        println!("  {id} {name}{marker}");
    }

    let composite = CompositeBuilder::new(&export)
        .build(sequence, &group)
        .map_err(|e| anyhow::anyhow!("Failed to build composite: {e}"))?;
    println!("\nComposite '{}':", composite.sequence.name);
    println!("  Offset: {}", composite.offset);
    println!("  Render range: {}-{}", composite.in_time(), composite.out_time());
    if let Some(poster) = composite.sequence.poster_frame {
        println!("  Poster frame: {poster}");
    }
    for conflict in &composite.conflicts {
        println!("  Conflict: {conflict}");
    }

    Ok(())
}
