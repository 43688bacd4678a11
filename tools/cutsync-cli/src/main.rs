//! cutsync CLI: inspect editorial timelines and dry-run cut exports.
//!
//! Usage:
//!   cutsync info <PATH>                 Show sequence information
//!   cutsync validate <PATH>             Validate a timeline document
//!   cutsync collate <PATH> --item ID    Show the collation group of an item
//!   cutsync plan <PATH> [OPTIONS]       Plan an export and dry-run the tracking writes
//!   cutsync template <DEFINITION>       Translate and check an export path template

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cutsync_common::logging::init_logging;
use cutsync_common::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "cutsync",
    about = "Editorial cut export planning and shot tracking sync",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show sequence information
    Info {
        /// Path to the timeline document
        path: PathBuf,
    },

    /// Validate a timeline document
    Validate {
        /// Path to the timeline document
        path: PathBuf,
    },

    /// Show the collation group an item belongs to
    Collate {
        /// Path to the timeline document
        path: PathBuf,

        /// Item id
        #[arg(short, long)]
        item: u64,

        #[command(flatten)]
        export: commands::plan::ExportArgs,
    },

    /// Plan an export and dry-run the tracking writes in memory
    Plan {
        /// Path to the timeline document
        path: PathBuf,

        /// Items to export (defaults to the document's export list)
        #[arg(short, long = "item")]
        items: Vec<u64>,

        #[command(flatten)]
        export: commands::plan::ExportArgs,

        /// Skip the cut and cut item records
        #[arg(long)]
        no_cut: bool,

        /// Rendered media to register as a version, e.g. 1=/renders/sh010_v001.mov
        #[arg(long = "rendered", value_name = "ITEM=PATH")]
        rendered: Vec<String>,
    },

    /// Translate a pipeline path template and check its tokens
    Template {
        /// Template definition, e.g. "{Sequence}/{Shot}/{name}.{SEQ}.exr"
        definition: String,

        /// Frame-number key and its padding, e.g. SEQ=4
        #[arg(long = "seq-key")]
        seq_keys: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?,
        None => AppConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    init_logging(&config.logging);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid config: {e}"))?;

    match cli.command {
        Commands::Info { path } => commands::info::run(path),
        Commands::Validate { path } => commands::validate::run(path),
        Commands::Collate { path, item, export } => {
            commands::collate::run(path, item, export.apply(config.export))
        }
        Commands::Plan {
            path,
            items,
            export,
            no_cut,
            rendered,
        } => {
            let mut shot_update = config.shot_update;
            if no_cut {
                shot_update.create_cut = false;
            }
            commands::plan::run(
                path,
                items,
                &rendered,
                export.apply(config.export),
                shot_update,
            )
        }
        Commands::Template {
            definition,
            seq_keys,
        } => commands::template::run(&definition, &seq_keys, &config.templates),
    }
}
