//! cutsync Cut Engine
//!
//! Turns an edited sequence into the records a production tracker needs:
//! - **Collation:** group items that represent one shot split across tracks
//! - **Composite:** build an offset sequence per group, extended by handles
//! - **Cut ranges:** head/cut/tail and edit ranges for every exported item
//! - **Assembly:** Shot updates plus one Cut with ordered CutItems
//! - **Versions:** rendered media filed against shots and linked to CutItems
//!
//! This crate is pure computation. Tracking-service lookups go through the
//! collaborator traits in [`collaborators`]; nothing here performs I/O.

pub mod assembler;
pub mod collaborators;
pub mod collate;
pub mod composite;
pub mod context;
pub mod cut_batch;
pub mod cut_range;
pub mod memory;
pub mod ordering;
pub mod planner;
pub mod shot;
pub mod template;
pub mod version;
pub mod warning;

pub use assembler::{ExportAssembler, ExportBatch};
pub use collate::{CollateOptions, CollationGroup};
pub use composite::{CompositeBuilder, CompositeSequence, HEAD_ROOM_OFFSET};
pub use context::RunContext;
pub use cut_range::{CutRangeRecord, RangeCalculator};
pub use planner::{ExportPlan, ExportPlanner};
pub use warning::ExportWarning;
