//! cutsync Timeline Model
//!
//! Defines the editorial data the cut engine reads:
//! - **Sequence:** tracks sharing a frame rate, format, and start timecode
//! - **Track:** an ordered run of non-overlapping track items
//! - **TrackItem:** a placed piece of media with timeline and source ranges
//!
//! All frame numbers are integers and all ranges are inclusive of their
//! out frame.

pub mod document;
pub mod error;
pub mod item;
pub mod sequence;
pub mod timecode;
pub mod track;

pub use document::*;
pub use error::*;
pub use item::*;
pub use sequence::*;
pub use timecode::*;
pub use track::*;
