//! Harvest progress persistence.
//!
//! The checkpoint file is the only durable state the harvester owns: the set
//! of fully-processed tags plus the canonical card map accumulated so far.
//! Commits are atomic (write-temp-then-rename) so a crash at any point leaves
//! either the previous checkpoint or the new one, never a torn file. Loading
//! is forgiving: a missing or corrupt checkpoint starts the run fresh, since
//! the remote API is always re-fetchable.

mod checkpoint;
mod merge;

pub use checkpoint::CheckpointStore;
pub use merge::{merge_raw_cards, MergeStats};
