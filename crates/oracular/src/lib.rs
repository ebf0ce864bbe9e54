//! Oracular: a resumable, tag-driven card database harvester.
//!
//! The binary walks a taxonomy of functional tags, runs one paginated search
//! per tag against the Scryfall API, merges the results into a deduplicated
//! card set, and checkpoints after every tag so an interrupted run resumes
//! instead of restarting.

pub mod cancel;
pub mod harvest;
