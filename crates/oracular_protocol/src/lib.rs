//! Shared data model for the Oracular harvester.
//!
//! The harvester crates exchange three record shapes: the raw per-tag card
//! payload returned by the remote API, the canonical deduplicated card record,
//! and the checkpoint that makes a multi-hour harvest resumable. All three
//! live here so the client, store, and sink crates agree on one schema.

pub mod defaults;
pub mod taxonomy;
pub mod types;

pub use taxonomy::load_taxonomy;
pub use types::{CanonicalCard, CardPayload, Checkpoint, RawCard};
