//! Card record and checkpoint types.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One card object as returned by the remote API.
///
/// Only the identifier and display name are modeled; every other field is
/// captured verbatim in `extra` so the harvester never has to chase the
/// remote schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardPayload {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A card payload together with the functional tag it was fetched under.
///
/// Transient: raw records are merged into the canonical map immediately and
/// never persisted on their own.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCard {
    pub tag: String,
    pub card: CardPayload,
}

/// The deduplicated representation of one card in the final database.
///
/// Exactly one canonical record exists per card identifier. Attributes come
/// from the first raw record seen for that identifier; the tag set is the
/// union of every tag whose query matched the card. `BTreeSet` keeps the
/// set sorted so output is reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalCard {
    pub id: String,
    pub name: String,
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub attrs: Map<String, Value>,
}

impl CanonicalCard {
    /// Seed a canonical record from the first raw sighting of a card.
    pub fn from_raw(raw: RawCard) -> Self {
        let RawCard { tag, card } = raw;
        let mut tags = BTreeSet::new();
        tags.insert(tag);
        Self {
            id: card.id,
            name: card.name,
            tags,
            attrs: card.extra,
        }
    }
}

/// Durable record of harvesting progress.
///
/// Invariant: `cards` reflects exactly the union of raw records from
/// `processed_tags`. A tag only enters `processed_tags` in the same durable
/// write that lands its merged records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(default)]
    pub processed_tags: BTreeSet<String>,
    #[serde(default)]
    pub cards: BTreeMap<String, CanonicalCard>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self {
            processed_tags: BTreeSet::new(),
            cards: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }
}

impl Checkpoint {
    pub fn is_processed(&self, tag: &str) -> bool {
        self.processed_tags.contains(tag)
    }
}
