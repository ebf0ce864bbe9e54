//! Deduplicating merger.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use oracular_protocol::{CanonicalCard, RawCard};

/// Counters for one merge pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    /// Card identifiers seen for the first time.
    pub new_cards: usize,
    /// Existing cards that gained a tag.
    pub tagged_cards: usize,
}

/// Fold raw per-tag records into the canonical card map.
///
/// The first sighting of a card identifier wins its attributes; later
/// sightings under other tags only union the tag. Deterministic and
/// idempotent: replaying the same records is a no-op.
pub fn merge_raw_cards(
    cards: &mut BTreeMap<String, CanonicalCard>,
    raw: Vec<RawCard>,
) -> MergeStats {
    let mut stats = MergeStats::default();
    for record in raw {
        match cards.entry(record.card.id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(CanonicalCard::from_raw(record));
                stats.new_cards += 1;
            }
            Entry::Occupied(mut slot) => {
                if slot.get_mut().tags.insert(record.tag) {
                    stats.tagged_cards += 1;
                }
            }
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracular_protocol::CardPayload;
    use serde_json::json;

    fn raw(tag: &str, id: &str, name: &str) -> RawCard {
        let mut extra = serde_json::Map::new();
        extra.insert("rarity".to_string(), json!("common"));
        RawCard {
            tag: tag.to_string(),
            card: CardPayload {
                id: id.to_string(),
                name: name.to_string(),
                extra,
            },
        }
    }

    #[test]
    fn overlapping_tags_union_into_one_record() {
        let mut cards = BTreeMap::new();

        let stats = merge_raw_cards(
            &mut cards,
            vec![raw("removal", "a", "Doom Blade"), raw("removal", "b", "Go for the Throat")],
        );
        assert_eq!(stats, MergeStats { new_cards: 2, tagged_cards: 0 });

        let stats = merge_raw_cards(
            &mut cards,
            vec![raw("ramp", "b", "Go for the Throat"), raw("ramp", "c", "Rampant Growth")],
        );
        assert_eq!(stats, MergeStats { new_cards: 1, tagged_cards: 1 });

        assert_eq!(cards.len(), 3);
        assert_eq!(
            cards["b"].tags.iter().collect::<Vec<_>>(),
            ["ramp", "removal"]
        );
        assert_eq!(cards["a"].tags.iter().collect::<Vec<_>>(), ["removal"]);
        assert_eq!(cards["c"].tags.iter().collect::<Vec<_>>(), ["ramp"]);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut once = BTreeMap::new();
        merge_raw_cards(&mut once, vec![raw("ramp", "a", "Cultivate")]);

        let mut twice = once.clone();
        let stats = merge_raw_cards(&mut twice, vec![raw("ramp", "a", "Cultivate")]);

        assert_eq!(stats, MergeStats::default());
        assert_eq!(once, twice);
    }

    #[test]
    fn first_seen_attributes_win() {
        let mut cards = BTreeMap::new();
        merge_raw_cards(&mut cards, vec![raw("removal", "a", "Doom Blade")]);

        let mut conflicting = raw("ramp", "a", "Doom Blade");
        conflicting
            .card
            .extra
            .insert("rarity".to_string(), json!("mythic"));
        merge_raw_cards(&mut cards, vec![conflicting]);

        assert_eq!(cards["a"].attrs["rarity"], json!("common"));
        assert_eq!(cards["a"].tags.len(), 2);
    }
}
