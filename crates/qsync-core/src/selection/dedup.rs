// ── Deduplication ──

use indexmap::IndexMap;
use indexmap::map::Entry;
use tracing::debug;

use crate::model::{Entity, EntityKey};

/// Drop unnamed entities, then keep the first occurrence of every
/// `(component_name, name)` key. Input order is preserved.
pub fn dedup(entities: Vec<Entity>) -> Vec<Entity> {
    let mut unique: IndexMap<EntityKey, Entity> = IndexMap::with_capacity(entities.len());
    let mut unnamed = 0usize;
    let mut duplicates = 0usize;

    for entity in entities {
        if !entity.is_admissible() {
            unnamed += 1;
            continue;
        }
        match unique.entry(entity.key()) {
            Entry::Vacant(slot) => {
                slot.insert(entity);
            }
            Entry::Occupied(_) => duplicates += 1,
        }
    }

    if unnamed > 0 || duplicates > 0 {
        debug!(unnamed, duplicates, kept = unique.len(), "deduplicated selection");
    }

    unique.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entity(component: &str, name: &str, value: f64) -> Entity {
        Entity {
            name: name.into(),
            component_name: component.into(),
            control_type: "Float".into(),
            value: Some(value),
            ..Entity::default()
        }
    }

    #[test]
    fn first_occurrence_wins() {
        let out = dedup(vec![
            entity("Lobby", "gain", 1.0),
            entity("Stage", "gain", 2.0),
            entity("Lobby", "gain", 3.0),
        ]);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].value, Some(1.0));
        assert_eq!(out[1].component_name, "Stage");
    }

    #[test]
    fn unnamed_entities_are_dropped() {
        let out = dedup(vec![
            entity("Lobby", "", 1.0),
            entity("Lobby", "", 2.0),
            entity("Lobby", "mute", 0.0),
        ]);

        assert_eq!(out, vec![entity("Lobby", "mute", 0.0)]);
    }

    #[test]
    fn order_is_preserved() {
        let out = dedup(vec![
            entity("C", "x", 0.0),
            entity("A", "x", 0.0),
            entity("B", "x", 0.0),
        ]);
        let keys: Vec<String> = out.iter().map(|e| e.key().to_string()).collect();
        assert_eq!(keys, vec!["C:x", "A:x", "B:x"]);
    }
}
