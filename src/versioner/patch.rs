//! Copy-on-write state derivation.

use super::current::{edge_date, promote_to_current};
use super::factory::create_state;
use super::ReferenceClassifier;
use crate::error::Result;
use crate::graph::{GraphTransaction, Relationship};
use crate::types::{Direction, NodeId, Properties, Timestamp};
use tracing::debug;

/// Field-level union of `base` and `overrides`; keys in `overrides` win.
pub fn merge_properties(base: &Properties, overrides: &Properties) -> Properties {
    let mut merged = base.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Derive a new state from the target of `current`, overlay `overrides`,
/// install it as the entity's current state and carry over the base state's
/// edges to reference nodes.
pub fn create_patched_state<T, C>(
    tx: &mut T,
    classifier: &C,
    overrides: &Properties,
    labels: &[String],
    at: Timestamp,
    current: &Relationship,
) -> Result<NodeId>
where
    T: GraphTransaction + ?Sized,
    C: ReferenceClassifier + ?Sized,
{
    let base = tx.node(current.end)?;
    let entity = current.start;
    // Fail on a malformed edge before anything is written.
    edge_date(current)?;

    let merged = merge_properties(&base.properties, overrides);
    let new_state = create_state(tx, labels, &merged)?;

    promote_to_current(tx, entity, new_state, at)?;
    replay_reference_edges(tx, classifier, base.id, new_state)?;

    Ok(new_state)
}

/// Recreate every outgoing edge of `from` that ends at a reference node as an
/// edge of the same type from `to`. Returns how many edges were replayed.
pub fn replay_reference_edges<T, C>(
    tx: &mut T,
    classifier: &C,
    from: NodeId,
    to: NodeId,
) -> Result<usize>
where
    T: GraphTransaction + ?Sized,
    C: ReferenceClassifier + ?Sized,
{
    let mut replayed = 0;
    for rel in tx.relationships(from, Direction::Outgoing, None)? {
        let target = tx.node(rel.end)?;
        if !classifier.is_reference(&target) {
            continue;
        }

        tx.create_relationship(to, target.id, &rel.rel_type)?;
        replayed += 1;

        debug!(
            rel_type = %rel.rel_type,
            from = %to,
            target = %target.id,
            "replayed reference relationship"
        );
    }
    Ok(replayed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphData, GraphRead};
    use crate::types::Value;
    use crate::versioner::LabelClassifier;

    fn props(pairs: &[(&str, i64)]) -> Properties {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::Int(*v)))
            .collect()
    }

    #[test]
    fn test_merge_is_field_union() {
        let merged = merge_properties(&props(&[("a", 1), ("b", 2)]), &props(&[("b", 3), ("c", 4)]));
        assert_eq!(merged, props(&[("a", 1), ("b", 3), ("c", 4)]));
    }

    #[test]
    fn test_merge_with_empty_overrides() {
        let base = props(&[("a", 1)]);
        assert_eq!(merge_properties(&base, &Properties::new()), base);
    }

    #[test]
    fn test_replay_only_reference_targets() {
        let mut data = GraphData::default();
        let from = data.create_node(&["State".to_string()]).unwrap();
        let to = data.create_node(&["State".to_string()]).unwrap();
        let reference = data.create_node(&["R".to_string()]).unwrap();
        let plain = data.create_node(&["Thing".to_string()]).unwrap();

        data.create_relationship(from, reference, "LIKES").unwrap();
        data.create_relationship(from, plain, "OWNS").unwrap();

        let classifier = LabelClassifier::new("R");
        let replayed = replay_reference_edges(&mut data, &classifier, from, to).unwrap();
        assert_eq!(replayed, 1);

        let out = data.relationships(to, Direction::Outgoing, None).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].rel_type, "LIKES");
        assert_eq!(out[0].end, reference);
    }
}
