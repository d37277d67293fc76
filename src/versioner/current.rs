//! Current-state pointer management.
//!
//! An entity points at its active state through a single `CURRENT` edge.
//! Installing a new state retires the old one: the new state links back to
//! it with `PREVIOUS`, its `HAS_STATE` edge is closed with `endDate`, and
//! the old `CURRENT` edge is removed. `HAS_STATE` edges are never deleted.

use crate::error::{Result, VersionerError};
use crate::graph::{GraphRead, GraphTransaction, Relationship};
use crate::types::{
    Direction, NodeId, Timestamp, CURRENT_TYPE, DATE_PROP, END_DATE_PROP, HAS_STATE_TYPE,
    PREVIOUS_TYPE,
};
use std::collections::HashSet;
use tracing::{debug, warn};

/// All outgoing `CURRENT` edges of `entity`. Zero or one unless the graph
/// was corrupted upstream.
pub fn current_edges<G>(graph: &G, entity: NodeId) -> Result<Vec<Relationship>>
where
    G: GraphRead + ?Sized,
{
    graph.relationships(entity, Direction::Outgoing, Some(CURRENT_TYPE))
}

/// The entity's `CURRENT` edge, if it has a state.
pub fn current_edge<G>(graph: &G, entity: NodeId) -> Result<Option<Relationship>>
where
    G: GraphRead + ?Sized,
{
    Ok(current_edges(graph, entity)?.into_iter().next())
}

/// Read the `date` property of a history edge.
pub fn edge_date(rel: &Relationship) -> Result<Timestamp> {
    rel.property(DATE_PROP)
        .and_then(|v| v.as_int())
        .map(Timestamp)
        .ok_or_else(|| VersionerError::InvalidProperty {
            key: DATE_PROP.to_string(),
            reason: format!("{} relationship {} has no integer date", rel.rel_type, rel.id),
        })
}

/// Make `new_state` the current state of `entity` as of `at`, retiring
/// every existing current state.
///
/// Must run inside one transaction: a failure part-way leaves the graph
/// half-rewired until the transaction is rolled back.
pub fn promote_to_current<T>(
    tx: &mut T,
    entity: NodeId,
    new_state: NodeId,
    at: Timestamp,
) -> Result<()>
where
    T: GraphTransaction + ?Sized,
{
    let existing = current_edges(&*tx, entity)?;
    if existing.len() > 1 {
        warn!(
            entity = %entity,
            count = existing.len(),
            "entity has more than one current state, retiring all of them"
        );
    }

    for current in existing {
        retire(tx, &current, new_state, at)?;
    }

    let current = tx.create_relationship(entity, new_state, CURRENT_TYPE)?;
    tx.set_relationship_property(current, DATE_PROP, at.into())?;

    let has_state = tx.create_relationship(entity, new_state, HAS_STATE_TYPE)?;
    tx.set_relationship_property(has_state, DATE_PROP, at.into())?;

    Ok(())
}

fn retire<T>(tx: &mut T, current: &Relationship, new_state: NodeId, at: Timestamp) -> Result<()>
where
    T: GraphTransaction + ?Sized,
{
    let old_state = current.end;
    let old_date = edge_date(current)?;

    let previous = tx.create_relationship(new_state, old_state, PREVIOUS_TYPE)?;
    tx.set_relationship_property(previous, DATE_PROP, old_date.into())?;

    for has_state in tx.relationships(old_state, Direction::Incoming, Some(HAS_STATE_TYPE))? {
        tx.set_relationship_property(has_state.id, END_DATE_PROP, at.into())?;
    }

    tx.delete_relationship(current.id)?;

    debug!(
        entity = %current.start,
        old_state = %old_state,
        new_state = %new_state,
        "retired current state"
    );
    Ok(())
}

/// Check that `state` belongs to the history of `entity`.
///
/// A state is linked when `entity` holds a `HAS_STATE` edge to it, or when it
/// is reachable from the entity's current state along `PREVIOUS` edges.
pub fn check_linked<G>(graph: &G, entity: NodeId, state: NodeId) -> Result<()>
where
    G: GraphRead + ?Sized,
{
    let owners = graph.relationships(state, Direction::Incoming, Some(HAS_STATE_TYPE))?;
    if owners.iter().any(|r| r.start == entity) {
        return Ok(());
    }
    if let Some(other) = owners.first() {
        return Err(VersionerError::StateOwnedByOtherEntity {
            entity,
            state,
            owner: other.start,
        });
    }

    let mut visited = HashSet::new();
    let mut frontier: Vec<NodeId> = current_edges(graph, entity)?
        .iter()
        .map(|r| r.end)
        .collect();

    while let Some(node) = frontier.pop() {
        if node == state {
            return Ok(());
        }
        if !visited.insert(node) {
            continue;
        }
        for previous in graph.relationships(node, Direction::Outgoing, Some(PREVIOUS_TYPE))? {
            frontier.push(previous.end);
        }
    }

    Err(VersionerError::StateNotLinked { entity, state })
}
