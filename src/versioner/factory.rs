//! State node creation.

use crate::error::Result;
use crate::graph::GraphTransaction;
use crate::types::{NodeId, Properties};

/// Label set for a new state: the state marker, plus `additional` when it
/// is present and non-empty.
pub fn state_labels(state_label: &str, additional: Option<&str>) -> Vec<String> {
    let mut labels = vec![state_label.to_string()];
    if let Some(label) = additional.filter(|l| !l.is_empty()) {
        labels.push(label.to_string());
    }
    labels
}

/// Create a state node with `labels` and `properties` applied verbatim.
///
/// Touches no relationships.
pub fn create_state<T>(tx: &mut T, labels: &[String], properties: &Properties) -> Result<NodeId>
where
    T: GraphTransaction + ?Sized,
{
    let state = tx.create_node(labels)?;
    tx.set_properties(state, properties)?;
    Ok(state)
}
