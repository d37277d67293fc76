//! Property graph collaborator.
//!
//! The versioning engine only talks to the graph through [`GraphRead`] and
//! [`GraphTransaction`]. Any ACID store can implement them; this module also
//! ships [`Graph`], an in-memory property graph with serialized write
//! transactions and optional on-disk snapshots.
//!
//! # Example
//!
//! ```ignore
//! let graph = Graph::in_memory();
//!
//! let entity = graph.write(|tx| {
//!     let entity = tx.create_node(&["Entity".to_string()])?;
//!     tx.set_properties(entity, &props)?;
//!     Ok(entity)
//! })?;
//! ```

mod memory;
mod storage;

pub use memory::{Graph, GraphConfig, GraphData, Transaction};

use crate::error::Result;
use crate::types::{Direction, NodeId, Properties, RelId, Value};
use serde::{Deserialize, Serialize};

/// A node with its labels and properties.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub labels: Vec<String>,
    pub properties: Properties,
}

impl Node {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// A directed, typed relationship between two nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelId,
    pub rel_type: String,
    pub start: NodeId,
    pub end: NodeId,
    pub properties: Properties,
}

impl Relationship {
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// Read access to a property graph.
pub trait GraphRead {
    /// Fetch a node's labels and properties.
    fn node(&self, id: NodeId) -> Result<Node>;

    /// Fetch a relationship.
    fn relationship(&self, id: RelId) -> Result<Relationship>;

    /// Relationships attached to `node` in the given direction, optionally
    /// restricted to one type. Ordered by creation.
    fn relationships(
        &self,
        node: NodeId,
        direction: Direction,
        rel_type: Option<&str>,
    ) -> Result<Vec<Relationship>>;

    fn has_label(&self, node: NodeId, label: &str) -> Result<bool> {
        Ok(self.node(node)?.has_label(label))
    }
}

/// Mutating access to a property graph, scoped to one atomic transaction.
///
/// Implementations must give read-your-writes visibility within the
/// transaction and must discard every effect if it does not commit.
pub trait GraphTransaction: GraphRead {
    /// Create a node carrying `labels` and no properties.
    fn create_node(&mut self, labels: &[String]) -> Result<NodeId>;

    /// Assign every entry of `properties` onto the node, replacing same-named keys.
    fn set_properties(&mut self, node: NodeId, properties: &Properties) -> Result<()>;

    /// Create a relationship `from -> to` with no properties.
    fn create_relationship(&mut self, from: NodeId, to: NodeId, rel_type: &str) -> Result<RelId>;

    fn set_relationship_property(&mut self, rel: RelId, key: &str, value: Value) -> Result<()>;

    fn delete_relationship(&mut self, rel: RelId) -> Result<()>;
}
