//! In-memory property graph with serialized write transactions.

use super::storage::SnapshotStorage;
use super::{GraphRead, GraphTransaction, Node, Relationship};
use crate::error::{Result, VersionerError};
use crate::types::{Direction, NodeId, Properties, RelId, Value};
use parking_lot::{Mutex, MutexGuard, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::debug;

/// Graph configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Directory holding the persisted graph. `None` keeps it in memory only.
    pub path: Option<PathBuf>,

    /// Whether to create the graph directory if it doesn't exist.
    pub create_if_missing: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            path: None,
            create_if_missing: true,
        }
    }
}

/// Full contents of a graph: nodes, relationships, adjacency and id counters.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GraphData {
    nodes: BTreeMap<NodeId, Node>,
    relationships: BTreeMap<RelId, Relationship>,
    outgoing: BTreeMap<NodeId, BTreeSet<RelId>>,
    incoming: BTreeMap<NodeId, BTreeSet<RelId>>,
    next_node_id: u64,
    next_rel_id: u64,
}

impl GraphData {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    /// All relationships of one type, ordered by id.
    pub fn relationships_of_type(&self, rel_type: &str) -> Vec<Relationship> {
        self.relationships
            .values()
            .filter(|r| r.rel_type == rel_type)
            .cloned()
            .collect()
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(&id)
            .ok_or(VersionerError::NodeNotFound(id))
    }

    fn ensure_node(&self, id: NodeId) -> Result<()> {
        if self.nodes.contains_key(&id) {
            Ok(())
        } else {
            Err(VersionerError::NodeNotFound(id))
        }
    }
}

impl GraphRead for GraphData {
    fn node(&self, id: NodeId) -> Result<Node> {
        self.nodes
            .get(&id)
            .cloned()
            .ok_or(VersionerError::NodeNotFound(id))
    }

    fn relationship(&self, id: RelId) -> Result<Relationship> {
        self.relationships
            .get(&id)
            .cloned()
            .ok_or(VersionerError::RelationshipNotFound(id))
    }

    fn relationships(
        &self,
        node: NodeId,
        direction: Direction,
        rel_type: Option<&str>,
    ) -> Result<Vec<Relationship>> {
        self.ensure_node(node)?;

        let empty = BTreeSet::new();
        let outgoing = self.outgoing.get(&node).unwrap_or(&empty);
        let incoming = self.incoming.get(&node).unwrap_or(&empty);

        let ids: BTreeSet<RelId> = match direction {
            Direction::Outgoing => outgoing.clone(),
            Direction::Incoming => incoming.clone(),
            Direction::Both => outgoing.union(incoming).copied().collect(),
        };

        Ok(ids
            .into_iter()
            .filter_map(|id| self.relationships.get(&id))
            .filter(|r| rel_type.map_or(true, |t| r.rel_type == t))
            .cloned()
            .collect())
    }
}

impl GraphTransaction for GraphData {
    fn create_node(&mut self, labels: &[String]) -> Result<NodeId> {
        self.next_node_id += 1;
        let id = NodeId(self.next_node_id);

        let mut node_labels: Vec<String> = Vec::with_capacity(labels.len());
        for label in labels {
            if !node_labels.contains(label) {
                node_labels.push(label.clone());
            }
        }

        self.nodes.insert(
            id,
            Node {
                id,
                labels: node_labels,
                properties: Properties::new(),
            },
        );
        Ok(id)
    }

    fn set_properties(&mut self, node: NodeId, properties: &Properties) -> Result<()> {
        let node = self.node_mut(node)?;
        for (key, value) in properties {
            node.properties.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn create_relationship(&mut self, from: NodeId, to: NodeId, rel_type: &str) -> Result<RelId> {
        self.ensure_node(from)?;
        self.ensure_node(to)?;

        self.next_rel_id += 1;
        let id = RelId(self.next_rel_id);

        self.relationships.insert(
            id,
            Relationship {
                id,
                rel_type: rel_type.to_string(),
                start: from,
                end: to,
                properties: Properties::new(),
            },
        );
        self.outgoing.entry(from).or_default().insert(id);
        self.incoming.entry(to).or_default().insert(id);
        Ok(id)
    }

    fn set_relationship_property(&mut self, rel: RelId, key: &str, value: Value) -> Result<()> {
        let relationship = self
            .relationships
            .get_mut(&rel)
            .ok_or(VersionerError::RelationshipNotFound(rel))?;
        relationship.properties.insert(key.to_string(), value);
        Ok(())
    }

    fn delete_relationship(&mut self, rel: RelId) -> Result<()> {
        let relationship = self
            .relationships
            .remove(&rel)
            .ok_or(VersionerError::RelationshipNotFound(rel))?;

        if let Some(ids) = self.outgoing.get_mut(&relationship.start) {
            ids.remove(&rel);
        }
        if let Some(ids) = self.incoming.get_mut(&relationship.end) {
            ids.remove(&rel);
        }
        Ok(())
    }
}

/// An in-memory property graph.
///
/// Writes go through [`Transaction`]s, which are serialized: at most one is
/// open at a time and it works on a staged copy that only becomes visible on
/// commit. Reads see the last committed graph and never block on an open
/// transaction.
///
/// Opening a transaction copies the whole committed graph, and committing a
/// persisted graph rewrites the full snapshot. Both costs grow with the total
/// size of the graph, not with the size of the change.
pub struct Graph {
    /// Graph configuration.
    config: GraphConfig,

    /// Committed graph contents.
    data: RwLock<GraphData>,

    /// On-disk snapshot, when configured with a path.
    storage: Option<SnapshotStorage>,

    /// Held by the open transaction.
    write_lock: Mutex<()>,
}

impl Graph {
    /// Create an empty graph that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            config: GraphConfig::default(),
            data: RwLock::new(GraphData::default()),
            storage: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Open a graph according to `config`.
    ///
    /// With a path, an existing graph directory is loaded, otherwise one is
    /// created when `create_if_missing` is set.
    pub fn open(config: GraphConfig) -> Result<Self> {
        let Some(path) = config.path.clone() else {
            return Ok(Self {
                config,
                ..Self::in_memory()
            });
        };

        let (storage, data) = if SnapshotStorage::exists(&path) {
            SnapshotStorage::open(&path)?
        } else if config.create_if_missing {
            (SnapshotStorage::create(&path)?, GraphData::default())
        } else {
            return Err(VersionerError::NotInitialized);
        };

        debug!(
            path = %path.display(),
            nodes = data.node_count(),
            relationships = data.relationship_count(),
            "opened graph"
        );

        Ok(Self {
            config,
            data: RwLock::new(data),
            storage: Some(storage),
            write_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Begin a write transaction, waiting for any open one to finish.
    pub fn transaction(&self) -> Transaction<'_> {
        let guard = self.write_lock.lock();
        let staged = self.data.read().clone();
        Transaction {
            graph: self,
            _guard: guard,
            staged,
            committed: false,
        }
    }

    /// Run `f` in a transaction, committing if it returns `Ok` and rolling
    /// back otherwise.
    pub fn write<T>(&self, f: impl FnOnce(&mut Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut tx = self.transaction();
        let value = f(&mut tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Run `f` against the committed graph.
    pub fn read<T>(&self, f: impl FnOnce(&GraphData) -> T) -> T {
        let data = self.data.read();
        f(&data)
    }

    pub fn node_count(&self) -> usize {
        self.data.read().node_count()
    }

    pub fn relationship_count(&self) -> usize {
        self.data.read().relationship_count()
    }
}

/// A write transaction on a [`Graph`].
///
/// Dropping the transaction without calling [`Transaction::commit`] discards
/// every change made through it.
pub struct Transaction<'g> {
    graph: &'g Graph,
    _guard: MutexGuard<'g, ()>,
    staged: GraphData,
    committed: bool,
}

impl Transaction<'_> {
    /// Publish the staged changes. When the graph is persisted, the snapshot
    /// is written first; if that fails nothing is published.
    pub fn commit(mut self) -> Result<()> {
        if let Some(storage) = &self.graph.storage {
            storage.save(&self.staged)?;
        }

        let staged = std::mem::take(&mut self.staged);
        debug!(
            nodes = staged.node_count(),
            relationships = staged.relationship_count(),
            "committed transaction"
        );
        *self.graph.data.write() = staged;
        self.committed = true;
        Ok(())
    }

    /// Discard the staged changes.
    pub fn rollback(self) {
        drop(self);
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.committed {
            debug!("rolled back transaction");
        }
    }
}

impl GraphRead for Transaction<'_> {
    fn node(&self, id: NodeId) -> Result<Node> {
        self.staged.node(id)
    }

    fn relationship(&self, id: RelId) -> Result<Relationship> {
        self.staged.relationship(id)
    }

    fn relationships(
        &self,
        node: NodeId,
        direction: Direction,
        rel_type: Option<&str>,
    ) -> Result<Vec<Relationship>> {
        self.staged.relationships(node, direction, rel_type)
    }
}

impl GraphTransaction for Transaction<'_> {
    fn create_node(&mut self, labels: &[String]) -> Result<NodeId> {
        self.staged.create_node(labels)
    }

    fn set_properties(&mut self, node: NodeId, properties: &Properties) -> Result<()> {
        self.staged.set_properties(node, properties)
    }

    fn create_relationship(&mut self, from: NodeId, to: NodeId, rel_type: &str) -> Result<RelId> {
        self.staged.create_relationship(from, to, rel_type)
    }

    fn set_relationship_property(&mut self, rel: RelId, key: &str, value: Value) -> Result<()> {
        self.staged.set_relationship_property(rel, key, value)
    }

    fn delete_relationship(&mut self, rel: RelId) -> Result<()> {
        self.staged.delete_relationship(rel)
    }
}
