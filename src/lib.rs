//! # Graph Versioner
//!
//! Temporal versioning of entities stored in a property graph. An entity
//! accumulates an ordered history of immutable state nodes, exactly one of
//! which is current at any time.
//!
//! ## Core Concepts
//!
//! - **Entity**: long-lived identity node, never versioned itself
//! - **State**: immutable snapshot of an entity's properties
//! - **CURRENT**: entity → state edge marking the active state
//! - **HAS_STATE**: entity → state edge recording each state's validity
//!   (`date`, and `endDate` once superseded)
//! - **PREVIOUS**: state → state edge linking each state to the one it replaced
//!
//! ## Example
//!
//! ```ignore
//! use graph_versioner::{Graph, GraphTransaction, StateInput, Timestamp, Versioner};
//!
//! let graph = Graph::in_memory();
//! let versioner = Versioner::default();
//!
//! let entity = graph.write(|tx| tx.create_node(&["Person".to_string()]))?;
//!
//! graph.write(|tx| {
//!     versioner.update(tx, entity, StateInput::new().with_property("name", "Alice"))
//! })?;
//!
//! // Keeps `name`, adds `age`.
//! graph.write(|tx| {
//!     versioner.patch(tx, entity, StateInput::new().with_property("age", 30).at(Timestamp(1_700_000_000_000)))
//! })?;
//! ```

pub mod error;
pub mod graph;
pub mod types;
pub mod versioner;

// Re-exports
pub use error::{Result, VersionerError};
pub use graph::{
    Graph, GraphConfig, GraphData, GraphRead, GraphTransaction, Node, Relationship, Transaction,
};
pub use types::*;
pub use versioner::{
    LabelClassifier, ReferenceClassifier, StateInput, Versioner, VersionerConfig,
};
