//! State transitions for versioned entities.
//!
//! Every transition creates exactly one new state node and installs it as
//! the entity's current state:
//! - [`Versioner::update`] builds the state from the given properties only
//! - [`Versioner::patch`] overlays the given properties onto the current state
//! - [`Versioner::patch_from`] overlays a chosen historical state onto the
//!   current one
//!
//! The versioner never opens or commits transactions; callers run each
//! transition inside one so a failure leaves no partial history behind.

mod current;
mod factory;
mod patch;

pub use current::{check_linked, current_edge, current_edges, edge_date, promote_to_current};
pub use factory::{create_state, state_labels};
pub use patch::{create_patched_state, merge_properties, replay_reference_edges};

use crate::error::{Result, VersionerError};
use crate::graph::{GraphRead, GraphTransaction, Node, Relationship};
use crate::types::{NodeId, Properties, Timestamp, Value};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Versioner configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionerConfig {
    /// Label carried by every state node.
    pub state_label: String,

    /// Label marking nodes whose incoming state edges survive a patch.
    pub reference_label: String,
}

impl Default for VersionerConfig {
    fn default() -> Self {
        Self {
            state_label: "State".to_string(),
            reference_label: "R".to_string(),
        }
    }
}

impl VersionerConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Decides which nodes are reference nodes, whose relationships are carried
/// from a state to the state patched from it.
pub trait ReferenceClassifier {
    fn is_reference(&self, node: &Node) -> bool;
}

/// Classifies reference nodes by label.
#[derive(Clone, Debug)]
pub struct LabelClassifier {
    label: String,
}

impl LabelClassifier {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl ReferenceClassifier for LabelClassifier {
    fn is_reference(&self, node: &Node) -> bool {
        node.has_label(&self.label)
    }
}

impl<F> ReferenceClassifier for F
where
    F: Fn(&Node) -> bool,
{
    fn is_reference(&self, node: &Node) -> bool {
        self(node)
    }
}

/// Input for a new state (before it is created).
#[derive(Clone, Debug, Default)]
pub struct StateInput {
    pub properties: Properties,

    /// Extra label for the state node; empty means none.
    pub additional_label: Option<String>,

    /// When the state becomes current; `None` means now.
    pub date: Option<Timestamp>,
}

impl StateInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.additional_label = Some(label.into());
        self
    }

    pub fn at(mut self, date: Timestamp) -> Self {
        self.date = Some(date);
        self
    }
}

/// Applies state transitions to entities.
#[derive(Clone, Debug)]
pub struct Versioner<C = LabelClassifier> {
    config: VersionerConfig,
    classifier: C,
}

impl Default for Versioner {
    fn default() -> Self {
        Self::new(VersionerConfig::default())
    }
}

impl Versioner {
    /// Create a versioner that recognizes reference nodes by the configured label.
    pub fn new(config: VersionerConfig) -> Self {
        let classifier = LabelClassifier::new(config.reference_label.clone());
        Self { config, classifier }
    }
}

impl<C: ReferenceClassifier> Versioner<C> {
    /// Create a versioner with a custom reference classifier.
    pub fn with_classifier(config: VersionerConfig, classifier: C) -> Self {
        Self { config, classifier }
    }

    pub fn config(&self) -> &VersionerConfig {
        &self.config
    }

    /// The entity's `CURRENT` edge, if it has a state.
    pub fn current_edge<G>(&self, graph: &G, entity: NodeId) -> Result<Option<Relationship>>
    where
        G: GraphRead + ?Sized,
    {
        current_edge(graph, entity)
    }

    /// The entity's current state node, if any.
    pub fn current_state<G>(&self, graph: &G, entity: NodeId) -> Result<Option<Node>>
    where
        G: GraphRead + ?Sized,
    {
        current_edge(graph, entity)?
            .map(|rel| graph.node(rel.end))
            .transpose()
    }

    /// Add a new state built from `input.properties` alone.
    pub fn update<T>(&self, tx: &mut T, entity: NodeId, input: StateInput) -> Result<NodeId>
    where
        T: GraphTransaction + ?Sized,
    {
        let labels = state_labels(&self.config.state_label, input.additional_label.as_deref());
        let at = Timestamp::or_now(input.date);

        let state = create_state(tx, &labels, &input.properties)?;
        promote_to_current(tx, entity, state, at)?;

        info!(entity = %entity, state = %state, "updated entity");
        Ok(state)
    }

    /// Add a new state derived from the current one, with `input.properties`
    /// overriding same-named fields. Without a current state this behaves
    /// like [`Versioner::update`].
    pub fn patch<T>(&self, tx: &mut T, entity: NodeId, input: StateInput) -> Result<NodeId>
    where
        T: GraphTransaction + ?Sized,
    {
        let labels = state_labels(&self.config.state_label, input.additional_label.as_deref());
        let at = Timestamp::or_now(input.date);

        let state = match current_edge(&*tx, entity)? {
            Some(current) => create_patched_state(
                tx,
                &self.classifier,
                &input.properties,
                &labels,
                at,
                &current,
            )?,
            None => {
                let state = create_state(tx, &labels, &input.properties)?;
                promote_to_current(tx, entity, state, at)?;
                state
            }
        };

        info!(entity = %entity, state = %state, "patched entity");
        Ok(state)
    }

    /// Add a new state derived from the current one, overlaid with every
    /// property of `from`, a state from the entity's history. The new state
    /// takes `from`'s labels.
    pub fn patch_from<T>(
        &self,
        tx: &mut T,
        entity: NodeId,
        from: NodeId,
        date: Option<Timestamp>,
    ) -> Result<NodeId>
    where
        T: GraphTransaction + ?Sized,
    {
        let at = Timestamp::or_now(date);
        let source = tx.node(from)?;

        check_linked(&*tx, entity, from)?;
        let current = current_edge(&*tx, entity)?.ok_or(VersionerError::NoCurrentState(entity))?;

        let state = create_patched_state(
            tx,
            &self.classifier,
            &source.properties,
            &source.labels,
            at,
            &current,
        )?;

        info!(entity = %entity, from = %from, state = %state, "patched entity from state");
        Ok(state)
    }
}
