// SPDX-License-Identifier: MIT OR Apache-2.0
//! Nodes: the processing units of the graph.

use crate::connector::Connector;
use crate::evaluation::{CookBody, CookError, CookInputs, CookOutputs};
use crate::parameter::Parameter;
use crate::signal::Signal;
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The nil id, used as a placeholder before a connector is declared on
    /// a node.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache-validity state of a node's outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookState {
    /// Outputs need recomputation. Initial state.
    Dirty,
    /// A cook is in progress; guards against re-entrant cooking.
    Cooking,
    /// Cached outputs are valid.
    Clean,
    /// The last cook failed; treated as dirty for scheduling.
    Error,
}

/// A processing unit: parameters, typed connectors, and a cook body.
///
/// Nodes are created detached and attached to at most one [`Network`] at a
/// time via [`Network::add_node`]. Inputs, outputs, and parameters are
/// declared once, before the node is wired into a graph.
///
/// [`Network`]: crate::network::Network
/// [`Network::add_node`]: crate::network::Network::add_node
pub struct Node {
    id: NodeId,
    name: String,
    /// Type tag identifying the concrete behavior (e.g. `"math.add"`).
    pub node_type: String,
    /// Organizational category (e.g. `"Math"`).
    pub category: String,
    /// Optional custom color, presentation metadata only.
    pub color: Option<[u8; 3]>,
    position: [f32; 2],
    caching_enabled: bool,
    attached: bool,
    parameters: IndexMap<String, Parameter>,
    inputs: IndexMap<String, Connector>,
    outputs: IndexMap<String, Connector>,
    state: CookState,
    cook_error: Option<String>,
    cached_outputs: IndexMap<String, Value>,
    body: Option<Box<dyn CookBody>>,
    /// Emitted with the new dirtiness whenever the dirty state flips.
    pub dirty_changed: Signal<bool>,
    /// Emitted with the new position when the node is moved.
    pub position_changed: Signal<[f32; 2]>,
    /// Emitted with the parameter name after a parameter value changes.
    pub parameter_changed: Signal<String>,
}

impl Node {
    /// Create a detached node with a random id. Caching starts disabled:
    /// every read recomputes until [`Node::with_caching`] opts in.
    pub fn new(name: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self::with_id(NodeId::new(), name, node_type)
    }

    /// Create a detached node with a specific id (restoring a document,
    /// deterministic tests).
    pub fn with_id(id: NodeId, name: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            node_type: node_type.into(),
            category: "General".to_string(),
            color: None,
            position: [0.0, 0.0],
            caching_enabled: false,
            attached: false,
            parameters: IndexMap::new(),
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
            state: CookState::Dirty,
            cook_error: None,
            cached_outputs: IndexMap::new(),
            body: None,
            dirty_changed: Signal::new(),
            position_changed: Signal::new(),
            parameter_changed: Signal::new(),
        }
    }

    /// Set the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the position.
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Enable or disable output caching.
    pub fn with_caching(mut self, enabled: bool) -> Self {
        self.caching_enabled = enabled;
        self
    }

    /// Attach the type-specific cook body.
    pub fn with_body(mut self, body: Box<dyn CookBody>) -> Self {
        self.body = Some(body);
        self
    }

    /// Node id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Display name, unique within the owning network.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Whether the node currently belongs to a network.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub(crate) fn set_attached(&mut self, attached: bool) {
        self.attached = attached;
    }

    /// Whether output caching is enabled.
    pub fn caching_enabled(&self) -> bool {
        self.caching_enabled
    }

    /// Current position.
    pub fn position(&self) -> [f32; 2] {
        self.position
    }

    /// Move the node. Emits `position_changed` when the position differs.
    pub fn set_position(&mut self, x: f32, y: f32) {
        let new = [x, y];
        if self.position != new {
            self.position = new;
            self.position_changed.emit(&new);
        }
    }

    /// Replace or attach the cook body.
    pub fn set_body(&mut self, body: Box<dyn CookBody>) {
        self.body = Some(body);
    }

    pub(crate) fn take_body(&mut self) -> Option<Box<dyn CookBody>> {
        self.body.take()
    }

    // Parameters

    /// Declare a parameter. A parameter re-declared under the same name
    /// replaces the previous one.
    pub fn add_parameter(&mut self, parameter: Parameter) -> &mut Self {
        self.parameters.insert(parameter.name.clone(), parameter);
        self
    }

    /// Look up a parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    /// Mutable parameter lookup.
    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.parameters.get_mut(name)
    }

    /// All parameters, in declaration order.
    pub fn parameters(&self) -> &IndexMap<String, Parameter> {
        &self.parameters
    }

    /// Set a parameter's value. On change, marks this node dirty and emits
    /// `parameter_changed`. Returns `Some(changed)` or `None` for an
    /// unknown name.
    ///
    /// For a node attached to a network, prefer
    /// [`Network::set_parameter`](crate::network::Network::set_parameter),
    /// which also invalidates downstream nodes.
    pub fn set_parameter(&mut self, name: &str, value: Value) -> Option<bool> {
        let param = self.parameters.get_mut(name)?;
        let changed = param.set_value(value);
        if changed {
            self.mark_dirty();
            self.parameter_changed.emit(&name.to_string());
        }
        Some(changed)
    }

    // Connectors

    /// Declare an input connector.
    pub fn add_input(&mut self, mut connector: Connector) -> &mut Self {
        connector.set_node(self.id);
        self.inputs.insert(connector.name.clone(), connector);
        self
    }

    /// Declare an output connector.
    pub fn add_output(&mut self, mut connector: Connector) -> &mut Self {
        connector.set_node(self.id);
        self.outputs.insert(connector.name.clone(), connector);
        self
    }

    /// Look up an input connector by name.
    pub fn input(&self, name: &str) -> Option<&Connector> {
        self.inputs.get(name)
    }

    /// Mutable input lookup.
    pub fn input_mut(&mut self, name: &str) -> Option<&mut Connector> {
        self.inputs.get_mut(name)
    }

    /// Look up an output connector by name.
    pub fn output(&self, name: &str) -> Option<&Connector> {
        self.outputs.get(name)
    }

    /// Mutable output lookup.
    pub fn output_mut(&mut self, name: &str) -> Option<&mut Connector> {
        self.outputs.get_mut(name)
    }

    /// All input connectors, in declaration order.
    pub fn inputs(&self) -> &IndexMap<String, Connector> {
        &self.inputs
    }

    /// All output connectors, in declaration order.
    pub fn outputs(&self) -> &IndexMap<String, Connector> {
        &self.outputs
    }

    /// Drop all link bookkeeping on this node's connectors. Called when
    /// the node leaves a network, after the peers were unlinked.
    pub(crate) fn sever_all_links(&mut self) {
        for connector in self.inputs.values_mut() {
            connector.clear_links();
        }
        for connector in self.outputs.values_mut() {
            connector.clear_links();
        }
    }

    // Cook/dirty state machine

    /// Current cook state.
    pub fn state(&self) -> CookState {
        self.state
    }

    /// Whether this node needs recomputation. Always true while caching is
    /// disabled; an errored node counts as dirty.
    pub fn is_dirty(&self) -> bool {
        !self.caching_enabled || matches!(self.state, CookState::Dirty | CookState::Error)
    }

    /// Message from the last failed cook, if any.
    pub fn cook_error(&self) -> Option<&str> {
        self.cook_error.as_deref()
    }

    /// Cached output values from the last successful cook.
    pub fn cached_outputs(&self) -> &IndexMap<String, Value> {
        &self.cached_outputs
    }

    /// Cached value of one output.
    pub fn cached_output(&self, name: &str) -> Option<&Value> {
        self.cached_outputs.get(name)
    }

    /// Invalidate cached outputs.
    ///
    /// No-op while caching is disabled (every read recomputes anyway).
    /// Otherwise, when not already dirty: clears cached outputs and the
    /// error, marks every output connector stale, and emits
    /// `dirty_changed(true)`.
    pub fn mark_dirty(&mut self) {
        if !self.caching_enabled {
            return;
        }
        if self.state == CookState::Dirty {
            return;
        }
        self.state = CookState::Dirty;
        self.cached_outputs.clear();
        self.cook_error = None;
        for output in self.outputs.values_mut() {
            output.mark_stale();
        }
        self.dirty_changed.emit(&true);
    }

    /// Cook this node in isolation, resolving every input to its default
    /// value.
    ///
    /// This is the degenerate form for detached nodes (which can hold no
    /// links). Within a network, cook through
    /// [`Network::execute`](crate::network::Network::execute) or
    /// [`Network::cook_node`](crate::network::Network::cook_node) so linked
    /// inputs pull upstream values.
    pub fn cook(&mut self) -> Result<(), CookError> {
        let mut inputs = CookInputs::new();
        for (name, connector) in &self.inputs {
            inputs.insert(name.clone(), connector.default_value.clone());
        }
        self.cook_with_inputs(inputs)
    }

    /// Run the cook state machine with already-resolved input values.
    pub(crate) fn cook_with_inputs(&mut self, inputs: CookInputs) -> Result<(), CookError> {
        if self.caching_enabled
            && self.state == CookState::Clean
            && !self.cached_outputs.is_empty()
        {
            return Ok(());
        }
        if self.state == CookState::Cooking {
            return Err(CookError::Reentrant(self.name.clone()));
        }

        self.state = CookState::Cooking;
        self.cook_error = None;

        // The body is taken out for the call so it can borrow the
        // parameter map alongside itself.
        let mut body = self.body.take();
        let result = match body.as_mut() {
            Some(body) => body.cook(&inputs, &self.parameters),
            None => Ok(CookOutputs::new()),
        };
        self.body = body;

        match result {
            Ok(outputs) => {
                self.cached_outputs = outputs;
                for output in self.outputs.values_mut() {
                    output.clear_stale();
                }
                if self.caching_enabled {
                    self.state = CookState::Clean;
                    self.dirty_changed.emit(&false);
                } else {
                    self.state = CookState::Dirty;
                }
                Ok(())
            }
            Err(err) => {
                let reason = err.to_string();
                self.cook_error = Some(reason.clone());
                self.state = CookState::Error;
                Err(CookError::Failed {
                    node: self.name.clone(),
                    reason,
                })
            }
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("node_type", &self.node_type)
            .field("state", &self.state)
            .field("inputs", &self.inputs.keys().collect::<Vec<_>>())
            .field("outputs", &self.outputs.keys().collect::<Vec<_>>())
            .finish()
    }
}
