// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cooking: the cook-body contract and the local scheduler.
//!
//! A node's compute behavior lives behind [`CookBody`]; the engine only
//! knows the contract. Scheduling is local: [`Network::execute`] orders a
//! node's transitive ancestors (and only those) before the node itself, so
//! no whole-graph schedule is ever required.

use crate::connector::{Connector, ConnectorKey};
use crate::network::{GraphError, Network};
use crate::node::{CookState, NodeId};
use crate::parameter::Parameter;
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet, VecDeque};

/// Output values produced by one cook, keyed by output connector name.
pub type CookOutputs = IndexMap<String, Value>;

/// Resolved input values handed to a cook body, keyed by input connector
/// name. Every declared input is present: unconnected inputs carry their
/// default, multi-connection inputs carry an ordered [`Value::List`] of all
/// linked upstream values.
#[derive(Debug, Clone, Default)]
pub struct CookInputs {
    values: IndexMap<String, Value>,
}

impl CookInputs {
    /// Create an empty input set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resolved value.
    pub fn insert(&mut self, name: String, value: Value) {
        self.values.insert(name, value);
    }

    /// Look up an input by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Look up an input, treating a missing name as [`Value::Null`].
    pub fn get_or_null(&self, name: &str) -> &Value {
        self.values.get(name).unwrap_or(&Value::Null)
    }

    /// Iterate inputs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Number of inputs.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no inputs were gathered.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The contract a node type's compute body must satisfy.
///
/// Bodies are synchronous, receive the resolved input values and the
/// node's parameters, and return the full output map (an empty map is
/// valid). They never get structural access to the graph. Implemented for
/// any matching closure.
pub trait CookBody {
    /// Compute output values from inputs and parameters.
    fn cook(
        &mut self,
        inputs: &CookInputs,
        parameters: &IndexMap<String, Parameter>,
    ) -> Result<CookOutputs, CookError>;
}

impl<F> CookBody for F
where
    F: FnMut(&CookInputs, &IndexMap<String, Parameter>) -> Result<CookOutputs, CookError>,
{
    fn cook(
        &mut self,
        inputs: &CookInputs,
        parameters: &IndexMap<String, Parameter>,
    ) -> Result<CookOutputs, CookError> {
        self(inputs, parameters)
    }
}

/// Error raised while cooking.
#[derive(Debug, thiserror::Error)]
pub enum CookError {
    /// A cook was requested on a node that is already cooking. Indicates a
    /// re-entrant cook request; the call does not recurse.
    #[error("node `{0}` is already cooking")]
    Reentrant(String),

    /// The node's compute body failed; the node is in the `Error` state.
    #[error("node `{node}` failed to cook: {reason}")]
    Failed {
        /// Display name of the failing node.
        node: String,
        /// Failure reason reported by the body.
        reason: String,
    },

    /// The local topological sort could not order every node. Defensive:
    /// connection-time cycle prevention should make this unreachable.
    #[error("cyclic dependency detected in nodes: {0:?}")]
    CyclicDependency(Vec<String>),

    /// No node with this id is registered.
    #[error("node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Failure reason produced inside a cook body.
    #[error("{0}")]
    Custom(String),
}

impl Network {
    /// Cook a single node: gather its effective input values, then run its
    /// cook state machine.
    ///
    /// Upstream caches are read as-is. Use [`Network::execute`] to bring
    /// ancestors up to date first.
    pub fn cook_node(&mut self, id: NodeId) -> Result<(), CookError> {
        let node = self.node(id).ok_or(CookError::NodeNotFound(id))?;
        let mut inputs = CookInputs::new();
        for (name, connector) in node.inputs() {
            inputs.insert(name.clone(), self.resolve_input(connector));
        }
        let node = self.node_mut(id).ok_or(CookError::NodeNotFound(id))?;
        let result = node.cook_with_inputs(inputs);
        if let Err(err) = &result {
            tracing::warn!("{err}");
        }
        result
    }

    /// Cook `id` together with exactly the subgraph it depends on.
    ///
    /// Collects the transitive ancestors (iterative walk, visited set),
    /// orders ancestors + self with Kahn's algorithm restricted to edges
    /// inside that working set, and cooks in order. A node is skipped only
    /// when its caching is enabled and it is already clean. The first cook
    /// failure aborts; nodes cooked before it keep their results.
    pub fn execute(&mut self, id: NodeId) -> Result<(), CookError> {
        if self.node(id).is_none() {
            return Err(CookError::NodeNotFound(id));
        }

        let mut visited: HashSet<NodeId> = HashSet::new();
        visited.insert(id);
        let mut working_set: Vec<NodeId> = Vec::new();
        let mut stack = self.find_parent_nodes(id);
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            working_set.push(current);
            for parent in self.find_parent_nodes(current) {
                if !visited.contains(&parent) {
                    stack.push(parent);
                }
            }
        }
        working_set.push(id);

        let members: HashSet<NodeId> = working_set.iter().copied().collect();
        let mut in_degree: HashMap<NodeId, usize> =
            working_set.iter().map(|n| (*n, 0)).collect();
        let mut adjacency: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for record in self.connections() {
            if members.contains(&record.source_node) && members.contains(&record.target_node) {
                adjacency
                    .entry(record.source_node)
                    .or_default()
                    .push(record.target_node);
                if let Some(degree) = in_degree.get_mut(&record.target_node) {
                    *degree += 1;
                }
            }
        }

        let mut queue: VecDeque<NodeId> = working_set
            .iter()
            .copied()
            .filter(|n| in_degree.get(n) == Some(&0))
            .collect();
        let mut sorted = Vec::with_capacity(working_set.len());
        while let Some(current) = queue.pop_front() {
            sorted.push(current);
            if let Some(targets) = adjacency.get(&current) {
                for &target in targets {
                    if let Some(degree) = in_degree.get_mut(&target) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push_back(target);
                        }
                    }
                }
            }
        }

        if sorted.len() != working_set.len() {
            let ordered: HashSet<NodeId> = sorted.iter().copied().collect();
            let unordered: Vec<String> = working_set
                .iter()
                .filter(|n| !ordered.contains(n))
                .filter_map(|n| self.node(*n).map(|node| node.name().to_string()))
                .collect();
            return Err(CookError::CyclicDependency(unordered));
        }

        for current in sorted {
            let node = self.node(current).ok_or(CookError::NodeNotFound(current))?;
            if node.caching_enabled() && node.state() == CookState::Clean {
                continue;
            }
            self.cook_node(current)?;
        }
        Ok(())
    }

    /// Read an output value at the boundary.
    ///
    /// An unknown output name is an explicit error. A dirty node is cooked
    /// first, ancestors included; if cooking fails the result is
    /// [`Value::Null`] rather than a stale cache.
    pub fn output_value(&mut self, id: NodeId, name: &str) -> Result<Value, GraphError> {
        let dirty = {
            let node = self.node(id).ok_or(GraphError::NodeNotFound(id))?;
            if node.output(name).is_none() {
                return Err(GraphError::UnknownOutput {
                    node: node.name().to_string(),
                    name: name.to_string(),
                });
            }
            node.is_dirty()
        };
        if dirty && self.execute(id).is_err() {
            return Ok(Value::Null);
        }
        let node = self.node(id).ok_or(GraphError::NodeNotFound(id))?;
        Ok(node.cached_output(name).cloned().unwrap_or(Value::Null))
    }

    /// The effective value currently flowing into an input connector:
    /// its default when unlinked, the linked output's cached value when
    /// single-linked, or the ordered list of all linked values for a
    /// multi-connection input.
    pub fn input_value(&self, id: NodeId, name: &str) -> Result<Value, GraphError> {
        let node = self.node(id).ok_or(GraphError::NodeNotFound(id))?;
        let connector = node.input(name).ok_or_else(|| GraphError::UnknownInput {
            node: node.name().to_string(),
            name: name.to_string(),
        })?;
        Ok(self.resolve_input(connector))
    }

    fn resolve_input(&self, connector: &Connector) -> Value {
        let links = connector.links();
        if links.is_empty() {
            return connector.default_value.clone();
        }
        if connector.multi_connection {
            Value::List(links.iter().map(|key| self.linked_value(key)).collect())
        } else {
            links.first().map_or(Value::Null, |key| self.linked_value(key))
        }
    }

    fn linked_value(&self, key: &ConnectorKey) -> Value {
        self.node(key.node)
            .and_then(|node| node.cached_output(&key.connector))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::value::DataType;
    use std::cell::RefCell;
    use std::rc::Rc;

    type CookLog = Rc<RefCell<Vec<String>>>;

    /// Node that adds `increment` to its `in` value, logging each cook.
    fn step_node(name: &str, increment: f32, log: CookLog) -> Node {
        let tag = name.to_string();
        let mut node = Node::new(name, "test.step").with_caching(true);
        node.add_input(Connector::input("in", DataType::Float));
        node.add_output(Connector::output("out", DataType::Float));
        node.set_body(Box::new(
            move |inputs: &CookInputs,
                  _params: &IndexMap<String, Parameter>|
                  -> Result<CookOutputs, CookError> {
                log.borrow_mut().push(tag.clone());
                let base = inputs.get_or_null("in").as_float().unwrap_or(0.0);
                let mut outputs = CookOutputs::new();
                outputs.insert("out".to_string(), Value::Float(base + increment));
                Ok(outputs)
            },
        ));
        node
    }

    fn failing_node(name: &str) -> Node {
        let mut node = Node::new(name, "test.fail").with_caching(true);
        node.add_input(Connector::input("in", DataType::Float));
        node.add_output(Connector::output("out", DataType::Float));
        node.set_body(Box::new(
            |_inputs: &CookInputs,
             _params: &IndexMap<String, Parameter>|
             -> Result<CookOutputs, CookError> {
                Err(CookError::Custom("broken body".to_string()))
            },
        ));
        node
    }

    #[test]
    fn test_chain_cooks_ancestors_first() {
        let log: CookLog = Rc::new(RefCell::new(Vec::new()));
        let mut network = Network::new("net");
        let a = network.add_node(step_node("A", 1.0, log.clone())).unwrap();
        let b = network.add_node(step_node("B", 10.0, log.clone())).unwrap();
        let c = network.add_node(step_node("C", 100.0, log.clone())).unwrap();
        network.connect(a, "out", b, "in").unwrap();
        network.connect(b, "out", c, "in").unwrap();

        network.execute(c).unwrap();
        assert_eq!(*log.borrow(), vec!["A", "B", "C"]);
        assert_eq!(
            network.output_value(c, "out").unwrap(),
            Value::Float(111.0)
        );
    }

    #[test]
    fn test_diamond_cooks_each_node_once() {
        let log: CookLog = Rc::new(RefCell::new(Vec::new()));
        let mut network = Network::new("net");
        let a = network.add_node(step_node("A", 1.0, log.clone())).unwrap();
        let b = network.add_node(step_node("B", 2.0, log.clone())).unwrap();
        let c = network.add_node(step_node("C", 3.0, log.clone())).unwrap();

        let mut sink = Node::new("D", "test.sink").with_caching(true);
        sink.add_input(Connector::input("in", DataType::Float).with_multi(true));
        sink.add_output(Connector::output("out", DataType::Float));
        let sink_log = log.clone();
        sink.set_body(Box::new(
            move |inputs: &CookInputs,
                  _params: &IndexMap<String, Parameter>|
                  -> Result<CookOutputs, CookError> {
                sink_log.borrow_mut().push("D".to_string());
                let total = match inputs.get_or_null("in") {
                    Value::List(values) => values
                        .iter()
                        .filter_map(Value::as_float)
                        .sum::<f32>(),
                    other => other.as_float().unwrap_or(0.0),
                };
                let mut outputs = CookOutputs::new();
                outputs.insert("out".to_string(), Value::Float(total));
                Ok(outputs)
            },
        ));
        let d = network.add_node(sink).unwrap();

        network.connect(a, "out", b, "in").unwrap();
        network.connect(a, "out", c, "in").unwrap();
        network.connect(b, "out", d, "in").unwrap();
        network.connect(c, "out", d, "in").unwrap();

        network.execute(d).unwrap();
        let cooked = log.borrow().clone();
        assert_eq!(cooked.len(), 4, "each node cooks exactly once: {cooked:?}");
        assert_eq!(cooked[0], "A");
        assert_eq!(cooked[3], "D");
        // B reads 1+2, C reads 1+3; D sums both branches.
        assert_eq!(network.output_value(d, "out").unwrap(), Value::Float(7.0));
    }

    #[test]
    fn test_execute_hits_caches_on_second_run() {
        let log: CookLog = Rc::new(RefCell::new(Vec::new()));
        let mut network = Network::new("net");
        let a = network.add_node(step_node("A", 1.0, log.clone())).unwrap();
        let b = network.add_node(step_node("B", 10.0, log.clone())).unwrap();
        network.connect(a, "out", b, "in").unwrap();

        network.execute(b).unwrap();
        network.execute(b).unwrap();
        assert_eq!(*log.borrow(), vec!["A", "B"]);
    }

    #[test]
    fn test_caching_disabled_recooks_every_run() {
        let log: CookLog = Rc::new(RefCell::new(Vec::new()));
        let mut network = Network::new("net");
        let mut node = step_node("A", 1.0, log.clone());
        node = node.with_caching(false);
        let a = network.add_node(node).unwrap();

        network.execute(a).unwrap();
        network.execute(a).unwrap();
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn test_parameter_change_is_visible_at_read_boundary() {
        let log: CookLog = Rc::new(RefCell::new(Vec::new()));
        let mut network = Network::new("net");

        let const_log = log.clone();
        let mut constant = Node::new("A", "test.constant").with_caching(true);
        constant.add_parameter(Parameter::new("value", DataType::Float));
        constant.add_output(Connector::output("out", DataType::Float));
        constant.set_body(Box::new(
            move |_inputs: &CookInputs,
                  params: &IndexMap<String, Parameter>|
                  -> Result<CookOutputs, CookError> {
                const_log.borrow_mut().push("A".to_string());
                let value = params
                    .get("value")
                    .map(|p| p.value().clone())
                    .unwrap_or(Value::Null);
                let mut outputs = CookOutputs::new();
                outputs.insert("out".to_string(), value);
                Ok(outputs)
            },
        ));
        let a = network.add_node(constant).unwrap();
        let b = network.add_node(step_node("B", 10.0, log.clone())).unwrap();
        network.connect(a, "out", b, "in").unwrap();

        assert_eq!(network.output_value(b, "out").unwrap(), Value::Float(10.0));

        network.set_parameter(a, "value", Value::Float(5.0)).unwrap();
        // B must recompute, not serve its stale cache.
        assert_eq!(network.output_value(b, "out").unwrap(), Value::Float(15.0));
        assert_eq!(*log.borrow(), vec!["A", "B", "A", "B"]);
    }

    #[test]
    fn test_failed_cook_aborts_execute() {
        let log: CookLog = Rc::new(RefCell::new(Vec::new()));
        let mut network = Network::new("net");
        let a = network.add_node(step_node("A", 1.0, log.clone())).unwrap();
        let b = network.add_node(failing_node("B")).unwrap();
        let c = network.add_node(step_node("C", 100.0, log.clone())).unwrap();
        network.connect(a, "out", b, "in").unwrap();
        network.connect(b, "out", c, "in").unwrap();

        let err = network.execute(c).unwrap_err();
        assert!(matches!(err, CookError::Failed { .. }));

        // A cooked and keeps its result; B holds the error; C never ran.
        assert_eq!(*log.borrow(), vec!["A"]);
        assert_eq!(network.node(a).unwrap().state(), CookState::Clean);
        assert_eq!(network.node(b).unwrap().state(), CookState::Error);
        assert_eq!(network.node(b).unwrap().cook_error(), Some("broken body"));
        assert_eq!(network.node(c).unwrap().state(), CookState::Dirty);

        // Reading through the failure yields Null, not stale data.
        assert_eq!(network.output_value(c, "out").unwrap(), Value::Null);
    }

    #[test]
    fn test_output_value_unknown_name_is_explicit() {
        let mut network = Network::new("net");
        let a = network
            .add_node(step_node("A", 1.0, Rc::new(RefCell::new(Vec::new()))))
            .unwrap();
        assert!(matches!(
            network.output_value(a, "missing"),
            Err(GraphError::UnknownOutput { .. })
        ));
    }

    #[test]
    fn test_input_value_resolution_policies() {
        let log: CookLog = Rc::new(RefCell::new(Vec::new()));
        let mut network = Network::new("net");
        let a = network.add_node(step_node("A", 1.0, log.clone())).unwrap();
        let b = network.add_node(step_node("B", 2.0, log.clone())).unwrap();

        let mut merge = Node::new("Merge", "test.merge");
        merge.add_input(
            Connector::input("in", DataType::Float)
                .with_multi(true)
                .with_default(Value::Float(-1.0)),
        );
        merge.add_input(Connector::input("single", DataType::Float).with_default(Value::Float(9.0)));
        let m = network.add_node(merge).unwrap();

        // Unconnected: default.
        assert_eq!(
            network.input_value(m, "single").unwrap(),
            Value::Float(9.0)
        );

        network.connect(a, "out", m, "in").unwrap();
        network.connect(b, "out", m, "in").unwrap();
        network.execute(a).unwrap();
        network.execute(b).unwrap();

        // Multi-connection: ordered list of all linked values.
        assert_eq!(
            network.input_value(m, "in").unwrap(),
            Value::List(vec![Value::Float(1.0), Value::Float(2.0)])
        );

        assert!(matches!(
            network.input_value(m, "missing"),
            Err(GraphError::UnknownInput { .. })
        ));
    }
}
