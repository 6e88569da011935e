// SPDX-License-Identifier: MIT OR Apache-2.0
//! The network: graph container, connection management, cycle prevention.

use crate::connector::ConnectorKey;
use crate::node::{Node, NodeId};
use crate::signal::Signal;
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// A connection record: one output feeding one input.
///
/// The network's record list is authoritative; connector link sets mirror
/// it symmetrically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Node owning the source output.
    pub source_node: NodeId,
    /// Output connector name on the source node.
    pub source_output: String,
    /// Node owning the target input.
    pub target_node: NodeId,
    /// Input connector name on the target node.
    pub target_input: String,
}

impl Connection {
    /// Whether this record touches `node` on either end.
    pub fn involves_node(&self, node: NodeId) -> bool {
        self.source_node == node || self.target_node == node
    }
}

/// Error from node registry operations and name lookups.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// No node with this id is registered.
    #[error("node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// A node with this id is already registered.
    #[error("node already registered: {0:?}")]
    DuplicateNode(NodeId),

    /// The node has no parameter with this name.
    #[error("node `{node}` has no parameter named `{name}`")]
    UnknownParameter {
        /// Node display name.
        node: String,
        /// Requested parameter name.
        name: String,
    },

    /// The node has no output connector with this name.
    #[error("node `{node}` has no output named `{name}`")]
    UnknownOutput {
        /// Node display name.
        node: String,
        /// Requested output name.
        name: String,
    },

    /// The node has no input connector with this name.
    #[error("node `{node}` has no input named `{name}`")]
    UnknownInput {
        /// Node display name.
        node: String,
        /// Requested input name.
        name: String,
    },
}

/// Error when creating or removing a connection.
///
/// `Display` and `Error` are implemented by hand rather than via
/// `thiserror` because the `IncompatibleTypes` and `WouldCycle` variants
/// carry a field named `source` (part of the public API per the spec),
/// which `thiserror` would otherwise treat as a `std::error::Error`
/// source. These fields are display data, not an error chain, so
/// `Error::source` returns `None`.
#[derive(Debug)]
pub enum ConnectionError {
    /// No node with this id is registered.
    NodeNotFound(NodeId),

    /// The named connector does not exist on the node.
    ConnectorNotFound {
        /// Node display name.
        node: String,
        /// Requested connector name.
        connector: String,
    },

    /// Both connectors belong to the same node.
    SameNode,

    /// The connectors' data types do not match.
    IncompatibleTypes {
        /// Source output type.
        source: crate::value::DataType,
        /// Target input type.
        target: crate::value::DataType,
    },

    /// The target input is single-valued and already connected.
    InputOccupied {
        /// Node display name.
        node: String,
        /// Input connector name.
        connector: String,
    },

    /// The connection would close a cycle. The graph is unchanged.
    WouldCycle {
        /// Rejected source endpoint, `node.output`.
        source: String,
        /// Rejected target endpoint, `node.input`.
        target: String,
    },

    /// `disconnect` was asked to remove a connection that does not exist.
    NotConnected,
}

impl std::fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionError::NodeNotFound(id) => write!(f, "node not found: {id:?}"),
            ConnectionError::ConnectorNotFound { node, connector } => {
                write!(f, "node `{node}` has no connector named `{connector}`")
            }
            ConnectionError::SameNode => {
                write!(f, "cannot connect two connectors on the same node")
            }
            ConnectionError::IncompatibleTypes { source, target } => {
                write!(f, "incompatible data types: {source:?} -> {target:?}")
            }
            ConnectionError::InputOccupied { node, connector } => {
                write!(f, "input `{node}.{connector}` already holds a connection")
            }
            ConnectionError::WouldCycle { source, target } => {
                write!(f, "connection `{source}` -> `{target}` would create a cycle")
            }
            ConnectionError::NotConnected => write!(f, "connectors are not connected"),
        }
    }
}

impl std::error::Error for ConnectionError {}

/// The graph container.
///
/// Owns every node, maintains the authoritative connection list, keeps the
/// node-level graph acyclic, and assigns unique display names. All
/// structural mutation goes through this type so connector link sets and
/// the record list never diverge.
#[derive(Debug, Default)]
pub struct Network {
    /// Network name.
    pub name: String,
    nodes: IndexMap<NodeId, Node>,
    connections: Vec<Connection>,
    /// Emitted with the node id after a node is registered.
    pub node_added: Signal<NodeId>,
    /// Emitted with the node id after a node is removed.
    pub node_removed: Signal<NodeId>,
    /// Emitted with the record after a connection is established.
    pub connection_added: Signal<Connection>,
    /// Emitted with the record after a connection is removed.
    pub connection_removed: Signal<Connection>,
    /// Aggregate channel, emitted after every structural change.
    pub graph_changed: Signal<()>,
}

impl Network {
    /// Create an empty network.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    // Node registry

    /// Register a node.
    ///
    /// Fails when the node's id is already present. The display name is
    /// de-duplicated against all current names: a taken name gets its
    /// numeric suffix stripped and the next free `_<n>` suffix appended.
    /// Emits `node_added` then `graph_changed`.
    pub fn add_node(&mut self, mut node: Node) -> Result<NodeId, GraphError> {
        let id = node.id();
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }
        let unique = self.unique_name(node.name());
        if unique != node.name() {
            node.set_name(unique);
        }
        node.set_attached(true);
        self.nodes.insert(id, node);
        self.node_added.emit(&id);
        self.graph_changed.emit(&());
        Ok(id)
    }

    /// Remove a node, tearing down every connection that touches it first.
    ///
    /// Former downstream nodes are marked dirty. Emits `connection_removed`
    /// per torn-down connection, then `node_removed`, then `graph_changed`.
    /// Returns the detached node.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, GraphError> {
        if !self.nodes.contains_key(&id) {
            return Err(GraphError::NodeNotFound(id));
        }

        let touching: Vec<Connection> = self
            .connections
            .iter()
            .filter(|c| c.involves_node(id))
            .cloned()
            .collect();
        let mut former_children = Vec::new();
        for record in &touching {
            self.connections.retain(|c| c != record);
            self.unlink_endpoints(record);
            if record.source_node == id {
                former_children.push(record.target_node);
            }
            self.connection_removed.emit(record);
        }
        for child in former_children {
            self.mark_dirty_walk(child);
        }

        let mut node = self
            .nodes
            .shift_remove(&id)
            .ok_or(GraphError::NodeNotFound(id))?;
        node.set_attached(false);
        node.sever_all_links();
        self.node_removed.emit(&id);
        self.graph_changed.emit(&());
        Ok(node)
    }

    /// Look up a node by id.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Mutable node lookup.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Look up a node by display name.
    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.values().find(|n| n.name() == name)
    }

    /// All nodes, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All node ids, in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Number of registered nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // Connection management

    /// The authoritative connection list, in creation order.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Number of connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Connect `source_node.source_output` to `target_node.target_input`.
    ///
    /// Endpoints are resolved by id and connector name with explicit
    /// not-found errors. Connecting an already-connected pair is a no-op
    /// success. Rejections (same node, incompatible types, occupied
    /// single-valued input, cycle) leave the graph exactly as it was.
    ///
    /// On success the record is appended, the target node and its
    /// downstream nodes are marked dirty, and `connection_added` then
    /// `graph_changed` are emitted.
    pub fn connect(
        &mut self,
        source_node: NodeId,
        source_output: &str,
        target_node: NodeId,
        target_input: &str,
    ) -> Result<(), ConnectionError> {
        let src = self
            .nodes
            .get(&source_node)
            .ok_or(ConnectionError::NodeNotFound(source_node))?;
        let dst = self
            .nodes
            .get(&target_node)
            .ok_or(ConnectionError::NodeNotFound(target_node))?;
        let src_conn = src
            .output(source_output)
            .ok_or_else(|| ConnectionError::ConnectorNotFound {
                node: src.name().to_string(),
                connector: source_output.to_string(),
            })?;
        let dst_conn = dst
            .input(target_input)
            .ok_or_else(|| ConnectionError::ConnectorNotFound {
                node: dst.name().to_string(),
                connector: target_input.to_string(),
            })?;

        let dst_key = ConnectorKey {
            node: target_node,
            connector: target_input.to_string(),
        };
        if src_conn.is_linked_to(&dst_key) {
            return Ok(());
        }

        if source_node == target_node {
            return Err(ConnectionError::SameNode);
        }
        if !src_conn.data_type.is_compatible_with(dst_conn.data_type) {
            return Err(ConnectionError::IncompatibleTypes {
                source: src_conn.data_type,
                target: dst_conn.data_type,
            });
        }
        if !dst_conn.multi_connection && dst_conn.is_connected() {
            return Err(ConnectionError::InputOccupied {
                node: dst.name().to_string(),
                connector: target_input.to_string(),
            });
        }
        if self.would_cycle(source_node, target_node) {
            let source = format!("{}.{}", src.name(), source_output);
            let target = format!("{}.{}", dst.name(), target_input);
            tracing::debug!("connection rejected, would create a cycle: {source} -> {target}");
            return Err(ConnectionError::WouldCycle { source, target });
        }

        let src_key = ConnectorKey {
            node: source_node,
            connector: source_output.to_string(),
        };
        if let Some(node) = self.nodes.get_mut(&source_node) {
            if let Some(conn) = node.output_mut(source_output) {
                conn.add_link(dst_key);
            }
        }
        if let Some(node) = self.nodes.get_mut(&target_node) {
            if let Some(conn) = node.input_mut(target_input) {
                conn.add_link(src_key);
            }
        }

        let record = Connection {
            source_node,
            source_output: source_output.to_string(),
            target_node,
            target_input: target_input.to_string(),
        };
        self.connections.push(record.clone());
        self.mark_dirty_walk(target_node);
        self.connection_added.emit(&record);
        self.graph_changed.emit(&());
        Ok(())
    }

    /// Remove the matching connection.
    ///
    /// Fails with [`ConnectionError::NotConnected`] when no such record
    /// exists. The target node and its downstream nodes are marked dirty;
    /// `connection_removed` then `graph_changed` are emitted.
    pub fn disconnect(
        &mut self,
        source_node: NodeId,
        source_output: &str,
        target_node: NodeId,
        target_input: &str,
    ) -> Result<(), ConnectionError> {
        let index = self
            .connections
            .iter()
            .position(|c| {
                c.source_node == source_node
                    && c.source_output == source_output
                    && c.target_node == target_node
                    && c.target_input == target_input
            })
            .ok_or(ConnectionError::NotConnected)?;
        let record = self.connections.remove(index);
        self.unlink_endpoints(&record);
        self.mark_dirty_walk(target_node);
        self.connection_removed.emit(&record);
        self.graph_changed.emit(&());
        Ok(())
    }

    fn unlink_endpoints(&mut self, record: &Connection) {
        let src_key = ConnectorKey {
            node: record.source_node,
            connector: record.source_output.clone(),
        };
        let dst_key = ConnectorKey {
            node: record.target_node,
            connector: record.target_input.clone(),
        };
        if let Some(node) = self.nodes.get_mut(&record.source_node) {
            if let Some(conn) = node.output_mut(&record.source_output) {
                conn.remove_link(&dst_key);
            }
        }
        if let Some(node) = self.nodes.get_mut(&record.target_node) {
            if let Some(conn) = node.input_mut(&record.target_input) {
                conn.remove_link(&src_key);
            }
        }
    }

    // Graph queries

    /// Nodes feeding into `node`, de-duplicated, in connection order.
    pub fn find_parent_nodes(&self, node: NodeId) -> Vec<NodeId> {
        let mut parents = Vec::new();
        for record in &self.connections {
            if record.target_node == node && !parents.contains(&record.source_node) {
                parents.push(record.source_node);
            }
        }
        parents
    }

    /// Nodes fed by `node`, de-duplicated, in connection order.
    pub fn find_child_nodes(&self, node: NodeId) -> Vec<NodeId> {
        let mut children = Vec::new();
        for record in &self.connections {
            if record.source_node == node && !children.contains(&record.target_node) {
                children.push(record.target_node);
            }
        }
        children
    }

    // Dirty propagation

    /// Mark `node` and every downstream node dirty.
    ///
    /// The walk is iterative (explicit stack, visited set) and eager across
    /// all hops, so staleness is always observable at the read boundary.
    pub fn mark_dirty(&mut self, node: NodeId) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&node) {
            return Err(GraphError::NodeNotFound(node));
        }
        self.mark_dirty_walk(node);
        Ok(())
    }

    pub(crate) fn mark_dirty_walk(&mut self, start: NodeId) {
        let mut stack = vec![start];
        let mut visited = HashSet::new();
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            if let Some(node) = self.nodes.get_mut(&id) {
                node.mark_dirty();
            }
            for record in &self.connections {
                if record.source_node == id && !visited.contains(&record.target_node) {
                    stack.push(record.target_node);
                }
            }
        }
    }

    /// Set a parameter on a registered node.
    ///
    /// On change the node marks itself dirty and emits `parameter_changed`;
    /// this wrapper additionally invalidates everything downstream. Returns
    /// whether the value actually changed.
    pub fn set_parameter(
        &mut self,
        id: NodeId,
        name: &str,
        value: Value,
    ) -> Result<bool, GraphError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(GraphError::NodeNotFound(id))?;
        let node_name = node.name().to_string();
        let changed = node
            .set_parameter(name, value)
            .ok_or(GraphError::UnknownParameter {
                node: node_name,
                name: name.to_string(),
            })?;
        if changed {
            self.mark_dirty_walk(id);
        }
        Ok(changed)
    }

    // Cycle detection

    /// Whether adding the edge `extra_source -> extra_target` would make
    /// the node-level graph cyclic.
    ///
    /// Kahn's algorithm over all nodes plus the candidate edge; O(nodes +
    /// edges), run once per connection attempt.
    fn would_cycle(&self, extra_source: NodeId, extra_target: NodeId) -> bool {
        let mut in_degree: HashMap<NodeId, usize> =
            self.nodes.keys().map(|id| (*id, 0)).collect();
        let mut adjacency: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

        let edges = self
            .connections
            .iter()
            .map(|c| (c.source_node, c.target_node))
            .chain(std::iter::once((extra_source, extra_target)));
        for (from, to) in edges {
            adjacency.entry(from).or_default().push(to);
            if let Some(degree) = in_degree.get_mut(&to) {
                *degree += 1;
            }
        }

        let mut queue: VecDeque<NodeId> = self
            .nodes
            .keys()
            .copied()
            .filter(|id| in_degree.get(id) == Some(&0))
            .collect();
        let mut ordered = 0_usize;
        while let Some(id) = queue.pop_front() {
            ordered += 1;
            if let Some(targets) = adjacency.get(&id) {
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
        ordered != self.nodes.len()
    }

    fn unique_name(&self, desired: &str) -> String {
        let taken = |name: &str| self.nodes.values().any(|n| n.name() == name);
        if !taken(desired) {
            return desired.to_string();
        }
        let base = match desired.rsplit_once('_') {
            Some((base, suffix))
                if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) =>
            {
                base
            }
            _ => desired,
        };
        let mut n = 1;
        loop {
            let candidate = format!("{base}_{n}");
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::Connector;
    use crate::value::DataType;
    use std::cell::Cell;
    use std::rc::Rc;

    fn float_node(name: &str) -> Node {
        let mut node = Node::new(name, "test").with_caching(true);
        node.add_input(Connector::input("in", DataType::Float));
        node.add_output(Connector::output("out", DataType::Float));
        node
    }

    fn chain2(network: &mut Network) -> (NodeId, NodeId) {
        let a = network.add_node(float_node("A")).unwrap();
        let b = network.add_node(float_node("B")).unwrap();
        network.connect(a, "out", b, "in").unwrap();
        (a, b)
    }

    #[test]
    fn test_unique_naming_suffixes() {
        let mut network = Network::new("net");
        network.add_node(Node::new("Foo", "test")).unwrap();
        let second = network.add_node(Node::new("Foo", "test")).unwrap();
        let third = network.add_node(Node::new("Foo", "test")).unwrap();

        assert_eq!(network.node(second).unwrap().name(), "Foo_1");
        assert_eq!(network.node(third).unwrap().name(), "Foo_2");

        // A suffixed request strips its suffix before searching.
        let fourth = network.add_node(Node::new("Foo_1", "test")).unwrap();
        assert_eq!(network.node(fourth).unwrap().name(), "Foo_3");
    }

    #[test]
    fn test_add_node_rejects_duplicate_id() {
        let mut network = Network::new("net");
        let node = Node::new("A", "test");
        let id = node.id();
        network.add_node(node).unwrap();

        let twin = Node::with_id(id, "B", "test");
        assert!(matches!(
            network.add_node(twin),
            Err(GraphError::DuplicateNode(_))
        ));
        assert_eq!(network.node_count(), 1);
    }

    #[test]
    fn test_connect_links_symmetrically() {
        let mut network = Network::new("net");
        let (a, b) = chain2(&mut network);

        let a_out = network.node(a).unwrap().output("out").unwrap();
        let b_in = network.node(b).unwrap().input("in").unwrap();
        let a_key = ConnectorKey {
            node: a,
            connector: "out".to_string(),
        };
        let b_key = ConnectorKey {
            node: b,
            connector: "in".to_string(),
        };
        assert!(a_out.is_linked_to(&b_key));
        assert!(b_in.is_linked_to(&a_key));
        assert_eq!(network.connection_count(), 1);
    }

    #[test]
    fn test_connect_is_idempotent() {
        let mut network = Network::new("net");
        let (a, b) = chain2(&mut network);
        assert!(network.connect(a, "out", b, "in").is_ok());
        assert_eq!(network.connection_count(), 1);
    }

    #[test]
    fn test_connect_rejections_leave_graph_unchanged() {
        let mut network = Network::new("net");
        let a = network.add_node(float_node("A")).unwrap();
        let b = network.add_node(float_node("B")).unwrap();

        let mut string_node = Node::new("S", "test");
        string_node.add_output(Connector::output("out", DataType::String));
        let s = network.add_node(string_node).unwrap();

        assert!(matches!(
            network.connect(a, "out", a, "in"),
            Err(ConnectionError::SameNode)
        ));
        assert!(matches!(
            network.connect(s, "out", b, "in"),
            Err(ConnectionError::IncompatibleTypes { .. })
        ));
        assert!(matches!(
            network.connect(a, "missing", b, "in"),
            Err(ConnectionError::ConnectorNotFound { .. })
        ));
        assert!(matches!(
            network.connect(NodeId::new(), "out", b, "in"),
            Err(ConnectionError::NodeNotFound(_))
        ));
        assert_eq!(network.connection_count(), 0);
        assert!(!network.node(b).unwrap().input("in").unwrap().is_connected());
    }

    #[test]
    fn test_single_valued_input_rejects_second_link() {
        let mut network = Network::new("net");
        let (_a, b) = chain2(&mut network);
        let c = network.add_node(float_node("C")).unwrap();

        assert!(matches!(
            network.connect(c, "out", b, "in"),
            Err(ConnectionError::InputOccupied { .. })
        ));
        assert_eq!(network.connection_count(), 1);
    }

    #[test]
    fn test_multi_input_accepts_several_links() {
        let mut network = Network::new("net");
        let a = network.add_node(float_node("A")).unwrap();
        let b = network.add_node(float_node("B")).unwrap();

        let mut merge = Node::new("Merge", "test");
        merge.add_input(Connector::input("in", DataType::Float).with_multi(true));
        let m = network.add_node(merge).unwrap();

        network.connect(a, "out", m, "in").unwrap();
        network.connect(b, "out", m, "in").unwrap();
        assert_eq!(network.node(m).unwrap().input("in").unwrap().links().len(), 2);
    }

    #[test]
    fn test_cycle_rejected_end_to_end() {
        let mut network = Network::new("net");
        let (a, b) = chain2(&mut network);

        let err = network.connect(b, "out", a, "in").unwrap_err();
        assert!(matches!(err, ConnectionError::WouldCycle { .. }));
        assert_eq!(network.connection_count(), 1);

        // The rejected link left no trace on either connector.
        let a_in = network.node(a).unwrap().input("in").unwrap();
        let b_out = network.node(b).unwrap().output("out").unwrap();
        assert!(!a_in.is_connected());
        assert!(!b_out.is_connected());
    }

    #[test]
    fn test_longer_cycle_rejected() {
        let mut network = Network::new("net");
        let a = network.add_node(float_node("A")).unwrap();
        let b = network.add_node(float_node("B")).unwrap();
        let c = network.add_node(float_node("C")).unwrap();
        network.connect(a, "out", b, "in").unwrap();
        network.connect(b, "out", c, "in").unwrap();

        assert!(matches!(
            network.connect(c, "out", a, "in"),
            Err(ConnectionError::WouldCycle { .. })
        ));
        assert_eq!(network.connection_count(), 2);
    }

    #[test]
    fn test_disconnect_removes_record_and_links() {
        let mut network = Network::new("net");
        let (a, b) = chain2(&mut network);

        network.disconnect(a, "out", b, "in").unwrap();
        assert_eq!(network.connection_count(), 0);
        assert!(!network.node(a).unwrap().output("out").unwrap().is_connected());
        assert!(!network.node(b).unwrap().input("in").unwrap().is_connected());

        assert!(matches!(
            network.disconnect(a, "out", b, "in"),
            Err(ConnectionError::NotConnected)
        ));
    }

    #[test]
    fn test_remove_node_tears_down_connections() {
        let mut network = Network::new("net");
        let (a, b) = chain2(&mut network);

        let removed = network.remove_node(a).unwrap();
        assert!(!removed.is_attached());
        assert!(!removed.output("out").unwrap().is_connected());
        assert_eq!(network.node_count(), 1);
        assert_eq!(network.connection_count(), 0);
        assert!(!network.node(b).unwrap().input("in").unwrap().is_connected());

        assert!(matches!(
            network.remove_node(a),
            Err(GraphError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_parent_and_child_queries() {
        let mut network = Network::new("net");
        let a = network.add_node(float_node("A")).unwrap();
        let b = network.add_node(float_node("B")).unwrap();

        let mut merge = Node::new("Merge", "test");
        merge.add_input(Connector::input("in", DataType::Float).with_multi(true));
        merge.add_output(Connector::output("out", DataType::Float));
        let m = network.add_node(merge).unwrap();

        network.connect(a, "out", m, "in").unwrap();
        network.connect(b, "out", m, "in").unwrap();

        assert_eq!(network.find_parent_nodes(m), vec![a, b]);
        assert_eq!(network.find_child_nodes(a), vec![m]);
        assert!(network.find_parent_nodes(a).is_empty());
    }

    #[test]
    fn test_parameter_change_dirties_downstream() {
        let mut network = Network::new("net");
        let (a, b) = chain2(&mut network);
        network
            .node_mut(a)
            .unwrap()
            .add_parameter(crate::parameter::Parameter::new("bias", DataType::Float));

        // Cook both so they are clean.
        network.execute(b).unwrap();
        assert!(!network.node(b).unwrap().is_dirty());

        network
            .set_parameter(a, "bias", Value::Float(1.0))
            .unwrap();
        assert!(network.node(a).unwrap().is_dirty());
        assert!(network.node(b).unwrap().is_dirty());

        assert!(matches!(
            network.set_parameter(a, "missing", Value::Null),
            Err(GraphError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn test_change_channels_fire_in_order() {
        let mut network = Network::new("net");
        let log = Rc::new(Cell::new(0_u32));

        let l = log.clone();
        network.node_added.subscribe(move |_| l.set(l.get() * 10 + 1));
        let l = log.clone();
        network
            .connection_added
            .subscribe(move |_| l.set(l.get() * 10 + 2));
        let l = log.clone();
        network
            .connection_removed
            .subscribe(move |_| l.set(l.get() * 10 + 3));
        let l = log.clone();
        network.node_removed.subscribe(move |_| l.set(l.get() * 10 + 4));
        let l = log.clone();
        network.graph_changed.subscribe(move |()| l.set(l.get() * 10 + 9));

        let (a, _b) = chain2(&mut network);
        // add A: 1 9, add B: 1 9, connect: 2 9
        assert_eq!(log.get(), 191_929);

        log.set(0);
        network.remove_node(a).unwrap();
        // connection teardown: 3, then node removal: 4 9
        assert_eq!(log.get(), 349);
    }
}
