// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connectors: the typed input/output ports on nodes.

use crate::node::NodeId;
use crate::value::{default_value_for, DataType, Value};
use serde::{Deserialize, Serialize};

/// Direction of a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorDirection {
    /// Receives data from an upstream output.
    Input,
    /// Produces data for downstream inputs.
    Output,
}

/// Address of a connector: owning node plus connector name.
///
/// Link sets store these instead of pointers so the network stays the sole
/// owner of its nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectorKey {
    /// Owning node.
    pub node: NodeId,
    /// Connector name on that node.
    pub connector: String,
}

/// A typed, directional port owned by exactly one node.
///
/// Links are symmetric: a link is present in both endpoints' sets or in
/// neither. Only the network mutates link sets, always in matched pairs.
#[derive(Debug)]
pub struct Connector {
    /// Connector identifier, unique within the owning node's inputs or
    /// outputs (independently).
    pub name: String,
    /// Input or output.
    pub direction: ConnectorDirection,
    /// Data type flowing through this connector.
    pub data_type: DataType,
    /// Human-readable name shown by editors.
    pub display_name: String,
    /// Whether more than one link is allowed. Single-valued inputs accept
    /// at most one link; outputs default to multi.
    pub multi_connection: bool,
    /// Value an unconnected input resolves to.
    pub default_value: Value,
    node: NodeId,
    links: Vec<ConnectorKey>,
    stale: bool,
}

impl Connector {
    /// Create an input connector. Single-valued unless made multi.
    pub fn input(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(name, ConnectorDirection::Input, data_type, false)
    }

    /// Create an output connector. Outputs accept multiple links.
    pub fn output(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(name, ConnectorDirection::Output, data_type, true)
    }

    fn new(
        name: impl Into<String>,
        direction: ConnectorDirection,
        data_type: DataType,
        multi_connection: bool,
    ) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            direction,
            data_type,
            multi_connection,
            default_value: default_value_for(data_type),
            node: NodeId::nil(),
            links: Vec::new(),
            stale: false,
        }
    }

    /// Set the value an unconnected input resolves to.
    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = value;
        self
    }

    /// Allow (or forbid) multiple links.
    pub fn with_multi(mut self, multi: bool) -> Self {
        self.multi_connection = multi;
        self
    }

    /// Set the display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Whether this is an input connector.
    pub fn is_input(&self) -> bool {
        self.direction == ConnectorDirection::Input
    }

    /// Whether this is an output connector.
    pub fn is_output(&self) -> bool {
        self.direction == ConnectorDirection::Output
    }

    /// Id of the owning node. Set when the connector is declared on a node.
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub(crate) fn set_node(&mut self, node: NodeId) {
        self.node = node;
    }

    /// Whether any link is present.
    pub fn is_connected(&self) -> bool {
        !self.links.is_empty()
    }

    /// Linked peer connectors, in link order.
    pub fn links(&self) -> &[ConnectorKey] {
        &self.links
    }

    /// Whether a link to `key` exists.
    pub fn is_linked_to(&self, key: &ConnectorKey) -> bool {
        self.links.contains(key)
    }

    /// Pure connection-legality predicate.
    ///
    /// Rejects pairs on the same node (which also covers a connector paired
    /// with itself), pairs with the same direction, and incompatible data
    /// types. Multiplicity is a caller rule, enforced by the network before
    /// linking.
    pub fn can_connect_to(&self, other: &Connector) -> bool {
        if self.node == other.node {
            return false;
        }
        if self.direction == other.direction {
            return false;
        }
        self.data_type.is_compatible_with(other.data_type)
    }

    /// Record a link to `key`. Idempotent.
    pub(crate) fn add_link(&mut self, key: ConnectorKey) {
        if !self.links.contains(&key) {
            self.links.push(key);
        }
    }

    /// Drop the link to `key`. Returns `false` if no such link existed.
    pub(crate) fn remove_link(&mut self, key: &ConnectorKey) -> bool {
        let before = self.links.len();
        self.links.retain(|l| l != key);
        self.links.len() != before
    }

    pub(crate) fn clear_links(&mut self) {
        self.links.clear();
    }

    /// Whether the owning node's cached value behind this output is stale.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub(crate) fn mark_stale(&mut self) {
        self.stale = true;
    }

    pub(crate) fn clear_stale(&mut self) {
        self.stale = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(mut conn: Connector, node: NodeId) -> Connector {
        conn.set_node(node);
        conn
    }

    #[test]
    fn test_rejects_same_node() {
        let node = NodeId::new();
        let out = owned(Connector::output("out", DataType::Float), node);
        let inp = owned(Connector::input("in", DataType::Float), node);
        assert!(!out.can_connect_to(&inp));
    }

    #[test]
    fn test_rejects_same_direction() {
        let a = owned(Connector::output("a", DataType::Float), NodeId::new());
        let b = owned(Connector::output("b", DataType::Float), NodeId::new());
        assert!(!a.can_connect_to(&b));
    }

    #[test]
    fn test_rejects_incompatible_types() {
        let out = owned(Connector::output("out", DataType::String), NodeId::new());
        let inp = owned(Connector::input("in", DataType::Vector3), NodeId::new());
        assert!(!out.can_connect_to(&inp));
    }

    #[test]
    fn test_accepts_compatible_pair() {
        let out = owned(Connector::output("out", DataType::Float), NodeId::new());
        let inp = owned(Connector::input("in", DataType::Float), NodeId::new());
        let any = owned(Connector::input("in", DataType::Any), NodeId::new());
        assert!(out.can_connect_to(&inp));
        assert!(inp.can_connect_to(&out));
        assert!(out.can_connect_to(&any));
    }

    #[test]
    fn test_link_bookkeeping_is_idempotent() {
        let mut out = Connector::output("out", DataType::Float);
        let key = ConnectorKey {
            node: NodeId::new(),
            connector: "in".to_string(),
        };

        out.add_link(key.clone());
        out.add_link(key.clone());
        assert_eq!(out.links().len(), 1);

        assert!(out.remove_link(&key));
        assert!(!out.remove_link(&key));
        assert!(!out.is_connected());
    }

    #[test]
    fn test_unconnected_default_falls_back_to_type() {
        let inp = Connector::input("in", DataType::Color);
        assert_eq!(inp.default_value, Value::Color([0.0, 0.0, 0.0, 1.0]));
        let with = Connector::input("in", DataType::Float).with_default(Value::Float(2.5));
        assert_eq!(with.default_value, Value::Float(2.5));
    }
}
