// SPDX-License-Identifier: MIT OR Apache-2.0
//! Logical document schema and text-format adapters.
//!
//! The live entities hold runtime-only state (signals, cook bodies, link
//! sets), so serialization goes through plain document mirrors.
//! Connections are replayed through [`Network::connect`] on restore, which
//! re-validates compatibility and acyclicity: a corrupt record fails for
//! that record only and the rest of the document loads.

use crate::connector::{Connector, ConnectorDirection};
use crate::network::{Connection, Network};
use crate::node::{Node, NodeId};
use crate::parameter::Parameter;
use crate::registry::NodeTypeRegistry;
use crate::value::{DataType, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Serialized form of a whole network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkDoc {
    /// Network name.
    pub name: String,
    /// Every node, in registration order.
    pub nodes: Vec<NodeDoc>,
    /// Every connection, in creation order.
    pub connections: Vec<Connection>,
}

/// Serialized form of a node. Cook state and the cook body are
/// runtime-only and not part of the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDoc {
    /// Node id.
    pub id: NodeId,
    /// Display name.
    pub name: String,
    /// Type tag.
    pub node_type: String,
    /// Category tag.
    pub category: String,
    /// Optional custom color.
    #[serde(default)]
    pub color: Option<[u8; 3]>,
    /// Position, presentation metadata.
    pub position: [f32; 2],
    /// Whether output caching is enabled.
    pub caching_enabled: bool,
    /// Parameters by name.
    pub parameters: IndexMap<String, ParameterDoc>,
    /// Input connectors by name.
    pub inputs: IndexMap<String, ConnectorDoc>,
    /// Output connectors by name.
    pub outputs: IndexMap<String, ConnectorDoc>,
}

/// Serialized form of a parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDoc {
    /// Parameter name.
    pub name: String,
    /// Type tag.
    pub data_type: DataType,
    /// Default value.
    pub default_value: Value,
    /// Display label.
    pub label: String,
    /// Lower bound hint.
    #[serde(default)]
    pub min_value: Option<f32>,
    /// Upper bound hint.
    #[serde(default)]
    pub max_value: Option<f32>,
    /// Menu choices.
    pub menu_items: Vec<String>,
    /// Description text.
    pub description: String,
    /// Current value.
    pub value: Value,
}

/// Serialized form of a connector. Links are not stored here; they are
/// rebuilt from the network's connection list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorDoc {
    /// Connector name.
    pub name: String,
    /// `input` or `output`.
    pub connector_type: ConnectorDirection,
    /// Type tag.
    pub data_type: DataType,
    /// Display name.
    pub display_name: String,
    /// Whether multiple links are allowed.
    pub multi_connection: bool,
    /// Value an unconnected input resolves to.
    pub default_value: Value,
}

impl Network {
    /// Capture this network as a document.
    pub fn to_document(&self) -> NetworkDoc {
        NetworkDoc {
            name: self.name.clone(),
            nodes: self.nodes().map(node_to_doc).collect(),
            connections: self.connections().to_vec(),
        }
    }

    /// Rebuild a network from a document.
    ///
    /// When a registry is given, cook bodies are re-attached by type tag;
    /// unknown tags are left bodiless. Corrupt node or connection records
    /// are skipped with a warning instead of poisoning the graph.
    pub fn from_document(doc: NetworkDoc, registry: Option<&NodeTypeRegistry>) -> Self {
        let mut network = Network::new(doc.name);
        for node_doc in doc.nodes {
            let node = node_from_doc(node_doc, registry);
            if let Err(err) = network.add_node(node) {
                tracing::warn!("skipping node while restoring `{}`: {err}", network.name);
            }
        }
        for record in doc.connections {
            if let Err(err) = network.connect(
                record.source_node,
                &record.source_output,
                record.target_node,
                &record.target_input,
            ) {
                tracing::warn!("skipping connection while restoring `{}`: {err}", network.name);
            }
        }
        network
    }

    /// Serialize to pretty RON.
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(&self.to_document(), ron::ser::PrettyConfig::default())
    }

    /// Deserialize from RON.
    pub fn from_ron(
        text: &str,
        registry: Option<&NodeTypeRegistry>,
    ) -> Result<Self, ron::error::SpannedError> {
        let doc: NetworkDoc = ron::from_str(text)?;
        Ok(Self::from_document(doc, registry))
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_document())
    }

    /// Deserialize from JSON.
    pub fn from_json(
        text: &str,
        registry: Option<&NodeTypeRegistry>,
    ) -> Result<Self, serde_json::Error> {
        let doc: NetworkDoc = serde_json::from_str(text)?;
        Ok(Self::from_document(doc, registry))
    }
}

fn node_to_doc(node: &Node) -> NodeDoc {
    NodeDoc {
        id: node.id(),
        name: node.name().to_string(),
        node_type: node.node_type.clone(),
        category: node.category.clone(),
        color: node.color,
        position: node.position(),
        caching_enabled: node.caching_enabled(),
        parameters: node
            .parameters()
            .iter()
            .map(|(name, param)| (name.clone(), parameter_to_doc(param)))
            .collect(),
        inputs: node
            .inputs()
            .iter()
            .map(|(name, conn)| (name.clone(), connector_to_doc(conn)))
            .collect(),
        outputs: node
            .outputs()
            .iter()
            .map(|(name, conn)| (name.clone(), connector_to_doc(conn)))
            .collect(),
    }
}

fn parameter_to_doc(param: &Parameter) -> ParameterDoc {
    ParameterDoc {
        name: param.name.clone(),
        data_type: param.data_type,
        default_value: param.default_value().clone(),
        label: param.label.clone(),
        min_value: param.min_value,
        max_value: param.max_value,
        menu_items: param.menu_items.clone(),
        description: param.description.clone(),
        value: param.value().clone(),
    }
}

fn connector_to_doc(conn: &Connector) -> ConnectorDoc {
    ConnectorDoc {
        name: conn.name.clone(),
        connector_type: conn.direction,
        data_type: conn.data_type,
        display_name: conn.display_name.clone(),
        multi_connection: conn.multi_connection,
        default_value: conn.default_value.clone(),
    }
}

fn node_from_doc(doc: NodeDoc, registry: Option<&NodeTypeRegistry>) -> Node {
    let mut node = Node::with_id(doc.id, doc.name, doc.node_type)
        .with_position(doc.position[0], doc.position[1])
        .with_caching(doc.caching_enabled);
    node.category = doc.category;
    node.color = doc.color;
    for (_, param_doc) in doc.parameters {
        node.add_parameter(parameter_from_doc(param_doc));
    }
    for (_, conn_doc) in doc.inputs {
        node.add_input(connector_from_doc(conn_doc));
    }
    for (_, conn_doc) in doc.outputs {
        node.add_output(connector_from_doc(conn_doc));
    }
    if let Some(registry) = registry {
        match registry.body_for(&node.node_type) {
            Some(body) => node.set_body(body),
            None => {
                tracing::debug!("no template for node type `{}`, left bodiless", node.node_type);
            }
        }
    }
    node
}

fn parameter_from_doc(doc: ParameterDoc) -> Parameter {
    let mut param = Parameter::new(doc.name, doc.data_type)
        .with_default(doc.default_value)
        .with_label(doc.label)
        .with_menu(doc.menu_items)
        .with_description(doc.description);
    param.min_value = doc.min_value;
    param.max_value = doc.max_value;
    param.set_value_silent(doc.value);
    param
}

fn connector_from_doc(doc: ConnectorDoc) -> Connector {
    let conn = match doc.connector_type {
        ConnectorDirection::Input => Connector::input(doc.name, doc.data_type),
        ConnectorDirection::Output => Connector::output(doc.name, doc.data_type),
    };
    conn.with_default(doc.default_value)
        .with_multi(doc.multi_connection)
        .with_display_name(doc.display_name)
}
