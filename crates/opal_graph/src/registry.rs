// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry of available node types.

use crate::evaluation::CookBody;
use crate::node::Node;
use indexmap::IndexMap;
use std::fmt;

/// A registered node type: metadata plus a factory producing fully-declared
/// instances (connectors, parameters, cook body).
pub struct NodeTemplate {
    /// Unique type identifier (e.g. `"math.add"`).
    pub node_type: String,
    /// Category for organization.
    pub category: String,
    /// Description shown by editors.
    pub description: String,
    build: Box<dyn Fn() -> Node>,
}

impl NodeTemplate {
    /// Define a node type.
    pub fn new(
        node_type: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
        build: impl Fn() -> Node + 'static,
    ) -> Self {
        Self {
            node_type: node_type.into(),
            category: category.into(),
            description: description.into(),
            build: Box::new(build),
        }
    }
}

impl fmt::Debug for NodeTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeTemplate")
            .field("node_type", &self.node_type)
            .field("category", &self.category)
            .finish()
    }
}

/// Registry mapping a `node_type` tag to its template.
///
/// Used to instantiate nodes and to re-attach cook bodies when a document
/// is restored (bodies are runtime-only and never serialized).
#[derive(Debug, Default)]
pub struct NodeTypeRegistry {
    templates: IndexMap<String, NodeTemplate>,
}

impl NodeTypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template, replacing any previous one with the same tag.
    pub fn register(&mut self, template: NodeTemplate) {
        self.templates.insert(template.node_type.clone(), template);
    }

    /// Look up a template by type tag.
    pub fn get(&self, node_type: &str) -> Option<&NodeTemplate> {
        self.templates.get(node_type)
    }

    /// Whether a template with this tag is registered.
    pub fn contains(&self, node_type: &str) -> bool {
        self.templates.contains_key(node_type)
    }

    /// All registered templates, in registration order.
    pub fn templates(&self) -> impl Iterator<Item = &NodeTemplate> {
        self.templates.values()
    }

    /// Templates in a category.
    pub fn templates_in_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a NodeTemplate> {
        self.templates.values().filter(move |t| t.category == category)
    }

    /// Build a fresh node of the given type. The instance carries the
    /// template's type tag and category.
    pub fn create(&self, node_type: &str) -> Option<Node> {
        let template = self.templates.get(node_type)?;
        let mut node = (template.build)();
        node.node_type = template.node_type.clone();
        node.category = template.category.clone();
        Some(node)
    }

    /// Build just the cook body for the given type, for re-attaching
    /// behavior to a deserialized node.
    pub fn body_for(&self, node_type: &str) -> Option<Box<dyn CookBody>> {
        let template = self.templates.get(node_type)?;
        let mut prototype = (template.build)();
        prototype.take_body()
    }
}
