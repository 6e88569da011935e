// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in generic node types.
//!
//! A small library covering the common wiring cases: constants driven by a
//! parameter, binary math, and a multi-connection string join. Editors
//! register their own domain types alongside these.

use crate::connector::Connector;
use crate::evaluation::{CookError, CookInputs, CookOutputs};
use crate::node::Node;
use crate::parameter::Parameter;
use crate::registry::{NodeTemplate, NodeTypeRegistry};
use crate::value::{DataType, Value};
use indexmap::IndexMap;

/// Create the registry of built-in node types.
pub fn create_builtin_registry() -> NodeTypeRegistry {
    let mut registry = NodeTypeRegistry::new();

    // ========================================================================
    // Constants
    // ========================================================================

    registry.register(NodeTemplate::new(
        "constant.float",
        "Constant",
        "Constant float value driven by a parameter",
        || {
            let mut node = Node::new("Float", "constant.float").with_caching(true);
            node.add_parameter(Parameter::new("value", DataType::Float).with_label("Value"));
            node.add_output(Connector::output("value", DataType::Float));
            node.set_body(Box::new(
                |_inputs: &CookInputs,
                 params: &IndexMap<String, Parameter>|
                 -> Result<CookOutputs, CookError> {
                    let value = params
                        .get("value")
                        .map(|p| p.value().clone())
                        .unwrap_or(Value::Float(0.0));
                    let mut outputs = CookOutputs::new();
                    outputs.insert("value".to_string(), value);
                    Ok(outputs)
                },
            ));
            node
        },
    ));

    // ========================================================================
    // Math
    // ========================================================================

    registry.register(NodeTemplate::new(
        "math.add",
        "Math",
        "Add two values",
        || {
            let mut node = Node::new("Add", "math.add").with_caching(true);
            node.add_input(Connector::input("a", DataType::Float));
            node.add_input(Connector::input("b", DataType::Float));
            node.add_output(Connector::output("sum", DataType::Float));
            node.set_body(Box::new(
                |inputs: &CookInputs,
                 _params: &IndexMap<String, Parameter>|
                 -> Result<CookOutputs, CookError> {
                    let a = inputs.get_or_null("a").as_float().unwrap_or(0.0);
                    let b = inputs.get_or_null("b").as_float().unwrap_or(0.0);
                    let mut outputs = CookOutputs::new();
                    outputs.insert("sum".to_string(), Value::Float(a + b));
                    Ok(outputs)
                },
            ));
            node
        },
    ));

    registry.register(NodeTemplate::new(
        "math.multiply",
        "Math",
        "Multiply two values",
        || {
            let mut node = Node::new("Multiply", "math.multiply").with_caching(true);
            node.add_input(Connector::input("a", DataType::Float).with_default(Value::Float(1.0)));
            node.add_input(Connector::input("b", DataType::Float).with_default(Value::Float(1.0)));
            node.add_output(Connector::output("product", DataType::Float));
            node.set_body(Box::new(
                |inputs: &CookInputs,
                 _params: &IndexMap<String, Parameter>|
                 -> Result<CookOutputs, CookError> {
                    let a = inputs.get_or_null("a").as_float().unwrap_or(1.0);
                    let b = inputs.get_or_null("b").as_float().unwrap_or(1.0);
                    let mut outputs = CookOutputs::new();
                    outputs.insert("product".to_string(), Value::Float(a * b));
                    Ok(outputs)
                },
            ));
            node
        },
    ));

    // ========================================================================
    // Strings
    // ========================================================================

    registry.register(NodeTemplate::new(
        "string.join",
        "String",
        "Join every connected string with a separator",
        || {
            let mut node = Node::new("Join", "string.join").with_caching(true);
            node.add_input(Connector::input("strings", DataType::String).with_multi(true));
            node.add_parameter(
                Parameter::new("separator", DataType::String)
                    .with_default(Value::String(", ".to_string()))
                    .with_label("Separator"),
            );
            node.add_output(Connector::output("joined", DataType::String));
            node.set_body(Box::new(
                |inputs: &CookInputs,
                 params: &IndexMap<String, Parameter>|
                 -> Result<CookOutputs, CookError> {
                    let separator = params
                        .get("separator")
                        .and_then(|p| p.value().as_str().map(ToString::to_string))
                        .unwrap_or_default();
                    let pieces: Vec<String> = match inputs.get_or_null("strings") {
                        Value::List(values) => values
                            .iter()
                            .filter_map(|v| v.as_str().map(ToString::to_string))
                            .collect(),
                        Value::String(s) => vec![s.clone()],
                        _ => Vec::new(),
                    };
                    let mut outputs = CookOutputs::new();
                    outputs.insert("joined".to_string(), Value::String(pieces.join(&separator)));
                    Ok(outputs)
                },
            ));
            node
        },
    ));

    registry
}
