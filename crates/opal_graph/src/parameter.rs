// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editable node parameters.

use crate::signal::Signal;
use crate::value::{default_value_for, DataType, Value};
use std::fmt;

/// A named, typed, editable value owned by a node.
///
/// Parameters control node behavior independently of connector data flow.
/// The current value is always defined: construction falls back to the
/// type-default lookup when no explicit default is given.
///
/// The engine performs no type or bounds validation on `set_value`; that is
/// deliberately left to the editing layer or the node type.
pub struct Parameter {
    /// Parameter identifier, unique within the owning node.
    pub name: String,
    /// Type tag for editors; not enforced on writes.
    pub data_type: DataType,
    /// Human-readable name shown by editors.
    pub label: String,
    /// Lower bound hint for numeric editors.
    pub min_value: Option<f32>,
    /// Upper bound hint for numeric editors.
    pub max_value: Option<f32>,
    /// Choices for menu/enum-style parameters.
    pub menu_items: Vec<String>,
    /// Tooltip/description text.
    pub description: String,
    /// Emitted with the new value whenever `set_value` actually changes it.
    pub value_changed: Signal<Value>,
    value: Value,
    default_value: Value,
}

impl Parameter {
    /// Create a parameter whose value and default are the type default.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        let name = name.into();
        let default = default_value_for(data_type);
        Self {
            label: name.clone(),
            name,
            data_type,
            min_value: None,
            max_value: None,
            menu_items: Vec::new(),
            description: String::new(),
            value_changed: Signal::new(),
            value: default.clone(),
            default_value: default,
        }
    }

    /// Set the default value; resets the current value to match.
    pub fn with_default(mut self, value: Value) -> Self {
        self.value = value.clone();
        self.default_value = value;
        self
    }

    /// Set the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set numeric bounds hints.
    pub fn with_bounds(mut self, min: f32, max: f32) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    /// Set the menu choices.
    pub fn with_menu(mut self, items: Vec<String>) -> Self {
        self.menu_items = items;
        self
    }

    /// Set the description text.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Current value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Default value.
    pub fn default_value(&self) -> &Value {
        &self.default_value
    }

    /// Replace the current value. Emits `value_changed` and returns `true`
    /// only when the new value differs from the old one.
    pub fn set_value(&mut self, value: Value) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        let current = self.value.clone();
        self.value_changed.emit(&current);
        true
    }

    /// Replace the current value without emitting. Returns `true` when the
    /// value changed. Used when restoring a document.
    pub fn set_value_silent(&mut self, value: Value) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        true
    }

    /// Reset the current value back to the default.
    pub fn reset_to_default(&mut self) -> bool {
        let default = self.default_value.clone();
        self.set_value(default)
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("data_type", &self.data_type)
            .field("value", &self.value)
            .field("default_value", &self.default_value)
            .finish()
    }
}
