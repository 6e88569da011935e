// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dataflow node graph engine for Opal Editor.
//!
//! A directed graph of processing nodes connected through typed
//! connectors, with lazy, cache-aware re-evaluation ("cooking") and
//! cycle-safe mutation. The editor shell renders and rewires; this crate
//! keeps the graph valid and recomputes correct results.
//!
//! ## Architecture
//!
//! - [`Network`] owns every [`Node`] and the authoritative connection
//!   list, rejects cycles at connection time, and schedules cooking:
//!   [`Network::execute`] orders a node's transitive ancestors locally
//!   before the node itself.
//! - [`Node`] owns its [`Parameter`]s and [`Connector`]s and runs the
//!   cook/dirty state machine over a [`CookBody`].
//! - [`Signal`] channels on networks, nodes, and parameters are the sole
//!   observation surface for a presentation layer.
//! - [`NetworkDoc`] mirrors the graph for serialization; connections are
//!   re-validated on restore.

pub mod builtin;
pub mod connector;
pub mod evaluation;
pub mod network;
pub mod node;
pub mod parameter;
pub mod registry;
pub mod serialize;
pub mod signal;
pub mod value;

pub use builtin::create_builtin_registry;
pub use connector::{Connector, ConnectorDirection, ConnectorKey};
pub use evaluation::{CookBody, CookError, CookInputs, CookOutputs};
pub use network::{Connection, ConnectionError, GraphError, Network};
pub use node::{CookState, Node, NodeId};
pub use parameter::Parameter;
pub use registry::{NodeTemplate, NodeTypeRegistry};
pub use serialize::{ConnectorDoc, NetworkDoc, NodeDoc, ParameterDoc};
pub use signal::{Signal, SubscriptionId};
pub use value::{default_value_for, DataType, Value};
