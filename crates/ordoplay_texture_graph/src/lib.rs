// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph dataflow engine for `OrdoPlay` texture authoring.
//!
//! Users wire image-processing nodes (color adjustment, mixing, vector math,
//! format conversion) into a directed acyclic graph and the engine evaluates
//! it pass by pass.
//!
//! ## Architecture
//!
//! - [`socket`]: closed set of value types and exact-identity compatibility
//! - [`port`] / [`node`]: typed slots, one `Node` type with a [`Strategy`] tag
//!   and a boxed [`NodeKernel`] doing the per-kind computation
//! - [`graph`]: node storage, fan-in-of-one connections, cycle detection and
//!   topological ordering
//! - [`evaluation`]: single-threaded passes with per-node failure isolation
//!   and generation-based memoization
//! - [`registry`] / [`nodes`]: the built-in node catalogue
//! - [`surface`]: drawing a node body in the editor

pub mod connection;
pub mod evaluation;
pub mod graph;
pub mod node;
pub mod nodes;
pub mod port;
pub mod registry;
pub mod settings;
pub mod socket;
pub mod surface;

pub use connection::{Connection, ConnectionId, InputRef, OutputRef, PortRef};
pub use evaluation::{evaluate, EvaluationError, Evaluator, PassReport};
pub use graph::{ConnectError, CycleError, EndpointError, Graph};
pub use node::{
    ComputeError, Inputs, Node, NodeCategory, NodeId, NodeKernel, NodeState, ParamValue,
    ParameterError, PortLayout, Strategy,
};
pub use nodes::create_texture_registry;
pub use port::{Port, PortDirection};
pub use registry::{NodeRegistry, NodeType};
pub use settings::{EvaluatorSettings, SettingsError};
pub use socket::{is_compatible, AcceptedTypes, ImageBuffer, MaskBuffer, SocketType, SocketValue, TextureHandle};
