// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the graph.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// The n-th output port of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputRef {
    /// Owning node
    pub node: NodeId,
    /// Position among the node's outputs
    pub output: usize,
}

impl OutputRef {
    /// Create an output reference
    pub fn new(node: NodeId, output: usize) -> Self {
        Self { node, output }
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.out[{}]", self.node, self.output)
    }
}

/// The n-th input port of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputRef {
    /// Owning node
    pub node: NodeId,
    /// Position among the node's inputs
    pub input: usize,
}

impl InputRef {
    /// Create an input reference
    pub fn new(node: NodeId, input: usize) -> Self {
        Self { node, input }
    }
}

impl fmt::Display for InputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.in[{}]", self.node, self.input)
    }
}

/// A port addressed by its position in the node's full port list
/// (inputs first, then outputs), as seen by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    /// Owning node
    pub node: NodeId,
    /// Position in `Node::ports()`
    pub port: usize,
}

impl PortRef {
    /// Create a port reference
    pub fn new(node: NodeId, port: usize) -> Self {
        Self { node, port }
    }
}

/// A directed edge from one output port to one input port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Upstream output
    pub source: OutputRef,
    /// Downstream input
    pub target: InputRef,
}

impl Connection {
    /// Create a new connection
    pub fn new(source: OutputRef, target: InputRef) -> Self {
        Self {
            id: ConnectionId::new(),
            source,
            target,
        }
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.source.node == node_id || self.target.node == node_id
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}
