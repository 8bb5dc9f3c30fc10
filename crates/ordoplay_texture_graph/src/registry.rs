// SPDX-License-Identifier: MIT OR Apache-2.0
//! Static registry of node kinds.
//!
//! Each entry maps a kind identifier to a plain constructor function; the
//! palette lists entries and the loader creates nodes by id.

use crate::node::{Node, NodeCategory, NodeKernel, PortLayout};
use indexmap::IndexMap;

/// Constructor producing a fresh kernel with default parameters
pub type NodeConstructor = fn() -> Box<dyn NodeKernel>;

/// Node type definition
#[derive(Debug, Clone)]
pub struct NodeType {
    /// Unique type identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Category
    pub category: NodeCategory,
    /// Description
    pub description: String,
    /// Constructor
    pub constructor: NodeConstructor,
}

impl NodeType {
    /// Describe a node kind
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: NodeCategory,
        description: impl Into<String>,
        constructor: NodeConstructor,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            description: description.into(),
            constructor,
        }
    }

    /// Port layout nodes of this type are created with
    pub fn port_layout(&self) -> PortLayout {
        (self.constructor)().initialize_ports()
    }
}

/// Registry of available node types
pub struct NodeRegistry {
    /// Registered node types by ID
    types: IndexMap<String, NodeType>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            types: IndexMap::new(),
        }
    }

    /// Register a node type, replacing any previous entry with the same id
    pub fn register(&mut self, node_type: NodeType) {
        if let Some(previous) = self.types.insert(node_type.id.clone(), node_type) {
            tracing::debug!(id = %previous.id, "replaced node type registration");
        }
    }

    /// Get a node type by ID
    pub fn get(&self, id: &str) -> Option<&NodeType> {
        self.types.get(id)
    }

    /// Whether a type is registered
    pub fn contains(&self, id: &str) -> bool {
        self.types.contains_key(id)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }

    /// Get types by category
    pub fn types_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeType> {
        self.types.values().filter(move |t| t.category == category)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Create a node from a type ID
    pub fn create_node(&self, type_id: &str) -> Option<Node> {
        self.get(type_id)
            .map(|t| Node::from_boxed((t.constructor)()).with_name(t.name.clone()))
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
