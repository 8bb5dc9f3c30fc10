// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and connections.
//!
//! Structural invariants kept here:
//! - every connection references existing nodes and ports,
//! - an input port has at most one incoming connection (a new one replaces it),
//! - removing a node removes every connection touching it.
//!
//! Acyclicity is *not* enforced while editing; the evaluator checks it before a
//! pass starts.

use crate::connection::{Connection, ConnectionId, InputRef, OutputRef, PortRef};
use crate::node::{Node, NodeId};
use crate::port::PortDirection;
use crate::socket::{AcceptedTypes, SocketType};
use indexmap::IndexMap;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// A node graph
#[derive(Debug)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Nodes in insertion order
    nodes: IndexMap<NodeId, Node>,
    /// Connections keyed by their target input
    connections: IndexMap<InputRef, Connection>,
    /// Last generation handed out to an output write
    revision: u64,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            connections: IndexMap::new(),
            revision: 0,
        }
    }

    /// Add a node to the graph.
    ///
    /// The node is given a fresh id on insertion, so ascending id order is
    /// insertion order. Use the returned id from here on.
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        let id = NodeId::new();
        node.assign_id(id);
        tracing::trace!(node = %id, kind = node.kind(), "add node");
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node and its connections
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let node = self.nodes.shift_remove(&node_id)?;
        let before = self.connections.len();
        self.connections.retain(|_, c| !c.involves_node(node_id));
        tracing::trace!(
            node = %node_id,
            removed_connections = before - self.connections.len(),
            "remove node"
        );
        Some(node)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Whether the graph contains a node
    pub fn contains_node(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Connect the `output`-th output of `source` to the `input`-th input of
    /// `target`.
    ///
    /// Any connection already feeding that input is replaced. On error the
    /// graph is left untouched.
    pub fn connect(
        &mut self,
        source: NodeId,
        output: usize,
        target: NodeId,
        input: usize,
    ) -> Result<Connection, ConnectError> {
        let source_node = self
            .nodes
            .get(&source)
            .ok_or(EndpointError::NodeNotFound(source))?;
        let target_node = self
            .nodes
            .get(&target)
            .ok_or(EndpointError::NodeNotFound(target))?;

        let output_type = source_node
            .output(output)
            .and_then(|p| p.output_type())
            .ok_or(EndpointError::NoSuchOutput { node: source, index: output })?;
        let target_port = target_node
            .input(input)
            .ok_or(EndpointError::NoSuchInput { node: target, index: input })?;

        if !target_port.accepts(output_type) {
            return Err(ConnectError::TypeMismatch {
                output: output_type,
                accepted: target_port.accepted.clone(),
            });
        }

        let connection = Connection::new(OutputRef::new(source, output), InputRef::new(target, input));
        if let Some(previous) = self.connections.insert(connection.target, connection) {
            tracing::debug!(%previous, replacement = %connection, "replaced connection");
        }
        Ok(connection)
    }

    /// Connect two ports addressed by their position in `Node::ports()`.
    ///
    /// `from` must be an output and `to` an input.
    pub fn connect_ports(&mut self, from: PortRef, to: PortRef) -> Result<Connection, ConnectError> {
        let output = self.directional_index(from, PortDirection::Output)?;
        let input = self.directional_index(to, PortDirection::Input)?;
        self.connect(from.node, output, to.node, input)
    }

    fn directional_index(&self, port: PortRef, expected: PortDirection) -> Result<usize, EndpointError> {
        let node = self
            .nodes
            .get(&port.node)
            .ok_or(EndpointError::NodeNotFound(port.node))?;
        let found = node
            .port(port.port)
            .ok_or(EndpointError::NoSuchPort { node: port.node, index: port.port })?;
        if found.direction != expected {
            return Err(EndpointError::WrongDirection {
                node: port.node,
                index: port.port,
                expected,
            });
        }
        Ok(match expected {
            PortDirection::Input => port.port,
            PortDirection::Output => port.port - node.input_count(),
        })
    }

    /// Remove the connection feeding an input, if any
    pub fn disconnect(&mut self, target: NodeId, input: usize) -> Option<Connection> {
        self.connections.shift_remove(&InputRef::new(target, input))
    }

    /// Remove a connection by ID
    pub fn disconnect_by_id(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        let key = self
            .connections
            .iter()
            .find(|(_, c)| c.id == connection_id)
            .map(|(key, _)| *key)?;
        self.connections.shift_remove(&key)
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// The connection feeding an input
    pub fn connection_to(&self, target: NodeId, input: usize) -> Option<&Connection> {
        self.connections.get(&InputRef::new(target, input))
    }

    /// Fan-out of an output
    pub fn connections_from(&self, source: NodeId, output: usize) -> impl Iterator<Item = &Connection> {
        let source = OutputRef::new(source, output);
        self.connections.values().filter(move |c| c.source == source)
    }

    /// Get connections involving a node
    pub fn connections_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.involves_node(node_id))
    }

    /// Nodes whose outputs feed `node_id`, ascending and without duplicates
    pub fn upstream_of(&self, node_id: NodeId) -> Vec<NodeId> {
        let mut upstream: Vec<NodeId> = self
            .connections
            .values()
            .filter(|c| c.target.node == node_id)
            .map(|c| c.source.node)
            .collect();
        upstream.sort_unstable();
        upstream.dedup();
        upstream
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Whether any cycle exists in the graph
    pub fn detect_cycle(&self) -> bool {
        self.find_cycle().is_some()
    }

    /// Find one cycle with a three-color depth-first search.
    ///
    /// Returns the nodes on the cycle in edge order, starting from the node
    /// where the search closed it.
    pub fn find_cycle(&self) -> Option<Vec<NodeId>> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let successors = self.successors();
        let mut color: HashMap<NodeId, Color> =
            self.nodes.keys().map(|id| (*id, Color::White)).collect();

        for &root in self.nodes.keys() {
            if color[&root] != Color::White {
                continue;
            }

            // Iterative DFS: (node, next successor to visit)
            let mut stack: Vec<(NodeId, usize)> = vec![(root, 0)];
            color.insert(root, Color::Gray);

            while let Some(&(node, next)) = stack.last() {
                let children = successors.get(&node).map_or(&[][..], Vec::as_slice);
                if let Some(&child) = children.get(next) {
                    if let Some(top) = stack.last_mut() {
                        top.1 += 1;
                    }
                    match color[&child] {
                        Color::White => {
                            color.insert(child, Color::Gray);
                            stack.push((child, 0));
                        }
                        Color::Gray => {
                            let start = stack.iter().position(|(n, _)| *n == child).unwrap_or(0);
                            return Some(stack[start..].iter().map(|(n, _)| *n).collect());
                        }
                        Color::Black => {}
                    }
                } else {
                    color.insert(node, Color::Black);
                    stack.pop();
                }
            }
        }

        None
    }

    /// Get nodes in topological order (for evaluation).
    ///
    /// Kahn's algorithm; among nodes that are ready at the same time the one
    /// with the smallest id runs first, so the order is reproducible.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, CycleError> {
        let successors = self.successors();
        let mut in_degree: HashMap<NodeId, usize> = self.nodes.keys().map(|id| (*id, 0)).collect();
        for targets in successors.values() {
            for target in targets {
                if let Some(degree) = in_degree.get_mut(target) {
                    *degree += 1;
                }
            }
        }

        let mut ready: BinaryHeap<Reverse<NodeId>> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| Reverse(*id))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(Reverse(node)) = ready.pop() {
            order.push(node);
            for target in successors.get(&node).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(target) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse(*target));
                    }
                }
            }
        }

        if order.len() < self.nodes.len() {
            return Err(CycleError);
        }
        Ok(order)
    }

    /// Downstream node per connection, in connection order (duplicates kept so
    /// in-degrees count edges)
    fn successors(&self) -> HashMap<NodeId, Vec<NodeId>> {
        let mut successors: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for connection in self.connections.values() {
            successors
                .entry(connection.source.node)
                .or_default()
                .push(connection.target.node);
        }
        successors
    }

    /// Hand out the next output generation
    pub(crate) fn next_generation(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Why a connection endpoint is invalid
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Output index out of range
    #[error("Node {node} has no output {index}")]
    NoSuchOutput {
        /// Node
        node: NodeId,
        /// Requested output
        index: usize,
    },

    /// Input index out of range
    #[error("Node {node} has no input {index}")]
    NoSuchInput {
        /// Node
        node: NodeId,
        /// Requested input
        index: usize,
    },

    /// Port index out of range
    #[error("Node {node} has no port {index}")]
    NoSuchPort {
        /// Node
        node: NodeId,
        /// Requested port
        index: usize,
    },

    /// Source is not an output or target is not an input
    #[error("Port {index} on node {node} is not an {expected:?} port")]
    WrongDirection {
        /// Node
        node: NodeId,
        /// Port position
        index: usize,
        /// Direction the endpoint needed
        expected: PortDirection,
    },
}

/// Error when creating a connection
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    /// Incompatible socket types
    #[error("Type mismatch: {output} output cannot feed an input accepting {accepted}")]
    TypeMismatch {
        /// Type produced by the source
        output: SocketType,
        /// Types the target accepts
        accepted: AcceptedTypes,
    },

    /// Missing node or port, or wrong direction
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(#[from] EndpointError),
}

/// Error when graph contains a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Graph contains a cycle")]
pub struct CycleError;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::tests::Passthrough;
    use crate::nodes::input::{ColorConstant, ScalarConstant};
    use crate::nodes::math::{MathNode, MathOp};

    fn chain(len: usize) -> (Graph, Vec<NodeId>) {
        let mut graph = Graph::default();
        let ids: Vec<NodeId> = (0..len).map(|_| graph.add_node(Node::new(Passthrough))).collect();
        for pair in ids.windows(2) {
            graph.connect(pair[0], 0, pair[1], 0).unwrap();
        }
        (graph, ids)
    }

    #[test]
    fn test_connect_validates_endpoints() {
        let mut graph = Graph::default();
        let a = graph.add_node(Node::new(ScalarConstant::new(1.0)));
        let b = graph.add_node(Node::new(MathNode::new(MathOp::Add)));

        assert_eq!(
            graph.connect(NodeId(u64::MAX), 0, b, 0),
            Err(ConnectError::InvalidEndpoint(EndpointError::NodeNotFound(NodeId(u64::MAX))))
        );
        assert_eq!(
            graph.connect(a, 1, b, 0),
            Err(ConnectError::InvalidEndpoint(EndpointError::NoSuchOutput { node: a, index: 1 }))
        );
        assert_eq!(
            graph.connect(a, 0, b, 2),
            Err(ConnectError::InvalidEndpoint(EndpointError::NoSuchInput { node: b, index: 2 }))
        );
        assert_eq!(graph.connection_count(), 0);
    }

    #[test]
    fn test_type_mismatch_leaves_graph_unchanged() {
        let mut graph = Graph::default();
        let color = graph.add_node(Node::new(ColorConstant::new([1.0, 0.0, 0.0, 1.0])));
        let scalar = graph.add_node(Node::new(ScalarConstant::new(1.0)));
        let math = graph.add_node(Node::new(MathNode::new(MathOp::Add)));
        let existing = graph.connect(scalar, 0, math, 0).unwrap();

        let err = graph.connect(color, 0, math, 0).unwrap_err();
        assert!(matches!(
            err,
            ConnectError::TypeMismatch { output: SocketType::Color, .. }
        ));
        assert_eq!(graph.connection_count(), 1);
        assert_eq!(graph.connection_to(math, 0), Some(&existing));
    }

    #[test]
    fn test_connect_replaces_existing_input_connection() {
        let mut graph = Graph::default();
        let a = graph.add_node(Node::new(ScalarConstant::new(1.0)));
        let b = graph.add_node(Node::new(ScalarConstant::new(2.0)));
        let math = graph.add_node(Node::new(MathNode::new(MathOp::Add)));

        graph.connect(a, 0, math, 0).unwrap();
        let replacement = graph.connect(b, 0, math, 0).unwrap();

        assert_eq!(graph.connections().filter(|c| c.target == InputRef::new(math, 0)).count(), 1);
        assert_eq!(graph.connection_to(math, 0), Some(&replacement));
        assert_eq!(graph.connections_from(a, 0).count(), 0);
        assert_eq!(graph.connections_from(b, 0).count(), 1);
    }

    #[test]
    fn test_fan_out() {
        let mut graph = Graph::default();
        let a = graph.add_node(Node::new(ScalarConstant::new(2.0)));
        let math = graph.add_node(Node::new(MathNode::new(MathOp::Add)));
        graph.connect(a, 0, math, 0).unwrap();
        graph.connect(a, 0, math, 1).unwrap();

        assert_eq!(graph.connections_from(a, 0).count(), 2);
        assert_eq!(graph.upstream_of(math), vec![a]);
    }

    #[test]
    fn test_connect_ports_checks_direction() {
        let mut graph = Graph::default();
        let a = graph.add_node(Node::new(Passthrough));
        let b = graph.add_node(Node::new(Passthrough));

        // Port 0 is the input, port 1 the output
        let err = graph.connect_ports(PortRef::new(a, 0), PortRef::new(b, 0)).unwrap_err();
        assert!(matches!(
            err,
            ConnectError::InvalidEndpoint(EndpointError::WrongDirection {
                expected: PortDirection::Output,
                ..
            })
        ));
        let err = graph.connect_ports(PortRef::new(a, 1), PortRef::new(b, 1)).unwrap_err();
        assert!(matches!(
            err,
            ConnectError::InvalidEndpoint(EndpointError::WrongDirection {
                expected: PortDirection::Input,
                ..
            })
        ));
        assert!(matches!(
            graph.connect_ports(PortRef::new(a, 5), PortRef::new(b, 0)),
            Err(ConnectError::InvalidEndpoint(EndpointError::NoSuchPort { index: 5, .. }))
        ));

        let connection = graph.connect_ports(PortRef::new(a, 1), PortRef::new(b, 0)).unwrap();
        assert_eq!(connection.source, OutputRef::new(a, 0));
        assert_eq!(connection.target, InputRef::new(b, 0));
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let (mut graph, ids) = chain(2);
        assert!(graph.disconnect(ids[1], 0).is_some());
        assert!(graph.disconnect(ids[1], 0).is_none());
        assert_eq!(graph.connection_count(), 0);
    }

    #[test]
    fn test_disconnect_by_id() {
        let (mut graph, ids) = chain(3);
        let id = graph.connection_to(ids[2], 0).unwrap().id;
        assert!(graph.disconnect_by_id(id).is_some());
        assert!(graph.disconnect_by_id(id).is_none());
        assert_eq!(graph.connection_count(), 1);
    }

    #[test]
    fn test_remove_node_removes_its_connections() {
        let (mut graph, ids) = chain(3);
        assert!(graph.remove_node(ids[1]).is_some());
        assert_eq!(graph.connection_count(), 0);
        assert!(graph.connections().all(|c| !c.involves_node(ids[1])));
        assert!(graph.remove_node(ids[1]).is_none());
    }

    #[test]
    fn test_topological_order_breaks_ties_by_id() {
        let mut graph = Graph::default();
        let a = graph.add_node(Node::new(Passthrough));
        let b = graph.add_node(Node::new(Passthrough));
        let c = graph.add_node(Node::new(Passthrough));
        // c feeds a; b is independent
        graph.connect(c, 0, a, 0).unwrap();

        assert_eq!(graph.topological_order().unwrap(), vec![b, c, a]);
    }

    #[test]
    fn test_ids_follow_insertion_order() {
        let mut graph = Graph::default();
        let created_first = Node::new(Passthrough);
        let created_second = Node::new(Passthrough);
        let second = graph.add_node(created_second);
        let first = graph.add_node(created_first);

        assert!(second < first);
        assert_eq!(graph.node(second).unwrap().id(), second);
        assert_eq!(graph.topological_order().unwrap(), vec![second, first]);
    }

    #[test]
    fn test_cycles_are_allowed_while_editing() {
        let (mut graph, ids) = chain(3);
        assert!(!graph.detect_cycle());

        graph.connect(ids[2], 0, ids[0], 0).unwrap();
        assert!(graph.detect_cycle());
        assert_eq!(graph.topological_order(), Err(CycleError));

        let cycle = graph.find_cycle().unwrap();
        assert_eq!(cycle.len(), 3);
        for id in &ids {
            assert!(cycle.contains(id));
        }
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let mut graph = Graph::default();
        let a = graph.add_node(Node::new(Passthrough));
        graph.connect(a, 0, a, 0).unwrap();
        assert_eq!(graph.find_cycle(), Some(vec![a]));
    }
}
