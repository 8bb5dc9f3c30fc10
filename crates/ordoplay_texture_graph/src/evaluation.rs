// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph evaluation and execution.
//!
//! One call to [`Evaluator::evaluate`] is one complete, synchronous pass:
//!
//! 1. a cycle anywhere in the graph fails the pass before any node runs,
//! 2. nodes are ordered with Kahn's algorithm (ties broken by ascending id),
//! 3. each node copies its upstream values in, then runs according to its
//!    [`Strategy`], and its outputs are stamped with fresh generations.
//!
//! A node that fails keeps its previous outputs and the pass carries on.
//! The evaluator keeps nothing between passes; the only cross-pass state is
//! the memo stored inside Memoized nodes.

use crate::graph::Graph;
use crate::node::{ComputeError, NodeId, NodeState, Strategy};
use crate::settings::EvaluatorSettings;
use crate::socket::SocketValue;

/// Outcome of a single pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    /// Execution order
    pub order: Vec<NodeId>,
    /// Nodes whose computation ran
    pub computed: Vec<NodeId>,
    /// Memoized nodes that reused their cached outputs
    pub reused: Vec<NodeId>,
    /// Nodes that failed, with the reason
    pub failures: Vec<(NodeId, ComputeError)>,
}

impl PassReport {
    /// Whether no node failed
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// The failure recorded for a node in this pass
    pub fn failure(&self, node_id: NodeId) -> Option<&ComputeError> {
        self.failures
            .iter()
            .find(|(id, _)| *id == node_id)
            .map(|(_, err)| err)
    }
}

/// Pass-level failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    /// Graph contains a cycle; no node was executed
    #[error("Graph contains a cycle through {}", format_cycle(.nodes))]
    CycleDetected {
        /// Nodes on one detected cycle
        nodes: Vec<NodeId>,
    },
}

fn format_cycle(nodes: &[NodeId]) -> String {
    nodes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// What happened to a node before its outputs are written back
enum NodeOutcome {
    Computed {
        outputs: Vec<SocketValue>,
        input_generations: Vec<u64>,
    },
    Reused,
    Failed(ComputeError),
}

/// Drives evaluation passes over a graph
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    settings: EvaluatorSettings,
}

impl Evaluator {
    /// Create an evaluator with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an evaluator with explicit settings
    pub fn with_settings(settings: EvaluatorSettings) -> Self {
        Self { settings }
    }

    /// Active settings
    pub fn settings(&self) -> &EvaluatorSettings {
        &self.settings
    }

    /// Run one pass over `graph`.
    ///
    /// Node failures are recorded in the report and on the nodes themselves;
    /// only a cycle fails the pass.
    pub fn evaluate(&self, graph: &mut Graph) -> Result<PassReport, EvaluationError> {
        let span = tracing::info_span!("evaluate_pass", graph = %graph.name, nodes = graph.node_count());
        let _enter = span.enter();

        if let Some(nodes) = graph.find_cycle() {
            tracing::warn!(cycle = %format_cycle(&nodes), "refusing to evaluate cyclic graph");
            return Err(EvaluationError::CycleDetected { nodes });
        }
        let order = graph
            .topological_order()
            .map_err(|_| EvaluationError::CycleDetected { nodes: Vec::new() })?;

        for id in &order {
            if let Some(node) = graph.node_mut(*id) {
                node.set_state(NodeState::Pending);
                node.record_error(None);
            }
        }

        let mut report = PassReport {
            order: order.clone(),
            ..PassReport::default()
        };

        for id in order {
            match self.run_node(graph, id) {
                Some(NodeOutcome::Computed { outputs, input_generations }) => {
                    let stamps: Vec<u64> = outputs.iter().map(|_| graph.next_generation()).collect();
                    if let Some(node) = graph.node_mut(id) {
                        for ((port, value), stamp) in node.outputs_mut().iter_mut().zip(outputs).zip(stamps) {
                            port.write(value, stamp);
                        }
                        node.remember_generations(input_generations);
                        node.set_state(NodeState::Computed);
                    }
                    tracing::debug!(node = %id, "computed");
                    report.computed.push(id);
                }
                Some(NodeOutcome::Reused) => {
                    if let Some(node) = graph.node_mut(id) {
                        node.set_state(NodeState::Reused);
                    }
                    tracing::debug!(node = %id, "reused cached outputs");
                    report.reused.push(id);
                }
                Some(NodeOutcome::Failed(error)) => {
                    self.fail_node(graph, id, &error);
                    report.failures.push((id, error));
                }
                None => {}
            }
        }

        if self.settings.log_pass_summary {
            tracing::info!(
                computed = report.computed.len(),
                reused = report.reused.len(),
                failed = report.failures.len(),
                "pass finished"
            );
        }

        Ok(report)
    }

    /// Propagate inputs into `id` and decide whether and how it runs
    fn run_node(&self, graph: &mut Graph, id: NodeId) -> Option<NodeOutcome> {
        let input_count = graph.node(id)?.input_count();

        // Copy upstream values first; the copy is owned by the consumer.
        let incoming: Vec<Option<(Option<SocketValue>, u64)>> = (0..input_count)
            .map(|input| {
                let connection = graph.connection_to(id, input)?;
                let source = graph
                    .node(connection.source.node)?
                    .output(connection.source.output)?;
                Some((source.value().cloned(), source.generation()))
            })
            .collect();

        let node = graph.node_mut(id)?;
        for (port, incoming) in node.inputs_mut().iter_mut().zip(incoming) {
            match incoming {
                Some((value, generation)) => {
                    port.value = value;
                    port.generation = generation;
                }
                None => port.reset_to_default(),
            }
            tracing::trace!(node = %id, port = %port.name, generation = port.generation, "input resolved");
        }

        let mut values = Vec::with_capacity(input_count);
        for (index, port) in node.inputs().iter().enumerate() {
            let Some(value) = port.value() else {
                return Some(NodeOutcome::Failed(ComputeError::MissingInput {
                    index,
                    name: port.name.clone(),
                }));
            };
            if !port.accepts(value.socket_type()) {
                return Some(NodeOutcome::Failed(ComputeError::InputType {
                    index,
                    expected: port.accepted.to_string(),
                    found: value.socket_type(),
                }));
            }
            values.push(value.clone());
        }
        let input_generations: Vec<u64> = node.inputs().iter().map(|p| p.generation()).collect();
        node.set_state(NodeState::Ready);

        let memoized = self.settings.memoization && node.strategy() == Strategy::Memoized;
        if memoized && node.last_computed_generations() == Some(input_generations.as_slice()) {
            return Some(NodeOutcome::Reused);
        }

        let outputs = match node.run_kernel(&values) {
            Ok(outputs) => outputs,
            Err(error) => return Some(NodeOutcome::Failed(error)),
        };

        if outputs.len() != node.output_count() {
            return Some(NodeOutcome::Failed(ComputeError::OutputCount {
                expected: node.output_count(),
                found: outputs.len(),
            }));
        }
        for (index, (port, value)) in node.outputs().iter().zip(&outputs).enumerate() {
            if let Some(expected) = port.output_type() {
                if value.socket_type() != expected {
                    return Some(NodeOutcome::Failed(ComputeError::OutputType {
                        index,
                        expected,
                        found: value.socket_type(),
                    }));
                }
            }
        }

        Some(NodeOutcome::Computed {
            outputs,
            input_generations,
        })
    }

    /// Record a failure; outputs keep their previous values
    fn fail_node(&self, graph: &mut Graph, id: NodeId, error: &ComputeError) {
        tracing::warn!(node = %id, %error, "node failed");

        let empty_outputs: Vec<usize> = graph
            .node(id)
            .map(|node| {
                node.outputs()
                    .iter()
                    .enumerate()
                    .filter(|(_, port)| port.value().is_none())
                    .map(|(index, _)| index)
                    .collect()
            })
            .unwrap_or_default();

        let fills: Vec<(usize, u64)> = if self.settings.zero_fill_failed_outputs {
            empty_outputs
                .into_iter()
                .map(|index| (index, graph.next_generation()))
                .collect()
        } else {
            Vec::new()
        };

        if let Some(node) = graph.node_mut(id) {
            for (index, stamp) in fills {
                let port = &mut node.outputs_mut()[index];
                if let Some(zero) = port.output_type().map(|t| t.zero_value()) {
                    port.write(zero, stamp);
                }
            }
            node.set_state(NodeState::Failed);
            node.record_error(Some(error.clone()));
        }
    }
}

/// Run one pass with default settings
pub fn evaluate(graph: &mut Graph) -> Result<PassReport, EvaluationError> {
    Evaluator::new().evaluate(graph)
}
