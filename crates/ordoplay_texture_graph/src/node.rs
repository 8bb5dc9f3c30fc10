// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph framework.
//!
//! A [`Node`] is one type for every kind of computation: the per-kind behavior
//! lives in a boxed [`NodeKernel`], and the evaluation strategy is an explicit
//! [`Strategy`] tag that the evaluator branches on.

use crate::port::{Port, PortDirection};
use crate::socket::{ImageBuffer, MaskBuffer, SocketType, SocketValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a node.
///
/// Ids are never reused. [`Graph::add_node`](crate::graph::Graph::add_node)
/// issues a fresh one on insertion, so within a graph ascending id order is
/// insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Allocate the next node ID
    pub fn new() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Node type category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Input nodes (constants, imported images)
    Input,
    /// Output nodes (result, preview)
    Output,
    /// Scalar math
    Math,
    /// Vector math
    Vector,
    /// Color adjustment and mixing
    Color,
    /// Format conversion between socket types
    Convert,
}

/// How a node decides whether to run its computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Strategy {
    /// Compute on every pass
    #[default]
    Eager,
    /// Compute only when an input generation advanced since the last success
    Memoized,
}

/// Per-pass node state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeState {
    /// Not yet visited in this pass
    #[default]
    Pending,
    /// All inputs resolved
    Ready,
    /// Computation ran and outputs were written
    Computed,
    /// Memoized node skipped computation; outputs kept from the cache
    Reused,
    /// Computation failed; outputs kept their previous values
    Failed,
}

/// Node-local computation failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComputeError {
    /// A required input has no connection and no default
    #[error("Missing required input '{name}' (input {index})")]
    MissingInput {
        /// Input position
        index: usize,
        /// Port label
        name: String,
    },

    /// An input holds a value of the wrong type
    #[error("Input {index} expected {expected}, got {found}")]
    InputType {
        /// Input position
        index: usize,
        /// What the node wanted
        expected: String,
        /// What arrived
        found: SocketType,
    },

    /// The kernel produced the wrong number of outputs
    #[error("Produced {found} outputs, expected {expected}")]
    OutputCount {
        /// Declared output count
        expected: usize,
        /// Returned output count
        found: usize,
    },

    /// The kernel produced an output of the wrong type
    #[error("Output {index} expected {expected}, got {found}")]
    OutputType {
        /// Output position
        index: usize,
        /// Declared type
        expected: SocketType,
        /// Returned type
        found: SocketType,
    },

    /// Invalid input combination (division by zero, malformed buffer, ...)
    #[error("{0}")]
    Failed(String),
}

impl ComputeError {
    /// Create a failure with a message
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Error when editing a node's parameters or defaults
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterError {
    /// The node has no parameter with this name
    #[error("Node kind '{kind}' has no parameter '{name}'")]
    Unknown {
        /// Node kind
        kind: &'static str,
        /// Requested parameter
        name: String,
    },

    /// The value has the wrong type
    #[error("Parameter '{name}' expects {expected}, got {found}")]
    WrongType {
        /// Parameter or port name
        name: String,
        /// Expected type(s)
        expected: String,
        /// Supplied type
        found: String,
    },

    /// The value is of the right type but not usable
    #[error("Parameter '{name}' out of range: {reason}")]
    OutOfRange {
        /// Parameter name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// No input exists at this position
    #[error("No input at index {0}")]
    NoSuchInput(usize),
}

/// Editor-facing value of a node parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// Floating point number
    Scalar(f32),
    /// Non-negative integer (sizes, counts)
    Integer(u32),
    /// One of a fixed set of named options
    Choice(String),
    /// RGBA color
    Color([f32; 4]),
    /// Vector components
    Vector(Vec<f32>),
    /// Whole image (set by an importer)
    Image(ImageBuffer),
}

impl ParamValue {
    /// Short type name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "Scalar",
            Self::Integer(_) => "Integer",
            Self::Choice(_) => "Choice",
            Self::Color(_) => "Color",
            Self::Vector(_) => "Vector",
            Self::Image(_) => "Image",
        }
    }

    /// Build a [`ParameterError::WrongType`] for parameter `name`
    pub fn wrong_type(&self, name: &str, expected: &str) -> ParameterError {
        ParameterError::WrongType {
            name: name.to_string(),
            expected: expected.to_string(),
            found: self.type_name().to_string(),
        }
    }

    /// Scalar payload, or a type error naming `name`
    pub fn scalar(&self, name: &str) -> Result<f32, ParameterError> {
        match self {
            Self::Scalar(v) => Ok(*v),
            other => Err(other.wrong_type(name, "Scalar")),
        }
    }

    /// Integer payload, or a type error naming `name`
    pub fn integer(&self, name: &str) -> Result<u32, ParameterError> {
        match self {
            Self::Integer(v) => Ok(*v),
            other => Err(other.wrong_type(name, "Integer")),
        }
    }

    /// Choice payload, or a type error naming `name`
    pub fn choice(&self, name: &str) -> Result<&str, ParameterError> {
        match self {
            Self::Choice(v) => Ok(v),
            other => Err(other.wrong_type(name, "Choice")),
        }
    }

    /// Color payload, or a type error naming `name`
    pub fn color(&self, name: &str) -> Result<[f32; 4], ParameterError> {
        match self {
            Self::Color(v) => Ok(*v),
            other => Err(other.wrong_type(name, "Color")),
        }
    }
}

/// Fixed port layout returned once by [`NodeKernel::initialize_ports`]
#[derive(Debug, Clone, Default)]
pub struct PortLayout {
    /// Input ports, in addressing order
    pub inputs: Vec<Port>,
    /// Output ports, in addressing order
    pub outputs: Vec<Port>,
}

impl PortLayout {
    /// Create a layout from inputs and outputs
    pub fn new(inputs: Vec<Port>, outputs: Vec<Port>) -> Self {
        Self { inputs, outputs }
    }
}

/// Ordered input values handed to [`NodeKernel::compute`]
#[derive(Debug, Clone, Copy)]
pub struct Inputs<'a> {
    values: &'a [SocketValue],
}

impl<'a> Inputs<'a> {
    /// Wrap resolved input values
    pub fn new(values: &'a [SocketValue]) -> Self {
        Self { values }
    }

    /// Number of inputs
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no inputs
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value at `index`
    pub fn value(&self, index: usize) -> Result<&'a SocketValue, ComputeError> {
        self.values.get(index).ok_or(ComputeError::MissingInput {
            index,
            name: format!("#{index}"),
        })
    }

    fn mismatch(&self, index: usize, expected: &str) -> ComputeError {
        match self.values.get(index) {
            Some(value) => ComputeError::InputType {
                index,
                expected: expected.to_string(),
                found: value.socket_type(),
            },
            None => ComputeError::MissingInput {
                index,
                name: format!("#{index}"),
            },
        }
    }

    /// Scalar at `index`
    pub fn scalar(&self, index: usize) -> Result<f32, ComputeError> {
        self.value(index)?
            .as_scalar()
            .ok_or_else(|| self.mismatch(index, "Scalar"))
    }

    /// Vector components at `index`, any arity
    pub fn vector(&self, index: usize) -> Result<&'a [f32], ComputeError> {
        self.value(index)?
            .as_vector()
            .ok_or_else(|| self.mismatch(index, "a vector"))
    }

    /// Vector at `index`, which must have exactly `arity` components
    pub fn vector_of(&self, index: usize, arity: usize) -> Result<&'a [f32], ComputeError> {
        let components = self.vector(index)?;
        if components.len() != arity {
            let expected = SocketType::vector(arity).map_or("a vector", |t| t.name());
            return Err(self.mismatch(index, expected));
        }
        Ok(components)
    }

    /// Color at `index`
    pub fn color(&self, index: usize) -> Result<[f32; 4], ComputeError> {
        self.value(index)?
            .as_color()
            .ok_or_else(|| self.mismatch(index, "Color"))
    }

    /// Image at `index`
    pub fn image(&self, index: usize) -> Result<&'a ImageBuffer, ComputeError> {
        self.value(index)?
            .as_image()
            .ok_or_else(|| self.mismatch(index, "Image"))
    }

    /// Mask at `index`
    pub fn mask(&self, index: usize) -> Result<&'a MaskBuffer, ComputeError> {
        self.value(index)?
            .as_mask()
            .ok_or_else(|| self.mismatch(index, "Mask"))
    }

    /// Bytes at `index`
    pub fn bytes(&self, index: usize) -> Result<&'a [u8], ComputeError> {
        self.value(index)?
            .as_bytes()
            .ok_or_else(|| self.mismatch(index, "Bytes"))
    }
}

/// Per-kind computation capability of a node.
///
/// `compute` must only read the supplied inputs: no hidden global state and no
/// I/O. Invalid input combinations are reported as [`ComputeError`].
pub trait NodeKernel: fmt::Debug + Send + Sync {
    /// Registry identifier of this kind
    fn kind(&self) -> &'static str;

    /// Default display name for new nodes
    fn display_name(&self) -> String {
        self.kind().to_string()
    }

    /// Fixed port layout. Called exactly once, when the node is created.
    fn initialize_ports(&self) -> PortLayout;

    /// Strategy new nodes of this kind start with
    fn default_strategy(&self) -> Strategy {
        Strategy::Eager
    }

    /// Produce one value per output port, in output order
    fn compute(&self, inputs: &Inputs<'_>) -> Result<Vec<SocketValue>, ComputeError>;

    /// Editable parameters and their current values
    fn parameters(&self) -> Vec<(&'static str, ParamValue)> {
        Vec::new()
    }

    /// Change a parameter
    fn set_parameter(&mut self, name: &str, _value: ParamValue) -> Result<(), ParameterError> {
        Err(ParameterError::Unknown {
            kind: self.kind(),
            name: name.to_string(),
        })
    }

    /// Kind-specific content drawn at the top of the node body
    fn surface(&self, _ui: &mut egui::Ui) {}
}

/// A node instance in the graph
#[derive(Debug)]
pub struct Node {
    /// Unique instance ID
    id: NodeId,
    /// Display name (can be customized)
    pub name: String,
    /// Computation capability
    kernel: Box<dyn NodeKernel>,
    /// Evaluation strategy
    strategy: Strategy,
    /// Inputs followed by outputs
    ports: Vec<Port>,
    /// Number of leading input ports
    input_count: usize,
    /// State reached in the most recent pass
    state: NodeState,
    /// Error recorded in the most recent pass
    last_error: Option<ComputeError>,
    /// Input generations observed at the last successful computation
    last_computed_generations: Option<Vec<u64>>,
    /// Number of times `compute` ran
    compute_count: u64,
}

impl Node {
    /// Create a node, initializing its ports
    pub fn new(kernel: impl NodeKernel + 'static) -> Self {
        Self::from_boxed(Box::new(kernel))
    }

    /// Create a node from an already boxed kernel
    pub fn from_boxed(kernel: Box<dyn NodeKernel>) -> Self {
        let PortLayout { inputs, outputs } = kernel.initialize_ports();
        let input_count = inputs.len();
        let ports = inputs
            .into_iter()
            .map(|p| Port { direction: PortDirection::Input, ..p })
            .chain(
                outputs
                    .into_iter()
                    .map(|p| Port { direction: PortDirection::Output, ..p }),
            )
            .collect();

        Self {
            id: NodeId::new(),
            name: kernel.display_name(),
            strategy: kernel.default_strategy(),
            kernel,
            ports,
            input_count,
            state: NodeState::Pending,
            last_error: None,
            last_computed_generations: None,
            compute_count: 0,
        }
    }

    /// Override the strategy
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.set_strategy(strategy);
        self
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Node ID
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Registry kind
    pub fn kind(&self) -> &'static str {
        self.kernel.kind()
    }

    /// The kernel
    pub fn kernel(&self) -> &dyn NodeKernel {
        self.kernel.as_ref()
    }

    /// Evaluation strategy
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Change the strategy, dropping any cached computation
    pub fn set_strategy(&mut self, strategy: Strategy) {
        self.strategy = strategy;
        self.invalidate();
    }

    /// All ports: inputs first, then outputs
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Port by position in [`Node::ports`]
    pub fn port(&self, index: usize) -> Option<&Port> {
        self.ports.get(index)
    }

    /// Input ports
    pub fn inputs(&self) -> &[Port] {
        &self.ports[..self.input_count]
    }

    /// Output ports
    pub fn outputs(&self) -> &[Port] {
        &self.ports[self.input_count..]
    }

    /// Get an input port by index
    pub fn input(&self, index: usize) -> Option<&Port> {
        self.inputs().get(index)
    }

    /// Get an output port by index
    pub fn output(&self, index: usize) -> Option<&Port> {
        self.outputs().get(index)
    }

    /// Number of input ports
    pub fn input_count(&self) -> usize {
        self.input_count
    }

    /// Number of output ports
    pub fn output_count(&self) -> usize {
        self.ports.len() - self.input_count
    }

    /// Current value of an output, for exporters and previews
    pub fn output_value(&self, index: usize) -> Option<&SocketValue> {
        self.output(index).and_then(Port::value)
    }

    /// State reached in the most recent pass
    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Error recorded in the most recent pass
    pub fn last_error(&self) -> Option<&ComputeError> {
        self.last_error.as_ref()
    }

    /// Number of times the computation actually ran
    pub fn compute_count(&self) -> u64 {
        self.compute_count
    }

    /// Input generations captured at the last successful computation
    pub fn last_computed_generations(&self) -> Option<&[u64]> {
        self.last_computed_generations.as_deref()
    }

    /// Drop the memoized computation so the next pass recomputes
    pub fn invalidate(&mut self) {
        self.last_computed_generations = None;
    }

    /// Editable parameters
    pub fn parameters(&self) -> Vec<(&'static str, ParamValue)> {
        self.kernel.parameters()
    }

    /// Change a parameter and drop the memoized computation
    pub fn set_parameter(&mut self, name: &str, value: ParamValue) -> Result<(), ParameterError> {
        self.kernel.set_parameter(name, value)?;
        self.invalidate();
        Ok(())
    }

    /// Change the node-local default of an input
    pub fn set_input_default(&mut self, index: usize, value: SocketValue) -> Result<(), ParameterError> {
        let port = self
            .ports
            .get_mut(index)
            .filter(|_| index < self.input_count)
            .ok_or(ParameterError::NoSuchInput(index))?;
        if !port.accepts(value.socket_type()) {
            return Err(ParameterError::WrongType {
                name: port.name.clone(),
                expected: port.accepted.to_string(),
                found: value.socket_type().to_string(),
            });
        }
        port.default_value = Some(value);
        if port.generation() == 0 {
            port.reset_to_default();
        }
        self.invalidate();
        Ok(())
    }

    pub(crate) fn inputs_mut(&mut self) -> &mut [Port] {
        &mut self.ports[..self.input_count]
    }

    pub(crate) fn outputs_mut(&mut self) -> &mut [Port] {
        &mut self.ports[self.input_count..]
    }

    pub(crate) fn set_state(&mut self, state: NodeState) {
        self.state = state;
    }

    pub(crate) fn record_error(&mut self, error: Option<ComputeError>) {
        self.last_error = error;
    }

    pub(crate) fn run_kernel(&mut self, values: &[SocketValue]) -> Result<Vec<SocketValue>, ComputeError> {
        self.compute_count += 1;
        self.kernel.compute(&Inputs::new(values))
    }

    pub(crate) fn assign_id(&mut self, id: NodeId) {
        self.id = id;
    }

    pub(crate) fn remember_generations(&mut self, generations: Vec<u64>) {
        self.last_computed_generations = Some(generations);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Scalar pass-through used by evaluator and graph tests
    #[derive(Debug, Default)]
    pub(crate) struct Passthrough;

    impl NodeKernel for Passthrough {
        fn kind(&self) -> &'static str {
            "passthrough"
        }

        fn initialize_ports(&self) -> PortLayout {
            PortLayout::new(
                vec![Port::input("In", SocketType::Scalar)],
                vec![Port::output("Out", SocketType::Scalar)],
            )
        }

        fn compute(&self, inputs: &Inputs<'_>) -> Result<Vec<SocketValue>, ComputeError> {
            Ok(vec![SocketValue::Scalar(inputs.scalar(0)?)])
        }
    }

    #[test]
    fn test_ports_are_inputs_then_outputs() {
        let node = Node::new(Passthrough);
        assert_eq!(node.input_count(), 1);
        assert_eq!(node.output_count(), 1);
        assert!(node.ports()[0].is_input());
        assert!(node.ports()[1].is_output());
        assert_eq!(node.kind(), "passthrough");
        assert_eq!(node.state(), NodeState::Pending);
    }

    #[test]
    fn test_ids_ascend_in_creation_order() {
        let a = Node::new(Passthrough);
        let b = Node::new(Passthrough);
        assert!(a.id() < b.id());
    }

    #[test]
    fn test_set_input_default_checks_type() {
        let mut node = Node::new(Passthrough).with_strategy(Strategy::Memoized);
        node.remember_generations(vec![0]);

        let err = node
            .set_input_default(0, SocketValue::Color([1.0; 4]))
            .unwrap_err();
        assert!(matches!(err, ParameterError::WrongType { .. }));
        assert!(node.last_computed_generations().is_some());

        node.set_input_default(0, SocketValue::Scalar(4.0)).unwrap();
        assert_eq!(node.input(0).unwrap().value(), Some(&SocketValue::Scalar(4.0)));
        assert!(node.last_computed_generations().is_none());

        assert_eq!(
            node.set_input_default(1, SocketValue::Scalar(1.0)),
            Err(ParameterError::NoSuchInput(1))
        );
    }

    #[test]
    fn test_unknown_parameter() {
        let mut node = Node::new(Passthrough);
        let err = node.set_parameter("gain", ParamValue::Scalar(1.0)).unwrap_err();
        assert_eq!(err.to_string(), "Node kind 'passthrough' has no parameter 'gain'");
    }

    #[test]
    fn test_param_value_accessors() {
        assert_eq!(ParamValue::Scalar(2.0).scalar("x"), Ok(2.0));
        assert_eq!(ParamValue::Integer(4).integer("width"), Ok(4));
        assert_eq!(ParamValue::Choice("add".into()).choice("op"), Ok("add"));
        let err = ParamValue::Choice("add".into()).scalar("value").unwrap_err();
        assert_eq!(err.to_string(), "Parameter 'value' expects Scalar, got Choice");
    }

    #[test]
    fn test_inputs_accessors_report_mismatch() {
        let values = [SocketValue::Scalar(1.0), SocketValue::Vector3([1.0, 2.0, 3.0])];
        let inputs = Inputs::new(&values);
        assert_eq!(inputs.scalar(0), Ok(1.0));
        assert!(matches!(inputs.image(0), Err(ComputeError::InputType { index: 0, .. })));
        assert_eq!(inputs.vector_of(1, 3).map(<[f32]>::len), Ok(3));
        assert!(matches!(
            inputs.vector_of(1, 2),
            Err(ComputeError::InputType { found: SocketType::Vector3, .. })
        ));
        assert!(matches!(inputs.scalar(5), Err(ComputeError::MissingInput { index: 5, .. })));
    }
}
