// SPDX-License-Identifier: MIT OR Apache-2.0
//! Vector math nodes.
//!
//! Kernels configured for an arity only accept vectors of that arity, so a
//! mismatched connection is refused by [`Graph::connect`](crate::graph::Graph::connect).
//! Length and split take any arity.

use super::math::{parse_op, MathOp};
use crate::node::{ComputeError, Inputs, NodeKernel, ParamValue, ParameterError, PortLayout};
use crate::port::Port;
use crate::socket::{AcceptedTypes, SocketType, SocketValue};

const COMPONENT_NAMES: [&str; 4] = ["X", "Y", "Z", "W"];

fn vector_type(arity: usize) -> SocketType {
    SocketType::vector(arity).unwrap_or(SocketType::Vector4)
}

fn vector_input(name: &str, arity: usize) -> Port {
    let socket_type = vector_type(arity);
    Port::input(name, socket_type).with_default(socket_type.zero_value())
}

fn to_value(components: &[f32]) -> Result<SocketValue, ComputeError> {
    SocketValue::vector(components)
        .ok_or_else(|| ComputeError::failed(format!("{} is not a vector arity", components.len())))
}

/// Component-wise binary operation on two vectors of the same arity
#[derive(Debug, Clone)]
pub struct VectorMath {
    /// Operation
    pub op: MathOp,
    arity: usize,
}

impl VectorMath {
    /// Create a vector math node for `arity` components (clamped to 2..=4)
    pub fn new(op: MathOp, arity: usize) -> Self {
        Self {
            op,
            arity: arity.clamp(2, 4),
        }
    }

    /// Configured arity
    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl NodeKernel for VectorMath {
    fn kind(&self) -> &'static str {
        match self.arity {
            2 => "vector_math2",
            3 => "vector_math3",
            _ => "vector_math4",
        }
    }

    fn display_name(&self) -> String {
        format!("Vector{} Math", self.arity)
    }

    fn initialize_ports(&self) -> PortLayout {
        PortLayout::new(
            vec![vector_input("A", self.arity), vector_input("B", self.arity)],
            vec![Port::output("Result", vector_type(self.arity))],
        )
    }

    fn compute(&self, inputs: &Inputs<'_>) -> Result<Vec<SocketValue>, ComputeError> {
        let a = inputs.vector_of(0, self.arity)?;
        let b = inputs.vector_of(1, self.arity)?;
        let components = a
            .iter()
            .zip(b)
            .map(|(&x, &y)| self.op.apply(x, y))
            .collect::<Result<Vec<f32>, ComputeError>>()?;
        Ok(vec![to_value(&components)?])
    }

    fn parameters(&self) -> Vec<(&'static str, ParamValue)> {
        vec![("op", ParamValue::Choice(self.op.name().to_string()))]
    }

    fn set_parameter(&mut self, name: &str, value: ParamValue) -> Result<(), ParameterError> {
        match name {
            "op" => self.op = parse_op(name, &value)?,
            _ => {
                return Err(ParameterError::Unknown {
                    kind: self.kind(),
                    name: name.to_string(),
                })
            }
        }
        Ok(())
    }

    fn surface(&self, ui: &mut egui::Ui) {
        ui.label(self.op.name());
    }
}

/// Vector multiplied by a scalar
#[derive(Debug, Clone)]
pub struct VectorScale {
    arity: usize,
}

impl VectorScale {
    /// Create a scale node for `arity` components (clamped to 2..=4)
    pub fn new(arity: usize) -> Self {
        Self {
            arity: arity.clamp(2, 4),
        }
    }
}

impl NodeKernel for VectorScale {
    fn kind(&self) -> &'static str {
        match self.arity {
            2 => "vector_scale2",
            3 => "vector_scale3",
            _ => "vector_scale4",
        }
    }

    fn display_name(&self) -> String {
        format!("Scale Vector{}", self.arity)
    }

    fn initialize_ports(&self) -> PortLayout {
        PortLayout::new(
            vec![
                vector_input("Vector", self.arity),
                Port::input("Factor", SocketType::Scalar).with_default(1.0),
            ],
            vec![Port::output("Result", vector_type(self.arity))],
        )
    }

    fn compute(&self, inputs: &Inputs<'_>) -> Result<Vec<SocketValue>, ComputeError> {
        let vector = inputs.vector_of(0, self.arity)?;
        let factor = inputs.scalar(1)?;
        let scaled: Vec<f32> = vector.iter().map(|c| c * factor).collect();
        Ok(vec![to_value(&scaled)?])
    }
}

/// Euclidean length of a vector of any arity
#[derive(Debug, Clone, Default)]
pub struct VectorLength;

impl NodeKernel for VectorLength {
    fn kind(&self) -> &'static str {
        "vector_length"
    }

    fn display_name(&self) -> String {
        "Length".to_string()
    }

    fn initialize_ports(&self) -> PortLayout {
        PortLayout::new(
            vec![Port::input("Vector", AcceptedTypes::any_vector())],
            vec![Port::output("Length", SocketType::Scalar)],
        )
    }

    fn compute(&self, inputs: &Inputs<'_>) -> Result<Vec<SocketValue>, ComputeError> {
        let length = inputs.vector(0)?.iter().map(|c| c * c).sum::<f32>().sqrt();
        Ok(vec![SocketValue::Scalar(length)])
    }
}

/// Build a vector from scalar components
#[derive(Debug, Clone)]
pub struct CombineVector {
    arity: usize,
}

impl CombineVector {
    /// Combine `arity` scalars (clamped to 2..=4)
    pub fn new(arity: usize) -> Self {
        Self {
            arity: arity.clamp(2, 4),
        }
    }
}

impl NodeKernel for CombineVector {
    fn kind(&self) -> &'static str {
        match self.arity {
            2 => "combine_vector2",
            3 => "combine_vector3",
            _ => "combine_vector4",
        }
    }

    fn display_name(&self) -> String {
        format!("Combine Vector{}", self.arity)
    }

    fn initialize_ports(&self) -> PortLayout {
        PortLayout::new(
            COMPONENT_NAMES[..self.arity]
                .iter()
                .map(|name| Port::input(*name, SocketType::Scalar))
                .collect(),
            vec![Port::output("Vector", vector_type(self.arity))],
        )
    }

    fn compute(&self, inputs: &Inputs<'_>) -> Result<Vec<SocketValue>, ComputeError> {
        let components = (0..self.arity)
            .map(|i| inputs.scalar(i))
            .collect::<Result<Vec<f32>, ComputeError>>()?;
        Ok(vec![to_value(&components)?])
    }
}

/// Split a vector of any arity into four scalars; missing components read 0
#[derive(Debug, Clone, Default)]
pub struct SplitVector;

impl NodeKernel for SplitVector {
    fn kind(&self) -> &'static str {
        "split_vector"
    }

    fn display_name(&self) -> String {
        "Split Vector".to_string()
    }

    fn initialize_ports(&self) -> PortLayout {
        PortLayout::new(
            vec![Port::input("Vector", AcceptedTypes::any_vector())],
            COMPONENT_NAMES
                .iter()
                .map(|name| Port::output(*name, SocketType::Scalar))
                .collect(),
        )
    }

    fn compute(&self, inputs: &Inputs<'_>) -> Result<Vec<SocketValue>, ComputeError> {
        let vector = inputs.vector(0)?;
        Ok((0..COMPONENT_NAMES.len())
            .map(|i| SocketValue::Scalar(vector.get(i).copied().unwrap_or(0.0)))
            .collect())
    }
}
