// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scalar math.

use crate::node::{ComputeError, Inputs, NodeKernel, ParamValue, ParameterError, PortLayout};
use crate::port::Port;
use crate::socket::{SocketType, SocketValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Binary scalar operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MathOp {
    /// a + b
    #[default]
    Add,
    /// a - b
    Subtract,
    /// a * b
    Multiply,
    /// a / b, fails when b is zero
    Divide,
    /// a raised to b
    Power,
    /// Smaller of a and b
    Min,
    /// Larger of a and b
    Max,
}

impl MathOp {
    /// All operations
    pub const ALL: [MathOp; 7] = [
        Self::Add,
        Self::Subtract,
        Self::Multiply,
        Self::Divide,
        Self::Power,
        Self::Min,
        Self::Max,
    ];

    /// Parameter spelling
    pub fn name(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
            Self::Power => "power",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// Apply to two scalars
    pub fn apply(&self, a: f32, b: f32) -> Result<f32, ComputeError> {
        let result = match self {
            Self::Add => a + b,
            Self::Subtract => a - b,
            Self::Multiply => a * b,
            Self::Divide => {
                if b == 0.0 {
                    return Err(ComputeError::failed("division by zero"));
                }
                a / b
            }
            Self::Power => a.powf(b),
            Self::Min => a.min(b),
            Self::Max => a.max(b),
        };
        if result.is_nan() {
            return Err(ComputeError::failed(format!(
                "{} of {a} and {b} is not a number",
                self.name()
            )));
        }
        Ok(result)
    }
}

impl fmt::Display for MathOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MathOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(MathOp::name).collect();
                format!("unknown operation '{s}', expected one of {}", names.join(", "))
            })
    }
}

/// Parse the `op` parameter shared by the math kernels
pub(crate) fn parse_op(name: &str, value: &ParamValue) -> Result<MathOp, ParameterError> {
    value
        .choice(name)?
        .parse()
        .map_err(|reason| ParameterError::OutOfRange {
            name: name.to_string(),
            reason,
        })
}

/// Two-input scalar operation
#[derive(Debug, Clone, Default)]
pub struct MathNode {
    /// Operation
    pub op: MathOp,
}

impl MathNode {
    /// Create a math node
    pub fn new(op: MathOp) -> Self {
        Self { op }
    }
}

impl NodeKernel for MathNode {
    fn kind(&self) -> &'static str {
        "math"
    }

    fn display_name(&self) -> String {
        "Math".to_string()
    }

    fn initialize_ports(&self) -> PortLayout {
        PortLayout::new(
            vec![
                Port::input("A", SocketType::Scalar),
                Port::input("B", SocketType::Scalar),
            ],
            vec![Port::output("Result", SocketType::Scalar)],
        )
    }

    fn compute(&self, inputs: &Inputs<'_>) -> Result<Vec<SocketValue>, ComputeError> {
        let a = inputs.scalar(0)?;
        let b = inputs.scalar(1)?;
        Ok(vec![SocketValue::Scalar(self.op.apply(a, b)?)])
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

#[cfg(test)]
mod tests {
    use super::*;

    fn run(op: MathOp, a: f32, b: f32) -> Result<Vec<SocketValue>, ComputeError> {
        let values = [SocketValue::Scalar(a), SocketValue::Scalar(b)];
        MathNode::new(op).compute(&Inputs::new(&values))
    }

    #[test]
    fn test_operations() {
        assert_eq!(run(MathOp::Add, 2.0, 3.0), Ok(vec![SocketValue::Scalar(5.0)]));
        assert_eq!(run(MathOp::Subtract, 2.0, 3.0), Ok(vec![SocketValue::Scalar(-1.0)]));
        assert_eq!(run(MathOp::Multiply, 2.0, 3.0), Ok(vec![SocketValue::Scalar(6.0)]));
        assert_eq!(run(MathOp::Divide, 3.0, 2.0), Ok(vec![SocketValue::Scalar(1.5)]));
        assert_eq!(run(MathOp::Power, 2.0, 3.0), Ok(vec![SocketValue::Scalar(8.0)]));
        assert_eq!(run(MathOp::Min, 2.0, 3.0), Ok(vec![SocketValue::Scalar(2.0)]));
        assert_eq!(run(MathOp::Max, 2.0, 3.0), Ok(vec![SocketValue::Scalar(3.0)]));
    }

    #[test]
    fn test_division_by_zero_fails() {
        assert!(matches!(run(MathOp::Divide, 1.0, 0.0), Err(ComputeError::Failed(_))));
        assert!(matches!(run(MathOp::Divide, 0.0, 0.0), Err(ComputeError::Failed(_))));
    }

    #[test]
    fn test_nan_result_fails() {
        assert!(run(MathOp::Power, -8.0, 0.5).is_err());
    }

    #[test]
    fn test_op_parameter() {
        let mut node = MathNode::default();
        node.set_parameter("op", ParamValue::Choice("max".into())).unwrap();
        assert_eq!(node.op, MathOp::Max);
        assert!(matches!(
            node.set_parameter("op", ParamValue::Choice("modulo".into())),
            Err(ParameterError::OutOfRange { .. })
        ));
        assert!(matches!(
            node.set_parameter("op", ParamValue::Scalar(1.0)),
            Err(ParameterError::WrongType { .. })
        ));
        assert_eq!(node.parameters(), vec![("op", ParamValue::Choice("max".into()))]);
    }

    #[test]
    fn test_op_names_round_trip() {
        for op in MathOp::ALL {
            assert_eq!(op.name().parse::<MathOp>(), Ok(op));
        }
    }
}
