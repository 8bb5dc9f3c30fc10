// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.
//!
//! Ports are addressed by position, never by name: a node's inputs come first
//! in construction order, followed by its outputs. Names are display labels
//! only and may repeat.

use crate::socket::{is_compatible, AcceptedTypes, SocketType, SocketValue};
use serde::{Deserialize, Serialize};

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

/// A typed slot on a node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    /// Display label
    pub name: String,
    /// Port direction
    pub direction: PortDirection,
    /// Accepted types; outputs always hold a single concrete type
    pub accepted: AcceptedTypes,
    /// Node-local value used while an input is unconnected
    pub default_value: Option<SocketValue>,
    /// Last computed or propagated value
    pub(crate) value: Option<SocketValue>,
    /// Bumped whenever `value` is overwritten; 0 means "default / never written"
    pub(crate) generation: u64,
}

impl Port {
    /// Create a new input port. Unconnected, it reads the zero value of its
    /// first accepted type.
    pub fn input(name: impl Into<String>, accepted: impl Into<AcceptedTypes>) -> Self {
        let accepted = accepted.into();
        let default_value = accepted.primary().map(|t| t.zero_value());
        Self {
            name: name.into(),
            direction: PortDirection::Input,
            value: default_value.clone(),
            default_value,
            accepted,
            generation: 0,
        }
    }

    /// Create a new output port
    pub fn output(name: impl Into<String>, socket_type: SocketType) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Output,
            accepted: AcceptedTypes::Single(socket_type),
            default_value: None,
            value: None,
            generation: 0,
        }
    }

    /// Set the default value
    pub fn with_default(mut self, value: impl Into<SocketValue>) -> Self {
        let value = value.into();
        self.value = Some(value.clone());
        self.default_value = Some(value);
        self
    }

    /// Mark as required: there is no default to fall back on
    pub fn required(mut self) -> Self {
        self.default_value = None;
        self.value = None;
        self
    }

    /// Whether this is an input port
    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }

    /// Whether this is an output port
    pub fn is_output(&self) -> bool {
        self.direction == PortDirection::Output
    }

    /// Whether the port must be connected to produce meaningful output
    pub fn is_required(&self) -> bool {
        self.is_input() && self.default_value.is_none()
    }

    /// The concrete type emitted by an output port
    pub fn output_type(&self) -> Option<SocketType> {
        match (&self.direction, &self.accepted) {
            (PortDirection::Output, AcceptedTypes::Single(socket_type)) => Some(*socket_type),
            _ => None,
        }
    }

    /// Whether a value of `socket_type` may flow into this port
    pub fn accepts(&self, socket_type: SocketType) -> bool {
        is_compatible(socket_type, &self.accepted)
    }

    /// Check if a connection from this output to `other` input is valid
    pub fn can_connect(&self, other: &Port) -> bool {
        if !self.is_output() || !other.is_input() {
            return false;
        }

        self.output_type().is_some_and(|t| other.accepts(t))
    }

    /// Current value, if any
    pub fn value(&self) -> Option<&SocketValue> {
        self.value.as_ref()
    }

    /// Current generation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Overwrite the value, stamping it with `generation`
    pub(crate) fn write(&mut self, value: SocketValue, generation: u64) {
        self.value = Some(value);
        self.generation = generation;
    }

    /// Return an input to its node-local default at generation 0
    pub(crate) fn reset_to_default(&mut self) {
        self.value = self.default_value.clone();
        self.generation = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_defaults_to_zero_value() {
        let port = Port::input("A", SocketType::Scalar);
        assert_eq!(port.value(), Some(&SocketValue::Scalar(0.0)));
        assert_eq!(port.generation(), 0);
        assert!(!port.is_required());
    }

    #[test]
    fn test_required_input_has_no_value() {
        let port = Port::input("Image", SocketType::Image).required();
        assert!(port.value().is_none());
        assert!(port.is_required());
    }

    #[test]
    fn test_output_starts_empty() {
        let port = Port::output("Result", SocketType::Scalar);
        assert!(port.value().is_none());
        assert_eq!(port.output_type(), Some(SocketType::Scalar));
        assert!(!port.is_required());
    }

    #[test]
    fn test_can_connect_checks_direction_and_type() {
        let out = Port::output("Out", SocketType::Vector3);
        let vec_in = Port::input("In", AcceptedTypes::any_vector());
        let scalar_in = Port::input("In", SocketType::Scalar);

        assert!(out.can_connect(&vec_in));
        assert!(!out.can_connect(&scalar_in));
        assert!(!vec_in.can_connect(&out));
        assert!(!out.can_connect(&out.clone()));
    }

    #[test]
    fn test_reset_to_default() {
        let mut port = Port::input("Factor", SocketType::Scalar).with_default(0.5);
        port.write(SocketValue::Scalar(3.0), 7);
        assert_eq!(port.generation(), 7);

        port.reset_to_default();
        assert_eq!(port.value(), Some(&SocketValue::Scalar(0.5)));
        assert_eq!(port.generation(), 0);
    }
}
