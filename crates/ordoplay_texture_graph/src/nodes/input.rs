// SPDX-License-Identifier: MIT OR Apache-2.0
//! Constant and source nodes.

use crate::node::{ComputeError, Inputs, NodeKernel, ParamValue, ParameterError, PortLayout, Strategy};
use crate::port::Port;
use crate::socket::{ImageBuffer, SocketType, SocketValue};

/// Constant scalar
#[derive(Debug, Clone, Default)]
pub struct ScalarConstant {
    /// Emitted value
    pub value: f32,
}

impl ScalarConstant {
    /// Create a constant
    pub fn new(value: f32) -> Self {
        Self { value }
    }
}

impl NodeKernel for ScalarConstant {
    fn kind(&self) -> &'static str {
        "scalar"
    }

    fn display_name(&self) -> String {
        "Scalar".to_string()
    }

    fn initialize_ports(&self) -> PortLayout {
        PortLayout::new(Vec::new(), vec![Port::output("Value", SocketType::Scalar)])
    }

    fn default_strategy(&self) -> Strategy {
        Strategy::Memoized
    }

    fn compute(&self, _inputs: &Inputs<'_>) -> Result<Vec<SocketValue>, ComputeError> {
        Ok(vec![SocketValue::Scalar(self.value)])
    }

    fn parameters(&self) -> Vec<(&'static str, ParamValue)> {
        vec![("value", ParamValue::Scalar(self.value))]
    }

    fn set_parameter(&mut self, name: &str, value: ParamValue) -> Result<(), ParameterError> {
        match name {
            "value" => self.value = value.scalar(name)?,
            _ => {
                return Err(ParameterError::Unknown {
                    kind: self.kind(),
                    name: name.to_string(),
                })
            }
        }
        Ok(())
    }
}

/// Constant vector of fixed arity
#[derive(Debug, Clone)]
pub struct VectorConstant {
    components: Vec<f32>,
}

impl VectorConstant {
    /// Zero vector with `arity` components (clamped to 2..=4)
    pub fn new(arity: usize) -> Self {
        Self {
            components: vec![0.0; arity.clamp(2, 4)],
        }
    }

    /// Vector constant holding `components`, `None` unless 2..=4 long
    pub fn with_components(components: &[f32]) -> Option<Self> {
        SocketType::vector(components.len())?;
        Some(Self {
            components: components.to_vec(),
        })
    }

    fn socket_type(&self) -> SocketType {
        SocketType::vector(self.components.len()).unwrap_or(SocketType::Vector4)
    }
}

impl NodeKernel for VectorConstant {
    fn kind(&self) -> &'static str {
        match self.components.len() {
            2 => "vector2",
            3 => "vector3",
            _ => "vector4",
        }
    }

    fn display_name(&self) -> String {
        self.socket_type().name().to_string()
    }

    fn initialize_ports(&self) -> PortLayout {
        PortLayout::new(Vec::new(), vec![Port::output("Vector", self.socket_type())])
    }

    fn default_strategy(&self) -> Strategy {
        Strategy::Memoized
    }

    fn compute(&self, _inputs: &Inputs<'_>) -> Result<Vec<SocketValue>, ComputeError> {
        SocketValue::vector(&self.components)
            .map(|v| vec![v])
            .ok_or_else(|| ComputeError::failed("vector constant has an invalid arity"))
    }

    fn parameters(&self) -> Vec<(&'static str, ParamValue)> {
        vec![("value", ParamValue::Vector(self.components.clone()))]
    }

    fn set_parameter(&mut self, name: &str, value: ParamValue) -> Result<(), ParameterError> {
        if name != "value" {
            return Err(ParameterError::Unknown {
                kind: self.kind(),
                name: name.to_string(),
            });
        }
        match value {
            ParamValue::Vector(components) if components.len() == self.components.len() => {
                self.components = components;
                Ok(())
            }
            ParamValue::Vector(components) => Err(ParameterError::OutOfRange {
                name: name.to_string(),
                reason: format!(
                    "expected {} components, got {}",
                    self.components.len(),
                    components.len()
                ),
            }),
            other => Err(other.wrong_type(name, "Vector")),
        }
    }
}

/// Constant color
#[derive(Debug, Clone)]
pub struct ColorConstant {
    /// Emitted color
    pub color: [f32; 4],
}

impl ColorConstant {
    /// Create a constant
    pub fn new(color: [f32; 4]) -> Self {
        Self { color }
    }
}

impl Default for ColorConstant {
    fn default() -> Self {
        Self::new([1.0, 1.0, 1.0, 1.0])
    }
}

impl NodeKernel for ColorConstant {
    fn kind(&self) -> &'static str {
        "color"
    }

    fn display_name(&self) -> String {
        "Color".to_string()
    }

    fn initialize_ports(&self) -> PortLayout {
        PortLayout::new(Vec::new(), vec![Port::output("Color", SocketType::Color)])
    }

    fn default_strategy(&self) -> Strategy {
        Strategy::Memoized
    }

    fn compute(&self, _inputs: &Inputs<'_>) -> Result<Vec<SocketValue>, ComputeError> {
        Ok(vec![SocketValue::Color(self.color)])
    }

    fn parameters(&self) -> Vec<(&'static str, ParamValue)> {
        vec![("color", ParamValue::Color(self.color))]
    }

    fn set_parameter(&mut self, name: &str, value: ParamValue) -> Result<(), ParameterError> {
        match name {
            "color" => self.color = value.color(name)?,
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
        crate::surface::color_swatch(ui, self.color);
    }
}

/// Image handed over by the host's importer
#[derive(Debug, Clone, Default)]
pub struct ImageSource {
    /// Imported pixels
    pub image: ImageBuffer,
}

impl ImageSource {
    /// Wrap an imported image
    pub fn new(image: ImageBuffer) -> Self {
        Self { image }
    }
}

impl NodeKernel for ImageSource {
    fn kind(&self) -> &'static str {
        "image_source"
    }

    fn display_name(&self) -> String {
        "Image".to_string()
    }

    fn initialize_ports(&self) -> PortLayout {
        PortLayout::new(Vec::new(), vec![Port::output("Image", SocketType::Image)])
    }

    fn default_strategy(&self) -> Strategy {
        Strategy::Memoized
    }

    fn compute(&self, _inputs: &Inputs<'_>) -> Result<Vec<SocketValue>, ComputeError> {
        if self.image.len() != self.image.width as usize * self.image.height as usize {
            return Err(ComputeError::failed(format!(
                "image holds {} pixels, expected {}x{}",
                self.image.len(),
                self.image.width,
                self.image.height
            )));
        }
        Ok(vec![SocketValue::Image(self.image.clone())])
    }

    fn parameters(&self) -> Vec<(&'static str, ParamValue)> {
        vec![("image", ParamValue::Image(self.image.clone()))]
    }

    fn set_parameter(&mut self, name: &str, value: ParamValue) -> Result<(), ParameterError> {
        match (name, value) {
            ("image", ParamValue::Image(image)) => {
                self.image = image;
                Ok(())
            }
            ("image", other) => Err(other.wrong_type(name, "Image")),
            _ => Err(ParameterError::Unknown {
                kind: self.kind(),
                name: name.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    #[test]
    fn test_scalar_constant() {
        let mut node = Node::new(ScalarConstant::new(2.5));
        assert_eq!(node.strategy(), Strategy::Memoized);
        assert_eq!(node.parameters(), vec![("value", ParamValue::Scalar(2.5))]);
        node.set_parameter("value", ParamValue::Scalar(1.0)).unwrap();
        assert_eq!(
            node.kernel().compute(&Inputs::new(&[])),
            Ok(vec![SocketValue::Scalar(1.0)])
        );
        assert!(node.set_parameter("value", ParamValue::Integer(1)).is_err());
    }

    #[test]
    fn test_vector_constant_arity_is_fixed() {
        let mut kernel = VectorConstant::with_components(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(kernel.kind(), "vector3");
        assert!(VectorConstant::with_components(&[1.0]).is_none());

        let err = kernel
            .set_parameter("value", ParamValue::Vector(vec![1.0, 2.0]))
            .unwrap_err();
        assert!(matches!(err, ParameterError::OutOfRange { .. }));
        kernel
            .set_parameter("value", ParamValue::Vector(vec![4.0, 5.0, 6.0]))
            .unwrap();
        assert_eq!(
            kernel.compute(&Inputs::new(&[])),
            Ok(vec![SocketValue::Vector3([4.0, 5.0, 6.0])])
        );
        assert_eq!(VectorConstant::new(9).kind(), "vector4");
    }

    #[test]
    fn test_image_source_rejects_inconsistent_buffer() {
        let mut image = ImageBuffer::filled(2, 2, [1.0; 4]);
        image.pixels.pop();
        let kernel = ImageSource::new(image);
        assert!(matches!(
            kernel.compute(&Inputs::new(&[])),
            Err(ComputeError::Failed(_))
        ));
    }
}
