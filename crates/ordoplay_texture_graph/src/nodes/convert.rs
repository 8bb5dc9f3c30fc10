// SPDX-License-Identifier: MIT OR Apache-2.0
//! Conversion between colors, images, masks and byte buffers.

use super::color::luminance;
use crate::node::{ComputeError, Inputs, NodeKernel, ParamValue, ParameterError, PortLayout, Strategy};
use crate::port::Port;
use crate::socket::{ImageBuffer, MaskBuffer, SocketType, SocketValue};

/// Largest width or height accepted for generated images
pub const MAX_DIMENSION: u32 = 16384;

/// Image size shared by the generating kernels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Dimensions {
    width: u32,
    height: u32,
}

impl Dimensions {
    /// Size with both sides clamped to `1..=MAX_DIMENSION`
    fn clamped(width: u32, height: u32) -> Self {
        Self {
            width: width.clamp(1, MAX_DIMENSION),
            height: height.clamp(1, MAX_DIMENSION),
        }
    }

    fn parameters(&self) -> Vec<(&'static str, ParamValue)> {
        vec![
            ("width", ParamValue::Integer(self.width)),
            ("height", ParamValue::Integer(self.height)),
        ]
    }

    fn set(&mut self, kind: &'static str, name: &str, value: ParamValue) -> Result<(), ParameterError> {
        let slot = match name {
            "width" => &mut self.width,
            "height" => &mut self.height,
            _ => {
                return Err(ParameterError::Unknown {
                    kind,
                    name: name.to_string(),
                })
            }
        };
        let size = value.integer(name)?;
        if size == 0 || size > MAX_DIMENSION {
            return Err(ParameterError::OutOfRange {
                name: name.to_string(),
                reason: format!("{size} is outside 1..={MAX_DIMENSION}"),
            });
        }
        *slot = size;
        Ok(())
    }

    fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

fn mask_from(image: &ImageBuffer, f: impl Fn([f32; 4]) -> f32) -> MaskBuffer {
    MaskBuffer {
        width: image.width,
        height: image.height,
        values: image.pixels.iter().copied().map(f).collect(),
    }
}

/// Image of a single color
#[derive(Debug, Clone)]
pub struct SolidColor {
    size: Dimensions,
}

impl SolidColor {
    /// Create a generator of the given size, clamped to `1..=MAX_DIMENSION`
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Dimensions::clamped(width, height),
        }
    }
}

impl Default for SolidColor {
    fn default() -> Self {
        Self::new(256, 256)
    }
}

impl NodeKernel for SolidColor {
    fn kind(&self) -> &'static str {
        "solid_color"
    }

    fn display_name(&self) -> String {
        "Solid Color".to_string()
    }

    fn initialize_ports(&self) -> PortLayout {
        PortLayout::new(
            vec![Port::input("Color", SocketType::Color)
                .with_default(SocketValue::Color([1.0, 1.0, 1.0, 1.0]))],
            vec![Port::output("Image", SocketType::Image)],
        )
    }

    fn default_strategy(&self) -> Strategy {
        Strategy::Memoized
    }

    fn compute(&self, inputs: &Inputs<'_>) -> Result<Vec<SocketValue>, ComputeError> {
        let color = inputs.color(0)?;
        Ok(vec![SocketValue::Image(ImageBuffer::filled(
            self.size.width,
            self.size.height,
            color,
        ))])
    }

    fn parameters(&self) -> Vec<(&'static str, ParamValue)> {
        self.size.parameters()
    }

    fn set_parameter(&mut self, name: &str, value: ParamValue) -> Result<(), ParameterError> {
        self.size.set(self.kind(), name, value)
    }
}

/// Alpha channel of an image as a mask
#[derive(Debug, Clone, Default)]
pub struct ExtractAlpha;

impl NodeKernel for ExtractAlpha {
    fn kind(&self) -> &'static str {
        "extract_alpha"
    }

    fn display_name(&self) -> String {
        "Extract Alpha".to_string()
    }

    fn initialize_ports(&self) -> PortLayout {
        PortLayout::new(
            vec![Port::input("Image", SocketType::Image).required()],
            vec![Port::output("Mask", SocketType::Mask)],
        )
    }

    fn default_strategy(&self) -> Strategy {
        Strategy::Memoized
    }

    fn compute(&self, inputs: &Inputs<'_>) -> Result<Vec<SocketValue>, ComputeError> {
        Ok(vec![SocketValue::Mask(mask_from(inputs.image(0)?, |p| p[3]))])
    }
}

/// Relative luminance of an image as a mask
#[derive(Debug, Clone, Default)]
pub struct Luminance;

impl NodeKernel for Luminance {
    fn kind(&self) -> &'static str {
        "luminance"
    }

    fn display_name(&self) -> String {
        "Luminance".to_string()
    }

    fn initialize_ports(&self) -> PortLayout {
        PortLayout::new(
            vec![Port::input("Image", SocketType::Image).required()],
            vec![Port::output("Mask", SocketType::Mask)],
        )
    }

    fn default_strategy(&self) -> Strategy {
        Strategy::Memoized
    }

    fn compute(&self, inputs: &Inputs<'_>) -> Result<Vec<SocketValue>, ComputeError> {
        Ok(vec![SocketValue::Mask(mask_from(inputs.image(0)?, luminance))])
    }
}

/// Multiply an image's alpha by a mask of the same size
#[derive(Debug, Clone, Default)]
pub struct ApplyMask;

impl NodeKernel for ApplyMask {
    fn kind(&self) -> &'static str {
        "apply_mask"
    }

    fn display_name(&self) -> String {
        "Apply Mask".to_string()
    }

    fn initialize_ports(&self) -> PortLayout {
        PortLayout::new(
            vec![
                Port::input("Image", SocketType::Image).required(),
                Port::input("Mask", SocketType::Mask).required(),
            ],
            vec![Port::output("Image", SocketType::Image)],
        )
    }

    fn default_strategy(&self) -> Strategy {
        Strategy::Memoized
    }

    fn compute(&self, inputs: &Inputs<'_>) -> Result<Vec<SocketValue>, ComputeError> {
        let image = inputs.image(0)?;
        let mask = inputs.mask(1)?;
        if image.width != mask.width || image.height != mask.height {
            return Err(ComputeError::failed(format!(
                "mask is {}x{}, image is {}x{}",
                mask.width, mask.height, image.width, image.height
            )));
        }
        if mask.values.len() != image.len() {
            return Err(ComputeError::failed(format!(
                "mask holds {} values for {} pixels",
                mask.values.len(),
                image.len()
            )));
        }

        let pixels = image
            .pixels
            .iter()
            .zip(&mask.values)
            .map(|(&[r, g, b, a], &m)| [r, g, b, a * m])
            .collect();
        Ok(vec![SocketValue::Image(ImageBuffer {
            width: image.width,
            height: image.height,
            pixels,
        })])
    }
}

/// Decode tightly packed RGBA8 bytes into an image
#[derive(Debug, Clone)]
pub struct ImageFromBytes {
    size: Dimensions,
}

impl ImageFromBytes {
    /// Decoder for `width` x `height` images, clamped like [`SolidColor::new`]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Dimensions::clamped(width, height),
        }
    }
}

impl Default for ImageFromBytes {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl NodeKernel for ImageFromBytes {
    fn kind(&self) -> &'static str {
        "image_from_bytes"
    }

    fn display_name(&self) -> String {
        "Bytes to Image".to_string()
    }

    fn initialize_ports(&self) -> PortLayout {
        PortLayout::new(
            vec![Port::input("Bytes", SocketType::Bytes).required()],
            vec![Port::output("Image", SocketType::Image)],
        )
    }

    fn default_strategy(&self) -> Strategy {
        Strategy::Memoized
    }

    fn compute(&self, inputs: &Inputs<'_>) -> Result<Vec<SocketValue>, ComputeError> {
        let bytes = inputs.bytes(0)?;
        let expected = self.size.pixel_count() * 4;
        if bytes.len() != expected {
            return Err(ComputeError::failed(format!(
                "byte buffer holds {} bytes, expected {expected} for {}x{} RGBA8",
                bytes.len(),
                self.size.width,
                self.size.height
            )));
        }

        let pixels = bytes
            .chunks_exact(4)
            .map(|px| [px[0], px[1], px[2], px[3]].map(|c| f32::from(c) / 255.0))
            .collect();
        Ok(vec![SocketValue::Image(ImageBuffer {
            width: self.size.width,
            height: self.size.height,
            pixels,
        })])
    }

    fn parameters(&self) -> Vec<(&'static str, ParamValue)> {
        self.size.parameters()
    }

    fn set_parameter(&mut self, name: &str, value: ParamValue) -> Result<(), ParameterError> {
        self.size.set(self.kind(), name, value)
    }
}

/// Encode an image as tightly packed RGBA8 bytes
#[derive(Debug, Clone, Default)]
pub struct ImageToBytes;

impl NodeKernel for ImageToBytes {
    fn kind(&self) -> &'static str {
        "image_to_bytes"
    }

    fn display_name(&self) -> String {
        "Image to Bytes".to_string()
    }

    fn initialize_ports(&self) -> PortLayout {
        PortLayout::new(
            vec![Port::input("Image", SocketType::Image).required()],
            vec![Port::output("Bytes", SocketType::Bytes)],
        )
    }

    fn default_strategy(&self) -> Strategy {
        Strategy::Memoized
    }

    fn compute(&self, inputs: &Inputs<'_>) -> Result<Vec<SocketValue>, ComputeError> {
        let image = inputs.image(0)?;
        let bytes = image
            .pixels
            .iter()
            .flat_map(|pixel| pixel.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
            .collect();
        Ok(vec![SocketValue::Bytes(bytes)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_color() {
        let mut kernel = SolidColor::new(2, 1);
        let values = [SocketValue::Color([0.0, 1.0, 0.0, 1.0])];
        let outputs = kernel.compute(&Inputs::new(&values)).unwrap();
        assert_eq!(
            outputs[0],
            SocketValue::Image(ImageBuffer::filled(2, 1, [0.0, 1.0, 0.0, 1.0]))
        );

        assert!(matches!(
            kernel.set_parameter("width", ParamValue::Integer(0)),
            Err(ParameterError::OutOfRange { .. })
        ));
        kernel.set_parameter("height", ParamValue::Integer(4)).unwrap();
        assert_eq!(kernel.parameters()[1], ("height", ParamValue::Integer(4)));
    }

    #[test]
    fn test_constructors_clamp_dimensions() {
        assert_eq!(
            SolidColor::new(0, MAX_DIMENSION + 1).parameters(),
            vec![
                ("width", ParamValue::Integer(1)),
                ("height", ParamValue::Integer(MAX_DIMENSION)),
            ]
        );
        assert_eq!(
            ImageFromBytes::new(u32::MAX, 0).parameters(),
            vec![
                ("width", ParamValue::Integer(MAX_DIMENSION)),
                ("height", ParamValue::Integer(1)),
            ]
        );
    }

    #[test]
    fn test_masks() {
        let image = ImageBuffer::filled(1, 2, [1.0, 1.0, 1.0, 0.25]);
        let values = [SocketValue::Image(image)];
        let alpha = ExtractAlpha.compute(&Inputs::new(&values)).unwrap();
        assert_eq!(alpha[0].as_mask().unwrap().values, vec![0.25, 0.25]);

        let lum = Luminance.compute(&Inputs::new(&values)).unwrap();
        let lum = &lum[0].as_mask().unwrap().values;
        assert!(lum.iter().all(|v| (v - 1.0).abs() < 1e-5));
    }

    #[test]
    fn test_apply_mask() {
        let image = ImageBuffer::filled(2, 1, [1.0, 0.0, 0.0, 1.0]);
        let mask = MaskBuffer {
            width: 2,
            height: 1,
            values: vec![0.0, 0.5],
        };
        let values = [SocketValue::Image(image.clone()), SocketValue::Mask(mask)];
        let outputs = ApplyMask.compute(&Inputs::new(&values)).unwrap();
        let result = outputs[0].as_image().unwrap();
        assert_eq!(result.pixel(0, 0), Some([1.0, 0.0, 0.0, 0.0]));
        assert_eq!(result.pixel(1, 0), Some([1.0, 0.0, 0.0, 0.5]));

        let wrong = MaskBuffer {
            width: 1,
            height: 1,
            values: vec![1.0],
        };
        let values = [SocketValue::Image(image), SocketValue::Mask(wrong)];
        assert!(matches!(
            ApplyMask.compute(&Inputs::new(&values)),
            Err(ComputeError::Failed(_))
        ));
    }

    #[test]
    fn test_bytes_round_trip() {
        let bytes = vec![255, 0, 0, 255, 0, 0, 255, 128];
        let values = [SocketValue::Bytes(bytes.clone())];
        let decoded = ImageFromBytes::new(2, 1).compute(&Inputs::new(&values)).unwrap();
        assert_eq!(decoded[0].as_image().unwrap().pixel(0, 0), Some([1.0, 0.0, 0.0, 1.0]));

        let encoded = ImageToBytes.compute(&Inputs::new(&decoded)).unwrap();
        assert_eq!(encoded[0], SocketValue::Bytes(bytes));
    }

    #[test]
    fn test_malformed_byte_buffer_fails() {
        let values = [SocketValue::Bytes(vec![0; 7])];
        let err = ImageFromBytes::new(2, 1)
            .compute(&Inputs::new(&values))
            .unwrap_err();
        assert!(err.to_string().contains("expected 8"));
    }

    #[test]
    fn test_to_bytes_clamps() {
        let values = [SocketValue::Image(ImageBuffer::filled(1, 1, [2.0, -1.0, 0.5, 1.0]))];
        let encoded = ImageToBytes.compute(&Inputs::new(&values)).unwrap();
        assert_eq!(encoded[0], SocketValue::Bytes(vec![255, 0, 128, 255]));
    }
}
