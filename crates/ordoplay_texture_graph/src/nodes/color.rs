// SPDX-License-Identifier: MIT OR Apache-2.0
//! Color adjustment and mixing of RGBA images.

use crate::node::{ComputeError, Inputs, NodeKernel, ParamValue, ParameterError, PortLayout, Strategy};
use crate::port::Port;
use crate::socket::{ImageBuffer, SocketType, SocketValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rec. 709 relative luminance of a pixel
pub(crate) fn luminance(pixel: [f32; 4]) -> f32 {
    0.2126 * pixel[0] + 0.7152 * pixel[1] + 0.0722 * pixel[2]
}

pub(crate) fn require_same_size(a: &ImageBuffer, b: &ImageBuffer) -> Result<(), ComputeError> {
    if a.same_size(b) {
        Ok(())
    } else {
        Err(ComputeError::failed(format!(
            "image dimensions differ: {}x{} vs {}x{}",
            a.width, a.height, b.width, b.height
        )))
    }
}

fn image_input(name: &str) -> Port {
    Port::input(name, SocketType::Image).required()
}

fn image_output() -> Vec<Port> {
    vec![Port::output("Image", SocketType::Image)]
}

fn unknown(kind: &'static str, name: &str) -> ParameterError {
    ParameterError::Unknown {
        kind,
        name: name.to_string(),
    }
}

/// Brightness, contrast and saturation
#[derive(Debug, Clone, Default)]
pub struct ColorAdjust;

impl ColorAdjust {
    fn adjust(pixel: [f32; 4], brightness: f32, contrast: f32, saturation: f32) -> [f32; 4] {
        let [r, g, b, a] = pixel.map(|c| (c - 0.5) * contrast + 0.5 + brightness);
        let lum = luminance([r, g, b, a]);
        let saturate = |c: f32| lum + (c - lum) * saturation;
        [saturate(r), saturate(g), saturate(b), pixel[3]]
    }
}

impl NodeKernel for ColorAdjust {
    fn kind(&self) -> &'static str {
        "color_adjust"
    }

    fn display_name(&self) -> String {
        "Color Adjust".to_string()
    }

    fn initialize_ports(&self) -> PortLayout {
        PortLayout::new(
            vec![
                image_input("Image"),
                Port::input("Brightness", SocketType::Scalar),
                Port::input("Contrast", SocketType::Scalar).with_default(1.0),
                Port::input("Saturation", SocketType::Scalar).with_default(1.0),
            ],
            image_output(),
        )
    }

    fn default_strategy(&self) -> Strategy {
        Strategy::Memoized
    }

    fn compute(&self, inputs: &Inputs<'_>) -> Result<Vec<SocketValue>, ComputeError> {
        let image = inputs.image(0)?;
        let brightness = inputs.scalar(1)?;
        let contrast = inputs.scalar(2)?;
        let saturation = inputs.scalar(3)?;
        Ok(vec![SocketValue::Image(
            image.map(|p| Self::adjust(p, brightness, contrast, saturation)),
        )])
    }
}

/// Invert color channels, keeping alpha
#[derive(Debug, Clone, Default)]
pub struct Invert;

impl NodeKernel for Invert {
    fn kind(&self) -> &'static str {
        "invert"
    }

    fn initialize_ports(&self) -> PortLayout {
        PortLayout::new(vec![image_input("Image")], image_output())
    }

    fn display_name(&self) -> String {
        "Invert".to_string()
    }

    fn default_strategy(&self) -> Strategy {
        Strategy::Memoized
    }

    fn compute(&self, inputs: &Inputs<'_>) -> Result<Vec<SocketValue>, ComputeError> {
        let image = inputs.image(0)?;
        Ok(vec![SocketValue::Image(
            image.map(|[r, g, b, a]| [1.0 - r, 1.0 - g, 1.0 - b, a]),
        )])
    }
}

/// Multiply color channels by a color
#[derive(Debug, Clone, Default)]
pub struct Tint;

impl NodeKernel for Tint {
    fn kind(&self) -> &'static str {
        "tint"
    }

    fn display_name(&self) -> String {
        "Tint".to_string()
    }

    fn initialize_ports(&self) -> PortLayout {
        PortLayout::new(
            vec![
                image_input("Image"),
                Port::input("Color", SocketType::Color)
                    .with_default(SocketValue::Color([1.0, 1.0, 1.0, 1.0])),
            ],
            image_output(),
        )
    }

    fn default_strategy(&self) -> Strategy {
        Strategy::Memoized
    }

    fn compute(&self, inputs: &Inputs<'_>) -> Result<Vec<SocketValue>, ComputeError> {
        let image = inputs.image(0)?;
        let [tr, tg, tb, _] = inputs.color(1)?;
        Ok(vec![SocketValue::Image(
            image.map(|[r, g, b, a]| [r * tr, g * tg, b * tb, a]),
        )])
    }
}

/// How [`Mix`] combines two pixels before blending by the factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMode {
    /// Linear interpolation
    #[default]
    Mix,
    /// a + b
    Add,
    /// a * b
    Multiply,
    /// 1 - (1 - a)(1 - b)
    Screen,
    /// |a - b|
    Difference,
}

impl BlendMode {
    /// All modes
    pub const ALL: [BlendMode; 5] = [
        Self::Mix,
        Self::Add,
        Self::Multiply,
        Self::Screen,
        Self::Difference,
    ];

    /// Parameter spelling
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mix => "mix",
            Self::Add => "add",
            Self::Multiply => "multiply",
            Self::Screen => "screen",
            Self::Difference => "difference",
        }
    }

    fn blend_channel(&self, a: f32, b: f32) -> f32 {
        match self {
            Self::Mix => b,
            Self::Add => a + b,
            Self::Multiply => a * b,
            Self::Screen => 1.0 - (1.0 - a) * (1.0 - b),
            Self::Difference => (a - b).abs(),
        }
    }

    /// Blend `b` over `a`; alpha always interpolates linearly
    pub fn blend(&self, a: [f32; 4], b: [f32; 4], factor: f32) -> [f32; 4] {
        let lerp = |x: f32, y: f32| x + (y - x) * factor;
        [
            lerp(a[0], self.blend_channel(a[0], b[0])),
            lerp(a[1], self.blend_channel(a[1], b[1])),
            lerp(a[2], self.blend_channel(a[2], b[2])),
            lerp(a[3], b[3]),
        ]
    }
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BlendMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| format!("unknown blend mode '{s}'"))
    }
}

/// Blend two images of equal size
#[derive(Debug, Clone, Default)]
pub struct Mix {
    /// Blend mode
    pub mode: BlendMode,
}

impl Mix {
    /// Create a mix node
    pub fn new(mode: BlendMode) -> Self {
        Self { mode }
    }
}

impl NodeKernel for Mix {
    fn kind(&self) -> &'static str {
        "mix"
    }

    fn display_name(&self) -> String {
        "Mix".to_string()
    }

    fn initialize_ports(&self) -> PortLayout {
        PortLayout::new(
            vec![
                image_input("A"),
                image_input("B"),
                Port::input("Factor", SocketType::Scalar).with_default(0.5),
            ],
            image_output(),
        )
    }

    fn default_strategy(&self) -> Strategy {
        Strategy::Memoized
    }

    fn compute(&self, inputs: &Inputs<'_>) -> Result<Vec<SocketValue>, ComputeError> {
        let a = inputs.image(0)?;
        let b = inputs.image(1)?;
        let factor = inputs.scalar(2)?.clamp(0.0, 1.0);
        require_same_size(a, b)?;

        let pixels = a
            .pixels
            .iter()
            .zip(&b.pixels)
            .map(|(&pa, &pb)| self.mode.blend(pa, pb, factor))
            .collect();
        Ok(vec![SocketValue::Image(ImageBuffer {
            width: a.width,
            height: a.height,
            pixels,
        })])
    }

    fn parameters(&self) -> Vec<(&'static str, ParamValue)> {
        vec![("mode", ParamValue::Choice(self.mode.name().to_string()))]
    }

    fn set_parameter(&mut self, name: &str, value: ParamValue) -> Result<(), ParameterError> {
        if name != "mode" {
            return Err(unknown(self.kind(), name));
        }
        self.mode = value
            .choice(name)?
            .parse()
            .map_err(|reason| ParameterError::OutOfRange {
                name: name.to_string(),
                reason,
            })?;
        Ok(())
    }

    fn surface(&self, ui: &mut egui::Ui) {
        ui.label(self.mode.name());
    }
}

/// Side-by-side comparison: columns left of the split come from A, the rest from B
#[derive(Debug, Clone)]
pub struct SplitView {
    /// Split position as a fraction of the width
    pub split: f32,
}

impl Default for SplitView {
    fn default() -> Self {
        Self { split: 0.5 }
    }
}

impl NodeKernel for SplitView {
    fn kind(&self) -> &'static str {
        "split_view"
    }

    fn display_name(&self) -> String {
        "Split View".to_string()
    }

    fn initialize_ports(&self) -> PortLayout {
        PortLayout::new(vec![image_input("A"), image_input("B")], image_output())
    }

    fn default_strategy(&self) -> Strategy {
        Strategy::Memoized
    }

    fn compute(&self, inputs: &Inputs<'_>) -> Result<Vec<SocketValue>, ComputeError> {
        let a = inputs.image(0)?;
        let b = inputs.image(1)?;
        require_same_size(a, b)?;

        let boundary = (self.split * a.width as f32).round() as usize;
        let width = (a.width as usize).max(1);
        let pixels = a
            .pixels
            .iter()
            .zip(&b.pixels)
            .enumerate()
            .map(|(i, (&pa, &pb))| if i % width < boundary { pa } else { pb })
            .collect();
        Ok(vec![SocketValue::Image(ImageBuffer {
            width: a.width,
            height: a.height,
            pixels,
        })])
    }

    fn parameters(&self) -> Vec<(&'static str, ParamValue)> {
        vec![("split", ParamValue::Scalar(self.split))]
    }

    fn set_parameter(&mut self, name: &str, value: ParamValue) -> Result<(), ParameterError> {
        if name != "split" {
            return Err(unknown(self.kind(), name));
        }
        let split = value.scalar(name)?;
        if !(0.0..=1.0).contains(&split) {
            return Err(ParameterError::OutOfRange {
                name: name.to_string(),
                reason: format!("{split} is outside 0..=1"),
            });
        }
        self.split = split;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
    const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

    fn image(color: [f32; 4]) -> SocketValue {
        SocketValue::Image(ImageBuffer::filled(2, 2, color))
    }

    fn first_pixel(result: Result<Vec<SocketValue>, ComputeError>) -> [f32; 4] {
        let outputs = result.unwrap();
        outputs[0].as_image().unwrap().pixels[0]
    }

    #[test]
    fn test_color_adjust_identity() {
        let values = [
            image([0.2, 0.4, 0.6, 0.5]),
            SocketValue::Scalar(0.0),
            SocketValue::Scalar(1.0),
            SocketValue::Scalar(1.0),
        ];
        let [r, g, b, a] = first_pixel(ColorAdjust.compute(&Inputs::new(&values)));
        assert!((r - 0.2).abs() < 1e-6);
        assert!((g - 0.4).abs() < 1e-6);
        assert!((b - 0.6).abs() < 1e-6);
        assert_eq!(a, 0.5);
    }

    #[test]
    fn test_color_adjust_desaturates() {
        let values = [
            image(RED),
            SocketValue::Scalar(0.0),
            SocketValue::Scalar(1.0),
            SocketValue::Scalar(0.0),
        ];
        let [r, g, b, _] = first_pixel(ColorAdjust.compute(&Inputs::new(&values)));
        assert!((r - g).abs() < 1e-6 && (g - b).abs() < 1e-6);
    }

    #[test]
    fn test_invert_and_tint() {
        let values = [image([0.25, 0.5, 1.0, 0.75])];
        assert_eq!(
            first_pixel(Invert.compute(&Inputs::new(&values))),
            [0.75, 0.5, 0.0, 0.75]
        );

        let values = [image([1.0, 1.0, 1.0, 1.0]), SocketValue::Color([0.5, 0.25, 0.0, 0.1])];
        assert_eq!(
            first_pixel(Tint.compute(&Inputs::new(&values))),
            [0.5, 0.25, 0.0, 1.0]
        );
    }

    #[test]
    fn test_mix_modes() {
        let values = [image(RED), image(BLUE), SocketValue::Scalar(0.5)];
        assert_eq!(
            first_pixel(Mix::default().compute(&Inputs::new(&values))),
            [0.5, 0.0, 0.5, 1.0]
        );

        let values = [image(RED), image(BLUE), SocketValue::Scalar(1.0)];
        assert_eq!(
            first_pixel(Mix::new(BlendMode::Screen).compute(&Inputs::new(&values))),
            [1.0, 0.0, 1.0, 1.0]
        );
        assert_eq!(
            first_pixel(Mix::new(BlendMode::Multiply).compute(&Inputs::new(&values))),
            [0.0, 0.0, 0.0, 1.0]
        );
    }

    #[test]
    fn test_mix_dimension_mismatch_fails() {
        let values = [
            image(RED),
            SocketValue::Image(ImageBuffer::filled(3, 1, BLUE)),
            SocketValue::Scalar(0.5),
        ];
        assert!(matches!(
            Mix::default().compute(&Inputs::new(&values)),
            Err(ComputeError::Failed(_))
        ));
    }

    #[test]
    fn test_split_view_columns() {
        let values = [image(RED), image(BLUE)];
        let outputs = SplitView::default().compute(&Inputs::new(&values)).unwrap();
        let result = outputs[0].as_image().unwrap();
        assert_eq!(result.pixel(0, 1), Some(RED));
        assert_eq!(result.pixel(1, 1), Some(BLUE));
    }

    #[test]
    fn test_split_parameter_range() {
        let mut kernel = SplitView::default();
        assert!(kernel.set_parameter("split", ParamValue::Scalar(1.5)).is_err());
        kernel.set_parameter("split", ParamValue::Scalar(1.0)).unwrap();
        assert_eq!(kernel.split, 1.0);
    }

    #[test]
    fn test_blend_mode_parameter() {
        let mut kernel = Mix::default();
        kernel
            .set_parameter("mode", ParamValue::Choice("difference".into()))
            .unwrap();
        assert_eq!(kernel.mode, BlendMode::Difference);
        assert!(kernel
            .set_parameter("mode", ParamValue::Choice("overlay".into()))
            .is_err());
    }
}
