// SPDX-License-Identifier: MIT OR Apache-2.0
//! Socket type system.
//!
//! Every port carries values of a [`SocketType`]. Connections are validated by
//! exact identity: there is no widening between categories, so a scalar never
//! feeds a vector input and an image never feeds a mask input. Nodes that want
//! a sub-channel extract it explicitly with their own port typing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of value that can flow through a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SocketType {
    /// Single floating point value
    Scalar,
    /// 2D vector
    Vector2,
    /// 3D vector
    Vector3,
    /// 4D vector
    Vector4,
    /// Single RGBA color
    Color,
    /// RGBA pixel buffer (color-with-alpha)
    Image,
    /// Single-channel alpha buffer
    Mask,
    /// Raw byte buffer
    Bytes,
    /// Opaque handle to an externally owned texture
    Texture,
}

impl SocketType {
    /// All socket types, in declaration order
    pub const ALL: [SocketType; 9] = [
        Self::Scalar,
        Self::Vector2,
        Self::Vector3,
        Self::Vector4,
        Self::Color,
        Self::Image,
        Self::Mask,
        Self::Bytes,
        Self::Texture,
    ];

    /// Display name used in diagnostics and the editor
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scalar => "Scalar",
            Self::Vector2 => "Vector2",
            Self::Vector3 => "Vector3",
            Self::Vector4 => "Vector4",
            Self::Color => "Color",
            Self::Image => "Image",
            Self::Mask => "Mask",
            Self::Bytes => "Bytes",
            Self::Texture => "Texture",
        }
    }

    /// Get the color for this socket type (for UI)
    pub fn color(&self) -> [u8; 3] {
        match self {
            Self::Scalar => [80, 200, 80],
            Self::Vector2 => [200, 200, 80],
            Self::Vector3 => [200, 150, 80],
            Self::Vector4 => [200, 100, 200],
            Self::Color => [255, 200, 100],
            Self::Image => [100, 150, 200],
            Self::Mask => [170, 170, 170],
            Self::Bytes => [200, 180, 150],
            Self::Texture => [150, 100, 200],
        }
    }

    /// Component count for vector types, `None` otherwise
    pub fn vector_arity(&self) -> Option<usize> {
        match self {
            Self::Vector2 => Some(2),
            Self::Vector3 => Some(3),
            Self::Vector4 => Some(4),
            _ => None,
        }
    }

    /// Vector type with the given component count
    pub fn vector(arity: usize) -> Option<SocketType> {
        match arity {
            2 => Some(Self::Vector2),
            3 => Some(Self::Vector3),
            4 => Some(Self::Vector4),
            _ => None,
        }
    }

    /// The value an output of this type holds before it was ever computed
    pub fn zero_value(&self) -> SocketValue {
        match self {
            Self::Scalar => SocketValue::Scalar(0.0),
            Self::Vector2 => SocketValue::Vector2([0.0; 2]),
            Self::Vector3 => SocketValue::Vector3([0.0; 3]),
            Self::Vector4 => SocketValue::Vector4([0.0; 4]),
            Self::Color => SocketValue::Color([0.0, 0.0, 0.0, 1.0]),
            Self::Image => SocketValue::Image(ImageBuffer::default()),
            Self::Mask => SocketValue::Mask(MaskBuffer::default()),
            Self::Bytes => SocketValue::Bytes(Vec::new()),
            Self::Texture => SocketValue::Texture(TextureHandle::NULL),
        }
    }
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of socket types an input port accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcceptedTypes {
    /// Exactly one concrete type
    Single(SocketType),
    /// Any member of an explicit set (e.g. vectors of varying arity)
    AnyOf(Vec<SocketType>),
}

impl AcceptedTypes {
    /// Accept 2, 3 and 4 component vectors
    pub fn any_vector() -> Self {
        Self::AnyOf(vec![
            SocketType::Vector2,
            SocketType::Vector3,
            SocketType::Vector4,
        ])
    }

    /// Whether `socket_type` is a member of the set
    pub fn contains(&self, socket_type: SocketType) -> bool {
        match self {
            Self::Single(accepted) => *accepted == socket_type,
            Self::AnyOf(accepted) => accepted.contains(&socket_type),
        }
    }

    /// Whether the set is empty (only possible for a malformed `AnyOf`)
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::AnyOf(accepted) if accepted.is_empty())
    }

    /// The first accepted type, used to pick zero values and UI colors
    pub fn primary(&self) -> Option<SocketType> {
        match self {
            Self::Single(accepted) => Some(*accepted),
            Self::AnyOf(accepted) => accepted.first().copied(),
        }
    }

    /// Iterate over the accepted types
    pub fn iter(&self) -> impl Iterator<Item = SocketType> + '_ {
        let slice: &[SocketType] = match self {
            Self::Single(accepted) => std::slice::from_ref(accepted),
            Self::AnyOf(accepted) => accepted,
        };
        slice.iter().copied()
    }
}

impl From<SocketType> for AcceptedTypes {
    fn from(socket_type: SocketType) -> Self {
        Self::Single(socket_type)
    }
}

impl fmt::Display for AcceptedTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(accepted) => write!(f, "{accepted}"),
            Self::AnyOf(accepted) => {
                let names: Vec<&str> = accepted.iter().map(SocketType::name).collect();
                write!(f, "one of [{}]", names.join(", "))
            }
        }
    }
}

/// Connection compatibility: exact membership, no coercion
pub fn is_compatible(output: SocketType, accepted: &AcceptedTypes) -> bool {
    accepted.contains(output)
}

/// RGBA pixel buffer, row-major, linear `f32` channels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageBuffer {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// `width * height` RGBA pixels
    pub pixels: Vec<[f32; 4]>,
}

impl ImageBuffer {
    /// Create an image filled with a single color
    pub fn filled(width: u32, height: u32, color: [f32; 4]) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    /// Whether both images have the same dimensions
    pub fn same_size(&self, other: &ImageBuffer) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Number of pixels
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Whether the image has no pixels
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Pixel at (x, y), if in bounds
    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    /// Apply `f` to every pixel, producing a new image of the same size
    pub fn map(&self, f: impl Fn([f32; 4]) -> [f32; 4]) -> Self {
        Self {
            width: self.width,
            height: self.height,
            pixels: self.pixels.iter().copied().map(f).collect(),
        }
    }
}

/// Single-channel buffer, row-major
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaskBuffer {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// `width * height` values
    pub values: Vec<f32>,
}

/// Opaque handle to a texture owned by the host renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureHandle(pub u64);

impl TextureHandle {
    /// Handle that refers to no texture
    pub const NULL: TextureHandle = TextureHandle(0);
}

/// Value carried by a port, one variant per [`SocketType`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SocketValue {
    /// Scalar
    Scalar(f32),
    /// 2D vector
    Vector2([f32; 2]),
    /// 3D vector
    Vector3([f32; 3]),
    /// 4D vector
    Vector4([f32; 4]),
    /// RGBA color
    Color([f32; 4]),
    /// RGBA pixel buffer
    Image(ImageBuffer),
    /// Alpha buffer
    Mask(MaskBuffer),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Texture handle
    Texture(TextureHandle),
}

impl SocketValue {
    /// Get the socket type for this value
    pub fn socket_type(&self) -> SocketType {
        match self {
            Self::Scalar(_) => SocketType::Scalar,
            Self::Vector2(_) => SocketType::Vector2,
            Self::Vector3(_) => SocketType::Vector3,
            Self::Vector4(_) => SocketType::Vector4,
            Self::Color(_) => SocketType::Color,
            Self::Image(_) => SocketType::Image,
            Self::Mask(_) => SocketType::Mask,
            Self::Bytes(_) => SocketType::Bytes,
            Self::Texture(_) => SocketType::Texture,
        }
    }

    /// Scalar payload
    pub fn as_scalar(&self) -> Option<f32> {
        match self {
            Self::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    /// Vector components for any vector arity
    pub fn as_vector(&self) -> Option<&[f32]> {
        match self {
            Self::Vector2(v) => Some(v),
            Self::Vector3(v) => Some(v),
            Self::Vector4(v) => Some(v),
            _ => None,
        }
    }

    /// Color payload
    pub fn as_color(&self) -> Option<[f32; 4]> {
        match self {
            Self::Color(c) => Some(*c),
            _ => None,
        }
    }

    /// Image payload
    pub fn as_image(&self) -> Option<&ImageBuffer> {
        match self {
            Self::Image(image) => Some(image),
            _ => None,
        }
    }

    /// Mask payload
    pub fn as_mask(&self) -> Option<&MaskBuffer> {
        match self {
            Self::Mask(mask) => Some(mask),
            _ => None,
        }
    }

    /// Byte payload
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Build a vector value from a slice of 2, 3 or 4 components
    pub fn vector(components: &[f32]) -> Option<SocketValue> {
        match *components {
            [x, y] => Some(Self::Vector2([x, y])),
            [x, y, z] => Some(Self::Vector3([x, y, z])),
            [x, y, z, w] => Some(Self::Vector4([x, y, z, w])),
            _ => None,
        }
    }
}

impl From<f32> for SocketValue {
    fn from(value: f32) -> Self {
        Self::Scalar(value)
    }
}

impl From<ImageBuffer> for SocketValue {
    fn from(image: ImageBuffer) -> Self {
        Self::Image(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_identity_compatibility() {
        for output in SocketType::ALL {
            for input in SocketType::ALL {
                let accepted = AcceptedTypes::Single(input);
                assert_eq!(is_compatible(output, &accepted), output == input);
            }
        }
    }

    #[test]
    fn test_no_widening() {
        assert!(!is_compatible(SocketType::Scalar, &AcceptedTypes::any_vector()));
        assert!(!is_compatible(SocketType::Image, &SocketType::Mask.into()));
        assert!(!is_compatible(SocketType::Color, &SocketType::Vector4.into()));
        assert!(is_compatible(SocketType::Vector3, &AcceptedTypes::any_vector()));
    }

    #[test]
    fn test_zero_values_match_their_type() {
        for socket_type in SocketType::ALL {
            assert_eq!(socket_type.zero_value().socket_type(), socket_type);
        }
    }

    #[test]
    fn test_vector_helpers() {
        assert_eq!(SocketType::vector(3), Some(SocketType::Vector3));
        assert_eq!(SocketType::vector(5), None);
        let value = SocketValue::vector(&[1.0, 2.0]).unwrap();
        assert_eq!(value.socket_type(), SocketType::Vector2);
        assert_eq!(value.as_vector(), Some(&[1.0, 2.0][..]));
        assert!(SocketValue::vector(&[1.0]).is_none());
    }

    #[test]
    fn test_accepted_types_display() {
        assert_eq!(AcceptedTypes::Single(SocketType::Mask).to_string(), "Mask");
        assert_eq!(
            AcceptedTypes::any_vector().to_string(),
            "one of [Vector2, Vector3, Vector4]"
        );
        assert!(AcceptedTypes::AnyOf(Vec::new()).is_empty());
    }

    #[test]
    fn test_image_pixel_bounds() {
        let image = ImageBuffer::filled(2, 3, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(image.len(), 6);
        assert_eq!(image.pixel(1, 2), Some([1.0, 0.0, 0.0, 1.0]));
        assert_eq!(image.pixel(2, 0), None);
    }
}
