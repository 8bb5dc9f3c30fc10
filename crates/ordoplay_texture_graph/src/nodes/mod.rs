// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in image-processing node catalogue.

pub mod color;
pub mod convert;
pub mod input;
pub mod math;
pub mod output;
pub mod vector;

use crate::node::{NodeCategory, NodeKernel};
use crate::registry::{NodeRegistry, NodeType};

use color::{ColorAdjust, Invert, Mix, SplitView, Tint};
use convert::{ApplyMask, ExtractAlpha, ImageFromBytes, ImageToBytes, Luminance, SolidColor};
use input::{ColorConstant, ImageSource, ScalarConstant, VectorConstant};
use math::{MathNode, MathOp};
use output::ImageOutput;
use vector::{CombineVector, SplitVector, VectorLength, VectorMath, VectorScale};

fn boxed<K: NodeKernel + Default + 'static>() -> Box<dyn NodeKernel> {
    Box::new(K::default())
}

/// Create the texture graph node registry with all built-in node types
pub fn create_texture_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();

    // ========================================================================
    // Input Nodes
    // ========================================================================

    registry.register(NodeType::new(
        "scalar",
        "Scalar",
        NodeCategory::Input,
        "Constant scalar value",
        boxed::<ScalarConstant>,
    ));
    registry.register(NodeType::new(
        "vector2",
        "Vector2",
        NodeCategory::Input,
        "Constant 2D vector value",
        || Box::new(VectorConstant::new(2)),
    ));
    registry.register(NodeType::new(
        "vector3",
        "Vector3",
        NodeCategory::Input,
        "Constant 3D vector value",
        || Box::new(VectorConstant::new(3)),
    ));
    registry.register(NodeType::new(
        "vector4",
        "Vector4",
        NodeCategory::Input,
        "Constant 4D vector value",
        || Box::new(VectorConstant::new(4)),
    ));
    registry.register(NodeType::new(
        "color",
        "Color",
        NodeCategory::Input,
        "Constant color value",
        boxed::<ColorConstant>,
    ));
    registry.register(NodeType::new(
        "image_source",
        "Image",
        NodeCategory::Input,
        "Image supplied by the host's importer",
        boxed::<ImageSource>,
    ));

    // ========================================================================
    // Output Nodes
    // ========================================================================

    registry.register(NodeType::new(
        "output",
        "Output",
        NodeCategory::Output,
        "Final image handed to exporters",
        boxed::<ImageOutput>,
    ));

    // ========================================================================
    // Math Nodes
    // ========================================================================

    registry.register(NodeType::new(
        "math",
        "Math",
        NodeCategory::Math,
        "Add, subtract, multiply, divide, power, min or max of two scalars",
        || Box::new(MathNode::new(MathOp::Add)),
    ));

    // ========================================================================
    // Vector Nodes
    // ========================================================================

    registry.register(NodeType::new(
        "vector_math2",
        "Vector2 Math",
        NodeCategory::Vector,
        "Component-wise operation on two 2D vectors",
        || Box::new(VectorMath::new(MathOp::Add, 2)),
    ));
    registry.register(NodeType::new(
        "vector_math3",
        "Vector3 Math",
        NodeCategory::Vector,
        "Component-wise operation on two 3D vectors",
        || Box::new(VectorMath::new(MathOp::Add, 3)),
    ));
    registry.register(NodeType::new(
        "vector_math4",
        "Vector4 Math",
        NodeCategory::Vector,
        "Component-wise operation on two 4D vectors",
        || Box::new(VectorMath::new(MathOp::Add, 4)),
    ));
    registry.register(NodeType::new(
        "vector_scale2",
        "Scale Vector2",
        NodeCategory::Vector,
        "Multiply a 2D vector by a scalar",
        || Box::new(VectorScale::new(2)),
    ));
    registry.register(NodeType::new(
        "vector_scale3",
        "Scale Vector3",
        NodeCategory::Vector,
        "Multiply a 3D vector by a scalar",
        || Box::new(VectorScale::new(3)),
    ));
    registry.register(NodeType::new(
        "vector_scale4",
        "Scale Vector4",
        NodeCategory::Vector,
        "Multiply a 4D vector by a scalar",
        || Box::new(VectorScale::new(4)),
    ));
    registry.register(NodeType::new(
        "vector_length",
        "Length",
        NodeCategory::Vector,
        "Euclidean length of a vector",
        boxed::<VectorLength>,
    ));
    registry.register(NodeType::new(
        "combine_vector2",
        "Combine Vector2",
        NodeCategory::Vector,
        "Build a 2D vector from scalars",
        || Box::new(CombineVector::new(2)),
    ));
    registry.register(NodeType::new(
        "combine_vector3",
        "Combine Vector3",
        NodeCategory::Vector,
        "Build a 3D vector from scalars",
        || Box::new(CombineVector::new(3)),
    ));
    registry.register(NodeType::new(
        "combine_vector4",
        "Combine Vector4",
        NodeCategory::Vector,
        "Build a 4D vector from scalars",
        || Box::new(CombineVector::new(4)),
    ));
    registry.register(NodeType::new(
        "split_vector",
        "Split Vector",
        NodeCategory::Vector,
        "Split a vector into X, Y, Z and W",
        boxed::<SplitVector>,
    ));

    // ========================================================================
    // Color Nodes
    // ========================================================================

    registry.register(NodeType::new(
        "color_adjust",
        "Color Adjust",
        NodeCategory::Color,
        "Brightness, contrast and saturation",
        boxed::<ColorAdjust>,
    ));
    registry.register(NodeType::new(
        "invert",
        "Invert",
        NodeCategory::Color,
        "Invert color channels",
        boxed::<Invert>,
    ));
    registry.register(NodeType::new(
        "tint",
        "Tint",
        NodeCategory::Color,
        "Multiply an image by a color",
        boxed::<Tint>,
    ));
    registry.register(NodeType::new(
        "mix",
        "Mix",
        NodeCategory::Color,
        "Blend two images",
        boxed::<Mix>,
    ));
    registry.register(NodeType::new(
        "split_view",
        "Split View",
        NodeCategory::Color,
        "Compare two images side by side",
        boxed::<SplitView>,
    ));

    // ========================================================================
    // Conversion Nodes
    // ========================================================================

    registry.register(NodeType::new(
        "solid_color",
        "Solid Color",
        NodeCategory::Convert,
        "Image filled with one color",
        boxed::<SolidColor>,
    ));
    registry.register(NodeType::new(
        "extract_alpha",
        "Extract Alpha",
        NodeCategory::Convert,
        "Alpha channel as a mask",
        boxed::<ExtractAlpha>,
    ));
    registry.register(NodeType::new(
        "luminance",
        "Luminance",
        NodeCategory::Convert,
        "Relative luminance as a mask",
        boxed::<Luminance>,
    ));
    registry.register(NodeType::new(
        "apply_mask",
        "Apply Mask",
        NodeCategory::Convert,
        "Multiply alpha by a mask",
        boxed::<ApplyMask>,
    ));
    registry.register(NodeType::new(
        "image_from_bytes",
        "Bytes to Image",
        NodeCategory::Convert,
        "Decode RGBA8 bytes",
        boxed::<ImageFromBytes>,
    ));
    registry.register(NodeType::new(
        "image_to_bytes",
        "Image to Bytes",
        NodeCategory::Convert,
        "Encode as RGBA8 bytes",
        boxed::<ImageToBytes>,
    ));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_ids_match_kernel_kinds() {
        let registry = create_texture_registry();
        assert!(!registry.is_empty());
        for node_type in registry.types() {
            let kernel = (node_type.constructor)();
            assert_eq!(kernel.kind(), node_type.id, "kind mismatch for {}", node_type.id);
        }
    }

    #[test]
    fn test_outputs_declare_concrete_types() {
        let registry = create_texture_registry();
        for node_type in registry.types() {
            let layout = node_type.port_layout();
            assert!(!layout.outputs.is_empty(), "{} has no outputs", node_type.id);
            for port in &layout.outputs {
                assert!(
                    matches!(port.accepted, crate::socket::AcceptedTypes::Single(_)),
                    "{} output '{}' is not concrete",
                    node_type.id,
                    port.name
                );
            }
        }
    }

    #[test]
    fn test_categories() {
        let registry = create_texture_registry();
        assert!(registry.types_in_category(NodeCategory::Input).any(|t| t.id == "scalar"));
        assert_eq!(registry.types_in_category(NodeCategory::Output).count(), 1);
        let node = registry.create_node("mix").unwrap();
        assert_eq!(node.name, "Mix");
        assert_eq!(node.input_count(), 3);
    }
}
