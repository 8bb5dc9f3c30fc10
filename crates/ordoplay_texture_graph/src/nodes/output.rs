// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph result node.

use crate::node::{ComputeError, Inputs, NodeKernel, PortLayout};
use crate::port::Port;
use crate::socket::{SocketType, SocketValue};

/// Final image of the graph; exporters read its output after a pass
#[derive(Debug, Clone, Default)]
pub struct ImageOutput;

impl NodeKernel for ImageOutput {
    fn kind(&self) -> &'static str {
        "output"
    }

    fn display_name(&self) -> String {
        "Output".to_string()
    }

    fn initialize_ports(&self) -> PortLayout {
        PortLayout::new(
            vec![Port::input("Image", SocketType::Image).required()],
            vec![Port::output("Image", SocketType::Image)],
        )
    }

    fn compute(&self, inputs: &Inputs<'_>) -> Result<Vec<SocketValue>, ComputeError> {
        Ok(vec![SocketValue::Image(inputs.image(0)?.clone())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::evaluate;
    use crate::graph::Graph;
    use crate::node::{Node, NodeState};
    use crate::nodes::convert::SolidColor;

    #[test]
    fn test_unconnected_output_fails() {
        let mut graph = Graph::default();
        let output = graph.add_node(Node::new(ImageOutput));
        let report = evaluate(&mut graph).unwrap();
        assert!(matches!(
            report.failure(output),
            Some(ComputeError::MissingInput { index: 0, .. })
        ));
        assert_eq!(graph.node(output).unwrap().state(), NodeState::Failed);
    }

    #[test]
    fn test_output_passes_image_through() {
        let mut graph = Graph::default();
        let solid = graph.add_node(Node::new(SolidColor::new(4, 4)));
        let output = graph.add_node(Node::new(ImageOutput));
        graph.connect(solid, 0, output, 0).unwrap();

        evaluate(&mut graph).unwrap();
        let image = graph
            .node(output)
            .and_then(|n| n.output_value(0))
            .and_then(SocketValue::as_image)
            .unwrap();
        assert_eq!((image.width, image.height), (4, 4));
        assert_eq!(image.pixel(3, 3), Some([1.0, 1.0, 1.0, 1.0]));
    }
}
