// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pass loop: build the graph, apply scheduled edits, evaluate, report.

use crate::error::{Result, RunnerError};
use crate::script::GraphScript;
use ordoplay_texture_graph::{create_texture_registry, Evaluator, EvaluatorSettings, PassReport, SocketValue};

/// Outputs of one exported node after the last pass
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedNode {
    /// Script key
    pub key: String,
    /// Output values in output order; `None` if never computed
    pub outputs: Vec<Option<SocketValue>>,
}

/// Everything a run produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// One report per pass
    pub reports: Vec<PassReport>,
    /// Exported node outputs
    pub exports: Vec<ExportedNode>,
}

/// Short human-readable rendering of a value for logs
pub fn describe(value: &SocketValue) -> String {
    match value {
        SocketValue::Scalar(v) => format!("{v}"),
        SocketValue::Vector2(v) => format!("{v:?}"),
        SocketValue::Vector3(v) => format!("{v:?}"),
        SocketValue::Vector4(v) => format!("{v:?}"),
        SocketValue::Color(c) => format!("color {c:?}"),
        SocketValue::Image(image) => format!("image {}x{}", image.width, image.height),
        SocketValue::Mask(mask) => format!("mask {}x{}", mask.width, mask.height),
        SocketValue::Bytes(bytes) => format!("{} bytes", bytes.len()),
        SocketValue::Texture(handle) => format!("texture {}", handle.0),
    }
}

/// Run every pass of `script`
pub fn run(script: &GraphScript, settings: EvaluatorSettings) -> Result<RunSummary> {
    let registry = create_texture_registry();
    let mut built = script.build(&registry)?;
    let evaluator = Evaluator::with_settings(settings);
    let mut summary = RunSummary::default();

    for pass in 1..=script.passes {
        for edit in script.edits_before(pass) {
            let id = built.node_id(&edit.node)?;
            let node = built
                .graph
                .node_mut(id)
                .ok_or_else(|| RunnerError::UnknownNode(edit.node.clone()))?;
            node.set_parameter(&edit.param, edit.value.clone())
                .map_err(|source| RunnerError::Parameter {
                    key: edit.node.clone(),
                    source,
                })?;
            tracing::info!(pass, node = %edit.node, param = %edit.param, "applied edit");
        }

        let report = evaluator.evaluate(&mut built.graph)?;
        tracing::info!(
            pass,
            computed = report.computed.len(),
            reused = report.reused.len(),
            failed = report.failures.len(),
            "pass complete"
        );
        for (id, error) in &report.failures {
            let key = built
                .keys
                .iter()
                .find(|(_, node_id)| *node_id == id)
                .map_or("?", |(key, _)| key.as_str());
            tracing::warn!(pass, node = key, %error, "node failed");
        }
        summary.reports.push(report);
    }

    for key in &script.exports {
        let id = built.node_id(key)?;
        let outputs: Vec<Option<SocketValue>> = built
            .graph
            .node(id)
            .map(|node| node.outputs().iter().map(|p| p.value().cloned()).collect())
            .unwrap_or_default();
        for (index, value) in outputs.iter().enumerate() {
            match value {
                Some(value) => tracing::info!(node = %key, output = index, value = %describe(value), "export"),
                None => tracing::info!(node = %key, output = index, "export (never computed)"),
            }
        }
        summary.exports.push(ExportedNode {
            key: key.clone(),
            outputs,
        });
    }

    Ok(summary)
}
