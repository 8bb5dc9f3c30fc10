// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph scripts: a RON description of nodes, connections and passes.
//!
//! The script is rebuilt into a [`Graph`] purely through the public editing
//! operations (`create_node`, `set_parameter`, `add_node`, `connect`), the same
//! way an editor would restore a saved document.

use crate::error::{Result, RunnerError};
use indexmap::IndexMap;
use ordoplay_texture_graph::{Graph, NodeId, NodeRegistry, ParamValue, SocketValue, Strategy};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current script format version
pub const SCRIPT_FORMAT_VERSION: u32 = 1;

fn default_name() -> String {
    "Untitled".to_string()
}

fn default_passes() -> u32 {
    1
}

/// One node in a script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Script-local name used by connections and exports
    pub key: String,
    /// Registry id
    pub kind: String,
    /// Strategy override
    #[serde(default)]
    pub strategy: Option<Strategy>,
    /// Parameter values
    #[serde(default)]
    pub params: IndexMap<String, ParamValue>,
    /// Input defaults by input index
    #[serde(default)]
    pub defaults: IndexMap<usize, SocketValue>,
}

/// One connection in a script: `(node key, output index) -> (node key, input index)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSpec {
    /// Source node key and output index
    pub from: (String, usize),
    /// Target node key and input index
    pub to: (String, usize),
}

/// Parameter change applied before a given pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditSpec {
    /// 1-based pass the edit precedes
    pub before_pass: u32,
    /// Node key
    pub node: String,
    /// Parameter name
    pub param: String,
    /// New value
    pub value: ParamValue,
}

/// A whole graph script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphScript {
    /// Format version
    #[serde(default)]
    pub version: u32,
    /// Graph name
    #[serde(default = "default_name")]
    pub name: String,
    /// Nodes in creation order
    pub nodes: Vec<NodeSpec>,
    /// Connections, applied in order
    #[serde(default)]
    pub connections: Vec<ConnectionSpec>,
    /// Parameter edits between passes
    #[serde(default)]
    pub edits: Vec<EditSpec>,
    /// Number of passes to run
    #[serde(default = "default_passes")]
    pub passes: u32,
    /// Node keys whose outputs are reported after the last pass
    #[serde(default)]
    pub exports: Vec<String>,
}

/// A graph built from a script, with its key lookup
#[derive(Debug)]
pub struct BuiltGraph {
    /// The graph
    pub graph: Graph,
    /// Node ids by script key
    pub keys: IndexMap<String, NodeId>,
}

impl BuiltGraph {
    /// Node id for a script key
    pub fn node_id(&self, key: &str) -> Result<NodeId> {
        self.keys
            .get(key)
            .copied()
            .ok_or_else(|| RunnerError::UnknownNode(key.to_string()))
    }
}

impl GraphScript {
    /// Parse a script from RON
    pub fn from_ron(content: &str) -> Result<Self> {
        let script: GraphScript = ron::from_str(content)?;
        if script.version > SCRIPT_FORMAT_VERSION {
            return Err(RunnerError::UnsupportedVersion {
                found: script.version,
                supported: SCRIPT_FORMAT_VERSION,
            });
        }
        Ok(script)
    }

    /// Load a script file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Instantiate every node and connection
    pub fn build(&self, registry: &NodeRegistry) -> Result<BuiltGraph> {
        let mut built = BuiltGraph {
            graph: Graph::new(self.name.clone()),
            keys: IndexMap::new(),
        };

        for spec in &self.nodes {
            if built.keys.contains_key(&spec.key) {
                return Err(RunnerError::DuplicateKey(spec.key.clone()));
            }
            let mut node = registry
                .create_node(&spec.kind)
                .ok_or_else(|| RunnerError::UnknownKind {
                    key: spec.key.clone(),
                    kind: spec.kind.clone(),
                })?
                .with_name(spec.key.clone());

            if let Some(strategy) = spec.strategy {
                node.set_strategy(strategy);
            }
            for (name, value) in &spec.params {
                node.set_parameter(name, value.clone())
                    .map_err(|source| RunnerError::Parameter {
                        key: spec.key.clone(),
                        source,
                    })?;
            }
            for (&index, value) in &spec.defaults {
                node.set_input_default(index, value.clone())
                    .map_err(|source| RunnerError::Parameter {
                        key: spec.key.clone(),
                        source,
                    })?;
            }

            let id = built.graph.add_node(node);
            tracing::debug!(key = %spec.key, kind = %spec.kind, node = %id, "node created");
            built.keys.insert(spec.key.clone(), id);
        }

        for spec in &self.connections {
            let (from_key, output) = &spec.from;
            let (to_key, input) = &spec.to;
            let source = built.node_id(from_key)?;
            let target = built.node_id(to_key)?;
            built
                .graph
                .connect(source, *output, target, *input)
                .map_err(|err| RunnerError::Connect {
                    from: format!("{from_key}.out[{output}]"),
                    to: format!("{to_key}.in[{input}]"),
                    source: err,
                })?;
        }

        Ok(built)
    }

    /// Edits scheduled before `pass` (1-based)
    pub fn edits_before(&self, pass: u32) -> impl Iterator<Item = &EditSpec> {
        self.edits.iter().filter(move |edit| edit.before_pass == pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordoplay_texture_graph::{create_texture_registry, ConnectError, ParameterError};

    const SCRIPT: &str = r#"
        (
            name: "Checker",
            nodes: [
                (key: "a", kind: "scalar", params: { "value": Scalar(6.0) }),
                (key: "b", kind: "scalar", params: { "value": Scalar(3.0) }),
                (key: "div", kind: "math", params: { "op": Choice("divide") }),
                (key: "scale", kind: "vector_scale2", defaults: { 0: Vector2((1.0, 2.0)) }),
            ],
            connections: [
                (from: ("a", 0), to: ("div", 0)),
                (from: ("b", 0), to: ("div", 1)),
                (from: ("div", 0), to: ("scale", 1)),
            ],
            passes: 2,
            exports: ["scale"],
        )
    "#;

    #[test]
    fn test_parse_and_build() {
        let script = GraphScript::from_ron(SCRIPT).unwrap();
        assert_eq!(script.name, "Checker");
        assert_eq!(script.passes, 2);

        let built = script.build(&create_texture_registry()).unwrap();
        assert_eq!(built.graph.node_count(), 4);
        assert_eq!(built.graph.connection_count(), 3);
        let div = built.node_id("div").unwrap();
        assert_eq!(built.graph.node(div).unwrap().name, "div");
        assert!(built.node_id("missing").is_err());
    }

    #[test]
    fn test_defaults_to_one_pass() {
        let script = GraphScript::from_ron(r#"(nodes: [(key: "a", kind: "scalar")])"#).unwrap();
        assert_eq!(script.passes, 1);
        assert_eq!(script.name, "Untitled");
        assert!(script.exports.is_empty());
    }

    #[test]
    fn test_unknown_kind() {
        let script = GraphScript::from_ron(r#"(nodes: [(key: "a", kind: "blur")])"#).unwrap();
        let err = script.build(&create_texture_registry()).unwrap_err();
        assert!(matches!(err, RunnerError::UnknownKind { ref kind, .. } if kind == "blur"));
    }

    #[test]
    fn test_duplicate_key() {
        let script = GraphScript::from_ron(
            r#"(nodes: [(key: "a", kind: "scalar"), (key: "a", kind: "color")])"#,
        )
        .unwrap();
        assert!(matches!(
            script.build(&create_texture_registry()),
            Err(RunnerError::DuplicateKey(_))
        ));
    }

    #[test]
    fn test_bad_parameter() {
        let script = GraphScript::from_ron(
            r#"(nodes: [(key: "m", kind: "math", params: { "op": Choice("modulo") })])"#,
        )
        .unwrap();
        assert!(matches!(
            script.build(&create_texture_registry()),
            Err(RunnerError::Parameter {
                source: ParameterError::OutOfRange { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_type_mismatch_connection() {
        let script = GraphScript::from_ron(
            r#"(
                nodes: [(key: "c", kind: "color"), (key: "m", kind: "math")],
                connections: [(from: ("c", 0), to: ("m", 0))],
            )"#,
        )
        .unwrap();
        assert!(matches!(
            script.build(&create_texture_registry()),
            Err(RunnerError::Connect {
                source: ConnectError::TypeMismatch { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_newer_version_rejected() {
        let err = GraphScript::from_ron("(version: 7, nodes: [])").unwrap_err();
        assert!(matches!(err, RunnerError::UnsupportedVersion { found: 7, .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.ron");
        std::fs::write(&path, SCRIPT).unwrap();
        assert_eq!(GraphScript::load(&path).unwrap().nodes.len(), 4);
        assert!(matches!(
            GraphScript::load(&dir.path().join("missing.ron")),
            Err(RunnerError::Io(_))
        ));
    }
}
