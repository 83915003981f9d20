use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A node of a workload graph document, kept exactly as it was submitted.
///
/// Documents are untrusted, so nothing about a node's shape is assumed:
/// every accessor returns `None` when the field is missing or mistyped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphNode(Value);

impl GraphNode {
    pub fn new(raw: Value) -> Self {
        Self(raw)
    }

    /// Node identifier. Numeric ids are rendered as strings.
    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn node_type(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    /// The opaque parameter mapping of the node.
    pub fn parameters(&self) -> Option<&Map<String, Value>> {
        self.0.get("parameters").and_then(Value::as_object)
    }

    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameters().and_then(|params| params.get(key))
    }

    /// Whether `reference` names this node, either by id or display name.
    pub fn is_referenced_by(&self, reference: &str) -> bool {
        self.id().as_deref() == Some(reference) || self.name() == Some(reference)
    }

    pub fn raw(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for GraphNode {
    fn from(raw: Value) -> Self {
        Self(raw)
    }
}

/// The `connections` mapping of a workload graph document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Connections(Map<String, Value>);

impl Connections {
    pub fn new(raw: Map<String, Value>) -> Self {
        Self(raw)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of source entries in the mapping.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Flatten `{ source: { kind: [[ {node, type, index} ]] } }` into edges.
    /// Entries that do not follow that shape are skipped.
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges = Vec::new();

        for (source, outputs) in &self.0 {
            let Some(outputs) = outputs.as_object() else {
                continue;
            };

            for (kind, groups) in outputs {
                let Some(groups) = groups.as_array() else {
                    continue;
                };

                for target in groups.iter().filter_map(Value::as_array).flatten() {
                    let Some(node) = target.get("node").and_then(Value::as_str) else {
                        continue;
                    };

                    edges.push(Edge {
                        source: source.clone(),
                        target: node.to_string(),
                        kind: target
                            .get("type")
                            .and_then(Value::as_str)
                            .unwrap_or(kind)
                            .to_string(),
                        index: target.get("index").and_then(Value::as_u64),
                    });
                }
            }
        }

        edges
    }
}

/// A single directed connection between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub kind: String,
    pub index: Option<u64>,
}

/// A runtime input declared by a templated node parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDescriptor {
    pub name: String,
    /// `nodes.<nodeId>.parameters.<key>`
    pub resolution_path: String,
    pub default_value: String,
    pub required: bool,
}

/// A node recognised as an entry point of the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerNode {
    pub node_id: Option<String>,
    pub node_type: String,
    pub name: Option<String>,
}

/// Structured view of a workload graph document.
///
/// Produced once by the parser and only read afterwards; share it behind an
/// `Arc` when several tasks need it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedWorkflow {
    nodes: Vec<GraphNode>,
    connections: Connections,
    parameters: Vec<ParameterDescriptor>,
    triggers: Vec<TriggerNode>,
}

impl ParsedWorkflow {
    pub fn new(
        nodes: Vec<GraphNode>,
        connections: Connections,
        parameters: Vec<ParameterDescriptor>,
        triggers: Vec<TriggerNode>,
    ) -> Self {
        Self {
            nodes,
            connections,
            parameters,
            triggers,
        }
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn connections(&self) -> &Connections {
        &self.connections
    }

    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    pub fn triggers(&self) -> &[TriggerNode] {
        &self.triggers
    }

    pub fn find_node(&self, reference: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.is_referenced_by(reference))
    }

    /// Rebuild the `{nodes, connections}` document, e.g. to ship it to a
    /// remote runtime.
    pub fn to_document(&self) -> Value {
        serde_json::json!({
            "nodes": self.nodes,
            "connections": self.connections,
        })
    }
}
