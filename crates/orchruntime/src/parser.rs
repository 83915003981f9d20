use crate::config::DEFAULT_MAX_DOCUMENT_BYTES;
use orchcore::{
    Connections, GraphNode, ParameterDescriptor, ParsedWorkflow, TriggerNode, WorkflowError,
};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Any `{{ ... }}` marker, non-greedy.
pub const TEMPLATE_MARKER: &str = r"\{\{.*?\}\}";

/// `{{ $json.<identifier> }}`; the identifier becomes the parameter name.
pub const NAMED_VARIABLE: &str = r"\{\{\s*\$json\.([A-Za-z0-9_]+)\s*\}\}";

/// Type-tag fragments that mark a node as an entry point.
pub const TRIGGER_MARKERS: [&str; 3] = ["webhook", "trigger", "start"];

fn template_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TEMPLATE_MARKER).expect("template marker pattern is valid"))
}

fn named_variable() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(NAMED_VARIABLE).expect("named variable pattern is valid"))
}

/// Turns raw workload graph documents into [`ParsedWorkflow`]s.
#[derive(Debug, Clone)]
pub struct WorkflowParser {
    max_document_bytes: usize,
}

impl WorkflowParser {
    pub fn new(max_document_bytes: usize) -> Self {
        Self { max_document_bytes }
    }

    pub fn max_document_bytes(&self) -> usize {
        self.max_document_bytes
    }

    pub fn parse_str(&self, raw: &str) -> Result<ParsedWorkflow, WorkflowError> {
        self.parse(raw.as_bytes())
    }

    /// Parse a document, rejecting it before decoding when it exceeds the
    /// byte ceiling.
    pub fn parse(&self, raw: &[u8]) -> Result<ParsedWorkflow, WorkflowError> {
        if raw.len() > self.max_document_bytes {
            return Err(WorkflowError::TooLarge {
                size: raw.len(),
                limit: self.max_document_bytes,
            });
        }

        let document: Value =
            serde_json::from_slice(raw).map_err(|e| WorkflowError::Malformed(e.to_string()))?;

        let Value::Object(mut document) = document else {
            return Err(WorkflowError::NotAnObject);
        };

        let nodes = match document.remove("nodes") {
            Some(Value::Array(nodes)) => nodes,
            _ => return Err(WorkflowError::MissingNodes),
        };
        if nodes.is_empty() {
            return Err(WorkflowError::EmptyNodes);
        }

        let connections = match document.remove("connections") {
            None | Some(Value::Null) => Connections::default(),
            Some(Value::Object(map)) => Connections::new(map),
            Some(other) => {
                tracing::warn!(
                    "Ignoring connections of unexpected JSON type: {}",
                    json_type(&other)
                );
                Connections::default()
            }
        };

        let nodes: Vec<GraphNode> = nodes.into_iter().map(GraphNode::new).collect();
        let parameters = extract_parameters(&nodes);
        let triggers = extract_triggers(&nodes);

        tracing::debug!(
            "Parsed workflow: {} nodes, {} parameters, {} triggers",
            nodes.len(),
            parameters.len(),
            triggers.len()
        );

        Ok(ParsedWorkflow::new(nodes, connections, parameters, triggers))
    }
}

impl Default for WorkflowParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DOCUMENT_BYTES)
    }
}

fn extract_parameters(nodes: &[GraphNode]) -> Vec<ParameterDescriptor> {
    let mut parameters = Vec::new();

    for (position, node) in nodes.iter().enumerate() {
        let Some(params) = node.parameters() else {
            continue;
        };
        let node_id = node.id().unwrap_or_else(|| position.to_string());

        for (key, value) in params {
            let Some(text) = value.as_str() else {
                continue;
            };
            if !is_template(text) {
                continue;
            }

            parameters.push(ParameterDescriptor {
                name: variable_name(text),
                resolution_path: format!("nodes.{}.parameters.{}", node_id, key),
                default_value: text.to_string(),
                required: true,
            });
        }
    }

    parameters
}

fn extract_triggers(nodes: &[GraphNode]) -> Vec<TriggerNode> {
    nodes
        .iter()
        .filter_map(|node| {
            let node_type = node.node_type()?;
            is_trigger_type(node_type).then(|| TriggerNode {
                node_id: node.id(),
                node_type: node_type.to_string(),
                name: node.name().map(str::to_string),
            })
        })
        .collect()
}

/// Whether a string contains a template marker.
pub fn is_template(value: &str) -> bool {
    template_marker().is_match(value)
}

/// Parameter name for a templated value: the `$json` identifier when the
/// named form is present, otherwise the text with braces, `$`, `.` and
/// whitespace stripped.
pub fn variable_name(template: &str) -> String {
    match named_variable().captures(template) {
        Some(caps) => caps[1].to_string(),
        None => template
            .chars()
            .filter(|c| !matches!(c, '{' | '}' | '$' | '.') && !c.is_whitespace())
            .collect(),
    }
}

pub fn is_trigger_type(node_type: &str) -> bool {
    TRIGGER_MARKERS.iter().any(|marker| node_type.contains(marker))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
