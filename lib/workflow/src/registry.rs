//! Node-type registry.
//!
//! The registry maps a node `type` string to its display name, default ports,
//! default parameters, and the generator for its simulated output. The graph
//! model and the execution simulator depend only on [`NodeTypeRegistry`];
//! nothing else in the core hard-codes type-specific behavior.

use crate::node::{Node, Point};
use crate::port::Port;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};
use std::fmt;
use std::sync::Arc;

/// Generates the mock output of a node during simulated execution.
///
/// Generators must be deterministic for a given node (type + parameters).
pub type MockOutputFn = Arc<dyn Fn(&Node) -> JsonValue + Send + Sync>;

/// Palette grouping of a node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    /// Entry points that start a workflow.
    Trigger,
    /// Generic actions (HTTP, code).
    Action,
    /// External service integrations (Gmail, Jira).
    Integration,
    /// Flow control (branching, merging).
    Logic,
    /// Language-model steps.
    Ai,
}

/// Everything the core needs to know about one node type.
#[derive(Clone)]
pub struct NodeTypeDefinition {
    /// The type string stored on nodes.
    pub node_type: String,
    /// Name shown in the palette and used as the initial node name.
    pub display_name: String,
    /// Palette grouping.
    pub category: NodeCategory,
    /// Input ports given to new nodes of this type.
    pub default_inputs: Vec<Port>,
    /// Output ports given to new nodes of this type.
    pub default_outputs: Vec<Port>,
    /// Parameters given to new nodes of this type.
    pub default_parameters: Map<String, JsonValue>,
    mock_output: MockOutputFn,
}

impl NodeTypeDefinition {
    /// Creates a definition with no ports and a `null` mock output.
    #[must_use]
    pub fn new(
        node_type: impl Into<String>,
        display_name: impl Into<String>,
        category: NodeCategory,
    ) -> Self {
        Self {
            node_type: node_type.into(),
            display_name: display_name.into(),
            category,
            default_inputs: Vec::new(),
            default_outputs: Vec::new(),
            default_parameters: Map::new(),
            mock_output: Arc::new(|_| JsonValue::Null),
        }
    }

    /// Sets the default input ports.
    #[must_use]
    pub fn with_inputs(mut self, inputs: Vec<Port>) -> Self {
        self.default_inputs = inputs;
        self
    }

    /// Sets the default output ports.
    #[must_use]
    pub fn with_outputs(mut self, outputs: Vec<Port>) -> Self {
        self.default_outputs = outputs;
        self
    }

    /// Adds a default parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.default_parameters.insert(key.into(), value);
        self
    }

    /// Sets the mock output generator.
    #[must_use]
    pub fn with_mock_output<F>(mut self, generator: F) -> Self
    where
        F: Fn(&Node) -> JsonValue + Send + Sync + 'static,
    {
        self.mock_output = Arc::new(generator);
        self
    }

    /// Produces the simulated output for `node`.
    #[must_use]
    pub fn mock_output(&self, node: &Node) -> JsonValue {
        (self.mock_output)(node)
    }

    /// Returns true if nodes of this type have no inputs.
    #[must_use]
    pub fn is_trigger(&self) -> bool {
        self.default_inputs.is_empty()
    }

    /// Creates a new node of this type at `position`.
    #[must_use]
    pub fn instantiate(&self, position: Point) -> Node {
        let mut node = Node::new(
            self.node_type.clone(),
            self.display_name.clone(),
            position,
            self.default_inputs.clone(),
            self.default_outputs.clone(),
        );
        node.parameters = self.default_parameters.clone();
        node
    }
}

impl fmt::Debug for NodeTypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeTypeDefinition")
            .field("node_type", &self.node_type)
            .field("display_name", &self.display_name)
            .field("category", &self.category)
            .field("default_inputs", &self.default_inputs)
            .field("default_outputs", &self.default_outputs)
            .finish_non_exhaustive()
    }
}

/// Lookup of node types by their type string.
pub trait NodeTypeRegistry: Send + Sync {
    /// Returns the definition for `node_type`, if registered.
    fn definition(&self, node_type: &str) -> Option<&NodeTypeDefinition>;

    /// Returns every registered definition in palette order.
    fn definitions(&self) -> Vec<&NodeTypeDefinition>;
}

/// In-process registry, preloaded with the built-in node types by default.
#[derive(Debug, Clone)]
pub struct BuiltinNodeTypes {
    definitions: Vec<NodeTypeDefinition>,
}

impl BuiltinNodeTypes {
    /// Creates an empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            definitions: Vec::new(),
        }
    }

    /// Creates a registry with every built-in node type.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for definition in builtin_definitions() {
            registry.register(definition);
        }
        registry
    }

    /// Adds a definition, replacing any existing one with the same type.
    pub fn register(&mut self, definition: NodeTypeDefinition) {
        if let Some(existing) = self
            .definitions
            .iter_mut()
            .find(|d| d.node_type == definition.node_type)
        {
            *existing = definition;
        } else {
            self.definitions.push(definition);
        }
    }
}

impl Default for BuiltinNodeTypes {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl NodeTypeRegistry for BuiltinNodeTypes {
    fn definition(&self, node_type: &str) -> Option<&NodeTypeDefinition> {
        self.definitions.iter().find(|d| d.node_type == node_type)
    }

    fn definitions(&self) -> Vec<&NodeTypeDefinition> {
        self.definitions.iter().collect()
    }
}

fn param(node: &Node, key: &str, default: JsonValue) -> JsonValue {
    node.parameters.get(key).cloned().unwrap_or(default)
}

fn trigger_output() -> Vec<Port> {
    vec![Port::trigger("trigger", "Trigger")]
}

fn data_in_out() -> (Vec<Port>, Vec<Port>) {
    (
        vec![Port::data("input", "Input").required()],
        vec![Port::data("output", "Output")],
    )
}

fn builtin_definitions() -> Vec<NodeTypeDefinition> {
    let (inputs, outputs) = data_in_out();

    vec![
        NodeTypeDefinition::new("webhook", "Webhook", NodeCategory::Trigger)
            .with_outputs(trigger_output())
            .with_parameter("method", json!("POST"))
            .with_parameter("path", json!("/webhook"))
            .with_mock_output(|node| {
                json!({
                    "method": param(node, "method", json!("POST")),
                    "path": param(node, "path", json!("/webhook")),
                    "headers": { "content-type": "application/json" },
                    "body": { "event": "test", "source": node.name },
                })
            }),
        NodeTypeDefinition::new("schedule", "Schedule Trigger", NodeCategory::Trigger)
            .with_outputs(trigger_output())
            .with_parameter("cron", json!("0 9 * * *"))
            .with_mock_output(|node| {
                json!({
                    "cron": param(node, "cron", json!("0 9 * * *")),
                    "scheduled": true,
                })
            }),
        NodeTypeDefinition::new("manual", "Manual Trigger", NodeCategory::Trigger)
            .with_outputs(trigger_output())
            .with_mock_output(|_| json!({ "triggeredBy": "user" })),
        NodeTypeDefinition::new("http", "HTTP Request", NodeCategory::Action)
            .with_inputs(inputs.clone())
            .with_outputs(outputs.clone())
            .with_parameter("method", json!("GET"))
            .with_parameter("url", json!("https://api.example.com/data"))
            .with_mock_output(|node| {
                json!({
                    "statusCode": 200,
                    "method": param(node, "method", json!("GET")),
                    "url": param(node, "url", json!("https://api.example.com/data")),
                    "body": { "ok": true, "items": [ { "id": 1 }, { "id": 2 } ] },
                })
            }),
        NodeTypeDefinition::new("code", "Code", NodeCategory::Action)
            .with_inputs(inputs.clone())
            .with_outputs(outputs.clone())
            .with_parameter("language", json!("javascript"))
            .with_parameter("code", json!("return items;"))
            .with_mock_output(|node| {
                json!({
                    "language": param(node, "language", json!("javascript")),
                    "result": "ok",
                    "itemsProcessed": 1,
                })
            }),
        NodeTypeDefinition::new("gmail", "Gmail", NodeCategory::Integration)
            .with_inputs(vec![Port::data("input", "Input")])
            .with_outputs(outputs.clone())
            .with_parameter("operation", json!("getAll"))
            .with_parameter("limit", json!(2))
            .with_mock_output(|node| {
                json!({
                    "operation": param(node, "operation", json!("getAll")),
                    "messages": [
                        { "id": "msg-1", "subject": "Weekly report", "from": "team@example.com" },
                        { "id": "msg-2", "subject": "Invoice", "from": "billing@example.com" },
                    ],
                    "count": 2,
                })
            }),
        NodeTypeDefinition::new("jira", "Jira", NodeCategory::Integration)
            .with_inputs(vec![Port::data("input", "Input")])
            .with_outputs(outputs.clone())
            .with_parameter("operation", json!("createIssue"))
            .with_parameter("project", json!("PROJ"))
            .with_mock_output(|node| {
                let project = node.parameter_str("project").unwrap_or("PROJ");
                json!({
                    "operation": param(node, "operation", json!("createIssue")),
                    "issueKey": format!("{project}-1"),
                    "status": "To Do",
                })
            }),
        NodeTypeDefinition::new("if", "If", NodeCategory::Logic)
            .with_inputs(inputs.clone())
            .with_outputs(vec![
                Port::condition("true", "True"),
                Port::condition("false", "False"),
            ])
            .with_parameter("condition", json!("{{ $json.ok }} == true"))
            .with_mock_output(|node| {
                json!({
                    "condition": param(node, "condition", JsonValue::Null),
                    "branch": "true",
                })
            }),
        NodeTypeDefinition::new("merge", "Merge", NodeCategory::Logic)
            .with_inputs(vec![
                Port::data("input1", "Input 1").required(),
                Port::data("input2", "Input 2"),
            ])
            .with_outputs(outputs.clone())
            .with_mock_output(|_| json!({ "merged": true, "sources": 2 })),
        NodeTypeDefinition::new("ai", "AI Agent", NodeCategory::Ai)
            .with_inputs(inputs)
            .with_outputs(outputs)
            .with_parameter("model", json!("gpt-4o-mini"))
            .with_parameter("prompt", json!("Summarize the input"))
            .with_mock_output(|node| {
                json!({
                    "model": param(node, "model", json!("gpt-4o-mini")),
                    "completion": format!("Summary produced by {}", node.name),
                    "tokens": 42,
                })
            }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered_in_palette_order() {
        let registry = BuiltinNodeTypes::with_builtins();
        let types: Vec<_> = registry
            .definitions()
            .iter()
            .map(|d| d.node_type.as_str())
            .collect();
        assert_eq!(
            types,
            vec![
                "webhook", "schedule", "manual", "http", "code", "gmail", "jira", "if", "merge",
                "ai"
            ]
        );
    }

    #[test]
    fn trigger_types_have_no_inputs() {
        let registry = BuiltinNodeTypes::default();
        for ty in ["webhook", "schedule", "manual"] {
            let def = registry.definition(ty).expect("registered");
            assert!(def.is_trigger(), "{ty} should be a trigger");
            assert_eq!(def.default_outputs[0].id, "trigger");
        }
    }

    #[test]
    fn builtin_port_ids_are_unique() {
        let registry = BuiltinNodeTypes::default();
        for def in registry.definitions() {
            let node = def.instantiate(Point::ZERO);
            assert_eq!(node.duplicate_port_id(), None, "{}", def.node_type);
        }
    }

    #[test]
    fn instantiate_copies_template() {
        let registry = BuiltinNodeTypes::default();
        let def = registry.definition("http").expect("registered");
        let node = def.instantiate(Point::new(5.0, 6.0));
        assert_eq!(node.node_type, "http");
        assert_eq!(node.name, "HTTP Request");
        assert_eq!(node.position, Point::new(5.0, 6.0));
        assert_eq!(node.parameter_str("method"), Some("GET"));
        assert_eq!(node.inputs, def.default_inputs);
    }

    #[test]
    fn mock_output_is_deterministic() {
        let registry = BuiltinNodeTypes::default();
        let def = registry.definition("jira").expect("registered");
        let mut node = def.instantiate(Point::ZERO);
        node.parameters.insert("project".into(), json!("OPS"));
        assert_eq!(def.mock_output(&node), def.mock_output(&node));
        assert_eq!(def.mock_output(&node)["issueKey"], "OPS-1");
    }

    #[test]
    fn register_replaces_existing_type() {
        let mut registry = BuiltinNodeTypes::with_builtins();
        let before = registry.definitions().len();
        registry.register(
            NodeTypeDefinition::new("http", "Custom HTTP", NodeCategory::Action)
                .with_mock_output(|_| json!("custom")),
        );
        assert_eq!(registry.definitions().len(), before);
        let def = registry.definition("http").expect("registered");
        assert_eq!(def.display_name, "Custom HTTP");
    }
}
