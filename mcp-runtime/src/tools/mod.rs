//! Tool catalog: definitions, the operations behind them, and the registry
//! advertised on `tools/list`.

pub mod application;
pub mod compose;
pub mod database;
pub mod helpers;
pub mod project;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dokploy_core::{ExecutionError, ToolResponse};
use serde_json::{Map, Value, json};

use crate::invocation::ToolContext;
use crate::schema::InputSchema;

/// Behavior hints advertised to clients alongside each tool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolAnnotations {
    pub title: String,
    pub read_only: bool,
    pub destructive: bool,
    pub idempotent: bool,
    pub open_world: bool,
}

impl ToolAnnotations {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            read_only: false,
            destructive: false,
            idempotent: false,
            open_world: true,
        }
    }

    /// Read-only tools are idempotent as well.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self.idempotent = true;
        self
    }

    pub fn destructive(mut self) -> Self {
        self.destructive = true;
        self
    }

    pub fn idempotent(mut self) -> Self {
        self.idempotent = true;
        self
    }

    pub fn closed_world(mut self) -> Self {
        self.open_world = false;
        self
    }

    pub fn to_value(&self) -> Value {
        json!({
            "title": self.title,
            "readOnlyHint": self.read_only,
            "destructiveHint": self.destructive,
            "idempotentHint": self.idempotent,
            "openWorldHint": self.open_world,
        })
    }
}

/// Executes a tool against already-validated input.
#[async_trait]
pub trait ToolOperation: Send + Sync {
    async fn call(
        &self,
        context: &ToolContext,
        input: Map<String, Value>,
    ) -> Result<ToolResponse, ExecutionError>;
}

#[derive(Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub schema: InputSchema,
    pub annotations: ToolAnnotations,
    pub operation: Arc<dyn ToolOperation>,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        annotations: ToolAnnotations,
        schema: InputSchema,
        operation: impl ToolOperation + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            annotations,
            operation: Arc::new(operation),
        }
    }

    /// Entry for the `tools/list` result.
    pub fn to_listing(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.schema.to_json_schema(),
            "annotations": self.annotations.to_value(),
        })
    }
}

/// Registered tools in registration order, with a name index.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// The first definition wins when names collide.
    pub fn new(definitions: Vec<ToolDefinition>) -> Self {
        let mut registry = Self::default();
        for definition in definitions {
            if registry.index.contains_key(&definition.name) {
                tracing::warn!(tool = %definition.name, "duplicate tool name ignored");
                continue;
            }
            registry
                .index
                .insert(definition.name.clone(), registry.tools.len());
            registry.tools.push(definition);
        }
        registry
    }

    /// Every Dokploy tool plus the discovery and dry-run helpers.
    pub fn builtin() -> Self {
        let mut definitions = project::tools();
        definitions.extend(application::tools());
        definitions.extend(compose::tools());
        definitions.extend(database::tools());
        definitions.extend(helpers::tools());
        Self::new(definitions)
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.index.get(name).map(|&position| &self.tools[position])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Plain pass-through to one API procedure.
pub(crate) enum Forward {
    /// GET with the validated input as query parameters.
    Get { endpoint: String, success: String },
    /// POST with the validated input as JSON body.
    Post { endpoint: String, success: String },
    /// GET by id; a `null` body is reported as a fetch failure.
    FetchOne {
        endpoint: String,
        id_field: &'static str,
        subject: String,
    },
}

impl Forward {
    pub(crate) fn get(endpoint: impl Into<String>, success: impl Into<String>) -> Self {
        Forward::Get {
            endpoint: endpoint.into(),
            success: success.into(),
        }
    }

    pub(crate) fn post(endpoint: impl Into<String>, success: impl Into<String>) -> Self {
        Forward::Post {
            endpoint: endpoint.into(),
            success: success.into(),
        }
    }

    pub(crate) fn fetch_one(
        endpoint: impl Into<String>,
        id_field: &'static str,
        subject: impl Into<String>,
    ) -> Self {
        Forward::FetchOne {
            endpoint: endpoint.into(),
            id_field,
            subject: subject.into(),
        }
    }
}

#[async_trait]
impl ToolOperation for Forward {
    async fn call(
        &self,
        context: &ToolContext,
        input: Map<String, Value>,
    ) -> Result<ToolResponse, ExecutionError> {
        match self {
            Forward::Get { endpoint, success } => {
                let query = query_pairs(&input);
                let data = context.backend.get(endpoint, &query).await?;
                Ok(ToolResponse::success(fill_template(success, &input), data))
            }
            Forward::Post { endpoint, success } => {
                let message = fill_template(success, &input);
                let data = context.backend.post(endpoint, Value::Object(input)).await?;
                Ok(ToolResponse::success(message, data))
            }
            Forward::FetchOne {
                endpoint,
                id_field,
                subject,
            } => {
                let id = input
                    .get(*id_field)
                    .map(display_value)
                    .unwrap_or_default();
                let data = context
                    .backend
                    .get(endpoint, &[(*id_field, id.clone())])
                    .await?;
                if data.is_null() {
                    return Ok(ToolResponse::error(
                        format!("Failed to fetch {subject}"),
                        format!("{} with ID \"{id}\" not found", capitalize(subject)),
                    ));
                }
                Ok(ToolResponse::success(
                    format!("Successfully fetched {subject} \"{id}\""),
                    data,
                ))
            }
        }
    }
}

fn query_pairs(input: &Map<String, Value>) -> Vec<(&str, String)> {
    input
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| (key.as_str(), display_value(value)))
        .collect()
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Substitutes `{field}` placeholders with input values. Absent fields
/// render as empty text.
pub(crate) fn fill_template(template: &str, input: &Map<String, Value>) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                if let Some(value) = input.get(key).filter(|value| !value.is_null()) {
                    rendered.push_str(&display_value(value));
                }
                rest = &after[close + 1..];
            }
            None => {
                rendered.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    rendered.push_str(rest);
    rendered
}
