//! Discovery and dry-run helpers named in coaching messages.

use async_trait::async_trait;
use dokploy_core::{ExecutionError, ToolResponse};
use serde_json::{Map, Value, json};

use crate::coaching::{DISCOVERY_TOOL, DRY_RUN_TOOL};
use crate::invocation::ToolContext;
use crate::schema::{FieldKind, FieldSpec, InputSchema, render_issues};

use super::{ToolAnnotations, ToolDefinition, ToolOperation};

pub fn tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            DISCOVERY_TOOL,
            "Lists the available tools, or shows a working example payload and the required \
             parameters for one tool.",
            ToolAnnotations::new("Tool Examples").read_only().closed_world(),
            InputSchema::new(vec![
                FieldSpec::string("tool", "Tool to show an example for. Omit to list tools.")
                    .optional(),
            ]),
            ToolExamples,
        ),
        ToolDefinition::new(
            DRY_RUN_TOOL,
            "Checks parameters against a tool's input schema without executing the tool.",
            ToolAnnotations::new("Validate Tool Call").read_only().closed_world(),
            InputSchema::new(vec![
                FieldSpec::non_empty("tool", "Name of the tool to validate against."),
                FieldSpec::record("params", "Parameters to validate.")
                    .with_default(json!({})),
            ]),
            ValidateCall,
        ),
    ]
}

struct ToolExamples;

#[async_trait]
impl ToolOperation for ToolExamples {
    async fn call(
        &self,
        context: &ToolContext,
        input: Map<String, Value>,
    ) -> Result<ToolResponse, ExecutionError> {
        let registry = context.invoker.registry();
        let Some(tool_name) = input.get("tool").and_then(Value::as_str) else {
            let listing: Vec<Value> = registry
                .iter()
                .map(|tool| {
                    json!({
                        "name": tool.name,
                        "description": tool.description,
                        "requiredParameters": tool.schema.required_fields().collect::<Vec<_>>(),
                    })
                })
                .collect();
            return Ok(ToolResponse::success(
                format!("{} tools available", listing.len()),
                Value::Array(listing),
            ));
        };

        let Some(tool) = registry.get(tool_name) else {
            return Ok(unknown_tool(tool_name));
        };
        let example = context
            .invoker
            .coach()
            .examples()
            .get(tool_name)
            .cloned()
            .unwrap_or_else(|| placeholder_example(&tool.schema));
        Ok(ToolResponse::success(
            format!("Example call for {tool_name}"),
            json!({
                "tool": tool.name,
                "description": tool.description,
                "requiredParameters": tool.schema.required_fields().collect::<Vec<_>>(),
                "example": example,
            }),
        ))
    }
}

struct ValidateCall;

#[async_trait]
impl ToolOperation for ValidateCall {
    async fn call(
        &self,
        context: &ToolContext,
        input: Map<String, Value>,
    ) -> Result<ToolResponse, ExecutionError> {
        let tool_name = input.get("tool").and_then(Value::as_str).unwrap_or_default();
        let Some(tool) = context.invoker.registry().get(tool_name) else {
            return Ok(unknown_tool(tool_name));
        };
        let params = input.get("params").cloned().unwrap_or_else(|| json!({}));
        match tool.schema.validate(&params) {
            Ok(validated) => Ok(ToolResponse::success(
                format!("Parameters for {tool_name} are valid"),
                json!({ "tool": tool_name, "params": validated }),
            )),
            Err(issues) => {
                let required = tool.schema.required_fields().collect::<Vec<_>>().join(", ");
                Ok(ToolResponse::error(
                    format!("Parameters for {tool_name} are invalid"),
                    format!("{}\n\nRequired parameters: {required}", render_issues(&issues)),
                ))
            }
        }
    }
}

fn unknown_tool(tool_name: &str) -> ToolResponse {
    ToolResponse::error(
        "Unknown tool",
        format!("No tool named \"{tool_name}\". Call {DISCOVERY_TOOL} {{}} to list available tools."),
    )
}

/// Required fields filled with type-shaped placeholders.
fn placeholder_example(schema: &InputSchema) -> Value {
    let example: Map<String, Value> = schema
        .fields()
        .iter()
        .filter(|field| field.required)
        .map(|field| {
            let value = match &field.kind {
                FieldKind::String { .. } => json!(format!("<{}>", field.name)),
                FieldKind::Enum(values) => json!(values.first().copied().unwrap_or_default()),
                FieldKind::Number => json!(0),
                FieldKind::Boolean => json!(false),
                FieldKind::Record => json!({}),
            };
            (field.name.to_string(), value)
        })
        .collect();
    Value::Object(example)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::InvocationOutcome;
    use crate::testing::{RecordingBackend, invoker_with};

    #[tokio::test]
    async fn discovery_lists_every_registered_tool() {
        let (invoker, _) = invoker_with(RecordingBackend::default());
        let invocation = invoker.invoke(DISCOVERY_TOOL, json!({})).await.unwrap();
        let listing = invocation.response.data().unwrap().as_array().unwrap().clone();
        assert_eq!(listing.len(), invoker.registry().len());
        assert!(listing.iter().any(|entry| entry["name"] == DRY_RUN_TOOL));
    }

    #[tokio::test]
    async fn discovery_prefers_catalog_examples() {
        let (invoker, _) = invoker_with(RecordingBackend::default());
        let invocation = invoker
            .invoke(DISCOVERY_TOOL, json!({"tool": "compose-create"}))
            .await
            .unwrap();
        let data = invocation.response.data().unwrap();
        assert_eq!(data["example"], json!({"name": "my-stack", "projectId": "abc123xyz"}));
        assert_eq!(data["requiredParameters"], json!(["name", "projectId"]));

        let invocation = invoker
            .invoke(DISCOVERY_TOOL, json!({"tool": "mysql-changeStatus"}))
            .await
            .unwrap();
        assert_eq!(
            invocation.response.data().unwrap()["example"],
            json!({"mysqlId": "<mysqlId>", "applicationStatus": "idle"})
        );
    }

    #[tokio::test]
    async fn dry_run_never_records_attempts_or_calls_the_api() {
        let (invoker, backend) = invoker_with(RecordingBackend::default());
        let invalid = invoker
            .invoke(DRY_RUN_TOOL, json!({"tool": "project-create", "params": {}}))
            .await
            .unwrap();
        assert_eq!(invalid.outcome, InvocationOutcome::Succeeded);
        let body = invalid.response.error_body().unwrap();
        assert_eq!(body.title, "Parameters for project-create are invalid");
        assert!(body.detail.ends_with("Required parameters: name"));

        let valid = invoker
            .invoke(DRY_RUN_TOOL, json!({"tool": "project-create", "params": {"name": "x"}}))
            .await
            .unwrap();
        assert_eq!(valid.response.data().unwrap()["params"], json!({"name": "x"}));

        assert!(invoker.coach().store().is_empty());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_tools_point_back_to_discovery() {
        let (invoker, _) = invoker_with(RecordingBackend::default());
        let invocation = invoker
            .invoke(DRY_RUN_TOOL, json!({"tool": "nope"}))
            .await
            .unwrap();
        let body = invocation.response.error_body().unwrap();
        assert_eq!(body.title, "Unknown tool");
        assert!(body.detail.contains("tool-examples {}"));
    }
}
