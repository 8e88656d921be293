//! The wrapper every tool call goes through: validate, coach on failure,
//! execute on success, classify execution failures.

use std::sync::Arc;

use dokploy_core::{ExecutionError, FailureKind, ToolResponse};
use serde_json::Value;

use crate::backend::DokployBackend;
use crate::coaching::{InvocationCoach, PatternLabel};
use crate::schema::render_issues;
use crate::tools::{ToolDefinition, ToolRegistry};

/// Terminal state of one invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum InvocationOutcome {
    ValidationFailed {
        attempt: u32,
        patterns: Vec<PatternLabel>,
        escalated: bool,
    },
    Succeeded,
    ExecutionFailed(FailureKind),
}

#[derive(Clone, Debug)]
pub struct Invocation {
    pub outcome: InvocationOutcome,
    pub response: ToolResponse,
}

/// What an operation sees while executing.
#[derive(Clone)]
pub struct ToolContext {
    pub backend: Arc<dyn DokployBackend>,
    pub invoker: ToolInvoker,
}

/// Shared entry point for tool calls. Cheap to clone.
#[derive(Clone)]
pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
    coach: InvocationCoach,
    backend: Arc<dyn DokployBackend>,
}

impl ToolInvoker {
    pub fn new(
        registry: Arc<ToolRegistry>,
        coach: InvocationCoach,
        backend: Arc<dyn DokployBackend>,
    ) -> Self {
        Self {
            registry,
            coach,
            backend,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn coach(&self) -> &InvocationCoach {
        &self.coach
    }

    /// `None` when no tool with that name is registered.
    pub async fn invoke(&self, tool_name: &str, input: Value) -> Option<Invocation> {
        let definition = self.registry.get(tool_name)?;
        Some(self.invoke_definition(definition, input).await)
    }

    pub async fn invoke_definition(&self, definition: &ToolDefinition, input: Value) -> Invocation {
        let data = match definition.schema.validate(&input) {
            Ok(data) => data,
            Err(issues) => {
                let validation_error = render_issues(&issues);
                let coached = self.coach.coach(&definition.name, &input, &validation_error);
                tracing::warn!(
                    tool = %definition.name,
                    attempt = coached.analysis.attempt,
                    patterns = ?coached.analysis.pattern_names(),
                    issues = %validation_error,
                    input = %input,
                    "input validation failed"
                );
                return Invocation {
                    outcome: InvocationOutcome::ValidationFailed {
                        attempt: coached.analysis.attempt,
                        patterns: coached.analysis.patterns.clone(),
                        escalated: coached.analysis.escalation_needed,
                    },
                    response: ToolResponse::error(
                        format!("Invalid input for tool: {}", definition.name),
                        coached.detail,
                    ),
                };
            }
        };

        tracing::info!(tool = %definition.name, "executing tool");
        let context = ToolContext {
            backend: self.backend.clone(),
            invoker: self.clone(),
        };
        match definition.operation.call(&context, data).await {
            Ok(response) => {
                tracing::info!(
                    tool = %definition.name,
                    is_error = response.is_error(),
                    "tool executed successfully"
                );
                Invocation {
                    outcome: InvocationOutcome::Succeeded,
                    response,
                }
            }
            Err(err) => {
                let kind = classify_failure(&err);
                tracing::error!(
                    tool = %definition.name,
                    kind = kind.as_str(),
                    error = %err,
                    input = %input,
                    "tool execution failed"
                );
                Invocation {
                    outcome: InvocationOutcome::ExecutionFailed(kind),
                    response: execution_failure_response(&definition.name, kind, &err),
                }
            }
        }
    }
}

/// Structured signals first; free text only when the backend gave none.
pub fn classify_failure(err: &ExecutionError) -> FailureKind {
    if let Some(kind) = err.status().and_then(FailureKind::from_status) {
        return kind;
    }
    match err {
        ExecutionError::MissingCredentials => FailureKind::Authentication,
        ExecutionError::Api { message, .. }
        | ExecutionError::Transport { message, .. }
        | ExecutionError::Decode(message)
        | ExecutionError::Other(message) => FailureKind::from_message(message),
    }
}

fn execution_failure_response(tool_name: &str, kind: FailureKind, err: &ExecutionError) -> ToolResponse {
    match kind {
        FailureKind::Authentication => ToolResponse::error(
            format!("Authentication failed for tool: {tool_name}"),
            "Please check your DOKPLOY_API_KEY configuration",
        ),
        FailureKind::NotFound => ToolResponse::error(
            "Resource not found",
            format!("The requested resource for {tool_name} could not be found"),
        ),
        FailureKind::Server => ToolResponse::error(
            "Server error occurred",
            format!("Dokploy server encountered an internal error while processing {tool_name}"),
        ),
        FailureKind::Unknown => ToolResponse::error(
            format!("Failed to execute tool: {tool_name}"),
            format!("Error: {err}"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{Map, json};

    use crate::coaching::{ATTEMPT_RESET_INTERVAL, spawn_reset_task};
    use crate::schema::{FieldSpec, InputSchema};
    use crate::testing::RecordingBackend;
    use crate::tools::{ToolAnnotations, ToolOperation};

    struct CountingOperation {
        calls: Arc<AtomicUsize>,
        failure: Option<fn() -> ExecutionError>,
    }

    #[async_trait]
    impl ToolOperation for CountingOperation {
        async fn call(
            &self,
            _context: &ToolContext,
            input: Map<String, Value>,
        ) -> Result<ToolResponse, ExecutionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.failure {
                Some(make) => Err(make()),
                None => Ok(ToolResponse::success("done", Value::Object(input))),
            }
        }
    }

    fn named_tool(calls: Arc<AtomicUsize>, failure: Option<fn() -> ExecutionError>) -> ToolDefinition {
        ToolDefinition {
            name: "project-create".to_string(),
            description: "Creates a project.".to_string(),
            schema: InputSchema::new(vec![
                FieldSpec::non_empty("name", "Project name."),
                FieldSpec::string("description", "Description.").nullable(),
            ]),
            annotations: ToolAnnotations::new("Create Project"),
            operation: Arc::new(CountingOperation { calls, failure }),
        }
    }

    fn invoker() -> ToolInvoker {
        ToolInvoker::new(
            Arc::new(ToolRegistry::new(Vec::new())),
            InvocationCoach::default(),
            Arc::new(RecordingBackend::default()),
        )
    }

    fn detail(invocation: &Invocation) -> &str {
        &invocation.response.error_body().expect("error body").detail
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_operation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let tool = named_tool(calls.clone(), None);
        let invoker = invoker();

        for input in [json!({}), json!({"name": 5}), Value::Null, json!("x(y)")] {
            let invocation = invoker.invoke_definition(&tool, input).await;
            assert!(matches!(
                invocation.outcome,
                InvocationOutcome::ValidationFailed { .. }
            ));
            assert_eq!(
                invocation.response.error_body().unwrap().title,
                "Invalid input for tool: project-create"
            );
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn valid_input_returns_the_operation_payload_unchanged() {
        let calls = Arc::new(AtomicUsize::new(0));
        let tool = named_tool(calls.clone(), None);
        let invocation = invoker()
            .invoke_definition(&tool, json!({"name": "web", "ignored": 1}))
            .await;
        assert_eq!(invocation.outcome, InvocationOutcome::Succeeded);
        assert_eq!(
            invocation.response,
            ToolResponse::success("done", json!({"name": "web"}))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn repeated_label_appears_from_the_third_identical_call() {
        let tool = named_tool(Arc::new(AtomicUsize::new(0)), None);
        let invoker = invoker();
        let input = json!({"name": 42});

        let first = invoker.invoke_definition(&tool, input.clone()).await;
        let second = invoker.invoke_definition(&tool, input.clone()).await;
        let third = invoker.invoke_definition(&tool, input.clone()).await;

        assert!(!detail(&first).contains("repeated_same_syntax"));
        assert!(!detail(&second).contains("repeated_same_syntax"));
        assert!(detail(&third).contains("repeated_same_syntax"));
        assert!(detail(&third).contains("Attempt #3"));
    }

    #[tokio::test]
    async fn empty_input_is_answered_with_a_corrected_example() {
        let tool = named_tool(Arc::new(AtomicUsize::new(0)), None);
        let invocation = invoker().invoke_definition(&tool, Value::Null).await;
        let text = detail(&invocation);
        assert!(text.contains("missing_required_params"));
        assert!(text.contains("<parameter name=\"name\">my-project</parameter>"));
        assert!(text.contains("Required parameters: name"));
    }

    #[tokio::test]
    async fn three_parameter_failures_escalate_to_guided_mode() {
        let tool = named_tool(Arc::new(AtomicUsize::new(0)), None);
        let invoker = invoker();
        let input = json!({"name": ""});

        invoker.invoke_definition(&tool, input.clone()).await;
        let second = invoker.invoke_definition(&tool, input.clone()).await;
        assert!(!detail(&second).contains("GUIDED MODE"));

        let third = invoker.invoke_definition(&tool, input).await;
        match &third.outcome {
            InvocationOutcome::ValidationFailed { escalated, .. } => assert!(escalated),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(detail(&third).contains("GUIDED MODE ACTIVATED"));
        assert!(detail(&third).contains("ignoring_error_messages"));
    }

    #[tokio::test]
    async fn end_to_end_empty_object_three_times() {
        let tool = named_tool(Arc::new(AtomicUsize::new(0)), None);
        let invoker = invoker();
        let mut last = None;
        for _ in 0..3 {
            last = Some(invoker.invoke_definition(&tool, json!({})).await);
        }
        let third = last.unwrap();
        let text = detail(&third);
        assert!(text.contains("AUTO-CORRECTION GENERATED"));
        assert!(text.contains("repeated_same_syntax"));
        assert!(text.contains("PATTERN DETECTED: 3 attempts"));
        assert!(text.contains("DRY RUN"));
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_restart_after_the_reset_interval() {
        let tool = named_tool(Arc::new(AtomicUsize::new(0)), None);
        let invoker = invoker();
        let _reset = spawn_reset_task(invoker.coach().store().clone(), ATTEMPT_RESET_INTERVAL);
        let input = json!({"name": 1});

        invoker.invoke_definition(&tool, input.clone()).await;
        let second = invoker.invoke_definition(&tool, input.clone()).await;
        assert!(matches!(
            second.outcome,
            InvocationOutcome::ValidationFailed { attempt: 2, .. }
        ));

        tokio::time::sleep(ATTEMPT_RESET_INTERVAL + Duration::from_secs(1)).await;

        let after = invoker.invoke_definition(&tool, input).await;
        assert!(matches!(
            after.outcome,
            InvocationOutcome::ValidationFailed { attempt: 1, .. }
        ));
        assert!(detail(&after).contains("HINT:"));
    }

    async fn failing_call(make: fn() -> ExecutionError) -> Invocation {
        let tool = named_tool(Arc::new(AtomicUsize::new(0)), Some(make));
        invoker().invoke_definition(&tool, json!({"name": "web"})).await
    }

    #[tokio::test]
    async fn execution_failures_are_classified_by_priority() {
        let auth = failing_call(|| ExecutionError::other("404 and 500 but also 401")).await;
        assert_eq!(
            auth.outcome,
            InvocationOutcome::ExecutionFailed(FailureKind::Authentication)
        );
        assert_eq!(
            auth.response.error_body().unwrap().detail,
            "Please check your DOKPLOY_API_KEY configuration"
        );

        let missing = failing_call(|| ExecutionError::other("got 404 after 500")).await;
        assert_eq!(
            missing.outcome,
            InvocationOutcome::ExecutionFailed(FailureKind::NotFound)
        );
        assert_eq!(missing.response.error_body().unwrap().title, "Resource not found");

        let server = failing_call(|| ExecutionError::other("status 500")).await;
        assert_eq!(
            server.outcome,
            InvocationOutcome::ExecutionFailed(FailureKind::Server)
        );
        assert_eq!(server.response.error_body().unwrap().title, "Server error occurred");

        let other = failing_call(|| ExecutionError::other("socket hang up")).await;
        assert_eq!(
            other.outcome,
            InvocationOutcome::ExecutionFailed(FailureKind::Unknown)
        );
        let body = other.response.error_body().unwrap();
        assert_eq!(body.title, "Failed to execute tool: project-create");
        assert_eq!(body.detail, "Error: socket hang up");
    }

    #[test]
    fn structured_status_wins_over_message_text() {
        let err = ExecutionError::Api {
            status: 404,
            message: "401 mentioned in body".to_string(),
        };
        assert_eq!(classify_failure(&err), FailureKind::NotFound);

        let err = ExecutionError::Api {
            status: 503,
            message: "upstream returned 404".to_string(),
        };
        assert_eq!(classify_failure(&err), FailureKind::Server);

        let err = ExecutionError::Api {
            status: 400,
            message: "Unauthorized".to_string(),
        };
        assert_eq!(classify_failure(&err), FailureKind::Authentication);

        assert_eq!(
            classify_failure(&ExecutionError::MissingCredentials),
            FailureKind::Authentication
        );
        let transport = ExecutionError::Transport {
            url: "http://host:5000/api".to_string(),
            message: "connection refused".to_string(),
        };
        assert_eq!(classify_failure(&transport), FailureKind::Unknown);
    }

    #[tokio::test]
    async fn unknown_tool_names_are_not_invoked() {
        assert!(invoker().invoke("nope", json!({})).await.is_none());
    }
}
