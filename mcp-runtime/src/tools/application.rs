use crate::schema::{FieldSpec, InputSchema};

use super::{Forward, ToolAnnotations, ToolDefinition};

fn application_id(purpose: &'static str) -> FieldSpec {
    FieldSpec::non_empty("applicationId", purpose)
}

/// Lifecycle actions that take only the application id.
const LIFECYCLE: [(&str, &str, &str, &str, &str); 4] = [
    (
        "deploy",
        "Deploys an application in Dokploy.",
        "Deploy Application",
        "The ID of the application to deploy.",
        "Application \"{applicationId}\" deployment started successfully",
    ),
    (
        "redeploy",
        "Redeploys an application in Dokploy.",
        "Redeploy Application",
        "The ID of the application to redeploy.",
        "Application \"{applicationId}\" redeployment started successfully",
    ),
    (
        "start",
        "Starts an application in Dokploy.",
        "Start Application",
        "The ID of the application to start.",
        "Application \"{applicationId}\" started successfully",
    ),
    (
        "stop",
        "Stops an application in Dokploy.",
        "Stop Application",
        "The ID of the application to stop.",
        "Application \"{applicationId}\" stopped successfully",
    ),
];

pub fn tools() -> Vec<ToolDefinition> {
    let mut tools = vec![
        ToolDefinition::new(
            "application-create",
            "Creates a new application in Dokploy.",
            ToolAnnotations::new("Create Application"),
            InputSchema::new(vec![
                FieldSpec::non_empty("name", "The name of the application."),
                FieldSpec::string("appName", "The app name for the application.").optional(),
                FieldSpec::string("description", "An optional description for the application.")
                    .nullable(),
                FieldSpec::non_empty(
                    "projectId",
                    "The ID of the project where the application will be created.",
                ),
                FieldSpec::string(
                    "serverId",
                    "The ID of the server where the application will be deployed.",
                )
                .nullable(),
            ]),
            Forward::post(
                "/application.create",
                "Application \"{name}\" created successfully in project \"{projectId}\"",
            ),
        ),
        ToolDefinition::new(
            "application-one",
            "Gets a specific application by its ID in Dokploy.",
            ToolAnnotations::new("Get Application Details").read_only(),
            InputSchema::new(vec![application_id("The ID of the application to retrieve.")]),
            Forward::fetch_one("/application.one", "applicationId", "application"),
        ),
    ];

    for (action, description, title, purpose, success) in LIFECYCLE {
        let mut annotations = ToolAnnotations::new(title);
        if action == "stop" {
            annotations = annotations.idempotent();
        }
        tools.push(ToolDefinition::new(
            format!("application-{action}"),
            description,
            annotations,
            InputSchema::new(vec![application_id(purpose)]),
            Forward::post(format!("/application.{action}"), success),
        ));
    }

    tools.extend([
        ToolDefinition::new(
            "application-reload",
            "Reloads an application in Dokploy.",
            ToolAnnotations::new("Reload Application"),
            InputSchema::new(vec![
                application_id("The ID of the application to reload."),
                FieldSpec::non_empty("appName", "The app name of the application to reload."),
            ]),
            Forward::post(
                "/application.reload",
                "Application \"{applicationId}\" reloaded successfully",
            ),
        ),
        ToolDefinition::new(
            "application-remove",
            "Removes/deletes an application from Dokploy.",
            ToolAnnotations::new("Remove Application").destructive(),
            InputSchema::new(vec![application_id("The ID of the application to remove.")]),
            Forward::post(
                "/application.remove",
                "Application \"{applicationId}\" removed successfully",
            ),
        ),
        ToolDefinition::new(
            "application-saveEnvironment",
            "Saves environment variables for an application in Dokploy.",
            ToolAnnotations::new("Save Application Environment Variables")
                .idempotent()
                .closed_world(),
            InputSchema::new(vec![
                application_id("The ID of the application to save environment for."),
                FieldSpec::string("env", "Environment variables to save.").nullable(),
                FieldSpec::string("buildArgs", "Build arguments to save.").nullable(),
            ]),
            Forward::post(
                "/application.saveEnvironment",
                "Environment variables saved for application \"{applicationId}\"",
            ),
        ),
    ]);
    tools
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::invocation::InvocationOutcome;
    use crate::testing::{RecordingBackend, invoker_with};
    use dokploy_core::FailureKind;

    #[tokio::test]
    async fn lifecycle_tools_post_to_their_procedures() {
        let (invoker, backend) = invoker_with(RecordingBackend::default());
        for action in ["deploy", "redeploy", "start", "stop", "remove"] {
            let invocation = invoker
                .invoke(&format!("application-{action}"), json!({"applicationId": "a1"}))
                .await
                .unwrap();
            assert_eq!(invocation.outcome, InvocationOutcome::Succeeded);
        }
        let endpoints: Vec<String> = backend.calls().into_iter().map(|c| c.endpoint).collect();
        assert_eq!(
            endpoints,
            vec![
                "/application.deploy",
                "/application.redeploy",
                "/application.start",
                "/application.stop",
                "/application.remove",
            ]
        );
    }

    #[tokio::test]
    async fn api_status_drives_failure_classification() {
        let backend = RecordingBackend::default().fail("/application.deploy", 404, "Application not found");
        let (invoker, _) = invoker_with(backend);
        let invocation = invoker
            .invoke("application-deploy", json!({"applicationId": "missing"}))
            .await
            .unwrap();
        assert_eq!(
            invocation.outcome,
            InvocationOutcome::ExecutionFailed(FailureKind::NotFound)
        );
        assert_eq!(
            invocation.response.error_body().unwrap().detail,
            "The requested resource for application-deploy could not be found"
        );
    }

    #[tokio::test]
    async fn reload_requires_the_app_name() {
        let (invoker, backend) = invoker_with(RecordingBackend::default());
        let invocation = invoker
            .invoke("application-reload", json!({"applicationId": "a1"}))
            .await
            .unwrap();
        assert!(invocation.response.error_body().unwrap().detail.contains("parameter \"appName\": required"));
        assert!(backend.calls().is_empty());
    }
}
