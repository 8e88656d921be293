use serde_json::json;

use crate::schema::{FieldSpec, InputSchema};

use super::{Forward, ToolAnnotations, ToolDefinition};

const COMPOSE_TYPES: &[&str] = &["docker-compose", "stack"];
const COMPOSE_STATUSES: &[&str] = &["idle", "running", "done", "error"];

fn compose_id(purpose: &'static str) -> FieldSpec {
    FieldSpec::string("composeId", purpose)
}

pub fn tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "compose-create",
            "Creates a new compose service in Dokploy.",
            ToolAnnotations::new("Create Compose Service"),
            InputSchema::new(vec![
                FieldSpec::non_empty("name", "The name of the compose service."),
                FieldSpec::string("appName", "The app name for the compose service.").optional(),
                FieldSpec::string("description", "An optional description for the compose service.")
                    .nullable(),
                FieldSpec::non_empty(
                    "projectId",
                    "The ID of the project where the compose service will be created.",
                ),
                FieldSpec::string(
                    "serverId",
                    "The ID of the server where the compose service will be deployed.",
                )
                .nullable(),
                FieldSpec::string("composeFile", "The docker-compose.yml content.").optional(),
                FieldSpec::string("env", "Environment variables for the compose service.")
                    .nullable(),
                FieldSpec::one_of(
                    "composeType",
                    COMPOSE_TYPES,
                    "The type of compose deployment.",
                )
                .with_default(json!("docker-compose")),
            ]),
            Forward::post(
                "/compose.create",
                "Compose service \"{name}\" created successfully in project \"{projectId}\"",
            ),
        ),
        ToolDefinition::new(
            "compose-one",
            "Gets a specific compose service by its ID in Dokploy.",
            ToolAnnotations::new("Get Compose Service Details").read_only(),
            InputSchema::new(vec![compose_id("The ID of the compose service to retrieve.")]),
            Forward::fetch_one("/compose.one", "composeId", "compose service"),
        ),
        ToolDefinition::new(
            "compose-update",
            "Updates an existing compose service in Dokploy.",
            ToolAnnotations::new("Update Compose Service").idempotent(),
            InputSchema::new(vec![
                compose_id("The ID of the compose service to update."),
                FieldSpec::non_empty("name", "The new name of the compose service.").optional(),
                FieldSpec::string("appName", "The new app name of the compose service.")
                    .optional(),
                FieldSpec::string("description", "The new description for the compose service.")
                    .nullable(),
                FieldSpec::string("env", "Environment variables for the compose service.")
                    .nullable(),
                FieldSpec::string("composeFile", "The updated docker-compose.yml content.")
                    .nullable(),
                FieldSpec::string("composePath", "The path to the compose file.").optional(),
                FieldSpec::one_of(
                    "composeStatus",
                    COMPOSE_STATUSES,
                    "The status of the compose service.",
                )
                .optional(),
                FieldSpec::string("projectId", "The project ID if moving to different project.")
                    .optional(),
                FieldSpec::string("serverId", "The server ID for the compose service.")
                    .nullable(),
            ]),
            Forward::post(
                "/compose.update",
                "Compose service \"{composeId}\" updated successfully",
            ),
        ),
        ToolDefinition::new(
            "compose-deploy",
            "Deploys a compose service in Dokploy.",
            ToolAnnotations::new("Deploy Compose Service"),
            InputSchema::new(vec![compose_id("The ID of the compose service to deploy.")]),
            Forward::post(
                "/compose.deploy",
                "Compose service \"{composeId}\" deployment started successfully",
            ),
        ),
        ToolDefinition::new(
            "compose-start",
            "Starts a compose service in Dokploy.",
            ToolAnnotations::new("Start Compose Service"),
            InputSchema::new(vec![compose_id("The ID of the compose service to start.")]),
            Forward::post(
                "/compose.start",
                "Compose service \"{composeId}\" started successfully",
            ),
        ),
        ToolDefinition::new(
            "compose-stop",
            "Stops a compose service in Dokploy.",
            ToolAnnotations::new("Stop Compose Service").idempotent(),
            InputSchema::new(vec![compose_id("The ID of the compose service to stop.")]),
            Forward::post(
                "/compose.stop",
                "Compose service \"{composeId}\" stopped successfully",
            ),
        ),
        ToolDefinition::new(
            "compose-reload",
            "Reloads a compose service in Dokploy.",
            ToolAnnotations::new("Reload Compose Service"),
            InputSchema::new(vec![
                compose_id("The ID of the compose service to reload."),
                FieldSpec::string("appName", "The app name of the compose service to reload."),
            ]),
            Forward::post(
                "/compose.reload",
                "Compose service \"{composeId}\" reloaded successfully",
            ),
        ),
        ToolDefinition::new(
            "compose-remove",
            "Removes/deletes a compose service from Dokploy.",
            ToolAnnotations::new("Remove Compose Service").destructive(),
            InputSchema::new(vec![compose_id("The ID of the compose service to remove.")]),
            Forward::post(
                "/compose.remove",
                "Compose service \"{composeId}\" removed successfully",
            ),
        ),
        ToolDefinition::new(
            "compose-saveEnvironment",
            "Saves environment variables for a compose service in Dokploy.",
            ToolAnnotations::new("Save Compose Environment Variables")
                .idempotent()
                .closed_world(),
            InputSchema::new(vec![
                compose_id("The ID of the compose service to save environment for."),
                FieldSpec::string(
                    "env",
                    "Environment variables to save for the compose service.",
                )
                .nullable(),
            ]),
            Forward::post(
                "/compose.saveEnvironment",
                "Environment variables saved for compose service \"{composeId}\"",
            ),
        ),
    ]
}
