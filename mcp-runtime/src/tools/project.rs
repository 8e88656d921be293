use crate::schema::{FieldSpec, InputSchema};

use super::{Forward, ToolAnnotations, ToolDefinition};

pub fn tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "project-all",
            "Lists all projects in Dokploy.",
            ToolAnnotations::new("List All Projects").read_only(),
            InputSchema::empty(),
            Forward::get("/project.all", "Successfully fetched all projects"),
        ),
        ToolDefinition::new(
            "project-one",
            "Gets a specific project by its ID in Dokploy.",
            ToolAnnotations::new("Get Project Details").read_only(),
            InputSchema::new(vec![FieldSpec::non_empty(
                "projectId",
                "The ID of the project to retrieve.",
            )]),
            Forward::fetch_one("/project.one", "projectId", "project"),
        ),
        ToolDefinition::new(
            "project-create",
            "Creates a new project in Dokploy.",
            ToolAnnotations::new("Create Project"),
            InputSchema::new(vec![
                FieldSpec::non_empty("name", "The name of the project."),
                FieldSpec::string("description", "An optional description for the project.")
                    .nullable(),
                FieldSpec::string("env", "Optional environment variables for the project.")
                    .optional(),
            ]),
            Forward::post("/project.create", "Project \"{name}\" created successfully"),
        ),
        ToolDefinition::new(
            "project-update",
            "Updates an existing project in Dokploy.",
            ToolAnnotations::new("Update Project").idempotent(),
            InputSchema::new(vec![
                FieldSpec::non_empty("projectId", "The ID of the project to update."),
                FieldSpec::non_empty("name", "The new name of the project.").optional(),
                FieldSpec::string("description", "The new description for the project.")
                    .nullable(),
                FieldSpec::string("env", "Environment variables for the project.").optional(),
            ]),
            Forward::post("/project.update", "Project \"{projectId}\" updated successfully"),
        ),
        ToolDefinition::new(
            "project-remove",
            "Removes/deletes an existing project in Dokploy.",
            ToolAnnotations::new("Remove Project").destructive(),
            InputSchema::new(vec![FieldSpec::non_empty(
                "projectId",
                "The ID of the project to remove.",
            )]),
            Forward::post("/project.remove", "Project \"{projectId}\" removed successfully"),
        ),
    ]
}
