//! PostgreSQL and MySQL tools generated from one action table, plus the
//! consolidated `dokploy_database` dispatcher.

use async_trait::async_trait;
use dokploy_core::{ExecutionError, ToolResponse};
use serde_json::{Map, Value, json};

use crate::invocation::ToolContext;
use crate::schema::{FieldSpec, InputSchema};

use super::{Forward, ToolAnnotations, ToolDefinition, ToolOperation};

pub const DISPATCHER_TOOL: &str = "dokploy_database";

const APPLICATION_STATUSES: &[&str] = &["idle", "running", "done", "error"];
const DATABASE_TYPES: &[&str] = &["postgres", "mysql"];
const ACTION_NAMES: &[&str] = &[
    "create",
    "remove",
    "deploy",
    "start",
    "stop",
    "update",
    "get",
    "rebuild",
    "reload",
    "move",
    "changeStatus",
    "saveEnvironment",
    "saveExternalPort",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatabaseKind {
    Postgres,
    Mysql,
}

impl DatabaseKind {
    pub const ALL: [DatabaseKind; 2] = [DatabaseKind::Postgres, DatabaseKind::Mysql];

    pub fn as_str(self) -> &'static str {
        match self {
            DatabaseKind::Postgres => "postgres",
            DatabaseKind::Mysql => "mysql",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    fn label(self) -> &'static str {
        match self {
            DatabaseKind::Postgres => "PostgreSQL",
            DatabaseKind::Mysql => "MySQL",
        }
    }

    fn id_field(self) -> &'static str {
        match self {
            DatabaseKind::Postgres => "postgresId",
            DatabaseKind::Mysql => "mysqlId",
        }
    }

    fn default_image(self) -> &'static str {
        match self {
            DatabaseKind::Postgres => "postgres:15",
            DatabaseKind::Mysql => "mysql:8",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatabaseAction {
    Create,
    Remove,
    Deploy,
    Start,
    Stop,
    Update,
    Get,
    Rebuild,
    Reload,
    Move,
    ChangeStatus,
    SaveEnvironment,
    SaveExternalPort,
}

impl DatabaseAction {
    pub const ALL: [DatabaseAction; 13] = [
        DatabaseAction::Create,
        DatabaseAction::Remove,
        DatabaseAction::Deploy,
        DatabaseAction::Start,
        DatabaseAction::Stop,
        DatabaseAction::Update,
        DatabaseAction::Get,
        DatabaseAction::Rebuild,
        DatabaseAction::Reload,
        DatabaseAction::Move,
        DatabaseAction::ChangeStatus,
        DatabaseAction::SaveEnvironment,
        DatabaseAction::SaveExternalPort,
    ];

    /// Name accepted by the dispatcher's `action` parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            DatabaseAction::Get => "get",
            other => other.procedure(),
        }
    }

    /// API procedure suffix, also the per-database tool suffix.
    pub fn procedure(self) -> &'static str {
        match self {
            DatabaseAction::Create => "create",
            DatabaseAction::Remove => "remove",
            DatabaseAction::Deploy => "deploy",
            DatabaseAction::Start => "start",
            DatabaseAction::Stop => "stop",
            DatabaseAction::Update => "update",
            DatabaseAction::Get => "one",
            DatabaseAction::Rebuild => "rebuild",
            DatabaseAction::Reload => "reload",
            DatabaseAction::Move => "move",
            DatabaseAction::ChangeStatus => "changeStatus",
            DatabaseAction::SaveEnvironment => "saveEnvironment",
            DatabaseAction::SaveExternalPort => "saveExternalPort",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.as_str() == value)
    }
}

pub fn tool_name(kind: DatabaseKind, action: DatabaseAction) -> String {
    format!("{}-{}", kind.as_str(), action.procedure())
}

pub fn tools() -> Vec<ToolDefinition> {
    let mut tools = Vec::with_capacity(DatabaseKind::ALL.len() * DatabaseAction::ALL.len() + 1);
    for kind in DatabaseKind::ALL {
        for action in DatabaseAction::ALL {
            tools.push(definition(kind, action));
        }
    }
    tools.push(dispatcher());
    tools
}

fn definition(kind: DatabaseKind, action: DatabaseAction) -> ToolDefinition {
    let label = kind.label();
    let id = kind.id_field();
    let id_field = FieldSpec::non_empty(id, "The ID of the database.");
    let endpoint = format!("/{}.{}", kind.as_str(), action.procedure());
    let name = tool_name(kind, action);

    let (description, annotations, fields, operation) = match action {
        DatabaseAction::Create => {
            let mut fields = vec![
                FieldSpec::non_empty("name", "The name of the database service."),
                FieldSpec::non_empty("appName", "The app name for the database service."),
                FieldSpec::non_empty("databaseName", "The name of the database to create."),
                FieldSpec::non_empty("databaseUser", "The database user."),
                FieldSpec::non_empty("databasePassword", "The password for the database user."),
            ];
            if kind == DatabaseKind::Mysql {
                fields.push(FieldSpec::non_empty(
                    "databaseRootPassword",
                    "The password for the MySQL root user.",
                ));
            }
            fields.extend([
                FieldSpec::string("dockerImage", "The Docker image to run.")
                    .with_default(json!(kind.default_image())),
                FieldSpec::non_empty(
                    "projectId",
                    "The ID of the project where the database will be created.",
                ),
                FieldSpec::string("description", "An optional description for the database.")
                    .nullable(),
                FieldSpec::string("serverId", "The ID of the server to deploy on.").nullable(),
            ]);
            (
                format!("Creates a new {label} database in Dokploy."),
                ToolAnnotations::new(format!("Create {label} Database")),
                fields,
                Forward::post(
                    endpoint,
                    format!("{label} database \"{{name}}\" created successfully in project \"{{projectId}}\""),
                ),
            )
        }
        DatabaseAction::Remove => (
            format!("Removes/deletes a {label} database from Dokploy."),
            ToolAnnotations::new(format!("Remove {label} Database")).destructive(),
            vec![id_field],
            Forward::post(endpoint, format!("{label} database \"{{{id}}}\" removed successfully")),
        ),
        DatabaseAction::Deploy => (
            format!("Deploys a {label} database in Dokploy."),
            ToolAnnotations::new(format!("Deploy {label} Database")),
            vec![id_field],
            Forward::post(
                endpoint,
                format!("{label} database \"{{{id}}}\" deployment started successfully"),
            ),
        ),
        DatabaseAction::Start => (
            format!("Starts a {label} database in Dokploy."),
            ToolAnnotations::new(format!("Start {label} Database")),
            vec![id_field],
            Forward::post(endpoint, format!("{label} database \"{{{id}}}\" started successfully")),
        ),
        DatabaseAction::Stop => (
            format!("Stops a {label} database in Dokploy."),
            ToolAnnotations::new(format!("Stop {label} Database")).idempotent(),
            vec![id_field],
            Forward::post(endpoint, format!("{label} database \"{{{id}}}\" stopped successfully")),
        ),
        DatabaseAction::Update => (
            format!("Updates an existing {label} database in Dokploy."),
            ToolAnnotations::new(format!("Update {label} Database")).idempotent(),
            vec![
                id_field,
                FieldSpec::non_empty("name", "The new name of the database service.").optional(),
                FieldSpec::non_empty("appName", "The new app name.").optional(),
                FieldSpec::string("description", "The new description.").nullable(),
                FieldSpec::string("databaseName", "The database name.").optional(),
                FieldSpec::string("databaseUser", "The database user.").optional(),
                FieldSpec::string("databasePassword", "The database user password.").optional(),
                FieldSpec::string("dockerImage", "The Docker image to run.").optional(),
                FieldSpec::string("command", "Custom start command.").nullable(),
                FieldSpec::string("env", "Environment variables.").nullable(),
                FieldSpec::string("memoryReservation", "Memory reservation.").nullable(),
                FieldSpec::string("memoryLimit", "Memory limit.").nullable(),
                FieldSpec::string("cpuReservation", "CPU reservation.").nullable(),
                FieldSpec::string("cpuLimit", "CPU limit.").nullable(),
                FieldSpec::number("externalPort", "External port to expose.").nullable(),
                FieldSpec::one_of(
                    "applicationStatus",
                    APPLICATION_STATUSES,
                    "The status of the database service.",
                )
                .optional(),
            ],
            Forward::post(endpoint, format!("{label} database \"{{{id}}}\" updated successfully")),
        ),
        DatabaseAction::Get => (
            format!("Gets a specific {label} database by its ID in Dokploy."),
            ToolAnnotations::new(format!("Get {label} Database Details")).read_only(),
            vec![id_field],
            Forward::fetch_one(endpoint, id, format!("{label} database")),
        ),
        DatabaseAction::Rebuild => (
            format!("Rebuilds a {label} database in Dokploy."),
            ToolAnnotations::new(format!("Rebuild {label} Database")),
            vec![id_field],
            Forward::post(endpoint, format!("{label} database \"{{{id}}}\" rebuild started successfully")),
        ),
        DatabaseAction::Reload => (
            format!("Reloads a {label} database in Dokploy."),
            ToolAnnotations::new(format!("Reload {label} Database")),
            vec![
                id_field,
                FieldSpec::non_empty("appName", "The app name of the database to reload."),
            ],
            Forward::post(endpoint, format!("{label} database \"{{{id}}}\" reloaded successfully")),
        ),
        DatabaseAction::Move => (
            format!("Moves a {label} database to another project in Dokploy."),
            ToolAnnotations::new(format!("Move {label} Database")),
            vec![
                id_field,
                FieldSpec::non_empty("targetProjectId", "The ID of the destination project."),
            ],
            Forward::post(
                endpoint,
                format!("{label} database \"{{{id}}}\" moved to project \"{{targetProjectId}}\""),
            ),
        ),
        DatabaseAction::ChangeStatus => (
            format!("Changes the status of a {label} database in Dokploy."),
            ToolAnnotations::new(format!("Change {label} Database Status")).idempotent(),
            vec![
                id_field,
                FieldSpec::one_of(
                    "applicationStatus",
                    APPLICATION_STATUSES,
                    "The new status of the database service.",
                ),
            ],
            Forward::post(
                endpoint,
                format!("{label} database \"{{{id}}}\" status changed to \"{{applicationStatus}}\""),
            ),
        ),
        DatabaseAction::SaveEnvironment => (
            format!("Saves environment variables for a {label} database in Dokploy."),
            ToolAnnotations::new(format!("Save {label} Environment Variables"))
                .idempotent()
                .closed_world(),
            vec![
                id_field,
                FieldSpec::string("env", "Environment variables to save.").nullable(),
            ],
            Forward::post(
                endpoint,
                format!("Environment variables saved for {label} database \"{{{id}}}\""),
            ),
        ),
        DatabaseAction::SaveExternalPort => (
            format!("Sets the external port of a {label} database in Dokploy."),
            ToolAnnotations::new(format!("Save {label} External Port")).idempotent(),
            vec![
                id_field,
                FieldSpec::number("externalPort", "External port to expose, null to close it.")
                    .nullable(),
            ],
            Forward::post(
                endpoint,
                format!("External port saved for {label} database \"{{{id}}}\""),
            ),
        ),
    };

    ToolDefinition::new(name, description, annotations, InputSchema::new(fields), operation)
}

pub fn dispatcher() -> ToolDefinition {
    ToolDefinition::new(
        DISPATCHER_TOOL,
        "Consolidated tool for managing Dokploy databases (PostgreSQL and MySQL). Supports \
         multiple actions for both database types: create, remove, deploy, start, stop, update, \
         get, rebuild, reload, move, changeStatus, saveEnvironment, saveExternalPort.",
        ToolAnnotations::new("Manage Dokploy Database"),
        InputSchema::new(vec![
            FieldSpec::one_of(
                "databaseType",
                DATABASE_TYPES,
                "The type of database to manage: postgres for PostgreSQL or mysql for MySQL",
            ),
            FieldSpec::one_of("action", ACTION_NAMES, "The action to perform on the database."),
            FieldSpec::record(
                "params",
                "Parameters for the action. The required parameters vary by action and \
                 database type; see the matching per-database tool.",
            )
            .optional(),
        ]),
        DatabaseDispatch,
    )
}

/// Routes to the per-database tool through the invoker, so nested params
/// are validated and coached under that tool's name.
struct DatabaseDispatch;

#[async_trait]
impl ToolOperation for DatabaseDispatch {
    async fn call(
        &self,
        context: &ToolContext,
        mut input: Map<String, Value>,
    ) -> Result<ToolResponse, ExecutionError> {
        let database_type = input
            .get("databaseType")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let action = input
            .get("action")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let params = input
            .remove("params")
            .unwrap_or_else(|| Value::Object(Map::new()));

        let target = match (DatabaseKind::parse(&database_type), DatabaseAction::parse(&action)) {
            (Some(kind), Some(action)) => tool_name(kind, action),
            _ => return Ok(invalid_action(&action, &database_type)),
        };
        tracing::debug!(tool = %target, "dispatching database action");
        match context.invoker.invoke(&target, params).await {
            Some(invocation) => Ok(invocation.response),
            None => Ok(invalid_action(&action, &database_type)),
        }
    }
}

fn invalid_action(action: &str, database_type: &str) -> ToolResponse {
    ToolResponse::error(
        "Invalid action",
        format!("Action \"{action}\" is not supported for {database_type} database"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::coaching::InvocationCoach;
    use crate::invocation::ToolInvoker;
    use crate::testing::{RecordingBackend, invoker_with};
    use crate::tools::ToolRegistry;

    #[test]
    fn every_action_exists_for_both_engines() {
        let tools = tools();
        assert_eq!(tools.len(), 27);
        let mysql_create = tools.iter().find(|t| t.name == "mysql-create").unwrap();
        let postgres_create = tools.iter().find(|t| t.name == "postgres-create").unwrap();
        assert!(mysql_create
            .schema
            .required_fields()
            .any(|f| f == "databaseRootPassword"));
        assert!(!postgres_create
            .schema
            .required_fields()
            .any(|f| f == "databaseRootPassword"));
        assert_eq!(
            postgres_create.schema.to_json_schema()["properties"]["dockerImage"]["default"],
            "postgres:15"
        );
    }

    #[test]
    fn actions_round_trip_through_their_names() {
        for action in DatabaseAction::ALL {
            assert_eq!(DatabaseAction::parse(action.as_str()), Some(action));
        }
        assert_eq!(DatabaseAction::parse("one"), None);
        assert_eq!(tool_name(DatabaseKind::Postgres, DatabaseAction::Get), "postgres-one");
    }

    #[tokio::test]
    async fn dispatcher_routes_to_the_matching_tool() {
        let backend = RecordingBackend::default().reply("/postgres.one", json!({"postgresId": "pg1"}));
        let (invoker, backend) = invoker_with(backend);
        let invocation = invoker
            .invoke(
                DISPATCHER_TOOL,
                json!({"databaseType": "postgres", "action": "get", "params": {"postgresId": "pg1"}}),
            )
            .await
            .unwrap();

        assert_eq!(invocation.response.data(), Some(&json!({"postgresId": "pg1"})));
        let calls = backend.calls();
        assert_eq!(calls[0].endpoint, "/postgres.one");
        assert_eq!(calls[0].payload, json!({"postgresId": "pg1"}));
    }

    #[tokio::test]
    async fn nested_params_are_coached_under_the_target_tool() {
        let (invoker, backend) = invoker_with(RecordingBackend::default());
        let invocation = invoker
            .invoke(DISPATCHER_TOOL, json!({"databaseType": "mysql", "action": "create"}))
            .await
            .unwrap();

        let body = invocation.response.error_body().unwrap();
        assert_eq!(body.title, "Invalid input for tool: mysql-create");
        assert!(body.detail.contains("missing_required_params"));
        assert!(body.detail.contains("<parameter name=\"databaseRootPassword\">rootpass</parameter>"));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_target_tool_is_an_invalid_action() {
        let invoker = ToolInvoker::new(
            Arc::new(ToolRegistry::new(vec![dispatcher()])),
            InvocationCoach::default(),
            Arc::new(RecordingBackend::default()),
        );
        let invocation = invoker
            .invoke(
                DISPATCHER_TOOL,
                json!({"databaseType": "mysql", "action": "rebuild", "params": {"mysqlId": "m1"}}),
            )
            .await
            .unwrap();
        let body = invocation.response.error_body().unwrap();
        assert_eq!(body.title, "Invalid action");
        assert_eq!(body.detail, "Action \"rebuild\" is not supported for mysql database");
    }

    #[tokio::test]
    async fn unsupported_database_type_is_coached_by_the_dispatcher() {
        let (invoker, _) = invoker_with(RecordingBackend::default());
        let invocation = invoker
            .invoke(DISPATCHER_TOOL, json!({"databaseType": "redis", "action": "get"}))
            .await
            .unwrap();
        let body = invocation.response.error_body().unwrap();
        assert_eq!(body.title, "Invalid input for tool: dokploy_database");
        assert!(body.detail.contains("expected one of 'postgres' | 'mysql'"));
    }
}
