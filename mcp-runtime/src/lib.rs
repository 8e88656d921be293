use std::sync::Arc;

use clap::{Args, Subcommand};
use serde_json::{Value, json};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use uuid::Uuid;

pub mod backend;
pub mod coaching;
pub mod config;
pub mod invocation;
pub mod schema;
pub mod tools;
mod util;

#[cfg(test)]
mod testing;

use backend::HttpBackend;
use coaching::{ATTEMPT_RESET_INTERVAL, DISCOVERY_TOOL, DRY_RUN_TOOL, InvocationCoach, spawn_reset_task};
use config::McpRuntimeConfig;
use invocation::ToolInvoker;
use tools::ToolRegistry;
use util::to_pretty_json;

const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
const MCP_SERVER_NAME: &str = "dokploy-mcp";
/// Largest `Content-Length` body accepted from a client.
const MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

#[derive(Subcommand)]
pub enum McpCommands {
    /// Run the Dokploy MCP server over stdio
    Serve(McpServeArgs),
    /// Print the tool catalog (names, input schemas, annotations) and exit
    Tools,
}

#[derive(Args, Clone, Debug)]
pub struct McpServeArgs {
    /// Dokploy API key, sent as the x-api-key header
    #[arg(long, env = "DOKPLOY_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
    /// Per-request timeout in seconds (clamped to 1..=600)
    #[arg(long, env = "DOKPLOY_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,
}

pub async fn run(api_url: &str, command: McpCommands) -> i32 {
    match command {
        McpCommands::Serve(args) => {
            let config = match McpRuntimeConfig::new(api_url, args.api_key, args.timeout_secs) {
                Ok(config) => config,
                Err(err) => {
                    report_error("invalid_config", &err.to_string());
                    return 2;
                }
            };
            if config.api_key.is_none() {
                tracing::warn!("DOKPLOY_API_KEY is not set; API calls will fail with authentication errors");
            }
            let server = match McpServer::from_config(&config) {
                Ok(server) => server,
                Err(err) => {
                    report_error("mcp_server_error", &err.to_string());
                    return 1;
                }
            };
            tracing::info!(
                api_url = %config.api_url,
                session_id = %server.session_id,
                tools = server.invoker.registry().len(),
                "starting MCP server on stdio"
            );
            match server.serve_stdio().await {
                Ok(()) => 0,
                Err(err) => {
                    report_error("mcp_server_error", &err);
                    1
                }
            }
        }
        McpCommands::Tools => {
            println!("{}", to_pretty_json(&tools_list_payload(&ToolRegistry::builtin())));
            0
        }
    }
}

fn report_error(code: &str, message: &str) {
    tracing::error!(error = code, "{message}");
    let payload = json!({
        "error": code,
        "message": message,
    });
    eprintln!("{}", to_pretty_json(&payload));
}

pub struct McpServer {
    invoker: ToolInvoker,
    session_id: String,
}

impl McpServer {
    pub fn new(invoker: ToolInvoker) -> Self {
        Self {
            invoker,
            session_id: format!("stdio-{}", Uuid::now_v7()),
        }
    }

    /// Builtin catalog against the Dokploy HTTP API.
    pub fn from_config(config: &McpRuntimeConfig) -> Result<Self, dokploy_core::ExecutionError> {
        let backend = HttpBackend::new(config)?;
        Ok(Self::new(ToolInvoker::new(
            Arc::new(ToolRegistry::builtin()),
            InvocationCoach::default(),
            Arc::new(backend),
        )))
    }

    pub async fn serve_stdio(&self) -> Result<(), String> {
        self.serve(BufReader::new(io::stdin()), io::stdout()).await
    }

    /// Reads messages until EOF. Each reply uses the framing of the message
    /// that produced it. The attempt store is reset periodically while this
    /// runs.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<(), String>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let _reset = spawn_reset_task(self.invoker.coach().store().clone(), ATTEMPT_RESET_INTERVAL);

        loop {
            let incoming = read_message(&mut reader)
                .await
                .map_err(|e| format!("Failed to read MCP message: {e}"))?;
            let Some(Incoming { payload, framing }) = incoming else {
                break;
            };

            let responses = match payload {
                Ok(message) => self.handle_payload(message).await,
                Err(parse_error) => {
                    tracing::warn!(session_id = %self.session_id, "{parse_error}");
                    vec![error_response(Value::Null, RpcError::parse_error(parse_error))]
                }
            };
            for response in responses {
                write_message(&mut writer, &response, framing)
                    .await
                    .map_err(|e| format!("Failed to write MCP response: {e}"))?;
            }
        }

        tracing::info!(session_id = %self.session_id, "client closed stdin, shutting down");
        Ok(())
    }

    /// Replies for one decoded payload: a single request or a batch.
    async fn handle_payload(&self, payload: Value) -> Vec<Value> {
        match payload {
            Value::Array(batch) if batch.is_empty() => vec![error_response(
                Value::Null,
                RpcError::invalid_request("Batch request must not be empty"),
            )],
            Value::Array(batch) => {
                let mut replies = Vec::with_capacity(batch.len());
                for message in batch {
                    replies.extend(self.handle_message(message).await);
                }
                replies
            }
            message => self.handle_message(message).await.into_iter().collect(),
        }
    }

    /// Notifications and client responses produce no reply.
    async fn handle_message(&self, message: Value) -> Option<Value> {
        let Value::Object(mut fields) = message else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };
        let id = fields.remove("id");
        if fields.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            return Some(error_response(
                id.unwrap_or(Value::Null),
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }
        let Some(Value::String(method)) = fields.remove("method") else {
            return None;
        };
        let Some(id) = id else {
            tracing::debug!(session_id = %self.session_id, method = method.as_str(), "notification ignored");
            return None;
        };

        let params = fields.remove("params").unwrap_or(Value::Null);
        Some(match self.handle_request(&method, params).await {
            Ok(result) => success_response(id, result),
            Err(err) => error_response(id, err),
        })
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        tracing::debug!(session_id = %self.session_id, method, "rpc request");
        match method {
            "initialize" => Ok(initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(tools_list_payload(self.invoker.registry())),
            "tools/call" => self.handle_tools_call(params).await,
            "resources/list" => Ok(json!({ "resources": [] })),
            "prompts/list" => Ok(json!({ "prompts": [] })),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;

        // Present-but-malformed arguments go to the wrapper and get coached.
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        let Some(invocation) = self.invoker.invoke(name, arguments).await else {
            return Err(RpcError::invalid_params(format!("Unknown tool: {name}"))
                .with_data(json!({ "tool": name, "hint": format!("Call {DISCOVERY_TOOL} to list available tools") })));
        };
        tracing::debug!(
            session_id = %self.session_id,
            tool = name,
            outcome = ?invocation.outcome,
            "tools/call finished"
        );
        Ok(invocation.response.to_value())
    }
}

fn initialize_payload() -> Value {
    let instructions = format!(
        "Tools for managing a Dokploy instance: projects, applications, compose services and \
         PostgreSQL/MySQL databases. Pass arguments as named parameters. When a call is rejected, \
         read the whole error: it carries a corrected example on the first retry and a guided \
         procedure after repeated failures. Use {DISCOVERY_TOOL} to see a working payload for a \
         tool and {DRY_RUN_TOOL} to check parameters without executing anything."
    );
    json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": {
            "tools": { "listChanged": false },
            "resources": { "listChanged": false },
            "prompts": { "listChanged": false }
        },
        "serverInfo": {
            "name": MCP_SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        },
        "instructions": instructions
    })
}

fn tools_list_payload(registry: &ToolRegistry) -> Value {
    let tools: Vec<Value> = registry.iter().map(|tool| tool.to_listing()).collect();
    json!({ "tools": tools })
}

#[derive(Debug)]
struct RpcError {
    code: i64,
    message: String,
    data: Option<Value>,
}

impl RpcError {
    fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: -32700,
            message: message.into(),
            data: None,
        }
    }

    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
            data: None,
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
            data: None,
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
            data: None,
        }
    }

    fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn error_response(id: Value, error: RpcError) -> Value {
    let mut payload = json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code,
            "message": error.message
        }
    });
    if let Some(data) = error.data {
        payload["error"]["data"] = data;
    }
    payload
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Framing {
    /// `Content-Length` headers, blank line, body.
    Headers,
    /// One JSON document per line.
    Lines,
}

struct Incoming {
    /// Parsed message, or a description of why the body was not JSON.
    payload: Result<Value, String>,
    framing: Framing,
}

async fn read_message<R>(reader: &mut R) -> Result<Option<Incoming>, std::io::Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    let mut in_headers = false;

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            if !in_headers {
                return Ok(None);
            }
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "Unexpected EOF while reading MCP headers",
            ));
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if !in_headers {
            let trimmed = line.trim_start();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                let payload = serde_json::from_str(trimmed)
                    .map_err(|e| format!("Invalid JSON payload: {e}"));
                return Ok(Some(Incoming {
                    payload,
                    framing: Framing::Lines,
                }));
            }
            in_headers = true;
        }

        if line.is_empty() {
            break;
        }
        if line.to_ascii_lowercase().starts_with("content-length:") {
            let raw_len = line
                .split_once(':')
                .map(|(_, right)| right.trim())
                .unwrap_or_default();
            let parsed = raw_len.parse::<usize>().map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "Invalid Content-Length header",
                )
            })?;
            if parsed > MAX_MESSAGE_BYTES {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Content-Length exceeds limit of {MAX_MESSAGE_BYTES} bytes"),
                ));
            }
            content_length = Some(parsed);
        }
    }

    let content_length = content_length.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Missing Content-Length header",
        )
    })?;
    let mut body = vec![0_u8; content_length];
    reader.read_exact(&mut body).await?;

    let payload = serde_json::from_slice(&body).map_err(|e| format!("Invalid JSON payload: {e}"));
    Ok(Some(Incoming {
        payload,
        framing: Framing::Headers,
    }))
}

async fn write_message<W>(writer: &mut W, value: &Value, framing: Framing) -> Result<(), std::io::Error>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(value).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Failed to serialize JSON: {e}"),
        )
    })?;
    match framing {
        Framing::Headers => {
            let header = format!(
                "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n",
                body.len()
            );
            writer.write_all(header.as_bytes()).await?;
            writer.write_all(&body).await?;
        }
        Framing::Lines => {
            writer.write_all(&body).await?;
            writer.write_all(b"\n").await?;
        }
    }
    writer.flush().await?;
    Ok(())
}
