use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use dokploy_mcp_runtime::config::DEFAULT_API_URL;
use dokploy_mcp_runtime::{McpCommands, run as run_mcp};

#[derive(Parser)]
#[command(
    name = "dokploy-mcp",
    version,
    about = "Dokploy MCP server: Dokploy management tools over stdio"
)]
struct Cli {
    /// Dokploy API base URL
    #[arg(long, env = "DOKPLOY_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Emit logs as JSON lines (stderr)
    #[arg(long, env = "DOKPLOY_MCP_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: McpCommands,
}

fn init_tracing(json: bool) {
    // stdout carries the protocol; logs go to stderr.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dokploy_mcp=info,dokploy_mcp_runtime=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let code = run_mcp(&cli.api_url, cli.command).await;
    std::process::exit(code);
}
