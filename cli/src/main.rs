use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use editbridge_core::{
    ClientConfig, DEFAULT_BIND_HOST, DEFAULT_HANDLER_TIMEOUT, DEFAULT_HOST, DEFAULT_PORT,
    DEFAULT_REQUEST_TIMEOUT,
};

mod commands;
mod utils;

#[derive(Parser)]
#[command(
    name = "editbridge",
    version,
    about = "Editor bridge - let an assistant drive a running code editor",
    long_about = "The editor bridge connects an assistant speaking MCP over stdio to a code editor through a local WebSocket. This tool runs the MCP server, runs a headless editor-side dispatcher, and checks that the bridge is reachable."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    verbose: bool,
}

/// Where the editor's bridge listener is
#[derive(Args, Debug, Clone)]
struct BridgeArgs {
    #[arg(long, env = "EDITBRIDGE_HOST", default_value = DEFAULT_HOST, help = "Bridge host")]
    host: String,

    #[arg(short, long, env = "EDITBRIDGE_PORT", default_value_t = DEFAULT_PORT, help = "Bridge port")]
    port: u16,

    #[arg(
        long,
        env = "EDITBRIDGE_TIMEOUT_MS",
        default_value_t = DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
        help = "Per-request timeout in milliseconds"
    )]
    timeout_ms: u64,
}

impl BridgeArgs {
    fn client_config(&self) -> Result<ClientConfig> {
        Ok(ClientConfig::builder()
            .host(self.host.clone())
            .port(self.port)
            .request_timeout_ms(self.timeout_ms)
            .build()?)
    }
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the MCP server on stdin/stdout")]
    Mcp {
        #[command(flatten)]
        bridge: BridgeArgs,
    },

    #[command(about = "Run the editor-side dispatcher with the headless editor")]
    Serve {
        #[arg(long, default_value = DEFAULT_BIND_HOST, help = "Address to bind")]
        bind: String,

        #[arg(short, long, env = "EDITBRIDGE_PORT", default_value_t = DEFAULT_PORT, help = "Port to listen on")]
        port: u16,

        #[arg(short, long, help = "Workspace folder to open")]
        workspace: Option<PathBuf>,

        #[arg(
            long,
            default_value_t = DEFAULT_HANDLER_TIMEOUT.as_millis() as u64,
            help = "Cancel handlers that run longer than this many milliseconds"
        )]
        handler_timeout_ms: u64,
    },

    #[command(about = "Send one command to the editor and print the result")]
    Call {
        #[arg(help = "Method name, e.g. getWorkspaceInfo")]
        method: String,

        #[arg(long, default_value = "{}", help = "Params as a JSON object")]
        params: String,

        #[command(flatten)]
        bridge: BridgeArgs,
    },

    #[command(about = "Check that the editor bridge is reachable and answering")]
    Doctor {
        #[command(flatten)]
        bridge: BridgeArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout belongs to the MCP protocol or to command output, so logs go to stderr
    let default_filter = if cli.verbose {
        "editbridge=debug,info"
    } else {
        "editbridge=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();

    let is_mcp_mode = matches!(cli.command, Commands::Mcp { .. });
    if is_mcp_mode || !is_terminal::is_terminal(std::io::stdout()) {
        colored::control::set_override(false);
    }

    match cli.command {
        Commands::Mcp { bridge } => {
            commands::mcp::execute(bridge.client_config()?).await?;
        }
        Commands::Serve {
            bind,
            port,
            workspace,
            handler_timeout_ms,
        } => {
            info!("Starting headless editor bridge");
            commands::serve::execute(bind, port, workspace, handler_timeout_ms).await?;
        }
        Commands::Call {
            method,
            params,
            bridge,
        } => {
            info!("Calling {}", method);
            commands::call::execute(bridge.client_config()?, &method, &params).await?;
        }
        Commands::Doctor { bridge } => {
            commands::doctor::execute(bridge.client_config()?).await?;
        }
    }

    Ok(())
}
