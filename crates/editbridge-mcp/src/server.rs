//! RMCP server that forwards tool calls to the editor bridge.

use anyhow::Result;
use editbridge_client::{BridgeClient, ClientConfig, Outcome};
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, ErrorCode, Implementation, JsonObject,
    ListToolsResult, PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler};
use serde_json::Value;
use tokio::io::{stdin, stdout};
use tracing::{debug, info, warn};

use crate::catalog::{self, ToolTarget};
use crate::fs_tools;

/// MCP service backed by a [`BridgeClient`].
#[derive(Clone)]
pub struct EditorBridgeServer {
    client: BridgeClient,
}

impl EditorBridgeServer {
    pub fn new(client: BridgeClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &BridgeClient {
        &self.client
    }

    /// Run one tool.
    ///
    /// Failures of a known tool, including an unreachable editor, come back
    /// as an error result the assistant can read. Only unknown tool names are
    /// protocol errors.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        let Some(spec) = catalog::find(name) else {
            return Err(ErrorData::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("Unknown tool: {name}"),
                None,
            ));
        };

        let params = catalog::method_params(name, arguments);
        debug!(tool = name, "Calling tool");

        let outcome = match spec.target {
            ToolTarget::Method(method) => match self.client.send_command(method, params).await {
                Ok(outcome) => outcome,
                Err(e) => Outcome::Err(e.to_string()),
            },
            ToolTarget::ReadFile => local(async {
                let path = fs_tools::file_argument(&params)?;
                fs_tools::read_file(path).await
            })
            .await,
            ToolTarget::ListFiles => {
                local(fs_tools::list_files(fs_tools::directory_argument(&params))).await
            }
        };

        Ok(tool_result(name, outcome))
    }
}

/// Local tools produce text rather than JSON.
async fn local(task: impl std::future::Future<Output = Result<String>>) -> Outcome {
    match task.await {
        Ok(text) => Outcome::Ok(Value::String(text)),
        Err(e) => Outcome::Err(format!("{e:#}")),
    }
}

fn tool_result(name: &str, outcome: Outcome) -> CallToolResult {
    match outcome {
        Outcome::Ok(Value::String(text)) => CallToolResult {
            content: vec![Content::text(text)],
            structured_content: None,
            is_error: Some(false),
            meta: None,
        },
        Outcome::Ok(value) => {
            let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
            // Structured content must be an object
            let structured_content = value.is_object().then_some(value);
            CallToolResult {
                content: vec![Content::text(text)],
                structured_content,
                is_error: Some(false),
                meta: None,
            }
        }
        Outcome::Err(reason) => {
            warn!(tool = name, "Tool failed: {}", reason);
            CallToolResult {
                content: vec![Content::text(format!("Error executing {name}: {reason}"))],
                structured_content: None,
                is_error: Some(true),
                meta: None,
            }
        }
    }
}

impl ServerHandler for EditorBridgeServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "editbridge".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("Editor Bridge".to_string()),
                website_url: None,
                icons: None,
            },
            instructions: Some(
                "Controls a running code editor through the editor bridge: files, edits, \
                 selections, diagnostics, terminals, extensions and themes"
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult {
            tools: catalog::catalog().iter().map(|spec| spec.to_tool()).collect(),
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        self.invoke(&request.name, request.arguments).await
    }
}

/// Serve MCP over stdin/stdout until the peer disconnects or Ctrl-C.
///
/// Logging must already be directed to stderr.
pub async fn run_stdio(config: ClientConfig) -> Result<()> {
    use rmcp::serve_server;

    info!("Starting MCP server for editor bridge at {}", config.url());
    let client = BridgeClient::new(config);
    let service = EditorBridgeServer::new(client.clone());

    let server = serve_server(service, (stdin(), stdout()))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start MCP server: {:?}", e))?;
    info!("MCP server ready");

    let outcome = tokio::select! {
        quit = server.waiting() => quit
            .map(|reason| info!("MCP session ended: {:?}", reason))
            .map_err(|e| anyhow::anyhow!("MCP server task failed: {}", e)),
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            Ok(())
        }
    };

    client.close().await;
    outcome
}
