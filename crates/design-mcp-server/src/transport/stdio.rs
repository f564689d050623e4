//! stdio transport for MCP JSON-RPC
//!
//! Each `tools/call` runs on its own task so a slow command does not hold up
//! other tool invocations. Responses share one writer behind a mutex.

use crate::DesignMcpServer;
use crate::executor::CommandExecutor;
use crate::mcp::{
    CallToolParams, InitializeParams, InitializeResult, Notification, ReadResourceParams, Request,
    RequestId, Resource, ResourceContents, Response, ServerInfo,
};
use crate::tools::{handle_tool_call, list_tools};
use design_mcp_core::{DesignError, Result, error_codes};
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

type SharedWriter<W> = Arc<Mutex<W>>;

/// Run the MCP server on stdio
pub async fn run<E: CommandExecutor>(server: DesignMcpServer<E>) -> Result<()> {
    info!("Design MCP server starting on stdio");
    serve(
        server,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
}

/// Serve newline-delimited JSON-RPC from `reader`, answering on `writer`
pub async fn serve<E, R, W>(server: DesignMcpServer<E>, mut reader: R, writer: W) -> Result<()>
where
    E: CommandExecutor,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let out = Arc::new(Mutex::new(writer));
    let mut line = String::new();
    let mut in_flight = JoinSet::new();

    // Forward pushed application events as notifications
    let event_task = server.executor.subscribe_events().map(|mut rx| {
        let out = out.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if let Err(e) = write_json(&out, &Notification::app_event(event)).await {
                            error!("Failed to write event notification: {}", e);
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        debug!("Event channel closed");
                        break;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Event forwarder lagged, missed {} events", n);
                    }
                }
            }
        })
    });

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await.map_err(|e| {
            DesignError::TransportUnavailable(format!("Failed to read stdin: {}", e))
        })?;

        if bytes_read == 0 {
            // EOF - client disconnected
            info!("Client disconnected (EOF)");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        debug!("Received: {}", trimmed);

        let request: Request = match serde_json::from_str(trimmed) {
            Ok(r) => r,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                continue;
            }
        };

        let Some(id) = request.id.clone() else {
            debug!("Notification: {}", request.method);
            continue;
        };

        if request.method == "tools/call" {
            let executor = server.executor.clone();
            let out = out.clone();
            in_flight.spawn(async move {
                let response = handle_tools_call(&request, id, executor.as_ref()).await;
                if let Err(e) = write_json(&out, &response).await {
                    error!("Failed to write tool response: {}", e);
                }
            });
        } else {
            let response = handle_request(&request, id, &server);
            write_json(&out, &response).await?;
        }

        // Reap finished tool calls
        while in_flight.try_join_next().is_some() {}
    }

    // Let outstanding tool calls report before shutting down
    while in_flight.join_next().await.is_some() {}
    if let Some(task) = event_task {
        task.abort();
    }

    server.executor.shutdown().await;
    Ok(())
}

async fn write_json<W, T>(out: &SharedWriter<W>, message: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let json = serde_json::to_string(message)?;
    debug!("Sending: {}", json);

    let mut out = out.lock().await;
    out.write_all(json.as_bytes())
        .await
        .map_err(|e| DesignError::TransportUnavailable(format!("Failed to write stdout: {}", e)))?;
    out.write_all(b"\n").await.map_err(|e| {
        DesignError::TransportUnavailable(format!("Failed to write newline: {}", e))
    })?;
    out.flush()
        .await
        .map_err(|e| DesignError::TransportUnavailable(format!("Failed to flush stdout: {}", e)))?;
    Ok(())
}

fn handle_request<E: CommandExecutor>(
    request: &Request,
    id: RequestId,
    server: &DesignMcpServer<E>,
) -> Response {
    match request.method.as_str() {
        "initialize" => handle_initialize(request, id, server),
        "ping" => Response::success(id, serde_json::json!({})),
        "tools/list" => Response::success(id, serde_json::json!({ "tools": list_tools() })),
        "resources/list" => {
            Response::success(id, serde_json::json!({ "resources": [STATUS_RESOURCE] }))
        }
        "resources/read" => handle_resources_read(request, id, server),
        _ => Response::error(
            id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", request.method),
        ),
    }
}

fn handle_initialize<E: CommandExecutor>(
    request: &Request,
    id: RequestId,
    server: &DesignMcpServer<E>,
) -> Response {
    let params: InitializeParams = match request.params_as() {
        Ok(p) => p,
        Err(e) => return Response::from_error(id, &e),
    };
    info!(
        "Client {} v{} initializing (protocol {})",
        params.client_info.name, params.client_info.version, params.protocol_version
    );

    Response::to_success(
        id,
        &InitializeResult::new(ServerInfo {
            name: server.name.clone(),
            version: server.version.clone(),
        }),
    )
}

async fn handle_tools_call<E: CommandExecutor>(
    request: &Request,
    id: RequestId,
    executor: &E,
) -> Response {
    match request.params_as::<CallToolParams>() {
        Ok(params) => handle_tool_call(&params.name, params.arguments, id, executor).await,
        Err(e) => Response::from_error(id, &e),
    }
}

const STATUS_RESOURCE: Resource = Resource {
    uri: "design://status",
    name: "Bridge Status",
    description: "Connection state and commands awaiting a response",
    mime_type: "application/json",
};

fn handle_resources_read<E: CommandExecutor>(
    request: &Request,
    id: RequestId,
    server: &DesignMcpServer<E>,
) -> Response {
    let params: ReadResourceParams = match request.params_as() {
        Ok(p) => p,
        Err(e) => return Response::from_error(id, &e),
    };

    if params.uri != STATUS_RESOURCE.uri {
        return Response::error(
            id,
            error_codes::INVALID_PARAMS,
            format!("Unknown resource: {}", params.uri),
        );
    }

    let status = serde_json::json!({
        "connected": server.executor.is_connected(),
        "pending": server.executor.pending_count(),
    });
    let contents = ResourceContents {
        uri: params.uri,
        mime_type: STATUS_RESOURCE.mime_type.to_string(),
        text: status.to_string(),
    };

    Response::success(id, serde_json::json!({ "contents": [contents] }))
}
