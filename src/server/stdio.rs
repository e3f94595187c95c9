//! Newline-delimited JSON-RPC over stdin/stdout
//!
//! Requests are read one line at a time. `tools/call` runs on its own task so
//! a slow aggregation does not hold up other requests; every other method is
//! answered inline. All responses go through one writer task, so lines are
//! never interleaved. Stdout carries protocol traffic only.

use super::protocol::JsonRpcResponse;
use super::McpServer;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

const RESPONSE_QUEUE: usize = 64;

/// Serve until `reader` hits EOF, then wait for in-flight calls to finish
pub async fn serve<R, W>(server: Arc<McpServer>, reader: R, writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<JsonRpcResponse>(RESPONSE_QUEUE);
    let writer_task = tokio::spawn(write_responses(rx, writer));
    let mut in_flight = JoinSet::new();
    let mut lines = reader.lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    error!("Tool task failed: {}", e);
                }
                continue;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let message = match McpServer::parse_line(line) {
            Ok(message) => message,
            Err(response) => {
                if tx.send(response).await.is_err() {
                    break;
                }
                continue;
            }
        };

        if is_tool_call(&message) {
            let server = Arc::clone(&server);
            let tx = tx.clone();
            in_flight.spawn(async move {
                if let Some(response) = server.handle_value(message).await {
                    let _ = tx.send(response).await;
                }
            });
        } else if let Some(response) = server.handle_value(message).await {
            if tx.send(response).await.is_err() {
                break;
            }
        }
    }

    info!("Input closed, waiting for {} in-flight calls", in_flight.len());
    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            error!("Tool task failed: {}", e);
        }
    }

    drop(tx);
    match writer_task.await {
        Ok(result) => result,
        Err(e) => Err(std::io::Error::new(std::io::ErrorKind::Other, e)),
    }
}

fn is_tool_call(message: &Value) -> bool {
    message.get("method").and_then(Value::as_str) == Some("tools/call")
}

async fn write_responses<W>(mut rx: mpsc::Receiver<JsonRpcResponse>, mut writer: W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = match serde_json::to_vec(&response) {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to encode response: {}", e);
                continue;
            }
        };
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
        debug!("Wrote response for id {}", response.id);
    }
    Ok(())
}
