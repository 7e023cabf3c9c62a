//! Control socket: line-delimited JSON over TCP.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::engine::EngineHandle;
use crate::protocol::{Request, Response};

/// Accept clients forever, one task per connection.
pub async fn serve(listener: TcpListener, engine: EngineHandle) -> Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        tracing::info!(%peer, "client connected");
        let engine = engine.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_client(stream, engine).await {
                tracing::warn!(%peer, error = %err, "client connection failed");
            }
            tracing::info!(%peer, "client disconnected");
        });
    }
}

async fn handle_client(stream: TcpStream, engine: EngineHandle) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                tracing::debug!(function = %request.function, "request");
                engine.call(request).await?
            }
            Err(err) => Response::error(format!("Malformed request: {err}")),
        };
        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        writer.write_all(out.as_bytes()).await?;
    }
    Ok(())
}
