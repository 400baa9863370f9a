//! Newline-delimited JSON-RPC over a reader/writer pair (stdin/stdout in
//! production).
//!
//! The stdio transport carries exactly one session for the process
//! lifetime. Authentication runs once without a request; a rejection is
//! logged and the session continues unauthenticated.

use {
    crate::{error::McpError, logging, server::McpServer, session::TransportKind},
    anyhow::Result,
    serde_json::Value,
    tokio::{
        io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
        sync::mpsc,
    },
    tracing::{debug, error, warn},
};

pub async fn serve<A, R, W>(server: McpServer<A>, reader: R, writer: W) -> Result<()>
where
    A: Clone + Send + Sync + 'static,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let auth = match server.authenticate(None).await {
        Ok(auth) => auth,
        Err(rejection) => {
            warn!(
                status = rejection.status,
                error = %rejection.message,
                "🔐 stdio authentication failed, continuing unauthenticated"
            );
            None
        }
    };

    let session = server.new_session(auth, TransportKind::Stdio);
    if let Err(e) = server.track(session.clone()) {
        error!(error = %e, "Could not track stdio session");
    }

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Value>();
    let writer_task = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(message) = out_rx.recv().await {
            let mut line = match serde_json::to_string(&message) {
                Ok(line) => line,
                Err(e) => {
                    error!(error = %e, "Failed to serialize outbound message");
                    continue;
                }
            };
            line.push('\n');
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                error!(error = %e, "Failed to write to stdout");
                break;
            }
            if let Err(e) = writer.flush().await {
                error!(error = %e, "Failed to flush stdout");
                break;
            }
        }
    });

    // Server-initiated requests (roots, ping, sampling) share the writer.
    if let Some(mut stream) = session.attach_stream() {
        let tx = out_tx.clone();
        tokio::spawn(async move {
            while let Some(message) = stream.recv().await {
                if tx.send(message).is_err() {
                    break;
                }
            }
        });
    }

    let limits = server.options().limits.clone();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let read_result = loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break Ok(()),
            Ok(_) => {}
            Err(e) => break Err(e),
        }
        let line = buf.trim_ascii();
        if line.is_empty() {
            continue;
        }
        logging::log_message_received("stdio", line.len());

        if !limits.allows_message(line.len()) {
            let error = McpError::MessageTooLarge(line.len(), limits.max_message_size);
            let _ = out_tx.send(error.to_json_rpc_error(None));
            continue;
        }

        // Invalid UTF-8 fails here like any other malformed frame.
        let payload: Value = match serde_json::from_slice(line) {
            Ok(payload) => payload,
            Err(e) => {
                logging::log_parse_error(&e.to_string(), &String::from_utf8_lossy(line));
                let _ = out_tx.send(McpError::Json(e).to_json_rpc_error(None));
                continue;
            }
        };

        let session = session.clone();
        let tx = out_tx.clone();
        tokio::spawn(async move {
            if let Some(reply) = session.handle_payload(payload, tx.clone()).await {
                let _ = tx.send(reply);
            }
            session.spawn_connect();
        });
    };

    match &read_result {
        Ok(()) => debug!("stdin closed"),
        Err(e) => session.fail(format!("stdin read failed: {e}")),
    }
    server.untrack(session.id());
    drop(out_tx);
    let _ = writer_task.await;
    read_result.map_err(Into::into)
}
