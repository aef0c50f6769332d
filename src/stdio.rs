//! Newline-delimited JSON transport over stdin/stdout.
//!
//! Each input line is either an envelope `{"id"?, "address"?, "body"}` or a
//! bare body. Bare objects go to the gateway address, bare lists to the batch
//! address. Every line gets exactly one `{"id", "body"}` line back.

use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::bus::EventBus;
use crate::config::GatewayConfig;
use crate::schema::Reply;

/// Default addresses for bodies that do not name one.
#[derive(Debug, Clone)]
pub struct Routes {
    pub address: String,
    pub batch_address: String,
}

impl Routes {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            address: config.address.clone(),
            batch_address: config.batch_address(),
        }
    }

    fn default_for(&self, body: &Value) -> &str {
        if body.is_array() {
            &self.batch_address
        } else {
            &self.address
        }
    }
}

/// Split one parsed line into `(id, address, body)`.
fn unwrap_envelope(line: Value, routes: &Routes) -> (Value, String, Value) {
    match line {
        Value::Object(mut m) if m.contains_key("body") => {
            let id = m.remove("id").unwrap_or(Value::Null);
            let body = m.remove("body").unwrap_or(Value::Null);
            let address = m
                .get("address")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| routes.default_for(&body).to_string());
            (id, address, body)
        }
        body => {
            let address = routes.default_for(&body).to_string();
            (Value::Null, address, body)
        }
    }
}

async fn respond(bus: &EventBus, routes: &Routes, line: &str) -> Value {
    let parsed: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(err) => {
            warn!(error = %err, "malformed request line");
            return json!({ "id": Value::Null, "body": Reply::error_body(&format!("invalid json: {err}")) });
        }
    };
    let (id, address, body) = unwrap_envelope(parsed, routes);
    let reply = match bus.send(&address, body).await {
        Ok(reply) => reply,
        Err(err) => Reply::error_body(&err.to_string()),
    };
    json!({ "id": id, "body": reply })
}

/// Serve requests from `reader` until EOF, writing replies to `writer`.
/// Requests are processed concurrently; replies are written as they finish.
pub async fn serve<R, W>(bus: EventBus, routes: Routes, reader: R, mut writer: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let writer_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        anyhow::Ok(())
    });

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let bus = bus.clone();
        let routes = routes.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let reply = respond(&bus, &routes, &line).await;
            if tx.send(reply.to_string()).is_err() {
                debug!("reply channel closed");
            }
        });
    }
    drop(tx);
    writer_task.await??;
    Ok(())
}

pub async fn run_stdio_server(bus: EventBus, routes: Routes) -> anyhow::Result<()> {
    info!(address = %routes.address, batch = %routes.batch_address, "serving newline-delimited JSON on stdio");
    serve(bus, routes, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}
