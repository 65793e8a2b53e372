//! Minimal CDP WebSocket client.
//!
//! Request/response only: monotonic ids, a pending-response map drained by a
//! background read task, every call bounded by one timeout. Events are
//! ignored — page readiness and URL changes are observed by polling
//! `Runtime.evaluate`, which keeps the transport small.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::stream::{SplitSink, StreamExt};
use futures_util::SinkExt;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::trace;

use crmv_auth::{DriverError, driver::DriverResult};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>;

pub struct CdpConnection {
    sink: tokio::sync::Mutex<WsSink>,
    pending: PendingMap,
    next_id: AtomicU64,
    call_timeout: Duration,
    reader: JoinHandle<()>,
}

impl CdpConnection {
    pub async fn connect(ws_url: &str, call_timeout: Duration) -> DriverResult<Self> {
        let (stream, _) = connect_async(ws_url)
            .await
            .map_err(|e| DriverError::Protocol(format!("websocket connect failed: {e}")))?;
        let (sink, mut read) = stream.split();

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader_pending = Arc::clone(&pending);
        let reader = tokio::spawn(async move {
            while let Some(message) = read.next().await {
                let Ok(Message::Text(text)) = message else {
                    continue;
                };
                let Ok(value) = serde_json::from_str::<Value>(&text) else {
                    continue;
                };
                match value.get("id").and_then(Value::as_u64) {
                    Some(id) => {
                        if let Some(tx) = reader_pending.lock().unwrap().remove(&id) {
                            let _ = tx.send(value);
                        }
                    }
                    None => {
                        trace!(
                            target = "crmv.engine",
                            method = value.get("method").and_then(|v| v.as_str()).unwrap_or(""),
                            "cdp event ignored"
                        );
                    }
                }
            }
            // Socket gone: drop outstanding waiters so calls fail fast
            // instead of riding out their timeout.
            reader_pending.lock().unwrap().clear();
        });

        Ok(Self {
            sink: tokio::sync::Mutex::new(sink),
            pending,
            next_id: AtomicU64::new(0),
            call_timeout,
            reader,
        })
    }

    /// Sends one CDP command and awaits its response. `session_id` targets a
    /// page session; `None` addresses the browser itself.
    pub async fn call(
        &self,
        session_id: Option<&str>,
        method: &str,
        params: Value,
    ) -> DriverResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(id, tx);

        let mut message = json!({ "id": id, "method": method, "params": params });
        if let Some(session_id) = session_id {
            message["sessionId"] = json!(session_id);
        }

        let send = self
            .sink
            .lock()
            .await
            .send(Message::Text(message.to_string()))
            .await;
        if let Err(e) = send {
            self.pending.lock().unwrap().remove(&id);
            return Err(DriverError::Protocol(format!("websocket send failed: {e}")));
        }

        let response = match tokio::time::timeout(self.call_timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(DriverError::Protocol("connection closed".into()));
            }
            Err(_) => {
                self.pending.lock().unwrap().remove(&id);
                return Err(DriverError::Timeout {
                    ms: self.call_timeout.as_millis() as u64,
                    condition: format!("response to {method}"),
                });
            }
        };

        if let Some(error) = response.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown CDP error");
            return Err(DriverError::Protocol(format!("{method}: {message}")));
        }

        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }
}

impl Drop for CdpConnection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
