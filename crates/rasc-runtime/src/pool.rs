use std::net::SocketAddr;
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpStream;

use crate::error::ProbeError;
use crate::wire::{read_frame, write_frame, WireMode};

const INITIAL_BACKOFF: Duration = Duration::from_millis(50);
const MAX_BACKOFF: Duration = Duration::from_secs(1);

/// One persistent connection to a device, reconnected lazily on failure.
///
/// The original stub server handles one connection for its whole lifetime
/// rather than one per request, so the runtime keeps a connection open
/// across probes instead of dialing fresh each time.
pub struct DeviceConnection {
    entity_id: String,
    addr: SocketAddr,
    mode: WireMode,
    stream: Option<TcpStream>,
    backoff: Duration,
}

impl DeviceConnection {
    pub fn new(entity_id: impl Into<String>, addr: SocketAddr, mode: WireMode) -> Self {
        Self { entity_id: entity_id.into(), addr, mode, stream: None, backoff: INITIAL_BACKOFF }
    }

    async fn ensure_connected(&mut self) -> Result<(), ProbeError> {
        if self.stream.is_some() {
            return Ok(());
        }
        match TcpStream::connect(self.addr).await {
            Ok(stream) => {
                self.stream = Some(stream);
                self.backoff = INITIAL_BACKOFF;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(entity_id = %self.entity_id, backoff_ms = self.backoff.as_millis(), "connect failed, backing off");
                tokio::time::sleep(self.backoff).await;
                self.backoff = (self.backoff * 2).min(MAX_BACKOFF);
                Err(ProbeError::Wire(e.into()))
            }
        }
    }

    /// Sends `request` and waits for a response, bounded by `timeout`. Any
    /// failure (connect, wire, or timeout) drops the connection so the next
    /// call reconnects from scratch.
    pub async fn request(&mut self, request: &Value, timeout: Duration) -> Result<Value, ProbeError> {
        self.ensure_connected().await?;
        let entity_id = self.entity_id.clone();
        let mode = self.mode;
        let stream = self.stream.as_mut().expect("just ensured connected");

        let outcome = tokio::time::timeout(timeout, async {
            write_frame(stream, mode, request).await?;
            read_frame(stream, mode).await
        })
        .await;

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(wire_err)) => {
                self.stream = None;
                Err(ProbeError::Wire(wire_err))
            }
            Err(_elapsed) => {
                self.stream = None;
                Err(ProbeError::Timeout { entity_id, elapsed_ms: timeout.as_millis() as u64 })
            }
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn request_round_trips_against_an_echo_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let value = read_frame(&mut socket, WireMode::Json).await.unwrap();
            write_frame(&mut socket, WireMode::Json, &value).await.unwrap();
        });

        let mut conn = DeviceConnection::new("d1", addr, WireMode::Json);
        let req = serde_json::json!({"system": {"get_sysinfo": {}}});
        let resp = conn.request(&req, Duration::from_secs(1)).await.unwrap();
        assert_eq!(resp, req);
        assert!(conn.is_connected());
    }

    #[tokio::test]
    async fn request_times_out_against_a_silent_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let mut conn = DeviceConnection::new("d1", addr, WireMode::Json);
        let req = serde_json::json!({"system": {"get_sysinfo": {}}});
        let err = conn.request(&req, Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, ProbeError::Timeout { .. }));
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn request_drops_connection_on_early_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.shutdown().await.ok();
        });

        let mut conn = DeviceConnection::new("d1", addr, WireMode::Json);
        let req = serde_json::json!({"system": {"get_sysinfo": {}}});
        assert!(conn.request(&req, Duration::from_secs(1)).await.is_err());
        assert!(!conn.is_connected());
    }
}
