use std::future::Future;

use serde_json::Value;

/// What came back from one wire exchange, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireReply {
    pub status: u16,
    pub body: String,
}

impl WireReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The network boundary the executor talks through. A real implementation
/// posts to the remote endpoint; tests script replies without opening a
/// socket. An `Err` means the exchange itself failed (connect, DNS, reset);
/// HTTP-level rejections arrive as a `WireReply` with their status.
pub trait Transport: Send + Sync {
    fn send(&self, payload: &Value) -> impl Future<Output = anyhow::Result<WireReply>> + Send;
}
