//! Backend transport abstraction.
//!
//! `Transport` is an enum over the two delivery mechanisms: the embedded
//! native bridge and the HTTP fallback. Enum dispatch keeps callers free of
//! trait-object machinery; selection happens once at startup from the
//! injected capability flag, never re-probed per call.
//!
//! The typed [`process_message`](Transport::process_message) boundary decodes
//! the backend's loose reply shape here, so the orchestrator only ever sees
//! `Result<ProcessReply, TransportError>` — an absent memories list is an
//! empty one, and error payloads are already reduced to a message.

pub mod bridge;
pub mod http;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::state::Memory;

pub use bridge::NativeBridge;
pub use http::{BackendClient, HttpTransport};

/// Operation name for the orchestrator's backend call.
pub const PROCESS_MESSAGE: &str = "process_message";

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TransportError {
    /// The bridge was present but the call failed (including "no handler").
    #[error("bridge error: {0}")]
    Bridge(String),

    /// The HTTP fallback failed — transport-level or non-success response.
    #[error("api error: {0}")]
    Http(String),

    /// The backend answered but the reply did not match the expected shape.
    #[error("malformed backend reply: {0}")]
    Decode(String),
}

// ── Wire shapes ───────────────────────────────────────────────────────────────

/// Request body for `process_message`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub api_key: String,
    pub message: String,
    pub context: String,
    /// Strategist model identifier.
    pub model: String,
}

/// Decoded `process_message` reply.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessReply {
    pub content: String,
    /// Backend-derived memories; absent in the raw reply means empty.
    #[serde(default)]
    pub memories: Vec<Memory>,
}

// ── Transport ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Transport {
    Bridge(NativeBridge),
    Http(HttpTransport),
}

impl Transport {
    /// Pick the delivery mechanism once at startup. A detected bridge is
    /// authoritative; its failures surface directly and never fall through
    /// to HTTP.
    pub fn select(bridge: Option<NativeBridge>, http: HttpTransport) -> Self {
        match bridge {
            Some(bridge) => Transport::Bridge(bridge),
            None => Transport::Http(http),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Transport::Bridge(_) => "bridge",
            Transport::Http(_) => "http",
        }
    }

    /// Execute a named operation with a JSON payload. Single attempt, no
    /// retry, no timeout.
    pub async fn invoke(&self, operation: &str, payload: Value) -> Result<Value, TransportError> {
        match self {
            Transport::Bridge(bridge) => bridge.invoke(operation, payload).await,
            Transport::Http(http) => http.invoke(operation, &payload).await,
        }
    }

    /// Typed `process_message` call — the one the orchestrator uses.
    pub async fn process_message(
        &self,
        request: &ProcessRequest,
    ) -> Result<ProcessReply, TransportError> {
        let payload =
            serde_json::to_value(request).map_err(|e| TransportError::Decode(e.to_string()))?;
        let raw = self.invoke(PROCESS_MESSAGE, payload).await?;
        serde_json::from_value(raw).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn process_request_serializes_camel_case() {
        let request = ProcessRequest {
            api_key: "sk-test".into(),
            message: "hi".into(),
            context: String::new(),
            model: "claude-3-sonnet".into(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["apiKey"], "sk-test");
        assert_eq!(value["model"], "claude-3-sonnet");
    }

    #[test]
    fn process_reply_tolerates_absent_memories() {
        let reply: ProcessReply = serde_json::from_value(json!({"content": "hi"})).unwrap();
        assert_eq!(reply.content, "hi");
        assert!(reply.memories.is_empty());
    }

    #[tokio::test]
    async fn present_bridge_failure_never_falls_through_to_http() {
        // The HTTP side points at a closed port; if selection fell through we
        // would see an Http error instead of the bridge's.
        let transport = Transport::select(
            Some(NativeBridge::new()),
            HttpTransport::new("http://127.0.0.1:1"),
        );
        assert_eq!(transport.kind(), "bridge");

        let err = transport
            .invoke(PROCESS_MESSAGE, json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Bridge(_)));
    }

    #[tokio::test]
    async fn absent_bridge_selects_http() {
        let transport = Transport::select(None, HttpTransport::new("http://127.0.0.1:1"));
        assert_eq!(transport.kind(), "http");
    }

    #[tokio::test]
    async fn typed_call_decodes_through_a_bridge_handler() {
        let mut bridge = NativeBridge::new();
        bridge.register(PROCESS_MESSAGE, |_payload| async move {
            Ok(json!({"content": "hello back"}))
        });
        let transport = Transport::select(Some(bridge), HttpTransport::new("http://127.0.0.1:1"));

        let reply = transport
            .process_message(&ProcessRequest {
                api_key: String::new(),
                message: "hello".into(),
                context: String::new(),
                model: "claude-3-sonnet".into(),
            })
            .await
            .unwrap();
        assert_eq!(reply.content, "hello back");
        assert!(reply.memories.is_empty());
    }
}
