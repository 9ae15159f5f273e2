//! Native in-process bridge — registry of named async operation handlers.
//!
//! Models the embedded IPC side of the shell: when the native runtime is
//! linked in it registers its operations here at startup, and the
//! [`Transport`](super::Transport) routes every call through them. An
//! operation with no registered handler is a bridge *error*, not an
//! "unavailable" signal — once the bridge is detected present it is
//! authoritative and nothing falls through to HTTP.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use super::TransportError;

/// Boxed future returned by bridge handlers.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, String>> + Send>>;

type Handler = Arc<dyn Fn(Value) -> HandlerFuture + Send + Sync>;

#[derive(Clone, Default)]
pub struct NativeBridge {
    handlers: HashMap<String, Handler>,
}

impl NativeBridge {
    /// An empty bridge: present (and therefore authoritative) but with no
    /// operations registered yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `operation`, replacing any previous handler.
    pub fn register<F, Fut>(&mut self, operation: impl Into<String>, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, String>> + Send + 'static,
    {
        self.handlers.insert(
            operation.into(),
            Arc::new(move |payload: Value| -> HandlerFuture { Box::pin(handler(payload)) }),
        );
    }

    /// Run the handler registered for `operation`. Handler failures and
    /// missing handlers both surface as [`TransportError::Bridge`].
    pub async fn invoke(&self, operation: &str, payload: Value) -> Result<Value, TransportError> {
        let handler = self.handlers.get(operation).ok_or_else(|| {
            TransportError::Bridge(format!("no native handler for '{operation}'"))
        })?;
        handler(payload).await.map_err(TransportError::Bridge)
    }
}

impl fmt::Debug for NativeBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut operations: Vec<_> = self.handlers.keys().collect();
        operations.sort();
        f.debug_struct("NativeBridge")
            .field("operations", &operations)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn invoke_runs_the_registered_handler() {
        let mut bridge = NativeBridge::new();
        bridge.register("echo", |payload: Value| async move { Ok(payload) });

        let reply = bridge.invoke("echo", json!({"x": 1})).await.unwrap();
        assert_eq!(reply, json!({"x": 1}));
    }

    #[tokio::test]
    async fn missing_handler_is_a_bridge_error() {
        let bridge = NativeBridge::new();
        let err = bridge.invoke("process_message", json!({})).await.unwrap_err();
        match err {
            TransportError::Bridge(msg) => assert!(msg.contains("process_message")),
            other => panic!("expected bridge error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn handler_failure_propagates_as_bridge_error() {
        let mut bridge = NativeBridge::new();
        bridge.register("boom", |_payload: Value| async move {
            Err("handler exploded".to_string())
        });

        let err = bridge.invoke("boom", json!({})).await.unwrap_err();
        match err {
            TransportError::Bridge(msg) => assert_eq!(msg, "handler exploded"),
            other => panic!("expected bridge error, got {other:?}"),
        }
    }
}
