//! HTTP access to the backend: the fallback transport plus the simple
//! auxiliary-endpoint client.
//!
//! Both talk to the same base URL. [`HttpTransport`] is the generic
//! `POST {base}/{operation}` path the [`Transport`](super::Transport)
//! selector uses; [`BackendClient`] wraps the non-orchestrator endpoints
//! (`/chat`, `/generate-code`, `/health`). One attempt per call, no retry,
//! no timeout — retry policy belongs to callers.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::TransportError;

/// Generic JSON-over-POST transport to the local backend.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `POST {base}/{operation}` with `payload` as the JSON body.
    pub async fn invoke(&self, operation: &str, payload: &Value) -> Result<Value, TransportError> {
        let url = format!("{}/{operation}", self.base_url);
        debug!(%url, "http invoke");

        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(TransportError::Http(error_message(status, &body)));
        }

        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

/// Error responses may carry a structured `{"detail": …}` payload; prefer
/// that message, else fall back to the raw status and body.
fn error_message(status: StatusCode, body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: String,
    }
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.detail,
        Err(_) => format!("{status}: {}", body.trim()),
    }
}

// ── Auxiliary endpoints ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    context: &'a str,
}

#[derive(Deserialize)]
struct ChatReply {
    response: String,
}

#[derive(Serialize)]
struct CodeRequest<'a> {
    prompt: &'a str,
    language: &'a str,
}

#[derive(Deserialize)]
struct CodeReply {
    code: String,
}

#[derive(Deserialize)]
struct HealthReply {
    status: String,
}

/// Thin wrapper over the backend's simple endpoints. Not orchestrator-
/// integrated; used for one-off requests that bypass the conversation store.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `POST /chat` — plain completion with an optional context string.
    pub async fn chat(&self, message: &str, context: &str) -> Result<String, TransportError> {
        let reply: ChatReply = self
            .post("chat", &ChatRequest { message, context })
            .await?;
        Ok(reply.response)
    }

    /// `POST /generate-code` — code generation for the given language.
    pub async fn generate_code(
        &self,
        prompt: &str,
        language: &str,
    ) -> Result<String, TransportError> {
        let reply: CodeReply = self
            .post("generate-code", &CodeRequest { prompt, language })
            .await?;
        Ok(reply.code)
    }

    /// `GET /health` — `true` only for a well-formed healthy reply; any
    /// failure reads as unhealthy.
    pub async fn health(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        let Ok(response) = self.client.get(&url).send().await else {
            return false;
        };
        match response.json::<HealthReply>().await {
            Ok(reply) => reply.status == "healthy",
            Err(_) => false,
        }
    }

    async fn post<Req: Serialize, Reply: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        request: &Req,
    ) -> Result<Reply, TransportError> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(TransportError::Http(error_message(status, &body)));
        }
        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}
