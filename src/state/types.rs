//! Core data model: settings, chats, messages, memories.
//!
//! Field names serialize in camelCase because that is the wire and blob
//! format the backend and the durable store share (`apiKey`, `lastUpdated`,
//! `chatId`, …). Ids are opaque UUID strings; timestamps are UTC instants
//! (RFC 3339 in the blob).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default title given to a freshly created chat.
pub const DEFAULT_CHAT_TITLE: &str = "New Chat";

/// Fresh opaque id for chats, messages and memories.
pub(crate) fn fresh_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ── Settings ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Which settings slot a model identifier goes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    Strategist,
    Worker,
}

/// Model identifiers per role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSelection {
    pub strategist: String,
    pub worker: String,
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self {
            strategist: "claude-3-sonnet".to_string(),
            worker: "claude-3-haiku".to_string(),
        }
    }
}

/// User settings singleton — mutated only via the store's setters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub api_key: String,
    pub theme: Theme,
    pub model: ModelSelection,
}

// ── Messages & chats ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Descriptor for a file attached to a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMeta {
    /// Model identifier that produced this (assistant) message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Ids of the context snippets that were in play.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<String>>,
    /// Wall time from user message to reply, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<u64>,
}

/// One chat message. Immutable once appended; owned by its parent [`Chat`].
///
/// `content` may be empty only when `files` is present. `error` is set only
/// on assistant messages that represent a failed processing attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<Attachment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: fresh_id(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: None,
            files: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Chat {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: fresh_id(),
            title: DEFAULT_CHAT_TITLE.to_string(),
            messages: Vec::new(),
            created: now,
            last_updated: now,
        }
    }
}

impl Default for Chat {
    fn default() -> Self {
        Self::new()
    }
}

// ── Memories ──────────────────────────────────────────────────────────────────

/// Non-owning back-reference to the conversation a memory came from.
/// Used for lookup/attribution only — never traversed for lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySource {
    pub chat_id: String,
    pub message_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    pub id: String,
    pub content: String,
    /// Free-text label, e.g. `"chat_response"`.
    pub category: String,
    /// Relevance weight, always within [0, 1].
    pub importance: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<MemorySource>,
}

impl Memory {
    pub fn new(
        content: impl Into<String>,
        category: impl Into<String>,
        importance: f64,
    ) -> Self {
        Self {
            id: fresh_id(),
            content: content.into(),
            category: category.into(),
            importance: importance.clamp(0.0, 1.0),
            timestamp: Utc::now(),
            metadata: serde_json::Map::new(),
            source: None,
        }
    }
}

// ── Root state ────────────────────────────────────────────────────────────────

/// Process-wide application state, owned by the
/// [`StateStore`](super::store::StateStore).
///
/// `active_chat` may be stale only in the window before the next mutation;
/// `delete_chat` clears it when the pointed-at chat goes away. Consumers
/// null-check regardless. `active_chat` and `is_processing` are session-only
/// and never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub settings: Settings,
    /// Creation order.
    pub chats: Vec<Chat>,
    pub memories: Vec<Memory>,
    pub active_chat: Option<String>,
    pub is_processing: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_are_unique() {
        let a = fresh_id();
        let b = fresh_id();
        assert_ne!(a, b);
    }

    #[test]
    fn new_chat_has_default_title_and_no_messages() {
        let chat = Chat::new();
        assert_eq!(chat.title, DEFAULT_CHAT_TITLE);
        assert!(chat.messages.is_empty());
        assert_eq!(chat.created, chat.last_updated);
    }

    #[test]
    fn memory_importance_is_clamped_on_construction() {
        assert_eq!(Memory::new("a", "c", 1.7).importance, 1.0);
        assert_eq!(Memory::new("a", "c", -0.2).importance, 0.0);
        assert_eq!(Memory::new("a", "c", 0.5).importance, 0.5);
    }

    #[test]
    fn settings_serialize_camel_case() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert!(json.get("apiKey").is_some());
        assert_eq!(json["theme"], "light");
        assert_eq!(json["model"]["strategist"], "claude-3-sonnet");
        assert_eq!(json["model"]["worker"], "claude-3-haiku");
    }

    #[test]
    fn message_optional_fields_are_omitted() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("metadata").is_none());
        assert!(json.get("files").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn memory_deserializes_without_optional_fields() {
        let m: Memory = serde_json::from_value(serde_json::json!({
            "id": "m1",
            "content": "likes rust",
            "category": "preference",
            "importance": 0.8,
            "timestamp": "2026-01-01T00:00:00Z"
        }))
        .unwrap();
        assert!(m.metadata.is_empty());
        assert!(m.source.is_none());
    }
}
