//! Message orchestrator — turns one appended user message into exactly one
//! assistant message.
//!
//! Success appends the backend's reply (plus any derived memories, tagged
//! with their source conversation); failure appends a fixed apology carrying
//! the error text. Transport errors never propagate past this module — the
//! rendering layer only ever sees chat messages.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::state::types::fresh_id;
use crate::state::{Memory, MemorySource, Message, MessageMeta, Role, StateStore};
use crate::transport::{ProcessRequest, Transport};

/// Fixed user-facing reply content for failed processing attempts.
pub const APOLOGY_REPLY: &str = "Sorry, something went wrong while processing your message.";

/// Importance threshold (strict) for a memory to enter the context string.
const CONTEXT_IMPORTANCE_THRESHOLD: f64 = 0.5;

pub struct Orchestrator {
    store: Arc<StateStore>,
    transport: Transport,
}

impl Orchestrator {
    pub fn new(store: Arc<StateStore>, transport: Transport) -> Self {
        Self { store, transport }
    }

    /// Process `user_message` (already appended to `chat_id` by the caller).
    ///
    /// Exactly one assistant message is appended per accepted call, success
    /// or failure. Overlapping calls are rejected with [`AppError::Busy`]
    /// before anything is appended; the processing flag is cleared
    /// unconditionally on the way out.
    pub async fn process_message(
        &self,
        chat_id: &str,
        user_message: &Message,
    ) -> Result<(), AppError> {
        if !self.store.try_begin_processing() {
            return Err(AppError::Busy);
        }

        let (api_key, model, context) = {
            let state = self.store.snapshot();
            (
                state.settings.api_key,
                state.settings.model.strategist,
                context_from_memories(&state.memories),
            )
        };

        let request = ProcessRequest {
            api_key,
            message: user_message.content.clone(),
            context,
            model: model.clone(),
        };

        match self.transport.process_message(&request).await {
            Ok(reply) => {
                debug!(chat_id, memories = reply.memories.len(), "backend reply received");
                let assistant = Message {
                    id: fresh_id(),
                    role: Role::Assistant,
                    content: reply.content,
                    timestamp: Utc::now(),
                    metadata: Some(MessageMeta {
                        model: Some(model),
                        context: None,
                        processing_time: Some(elapsed_ms(user_message)),
                    }),
                    files: None,
                    error: None,
                };
                self.store.add_message(chat_id, assistant);

                for mut memory in reply.memories {
                    memory.source = Some(MemorySource {
                        chat_id: chat_id.to_string(),
                        message_id: user_message.id.clone(),
                    });
                    self.store.add_memory(memory);
                }
            }
            Err(e) => {
                warn!(chat_id, error = %e, "message processing failed");
                let assistant = Message {
                    id: fresh_id(),
                    role: Role::Assistant,
                    content: APOLOGY_REPLY.to_string(),
                    timestamp: Utc::now(),
                    metadata: None,
                    files: None,
                    error: Some(e.to_string()),
                };
                self.store.add_message(chat_id, assistant);
            }
        }

        self.store.end_processing();
        Ok(())
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }
}

/// Join the contents of memories with importance strictly above 0.5, in
/// store (insertion) order, newline-separated.
pub fn context_from_memories(memories: &[Memory]) -> String {
    memories
        .iter()
        .filter(|m| m.importance > CONTEXT_IMPORTANCE_THRESHOLD)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn elapsed_ms(user_message: &Message) -> u64 {
    (Utc::now() - user_message.timestamp)
        .num_milliseconds()
        .max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{HttpTransport, NativeBridge, PROCESS_MESSAGE};
    use serde_json::json;

    fn stub_transport(bridge: NativeBridge) -> Transport {
        // Closed port: any accidental HTTP fallback shows up as a test failure.
        Transport::select(Some(bridge), HttpTransport::new("http://127.0.0.1:1"))
    }

    fn orchestrator_with(bridge: NativeBridge) -> (Orchestrator, tempfile::TempDir, String, Message) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(StateStore::open(dir.path()));
        store.create_chat();
        let chat_id = store.snapshot().chats[0].id.clone();
        let user_message = Message::user("hello");
        store.add_message(&chat_id, user_message.clone());
        let orchestrator = Orchestrator::new(store, stub_transport(bridge));
        (orchestrator, dir, chat_id, user_message)
    }

    #[test]
    fn context_uses_strict_threshold_and_insertion_order() {
        let memories = vec![
            Memory::new("A", "c", 0.3),
            Memory::new("B", "c", 0.6),
            Memory::new("C", "c", 0.9),
            Memory::new("D", "c", 0.5),
        ];
        assert_eq!(context_from_memories(&memories), "B\nC");
    }

    #[test]
    fn context_of_no_qualifying_memories_is_empty() {
        assert_eq!(context_from_memories(&[]), "");
        assert_eq!(context_from_memories(&[Memory::new("A", "c", 0.5)]), "");
    }

    #[tokio::test]
    async fn success_appends_one_assistant_message() {
        let mut bridge = NativeBridge::new();
        bridge.register(PROCESS_MESSAGE, |_payload| async move {
            Ok(json!({"content": "hi", "memories": []}))
        });
        let (orchestrator, _dir, chat_id, user_message) = orchestrator_with(bridge);

        orchestrator
            .process_message(&chat_id, &user_message)
            .await
            .unwrap();

        let state = orchestrator.store().snapshot();
        let chat = &state.chats[0];
        assert_eq!(chat.messages.len(), 2);
        let reply = &chat.messages[1];
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content, "hi");
        assert!(reply.error.is_none());
        let meta = reply.metadata.as_ref().unwrap();
        assert_eq!(meta.model.as_deref(), Some("claude-3-sonnet"));
        assert!(meta.processing_time.is_some());
        assert!(state.memories.is_empty());
        assert!(!state.is_processing);
    }

    #[tokio::test]
    async fn success_tags_backend_memories_with_their_source() {
        let mut bridge = NativeBridge::new();
        bridge.register(PROCESS_MESSAGE, |_payload| async move {
            Ok(json!({
                "content": "noted",
                "memories": [{
                    "id": "m1",
                    "content": "user likes rust",
                    "category": "preference",
                    "importance": 0.8,
                    "timestamp": "2026-01-01T00:00:00Z"
                }]
            }))
        });
        let (orchestrator, _dir, chat_id, user_message) = orchestrator_with(bridge);

        orchestrator
            .process_message(&chat_id, &user_message)
            .await
            .unwrap();

        let state = orchestrator.store().snapshot();
        assert_eq!(state.memories.len(), 1);
        let source = state.memories[0].source.as_ref().unwrap();
        assert_eq!(source.chat_id, chat_id);
        assert_eq!(source.message_id, user_message.id);
    }

    #[tokio::test]
    async fn failure_appends_one_apology_with_the_error_text() {
        let mut bridge = NativeBridge::new();
        bridge.register(PROCESS_MESSAGE, |_payload| async move {
            Err("backend unavailable".to_string())
        });
        let (orchestrator, _dir, chat_id, user_message) = orchestrator_with(bridge);

        orchestrator
            .process_message(&chat_id, &user_message)
            .await
            .unwrap();

        let state = orchestrator.store().snapshot();
        let chat = &state.chats[0];
        assert_eq!(chat.messages.len(), 2);
        let reply = &chat.messages[1];
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content, APOLOGY_REPLY);
        assert!(
            reply
                .error
                .as_deref()
                .is_some_and(|e| e.contains("backend unavailable"))
        );
        assert!(state.memories.is_empty());
        assert!(!state.is_processing);
    }

    #[tokio::test]
    async fn missing_bridge_handler_still_produces_an_apology() {
        let (orchestrator, _dir, chat_id, user_message) = orchestrator_with(NativeBridge::new());

        orchestrator
            .process_message(&chat_id, &user_message)
            .await
            .unwrap();

        let state = orchestrator.store().snapshot();
        let reply = state.chats[0].messages.last().unwrap();
        assert_eq!(reply.content, APOLOGY_REPLY);
        assert!(reply.error.is_some());
    }

    #[tokio::test]
    async fn overlapping_calls_are_rejected_busy() {
        let mut bridge = NativeBridge::new();
        bridge.register(PROCESS_MESSAGE, |_payload| async move {
            Ok(json!({"content": "hi"}))
        });
        let (orchestrator, _dir, chat_id, user_message) = orchestrator_with(bridge);

        // Simulate an in-flight call.
        assert!(orchestrator.store().try_begin_processing());
        let err = orchestrator
            .process_message(&chat_id, &user_message)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Busy));

        // Rejection appends nothing.
        let state = orchestrator.store().snapshot();
        assert_eq!(state.chats[0].messages.len(), 1);
        assert!(state.is_processing);
    }

    #[tokio::test]
    async fn request_carries_settings_and_context() {
        use std::sync::Mutex as StdMutex;

        let seen: Arc<StdMutex<Option<serde_json::Value>>> = Arc::new(StdMutex::new(None));
        let seen_in_handler = seen.clone();
        let mut bridge = NativeBridge::new();
        bridge.register(PROCESS_MESSAGE, move |payload| {
            let seen = seen_in_handler.clone();
            async move {
                *seen.lock().unwrap() = Some(payload);
                Ok(json!({"content": "ok"}))
            }
        });

        let (orchestrator, _dir, chat_id, user_message) = orchestrator_with(bridge);
        let store = orchestrator.store();
        store.set_api_key("sk-test");
        store.add_memory(Memory::new("likes rust", "preference", 0.9));
        store.add_memory(Memory::new("noise", "misc", 0.2));

        orchestrator
            .process_message(&chat_id, &user_message)
            .await
            .unwrap();

        let payload = seen.lock().unwrap().take().unwrap();
        assert_eq!(payload["apiKey"], "sk-test");
        assert_eq!(payload["message"], "hello");
        assert_eq!(payload["context"], "likes rust");
        assert_eq!(payload["model"], "claude-3-sonnet");
    }
}
