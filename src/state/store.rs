//! [`StateStore`] — single source of truth for settings, chats and memories.
//!
//! Every mutation is an atomic transition: take the lock, apply a pure
//! `AppState -> AppState` step, publish the new snapshot, then write the
//! durable subset to disk. The lock is never held across an `.await`, so
//! readers observe either the state before a mutation or after it, never a
//! partial write. Durable writes are fire-and-forget: a failed write logs a
//! warning and never fails the mutation.
//!
//! Lookup misses (`add_message` / `rename_chat` / memory updates addressed at
//! an unknown id) are silent no-ops by contract, not errors.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::watch;
use tracing::warn;

use super::persist::{PersistedState, StateFile};
use super::types::{AppState, Chat, Memory, Message, ModelRole, Theme};

pub struct StateStore {
    inner: Mutex<AppState>,
    file: StateFile,
    /// Observable side effect of [`set_theme`](Self::set_theme) — the shell
    /// chrome subscribes and toggles its dark-mode flag on change.
    theme_tx: watch::Sender<Theme>,
}

impl StateStore {
    /// Load the durable blob from `work_dir` and build the live state.
    /// `active_chat` and `is_processing` always start fresh.
    pub fn open(work_dir: &Path) -> Self {
        let file = StateFile::new(work_dir);
        let persisted = file.load();
        let state = AppState {
            settings: persisted.settings,
            chats: persisted.chats,
            memories: persisted.memories,
            active_chat: None,
            is_processing: false,
        };
        let (theme_tx, _) = watch::channel(state.settings.theme);
        Self {
            inner: Mutex::new(state),
            file,
            theme_tx,
        }
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> AppState {
        self.lock().clone()
    }

    /// Subscribe to theme changes (the document-level dark-mode toggle).
    pub fn subscribe_theme(&self) -> watch::Receiver<Theme> {
        self.theme_tx.subscribe()
    }

    // ── Settings operations ───────────────────────────────────────────

    pub fn set_api_key(&self, key: impl Into<String>) {
        let key = key.into();
        self.commit(|mut state| {
            state.settings.api_key = key;
            state
        });
    }

    pub fn set_theme(&self, theme: Theme) {
        self.commit(|mut state| {
            state.settings.theme = theme;
            state
        });
        self.theme_tx.send_replace(theme);
    }

    pub fn set_model(&self, role: ModelRole, model: impl Into<String>) {
        let model = model.into();
        self.commit(|mut state| {
            match role {
                ModelRole::Strategist => state.settings.model.strategist = model,
                ModelRole::Worker => state.settings.model.worker = model,
            }
            state
        });
    }

    // ── Chat operations ───────────────────────────────────────────────

    /// Append a fresh chat with the default title and no messages.
    /// Callers observe the result via [`snapshot`](Self::snapshot).
    pub fn create_chat(&self) {
        self.commit(|mut state| {
            state.chats.push(Chat::new());
            state
        });
    }

    /// Point `active_chat` at `id`. Deliberately unvalidated — the pointer
    /// may dangle and consumers null-check, matching the UI contract.
    pub fn set_active_chat(&self, id: impl Into<String>) {
        let id = id.into();
        self.commit(|mut state| {
            state.active_chat = Some(id);
            state
        });
    }

    /// Remove a chat and its messages. Clears `active_chat` if it pointed at
    /// the deleted chat.
    pub fn delete_chat(&self, id: &str) {
        self.commit(|mut state| {
            state.chats.retain(|chat| chat.id != id);
            if state.active_chat.as_deref() == Some(id) {
                state.active_chat = None;
            }
            state
        });
    }

    pub fn rename_chat(&self, id: &str, new_title: impl Into<String>) {
        let new_title = new_title.into();
        self.commit(|mut state| {
            if let Some(chat) = state.chats.iter_mut().find(|chat| chat.id == id) {
                chat.title = new_title;
            }
            state
        });
    }

    /// Append `message` to the chat and bump `lastUpdated`. No-op if the
    /// chat does not exist.
    pub fn add_message(&self, chat_id: &str, message: Message) {
        self.commit(|mut state| {
            if let Some(chat) = state.chats.iter_mut().find(|chat| chat.id == chat_id) {
                chat.messages.push(message);
                chat.last_updated = Utc::now();
            }
            state
        });
    }

    // ── Memory operations ─────────────────────────────────────────────

    pub fn add_memory(&self, mut memory: Memory) {
        memory.importance = memory.importance.clamp(0.0, 1.0);
        self.commit(|mut state| {
            state.memories.push(memory);
            state
        });
    }

    /// No-op if the memory does not exist; values clamp to [0, 1].
    pub fn update_memory_importance(&self, id: &str, importance: f64) {
        self.commit(|mut state| {
            if let Some(memory) = state.memories.iter_mut().find(|m| m.id == id) {
                memory.importance = importance.clamp(0.0, 1.0);
            }
            state
        });
    }

    pub fn delete_memory(&self, id: &str) {
        self.commit(|mut state| {
            state.memories.retain(|memory| memory.id != id);
            state
        });
    }

    // ── Processing flag ───────────────────────────────────────────────

    /// Atomically flip `is_processing` from false to true. Returns `false`
    /// (and changes nothing) when a call is already in flight — the
    /// orchestrator's concurrency guard.
    pub fn try_begin_processing(&self) -> bool {
        let mut state = self.lock();
        if state.is_processing {
            return false;
        }
        state.is_processing = true;
        true
    }

    /// Clear `is_processing`. Called on both success and failure paths.
    pub fn end_processing(&self) {
        self.lock().is_processing = false;
    }

    pub fn is_processing(&self) -> bool {
        self.lock().is_processing
    }

    // ── Internals ─────────────────────────────────────────────────────

    /// Apply one pure transition and persist the durable subset.
    fn commit(&self, step: impl FnOnce(AppState) -> AppState) {
        let mut guard = self.lock();
        let next = step(std::mem::take(&mut *guard));
        *guard = next;
        let snapshot = PersistedState {
            settings: guard.settings.clone(),
            chats: guard.chats.clone(),
            memories: guard.memories.clone(),
        };
        // Fire-and-forget by contract: persistence failure never fails a
        // mutation.
        if let Err(e) = self.file.save(&snapshot) {
            warn!(error = %e, "state persist failed");
        }
    }

    fn lock(&self) -> MutexGuard<'_, AppState> {
        // Transitions never panic while holding the lock; if one ever does,
        // recover the data rather than poisoning every later call.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
