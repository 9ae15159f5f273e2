//! Durable state blob — `state.json` under the work dir.
//!
//! One file holds `{settings, chats, memories}` and is rewritten after every
//! mutation. Loading runs the loaded JSON through a deep merge over the
//! serialized defaults (defaults lowest precedence), so settings fields
//! introduced after the blob was written come up populated without
//! discarding stored user data. `active_chat` / `is_processing` are
//! session-only and never touch this file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::AppError;
use super::types::{Chat, Memory, Settings};

const STATE_FILENAME: &str = "state.json";

/// The durable subset of [`AppState`](super::types::AppState).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedState {
    pub settings: Settings,
    pub chats: Vec<Chat>,
    pub memories: Vec<Memory>,
}

/// Handle to the on-disk blob.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(work_dir: &Path) -> Self {
        Self {
            path: work_dir.join(STATE_FILENAME),
        }
    }

    /// Load and migrate the blob. Missing or unreadable blobs degrade to
    /// defaults — a broken state file must never stop the shell from starting.
    pub fn load(&self) -> PersistedState {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(_) => {
                debug!(path = %self.path.display(), "no state blob, starting from defaults");
                return PersistedState::default();
            }
        };
        match serde_json::from_str::<Value>(&text) {
            Ok(loaded) => migrate(loaded),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt state blob, starting from defaults");
                PersistedState::default()
            }
        }
    }

    pub fn save(&self, state: &PersistedState) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Store(format!("cannot create {}: {e}", parent.display())))?;
        }
        let data = serde_json::to_string_pretty(state)
            .map_err(|e| AppError::Store(format!("serialise state: {e}")))?;
        fs::write(&self.path, data)
            .map_err(|e| AppError::Store(format!("cannot write {}: {e}", self.path.display())))
    }
}

/// Merge a loaded blob over the defaults and deserialize the result.
pub fn migrate(loaded: Value) -> PersistedState {
    let defaults =
        serde_json::to_value(PersistedState::default()).unwrap_or(Value::Null);
    let merged = deep_merge(defaults, loaded);
    match serde_json::from_value(merged) {
        Ok(state) => state,
        Err(e) => {
            warn!(error = %e, "state blob failed migration, starting from defaults");
            PersistedState::default()
        }
    }
}

/// Recursive key-wise merge: objects merge per key with `loaded` winning,
/// anything else (arrays included) is replaced wholesale by `loaded`.
fn deep_merge(defaults: Value, loaded: Value) -> Value {
    match (defaults, loaded) {
        (Value::Object(mut base), Value::Object(over)) => {
            for (key, value) in over {
                let merged = match base.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, loaded) => loaded,
    }
}
