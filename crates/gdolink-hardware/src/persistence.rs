//! Durable storage for the restart record.
//!
//! Only a handful of values need to survive a power cycle: the rolling
//! transmit counter (the motor unit will ignore us if it ever rewinds),
//! the provisioned client id, and two restore flags. Everything else is
//! recovered from a status sync.
//!
//! Load failures are deliberately soft: a missing or corrupt record yields
//! `None`/defaults, the engine starts from zero state and re-syncs. The
//! bus tolerates that; crashing over a bad file would not be an
//! improvement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::warn;

use crate::error::{HardwareError, Result};

/// The persisted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredState {
    /// Rolling transmit counter at save time.
    pub rolling_counter: u32,

    /// Provisioned client id, if it differs from the factory default.
    #[serde(default)]
    pub client_id: Option<u32>,

    /// Re-arm the time-to-close countdown after restart.
    #[serde(default)]
    pub restore_ttc: bool,

    /// Re-enable hold-open after restart.
    #[serde(default)]
    pub restore_hold: bool,

    /// Last programmed time-to-close duration, for `restore_ttc`.
    #[serde(default)]
    pub ttc_seconds: Option<u16>,

    /// When this record was written.
    pub saved_at: DateTime<Utc>,
}

impl StoredState {
    /// Create a record for the given counter with current timestamp.
    #[must_use]
    pub fn new(rolling_counter: u32) -> Self {
        Self {
            rolling_counter,
            client_id: None,
            restore_ttc: false,
            restore_hold: false,
            ttc_seconds: None,
            saved_at: Utc::now(),
        }
    }
}

/// Durable load/save of the restart record.
pub trait PreferenceStore {
    /// Load the stored record.
    ///
    /// Returns `Ok(None)` when nothing has been stored yet. A corrupt
    /// record is also reported as `Ok(None)` after logging; the caller
    /// falls back to defaults either way.
    ///
    /// # Errors
    /// Returns an error only when the store itself is unusable (for
    /// example an unreadable directory); callers treat that the same as
    /// an empty store.
    fn load(&self) -> Result<Option<StoredState>>;

    /// Save the record, replacing any previous one.
    ///
    /// # Errors
    /// Returns an error if the record could not be written durably.
    fn save(&self, state: &StoredState) -> Result<()>;
}

/// In-memory store for tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryPreferences {
    slot: Arc<Mutex<Option<StoredState>>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a pre-populated record.
    #[must_use]
    pub fn with_state(state: StoredState) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(state))),
        }
    }

    /// Inspect the stored record without going through the trait.
    pub fn stored(&self) -> Option<StoredState> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl PreferenceStore for MemoryPreferences {
    fn load(&self) -> Result<Option<StoredState>> {
        self.slot
            .lock()
            .map(|slot| slot.clone())
            .map_err(|_| HardwareError::preference("memory store poisoned"))
    }

    fn save(&self, state: &StoredState) -> Result<()> {
        self.slot
            .lock()
            .map(|mut slot| *slot = Some(state.clone()))
            .map_err(|_| HardwareError::preference("memory store poisoned"))
    }
}

/// JSON-file-backed store.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-save leaves the previous record intact.
#[derive(Debug, Clone)]
pub struct FilePreferences {
    path: PathBuf,
}

impl FilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the record file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for FilePreferences {
    fn load(&self) -> Result<Option<StoredState>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_str(&contents) {
            Ok(state) => Ok(Some(state)),
            Err(err) => {
                warn!(path = %self.path.display(), %err, "discarding corrupt preference record");
                Ok(None)
            }
        }
    }

    fn save(&self, state: &StoredState) -> Result<()> {
        let contents = serde_json::to_string_pretty(state)
            .map_err(|err| HardwareError::preference(err.to_string()))?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("gdolink-prefs-{tag}-{}.json", std::process::id()))
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryPreferences::new();
        assert!(store.load().unwrap().is_none());

        let mut state = StoredState::new(1234);
        state.client_id = Some(0x42);
        store.save(&state).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.rolling_counter, 1234);
        assert_eq!(loaded.client_id, Some(0x42));
        assert!(!loaded.restore_ttc);
    }

    #[test]
    fn test_file_store_round_trip() {
        let path = temp_path("round-trip");
        let store = FilePreferences::new(&path);
        assert!(store.load().unwrap().is_none());

        let mut state = StoredState::new(998877);
        state.restore_hold = true;
        store.save(&state).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.rolling_counter, 998877);
        assert!(loaded.restore_hold);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_file_store_corrupt_record_is_discarded() {
        let path = temp_path("corrupt");
        fs::write(&path, "{not json").unwrap();

        let store = FilePreferences::new(&path);
        assert!(store.load().unwrap().is_none());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_stored_state_serde_defaults() {
        // Old records without the optional fields still deserialize.
        let json = r#"{"rolling_counter": 5, "saved_at": "2025-06-01T00:00:00Z"}"#;
        let state: StoredState = serde_json::from_str(json).unwrap();
        assert_eq!(state.rolling_counter, 5);
        assert_eq!(state.client_id, None);
        assert!(!state.restore_ttc);
        assert!(!state.restore_hold);
    }
}
