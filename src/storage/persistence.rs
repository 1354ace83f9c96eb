//! State stores
//!
//! `StateStore` is the persistence collaborator the session talks to. The
//! file store keeps a single JSON file in the platform data directory and
//! writes it atomically; the memory store backs tests and ephemeral runs.

use super::state::PersistedState;
use crate::config::APP_NAME;
use crate::error::{Error, Result};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

/// State file name inside the data directory
const STATE_FILE_NAME: &str = "state.json";

/// Temporary file written before the rename
const STATE_TEMP_NAME: &str = "state.json.tmp";

/// Durable storage for the session state.
pub trait StateStore {
    /// Read the stored state. Nothing stored yet yields the default.
    fn load(&self) -> Result<PersistedState>;

    /// Replace the stored state.
    fn save(&mut self, state: &PersistedState) -> Result<()>;

    /// Where the state lives, for display.
    fn location(&self) -> String;
}

// ─────────────────────────────────────────────────────────────────────────────
// File Store
// ─────────────────────────────────────────────────────────────────────────────

/// Get the platform-specific data directory for the application.
///
/// - **Windows**: `%APPDATA%\lexdoka\`
/// - **macOS**: `~/Library/Application Support/lexdoka/`
/// - **Linux**: `~/.local/share/lexdoka/`
pub fn get_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|base| base.join(APP_NAME))
        .ok_or(Error::DataDirNotFound)
}

/// JSON file store.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `override_path`, or at the default location in the data
    /// directory.
    pub fn open(override_path: Option<&Path>) -> Result<Self> {
        match override_path {
            Some(path) => Ok(Self::new(path)),
            None => Ok(Self::new(get_data_dir()?.join(STATE_FILE_NAME))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<PersistedState> {
        if !self.path.exists() {
            debug!("No state file at {}, starting empty", self.path.display());
            return Ok(PersistedState::default());
        }

        let contents = fs::read_to_string(&self.path).map_err(|e| Error::StateLoad {
            path: self.path.clone(),
            source: Box::new(e),
        })?;
        if contents.trim().is_empty() {
            debug!("State file is empty, starting empty");
            return Ok(PersistedState::default());
        }

        let state = PersistedState::from_json(&contents)?;
        info!(
            "Loaded state from {} ({} variables)",
            self.path.display(),
            state.positioned_variables.len()
        );
        Ok(state)
    }

    fn save(&mut self, state: &PersistedState) -> Result<()> {
        let dir = self.path.parent().map(Path::to_path_buf).unwrap_or_default();
        if !dir.as_os_str().is_empty() && !dir.exists() {
            debug!("Creating data directory: {}", dir.display());
            fs::create_dir_all(&dir).map_err(|e| Error::StateSave {
                path: dir.clone(),
                source: Box::new(e),
            })?;
        }

        let json = state.to_json()?;
        let temp_path = dir.join(STATE_TEMP_NAME);
        fs::write(&temp_path, &json).map_err(|e| Error::StateSave {
            path: temp_path.clone(),
            source: Box::new(e),
        })?;
        fs::rename(&temp_path, &self.path).map_err(|e| Error::StateSave {
            path: self.path.clone(),
            source: Box::new(e),
        })?;

        debug!("Saved state to {}", self.path.display());
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Store
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory store. Keeps the serialized form so loads go through the same
/// parser as files.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    json: Option<String>,
    saves: usize,
    fail_writes: bool,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from raw JSON, as if read from a file.
    pub fn with_json(json: impl Into<String>) -> Self {
        Self {
            json: Some(json.into()),
            ..Self::default()
        }
    }

    /// Make every following save fail.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<PersistedState> {
        match &self.json {
            Some(json) if !json.trim().is_empty() => PersistedState::from_json(json),
            _ => Ok(PersistedState::default()),
        }
    }

    fn save(&mut self, state: &PersistedState) -> Result<()> {
        if self.fail_writes {
            return Err(Error::StateSave {
                path: PathBuf::from("<memory>"),
                source: "writes disabled".into(),
            });
        }
        self.json = Some(state.to_json()?);
        self.saves += 1;
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::{create_canvas_capsule, CanvasOverrides, VariableType};
    use chrono::Utc;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_state() -> PersistedState {
        PersistedState {
            document_tree: Some(json!({
                "type": "doc",
                "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": "Hi" }] }]
            })),
            positioned_variables: vec![create_canvas_capsule(
                VariableType::RichText,
                CanvasOverrides::default(),
            )],
            last_saved_at: Some(Utc::now()),
        }
    }

    #[test]
    fn test_file_store_first_load_is_default() {
        let temp = TempDir::new().unwrap();
        let store = FileStateStore::new(temp.path().join("state.json"));
        assert_eq!(store.load().unwrap(), PersistedState::default());
    }

    #[test]
    fn test_file_store_save_then_load() {
        let temp = TempDir::new().unwrap();
        let mut store = FileStateStore::new(temp.path().join("nested").join("state.json"));
        let state = sample_state();
        store.save(&state).unwrap();

        assert_eq!(store.load().unwrap(), state);
        assert!(!temp.path().join("nested").join(STATE_TEMP_NAME).exists());
    }

    #[test]
    fn test_file_store_empty_file_is_default() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");
        fs::write(&path, "  \n").unwrap();
        let store = FileStateStore::new(&path);
        assert_eq!(store.load().unwrap(), PersistedState::default());
    }

    #[test]
    fn test_file_store_corrupt_file_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");
        fs::write(&path, "{ broken").unwrap();
        let store = FileStateStore::new(&path);
        assert!(matches!(store.load(), Err(Error::StateParse { .. })));
    }

    #[test]
    fn test_open_with_override() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.json");
        let store = FileStateStore::open(Some(&path)).unwrap();
        assert_eq!(store.path(), path.as_path());
    }

    #[test]
    fn test_data_dir_contains_app_name() {
        if let Ok(dir) = get_data_dir() {
            assert!(dir.ends_with(APP_NAME));
        }
    }

    #[test]
    fn test_memory_store_roundtrip_and_failure() {
        let mut store = MemoryStateStore::new();
        assert_eq!(store.load().unwrap(), PersistedState::default());

        let state = sample_state();
        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), state);
        assert_eq!(store.save_count(), 1);

        store.set_fail_writes(true);
        assert!(matches!(store.save(&PersistedState::default()), Err(Error::StateSave { .. })));
        assert_eq!(store.load().unwrap(), state);
    }
}
