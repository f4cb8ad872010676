use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ArcadeError;

pub const CUSTOM_NOTES_KEY: &str = "customArcadeNotes";

/// String key-value store kept as one JSON object on disk.
#[derive(Debug, Clone)]
pub struct NotesStore {
    path: PathBuf,
}

impl NotesStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        NotesStore { path: path.into() }
    }

    /// `<data dir>/bitarcade/store.json`
    pub fn open_default() -> Result<Self, ArcadeError> {
        let dir = dirs::data_dir()
            .ok_or_else(|| ArcadeError::StoreError("No data directory on this system".to_string()))?;
        Ok(Self::open(dir.join("bitarcade").join("store.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, ArcadeError> {
        Ok(self.read_all()?.remove(key))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), ArcadeError> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ArcadeError::StoreError(format!("{}: {}", parent.display(), e)))?;
        }
        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| ArcadeError::StoreError(e.to_string()))?;
        std::fs::write(&self.path, json)
            .map_err(|e| ArcadeError::StoreError(format!("{}: {}", self.path.display(), e)))
    }

    pub fn load_custom_notes(&self) -> Result<Option<String>, ArcadeError> {
        self.get(CUSTOM_NOTES_KEY)
    }

    pub fn save_custom_notes(&self, text: &str) -> Result<(), ArcadeError> {
        self.set(CUSTOM_NOTES_KEY, text)
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, ArcadeError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(ArcadeError::StoreError(format!("{}: {}", self.path.display(), e))),
        };
        serde_json::from_str(&content)
            .map_err(|e| ArcadeError::StoreError(format!("Corrupt store {}: {}", self.path.display(), e)))
    }
}
