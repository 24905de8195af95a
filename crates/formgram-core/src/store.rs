//! Settings store implementations.

use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::{errors::Error, ports::SettingsStore, settings::GlobalSettings, Result};

/// In-process store, for embedding hosts and tests.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Mutex<GlobalSettings>,
}

impl MemorySettingsStore {
    pub fn new(settings: GlobalSettings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<GlobalSettings> {
        let guard = self
            .settings
            .lock()
            .map_err(|_| Error::External("settings lock poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, settings: &GlobalSettings) -> Result<()> {
        let mut guard = self
            .settings
            .lock()
            .map_err(|_| Error::External("settings lock poisoned".to_string()))?;
        *guard = settings.clone();
        Ok(())
    }
}

/// Settings kept as a JSON document on disk.
#[derive(Clone, Debug)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
}

impl JsonFileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileSettingsStore {
    fn load(&self) -> Result<GlobalSettings> {
        if !self.path.exists() {
            return Ok(GlobalSettings::default());
        }
        let txt = std::fs::read_to_string(&self.path)?;
        if txt.trim().is_empty() {
            return Ok(GlobalSettings::default());
        }
        Ok(serde_json::from_str(&txt)?)
    }

    /// Writes to a sibling temp file and renames it over the target, so a
    /// reader never sees a half-written record. The file holds the bot token
    /// and is created owner-only (0600 on unix).
    fn save(&self, settings: &GlobalSettings) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let txt = serde_json::to_string_pretty(settings)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(txt.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
