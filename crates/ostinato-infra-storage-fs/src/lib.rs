use ostinato_ports::memory::region_by_key;
use ostinato_ports::storage::{SessionSettings, Snapshot, StorageError, StoragePort};
use std::fs;
use std::path::{Path, PathBuf};

/// JSON files under one base directory: `settings.json` plus `snapshots/<name>.json`.
pub struct FsStorage {
    base_dir: PathBuf,
}

impl FsStorage {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn default_base_dir() -> Result<PathBuf, StorageError> {
        let base = dirs_next::config_dir()
            .ok_or_else(|| StorageError::Io("config dir not found".to_string()))?;
        Ok(base.join("Ostinato"))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn settings_path(&self) -> PathBuf {
        self.base_dir.join("settings.json")
    }

    fn snapshot_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !name.starts_with('.');
        if !valid {
            return Err(StorageError::Rejected {
                key: name.to_string(),
                reason: "snapshot names may only contain letters, digits, '-', '_' and '.'"
                    .to_string(),
            });
        }
        Ok(self.base_dir.join("snapshots").join(format!("{name}.json")))
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
        let data = fs::read(path).map_err(|e| StorageError::Io(e.to_string()))?;
        serde_json::from_slice(&data).map_err(|e| StorageError::Serde(e.to_string()))
    }

    fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        let data =
            serde_json::to_vec_pretty(value).map_err(|e| StorageError::Serde(e.to_string()))?;
        fs::write(path, data).map_err(|e| StorageError::Io(e.to_string()))
    }
}

impl Default for FsStorage {
    fn default() -> Self {
        let base_dir = Self::default_base_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { base_dir }
    }
}

impl StoragePort for FsStorage {
    fn load_settings(&self) -> Result<SessionSettings, StorageError> {
        let path = self.settings_path();
        if !path.exists() {
            return Ok(SessionSettings::default());
        }
        Self::read_json(&path)
    }

    fn save_settings(&self, s: &SessionSettings) -> Result<(), StorageError> {
        let path = self.settings_path();
        Self::write_json(&path, s)
    }

    fn load_snapshot(&self, name: &str) -> Result<Option<Snapshot>, StorageError> {
        let path = self.snapshot_path(name)?;
        if !path.exists() {
            log::debug!("no snapshot named {name} in {}", self.base_dir.display());
            return Ok(None);
        }
        let mut snapshot: Snapshot = Self::read_json(&path)?;
        snapshot.regions.retain(|blob| {
            let known = region_by_key(&blob.key).is_some();
            if !known {
                log::warn!("snapshot {name}: dropping unknown region {}", blob.key);
            }
            known
        });
        Ok(Some(snapshot))
    }

    fn save_snapshot(&self, name: &str, snapshot: &Snapshot) -> Result<(), StorageError> {
        let path = self.snapshot_path(name)?;
        Self::write_json(&path, snapshot)?;
        log::info!(
            "saved snapshot {name} ({} regions) to {}",
            snapshot.regions.len(),
            path.display()
        );
        Ok(())
    }
}
