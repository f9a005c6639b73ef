use crate::resample::ResamplerQuality;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_notification_capacity() -> usize {
    256
}

fn default_max_sysex_bytes() -> usize {
    512
}

fn default_forward_reports() -> bool {
    true
}

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serde(String),
    #[error("store rejected {key}: {reason}")]
    Rejected { key: String, reason: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub resampler_quality: ResamplerQuality,
    #[serde(default = "default_notification_capacity")]
    pub notification_capacity: usize,
    #[serde(default = "default_max_sysex_bytes")]
    pub max_sysex_bytes: usize,
    #[serde(default = "default_forward_reports")]
    pub forward_reports: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            resampler_quality: ResamplerQuality::Fastest,
            notification_capacity: default_notification_capacity(),
            max_sysex_bytes: default_max_sysex_bytes(),
            forward_reports: default_forward_reports(),
        }
    }
}

/// One saved memory region.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionBlob {
    pub key: String,
    pub data: Vec<u8>,
}

/// Ordered set of region blobs as produced by a save.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub regions: Vec<RegionBlob>,
}

/// Destination for saved region blobs.
pub trait StateSink {
    fn store(&mut self, key: &str, data: &[u8]) -> Result<(), StorageError>;
}

/// Lookup of previously saved region blobs; `None` means nothing was stored.
pub trait StateSource {
    fn retrieve(&self, key: &str) -> Option<&[u8]>;
}

impl StateSink for Snapshot {
    fn store(&mut self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        match self.regions.iter_mut().find(|blob| blob.key == key) {
            Some(blob) => {
                blob.data.clear();
                blob.data.extend_from_slice(data);
            }
            None => self.regions.push(RegionBlob {
                key: key.to_string(),
                data: data.to_vec(),
            }),
        }
        Ok(())
    }
}

impl StateSource for Snapshot {
    fn retrieve(&self, key: &str) -> Option<&[u8]> {
        self.regions
            .iter()
            .find(|blob| blob.key == key)
            .map(|blob| blob.data.as_slice())
    }
}

impl StateSink for HashMap<String, Vec<u8>> {
    fn store(&mut self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.insert(key.to_string(), data.to_vec());
        Ok(())
    }
}

impl StateSource for HashMap<String, Vec<u8>> {
    fn retrieve(&self, key: &str) -> Option<&[u8]> {
        self.get(key).map(Vec::as_slice)
    }
}

pub trait StoragePort: Send + Sync {
    fn load_settings(&self) -> Result<SessionSettings, StorageError>;
    fn save_settings(&self, s: &SessionSettings) -> Result<(), StorageError>;

    fn load_snapshot(&self, name: &str) -> Result<Option<Snapshot>, StorageError>;
    fn save_snapshot(&self, name: &str, snapshot: &Snapshot) -> Result<(), StorageError>;
}
