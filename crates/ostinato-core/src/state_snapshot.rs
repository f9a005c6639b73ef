//! Region-by-region save and restore. Control thread only.

use ostinato_ports::engine::SynthEngine;
use ostinato_ports::memory::{MemoryRegion, STATE_REGIONS};
use ostinato_ports::storage::{StateSink, StateSource, StorageError};
use serde::Serialize;

#[derive(thiserror::Error, Debug)]
pub enum SnapshotError {
    #[error("engine is not open")]
    EngineNotOpen,
    #[error("failed to store region {key}: {source}")]
    Store {
        key: &'static str,
        #[source]
        source: StorageError,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RegionOutcome {
    Restored { bytes: usize },
    /// The stored blob was larger than the region; only the region was written.
    Truncated { stored: usize, written: usize },
    Missing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RegionRestore {
    pub key: &'static str,
    pub outcome: RegionOutcome,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub regions: Vec<RegionRestore>,
}

impl RestoreReport {
    pub fn truncated(&self) -> impl Iterator<Item = &RegionRestore> {
        self.regions
            .iter()
            .filter(|region| matches!(region.outcome, RegionOutcome::Truncated { .. }))
    }

    pub fn restored_count(&self) -> usize {
        self.regions
            .iter()
            .filter(|region| region.outcome != RegionOutcome::Missing)
            .count()
    }
}

pub fn save(engine: &dyn SynthEngine, sink: &mut dyn StateSink) -> Result<usize, SnapshotError> {
    save_regions(engine, &STATE_REGIONS, sink)
}

pub fn restore(
    engine: &mut dyn SynthEngine,
    source: &dyn StateSource,
) -> Result<RestoreReport, SnapshotError> {
    restore_regions(engine, &STATE_REGIONS, source)
}

/// Stops at the first sink failure; later regions are not read.
pub fn save_regions(
    engine: &dyn SynthEngine,
    regions: &[MemoryRegion],
    sink: &mut dyn StateSink,
) -> Result<usize, SnapshotError> {
    if !engine.is_open() {
        return Err(SnapshotError::EngineNotOpen);
    }

    let largest = regions.iter().map(|region| region.size as usize).max().unwrap_or(0);
    let mut scratch = vec![0u8; largest];
    for (stored, region) in regions.iter().enumerate() {
        let data = &mut scratch[..region.size as usize];
        engine.read_memory(region.address, data);
        let result = sink.store(region.key, data);
        log::debug!(
            "storing region {}: {:08x} {:08x} -> {}",
            region.key,
            region.address,
            region.size,
            if result.is_ok() { "ok" } else { "failed" }
        );
        if let Err(source) = result {
            log::error!("saving state aborted after {stored} regions");
            return Err(SnapshotError::Store {
                key: region.key,
                source,
            });
        }
    }
    Ok(regions.len())
}

pub fn restore_regions(
    engine: &mut dyn SynthEngine,
    regions: &[MemoryRegion],
    source: &dyn StateSource,
) -> Result<RestoreReport, SnapshotError> {
    if !engine.is_open() {
        return Err(SnapshotError::EngineNotOpen);
    }

    let mut report = RestoreReport {
        regions: Vec::with_capacity(regions.len()),
    };
    for region in regions {
        let outcome = match source.retrieve(region.key) {
            None => RegionOutcome::Missing,
            Some(data) => {
                let limit = region.size as usize;
                let outcome = if data.len() > limit {
                    log::warn!(
                        "retrieved data for region {} larger than expected ({} > {})",
                        region.key,
                        data.len(),
                        limit
                    );
                    RegionOutcome::Truncated {
                        stored: data.len(),
                        written: limit,
                    }
                } else {
                    RegionOutcome::Restored { bytes: data.len() }
                };
                engine.write_memory(region.address, &data[..data.len().min(limit)]);
                outcome
            }
        };
        log::debug!(
            "retrieving region {}: {:08x} {:08x} -> {:?}",
            region.key,
            region.address,
            region.size,
            outcome
        );
        report.regions.push(RegionRestore {
            key: region.key,
            outcome,
        });
    }
    Ok(report)
}
