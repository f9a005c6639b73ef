//! Fixed memory map shared by engines and the state snapshot.
//!
//! The region table is compiled in and never persisted; only region
//! contents are. Order and byte ranges are part of the snapshot contract.

pub const PATCH_TEMP_SIZE: u32 = 16;
pub const RHYTHM_TEMP_SIZE: u32 = 4;
pub const TIMBRE_PARAM_SIZE: u32 = 246;
pub const PATCH_PARAM_SIZE: u32 = 8;
pub const PADDED_TIMBRE_SIZE: u32 = 256;
pub const SYSTEM_SIZE: u32 = 23;

pub const STATE_URI_BASE: &str = "urn:ostinato:state";

/// Packs a 3x7-bit sysex address into a linear engine byte address.
pub const fn mem_addr(sysex_address: u32) -> u32 {
    ((sysex_address & 0x7f0000) >> 2) | ((sysex_address & 0x7f00) >> 1) | (sysex_address & 0x7f)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryRegion {
    pub key: &'static str,
    pub address: u32,
    pub size: u32,
}

impl MemoryRegion {
    pub const fn end(&self) -> u32 {
        self.address + self.size
    }
}

pub const PATCH_TEMP_REGION: MemoryRegion = MemoryRegion {
    key: "urn:ostinato:state#PatchTempMemoryRegion",
    address: mem_addr(0x030000),
    size: PATCH_TEMP_SIZE * 9,
};

pub const RHYTHM_TEMP_REGION: MemoryRegion = MemoryRegion {
    key: "urn:ostinato:state#RhythmTempMemoryRegion",
    address: mem_addr(0x030110),
    size: RHYTHM_TEMP_SIZE * 85,
};

pub const TIMBRE_TEMP_REGION: MemoryRegion = MemoryRegion {
    key: "urn:ostinato:state#TimbreTempMemoryRegion",
    address: mem_addr(0x040000),
    size: TIMBRE_PARAM_SIZE * 8,
};

pub const PATCHES_REGION: MemoryRegion = MemoryRegion {
    key: "urn:ostinato:state#PatchesMemoryRegion",
    address: mem_addr(0x050000),
    size: PATCH_PARAM_SIZE * 128,
};

pub const TIMBRES_REGION: MemoryRegion = MemoryRegion {
    key: "urn:ostinato:state#TimbresMemoryRegion",
    address: mem_addr(0x080000),
    size: PADDED_TIMBRE_SIZE * (64 + 64 + 64 + 64),
};

pub const SYSTEM_REGION: MemoryRegion = MemoryRegion {
    key: "urn:ostinato:state#SystemMemoryRegion",
    address: mem_addr(0x100000),
    size: SYSTEM_SIZE,
};

pub static STATE_REGIONS: [MemoryRegion; 6] = [
    PATCH_TEMP_REGION,
    RHYTHM_TEMP_REGION,
    TIMBRE_TEMP_REGION,
    PATCHES_REGION,
    TIMBRES_REGION,
    SYSTEM_REGION,
];

/// One past the highest byte covered by the region table.
pub const MEMORY_MAP_SIZE: u32 = SYSTEM_REGION.address + SYSTEM_REGION.size;

pub fn region_by_key(key: &str) -> Option<&'static MemoryRegion> {
    STATE_REGIONS.iter().find(|region| region.key == key)
}
