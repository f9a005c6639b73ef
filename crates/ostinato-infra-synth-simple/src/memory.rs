//! The engine's parameter memory and the ROM image it starts from.

use ostinato_ports::memory::{
    MEMORY_MAP_SIZE, PADDED_TIMBRE_SIZE, PATCHES_REGION, PATCH_PARAM_SIZE, PATCH_TEMP_REGION,
    PATCH_TEMP_SIZE, RHYTHM_TEMP_REGION, RHYTHM_TEMP_SIZE, SYSTEM_REGION, TIMBRES_REGION,
    TIMBRE_PARAM_SIZE, TIMBRE_TEMP_REGION,
};

pub const PART_COUNT: usize = 9;
pub const RHYTHM_PART: usize = 8;
pub const TIMBRE_NAME_LEN: usize = 10;

// Offsets inside the System area.
pub const SYSTEM_MASTER_TUNE: u32 = 0x00;
pub const SYSTEM_REVERB_MODE: u32 = 0x01;
pub const SYSTEM_REVERB_TIME: u32 = 0x02;
pub const SYSTEM_REVERB_LEVEL: u32 = 0x03;
pub const SYSTEM_PARTIAL_RESERVE: u32 = 0x04;
pub const SYSTEM_CHANNEL_ASSIGN: u32 = 0x0D;
pub const SYSTEM_MASTER_VOLUME: u32 = 0x16;

// Offsets inside one part's patch temp entry.
pub const PATCH_TIMBRE_GROUP: u32 = 0;
pub const PATCH_TIMBRE_NUMBER: u32 = 1;
pub const PATCH_KEY_SHIFT: u32 = 2;
pub const PATCH_FINE_TUNE: u32 = 3;
pub const PATCH_OUTPUT_LEVEL: u32 = 8;
pub const PATCH_PANPOT: u32 = 9;

const DEFAULT_PARTIAL_RESERVE: [u8; PART_COUNT] = [3, 10, 6, 4, 3, 0, 0, 0, 6];
const GROUP_LETTERS: [u8; 4] = *b"ABMR";

/// Byte-addressed parameter memory covering the whole region table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryImage {
    bytes: Vec<u8>,
}

impl MemoryImage {
    /// Factory contents derived from `seed`; the same seed always yields the same image.
    pub fn rom(seed: u64) -> Self {
        let mut image = Self {
            bytes: vec![0; MEMORY_MAP_SIZE as usize],
        };
        let mut rng = XorShift::new(seed);

        let timbre_count = TIMBRES_REGION.size / PADDED_TIMBRE_SIZE;
        for index in 0..timbre_count {
            let start = TIMBRES_REGION.address + index * PADDED_TIMBRE_SIZE;
            let name = timbre_name(index);
            image.write(start, &name);
            for offset in TIMBRE_NAME_LEN as u32..TIMBRE_PARAM_SIZE {
                image.bytes[(start + offset) as usize] = rng.next_7bit();
            }
        }

        for patch in 0..PATCHES_REGION.size / PATCH_PARAM_SIZE {
            let entry = default_patch(patch);
            image.write(PATCHES_REGION.address + patch * PATCH_PARAM_SIZE, &entry);
        }

        for part in 0..PART_COUNT as u32 {
            let start = PATCH_TEMP_REGION.address + part * PATCH_TEMP_SIZE;
            if part < RHYTHM_PART as u32 {
                image.write(start, &default_patch(part));
            }
            image.write(start + PATCH_OUTPUT_LEVEL, &[80, 7]);
        }

        for key in 0..RHYTHM_TEMP_REGION.size / RHYTHM_TEMP_SIZE {
            let start = RHYTHM_TEMP_REGION.address + key * RHYTHM_TEMP_SIZE;
            image.write(start, &[(key % 64) as u8, 80, 7, 1]);
        }

        for part in 0..RHYTHM_PART as u32 {
            image.load_timbre_temp(part as usize);
        }

        let mut system = [0u8; SYSTEM_REGION.size as usize];
        system[SYSTEM_MASTER_TUNE as usize] = 0x4A;
        system[SYSTEM_REVERB_MODE as usize] = 0;
        system[SYSTEM_REVERB_TIME as usize] = 5;
        system[SYSTEM_REVERB_LEVEL as usize] = 3;
        let reserve = SYSTEM_PARTIAL_RESERVE as usize;
        system[reserve..reserve + PART_COUNT].copy_from_slice(&DEFAULT_PARTIAL_RESERVE);
        let channels = SYSTEM_CHANNEL_ASSIGN as usize;
        for part in 0..PART_COUNT {
            system[channels + part] = part as u8 + 1;
        }
        system[SYSTEM_MASTER_VOLUME as usize] = 100;
        image.write(SYSTEM_REGION.address, &system);

        image
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Copies from `address` into `out`; bytes past the map end are left as they are.
    pub fn read(&self, address: u32, out: &mut [u8]) -> usize {
        let start = (address as usize).min(self.bytes.len());
        let end = start.saturating_add(out.len()).min(self.bytes.len());
        out[..end - start].copy_from_slice(&self.bytes[start..end]);
        end - start
    }

    /// Writes `data` at `address`, dropping whatever falls past the map end.
    pub fn write(&mut self, address: u32, data: &[u8]) -> usize {
        let start = (address as usize).min(self.bytes.len());
        let end = start.saturating_add(data.len()).min(self.bytes.len());
        self.bytes[start..end].copy_from_slice(&data[..end - start]);
        end - start
    }

    pub fn copy_from(&mut self, other: &MemoryImage) {
        self.bytes.copy_from_slice(&other.bytes);
    }

    pub fn byte(&self, address: u32) -> u8 {
        self.bytes.get(address as usize).copied().unwrap_or(0)
    }

    pub fn system(&self, offset: u32) -> u8 {
        self.byte(SYSTEM_REGION.address + offset)
    }

    pub fn patch_temp(&self, part: usize, offset: u32) -> u8 {
        self.byte(PATCH_TEMP_REGION.address + part as u32 * PATCH_TEMP_SIZE + offset)
    }

    /// Copies stored patch `program` into the part's temp patch and loads its timbre.
    ///
    /// Returns the timbre group, used as the reported bank.
    pub fn select_patch(&mut self, part: usize, program: u8) -> u8 {
        let src = (PATCHES_REGION.address + u32::from(program & 0x7F) * PATCH_PARAM_SIZE) as usize;
        let dst = (PATCH_TEMP_REGION.address + part as u32 * PATCH_TEMP_SIZE) as usize;
        self.bytes
            .copy_within(src..src + PATCH_PARAM_SIZE as usize, dst);
        self.load_timbre_temp(part);
        self.patch_temp(part, PATCH_TIMBRE_GROUP) & 0x03
    }

    /// Name of the timbre currently loaded for `part`, trailing spaces removed.
    pub fn timbre_temp_name(&self, part: usize) -> &str {
        let start = (TIMBRE_TEMP_REGION.address + part as u32 * TIMBRE_PARAM_SIZE) as usize;
        let raw = self
            .bytes
            .get(start..start + TIMBRE_NAME_LEN)
            .unwrap_or_default();
        std::str::from_utf8(raw).unwrap_or("").trim_end()
    }

    fn load_timbre_temp(&mut self, part: usize) {
        if part >= RHYTHM_PART {
            return;
        }
        let group = u32::from(self.patch_temp(part, PATCH_TIMBRE_GROUP) & 0x03);
        let number = u32::from(self.patch_temp(part, PATCH_TIMBRE_NUMBER) & 0x3F);
        let src = (TIMBRES_REGION.address + (group * 64 + number) * PADDED_TIMBRE_SIZE) as usize;
        let dst = (TIMBRE_TEMP_REGION.address + part as u32 * TIMBRE_PARAM_SIZE) as usize;
        self.bytes
            .copy_within(src..src + TIMBRE_PARAM_SIZE as usize, dst);
    }
}

fn timbre_name(index: u32) -> [u8; TIMBRE_NAME_LEN] {
    let mut name = *b"Tone A-00 ";
    name[5] = GROUP_LETTERS[(index / 64) as usize % GROUP_LETTERS.len()];
    let number = index % 64;
    name[7] = b'0' + (number / 10) as u8;
    name[8] = b'0' + (number % 10) as u8;
    name
}

fn default_patch(patch: u32) -> [u8; PATCH_PARAM_SIZE as usize] {
    [(patch / 64) as u8, (patch % 64) as u8, 24, 50, 12, 0, 1, 0]
}

struct XorShift(u64);

impl XorShift {
    fn new(seed: u64) -> Self {
        Self(if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed })
    }

    fn next_7bit(&mut self) -> u8 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 >> 32) as u8 & 0x7F
    }
}
