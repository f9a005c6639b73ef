use ostinato_ports::sample::SampleFormat;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleSynthConfig {
    pub native_rate_hz: u32,
    pub sample_format: SampleFormat,
    pub max_block_frames: usize,
    /// Voices per part; the oldest voice is stolen beyond this.
    pub max_voices: usize,
    /// Pending timestamped messages; `play_*` returns false when full.
    pub queue_capacity: usize,
    /// Bytes reserved for sysex payloads waiting in the queue.
    pub sysex_buffer_bytes: usize,
    pub rom_seed: u64,
}

impl Default for SimpleSynthConfig {
    fn default() -> Self {
        Self {
            native_rate_hz: 32_000,
            sample_format: SampleFormat::Int16,
            max_block_frames: 4096,
            max_voices: 32,
            queue_capacity: 1024,
            sysex_buffer_bytes: 32 * 1024,
            rom_seed: 0x4d54_3332,
        }
    }
}
