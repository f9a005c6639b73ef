use crate::sample::{NativeSliceMut, SampleFormat};
use crate::types::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("rom unavailable: {0}")]
    RomUnavailable(String),
    #[error("engine failed to open: {0}")]
    OpenFailed(String),
}

/// Fixed properties an engine declares about its output.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineSpec {
    pub native_rate_hz: u32,
    pub sample_format: SampleFormat,
    /// Largest frame count accepted by a single `render` call.
    pub max_block_frames: usize,
}

/// Voice counts for one part, reported on every poly state change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolyStats {
    pub polys: u32,
    pub non_releasing: u32,
}

pub type TextCallback = Box<dyn FnMut(&str) + Send>;
pub type SignalCallback = Box<dyn FnMut() + Send>;
pub type ByteCallback = Box<dyn FnMut(u8) + Send>;
pub type PolyCallback = Box<dyn FnMut(u8, PolyStats) + Send>;
pub type ProgramCallback = Box<dyn FnMut(u8, u8, &str) + Send>;

/// Capability set an engine uses to report what happens inside it.
///
/// One optional closure per report kind, supplied when the engine is built.
/// Kinds left unset are written to the `log` facade. Callbacks fired from
/// `render` run on the audio thread and must not block.
#[derive(Default)]
pub struct ReportHandler {
    pub on_debug: Option<TextCallback>,
    pub on_open_error: Option<TextCallback>,
    pub on_lcd_message: Option<TextCallback>,
    pub on_midi_message_played: Option<SignalCallback>,
    pub on_device_reset: Option<SignalCallback>,
    pub on_device_reconfig: Option<SignalCallback>,
    pub on_reverb_mode: Option<ByteCallback>,
    pub on_reverb_time: Option<ByteCallback>,
    pub on_reverb_level: Option<ByteCallback>,
    pub on_poly_state_changed: Option<PolyCallback>,
    pub on_program_changed: Option<ProgramCallback>,
}

impl ReportHandler {
    pub fn debug(&mut self, message: &str) {
        match self.on_debug.as_mut() {
            Some(cb) => cb(message),
            None => log::debug!("engine: {message}"),
        }
    }

    pub fn open_error(&mut self, message: &str) {
        match self.on_open_error.as_mut() {
            Some(cb) => cb(message),
            None => log::error!("engine open error: {message}"),
        }
    }

    pub fn lcd_message(&mut self, message: &str) {
        match self.on_lcd_message.as_mut() {
            Some(cb) => cb(message),
            None => log::info!("LCD message: {message}"),
        }
    }

    pub fn midi_message_played(&mut self) {
        if let Some(cb) = self.on_midi_message_played.as_mut() {
            cb();
        }
    }

    pub fn device_reset(&mut self) {
        match self.on_device_reset.as_mut() {
            Some(cb) => cb(),
            None => log::info!("engine: device reset"),
        }
    }

    pub fn device_reconfig(&mut self) {
        match self.on_device_reconfig.as_mut() {
            Some(cb) => cb(),
            None => log::debug!("engine: device reconfigured"),
        }
    }

    pub fn reverb_mode(&mut self, mode: u8) {
        match self.on_reverb_mode.as_mut() {
            Some(cb) => cb(mode),
            None => log::debug!("engine: reverb mode {mode}"),
        }
    }

    pub fn reverb_time(&mut self, time: u8) {
        match self.on_reverb_time.as_mut() {
            Some(cb) => cb(time),
            None => log::debug!("engine: reverb time {time}"),
        }
    }

    pub fn reverb_level(&mut self, level: u8) {
        match self.on_reverb_level.as_mut() {
            Some(cb) => cb(level),
            None => log::debug!("engine: reverb level {level}"),
        }
    }

    pub fn poly_state_changed(&mut self, part: u8, stats: PolyStats) {
        if let Some(cb) = self.on_poly_state_changed.as_mut() {
            cb(part, stats);
        }
    }

    pub fn program_changed(&mut self, part: u8, bank: u8, patch_name: &str) {
        match self.on_program_changed.as_mut() {
            Some(cb) => cb(part, bank, patch_name),
            None => log::debug!("engine: part {part} -> bank {bank} patch {patch_name:?}"),
        }
    }
}

/// Thread model:
/// - open / close / read_memory / write_memory run on the control thread
/// - render / play_msg / play_sysex run on the audio thread (must be realtime-safe)
///
/// The caller serialises the two; an engine is never used from both at once.
pub trait SynthEngine: Send {
    fn spec(&self) -> EngineSpec;

    fn open(&mut self) -> Result<(), EngineError>;
    fn close(&mut self);
    fn is_open(&self) -> bool;

    /// Fills `out` with `out.frames()` frames; never more than `max_block_frames`.
    fn render(&mut self, out: NativeSliceMut<'_>);

    /// Queues a packed short message. Returns false if the engine rejected it.
    fn play_msg(&mut self, msg: u32, timestamp: Timestamp) -> bool;
    /// Queues a complete sysex message, leading 0xF0 included.
    fn play_sysex(&mut self, data: &[u8], timestamp: Timestamp) -> bool;

    fn read_memory(&self, address: u32, out: &mut [u8]);
    fn write_memory(&mut self, address: u32, data: &[u8]);
}
