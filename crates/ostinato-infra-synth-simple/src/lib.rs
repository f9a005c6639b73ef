//! A small sine-voice engine speaking the same memory map and sysex dialect
//! as the devices the session layer is built for.
//!
//! It renders at a fixed native rate, queues timestamped input and reports
//! what happens through a [`ReportHandler`].

mod config;
mod memory;
mod queue;
pub mod sysex;
mod voice;

pub use config::SimpleSynthConfig;
pub use memory::{MemoryImage, PART_COUNT, RHYTHM_PART};

use memory::{
    PATCH_FINE_TUNE, PATCH_KEY_SHIFT, PATCH_OUTPUT_LEVEL, PATCH_PANPOT, SYSTEM_CHANNEL_ASSIGN,
    SYSTEM_MASTER_VOLUME, SYSTEM_REVERB_LEVEL, SYSTEM_REVERB_MODE, SYSTEM_REVERB_TIME,
};
use ostinato_ports::engine::{EngineError, EngineSpec, ReportHandler, SynthEngine};
use ostinato_ports::event::unpack_short_message;
use ostinato_ports::memory::{mem_addr, MEMORY_MAP_SIZE, SYSTEM_REGION};
use ostinato_ports::sample::{NativeSliceMut, INT16_FULL_SCALE};
use ostinato_ports::types::Timestamp;
use queue::{EventQueue, Payload};
use std::f32::consts::FRAC_PI_2;
use sysex::{parse_data_set, DISPLAY_ADDRESS, DISPLAY_LEN, RESET_ADDRESS};
use voice::{NoteSetup, Part};

const CC_VOLUME: u8 = 7;
const CC_SUSTAIN: u8 = 64;
const CC_ALL_NOTES_OFF: u8 = 123;

pub struct SimpleSynth {
    config: SimpleSynthConfig,
    open: bool,
    rendered: Timestamp,
    queue: EventQueue,
    state: State,
}

/// Everything the event handlers touch; kept apart from the queue so a
/// queued sysex payload can be borrowed while the state is mutated.
struct State {
    sample_rate_hz: f32,
    rom: MemoryImage,
    memory: MemoryImage,
    parts: Vec<Part>,
    channel_parts: [Option<usize>; 16],
    display: [u8; DISPLAY_LEN],
    mix_l: Vec<f32>,
    mix_r: Vec<f32>,
    reports: ReportHandler,
}

impl SimpleSynth {
    pub fn new(config: SimpleSynthConfig, reports: ReportHandler) -> Self {
        let rom = MemoryImage::rom(config.rom_seed);
        let memory = rom.clone();
        Self {
            open: false,
            rendered: 0,
            queue: EventQueue::new(0, 0),
            state: State {
                sample_rate_hz: config.native_rate_hz as f32,
                rom,
                memory,
                parts: Vec::new(),
                channel_parts: [None; 16],
                display: [b' '; DISPLAY_LEN],
                mix_l: Vec::new(),
                mix_r: Vec::new(),
                reports,
            },
            config,
        }
    }

    pub fn config(&self) -> &SimpleSynthConfig {
        &self.config
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Native frames rendered since `open`.
    pub fn rendered_frames(&self) -> Timestamp {
        self.rendered
    }

    pub fn display_text(&self) -> &str {
        std::str::from_utf8(&self.state.display).unwrap_or("")
    }

    fn validate(&self) -> Result<(), EngineError> {
        let config = &self.config;
        if config.native_rate_hz == 0 {
            return Err(EngineError::OpenFailed("native rate must be non-zero".to_string()));
        }
        if config.max_block_frames == 0 {
            return Err(EngineError::OpenFailed("max block frames must be non-zero".to_string()));
        }
        if config.queue_capacity == 0 {
            return Err(EngineError::OpenFailed("event queue capacity must be non-zero".to_string()));
        }
        Ok(())
    }
}

impl Default for SimpleSynth {
    fn default() -> Self {
        Self::new(SimpleSynthConfig::default(), ReportHandler::default())
    }
}

impl State {
    fn rebuild_channel_map(&mut self) {
        self.channel_parts = [None; 16];
        for part in 0..PART_COUNT {
            let channel = self.memory.system(SYSTEM_CHANNEL_ASSIGN + part as u32) as usize;
            if channel < self.channel_parts.len() && self.channel_parts[channel].is_none() {
                self.channel_parts[channel] = Some(part);
            }
        }
    }

    fn reset(&mut self) {
        self.memory.copy_from(&self.rom);
        for part in &mut self.parts {
            part.silence();
        }
        self.display = [b' '; DISPLAY_LEN];
        self.rebuild_channel_map();
        self.reports.device_reset();
    }

    fn note_setup(&self, part: usize) -> NoteSetup {
        NoteSetup {
            sample_rate_hz: self.sample_rate_hz,
            key_shift: i32::from(self.memory.patch_temp(part, PATCH_KEY_SHIFT)) - 24,
            fine_tune: f32::from(self.memory.patch_temp(part, PATCH_FINE_TUNE)) - 50.0,
            percussive: part == RHYTHM_PART,
        }
    }

    fn short_message(&mut self, msg: u32) {
        let (status, data1, data2) = unpack_short_message(msg);
        if !(0x80..0xF0).contains(&status) {
            return;
        }
        let Some(part) = self.channel_parts[usize::from(status & 0x0F)] else {
            return;
        };

        match status & 0xF0 {
            0x80 => self.note_off(part, data1),
            0x90 if data2 == 0 => self.note_off(part, data1),
            0x90 => {
                let setup = self.note_setup(part);
                self.parts[part].note_on(data1, data2, setup);
            }
            0xB0 => match data1 {
                CC_VOLUME => self.parts[part].set_volume(data2),
                CC_SUSTAIN => self.parts[part].sustain(data2 >= 64),
                CC_ALL_NOTES_OFF => self.parts[part].all_notes_off(),
                _ => {}
            },
            0xC0 => self.program_change(part, data1),
            _ => {}
        }
        self.reports.midi_message_played();
    }

    fn note_off(&mut self, part: usize, note: u8) {
        if part != RHYTHM_PART {
            self.parts[part].note_off(note);
        }
    }

    fn program_change(&mut self, part: usize, program: u8) {
        if part == RHYTHM_PART {
            return;
        }
        let bank = self.memory.select_patch(part, program);
        self.reports
            .program_changed(part as u8, bank, self.memory.timbre_temp_name(part));
    }

    fn sysex(&mut self, message: &[u8]) {
        let set = match parse_data_set(message) {
            Ok(set) => set,
            Err(reason) => {
                self.reports.debug(reason.describe());
                return;
            }
        };

        if set.address == RESET_ADDRESS {
            self.reset();
            return;
        }
        if (DISPLAY_ADDRESS..DISPLAY_ADDRESS + DISPLAY_LEN as u32).contains(&set.address) {
            self.show_text((set.address - DISPLAY_ADDRESS) as usize, set.data);
            return;
        }

        let address = mem_addr(set.address);
        if address >= MEMORY_MAP_SIZE {
            self.reports.debug("sysex write to unmapped address");
            return;
        }
        let written = self.memory.write(address, set.data) as u32;
        let end = address + written;
        if address < SYSTEM_REGION.end() && end > SYSTEM_REGION.address {
            self.system_written(address.max(SYSTEM_REGION.address), end.min(SYSTEM_REGION.end()));
        }
    }

    fn system_written(&mut self, start: u32, end: u32) {
        let touched = |offset: u32| (start..end).contains(&(SYSTEM_REGION.address + offset));
        if touched(SYSTEM_REVERB_MODE) {
            self.reports.reverb_mode(self.memory.system(SYSTEM_REVERB_MODE));
        }
        if touched(SYSTEM_REVERB_TIME) {
            self.reports.reverb_time(self.memory.system(SYSTEM_REVERB_TIME));
        }
        if touched(SYSTEM_REVERB_LEVEL) {
            self.reports.reverb_level(self.memory.system(SYSTEM_REVERB_LEVEL));
        }
        if (0..PART_COUNT as u32).any(|part| touched(SYSTEM_CHANNEL_ASSIGN + part)) {
            self.rebuild_channel_map();
            self.reports.device_reconfig();
        }
    }

    fn show_text(&mut self, offset: usize, text: &[u8]) {
        let end = (offset + text.len()).min(DISPLAY_LEN);
        for (slot, byte) in self.display[offset..end].iter_mut().zip(text) {
            *slot = if byte.is_ascii_graphic() || *byte == b' ' { *byte } else { b' ' };
        }
        let message = std::str::from_utf8(&self.display).unwrap_or("");
        self.reports.lcd_message(message);
    }

    fn report_poly_changes(&mut self) {
        for (index, part) in self.parts.iter_mut().enumerate() {
            if let Some(stats) = part.take_changed_stats() {
                self.reports.poly_state_changed(index as u8, stats);
            }
        }
    }

    /// Renders `frames` frames of every part into the mix buffers.
    fn mix(&mut self, frames: usize) {
        let left = &mut self.mix_l[..frames];
        let right = &mut self.mix_r[..frames];
        left.fill(0.0);
        right.fill(0.0);

        let master = f32::from(self.memory.system(SYSTEM_MASTER_VOLUME).min(100)) / 100.0;
        for (index, part) in self.parts.iter_mut().enumerate() {
            let level = f32::from(self.memory.patch_temp(index, PATCH_OUTPUT_LEVEL).min(100)) / 100.0;
            let pan = f32::from(self.memory.patch_temp(index, PATCH_PANPOT).min(14)) / 14.0;
            let gain = master * level * part.volume();
            let (gain_l, gain_r) = ((pan * FRAC_PI_2).cos() * gain, (pan * FRAC_PI_2).sin() * gain);
            part.render_add(self.sample_rate_hz, gain_l, gain_r, left, right);
        }
    }
}

fn write_mix(out: &mut NativeSliceMut<'_>, left: &[f32], right: &[f32]) {
    match out {
        NativeSliceMut::Int16(samples) => {
            for (frame, (l, r)) in samples.chunks_exact_mut(2).zip(left.iter().zip(right)) {
                frame[0] = (l * INT16_FULL_SCALE) as i16;
                frame[1] = (r * INT16_FULL_SCALE) as i16;
            }
        }
        NativeSliceMut::Float32(samples) => {
            for (frame, (l, r)) in samples.chunks_exact_mut(2).zip(left.iter().zip(right)) {
                frame[0] = *l;
                frame[1] = *r;
            }
        }
    }
}

impl SynthEngine for SimpleSynth {
    fn spec(&self) -> EngineSpec {
        EngineSpec {
            native_rate_hz: self.config.native_rate_hz,
            sample_format: self.config.sample_format,
            max_block_frames: self.config.max_block_frames,
        }
    }

    fn open(&mut self) -> Result<(), EngineError> {
        if self.open {
            return Ok(());
        }
        if let Err(err) = self.validate() {
            self.state.reports.open_error(&err.to_string());
            return Err(err);
        }

        let config = &self.config;
        self.queue = EventQueue::new(config.queue_capacity, config.sysex_buffer_bytes);
        self.state.sample_rate_hz = config.native_rate_hz as f32;
        self.state.parts = (0..PART_COUNT).map(|_| Part::new(config.max_voices)).collect();
        self.state.mix_l = vec![0.0; config.max_block_frames];
        self.state.mix_r = vec![0.0; config.max_block_frames];
        self.state.memory.copy_from(&self.state.rom);
        self.state.display = [b' '; DISPLAY_LEN];
        self.state.rebuild_channel_map();
        self.rendered = 0;
        self.open = true;
        log::info!(
            "simple synth open: {} Hz, {:?}, {} voices per part",
            config.native_rate_hz,
            config.sample_format,
            config.max_voices
        );
        Ok(())
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.queue.clear();
        for part in &mut self.state.parts {
            part.silence();
        }
        self.open = false;
        log::info!("simple synth closed after {} frames", self.rendered);
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn render(&mut self, mut out: NativeSliceMut<'_>) {
        let frames = out.frames();
        if !self.open {
            out.mute();
            return;
        }

        let mut done = 0;
        while done < frames {
            let now = self.rendered;
            while let Some(event) = self.queue.pop_due(now) {
                match event.payload {
                    Payload::Short(msg) => self.state.short_message(msg),
                    Payload::Sysex { start, len } => {
                        self.state.sysex(self.queue.sysex_bytes(start, len))
                    }
                }
            }

            let mut segment = (frames - done).min(self.state.mix_l.len());
            if let Some(next) = self.queue.next_timestamp() {
                segment = segment.min(next.saturating_sub(now).max(1) as usize);
            }
            self.state.mix(segment);
            write_mix(
                &mut out.frame_range(done, done + segment),
                &self.state.mix_l[..segment],
                &self.state.mix_r[..segment],
            );
            done += segment;
            self.rendered += segment as u64;
        }
        self.state.report_poly_changes();
    }

    fn play_msg(&mut self, msg: u32, timestamp: Timestamp) -> bool {
        self.open && self.queue.push_short(timestamp, msg)
    }

    fn play_sysex(&mut self, data: &[u8], timestamp: Timestamp) -> bool {
        self.open && !data.is_empty() && self.queue.push_sysex(timestamp, data)
    }

    fn read_memory(&self, address: u32, out: &mut [u8]) {
        self.state.memory.read(address, out);
    }

    fn write_memory(&mut self, address: u32, data: &[u8]) {
        self.state.memory.write(address, data);
        if self.open {
            self.state.rebuild_channel_map();
        }
    }
}
