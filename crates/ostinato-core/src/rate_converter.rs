use ostinato_ports::engine::{EngineSpec, SynthEngine};
use ostinato_ports::resample::{
    ResampleError, Resampler, ResamplerFactory, ResamplerQuality, ResamplerSpec,
};
use ostinato_ports::sample::{NativeBuffer, NativeSliceMut};
use ostinato_ports::types::RateRatio;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConverterCounters {
    pub native_frames_pulled: u64,
    pub native_frames_consumed: u64,
    pub host_frames_produced: u64,
    pub resets: u32,
    pub faults: u32,
    pub last_fault: Option<&'static str>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ConverterState {
    Running,
    Silent,
}

/// Pull-model adapter from the engine's native rate to the host rate.
///
/// Faults are only counted; `Session::log_render_faults` reports them from
/// the control thread.
pub struct RateConverter {
    resampler: Option<Box<dyn Resampler>>,
    // Set instead of dropping the resampler on the audio thread.
    disabled: bool,
    ratio: RateRatio,
    max_block_frames: usize,
    in_buffer_size: usize,
    native_scratch: NativeBuffer,
    input_l: Vec<f32>,
    input_r: Vec<f32>,
    input_len: usize,
    output_l: Vec<f32>,
    output_r: Vec<f32>,
    output_pos: usize,
    output_len: usize,
    recovering: bool,
    counters: ConverterCounters,
}

impl RateConverter {
    pub fn new(
        factory: &dyn ResamplerFactory,
        engine: EngineSpec,
        host_rate_hz: f64,
        quality: ResamplerQuality,
    ) -> Self {
        let ratio = RateRatio::new(f64::from(engine.native_rate_hz), host_rate_hz);
        let spec = ResamplerSpec {
            input_rate_hz: ratio.native_rate_hz,
            output_rate_hz: ratio.host_rate_hz,
            quality,
            max_output_frames: engine.max_block_frames,
        };
        Self::with_resampler(factory.create(spec), engine, ratio)
    }

    pub fn with_resampler(
        resampler: Result<Box<dyn Resampler>, ResampleError>,
        engine: EngineSpec,
        ratio: RateRatio,
    ) -> Self {
        let max_block_frames = engine.max_block_frames;
        let resampler = if max_block_frames == 0 {
            Err(ResampleError::Construction("engine declares a zero block size".to_string()))
        } else {
            resampler
        };
        let resampler = match resampler {
            Ok(resampler) => Some(resampler),
            Err(err) => {
                log::error!("rate converter disabled, output will be silent: {err}");
                None
            }
        };
        let (input_capacity, output_capacity) = resampler
            .as_ref()
            .map(|r| (r.input_frames_max() + max_block_frames, r.output_frames_max()))
            .unwrap_or((0, 0));

        Self {
            resampler,
            disabled: false,
            ratio,
            max_block_frames,
            in_buffer_size: max_block_frames,
            native_scratch: NativeBuffer::with_frames(engine.sample_format, max_block_frames),
            input_l: vec![0.0; input_capacity],
            input_r: vec![0.0; input_capacity],
            input_len: 0,
            output_l: vec![0.0; output_capacity],
            output_r: vec![0.0; output_capacity],
            output_pos: 0,
            output_len: 0,
            recovering: false,
            counters: ConverterCounters::default(),
        }
    }

    pub fn state(&self) -> ConverterState {
        if self.resampler.is_some() && !self.disabled {
            ConverterState::Running
        } else {
            ConverterState::Silent
        }
    }

    pub fn ratio(&self) -> RateRatio {
        self.ratio
    }

    pub fn counters(&self) -> ConverterCounters {
        self.counters
    }

    /// Writes exactly `length` frames into `buffer`, clamped to its capacity.
    pub fn get_output_samples(
        &mut self,
        engine: &mut dyn SynthEngine,
        mut buffer: NativeSliceMut<'_>,
        length: usize,
    ) {
        let length = length.min(buffer.frames());
        if self.state() == ConverterState::Silent {
            buffer.frame_range(0, length).mute();
            return;
        }

        let mut written = 0;
        while written < length {
            if self.output_pos == self.output_len {
                let remaining = length - written;
                self.in_buffer_size = (remaining as f64 * self.ratio.native_per_host + 0.5) as usize;
                if !self.refill(engine) {
                    buffer.frame_range(written, length).mute();
                    return;
                }
                continue;
            }

            let frames = (self.output_len - self.output_pos).min(length - written);
            let end = self.output_pos + frames;
            buffer
                .frame_range(written, written + frames)
                .write_float(&self.output_l[self.output_pos..end], &self.output_r[self.output_pos..end]);
            self.output_pos = end;
            written += frames;
            self.counters.host_frames_produced += frames as u64;
        }
    }

    // Returns false once the converter has gone silent.
    fn refill(&mut self, engine: &mut dyn SynthEngine) -> bool {
        if self.disabled {
            return false;
        }
        let needed = match self.resampler.as_ref() {
            Some(resampler) => resampler.input_frames_next(),
            None => return false,
        };
        if needed > self.input_l.len() {
            self.disable("resampler asked for more input than it declared");
            return false;
        }
        while self.input_len < needed {
            self.pull_input(engine);
        }

        let result = match self.resampler.as_mut() {
            Some(resampler) => resampler.process(
                [&self.input_l[..needed], &self.input_r[..needed]],
                [&mut self.output_l[..], &mut self.output_r[..]],
            ),
            None => return false,
        };

        self.input_l.copy_within(needed..self.input_len, 0);
        self.input_r.copy_within(needed..self.input_len, 0);
        self.input_len -= needed;
        self.counters.native_frames_consumed += needed as u64;

        match result {
            Ok(0) => self.recover("resampler produced no frames"),
            Ok(frames) => {
                self.output_pos = 0;
                self.output_len = frames.min(self.output_l.len());
                self.recovering = false;
                true
            }
            Err(err) => self.recover(err.fault()),
        }
    }

    // One reset per fault; a second fault before any output disables the converter.
    fn recover(&mut self, reason: &'static str) -> bool {
        self.counters.faults += 1;
        self.counters.last_fault = Some(reason);
        if self.recovering {
            self.disable("resampler failed again after reset");
            return false;
        }
        let reset = match self.resampler.as_mut() {
            Some(resampler) => resampler.reset(),
            None => return false,
        };
        match reset {
            Ok(()) => {
                self.recovering = true;
                self.counters.resets += 1;
                self.input_len = 0;
                self.output_pos = 0;
                self.output_len = 0;
                true
            }
            Err(err) => {
                self.disable(err.fault());
                false
            }
        }
    }

    fn disable(&mut self, reason: &'static str) {
        self.counters.last_fault = Some(reason);
        self.disabled = true;
        self.output_pos = 0;
        self.output_len = 0;
    }

    fn pull_input(&mut self, engine: &mut dyn SynthEngine) {
        let space = self.input_l.len() - self.input_len;
        let frames = self.in_buffer_size.clamp(1, self.max_block_frames).min(space);
        let mut block = self.native_scratch.frames_mut(frames);
        engine.render(block.reborrow());
        block.read_float(
            &mut self.input_l[self.input_len..],
            &mut self.input_r[self.input_len..],
        );
        self.input_len += frames;
        self.counters.native_frames_pulled += frames as u64;
    }
}
