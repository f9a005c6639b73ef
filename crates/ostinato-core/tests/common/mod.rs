#![allow(dead_code)]

use ostinato_ports::engine::{EngineError, EngineSpec, SynthEngine};
use ostinato_ports::memory::MEMORY_MAP_SIZE;
use ostinato_ports::resample::{ResampleError, Resampler, ResamplerFactory, ResamplerSpec};
use ostinato_ports::sample::{NativeSliceMut, SampleFormat};
use ostinato_ports::types::Timestamp;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineCall {
    Msg { msg: u32, timestamp: Timestamp },
    Sysex { data: Vec<u8>, timestamp: Timestamp },
    Render { frames: usize },
}

pub type CallLog = Arc<Mutex<Vec<EngineCall>>>;

/// Records every call; renders a deterministic ramp.
pub struct MockEngine {
    spec: EngineSpec,
    open: bool,
    fail_open: bool,
    rendered: u64,
    calls: CallLog,
    memory: Vec<u8>,
}

impl MockEngine {
    pub fn new(native_rate_hz: u32, sample_format: SampleFormat, max_block_frames: usize) -> (Self, CallLog) {
        let calls = CallLog::default();
        let engine = Self {
            spec: EngineSpec {
                native_rate_hz,
                sample_format,
                max_block_frames,
            },
            open: false,
            fail_open: false,
            rendered: 0,
            calls: calls.clone(),
            memory: default_memory(),
        };
        (engine, calls)
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }
}

pub fn default_memory() -> Vec<u8> {
    (0..MEMORY_MAP_SIZE).map(|addr| (addr % 251) as u8).collect()
}

/// Left sample of native frame `n` as rendered by `MockEngine`.
pub fn ramp_left(n: u64) -> i16 {
    (n % 1000) as i16
}

pub fn ramp_right(n: u64) -> i16 {
    -((n % 1000) as i16)
}

impl SynthEngine for MockEngine {
    fn spec(&self) -> EngineSpec {
        self.spec
    }

    fn open(&mut self) -> Result<(), EngineError> {
        if self.fail_open {
            return Err(EngineError::RomUnavailable("control.rom".to_string()));
        }
        self.open = true;
        self.rendered = 0;
        self.memory = default_memory();
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn render(&mut self, out: NativeSliceMut<'_>) {
        let frames = out.frames();
        assert!(frames <= self.spec.max_block_frames, "render exceeded block cap");
        self.calls.lock().push(EngineCall::Render { frames });
        match out {
            NativeSliceMut::Int16(samples) => {
                for (i, frame) in samples.chunks_exact_mut(2).enumerate() {
                    let n = self.rendered + i as u64;
                    frame[0] = ramp_left(n);
                    frame[1] = ramp_right(n);
                }
            }
            NativeSliceMut::Float32(samples) => {
                for (i, frame) in samples.chunks_exact_mut(2).enumerate() {
                    let n = self.rendered + i as u64;
                    frame[0] = f32::from(ramp_left(n)) / 1000.0;
                    frame[1] = f32::from(ramp_right(n)) / 1000.0;
                }
            }
        }
        self.rendered += frames as u64;
    }

    fn play_msg(&mut self, msg: u32, timestamp: Timestamp) -> bool {
        self.calls.lock().push(EngineCall::Msg { msg, timestamp });
        true
    }

    fn play_sysex(&mut self, data: &[u8], timestamp: Timestamp) -> bool {
        self.calls.lock().push(EngineCall::Sysex {
            data: data.to_vec(),
            timestamp,
        });
        true
    }

    fn read_memory(&self, address: u32, out: &mut [u8]) {
        let start = (address as usize).min(self.memory.len());
        let end = (start + out.len()).min(self.memory.len());
        out[..end - start].copy_from_slice(&self.memory[start..end]);
    }

    fn write_memory(&mut self, address: u32, data: &[u8]) {
        let start = (address as usize).min(self.memory.len());
        let end = (start + data.len()).min(self.memory.len());
        self.memory[start..end].copy_from_slice(&data[..end - start]);
    }
}

pub fn render_frames(calls: &CallLog) -> Vec<usize> {
    calls
        .lock()
        .iter()
        .filter_map(|call| match call {
            EngineCall::Render { frames } => Some(*frames),
            _ => None,
        })
        .collect()
}

/// Nearest-sample resampler with a fixed output chunk.
pub struct FakeResampler {
    input_frames: usize,
    output_frames: usize,
}

impl FakeResampler {
    pub fn new(spec: ResamplerSpec, output_frames: usize) -> Self {
        let input_frames = ((output_frames as f64) / spec.output_per_input()).round() as usize;
        Self {
            input_frames: input_frames.max(1),
            output_frames,
        }
    }
}

impl Resampler for FakeResampler {
    fn input_frames_next(&self) -> usize {
        self.input_frames
    }

    fn input_frames_max(&self) -> usize {
        self.input_frames
    }

    fn output_frames_max(&self) -> usize {
        self.output_frames
    }

    fn process(&mut self, input: [&[f32]; 2], output: [&mut [f32]; 2]) -> Result<usize, ResampleError> {
        let [out_l, out_r] = output;
        for i in 0..self.output_frames {
            let src = i * self.input_frames / self.output_frames;
            out_l[i] = input[0][src];
            out_r[i] = input[1][src];
        }
        Ok(self.output_frames)
    }

    fn reset(&mut self) -> Result<(), ResampleError> {
        Ok(())
    }
}

pub struct FakeFactory {
    pub output_frames: usize,
}

impl ResamplerFactory for FakeFactory {
    fn create(&self, spec: ResamplerSpec) -> Result<Box<dyn Resampler>, ResampleError> {
        Ok(Box::new(FakeResampler::new(spec, self.output_frames)))
    }
}

pub struct FailingFactory;

impl ResamplerFactory for FailingFactory {
    fn create(&self, _spec: ResamplerSpec) -> Result<Box<dyn Resampler>, ResampleError> {
        Err(ResampleError::Construction("unsupported ratio".to_string()))
    }
}

/// Scripted fault injection around `FakeResampler`.
pub struct FlakyResampler {
    pub inner: FakeResampler,
    /// Process calls (1-based) that fail.
    pub fail_on: Vec<usize>,
    pub reset_fails: bool,
    pub calls: usize,
    pub resets: Arc<Mutex<usize>>,
}

impl Resampler for FlakyResampler {
    fn input_frames_next(&self) -> usize {
        self.inner.input_frames_next()
    }

    fn input_frames_max(&self) -> usize {
        self.inner.input_frames_max()
    }

    fn output_frames_max(&self) -> usize {
        self.inner.output_frames_max()
    }

    fn process(&mut self, input: [&[f32]; 2], output: [&mut [f32]; 2]) -> Result<usize, ResampleError> {
        self.calls += 1;
        if self.fail_on.contains(&self.calls) {
            return Err(ResampleError::Process("injected"));
        }
        self.inner.process(input, output)
    }

    fn reset(&mut self) -> Result<(), ResampleError> {
        *self.resets.lock() += 1;
        if self.reset_fails {
            Err(ResampleError::Reset("injected"))
        } else {
            Ok(())
        }
    }
}

/// Builds `FlakyResampler`s over a 16-frame `FakeResampler`.
pub struct FlakyFactory {
    pub fail_on: Vec<usize>,
    pub reset_fails: bool,
}

impl ResamplerFactory for FlakyFactory {
    fn create(&self, spec: ResamplerSpec) -> Result<Box<dyn Resampler>, ResampleError> {
        Ok(Box::new(FlakyResampler {
            inner: FakeResampler::new(spec, 16),
            fail_on: self.fail_on.clone(),
            reset_fails: self.reset_fails,
            calls: 0,
            resets: Arc::default(),
        }))
    }
}
