use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum ResampleError {
    #[error("resampler construction failed: {0}")]
    Construction(String),
    #[error("resampler processing failed: {0}")]
    Process(&'static str),
    #[error("resampler reset failed: {0}")]
    Reset(&'static str),
}

impl ResampleError {
    /// Static description, usable where formatting would allocate.
    pub fn fault(&self) -> &'static str {
        match self {
            ResampleError::Construction(_) => "resampler construction failed",
            ResampleError::Process(reason) | ResampleError::Reset(reason) => reason,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResamplerQuality {
    #[default]
    Fastest,
    Balanced,
    Best,
}

/// Parameters for building a stereo streaming resampler.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResamplerSpec {
    pub input_rate_hz: f64,
    pub output_rate_hz: f64,
    pub quality: ResamplerQuality,
    /// Upper bound on frames produced by one `process` call.
    pub max_output_frames: usize,
}

impl ResamplerSpec {
    pub fn output_per_input(&self) -> f64 {
        self.output_rate_hz / self.input_rate_hz
    }
}

/// Streaming two-channel resampler over f32 samples.
///
/// All buffers are sized at construction; `process` and `reset` are called
/// from the audio thread.
pub trait Resampler: Send {
    /// Frames the next `process` call consumes from each input channel.
    fn input_frames_next(&self) -> usize;
    /// Upper bound of `input_frames_next` over the resampler's lifetime.
    fn input_frames_max(&self) -> usize;
    /// Upper bound of frames produced by a single `process` call.
    fn output_frames_max(&self) -> usize;

    /// Consumes exactly `input_frames_next()` frames per channel and returns
    /// the number of frames written to each output channel.
    fn process(&mut self, input: [&[f32]; 2], output: [&mut [f32]; 2]) -> Result<usize, ResampleError>;

    /// Drops internal history and starts a fresh stream.
    fn reset(&mut self) -> Result<(), ResampleError>;
}

pub trait ResamplerFactory: Send + Sync {
    fn create(&self, spec: ResamplerSpec) -> Result<Box<dyn Resampler>, ResampleError>;
}
