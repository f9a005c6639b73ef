use ostinato_ports::resample::{
    ResampleError, Resampler, ResamplerFactory, ResamplerQuality, ResamplerSpec,
};
use rubato::{
    Resampler as _, SincFixedOut, SincInterpolationParameters, SincInterpolationType,
    WindowFunction,
};

const CHANNELS: usize = 2;
const MAX_CHUNK_FRAMES: usize = 1024;

/// Band-limited sinc resampler producing a fixed number of frames per pass.
pub struct RubatoResampler {
    inner: SincFixedOut<f32>,
}

impl RubatoResampler {
    pub fn new(spec: ResamplerSpec) -> Result<Self, ResampleError> {
        if !(spec.input_rate_hz > 0.0 && spec.output_rate_hz > 0.0) {
            return Err(ResampleError::Construction(format!(
                "invalid rates {} -> {}",
                spec.input_rate_hz, spec.output_rate_hz
            )));
        }
        if spec.max_output_frames == 0 {
            return Err(ResampleError::Construction("zero output chunk".to_string()));
        }

        let chunk_size = spec.max_output_frames.min(MAX_CHUNK_FRAMES);
        let inner = SincFixedOut::<f32>::new(
            spec.output_per_input(),
            1.0,
            interpolation_parameters(spec.quality),
            chunk_size,
            CHANNELS,
        )
        .map_err(|e| ResampleError::Construction(e.to_string()))?;
        log::debug!(
            "rubato sinc resampler {} -> {} Hz, {:?}, {} frames per pass",
            spec.input_rate_hz,
            spec.output_rate_hz,
            spec.quality,
            chunk_size
        );
        Ok(Self { inner })
    }
}

fn interpolation_parameters(quality: ResamplerQuality) -> SincInterpolationParameters {
    match quality {
        ResamplerQuality::Fastest => SincInterpolationParameters {
            sinc_len: 64,
            f_cutoff: 0.91,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 64,
            window: WindowFunction::BlackmanHarris2,
        },
        ResamplerQuality::Balanced => SincInterpolationParameters {
            sinc_len: 128,
            f_cutoff: 0.925,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 128,
            window: WindowFunction::BlackmanHarris2,
        },
        ResamplerQuality::Best => SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Cubic,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        },
    }
}

impl Resampler for RubatoResampler {
    fn input_frames_next(&self) -> usize {
        self.inner.input_frames_next()
    }

    fn input_frames_max(&self) -> usize {
        self.inner.input_frames_max()
    }

    fn output_frames_max(&self) -> usize {
        self.inner.output_frames_max()
    }

    fn process(&mut self, input: [&[f32]; 2], mut output: [&mut [f32]; 2]) -> Result<usize, ResampleError> {
        let (_, produced) = self
            .inner
            .process_into_buffer(&input[..], &mut output[..], None)
            .map_err(|_| ResampleError::Process("rubato rejected the channel buffers"))?;
        Ok(produced)
    }

    fn reset(&mut self) -> Result<(), ResampleError> {
        self.inner.reset();
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RubatoFactory;

impl ResamplerFactory for RubatoFactory {
    fn create(&self, spec: ResamplerSpec) -> Result<Box<dyn Resampler>, ResampleError> {
        Ok(Box::new(RubatoResampler::new(spec)?))
    }
}
