use serde::{Deserialize, Serialize};

/// Divisor that maps fixed-point engine output onto roughly [-1, 1].
pub const INT16_FULL_SCALE: f32 = 10_240.0;

const INT16_TO_FLOAT: f32 = 1.0 / 32_768.0;
const FLOAT_TO_INT16: f32 = 32_768.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleFormat {
    Int16,
    Float32,
}

/// Owned interleaved stereo buffer in an engine's native format.
///
/// Sized once outside the audio thread; slicing never allocates.
#[derive(Clone, Debug)]
pub enum NativeBuffer {
    Int16(Vec<i16>),
    Float32(Vec<f32>),
}

/// Borrowed interleaved stereo samples in an engine's native format.
#[derive(Debug)]
pub enum NativeSliceMut<'a> {
    Int16(&'a mut [i16]),
    Float32(&'a mut [f32]),
}

impl NativeBuffer {
    pub fn with_frames(format: SampleFormat, frames: usize) -> Self {
        match format {
            SampleFormat::Int16 => NativeBuffer::Int16(vec![0; frames * 2]),
            SampleFormat::Float32 => NativeBuffer::Float32(vec![0.0; frames * 2]),
        }
    }

    pub fn capacity_frames(&self) -> usize {
        match self {
            NativeBuffer::Int16(samples) => samples.len() / 2,
            NativeBuffer::Float32(samples) => samples.len() / 2,
        }
    }

    /// First `frames` frames; clamped to capacity.
    pub fn frames_mut(&mut self, frames: usize) -> NativeSliceMut<'_> {
        let samples = frames.min(self.capacity_frames()) * 2;
        match self {
            NativeBuffer::Int16(buffer) => NativeSliceMut::Int16(&mut buffer[..samples]),
            NativeBuffer::Float32(buffer) => NativeSliceMut::Float32(&mut buffer[..samples]),
        }
    }
}

impl<'a> NativeSliceMut<'a> {
    pub fn frames(&self) -> usize {
        match self {
            NativeSliceMut::Int16(samples) => samples.len() / 2,
            NativeSliceMut::Float32(samples) => samples.len() / 2,
        }
    }

    pub fn reborrow(&mut self) -> NativeSliceMut<'_> {
        match self {
            NativeSliceMut::Int16(samples) => NativeSliceMut::Int16(samples),
            NativeSliceMut::Float32(samples) => NativeSliceMut::Float32(samples),
        }
    }

    /// Frames `start..end` of this slice.
    pub fn frame_range(&mut self, start: usize, end: usize) -> NativeSliceMut<'_> {
        let end = end.min(self.frames());
        let start = start.min(end);
        match self {
            NativeSliceMut::Int16(samples) => NativeSliceMut::Int16(&mut samples[start * 2..end * 2]),
            NativeSliceMut::Float32(samples) => {
                NativeSliceMut::Float32(&mut samples[start * 2..end * 2])
            }
        }
    }

    pub fn mute(&mut self) {
        match self {
            NativeSliceMut::Int16(samples) => samples.fill(0),
            NativeSliceMut::Float32(samples) => samples.fill(0.0),
        }
    }

    /// Deinterleaves into float channels, normalising fixed-point samples to [-1, 1).
    pub fn read_float(&self, left: &mut [f32], right: &mut [f32]) {
        let frames = self.frames().min(left.len()).min(right.len());
        match self {
            NativeSliceMut::Int16(samples) => {
                for i in 0..frames {
                    left[i] = f32::from(samples[i * 2]) * INT16_TO_FLOAT;
                    right[i] = f32::from(samples[i * 2 + 1]) * INT16_TO_FLOAT;
                }
            }
            NativeSliceMut::Float32(samples) => {
                for i in 0..frames {
                    left[i] = samples[i * 2];
                    right[i] = samples[i * 2 + 1];
                }
            }
        }
    }

    /// Interleaves float channels into this slice, the inverse of [`Self::read_float`].
    ///
    /// Fixed-point conversion saturates at the i16 range.
    pub fn write_float(&mut self, left: &[f32], right: &[f32]) {
        let frames = self.frames().min(left.len()).min(right.len());
        match self {
            NativeSliceMut::Int16(samples) => {
                for i in 0..frames {
                    samples[i * 2] = (left[i] * FLOAT_TO_INT16) as i16;
                    samples[i * 2 + 1] = (right[i] * FLOAT_TO_INT16) as i16;
                }
            }
            NativeSliceMut::Float32(samples) => {
                for i in 0..frames {
                    samples[i * 2] = left[i];
                    samples[i * 2 + 1] = right[i];
                }
            }
        }
    }

    /// Converts to host output format, writing one sample per channel buffer.
    pub fn write_host(&self, out_l: &mut [f32], out_r: &mut [f32]) {
        let frames = self.frames().min(out_l.len()).min(out_r.len());
        match self {
            NativeSliceMut::Int16(samples) => {
                for i in 0..frames {
                    out_l[i] = f32::from(samples[i * 2]) / INT16_FULL_SCALE;
                    out_r[i] = f32::from(samples[i * 2 + 1]) / INT16_FULL_SCALE;
                }
            }
            NativeSliceMut::Float32(samples) => {
                for i in 0..frames {
                    out_l[i] = samples[i * 2];
                    out_r[i] = samples[i * 2 + 1];
                }
            }
        }
    }
}
