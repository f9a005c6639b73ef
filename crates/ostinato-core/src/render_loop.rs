use crate::rate_converter::RateConverter;
use crate::scheduler::EventScheduler;
use ostinato_ports::engine::{EngineSpec, SynthEngine};
use ostinato_ports::event::HostEvent;
use ostinato_ports::sample::NativeBuffer;
use crate::scheduler::DropReason;
use ostinato_ports::types::HostFrames;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RenderStats {
    pub blocks: u64,
    pub host_frames: u64,
    pub events_forwarded: u64,
    pub events_dropped: u64,
    pub events_rejected: u64,
    pub last_drop: Option<DropReason>,
}

/// Events first, then output in engine-sized chunks. Runs on the audio thread.
pub struct RenderLoop {
    scheduler: EventScheduler,
    converter: Option<RateConverter>,
    scratch: NativeBuffer,
    max_block_frames: usize,
    running: HostFrames,
    stats: RenderStats,
}

impl RenderLoop {
    pub fn new(scheduler: EventScheduler, converter: Option<RateConverter>, engine: EngineSpec) -> Self {
        Self {
            scheduler,
            converter,
            scratch: NativeBuffer::with_frames(engine.sample_format, engine.max_block_frames),
            max_block_frames: engine.max_block_frames,
            running: 0,
            stats: RenderStats::default(),
        }
    }

    pub fn scheduler(&self) -> &EventScheduler {
        &self.scheduler
    }

    pub fn converter(&self) -> Option<&RateConverter> {
        self.converter.as_ref()
    }

    pub fn running_frames(&self) -> HostFrames {
        self.running
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Short channel buffers or a closed engine leave the output untouched.
    pub fn render(
        &mut self,
        engine: &mut dyn SynthEngine,
        out_l: &mut [f32],
        out_r: &mut [f32],
        frame_count: usize,
        events: &[HostEvent<'_>],
    ) {
        if out_l.len() < frame_count || out_r.len() < frame_count {
            return;
        }
        if !engine.is_open() || self.max_block_frames == 0 {
            return;
        }

        let dispatch = self.scheduler.dispatch(engine, self.running, frame_count, events);
        self.stats.events_forwarded += u64::from(dispatch.forwarded);
        self.stats.events_dropped += u64::from(dispatch.dropped);
        self.stats.events_rejected += u64::from(dispatch.rejected);
        if dispatch.last_drop.is_some() {
            self.stats.last_drop = dispatch.last_drop;
        }

        let mut offset = 0;
        while offset < frame_count {
            let frames = (frame_count - offset).min(self.max_block_frames);
            let mut block = self.scratch.frames_mut(frames);
            match self.converter.as_mut() {
                Some(converter) => converter.get_output_samples(engine, block.reborrow(), frames),
                None => engine.render(block.reborrow()),
            }
            block.write_host(
                &mut out_l[offset..offset + frames],
                &mut out_r[offset..offset + frames],
            );
            offset += frames;
        }

        self.running += frame_count as u64;
        self.stats.blocks += 1;
        self.stats.host_frames += frame_count as u64;
    }
}
