use crate::rate_converter::{ConverterCounters, ConverterState, RateConverter};
use crate::render_loop::{RenderLoop, RenderStats};
use crate::scheduler::EventScheduler;
use crate::state_snapshot::{self, RestoreReport, SnapshotError};
use ostinato_ports::engine::{EngineError, SynthEngine};
use ostinato_ports::event::HostEvent;
use ostinato_ports::resample::ResamplerFactory;
use ostinato_ports::storage::{SessionSettings, Snapshot, StateSink, StateSource};
use ostinato_ports::types::{HostFrames, RateRatio};
use serde::Serialize;

#[derive(thiserror::Error, Debug)]
pub enum ActivationError {
    #[error("invalid host sample rate: {0}")]
    InvalidHostRate(f64),
    #[error("engine failed to open: {0}")]
    EngineOpen(#[from] EngineError),
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SessionStatus {
    pub active: bool,
    pub ratio: Option<RateRatio>,
    pub converter: Option<ConverterState>,
    pub converter_counters: Option<ConverterCounters>,
    pub running_frames: HostFrames,
    pub stats: RenderStats,
}

#[derive(Clone, Copy, Debug, Default)]
struct LoggedFaults {
    events_dropped: u64,
    events_rejected: u64,
    converter_faults: u32,
    converter_silent: bool,
}

/// `render_block` is the audio-thread entry point; everything else is
/// control-path and must not overlap with it.
pub struct Session {
    engine: Box<dyn SynthEngine>,
    resamplers: Box<dyn ResamplerFactory>,
    settings: SessionSettings,
    pipeline: Option<RenderLoop>,
    logged: LoggedFaults,
}

impl Session {
    pub fn new(
        engine: Box<dyn SynthEngine>,
        resamplers: Box<dyn ResamplerFactory>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            engine,
            resamplers,
            settings,
            pipeline: None,
            logged: LoggedFaults::default(),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn engine(&self) -> &dyn SynthEngine {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> &mut dyn SynthEngine {
        self.engine.as_mut()
    }

    pub fn is_active(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn rate_ratio(&self) -> Option<RateRatio> {
        self.pipeline.as_ref().map(|pipeline| pipeline.scheduler().ratio())
    }

    pub fn stats(&self) -> RenderStats {
        self.pipeline
            .as_ref()
            .map(RenderLoop::stats)
            .unwrap_or_default()
    }

    pub fn status(&self) -> SessionStatus {
        let converter = self.pipeline.as_ref().and_then(RenderLoop::converter);
        SessionStatus {
            active: self.is_active(),
            ratio: self.rate_ratio(),
            converter: converter.map(RateConverter::state),
            converter_counters: converter.map(RateConverter::counters),
            running_frames: self
                .pipeline
                .as_ref()
                .map(RenderLoop::running_frames)
                .unwrap_or(0),
            stats: self.stats(),
        }
    }

    /// On failure the session stays inactive and every render call is a no-op.
    pub fn activate(&mut self, host_rate_hz: f64) -> Result<(), ActivationError> {
        if self.is_active() {
            self.deactivate();
        }
        if !host_rate_hz.is_finite() || host_rate_hz <= 0.0 {
            log::error!("not activating: invalid host sample rate {host_rate_hz}");
            return Err(ActivationError::InvalidHostRate(host_rate_hz));
        }
        if let Err(err) = self.engine.open() {
            log::error!("unable to open synth, not activating: {err}");
            return Err(err.into());
        }

        let spec = self.engine.spec();
        let ratio = RateRatio::new(f64::from(spec.native_rate_hz), host_rate_hz);
        let converter = if ratio.is_unity() {
            None
        } else {
            log::info!(
                "converting sample rate from {} to {}",
                ratio.native_rate_hz,
                ratio.host_rate_hz
            );
            Some(RateConverter::new(
                self.resamplers.as_ref(),
                spec,
                host_rate_hz,
                self.settings.resampler_quality,
            ))
        };
        let scheduler = EventScheduler::new(ratio, self.settings.max_sysex_bytes);
        self.pipeline = Some(RenderLoop::new(scheduler, converter, spec));
        self.logged = LoggedFaults {
            converter_silent: self.status().converter == Some(ConverterState::Silent),
            ..LoggedFaults::default()
        };
        log::info!(
            "session active: native {} Hz, host {} Hz, block {} frames",
            spec.native_rate_hz,
            host_rate_hz,
            spec.max_block_frames
        );
        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.pipeline = None;
        if self.engine.is_open() {
            self.engine.close();
        }
    }

    /// Logs what the render path recorded since the previous call.
    pub fn log_render_faults(&mut self) -> bool {
        let status = self.status();
        let stats = status.stats;
        let mut logged = false;

        if stats.events_dropped > self.logged.events_dropped {
            log::warn!(
                "dropped {} malformed events, last: {:?}",
                stats.events_dropped - self.logged.events_dropped,
                stats.last_drop
            );
            logged = true;
        }
        if stats.events_rejected > self.logged.events_rejected {
            log::warn!(
                "engine queue refused {} events",
                stats.events_rejected - self.logged.events_rejected
            );
            logged = true;
        }
        if let Some(counters) = status.converter_counters {
            if counters.faults > self.logged.converter_faults {
                log::warn!(
                    "rate converter faulted {} times ({} resets), last: {}",
                    counters.faults - self.logged.converter_faults,
                    counters.resets,
                    counters.last_fault.unwrap_or("unknown")
                );
                logged = true;
            }
            let silent = status.converter == Some(ConverterState::Silent);
            if silent && !self.logged.converter_silent {
                log::error!(
                    "rate converter disabled, output will be silent: {}",
                    counters.last_fault.unwrap_or("unknown")
                );
                logged = true;
            }
            self.logged.converter_faults = counters.faults;
            self.logged.converter_silent = silent;
        }
        self.logged.events_dropped = stats.events_dropped;
        self.logged.events_rejected = stats.events_rejected;
        logged
    }

    pub fn render_block(
        &mut self,
        out_l: &mut [f32],
        out_r: &mut [f32],
        frame_count: usize,
        events: &[HostEvent<'_>],
    ) {
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.render(self.engine.as_mut(), out_l, out_r, frame_count, events);
        }
    }

    pub fn save(&self) -> Result<Snapshot, SnapshotError> {
        let mut snapshot = Snapshot::default();
        self.save_into(&mut snapshot)?;
        Ok(snapshot)
    }

    pub fn save_into(&self, sink: &mut dyn StateSink) -> Result<usize, SnapshotError> {
        if !self.is_active() {
            return Err(SnapshotError::EngineNotOpen);
        }
        state_snapshot::save(self.engine.as_ref(), sink)
    }

    pub fn restore(&mut self, source: &dyn StateSource) -> Result<RestoreReport, SnapshotError> {
        if !self.is_active() {
            return Err(SnapshotError::EngineNotOpen);
        }
        state_snapshot::restore(self.engine.as_mut(), source)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.deactivate();
    }
}
