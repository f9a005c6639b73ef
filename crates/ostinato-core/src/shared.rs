use crate::session::{ActivationError, Session, SessionStatus};
use crate::state_snapshot::{RestoreReport, SnapshotError};
use ostinato_ports::event::HostEvent;
use ostinato_ports::storage::{Snapshot, StateSource};
use parking_lot::Mutex;

/// Control calls take the lock; the audio thread only tries it and skips
/// the block when it is held.
pub struct SharedSession {
    inner: Mutex<Session>,
}

impl SharedSession {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Mutex::new(session),
        }
    }

    pub fn activate(&self, host_rate_hz: f64) -> Result<(), ActivationError> {
        self.inner.lock().activate(host_rate_hz)
    }

    pub fn deactivate(&self) {
        self.inner.lock().deactivate();
    }

    pub fn save(&self) -> Result<Snapshot, SnapshotError> {
        self.inner.lock().save()
    }

    pub fn restore(&self, source: &dyn StateSource) -> Result<RestoreReport, SnapshotError> {
        self.inner.lock().restore(source)
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.lock().status()
    }

    pub fn log_render_faults(&self) -> bool {
        self.inner.lock().log_render_faults()
    }

    /// Returns false if the block was skipped because the session was busy.
    pub fn render_block(
        &self,
        out_l: &mut [f32],
        out_r: &mut [f32],
        frame_count: usize,
        events: &[HostEvent<'_>],
    ) -> bool {
        match self.inner.try_lock() {
            Some(mut session) => {
                session.render_block(out_l, out_r, frame_count, events);
                true
            }
            None => false,
        }
    }

    pub fn with_session<T>(&self, f: impl FnOnce(&mut Session) -> T) -> T {
        f(&mut self.inner.lock())
    }
}
