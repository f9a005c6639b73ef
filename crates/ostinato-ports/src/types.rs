use serde::{Deserialize, Serialize};

/// Engine-native sample frames elapsed since the engine was opened.
pub type Timestamp = u64;

/// Host-rate sample frames, used for the running counter of a session.
pub type HostFrames = u64;

/// Conversion between the engine's fixed native rate and the host rate.
///
/// `native_per_host` is `native_rate / host_rate`, derived once at activation
/// and never changed while a session is active.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RateRatio {
    pub native_rate_hz: f64,
    pub host_rate_hz: f64,
    pub native_per_host: f64,
}

impl RateRatio {
    pub fn new(native_rate_hz: f64, host_rate_hz: f64) -> Self {
        Self {
            native_rate_hz,
            host_rate_hz,
            native_per_host: native_rate_hz / host_rate_hz,
        }
    }

    pub fn identity(rate_hz: f64) -> Self {
        Self::new(rate_hz, rate_hz)
    }

    /// True when host and native rates match exactly and no conversion is needed.
    pub fn is_unity(&self) -> bool {
        self.native_rate_hz == self.host_rate_hz
    }
}
