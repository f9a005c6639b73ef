use ostinato_ports::event::{
    pack_short_message, short_message_data_len, HostEvent, HostEventKind, SYSEX_START,
};
use ostinato_ports::engine::SynthEngine;
use ostinato_ports::types::{HostFrames, RateRatio, Timestamp};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineMessage<'a> {
    Short(u32),
    Sysex(&'a [u8]),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DropReason {
    UnknownEventType(u32),
    EmptyPayload,
    InvalidStatus(u8),
    TruncatedMessage { status: u8, len: usize },
    OversizedMessage { status: u8, len: usize },
    SysexTooShort,
    SysexTooLong { len: usize },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub forwarded: u32,
    pub dropped: u32,
    /// Forwarded but refused by the engine.
    pub rejected: u32,
    pub last_drop: Option<DropReason>,
}

#[derive(Clone, Copy, Debug)]
pub struct EventScheduler {
    ratio: RateRatio,
    max_sysex_bytes: usize,
}

impl EventScheduler {
    pub fn new(ratio: RateRatio, max_sysex_bytes: usize) -> Self {
        Self {
            ratio,
            max_sysex_bytes: max_sysex_bytes.max(2),
        }
    }

    pub fn ratio(&self) -> RateRatio {
        self.ratio
    }

    /// `floor((running + offset) * native/host)`; plain addition at unity ratio.
    pub fn engine_timestamp(&self, running: HostFrames, frame_offset: u32) -> Timestamp {
        let target = running.saturating_add(u64::from(frame_offset));
        if self.ratio.is_unity() {
            target
        } else {
            (target as f64 * self.ratio.native_per_host).floor() as Timestamp
        }
    }

    pub fn classify<'a>(&self, event: &HostEvent<'a>) -> Result<EngineMessage<'a>, DropReason> {
        let bytes = match event.kind {
            HostEventKind::Midi(bytes) => bytes,
            HostEventKind::Unknown(type_id) => return Err(DropReason::UnknownEventType(type_id)),
        };
        let status = *bytes.first().ok_or(DropReason::EmptyPayload)?;

        if status == SYSEX_START {
            if bytes.len() < 2 {
                return Err(DropReason::SysexTooShort);
            }
            if bytes.len() > self.max_sysex_bytes {
                return Err(DropReason::SysexTooLong { len: bytes.len() });
            }
            return Ok(EngineMessage::Sysex(bytes));
        }

        if status < 0x80 {
            return Err(DropReason::InvalidStatus(status));
        }
        let data_len = short_message_data_len(status).ok_or(DropReason::InvalidStatus(status))?;
        let needed = 1 + data_len;
        if bytes.len() < needed {
            return Err(DropReason::TruncatedMessage {
                status,
                len: bytes.len(),
            });
        }
        if bytes.len() > 3 {
            return Err(DropReason::OversizedMessage {
                status,
                len: bytes.len(),
            });
        }
        Ok(EngineMessage::Short(pack_short_message(&bytes[..needed])))
    }

    /// Timestamps never decrease within one call; an event earlier than its
    /// predecessor is moved up to it.
    pub fn dispatch(
        &self,
        engine: &mut dyn SynthEngine,
        running: HostFrames,
        frame_count: usize,
        events: &[HostEvent<'_>],
    ) -> DispatchStats {
        let mut stats = DispatchStats::default();
        let max_offset = u32::try_from(frame_count).unwrap_or(u32::MAX);
        let mut last_timestamp: Option<Timestamp> = None;

        for event in events {
            let message = match self.classify(event) {
                Ok(message) => message,
                Err(reason) => {
                    stats.dropped += 1;
                    stats.last_drop = Some(reason);
                    continue;
                }
            };

            let mut timestamp = self.engine_timestamp(running, event.frame_offset.min(max_offset));
            if let Some(last) = last_timestamp {
                timestamp = timestamp.max(last);
            }
            last_timestamp = Some(timestamp);

            let accepted = match message {
                EngineMessage::Short(msg) => engine.play_msg(msg, timestamp),
                EngineMessage::Sysex(data) => engine.play_sysex(data, timestamp),
            };
            stats.forwarded += 1;
            if !accepted {
                stats.rejected += 1;
            }
        }

        stats
    }
}
