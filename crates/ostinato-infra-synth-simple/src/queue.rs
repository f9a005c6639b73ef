use ostinato_ports::types::Timestamp;
use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Payload {
    Short(u32),
    Sysex { start: usize, len: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueuedEvent {
    pub timestamp: Timestamp,
    pub payload: Payload,
}

/// FIFO of timestamped messages with storage reserved up front.
///
/// Sysex bytes live in a shared arena that is recycled once the queue drains,
/// so pushing never reallocates.
pub struct EventQueue {
    events: VecDeque<QueuedEvent>,
    capacity: usize,
    sysex: Vec<u8>,
    sysex_capacity: usize,
}

impl EventQueue {
    pub fn new(capacity: usize, sysex_capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            sysex: Vec::with_capacity(sysex_capacity),
            sysex_capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.sysex.clear();
    }

    pub fn push_short(&mut self, timestamp: Timestamp, msg: u32) -> bool {
        self.push(QueuedEvent {
            timestamp,
            payload: Payload::Short(msg),
        })
    }

    pub fn push_sysex(&mut self, timestamp: Timestamp, data: &[u8]) -> bool {
        if self.is_empty() {
            self.sysex.clear();
        }
        if self.events.len() >= self.capacity || self.sysex.len() + data.len() > self.sysex_capacity {
            return false;
        }
        let start = self.sysex.len();
        self.sysex.extend_from_slice(data);
        self.push(QueuedEvent {
            timestamp,
            payload: Payload::Sysex {
                start,
                len: data.len(),
            },
        })
    }

    fn push(&mut self, event: QueuedEvent) -> bool {
        if self.events.len() >= self.capacity {
            return false;
        }
        self.events.push_back(event);
        true
    }

    pub fn next_timestamp(&self) -> Option<Timestamp> {
        self.events.front().map(|event| event.timestamp)
    }

    /// Pops the head event if it is due at `now`. Later events wait behind it.
    pub fn pop_due(&mut self, now: Timestamp) -> Option<QueuedEvent> {
        match self.events.front() {
            Some(event) if event.timestamp <= now => self.events.pop_front(),
            _ => None,
        }
    }

    pub fn sysex_bytes(&self, start: usize, len: usize) -> &[u8] {
        self.sysex.get(start..start + len).unwrap_or_default()
    }
}
