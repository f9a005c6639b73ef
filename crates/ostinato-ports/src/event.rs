/// Leading status byte of a system-exclusive message.
pub const SYSEX_START: u8 = 0xF0;
/// Trailing status byte of a system-exclusive message.
pub const SYSEX_END: u8 = 0xF7;

/// Kind tag of an incoming host event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostEventKind<'a> {
    /// Raw MIDI bytes: a short channel/system message or a complete sysex.
    Midi(&'a [u8]),
    /// Any event type the pipeline does not understand, carrying the host's type id.
    Unknown(u32),
}

/// One control event delivered by the host for the current processing call.
///
/// The payload is borrowed from the host's event buffer; nothing is retained past dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostEvent<'a> {
    /// Offset in host frames from the start of the current call.
    pub frame_offset: u32,
    pub kind: HostEventKind<'a>,
}

impl<'a> HostEvent<'a> {
    pub fn midi(frame_offset: u32, bytes: &'a [u8]) -> Self {
        Self {
            frame_offset,
            kind: HostEventKind::Midi(bytes),
        }
    }

    pub fn unknown(frame_offset: u32, type_id: u32) -> Self {
        Self {
            frame_offset,
            kind: HostEventKind::Unknown(type_id),
        }
    }
}

/// Number of data bytes that follow a short-message status byte, or `None`
/// for bytes that cannot start a short message.
pub fn short_message_data_len(status: u8) -> Option<usize> {
    match status {
        0x80..=0xBF | 0xE0..=0xEF => Some(2),
        0xC0..=0xDF => Some(1),
        0xF1 | 0xF3 => Some(1),
        0xF2 => Some(2),
        0xF6 | 0xF8..=0xFF => Some(0),
        _ => None,
    }
}

/// Packs short-message bytes little-endian, status byte lowest.
pub fn pack_short_message(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(4)
        .enumerate()
        .fold(0u32, |msg, (i, byte)| msg | (u32::from(*byte) << (i * 8)))
}

/// Splits a packed short message back into (status, data1, data2).
pub fn unpack_short_message(msg: u32) -> (u8, u8, u8) {
    (
        (msg & 0xFF) as u8,
        ((msg >> 8) & 0x7F) as u8,
        ((msg >> 16) & 0x7F) as u8,
    )
}
