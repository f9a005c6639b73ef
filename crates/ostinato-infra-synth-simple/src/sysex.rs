//! Roland DT1 ("data set 1") parsing.

use ostinato_ports::event::{SYSEX_END, SYSEX_START};

pub const ROLAND_ID: u8 = 0x41;
pub const MODEL_ID: u8 = 0x16;
pub const CMD_DT1: u8 = 0x12;

pub const DISPLAY_ADDRESS: u32 = 0x20_0000;
pub const DISPLAY_LEN: usize = 20;
pub const RESET_ADDRESS: u32 = 0x7F_0000;

/// A validated parameter write: 3x7-bit sysex address plus data bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DataSet<'a> {
    pub address: u32,
    pub data: &'a [u8],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SysexIgnored {
    Malformed,
    OtherDevice { manufacturer: u8, model: u8 },
    UnsupportedCommand(u8),
    ChecksumMismatch { expected: u8, found: u8 },
}

impl SysexIgnored {
    pub fn describe(&self) -> &'static str {
        match self {
            SysexIgnored::Malformed => "ignoring malformed sysex message",
            SysexIgnored::OtherDevice { .. } => "ignoring sysex message for another device",
            SysexIgnored::UnsupportedCommand(_) => "ignoring unsupported sysex command",
            SysexIgnored::ChecksumMismatch { .. } => "ignoring sysex message with bad checksum",
        }
    }
}

/// Two's-complement of the 7-bit sum, as used by Roland devices.
pub fn roland_checksum(bytes: &[u8]) -> u8 {
    let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b)) & 0x7F;
    (0x80 - sum) & 0x7F
}

/// `F0 41 <dev> 16 12 a a a d.. <sum> [F7]`
pub fn parse_data_set(message: &[u8]) -> Result<DataSet<'_>, SysexIgnored> {
    let body = message.strip_suffix(&[SYSEX_END]).unwrap_or(message);
    if body.len() < 10 || body[0] != SYSEX_START {
        return Err(SysexIgnored::Malformed);
    }
    if body[1] != ROLAND_ID || body[3] != MODEL_ID {
        return Err(SysexIgnored::OtherDevice {
            manufacturer: body[1],
            model: body[3],
        });
    }
    if body[4] != CMD_DT1 {
        return Err(SysexIgnored::UnsupportedCommand(body[4]));
    }
    let (payload, checksum) = body[5..].split_at(body.len() - 6);
    let expected = roland_checksum(payload);
    if expected != checksum[0] {
        return Err(SysexIgnored::ChecksumMismatch {
            expected,
            found: checksum[0],
        });
    }
    let address =
        (u32::from(payload[0]) << 16) | (u32::from(payload[1]) << 8) | u32::from(payload[2]);
    Ok(DataSet {
        address,
        data: &payload[3..],
    })
}

/// Builds a DT1 message for `address`; used by hosts and tests to drive the engine.
pub fn data_set_message(device_id: u8, address: u32, data: &[u8]) -> Vec<u8> {
    let mut payload = vec![
        ((address >> 16) & 0x7F) as u8,
        ((address >> 8) & 0x7F) as u8,
        (address & 0x7F) as u8,
    ];
    payload.extend_from_slice(data);
    let mut message = vec![SYSEX_START, ROLAND_ID, device_id, MODEL_ID, CMD_DT1];
    message.extend_from_slice(&payload);
    message.push(roland_checksum(&payload));
    message.push(SYSEX_END);
    message
}
