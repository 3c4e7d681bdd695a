//! ID-003 bill acceptor framing
//!
//! The subset of the JCM ID-003 serial protocol this cabinet uses:
//! status polling, inhibit masks, and the escrow stack/return decision.
//!
//! Frame layout:
//!
//! ```text
//! | SYNC 0xFC | LEN | CMD | DATA ... | CRC_L | CRC_H |
//! ```
//!
//! `LEN` counts the whole frame including sync and CRC. The CRC is
//! CRC-16/KERMIT (poly 0x8408 reflected, init 0x0000) over everything before
//! the CRC bytes, little-endian on the wire.

use crate::error::{DeviceError, DeviceResult};

/// Frame sync byte
pub const SYNC: u8 = 0xFC;

// === Host -> device commands ===

/// Status request (poll)
pub const CMD_STATUS_REQ: u8 = 0x11;
/// Reset
pub const CMD_RESET: u8 = 0x40;
/// Stack the note currently held in escrow
pub const CMD_STACK: u8 = 0x41;
/// Return the note currently held in escrow
pub const CMD_RETURN: u8 = 0x43;
/// Set inhibit mask (data: one mask byte, bit set = denomination inhibited)
pub const CMD_INHIBIT: u8 = 0xC3;

// === Device -> host status codes ===

const STATUS_IDLE: u8 = 0x11;
const STATUS_ACCEPTING: u8 = 0x12;
const STATUS_ESCROW: u8 = 0x13;
const STATUS_STACKING: u8 = 0x14;
const STATUS_VEND_VALID: u8 = 0x15;
const STATUS_STACKED: u8 = 0x16;
const STATUS_REJECTING: u8 = 0x17;
const STATUS_RETURNING: u8 = 0x18;
const STATUS_INHIBITED: u8 = 0x1A;
const STATUS_ACK: u8 = 0x50;

/// Denomination codes for the DA note set
const DENOM_CODES: [(u8, u32); 3] = [(0x61, 500), (0x62, 1000), (0x63, 2000)];

/// Parsed acceptor status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptorStatus {
    Idle,
    Accepting,
    /// Note held in escrow; value in DA, zero when the code is unknown
    Escrow(u32),
    Stacking,
    /// Credit may be granted (device confirmed capture)
    VendValid,
    Stacked,
    Rejecting,
    Returning,
    Inhibited,
    Ack,
    Unknown(u8),
}

impl AcceptorStatus {
    /// Whether this status confirms the note is irrevocably captured
    pub fn is_captured(&self) -> bool {
        matches!(self, AcceptorStatus::VendValid | AcceptorStatus::Stacked)
    }
}

/// Map a denomination code to its DA value
pub fn denom_value(code: u8) -> Option<u32> {
    DENOM_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, v)| *v)
}

/// Inhibit mask allowing only the given DA denominations
///
/// Bit n corresponds to denomination channel n (0x61 + n); a set bit
/// inhibits the channel.
pub fn inhibit_mask_for(allowed: &[u32]) -> u8 {
    let mut mask = 0xFFu8;
    for (i, (_, value)) in DENOM_CODES.iter().enumerate() {
        if allowed.contains(value) {
            mask &= !(1 << i);
        }
    }
    mask
}

/// CRC-16/KERMIT over the given bytes
pub fn crc16(bytes: &[u8]) -> u16 {
    let mut crc: u16 = 0x0000;
    for &b in bytes {
        crc ^= b as u16;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0x8408;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Build a complete frame for a command with optional data
pub fn frame(cmd: u8, data: &[u8]) -> Vec<u8> {
    let len = (data.len() + 5) as u8; // sync + len + cmd + crc16
    let mut buf = Vec::with_capacity(len as usize);
    buf.push(SYNC);
    buf.push(len);
    buf.push(cmd);
    buf.extend_from_slice(data);
    let crc = crc16(&buf);
    buf.push((crc & 0xFF) as u8);
    buf.push((crc >> 8) as u8);
    buf
}

/// Try to parse one frame from the front of `buf`
///
/// Returns `Ok(None)` when more bytes are needed, otherwise the command byte,
/// its data, and the number of bytes consumed.
pub fn parse_frame(buf: &[u8]) -> DeviceResult<Option<(u8, Vec<u8>, usize)>> {
    if buf.len() < 5 {
        return Ok(None);
    }
    if buf[0] != SYNC {
        return Err(DeviceError::Protocol(format!(
            "bad sync byte 0x{:02X}",
            buf[0]
        )));
    }
    let len = buf[1] as usize;
    if len < 5 {
        return Err(DeviceError::Protocol(format!("bad frame length {}", len)));
    }
    if buf.len() < len {
        return Ok(None);
    }
    let body = &buf[..len - 2];
    let wire_crc = u16::from(buf[len - 2]) | (u16::from(buf[len - 1]) << 8);
    let calc_crc = crc16(body);
    if wire_crc != calc_crc {
        return Err(DeviceError::Protocol(format!(
            "CRC mismatch: wire 0x{:04X} calc 0x{:04X}",
            wire_crc, calc_crc
        )));
    }
    let cmd = buf[2];
    let data = buf[3..len - 2].to_vec();
    Ok(Some((cmd, data, len)))
}

/// Interpret a device frame as an acceptor status
pub fn parse_status(cmd: u8, data: &[u8]) -> AcceptorStatus {
    match cmd {
        STATUS_IDLE => AcceptorStatus::Idle,
        STATUS_ACCEPTING => AcceptorStatus::Accepting,
        STATUS_ESCROW => {
            let value = data.first().and_then(|c| denom_value(*c)).unwrap_or(0);
            AcceptorStatus::Escrow(value)
        }
        STATUS_STACKING => AcceptorStatus::Stacking,
        STATUS_VEND_VALID => AcceptorStatus::VendValid,
        STATUS_STACKED => AcceptorStatus::Stacked,
        STATUS_REJECTING => AcceptorStatus::Rejecting,
        STATUS_RETURNING => AcceptorStatus::Returning,
        STATUS_INHIBITED => AcceptorStatus::Inhibited,
        STATUS_ACK => AcceptorStatus::Ack,
        other => AcceptorStatus::Unknown(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_roundtrip() {
        let f = frame(CMD_STACK, &[]);
        assert_eq!(f[0], SYNC);
        assert_eq!(f[1] as usize, f.len());

        let parsed = parse_frame(&f).unwrap().unwrap();
        assert_eq!(parsed.0, CMD_STACK);
        assert!(parsed.1.is_empty());
        assert_eq!(parsed.2, f.len());
    }

    #[test]
    fn test_frame_with_data_roundtrip() {
        let f = frame(CMD_INHIBIT, &[0xF8]);
        let (cmd, data, consumed) = parse_frame(&f).unwrap().unwrap();
        assert_eq!(cmd, CMD_INHIBIT);
        assert_eq!(data, vec![0xF8]);
        assert_eq!(consumed, f.len());
    }

    #[test]
    fn test_parse_incomplete_frame() {
        let f = frame(CMD_STATUS_REQ, &[]);
        assert!(parse_frame(&f[..3]).unwrap().is_none());
    }

    #[test]
    fn test_parse_bad_sync() {
        let mut f = frame(CMD_STATUS_REQ, &[]);
        f[0] = 0x00;
        assert!(matches!(
            parse_frame(&f),
            Err(DeviceError::Protocol(_))
        ));
    }

    #[test]
    fn test_parse_bad_crc() {
        let mut f = frame(CMD_STATUS_REQ, &[]);
        let last = f.len() - 1;
        f[last] ^= 0xFF;
        assert!(matches!(parse_frame(&f), Err(DeviceError::Protocol(_))));
    }

    #[test]
    fn test_denom_mapping() {
        assert_eq!(denom_value(0x61), Some(500));
        assert_eq!(denom_value(0x62), Some(1000));
        assert_eq!(denom_value(0x63), Some(2000));
        assert_eq!(denom_value(0x64), None);
    }

    #[test]
    fn test_inhibit_mask() {
        // All three channels enabled -> lowest three bits cleared
        assert_eq!(inhibit_mask_for(&[500, 1000, 2000]), 0xF8);
        // Only 500 enabled
        assert_eq!(inhibit_mask_for(&[500]), 0xFE);
        // Nothing enabled -> everything inhibited
        assert_eq!(inhibit_mask_for(&[]), 0xFF);
    }

    #[test]
    fn test_parse_escrow_status() {
        let status = parse_status(0x13, &[0x62]);
        assert_eq!(status, AcceptorStatus::Escrow(1000));
        assert!(!status.is_captured());

        assert!(parse_status(0x16, &[]).is_captured());
        assert!(parse_status(0x15, &[]).is_captured());
    }
}
