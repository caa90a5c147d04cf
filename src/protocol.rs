//! SHTP framing and SH-2 rotation-vector reports.
//!
//! Everything in here is pure: no I/O, no shared state. Malformed or
//! truncated frames are never an error, they simply contain no report.

use crate::types::{FieldOrder, Quaternion, ReportVariant};

// -- SHTP transport header --
pub const SHTP_HEADER_LEN: usize = 4;
/// Bit 15 of the length field marks a continuation of a previous transfer.
pub const SHTP_CONTINUATION_BIT: u16 = 0x8000;

// -- Channels --
pub const CHANNEL_COMMAND: u8 = 0;
pub const CHANNEL_EXECUTABLE: u8 = 1;
pub const CHANNEL_CONTROL: u8 = 2;
pub const CHANNEL_INPUT_REPORTS: u8 = 3;

// -- Report ids --
pub const REPORT_TIMEBASE: u8 = 0xFB;
pub const REPORT_SET_FEATURE: u8 = 0xFD;

/// Base timestamp reference preceding a batch of input reports.
pub const TIMEBASE_LEN: usize = 5;
/// Report id, sequence, status, delay.
pub const REPORT_HEADER_LEN: usize = 4;
/// i, j, k, real as four Q14 words.
pub const QUATERNION_PAYLOAD_LEN: usize = 8;
/// The scan stops this many bytes before the end of the frame so a tag
/// always has a report header and payload behind it.
pub const SCAN_TAIL: usize = 10;

/// Largest frame read from the bus in one poll.
pub const MAX_FRAME_LEN: usize = 128;

/// Fixed-point scale factor: 2^(-14) = 1/16384.
pub const Q14_SCALE: f32 = 1.0 / 16384.0;

pub const ENABLE_COMMAND_LEN: usize = 21;
/// 50 ms between reports, 20 Hz.
pub const DEFAULT_REPORT_INTERVAL_US: u32 = 50_000;

/// The 4-byte prefix of every SHTP transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShtpHeader {
    /// Total transfer length including this header.
    pub length: u16,
    pub continuation: bool,
    pub channel: u8,
    pub sequence: u8,
}

impl ShtpHeader {
    pub fn parse(data: &[u8]) -> Option<ShtpHeader> {
        if data.len() < SHTP_HEADER_LEN {
            return None;
        }
        let raw = u16::from_le_bytes([data[0], data[1]]);
        Some(ShtpHeader {
            length: raw & !SHTP_CONTINUATION_BIT,
            continuation: raw & SHTP_CONTINUATION_BIT != 0,
            channel: data[2],
            sequence: data[3],
        })
    }

    pub fn encode(&self) -> [u8; SHTP_HEADER_LEN] {
        let mut raw = self.length & !SHTP_CONTINUATION_BIT;
        if self.continuation {
            raw |= SHTP_CONTINUATION_BIT;
        }
        let [lo, hi] = raw.to_le_bytes();
        [lo, hi, self.channel, self.sequence]
    }
}

/// Number of meaningful bytes in a frame.
///
/// I2C reads always fill the requested buffer, so the SHTP length is used
/// to trim trailing garbage when it is present and plausible.
pub fn valid_frame_len(frame: &[u8], bytes_read: usize) -> usize {
    let bytes_read = bytes_read.min(frame.len());
    match ShtpHeader::parse(&frame[..bytes_read]) {
        Some(header) if header.length as usize >= SHTP_HEADER_LEN => {
            bytes_read.min(header.length as usize)
        }
        _ => bytes_read,
    }
}

/// Header of a single sensor report inside an input-report frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportHeader {
    pub channel: u8,
    pub report_id: u8,
    pub sequence: u8,
    pub status: u8,
    pub delay: u8,
}

impl ReportHeader {
    /// Accuracy level from the status bits: 0 unreliable, 1 low, 2 medium, 3 high.
    pub fn accuracy(&self) -> u8 {
        self.status & 0x03
    }
}

/// A located rotation report. `offset` is where its quaternion payload
/// starts within the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationReport {
    pub header: ReportHeader,
    pub offset: usize,
}

impl RotationReport {
    /// The 8 payload bytes inside `frame`, or `None` if `frame` is not the
    /// buffer this report was found in.
    pub fn payload<'a>(&self, frame: &'a [u8]) -> Option<&'a [u8; QUATERNION_PAYLOAD_LEN]> {
        frame
            .get(self.offset..self.offset + QUATERNION_PAYLOAD_LEN)
            .and_then(|bytes| bytes.try_into().ok())
    }
}

/// Find the first report tagged `report_id` in an input-report frame.
///
/// Timebase records are hopped over whole; any other byte is skipped one
/// at a time. Only the first match is returned even if the frame holds
/// several.
pub fn find_rotation_report(frame: &[u8], len: usize, report_id: u8) -> Option<RotationReport> {
    let len = len.min(frame.len());
    if len <= SHTP_HEADER_LEN || frame[2] != CHANNEL_INPUT_REPORTS {
        return None;
    }

    let mut i = SHTP_HEADER_LEN;
    while i + SCAN_TAIL < len {
        match frame[i] {
            REPORT_TIMEBASE => i += TIMEBASE_LEN,
            id if id == report_id => {
                let offset = i + REPORT_HEADER_LEN;
                if offset + QUATERNION_PAYLOAD_LEN > len {
                    return None;
                }
                return Some(RotationReport {
                    header: ReportHeader {
                        channel: frame[2],
                        report_id: id,
                        sequence: frame[i + 1],
                        status: frame[i + 2],
                        delay: frame[i + 3],
                    },
                    offset,
                });
            }
            _ => i += 1,
        }
    }
    None
}

/// Convert a Q14 fixed-point word to a float.
pub fn q14_to_f32(raw: i16) -> f32 {
    raw as f32 * Q14_SCALE
}

/// Decode the four Q14 quaternion words of a rotation payload.
///
/// Out-of-range values are passed through unclamped.
pub fn decode_quaternion(payload: &[u8; QUATERNION_PAYLOAD_LEN], order: FieldOrder) -> Quaternion {
    let word = |n: usize| q14_to_f32(i16::from_le_bytes([payload[2 * n], payload[2 * n + 1]]));
    Quaternion {
        x: word(order.x),
        y: word(order.y),
        z: word(order.z),
        w: word(order.w),
    }
}

/// Build the Set Feature command enabling a rotation report.
///
/// Layout: SHTP header (length 21, control channel), 0xFD, report id,
/// feature flags + change sensitivity (3 bytes, zero), report interval in
/// microseconds (u32 LE), batch interval and sensor config (8 bytes, zero).
pub fn build_enable_rotation_cmd(
    variant: ReportVariant,
    interval_us: u32,
    sequence: u8,
) -> [u8; ENABLE_COMMAND_LEN] {
    let mut cmd = [0u8; ENABLE_COMMAND_LEN];
    let header = ShtpHeader {
        length: ENABLE_COMMAND_LEN as u16,
        continuation: false,
        channel: CHANNEL_CONTROL,
        sequence,
    };
    cmd[..SHTP_HEADER_LEN].copy_from_slice(&header.encode());
    cmd[4] = REPORT_SET_FEATURE;
    cmd[5] = variant.report_id();
    cmd[9..13].copy_from_slice(&interval_us.to_le_bytes());
    cmd
}
