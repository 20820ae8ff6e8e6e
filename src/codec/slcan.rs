//! SLCAN (Lawicel) ASCII codec for serial CAN adapters
//!
//! Each frame is one line terminated by '\r':
//! - `Tiiiiiiiil[dd..]` extended frame (8 hex id digits)
//! - `tiiil[dd..]` standard frame (3 hex id digits)
//!
//! Anything else on the stream (acknowledgements, bell on error, `z`/`Z`
//! transmit confirmations) is skipped.

use super::Codec;
use crate::constants::MAX_PAYLOAD;
use crate::protocol::CanFrame;
use bytes::BytesMut;
use std::fmt::Write;

/// Line terminator
pub const CR: u8 = b'\r';

/// Error reply from the adapter
pub const BELL: u8 = 0x07;

/// Adapter set-up: close, 250 kbit/s, open
pub const SETUP_COMMANDS: [&[u8]; 3] = [b"C\r", b"S5\r", b"O\r"];

/// Longest valid line: `T` + 8 id + 1 dlc + 16 data
const MAX_LINE: usize = 26;

pub struct SlcanCodec {
    line: BytesMut,
}

impl SlcanCodec {
    pub fn new() -> Self {
        Self {
            line: BytesMut::with_capacity(MAX_LINE + 1),
        }
    }
}

impl Default for SlcanCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for SlcanCodec {
    fn decode(&mut self, data: &[u8], mut on_frame: impl FnMut(CanFrame)) {
        for &byte in data {
            match byte {
                CR | b'\n' => {
                    if let Some(frame) = parse_line(&self.line) {
                        on_frame(frame);
                    }
                    self.line.clear();
                }
                BELL => self.line.clear(),
                _ => {
                    if self.line.len() >= MAX_LINE {
                        // Garbage, resync on next terminator
                        self.line.clear();
                    }
                    self.line.extend_from_slice(&[byte]);
                }
            }
        }
    }

    fn encode(&self, frame: &CanFrame, output: &mut Vec<u8>) {
        let mut line = String::with_capacity(MAX_LINE + 1);
        // Writing to a String cannot fail
        if frame.extended {
            let _ = write!(line, "T{:08X}{:X}", frame.id & 0x1FFF_FFFF, frame.payload().len());
        } else {
            let _ = write!(line, "t{:03X}{:X}", frame.id & 0x7FF, frame.payload().len());
        }
        for byte in frame.payload() {
            let _ = write!(line, "{:02X}", byte);
        }
        output.extend_from_slice(line.as_bytes());
        output.push(CR);
    }
}

fn parse_line(line: &[u8]) -> Option<CanFrame> {
    let (extended, id_digits) = match line.first()? {
        b'T' => (true, 8),
        b't' => (false, 3),
        _ => return None,
    };

    let id = hex_value(line.get(1..1 + id_digits)?)?;
    let len = hex_value(line.get(1 + id_digits..2 + id_digits)?)? as usize;
    if len > MAX_PAYLOAD {
        return None;
    }

    let data_start = 2 + id_digits;
    let data = line.get(data_start..data_start + 2 * len)?;
    let mut payload = [0u8; MAX_PAYLOAD];
    for (i, pair) in data.chunks_exact(2).enumerate() {
        payload[i] = hex_value(pair)? as u8;
    }

    let mut frame = CanFrame::new(id, &payload[..len]);
    frame.extended = extended;
    Some(frame)
}

fn hex_value(digits: &[u8]) -> Option<u32> {
    digits.iter().try_fold(0u32, |acc, &c| {
        (c as char).to_digit(16).map(|d| (acc << 4) | d)
    })
}
