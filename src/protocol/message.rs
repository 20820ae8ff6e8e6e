//! Track bus message and its text form
//!
//! Text format (all numbers hexadecimal, one space between fields):
//! ```text
//! HHHH R CC L DD DD DD DD DD DD DD DD
//! ```
//! - `HHHH`: sender hash
//! - `R`: `R` for a response, a space otherwise
//! - `CC`: command
//! - `L`: payload length, followed by exactly `L` data bytes
//!
//! The priority is not part of the text form.

use crate::constants::MAX_PAYLOAD;
use std::fmt;
use std::str::FromStr;

/// Length of the fixed `HHHH R CC L` header
pub const TEXT_HEADER_LEN: usize = 11;

/// One protocol message on the track bus
///
/// More or less a beautified CAN frame: the identifier fields are split
/// out and the payload is a fixed 8-byte array of which only the first
/// `length` bytes are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Message {
    /// Bus arbitration priority (3 bits)
    pub priority: u8,
    /// Command number
    pub command: u8,
    /// Whether this answers a request with the same command
    pub response: bool,
    /// Sender identity, stamped by the controller on send
    pub hash: u16,
    /// Number of valid payload bytes (0..=8)
    pub length: u8,
    /// Payload bytes
    pub data: [u8; MAX_PAYLOAD],
}

impl Message {
    /// Create an empty request for the given command
    pub fn new(command: u8) -> Self {
        Self {
            command,
            ..Self::default()
        }
    }

    /// Create a request addressed to a decoder
    ///
    /// The address goes big-endian into `data[2..4]` and the length is
    /// set to `length` (at least 4).
    pub fn addressed(command: u8, address: u16, length: u8) -> Self {
        let mut message = Self::new(command);
        message.length = length.max(4);
        message.set_address(address);
        message
    }

    /// Reset every field to zero
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Valid payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.data[..(self.length as usize).min(MAX_PAYLOAD)]
    }

    /// Decoder address in `data[2..4]`
    pub fn address(&self) -> u16 {
        u16::from_be_bytes([self.data[2], self.data[3]])
    }

    pub fn set_address(&mut self, address: u16) {
        self.data[2..4].copy_from_slice(&address.to_be_bytes());
    }

    /// Big-endian 16-bit word at `data[index..index + 2]`
    pub fn word(&self, index: usize) -> u16 {
        u16::from_be_bytes([self.data[index], self.data[index + 1]])
    }

    pub fn set_word(&mut self, index: usize, value: u16) {
        self.data[index..index + 2].copy_from_slice(&value.to_be_bytes());
    }

    /// Text form, see module docs
    pub fn encode_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let payload = self.payload();
        write!(
            f,
            "{:04X} {} {:02X} {:X}",
            self.hash,
            if self.response { 'R' } else { ' ' },
            self.command,
            payload.len()
        )?;
        for byte in payload {
            write!(f, " {:02X}", byte)?;
        }
        Ok(())
    }
}

/// Why a text message could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseMessageError {
    /// Shorter than the fixed header
    TooShort { len: usize },
    /// Non-hex character where a digit was expected
    InvalidHex { position: usize },
    /// Declared length above 8
    LengthOutOfRange(u8),
    /// Not enough characters for the declared data bytes
    MissingData { declared: u8, len: usize },
}

impl fmt::Display for ParseMessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { len } => write!(
                f,
                "too short: {} characters (header needs {})",
                len, TEXT_HEADER_LEN
            ),
            Self::InvalidHex { position } => {
                write!(f, "invalid hex digit at position {}", position)
            }
            Self::LengthOutOfRange(len) => {
                write!(f, "length {} exceeds {}", len, MAX_PAYLOAD)
            }
            Self::MissingData { declared, len } => write!(
                f,
                "{} data bytes declared but only {} characters",
                declared, len
            ),
        }
    }
}

impl std::error::Error for ParseMessageError {}

impl FromStr for Message {
    type Err = ParseMessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() < TEXT_HEADER_LEN {
            return Err(ParseMessageError::TooShort { len: bytes.len() });
        }

        let mut message = Message {
            hash: parse_hex(bytes, 0, 4)?,
            response: bytes[5] != b' ',
            command: parse_hex(bytes, 7, 9)? as u8,
            ..Message::default()
        };

        let length = parse_hex(bytes, 10, 11)? as u8;
        if length as usize > MAX_PAYLOAD {
            return Err(ParseMessageError::LengthOutOfRange(length));
        }
        if bytes.len() < TEXT_HEADER_LEN + 3 * length as usize {
            return Err(ParseMessageError::MissingData {
                declared: length,
                len: bytes.len(),
            });
        }
        message.length = length;

        for i in 0..length as usize {
            let start = TEXT_HEADER_LEN + 1 + 3 * i;
            message.data[i] = parse_hex(bytes, start, start + 2)? as u8;
        }

        Ok(message)
    }
}

/// Parse `bytes[start..end]` as case-insensitive hex
fn parse_hex(bytes: &[u8], start: usize, end: usize) -> Result<u16, ParseMessageError> {
    bytes[start..end]
        .iter()
        .enumerate()
        .try_fold(0u16, |acc, (offset, &c)| {
            (c as char)
                .to_digit(16)
                .map(|digit| (acc << 4) | digit as u16)
                .ok_or(ParseMessageError::InvalidHex {
                    position: start + offset,
                })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Encoding
    // =========================================================================

    #[test]
    fn test_encode_ping_response() {
        let mut message = Message::default();
        message.hash = 0xDF24;
        message.response = true;
        message.command = 0x18;
        assert_eq!(message.encode_text(), "DF24 R 18 0");
    }

    #[test]
    fn test_encode_request_with_data() {
        let mut message = Message::addressed(0x04, 0x4007, 6);
        message.hash = 0x0300;
        message.set_word(4, 500);
        assert_eq!(message.to_string(), "0300   04 6 00 00 40 07 01 F4");
    }

    #[test]
    fn test_encode_ignores_bytes_beyond_length() {
        let mut message = Message::new(0x06);
        message.length = 1;
        message.data = [0xAA, 0xBB, 0xCC, 0, 0, 0, 0, 0];
        assert_eq!(message.to_string(), "0000   06 1 AA");
    }

    // =========================================================================
    // Decoding
    // =========================================================================

    #[test]
    fn test_decode_header_only() {
        let message: Message = "df24 R 18 0".parse().unwrap();
        assert_eq!(message.hash, 0xDF24);
        assert!(message.response);
        assert_eq!(message.command, 0x18);
        assert_eq!(message.length, 0);
        assert_eq!(message.data, [0; 8]);
    }

    #[test]
    fn test_decode_with_data() {
        let message: Message = "0300   0B 6 00 00 38 01 01 1f".parse().unwrap();
        assert!(!message.response);
        assert_eq!(message.command, 0x0B);
        assert_eq!(message.payload(), &[0x00, 0x00, 0x38, 0x01, 0x01, 0x1F]);
        assert_eq!(message.address(), 0x3801);
    }

    #[test]
    fn test_decode_too_short() {
        assert_eq!(
            "DF24 R 18".parse::<Message>(),
            Err(ParseMessageError::TooShort { len: 9 })
        );
    }

    #[test]
    fn test_decode_invalid_hex() {
        assert_eq!(
            "DG24 R 18 0".parse::<Message>(),
            Err(ParseMessageError::InvalidHex { position: 1 })
        );
    }

    #[test]
    fn test_decode_length_out_of_range() {
        assert_eq!(
            "DF24 R 18 9 00 00 00 00 00 00 00 00 00".parse::<Message>(),
            Err(ParseMessageError::LengthOutOfRange(9))
        );
    }

    #[test]
    fn test_decode_missing_data() {
        assert_eq!(
            "DF24 R 18 2 00".parse::<Message>(),
            Err(ParseMessageError::MissingData {
                declared: 2,
                len: 14
            })
        );
    }

    #[test]
    fn test_decode_invalid_data_byte() {
        assert_eq!(
            "DF24 R 18 1 0Z".parse::<Message>(),
            Err(ParseMessageError::InvalidHex { position: 13 })
        );
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn test_clear_zeroes_everything() {
        let mut message: Message = "FFFF R FF 8 01 02 03 04 05 06 07 08".parse().unwrap();
        message.priority = 3;
        message.clear();
        assert_eq!(message, Message::default());
    }

    #[test]
    fn test_address_is_big_endian() {
        let message = Message::addressed(0x04, 0x4007, 4);
        assert_eq!(&message.data[2..4], &[0x40, 0x07]);
        assert_eq!(message.length, 4);
    }

    #[test]
    fn test_addressed_keeps_minimum_length() {
        let message = Message::addressed(0x05, 0x0001, 2);
        assert_eq!(message.length, 4);
    }
}
