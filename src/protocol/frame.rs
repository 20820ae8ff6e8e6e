//! CAN frame representation and identifier packing
//!
//! Identifier layout (29-bit extended frame, most significant first):
//! ```text
//! [priority:3][command:8][response:1][hash:16]
//!  bits 25..   bits 17..  bit 16      bits 0..15
//! ```

use super::Message;
use crate::constants::MAX_PAYLOAD;

pub const PRIORITY_SHIFT: u32 = 25;
pub const COMMAND_SHIFT: u32 = 17;
pub const RESPONSE_SHIFT: u32 = 16;

/// Mask for a 29-bit extended identifier
pub const EXTENDED_ID_MASK: u32 = 0x1FFF_FFFF;

/// Raw CAN frame as exchanged with a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CanFrame {
    /// 29-bit (extended) or 11-bit (standard) identifier
    pub id: u32,
    /// Extended frame flag
    pub extended: bool,
    /// Data length code (0..=8)
    pub len: u8,
    pub data: [u8; MAX_PAYLOAD],
}

impl CanFrame {
    /// Create an extended frame, truncating data beyond 8 bytes
    pub fn new(id: u32, payload: &[u8]) -> Self {
        let len = payload.len().min(MAX_PAYLOAD);
        let mut data = [0u8; MAX_PAYLOAD];
        data[..len].copy_from_slice(&payload[..len]);
        Self {
            id: id & EXTENDED_ID_MASK,
            extended: true,
            len: len as u8,
            data,
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[..(self.len as usize).min(MAX_PAYLOAD)]
    }
}

/// Identifier fields of a track bus frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdFields {
    pub priority: u8,
    pub command: u8,
    pub response: bool,
    pub hash: u16,
}

/// Pack identifier fields into a 29-bit CAN identifier
pub fn pack_id(fields: IdFields) -> u32 {
    ((fields.priority as u32 & 0x07) << PRIORITY_SHIFT)
        | ((fields.command as u32) << COMMAND_SHIFT)
        | ((fields.response as u32) << RESPONSE_SHIFT)
        | fields.hash as u32
}

/// Split a CAN identifier into its fields
pub fn unpack_id(id: u32) -> IdFields {
    IdFields {
        priority: ((id >> PRIORITY_SHIFT) & 0x07) as u8,
        command: ((id >> COMMAND_SHIFT) & 0xFF) as u8,
        response: (id >> RESPONSE_SHIFT) & 0x01 == 1,
        hash: (id & 0xFFFF) as u16,
    }
}

impl Message {
    /// Build the transport frame for this message
    pub fn to_frame(&self) -> CanFrame {
        let id = pack_id(IdFields {
            priority: self.priority,
            command: self.command,
            response: self.response,
            hash: self.hash,
        });
        CanFrame::new(id, self.payload())
    }

    /// Decode a transport frame, overwriting every field
    pub fn from_frame(frame: &CanFrame) -> Self {
        let fields = unpack_id(frame.id);
        let payload = frame.payload();
        let mut data = [0u8; MAX_PAYLOAD];
        data[..payload.len()].copy_from_slice(payload);
        Self {
            priority: fields.priority,
            command: fields.command,
            response: fields.response,
            hash: fields.hash,
            length: payload.len() as u8,
            data,
        }
    }
}

impl From<&Message> for CanFrame {
    fn from(message: &Message) -> Self {
        message.to_frame()
    }
}

impl From<&CanFrame> for Message {
    fn from(frame: &CanFrame) -> Self {
        Message::from_frame(frame)
    }
}
