//! CS2 CAN-over-UDP datagram codec
//!
//! Each frame is exactly 13 bytes:
//! ```text
//! [id:4 big-endian][dlc:1][data:8]
//! ```
//! A datagram may carry several frames back to back. Trailing bytes that
//! do not form a full frame are dropped.

use super::Codec;
use crate::constants::{CS2_FRAME_SIZE, MAX_PAYLOAD};
use crate::protocol::frame::EXTENDED_ID_MASK;
use crate::protocol::CanFrame;

/// Codec for the CS2 UDP gateway format (stateless)
#[derive(Debug, Default, Clone, Copy)]
pub struct Cs2Codec;

impl Cs2Codec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for Cs2Codec {
    fn decode(&mut self, data: &[u8], mut on_frame: impl FnMut(CanFrame)) {
        for chunk in data.chunks_exact(CS2_FRAME_SIZE) {
            let id = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            let len = (chunk[4] as usize).min(MAX_PAYLOAD);
            on_frame(CanFrame::new(id & EXTENDED_ID_MASK, &chunk[5..5 + len]));
        }
    }

    fn encode(&self, frame: &CanFrame, output: &mut Vec<u8>) {
        output.extend_from_slice(&frame.id.to_be_bytes());
        output.push(frame.payload().len() as u8);
        let mut data = [0u8; MAX_PAYLOAD];
        data[..frame.payload().len()].copy_from_slice(frame.payload());
        output.extend_from_slice(&data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let codec = Cs2Codec;
        let mut output = Vec::new();

        codec.encode(&CanFrame::new(0x0031_DF24, &[0x12, 0x34]), &mut output);

        assert_eq!(
            output,
            vec![0x00, 0x31, 0xDF, 0x24, 2, 0x12, 0x34, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_decode_multiple_frames() {
        let codec = Cs2Codec;
        let mut datagram = Vec::new();
        codec.encode(&CanFrame::new(0x0008_0300, &[]), &mut datagram);
        codec.encode(&CanFrame::new(0x0009_4711, &[1, 2, 3]), &mut datagram);

        let mut decoder = Cs2Codec;
        let mut frames = Vec::new();
        decoder.decode(&datagram, |f| frames.push(f));

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].id, 0x0008_0300);
        assert_eq!(frames[1].payload(), &[1, 2, 3]);
    }

    #[test]
    fn test_decode_ignores_partial_tail() {
        let mut codec = Cs2Codec;
        let mut frames = Vec::new();

        codec.decode(&[0u8; 20], |f| frames.push(f));

        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_decode_clamps_dlc() {
        let mut codec = Cs2Codec;
        let mut frames = Vec::new();
        let mut datagram = [0xFFu8; 13];
        datagram[4] = 15;

        codec.decode(&datagram, |f| frames.push(f));

        assert_eq!(frames[0].len, 8);
        assert_eq!(frames[0].id, EXTENDED_ID_MASK);
    }
}
