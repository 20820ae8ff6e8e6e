//! Codec abstraction for CAN frame encoding/decoding
//!
//! Separates encoding concerns from transport:
//! - **Codec**: How CAN frames are laid out on a link (SLCAN, CS2 UDP, etc.)
//! - **Transport**: How bytes flow (Serial, UDP, etc.)
//!
//! # Adding a new codec
//!
//! 1. Create `codec/my_codec.rs`
//! 2. Implement the `Codec` trait
//! 3. Add `pub mod my_codec;` here
//! 4. No other changes needed

pub mod cs2;
pub mod slcan;

pub use cs2::Cs2Codec;
pub use slcan::SlcanCodec;

use crate::protocol::CanFrame;

/// Codec trait for encoding/decoding CAN frames
///
/// A codec transforms raw link bytes into CAN frames (decode)
/// and CAN frames into bytes for transmission (encode).
pub trait Codec: Send {
    /// Decode incoming bytes
    ///
    /// Calls `on_frame` for each complete frame detected.
    /// May buffer partial data internally.
    fn decode(&mut self, data: &[u8], on_frame: impl FnMut(CanFrame));

    /// Encode a frame for transmission
    ///
    /// Appends encoded bytes to `output`.
    fn encode(&self, frame: &CanFrame, output: &mut Vec<u8>);
}
