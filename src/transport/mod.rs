//! Transport abstraction for CAN frame I/O
//!
//! Separates I/O concerns from protocol logic:
//! - **Transport**: How frames reach the bus (serial adapter, UDP gateway, loopback)
//! - **Codec**: How frames are laid out on the link (handled separately)
//!
//! Each transport manages its own execution model internally:
//! - Serial: blocking reader/writer threads behind bounded queues
//! - UDP: non-blocking socket polled on demand
//! - Loopback: in-memory queue, frames are reflected back
//!
//! # Adding a new transport
//!
//! 1. Create `transport/my_transport.rs`
//! 2. Implement the `Transport` trait
//! 3. Add `pub mod my_transport;` here and a branch in `open`

pub mod loopback;
pub mod serial;
pub mod udp;

pub use loopback::{LoopbackHandle, LoopbackTransport};
pub use serial::SerialTransport;
pub use udp::UdpTransport;

use crate::config::{TransportConfig, TransportKind};
use crate::error::{TrackError, Result};
use crate::protocol::CanFrame;
use tracing::info;

/// Non-blocking access to a CAN bus
///
/// A transport does NOT handle:
/// - Message interpretation (that's the controller's job)
/// - Retries or acknowledgements (there are none on this bus)
///
/// Ordering is FIFO for frames from a single sender; frames of other
/// bus participants may interleave arbitrarily.
pub trait Transport: Send {
    /// Queue a frame for transmission
    ///
    /// Returns false if the frame was not accepted (queue full, link down).
    fn try_send(&mut self, frame: &CanFrame) -> bool;

    /// Take the next received frame, if any, without blocking
    fn try_receive(&mut self) -> Option<CanFrame>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn try_send(&mut self, frame: &CanFrame) -> bool {
        (**self).try_send(frame)
    }

    fn try_receive(&mut self) -> Option<CanFrame> {
        (**self).try_receive()
    }
}

/// Open the transport described by the configuration
pub fn open(config: &TransportConfig) -> Result<Box<dyn Transport>> {
    match config.kind {
        TransportKind::Loopback => {
            info!("Using loopback bus");
            Ok(Box::new(LoopbackTransport::default()))
        }
        TransportKind::Serial => {
            if config.serial_port.is_empty() {
                return Err(TrackError::ConfigValidation {
                    field: "transport.serial_port",
                    reason: "required for the serial transport".into(),
                });
            }
            info!(
                "Opening SLCAN adapter on {} @ {} baud",
                config.serial_port, config.serial_baud
            );
            Ok(Box::new(SerialTransport::open(
                &config.serial_port,
                config.serial_baud,
            )?))
        }
        TransportKind::Udp => {
            info!(
                "Using CS2 gateway {}:{} (listening on {})",
                config.udp_host, config.udp_send_port, config.udp_listen_port
            );
            Ok(Box::new(UdpTransport::open(
                &config.udp_host,
                config.udp_send_port,
                config.udp_listen_port,
            )?))
        }
    }
}
