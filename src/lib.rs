//! trackbus - client for the Märklin CS2 CAN track bus
//!
//! Layers, leaf first:
//! - `protocol`: messages, their text form and CAN identifier packing
//! - `codec`: byte layouts of CAN frames on concrete links (SLCAN, CS2 UDP)
//! - `transport`: non-blocking frame I/O (loopback, serial, UDP)
//! - `controller`: bus identity, request/response exchange, typed commands
//! - `shell`: text commands on stdin or TCP

pub mod cli;
pub mod codec;
pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod shell;
pub mod transport;

pub use config::Config;
pub use controller::{Clock, ManualClock, SystemClock, TrackController};
pub use error::{Result, TrackError};
pub use protocol::{CanFrame, Direction, Message, ParseMessageError};
pub use transport::Transport;
