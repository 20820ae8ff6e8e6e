//! Protocol engine for the track bus
//!
//! The controller owns the bus identity ("hash") and turns messages into
//! frames and back. It handles:
//! - Stamping the hash on every outgoing message
//! - Blocking request/response exchanges with a timeout
//! - Hash negotiation on a shared bus
//! - The send-failure policy
//!
//! It does NOT handle:
//! - Byte-level framing (that's the transport's codec)
//! - Concurrency: every operation takes `&mut self`, one exchange at a time
//!
//! Typed locomotive and accessory operations live in `commands`.

pub mod clock;
pub mod commands;
pub mod stats;

pub use clock::{Clock, ManualClock, SystemClock};
pub use commands::{AccessoryState, Version};
pub use stats::BusStats;

use crate::config::{ControllerConfig, SendFailurePolicy};
use crate::constants::{
    BOOTLOADER_GO, CMD_BOOTLOADER, CMD_PING, CMD_SYSTEM, HASH_CLEAR_MASK, HASH_SET_MASK,
    SYS_STOP,
};
use crate::error::{TrackError, Result};
use crate::protocol::{CanFrame, Message};
use crate::transport::Transport;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info, warn};

/// Controller for one bus participant
///
/// # Type Parameters
///
/// - `T`: link to the bus
/// - `C`: time source for timeouts and the negotiation settle window
///
/// # Example
///
/// ```ignore
/// let transport = transport::open(&config.transport)?;
/// let mut controller = TrackController::new(transport, &config.controller);
/// controller.begin();
/// controller.set_loco_speed(0x4007, 500)?;
/// ```
pub struct TrackController<T: Transport, C: Clock = SystemClock> {
    transport: T,
    clock: C,
    rng: StdRng,
    hash: u16,
    timeout_ms: u64,
    settle_ms: u64,
    debug: bool,
    loopback: bool,
    send_failure: SendFailurePolicy,
    halted: bool,
    stats: BusStats,
}

impl<T: Transport> TrackController<T> {
    /// Create a controller on the wall clock
    pub fn new(transport: T, config: &ControllerConfig) -> Self {
        Self::with_clock(transport, SystemClock::new(), config)
    }
}

impl<T: Transport, C: Clock> TrackController<T, C> {
    /// Create a controller with an explicit time source
    pub fn with_clock(transport: T, clock: C, config: &ControllerConfig) -> Self {
        Self {
            transport,
            clock,
            rng: StdRng::from_entropy(),
            hash: config.hash,
            timeout_ms: config.timeout_ms,
            settle_ms: config.settle_ms,
            debug: config.debug,
            loopback: config.loopback,
            send_failure: config.send_failure,
            halted: false,
            stats: BusStats::default(),
        }
    }

    /// Use a deterministic random source for hash candidates
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current bus identity, 0 until negotiated or assigned
    pub fn hash(&self) -> u16 {
        self.hash
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn is_loopback(&self) -> bool {
        self.loopback
    }

    /// True once a send failure stopped the controller
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn is_identified(&self) -> bool {
        self.hash != 0
    }

    pub fn stats(&self) -> BusStats {
        self.stats
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    // =========================================================================
    // Activation
    // =========================================================================

    /// Announce this controller on the bus and obtain a hash
    ///
    /// Outside loopback mode the track box start message goes out first.
    /// A pre-assigned hash is kept as is.
    pub fn begin(&mut self) {
        if !self.loopback {
            let mut start = Message::new(CMD_BOOTLOADER);
            start.length = 5;
            start.data[4] = BOOTLOADER_GO;
            if let Err(e) = self.send(&mut start) {
                warn!("Start message not sent: {}", e);
            }
        }

        if self.hash == 0 {
            self.negotiate_identity();
        }
        info!("Controller active with hash 0x{:04X}", self.hash);
    }

    /// Pick a hash no other participant is using
    ///
    /// Draws a candidate, pings with it, waits for the settle window and
    /// drains the bus. Any frame carrying the candidate means a conflict
    /// and the loop starts over. Does not return until a candidate goes
    /// uncontested.
    ///
    /// A loopback bus reflects the ping, so there the first candidate is
    /// taken without probing.
    pub fn negotiate_identity(&mut self) {
        loop {
            self.hash = self.draw_hash();
            debug!("Trying hash 0x{:04X}", self.hash);

            if self.loopback {
                return;
            }

            let mut ping = Message::new(CMD_PING);
            if let Err(e) = self.send(&mut ping) {
                warn!("Hash probe not sent: {}", e);
            }

            self.clock.sleep_ms(self.settle_ms);

            let mut conflict = false;
            while let Some(message) = self.receive() {
                if message.hash == self.hash {
                    conflict = true;
                }
            }

            if !conflict {
                info!("Negotiated hash 0x{:04X}", self.hash);
                return;
            }
            self.stats.add_hash_conflict();
            debug!("Hash 0x{:04X} already in use", self.hash);
        }
    }

    fn draw_hash(&mut self) -> u16 {
        (self.rng.gen::<u16>() & HASH_CLEAR_MASK) | HASH_SET_MASK
    }

    // =========================================================================
    // Send / Receive
    // =========================================================================

    /// Stamp the hash on `message` and hand it to the transport
    pub fn send(&mut self, message: &mut Message) -> Result<()> {
        if self.halted {
            return Err(TrackError::Halted);
        }

        message.hash = self.hash;
        let frame = message.to_frame();

        if !self.transport.try_send(&frame) {
            self.stats.add_send_failure();
            warn!("Send error for command 0x{:02X}", message.command);
            if self.send_failure == SendFailurePolicy::EmergencyStop {
                self.stop_after_send_failure();
            }
            return Err(TrackError::SendRejected {
                command: message.command,
            });
        }

        self.stats.add_sent();
        if self.debug {
            log_frame("<==", &frame);
        }
        Ok(())
    }

    /// Poll the transport once
    ///
    /// Frames are decoded whatever their sender or command; filtering is
    /// left to the caller.
    pub fn receive(&mut self) -> Option<Message> {
        let frame = self.transport.try_receive()?;
        self.stats.add_received();
        if self.debug {
            log_frame("==>", &frame);
        }
        Some(Message::from_frame(&frame))
    }

    /// Send `request` and wait for its response
    ///
    /// Returns the first message with the same command and the response
    /// flag set. Everything received before it is discarded. Fails with
    /// `ResponseTimeout` once `timeout_ms` have passed on the clock.
    pub fn exchange(&mut self, request: &Message, timeout_ms: u64) -> Result<Message> {
        let mut out = *request;
        self.send(&mut out)?;

        let start = self.clock.now_ms();
        loop {
            match self.receive() {
                Some(message) if message.command == out.command && message.response => {
                    return Ok(message);
                }
                Some(_) => self.stats.add_discarded(),
                None => std::thread::yield_now(),
            }

            if self.clock.now_ms().saturating_sub(start) >= timeout_ms {
                self.stats.add_timeout();
                return Err(TrackError::ResponseTimeout {
                    command: out.command,
                    timeout_ms,
                });
            }
        }
    }

    /// `exchange` with the configured timeout
    pub fn request(&mut self, request: &Message) -> Result<Message> {
        self.exchange(request, self.timeout_ms)
    }

    /// Best-effort power off, then refuse every further send
    fn stop_after_send_failure(&mut self) {
        error!("Emergency stop after send failure");
        let mut stop = Message::new(CMD_SYSTEM);
        stop.length = 5;
        stop.data[4] = SYS_STOP;
        stop.hash = self.hash;
        if !self.transport.try_send(&stop.to_frame()) {
            warn!("Power-off frame refused too, track state unknown");
        }
        self.halted = true;
    }
}

fn log_frame(direction: &str, frame: &CanFrame) {
    let data = frame
        .payload()
        .iter()
        .map(|b| format!("0x{:02X}", b))
        .collect::<Vec<_>>()
        .join(" - ");
    debug!(
        "{} ID 0x{:08X} {} RESP {} DLC {} CMD 0x{:02X} DATA {}",
        direction,
        frame.id,
        if frame.extended { "extended" } else { "standard" },
        (frame.id >> 16) & 0x01,
        frame.len,
        (frame.id >> 17) & 0xFF,
        data
    );
}
