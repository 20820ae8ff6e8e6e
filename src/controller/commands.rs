//! Typed locomotive and accessory operations
//!
//! Each operation builds one request, runs it through `exchange` with the
//! configured timeout and decodes the reply. Addresses always go
//! big-endian into `data[2..4]`.

use super::{Clock, TrackController};
use crate::constants::{
    CMD_ACCESSORY, CMD_LOCO_DIRECTION, CMD_LOCO_FUNCTION, CMD_LOCO_SPEED, CMD_PING,
    CMD_READ_CONFIG, CMD_SYSTEM, CMD_WRITE_CONFIG, MAX_SPEED, READ_CONFIG_MARKER,
    REREGISTRATION_COUNTER_RESET, SYS_EMERGENCY_STOP, SYS_GO, SYS_HALT,
    SYS_REREGISTRATION_COUNTER, SYS_STOP, SYS_TRACK_PROTOCOL, TRACK_PROTOCOLS_ALL,
    TURNOUT_HOLD_MS,
};
use crate::error::{TrackError, Result};
use crate::protocol::{turnout_position, Direction, Message};
use crate::transport::Transport;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Accessory state as reported by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessoryState {
    pub position: u8,
    pub power: u8,
}

/// Software version reported by a ping response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

fn system_message(address: u16, subcommand: u8) -> Message {
    let mut message = Message::addressed(CMD_SYSTEM, address, 5);
    message.data[4] = subcommand;
    message
}

impl<T: Transport, C: Clock> TrackController<T, C> {
    // =========================================================================
    // System
    // =========================================================================

    /// Switch track power
    ///
    /// Switching on also resets the MFX re-registration counter and
    /// enables the MM2, MFX and DCC track protocols.
    pub fn set_power(&mut self, on: bool) -> Result<()> {
        self.request(&system_message(0, if on { SYS_GO } else { SYS_STOP }))?;

        if on {
            let mut counter = Message::new(CMD_SYSTEM);
            counter.length = 7;
            counter.data[4] = SYS_REREGISTRATION_COUNTER;
            counter.data[6] = REREGISTRATION_COUNTER_RESET;
            self.request(&counter)?;

            let mut protocols = Message::new(CMD_SYSTEM);
            protocols.length = 6;
            protocols.data[4] = SYS_TRACK_PROTOCOL;
            protocols.data[5] = TRACK_PROTOCOLS_ALL;
            self.request(&protocols)?;
        }
        Ok(())
    }

    /// Halt a decoder (0 = every decoder)
    pub fn system_halt(&mut self, address: u16) -> Result<()> {
        self.request(&system_message(address, SYS_HALT)).map(drop)
    }

    /// Emergency stop a decoder (0 = every decoder)
    pub fn emergency_stop(&mut self, address: u16) -> Result<()> {
        self.request(&system_message(address, SYS_EMERGENCY_STOP))
            .map(drop)
    }

    // =========================================================================
    // Locomotives
    // =========================================================================

    pub fn set_loco_direction(&mut self, address: u16, direction: Direction) -> Result<()> {
        let mut message = Message::addressed(CMD_LOCO_DIRECTION, address, 5);
        message.data[4] = direction.code();
        self.request(&message).map(drop)
    }

    pub fn get_loco_direction(&mut self, address: u16) -> Result<Direction> {
        let reply = self.request(&Message::addressed(CMD_LOCO_DIRECTION, address, 4))?;
        Direction::from_code(reply.data[4]).ok_or_else(|| TrackError::UnexpectedResponse {
            command: CMD_LOCO_DIRECTION,
            reason: format!("unknown direction code {}", reply.data[4]),
        })
    }

    /// Reverse the running direction
    ///
    /// Asks the decoder first. If it reports neither forward nor reverse,
    /// the toggle code is sent instead.
    pub fn toggle_loco_direction(&mut self, address: u16) -> Result<Direction> {
        let current = self.get_loco_direction(address)?;
        let next = current.opposite().unwrap_or(Direction::Toggle);
        debug!("Loco 0x{:04X}: {:?} -> {:?}", address, current, next);
        self.set_loco_direction(address, next)?;
        Ok(next)
    }

    /// Set speed, 0..=1023
    pub fn set_loco_speed(&mut self, address: u16, speed: u16) -> Result<()> {
        if speed > MAX_SPEED {
            return Err(TrackError::InvalidArgument {
                field: "speed",
                reason: format!("{} exceeds {}", speed, MAX_SPEED),
            });
        }
        let mut message = Message::addressed(CMD_LOCO_SPEED, address, 6);
        message.set_word(4, speed);
        self.request(&message).map(drop)
    }

    pub fn get_loco_speed(&mut self, address: u16) -> Result<u16> {
        let reply = self.request(&Message::addressed(CMD_LOCO_SPEED, address, 4))?;
        Ok(reply.word(4))
    }

    pub fn set_loco_function(&mut self, address: u16, function: u8, level: u8) -> Result<()> {
        let mut message = Message::addressed(CMD_LOCO_FUNCTION, address, 6);
        message.data[4] = function;
        message.data[5] = level;
        self.request(&message).map(drop)
    }

    pub fn get_loco_function(&mut self, address: u16, function: u8) -> Result<u8> {
        let mut message = Message::addressed(CMD_LOCO_FUNCTION, address, 5);
        message.data[4] = function;
        Ok(self.request(&message)?.data[5])
    }

    /// Switch a function off if it is on, on otherwise; returns the new level
    pub fn toggle_loco_function(&mut self, address: u16, function: u8) -> Result<u8> {
        let level = if self.get_loco_function(address, function)? != 0 {
            0
        } else {
            1
        };
        self.set_loco_function(address, function, level)?;
        Ok(level)
    }

    // =========================================================================
    // Accessories
    // =========================================================================

    /// Drive an accessory
    ///
    /// With a non-zero `hold_ms` the output is switched off again after
    /// that long, keeping the position. The release goes out even when the
    /// switch-on was not answered; the first error is returned.
    pub fn set_accessory(
        &mut self,
        address: u16,
        position: u8,
        power: u8,
        hold_ms: u64,
    ) -> Result<()> {
        let mut message = Message::addressed(CMD_ACCESSORY, address, 6);
        message.data[4] = position;
        message.data[5] = power;

        let switched = match self.request(&message) {
            // Nothing reached the bus, nothing to release
            Err(e @ (TrackError::SendRejected { .. } | TrackError::Halted)) => return Err(e),
            other => other.map(drop),
        };
        if hold_ms == 0 {
            return switched;
        }

        if let Err(ref e) = switched {
            warn!("Accessory 0x{:04X} not confirmed, releasing anyway: {}", address, e);
        }
        self.clock.sleep_ms(hold_ms);
        message.data[5] = 0;
        let released = self.request(&message).map(drop);
        switched.and(released)
    }

    /// Throw a turnout straight or round
    pub fn set_turnout(&mut self, address: u16, straight: bool) -> Result<()> {
        self.set_accessory(address, turnout_position(straight), 1, TURNOUT_HOLD_MS)
    }

    pub fn get_accessory(&mut self, address: u16) -> Result<AccessoryState> {
        let reply = self.request(&Message::addressed(CMD_ACCESSORY, address, 4))?;
        Ok(AccessoryState {
            position: reply.data[4],
            power: reply.data[5],
        })
    }

    // =========================================================================
    // Decoder configuration
    // =========================================================================

    pub fn read_config(&mut self, address: u16, number: u16) -> Result<u8> {
        let mut message = Message::addressed(CMD_READ_CONFIG, address, 7);
        message.set_word(4, number);
        message.data[6] = READ_CONFIG_MARKER;
        Ok(self.request(&message)?.data[6])
    }

    pub fn write_config(&mut self, address: u16, number: u16, value: u8) -> Result<()> {
        let mut message = Message::addressed(CMD_WRITE_CONFIG, address, 8);
        message.priority = 1;
        message.set_word(4, number);
        message.data[6] = value;
        self.request(&message).map(drop)
    }

    /// Ask the bus for its software version
    pub fn get_version(&mut self) -> Result<Version> {
        let reply = self.request(&Message::new(CMD_PING))?;
        Ok(Version {
            major: reply.data[4],
            minor: reply.data[5],
        })
    }
}
