//! Text command shell
//!
//! - `command`: line grammar, parsed into `ShellCommand`
//! - `ShellSession`: runs commands against a controller
//! - `server`: the same commands over TCP, one JSON reply per line
//!
//! The session owns the power flag used by a bare `power`; the controller
//! itself does not track power state.

pub mod command;
pub mod server;

pub use command::{parse_number, ShellCommand};

use crate::controller::{Clock, TrackController};
use crate::error::Result;
use crate::transport::Transport;
use std::io::{BufRead, Write};
use tracing::{debug, warn};

/// Per-session shell state
#[derive(Debug, Default)]
pub struct ShellSession {
    power: bool,
}

impl ShellSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last power state this session switched to
    pub fn power(&self) -> bool {
        self.power
    }

    /// Parse and run one line
    ///
    /// `Ok(None)` means the line was ignored.
    pub fn handle_line<T: Transport, C: Clock>(
        &mut self,
        controller: &mut TrackController<T, C>,
        line: &str,
    ) -> Result<Option<String>> {
        match ShellCommand::parse(line)? {
            Some(command) => self.execute(controller, command).map(Some),
            None => {
                if !line.trim().is_empty() {
                    debug!("Ignoring '{}'", line.trim());
                }
                Ok(None)
            }
        }
    }

    /// Run a parsed command, returning a short human-readable result
    pub fn execute<T: Transport, C: Clock>(
        &mut self,
        controller: &mut TrackController<T, C>,
        command: ShellCommand,
    ) -> Result<String> {
        match command {
            ShellCommand::Power(state) => {
                let on = state.unwrap_or(!self.power);
                controller.set_power(on)?;
                self.power = on;
                Ok(format!("power {}", if on { "on" } else { "off" }))
            }
            ShellCommand::Emergency { address } => {
                controller.emergency_stop(address)?;
                Ok(format!("emergency stop 0x{:04X}", address))
            }
            ShellCommand::Halt { address } => {
                controller.system_halt(address)?;
                Ok(format!("halt 0x{:04X}", address))
            }
            ShellCommand::Direction {
                address,
                direction: Some(direction),
            } => {
                controller.set_loco_direction(address, direction)?;
                Ok(format!("direction 0x{:04X} {:?}", address, direction))
            }
            ShellCommand::Direction {
                address,
                direction: None,
            } => {
                let direction = controller.toggle_loco_direction(address)?;
                Ok(format!("direction 0x{:04X} {:?}", address, direction))
            }
            ShellCommand::Speed { address, speed } => {
                controller.set_loco_speed(address, speed)?;
                Ok(format!("speed 0x{:04X} {}", address, speed))
            }
            ShellCommand::Function {
                address,
                index,
                level,
            } => {
                controller.set_loco_function(address, index, level)?;
                Ok(format!("function 0x{:04X} f{} = {}", address, index, level))
            }
            ShellCommand::Accessory {
                address,
                position,
                power,
                hold_ms,
            } => {
                controller.set_accessory(address, position, power, hold_ms)?;
                Ok(format!("accessory 0x{:04X} position {}", address, position))
            }
            ShellCommand::Turnout { address, straight } => {
                controller.set_turnout(address, straight)?;
                Ok(format!(
                    "turnout 0x{:04X} {}",
                    address,
                    if straight { "straight" } else { "round" }
                ))
            }
            ShellCommand::Version => Ok(format!("version {}", controller.get_version()?)),
            ShellCommand::Status => {
                let stats = controller.stats();
                Ok(format!(
                    "hash 0x{:04X} power {} halted {} sent {} received {} timeouts {} send_failures {}",
                    controller.hash(),
                    if self.power { "on" } else { "off" },
                    controller.is_halted(),
                    stats.frames_sent,
                    stats.frames_received,
                    stats.timeouts,
                    stats.send_failures
                ))
            }
            ShellCommand::Send(mut message) => {
                controller.send(&mut message)?;
                Ok(message.encode_text())
            }
        }
    }
}

/// Read commands from `input` until EOF, writing one reply line each
///
/// Errors are reported on their line and do not end the loop.
pub fn run_interactive<T, C, R, W>(
    controller: &mut TrackController<T, C>,
    input: R,
    mut output: W,
) -> std::io::Result<()>
where
    T: Transport,
    C: Clock,
    R: BufRead,
    W: Write,
{
    let mut session = ShellSession::new();
    for line in input.lines() {
        let line = line?;
        match session.handle_line(controller, &line) {
            Ok(Some(reply)) => writeln!(output, "{}", reply)?,
            Ok(None) => {}
            Err(e) => {
                warn!("'{}' failed: {}", line.trim(), e);
                writeln!(output, "error: {}", e)?;
            }
        }
        output.flush()?;
    }
    Ok(())
}
