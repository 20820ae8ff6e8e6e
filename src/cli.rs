//! Command-line interface definition using clap
//!
//! Provides structured argument parsing with automatic help generation.
//! Flags given here override values from the config file.

use crate::config::{Config, TransportKind};
use crate::shell::parse_number;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

// =============================================================================
// CLI Definition
// =============================================================================

/// Client for the Märklin CS2 CAN track bus
#[derive(Parser, Debug, Default)]
#[command(name = "trackbus")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: config.toml next to the executable)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Serial port of an SLCAN adapter (selects the serial transport)
    #[arg(long, value_name = "PORT", global = true)]
    pub port: Option<String>,

    /// CS2 gateway host (selects the UDP transport)
    #[arg(long, value_name = "HOST", global = true)]
    pub host: Option<String>,

    /// Fixed bus hash instead of negotiating one (decimal or 0x hex)
    #[arg(long, value_name = "HASH", value_parser = parse_hash, global = true)]
    pub hash: Option<u16>,

    /// Log every frame in and out
    #[arg(long, global = true)]
    pub debug: bool,

    /// Run on the in-memory loopback bus
    #[arg(long, global = true)]
    pub loopback: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Read commands from stdin, one per line (default)
    Shell,

    /// Accept commands over TCP on localhost
    Serve {
        /// TCP port (overrides config)
        #[arg(long, value_name = "PORT")]
        listen_port: Option<u16>,
    },

    /// Print every frame seen on the bus
    Monitor {
        /// One JSON object per line instead of text
        #[arg(long)]
        json: bool,
    },

    /// Send one raw message in text form, e.g. "0000   04 6 00 00 40 07 01 F4"
    Send {
        /// Message text
        text: String,

        /// Wait for the matching response and print it
        #[arg(long)]
        wait: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Write the effective configuration to the config file
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Run a single shell command, e.g. `run speed 0x4007 500`
    Run {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        words: Vec<String>,
    },
}

fn parse_hash(s: &str) -> Result<u16, String> {
    parse_number(s).ok_or_else(|| format!("'{}' is not a 16-bit number", s))
}

impl Cli {
    /// Apply command-line overrides on top of the file configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref port) = self.port {
            config.transport.kind = TransportKind::Serial;
            config.transport.serial_port = port.clone();
        }
        if let Some(ref host) = self.host {
            config.transport.kind = TransportKind::Udp;
            config.transport.udp_host = host.clone();
        }
        if self.loopback {
            config.transport.kind = TransportKind::Loopback;
            config.controller.loopback = true;
        }
        if let Some(hash) = self.hash {
            config.controller.hash = hash;
        }
        if self.debug {
            config.controller.debug = true;
        }
        if let Some(Command::Serve {
            listen_port: Some(port),
        }) = self.command
        {
            config.shell.listen_port = port;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_defaults() {
        let cli = Cli::parse_from(["trackbus"]);
        assert!(!cli.verbose);
        assert!(!cli.loopback);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_parse_hash_hex_and_decimal() {
        let cli = Cli::parse_from(["trackbus", "--hash", "0xDF24"]);
        assert_eq!(cli.hash, Some(0xDF24));

        let cli = Cli::parse_from(["trackbus", "--hash", "771"]);
        assert_eq!(cli.hash, Some(771));

        assert!(Cli::try_parse_from(["trackbus", "--hash", "0x1FFFF"]).is_err());
    }

    #[test]
    fn test_cli_parse_monitor_json() {
        let cli = Cli::parse_from(["trackbus", "monitor", "--json", "-v"]);
        assert!(cli.verbose);
        assert_eq!(cli.command, Some(Command::Monitor { json: true }));
    }

    #[test]
    fn test_cli_parse_run_words() {
        let cli = Cli::parse_from(["trackbus", "run", "speed", "0x4007", "500"]);
        match cli.command {
            Some(Command::Run { words }) => assert_eq!(words, ["speed", "0x4007", "500"]),
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_send_and_init() {
        let cli = Cli::parse_from(["trackbus", "send", "--wait", "--json", "DF24   18 0"]);
        assert_eq!(
            cli.command,
            Some(Command::Send {
                text: "DF24   18 0".into(),
                wait: true,
                json: true
            })
        );

        let cli = Cli::parse_from(["trackbus", "--config", "bus.toml", "init", "--force"]);
        assert_eq!(cli.command, Some(Command::Init { force: true }));
        assert_eq!(cli.config, Some(PathBuf::from("bus.toml")));
    }

    #[test]
    fn test_apply_overrides() {
        let cli = Cli::parse_from([
            "trackbus",
            "--port",
            "/dev/ttyACM0",
            "--debug",
            "serve",
            "--listen-port",
            "9000",
        ]);
        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.transport.kind, TransportKind::Serial);
        assert_eq!(config.transport.serial_port, "/dev/ttyACM0");
        assert!(config.controller.debug);
        assert_eq!(config.shell.listen_port, 9000);
    }

    #[test]
    fn test_apply_loopback_wins() {
        let cli = Cli::parse_from(["trackbus", "--host", "10.0.0.2", "--loopback"]);
        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.transport.kind, TransportKind::Loopback);
        assert!(config.controller.loopback);
    }
}
