//! Centralized error types for the controller
//!
//! All errors are represented by the `TrackError` enum.
//! Use `Result<T>` as shorthand for `std::result::Result<T, TrackError>`.

use crate::protocol::ParseMessageError;
use std::fmt;
use std::path::PathBuf;

/// All controller errors
#[derive(Debug)]
pub enum TrackError {
    // === Bus ===
    /// Transport refused the frame (queue full, port gone)
    SendRejected { command: u8 },
    /// No matching response within the exchange budget
    ResponseTimeout { command: u8, timeout_ms: u64 },
    /// Controller stopped itself after a send failure
    Halted,
    /// Response payload does not make sense for the request
    UnexpectedResponse { command: u8, reason: String },
    /// Text message could not be parsed
    Decode(ParseMessageError),
    /// Argument outside the range the protocol accepts
    InvalidArgument { field: &'static str, reason: String },

    // === Transport ===
    /// Failed to open serial port
    SerialOpen {
        port: String,
        source: std::io::Error,
    },
    /// Failed to bind UDP socket
    UdpBind { port: u16, source: std::io::Error },

    // === Shell ===
    /// Failed to bind shell server port
    ShellBind { port: u16, source: std::io::Error },
    /// Shell connection or dispatch error
    ShellProtocol { message: String },

    // === IO ===
    /// File system operation failed
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to read config file
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Invalid config value
    ConfigValidation { field: &'static str, reason: String },

    // === Runtime ===
    /// Tokio runtime creation failed
    Runtime { source: std::io::Error },
}

impl std::error::Error for TrackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SerialOpen { source, .. }
            | Self::UdpBind { source, .. }
            | Self::ShellBind { source, .. }
            | Self::Io { source, .. }
            | Self::ConfigRead { source, .. }
            | Self::Runtime { source } => Some(source),
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for TrackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendRejected { command } => {
                write!(f, "Transport rejected frame (command 0x{:02X})", command)
            }
            Self::ResponseTimeout {
                command,
                timeout_ms,
            } => write!(
                f,
                "No response to command 0x{:02X} within {} ms",
                command, timeout_ms
            ),
            Self::Halted => write!(f, "Controller halted after send failure"),
            Self::UnexpectedResponse { command, reason } => {
                write!(f, "Unexpected response to 0x{:02X}: {}", command, reason)
            }
            Self::Decode(e) => write!(f, "Malformed message: {}", e),
            Self::InvalidArgument { field, reason } => {
                write!(f, "Invalid {}: {}", field, reason)
            }
            Self::SerialOpen { port, .. } => write!(f, "Cannot open serial port: {}", port),
            Self::UdpBind { port, .. } => write!(f, "Cannot bind UDP port {}", port),
            Self::ShellBind { port, .. } => write!(f, "Cannot bind shell port {}", port),
            Self::ShellProtocol { message } => write!(f, "Shell error: {}", message),
            Self::Io { path, .. } => write!(f, "IO error: {}", path.display()),
            Self::ConfigRead { path, .. } => {
                write!(f, "Cannot read config: {}", path.display())
            }
            Self::ConfigValidation { field, reason } => {
                write!(f, "Invalid {}: {}", field, reason)
            }
            Self::Runtime { .. } => write!(f, "Failed to create runtime"),
        }
    }
}

impl From<ParseMessageError> for TrackError {
    fn from(e: ParseMessageError) -> Self {
        Self::Decode(e)
    }
}

impl TrackError {
    /// Whether the caller may simply retry the operation
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ResponseTimeout { .. } | Self::SendRejected { .. })
    }
}

/// Alias for Result with TrackError
pub type Result<T> = std::result::Result<T, TrackError>;
