//! Application-wide constants
//!
//! Protocol values are part of the bus contract shared with the track box,
//! the MS2 and every other participant. Do not renumber them.

// =============================================================================
// Decoder address bases
// =============================================================================

/// MM2 locomotive
pub const ADDR_MM2: u16 = 0x0000;
/// Selectrix (old) locomotive
pub const ADDR_SX1: u16 = 0x0800;
/// MFX locomotive
pub const ADDR_MFX: u16 = 0x4000;
/// Selectrix (new) locomotive
pub const ADDR_SX2: u16 = 0x8000;
/// DCC locomotive
pub const ADDR_DCC: u16 = 0xC000;
/// Selectrix (old) magnetic accessory
pub const ADDR_ACC_SX1: u16 = 0x2000;
/// MM2 magnetic accessory
pub const ADDR_ACC_MM2: u16 = 0x2FFF;
/// DCC magnetic accessory
pub const ADDR_ACC_DCC: u16 = 0x3800;

/// Classic MM2 delta addresses
pub const DELTA1: u16 = 78;
pub const DELTA2: u16 = 72;
pub const DELTA3: u16 = 60;
pub const DELTA4: u16 = 24;

// =============================================================================
// Accessory positions (with aliases)
// =============================================================================

pub const ACC_OFF: u8 = 0;
pub const ACC_ROUND: u8 = 0;
pub const ACC_RED: u8 = 0;
pub const ACC_RIGHT: u8 = 0;
pub const ACC_HP0: u8 = 0;

pub const ACC_ON: u8 = 1;
pub const ACC_GREEN: u8 = 1;
pub const ACC_STRAIGHT: u8 = 1;
pub const ACC_HP1: u8 = 1;

pub const ACC_YELLOW: u8 = 2;
pub const ACC_LEFT: u8 = 2;
pub const ACC_HP2: u8 = 2;

pub const ACC_WHITE: u8 = 3;
pub const ACC_SH0: u8 = 3;

// =============================================================================
// Command codes
// =============================================================================

pub const CMD_SYSTEM: u8 = 0x00;
pub const CMD_LOCO_SPEED: u8 = 0x04;
pub const CMD_LOCO_DIRECTION: u8 = 0x05;
pub const CMD_LOCO_FUNCTION: u8 = 0x06;
pub const CMD_READ_CONFIG: u8 = 0x07;
pub const CMD_WRITE_CONFIG: u8 = 0x08;
pub const CMD_ACCESSORY: u8 = 0x0B;
pub const CMD_PING: u8 = 0x18;
pub const CMD_BOOTLOADER: u8 = 0x1B;

// System sub-commands (data[4] of CMD_SYSTEM)
pub const SYS_STOP: u8 = 0x00;
pub const SYS_GO: u8 = 0x01;
pub const SYS_HALT: u8 = 0x02;
pub const SYS_EMERGENCY_STOP: u8 = 0x03;
pub const SYS_TRACK_PROTOCOL: u8 = 0x08;
pub const SYS_REREGISTRATION_COUNTER: u8 = 0x09;

/// bit0 = MM2, bit1 = MFX, bit2 = DCC
pub const TRACK_PROTOCOLS_ALL: u8 = 0x07;
pub const REREGISTRATION_COUNTER_RESET: u8 = 0x03;

/// Track box start sub-command, sent once at activation
pub const BOOTLOADER_GO: u8 = 0x11;

/// Marker in data[6] of a config read request
pub const READ_CONFIG_MARKER: u8 = 0x01;

// =============================================================================
// Identity
// =============================================================================

/// Bits that must be cleared in a device hash
pub const HASH_CLEAR_MASK: u16 = 0xFF7F;
/// Bits that must be set in a device hash
pub const HASH_SET_MASK: u16 = 0x0300;

// =============================================================================
// Limits
// =============================================================================

pub const MAX_SPEED: u16 = 1023;
pub const MAX_PAYLOAD: usize = 8;

/// Turnout coil hold time used by `set_turnout`
pub const TURNOUT_HOLD_MS: u64 = 1000;

// =============================================================================
// Timing
// =============================================================================

/// Default response wait budget for an exchange (milliseconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Default wait window after a hash probe (milliseconds)
pub const DEFAULT_SETTLE_MS: u64 = 1000;

// =============================================================================
// Network
// =============================================================================

/// CS2 gateway port that accepts frames for the bus
pub const DEFAULT_UDP_SEND_PORT: u16 = 15731;

/// Local port the CS2 gateway forwards bus frames to
pub const DEFAULT_UDP_LISTEN_PORT: u16 = 15730;

/// Default TCP port for the command shell
pub const DEFAULT_SHELL_PORT: u16 = 15732;

pub const DEFAULT_UDP_HOST: &str = "192.168.1.2";

/// Max socket bind retry attempts
pub const MAX_SOCKET_RETRY_ATTEMPTS: u32 = 5;

/// Base delay between retry attempts (milliseconds)
pub const RETRY_BASE_DELAY_MS: u64 = 200;

// =============================================================================
// Buffers
// =============================================================================

/// CS2 UDP datagram size: 4 id + 1 dlc + 8 data
pub const CS2_FRAME_SIZE: usize = 13;

/// Serial read buffer size
pub const SERIAL_BUFFER_SIZE: usize = 1024;

/// Frame queue capacity for background transports
pub const CHANNEL_CAPACITY: usize = 256;

/// Queue capacity of the loopback bus
pub const LOOPBACK_CAPACITY: usize = 64;

// =============================================================================
// Serial
// =============================================================================

pub const DEFAULT_SERIAL_BAUD: u32 = 115_200;

/// Consecutive zero-byte reads before assuming port disconnected
pub const SERIAL_DISCONNECT_THRESHOLD: u32 = 10;
