//! Track bus message model
//!
//! - **Message**: one protocol message with its text form
//! - **CanFrame**: the transport-facing frame and identifier packing
//!
//! Byte-level encodings for concrete links live in `codec`.

pub mod frame;
pub mod message;

pub use frame::{pack_id, unpack_id, CanFrame, IdFields};
pub use message::{Message, ParseMessageError};

use crate::constants::{ACC_ROUND, ACC_STRAIGHT};
use crate::constants::{
    ADDR_ACC_DCC, ADDR_ACC_MM2, ADDR_ACC_SX1, ADDR_DCC, ADDR_MFX, ADDR_MM2, ADDR_SX1, ADDR_SX2,
};
use serde::{Deserialize, Serialize};

/// Locomotive direction codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Keep current direction
    Current,
    Forward,
    Reverse,
    /// Change direction
    Toggle,
}

impl Direction {
    pub fn code(self) -> u8 {
        match self {
            Self::Current => 0,
            Self::Forward => 1,
            Self::Reverse => 2,
            Self::Toggle => 3,
        }
    }

    /// Decode a direction byte, `None` for unknown codes
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Current),
            1 => Some(Self::Forward),
            2 => Some(Self::Reverse),
            3 => Some(Self::Toggle),
            _ => None,
        }
    }

    /// The opposite running direction, if there is one
    pub fn opposite(self) -> Option<Self> {
        match self {
            Self::Forward => Some(Self::Reverse),
            Self::Reverse => Some(Self::Forward),
            _ => None,
        }
    }
}

/// Decoder families and their address ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecoderFamily {
    Mm2,
    Sx1,
    Mfx,
    Sx2,
    Dcc,
    AccessorySx1,
    AccessoryMm2,
    AccessoryDcc,
}

impl DecoderFamily {
    pub fn base(self) -> u16 {
        match self {
            Self::Mm2 => ADDR_MM2,
            Self::Sx1 => ADDR_SX1,
            Self::Mfx => ADDR_MFX,
            Self::Sx2 => ADDR_SX2,
            Self::Dcc => ADDR_DCC,
            Self::AccessorySx1 => ADDR_ACC_SX1,
            Self::AccessoryMm2 => ADDR_ACC_MM2,
            Self::AccessoryDcc => ADDR_ACC_DCC,
        }
    }

    /// Bus address of decoder `offset` in this family
    pub fn address(self, offset: u16) -> u16 {
        self.base().wrapping_add(offset)
    }
}

/// Accessory position for a turnout
pub fn turnout_position(straight: bool) -> u8 {
    if straight {
        ACC_STRAIGHT
    } else {
        ACC_ROUND
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_codes_roundtrip() {
        for code in 0..4 {
            assert_eq!(Direction::from_code(code).unwrap().code(), code);
        }
        assert_eq!(Direction::from_code(4), None);
    }

    #[test]
    fn test_direction_opposite() {
        assert_eq!(Direction::Forward.opposite(), Some(Direction::Reverse));
        assert_eq!(Direction::Reverse.opposite(), Some(Direction::Forward));
        assert_eq!(Direction::Toggle.opposite(), None);
    }

    #[test]
    fn test_family_address() {
        assert_eq!(DecoderFamily::Mfx.address(7), 0x4007);
        assert_eq!(DecoderFamily::Dcc.address(42), 0xC02A);
        assert_eq!(DecoderFamily::AccessoryMm2.address(1), 0x3000);
    }

    #[test]
    fn test_mm2_delta_addresses() {
        use crate::constants::{DELTA1, DELTA2, DELTA3, DELTA4};
        let addresses: Vec<u16> = [DELTA1, DELTA2, DELTA3, DELTA4]
            .into_iter()
            .map(|delta| DecoderFamily::Mm2.address(delta))
            .collect();
        assert_eq!(addresses, [78, 72, 60, 24]);
    }

    #[test]
    fn test_turnout_position() {
        assert_eq!(turnout_position(true), 1);
        assert_eq!(turnout_position(false), 0);
    }
}
