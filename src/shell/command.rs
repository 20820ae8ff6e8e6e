//! Shell command grammar
//!
//! One command per line, space-separated tokens, keyword first:
//!
//! ```text
//! power [0|1]
//! emergency <address>
//! halt <address>
//! direction <address> [direction]
//! speed <address> <value>
//! function <address> <index> <level>
//! accessory <address> <position> <power> <durationMs>
//! turnout <address> <straight|round>
//! version
//! status
//! send <message text>
//! ```
//!
//! Numbers are decimal or `0x` hexadecimal. Accessory positions may also
//! be given by name (`red`, `green`, `hp1`, ...). Lines with an unknown
//! keyword parse to `None`.

use crate::constants::{
    ACC_GREEN, ACC_HP0, ACC_HP1, ACC_HP2, ACC_LEFT, ACC_OFF, ACC_ON, ACC_RED, ACC_RIGHT,
    ACC_ROUND, ACC_SH0, ACC_STRAIGHT, ACC_WHITE, ACC_YELLOW,
};
use crate::error::{TrackError, Result};
use crate::protocol::{Direction, Message};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// `None` toggles the session's power flag
    Power(Option<bool>),
    Emergency {
        address: u16,
    },
    Halt {
        address: u16,
    },
    /// `None` toggles the current direction
    Direction {
        address: u16,
        direction: Option<Direction>,
    },
    Speed {
        address: u16,
        speed: u16,
    },
    Function {
        address: u16,
        index: u8,
        level: u8,
    },
    Accessory {
        address: u16,
        position: u8,
        power: u8,
        hold_ms: u64,
    },
    Turnout {
        address: u16,
        straight: bool,
    },
    Version,
    Status,
    /// Raw message in text wire form
    Send(Message),
}

/// Parse a decimal or `0x`-prefixed hexadecimal 16-bit number
pub fn parse_number(token: &str) -> Option<u16> {
    parse_value(token)
}

fn parse_value<N: TryFrom<u64>>(token: &str) -> Option<N> {
    let value = match token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok()?,
        None => token.parse::<u64>().ok()?,
    };
    N::try_from(value).ok()
}

/// Token cursor that reports which argument is missing or malformed
struct Args<'a> {
    keyword: &'a str,
    tokens: std::str::SplitWhitespace<'a>,
}

impl<'a> Args<'a> {
    fn next_token(&mut self, field: &'static str) -> Result<&'a str> {
        self.tokens.next().ok_or_else(|| TrackError::InvalidArgument {
            field,
            reason: format!("missing for '{}'", self.keyword),
        })
    }

    fn number<N: TryFrom<u64>>(&mut self, field: &'static str) -> Result<N> {
        let token = self.next_token(field)?;
        parse_value(token).ok_or_else(|| TrackError::InvalidArgument {
            field,
            reason: format!("'{}' is not a valid number", token),
        })
    }

    fn optional(&mut self) -> Option<&'a str> {
        self.tokens.next()
    }
}

fn parse_direction(token: &str) -> Result<Direction> {
    let direction = match token.to_ascii_lowercase().as_str() {
        "forward" => Some(Direction::Forward),
        "reverse" => Some(Direction::Reverse),
        "toggle" => Some(Direction::Toggle),
        "current" => Some(Direction::Current),
        other => parse_value::<u8>(other).and_then(Direction::from_code),
    };
    direction.ok_or_else(|| TrackError::InvalidArgument {
        field: "direction",
        reason: format!("'{}' is not a direction", token),
    })
}

fn parse_position(token: &str) -> Result<u8> {
    let position = match token.to_ascii_lowercase().as_str() {
        "off" => ACC_OFF,
        "round" => ACC_ROUND,
        "red" => ACC_RED,
        "right" => ACC_RIGHT,
        "hp0" => ACC_HP0,
        "on" => ACC_ON,
        "green" => ACC_GREEN,
        "straight" => ACC_STRAIGHT,
        "hp1" => ACC_HP1,
        "yellow" => ACC_YELLOW,
        "left" => ACC_LEFT,
        "hp2" => ACC_HP2,
        "white" => ACC_WHITE,
        "sh0" => ACC_SH0,
        other => {
            return parse_value(other).ok_or_else(|| TrackError::InvalidArgument {
                field: "position",
                reason: format!("'{}' is not an accessory position", token),
            })
        }
    };
    Ok(position)
}

fn parse_flag(token: &str) -> Result<bool> {
    match token.to_ascii_lowercase().as_str() {
        "on" | "true" => Ok(true),
        "off" | "false" => Ok(false),
        other => parse_value::<u8>(other)
            .map(|v| v != 0)
            .ok_or_else(|| TrackError::InvalidArgument {
                field: "power",
                reason: format!("'{}' is not 0 or 1", token),
            }),
    }
}

impl ShellCommand {
    /// Parse one line
    ///
    /// Returns `Ok(None)` for blank lines and unknown keywords, an error
    /// when a known keyword has bad arguments.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            return Ok(None);
        };
        let keyword_lower = keyword.to_ascii_lowercase();

        // The message text has significant spacing, take it verbatim
        if keyword_lower == "send" {
            let text = line.get(keyword.len() + 1..).unwrap_or("");
            let message = text.parse::<Message>()?;
            return Ok(Some(Self::Send(message)));
        }

        let mut args = Args { keyword, tokens };
        let command = match keyword_lower.as_str() {
            "power" => Self::Power(args.optional().map(parse_flag).transpose()?),
            "emergency" => Self::Emergency {
                address: args.number("address")?,
            },
            "halt" => Self::Halt {
                address: args.number("address")?,
            },
            "direction" => Self::Direction {
                address: args.number("address")?,
                direction: args.optional().map(parse_direction).transpose()?,
            },
            "speed" => Self::Speed {
                address: args.number("address")?,
                speed: args.number("speed")?,
            },
            "function" => Self::Function {
                address: args.number("address")?,
                index: args.number("function")?,
                level: args.number("level")?,
            },
            "accessory" => Self::Accessory {
                address: args.number("address")?,
                position: parse_position(args.next_token("position")?)?,
                power: args.number("power")?,
                hold_ms: args.number("duration")?,
            },
            "turnout" => {
                let address = args.number("address")?;
                let straight = match parse_position(args.next_token("position")?)? {
                    ACC_STRAIGHT => true,
                    ACC_ROUND => false,
                    other => {
                        return Err(TrackError::InvalidArgument {
                            field: "position",
                            reason: format!("{} is not straight or round", other),
                        })
                    }
                };
                Self::Turnout { address, straight }
            }
            "version" => Self::Version,
            "status" => Self::Status,
            _ => return Ok(None),
        };
        Ok(Some(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> ShellCommand {
        ShellCommand::parse(line).unwrap().unwrap()
    }

    // =========================================================================
    // Numbers
    // =========================================================================

    #[test]
    fn test_parse_number_forms() {
        assert_eq!(parse_number("16391"), Some(0x4007));
        assert_eq!(parse_number("0x4007"), Some(0x4007));
        assert_eq!(parse_number("0XdF24"), Some(0xDF24));
        assert_eq!(parse_number("65536"), None);
        assert_eq!(parse_number("-1"), None);
        assert_eq!(parse_number("0x"), None);
    }

    // =========================================================================
    // Keywords
    // =========================================================================

    #[test]
    fn test_power_forms() {
        assert_eq!(parse("power 1"), ShellCommand::Power(Some(true)));
        assert_eq!(parse("power 0"), ShellCommand::Power(Some(false)));
        assert_eq!(parse("power"), ShellCommand::Power(None));
        assert_eq!(parse("  POWER on "), ShellCommand::Power(Some(true)));
    }

    #[test]
    fn test_speed_and_function() {
        assert_eq!(
            parse("speed 0x4007 500"),
            ShellCommand::Speed {
                address: 0x4007,
                speed: 500
            }
        );
        assert_eq!(
            parse("function 16391 0 1"),
            ShellCommand::Function {
                address: 0x4007,
                index: 0,
                level: 1
            }
        );
    }

    #[test]
    fn test_direction_optional() {
        assert_eq!(
            parse("direction 0x4007"),
            ShellCommand::Direction {
                address: 0x4007,
                direction: None
            }
        );
        assert_eq!(
            parse("direction 0x4007 2"),
            ShellCommand::Direction {
                address: 0x4007,
                direction: Some(Direction::Reverse)
            }
        );
        assert_eq!(
            parse("direction 0x4007 forward"),
            ShellCommand::Direction {
                address: 0x4007,
                direction: Some(Direction::Forward)
            }
        );
    }

    #[test]
    fn test_accessory_and_turnout() {
        assert_eq!(
            parse("accessory 0x3000 1 1 250"),
            ShellCommand::Accessory {
                address: 0x3000,
                position: 1,
                power: 1,
                hold_ms: 250
            }
        );
        assert_eq!(
            parse("accessory 0x3000 yellow 1 0"),
            ShellCommand::Accessory {
                address: 0x3000,
                position: 2,
                power: 1,
                hold_ms: 0
            }
        );
        assert!(ShellCommand::parse("turnout 0x3000 white").is_err());
        assert_eq!(
            parse("turnout 0x3000 round"),
            ShellCommand::Turnout {
                address: 0x3000,
                straight: false
            }
        );
    }

    #[test]
    fn test_send_keeps_spacing() {
        match parse("send 0000   04 6 00 00 40 07 01 F4") {
            ShellCommand::Send(message) => {
                assert!(!message.response);
                assert_eq!(message.command, 0x04);
                assert_eq!(message.payload(), &[0, 0, 0x40, 0x07, 0x01, 0xF4]);
            }
            other => panic!("Expected Send, got {:?}", other),
        }
    }

    // =========================================================================
    // Errors
    // =========================================================================

    #[test]
    fn test_unknown_and_blank_ignored() {
        assert_eq!(ShellCommand::parse("").unwrap(), None);
        assert_eq!(ShellCommand::parse("   ").unwrap(), None);
        assert_eq!(ShellCommand::parse("reboot now").unwrap(), None);
    }

    #[test]
    fn test_bad_arguments_reported() {
        assert!(matches!(
            ShellCommand::parse("speed 0x4007"),
            Err(TrackError::InvalidArgument { field: "speed", .. })
        ));
        assert!(matches!(
            ShellCommand::parse("speed zz 10"),
            Err(TrackError::InvalidArgument {
                field: "address",
                ..
            })
        ));
        assert!(matches!(
            ShellCommand::parse("direction 1 sideways"),
            Err(TrackError::InvalidArgument { .. })
        ));
        assert!(matches!(
            ShellCommand::parse("send DF24"),
            Err(TrackError::Decode(_))
        ));
    }
}
