//! Rule records and their colon-delimited text encoding
//!
//! A rule is written as
//!
//! ```text
//! id:can_id:can_id_mask:data:data_mask:data_length:ACTION:source[:params...]
//! ```
//!
//! - `id` is decimal; 0 asks the rule store to assign one.
//! - `can_id` and `can_id_mask` are hex, with or without a `0x` prefix. An empty mask matches any
//!   identifier.
//! - `data` and `data_mask` are comma-separated hex bytes and may be empty. Data bytes without a
//!   matching mask byte are compared exactly.
//! - `data_length` is the number of payload bytes compared; 0 ignores the payload.
//! - `source` is `fixed` (alias `rule`) or `candata` (alias `can`).
//!
//! The parameters depend on the action:
//!
//! | Action | Parameters |
//! |--------|------------|
//! | `GPIO_SET`, `GPIO_CLEAR`, `GPIO_TOGGLE` | `pin` |
//! | `PWM_SET` | `pin:duty` |
//! | `PWM_CONFIGURE` | `pin:freq_hz:duty_pct:resolution_bits` |
//! | `NEOPIXEL` | `r:g:b:brightness` |
//! | `NEOPIXEL_OFF`, `BUFFER_CLEAR` | none |
//! | `CAN_SEND` | `can_id(hex):data(hex csv)` |
//! | `CAN_SEND_PERIODIC` | `can_id(hex):data(hex csv):interval_ms` |
//! | `I2C_WRITE` | `sda:scl:addr:reg:value` |
//! | `I2C_READ_BUFFER` | `sda:scl:addr:reg:count:slot` |
//! | `GPIO_READ_BUFFER`, `ADC_READ_BUFFER` | `pin:slot` |
//! | `BUFFER_SEND` | `can_id(hex):len:clear_after(0/1)` |
//!
//! Numeric parameters are decimal unless prefixed with `0x`. Missing parameters are zero. With the
//! `candata` source only the CAN payload parameters are read, the rest come from the frame.
use core::fmt::{self, Write};

use crate::actions::{Action, ActionKind, CanPayload};
use crate::error::RuleParseError;
use crate::messages::MAX_DATA_LENGTH;
use crate::params::ParamSource;

/// Length of the longest text a rule can render to
pub const MAX_RULE_TEXT_LEN: usize = 192;

const MAX_FIELDS: usize = 16;
const PARAM_START: usize = 8;

/// A stored automation rule: a frame match pattern plus the action it triggers
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActionRule {
    /// Rule id, 1-255. 0 requests assignment when adding.
    pub id: u8,
    /// Disabled rules neither match nor run on the scheduler
    pub enabled: bool,
    /// Identifier pattern
    pub can_id: u32,
    /// Identifier bits which must match; 0 matches every frame
    pub can_id_mask: u32,
    /// Payload pattern
    pub data: [u8; MAX_DATA_LENGTH],
    /// Payload bits which must match
    pub data_mask: [u8; MAX_DATA_LENGTH],
    /// Number of payload bytes compared; 0 ignores the payload
    pub data_length: u8,
    /// The action and its fixed parameters
    pub action: Action,
    /// Where parameters come from
    pub param_source: ParamSource,
    /// Offset into the frame payload where frame sourced parameters begin
    pub param_data_offset: u8,
    /// Time of the last successful periodic send
    pub last_execute_ms: u32,
    /// Number of successful periodic sends
    pub execute_count: u32,
}

impl ActionRule {
    /// Create an enabled rule matching `can_id` under `can_id_mask`, ignoring the payload
    pub const fn new(id: u8, can_id: u32, can_id_mask: u32, action: Action) -> Self {
        Self {
            id,
            enabled: true,
            can_id,
            can_id_mask,
            data: [0; MAX_DATA_LENGTH],
            data_mask: [0; MAX_DATA_LENGTH],
            data_length: 0,
            action,
            param_source: ParamSource::FromRule,
            param_data_offset: 0,
            last_execute_ms: 0,
            execute_count: 0,
        }
    }

    /// Also require the first `data.len()` payload bytes to match `data` under `mask`
    pub fn with_data(mut self, data: &[u8], mask: &[u8]) -> Self {
        let len = data.len().min(MAX_DATA_LENGTH);
        self.data = [0; MAX_DATA_LENGTH];
        self.data_mask = [0; MAX_DATA_LENGTH];
        self.data[..len].copy_from_slice(&data[..len]);
        for i in 0..len {
            self.data_mask[i] = mask.get(i).copied().unwrap_or(0xFF);
        }
        self.data_length = len as u8;
        self
    }

    /// Take parameters from the triggering frame, starting at payload byte `offset`
    pub fn from_frame(mut self, offset: u8) -> Self {
        self.param_source = ParamSource::FromFrame;
        self.param_data_offset = offset;
        self
    }

    /// The rule's action kind
    pub fn kind(&self) -> ActionKind {
        self.action.kind()
    }

    /// Render the rule as text into a fixed capacity string
    pub fn to_text(&self) -> heapless::String<MAX_RULE_TEXT_LEN> {
        let mut s = heapless::String::new();
        // Capacity covers the longest possible rendering
        let _ = write!(s, "{}", self);
        s
    }
}

/// Render a rule in the text form accepted by [`parse_rule`]
pub fn format_rule(rule: &ActionRule) -> heapless::String<MAX_RULE_TEXT_LEN> {
    rule.to_text()
}

struct HexBytes<'a>(&'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_char(',')?;
            }
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}

impl fmt::Display for ActionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = (self.data_length as usize).min(MAX_DATA_LENGTH);
        write!(
            f,
            "{}:0x{:X}:0x{:X}:{}:{}:{}:{}:{}",
            self.id,
            self.can_id,
            self.can_id_mask,
            HexBytes(&self.data[..len]),
            HexBytes(&self.data_mask[..len]),
            self.data_length,
            self.kind().name(),
            self.param_source.name(),
        )?;

        // Frame sourced rules still carry their outbound payloads
        match self.action {
            Action::CanSend(p) => {
                return write!(f, ":0x{:X}:{}", p.can_id, HexBytes(p.bytes()));
            }
            Action::CanSendPeriodic {
                payload,
                interval_ms,
            } => {
                return write!(
                    f,
                    ":0x{:X}:{}:{}",
                    payload.can_id,
                    HexBytes(payload.bytes()),
                    interval_ms
                );
            }
            _ => (),
        }
        if self.param_source == ParamSource::FromFrame {
            return Ok(());
        }

        match self.action {
            Action::GpioSet { pin } | Action::GpioClear { pin } | Action::GpioToggle { pin } => {
                write!(f, ":{}", pin)
            }
            Action::PwmSet { pin, duty } => write!(f, ":{}:{}", pin, duty),
            Action::PwmConfigure {
                pin,
                freq_hz,
                duty_pct,
                resolution_bits,
            } => write!(f, ":{}:{}:{}:{}", pin, freq_hz, duty_pct, resolution_bits),
            Action::NeopixelColor { r, g, b, brightness } => {
                write!(f, ":{}:{}:{}:{}", r, g, b, brightness)
            }
            Action::I2cWrite {
                sda,
                scl,
                addr,
                reg,
                value,
            } => write!(f, ":{}:{}:0x{:02X}:0x{:02X}:{}", sda, scl, addr, reg, value),
            Action::I2cReadBuffer {
                sda,
                scl,
                addr,
                reg,
                count,
                slot,
            } => write!(
                f,
                ":{}:{}:0x{:02X}:0x{:02X}:{}:{}",
                sda, scl, addr, reg, count, slot
            ),
            Action::GpioReadBuffer { pin, slot } | Action::AdcReadBuffer { pin, slot } => {
                write!(f, ":{}:{}", pin, slot)
            }
            Action::BufferSend {
                can_id,
                len,
                clear_after,
            } => write!(f, ":0x{:X}:{}:{}", can_id, len, clear_after as u8),
            Action::NeopixelOff
            | Action::BufferClear
            | Action::CanSend(_)
            | Action::CanSendPeriodic { .. } => Ok(()),
        }
    }
}

struct Fields<'a> {
    tokens: heapless::Vec<&'a str, MAX_FIELDS>,
}

impl<'a> Fields<'a> {
    fn get(&self, index: usize) -> &'a str {
        self.tokens.get(index).copied().unwrap_or("")
    }

    /// A hex number, `0x` prefix optional
    fn hex(&self, index: usize) -> Result<u32, RuleParseError> {
        parse_hex(self.get(index), index)
    }

    /// A decimal or `0x` prefixed number; missing or empty reads as zero
    fn num(&self, index: usize) -> Result<u32, RuleParseError> {
        let token = self.get(index);
        if token.is_empty() {
            return Ok(0);
        }
        if token.starts_with("0x") || token.starts_with("0X") {
            parse_hex(token, index)
        } else {
            token.parse().map_err(|_| invalid(index))
        }
    }

    fn u8(&self, index: usize) -> Result<u8, RuleParseError> {
        u8::try_from(self.num(index)?).map_err(|_| invalid(index))
    }

    fn param(&self, n: usize) -> Result<u8, RuleParseError> {
        self.u8(PARAM_START + n)
    }

    fn bytes(&self, index: usize) -> Result<([u8; MAX_DATA_LENGTH], usize), RuleParseError> {
        parse_bytes(self.get(index), index)
    }

    fn payload(&self) -> Result<CanPayload, RuleParseError> {
        let can_id = if self.get(PARAM_START).is_empty() {
            0
        } else {
            self.hex(PARAM_START)?
        };
        let (data, len) = self.bytes(PARAM_START + 1)?;
        Ok(CanPayload::new(can_id, &data[..len]))
    }
}

fn invalid(index: usize) -> RuleParseError {
    RuleParseError::InvalidNumber { field: index as u8 }
}

fn parse_hex(token: &str, index: usize) -> Result<u32, RuleParseError> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    u32::from_str_radix(digits, 16).map_err(|_| invalid(index))
}

fn parse_bytes(token: &str, index: usize) -> Result<([u8; MAX_DATA_LENGTH], usize), RuleParseError> {
    let mut bytes = [0u8; MAX_DATA_LENGTH];
    let mut len = 0;
    if token.is_empty() {
        return Ok((bytes, 0));
    }
    for part in token.split(',') {
        if len == MAX_DATA_LENGTH {
            return Err(RuleParseError::TooManyBytes);
        }
        let value = parse_hex(part.trim(), index)?;
        bytes[len] = u8::try_from(value).map_err(|_| invalid(index))?;
        len += 1;
    }
    Ok((bytes, len))
}

/// Parse one rule text record
///
/// The returned rule is enabled, and its id is 0 when the text asks for an assigned id.
pub fn parse_rule(text: &str) -> Result<ActionRule, RuleParseError> {
    let fields = Fields {
        tokens: text.trim().split(':').map(str::trim).take(MAX_FIELDS).collect(),
    };
    if fields.tokens.len() < PARAM_START {
        return Err(RuleParseError::TooFewFields);
    }

    let id = fields.u8(0)?;
    let can_id = fields.hex(1)?;
    let can_id_mask = if fields.get(2).is_empty() {
        0
    } else {
        fields.hex(2)?
    };
    let (data, data_len) = fields.bytes(3)?;
    let (mask, mask_len) = fields.bytes(4)?;
    let data_length = fields.u8(5)?;
    if data_length as usize > MAX_DATA_LENGTH {
        return Err(invalid(5));
    }
    let param_source =
        ParamSource::from_name(fields.get(7)).ok_or(RuleParseError::UnknownParamSource)?;
    let kind = ActionKind::from_name(fields.get(6)).ok_or(RuleParseError::UnknownAction)?;
    let fixed = param_source == ParamSource::FromRule;

    let action = match kind {
        ActionKind::CanSend => Action::CanSend(fields.payload()?),
        ActionKind::CanSendPeriodic => Action::CanSendPeriodic {
            payload: fields.payload()?,
            interval_ms: fields.num(PARAM_START + 2)?,
        },
        _ if !fixed => Action::empty(kind),
        ActionKind::GpioSet => Action::GpioSet {
            pin: fields.param(0)?,
        },
        ActionKind::GpioClear => Action::GpioClear {
            pin: fields.param(0)?,
        },
        ActionKind::GpioToggle => Action::GpioToggle {
            pin: fields.param(0)?,
        },
        ActionKind::PwmSet => Action::PwmSet {
            pin: fields.param(0)?,
            duty: fields.param(1)?,
        },
        ActionKind::PwmConfigure => Action::PwmConfigure {
            pin: fields.param(0)?,
            freq_hz: fields.num(PARAM_START + 1)?,
            duty_pct: fields.param(2)?,
            resolution_bits: fields.param(3)?,
        },
        ActionKind::NeopixelColor => Action::NeopixelColor {
            r: fields.param(0)?,
            g: fields.param(1)?,
            b: fields.param(2)?,
            brightness: fields.param(3)?,
        },
        ActionKind::NeopixelOff => Action::NeopixelOff,
        ActionKind::I2cWrite => Action::I2cWrite {
            sda: fields.param(0)?,
            scl: fields.param(1)?,
            addr: fields.param(2)?,
            reg: fields.param(3)?,
            value: fields.param(4)?,
        },
        ActionKind::I2cReadBuffer => Action::I2cReadBuffer {
            sda: fields.param(0)?,
            scl: fields.param(1)?,
            addr: fields.param(2)?,
            reg: fields.param(3)?,
            count: fields.param(4)?,
            slot: fields.param(5)?,
        },
        ActionKind::GpioReadBuffer => Action::GpioReadBuffer {
            pin: fields.param(0)?,
            slot: fields.param(1)?,
        },
        ActionKind::AdcReadBuffer => Action::AdcReadBuffer {
            pin: fields.param(0)?,
            slot: fields.param(1)?,
        },
        ActionKind::BufferSend => Action::BufferSend {
            can_id: if fields.get(PARAM_START).is_empty() {
                0
            } else {
                fields.hex(PARAM_START)?
            },
            len: fields.param(1)?,
            clear_after: fields.param(2)? != 0,
        },
        ActionKind::BufferClear => Action::BufferClear,
    };

    let mut rule = ActionRule::new(id, can_id, can_id_mask, action);
    rule.param_source = param_source;
    rule.data = data;
    rule.data_length = data_length;
    for i in 0..MAX_DATA_LENGTH {
        rule.data_mask[i] = if i < mask_len {
            mask[i]
        } else if i < data_len {
            0xFF
        } else {
            0
        };
    }
    Ok(rule)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gpio_rule() {
        let rule = parse_rule("0:100:7FF:::0:GPIO_TOGGLE:fixed:13").unwrap();
        assert_eq!(0, rule.id);
        assert!(rule.enabled);
        assert_eq!(0x100, rule.can_id);
        assert_eq!(0x7FF, rule.can_id_mask);
        assert_eq!(0, rule.data_length);
        assert_eq!(Action::GpioToggle { pin: 13 }, rule.action);
        assert_eq!(ParamSource::FromRule, rule.param_source);
    }

    #[test]
    fn test_parse_data_pattern() {
        let rule = parse_rule("5:0x18FF0001:0x1FFFFFFF:01,A0:FF:2:PWM_SET:rule:9:128").unwrap();
        assert_eq!(5, rule.id);
        assert_eq!([0x01, 0xA0], rule.data[..2]);
        // The second byte has no mask entry and is compared exactly
        assert_eq!([0xFF, 0xFF, 0], rule.data_mask[..3]);
        assert_eq!(Action::PwmSet { pin: 9, duty: 128 }, rule.action);
    }

    #[test]
    fn test_parse_candata_ignores_fixed_params() {
        let rule = parse_rule("0:200:7FF:::0:NEOPIXEL:can:1:2:3:4").unwrap();
        assert_eq!(ParamSource::FromFrame, rule.param_source);
        assert_eq!(Action::empty(ActionKind::NeopixelColor), rule.action);

        let rule = parse_rule("0:200:7FF:::0:CAN_SEND_PERIODIC:candata:0x300:DE,AD:250").unwrap();
        let Action::CanSendPeriodic { payload, interval_ms } = rule.action else {
            panic!("wrong action");
        };
        assert_eq!(0x300, payload.can_id);
        assert_eq!(&[0xDE, 0xAD], payload.bytes());
        assert_eq!(250, interval_ms);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            Err(RuleParseError::TooFewFields),
            parse_rule("1:100:7FF:::0:GPIO_SET")
        );
        assert_eq!(
            Err(RuleParseError::UnknownParamSource),
            parse_rule("1:100:7FF:::0:GPIO_SET:sometimes:3")
        );
        assert_eq!(
            Err(RuleParseError::UnknownAction),
            parse_rule("1:100:7FF:::0:GPIO_EXPLODE:fixed:3")
        );
        assert_eq!(
            Err(RuleParseError::InvalidNumber { field: 8 }),
            parse_rule("1:100:7FF:::0:GPIO_SET:fixed:300")
        );
        assert_eq!(
            Err(RuleParseError::TooManyBytes),
            parse_rule("1:100:7FF:1,2,3,4,5,6,7,8,9::0:GPIO_SET:fixed:3")
        );
        assert_eq!(
            Err(RuleParseError::InvalidNumber { field: 5 }),
            parse_rule("1:100:7FF:::9:GPIO_SET:fixed:3")
        );
    }

    #[test]
    fn test_format_parse_round_trip() {
        let rules = [
            ActionRule::new(3, 0x123, 0x7FF, Action::GpioSet { pin: 13 })
                .with_data(&[0x01, 0x02], &[0xFF, 0x0F]),
            ActionRule::new(
                4,
                0x500,
                0,
                Action::CanSendPeriodic {
                    payload: CanPayload::new(0x18FF_0102, &[1, 2, 3]),
                    interval_ms: 1000,
                },
            ),
            ActionRule::new(
                5,
                0x10,
                0x7F0,
                Action::I2cReadBuffer {
                    sda: 21,
                    scl: 22,
                    addr: 0x48,
                    reg: 0x00,
                    count: 2,
                    slot: 3,
                },
            ),
            ActionRule::new(6, 0x10, 0x7FF, Action::empty(ActionKind::PwmConfigure)).from_frame(0),
            ActionRule::new(
                7,
                0x10,
                0x7FF,
                Action::BufferSend {
                    can_id: 0x600,
                    len: 4,
                    clear_after: true,
                },
            ),
        ];
        for rule in rules {
            let text = rule.to_text();
            let parsed = parse_rule(&text).unwrap();
            assert_eq!(rule, parsed, "{}", text.as_str());
        }
    }

    #[test]
    fn test_format_text() {
        let rule = ActionRule::new(1, 0x100, 0x7FF, Action::GpioToggle { pin: 13 });
        assert_eq!("1:0x100:0x7FF:::0:GPIO_TOGGLE:fixed:13", rule.to_text().as_str());
    }
}
