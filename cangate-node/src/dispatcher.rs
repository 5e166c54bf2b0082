//! Action execution
//!
//! The [`ActionDispatcher`] turns a matched rule into calls on the injected [`Hardware`]. It owns
//! the [`PinAllocator`] and the [`ActionDataBuffer`], so every pin claim and every buffered read
//! passes through it.
//!
//! Parameters come either from the rule itself or, for rules created with the `candata` source,
//! from the triggering frame. Frame parameters are located using the [`ActionDefinition`] the
//! hardware declares for the rule's kind, starting at the rule's `param_data_offset`.
use cangate_common::{
    actions::{Action, ActionKind, CanPayload},
    error::{ActionError, PinMode},
    messages::{CanId, CanMessage, MAX_DATA_LENGTH},
    params::{ActionDefinition, ParamSource},
    platform::PlatformProfile,
    rule::ActionRule,
    traits::{GpioOp, Hardware},
};
use defmt_or_log::debug;

use crate::data_buffer::ActionDataBuffer;
use crate::pin_alloc::PinAllocator;

/// What a successful dispatch did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActionOutcome {
    /// The action ran
    Completed,
    /// The data buffer was transmitted
    BufferSent {
        /// Number of bytes sent
        length: u8,
    },
}

/// Executes rule actions against a [`Hardware`] implementation
#[allow(missing_debug_implementations)]
pub struct ActionDispatcher<H: Hardware> {
    hardware: H,
    pins: PinAllocator,
    buffer: ActionDataBuffer,
}

impl<H: Hardware> ActionDispatcher<H> {
    /// Create a dispatcher for `platform`
    ///
    /// The platform's reserved pins are marked reserved in the pin allocator.
    pub fn new(hardware: H, platform: &PlatformProfile) -> Self {
        let mut pins = PinAllocator::new(platform.gpio_count);
        for pin in platform.reserved_pins {
            pins.reserve(*pin);
        }
        Self {
            hardware,
            pins,
            buffer: ActionDataBuffer::new(),
        }
    }

    /// Access the hardware
    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    /// Mutably access the hardware
    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hardware
    }

    /// Access the pin allocator
    pub fn pins(&self) -> &PinAllocator {
        &self.pins
    }

    /// Mutably access the pin allocator
    pub fn pins_mut(&mut self) -> &mut PinAllocator {
        &mut self.pins
    }

    /// Access the data buffer
    pub fn buffer(&self) -> &ActionDataBuffer {
        &self.buffer
    }

    /// Mutably access the data buffer
    pub fn buffer_mut(&mut self) -> &mut ActionDataBuffer {
        &mut self.buffer
    }

    /// Work out the concrete action a rule performs for `frame`
    ///
    /// Rules with fixed parameters return their stored action. Frame sourced rules read their
    /// parameters, by position, from the definition the hardware declares for their kind. They
    /// fail with [`ActionError::Unsupported`] when there is no definition or it maps fewer
    /// parameters than the action takes. With no frame, as when the scheduler runs a rule, the
    /// stored action is used.
    pub fn resolve(
        &self,
        rule: &ActionRule,
        frame: Option<&CanMessage>,
    ) -> Result<Action, ActionError> {
        let frame = match (rule.param_source, frame) {
            (ParamSource::FromFrame, Some(frame)) => frame,
            _ => return Ok(rule.action),
        };
        if matches!(rule.action, Action::NeopixelOff | Action::BufferClear) {
            return Ok(rule.action);
        }
        let kind = rule.kind();
        let unsupported = ActionError::Unsupported { kind };
        let definition = self.hardware.definition(kind).ok_or(unsupported)?;
        let data = frame.data();
        let start = (rule.param_data_offset as usize).min(data.len());
        resolve_from_frame(&rule.action, definition, &data[start..]).ok_or(unsupported)
    }

    /// Execute `rule`, triggered by `frame` or by the scheduler when `frame` is `None`
    ///
    /// A successful periodic send records `now_ms` and bumps the rule's execution count.
    pub fn execute(
        &mut self,
        rule: &mut ActionRule,
        frame: Option<&CanMessage>,
        now_ms: u32,
    ) -> Result<ActionOutcome, ActionError> {
        let action = self.resolve(rule, frame)?;
        let outcome = self.run(&action)?;
        if action.kind() == ActionKind::CanSendPeriodic {
            rule.last_execute_ms = now_ms;
            rule.execute_count = rule.execute_count.wrapping_add(1);
        }
        Ok(outcome)
    }

    /// Perform a single action
    pub fn run(&mut self, action: &Action) -> Result<ActionOutcome, ActionError> {
        let kind = action.kind();
        let failed = ActionError::HardwareFailure { kind };
        let ok = match *action {
            Action::GpioSet { pin } => self.gpio(GpioOp::Set, pin)?,
            Action::GpioClear { pin } => self.gpio(GpioOp::Clear, pin)?,
            Action::GpioToggle { pin } => self.gpio(GpioOp::Toggle, pin)?,
            Action::PwmSet { pin, duty } => {
                self.pins.allocate(pin, PinMode::Pwm)?;
                self.hardware.pwm_set(pin, duty)
            }
            Action::PwmConfigure {
                pin,
                freq_hz,
                duty_pct,
                resolution_bits,
            } => {
                if duty_pct > 100 {
                    return Err(ActionError::InvalidParam {
                        reason: "duty percent above 100",
                    });
                }
                self.pins.allocate(pin, PinMode::Pwm)?;
                self.hardware
                    .pwm_configure(pin, freq_hz, duty_pct, resolution_bits)
            }
            Action::NeopixelColor { r, g, b, brightness } => {
                self.hardware.neopixel(r, g, b, brightness)
            }
            Action::NeopixelOff => self.hardware.neopixel(0, 0, 0, 0),
            Action::CanSend(payload) => self.send(&payload),
            Action::CanSendPeriodic { payload, .. } => self.send(&payload),
            Action::I2cWrite {
                sda,
                scl,
                addr,
                reg,
                value,
            } => {
                self.i2c_pins(sda, scl)?;
                self.hardware.i2c_write(sda, scl, addr, reg, value)
            }
            Action::I2cReadBuffer {
                sda,
                scl,
                addr,
                reg,
                count,
                slot,
            } => {
                if count == 0 {
                    return Err(ActionError::InvalidParam {
                        reason: "read count must be nonzero",
                    });
                }
                ActionDataBuffer::check_fits(slot, count)?;
                self.i2c_pins(sda, scl)?;
                let mut buf = [0u8; MAX_DATA_LENGTH];
                let buf = &mut buf[..count as usize];
                if !self.hardware.i2c_read(sda, scl, addr, reg, buf) {
                    return Err(failed);
                }
                self.buffer.write(slot, buf)?;
                true
            }
            Action::GpioReadBuffer { pin, slot } => {
                ActionDataBuffer::check_fits(slot, 1)?;
                self.pins.allocate(pin, PinMode::GpioIn)?;
                let level = self.hardware.gpio_read(pin).ok_or(failed)?;
                self.buffer.write_byte(slot, level as u8)?;
                true
            }
            Action::AdcReadBuffer { pin, slot } => {
                ActionDataBuffer::check_fits(slot, 2)?;
                self.pins.allocate(pin, PinMode::Adc)?;
                let value = self.hardware.adc_read(pin).ok_or(failed)?;
                self.buffer.write_u16(slot, value)?;
                true
            }
            Action::BufferSend {
                can_id,
                len,
                clear_after,
            } => {
                let mut data = [0u8; MAX_DATA_LENGTH];
                let used = self.buffer.read_all(&mut data);
                let length = (len as usize).min(used);
                let msg = CanMessage::new(CanId::from_raw(can_id), &data[..length]);
                if !self.hardware.can_send(msg) {
                    return Err(failed);
                }
                if clear_after {
                    self.buffer.clear();
                }
                debug!("Sent {} buffer bytes on 0x{:x}", length, can_id);
                return Ok(ActionOutcome::BufferSent {
                    length: length as u8,
                });
            }
            Action::BufferClear => {
                self.buffer.clear();
                true
            }
        };

        if ok {
            Ok(ActionOutcome::Completed)
        } else {
            Err(failed)
        }
    }

    fn gpio(&mut self, op: GpioOp, pin: u8) -> Result<bool, ActionError> {
        self.pins.allocate(pin, PinMode::GpioOut)?;
        Ok(self.hardware.gpio(op, pin))
    }

    fn i2c_pins(&mut self, sda: u8, scl: u8) -> Result<(), ActionError> {
        if sda == scl {
            return Err(ActionError::InvalidParam {
                reason: "SDA and SCL must be different pins",
            });
        }
        self.pins.check(sda, PinMode::I2cSda)?;
        self.pins.check(scl, PinMode::I2cScl)?;
        self.pins.allocate(sda, PinMode::I2cSda)?;
        self.pins.allocate(scl, PinMode::I2cScl)
    }

    fn send(&mut self, payload: &CanPayload) -> bool {
        let msg = CanMessage::new(CanId::from_raw(payload.can_id), payload.bytes());
        self.hardware.can_send(msg)
    }
}

/// Build the action for `stored` with its parameters read from `data`
///
/// Parameters are taken from the definition's mappings in argument order. Returns `None` if the
/// definition maps fewer parameters than the action takes. The send actions keep their stored
/// payload bytes, and a periodic send keeps its stored interval.
fn resolve_from_frame(stored: &Action, definition: &ActionDefinition, data: &[u8]) -> Option<Action> {
    let value = |index: usize| definition.param(index).map(|m| m.resolve(data));
    let byte = |index: usize| value(index).map(|v| v.as_u8());

    let action = match *stored {
        Action::GpioSet { .. } => Action::GpioSet { pin: byte(0)? },
        Action::GpioClear { .. } => Action::GpioClear { pin: byte(0)? },
        Action::GpioToggle { .. } => Action::GpioToggle { pin: byte(0)? },
        Action::PwmSet { .. } => Action::PwmSet {
            pin: byte(0)?,
            duty: byte(1)?,
        },
        Action::PwmConfigure { .. } => Action::PwmConfigure {
            pin: byte(0)?,
            freq_hz: value(1)?.as_u32(),
            duty_pct: byte(2)?,
            resolution_bits: byte(3)?,
        },
        Action::NeopixelColor { .. } => Action::NeopixelColor {
            r: byte(0)?,
            g: byte(1)?,
            b: byte(2)?,
            brightness: byte(3)?,
        },
        Action::CanSend(mut payload) => {
            payload.can_id = value(0)?.as_u32();
            if let Some(len) = byte(1) {
                payload.len = len.min(MAX_DATA_LENGTH as u8);
            }
            Action::CanSend(payload)
        }
        Action::CanSendPeriodic {
            mut payload,
            interval_ms,
        } => {
            payload.can_id = value(0)?.as_u32();
            Action::CanSendPeriodic {
                payload,
                interval_ms,
            }
        }
        Action::I2cWrite { .. } => Action::I2cWrite {
            sda: byte(0)?,
            scl: byte(1)?,
            addr: byte(2)?,
            reg: byte(3)?,
            value: byte(4)?,
        },
        Action::I2cReadBuffer { .. } => Action::I2cReadBuffer {
            sda: byte(0)?,
            scl: byte(1)?,
            addr: byte(2)?,
            reg: byte(3)?,
            count: byte(4)?,
            slot: byte(5)?,
        },
        Action::GpioReadBuffer { .. } => Action::GpioReadBuffer {
            pin: byte(0)?,
            slot: byte(1)?,
        },
        Action::AdcReadBuffer { .. } => Action::AdcReadBuffer {
            pin: byte(0)?,
            slot: byte(1)?,
        },
        Action::BufferSend { .. } => Action::BufferSend {
            can_id: value(0)?.as_u32(),
            len: byte(1)?,
            clear_after: value(2)?.as_bool(),
        },
        Action::NeopixelOff => Action::NeopixelOff,
        Action::BufferClear => Action::BufferClear,
    };
    Some(action)
}
