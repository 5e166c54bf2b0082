use std::collections::HashMap;

use cangate_common::{
    messages::CanMessage,
    params::ActionDefinition,
    platform::PlatformProfile,
    traits::{GpioOp, Hardware},
};

/// One call made on the simulated hardware
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HwCall {
    Gpio(GpioOp, u8),
    GpioRead(u8),
    PwmSet {
        pin: u8,
        duty: u8,
    },
    PwmConfigure {
        pin: u8,
        freq_hz: u32,
        duty_pct: u8,
        resolution_bits: u8,
    },
    Neopixel {
        r: u8,
        g: u8,
        b: u8,
        brightness: u8,
    },
    CanSend(CanMessage),
    I2cWrite {
        sda: u8,
        scl: u8,
        addr: u8,
        reg: u8,
        value: u8,
    },
    I2cRead {
        addr: u8,
        reg: u8,
        count: usize,
    },
    AdcRead(u8),
}

/// A board simulation which records every call
///
/// Output levels are tracked so toggles can be checked, inputs and analog values are preset by
/// the test, and any call can be made to fail.
#[derive(Debug, Default)]
pub struct SimHardware {
    pub calls: Vec<HwCall>,
    pub levels: HashMap<u8, bool>,
    pub adc_values: HashMap<u8, u16>,
    /// Device registers, keyed by (address, register)
    pub i2c_regs: HashMap<(u8, u8), u8>,
    pub fail: bool,
    pub fail_can: bool,
    definitions: &'static [ActionDefinition],
}

impl SimHardware {
    /// Create a simulation declaring the definitions of `platform`
    pub fn new(platform: &PlatformProfile) -> Self {
        Self {
            definitions: platform.definitions,
            ..Default::default()
        }
    }

    /// Create a simulation which declares no definitions
    pub fn without_definitions() -> Self {
        Self::default()
    }

    pub fn level(&self, pin: u8) -> bool {
        self.levels.get(&pin).copied().unwrap_or(false)
    }

    pub fn gpio_calls(&self) -> Vec<(GpioOp, u8)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::Gpio(op, pin) => Some((*op, *pin)),
                _ => None,
            })
            .collect()
    }

    pub fn sent_frames(&self) -> Vec<CanMessage> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::CanSend(msg) => Some(*msg),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl Hardware for SimHardware {
    fn gpio(&mut self, op: GpioOp, pin: u8) -> bool {
        self.calls.push(HwCall::Gpio(op, pin));
        if self.fail {
            return false;
        }
        let level = match op {
            GpioOp::Set => true,
            GpioOp::Clear => false,
            GpioOp::Toggle => !self.level(pin),
        };
        self.levels.insert(pin, level);
        true
    }

    fn gpio_read(&mut self, pin: u8) -> Option<bool> {
        self.calls.push(HwCall::GpioRead(pin));
        if self.fail {
            None
        } else {
            Some(self.level(pin))
        }
    }

    fn pwm_set(&mut self, pin: u8, duty: u8) -> bool {
        self.calls.push(HwCall::PwmSet { pin, duty });
        !self.fail
    }

    fn pwm_configure(&mut self, pin: u8, freq_hz: u32, duty_pct: u8, resolution_bits: u8) -> bool {
        self.calls.push(HwCall::PwmConfigure {
            pin,
            freq_hz,
            duty_pct,
            resolution_bits,
        });
        !self.fail
    }

    fn neopixel(&mut self, r: u8, g: u8, b: u8, brightness: u8) -> bool {
        self.calls.push(HwCall::Neopixel { r, g, b, brightness });
        !self.fail
    }

    fn can_send(&mut self, msg: CanMessage) -> bool {
        self.calls.push(HwCall::CanSend(msg));
        !(self.fail || self.fail_can)
    }

    fn i2c_write(&mut self, sda: u8, scl: u8, addr: u8, reg: u8, value: u8) -> bool {
        self.calls.push(HwCall::I2cWrite {
            sda,
            scl,
            addr,
            reg,
            value,
        });
        if self.fail {
            return false;
        }
        self.i2c_regs.insert((addr, reg), value);
        true
    }

    fn i2c_read(&mut self, _sda: u8, _scl: u8, addr: u8, reg: u8, buf: &mut [u8]) -> bool {
        self.calls.push(HwCall::I2cRead {
            addr,
            reg,
            count: buf.len(),
        });
        if self.fail {
            return false;
        }
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self
                .i2c_regs
                .get(&(addr, reg.wrapping_add(i as u8)))
                .copied()
                .unwrap_or(0);
        }
        true
    }

    fn adc_read(&mut self, pin: u8) -> Option<u16> {
        self.calls.push(HwCall::AdcRead(pin));
        if self.fail {
            None
        } else {
            Some(self.adc_values.get(&pin).copied().unwrap_or(0))
        }
    }

    fn definitions(&self) -> &'static [ActionDefinition] {
        self.definitions
    }
}
