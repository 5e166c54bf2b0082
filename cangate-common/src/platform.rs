//! Platform capability profiles
//!
//! A [`PlatformProfile`] is chosen once at startup and passed to the gateway. It decides which
//! action kinds the rule store will accept, which pins are owned by the board, and which action
//! definitions are available for resolving frame parameters.
use crate::actions::ActionKind;
use crate::definitions::{self, ESP32_DEFINITIONS, RP2040_DEFINITIONS, SAMD51_DEFINITIONS};
use crate::params::ActionDefinition;

/// A set of hardware capability flags
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CapabilitySet(pub u32);

impl CapabilitySet {
    /// Digital read and write
    pub const GPIO_DIGITAL: CapabilitySet = CapabilitySet(1 << 0);
    /// PWM output
    pub const GPIO_PWM: CapabilitySet = CapabilitySet(1 << 1);
    /// Analog input
    pub const GPIO_ANALOG: CapabilitySet = CapabilitySet(1 << 2);
    /// Analog output
    pub const GPIO_DAC: CapabilitySet = CapabilitySet(1 << 3);
    /// Addressable RGB LED
    pub const NEOPIXEL: CapabilitySet = CapabilitySet(1 << 4);
    /// Frame transmission from actions
    pub const CAN_SEND: CapabilitySet = CapabilitySet(1 << 5);
    /// Persistent rule storage
    pub const FLASH_STORAGE: CapabilitySet = CapabilitySet(1 << 6);
    /// Hardware crypto engine
    pub const CRYPTO: CapabilitySet = CapabilitySet(1 << 7);
    /// Real time clock
    pub const RTC: CapabilitySet = CapabilitySet(1 << 8);
    /// I2S audio
    pub const I2S: CapabilitySet = CapabilitySet(1 << 9);
    /// I2C controller
    pub const I2C: CapabilitySet = CapabilitySet(1 << 10);

    /// The empty set
    pub const fn empty() -> Self {
        CapabilitySet(0)
    }

    /// Union of two sets
    pub const fn with(self, other: CapabilitySet) -> Self {
        CapabilitySet(self.0 | other.0)
    }

    /// Returns true if every flag in `other` is present
    pub const fn contains(&self, other: CapabilitySet) -> bool {
        self.0 & other.0 == other.0
    }
}

impl core::ops::BitOr for CapabilitySet {
    type Output = CapabilitySet;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.with(rhs)
    }
}

/// Maximum number of hardware reserved pins a profile can list
pub const MAX_RESERVED_PINS: usize = 8;

/// Static description of a board
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlatformProfile {
    /// Board name
    pub board_name: &'static str,
    /// Microcontroller
    pub chip: &'static str,
    /// Capability flags
    pub capabilities: CapabilitySet,
    /// Rule table capacity
    pub max_rules: u8,
    /// Number of GPIO pins, which bounds pin numbers
    pub gpio_count: u8,
    /// PWM channels
    pub pwm_channels: u8,
    /// ADC channels
    pub adc_channels: u8,
    /// DAC channels
    pub dac_channels: u8,
    /// Pins owned by board hardware (CAN transceiver, LED data line)
    pub reserved_pins: &'static [u8],
    /// Action definitions for frame sourced parameters
    pub definitions: &'static [ActionDefinition],
}

impl PlatformProfile {
    /// Raspberry Pi Pico with an external transceiver on PIO
    pub const RP2040: PlatformProfile = PlatformProfile {
        board_name: "Raspberry Pi Pico",
        chip: "RP2040",
        capabilities: CapabilitySet::GPIO_DIGITAL
            .with(CapabilitySet::GPIO_PWM)
            .with(CapabilitySet::GPIO_ANALOG)
            .with(CapabilitySet::CAN_SEND)
            .with(CapabilitySet::FLASH_STORAGE),
        max_rules: 16,
        gpio_count: 30,
        pwm_channels: 16,
        adc_channels: 4,
        dac_channels: 0,
        reserved_pins: &[4, 5],
        definitions: &RP2040_DEFINITIONS,
    };

    /// Adafruit Feather M4 CAN
    pub const SAMD51: PlatformProfile = PlatformProfile {
        board_name: "Adafruit Feather M4 CAN",
        chip: "ATSAME51J19A",
        capabilities: CapabilitySet::GPIO_DIGITAL
            .with(CapabilitySet::GPIO_PWM)
            .with(CapabilitySet::GPIO_ANALOG)
            .with(CapabilitySet::GPIO_DAC)
            .with(CapabilitySet::NEOPIXEL)
            .with(CapabilitySet::CAN_SEND)
            .with(CapabilitySet::FLASH_STORAGE)
            .with(CapabilitySet::CRYPTO)
            .with(CapabilitySet::RTC)
            .with(CapabilitySet::I2S)
            .with(CapabilitySet::I2C),
        max_rules: 64,
        gpio_count: 64,
        pwm_channels: 16,
        adc_channels: 8,
        dac_channels: 2,
        reserved_pins: &[22, 23],
        definitions: &SAMD51_DEFINITIONS,
    };

    /// Generic ESP32 with the TWAI controller
    pub const ESP32: PlatformProfile = PlatformProfile {
        board_name: "ESP32",
        chip: "ESP32",
        capabilities: CapabilitySet::GPIO_DIGITAL
            .with(CapabilitySet::GPIO_PWM)
            .with(CapabilitySet::GPIO_ANALOG)
            .with(CapabilitySet::NEOPIXEL)
            .with(CapabilitySet::CAN_SEND)
            .with(CapabilitySet::FLASH_STORAGE),
        max_rules: 32,
        gpio_count: 40,
        pwm_channels: 16,
        adc_channels: 18,
        dac_channels: 2,
        reserved_pins: &[4, 5],
        definitions: &ESP32_DEFINITIONS,
    };

    /// Look up a built-in profile by its short name (`rp2040`, `samd51`, `esp32`)
    pub fn by_name(name: &str) -> Option<PlatformProfile> {
        match name {
            "rp2040" => Some(Self::RP2040),
            "samd51" => Some(Self::SAMD51),
            "esp32" => Some(Self::ESP32),
            _ => None,
        }
    }

    /// Returns true if the board has every capability in `caps`
    pub fn has(&self, caps: CapabilitySet) -> bool {
        self.capabilities.contains(caps)
    }

    /// Whether rules of `kind` can be executed on this board
    ///
    /// The data buffer actions need no hardware and are supported everywhere.
    pub fn supports(&self, kind: ActionKind) -> bool {
        match kind {
            ActionKind::GpioSet
            | ActionKind::GpioClear
            | ActionKind::GpioToggle
            | ActionKind::GpioReadBuffer => self.has(CapabilitySet::GPIO_DIGITAL),
            ActionKind::CanSend | ActionKind::CanSendPeriodic => self.has(CapabilitySet::CAN_SEND),
            ActionKind::PwmSet | ActionKind::PwmConfigure => self.has(CapabilitySet::GPIO_PWM),
            ActionKind::NeopixelColor | ActionKind::NeopixelOff => {
                self.has(CapabilitySet::NEOPIXEL)
            }
            ActionKind::I2cWrite | ActionKind::I2cReadBuffer => self.has(CapabilitySet::I2C),
            ActionKind::AdcReadBuffer => self.has(CapabilitySet::GPIO_ANALOG),
            ActionKind::BufferSend | ActionKind::BufferClear => true,
        }
    }

    /// The kinds this board supports, in numeric order
    pub fn supported_actions(&self) -> impl Iterator<Item = ActionKind> + '_ {
        ActionKind::ALL.into_iter().filter(|k| self.supports(*k))
    }

    /// The definition for `kind`, if the board declares one
    pub fn definition(&self, kind: ActionKind) -> Option<&'static ActionDefinition> {
        definitions::find(self.definitions, kind)
    }

    /// Returns true if `pin` is owned by board hardware
    pub fn is_reserved(&self, pin: u8) -> bool {
        self.reserved_pins.contains(&pin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports() {
        let rp = PlatformProfile::RP2040;
        assert!(rp.supports(ActionKind::GpioToggle));
        assert!(!rp.supports(ActionKind::NeopixelColor));
        assert!(!rp.supports(ActionKind::I2cWrite));
        assert!(rp.supports(ActionKind::BufferSend));

        let samd = PlatformProfile::SAMD51;
        assert_eq!(ActionKind::ALL.len(), samd.supported_actions().count());

        let esp = PlatformProfile::by_name("esp32").unwrap();
        assert!(esp.supports(ActionKind::NeopixelOff));
        assert!(!esp.supports(ActionKind::I2cReadBuffer));
        assert!(esp.definition(ActionKind::PwmConfigure).is_none());
        assert_eq!(39, esp.definition(ActionKind::GpioSet).unwrap().params[0].max_value);
    }

    #[test]
    fn test_capability_set() {
        let caps = CapabilitySet::GPIO_PWM | CapabilitySet::I2C;
        assert!(caps.contains(CapabilitySet::I2C));
        assert!(!caps.contains(CapabilitySet::I2C | CapabilitySet::NEOPIXEL));
        assert!(CapabilitySet::empty().contains(CapabilitySet::empty()));
    }
}
