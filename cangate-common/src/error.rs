//! Error types returned by the gateway core
use snafu::Snafu;

use crate::actions::ActionKind;

/// Why a rule operation or an action dispatch failed
///
/// All variants are recoverable. A failed dispatch of one rule never stops evaluation of the rules
/// after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Snafu)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[snafu(visibility(pub))]
pub enum ActionError {
    /// The rule table has no free slot
    #[snafu(display("Rule table is full"))]
    Full,
    /// No rule with the requested id exists
    #[snafu(display("No rule with id {id}"))]
    NotFound {
        /// The requested id
        id: u8,
    },
    /// The platform has no capability for this kind of action
    #[snafu(display("Action {} is not supported on this platform", kind.name()))]
    PlatformUnsupported {
        /// The rejected kind
        kind: ActionKind,
    },
    /// The action cannot be dispatched, e.g. no definition exists to resolve frame parameters
    #[snafu(display("Action {} cannot be dispatched", kind.name()))]
    Unsupported {
        /// The rejected kind
        kind: ActionKind,
    },
    /// A parameter or rule encoding was malformed or out of range
    #[snafu(display("Invalid parameter: {reason}"))]
    InvalidParam {
        /// What was wrong
        reason: &'static str,
    },
    /// A buffered read would run past the end of the data buffer
    #[snafu(display("Buffer overflow writing {length} bytes at slot {slot}"))]
    BufferOverflow {
        /// First slot of the write
        slot: u8,
        /// Number of bytes requested
        length: u8,
    },
    /// The hardware reported failure
    #[snafu(display("Hardware failure executing {}", kind.name()))]
    HardwareFailure {
        /// The kind being executed
        kind: ActionKind,
    },
    /// The pin is owned by an incompatible function
    #[snafu(display("Pin {pin} is in use as {} and cannot be used as {}", current.name(), requested.name()))]
    PinConflict {
        /// The pin
        pin: u8,
        /// Its current owner
        current: PinMode,
        /// The function requested
        requested: PinMode,
    },
}

/// Why a rule text record was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Snafu)]
pub enum RuleParseError {
    /// Fewer than the eight mandatory fields
    #[snafu(display("Rule has too few fields"))]
    TooFewFields,
    /// A numeric field failed to parse
    #[snafu(display("Invalid number in field {field}"))]
    InvalidNumber {
        /// Zero based field index
        field: u8,
    },
    /// The action name was not recognized
    #[snafu(display("Unknown action name"))]
    UnknownAction,
    /// The parameter source token was not recognized
    #[snafu(display("Unknown parameter source"))]
    UnknownParamSource,
    /// A byte list held more than 8 entries
    #[snafu(display("Too many data bytes"))]
    TooManyBytes,
}

impl RuleParseError {
    /// A static description suitable for [`ActionError::InvalidParam`]
    pub const fn reason(&self) -> &'static str {
        match self {
            RuleParseError::TooFewFields => "too few fields",
            RuleParseError::InvalidNumber { .. } => "invalid number",
            RuleParseError::UnknownAction => "unknown action",
            RuleParseError::UnknownParamSource => "unknown parameter source",
            RuleParseError::TooManyBytes => "too many data bytes",
        }
    }
}

impl From<RuleParseError> for ActionError {
    fn from(e: RuleParseError) -> Self {
        ActionError::InvalidParam { reason: e.reason() }
    }
}

/// The function a pin is currently serving
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    /// Free
    #[default]
    Unused,
    /// Digital input
    GpioIn,
    /// Digital output
    GpioOut,
    /// PWM output
    Pwm,
    /// Analog input
    Adc,
    /// Analog output
    Dac,
    /// I2C data
    I2cSda,
    /// I2C clock
    I2cScl,
    /// SPI controller out
    SpiMosi,
    /// SPI controller in
    SpiMiso,
    /// SPI clock
    SpiSck,
    /// SPI chip select
    SpiCs,
    /// Claimed by board hardware; never released
    Reserved,
}

impl PinMode {
    /// Short name for logs and error messages
    pub const fn name(&self) -> &'static str {
        match self {
            PinMode::Unused => "unused",
            PinMode::GpioIn => "gpio_in",
            PinMode::GpioOut => "gpio_out",
            PinMode::Pwm => "pwm",
            PinMode::Adc => "adc",
            PinMode::Dac => "dac",
            PinMode::I2cSda => "i2c_sda",
            PinMode::I2cScl => "i2c_scl",
            PinMode::SpiMosi => "spi_mosi",
            PinMode::SpiMiso => "spi_miso",
            PinMode::SpiSck => "spi_sck",
            PinMode::SpiCs => "spi_cs",
            PinMode::Reserved => "reserved",
        }
    }

    /// Whether a pin owned as `self` may be handed over to `other` without being freed
    ///
    /// Digital input is interchangeable with analog input and with digital output. Every other
    /// pair of distinct modes conflicts, and a reserved pin is compatible with nothing.
    pub const fn compatible_with(&self, other: PinMode) -> bool {
        use PinMode::*;
        match (*self, other) {
            (Reserved, _) | (_, Reserved) => false,
            (GpioIn, Adc) | (Adc, GpioIn) | (GpioIn, GpioOut) | (GpioOut, GpioIn) => true,
            (a, b) => a as u8 == b as u8,
        }
    }
}
