//! Action kinds and their typed parameter payloads
//!
//! Every rule carries exactly one [`Action`]. Each variant holds only the fields its kind uses, so a
//! rule can never carry, for example, a PWM duty on a GPIO toggle.
use int_enum::IntEnum;

use crate::messages::MAX_DATA_LENGTH;

/// The kind of hardware effect a rule triggers
///
/// The numeric values are stable and are used by the persisted rule image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntEnum)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ActionKind {
    /// Drive a pin high
    GpioSet = 1,
    /// Drive a pin low
    GpioClear = 2,
    /// Invert the level of a pin
    GpioToggle = 3,
    /// Transmit a CAN frame
    CanSend = 4,
    /// Transmit a CAN frame on a fixed interval
    CanSendPeriodic = 5,
    /// Set a PWM duty cycle
    PwmSet = 6,
    /// Configure PWM frequency, duty and resolution
    PwmConfigure = 7,
    /// Set the RGB LED color
    NeopixelColor = 8,
    /// Turn the RGB LED off
    NeopixelOff = 9,
    /// Write one byte to an I2C device register
    I2cWrite = 10,
    /// Read I2C device registers into the data buffer
    I2cReadBuffer = 11,
    /// Read a digital input into the data buffer
    GpioReadBuffer = 12,
    /// Read an analog input into the data buffer
    AdcReadBuffer = 13,
    /// Transmit the data buffer as a CAN frame
    BufferSend = 14,
    /// Invalidate the data buffer
    BufferClear = 15,
}

impl ActionKind {
    /// All kinds, in numeric order
    pub const ALL: [ActionKind; 15] = [
        ActionKind::GpioSet,
        ActionKind::GpioClear,
        ActionKind::GpioToggle,
        ActionKind::CanSend,
        ActionKind::CanSendPeriodic,
        ActionKind::PwmSet,
        ActionKind::PwmConfigure,
        ActionKind::NeopixelColor,
        ActionKind::NeopixelOff,
        ActionKind::I2cWrite,
        ActionKind::I2cReadBuffer,
        ActionKind::GpioReadBuffer,
        ActionKind::AdcReadBuffer,
        ActionKind::BufferSend,
        ActionKind::BufferClear,
    ];

    /// The name used by the rule text encoding
    pub const fn name(&self) -> &'static str {
        match self {
            ActionKind::GpioSet => "GPIO_SET",
            ActionKind::GpioClear => "GPIO_CLEAR",
            ActionKind::GpioToggle => "GPIO_TOGGLE",
            ActionKind::CanSend => "CAN_SEND",
            ActionKind::CanSendPeriodic => "CAN_SEND_PERIODIC",
            ActionKind::PwmSet => "PWM_SET",
            ActionKind::PwmConfigure => "PWM_CONFIGURE",
            ActionKind::NeopixelColor => "NEOPIXEL",
            ActionKind::NeopixelOff => "NEOPIXEL_OFF",
            ActionKind::I2cWrite => "I2C_WRITE",
            ActionKind::I2cReadBuffer => "I2C_READ_BUFFER",
            ActionKind::GpioReadBuffer => "GPIO_READ_BUFFER",
            ActionKind::AdcReadBuffer => "ADC_READ_BUFFER",
            ActionKind::BufferSend => "BUFFER_SEND",
            ActionKind::BufferClear => "BUFFER_CLEAR",
        }
    }

    /// Look up a kind by its text name
    pub fn from_name(name: &str) -> Option<ActionKind> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Returns true for the kinds which capture into the data buffer
    pub const fn is_buffered_read(&self) -> bool {
        matches!(
            self,
            ActionKind::I2cReadBuffer | ActionKind::GpioReadBuffer | ActionKind::AdcReadBuffer
        )
    }
}

/// A CAN frame to be transmitted by an action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanPayload {
    /// Target identifier
    pub can_id: u32,
    /// Frame bytes; only the first `len` are sent
    pub data: [u8; MAX_DATA_LENGTH],
    /// Number of bytes to send
    pub len: u8,
}

impl CanPayload {
    /// Create a payload, truncating `data` to 8 bytes
    pub fn new(can_id: u32, data: &[u8]) -> Self {
        let len = data.len().min(MAX_DATA_LENGTH);
        let mut buf = [0; MAX_DATA_LENGTH];
        buf[..len].copy_from_slice(&data[..len]);
        Self {
            can_id,
            data: buf,
            len: len as u8,
        }
    }

    /// The bytes which will be sent
    pub fn bytes(&self) -> &[u8] {
        &self.data[..(self.len as usize).min(MAX_DATA_LENGTH)]
    }
}

/// A rule's action along with its fixed parameters
///
/// When a rule takes its parameters from the triggering frame, the per-field values stored here are
/// ignored by the dispatcher, except for the CAN payload bytes of the send actions.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Drive `pin` high
    GpioSet {
        /// Pin number
        pin: u8,
    },
    /// Drive `pin` low
    GpioClear {
        /// Pin number
        pin: u8,
    },
    /// Invert `pin`
    GpioToggle {
        /// Pin number
        pin: u8,
    },
    /// Set PWM duty on `pin`
    PwmSet {
        /// Pin number
        pin: u8,
        /// Duty cycle, 0-255
        duty: u8,
    },
    /// Configure PWM output on `pin`
    PwmConfigure {
        /// Pin number
        pin: u8,
        /// Output frequency
        freq_hz: u32,
        /// Duty cycle in percent
        duty_pct: u8,
        /// Counter resolution
        resolution_bits: u8,
    },
    /// Set the RGB LED
    NeopixelColor {
        /// Red
        r: u8,
        /// Green
        g: u8,
        /// Blue
        b: u8,
        /// Overall brightness
        brightness: u8,
    },
    /// Turn the RGB LED off
    NeopixelOff,
    /// Send one frame
    CanSend(CanPayload),
    /// Send a frame every `interval_ms`
    ///
    /// An interval of 0 leaves the rule dormant for the scheduler; it still fires on matching
    /// frames.
    CanSendPeriodic {
        /// Frame to send
        payload: CanPayload,
        /// Send interval
        interval_ms: u32,
    },
    /// Write `value` to register `reg` of device `addr`
    I2cWrite {
        /// Data pin
        sda: u8,
        /// Clock pin
        scl: u8,
        /// 7-bit device address
        addr: u8,
        /// Register address
        reg: u8,
        /// Byte to write
        value: u8,
    },
    /// Read `count` bytes starting at register `reg` into the buffer at `slot`
    I2cReadBuffer {
        /// Data pin
        sda: u8,
        /// Clock pin
        scl: u8,
        /// 7-bit device address
        addr: u8,
        /// Register address
        reg: u8,
        /// Number of bytes to read
        count: u8,
        /// First buffer slot to write
        slot: u8,
    },
    /// Read the level of `pin` into one buffer slot
    GpioReadBuffer {
        /// Pin number
        pin: u8,
        /// Buffer slot
        slot: u8,
    },
    /// Read an analog sample from `pin` into two buffer slots, little endian
    AdcReadBuffer {
        /// Pin number
        pin: u8,
        /// First buffer slot
        slot: u8,
    },
    /// Send up to `len` valid buffer bytes on `can_id`
    BufferSend {
        /// Target identifier
        can_id: u32,
        /// Requested length
        len: u8,
        /// Clear the buffer once the frame is sent
        clear_after: bool,
    },
    /// Invalidate the whole buffer
    BufferClear,
}

impl Action {
    /// The kind tag for this action
    pub const fn kind(&self) -> ActionKind {
        match self {
            Action::GpioSet { .. } => ActionKind::GpioSet,
            Action::GpioClear { .. } => ActionKind::GpioClear,
            Action::GpioToggle { .. } => ActionKind::GpioToggle,
            Action::PwmSet { .. } => ActionKind::PwmSet,
            Action::PwmConfigure { .. } => ActionKind::PwmConfigure,
            Action::NeopixelColor { .. } => ActionKind::NeopixelColor,
            Action::NeopixelOff => ActionKind::NeopixelOff,
            Action::CanSend(_) => ActionKind::CanSend,
            Action::CanSendPeriodic { .. } => ActionKind::CanSendPeriodic,
            Action::I2cWrite { .. } => ActionKind::I2cWrite,
            Action::I2cReadBuffer { .. } => ActionKind::I2cReadBuffer,
            Action::GpioReadBuffer { .. } => ActionKind::GpioReadBuffer,
            Action::AdcReadBuffer { .. } => ActionKind::AdcReadBuffer,
            Action::BufferSend { .. } => ActionKind::BufferSend,
            Action::BufferClear => ActionKind::BufferClear,
        }
    }

    /// Create an action of `kind` with all parameters zeroed
    ///
    /// Used for rules whose parameters come from the triggering frame.
    pub const fn empty(kind: ActionKind) -> Action {
        let payload = CanPayload {
            can_id: 0,
            data: [0; MAX_DATA_LENGTH],
            len: 0,
        };
        match kind {
            ActionKind::GpioSet => Action::GpioSet { pin: 0 },
            ActionKind::GpioClear => Action::GpioClear { pin: 0 },
            ActionKind::GpioToggle => Action::GpioToggle { pin: 0 },
            ActionKind::CanSend => Action::CanSend(payload),
            ActionKind::CanSendPeriodic => Action::CanSendPeriodic {
                payload,
                interval_ms: 0,
            },
            ActionKind::PwmSet => Action::PwmSet { pin: 0, duty: 0 },
            ActionKind::PwmConfigure => Action::PwmConfigure {
                pin: 0,
                freq_hz: 0,
                duty_pct: 0,
                resolution_bits: 0,
            },
            ActionKind::NeopixelColor => Action::NeopixelColor {
                r: 0,
                g: 0,
                b: 0,
                brightness: 0,
            },
            ActionKind::NeopixelOff => Action::NeopixelOff,
            ActionKind::I2cWrite => Action::I2cWrite {
                sda: 0,
                scl: 0,
                addr: 0,
                reg: 0,
                value: 0,
            },
            ActionKind::I2cReadBuffer => Action::I2cReadBuffer {
                sda: 0,
                scl: 0,
                addr: 0,
                reg: 0,
                count: 0,
                slot: 0,
            },
            ActionKind::GpioReadBuffer => Action::GpioReadBuffer { pin: 0, slot: 0 },
            ActionKind::AdcReadBuffer => Action::AdcReadBuffer { pin: 0, slot: 0 },
            ActionKind::BufferSend => Action::BufferSend {
                can_id: 0,
                len: 0,
                clear_after: false,
            },
            ActionKind::BufferClear => Action::BufferClear,
        }
    }

    /// The periodic send interval, if this is a periodic action
    pub fn interval_ms(&self) -> Option<u32> {
        match self {
            Action::CanSendPeriodic { interval_ms, .. } => Some(*interval_ms),
            _ => None,
        }
    }
}
