//! Static action definition tables for the built-in platform profiles
//!
//! The mappings describe the payload layout expected from a frame when a rule is created with
//! `candata` parameters. The tables are program-lifetime constants shared by all gateways.
use crate::actions::ActionKind;
use crate::params::{ActionDefinition, ParamMapping, ParamRole, ParamType, TriggerType};

use ParamRole::{ActionParam, OutputParam, TriggerParam};
use ParamType::{Bool, U16, U32, U8};

const fn def(
    kind: ActionKind,
    description: &'static str,
    category: &'static str,
    trigger: TriggerType,
    params: &'static [ParamMapping],
) -> ActionDefinition {
    ActionDefinition {
        kind,
        name: kind.name(),
        description,
        category,
        trigger,
        params,
    }
}

/// Single pin layout
pub const GPIO_PARAMS: [ParamMapping; 1] = [ParamMapping::new("pin", 0, U8, 0, 255, ActionParam)
    .describe("GPIO Pin Number", "Pin to control (e.g., 13 for onboard LED)")];

/// PWM pin and duty
pub const PWM_PARAMS: [ParamMapping; 2] = [
    ParamMapping::new("pin", 0, U8, 0, 255, ActionParam).describe("PWM Pin", "Pin supporting PWM"),
    ParamMapping::new("duty", 1, U8, 0, 255, ActionParam)
        .describe("Duty Cycle", "PWM duty cycle (0=off, 128=50%, 255=full)"),
];

/// RGB color and brightness
pub const NEOPIXEL_PARAMS: [ParamMapping; 4] = [
    ParamMapping::new("r", 0, U8, 0, 255, ActionParam).describe("Red", "Red intensity (0-255)"),
    ParamMapping::new("g", 1, U8, 0, 255, ActionParam).describe("Green", "Green intensity (0-255)"),
    ParamMapping::new("b", 2, U8, 0, 255, ActionParam).describe("Blue", "Blue intensity (0-255)"),
    ParamMapping::new("brightness", 3, U8, 0, 255, ActionParam)
        .describe("Brightness", "Overall brightness (0-255, 0=off, 255=full)"),
];

/// Target identifier of a frame send
pub const CAN_SEND_PARAMS: [ParamMapping; 1] = [ParamMapping::new("can_id", 0, U8, 0, 255, OutputParam)
    .describe("CAN Message ID", "Target CAN ID to send message to")];

/// Target identifier and interval of a periodic send
pub const CAN_SEND_PERIODIC_PARAMS: [ParamMapping; 2] = [
    ParamMapping::new("can_id", 0, U8, 0, 255, OutputParam)
        .describe("CAN Message ID", "Target CAN ID to send message to"),
    ParamMapping::new("interval_ms", 1, U8, 0, 255, TriggerParam)
        .describe("Send Interval", "How often to send in milliseconds"),
];

/// PWM frequency, duty and resolution
pub const PWM_CONFIGURE_PARAMS: [ParamMapping; 4] = [
    ParamMapping::new("pin", 0, U8, 0, 255, ActionParam).describe("PWM Pin", "Pin supporting PWM"),
    ParamMapping::new("freq_hz", 1, U16, 1, 100_000, ActionParam)
        .describe("Frequency", "PWM frequency in Hz"),
    ParamMapping::new("duty_percent", 3, U8, 0, 100, ActionParam)
        .describe("Duty Cycle", "PWM duty cycle percentage (0-100)"),
    ParamMapping::new("resolution", 4, U8, 8, 16, ActionParam)
        .describe("Resolution", "PWM resolution in bits (8, 10, 12, or 16)"),
];

/// Single register write
pub const I2C_WRITE_PARAMS: [ParamMapping; 5] = [
    ParamMapping::new("sda_pin", 0, U8, 0, 255, ActionParam).describe("SDA Pin", "I2C SDA pin"),
    ParamMapping::new("scl_pin", 1, U8, 0, 255, ActionParam).describe("SCL Pin", "I2C SCL pin"),
    ParamMapping::new("i2c_addr", 2, U8, 0, 127, ActionParam)
        .bits(0, 7)
        .describe("I2C Address", "7-bit I2C device address"),
    ParamMapping::new("reg_addr", 3, U8, 0, 255, ActionParam)
        .describe("Register", "Device register address"),
    ParamMapping::new("data", 4, U8, 0, 255, ActionParam).describe("Data", "Data byte to write"),
];

/// Register read into the data buffer
pub const I2C_READ_BUFFER_PARAMS: [ParamMapping; 6] = [
    ParamMapping::new("sda_pin", 0, U8, 0, 255, ActionParam).describe("SDA Pin", "I2C SDA pin"),
    ParamMapping::new("scl_pin", 1, U8, 0, 255, ActionParam).describe("SCL Pin", "I2C SCL pin"),
    ParamMapping::new("i2c_addr", 2, U8, 0, 127, ActionParam)
        .bits(0, 7)
        .describe("I2C Address", "7-bit I2C device address"),
    ParamMapping::new("reg_addr", 3, U8, 0, 255, ActionParam)
        .describe("Register", "Device register address"),
    ParamMapping::new("num_bytes", 4, U8, 1, 8, ActionParam)
        .describe("Byte Count", "Number of bytes to read (1-8)"),
    ParamMapping::new("buffer_slot", 5, U8, 0, 7, OutputParam)
        .describe("Buffer Slot", "Starting slot in data buffer (0-7)"),
];

/// Digital read into one buffer slot
pub const GPIO_READ_BUFFER_PARAMS: [ParamMapping; 2] = [
    ParamMapping::new("pin", 0, U8, 0, 255, ActionParam).describe("GPIO Pin", "Pin to read"),
    ParamMapping::new("buffer_slot", 1, U8, 0, 7, OutputParam)
        .describe("Buffer Slot", "Slot in data buffer (0-7)"),
];

/// Analog read into two buffer slots
pub const ADC_READ_BUFFER_PARAMS: [ParamMapping; 2] = [
    ParamMapping::new("pin", 0, U8, 0, 255, ActionParam).describe("ADC Pin", "Analog pin to read"),
    ParamMapping::new("buffer_slot", 1, U8, 0, 6, OutputParam)
        .describe("Buffer Slot", "Starting slot in buffer (0-6, uses 2 bytes)"),
];

/// Buffer transmission
pub const BUFFER_SEND_PARAMS: [ParamMapping; 3] = [
    ParamMapping::new("can_id", 0, U32, 0, 0x7FF, OutputParam)
        .describe("CAN ID", "CAN message ID to send (0x000-0x7FF)"),
    ParamMapping::new("length", 4, U8, 1, 8, OutputParam)
        .describe("Length", "Number of bytes to send from buffer (1-8)"),
    ParamMapping::new("clear_after", 5, Bool, 0, 1, OutputParam)
        .bits(0, 1)
        .describe("Clear After", "Clear buffer after sending (0=no, 1=yes)"),
];

/// Pin layout for boards with 40 GPIOs
pub const ESP32_GPIO_PARAMS: [ParamMapping; 1] = [ParamMapping::new("pin", 0, U8, 0, 39, ActionParam)
    .describe("GPIO Pin", "GPIO pin number (0-39)")];

/// PWM layout for boards with 40 GPIOs
pub const ESP32_PWM_PARAMS: [ParamMapping; 2] = [
    ParamMapping::new("pin", 0, U8, 0, 39, ActionParam).describe("PWM Pin", "GPIO pin for PWM output"),
    ParamMapping::new("duty", 1, U8, 0, 255, ActionParam).describe("Duty Cycle", "PWM duty cycle (0-255)"),
];

/// Analog read layout for boards with 40 GPIOs
pub const ESP32_ADC_READ_BUFFER_PARAMS: [ParamMapping; 2] = [
    ParamMapping::new("adc_pin", 0, U8, 0, 39, ActionParam).describe("ADC Pin", "ADC input pin"),
    ParamMapping::new("buffer_slot", 1, U8, 0, 6, OutputParam)
        .describe("Buffer Slot", "Starting slot in buffer (0-6, uses 2 bytes)"),
];

/// Frame send with an 11-bit identifier and explicit length
pub const ESP32_CAN_SEND_PARAMS: [ParamMapping; 2] = [
    ParamMapping::new("can_id", 0, U16, 0, 0x7FF, ActionParam).describe("CAN ID", "CAN message ID"),
    ParamMapping::new("length", 2, U8, 0, 8, ActionParam).describe("Length", "Data length (0-8 bytes)"),
];

/// Drive a pin high
pub const GPIO_SET_DEF: ActionDefinition = def(
    ActionKind::GpioSet,
    "Set GPIO pin HIGH",
    "GPIO",
    TriggerType::CanMsg,
    &GPIO_PARAMS,
);
/// Drive a pin low
pub const GPIO_CLEAR_DEF: ActionDefinition = def(
    ActionKind::GpioClear,
    "Set GPIO pin LOW",
    "GPIO",
    TriggerType::CanMsg,
    &GPIO_PARAMS,
);
/// Invert a pin
pub const GPIO_TOGGLE_DEF: ActionDefinition = def(
    ActionKind::GpioToggle,
    "Toggle GPIO pin state",
    "GPIO",
    TriggerType::CanMsg,
    &GPIO_PARAMS,
);
/// Set a PWM duty cycle
pub const PWM_SET_DEF: ActionDefinition = def(
    ActionKind::PwmSet,
    "Set PWM duty cycle on pin",
    "GPIO",
    TriggerType::CanMsg,
    &PWM_PARAMS,
);
/// Set the onboard NeoPixel color
pub const NEOPIXEL_DEF: ActionDefinition = def(
    ActionKind::NeopixelColor,
    "Control onboard NeoPixel RGB LED",
    "Display",
    TriggerType::CanMsg,
    &NEOPIXEL_PARAMS,
);
/// Send one frame
pub const CAN_SEND_DEF: ActionDefinition = def(
    ActionKind::CanSend,
    "Send CAN message",
    "CAN",
    TriggerType::CanMsg,
    &CAN_SEND_PARAMS,
);
/// Send a frame on an interval
pub const CAN_SEND_PERIODIC_DEF: ActionDefinition = def(
    ActionKind::CanSendPeriodic,
    "Send CAN message periodically",
    "CAN",
    TriggerType::Periodic,
    &CAN_SEND_PERIODIC_PARAMS,
);
/// PWM with explicit frequency and resolution
pub const PWM_CONFIGURE_DEF: ActionDefinition = def(
    ActionKind::PwmConfigure,
    "Configure PWM with frequency, duty cycle, and resolution",
    "GPIO",
    TriggerType::CanMsg,
    &PWM_CONFIGURE_PARAMS,
);
/// Write one register over I2C
pub const I2C_WRITE_DEF: ActionDefinition = def(
    ActionKind::I2cWrite,
    "Write single byte to I2C device register",
    "I2C",
    TriggerType::CanMsg,
    &I2C_WRITE_PARAMS,
);
/// Read I2C registers into the data buffer
pub const I2C_READ_BUFFER_DEF: ActionDefinition = def(
    ActionKind::I2cReadBuffer,
    "Read bytes from I2C device into data buffer",
    "I2C",
    TriggerType::CanMsg,
    &I2C_READ_BUFFER_PARAMS,
);
/// Read a pin level into the data buffer
pub const GPIO_READ_BUFFER_DEF: ActionDefinition = def(
    ActionKind::GpioReadBuffer,
    "Read GPIO pin state into data buffer",
    "GPIO",
    TriggerType::CanMsg,
    &GPIO_READ_BUFFER_PARAMS,
);
/// Read a 16-bit ADC sample into the data buffer
pub const ADC_READ_BUFFER_DEF: ActionDefinition = def(
    ActionKind::AdcReadBuffer,
    "Read ADC value into data buffer (16-bit, 2 bytes)",
    "GPIO",
    TriggerType::CanMsg,
    &ADC_READ_BUFFER_PARAMS,
);
/// Send the data buffer as a frame
pub const BUFFER_SEND_DEF: ActionDefinition = def(
    ActionKind::BufferSend,
    "Send data buffer as CAN message",
    "CAN",
    TriggerType::CanMsg,
    &BUFFER_SEND_PARAMS,
);
/// Clear the data buffer
pub const BUFFER_CLEAR_DEF: ActionDefinition = def(
    ActionKind::BufferClear,
    "Clear data buffer manually",
    "System",
    TriggerType::CanMsg,
    &[],
);

/// Definitions for the SAMD51 Feather M4 CAN
pub const SAMD51_DEFINITIONS: [ActionDefinition; 14] = [
    GPIO_SET_DEF,
    GPIO_CLEAR_DEF,
    GPIO_TOGGLE_DEF,
    PWM_SET_DEF,
    NEOPIXEL_DEF,
    CAN_SEND_DEF,
    CAN_SEND_PERIODIC_DEF,
    PWM_CONFIGURE_DEF,
    I2C_WRITE_DEF,
    I2C_READ_BUFFER_DEF,
    GPIO_READ_BUFFER_DEF,
    ADC_READ_BUFFER_DEF,
    BUFFER_SEND_DEF,
    BUFFER_CLEAR_DEF,
];

/// Definitions for the RP2040 Pico; no NeoPixel or I2C
pub const RP2040_DEFINITIONS: [ActionDefinition; 11] = [
    GPIO_SET_DEF,
    GPIO_CLEAR_DEF,
    GPIO_TOGGLE_DEF,
    PWM_SET_DEF,
    CAN_SEND_DEF,
    CAN_SEND_PERIODIC_DEF,
    PWM_CONFIGURE_DEF,
    GPIO_READ_BUFFER_DEF,
    ADC_READ_BUFFER_DEF,
    BUFFER_SEND_DEF,
    BUFFER_CLEAR_DEF,
];

/// Definitions for ESP32 boards
pub const ESP32_DEFINITIONS: [ActionDefinition; 7] = [
    def(
        ActionKind::GpioSet,
        "Set GPIO pin HIGH",
        "GPIO",
        TriggerType::CanMsg,
        &ESP32_GPIO_PARAMS,
    ),
    def(
        ActionKind::GpioClear,
        "Set GPIO pin LOW",
        "GPIO",
        TriggerType::CanMsg,
        &ESP32_GPIO_PARAMS,
    ),
    def(
        ActionKind::GpioToggle,
        "Toggle GPIO pin state",
        "GPIO",
        TriggerType::CanMsg,
        &ESP32_GPIO_PARAMS,
    ),
    def(
        ActionKind::PwmSet,
        "Set PWM duty cycle (LEDC)",
        "PWM",
        TriggerType::CanMsg,
        &ESP32_PWM_PARAMS,
    ),
    NEOPIXEL_DEF,
    def(
        ActionKind::AdcReadBuffer,
        "Read ADC value into data buffer (12-bit, 2 bytes)",
        "Analog",
        TriggerType::CanMsg,
        &ESP32_ADC_READ_BUFFER_PARAMS,
    ),
    def(
        ActionKind::CanSend,
        "Send CAN message",
        "CAN",
        TriggerType::CanMsg,
        &ESP32_CAN_SEND_PARAMS,
    ),
];

/// Find the definition for `kind` in `definitions`
pub fn find(definitions: &'static [ActionDefinition], kind: ActionKind) -> Option<&'static ActionDefinition> {
    definitions.iter().find(|d| d.kind == kind)
}
