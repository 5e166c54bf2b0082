//! Traits implemented by platform glue

use crate::actions::ActionKind;
use crate::definitions;
use crate::messages::CanMessage;
use crate::params::ActionDefinition;

/// Which digital output operation to perform
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpioOp {
    /// Drive high
    Set,
    /// Drive low
    Clear,
    /// Invert the current level
    Toggle,
}

/// The hardware effects an action can have
///
/// One implementation exists per board family and is handed to the dispatcher at construction.
/// Every call returns success or failure and must complete in bounded time; the dispatcher never
/// retries. Pin ownership is arbitrated before these methods are called, but implementations
/// should still reject pins their hardware cannot drive in the requested way.
pub trait Hardware {
    /// Drive a digital output
    fn gpio(&mut self, op: GpioOp, pin: u8) -> bool;

    /// Read a digital input
    fn gpio_read(&mut self, pin: u8) -> Option<bool>;

    /// Set a PWM duty cycle, 0-255
    fn pwm_set(&mut self, pin: u8, duty: u8) -> bool;

    /// Configure PWM frequency, duty in percent, and counter resolution
    fn pwm_configure(&mut self, pin: u8, freq_hz: u32, duty_pct: u8, resolution_bits: u8) -> bool;

    /// Set the RGB LED. A brightness of 0 leaves the current brightness.
    fn neopixel(&mut self, r: u8, g: u8, b: u8, brightness: u8) -> bool;

    /// Queue a frame for transmission
    fn can_send(&mut self, msg: CanMessage) -> bool;

    /// Write one byte to a device register
    fn i2c_write(&mut self, sda: u8, scl: u8, addr: u8, reg: u8, value: u8) -> bool;

    /// Read `buf.len()` bytes starting at a device register
    fn i2c_read(&mut self, sda: u8, scl: u8, addr: u8, reg: u8, buf: &mut [u8]) -> bool;

    /// Sample an analog input
    fn adc_read(&mut self, pin: u8) -> Option<u16>;

    /// The action definitions this board declares
    ///
    /// Rules which take parameters from the triggering frame can only be dispatched for kinds
    /// listed here. The default declares none.
    fn definitions(&self) -> &'static [ActionDefinition] {
        &[]
    }

    /// The definition for `kind`, if declared
    fn definition(&self, kind: ActionKind) -> Option<&'static ActionDefinition> {
        definitions::find(self.definitions(), kind)
    }
}

/// A source of received CAN frames
///
/// Implemented by the frame mailbox which sits between the receive interrupt and the gateway.
pub trait FrameSource {
    /// Take the oldest pending frame
    fn take_frame(&self) -> Option<CanMessage>;
}
