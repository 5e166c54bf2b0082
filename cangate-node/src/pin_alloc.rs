//! Per-pin ownership tracking
//!
//! Every pin starts [`PinMode::Unused`]. Allocating a pin records the function that owns it, and
//! later requests for an incompatible function are refused with
//! [`ActionError::PinConflict`]. Pins marked reserved at startup are owned by board hardware and
//! can never be allocated or freed.
use cangate_common::error::{ActionError, PinMode};
use defmt_or_log::{debug, warn};

/// Upper bound on the number of pins tracked
pub const MAX_PINS: usize = 64;

/// Tracks which function owns each pin
#[derive(Debug, Clone)]
pub struct PinAllocator {
    modes: [PinMode; MAX_PINS],
    pin_count: u8,
}

impl PinAllocator {
    /// Create an allocator for pins `0..pin_count`
    ///
    /// `pin_count` is capped at [`MAX_PINS`].
    pub fn new(pin_count: u8) -> Self {
        Self {
            modes: [PinMode::Unused; MAX_PINS],
            pin_count: pin_count.min(MAX_PINS as u8),
        }
    }

    /// Number of pins tracked
    pub fn pin_count(&self) -> u8 {
        self.pin_count
    }

    /// Mark `pin` as permanently owned by board hardware
    ///
    /// Reserving replaces any current owner. Out of range pins are ignored.
    pub fn reserve(&mut self, pin: u8) {
        if let Some(mode) = self.modes_mut(pin) {
            *mode = PinMode::Reserved;
            debug!("Pin {} reserved", pin);
        }
    }

    fn modes_mut(&mut self, pin: u8) -> Option<&mut PinMode> {
        if pin < self.pin_count {
            self.modes.get_mut(pin as usize)
        } else {
            None
        }
    }

    /// The current owner of `pin`, or `None` if out of range
    pub fn mode(&self, pin: u8) -> Option<PinMode> {
        if pin < self.pin_count {
            self.modes.get(pin as usize).copied()
        } else {
            None
        }
    }

    /// Check whether `pin` could be allocated as `mode` without changing anything
    pub fn check(&self, pin: u8, mode: PinMode) -> Result<(), ActionError> {
        let current = self.mode(pin).ok_or(ActionError::InvalidParam {
            reason: "pin out of range",
        })?;
        if mode == PinMode::Unused || mode == PinMode::Reserved {
            return Err(ActionError::InvalidParam {
                reason: "not an allocatable pin mode",
            });
        }
        if current == PinMode::Unused || current.compatible_with(mode) {
            Ok(())
        } else {
            Err(ActionError::PinConflict {
                pin,
                current,
                requested: mode,
            })
        }
    }

    /// Returns true if [`allocate`](Self::allocate) would succeed
    pub fn is_available(&self, pin: u8, mode: PinMode) -> bool {
        self.check(pin, mode).is_ok()
    }

    /// Claim `pin` for `mode`
    ///
    /// Succeeds if the pin is free, already owned as `mode`, or owned by a compatible mode, in
    /// which case the pin is handed over to `mode`.
    pub fn allocate(&mut self, pin: u8, mode: PinMode) -> Result<(), ActionError> {
        if let Err(e) = self.check(pin, mode) {
            if let ActionError::PinConflict { current, .. } = e {
                warn!(
                    "Pin {} conflict: in use as {}, requested {}",
                    pin,
                    current.name(),
                    mode.name()
                );
            }
            return Err(e);
        }
        if let Some(current) = self.modes_mut(pin) {
            if *current != mode {
                debug!("Pin {} allocated as {}", pin, mode.name());
                *current = mode;
            }
        }
        Ok(())
    }

    /// Release `pin`
    ///
    /// Freeing a reserved pin is refused with a warning and leaves it reserved.
    pub fn free(&mut self, pin: u8) {
        if let Some(mode) = self.modes_mut(pin) {
            match *mode {
                PinMode::Reserved => warn!("Refusing to free reserved pin {}", pin),
                PinMode::Unused => (),
                _ => {
                    debug!("Pin {} freed", pin);
                    *mode = PinMode::Unused;
                }
            }
        }
    }

    /// Release every pin which is not reserved
    pub fn free_all(&mut self) {
        for mode in self.modes.iter_mut() {
            if *mode != PinMode::Reserved {
                *mode = PinMode::Unused;
            }
        }
    }

    /// Iterate over `(pin, mode)` for every pin in use, reserved pins included
    pub fn allocated(&self) -> impl Iterator<Item = (u8, PinMode)> + '_ {
        self.modes[..self.pin_count as usize]
            .iter()
            .enumerate()
            .filter(|(_, m)| **m != PinMode::Unused)
            .map(|(i, m)| (i as u8, *m))
    }
}
