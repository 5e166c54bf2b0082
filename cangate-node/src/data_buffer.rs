//! Scratch buffer collecting sensor reads for a single outgoing frame
use cangate_common::error::ActionError;

/// Number of slots in the buffer
pub const BUFFER_SIZE: usize = 8;

/// Eight bytes with per-slot validity
///
/// A slot is either valid, holding a byte written since the last clear, or cleared. The used length
/// is one past the highest valid slot, so gaps below it are sent as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionDataBuffer {
    data: [u8; BUFFER_SIZE],
    valid: [bool; BUFFER_SIZE],
}

impl ActionDataBuffer {
    /// Create an empty buffer
    pub const fn new() -> Self {
        Self {
            data: [0; BUFFER_SIZE],
            valid: [false; BUFFER_SIZE],
        }
    }

    /// Check that `length` bytes fit starting at `slot`
    pub fn check_fits(slot: u8, length: u8) -> Result<(), ActionError> {
        if slot as usize + length as usize > BUFFER_SIZE {
            Err(ActionError::BufferOverflow { slot, length })
        } else {
            Ok(())
        }
    }

    /// Write `bytes` starting at `slot`, marking each slot valid
    ///
    /// Nothing is written if the bytes do not fit.
    pub fn write(&mut self, slot: u8, bytes: &[u8]) -> Result<(), ActionError> {
        let length = u8::try_from(bytes.len()).map_err(|_| ActionError::BufferOverflow {
            slot,
            length: u8::MAX,
        })?;
        Self::check_fits(slot, length)?;
        let start = slot as usize;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        self.valid[start..start + bytes.len()].fill(true);
        Ok(())
    }

    /// Write a single byte
    pub fn write_byte(&mut self, slot: u8, value: u8) -> Result<(), ActionError> {
        self.write(slot, &[value])
    }

    /// Write a u16, little endian, into two slots
    pub fn write_u16(&mut self, slot: u8, value: u16) -> Result<(), ActionError> {
        self.write(slot, &value.to_le_bytes())
    }

    /// Write a u32, little endian, into four slots
    pub fn write_u32(&mut self, slot: u8, value: u32) -> Result<(), ActionError> {
        self.write(slot, &value.to_le_bytes())
    }

    /// Read a single slot, if valid
    pub fn read_byte(&self, slot: u8) -> Option<u8> {
        let i = slot as usize;
        if i < BUFFER_SIZE && self.valid[i] {
            Some(self.data[i])
        } else {
            None
        }
    }

    /// Copy the used part of the buffer into `out`, returning the number of bytes copied
    pub fn read_all(&self, out: &mut [u8]) -> usize {
        let n = self.used_length().min(out.len());
        for (i, b) in out[..n].iter_mut().enumerate() {
            *b = if self.valid[i] { self.data[i] } else { 0 };
        }
        n
    }

    /// One past the highest valid slot, or 0 when nothing is valid
    pub fn used_length(&self) -> usize {
        self.valid
            .iter()
            .rposition(|v| *v)
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// Returns true if `slot` holds a valid byte
    pub fn is_slot_used(&self, slot: u8) -> bool {
        self.read_byte(slot).is_some()
    }

    /// Invalidate every slot
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Invalidate `length` slots starting at `slot`; the range is cut at the buffer end
    pub fn clear_range(&mut self, slot: u8, length: u8) {
        let start = (slot as usize).min(BUFFER_SIZE);
        let end = (slot as usize + length as usize).min(BUFFER_SIZE);
        self.data[start..end].fill(0);
        self.valid[start..end].fill(false);
    }
}
