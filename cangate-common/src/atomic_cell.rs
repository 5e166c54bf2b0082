//! Implements an AtomicCell type which uses critical_section Mutex to enforce atomic store/load
//!
//! The frame mailbox is written from the CAN receive interrupt and read from the main loop, so
//! its shared counters and callbacks live in these cells.

use critical_section::Mutex;
use core::{cell::Cell, ops::Add};

/// A `Copy` value which can be shared between interrupt and thread context
#[derive(Debug)]
pub struct AtomicCell<T: Copy> {
    inner: Mutex<Cell<T>>,
}

impl<T: Send + Copy> AtomicCell<T> {
    /// Create a new cell holding `value`
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(Cell::new(value)),
        }
    }

    /// Read the current value
    pub fn load(&self) -> T {
        critical_section::with(|cs| self.inner.borrow(cs).get())
    }

    /// Replace the current value
    pub fn store(&self, value: T) {
        critical_section::with(|cs| self.inner.borrow(cs).set(value));
    }
}

impl<T: Send + Copy + Default> AtomicCell<T> {
    /// Read the current value, leaving the default in its place
    pub fn take(&self) -> T {
        critical_section::with(|cs| self.inner.borrow(cs).take())
    }
}

impl<T: Copy + Add<Output = T>> AtomicCell<T> {
    /// Add `value` to the stored value, returning the previous value
    pub fn fetch_add(&self, value: T) -> T {
        critical_section::with(|cs| {
            let old_value = self.inner.borrow(cs).get();
            self.inner.borrow(cs).set(old_value + value);
            old_value
        })
    }
}

impl<T: Default + Copy + Send> Default for AtomicCell<T> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Cell::new(T::default())),
        }
    }
}
