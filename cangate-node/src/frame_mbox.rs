//! Implements the queue between the CAN receive interrupt and the gateway
use core::cell::RefCell;

use cangate_common::{messages::CanMessage, traits::FrameSource, AtomicCell};
use critical_section::Mutex;
use defmt_or_log::warn;
use heapless::Deque;

/// A fixed size frame queue shared between a receiving context (e.g. a CAN controller IRQ) and
/// the [`Gateway`](crate::Gateway)
///
/// Incoming frames should be passed to [FrameMbox::store_message]. When the queue is full the
/// newest frame is dropped and counted.
#[allow(missing_debug_implementations)]
pub struct FrameMbox<const N: usize> {
    queue: Mutex<RefCell<Deque<CanMessage, N>>>,
    dropped: AtomicCell<u32>,
    notify_cb: AtomicCell<Option<&'static (dyn Fn() + Sync)>>,
}

impl<const N: usize> Default for FrameMbox<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> FrameMbox<N> {
    /// Create an empty mailbox
    pub const fn new() -> Self {
        Self {
            queue: Mutex::new(RefCell::new(Deque::new())),
            dropped: AtomicCell::new(0),
            notify_cb: AtomicCell::new(None),
        }
    }

    /// Set a callback for notification when a frame is received and requires processing.
    ///
    /// It must be static. Usually this will be a static fn, but in some circumstances, it may be
    /// desirable to use Box::leak to pass a heap allocated closure instead.
    pub fn set_process_notify_callback(&self, callback: &'static (dyn Fn() + Sync)) {
        self.notify_cb.store(Some(callback));
    }

    fn notify(&self) {
        if let Some(notify_cb) = self.notify_cb.load() {
            notify_cb();
        }
    }

    /// Store a received CAN frame
    ///
    /// Returns the frame back if the queue is full.
    pub fn store_message(&self, msg: CanMessage) -> Result<(), CanMessage> {
        let result =
            critical_section::with(|cs| self.queue.borrow_ref_mut(cs).push_back(msg));
        match result {
            Ok(()) => {
                self.notify();
                Ok(())
            }
            Err(msg) => {
                self.dropped.fetch_add(1);
                warn!("Frame mailbox full, dropping frame");
                Err(msg)
            }
        }
    }

    /// Take the oldest pending frame
    pub fn take_message(&self) -> Option<CanMessage> {
        critical_section::with(|cs| self.queue.borrow_ref_mut(cs).pop_front())
    }

    /// Number of frames waiting
    pub fn pending(&self) -> usize {
        critical_section::with(|cs| self.queue.borrow_ref(cs).len())
    }

    /// Number of frames dropped because the queue was full, since the last call
    pub fn take_dropped(&self) -> u32 {
        self.dropped.take()
    }
}

impl<const N: usize> FrameSource for FrameMbox<N> {
    fn take_frame(&self) -> Option<CanMessage> {
        self.take_message()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cangate_common::messages::CanId;
    use core::sync::atomic::{AtomicUsize, Ordering};

    static NOTIFIED: AtomicUsize = AtomicUsize::new(0);

    fn on_notify() {
        NOTIFIED.fetch_add(1, Ordering::Relaxed);
    }

    #[test]
    fn test_fifo_and_overflow() {
        let mbox = FrameMbox::<2>::new();
        mbox.set_process_notify_callback(&on_notify);
        for id in 1..=3u16 {
            let _ = mbox.store_message(CanMessage::new(CanId::std(id), &[]));
        }
        assert_eq!(2, NOTIFIED.load(Ordering::Relaxed));
        assert_eq!(2, mbox.pending());
        assert_eq!(1, mbox.take_dropped());
        assert_eq!(0, mbox.take_dropped());

        assert_eq!(Some(CanId::std(1)), mbox.take_frame().map(|m| m.id()));
        assert_eq!(Some(CanId::std(2)), mbox.take_frame().map(|m| m.id()));
        assert_eq!(None, mbox.take_frame());
    }
}
