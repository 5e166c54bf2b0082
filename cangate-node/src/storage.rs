//! Persistent storage of the rule table
//!
//! The gateway saves its rules through a [`RuleStorage`] after every change, and reads them back
//! at startup. Backends which store raw bytes, such as a flash page, can implement
//! [`ImageBackend`] instead and wrap it in an [`ImageStorage`], which handles the
//! [persist](crate::persist) image format.
use core::convert::Infallible;

use cangate_common::rule::ActionRule;
use defmt_or_log::warn;

use crate::persist;

/// A place where rules are kept across restarts
pub trait RuleStorage {
    /// Replace the stored rules with `rules`, returning true on success
    fn save(&mut self, rules: &[ActionRule]) -> bool;

    /// Pass up to `max` stored rules to `sink`, returning the number passed
    fn load(&mut self, max: usize, sink: &mut dyn FnMut(ActionRule)) -> usize;
}

/// A byte store holding a single rule image
pub trait ImageBackend {
    /// Write a new image of `size` bytes, read from `reader`
    fn write_image(&mut self, reader: &mut dyn embedded_io::Read<Error = Infallible>, size: usize)
        -> bool;

    /// The stored image, if any
    fn read_image(&self) -> Option<&[u8]>;
}

/// Adapts an [`ImageBackend`] into a [`RuleStorage`]
#[derive(Debug, Default)]
pub struct ImageStorage<B> {
    backend: B,
}

impl<B: ImageBackend> ImageStorage<B> {
    /// Wrap a backend
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Access the backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutably access the backend
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: ImageBackend> RuleStorage for ImageStorage<B> {
    fn save(&mut self, rules: &[ActionRule]) -> bool {
        let backend = &mut self.backend;
        persist::serialize(rules, |reader, size| backend.write_image(reader, size))
    }

    fn load(&mut self, max: usize, sink: &mut dyn FnMut(ActionRule)) -> usize {
        let Some(image) = self.backend.read_image() else {
            return 0;
        };
        let mut count = 0;
        let result = persist::restore_rules(image, |rule| {
            if count < max {
                sink(rule);
                count += 1;
            }
        });
        if let Err(e) = result {
            warn!("Stored rule image rejected: {:?}", e);
        }
        count
    }
}
