//! A library to run CAN automation rules in Rust
//!
//! Cangate-node is the core of a CAN bus automation gateway. It holds a table
//! of rules, each pairing a frame pattern with an action, and executes the
//! actions of every rule a received frame matches. It is primarily intended to
//! be run on microcontrollers, and so it is no_std compatible and performs no
//! heap allocation, instead statically allocating storage. It provides the
//! following features:
//!
//! * A fixed capacity *rule table* with automatic id assignment.
//! * Masked matching of frame identifiers and payload bytes.
//! * Dispatch of GPIO, PWM, RGB LED, I2C and CAN send actions to a
//!   board-specific [`Hardware`](common::Hardware) implementation, with
//!   parameters taken either from the rule or from the triggering frame.
//! * Tracking of pin ownership, so that two rules can not drive the same pin
//!   in conflicting ways.
//! * A data buffer which collects sensor reads for transmission as a single
//!   frame.
//! * Periodic frame transmission.
//! * Serialization of the rule table for persistent storage.
//!
//! # Getting Started
//!
//! ## Platform selection
//!
//! A gateway runs with a [`PlatformProfile`](common::PlatformProfile), which
//! describes what the board can do, how many rules it holds, and which pins
//! are wired to on-board hardware. The built-in profiles are
//! [`RP2040`](common::PlatformProfile::RP2040),
//! [`SAMD51`](common::PlatformProfile::SAMD51) and
//! [`ESP32`](common::PlatformProfile::ESP32). On std targets, a profile can be
//! selected from a TOML file, see the
//! [common::gateway_config] module docs for more info.
//!
//! ## Hardware
//!
//! The application implements [`Hardware`](common::Hardware) for its board.
//! Implementations should return the profile's action definitions from
//! `definitions()`, otherwise rules taking parameters from frame data can not
//! run.
//!
//! ## Instantiating the [`Gateway`] object
//!
//! ```ignore
//! static FRAME_MBOX: FrameMbox<16> = FrameMbox::new();
//!
//! let mut storage = ImageStorage::new(FlashPage::new(&mut flash));
//! let mut gateway: Gateway<_, 64> = Gateway::new(board, PlatformProfile::SAMD51)
//!     .with_storage(&mut storage)
//!     .with_mbox(&FRAME_MBOX);
//! if gateway.load_rules() == 0 {
//!     gateway.load_defaults(&DEFAULT_RULES);
//! }
//! ```
//!
//! ## Handling CAN messages
//!
//! Received frames should be passed to the mailbox. This can be done in any
//! thread -- a good way to do it is to have the CAN controller receive
//! interrupt store frames here directly.
//!
//! ```ignore
//! let msg = cangate_node::common::CanMessage::new(id, &buffer[..len]);
//! // An Err means the mailbox was full and the frame was dropped
//! FRAME_MBOX.store_message(msg).ok();
//! ```
//!
//! To execute the rules, [`Gateway::process`] must be called periodically. It
//! drains the mailbox, runs every matching rule, then sends any periodic
//! frames which are due. The mailbox provides a callback which can be used to
//! notify another task that process should be called when a frame arrives.
//!
//! ```ignore
//! loop {
//!     gateway.process(millis(), |report| {
//!         if !report.is_ok() {
//!             defmt::warn!("rule {} failed", report.rule_id);
//!         }
//!     });
//! }
//! ```
//!
//! ## Managing rules
//!
//! Rules can be built in code, or parsed from the colon-delimited text form
//! described in [common::rule]:
//!
//! ```ignore
//! let id = gateway.parse_and_add_rule("0:0x100:0x7FF:::0:GPIO_TOGGLE:fixed:13")?;
//! ```
//!
//! Every change to the rule table is saved through the attached storage.
#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![warn(missing_docs, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod data_buffer;
mod dispatcher;
mod frame_mbox;
mod gateway;
pub mod matcher;
mod pin_alloc;
pub mod persist;
mod rule_store;
pub mod scheduler;
pub mod storage;

// Re-export types used by applications
pub use cangate_common as common;
pub use critical_section;

pub use data_buffer::{ActionDataBuffer, BUFFER_SIZE};
pub use dispatcher::{ActionDispatcher, ActionOutcome};
pub use frame_mbox::FrameMbox;
pub use gateway::{ActionReport, Gateway};
pub use persist::{restore_rules, serialize, serialized_size, PersistReadError};
pub use pin_alloc::{PinAllocator, MAX_PINS};
pub use rule_store::{RuleStore, MAX_RULES};
pub use storage::{ImageBackend, ImageStorage, RuleStorage};
