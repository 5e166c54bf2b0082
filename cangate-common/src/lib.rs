//! Common functionality shared among the cangate crates.
//!
//! This crate holds the data model of the gateway: CAN frames, action kinds and their parameter
//! payloads, rule records and their text encoding, parameter mapping descriptors, and the platform
//! capability profiles. Most users will reach it through the re-export in `cangate-node`.
#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs, missing_copy_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod atomic_cell;
pub use atomic_cell::AtomicCell;
pub mod actions;
pub mod definitions;
pub mod error;
#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
pub mod gateway_config;
pub mod messages;
pub mod params;
pub mod platform;
pub mod rule;
pub mod traits;

pub use actions::{Action, ActionKind, CanPayload};
pub use error::{ActionError, PinMode, RuleParseError};
pub use messages::{CanId, CanMessage};
pub use params::{ActionDefinition, ParamMapping, ParamSource, ParamType, ParamValue};
pub use platform::PlatformProfile;
pub use rule::{format_rule, parse_rule, ActionRule};
pub use traits::{FrameSource, GpioOp, Hardware};
