//! Serialization of the rule table for persistent storage
//!
//! The image is laid out as
//!
//! ```text
//! "CGTR" | version: u8 | count: u8 | node* | crc: u16
//! ```
//!
//! Each node is `[length: u16][type: u8][payload]`, where `length` covers the type byte and the
//! payload. The CRC is CRC-16/ARC over everything before it. All multi-byte values are little
//! endian. Periodic bookkeeping is not stored.
use core::{
    cell::RefCell,
    convert::Infallible,
    future::Future,
    pin::{pin, Pin},
    task::Context,
};

use cangate_common::{
    actions::{Action, ActionKind, CanPayload},
    messages::MAX_DATA_LENGTH,
    params::ParamSource,
    rule::ActionRule,
};
use crc16::{State, ARC};
use futures::{pending, task::noop_waker_ref};

use defmt_or_log::{info, warn};

/// Identifies a rule image
pub const MAGIC: [u8; 4] = *b"CGTR";
/// Current image format version
pub const VERSION: u8 = 1;

const HEADER_SIZE: usize = 6;
const CRC_SIZE: usize = 2;
const PARAM_BLOCK_SIZE: usize = 17;
/// Size of a serialized rule record, not including the node header
pub const RULE_RECORD_SIZE: usize = 29 + PARAM_BLOCK_SIZE;

const FLAG_ENABLED: u8 = 1 << 0;
const FLAG_FROM_FRAME: u8 = 1 << 1;

/// Specifies the types of nodes which can be serialized to persistent storage
#[derive(Debug, Copy, Clone, PartialEq)]
#[repr(u8)]
pub enum NodeType {
    /// A node containing a rule
    Rule = 1,
    /// An unrecognized node type
    Unknown,
}

impl NodeType {
    /// Create a `NodeType` from an ID byte
    pub fn from_byte(b: u8) -> Self {
        match b {
            1 => Self::Rule,
            _ => Self::Unknown,
        }
    }
}

/// Encode the parameters of an action into a fixed size block
fn encode_params(action: &Action) -> [u8; PARAM_BLOCK_SIZE] {
    fn put_payload(p: &mut [u8; PARAM_BLOCK_SIZE], payload: &CanPayload) {
        p[0..4].copy_from_slice(&payload.can_id.to_le_bytes());
        p[4] = payload.len;
        p[5..13].copy_from_slice(&payload.data);
    }
    let mut p = [0u8; PARAM_BLOCK_SIZE];
    match *action {
        Action::GpioSet { pin } | Action::GpioClear { pin } | Action::GpioToggle { pin } => {
            p[0] = pin;
        }
        Action::PwmSet { pin, duty } => p[..2].copy_from_slice(&[pin, duty]),
        Action::PwmConfigure {
            pin,
            freq_hz,
            duty_pct,
            resolution_bits,
        } => {
            p[0] = pin;
            p[1..5].copy_from_slice(&freq_hz.to_le_bytes());
            p[5] = duty_pct;
            p[6] = resolution_bits;
        }
        Action::NeopixelColor { r, g, b, brightness } => {
            p[..4].copy_from_slice(&[r, g, b, brightness]);
        }
        Action::CanSend(payload) => put_payload(&mut p, &payload),
        Action::CanSendPeriodic {
            payload,
            interval_ms,
        } => {
            put_payload(&mut p, &payload);
            p[13..17].copy_from_slice(&interval_ms.to_le_bytes());
        }
        Action::I2cWrite {
            sda,
            scl,
            addr,
            reg,
            value,
        } => p[..5].copy_from_slice(&[sda, scl, addr, reg, value]),
        Action::I2cReadBuffer {
            sda,
            scl,
            addr,
            reg,
            count,
            slot,
        } => p[..6].copy_from_slice(&[sda, scl, addr, reg, count, slot]),
        Action::GpioReadBuffer { pin, slot } | Action::AdcReadBuffer { pin, slot } => {
            p[..2].copy_from_slice(&[pin, slot]);
        }
        Action::BufferSend {
            can_id,
            len,
            clear_after,
        } => {
            p[0..4].copy_from_slice(&can_id.to_le_bytes());
            p[4] = len;
            p[5] = clear_after as u8;
        }
        Action::NeopixelOff | Action::BufferClear => (),
    }
    p
}

fn decode_params(kind: ActionKind, p: &[u8; PARAM_BLOCK_SIZE]) -> Action {
    let u32_at = |i: usize| u32::from_le_bytes([p[i], p[i + 1], p[i + 2], p[i + 3]]);
    let payload = || {
        let len = p[4].min(MAX_DATA_LENGTH as u8);
        CanPayload::new(u32_at(0), &p[5..5 + len as usize])
    };
    match kind {
        ActionKind::GpioSet => Action::GpioSet { pin: p[0] },
        ActionKind::GpioClear => Action::GpioClear { pin: p[0] },
        ActionKind::GpioToggle => Action::GpioToggle { pin: p[0] },
        ActionKind::PwmSet => Action::PwmSet {
            pin: p[0],
            duty: p[1],
        },
        ActionKind::PwmConfigure => Action::PwmConfigure {
            pin: p[0],
            freq_hz: u32_at(1),
            duty_pct: p[5],
            resolution_bits: p[6],
        },
        ActionKind::NeopixelColor => Action::NeopixelColor {
            r: p[0],
            g: p[1],
            b: p[2],
            brightness: p[3],
        },
        ActionKind::NeopixelOff => Action::NeopixelOff,
        ActionKind::CanSend => Action::CanSend(payload()),
        ActionKind::CanSendPeriodic => Action::CanSendPeriodic {
            payload: payload(),
            interval_ms: u32_at(13),
        },
        ActionKind::I2cWrite => Action::I2cWrite {
            sda: p[0],
            scl: p[1],
            addr: p[2],
            reg: p[3],
            value: p[4],
        },
        ActionKind::I2cReadBuffer => Action::I2cReadBuffer {
            sda: p[0],
            scl: p[1],
            addr: p[2],
            reg: p[3],
            count: p[4],
            slot: p[5],
        },
        ActionKind::GpioReadBuffer => Action::GpioReadBuffer {
            pin: p[0],
            slot: p[1],
        },
        ActionKind::AdcReadBuffer => Action::AdcReadBuffer {
            pin: p[0],
            slot: p[1],
        },
        ActionKind::BufferSend => Action::BufferSend {
            can_id: u32_at(0),
            len: p[4],
            clear_after: p[5] != 0,
        },
        ActionKind::BufferClear => Action::BufferClear,
    }
}

/// Encode a rule record
pub fn encode_rule(rule: &ActionRule) -> [u8; RULE_RECORD_SIZE] {
    let mut out = [0u8; RULE_RECORD_SIZE];
    let mut flags = 0;
    if rule.enabled {
        flags |= FLAG_ENABLED;
    }
    if rule.param_source == ParamSource::FromFrame {
        flags |= FLAG_FROM_FRAME;
    }
    out[0] = rule.id;
    out[1] = flags;
    out[2..6].copy_from_slice(&rule.can_id.to_le_bytes());
    out[6..10].copy_from_slice(&rule.can_id_mask.to_le_bytes());
    out[10..18].copy_from_slice(&rule.data);
    out[18..26].copy_from_slice(&rule.data_mask);
    out[26] = rule.data_length;
    out[27] = rule.param_data_offset;
    out[28] = rule.kind().into();
    out[29..].copy_from_slice(&encode_params(&rule.action));
    out
}

/// Decode a rule record
pub fn decode_rule(data: &[u8]) -> Result<ActionRule, PersistReadError> {
    let data: &[u8; RULE_RECORD_SIZE] = data
        .get(..RULE_RECORD_SIZE)
        .and_then(|d| d.try_into().ok())
        .ok_or(PersistReadError::NodeLengthShort)?;
    let kind = ActionKind::try_from(data[28]).map_err(|_| PersistReadError::InvalidRecord)?;
    if data[26] as usize > MAX_DATA_LENGTH {
        return Err(PersistReadError::InvalidRecord);
    }
    let mut params = [0u8; PARAM_BLOCK_SIZE];
    params.copy_from_slice(&data[29..]);
    let mut match_data = [0u8; MAX_DATA_LENGTH];
    match_data.copy_from_slice(&data[10..18]);
    let mut data_mask = [0u8; MAX_DATA_LENGTH];
    data_mask.copy_from_slice(&data[18..26]);

    let flags = data[1];
    let mut rule = ActionRule::new(
        data[0],
        u32::from_le_bytes([data[2], data[3], data[4], data[5]]),
        u32::from_le_bytes([data[6], data[7], data[8], data[9]]),
        decode_params(kind, &params),
    );
    rule.enabled = flags & FLAG_ENABLED != 0;
    rule.data = match_data;
    rule.data_mask = data_mask;
    rule.data_length = data[26];
    rule.param_data_offset = data[27];
    if flags & FLAG_FROM_FRAME != 0 {
        rule.param_source = ParamSource::FromFrame;
    }
    Ok(rule)
}

struct ImageWriter<'a> {
    reg: &'a RefCell<u8>,
    crc: State<ARC>,
}

impl ImageWriter<'_> {
    async fn write_raw(&mut self, bytes: &[u8]) {
        for b in bytes {
            *self.reg.borrow_mut() = *b;
            pending!()
        }
    }

    async fn write(&mut self, bytes: &[u8]) {
        self.crc.update(bytes);
        self.write_raw(bytes).await;
    }
}

async fn serialize_sm(rules: &[ActionRule], reg: &RefCell<u8>) {
    let mut w = ImageWriter {
        reg,
        crc: State::<ARC>::new(),
    };
    w.write(&MAGIC).await;
    w.write(&[VERSION, rules.len() as u8]).await;
    for rule in rules {
        let node_size = (RULE_RECORD_SIZE + 1) as u16;
        w.write(&node_size.to_le_bytes()).await;
        w.write(&[NodeType::Rule as u8]).await;
        w.write(&encode_rule(rule)).await;
    }
    let crc = w.crc.get();
    w.write_raw(&crc.to_le_bytes()).await;
}

struct PersistSerializer<'a, 'b, F: Future> {
    f: Pin<&'a mut F>,
    reg: &'b RefCell<u8>,
}

impl<'a, 'b, F: Future> PersistSerializer<'a, 'b, F> {
    pub fn new(f: Pin<&'a mut F>, reg: &'b RefCell<u8>) -> Self {
        Self { f, reg }
    }
}

impl<F: Future> embedded_io::ErrorType for PersistSerializer<'_, '_, F> {
    type Error = Infallible;
}

impl<F: Future> embedded_io::Read for PersistSerializer<'_, '_, F> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Infallible> {
        let mut cx = Context::from_waker(noop_waker_ref());

        let mut pos = 0;
        loop {
            if pos >= buf.len() {
                return Ok(pos);
            }

            match self.f.as_mut().poll(&mut cx) {
                core::task::Poll::Ready(_) => return Ok(pos),
                core::task::Poll::Pending => {
                    buf[pos] = *self.reg.borrow();
                    pos += 1;
                }
            }
        }
    }
}

/// Number of bytes [`serialize`] produces for `rule_count` rules
pub fn serialized_size(rule_count: usize) -> usize {
    HEADER_SIZE + rule_count * (RULE_RECORD_SIZE + 3) + CRC_SIZE
}

/// Serialize rules
///
/// The callback receives a reader yielding the image, along with its total size. At most 255
/// rules are written.
pub fn serialize<R, F: FnOnce(&mut dyn embedded_io::Read<Error = Infallible>, usize) -> R>(
    rules: &[ActionRule],
    callback: F,
) -> R {
    let rules = &rules[..rules.len().min(u8::MAX as usize)];
    let reg = RefCell::new(0);
    let fut = pin!(serialize_sm(rules, &reg));
    let mut serializer = PersistSerializer::new(fut, &reg);
    callback(&mut serializer, serialized_size(rules.len()))
}

/// Error which can be returned while reading persisted data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PersistReadError {
    /// The image is too short to hold a header and checksum
    ImageTooShort,
    /// The image does not start with the expected magic bytes
    BadMagic,
    /// The image was written by an unsupported format version
    UnsupportedVersion(u8),
    /// The checksum does not match the contents
    CrcMismatch,
    /// Not enough bytes were present to construct the node
    NodeLengthShort,
    /// A rule node holds values which cannot form a rule
    InvalidRecord,
}

/// A reference to a single node within a slice of serialized data
///
/// Returned by the PersistNodeReader iterator.
#[derive(Debug, PartialEq)]
pub enum PersistNodeRef<'a> {
    /// A serialized rule record
    Rule(&'a [u8]),
    /// An unrecognized node type was encountered. Either the serialized data is malformed, or
    /// perhaps it was written with a future version of code that supports more node types
    ///
    /// The bytes of the node are stored in the contained slice, including the node type in the
    /// first byte
    Unknown(&'a [u8]),
}

impl<'a> PersistNodeRef<'a> {
    /// Create a PersistNodeRef from a slice of bytes
    pub fn from_slice(data: &'a [u8]) -> Result<Self, PersistReadError> {
        if data.is_empty() {
            return Err(PersistReadError::NodeLengthShort);
        }

        match NodeType::from_byte(data[0]) {
            NodeType::Rule => Ok(Self::Rule(&data[1..])),
            NodeType::Unknown => Ok(PersistNodeRef::Unknown(data)),
        }
    }
}

/// Read serialized nodes from a slice of bytes
///
/// PersistNodeReader provides an Iterator of PersistNodeRef objects, representing all of the nodes
/// stored in the slice. Iteration stops at the first truncated node.
#[derive(Debug)]
pub struct PersistNodeReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PersistNodeReader<'a> {
    /// Instantiate a PersistNodeReader from a slice of serialized nodes
    pub fn new(data: &'a [u8]) -> Self {
        Self { buf: data, pos: 0 }
    }
}

impl<'a> Iterator for PersistNodeReader<'a> {
    type Item = PersistNodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let header = self.buf.get(self.pos..self.pos + 2)?;
        let length = u16::from_le_bytes([header[0], header[1]]) as usize;
        self.pos += 2;
        let node_slice = self.buf.get(self.pos..self.pos + length)?;
        self.pos += length;

        PersistNodeRef::from_slice(node_slice).ok()
    }
}

/// Check the framing of a rule image, returning the node section
pub fn validate_image(data: &[u8]) -> Result<&[u8], PersistReadError> {
    if data.len() < HEADER_SIZE + CRC_SIZE {
        return Err(PersistReadError::ImageTooShort);
    }
    if data[..4] != MAGIC {
        return Err(PersistReadError::BadMagic);
    }
    if data[4] != VERSION {
        return Err(PersistReadError::UnsupportedVersion(data[4]));
    }
    let (body, crc) = data.split_at(data.len() - CRC_SIZE);
    if State::<ARC>::calculate(body) != u16::from_le_bytes([crc[0], crc[1]]) {
        return Err(PersistReadError::CrcMismatch);
    }
    Ok(&body[HEADER_SIZE..])
}

/// Load rules previously serialized with [`serialize`]
///
/// Each decoded rule is passed to `sink` in stored order. Unknown nodes and undecodable rules are
/// skipped with a warning. Returns the number of rules passed to `sink`.
pub fn restore_rules(
    stored_data: &[u8],
    mut sink: impl FnMut(ActionRule),
) -> Result<usize, PersistReadError> {
    let nodes = validate_image(stored_data)?;
    let expected = stored_data[5] as usize;
    let mut count = 0;
    for item in PersistNodeReader::new(nodes) {
        match item {
            PersistNodeRef::Rule(record) => match decode_rule(record) {
                Ok(rule) => {
                    sink(rule);
                    count += 1;
                }
                Err(_) => warn!("Skipping undecodable stored rule"),
            },
            PersistNodeRef::Unknown(node) => warn!("Unknown persisted node read: {}", node[0]),
        }
    }
    if count != expected {
        warn!("Image header lists {} rules, restored {}", expected, count);
    }
    info!("Restored {} stored rules", count);
    Ok(count)
}
