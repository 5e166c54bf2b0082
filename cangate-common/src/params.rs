//! Parameter mapping descriptors and the extraction logic used to resolve them
//!
//! An [`ActionDefinition`] describes, for one action kind on one platform, where each of its
//! parameters lives inside a CAN payload. When a rule takes its parameters from the triggering
//! frame, the dispatcher walks the definition's [`ParamMapping`]s and resolves each with the
//! `extract_*` functions in this module.
//!
//! Extraction never fails. A mapping whose byte range does not fit in an 8-byte payload resolves to
//! the zero value of its type, and bytes beyond the end of a short slice read as zero. Integer
//! values are clamped into `[min_value, max_value]`, signed types reinterpreting the bounds as
//! signed. Floats are not clamped.
use crate::actions::ActionKind;

/// Numeric representation of a parameter inside the payload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParamType {
    /// 8-bit unsigned, optionally a bit field
    U8,
    /// 16-bit unsigned, little endian
    U16,
    /// 32-bit unsigned, little endian
    U32,
    /// 8-bit signed
    I8,
    /// 16-bit signed, little endian
    I16,
    /// 32-bit signed, little endian
    I32,
    /// IEEE-754 single precision, little endian
    F32,
    /// A single bit
    Bool,
}

impl ParamType {
    /// Number of payload bytes the type occupies
    pub const fn width(&self) -> usize {
        match self {
            ParamType::U8 | ParamType::I8 | ParamType::Bool => 1,
            ParamType::U16 | ParamType::I16 => 2,
            ParamType::U32 | ParamType::I32 | ParamType::F32 => 4,
        }
    }

    /// Lower case type name
    pub const fn name(&self) -> &'static str {
        match self {
            ParamType::U8 => "uint8",
            ParamType::U16 => "uint16",
            ParamType::U32 => "uint32",
            ParamType::I8 => "int8",
            ParamType::I16 => "int16",
            ParamType::I32 => "int32",
            ParamType::F32 => "float",
            ParamType::Bool => "bool",
        }
    }
}

/// What a parameter is used for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParamRole {
    /// Configures the effect itself (pin, duty, color)
    ActionParam,
    /// Controls when the action runs (interval)
    TriggerParam,
    /// Describes where a result goes (target id, buffer slot)
    OutputParam,
}

impl ParamRole {
    /// Snake case role name
    pub const fn name(&self) -> &'static str {
        match self {
            ParamRole::ActionParam => "action_param",
            ParamRole::TriggerParam => "trigger_param",
            ParamRole::OutputParam => "output_param",
        }
    }
}

/// What normally causes an action to run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerType {
    /// A matching CAN frame
    CanMsg,
    /// A timer interval
    Periodic,
    /// A GPIO edge
    Gpio,
    /// An explicit request
    Manual,
}

impl TriggerType {
    /// Snake case trigger name
    pub const fn name(&self) -> &'static str {
        match self {
            TriggerType::CanMsg => "can_msg",
            TriggerType::Periodic => "periodic",
            TriggerType::Gpio => "gpio",
            TriggerType::Manual => "manual",
        }
    }
}

/// Where a rule's action parameters come from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParamSource {
    /// The fixed values stored in the rule
    #[default]
    FromRule,
    /// Extracted from the payload of the triggering frame
    FromFrame,
}

impl ParamSource {
    /// The token used by the rule text encoding
    pub const fn name(&self) -> &'static str {
        match self {
            ParamSource::FromRule => "fixed",
            ParamSource::FromFrame => "candata",
        }
    }

    /// Parse a rule text token, accepting the `rule` and `can` aliases
    pub fn from_name(name: &str) -> Option<ParamSource> {
        match name {
            "fixed" | "rule" => Some(ParamSource::FromRule),
            "candata" | "can" => Some(ParamSource::FromFrame),
            _ => None,
        }
    }
}

/// Location and range of one parameter inside a CAN payload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamMapping {
    /// Parameter name
    pub name: &'static str,
    /// First payload byte
    pub data_byte_index: u8,
    /// Bit offset within the byte, for packed fields
    pub bit_offset: u8,
    /// Field width in bits; 8 or more means the whole byte
    pub bit_length: u8,
    /// Numeric representation
    pub param_type: ParamType,
    /// Lower clamp bound
    pub min_value: u32,
    /// Upper clamp bound
    pub max_value: u32,
    /// Usage tag
    pub role: ParamRole,
    /// Short human readable label
    pub label: &'static str,
    /// Longer description
    pub hint: &'static str,
}

impl ParamMapping {
    /// A whole-field mapping starting at `data_byte_index`
    pub const fn new(
        name: &'static str,
        data_byte_index: u8,
        param_type: ParamType,
        min_value: u32,
        max_value: u32,
        role: ParamRole,
    ) -> Self {
        Self {
            name,
            data_byte_index,
            bit_offset: 0,
            bit_length: (param_type.width() * 8) as u8,
            param_type,
            min_value,
            max_value,
            role,
            label: "",
            hint: "",
        }
    }

    /// Restrict the mapping to `bit_length` bits starting at `bit_offset`
    pub const fn bits(mut self, bit_offset: u8, bit_length: u8) -> Self {
        self.bit_offset = bit_offset;
        self.bit_length = bit_length;
        self
    }

    /// Attach a label and description
    pub const fn describe(mut self, label: &'static str, hint: &'static str) -> Self {
        self.label = label;
        self.hint = hint;
        self
    }

    /// Resolve this mapping against `data`
    pub fn resolve(&self, data: &[u8]) -> ParamValue {
        match self.param_type {
            ParamType::U8 => ParamValue::U8(extract_u8(data, self)),
            ParamType::U16 => ParamValue::U16(extract_u16(data, self)),
            ParamType::U32 => ParamValue::U32(extract_u32(data, self)),
            ParamType::I8 => ParamValue::I8(extract_i8(data, self)),
            ParamType::I16 => ParamValue::I16(extract_i16(data, self)),
            ParamType::I32 => ParamValue::I32(extract_i32(data, self)),
            ParamType::F32 => ParamValue::F32(extract_f32(data, self)),
            ParamType::Bool => ParamValue::Bool(extract_bool(data, self)),
        }
    }
}

/// Static description of one action kind as supported by a platform
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionDefinition {
    /// The kind described
    pub kind: ActionKind,
    /// Display name, matching the rule text name
    pub name: &'static str,
    /// Human readable description
    pub description: &'static str,
    /// Grouping for user interfaces
    pub category: &'static str,
    /// Usual trigger
    pub trigger: TriggerType,
    /// Parameter layout, in argument order
    pub params: &'static [ParamMapping],
}

impl ActionDefinition {
    /// Get the mapping at position `index`
    pub fn param(&self, index: usize) -> Option<&'static ParamMapping> {
        self.params.get(index)
    }

    /// Find a mapping by name
    pub fn param_by_name(&self, name: &str) -> Option<&'static ParamMapping> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// A resolved parameter value
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParamValue {
    #[allow(missing_docs)]
    U8(u8),
    #[allow(missing_docs)]
    U16(u16),
    #[allow(missing_docs)]
    U32(u32),
    #[allow(missing_docs)]
    I8(i8),
    #[allow(missing_docs)]
    I16(i16),
    #[allow(missing_docs)]
    I32(i32),
    #[allow(missing_docs)]
    F32(f32),
    #[allow(missing_docs)]
    Bool(bool),
}

impl ParamValue {
    /// Convert to u32, saturating negative values to zero and truncating floats
    pub fn as_u32(&self) -> u32 {
        match *self {
            ParamValue::U8(v) => v as u32,
            ParamValue::U16(v) => v as u32,
            ParamValue::U32(v) => v,
            ParamValue::I8(v) => v.max(0) as u32,
            ParamValue::I16(v) => v.max(0) as u32,
            ParamValue::I32(v) => v.max(0) as u32,
            ParamValue::F32(v) => v as u32,
            ParamValue::Bool(v) => v as u32,
        }
    }

    /// Convert to u8, saturating at 255
    pub fn as_u8(&self) -> u8 {
        self.as_u32().min(u8::MAX as u32) as u8
    }

    /// Nonzero values are true
    pub fn as_bool(&self) -> bool {
        self.as_u32() != 0
    }
}

/// Copy `N` bytes starting at the mapping's byte index, if the field fits in a CAN payload
///
/// Bytes past the end of `data` read as zero.
fn field_bytes<const N: usize>(data: &[u8], mapping: &ParamMapping) -> Option<[u8; N]> {
    let start = mapping.data_byte_index as usize;
    if start + N > 8 {
        return None;
    }
    let mut bytes = [0u8; N];
    for (i, b) in bytes.iter_mut().enumerate() {
        *b = data.get(start + i).copied().unwrap_or(0);
    }
    Some(bytes)
}

fn clamp_unsigned(value: u32, mapping: &ParamMapping) -> u32 {
    let mut value = value;
    if value < mapping.min_value {
        value = mapping.min_value;
    }
    if value > mapping.max_value {
        value = mapping.max_value;
    }
    value
}

/// Extract an unsigned byte, honoring bit fields narrower than 8 bits
pub fn extract_u8(data: &[u8], mapping: &ParamMapping) -> u8 {
    let Some([mut raw]) = field_bytes::<1>(data, mapping) else {
        return 0;
    };
    if mapping.bit_length < 8 {
        let mask = ((1u16 << mapping.bit_length) - 1) as u8;
        raw = raw.checked_shr(mapping.bit_offset as u32).unwrap_or(0) & mask;
    }
    clamp_unsigned(raw as u32, mapping) as u8
}

/// Extract a signed byte
pub fn extract_i8(data: &[u8], mapping: &ParamMapping) -> i8 {
    let Some([raw]) = field_bytes::<1>(data, mapping) else {
        return 0;
    };
    let mut value = if mapping.bit_length < 8 {
        let mask = ((1u16 << mapping.bit_length) - 1) as u8;
        (raw.checked_shr(mapping.bit_offset as u32).unwrap_or(0) & mask) as i8
    } else {
        raw as i8
    };
    let min = mapping.min_value as i8;
    let max = mapping.max_value as i8;
    if value < min {
        value = min;
    }
    if value > max {
        value = max;
    }
    value
}

/// Extract a little endian u16
pub fn extract_u16(data: &[u8], mapping: &ParamMapping) -> u16 {
    let Some(bytes) = field_bytes::<2>(data, mapping) else {
        return 0;
    };
    clamp_unsigned(u16::from_le_bytes(bytes) as u32, mapping) as u16
}

/// Extract a little endian i16
pub fn extract_i16(data: &[u8], mapping: &ParamMapping) -> i16 {
    let Some(bytes) = field_bytes::<2>(data, mapping) else {
        return 0;
    };
    let mut value = i16::from_le_bytes(bytes);
    let min = mapping.min_value as i16;
    let max = mapping.max_value as i16;
    if value < min {
        value = min;
    }
    if value > max {
        value = max;
    }
    value
}

/// Extract a little endian u32
pub fn extract_u32(data: &[u8], mapping: &ParamMapping) -> u32 {
    let Some(bytes) = field_bytes::<4>(data, mapping) else {
        return 0;
    };
    clamp_unsigned(u32::from_le_bytes(bytes), mapping)
}

/// Extract a little endian i32
pub fn extract_i32(data: &[u8], mapping: &ParamMapping) -> i32 {
    let Some(bytes) = field_bytes::<4>(data, mapping) else {
        return 0;
    };
    let mut value = i32::from_le_bytes(bytes);
    let min = mapping.min_value as i32;
    let max = mapping.max_value as i32;
    if value < min {
        value = min;
    }
    if value > max {
        value = max;
    }
    value
}

/// Extract a little endian f32. No clamping is applied.
pub fn extract_f32(data: &[u8], mapping: &ParamMapping) -> f32 {
    match field_bytes::<4>(data, mapping) {
        Some(bytes) => f32::from_le_bytes(bytes),
        None => 0.0,
    }
}

/// Test the bit at `bit_offset`
pub fn extract_bool(data: &[u8], mapping: &ParamMapping) -> bool {
    let Some([raw]) = field_bytes::<1>(data, mapping) else {
        return false;
    };
    raw.checked_shr(mapping.bit_offset as u32).unwrap_or(0) & 1 != 0
}
