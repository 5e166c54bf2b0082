//! CAN frame types shared by the gateway core and the platform glue

/// Highest identifier representable in a standard (11-bit) frame
pub const MAX_STD_ID: u32 = 0x7FF;
/// Highest identifier representable in an extended (29-bit) frame
pub const MAX_EXTENDED_ID: u32 = 0x1FFF_FFFF;
/// Maximum payload of a classic CAN frame
pub const MAX_DATA_LENGTH: usize = 8;

/// A CAN identifier, either standard or extended
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CanId {
    /// A 29-bit extended identifier
    Extended(u32),
    /// An 11-bit standard identifier
    Std(u16),
}

impl CanId {
    /// Create an extended ID
    pub const fn extended(id: u32) -> CanId {
        CanId::Extended(id)
    }

    /// Create a standard ID
    pub const fn std(id: u16) -> CanId {
        CanId::Std(id)
    }

    /// Pick a standard ID when `raw` fits in 11 bits, otherwise an extended one
    pub const fn from_raw(raw: u32) -> CanId {
        if raw <= MAX_STD_ID {
            CanId::Std(raw as u16)
        } else {
            CanId::Extended(raw & MAX_EXTENDED_ID)
        }
    }

    /// Get the numeric value of the identifier
    pub fn raw(&self) -> u32 {
        match self {
            CanId::Extended(id) => *id,
            CanId::Std(id) => *id as u32,
        }
    }

    /// Returns true for a 29-bit identifier
    pub fn is_extended(&self) -> bool {
        match self {
            CanId::Extended(_) => true,
            CanId::Std(_) => false,
        }
    }
}

/// One CAN frame, inbound from the bus or outbound to it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanMessage {
    /// Payload storage; only the first `dlc` bytes are meaningful
    pub data: [u8; MAX_DATA_LENGTH],
    /// Payload length
    pub dlc: u8,
    /// Frame identifier
    pub id: CanId,
    /// Remote transmission request flag
    pub rtr: bool,
    /// Receive timestamp supplied by the driver, in milliseconds
    pub timestamp: u32,
}

impl Default for CanMessage {
    fn default() -> Self {
        Self {
            data: [0; MAX_DATA_LENGTH],
            dlc: 0,
            id: CanId::Std(0),
            rtr: false,
            timestamp: 0,
        }
    }
}

impl CanMessage {
    /// Create a data frame
    ///
    /// Payloads longer than 8 bytes are truncated to 8.
    pub fn new(id: CanId, data: &[u8]) -> Self {
        let dlc = data.len().min(MAX_DATA_LENGTH);
        let mut buf = [0u8; MAX_DATA_LENGTH];
        buf[0..dlc].copy_from_slice(&data[0..dlc]);

        Self {
            id,
            dlc: dlc as u8,
            data: buf,
            ..Default::default()
        }
    }

    /// Attach a receive timestamp
    pub fn with_timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Get the identifier
    pub fn id(&self) -> CanId {
        self.id
    }

    /// Get the valid part of the payload
    pub fn data(&self) -> &[u8] {
        &self.data[0..(self.dlc as usize).min(MAX_DATA_LENGTH)]
    }

    /// Payload length, never more than 8
    pub fn len(&self) -> usize {
        (self.dlc as usize).min(MAX_DATA_LENGTH)
    }

    /// Returns true when the frame carries no payload
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
