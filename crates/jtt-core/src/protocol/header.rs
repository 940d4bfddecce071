//! Message header codec.
//!
//! Wire layout:
//! ```text
//! 2011/2013: [msg_id:2][property:2][phone:BCD6][serial:2][total:2 index:2]?
//! 2019:      [msg_id:2][property:2][version:1][phone:BCD10][serial:2][total:2 index:2]?
//! ```
//!
//! The property word carries a version-sign bit that distinguishes the 2019
//! layout from the two older, wire-identical revisions.  The trailing
//! segmentation descriptor is present exactly when the property word's
//! segmentation bit is set.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bits::{get_bit, set_bit};
use crate::protocol::error::{FieldContext, ProtocolError};
use crate::protocol::reader::Reader;
use crate::protocol::writer::Writer;

/// Smallest possible header: the 2011/2013 layout without segmentation.
pub const MIN_HEADER_SIZE: usize = 12;

/// Largest body length the 10-bit property field can describe.
pub const MAX_BODY_LENGTH: usize = 0x03FF;

// ── Message id ────────────────────────────────────────────────────────────────

/// 16-bit message type code.
///
/// Displays as `0x%04X`, the way the standard documents message ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MsgId(pub u16);

impl MsgId {
    /// Terminal general response.
    pub const TERMINAL_GENERAL_RESPONSE: MsgId = MsgId(0x0001);
    /// Terminal heartbeat.
    pub const TERMINAL_HEARTBEAT: MsgId = MsgId(0x0002);
    /// Query server time request.
    pub const QUERY_SERVER_TIME: MsgId = MsgId(0x0004);
    /// Terminal registration.
    pub const TERMINAL_REGISTER: MsgId = MsgId(0x0100);
    /// Terminal authentication.
    pub const TERMINAL_AUTH: MsgId = MsgId(0x0102);
    /// Query terminal parameters response.
    pub const QUERY_PARAMS_RESPONSE: MsgId = MsgId(0x0104);
    /// Location report.
    pub const LOCATION_REPORT: MsgId = MsgId(0x0200);
    /// Batch location upload.
    pub const LOCATION_BATCH_UPLOAD: MsgId = MsgId(0x0704);
    /// Multimedia data upload.
    pub const MULTIMEDIA_UPLOAD: MsgId = MsgId(0x0801);
    /// Platform general response.
    pub const PLATFORM_GENERAL_RESPONSE: MsgId = MsgId(0x8001);
    /// Query server time response.
    pub const QUERY_SERVER_TIME_RESPONSE: MsgId = MsgId(0x8004);
    /// Terminal registration response.
    pub const TERMINAL_REGISTER_RESPONSE: MsgId = MsgId(0x8100);
    /// Set terminal parameters.
    pub const SET_PARAMS: MsgId = MsgId(0x8103);
    /// Query terminal parameters.
    pub const QUERY_PARAMS: MsgId = MsgId(0x8104);
    /// Text message push.
    pub const TEXT_MESSAGE: MsgId = MsgId(0x8300);
    /// Upload audio/video resource list (JT/T 1078).
    pub const AV_RESOURCE_LIST: MsgId = MsgId(0x1205);
    /// Query audio/video resource list (JT/T 1078).
    pub const QUERY_AV_RESOURCES: MsgId = MsgId(0x9205);
}

impl fmt::Display for MsgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

impl From<u16> for MsgId {
    fn from(value: u16) -> Self {
        MsgId(value)
    }
}

// ── Protocol revision ─────────────────────────────────────────────────────────

/// Protocol revision selecting the header layout.
///
/// 2011 and 2013 share one wire layout and cannot be told apart when
/// decoding; a decoded header reports [`ProtocolVersion::V2013`] for both.
/// The distinction matters only to callers encoding revision-specific bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    V2011,
    #[default]
    V2013,
    V2019,
}

impl ProtocolVersion {
    /// Revision implied by the property word's version-sign bit.
    pub fn from_version_sign(sign: bool) -> Self {
        if sign {
            ProtocolVersion::V2019
        } else {
            ProtocolVersion::V2013
        }
    }

    /// Version-sign bit this revision writes to the property word.
    pub fn version_sign(self) -> bool {
        matches!(self, ProtocolVersion::V2019)
    }

    /// Size in bytes of the BCD terminal phone number.
    pub fn phone_number_size(self) -> usize {
        match self {
            ProtocolVersion::V2011 | ProtocolVersion::V2013 => 6,
            ProtocolVersion::V2019 => 10,
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year = match self {
            ProtocolVersion::V2011 => "2011",
            ProtocolVersion::V2013 => "2013",
            ProtocolVersion::V2019 => "2019",
        };
        write!(f, "JT/T 808-{year}")
    }
}

// ── Property word ─────────────────────────────────────────────────────────────

/// The 16-bit message body property word.
///
/// | bits  | field                                   |
/// |-------|-----------------------------------------|
/// | 0–9   | body length (0–1023)                    |
/// | 10–12 | encryption type                         |
/// | 13    | segmentation flag                       |
/// | 14    | version sign (1 = 2019 layout)          |
/// | 15    | reserved                                |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Property(u16);

impl Property {
    pub const BODY_LENGTH_MASK: u16 = 0x03FF;
    pub const ENCRYPTION_MASK: u16 = 0x1C00;
    pub const ENCRYPTION_SHIFT: u32 = 10;
    pub const SEGMENTED_BIT: u32 = 13;
    pub const VERSION_SIGN_BIT: u32 = 14;
    pub const RESERVED_BIT: u32 = 15;

    /// No encryption.
    pub const ENCRYPTION_NONE: u8 = 0b000;
    /// RSA encrypted body.
    pub const ENCRYPTION_RSA: u8 = 0b001;

    pub const fn from_bits(bits: u16) -> Self {
        Property(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub fn body_length(self) -> u16 {
        self.0 & Self::BODY_LENGTH_MASK
    }

    /// Stores the low 10 bits of `length`.
    pub fn set_body_length(&mut self, length: u16) {
        self.0 = (self.0 & !Self::BODY_LENGTH_MASK) | (length & Self::BODY_LENGTH_MASK);
    }

    pub fn encryption(self) -> u8 {
        ((self.0 & Self::ENCRYPTION_MASK) >> Self::ENCRYPTION_SHIFT) as u8
    }

    /// Stores the low 3 bits of `kind`.
    pub fn set_encryption(&mut self, kind: u8) {
        let field = (u16::from(kind) << Self::ENCRYPTION_SHIFT) & Self::ENCRYPTION_MASK;
        self.0 = (self.0 & !Self::ENCRYPTION_MASK) | field;
    }

    pub fn is_segmented(self) -> bool {
        get_bit(self.0, Self::SEGMENTED_BIT)
    }

    pub fn set_segmented(&mut self, on: bool) {
        set_bit(&mut self.0, Self::SEGMENTED_BIT, on);
    }

    pub fn version_sign(self) -> bool {
        get_bit(self.0, Self::VERSION_SIGN_BIT)
    }

    pub fn set_version_sign(&mut self, on: bool) {
        set_bit(&mut self.0, Self::VERSION_SIGN_BIT, on);
    }

    pub fn reserved(self) -> bool {
        get_bit(self.0, Self::RESERVED_BIT)
    }

    pub fn set_reserved(&mut self, on: bool) {
        set_bit(&mut self.0, Self::RESERVED_BIT, on);
    }
}

// ── Segmentation descriptor ───────────────────────────────────────────────────

/// Position of one part within a segmented message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentInfo {
    /// Number of parts the message was split into.
    pub total: u16,
    /// 1-based position of this part.
    pub index: u16,
}

impl SegmentInfo {
    pub fn new(total: u16, index: u16) -> Self {
        Self { total, index }
    }

    /// `true` when `1 <= index <= total`.
    pub fn is_valid(&self) -> bool {
        self.index >= 1 && self.index <= self.total
    }
}

// ── Header ────────────────────────────────────────────────────────────────────

/// Decoded message header.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MsgHeader {
    pub msg_id: MsgId,
    pub property: Property,
    /// Revision selecting the wire layout.  Decoding sets it from the
    /// version-sign bit; callers set it before encoding.
    pub version: ProtocolVersion,
    /// Raw protocol version number byte, present on the wire only in the
    /// 2019 layout (incremented per revision of the standard, starting at 1).
    pub version_number: u8,
    /// Terminal phone number / identity as a decimal string.
    pub phone_number: String,
    pub serial_number: u16,
    pub segment: Option<SegmentInfo>,
}

impl MsgHeader {
    /// Creates an unsegmented 2013 header.
    pub fn new(msg_id: MsgId, phone_number: impl Into<String>, serial_number: u16) -> Self {
        Self {
            msg_id,
            phone_number: phone_number.into(),
            serial_number,
            ..Self::default()
        }
    }

    /// Selects the revision and keeps the version-sign bit in step with it.
    pub fn with_version(mut self, version: ProtocolVersion, version_number: u8) -> Self {
        self.version = version;
        self.version_number = version_number;
        self.property.set_version_sign(version.version_sign());
        self
    }

    /// Sets or clears the segmentation descriptor along with the segmentation bit.
    pub fn with_segment(mut self, segment: Option<SegmentInfo>) -> Self {
        self.set_segment(segment);
        self
    }

    pub fn set_segment(&mut self, segment: Option<SegmentInfo>) {
        self.segment = segment;
        self.property.set_segmented(segment.is_some());
    }

    pub fn is_segmented(&self) -> bool {
        self.segment.is_some()
    }

    /// Property word exactly as [`encode`](Self::encode) writes it: the
    /// version-sign bit follows [`version`](Self::version) and the
    /// segmentation bit follows [`segment`](Self::segment), whatever the
    /// caller left in [`property`](Self::property).
    pub fn wire_property(&self) -> Property {
        let mut property = self.property;
        property.set_version_sign(self.version.version_sign());
        property.set_segmented(self.segment.is_some());
        property
    }

    /// Number of bytes [`encode`](Self::encode) produces.
    pub fn encoded_len(&self) -> usize {
        let version_byte = usize::from(self.version == ProtocolVersion::V2019);
        let segment = if self.segment.is_some() { 4 } else { 0 };
        2 + 2 + version_byte + self.version.phone_number_size() + 2 + segment
    }

    /// Decodes a header from the start of `data`.
    ///
    /// Returns the header and the number of bytes it occupied; the message
    /// body starts right after.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::InvalidHeader`] if `data` is shorter than
    ///   [`MIN_HEADER_SIZE`].
    /// - [`ProtocolError::Field`] wrapping [`ProtocolError::UnexpectedEof`]
    ///   when the 2019 layout or the segmentation descriptor need more bytes
    ///   than `data` holds.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use jtt_core::protocol::{MsgHeader, MsgId};
    ///
    /// let header = MsgHeader::new(MsgId::TERMINAL_HEARTBEAT, "13800138000", 7);
    /// let bytes = header.encode().unwrap();
    /// let (decoded, consumed) = MsgHeader::decode(&bytes).unwrap();
    /// assert_eq!(decoded, header);
    /// assert_eq!(consumed, bytes.len());
    /// ```
    pub fn decode(data: &[u8]) -> Result<(Self, usize), ProtocolError> {
        if data.len() < MIN_HEADER_SIZE {
            return Err(ProtocolError::InvalidHeader {
                needed: MIN_HEADER_SIZE,
                available: data.len(),
            });
        }

        let mut reader = Reader::new(data);
        let msg_id = MsgId(reader.read_u16().field("msg_id")?);
        let property = Property::from_bits(reader.read_u16().field("property")?);
        let version = ProtocolVersion::from_version_sign(property.version_sign());

        let version_number = match version {
            ProtocolVersion::V2019 => reader.read_u8().field("version_number")?,
            ProtocolVersion::V2011 | ProtocolVersion::V2013 => 0,
        };
        let phone_number = reader
            .read_bcd(version.phone_number_size())
            .field("phone_number")?;
        let serial_number = reader.read_u16().field("serial_number")?;

        let segment = if property.is_segmented() {
            let total = reader.read_u16().field("segment_total")?;
            let index = reader.read_u16().field("segment_index")?;
            Some(SegmentInfo { total, index })
        } else {
            None
        };

        let header = Self {
            msg_id,
            property,
            version,
            version_number,
            phone_number,
            serial_number,
            segment,
        };
        Ok((header, reader.position()))
    }

    /// Encodes the header into a new buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Field`] if the phone number is not numeric or
    /// has more digits than the revision's identity field holds.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut writer = Writer::with_capacity(self.encoded_len());
        self.encode_into(&mut writer)?;
        Ok(writer.into_bytes())
    }

    /// Appends the encoded header to `writer`.
    ///
    /// # Errors
    ///
    /// See [`encode`](Self::encode).  Nothing is appended on failure.
    pub fn encode_into(&self, writer: &mut Writer) -> Result<(), ProtocolError> {
        let phone_size = self.version.phone_number_size();
        if self.phone_number.len() > phone_size * 2 {
            return Err(ProtocolError::FieldTooLong {
                field: "phone_number",
                len: self.phone_number.len(),
                limit: phone_size * 2,
            });
        }
        // Validate before writing anything so a failure leaves `writer` untouched.
        let phone = crate::protocol::bcd::string_to_bcd(&self.phone_number, Some(phone_size))
            .field("phone_number")?;

        writer
            .write_u16(self.msg_id.0)
            .write_u16(self.wire_property().bits());
        match self.version {
            ProtocolVersion::V2019 => {
                writer.write_u8(self.version_number);
            }
            ProtocolVersion::V2011 | ProtocolVersion::V2013 => {}
        }
        writer.write_bytes(&phone).write_u16(self.serial_number);
        if let Some(segment) = self.segment {
            writer.write_u16(segment.total).write_u16(segment.index);
        }
        Ok(())
    }
}
