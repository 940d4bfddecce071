//! Frame inspection: hex text in, decoded report out.
//!
//! Each input line holds one complete frame, boundary markers included, as
//! hex digits (whitespace and a leading `0x` are ignored).  Segmented parts
//! are collected in a [`SegmentCache`]; the report for the part that
//! completes a message carries the joined body.

use jtt_core::{
    decode_packet, BodyRegistry, MsgHeader, ProtocolError, SegmentCache, SegmentCacheConfig,
    SegmentError,
};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::OutputFormat;

/// Why a line could not be inspected at all.
#[derive(Debug, Error)]
pub enum InspectError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("malformed frame: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("bad segment descriptor: {0}")]
    Segment(#[from] SegmentError),
}

/// What became of the body of an inspected frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FrameStatus {
    /// The body decoded with a registered codec.
    Decoded { body: String },
    /// A segmented part was stored; the message is not complete yet.
    Pending,
    /// No codec is registered for the message id.
    Unregistered,
    /// A registered codec rejected the body.
    BodyError { reason: String },
}

/// Report for one input frame.
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub header: MsgHeader,
    /// Raw body of this frame, hex encoded.
    pub body_hex: String,
    /// Number of parts joined into the decoded body; 0 for unsegmented frames
    /// and pending parts.
    pub reassembled_parts: u16,
    #[serde(flatten)]
    pub status: FrameStatus,
}

impl Inspection {
    /// Formats the report in `format`.
    ///
    /// # Errors
    ///
    /// Returns the serializer's error if JSON output fails.
    pub fn render(&self, format: OutputFormat) -> Result<String, serde_json::Error> {
        match format {
            OutputFormat::Json => serde_json::to_string(self),
            OutputFormat::Text => Ok(self.render_text()),
        }
    }

    fn render_text(&self) -> String {
        let h = &self.header;
        let mut line = format!(
            "{} phone={} serial={} {} body={}B",
            h.msg_id,
            h.phone_number,
            h.serial_number,
            h.version,
            h.property.body_length()
        );
        if let Some(segment) = h.segment {
            line.push_str(&format!(" part={}/{}", segment.index, segment.total));
        }
        let status = match &self.status {
            FrameStatus::Decoded { body } if self.reassembled_parts > 0 => {
                format!("reassembled({} parts) {body}", self.reassembled_parts)
            }
            FrameStatus::Decoded { body } => body.clone(),
            FrameStatus::Pending => "pending".to_string(),
            FrameStatus::Unregistered => format!("unregistered [{}]", self.body_hex),
            FrameStatus::BodyError { reason } => format!("body error: {reason}"),
        };
        format!("{line} | {status}")
    }
}

/// Decodes frames and reassembles segmented messages across calls.
#[derive(Debug)]
pub struct FrameInspector {
    registry: BodyRegistry,
    cache: SegmentCache,
}

impl FrameInspector {
    /// Creates an inspector with every built-in body registered.
    pub fn new(segment: SegmentCacheConfig) -> Self {
        Self::with_registry(BodyRegistry::with_defaults(), segment)
    }

    pub fn with_registry(registry: BodyRegistry, segment: SegmentCacheConfig) -> Self {
        Self {
            registry,
            cache: SegmentCache::new(segment),
        }
    }

    /// Inspects one line of hex text.  Blank lines yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// - [`InspectError::Hex`] if the line is not valid hex.
    /// - [`InspectError::Protocol`] if the frame fails to decode.
    /// - [`InspectError::Segment`] if a segmentation descriptor is invalid.
    ///
    /// A body that its codec rejects is not an error; it is reported as
    /// [`FrameStatus::BodyError`].
    pub fn inspect_line(&self, line: &str) -> Result<Option<Inspection>, InspectError> {
        let digits: String = line.split_whitespace().collect();
        let digits = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
            .unwrap_or(&digits);
        if digits.is_empty() {
            return Ok(None);
        }
        let frame = hex::decode(digits)?;
        self.inspect_frame(&frame).map(Some)
    }

    /// Inspects one raw frame.
    ///
    /// # Errors
    ///
    /// See [`inspect_line`](Self::inspect_line).
    pub fn inspect_frame(&self, frame: &[u8]) -> Result<Inspection, InspectError> {
        let packet = decode_packet(frame)?;
        let body_hex = hex::encode(&packet.body);

        let (body, reassembled_parts) = match packet.header.segment {
            None => (packet.body, 0),
            Some(info) => match self.cache.cache(&packet.header, &packet.body)? {
                Some(joined) => (joined, info.total),
                None => {
                    debug!(msg_id = %packet.header.msg_id, index = info.index, total = info.total, "part stored");
                    return Ok(Inspection {
                        header: packet.header,
                        body_hex,
                        reassembled_parts: 0,
                        status: FrameStatus::Pending,
                    });
                }
            },
        };

        let status = match self.registry.decode_body(&packet.header, &body) {
            Ok(decoded) => FrameStatus::Decoded {
                body: format!("{decoded:?}"),
            },
            Err(ProtocolError::UnregisteredMessage(_)) => FrameStatus::Unregistered,
            Err(e) => FrameStatus::BodyError {
                reason: e.to_string(),
            },
        };

        Ok(Inspection {
            header: packet.header,
            body_hex,
            reassembled_parts,
            status,
        })
    }

    /// Number of messages still waiting for parts.
    pub fn pending(&self) -> usize {
        self.cache.len()
    }

    /// Drops reassemblies whose time-to-live has passed.
    pub fn purge_expired(&self) -> usize {
        self.cache.purge_expired()
    }
}
