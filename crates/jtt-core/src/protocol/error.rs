//! Error type shared by the byte cursor, frame, header and packet codecs.

use thiserror::Error;

use crate::protocol::header::MsgId;

/// Errors that can occur while decoding or encoding a JT/T 808 message.
///
/// Every variant describes malformed input for the message at hand.  None of
/// them are retryable: the caller logs the error and drops the frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A fixed or declared-length read ran past the end of the input.
    #[error("unexpected end of input at offset {offset}: need {needed} bytes, {available} available")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// The input is shorter than the smallest possible message header.
    #[error("invalid message header: need at least {needed} bytes, got {available}")]
    InvalidHeader { needed: usize, available: usize },

    /// The physical frame is not delimited by boundary markers or is empty.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// The trailing checksum byte does not match the XOR of the content.
    #[error("checksum mismatch: frame carries 0x{expected:02X}, computed 0x{computed:02X}")]
    ChecksumMismatch { expected: u8, computed: u8 },

    /// A body does not fit in the 10-bit length field of the property word.
    #[error("message body too long: {0} bytes (limit 1023)")]
    BodyTooLong(usize),

    /// The property word declares a body length that the frame does not carry.
    #[error("body length mismatch: property declares {declared} bytes, frame carries {actual}")]
    BodyLengthMismatch { declared: usize, actual: usize },

    /// A string destined for a BCD field contains non-digit characters.
    #[error("invalid BCD digits: {0:?}")]
    InvalidBcd(String),

    /// A BCD timestamp does not describe a valid calendar time.
    #[error("invalid BCD time: {0}")]
    InvalidTime(String),

    /// A value does not fit the fixed-size field it is being written into.
    #[error("field {field} too long: {len} bytes, limit {limit}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        limit: usize,
    },

    /// No body codec is registered for the message id.
    #[error("message {0} not registered")]
    UnregisteredMessage(MsgId),

    /// The body decoded but its content is not acceptable for the message id.
    #[error("invalid body for {msg_id}: {reason}")]
    InvalidBody { msg_id: MsgId, reason: String },

    /// A cursor failure annotated with the field that was being read.
    #[error("reading {field}: {source}")]
    Field {
        field: &'static str,
        #[source]
        source: Box<ProtocolError>,
    },
}

impl ProtocolError {
    /// Wraps `self` with the name of the field being processed.
    pub fn in_field(self, field: &'static str) -> Self {
        ProtocolError::Field {
            field,
            source: Box::new(self),
        }
    }

    /// Strips any [`ProtocolError::Field`] wrappers and returns the root cause.
    pub fn root_cause(&self) -> &ProtocolError {
        match self {
            ProtocolError::Field { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Extension to annotate a `Result` with the field being read.
pub(crate) trait FieldContext<T> {
    fn field(self, field: &'static str) -> Result<T, ProtocolError>;
}

impl<T> FieldContext<T> for Result<T, ProtocolError> {
    fn field(self, field: &'static str) -> Result<T, ProtocolError> {
        self.map_err(|e| e.in_field(field))
    }
}
