//! Packet codec: one message, header plus body, to and from a wire frame.
//!
//! Encoding order is fixed by the standard:
//!
//! 1. write the body length into the property word,
//! 2. serialize header ++ body,
//! 3. append the XOR checksum of those bytes,
//! 4. escape the whole thing and wrap it in boundary markers.
//!
//! Decoding reverses each step and fails on the first inconsistency, so a
//! bad frame is reported and dropped without touching anything else.

use serde::Serialize;

use crate::protocol::error::ProtocolError;
use crate::protocol::frame::{checksum, escape, unescape, BOUNDARY_MARK};
use crate::protocol::header::{MsgHeader, SegmentInfo, MAX_BODY_LENGTH};
use crate::protocol::sequence::SerialNumberSource;
use crate::protocol::writer::Writer;

/// A deframed, checksum-verified message with its raw body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Packet {
    pub header: MsgHeader,
    pub body: Vec<u8>,
}

/// Encodes `header` and `body` into a complete wire frame.
///
/// The body length in the property word is overwritten with `body.len()`;
/// the version-sign and segmentation bits follow
/// [`MsgHeader::wire_property`].
///
/// # Errors
///
/// - [`ProtocolError::BodyTooLong`] if `body` exceeds 1023 bytes.
/// - Any header encoding error (see [`MsgHeader::encode`]).
///
/// # Examples
///
/// ```rust
/// use jtt_core::protocol::{decode_packet, encode_packet, MsgHeader, MsgId};
///
/// let header = MsgHeader::new(MsgId::TERMINAL_HEARTBEAT, "13800138000", 1);
/// let frame = encode_packet(&header, &[]).unwrap();
/// assert_eq!(frame.first(), Some(&0x7E));
///
/// let packet = decode_packet(&frame).unwrap();
/// assert_eq!(packet.header.msg_id, MsgId::TERMINAL_HEARTBEAT);
/// assert!(packet.body.is_empty());
/// ```
pub fn encode_packet(header: &MsgHeader, body: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    if body.len() > MAX_BODY_LENGTH {
        return Err(ProtocolError::BodyTooLong(body.len()));
    }

    let mut header = header.clone();
    header.property.set_body_length(body.len() as u16);

    let mut writer = Writer::with_capacity(header.encoded_len() + body.len() + 1);
    header.encode_into(&mut writer)?;
    writer.write_bytes(body);
    let check = checksum(writer.as_bytes());
    writer.write_u8(check);

    Ok(escape(writer.as_bytes()))
}

/// Decodes one complete wire frame, boundary markers included.
///
/// # Errors
///
/// - [`ProtocolError::InvalidFrame`] if the frame is not delimited by
///   `0x7E` on both ends or carries no content.
/// - [`ProtocolError::ChecksumMismatch`] if the trailing byte is not the XOR
///   of the unescaped header and body.
/// - Any [`MsgHeader::decode`] error.
/// - [`ProtocolError::BodyLengthMismatch`] if the property word's body
///   length differs from the number of bytes after the header.
pub fn decode_packet(frame: &[u8]) -> Result<Packet, ProtocolError> {
    if frame.len() < 2 {
        return Err(ProtocolError::InvalidFrame(format!(
            "frame of {} bytes cannot hold two boundary markers",
            frame.len()
        )));
    }
    if frame[0] != BOUNDARY_MARK || frame[frame.len() - 1] != BOUNDARY_MARK {
        return Err(ProtocolError::InvalidFrame(
            "frame must start and end with 0x7E".to_string(),
        ));
    }

    let raw = unescape(frame);
    let Some((&expected, content)) = raw.split_last() else {
        return Err(ProtocolError::InvalidFrame("empty frame".to_string()));
    };
    let computed = checksum(content);
    if computed != expected {
        return Err(ProtocolError::ChecksumMismatch { expected, computed });
    }

    let (header, consumed) = MsgHeader::decode(content)?;
    let body = &content[consumed..];
    let declared = usize::from(header.property.body_length());
    if declared != body.len() {
        return Err(ProtocolError::BodyLengthMismatch {
            declared,
            actual: body.len(),
        });
    }

    Ok(Packet {
        header,
        body: body.to_vec(),
    })
}

/// Splits `body` into parts of at most `max_part_len` bytes and encodes
/// each part as its own frame.
///
/// Every frame gets a fresh serial number from `serials` and a
/// [`SegmentInfo`] with the part count and its 1-based index.  A body that
/// fits in one part (an empty body included) is emitted as one unsegmented
/// frame, still with a fresh serial number.  `max_part_len` is clamped to
/// `1..=1023`.
///
/// # Errors
///
/// - [`ProtocolError::BodyTooLong`] if the body needs more than 65535 parts.
/// - Any header encoding error.
pub fn encode_segmented(
    header: &MsgHeader,
    body: &[u8],
    max_part_len: usize,
    serials: &dyn SerialNumberSource,
) -> Result<Vec<Vec<u8>>, ProtocolError> {
    let part_len = max_part_len.clamp(1, MAX_BODY_LENGTH);

    if body.len() <= part_len {
        let mut single = header.clone();
        single.set_segment(None);
        single.serial_number = serials.next();
        return encode_packet(&single, body).map(|frame| vec![frame]);
    }

    let total = u16::try_from(body.len().div_ceil(part_len))
        .map_err(|_| ProtocolError::BodyTooLong(body.len()))?;

    body.chunks(part_len)
        .zip(1..=total)
        .map(|(chunk, index)| {
            let mut part = header.clone();
            part.set_segment(Some(SegmentInfo::new(total, index)));
            part.serial_number = serials.next();
            encode_packet(&part, chunk)
        })
        .collect()
}
