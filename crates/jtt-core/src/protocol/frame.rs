//! Physical link encoding of one message.
//!
//! ```text
//! 0x7E | escaped(header ++ body ++ checksum) | 0x7E
//! ```
//!
//! Inside the escaped region `0x7E` becomes `0x7D 0x02` and `0x7D` becomes
//! `0x7D 0x01`.  The checksum is the XOR of the unescaped header and body;
//! it is appended before escaping.  Ordering those steps is the caller's job
//! (see [`crate::protocol::packet`]); this module only offers the primitives.
//!
//! # What is byte stuffing? (for beginners)
//!
//! A TCP stream or serial line is just a river of bytes with no built-in
//! message boundaries.  JT/T 808 marks where one message starts and ends by
//! putting `0x7E` on both sides.  That only works if `0x7E` never shows up
//! *inside* a message, yet a body is arbitrary binary data and can contain
//! any byte value.
//!
//! Byte stuffing solves this by rewriting the forbidden byte as a two-byte
//! sequence that starts with a reserved escape byte, `0x7D`.  Because `0x7D`
//! itself now has a special meaning, a literal `0x7D` in the data must be
//! rewritten too.  A receiver that scans for `0x7E` therefore only ever finds
//! real boundaries, and reverses the two substitutions to recover the data.
//!
//! Each special byte costs one extra byte on the wire.  The encoder counts
//! them first and allocates once.

/// Frame delimiter.
pub const BOUNDARY_MARK: u8 = 0x7E;
/// Escape lead byte.
pub const ESCAPE_MARK: u8 = 0x7D;

const ESCAPED_ESCAPE: u8 = 0x01;
const ESCAPED_BOUNDARY: u8 = 0x02;

/// Escapes `body` and wraps it in boundary markers.
///
/// # Examples
///
/// ```rust
/// use jtt_core::protocol::frame::escape;
///
/// assert_eq!(escape(&[0x30, 0x7E, 0x08, 0x7D, 0x55]),
///            vec![0x7E, 0x30, 0x7D, 0x02, 0x08, 0x7D, 0x01, 0x55, 0x7E]);
/// ```
pub fn escape(body: &[u8]) -> Vec<u8> {
    let specials = body
        .iter()
        .filter(|b| matches!(**b, BOUNDARY_MARK | ESCAPE_MARK))
        .count();
    let mut frame = Vec::with_capacity(body.len() + specials + 2);

    frame.push(BOUNDARY_MARK);
    for &byte in body {
        match byte {
            BOUNDARY_MARK => frame.extend_from_slice(&[ESCAPE_MARK, ESCAPED_BOUNDARY]),
            ESCAPE_MARK => frame.extend_from_slice(&[ESCAPE_MARK, ESCAPED_ESCAPE]),
            other => frame.push(other),
        }
    }
    frame.push(BOUNDARY_MARK);
    frame
}

/// Strips the boundary markers from `frame` and reverses the escaping.
///
/// The first and last bytes are assumed to be boundary markers and are
/// dropped without inspection.  Only the bytes strictly between them are
/// scanned, so an escape lead byte directly before the trailing marker, or
/// one followed by an unknown byte, passes through unchanged.
///
/// Frames shorter than two bytes unescape to an empty body.
pub fn unescape(frame: &[u8]) -> Vec<u8> {
    if frame.len() < 2 {
        return Vec::new();
    }
    let inner = &frame[1..frame.len() - 1];
    let mut body = Vec::with_capacity(inner.len());

    let mut i = 0;
    while i < inner.len() {
        let byte = inner[i];
        if byte == ESCAPE_MARK && i + 1 < inner.len() {
            match inner[i + 1] {
                ESCAPED_BOUNDARY => {
                    body.push(BOUNDARY_MARK);
                    i += 2;
                    continue;
                }
                ESCAPED_ESCAPE => {
                    body.push(ESCAPE_MARK);
                    i += 2;
                    continue;
                }
                _ => {}
            }
        }
        body.push(byte);
        i += 1;
    }
    body
}

/// XOR of every byte in `bytes`.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}
