//! Binary-coded decimal helpers.
//!
//! Terminal phone numbers and timestamps travel as packed BCD: each byte
//! carries two decimal digits, high nibble first.
//!
//! Timestamps are 6 bytes `YYMMDDhhmmss` with the century fixed at 20xx.
//! Six zero bytes mean "no time" (for example, "no time condition" in a
//! query), which maps to `None` on the Rust side.

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::protocol::error::ProtocolError;

/// Size of a packed BCD timestamp in bytes.
pub const BCD_TIME_SIZE: usize = 6;

const BCD_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Packs a decimal digit string into BCD.
///
/// An odd number of digits is padded with a leading `0`.  With `size`, the
/// packed bytes are right-aligned in a field of exactly `size` bytes (zero
/// bytes on the left); if the digits need more than `size` bytes, only the
/// leftmost `size` bytes are kept.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidBcd`] if `digits` contains anything other
/// than ASCII `0`–`9`.
///
/// # Examples
///
/// ```rust
/// use jtt_core::protocol::bcd::string_to_bcd;
///
/// assert_eq!(string_to_bcd("123", None).unwrap(), vec![0x01, 0x23]);
/// assert_eq!(string_to_bcd("123", Some(4)).unwrap(), vec![0x00, 0x00, 0x01, 0x23]);
/// ```
pub fn string_to_bcd(digits: &str, size: Option<usize>) -> Result<Vec<u8>, ProtocolError> {
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProtocolError::InvalidBcd(digits.to_string()));
    }

    let raw = digits.as_bytes();
    let mut packed = Vec::with_capacity(raw.len().div_ceil(2));
    let rest = if raw.len() % 2 == 1 {
        packed.push(raw[0] - b'0');
        &raw[1..]
    } else {
        raw
    };
    for pair in rest.chunks_exact(2) {
        packed.push(((pair[0] - b'0') << 4) | (pair[1] - b'0'));
    }

    let Some(size) = size else {
        return Ok(packed);
    };

    if packed.len() >= size {
        packed.truncate(size);
        return Ok(packed);
    }
    let mut field = vec![0u8; size - packed.len()];
    field.extend_from_slice(&packed);
    Ok(field)
}

/// Unpacks BCD bytes into a digit string.
///
/// With `keep_padding == false` leading zero digits are dropped, which is
/// what identity fields want (`015321115156` → `15321115156`).  An all-zero
/// field renders as the empty string.  With `keep_padding == true` every
/// digit is rendered, which fields such as timestamps need.
///
/// Nibbles above 9 are rendered as the character `'0' + nibble`; terminals
/// occasionally pad with `0xF` and this keeps the byte visible instead of
/// failing the whole message.
pub fn bcd_to_string(data: &[u8], keep_padding: bool) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        out.push(char::from(b'0' + (byte >> 4)));
        out.push(char::from(b'0' + (byte & 0x0F)));
    }

    if keep_padding {
        return out;
    }
    match out.find(|c| c != '0') {
        Some(first) => out.split_off(first),
        None => String::new(),
    }
}

/// Encodes `time` as a 6-byte BCD timestamp.
///
/// `None`, and the Unix epoch itself, encode as six zero bytes.  Years
/// outside 2000–2099 keep only their last two digits.
pub fn to_bcd_time(time: Option<NaiveDateTime>) -> [u8; BCD_TIME_SIZE] {
    let mut out = [0u8; BCD_TIME_SIZE];
    let Some(time) = time.filter(|t| t.and_utc().timestamp() != 0) else {
        return out;
    };

    let fields = [
        time.year().rem_euclid(100) as u32,
        time.month(),
        time.day(),
        time.hour(),
        time.minute(),
        time.second(),
    ];
    for (slot, value) in out.iter_mut().zip(fields) {
        *slot = (((value / 10) as u8) << 4) | (value % 10) as u8;
    }
    out
}

/// Decodes a 6-byte BCD timestamp.  Six zero bytes decode as `None`.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidTime`] if `bcd` is not 6 bytes long or the
/// digits do not form a valid calendar time.
pub fn from_bcd_time(bcd: &[u8]) -> Result<Option<NaiveDateTime>, ProtocolError> {
    if bcd.len() != BCD_TIME_SIZE {
        return Err(ProtocolError::InvalidTime(format!(
            "expected {BCD_TIME_SIZE} bytes, got {}",
            bcd.len()
        )));
    }
    if bcd.iter().all(|b| *b == 0) {
        return Ok(None);
    }

    let digits = bcd_to_string(bcd, true);
    NaiveDateTime::parse_from_str(&format!("20{digits}"), BCD_TIME_FORMAT)
        .map(Some)
        .map_err(|e| ProtocolError::InvalidTime(format!("{digits}: {e}")))
}
