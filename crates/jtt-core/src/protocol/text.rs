//! GB18030 transcoding for `STRING` fields.
//!
//! Terminals encode free text (plate numbers, auth codes, driver names) in
//! GB18030.  Decoding is lenient: malformed sequences become U+FFFD and the
//! string stops at the first NUL byte, since most fixed-size fields are NUL
//! padded on the right.  Fields padded on the left go through
//! [`Reader::read_string_trim_left_zeros`](crate::protocol::Reader::read_string_trim_left_zeros).

use encoding_rs::GB18030;

/// Encodes `text` as GB18030 bytes.
pub fn encode_gb18030(text: &str) -> Vec<u8> {
    let (bytes, _, _) = GB18030.encode(text);
    bytes.into_owned()
}

/// Decodes GB18030 bytes, stopping at the first NUL.
pub fn decode_gb18030(data: &[u8]) -> String {
    let end = data.iter().position(|b| *b == 0).unwrap_or(data.len());
    let (text, _) = GB18030.decode_without_bom_handling(&data[..end]);
    text.into_owned()
}

/// Returns the number of bytes `text` occupies once GB18030 encoded.
pub fn gb18030_len(text: &str) -> usize {
    if text.is_ascii() {
        return text.len();
    }
    encode_gb18030(text).len()
}
