//! Append-only encode buffer, the mirror of [`Reader`](crate::protocol::Reader).

use chrono::NaiveDateTime;

use crate::protocol::bcd::{string_to_bcd, to_bcd_time};
use crate::protocol::error::ProtocolError;
use crate::protocol::text::encode_gb18030;

/// Growable output buffer with JT/T 808 field primitives.
///
/// Methods return `&mut Self` so fields can be chained:
///
/// ```rust
/// use jtt_core::protocol::Writer;
///
/// let mut writer = Writer::new();
/// writer.write_u16(0x0200).write_u8(1);
/// assert_eq!(writer.as_bytes(), &[0x02, 0x00, 0x01]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Appends `data` unchanged.
    pub fn write_bytes(&mut self, data: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(data);
        self
    }

    /// Appends `data` into a field of exactly `size` bytes: longer input keeps
    /// its first `size` bytes, shorter input is zero-padded on the right.
    pub fn write_fixed(&mut self, data: &[u8], size: usize) -> &mut Self {
        let take = data.len().min(size);
        self.buf.extend_from_slice(&data[..take]);
        self.buf.resize(self.buf.len() + (size - take), 0);
        self
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn write_u16(&mut self, value: u16) -> &mut Self {
        self.write_bytes(&value.to_be_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.write_bytes(&value.to_be_bytes())
    }

    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.write_bytes(&value.to_be_bytes())
    }

    /// Packs `digits` as BCD into a field of `size` bytes.
    ///
    /// See [`string_to_bcd`] for alignment and truncation rules.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidBcd`] if `digits` is not purely numeric.
    pub fn write_bcd(&mut self, digits: &str, size: usize) -> Result<&mut Self, ProtocolError> {
        let packed = string_to_bcd(digits, Some(size))?;
        Ok(self.write_bytes(&packed))
    }

    /// Writes a 6-byte BCD timestamp; `None` writes six zero bytes.
    pub fn write_bcd_time(&mut self, time: Option<NaiveDateTime>) -> &mut Self {
        self.write_bytes(&to_bcd_time(time))
    }

    /// Writes `text` as GB18030 with no length prefix or padding.
    pub fn write_string(&mut self, text: &str) -> &mut Self {
        let encoded = encode_gb18030(text);
        self.write_bytes(&encoded)
    }

    /// Writes `text` as GB18030 into a field of exactly `size` bytes,
    /// truncating or zero-padding on the right.
    pub fn write_string_fixed(&mut self, text: &str, size: usize) -> &mut Self {
        let encoded = encode_gb18030(text);
        self.write_fixed(&encoded, size)
    }

    /// Writes `text` as GB18030 into `size` bytes, zero-padded on the left.
    /// Longer input keeps its first `size` bytes.
    pub fn write_string_left_padded(&mut self, text: &str, size: usize) -> &mut Self {
        let encoded = encode_gb18030(text);
        let take = encoded.len().min(size);
        self.buf.resize(self.buf.len() + (size - take), 0);
        self.write_bytes(&encoded[..take])
    }

    /// Writes `text` as GB18030 into `size` bytes, padded on the right with
    /// ASCII spaces.  Longer input keeps its first `size` bytes.
    pub fn write_string_space_padded(&mut self, text: &str, size: usize) -> &mut Self {
        let encoded = encode_gb18030(text);
        let take = encoded.len().min(size);
        self.buf.extend_from_slice(&encoded[..take]);
        self.buf.resize(self.buf.len() + (size - take), b' ');
        self
    }
}
