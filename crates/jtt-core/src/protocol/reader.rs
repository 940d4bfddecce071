//! Forward-only decode cursor over a byte slice.
//!
//! Every multi-byte integer is big-endian, matching the JT/T 808 `WORD`,
//! `DWORD` and `BYTE[8]` types.  A read that needs more bytes than remain
//! fails with [`ProtocolError::UnexpectedEof`] and does not advance the
//! cursor.

use chrono::NaiveDateTime;

use crate::protocol::bcd::{bcd_to_string, from_bcd_time, BCD_TIME_SIZE};
use crate::protocol::error::ProtocolError;
use crate::protocol::text::decode_gb18030;

/// Sequential reader over a borrowed byte slice.
///
/// # Examples
///
/// ```rust
/// use jtt_core::protocol::Reader;
///
/// let mut reader = Reader::new(&[0x02, 0x00, 0x01]);
/// assert_eq!(reader.read_u16().unwrap(), 0x0200);
/// assert_eq!(reader.read_u8().unwrap(), 0x01);
/// assert!(reader.read_u8().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Number of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Reads exactly `n` raw bytes (`BYTE[n]`).
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if n > self.remaining() {
            return Err(ProtocolError::UnexpectedEof {
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Consumes and returns everything that is left.
    pub fn read_remaining(&mut self) -> &'a [u8] {
        let out = &self.data[self.pos..];
        self.pos = self.data.len();
        out
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// `BYTE`
    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.read_array::<1>()?[0])
    }

    /// `WORD`
    pub fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        self.read_array().map(u16::from_be_bytes)
    }

    /// `DWORD`
    pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        self.read_array().map(u32::from_be_bytes)
    }

    /// `BYTE[8]` interpreted as a big-endian integer.
    pub fn read_u64(&mut self) -> Result<u64, ProtocolError> {
        self.read_array().map(u64::from_be_bytes)
    }

    /// Reads an `n`-byte BCD field with leading zero digits trimmed.
    pub fn read_bcd(&mut self, n: usize) -> Result<String, ProtocolError> {
        self.read_bytes(n).map(|b| bcd_to_string(b, false))
    }

    /// Reads an `n`-byte BCD field keeping every digit, leading zeros included.
    pub fn read_bcd_padded(&mut self, n: usize) -> Result<String, ProtocolError> {
        self.read_bytes(n).map(|b| bcd_to_string(b, true))
    }

    /// Reads a 6-byte `YYMMDDhhmmss` BCD timestamp.  All-zero means `None`.
    pub fn read_bcd_time(&mut self) -> Result<Option<NaiveDateTime>, ProtocolError> {
        let raw = self.read_bytes(BCD_TIME_SIZE)?;
        from_bcd_time(raw)
    }

    /// Reads an `n`-byte GB18030 `STRING`, stopping at the first NUL.
    pub fn read_string(&mut self, n: usize) -> Result<String, ProtocolError> {
        self.read_bytes(n).map(decode_gb18030)
    }

    /// Reads an `n`-byte GB18030 `STRING` that is zero-padded on the left.
    pub fn read_string_trim_left_zeros(&mut self, n: usize) -> Result<String, ProtocolError> {
        self.read_bytes(n).map(|raw| {
            let start = raw.iter().position(|b| *b != 0).unwrap_or(raw.len());
            decode_gb18030(&raw[start..])
        })
    }

    /// Reads an `n`-byte GB18030 `STRING` padded on the right with spaces
    /// (or NULs).
    pub fn read_string_trim_right_spaces(&mut self, n: usize) -> Result<String, ProtocolError> {
        self.read_bytes(n)
            .map(|raw| decode_gb18030(raw).trim_end_matches(' ').to_string())
    }

    /// Reads the rest of the input as a GB18030 `STRING`.
    pub fn read_string_remaining(&mut self) -> String {
        decode_gb18030(self.read_remaining())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_big_endian_integers_in_sequence() {
        // Arrange
        let data = [
            0xAB, // u8
            0x12, 0x34, // u16
            0xDE, 0xAD, 0xBE, 0xEF, // u32
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, // u64
        ];
        let mut reader = Reader::new(&data);

        // Act / Assert
        assert_eq!(reader.read_u8().unwrap(), 0xAB);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(reader.read_u64().unwrap(), 0x0102_0304_0506_0708);
        assert!(reader.is_empty());
        assert_eq!(reader.position(), data.len());
    }

    #[test]
    fn test_short_read_reports_offset_and_does_not_advance() {
        let mut reader = Reader::new(&[0x01, 0x02, 0x03]);
        reader.read_u16().unwrap();

        let err = reader.read_u32().unwrap_err();

        assert_eq!(
            err,
            ProtocolError::UnexpectedEof {
                offset: 2,
                needed: 4,
                available: 1
            }
        );
        assert_eq!(reader.remaining(), 1, "failed read must not consume input");
        assert_eq!(reader.read_u8().unwrap(), 0x03);
    }

    #[test]
    fn test_read_bcd_trims_and_padded_keeps_zeros() {
        let data = [0x00, 0x01, 0x38, 0x00, 0x13, 0x80, 0x08, 0x11];
        let mut reader = Reader::new(&data);

        assert_eq!(reader.read_bcd(6).unwrap(), "13800138");
        assert_eq!(reader.read_bcd_padded(2).unwrap(), "0811");
    }

    #[test]
    fn test_read_bcd_time() {
        let mut reader = Reader::new(&[0x24, 0x05, 0x17, 0x08, 0x30, 0x00, 0, 0, 0, 0, 0, 0]);

        let first = reader.read_bcd_time().unwrap().expect("time present");
        let second = reader.read_bcd_time().unwrap();

        assert_eq!(first.to_string(), "2024-05-17 08:30:00");
        assert_eq!(second, None);
    }

    #[test]
    fn test_read_string_fixed_and_remaining() {
        let mut data = b"ABC\0\0".to_vec();
        data.extend_from_slice(&[0xD4, 0xC1, b'B', b'1']);
        let mut reader = Reader::new(&data);

        assert_eq!(reader.read_string(5).unwrap(), "ABC");
        assert_eq!(reader.read_string_remaining(), "粤B1");
        assert!(reader.is_empty());
    }

    #[test]
    fn test_read_bytes_zero_length_on_empty_input() {
        let mut reader = Reader::new(&[]);
        assert_eq!(reader.read_bytes(0).unwrap(), &[] as &[u8]);
        assert!(reader.read_string(1).is_err());
        assert_eq!(reader.read_remaining(), &[] as &[u8]);
    }

    #[test]
    fn test_read_string_padding_variants() {
        // Arrange
        let data = b"\0\0\0M01M01   AB\0";
        let mut reader = Reader::new(data);

        // Act
        let left = reader.read_string_trim_left_zeros(6).unwrap();
        let spaced = reader.read_string_trim_right_spaces(6).unwrap();
        let nul = reader.read_string_trim_right_spaces(3).unwrap();

        // Assert
        assert_eq!(left, "M01");
        assert_eq!(spaced, "M01");
        assert_eq!(nul, "AB");
        assert!(reader.is_empty());
        assert!(reader.read_string_trim_left_zeros(1).is_err());
    }
}
