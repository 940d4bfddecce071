//! Terminal registration (0x0100), its response (0x8100) and terminal
//! authentication (0x0102).
//!
//! Registration and authentication changed layout between revisions, so
//! their bodies carry the [`ProtocolVersion`] they were built for.

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::message::MessageBody;
use crate::protocol::error::{FieldContext, ProtocolError};
use crate::protocol::header::{MsgId, ProtocolVersion};
use crate::protocol::reader::Reader;
use crate::protocol::text::gb18030_len;
use crate::protocol::writer::Writer;

fn check_len(field: &'static str, text: &str, limit: usize) -> Result<(), ProtocolError> {
    let len = gb18030_len(text);
    if len > limit {
        return Err(ProtocolError::FieldTooLong { field, len, limit });
    }
    Ok(())
}

// ── 0x0100 ────────────────────────────────────────────────────────────────────

/// Fixed field widths of the registration body for one revision:
/// manufacturer id, terminal model, terminal id.
fn register_field_sizes(version: ProtocolVersion) -> (usize, usize, usize) {
    match version {
        ProtocolVersion::V2011 => (5, 8, 7),
        ProtocolVersion::V2013 => (5, 20, 7),
        ProtocolVersion::V2019 => (11, 30, 30),
    }
}

/// Terminal registration (0x0100).
///
/// ```text
/// [province:2][city:2][manufacturer:M][model:N][terminal_id:T][plate_color:1][plate:rest]
/// ```
/// with `(M, N, T)` = (5, 8, 7) in 2011, (5, 20, 7) in 2013 and
/// (11, 30, 30) in 2019.  Text fields are GB18030, NUL padded on the right,
/// except the terminal model: 2011 pads it with spaces on the right and
/// 2019 with NULs on the left.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalRegister {
    pub province_id: u16,
    pub city_id: u16,
    pub manufacturer_id: String,
    pub terminal_model: String,
    pub terminal_id: String,
    /// Plate colour per JT/T 415; 0 when the vehicle is not yet plated.
    pub plate_color: u8,
    /// Plate number, or the VIN when `plate_color` is 0.
    pub plate_number: String,
    #[serde(skip)]
    pub version: ProtocolVersion,
}

impl TerminalRegister {
    pub fn for_version(version: ProtocolVersion) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }
}

impl MessageBody for TerminalRegister {
    fn msg_id(&self) -> MsgId {
        MsgId::TERMINAL_REGISTER
    }

    fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let (manufacturer, model, terminal) = register_field_sizes(self.version);
        check_len("manufacturer_id", &self.manufacturer_id, manufacturer)?;
        check_len("terminal_model", &self.terminal_model, model)?;
        check_len("terminal_id", &self.terminal_id, terminal)?;

        let mut writer = Writer::new();
        writer
            .write_u16(self.province_id)
            .write_u16(self.city_id)
            .write_string_fixed(&self.manufacturer_id, manufacturer);
        match self.version {
            ProtocolVersion::V2011 => writer.write_string_space_padded(&self.terminal_model, model),
            ProtocolVersion::V2013 => writer.write_string_fixed(&self.terminal_model, model),
            ProtocolVersion::V2019 => writer.write_string_left_padded(&self.terminal_model, model),
        };
        writer
            .write_string_fixed(&self.terminal_id, terminal)
            .write_u8(self.plate_color)
            .write_string(&self.plate_number);
        Ok(writer.into_bytes())
    }

    fn decode(&mut self, data: &[u8]) -> Result<usize, ProtocolError> {
        let (manufacturer, model, terminal) = register_field_sizes(self.version);
        let mut reader = Reader::new(data);
        self.province_id = reader.read_u16().field("province_id")?;
        self.city_id = reader.read_u16().field("city_id")?;
        self.manufacturer_id = reader.read_string(manufacturer).field("manufacturer_id")?;
        self.terminal_model = match self.version {
            ProtocolVersion::V2011 => reader.read_string_trim_right_spaces(model),
            ProtocolVersion::V2013 => reader.read_string(model),
            ProtocolVersion::V2019 => reader.read_string_trim_left_zeros(model),
        }
        .field("terminal_model")?;
        self.terminal_id = reader.read_string(terminal).field("terminal_id")?;
        self.plate_color = reader.read_u8().field("plate_color")?;
        self.plate_number = reader.read_string_remaining();
        Ok(reader.position())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ── 0x8100 ────────────────────────────────────────────────────────────────────

/// Registration outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum RegisterResult {
    #[default]
    Success = 0,
    VehicleRegistered = 1,
    VehicleNotFound = 2,
    TerminalRegistered = 3,
    TerminalNotFound = 4,
}

impl TryFrom<u8> for RegisterResult {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RegisterResult::Success),
            1 => Ok(RegisterResult::VehicleRegistered),
            2 => Ok(RegisterResult::VehicleNotFound),
            3 => Ok(RegisterResult::TerminalRegistered),
            4 => Ok(RegisterResult::TerminalNotFound),
            other => Err(other),
        }
    }
}

/// Terminal registration response (0x8100).
///
/// The auth code is on the wire only when `result` is
/// [`RegisterResult::Success`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub reply_serial: u16,
    pub result: RegisterResult,
    pub auth_code: String,
}

impl MessageBody for RegisterResponse {
    fn msg_id(&self) -> MsgId {
        MsgId::TERMINAL_REGISTER_RESPONSE
    }

    fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut writer = Writer::new();
        writer.write_u16(self.reply_serial).write_u8(self.result as u8);
        if self.result == RegisterResult::Success {
            writer.write_string(&self.auth_code);
        }
        Ok(writer.into_bytes())
    }

    fn decode(&mut self, data: &[u8]) -> Result<usize, ProtocolError> {
        let mut reader = Reader::new(data);
        self.reply_serial = reader.read_u16().field("reply_serial")?;
        let raw = reader.read_u8().field("result")?;
        let msg_id = self.msg_id();
        self.result = RegisterResult::try_from(raw).map_err(|raw| ProtocolError::InvalidBody {
            msg_id,
            reason: format!("unknown registration result {raw}"),
        })?;
        self.auth_code = if self.result == RegisterResult::Success {
            reader.read_string_remaining()
        } else {
            String::new()
        };
        Ok(reader.position())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ── 0x0102 ────────────────────────────────────────────────────────────────────

const IMEI_SIZE: usize = 15;
const SOFTWARE_VERSION_SIZE: usize = 20;

/// Terminal authentication (0x0102).
///
/// 2011/2013 carry only the auth code as the whole body.  2019 prefixes the
/// auth code with its length and appends a 15-byte IMEI and a 20-byte
/// software version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalAuth {
    pub auth_code: String,
    /// 2019 only.
    pub imei: String,
    /// 2019 only.
    pub software_version: String,
    #[serde(skip)]
    pub version: ProtocolVersion,
}

impl TerminalAuth {
    pub fn for_version(version: ProtocolVersion) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }
}

impl MessageBody for TerminalAuth {
    fn msg_id(&self) -> MsgId {
        MsgId::TERMINAL_AUTH
    }

    fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut writer = Writer::new();
        match self.version {
            ProtocolVersion::V2019 => {
                let len = gb18030_len(&self.auth_code);
                let prefix = u8::try_from(len).map_err(|_| ProtocolError::FieldTooLong {
                    field: "auth_code",
                    len,
                    limit: usize::from(u8::MAX),
                })?;
                writer
                    .write_u8(prefix)
                    .write_string(&self.auth_code)
                    .write_string_fixed(&self.imei, IMEI_SIZE)
                    .write_string_fixed(&self.software_version, SOFTWARE_VERSION_SIZE);
            }
            ProtocolVersion::V2011 | ProtocolVersion::V2013 => {
                writer.write_string(&self.auth_code);
            }
        }
        Ok(writer.into_bytes())
    }

    fn decode(&mut self, data: &[u8]) -> Result<usize, ProtocolError> {
        let mut reader = Reader::new(data);
        match self.version {
            ProtocolVersion::V2019 => {
                let len = reader.read_u8().field("auth_code_len")?;
                self.auth_code = reader.read_string(usize::from(len)).field("auth_code")?;
                self.imei = reader.read_string(IMEI_SIZE).field("imei")?;
                self.software_version = reader
                    .read_string(SOFTWARE_VERSION_SIZE)
                    .field("software_version")?;
            }
            ProtocolVersion::V2011 | ProtocolVersion::V2013 => {
                self.auth_code = reader.read_string_remaining();
            }
        }
        Ok(reader.position())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_register(version: ProtocolVersion) -> TerminalRegister {
        TerminalRegister {
            province_id: 44,
            city_id: 300,
            manufacturer_id: "MF001".to_string(),
            terminal_model: "TM-8".to_string(),
            terminal_id: "T000001".to_string(),
            plate_color: 1,
            plate_number: "粤B12345".to_string(),
            version,
        }
    }

    #[test]
    fn test_register_body_size_per_revision() {
        for (version, fixed) in [
            (ProtocolVersion::V2011, 2 + 2 + 5 + 8 + 7 + 1),
            (ProtocolVersion::V2013, 2 + 2 + 5 + 20 + 7 + 1),
            (ProtocolVersion::V2019, 2 + 2 + 11 + 30 + 30 + 1),
        ] {
            let bytes = sample_register(version).encode().unwrap();
            assert_eq!(bytes.len(), fixed + 8, "{version}");
        }
    }

    #[test]
    fn test_register_round_trip_2013() {
        // Arrange
        let register = sample_register(ProtocolVersion::V2013);
        let bytes = register.encode().unwrap();

        // Act
        let mut decoded = TerminalRegister::for_version(ProtocolVersion::V2013);
        let consumed = decoded.decode(&bytes).unwrap();

        // Assert
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, register);
    }

    #[test]
    fn test_register_2019_model_is_zero_padded_on_the_left() {
        // Arrange – wire bytes as a 2019 terminal sends them
        let mut data = vec![0x00, 0x2C, 0x01, 0x2C];
        data.extend_from_slice(b"MANUFACT-01");
        data.extend_from_slice(&[0u8; 27]);
        data.extend_from_slice(b"M01");
        data.extend_from_slice(b"TERMINAL-ID-000000000000000000");
        data.push(0x02);
        data.extend_from_slice(b"VIN0001");

        // Act
        let mut decoded = TerminalRegister::for_version(ProtocolVersion::V2019);
        let consumed = decoded.decode(&data).unwrap();

        // Assert
        assert_eq!(consumed, data.len());
        assert_eq!(decoded.manufacturer_id, "MANUFACT-01");
        assert_eq!(decoded.terminal_model, "M01");
        assert_eq!(decoded.terminal_id, "TERMINAL-ID-000000000000000000");
        assert_eq!(decoded.plate_color, 2);
        assert_eq!(decoded.plate_number, "VIN0001");
        assert_eq!(decoded.encode().unwrap(), data);
    }

    #[test]
    fn test_register_2011_model_is_space_padded() {
        // Arrange
        let mut data = vec![0x00, 0x2C, 0x01, 0x2C];
        data.extend_from_slice(b"MF001");
        data.extend_from_slice(b"TM-8    ");
        data.extend_from_slice(b"T000001");
        data.push(0x01);

        // Act
        let mut decoded = TerminalRegister::for_version(ProtocolVersion::V2011);
        decoded.decode(&data).unwrap();

        // Assert
        assert_eq!(decoded.terminal_model, "TM-8");
        assert_eq!(decoded.encode().unwrap(), data);
    }

    #[test]
    fn test_register_rejects_oversized_field() {
        let mut register = sample_register(ProtocolVersion::V2011);
        register.terminal_model = "MODEL-TOO-LONG".to_string();

        let err = register.encode().unwrap_err();

        assert_eq!(
            err,
            ProtocolError::FieldTooLong {
                field: "terminal_model",
                len: 14,
                limit: 8
            }
        );
    }

    #[test]
    fn test_register_response_auth_code_only_on_success() {
        let ok = RegisterResponse {
            reply_serial: 3,
            result: RegisterResult::Success,
            auth_code: "secret".to_string(),
        };
        let refused = RegisterResponse {
            result: RegisterResult::TerminalRegistered,
            ..ok.clone()
        };

        assert_eq!(ok.encode().unwrap(), b"\x00\x03\x00secret".to_vec());
        assert_eq!(refused.encode().unwrap(), vec![0x00, 0x03, 0x03]);

        let mut decoded = RegisterResponse::default();
        decoded.decode(&[0x00, 0x03, 0x03, b'x']).unwrap();
        assert_eq!(decoded.result, RegisterResult::TerminalRegistered);
        assert!(decoded.auth_code.is_empty());
    }

    #[test]
    fn test_register_response_needs_serial_and_result() {
        let mut decoded = RegisterResponse::default();
        let err = decoded.decode(&[0x00, 0x03]).unwrap_err();
        assert!(matches!(err, ProtocolError::Field { field: "result", .. }));
    }

    #[test]
    fn test_auth_2013_is_bare_string() {
        let auth = TerminalAuth {
            auth_code: "AUTH123".to_string(),
            ..TerminalAuth::default()
        };

        let bytes = auth.encode().unwrap();

        assert_eq!(bytes, b"AUTH123".to_vec());
        let mut decoded = TerminalAuth::default();
        assert_eq!(decoded.decode(&bytes).unwrap(), 7);
        assert_eq!(decoded.auth_code, "AUTH123");
    }

    #[test]
    fn test_auth_2019_layout() {
        // Arrange
        let auth = TerminalAuth {
            auth_code: "AC".to_string(),
            imei: "860000000000001".to_string(),
            software_version: "V1.2".to_string(),
            version: ProtocolVersion::V2019,
        };

        // Act
        let bytes = auth.encode().unwrap();

        // Assert
        assert_eq!(bytes.len(), 1 + 2 + 15 + 20);
        assert_eq!(&bytes[..3], &[2, b'A', b'C']);
        assert_eq!(&bytes[3..18], b"860000000000001");
        assert_eq!(&bytes[18..22], b"V1.2");
        assert!(bytes[22..].iter().all(|b| *b == 0));

        let mut decoded = TerminalAuth::for_version(ProtocolVersion::V2019);
        assert_eq!(decoded.decode(&bytes).unwrap(), bytes.len());
        assert_eq!(decoded, auth);
    }

    #[test]
    fn test_auth_2019_truncated_body() {
        let mut decoded = TerminalAuth::for_version(ProtocolVersion::V2019);

        let err = decoded.decode(&[5, b'A', b'B']).unwrap_err();

        assert!(matches!(err, ProtocolError::Field { field: "auth_code", .. }));
    }
}
