//! General responses (0x0001, 0x8001) and the terminal heartbeat (0x0002).

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::message::MessageBody;
use crate::protocol::error::{FieldContext, ProtocolError};
use crate::protocol::header::MsgId;
use crate::protocol::reader::Reader;
use crate::protocol::writer::Writer;

/// Outcome carried by a general response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum ReplyResult {
    /// Success / acknowledged.
    #[default]
    Success = 0,
    Failure = 1,
    /// The message was malformed.
    MessageError = 2,
    Unsupported = 3,
    /// Alarm handling confirmed.  Only sent by the platform.
    AlarmConfirmed = 4,
}

impl TryFrom<u8> for ReplyResult {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ReplyResult::Success),
            1 => Ok(ReplyResult::Failure),
            2 => Ok(ReplyResult::MessageError),
            3 => Ok(ReplyResult::Unsupported),
            4 => Ok(ReplyResult::AlarmConfirmed),
            other => Err(other),
        }
    }
}

/// Both general responses share one layout:
/// `[reply_serial:2][reply_msg_id:2][result:1]`.
fn encode_reply(reply_serial: u16, reply_msg_id: MsgId, result: ReplyResult) -> Vec<u8> {
    let mut writer = Writer::with_capacity(5);
    writer
        .write_u16(reply_serial)
        .write_u16(reply_msg_id.0)
        .write_u8(result as u8);
    writer.into_bytes()
}

fn decode_reply(msg_id: MsgId, data: &[u8]) -> Result<(u16, MsgId, ReplyResult, usize), ProtocolError> {
    let mut reader = Reader::new(data);
    let reply_serial = reader.read_u16().field("reply_serial")?;
    let reply_msg_id = MsgId(reader.read_u16().field("reply_msg_id")?);
    let raw = reader.read_u8().field("result")?;
    let result = ReplyResult::try_from(raw).map_err(|raw| ProtocolError::InvalidBody {
        msg_id,
        reason: format!("unknown result code {raw}"),
    })?;
    Ok((reply_serial, reply_msg_id, result, reader.position()))
}

/// Terminal general response (0x0001).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalGeneralResponse {
    /// Serial number of the platform message being answered.
    pub reply_serial: u16,
    /// Id of the platform message being answered.
    pub reply_msg_id: MsgId,
    pub result: ReplyResult,
}

impl MessageBody for TerminalGeneralResponse {
    fn msg_id(&self) -> MsgId {
        MsgId::TERMINAL_GENERAL_RESPONSE
    }

    fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(encode_reply(self.reply_serial, self.reply_msg_id, self.result))
    }

    fn decode(&mut self, data: &[u8]) -> Result<usize, ProtocolError> {
        let (serial, id, result, consumed) = decode_reply(self.msg_id(), data)?;
        self.reply_serial = serial;
        self.reply_msg_id = id;
        self.result = result;
        Ok(consumed)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Platform general response (0x8001).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformGeneralResponse {
    /// Serial number of the terminal message being answered.
    pub reply_serial: u16,
    /// Id of the terminal message being answered.
    pub reply_msg_id: MsgId,
    pub result: ReplyResult,
}

impl MessageBody for PlatformGeneralResponse {
    fn msg_id(&self) -> MsgId {
        MsgId::PLATFORM_GENERAL_RESPONSE
    }

    fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(encode_reply(self.reply_serial, self.reply_msg_id, self.result))
    }

    fn decode(&mut self, data: &[u8]) -> Result<usize, ProtocolError> {
        let (serial, id, result, consumed) = decode_reply(self.msg_id(), data)?;
        self.reply_serial = serial;
        self.reply_msg_id = id;
        self.result = result;
        Ok(consumed)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Terminal heartbeat (0x0002).  The body is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat;

impl MessageBody for Heartbeat {
    fn msg_id(&self) -> MsgId {
        MsgId::TERMINAL_HEARTBEAT
    }

    fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(Vec::new())
    }

    fn decode(&mut self, _data: &[u8]) -> Result<usize, ProtocolError> {
        Ok(0)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
