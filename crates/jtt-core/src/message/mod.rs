//! Message bodies and the registry that maps message ids to body codecs.
//!
//! The packet codec deals in raw body bytes.  Turning those bytes into a
//! typed value is the job of a [`MessageBody`] implementation selected by the
//! header's [`MsgId`] through a [`BodyRegistry`].  The registry is an
//! ordinary value owned by the caller; register additional bodies on it
//! before decoding.

pub mod general;
pub mod register;

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use tracing::trace;

use crate::protocol::error::ProtocolError;
use crate::protocol::header::{MsgHeader, MsgId, ProtocolVersion};
use crate::protocol::packet::Packet;

pub use general::{Heartbeat, PlatformGeneralResponse, ReplyResult, TerminalGeneralResponse};
pub use register::{RegisterResponse, RegisterResult, TerminalAuth, TerminalRegister};

/// A typed message body.
///
/// `decode` fills `self` from `data` and returns how many bytes it consumed;
/// bodies whose layout depends on the protocol revision receive it at
/// construction through their [`BodyFactory`].
pub trait MessageBody: Send + Sync + fmt::Debug {
    /// The message id this body is carried under.
    fn msg_id(&self) -> MsgId;

    /// Serializes the body.
    fn encode(&self) -> Result<Vec<u8>, ProtocolError>;

    /// Parses `data` into `self`, returning the number of bytes consumed.
    fn decode(&mut self, data: &[u8]) -> Result<usize, ProtocolError>;

    /// Access to the concrete type for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Builds an empty body for the given protocol revision.
pub type BodyFactory = fn(ProtocolVersion) -> Box<dyn MessageBody>;

/// A header paired with its decoded body.
#[derive(Debug)]
pub struct Message {
    pub header: MsgHeader,
    pub body: Box<dyn MessageBody>,
}

impl Message {
    /// Returns the body as `T` if that is its concrete type.
    pub fn body_as<T: MessageBody + 'static>(&self) -> Option<&T> {
        self.body.as_any().downcast_ref::<T>()
    }
}

/// Message id → body factory lookup.
#[derive(Clone, Default)]
pub struct BodyRegistry {
    factories: HashMap<MsgId, BodyFactory>,
}

impl BodyRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every body this crate implements.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register(MsgId::TERMINAL_GENERAL_RESPONSE, |_| {
                Box::<TerminalGeneralResponse>::default()
            })
            .register(MsgId::PLATFORM_GENERAL_RESPONSE, |_| {
                Box::<PlatformGeneralResponse>::default()
            })
            .register(MsgId::TERMINAL_HEARTBEAT, |_| Box::new(Heartbeat))
            .register(MsgId::TERMINAL_REGISTER, |version| {
                Box::new(TerminalRegister::for_version(version))
            })
            .register(MsgId::TERMINAL_REGISTER_RESPONSE, |_| {
                Box::<RegisterResponse>::default()
            })
            .register(MsgId::TERMINAL_AUTH, |version| {
                Box::new(TerminalAuth::for_version(version))
            });
        registry
    }

    /// Registers (or replaces) the factory for `msg_id`.
    pub fn register(&mut self, msg_id: MsgId, factory: BodyFactory) -> &mut Self {
        self.factories.insert(msg_id, factory);
        self
    }

    pub fn contains(&self, msg_id: MsgId) -> bool {
        self.factories.contains_key(&msg_id)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Creates an empty body for `msg_id`, or `None` if unregistered.
    pub fn create(&self, msg_id: MsgId, version: ProtocolVersion) -> Option<Box<dyn MessageBody>> {
        self.factories.get(&msg_id).map(|factory| factory(version))
    }

    /// Decodes `body` as the message `header` describes.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::UnregisteredMessage`] if no factory is registered
    ///   for the header's message id.
    /// - Whatever the body's own `decode` reports.
    pub fn decode_body(&self, header: &MsgHeader, body: &[u8]) -> Result<Box<dyn MessageBody>, ProtocolError> {
        let mut decoded = self
            .create(header.msg_id, header.version)
            .ok_or(ProtocolError::UnregisteredMessage(header.msg_id))?;
        let consumed = decoded.decode(body)?;
        if consumed < body.len() {
            trace!(
                msg_id = %header.msg_id,
                trailing = body.len() - consumed,
                "body decoded with trailing bytes"
            );
        }
        Ok(decoded)
    }

    /// Decodes the body of a deframed packet.
    pub fn decode_packet(&self, packet: &Packet) -> Result<Message, ProtocolError> {
        let body = self.decode_body(&packet.header, &packet.body)?;
        Ok(Message {
            header: packet.header.clone(),
            body,
        })
    }
}

impl fmt::Debug for BodyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&MsgId> = self.factories.keys().collect();
        ids.sort();
        f.debug_struct("BodyRegistry").field("msg_ids", &ids).finish()
    }
}
