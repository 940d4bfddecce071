//! # jtt-core
//!
//! Codec library for the JT/T 808 vehicle terminal protocol (2011, 2013 and
//! 2019 revisions) as spoken between GNSS terminals and a monitoring
//! platform.
//!
//! The crate has no I/O of its own: it turns bytes into typed headers and
//! bodies and back, and it reassembles segmented messages in memory.
//! Sockets, sessions and persistence belong to the application.
//!
//! # Architecture overview
//!
//! A message travels as a *frame*:
//!
//! ```text
//! 0x7E | escaped(header ++ body ++ xor-checksum) | 0x7E
//! ```
//!
//! - **`bits`** – single-bit access inside `u8`/`u16`/`u32` words, used for
//!   the bit-packed property word and for status and alarm masks.
//!
//! - **`protocol`** – the wire layer.  [`protocol::Reader`] and
//!   [`protocol::Writer`] provide big-endian integers, BCD digits, BCD
//!   timestamps and GB18030 strings.  [`protocol::frame`] escapes and
//!   unescapes frames; [`protocol::MsgHeader`] encodes the header for each
//!   revision; [`protocol::packet`] ties header, body and checksum into a
//!   complete frame and splits long bodies into segmented frames.
//!
//! - **`message`** – the boundary between raw body bytes and typed bodies:
//!   the [`message::MessageBody`] trait, a [`message::BodyRegistry`] keyed by
//!   message id, and the core registration and response bodies.
//!
//! - **`segment`** – [`segment::SegmentCache`], a concurrent store that
//!   collects the parts of segmented messages and yields each joined body
//!   exactly once.

pub mod bits;
pub mod message;
pub mod protocol;
pub mod segment;

// Re-export the most-used types so callers can write `jtt_core::MsgHeader`.
pub use message::{BodyRegistry, Message, MessageBody};
pub use protocol::{
    decode_packet, encode_packet, encode_segmented, MsgHeader, MsgId, Packet, Property,
    ProtocolError, ProtocolVersion, SegmentInfo, SerialNumberCounter, SerialNumberSource,
};
pub use segment::{SegmentCache, SegmentCacheConfig, SegmentError};
