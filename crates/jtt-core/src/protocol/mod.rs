//! Wire-level codec: byte cursor, frame, header and packet encoding.

pub mod bcd;
pub mod error;
pub mod frame;
pub mod header;
pub mod packet;
pub mod reader;
pub mod sequence;
pub mod text;
pub mod writer;

pub use error::ProtocolError;
pub use header::{MsgHeader, MsgId, Property, ProtocolVersion, SegmentInfo, MIN_HEADER_SIZE};
pub use packet::{decode_packet, encode_packet, encode_segmented, Packet};
pub use reader::Reader;
pub use sequence::{SerialNumberCounter, SerialNumberSource};
pub use writer::Writer;
