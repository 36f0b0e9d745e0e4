//! Length-prefixed Erlang term packets over byte streams.
//!
//! Matches the `{packet, N}` option of Erlang ports and sockets: every message is
//! - An N-byte big-endian body length (N is 1, 2 or 4)
//! - One term in external term format, version byte included
//!
//! Readers and writers hand out whole [`Value`](etfpack_codec::Value)s; partial
//! reads and writes are handled internally.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::EtfCodec;
pub use codec::{decode_packet, encode_packet, PacketConfig, PacketHeader, DEFAULT_MAX_PACKET};
pub use error::{PacketError, Result};
pub use reader::TermReader;
pub use writer::TermWriter;
