use bytes::BytesMut;
use etfpack_codec::Value;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_packet, encode_packet, PacketConfig};
use crate::error::PacketError;

/// `tokio_util` codec that turns a byte stream into a stream of terms.
///
/// Use with `FramedRead`, `FramedWrite` or `Framed` over any async byte stream.
#[derive(Debug, Clone, Default)]
pub struct EtfCodec {
    config: PacketConfig,
}

impl EtfCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PacketConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PacketConfig {
        &self.config
    }
}

impl Decoder for EtfCodec {
    type Item = Value;
    type Error = PacketError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Value>, PacketError> {
        decode_packet(src, &self.config)
    }
}

impl Encoder<&Value> for EtfCodec {
    type Error = PacketError;

    fn encode(&mut self, item: &Value, dst: &mut BytesMut) -> Result<(), PacketError> {
        encode_packet(item, &self.config, dst)
    }
}

impl Encoder<Value> for EtfCodec {
    type Error = PacketError;

    fn encode(&mut self, item: Value, dst: &mut BytesMut) -> Result<(), PacketError> {
        encode_packet(&item, &self.config, dst)
    }
}
