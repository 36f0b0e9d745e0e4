use bytes::{Buf, BufMut, BytesMut};
use etfpack_codec::{pack_with, unpack_with, PackConfig, UnpackConfig, Value};
use tracing::{debug, trace};

use crate::error::{PacketError, Result};

/// Default maximum packet body size: 16 MiB.
pub const DEFAULT_MAX_PACKET: usize = 16 * 1024 * 1024;

/// Width of the big-endian length header in front of every packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PacketHeader {
    /// `{packet, 1}`
    One,
    /// `{packet, 2}`
    Two,
    /// `{packet, 4}`
    #[default]
    Four,
}

impl PacketHeader {
    /// Header size in bytes.
    pub fn size(self) -> usize {
        match self {
            PacketHeader::One => 1,
            PacketHeader::Two => 2,
            PacketHeader::Four => 4,
        }
    }

    /// Largest body length the header can describe.
    pub fn max_len(self) -> usize {
        match self {
            PacketHeader::One => u8::MAX as usize,
            PacketHeader::Two => u16::MAX as usize,
            PacketHeader::Four => u32::MAX as usize,
        }
    }

    fn put(self, dst: &mut BytesMut, len: usize) {
        match self {
            PacketHeader::One => dst.put_u8(len as u8),
            PacketHeader::Two => dst.put_u16(len as u16),
            PacketHeader::Four => dst.put_u32(len as u32),
        }
    }

    /// Caller guarantees `head` holds at least `self.size()` bytes.
    fn get(self, mut head: &[u8]) -> usize {
        match self {
            PacketHeader::One => usize::from(head.get_u8()),
            PacketHeader::Two => usize::from(head.get_u16()),
            PacketHeader::Four => head.get_u32() as usize,
        }
    }
}

/// Configuration for packet encoding and decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketConfig {
    /// Length header width. Default: 4 bytes.
    pub header: PacketHeader,
    /// Maximum body size in bytes. Default: 16 MiB.
    pub max_packet_size: usize,
    /// Options for packing outgoing terms.
    pub pack: PackConfig,
    /// Options for unpacking incoming terms.
    pub unpack: UnpackConfig,
}

impl PacketConfig {
    /// Effective body limit: the smaller of the header range and `max_packet_size`.
    pub fn max_body_len(&self) -> usize {
        self.max_packet_size.min(self.header.max_len())
    }
}

impl Default for PacketConfig {
    fn default() -> Self {
        Self {
            header: PacketHeader::default(),
            max_packet_size: DEFAULT_MAX_PACKET,
            pack: PackConfig::default(),
            unpack: UnpackConfig::default(),
        }
    }
}

/// Pack a value and append it to `dst` as one packet.
///
/// Wire format:
/// ```text
/// ┌──────────────────┬─────────────────────────────┐
/// │ Length (N B, BE) │ Body (Length bytes)          │
/// │                  │ 131, tag, ...                │
/// └──────────────────┴─────────────────────────────┘
/// ```
///
/// Nothing is written to `dst` on error.
pub fn encode_packet(value: &Value, config: &PacketConfig, dst: &mut BytesMut) -> Result<()> {
    let body = pack_with(value, &config.pack)?;

    let max = config.max_body_len();
    if body.len() > max {
        debug!(size = body.len(), max, "refusing to send oversized packet");
        return Err(PacketError::PacketTooLarge {
            size: body.len(),
            max,
        });
    }

    dst.reserve(config.header.size() + body.len());
    config.header.put(dst, body.len());
    dst.put_slice(&body);
    trace!(bytes = body.len(), "encoded packet");
    Ok(())
}

/// Decode one packet from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete packet yet.
/// A complete packet is consumed from the buffer even when its body fails to
/// decode, so the stream stays aligned on packet boundaries.
pub fn decode_packet(src: &mut BytesMut, config: &PacketConfig) -> Result<Option<Value>> {
    let header_size = config.header.size();
    if src.len() < header_size {
        return Ok(None);
    }

    let body_len = config.header.get(&src[..header_size]);
    let max = config.max_body_len();
    if body_len > max {
        debug!(size = body_len, max, "rejecting oversized packet");
        return Err(PacketError::PacketTooLarge {
            size: body_len,
            max,
        });
    }

    let total = header_size + body_len;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    src.advance(header_size);
    let body = src.split_to(body_len);
    let value = unpack_with(&body, &config.unpack)?;
    trace!(bytes = body_len, "decoded packet");
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use etfpack_codec::DecodeError;

    use super::*;

    fn config(header: PacketHeader) -> PacketConfig {
        PacketConfig {
            header,
            ..PacketConfig::default()
        }
    }

    #[test]
    fn encodes_length_prefix_per_header() {
        let value = Value::Int(1);
        for (header, prefix) in [
            (PacketHeader::One, &[3u8][..]),
            (PacketHeader::Two, &[0, 3]),
            (PacketHeader::Four, &[0, 0, 0, 3]),
        ] {
            let mut buf = BytesMut::new();
            encode_packet(&value, &config(header), &mut buf).unwrap();

            let mut expected = prefix.to_vec();
            expected.extend_from_slice(&[131, 97, 1]);
            assert_eq!(buf.as_ref(), expected.as_slice());
        }
    }

    #[test]
    fn encode_decode_roundtrip() {
        let value = Value::from(vec![Value::from("ping"), Value::Int(7)]);
        for header in [PacketHeader::One, PacketHeader::Two, PacketHeader::Four] {
            let cfg = config(header);
            let mut buf = BytesMut::new();
            encode_packet(&value, &cfg, &mut buf).unwrap();

            assert_eq!(decode_packet(&mut buf, &cfg).unwrap(), Some(value.clone()));
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn decode_incomplete_header() {
        let mut buf = BytesMut::from(&[0x00, 0x00][..]);
        assert_eq!(decode_packet(&mut buf, &PacketConfig::default()).unwrap(), None);
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn decode_incomplete_body() {
        let cfg = PacketConfig::default();
        let mut buf = BytesMut::new();
        encode_packet(&Value::from("hello"), &cfg, &mut buf).unwrap();
        let full = buf.len();
        buf.truncate(full - 2);

        assert_eq!(decode_packet(&mut buf, &cfg).unwrap(), None);
        assert_eq!(buf.len(), full - 2);
    }

    #[test]
    fn decode_rejects_oversized_length_before_buffering() {
        let cfg = PacketConfig {
            max_packet_size: 64,
            ..PacketConfig::default()
        };
        let mut buf = BytesMut::new();
        buf.put_u32(1024);

        let err = decode_packet(&mut buf, &cfg).unwrap_err();
        assert!(matches!(
            err,
            PacketError::PacketTooLarge {
                size: 1024,
                max: 64
            }
        ));
    }

    #[test]
    fn encode_rejects_body_over_header_range() {
        let cfg = config(PacketHeader::One);
        let value = Value::from("x".repeat(300));
        let mut buf = BytesMut::new();

        let err = encode_packet(&value, &cfg, &mut buf).unwrap_err();
        assert!(matches!(err, PacketError::PacketTooLarge { max: 255, .. }));
        assert!(buf.is_empty());
    }

    #[test]
    fn bad_body_is_consumed() {
        let cfg = PacketConfig::default();
        let mut buf = BytesMut::from(&[0, 0, 0, 2, 130, 97][..]);
        encode_packet(&Value::Int(5), &cfg, &mut buf).unwrap();

        let err = decode_packet(&mut buf, &cfg).unwrap_err();
        assert!(matches!(
            err,
            PacketError::Decode(DecodeError::VersionMismatch { found: 130 })
        ));
        assert_eq!(decode_packet(&mut buf, &cfg).unwrap(), Some(Value::Int(5)));
    }

    #[test]
    fn multiple_packets() {
        let cfg = PacketConfig::default();
        let mut buf = BytesMut::new();
        encode_packet(&Value::from("first"), &cfg, &mut buf).unwrap();
        encode_packet(&Value::Nil, &cfg, &mut buf).unwrap();

        assert_eq!(
            decode_packet(&mut buf, &cfg).unwrap(),
            Some(Value::from("first"))
        );
        assert_eq!(decode_packet(&mut buf, &cfg).unwrap(), Some(Value::Nil));
        assert_eq!(decode_packet(&mut buf, &cfg).unwrap(), None);
    }

    #[test]
    fn encode_error_propagates() {
        let mut buf = BytesMut::new();
        let err = encode_packet(&Value::Float(f64::NAN), &PacketConfig::default(), &mut buf)
            .unwrap_err();
        assert!(matches!(err, PacketError::Encode(_)));
        assert!(buf.is_empty());
    }

    #[test]
    fn max_body_len_takes_the_smaller_limit() {
        assert_eq!(config(PacketHeader::Two).max_body_len(), 65_535);
        assert_eq!(PacketConfig::default().max_body_len(), DEFAULT_MAX_PACKET);
    }
}
