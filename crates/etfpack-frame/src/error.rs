use etfpack_codec::{DecodeError, EncodeError};

/// Errors that can occur while exchanging term packets.
#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    /// The outgoing value could not be packed.
    #[error("packet encode failed: {0}")]
    Encode(#[from] EncodeError),

    /// The packet body is not a valid term.
    #[error("packet decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// The packet body exceeds the header range or the configured maximum.
    #[error("packet too large ({size} bytes, max {max})")]
    PacketTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing packets.
    #[error("packet I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete packet was received.
    #[error("connection closed (incomplete packet)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, PacketError>;
