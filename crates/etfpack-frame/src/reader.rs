use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use etfpack_codec::Value;

use crate::codec::{decode_packet, PacketConfig};
use crate::error::{PacketError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete terms from any `Read` stream.
///
/// Handles partial reads internally, so callers always get whole terms.
pub struct TermReader<T> {
    inner: T,
    buf: BytesMut,
    config: PacketConfig,
}

impl<T: Read> TermReader<T> {
    /// Create a new term reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, PacketConfig::default())
    }

    /// Create a new term reader with explicit configuration.
    pub fn with_config(inner: T, config: PacketConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete term (blocking).
    ///
    /// Returns `Err(PacketError::ConnectionClosed)` when EOF is reached.
    pub fn read_term(&mut self) -> Result<Value> {
        loop {
            if let Some(value) = decode_packet(&mut self.buf, &self.config)? {
                return Ok(value);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(PacketError::Io(err)),
            };

            if read == 0 {
                return Err(PacketError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn config(&self) -> &PacketConfig {
        &self.config
    }
}
