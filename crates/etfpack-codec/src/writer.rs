use bytes::{BufMut, Bytes};
use tracing::trace;

use crate::config::PackConfig;
use crate::error::{EncodeError, EncodeResult};
use crate::value::{Map, Value};
use crate::wire::{
    big_digits, f64_to_wire, ATOM_FALSE, ATOM_NIL, ATOM_TRUE, BINARY_EXT, FORMAT_VERSION,
    INTEGER_EXT, LIST_EXT, MAP_EXT, NEW_FLOAT_EXT, NIL_EXT, SMALL_ATOM_EXT, SMALL_BIG_EXT,
    SMALL_INTEGER_EXT,
};

/// Encode a value with the default configuration.
///
/// Wire mapping:
/// ```text
/// Nil            -> SMALL_ATOM_EXT "nil"
/// Bool           -> SMALL_ATOM_EXT "true" / "false"
/// Int 0..=255    -> SMALL_INTEGER_EXT
/// Int (i32)      -> INTEGER_EXT
/// Int (other)    -> SMALL_BIG_EXT, sign byte + little-endian magnitude
/// Float          -> NEW_FLOAT_EXT
/// String, Binary -> BINARY_EXT
/// List []        -> NIL_EXT
/// List           -> LIST_EXT header, elements, NIL_EXT tail
/// Map            -> MAP_EXT header, key/value pairs in insertion order
/// ```
pub fn pack(value: &Value) -> EncodeResult<Bytes> {
    pack_with(value, &PackConfig::default())
}

/// Encode a value with explicit configuration.
///
/// Nothing is returned unless the whole value encodes.
pub fn pack_with(value: &Value, config: &PackConfig) -> EncodeResult<Bytes> {
    let mut packer = Packer::with_capacity(config.initial_capacity, config.depth_limit)?;
    packer.put_version()?;
    packer.pack_value(value, config.depth_limit)?;

    trace!(bytes = packer.buf.len(), "packed term");
    Ok(Bytes::from(packer.buf))
}

/// Owns the output buffer of a single pack call.
struct Packer {
    buf: Vec<u8>,
    depth_limit: usize,
}

impl Packer {
    fn with_capacity(capacity: usize, depth_limit: usize) -> EncodeResult<Self> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(capacity)
            .map_err(|_| EncodeError::OutOfMemory {
                requested: capacity,
            })?;
        Ok(Self { buf, depth_limit })
    }

    /// Make room for `additional` bytes, growing to twice the required length on overflow.
    fn reserve(&mut self, additional: usize) -> EncodeResult<()> {
        let len = self.buf.len();
        let required = len
            .checked_add(additional)
            .ok_or(EncodeError::OutOfMemory {
                requested: usize::MAX,
            })?;
        if required <= self.buf.capacity() {
            return Ok(());
        }

        let target = required.saturating_mul(2);
        self.buf
            .try_reserve_exact(target - len)
            .map_err(|_| EncodeError::OutOfMemory { requested: target })
    }

    fn put_version(&mut self) -> EncodeResult<()> {
        self.reserve(1)?;
        self.buf.put_u8(FORMAT_VERSION);
        Ok(())
    }

    fn pack_value(&mut self, value: &Value, depth: usize) -> EncodeResult<()> {
        if depth == 0 {
            return Err(EncodeError::RecursionLimitExceeded {
                limit: self.depth_limit,
            });
        }

        match value {
            Value::Nil => self.put_atom(ATOM_NIL),
            Value::Bool(true) => self.put_atom(ATOM_TRUE),
            Value::Bool(false) => self.put_atom(ATOM_FALSE),
            Value::Int(n) => self.put_int(*n),
            Value::Float(f) => self.put_float(*f),
            Value::String(s) => self.put_binary(s.as_bytes()),
            Value::Binary(b) => self.put_binary(b),
            Value::List(items) => self.pack_list(items, depth),
            Value::Map(map) => self.pack_map(map, depth),
        }
    }

    fn pack_list(&mut self, items: &[Value], depth: usize) -> EncodeResult<()> {
        if items.is_empty() {
            self.reserve(1)?;
            self.buf.put_u8(NIL_EXT);
            return Ok(());
        }

        self.put_header(LIST_EXT, "list", items.len())?;

        for item in items {
            self.pack_value(item, depth - 1)?;
        }

        self.reserve(1)?;
        self.buf.put_u8(NIL_EXT);
        Ok(())
    }

    fn pack_map(&mut self, map: &Map, depth: usize) -> EncodeResult<()> {
        self.put_header(MAP_EXT, "map", map.len())?;

        for (key, value) in map.iter() {
            self.pack_value(key, depth - 1)?;
            self.pack_value(value, depth - 1)?;
        }
        Ok(())
    }

    /// Atoms this encoder emits are all shorter than 255 bytes.
    fn put_atom(&mut self, text: &[u8]) -> EncodeResult<()> {
        self.reserve(2 + text.len())?;
        self.buf.put_u8(SMALL_ATOM_EXT);
        self.buf.put_u8(text.len() as u8);
        self.buf.put_slice(text);
        Ok(())
    }

    fn put_int(&mut self, n: i64) -> EncodeResult<()> {
        if let Ok(small) = u8::try_from(n) {
            self.reserve(2)?;
            self.buf.put_u8(SMALL_INTEGER_EXT);
            self.buf.put_u8(small);
        } else if let Ok(int) = i32::try_from(n) {
            self.reserve(5)?;
            self.buf.put_u8(INTEGER_EXT);
            self.buf.put_i32(int);
        } else {
            let (digits, count) = big_digits(n.unsigned_abs());
            self.reserve(3 + count)?;
            self.buf.put_u8(SMALL_BIG_EXT);
            self.buf.put_u8(count as u8);
            self.buf.put_u8(u8::from(n < 0));
            self.buf.put_slice(&digits[..count]);
        }
        Ok(())
    }

    fn put_float(&mut self, f: f64) -> EncodeResult<()> {
        if !f.is_finite() {
            return Err(EncodeError::UnsupportedValue {
                reason: "floats must be finite",
            });
        }
        self.reserve(9)?;
        self.buf.put_u8(NEW_FLOAT_EXT);
        self.buf.put_slice(&f64_to_wire(f));
        Ok(())
    }

    fn put_binary(&mut self, bytes: &[u8]) -> EncodeResult<()> {
        self.put_header(BINARY_EXT, "binary", bytes.len())?;
        self.reserve(bytes.len())?;
        self.buf.put_slice(bytes);
        Ok(())
    }

    /// Tag plus 32-bit length. Nothing is written if `len` does not fit.
    fn put_header(&mut self, tag: u8, kind: &'static str, len: usize) -> EncodeResult<()> {
        let len = wire_len(kind, len)?;
        self.reserve(5)?;
        self.buf.put_u8(tag);
        self.buf.put_u32(len);
        Ok(())
    }
}

fn wire_len(kind: &'static str, len: usize) -> EncodeResult<u32> {
    u32::try_from(len).map_err(|_| EncodeError::SizeLimitExceeded { kind, len })
}
