use flate2::{Decompress, FlushDecompress, Status};
use tracing::{debug, trace};

use crate::config::{LegacyString, UnpackConfig};
use crate::error::{DecodeError, DecodeResult};
use crate::value::{Map, Value};
use crate::wire::{
    big_magnitude, f64_from_wire, parse_legacy_float, tag_name, ATOM_EXT, ATOM_FALSE, ATOM_NIL,
    ATOM_NULL, ATOM_TRUE, ATOM_UTF8_EXT, BINARY_EXT, COMPRESSED, EXPORT_EXT, FLOAT_EXT,
    FORMAT_VERSION, INTEGER_EXT, LARGE_BIG_EXT, LARGE_TUPLE_EXT, LEGACY_FLOAT_LEN, LIST_EXT,
    MAP_EXT, MAX_BIG_DIGITS, NEWER_REFERENCE_EXT, NEW_FLOAT_EXT, NEW_PID_EXT, NEW_PORT_EXT,
    NEW_REFERENCE_EXT, NIL_EXT, PID_EXT, PORT_EXT, REFERENCE_EXT, SMALL_ATOM_EXT,
    SMALL_ATOM_UTF8_EXT, SMALL_BIG_EXT, SMALL_INTEGER_EXT, SMALL_TUPLE_EXT, STRING_EXT,
};

/// Decode a term with the default configuration.
///
/// Value mapping:
/// ```text
/// SMALL_INTEGER_EXT, INTEGER_EXT        -> Int
/// FLOAT_EXT, NEW_FLOAT_EXT              -> Float
/// atoms "nil", "null"                   -> Nil
/// atoms "true", "false"                 -> Bool
/// other atoms                           -> String
/// SMALL_TUPLE_EXT, LARGE_TUPLE_EXT      -> List
/// NIL_EXT, LIST_EXT                     -> List
/// STRING_EXT                            -> List of Int (see LegacyString)
/// MAP_EXT                               -> Map
/// BINARY_EXT                            -> String, or Binary if not UTF-8
/// SMALL_BIG_EXT, LARGE_BIG_EXT          -> Int, or decimal String past 32 bits
/// references, ports, pids, exports      -> Map keyed by field name
/// COMPRESSED                            -> the inflated inner term
/// ```
pub fn unpack(data: &[u8]) -> DecodeResult<Value> {
    unpack_with(data, &UnpackConfig::default())
}

/// Decode a term with explicit configuration.
///
/// The first byte must be the format version. Bytes after the term are ignored.
pub fn unpack_with(data: &[u8], config: &UnpackConfig) -> DecodeResult<Value> {
    let mut reader = Reader::new(data, config);

    let version = reader.read_u8()?;
    if version != FORMAT_VERSION {
        debug!(found = version, "rejecting term with bad version number");
        return Err(DecodeError::VersionMismatch { found: version });
    }

    let value = reader.read_value(config.depth_limit)?;
    trace!(bytes = reader.offset, len = data.len(), "unpacked term");
    Ok(value)
}

#[derive(Clone, Copy)]
enum AtomText {
    Latin1,
    Utf8,
}

#[derive(Clone, Copy)]
enum Creation {
    Byte,
    Word,
}

/// Bounds-checked cursor over one encoded buffer.
struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
    config: &'a UnpackConfig,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8], config: &'a UnpackConfig) -> Self {
        Self {
            data,
            offset: 0,
            config,
        }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn take(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        let end = self
            .offset
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(DecodeError::BufferUnderrun {
                offset: self.offset,
                needed: n,
                len: self.data.len(),
            })?;
        let bytes = &self.data[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn read_u8(&mut self) -> DecodeResult<u8> {
        Ok(self.take_array::<1>()?[0])
    }

    fn read_u16(&mut self) -> DecodeResult<u16> {
        self.take_array().map(u16::from_be_bytes)
    }

    fn read_u32(&mut self) -> DecodeResult<u32> {
        self.take_array().map(u32::from_be_bytes)
    }

    fn read_i32(&mut self) -> DecodeResult<i32> {
        self.take_array().map(i32::from_be_bytes)
    }

    fn read_value(&mut self, depth: usize) -> DecodeResult<Value> {
        if depth == 0 {
            return Err(DecodeError::RecursionLimitExceeded {
                limit: self.config.depth_limit,
            });
        }

        let tag_offset = self.offset;
        let tag = self.read_u8()?;
        match tag {
            SMALL_INTEGER_EXT => Ok(Value::Int(i64::from(self.read_u8()?))),
            INTEGER_EXT => Ok(Value::Int(i64::from(self.read_i32()?))),
            FLOAT_EXT => {
                let text = self.take(LEGACY_FLOAT_LEN)?;
                parse_legacy_float(text)
                    .map(Value::Float)
                    .ok_or(DecodeError::InvalidFloat { offset: tag_offset })
            }
            NEW_FLOAT_EXT => Ok(Value::Float(f64_from_wire(self.take_array()?))),
            ATOM_EXT => {
                let len = self.read_u16()?;
                self.read_atom(usize::from(len), AtomText::Latin1)
            }
            SMALL_ATOM_EXT => {
                let len = self.read_u8()?;
                self.read_atom(usize::from(len), AtomText::Latin1)
            }
            ATOM_UTF8_EXT => {
                let len = self.read_u16()?;
                self.read_atom(usize::from(len), AtomText::Utf8)
            }
            SMALL_ATOM_UTF8_EXT => {
                let len = self.read_u8()?;
                self.read_atom(usize::from(len), AtomText::Utf8)
            }
            SMALL_TUPLE_EXT => {
                let arity = self.read_u8()?;
                self.read_items(usize::from(arity), depth).map(Value::List)
            }
            LARGE_TUPLE_EXT => {
                let arity = self.read_u32()?;
                self.read_items(arity as usize, depth).map(Value::List)
            }
            NIL_EXT => Ok(Value::List(Vec::new())),
            STRING_EXT => self.read_legacy_string(),
            LIST_EXT => self.read_list(depth),
            MAP_EXT => self.read_map(depth),
            BINARY_EXT => {
                let len = self.read_u32()?;
                let bytes = self.take(len as usize)?;
                Ok(Value::from_text_bytes(bytes))
            }
            SMALL_BIG_EXT => {
                let digits = self.read_u8()?;
                self.read_big(usize::from(digits), tag_offset)
            }
            LARGE_BIG_EXT => {
                let digits = self.read_u32()?;
                self.read_big(digits as usize, tag_offset)
            }
            REFERENCE_EXT => {
                let node = self.read_value(depth - 1)?;
                let id = self.read_u32()?;
                let creation = self.read_creation(Creation::Byte)?;
                Ok(record([
                    ("node", node),
                    ("id", Value::List(vec![Value::from(id)])),
                    ("creation", creation),
                ]))
            }
            NEW_REFERENCE_EXT => self.read_new_reference(depth, Creation::Byte),
            NEWER_REFERENCE_EXT => self.read_new_reference(depth, Creation::Word),
            PORT_EXT => self.read_port(depth, Creation::Byte),
            NEW_PORT_EXT => self.read_port(depth, Creation::Word),
            PID_EXT => self.read_pid(depth, Creation::Byte),
            NEW_PID_EXT => self.read_pid(depth, Creation::Word),
            EXPORT_EXT => {
                let module = self.read_value(depth - 1)?;
                let function = self.read_value(depth - 1)?;
                let arity = self.read_value(depth - 1)?;
                Ok(record([("mod", module), ("fun", function), ("arity", arity)]))
            }
            COMPRESSED => self.read_compressed(depth, tag_offset),
            _ => {
                debug!(tag, offset = tag_offset, "unsupported term type");
                Err(DecodeError::UnsupportedTag {
                    tag,
                    offset: tag_offset,
                })
            }
        }
    }

    fn read_items(&mut self, count: usize, depth: usize) -> DecodeResult<Vec<Value>> {
        // Every element takes at least one byte, so the input bounds a sane preallocation.
        let mut items = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            items.push(self.read_value(depth - 1)?);
        }
        Ok(items)
    }

    fn read_list(&mut self, depth: usize) -> DecodeResult<Value> {
        let len = self.read_u32()?;
        let items = self.read_items(len as usize, depth)?;

        let tail_offset = self.offset;
        let tail = self.read_u8()?;
        if tail != NIL_EXT {
            debug!(
                found = tag_name(tail),
                offset = tail_offset,
                "list doesn't end with a tail marker"
            );
            return Err(DecodeError::MalformedContainer {
                offset: tail_offset,
                found: tail,
            });
        }
        Ok(Value::List(items))
    }

    fn read_map(&mut self, depth: usize) -> DecodeResult<Value> {
        let count = self.read_u32()? as usize;
        let mut map = Map::with_capacity(count.min(self.remaining() / 2));
        for _ in 0..count {
            let key = self.read_value(depth - 1)?;
            let value = self.read_value(depth - 1)?;
            map.insert(key, value);
        }
        Ok(Value::Map(map))
    }

    fn read_atom(&mut self, len: usize, text: AtomText) -> DecodeResult<Value> {
        let offset = self.offset;
        let bytes = self.take(len)?;
        let value = match bytes {
            ATOM_NIL | ATOM_NULL => Value::Nil,
            ATOM_TRUE => Value::Bool(true),
            ATOM_FALSE => Value::Bool(false),
            _ => match text {
                AtomText::Latin1 => Value::String(bytes.iter().map(|&b| char::from(b)).collect()),
                AtomText::Utf8 => std::str::from_utf8(bytes)
                    .map(|s| Value::String(s.to_owned()))
                    .map_err(|_| DecodeError::InvalidUtf8 { offset })?,
            },
        };
        Ok(value)
    }

    fn read_legacy_string(&mut self) -> DecodeResult<Value> {
        let len = self.read_u16()?;
        let bytes = self.take(usize::from(len))?;
        Ok(match self.config.legacy_string {
            LegacyString::List => Value::List(bytes.iter().map(|&b| Value::from(b)).collect()),
            LegacyString::Binary => Value::from_text_bytes(bytes),
        })
    }

    fn read_big(&mut self, digits: usize, tag_offset: usize) -> DecodeResult<Value> {
        let sign = self.read_u8()?;
        if digits > MAX_BIG_DIGITS {
            return Err(DecodeError::UnsupportedBigInt {
                digits,
                offset: tag_offset,
            });
        }

        let magnitude = big_magnitude(self.take(digits)?);
        let negative = sign != 0;
        Ok(if !negative && magnitude <= u64::from(u32::MAX) {
            Value::Int(magnitude as i64)
        } else if negative && magnitude <= i32::MAX as u64 {
            Value::Int(-(magnitude as i64))
        } else if negative {
            Value::String(format!("-{magnitude}"))
        } else {
            Value::String(magnitude.to_string())
        })
    }

    fn read_creation(&mut self, width: Creation) -> DecodeResult<Value> {
        Ok(match width {
            Creation::Byte => Value::from(self.read_u8()?),
            Creation::Word => Value::from(self.read_u32()?),
        })
    }

    fn read_new_reference(&mut self, depth: usize, width: Creation) -> DecodeResult<Value> {
        let len = usize::from(self.read_u16()?);
        let node = self.read_value(depth - 1)?;
        let creation = self.read_creation(width)?;

        let mut ids = Vec::with_capacity(len.min(self.remaining() / 4));
        for _ in 0..len {
            ids.push(Value::from(self.read_u32()?));
        }
        Ok(record([
            ("node", node),
            ("id", Value::List(ids)),
            ("creation", creation),
        ]))
    }

    fn read_port(&mut self, depth: usize, width: Creation) -> DecodeResult<Value> {
        let node = self.read_value(depth - 1)?;
        let id = self.read_u32()?;
        let creation = self.read_creation(width)?;
        Ok(record([
            ("node", node),
            ("id", Value::from(id)),
            ("creation", creation),
        ]))
    }

    fn read_pid(&mut self, depth: usize, width: Creation) -> DecodeResult<Value> {
        let node = self.read_value(depth - 1)?;
        let id = self.read_u32()?;
        let serial = self.read_u32()?;
        let creation = self.read_creation(width)?;
        Ok(record([
            ("node", node),
            ("id", Value::from(id)),
            ("serial", Value::from(serial)),
            ("creation", creation),
        ]))
    }

    /// The payload is a zlib stream holding exactly one term, without a version byte.
    fn read_compressed(&mut self, depth: usize, tag_offset: usize) -> DecodeResult<Value> {
        let declared = self.read_u32()? as usize;
        let failure = |reason: String| {
            debug!(offset = tag_offset, %reason, "failed to uncompress term");
            DecodeError::DecompressionFailure {
                offset: tag_offset,
                reason,
            }
        };

        if declared > self.config.max_inflated_size {
            return Err(failure(format!(
                "declared size {declared} exceeds limit {}",
                self.config.max_inflated_size
            )));
        }

        let (scratch, consumed) =
            inflate(&self.data[self.offset..], declared).map_err(failure)?;
        self.offset += consumed;

        let mut inner = Reader::new(&scratch, self.config);
        let value = inner.read_value(depth)?;
        if inner.remaining() != 0 {
            return Err(failure(format!(
                "{} trailing bytes after the inflated term",
                inner.remaining()
            )));
        }
        Ok(value)
    }
}

/// Inflate `input` into a buffer of exactly `size` bytes.
///
/// Returns the buffer and the number of input bytes consumed.
fn inflate(input: &[u8], size: usize) -> Result<(Vec<u8>, usize), String> {
    let mut scratch = vec![0u8; size];
    let mut inflater = Decompress::new(true);

    let status = inflater
        .decompress(input, &mut scratch, FlushDecompress::Finish)
        .map_err(|err| err.to_string())?;
    if !matches!(status, Status::StreamEnd) {
        return Err(format!(
            "stream did not end within the declared size of {size} bytes"
        ));
    }

    let produced = inflater.total_out();
    if produced != size as u64 {
        return Err(format!("inflated {produced} bytes, expected {size}"));
    }

    let consumed = usize::try_from(inflater.total_in()).map_err(|err| err.to_string())?;
    Ok((scratch, consumed))
}

fn record<const N: usize>(fields: [(&str, Value); N]) -> Value {
    Value::Map(fields.into_iter().collect())
}
