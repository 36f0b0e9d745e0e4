use crate::wire::FORMAT_VERSION;

/// Errors that can occur while packing a [`Value`](crate::Value).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// Container nesting went deeper than the configured depth limit.
    #[error("reached recursion limit ({limit} levels)")]
    RecursionLimitExceeded { limit: usize },

    /// A container or byte string has more elements than its 32-bit length field can carry.
    #[error("{kind} is too large ({len} elements, max {max})", max = u32::MAX)]
    SizeLimitExceeded { kind: &'static str, len: usize },

    /// The output buffer could not grow.
    #[error("unable to allocate {requested} bytes for encoding")]
    OutOfMemory { requested: usize },

    /// The value has no external term representation.
    #[error("unsupported value: {reason}")]
    UnsupportedValue { reason: &'static str },
}

/// Errors that can occur while unpacking an encoded term.
///
/// Offsets are byte positions in the buffer being decoded. For terms inside a
/// compressed payload they refer to the inflated buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The leading byte is not the external term format version.
    #[error("bad version number {found} (expected {expected})", expected = FORMAT_VERSION)]
    VersionMismatch { found: u8 },

    /// A read would pass the end of the input.
    #[error("reading {needed} bytes at offset {offset} passes the end of the buffer ({len} bytes)")]
    BufferUnderrun {
        offset: usize,
        needed: usize,
        len: usize,
    },

    /// A list is not closed by the NIL_EXT tail marker.
    #[error("list at offset {offset} ends with tag {found} instead of the NIL_EXT tail marker")]
    MalformedContainer { offset: usize, found: u8 },

    /// The tag byte is not one this decoder understands.
    #[error("unsupported term type {tag} at offset {offset}")]
    UnsupportedTag { tag: u8, offset: usize },

    /// A big integer is wider than the decoder reconstructs.
    #[error("unable to decode big int of {digits} bytes at offset {offset} (max 8)")]
    UnsupportedBigInt { digits: usize, offset: usize },

    /// A FLOAT_EXT payload is not a decimal float literal.
    #[error("invalid float encoded at offset {offset}")]
    InvalidFloat { offset: usize },

    /// A UTF-8 atom holds bytes that are not valid UTF-8.
    #[error("invalid utf-8 atom at offset {offset}")]
    InvalidUtf8 { offset: usize },

    /// The compressed payload could not be inflated into exactly one term.
    #[error("failed to uncompress term at offset {offset}: {reason}")]
    DecompressionFailure { offset: usize, reason: String },

    /// Container nesting went deeper than the configured depth limit.
    #[error("reached recursion limit ({limit} levels)")]
    RecursionLimitExceeded { limit: usize },
}

impl DecodeError {
    /// Returns true if the input ended before the term was complete.
    pub fn is_truncation(&self) -> bool {
        matches!(self, DecodeError::BufferUnderrun { .. })
    }

    /// Returns true for term types this decoder does not handle, including
    /// big integers wider than 64 bits.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            DecodeError::UnsupportedTag { .. } | DecodeError::UnsupportedBigInt { .. }
        )
    }
}

pub type EncodeResult<T> = std::result::Result<T, EncodeError>;
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = DecodeError::BufferUnderrun {
            offset: 5,
            needed: 4,
            len: 7,
        };
        assert_eq!(
            err.to_string(),
            "reading 4 bytes at offset 5 passes the end of the buffer (7 bytes)"
        );
        assert!(err.is_truncation());

        let err = DecodeError::VersionMismatch { found: 130 };
        assert_eq!(err.to_string(), "bad version number 130 (expected 131)");
        assert!(!err.is_truncation());
        assert!(!err.is_unsupported());

        let err = EncodeError::SizeLimitExceeded {
            kind: "list",
            len: 5_000_000_000,
        };
        assert_eq!(
            err.to_string(),
            "list is too large (5000000000 elements, max 4294967295)"
        );
    }

    #[test]
    fn wide_big_ints_count_as_unsupported() {
        assert!(DecodeError::UnsupportedTag { tag: 0xFF, offset: 1 }.is_unsupported());
        assert!(DecodeError::UnsupportedBigInt { digits: 9, offset: 1 }.is_unsupported());
        assert!(!DecodeError::InvalidFloat { offset: 1 }.is_unsupported());
    }
}
