//! Wire format table and the shared numeric helpers.
//!
//! Every multi-byte integer and length on the wire is big-endian, except the
//! magnitude of a big integer, which is little-endian base 256.

/// Leading byte of every top-level encoded term.
pub const FORMAT_VERSION: u8 = 131;

pub const NEW_FLOAT_EXT: u8 = 70;
pub const COMPRESSED: u8 = 80;
pub const NEW_PID_EXT: u8 = 88;
pub const NEW_PORT_EXT: u8 = 89;
pub const NEWER_REFERENCE_EXT: u8 = 90;
pub const SMALL_INTEGER_EXT: u8 = 97;
pub const INTEGER_EXT: u8 = 98;
pub const FLOAT_EXT: u8 = 99;
pub const ATOM_EXT: u8 = 100;
pub const REFERENCE_EXT: u8 = 101;
pub const PORT_EXT: u8 = 102;
pub const PID_EXT: u8 = 103;
pub const SMALL_TUPLE_EXT: u8 = 104;
pub const LARGE_TUPLE_EXT: u8 = 105;
pub const NIL_EXT: u8 = 106;
pub const STRING_EXT: u8 = 107;
pub const LIST_EXT: u8 = 108;
pub const BINARY_EXT: u8 = 109;
pub const SMALL_BIG_EXT: u8 = 110;
pub const LARGE_BIG_EXT: u8 = 111;
pub const EXPORT_EXT: u8 = 113;
pub const NEW_REFERENCE_EXT: u8 = 114;
pub const SMALL_ATOM_EXT: u8 = 115;
pub const MAP_EXT: u8 = 116;
pub const ATOM_UTF8_EXT: u8 = 118;
pub const SMALL_ATOM_UTF8_EXT: u8 = 119;

/// Width of the legacy text float payload (FLOAT_EXT).
pub const LEGACY_FLOAT_LEN: usize = 31;

/// Widest big-integer magnitude the decoder reconstructs, in digits (bytes).
pub const MAX_BIG_DIGITS: usize = 8;

/// Atom texts folded into non-string values on decode.
pub const ATOM_NIL: &[u8] = b"nil";
pub const ATOM_NULL: &[u8] = b"null";
pub const ATOM_TRUE: &[u8] = b"true";
pub const ATOM_FALSE: &[u8] = b"false";

/// Returns a human-readable name for a tag byte.
pub fn tag_name(tag: u8) -> &'static str {
    match tag {
        NEW_FLOAT_EXT => "NEW_FLOAT_EXT",
        COMPRESSED => "COMPRESSED",
        NEW_PID_EXT => "NEW_PID_EXT",
        NEW_PORT_EXT => "NEW_PORT_EXT",
        NEWER_REFERENCE_EXT => "NEWER_REFERENCE_EXT",
        SMALL_INTEGER_EXT => "SMALL_INTEGER_EXT",
        INTEGER_EXT => "INTEGER_EXT",
        FLOAT_EXT => "FLOAT_EXT",
        ATOM_EXT => "ATOM_EXT",
        REFERENCE_EXT => "REFERENCE_EXT",
        PORT_EXT => "PORT_EXT",
        PID_EXT => "PID_EXT",
        SMALL_TUPLE_EXT => "SMALL_TUPLE_EXT",
        LARGE_TUPLE_EXT => "LARGE_TUPLE_EXT",
        NIL_EXT => "NIL_EXT",
        STRING_EXT => "STRING_EXT",
        LIST_EXT => "LIST_EXT",
        BINARY_EXT => "BINARY_EXT",
        SMALL_BIG_EXT => "SMALL_BIG_EXT",
        LARGE_BIG_EXT => "LARGE_BIG_EXT",
        EXPORT_EXT => "EXPORT_EXT",
        NEW_REFERENCE_EXT => "NEW_REFERENCE_EXT",
        SMALL_ATOM_EXT => "SMALL_ATOM_EXT",
        MAP_EXT => "MAP_EXT",
        ATOM_UTF8_EXT => "ATOM_UTF8_EXT",
        SMALL_ATOM_UTF8_EXT => "SMALL_ATOM_UTF8_EXT",
        _ => "UNKNOWN",
    }
}

/// Store a double as its big-endian IEEE-754 bit pattern.
pub fn f64_to_wire(value: f64) -> [u8; 8] {
    value.to_bits().to_be_bytes()
}

/// Load a double from its big-endian IEEE-754 bit pattern.
pub fn f64_from_wire(bytes: [u8; 8]) -> f64 {
    f64::from_bits(u64::from_be_bytes(bytes))
}

/// Parse the 31-byte FLOAT_EXT text (e.g. `"2.50000000000000000000e+00"`,
/// NUL padded).
pub fn parse_legacy_float(text: &[u8]) -> Option<f64> {
    let end = text.iter().position(|&b| b == 0).unwrap_or(text.len());
    std::str::from_utf8(&text[..end])
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
}

/// Little-endian base-256 digits of `magnitude`, without trailing zero digits.
///
/// Returns the digit buffer and the number of digits used. Zero has no digits.
pub fn big_digits(mut magnitude: u64) -> ([u8; MAX_BIG_DIGITS], usize) {
    let mut digits = [0u8; MAX_BIG_DIGITS];
    let mut count = 0;
    while magnitude > 0 {
        digits[count] = (magnitude & 0xFF) as u8;
        magnitude >>= 8;
        count += 1;
    }
    (digits, count)
}

/// Reassemble a magnitude from at most [`MAX_BIG_DIGITS`] little-endian digits.
pub fn big_magnitude(digits: &[u8]) -> u64 {
    debug_assert!(digits.len() <= MAX_BIG_DIGITS);
    digits
        .iter()
        .rev()
        .fold(0u64, |acc, &digit| (acc << 8) | u64::from(digit))
}
