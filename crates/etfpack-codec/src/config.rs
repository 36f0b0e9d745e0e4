/// Default container nesting limit for both packing and unpacking.
pub const DEFAULT_DEPTH_LIMIT: usize = 256;

/// Default initial output buffer size for a pack call.
pub const DEFAULT_INITIAL_CAPACITY: usize = 1024;

/// Default cap on the declared size of a compressed term's payload: 16 MiB.
pub const DEFAULT_MAX_INFLATED_SIZE: usize = 16 * 1024 * 1024;

/// Configuration for the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackConfig {
    /// Maximum container nesting. Default: 256.
    pub depth_limit: usize,
    /// Bytes reserved up front for the output buffer. Default: 1 KiB.
    pub initial_capacity: usize,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            depth_limit: DEFAULT_DEPTH_LIMIT,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
        }
    }
}

/// How STRING_EXT (a compact list of bytes) is decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LegacyString {
    /// A list of integers in `0..=255`, one per byte.
    #[default]
    List,
    /// The raw bytes, as a string when they are valid UTF-8 and as a binary otherwise.
    Binary,
}

/// Configuration for the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnpackConfig {
    /// Maximum container nesting. Default: 256.
    pub depth_limit: usize,
    /// Largest uncompressed size a compressed term may declare. Default: 16 MiB.
    pub max_inflated_size: usize,
    /// STRING_EXT decode policy. Default: [`LegacyString::List`].
    pub legacy_string: LegacyString,
}

impl Default for UnpackConfig {
    fn default() -> Self {
        Self {
            depth_limit: DEFAULT_DEPTH_LIMIT,
            max_inflated_size: DEFAULT_MAX_INFLATED_SIZE,
            legacy_string: LegacyString::default(),
        }
    }
}
