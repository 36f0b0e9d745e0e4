//! Erlang External Term Format encoder and decoder.
//!
//! Converts between a dynamic [`Value`] and the binary format spoken by Erlang
//! nodes and ports (`term_to_binary/1`, `binary_to_term/1`):
//! - Every top-level term starts with the version byte 131
//! - Integers and lengths are big-endian
//! - Compressed terms are inflated transparently on decode
//!
//! ```
//! use etfpack_codec::{pack, unpack, Value};
//!
//! let value = Value::from(vec![Value::from(1), Value::from("two")]);
//! let bytes = pack(&value).unwrap();
//! assert_eq!(unpack(&bytes).unwrap(), value);
//! ```

pub mod config;
pub mod error;
pub mod reader;
#[cfg(feature = "serde")]
mod serde_impl;
pub mod value;
pub mod wire;
pub mod writer;

pub use config::{
    LegacyString, PackConfig, UnpackConfig, DEFAULT_DEPTH_LIMIT, DEFAULT_INITIAL_CAPACITY,
    DEFAULT_MAX_INFLATED_SIZE,
};
pub use error::{DecodeError, DecodeResult, EncodeError, EncodeResult};
pub use reader::{unpack, unpack_with};
pub use value::{Map, Value};
pub use wire::FORMAT_VERSION;
pub use writer::{pack, pack_with};
