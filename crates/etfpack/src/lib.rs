//! Erlang External Term Format packing and unpacking.
//!
//! etfpack converts dynamic values to and from the binary term format used by
//! Erlang and Elixir nodes, ports and gateways.
//!
//! # Crate Structure
//!
//! - [`codec`]: `pack` / `unpack`, the [`Value`] model, configuration and errors
//! - [`frame`]: `{packet, N}` length-prefixed terms over byte streams
//!
//! ```
//! use etfpack::{pack, unpack, Map, Value};
//!
//! let mut map = Map::new();
//! map.insert("op", 2);
//! map.insert("d", Value::Nil);
//!
//! let bytes = pack(&Value::Map(map.clone())).unwrap();
//! assert_eq!(unpack(&bytes).unwrap(), Value::Map(map));
//! ```

/// Re-export codec types.
pub mod codec {
    pub use etfpack_codec::*;
}

/// Re-export packet framing types.
pub mod frame {
    pub use etfpack_frame::*;
}

pub use etfpack_codec::{
    pack, pack_with, unpack, unpack_with, DecodeError, EncodeError, Map, PackConfig,
    UnpackConfig, Value,
};
