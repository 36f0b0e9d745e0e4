use etfpack::{unpack_with, UnpackConfig};

use crate::cmd::{read_input, UnpackArgs};
use crate::exit::{decode_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_value, OutputFormat};

pub fn run(args: UnpackArgs, format: OutputFormat) -> CliResult<i32> {
    let data = match &args.hex {
        Some(text) => parse_hex(text)?,
        None => read_input(args.file.as_deref())?,
    };

    let config = UnpackConfig {
        depth_limit: args.depth_limit,
        max_inflated_size: args.max_inflated_size,
        legacy_string: args.legacy_string.into(),
    };
    let value = unpack_with(&data, &config).map_err(|err| decode_error("unpack failed", err))?;

    tracing::debug!(size = data.len(), kind = value.type_name(), "unpacked input");
    print_value(&value, format)?;
    Ok(SUCCESS)
}

/// Accepts plain hex with optional whitespace, e.g. `83 61 01`.
fn parse_hex(text: &str) -> CliResult<Vec<u8>> {
    let compact: String = text.split_whitespace().collect();
    hex::decode(compact).map_err(|err| CliError::new(USAGE, format!("invalid hex input: {err}")))
}
