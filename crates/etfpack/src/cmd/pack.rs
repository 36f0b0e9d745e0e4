use etfpack::{pack_with, PackConfig, Value};

use crate::cmd::{read_input, PackArgs};
use crate::exit::{encode_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_packed, OutputFormat};

pub fn run(args: PackArgs, format: OutputFormat) -> CliResult<i32> {
    let input = match args.json {
        Some(json) => json.into_bytes(),
        None => read_input(args.file.as_deref())?,
    };

    let value = parse_json(&input)?;
    let config = PackConfig {
        depth_limit: args.depth_limit,
        ..PackConfig::default()
    };
    let bytes = pack_with(&value, &config).map_err(|err| encode_error("pack failed", err))?;

    tracing::debug!(size = bytes.len(), kind = value.type_name(), "packed input");
    print_packed(&bytes, format);
    Ok(SUCCESS)
}

fn parse_json(input: &[u8]) -> CliResult<Value> {
    serde_json::from_slice(input)
        .map_err(|err| CliError::new(DATA_INVALID, format!("invalid JSON input: {err}")))
}
