use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use etfpack::Value;
use serde::Serialize;

use crate::exit::{CliError, CliResult, DATA_INVALID};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct PackedOutput {
    size: usize,
    hex: String,
}

/// Print an encoded term. `Raw` writes the bytes unchanged.
pub fn print_packed(bytes: &[u8], format: OutputFormat) {
    let hex = hex::encode(bytes);
    match format {
        OutputFormat::Json => {
            let out = PackedOutput {
                size: bytes.len(),
                hex,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SIZE", "HEX"])
                .add_row(vec![bytes.len().to_string(), hex]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("size={} hex={hex}", bytes.len()),
        OutputFormat::Raw => print_raw(bytes),
    }
}

/// Print a decoded term.
///
/// JSON output fails for maps whose keys have no JSON form (lists, maps, floats).
pub fn print_value(value: &Value, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => println!("{}", to_json(value)?),
        OutputFormat::Table => println!("{}", value_table(value)),
        OutputFormat::Pretty => {
            let text = serde_json::to_string_pretty(value).map_err(json_error)?;
            println!("{text}");
        }
        OutputFormat::Raw => println!("{value:?}"),
    }
    Ok(())
}

fn value_table(value: &Value) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["KEY", "TYPE", "VALUE"]);

    match value {
        Value::Map(map) => {
            for (key, item) in map.iter() {
                table.add_row(vec![preview(key), item.type_name().to_string(), preview(item)]);
            }
        }
        Value::List(items) => {
            for (index, item) in items.iter().enumerate() {
                table.add_row(vec![
                    index.to_string(),
                    item.type_name().to_string(),
                    preview(item),
                ]);
            }
        }
        scalar => {
            table.add_row(vec![
                "-".to_string(),
                scalar.type_name().to_string(),
                preview(scalar),
            ]);
        }
    }
    table
}

fn preview(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Binary(b) => format!("<binary {} bytes>", b.len()),
        other => to_json(other).unwrap_or_else(|_| format!("{other:?}")),
    }
}

fn to_json(value: &Value) -> CliResult<String> {
    serde_json::to_string(value).map_err(json_error)
}

fn json_error(err: serde_json::Error) -> CliError {
    CliError::new(DATA_INVALID, format!("term has no JSON form: {err}"))
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}
