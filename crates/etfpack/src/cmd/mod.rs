use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand, ValueEnum};
use etfpack::codec::{LegacyString, DEFAULT_DEPTH_LIMIT, DEFAULT_MAX_INFLATED_SIZE};
use etfpack::frame::PacketHeader;

use crate::exit::{io_error, CliResult};
use crate::output::OutputFormat;

#[cfg(unix)]
pub mod echo;
pub mod pack;
pub mod unpack;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode a JSON document as an external term.
    Pack(PackArgs),
    /// Decode an external term and print it.
    Unpack(UnpackArgs),
    /// Echo packet-framed terms on a Unix socket.
    #[cfg(unix)]
    Echo(EchoArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Pack(args) => pack::run(args, format),
        Command::Unpack(args) => unpack::run(args, format),
        #[cfg(unix)]
        Command::Echo(args) => echo::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct PackArgs {
    /// Inline JSON document. Default: read from stdin.
    #[arg(long, conflicts_with = "file")]
    pub json: Option<String>,
    /// Read the JSON document from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Maximum container nesting.
    #[arg(long, default_value_t = DEFAULT_DEPTH_LIMIT)]
    pub depth_limit: usize,
}

#[derive(Args, Debug)]
pub struct UnpackArgs {
    /// Hex-encoded term. Default: read raw bytes from stdin.
    #[arg(long, conflicts_with = "file")]
    pub hex: Option<String>,
    /// Read the raw term from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// How STRING_EXT terms are decoded.
    #[arg(long, value_enum, default_value = "list")]
    pub legacy_string: LegacyStringArg,
    /// Maximum container nesting.
    #[arg(long, default_value_t = DEFAULT_DEPTH_LIMIT)]
    pub depth_limit: usize,
    /// Largest uncompressed size a compressed term may declare, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_INFLATED_SIZE)]
    pub max_inflated_size: usize,
}

#[derive(Args, Debug)]
pub struct EchoArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Length header width, as in `{packet, N}`.
    #[arg(long, value_enum, default_value = "4")]
    pub packet: PacketArg,
    /// Exit after echoing N terms.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show build details.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LegacyStringArg {
    List,
    Binary,
}

impl From<LegacyStringArg> for LegacyString {
    fn from(arg: LegacyStringArg) -> Self {
        match arg {
            LegacyStringArg::List => LegacyString::List,
            LegacyStringArg::Binary => LegacyString::Binary,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PacketArg {
    #[value(name = "1")]
    One,
    #[value(name = "2")]
    Two,
    #[value(name = "4")]
    Four,
}

impl From<PacketArg> for PacketHeader {
    fn from(arg: PacketArg) -> Self {
        match arg {
            PacketArg::One => PacketHeader::One,
            PacketArg::Two => PacketHeader::Two,
            PacketArg::Four => PacketHeader::Four,
        }
    }
}

/// Read a whole file, or all of stdin when no path is given.
pub fn read_input(file: Option<&Path>) -> CliResult<Vec<u8>> {
    match file {
        Some(path) => std::fs::read(path)
            .map_err(|err| io_error(&format!("read {} failed", path.display()), err)),
        None => {
            let mut data = Vec::new();
            std::io::stdin()
                .lock()
                .read_to_end(&mut data)
                .map_err(|err| io_error("read stdin failed", err))?;
            Ok(data)
        }
    }
}
