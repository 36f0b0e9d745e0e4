//! Blocking term echo over TCP with `{packet, 4}` framing.
//!
//! Run with:
//!   cargo run -p etfpack --example echo
//!
//! An Erlang node can talk to the server with
//! `gen_tcp:connect(Host, Port, [binary, {packet, 4}])` and `term_to_binary/1`.

use std::net::{TcpListener, TcpStream};
use std::thread;

use etfpack::frame::{PacketError, TermReader, TermWriter};
use etfpack::{Map, Value};

fn serve(stream: TcpStream) -> Result<(), PacketError> {
    let mut writer = TermWriter::new(stream.try_clone()?);
    let mut reader = TermReader::new(stream);

    loop {
        match reader.read_term() {
            Ok(value) => {
                tracing::info!(kind = value.type_name(), "echoing term");
                writer.write_term(&value)?;
            }
            Err(PacketError::ConnectionClosed) => return Ok(()),
            Err(err) => return Err(err),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "listening");

    let server = thread::spawn(move || -> Result<(), PacketError> {
        let (stream, peer) = listener.accept()?;
        tracing::info!(%peer, "peer connected");
        serve(stream)
    });

    let stream = TcpStream::connect(addr)?;
    let mut writer = TermWriter::new(stream.try_clone()?);
    let mut reader = TermReader::new(stream);

    let mut identify = Map::new();
    identify.insert("op", 2);
    identify.insert("token", "abc123");
    identify.insert("shard", vec![0, 1]);

    for request in [
        Value::Map(identify),
        Value::from(vec![Value::from("ping"), Value::Int(1_700_000_000_000)]),
        Value::Nil,
    ] {
        writer.write_term(&request)?;
        let reply = reader.read_term()?;
        eprintln!("sent {request:?}, got {reply:?}");
    }

    drop(writer);
    drop(reader);
    server.join().map_err(|_| "server thread panicked")??;
    Ok(())
}
