//! Async term echo over TCP using the `tokio_util` codec.
//!
//! Run with:
//!   cargo run -p etfpack --example async-echo --features async

use etfpack::frame::{EtfCodec, PacketError};
use etfpack::Value;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

async fn serve(stream: TcpStream) -> Result<(), PacketError> {
    let mut framed = Framed::new(stream, EtfCodec::new());
    while let Some(value) = framed.next().await {
        let value = value?;
        tracing::info!(kind = value.type_name(), "echoing term");
        framed.send(value).await?;
    }
    Ok(())
}

async fn accept_one(listener: TcpListener) -> Result<(), PacketError> {
    let (stream, peer) = listener.accept().await?;
    tracing::info!(%peer, "peer connected");
    serve(stream).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "listening");

    let server = tokio::spawn(accept_one(listener));

    let mut client = Framed::new(TcpStream::connect(addr).await?, EtfCodec::new());
    for request in [Value::from("hello"), Value::from(vec![1.5, 2.5])] {
        client.send(&request).await?;
        if let Some(reply) = client.next().await {
            eprintln!("sent {request:?}, got {:?}", reply?);
        }
    }

    drop(client);
    server.await??;
    Ok(())
}
