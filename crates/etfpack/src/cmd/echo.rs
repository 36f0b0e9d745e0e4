use std::io;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use etfpack::frame::{PacketConfig, PacketError, TermReader, TermWriter};
use etfpack::{Map, Value};

use crate::cmd::EchoArgs;
use crate::exit::{io_error, packet_error, CliError, CliResult, INTERNAL, SUCCESS};

enum ReadErrorDisposition {
    Break,
    Reply(Value),
    Fatal(CliError),
}

/// Removes the socket file when the echo loop ends, on every exit path.
#[derive(Debug)]
struct SocketFile(PathBuf);

impl Drop for SocketFile {
    fn drop(&mut self) {
        if let Ok(metadata) = std::fs::symlink_metadata(&self.0) {
            if metadata.file_type().is_socket() {
                tracing::debug!(path = %self.0.display(), "removing socket file");
                let _ = std::fs::remove_file(&self.0);
            }
        }
    }
}

/// Bind `path`, replacing a socket left behind by an earlier run.
/// Any other kind of file at `path` is left alone.
fn bind_socket(path: &Path) -> CliResult<(UnixListener, SocketFile)> {
    match std::fs::symlink_metadata(path) {
        Ok(metadata) if metadata.file_type().is_socket() => {
            tracing::debug!(path = %path.display(), "removing stale socket");
            std::fs::remove_file(path).map_err(|err| io_error("stale socket removal failed", err))?;
        }
        Ok(_) => {
            return Err(io_error(
                "bind failed",
                io::Error::new(io::ErrorKind::AlreadyExists, "existing path is not a unix socket"),
            ));
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(io_error("bind failed", err)),
    }

    let listener = UnixListener::bind(path).map_err(|err| io_error("bind failed", err))?;
    Ok((listener, SocketFile(path.to_path_buf())))
}

pub fn run(args: EchoArgs) -> CliResult<i32> {
    let (listener, _socket_file) = bind_socket(&args.path)?;
    tracing::info!(path = %args.path.display(), "listening");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let config = PacketConfig {
        header: args.packet.into(),
        ..PacketConfig::default()
    };
    let mut echoed = 0usize;

    'accept: while running.load(Ordering::SeqCst) {
        let (stream, _) = listener
            .accept()
            .map_err(|err| io_error("accept failed", err))?;
        let write_half = stream
            .try_clone()
            .map_err(|err| io_error("socket clone failed", err))?;
        let mut reader = TermReader::with_config(stream, config);
        let mut writer = TermWriter::with_config(write_half, config);

        while running.load(Ordering::SeqCst) {
            let value = match reader.read_term() {
                Ok(value) => value,
                Err(err) => match classify_read_error(err) {
                    ReadErrorDisposition::Break => break,
                    ReadErrorDisposition::Reply(reply) => {
                        if let Err(send_err) = writer.write_term(&reply) {
                            tracing::warn!(error = %send_err, "failed sending error reply");
                        }
                        continue;
                    }
                    ReadErrorDisposition::Fatal(cli_err) => return Err(cli_err),
                },
            };

            tracing::info!(kind = value.type_name(), "echoing term");
            writer
                .write_term(&value)
                .map_err(|err| packet_error("echo send failed", err))?;

            echoed += 1;
            if args.count.is_some_and(|count| echoed >= count) {
                break 'accept;
            }
        }
    }

    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

/// A packet whose body is not a valid term is answered with `{"error": reason}`;
/// the stream is still aligned on the next packet.
fn classify_read_error(err: PacketError) -> ReadErrorDisposition {
    match err {
        PacketError::ConnectionClosed => ReadErrorDisposition::Break,
        PacketError::Decode(err) => {
            tracing::warn!(error = %err, "received invalid term");
            let mut reply = Map::new();
            reply.insert("error", err.to_string());
            ReadErrorDisposition::Reply(Value::Map(reply))
        }
        PacketError::PacketTooLarge { .. } => {
            tracing::warn!(error = %err, "dropping connection");
            ReadErrorDisposition::Break
        }
        other => ReadErrorDisposition::Fatal(packet_error("receive failed", other)),
    }
}

#[cfg(test)]
mod tests {
    use etfpack::DecodeError;

    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("etfpack-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn stale_socket_is_replaced() {
        let dir = scratch_dir("stale");
        let path = dir.join("echo.sock");

        // A listener dropped without unlinking leaves its file behind.
        drop(UnixListener::bind(&path).unwrap());
        assert!(path.exists());
        assert!(UnixListener::bind(&path).is_err());

        let (_listener, socket_file) = bind_socket(&path).unwrap();
        assert!(path.exists());

        drop(socket_file);
        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn regular_file_is_not_replaced() {
        let dir = scratch_dir("regular");
        let path = dir.join("not-a-socket");
        std::fs::write(&path, b"keep").unwrap();

        let err = bind_socket(&path).unwrap_err();
        assert!(err.message.starts_with("bind failed"));
        assert_eq!(std::fs::read(&path).unwrap(), b"keep");

        drop(SocketFile(path.clone()));
        assert!(path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn closed_connection_breaks_loop() {
        assert!(matches!(
            classify_read_error(PacketError::ConnectionClosed),
            ReadErrorDisposition::Break
        ));
    }

    #[test]
    fn invalid_term_gets_an_error_reply() {
        let disposition =
            classify_read_error(PacketError::Decode(DecodeError::UnsupportedTag {
                tag: 1,
                offset: 1,
            }));
        let reply = match disposition {
            ReadErrorDisposition::Reply(reply) => reply,
            _ => panic!("expected reply disposition"),
        };
        assert_eq!(
            reply.as_map().unwrap().get(&"error".into()),
            Some(&Value::from("unsupported term type 1 at offset 1"))
        );
    }

    #[test]
    fn io_error_is_fatal() {
        let disposition = classify_read_error(PacketError::Io(std::io::Error::other("boom")));
        assert!(matches!(disposition, ReadErrorDisposition::Fatal(_)));
    }
}
