#![cfg(all(unix, feature = "cli"))]

use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use etfpack::frame::{TermReader, TermWriter};
use etfpack::{Map, Value};

fn etfpack() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_etfpack"));
    cmd.arg("--log-level").arg("error");
    cmd
}

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "etfpack-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn wait_for_connect(path: &Path, timeout: Duration) -> UnixStream {
    let start = Instant::now();
    loop {
        match UnixStream::connect(path) {
            Ok(stream) => return stream,
            Err(err) => {
                if start.elapsed() >= timeout {
                    panic!("connect timeout: {err}");
                }
                thread::sleep(Duration::from_millis(25));
            }
        }
    }
}

#[test]
fn pack_prints_hex_as_json() {
    let output = etfpack()
        .args(["pack", "--json", r#"{"a": 1}"#, "--format", "json"])
        .output()
        .expect("pack should run");

    assert!(output.status.success());
    let out: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be json");
    assert_eq!(out["size"], 14);
    assert_eq!(out["hex"], "8374000000016d00000001616101");
}

#[test]
fn pack_raw_writes_term_bytes() {
    let output = etfpack()
        .args(["pack", "--json", "[1, null]", "--format", "raw"])
        .output()
        .expect("pack should run");

    assert!(output.status.success());
    assert_eq!(output.stdout, b"\x83l\x00\x00\x00\x02a\x01s\x03nilj");
}

#[test]
fn unpack_prints_json() {
    let output = etfpack()
        .args([
            "unpack",
            "--hex",
            "8374000000016d00000001616101",
            "--format",
            "json",
        ])
        .output()
        .expect("unpack should run");

    assert!(output.status.success());
    let out: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be json");
    assert_eq!(out, serde_json::json!({"a": 1}));
}

#[test]
fn unpack_rejects_bad_version_with_data_invalid() {
    let output = etfpack()
        .args(["unpack", "--hex", "826101", "--format", "json"])
        .output()
        .expect("unpack should run");

    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("bad version number 130"), "{stderr}");
}

#[test]
fn unpack_reads_stdin() {
    use std::io::Write;

    let mut child = etfpack()
        .args(["unpack", "--format", "json"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("unpack should start");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(b"\x83k\x00\x03abc")
        .expect("stdin should be writable");

    let output = child.wait_with_output().expect("unpack should finish");
    assert!(output.status.success());
    let out: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be json");
    assert_eq!(out, serde_json::json!([97, 98, 99]));
}

#[test]
fn echo_serves_one_term() {
    let dir = unique_temp_dir("echo");
    let sock_path = dir.join("echo.sock");

    let mut child = etfpack()
        .arg("echo")
        .arg(&sock_path)
        .args(["--count", "1"])
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .expect("echo command should start");

    let stream = wait_for_connect(&sock_path, Duration::from_secs(3));
    let mut writer = TermWriter::new(stream.try_clone().expect("stream should clone"));
    let mut reader = TermReader::new(stream);

    let mut request = Map::new();
    request.insert("op", 1);
    request.insert("d", 251);
    writer
        .write_term(&Value::Map(request.clone()))
        .expect("term should send");
    assert_eq!(
        reader.read_term().expect("echo should reply"),
        Value::Map(request)
    );

    let status = child.wait().expect("echo should exit");
    assert!(status.success());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn echo_reclaims_stale_socket_and_cleans_up() {
    let dir = unique_temp_dir("echo-stale");
    let sock_path = dir.join("echo.sock");
    drop(UnixListener::bind(&sock_path).expect("stale socket should bind"));
    assert!(sock_path.exists());

    let mut child = etfpack()
        .arg("echo")
        .arg(&sock_path)
        .args(["--count", "1"])
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .expect("echo command should start");

    let stream = wait_for_connect(&sock_path, Duration::from_secs(3));
    let mut writer = TermWriter::new(stream.try_clone().expect("stream should clone"));
    let mut reader = TermReader::new(stream);
    writer.write_term(&Value::Int(7)).expect("term should send");
    assert_eq!(reader.read_term().expect("echo should reply"), Value::Int(7));

    let status = child.wait().expect("echo should exit");
    assert!(status.success());
    assert!(!sock_path.exists());
    let _ = std::fs::remove_dir_all(&dir);
}
