#![cfg(feature = "cli")]

use std::io::Write;
use std::net::TcpStream;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use cellprobe_codec::{decode_snapshot, SnapshotSummary};
use cellprobe_frame::{CONTROL, TELEMETRY};
use cellprobe_session::{CollectorListener, Session, SessionConfig};

const FIXTURE: &str = r#"{
    "network": {"operatorName": "MTS", "networkType": "4G", "roaming": false, "signalLevel": "LTE Signal"},
    "cells": [
        {
            "registered": true,
            "level": {"dbm": -95, "asu": 45, "bars": 3},
            "radio": {"technology": "LTE", "rsrp": -95, "rsrq": -10, "rssnr": 12, "earfcn": 1300},
            "identity": {"mcc": "250", "mnc": "01", "cellId": 2801, "pci": 120, "tac": 7701}
        },
        {
            "level": {"dbm": -108, "asu": 32, "bars": 1},
            "radio": {"technology": "NR", "ssRsrp": -108, "nrarfcn": 632628}
        }
    ]
}"#;

const SNAPSHOT: &[u8] = br#"{"time":1700000000000,"operator":"MTS","networkType":"4G","cellsCount":1,"device":"Android","cells":[{"tech":"LTE","isMain":true,"signal":-95,"asu":45,"level":3,"rsrp":-95,"rsrq":-10,"rssnr":null,"earfcn":1300,"mcc":"250","mnc":"01","ci":null,"pci":120,"tac":7701}]}"#;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "cellprobe-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn write_fixture(tag: &str) -> (PathBuf, PathBuf) {
    let dir = unique_temp_dir(tag);
    let path = dir.join("cells.json");
    std::fs::write(&path, FIXTURE).expect("fixture should be writable");
    (dir, path)
}

fn cellprobe() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cellprobe"));
    cmd.arg("--log-level").arg("error");
    cmd
}

/// Serve agents until `snapshots` telemetry frames have been acknowledged.
fn spawn_collector(snapshots: usize) -> (String, thread::JoinHandle<Vec<SnapshotSummary>>) {
    let listener = CollectorListener::bind("127.0.0.1:0").expect("collector should bind");
    let addr = listener.local_addr().to_string();

    let handle = thread::spawn(move || {
        let mut received = Vec::new();
        while received.len() < snapshots {
            let Ok(mut peer) = listener.accept() else {
                break;
            };
            while received.len() < snapshots {
                let Ok(request) = peer.serve_one(|_| b"ack".to_vec()) else {
                    break;
                };
                if request.channel == TELEMETRY {
                    received.push(decode_snapshot(&request.payload).expect("snapshot decodes"));
                }
            }
        }
        received
    });

    (addr, handle)
}

fn free_addr() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("port should be free");
    listener.local_addr().expect("local addr").to_string()
}

#[test]
fn version_prints_package_version() {
    let output = cellprobe().arg("version").output().expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("cellprobe {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn probe_against_collector_reports_connected() {
    let listener = CollectorListener::bind("127.0.0.1:0").expect("collector should bind");
    let addr = listener.local_addr().to_string();
    let server = thread::spawn(move || {
        let mut peer = listener.accept().expect("agent should connect");
        let probe = peer.serve_one(|_| b"ok".to_vec()).expect("probe arrives");
        assert_eq!(probe.channel, CONTROL);
    });

    let output = cellprobe()
        .args(["--format", "json", "probe", "--addr", &addr, "--timeout", "2s"])
        .output()
        .expect("probe should run");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"connected\":true"));
    assert!(stdout.contains(&addr));
    server.join().expect("collector thread");
}

#[test]
fn probe_refused_exits_with_transport_error() {
    let addr = free_addr();
    let output = cellprobe()
        .args(["probe", "--addr", &addr, "--timeout", "1s"])
        .output()
        .expect("probe should run");

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("probe failed"));
}

#[test]
fn send_delivers_fixture_snapshot() {
    let (dir, fixture) = write_fixture("send");
    let (addr, collector) = spawn_collector(1);

    let output = cellprobe()
        .args(["--format", "json", "send", "--addr", &addr, "--device", "Pixel"])
        .arg("--fixture")
        .arg(&fixture)
        .output()
        .expect("send should run");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"ack\":\"ack\""));
    assert!(stdout.contains("\"cells\":2"));

    let received = collector.join().expect("collector thread");
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].cells_count, 2);
    assert_eq!(received[0].device, "Pixel");
    assert_eq!(received[0].operator.as_deref(), Some("MTS"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn send_with_missing_fixture_is_data_invalid() {
    let (addr, _collector) = spawn_collector(1);
    let output = cellprobe()
        .args(["send", "--addr", &addr, "--fixture", "/nonexistent/cellprobe.json"])
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn collect_acknowledges_and_prints_snapshots() {
    let addr = free_addr();
    let mut child = cellprobe()
        .args(["--format", "json", "collect", &addr, "--count", "1"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("collect should start");

    let mut session = Session::new(
        SessionConfig::with_addr(addr.clone()).with_timeout(Duration::from_secs(2)),
    );
    let start = Instant::now();
    while session.connect().is_err() {
        assert!(
            start.elapsed() < Duration::from_secs(3),
            "collector never came up"
        );
        thread::sleep(Duration::from_millis(25));
    }

    let reply = session.exchange(SNAPSHOT).expect("collector should reply");
    assert_eq!(reply.as_ref(), b"ack");

    let output = child.wait_with_output().expect("collect should exit");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"peer_id\":\"agent-"));
    assert!(stdout.contains("\"cellsCount\":1"));
}

#[test]
fn collect_keeps_serving_after_a_broken_agent() {
    let addr = free_addr();
    let child = cellprobe()
        .args(["--format", "json", "collect", &addr, "--count", "1"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("collect should start");

    let start = Instant::now();
    let mut broken = loop {
        match TcpStream::connect(&addr) {
            Ok(stream) => break stream,
            Err(err) => {
                assert!(
                    start.elapsed() < Duration::from_secs(3),
                    "collector never came up: {err}"
                );
                thread::sleep(Duration::from_millis(25));
            }
        }
    };
    broken
        .write_all(b"not a frame at all")
        .expect("garbage should send");
    broken.flush().expect("garbage should flush");

    let mut session = Session::new(
        SessionConfig::with_addr(addr.clone()).with_timeout(Duration::from_secs(3)),
    );
    session.connect().expect("collector should accept the next agent");
    let reply = session.exchange(SNAPSHOT).expect("collector should reply");
    assert_eq!(reply.as_ref(), b"ack");
    drop(broken);

    let output = child.wait_with_output().expect("collect should exit");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"cellsCount\":1"));
}

#[test]
fn run_stops_after_requested_cycles() {
    let (dir, fixture) = write_fixture("run");
    let (addr, collector) = spawn_collector(2);

    let output = cellprobe()
        .args(["--format", "json", "run", "--addr", &addr])
        .args(["--initial-delay", "10ms", "--interval", "50ms", "--cycles", "2"])
        .arg("--fixture")
        .arg(&fixture)
        .output()
        .expect("run should complete");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"cycles\":2"));
    assert!(stdout.contains("\"network_label\":\"MTS - 4G\""));

    let received = collector.join().expect("collector thread");
    assert_eq!(received.len(), 2);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn invalid_duration_is_a_usage_error() {
    let output = cellprobe()
        .args(["probe", "--timeout", "0s"])
        .output()
        .expect("probe should run");
    assert_eq!(output.status.code(), Some(64));
}
