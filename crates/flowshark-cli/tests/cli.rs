use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use etherparse::PacketBuilder;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("flowshark"))
}

fn pcap_bytes(frames: &[(u32, u32, Vec<u8>)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0xa1b2_c3d4u32.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes());
    out.extend_from_slice(&[0u8; 8]);
    out.extend_from_slice(&65535u32.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    for (secs, micros, data) in frames {
        out.extend_from_slice(&secs.to_le_bytes());
        out.extend_from_slice(&micros.to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
    }
    out
}

fn tcp_frame(payload: usize) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
        .ipv4([10, 0, 0, 1], [93, 184, 216, 34], 64)
        .tcp(51000, 443, 1, 1024)
        .ack(1);
    let mut packet = Vec::new();
    builder.write(&mut packet, &vec![0u8; payload]).expect("tcp frame");
    packet
}

fn udp_frame(payload: usize) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
        .ipv4([10, 0, 0, 2], [170, 114, 10, 1], 64)
        .udp(6000, 8801);
    let mut packet = Vec::new();
    builder.write(&mut packet, &vec![0u8; payload]).expect("udp frame");
    packet
}

/// Chrome: small TCP to 443 starting at t=0. Zoom: large UDP starting at t=100.
fn write_captures(dir: &Path) -> (PathBuf, PathBuf) {
    let chrome: Vec<_> = (0..30).map(|i| (i / 10, (i % 10) * 100_000, tcp_frame(10))).collect();
    let zoom: Vec<_> = (0..30)
        .map(|i| (100 + i / 10, (i % 10) * 100_000 + 50_000, udp_frame(900)))
        .collect();
    let chrome_path = dir.join("Chrome.pcap");
    let zoom_path = dir.join("Zoom.pcap");
    fs::write(&chrome_path, pcap_bytes(&chrome)).expect("write chrome");
    fs::write(&zoom_path, pcap_bytes(&zoom)).expect("write zoom");
    (chrome_path, zoom_path)
}

fn extract_dataset(temp: &TempDir) -> PathBuf {
    let (chrome, zoom) = write_captures(temp.path());
    let dataset = temp.path().join("out").join("dataset.csv");
    cmd()
        .arg("extract")
        .arg("--app")
        .arg(format!("Chrome={}", chrome.display()))
        .arg("--app")
        .arg(format!("Zoom={}", zoom.display()))
        .arg("-o")
        .arg(temp.path().join("out").join("traffic.csv"))
        .arg("--dataset")
        .arg(&dataset)
        .arg("--quiet")
        .assert()
        .success();
    dataset
}

#[test]
fn help_lists_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("extract").and(contains("classify")));
    cmd().arg("classify").arg("--help").assert().success();
}

#[test]
fn extract_writes_traffic_dataset_and_summary() {
    let temp = TempDir::new().expect("tempdir");
    let (chrome, zoom) = write_captures(temp.path());
    let traffic = temp.path().join("traffic.csv");
    let dataset = temp.path().join("dataset.csv");
    let summary = temp.path().join("report.json");

    cmd()
        .arg("extract")
        .arg("--app")
        .arg(format!("Chrome={}", chrome.display()))
        .arg("--app")
        .arg(format!("Zoom={}", zoom.display()))
        .arg("-o")
        .arg(&traffic)
        .arg("--dataset")
        .arg(&dataset)
        .arg("--summary")
        .arg(&summary)
        .assert()
        .success()
        .stderr(contains("label 0 = Chrome").and(contains("OK: 60 packet(s)")));

    let traffic = fs::read_to_string(traffic).expect("traffic csv");
    assert!(traffic.starts_with(
        "Timestamp,Packet_Size,Src_IP,Dst_IP,Src_Port,Dst_Port,Protocol,TCP_Flags,App"
    ));
    assert_eq!(traffic.lines().count(), 61);

    let dataset = fs::read_to_string(dataset).expect("dataset csv");
    assert!(dataset.lines().next().unwrap().contains("Flow ID Hash"));

    let report: Value =
        serde_json::from_str(&fs::read_to_string(summary).expect("summary")).expect("json");
    assert_eq!(report["apps"][0]["app"], "Chrome");
    assert_eq!(report["apps"][0]["tls_packets"], 30);
    assert_eq!(report["inputs"].as_array().unwrap().len(), 2);
}

#[test]
fn extract_discovers_directory() {
    let temp = TempDir::new().expect("tempdir");
    write_captures(temp.path());
    let traffic = temp.path().join("traffic.csv");
    cmd()
        .arg("extract")
        .arg("--dir")
        .arg(temp.path())
        .arg("-o")
        .arg(&traffic)
        .arg("--quiet")
        .assert()
        .success()
        .stderr(contains("OK:").not());
    let traffic = fs::read_to_string(traffic).expect("traffic csv");
    assert!(traffic.contains(",Chrome"));
    assert!(traffic.contains(",Zoom"));
}

#[test]
fn extract_skips_missing_capture() {
    let temp = TempDir::new().expect("tempdir");
    let (chrome, _) = write_captures(temp.path());
    cmd()
        .arg("extract")
        .arg("--app")
        .arg(format!("Chrome={}", chrome.display()))
        .arg("--app")
        .arg(format!("Zoom={}", temp.path().join("missing.pcap").display()))
        .arg("-o")
        .arg(temp.path().join("traffic.csv"))
        .assert()
        .success()
        .stderr(contains("missing.pcap").and(contains("OK: 30 packet(s) from 1 capture(s)")));
}

#[test]
fn extract_fails_when_nothing_decodes() {
    let temp = TempDir::new().expect("tempdir");
    cmd()
        .arg("extract")
        .arg("--app")
        .arg(format!("Zoom={}", temp.path().join("missing.pcap").display()))
        .arg("-o")
        .arg(temp.path().join("traffic.csv"))
        .assert()
        .code(2)
        .stderr(contains("error:").and(contains("hint:")));
}

#[test]
fn extract_rejects_malformed_app_spec() {
    let temp = TempDir::new().expect("tempdir");
    cmd()
        .arg("extract")
        .arg("--app")
        .arg("chrome.pcap")
        .arg("-o")
        .arg(temp.path().join("traffic.csv"))
        .assert()
        .code(2)
        .stderr(contains("invalid --app value").and(contains("NAME=PATH")));
}

#[test]
fn classify_prints_accuracy_per_hypothesis() {
    let temp = TempDir::new().expect("tempdir");
    let dataset = extract_dataset(&temp);

    let run = || {
        let assert = cmd().arg("classify").arg(&dataset).assert().success();
        String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout")
    };
    let first = run();
    assert!(first.contains("Accuracy for Case 1 (Flow ID included): "));
    assert!(first.contains("Accuracy for Case 2 (Without Flow ID): "));
    assert_eq!(first, run());
}

#[test]
fn classify_json_output() {
    let temp = TempDir::new().expect("tempdir");
    let dataset = extract_dataset(&temp);
    let assert = cmd()
        .arg("classify")
        .arg(&dataset)
        .arg("--json")
        .arg("--parallel")
        .arg("--trees")
        .arg("3")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    let report: Value = serde_json::from_str(&stdout).expect("valid json");
    assert_eq!(report["rows"], 60);
    assert_eq!(report["outcomes"].as_array().unwrap().len(), 2);
    assert!(report["outcomes"][0]["accuracy"].is_number());
}

#[test]
fn classify_reports_missing_columns() {
    let temp = TempDir::new().expect("tempdir");
    let dataset = temp.path().join("dataset.csv");
    fs::write(
        &dataset,
        "Timestamp,Size,Source IP,Dest IP,Source Port,Dest Port\n1.0,60,10.0.0.1,10.0.0.2,1,2\n",
    )
    .expect("write dataset");
    cmd()
        .arg("classify")
        .arg(&dataset)
        .assert()
        .code(2)
        .stderr(contains("error: dataset is missing required column(s): Classification").and(contains("hint:")));
}

#[test]
fn classify_rejects_single_class() {
    let temp = TempDir::new().expect("tempdir");
    let dataset = temp.path().join("dataset.csv");
    let mut csv = String::from("Timestamp,Size,Source IP,Dest IP,Source Port,Dest Port,Classification\n");
    for i in 0..10 {
        csv.push_str(&format!("{i}.0,60,10.0.0.1,10.0.0.2,51000,443,1\n"));
    }
    fs::write(&dataset, csv).expect("write dataset");
    cmd()
        .arg("classify")
        .arg(&dataset)
        .assert()
        .code(2)
        .stderr(contains("at least 2 distinct labels").and(contains("two applications")));
}

#[test]
fn classify_rejects_invalid_config() {
    let temp = TempDir::new().expect("tempdir");
    let dataset = extract_dataset(&temp);
    let config = temp.path().join("config.json");
    fs::write(&config, r#"{"test_fraction": 1.5}"#).expect("write config");
    cmd()
        .arg("classify")
        .arg(&dataset)
        .arg("--config")
        .arg(&config)
        .assert()
        .code(2)
        .stderr(contains("test_fraction"));
}
