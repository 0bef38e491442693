//! Runs the `parl-motion` binary end to end against a temporary data tree.

use std::path::Path;
use std::process::{Command, Output};

const DEBATE: &str = r#"{
  "date": "2024-04-24",
  "chamber": "commons",
  "items": [
    {"type": "major_heading", "id": "d.1.0", "text": "Finance Bill"},
    {"type": "speech", "id": "d.1.1", "person_id": "p1", "paragraphs": [
      {"pid": "a1.1/1", "text": "I beg to move, That the Bill be now read a Second time."}
    ]},
    {"type": "speech", "id": "d.1.2", "person_id": "p2", "paragraphs": [
      {"pid": "a1.2/1", "text": "Question put."}
    ]},
    {"type": "division", "id": "d.1.3", "number": 101, "ayes": 310, "noes": 205}
  ]
}"#;

fn parl_motion(data_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_parl-motion"))
        .arg("--data-dir")
        .arg(data_dir)
        .args(args)
        .env_remove("PARL_MOTION_STRICT")
        .env_remove("PARL_MOTION_JOBS")
        .env("RUST_LOG", "warn")
        .output()
        .expect("run parl-motion")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn process_then_package() {
    let data = tempfile::tempdir().expect("tempdir");
    let input = data.path().join("commons-2024-04-24.json");
    std::fs::write(&input, DEBATE).expect("write transcript");
    let input = input.to_string_lossy().into_owned();

    let out = parl_motion(data.path(), &["process", &input]);
    assert!(out.status.success(), "process failed: {}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout(&out).contains("1 processed, 0 skipped, 0 failed"));
    assert!(data
        .path()
        .join("interim/results/commons-2024-04-24.json")
        .exists());

    let out = parl_motion(data.path(), &["package", "--chamber", "commons", "--prefix", "2024"]);
    assert!(out.status.success(), "package failed: {}", String::from_utf8_lossy(&out.stderr));
    let motions = std::fs::read_to_string(data.path().join("processed/package/motions.json"))
        .expect("motions table");
    assert!(motions.contains("d.1.1.1"));
}

#[test]
fn snapshot_write_then_check() {
    let data = tempfile::tempdir().expect("tempdir");
    let input = data.path().join("commons-2024-04-24.json");
    std::fs::write(&input, DEBATE).expect("write transcript");
    let input = input.to_string_lossy().into_owned();

    let out = parl_motion(data.path(), &["snapshot", &input]);
    assert!(out.status.success(), "snapshot failed: {}", String::from_utf8_lossy(&out.stderr));

    let out = parl_motion(data.path(), &["snapshot", "--check", &input]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("ok      commons 2024-04-24"));
}

#[test]
fn tolerant_batch_skips_unreadable_input() {
    let data = tempfile::tempdir().expect("tempdir");
    let inputs = data.path().join("transcripts");
    std::fs::create_dir_all(&inputs).expect("mkdir");
    std::fs::write(inputs.join("commons-2024-04-24.json"), DEBATE).expect("write");
    std::fs::write(inputs.join("commons-2024-04-25.json"), "{").expect("write");

    let out = parl_motion(
        data.path(),
        &["process", "--jobs", "2", &inputs.to_string_lossy()],
    );
    assert!(out.status.success());
    assert!(stdout(&out).contains("1 processed, 1 skipped, 0 failed"));
}

#[test]
fn extract_prints_motion_summaries() {
    let data = tempfile::tempdir().expect("tempdir");
    let input = data.path().join("debate.json");
    std::fs::write(&input, DEBATE).expect("write transcript");

    let out = parl_motion(data.path(), &["extract", &input.to_string_lossy()]);
    assert!(out.status.success());
    let summaries: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json output");
    assert_eq!(
        summaries["d.1.1.1"]["content"],
        "I beg to move, That the Bill be now read a Second time."
    );
}
