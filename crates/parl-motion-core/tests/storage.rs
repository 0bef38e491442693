//! Files the pipeline reads and writes: overrides, registry cache, per-date
//! results, export tables and snapshots.

mod common;

use common::second_reading_debate;
use parl_motion_core::results::{AGREEMENTS_TABLE, DIVISION_LINKS_TABLE, MOTIONS_TABLE};
use parl_motion_core::{
    process_transcript, AssignmentSnapshot, Chamber, ManualOverrides, MotionError,
    MotionRegistry, Package, PipelineConfig, RecordingSink, ResultsHolder, RunContext,
};

fn processed() -> ResultsHolder {
    process_transcript(&second_reading_debate(), &RunContext::new(), &RecordingSink::new())
        .expect("process")
}

#[test]
fn missing_override_file_means_no_overrides() {
    let dir = tempfile::tempdir().expect("tempdir");
    let overrides =
        ManualOverrides::load(&dir.path().join("manual_motion_linking.json")).expect("load");
    assert!(overrides.is_empty());
}

#[test]
fn override_file_round_trips_links_and_texts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("manual_motion_linking.json");
    std::fs::write(
        &path,
        r#"[
            {"decision_gid": "uk.org.publicwhip/debate/2025-11-05x.996.4",
             "motion_gid": "uk.org.publicwhip/debate/2025-11-05x.996.2"},
            {"decision_gid": "uk.org.publicwhip/debate/2024-03-01a.50.3",
             "motion": {"date": "2024-03-01", "speech_id": "manual.1",
                        "motion_lines": ["That the Order be approved."]}}
        ]"#,
    )
    .expect("write overrides");

    let overrides = ManualOverrides::load(&path).expect("load");
    assert_eq!(
        overrides.linked_decision("uk.org.publicwhip/debate/2025-11-05a.996.2"),
        Some("uk.org.publicwhip/debate/2025-11-05x.996.4")
    );
    let motion = overrides
        .motion_text("uk.org.publicwhip/debate/2024-03-01a.50.3")
        .expect("manual text");
    assert_eq!(motion.text(), "That the Order be approved.");
}

#[test]
fn broken_override_file_is_a_serialization_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("manual_motion_linking.json");
    std::fs::write(&path, "{not json").expect("write");
    let err = ManualOverrides::load(&path).expect_err("broken");
    assert!(matches!(err, MotionError::Serialization(_)));
}

#[test]
fn registry_cache_loads_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = PipelineConfig::new(dir.path());
    let path = config.registry_path();
    std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    std::fs::write(
        &path,
        r#"[{"UniqueID": 1, "EventID": "S6M-12345", "Title": "Budget", "ItemText": "That the Parliament agrees the budget."}]"#,
    )
    .expect("write registry");

    let registry = MotionRegistry::load(&path).expect("load");
    assert_eq!(registry.len(), 1);

    let ctx = RunContext::load(config).expect("context");
    assert!(ctx.registry.is_some());
    assert!(ctx.overrides.is_empty());
}

#[test]
fn results_round_trip_through_data_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    let results = processed();
    let path = results.to_data_dir(dir.path()).expect("write");
    assert!(path.ends_with("commons-2024-04-24.json"));

    let loaded =
        ResultsHolder::from_data_dir(dir.path(), Chamber::Commons, "2024-04-24").expect("read");
    assert_eq!(loaded, results);

    let april = ResultsHolder::load_matching(dir.path(), Chamber::Commons, "2024-04").expect("glob");
    assert_eq!(april.len(), 1);
    let lords = ResultsHolder::load_matching(dir.path(), Chamber::Lords, "2024").expect("glob");
    assert!(lords.is_empty());
}

#[test]
fn package_writes_three_unique_tables() {
    let dir = tempfile::tempdir().expect("tempdir");
    let results = processed();
    // The same date packaged twice must not produce duplicate rows.
    let package = Package::build(&[results.clone(), results]).expect("build");

    assert_eq!(package.motions.len(), 1);
    assert_eq!(package.motions[0].gid, "d.1.1.1");
    assert_eq!(package.division_links.len(), 1);
    assert_eq!(package.division_links[0].motion_gid, "d.1.1.1");
    assert_eq!(
        package.division_links[0].assignment_reason,
        "single motion and decision"
    );
    assert!(package.agreements.is_empty());

    let written = package.write(dir.path()).expect("write");
    assert_eq!(written.len(), 3);
    for table in [MOTIONS_TABLE, DIVISION_LINKS_TABLE, AGREEMENTS_TABLE] {
        assert!(dir.path().join(format!("{table}.json")).exists());
    }
}

#[test]
fn snapshot_detects_changed_assignments() {
    let dir = tempfile::tempdir().expect("tempdir");
    let snapshot = processed().snapshot();
    snapshot.write(dir.path()).expect("write");

    let golden = AssignmentSnapshot::load(dir.path(), Chamber::Commons, "2024-04-24").expect("load");
    assert_eq!(golden.digest(), snapshot.digest());
    assert!(snapshot.diff(&golden).is_empty());

    let mut drifted = snapshot.clone();
    drifted
        .decisions
        .insert("d.1.3".to_string(), "d.1.2.1".to_string());
    assert_eq!(drifted.diff(&golden), vec!["d.1.3".to_string()]);
}
