//! End-to-end assignment scenarios.

mod common;

use common::{motion, second_reading_debate, TranscriptBuilder};
use parl_motion_core::{
    get_agreements, get_divisions, process_transcript, Chamber, Flag, ManualEntry, ManualLink,
    ManualOverrides, MotionCollection, MotionError, MotionMapper, MotionRegistry, RecordingSink,
    RegistryEntry, RunContext,
};

#[test]
fn single_motion_and_decision_pair_directly() {
    let transcript = second_reading_debate();
    let sink = RecordingSink::new();
    let results = process_transcript(&transcript, &RunContext::new(), &sink).expect("process");

    assert_eq!(results.divisions.len(), 1);
    let division = &results.divisions[0];
    assert_eq!(division.motion_assignment_reason, "single motion and decision");
    let motion = division.motion.as_ref().expect("paired");
    assert_eq!(motion.gid(), "d.1.1.1");
    assert!(motion.has_flag(Flag::OneLineMotion));
    assert_eq!(sink.reason_for("d.1.3").as_deref(), Some("single motion and decision"));
}

#[test]
fn amendment_code_selects_the_matching_motion() {
    let date = "2024-05-01";
    let transcript = TranscriptBuilder::new(date)
        .major("d.2.0", "Finance Bill")
        .speech("d.2.1", Some("p1"), &["I beg to move, That the Bill be now read a Second time."])
        .speech(
            "d.2.2",
            Some("p2"),
            &["Amendment (a) proposed, at the end of the Question to add:", "“but this House regrets the Bill.”"],
        )
        .speech("d.2.3", None, &["Question put, That amendment (a) be made."])
        .division("d.2.4", 102)
        .build();
    let motions = MotionCollection {
        motions: vec![
            motion(
                date,
                "d.2.1",
                "d.2.0",
                &["I beg to move, That the Bill be now read a Second time."],
                &[Flag::MainQuestion],
            ),
            motion(
                date,
                "d.2.2",
                "d.2.0",
                &["Amendment (a) proposed, at the end of the Question to add:", "“but this House regrets the Bill.”"],
                &[Flag::MotionAmendment],
            ),
        ],
    };
    let overrides = ManualOverrides::default();
    let sink = RecordingSink::new();

    let assignment = MotionMapper::new(
        &transcript,
        motions,
        get_divisions(&transcript),
        vec![],
        &overrides,
        None,
        &sink,
    )
    .assign()
    .expect("assign");

    let division = &assignment.divisions[0];
    assert_eq!(division.motion_assignment_reason, "relevant amendment");
    assert_eq!(division.motion.as_ref().map(|m| m.gid()).as_deref(), Some("d.2.2"));
}

fn wildcard_debate() -> (parl_motion_core::Transcript, MotionCollection) {
    let date = "2025-11-05";
    let base = "uk.org.publicwhip/debate/2025-11-05e";
    let transcript = TranscriptBuilder::new(date)
        .major(&format!("{base}.996.0"), "Planning Bill")
        .speech(
            &format!("{base}.996.1"),
            Some("p1"),
            &["I beg to move, That the Bill be now read a Second time."],
        )
        .speech(
            &format!("{base}.996.2"),
            Some("p2"),
            &["I beg to move an amendment, to leave out from “That” to the end of the Question."],
        )
        .speech(&format!("{base}.996.3"), Some("p3"), &["Question put."])
        .division(&format!("{base}.996.4"), 340)
        .build();
    let heading = format!("{base}.996.0");
    let motions = MotionCollection {
        motions: vec![
            motion(
                date,
                &format!("{base}.996.1"),
                &heading,
                &["I beg to move, That the Bill be now read a Second time."],
                &[Flag::MainQuestion],
            ),
            motion(
                date,
                &format!("{base}.996.2"),
                &heading,
                &["I beg to move an amendment, to leave out from “That” to the end of the Question."],
                &[Flag::MotionAmendment],
            ),
        ],
    };
    (transcript, motions)
}

#[test]
fn wildcard_override_links_any_transcript_version() {
    let (transcript, motions) = wildcard_debate();
    let overrides = ManualOverrides::from_entries([ManualEntry::Link(ManualLink {
        decision_gid: "uk.org.publicwhip/debate/2025-11-05x.996.4".to_string(),
        motion_gid: "uk.org.publicwhip/debate/2025-11-05x.996.2".to_string(),
    })]);
    let sink = RecordingSink::new();

    let assignment = MotionMapper::new(
        &transcript,
        motions,
        get_divisions(&transcript),
        vec![],
        &overrides,
        None,
        &sink,
    )
    .assign()
    .expect("assign");

    let division = &assignment.divisions[0];
    assert_eq!(division.motion_assignment_reason, "manual lookup");
    assert_eq!(
        division.motion.as_ref().map(|m| m.gid()).as_deref(),
        Some("uk.org.publicwhip/debate/2025-11-05e.996.2")
    );
}

#[test]
fn override_pointing_at_missing_decision_is_fatal() {
    let (transcript, motions) = wildcard_debate();
    let overrides = ManualOverrides::from_entries([ManualEntry::Link(ManualLink {
        decision_gid: "uk.org.publicwhip/debate/2025-11-06x.996.4".to_string(),
        motion_gid: "uk.org.publicwhip/debate/2025-11-05x.996.2".to_string(),
    })]);
    let sink = RecordingSink::new();

    let err = MotionMapper::new(
        &transcript,
        motions,
        get_divisions(&transcript),
        vec![],
        &overrides,
        None,
        &sink,
    )
    .assign()
    .expect_err("missing decision");
    assert!(matches!(err, MotionError::ManualOverrideMiss { .. }));
}

#[test]
fn leftover_agreements_are_dropped_not_fatal() {
    let transcript = TranscriptBuilder::new("2024-06-03")
        .major("d.3.0", "Business of the House")
        .speech(
            "d.3.1",
            Some("p1"),
            &["I thank the Leader of the House for her statement.", "Question put and agreed to."],
        )
        .speech(
            "d.3.2",
            Some("p2"),
            &["The hon. Member makes a fair point.", "Question agreed to."],
        )
        .build();
    let agreements = get_agreements(&transcript);
    assert_eq!(agreements.len(), 2);

    let overrides = ManualOverrides::default();
    let sink = RecordingSink::new();
    let assignment = MotionMapper::new(
        &transcript,
        MotionCollection::new(),
        vec![],
        agreements,
        &overrides,
        None,
        &sink,
    )
    .assign()
    .expect("agreements alone never fail");

    assert!(assignment.agreements.is_empty());
    assert_eq!(sink.dropped(), vec!["d.3.1.2".to_string(), "d.3.2.2".to_string()]);
}

#[test]
fn leftover_division_is_an_error() {
    let transcript = TranscriptBuilder::new("2024-06-04")
        .major("d.4.0", "Points of Order")
        .speech("d.4.1", Some("p1"), &["I thank the Minister for her answer."])
        .division("d.4.2", 7)
        .build();
    let overrides = ManualOverrides::default();
    let sink = RecordingSink::new();

    let err = MotionMapper::new(
        &transcript,
        MotionCollection::new(),
        get_divisions(&transcript),
        vec![],
        &overrides,
        None,
        &sink,
    )
    .assign()
    .expect_err("unassigned division");

    match err {
        MotionError::UnresolvedDivision { date, decisions, .. } => {
            assert_eq!(date, "2024-06-04");
            assert_eq!(decisions, vec!["d.4.2".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn reassignment_is_idempotent() {
    let transcript = second_reading_debate();
    let ctx = RunContext::new();
    let first = process_transcript(&transcript, &ctx, &RecordingSink::new()).expect("first run");
    let second = process_transcript(&transcript, &ctx, &RecordingSink::new()).expect("second run");

    assert_eq!(first.snapshot(), second.snapshot());
    assert_eq!(first.snapshot().digest(), second.snapshot().digest());
}

#[test]
fn multi_digit_minor_ids_keep_document_order() {
    let transcript = TranscriptBuilder::new("2024-07-10")
        .major("d.100.1", "First Bill")
        .speech(
            "d.100.2",
            Some("p1"),
            &["I beg to move, That the First Bill be now read a Second time."],
        )
        .division("d.100.3", 1)
        .major("d.100.9", "Second Bill")
        .speech(
            "d.100.10",
            Some("p2"),
            &["I beg to move, That the Second Bill be now read a Second time."],
        )
        .division("d.100.11", 2)
        .build();
    let sink = RecordingSink::new();
    let results = process_transcript(&transcript, &RunContext::new(), &sink).expect("process");

    let snapshot = results.snapshot();
    assert_eq!(snapshot.decisions.get("d.100.3").map(String::as_str), Some("d.100.2.1"));
    assert_eq!(snapshot.decisions.get("d.100.11").map(String::as_str), Some("d.100.10.1"));
}

#[test]
fn scottish_agreement_takes_registry_text() {
    let transcript = TranscriptBuilder::new("2024-09-12")
        .chamber(Chamber::Scotland)
        .major("s.1.0", "Decision Time")
        .speech(
            "s.1.1",
            Some("presiding"),
            &["The next question is, that motion S6M-12345 be agreed to."],
        )
        .speech(
            "s.1.2",
            None,
            &[
                "Motion agreed to,",
                "That the Parliament agrees to the general principles of the Budget (Scotland) Bill (S6M-12345).",
            ],
        )
        .build();
    let registry = MotionRegistry::from_entries([RegistryEntry {
        unique_id: 42,
        event_id: "S6M-12345".to_string(),
        title: "Budget (Scotland) Bill: Stage 1".to_string(),
        item_text: "That the Parliament agrees to the general principles of the Budget (Scotland) Bill."
            .to_string(),
    }]);
    let ctx = RunContext::new().with_registry(registry);
    let sink = RecordingSink::new();

    let results = process_transcript(&transcript, &ctx, &sink).expect("process");

    assert_eq!(results.agreements.len(), 1);
    let agreement = &results.agreements[0];
    assert_eq!(agreement.gid(), "s.1.2.1");
    assert_eq!(agreement.motion_assignment_reason, "scottish motion");
    let motion = agreement.motion.as_ref().expect("registry motion");
    assert_eq!(motion.motion_title, "Budget (Scotland) Bill: Stage 1");
    assert_eq!(motion.chamber, Chamber::Scotland);
}
