//! Human-readable motion titles.
//!
//! Rules are tried in order; the first that applies wins. Most fall back on
//! the heading titles captured when the motion was opened.

use std::sync::LazyLock;

use regex::Regex;

use crate::detector::{compile_pattern, PhraseDetector};
use crate::motion::Motion;
use crate::registry::{extract_motion_ids, MotionRegistry};
use crate::transcript::Chamber;

/// Title used when a motion has no heading context at all.
pub const PLACEHOLDER_TITLE: &str = "Untitled motion";

/// Whether `title` carries no specific information.
pub fn is_placeholder_title(title: &str) -> bool {
    let title = title.trim();
    title.is_empty() || title == PLACEHOLDER_TITLE
}

struct TitleRules {
    disagreement: Regex,
    reasons: Vec<Regex>,
    reasons_committee: PhraseDetector,
    adjournment: PhraseDetector,
    be_approved: PhraseDetector,
    legislation: Vec<Regex>,
    suspend_standing_order: Regex,
    private_sitting: PhraseDetector,
    move_amendment: PhraseDetector,
    new_order: PhraseDetector,
    first_reading: PhraseDetector,
    second_reading: PhraseDetector,
    third_reading: PhraseDetector,
    leave_for_bill: PhraseDetector,
    amendment_number: Vec<Regex>,
    amendment_number_scotland: Vec<Regex>,
    new_clause: Regex,
}

// Legislation names are matched case-sensitively: capitalisation is what
// separates a title from surrounding prose.
static RULES: LazyLock<TitleRules> = LazyLock::new(|| TitleRules {
    disagreement: compile_pattern(r"This house disagrees with Lords amendment (\d+[A-Z]?)"),
    reasons: vec![
        compile_pattern(r"Amendment\s(\d+[A-Z])"),
        compile_pattern(r"Amendments\s*(\d+[A-Z]\s+and\s+\d+[A-Z])"),
    ],
    reasons_committee: PhraseDetector::phrases([
        "Committee be appointed to draw up Reasons",
        "Committee be appointed to draw up a Reason",
    ]),
    adjournment: PhraseDetector::phrases(["this House do now adjourn"]),
    be_approved: PhraseDetector::phrases(["be approved"]),
    legislation: vec![
        Regex::new(r"([A-Z][a-z]+(?: [A-Z][a-z]+)* \([A-Za-z ,\.\-]+\) Regulations \d{4})")
            .unwrap(),
        Regex::new(r"the\s(\b[A-Z][A-Za-z\s\(\)]*?Regulations \d{4})").unwrap(),
        Regex::new(r"draft\s+(.*?\d{4}\s+\(.*?\)\s+Order\s+\d{4})").unwrap(),
    ],
    suspend_standing_order: compile_pattern(
        r"Standing Order No\. (\d+[A-Z]?) *\(*.*?\)* shall not apply to the Motion",
    ),
    private_sitting: PhraseDetector::phrases(["the House sit in private"]),
    move_amendment: PhraseDetector::phrases([
        "beg to move an amendment",
        "beg to move amendment",
        "Amendment proposed",
    ])
    .pattern(r"The question is, (?:that|the) amendment \d+ be agreed to\. Are we agreed\?"),
    new_order: PhraseDetector::phrases(["and makes provision as set out in this Order"]),
    first_reading: PhraseDetector::phrases(["read a First time", "read the First time"]),
    second_reading: PhraseDetector::phrases(["read a Second time", "read the Second time"]),
    third_reading: PhraseDetector::phrases(["read a Third time", "read the Third time"]),
    leave_for_bill: PhraseDetector::phrases([
        "leave be given to bring in a Bill",
        "leave to bring in a Bill",
    ]),
    amendment_number: vec![compile_pattern(r"^Amendment (\d+),")],
    amendment_number_scotland: vec![
        compile_pattern(r"Amendments? (\d+ and \d+)"),
        compile_pattern(r"Amendment (\d+)"),
    ],
    new_clause: compile_pattern(r"^New clause (\d+)"),
});

fn first_capture(text: &str, patterns: &[Regex]) -> Option<String> {
    patterns
        .iter()
        .find_map(|p| p.captures(text))
        .and_then(|c| c.get(1).map(|m| m.as_str().to_string()))
}

/// Derive a display title for `motion`.
///
/// The registry is consulted only for Scottish motions that cite exactly
/// one registry identifier.
pub fn derive_title(motion: &Motion, registry: Option<&MotionRegistry>) -> String {
    let content = motion.text().replace('\n', " ");
    let rules = &*RULES;
    let major = motion.major_heading_title.as_str();

    if motion.chamber == Chamber::Scotland {
        if let Some(registry) = registry {
            if let [id] = extract_motion_ids(&content).as_slice() {
                if let Ok(entry) = registry.lookup(id) {
                    return entry.display_title();
                }
            }
        }
    }

    if let Some(c) = rules.disagreement.captures(&content) {
        return format!("Disagree: Lords amendment {}", &c[1]);
    }

    if rules.reasons_committee.matches(&content) {
        return match first_capture(&content, &rules.reasons) {
            Some(amendments) => format!("Appoint Reasons Committee: {amendments}"),
            None => "Appoint Reasons Committee".to_string(),
        };
    }

    if rules.adjournment.matches(&content) {
        return format!("Adjournment Debate: {major}");
    }

    if rules.be_approved.matches(&content) {
        if let Some(name) = first_capture(&content, &rules.legislation) {
            return format!("Approve: {name}");
        }
    }

    if let Some(c) = rules.suspend_standing_order.captures(&content) {
        return format!("Disapply Standing Order {}", &c[1]);
    }

    if rules.private_sitting.matches(&content) {
        return format!("{major}: Sit in Private");
    }

    let prefix = if rules.move_amendment.matches(&content) {
        "Amendment: "
    } else {
        ""
    };

    if rules.new_order.matches(&content) {
        return format!("New Order: {major}");
    }
    if rules.second_reading.matches(&content) {
        return format!("Second Reading: {major}");
    }
    if rules.first_reading.matches(&content) {
        return format!("First Reading: {major}");
    }
    if rules.third_reading.matches(&content) {
        return format!("Third Reading: {major}");
    }
    if rules.leave_for_bill.matches(&content) {
        return format!("Leave for Bill: {major}");
    }

    let amendment_patterns = if motion.chamber == Chamber::Scotland {
        &rules.amendment_number_scotland
    } else {
        &rules.amendment_number
    };
    if let Some(number) = first_capture(&content, amendment_patterns) {
        return format!("Amendment {number}: {major}");
    }

    if motion.minor_heading_title.to_lowercase().contains("clause") {
        if let Some(c) = rules.new_clause.captures(&content) {
            return format!("New Clause {}: {major}", &c[1]);
        }
        return motion.minor_heading_title.clone();
    }

    if major.is_empty() && motion.minor_heading_title.is_empty() {
        return PLACEHOLDER_TITLE.to_string();
    }

    if !motion.minor_heading_id.is_empty() {
        return format!("{prefix}{major}: {}", motion.minor_heading_title);
    }

    format!("{prefix}{major}")
}
