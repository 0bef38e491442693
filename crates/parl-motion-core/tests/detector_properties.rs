//! Property checks for phrase matching.

use parl_motion_core::{ComplexPhrase, PhraseDetector};
use proptest::prelude::*;

/// Rejoin the words of `phrase` with the given whitespace runs.
fn respace(phrase: &str, runs: &[String]) -> String {
    let mut out = String::new();
    for (i, word) in phrase.split(' ').enumerate() {
        if i > 0 {
            out.push_str(&runs[i - 1]);
        }
        out.push_str(word);
    }
    out
}

proptest! {
    #[test]
    fn surrounding_whitespace_never_changes_a_match(
        body in "[A-Za-z ,.]{0,40}",
        lead in "[ \t\u{a0}]{0,4}",
        trail in "[ \t\u{a0}]{0,4}",
    ) {
        let detector = PhraseDetector::phrases(["I beg to move"])
            .pattern(r"^Question put,$");
        let padded = format!("{lead}{body}{trail}");
        prop_assert_eq!(detector.matches(&body), detector.matches(&padded));
    }

    #[test]
    fn internal_whitespace_runs_never_change_a_phrase_match(
        runs in proptest::collection::vec("[ \t\u{a0}]{0,3}", 3),
        tail in "[A-Za-z ,.]{0,30}",
    ) {
        let detector = PhraseDetector::phrases(["I beg to move"]);
        for phrase in ["I beg to move", "I beg to differ"] {
            let canonical = format!("{phrase}{tail}");
            let respaced = format!("{}{tail}", respace(phrase, &runs));
            prop_assert_eq!(detector.matches(&respaced), detector.matches(&canonical));
        }
    }

    #[test]
    fn phrase_match_ignores_case(prefix in "[a-z ]{0,20}", suffix in "[a-z ]{0,20}") {
        let detector = PhraseDetector::phrases(["Question put and agreed to"]);
        let text = format!("{prefix}QUESTION PUT AND AGREED TO{suffix}");
        prop_assert!(detector.matches(&text));
    }

    #[test]
    fn complex_phrase_is_positive_and_not_negative(text in "[a-z ]{0,30}(agreed to|as amended)?[a-z ]{0,30}") {
        let positive = PhraseDetector::phrases(["agreed to"]);
        let negative = PhraseDetector::phrases(["as amended"]);
        let complex = ComplexPhrase::new(positive.clone(), negative.clone());
        prop_assert_eq!(
            complex.matches(&text),
            positive.matches(&text) && !negative.matches(&text)
        );
    }
}
