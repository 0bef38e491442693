//! Text normalisation shared by the cascade steps.

use std::sync::LazyLock;

use regex::Regex;

use crate::detector::compile_pattern;

const PREAMBLES: &[&str] = &["Motion made, and Question put,", "Resolved,"];

const SIMILAR_PHRASES: &[(&str, &str)] = &[("additional amendment", "amendment")];

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static AMENDMENT_CODE: LazyLock<Regex> =
    LazyLock::new(|| compile_pattern(r"Amendment \([A-Za-z0-9]+\)"));
static LORDS_AMENDMENT: LazyLock<Regex> =
    LazyLock::new(|| compile_pattern(r"Lords Amendment [A-Za-z0-9]+"));

/// Comparable form of a motion text: whitespace collapsed, signature and
/// preamble removed, lower-cased.
pub fn clean_text(text: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text, " ");
    let mut t = collapsed.trim();
    if let Some((head, _)) = t.split_once("—(") {
        t = head;
    }
    let mut t = t.to_string();
    for preamble in PREAMBLES {
        t = t.replace(preamble, "");
    }
    let mut t = t.trim().to_lowercase();
    for (from, to) in SIMILAR_PHRASES {
        t = t.replace(from, to);
    }
    t
}

/// An "Amendment (a)" style code in `text`, qualified with the Lords
/// amendment it applies to when one is named.
pub fn extract_amendment(text: &str) -> Option<String> {
    let code = AMENDMENT_CODE.find(text)?.as_str();
    if text.to_lowercase().contains("lords amendment") {
        if let Some(lords) = LORDS_AMENDMENT.find(text) {
            return Some(format!("{code} ({})", lords.as_str()));
        }
    }
    Some(code.to_string())
}

/// Document-order key from the trailing `major.minor` components of an
/// item id, compared as integers. Ids that do not end in two numeric
/// components sort first.
pub fn ordering_key(id: &str) -> (u64, u64) {
    let mut parts = id.rsplit('.');
    let minor = parts.next().and_then(|p| p.parse().ok());
    let major = parts.next().and_then(|p| p.parse().ok());
    match (major, minor) {
        (Some(major), Some(minor)) => (major, minor),
        _ => (0, 0),
    }
}

/// Indices of `texts` that survive de-duplication against the first entry:
/// the first is always kept, later ones only when their cleaned text
/// differs from it.
pub fn remove_redundant(texts: &[String]) -> Vec<usize> {
    let Some(first) = texts.first() else {
        return Vec::new();
    };
    let base = clean_text(first);
    std::iter::once(0)
        .chain(
            texts
                .iter()
                .enumerate()
                .skip(1)
                .filter(|(_, t)| clean_text(t) != base)
                .map(|(i, _)| i),
        )
        .collect()
}

/// Key under which two agreements count as the same instrument printed
/// twice.
pub fn agreement_key(preceding: &str, agreed: &str) -> String {
    format!("{preceding}{agreed}").to_lowercase().trim().to_string()
}

/// Normalised decided text used for containment checks.
pub fn decision_relevant_text(relevant: &str) -> String {
    let mut rel = relevant
        .to_lowercase()
        .replace("question, ", "")
        .replace("question put, ", "")
        .replace(" now ", " ")
        .replace("question agreed to", "")
        .trim()
        .to_string();
    if rel.ends_with('.') {
        rel.pop();
    }
    rel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_strips_signature_and_preamble() {
        let t = clean_text("Motion made, and Question put,  That the   additional amendment be made.—(Jane Smith.)");
        assert_eq!(t, "that the amendment be made.");
    }

    #[test]
    fn extract_amendment_adds_lords_qualifier() {
        assert_eq!(
            extract_amendment("Question put, That amendment (a) be made."),
            Some("amendment (a)".to_string())
        );
        assert_eq!(
            extract_amendment("Amendment (b) to Lords amendment 4B proposed."),
            Some("Amendment (b) (Lords amendment 4B)".to_string())
        );
        assert_eq!(extract_amendment("Question put and agreed to."), None);
    }

    #[test]
    fn ordering_key_compares_integers() {
        let short = ordering_key("uk.org.publicwhip/debate/2024-04-24a.100.1");
        let long = ordering_key("uk.org.publicwhip/debate/2024-04-24a.100.10");
        let next = ordering_key("uk.org.publicwhip/debate/2024-04-24a.100.2");
        assert_eq!(short, (100, 1));
        assert_eq!(long, (100, 10));
        assert!(short < next && next < long);
        assert_eq!(ordering_key("division"), (0, 0));
    }

    #[test]
    fn remove_redundant_keeps_first_and_distinct() {
        let texts = vec![
            "That the Bill be read a Second time.".to_string(),
            "That the Bill  be read a Second time.—(Jane Smith.)".to_string(),
            "That the Bill be committed.".to_string(),
        ];
        assert_eq!(remove_redundant(&texts), vec![0, 2]);
        assert!(remove_redundant(&[]).is_empty());
    }

    #[test]
    fn relevant_text_normalisation() {
        assert_eq!(
            decision_relevant_text("Question put, That the Bill be now read the Third time."),
            "that the bill be read the third time"
        );
    }
}
