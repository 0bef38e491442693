//! Phrase matcher.
//!
//! A [`PhraseDetector`] is a boolean predicate over text built from an ordered
//! list of [`Criterion`] values. Every other component expresses its cues as
//! detectors, so the matching rules live here and nowhere else:
//!
//! - literal phrases compare case-insensitively; a phrase containing
//!   whitespace additionally matches when both sides have all whitespace
//!   removed (source formatting spaces words inconsistently),
//! - patterns run case-insensitively against the case-folded, trimmed text,
//! - a [`ComplexPhrase`] matches when its positive detector matches and its
//!   negative detector does not.
//!
//! Non-breaking spaces are normalised to ordinary spaces before matching.

use regex::{Regex, RegexBuilder};

/// Normalise text for matching: non-breaking spaces become spaces, then the
/// text is trimmed and lower-cased.
pub fn fold_text(text: &str) -> String {
    text.replace('\u{a0}', " ").trim().to_lowercase()
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Compile a case-insensitive pattern.
///
/// Patterns in this crate are fixed literals, so a failure here is a
/// programming error rather than an input error.
pub fn compile_pattern(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|e| panic!("invalid detector pattern {pattern:?}: {e}"))
}

/// One matching rule inside a [`PhraseDetector`].
#[derive(Debug, Clone)]
pub enum Criterion {
    /// Case-insensitive substring. `compact` holds the whitespace-free form
    /// when the phrase contains whitespace.
    Phrase {
        folded: String,
        compact: Option<String>,
    },
    /// Case-insensitive regular expression.
    Pattern(Regex),
    /// Case-insensitive prefix test on the trimmed text.
    StartsWith(String),
    /// Nested positive/negative composite.
    Complex(Box<ComplexPhrase>),
}

impl Criterion {
    pub fn phrase(phrase: &str) -> Self {
        let folded = phrase.to_lowercase();
        let compact = if folded.chars().any(char::is_whitespace) {
            Some(strip_whitespace(&folded))
        } else {
            None
        };
        Criterion::Phrase { folded, compact }
    }

    fn matches_folded(&self, folded: &str, compact: &str) -> bool {
        match self {
            Criterion::Phrase {
                folded: phrase,
                compact: phrase_compact,
            } => {
                if let Some(pc) = phrase_compact {
                    if compact.contains(pc.as_str()) {
                        return true;
                    }
                }
                folded.contains(phrase.as_str())
            }
            Criterion::Pattern(re) => re.is_match(folded),
            Criterion::StartsWith(prefix) => folded.starts_with(prefix.as_str()),
            Criterion::Complex(complex) => complex.matches_folded(folded),
        }
    }
}

/// Ordered set of criteria; matches when any criterion matches.
#[derive(Debug, Clone, Default)]
pub struct PhraseDetector {
    criteria: Vec<Criterion>,
}

impl PhraseDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detector made only of literal phrases.
    pub fn phrases<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        phrases
            .into_iter()
            .fold(Self::new(), |d, p| d.phrase(p.as_ref()))
    }

    /// Add a literal phrase.
    pub fn phrase(mut self, phrase: &str) -> Self {
        self.criteria.push(Criterion::phrase(phrase));
        self
    }

    /// Add a regular expression (compiled case-insensitively).
    pub fn pattern(mut self, pattern: &str) -> Self {
        self.criteria.push(Criterion::Pattern(compile_pattern(pattern)));
        self
    }

    /// Add a prefix test.
    pub fn starts_with(mut self, prefix: &str) -> Self {
        self.criteria
            .push(Criterion::StartsWith(prefix.to_lowercase()));
        self
    }

    /// Add a nested composite.
    pub fn complex(mut self, complex: ComplexPhrase) -> Self {
        self.criteria.push(Criterion::Complex(Box::new(complex)));
        self
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Whether any criterion matches `text`.
    pub fn matches(&self, text: &str) -> bool {
        self.matches_folded(&fold_text(text))
    }

    fn matches_folded(&self, folded: &str) -> bool {
        let compact = strip_whitespace(folded);
        self.criteria
            .iter()
            .any(|c| c.matches_folded(folded, &compact))
    }
}

/// Matches when `positive` matches and `negative` does not.
#[derive(Debug, Clone)]
pub struct ComplexPhrase {
    pub positive: PhraseDetector,
    pub negative: PhraseDetector,
}

impl ComplexPhrase {
    pub fn new(positive: PhraseDetector, negative: PhraseDetector) -> Self {
        Self { positive, negative }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.matches_folded(&fold_text(text))
    }

    fn matches_folded(&self, folded: &str) -> bool {
        self.positive.matches_folded(folded) && !self.negative.matches_folded(folded)
    }
}
