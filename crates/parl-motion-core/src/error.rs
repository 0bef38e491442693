//! Error taxonomy for motion extraction and decision assignment.

/// Errors produced by the motion registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("motion id {0} not found in registry")]
    NotFound(String),

    #[error("invalid motion id format: {0}")]
    InvalidFormat(String),
}

/// Errors produced while processing one transcript (one chamber/date unit).
#[derive(Debug, thiserror::Error)]
pub enum MotionError {
    #[error("ambiguous assignment on {date}: {context}")]
    Ambiguity { date: String, context: String },

    #[error(
        "unassigned decisions remain on {date}: decisions [{}], motions [{}]",
        .decisions.join(", "),
        .motions.join(", ")
    )]
    UnresolvedDivision {
        date: String,
        decisions: Vec<String>,
        motions: Vec<String>,
    },

    #[error("not all divisions assigned on {date}: found {found}, assigned {assigned}")]
    DivisionCountMismatch {
        date: String,
        found: usize,
        assigned: usize,
    },

    #[error("manual override references missing decision: {decision_gid}")]
    ManualOverrideMiss { decision_gid: String },

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("invalid transcript: {0}")]
    InputValidation(String),

    #[error("duplicate key {key} in {table} table")]
    DuplicateKey { table: String, key: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(String),
}

impl MotionError {
    /// Whether the failing date can be skipped even in strict batch mode.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::InputValidation(_))
    }
}

impl From<reqwest::Error> for MotionError {
    fn from(err: reqwest::Error) -> Self {
        MotionError::Http(err.to_string())
    }
}

/// Result type for motion operations.
pub type Result<T> = std::result::Result<T, MotionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_division_lists_offenders() {
        let err = MotionError::UnresolvedDivision {
            date: "2024-04-22".to_string(),
            decisions: vec!["div.1".to_string(), "div.2".to_string()],
            motions: vec![],
        };
        let msg = err.to_string();
        assert!(msg.contains("2024-04-22"));
        assert!(msg.contains("div.1, div.2"));
    }

    #[test]
    fn only_input_validation_is_skippable() {
        assert!(MotionError::InputValidation("empty id".to_string()).is_skippable());
        assert!(!MotionError::ManualOverrideMiss {
            decision_gid: "x".to_string()
        }
        .is_skippable());
        let err: MotionError = RegistryError::NotFound("S6M-00001".to_string()).into();
        assert!(!err.is_skippable());
        assert!(err.to_string().contains("S6M-00001"));
    }
}
