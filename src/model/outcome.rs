//! Result of applying the ingestion policy to one candidate

use std::fmt;

/// What happened to a single post candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// No entry existed for the identity; one was created
    Created,

    /// An entry existed under a different identity and was rewritten
    Updated,

    /// An entry with the same identity already exists; nothing was written
    Unchanged,

    /// A repository call failed; the failure was logged
    Failed,
}

impl Outcome {
    /// Returns true if the repository was written to
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Created | Self::Updated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
