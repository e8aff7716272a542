pub mod error;
pub mod job;

pub use error::{
    DAILY_QUOTA_MESSAGE, ErrorCategory, ErrorClassifier, InvocationPath, JobfitError, LlmError,
    RATE_LIMIT_MESSAGE, Result, ResultExt, ValidationError, ValidationErrorKind, user_message,
};
pub use job::{
    CandidateProfile, DistilledJob, FitAnalysis, JobAnalysis, ProficiencyLevel, ProfileBlock,
    SkillEvidence, SkillRequirement,
};

// =============================================================================
// Domain Newtypes
// =============================================================================

use std::fmt;

/// Type-safe wrapper for the signed-in user's id
///
/// Prevents accidental mixing of user ids with other string types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
