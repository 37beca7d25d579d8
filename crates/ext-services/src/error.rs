//! Error types for ext-services

use std::fmt;

/// Result type for ext-services operations
pub type Result<T> = std::result::Result<T, Error>;

/// A reference from a compiled service to an id the container does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReferenceIssue {
    /// Service whose definition carries the reference.
    pub service: String,
    /// The id it points at.
    pub missing: String,
}

impl ReferenceIssue {
    pub fn new(service: impl Into<String>, missing: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            missing: missing.into(),
        }
    }
}

impl fmt::Display for ReferenceIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.service, self.missing)
    }
}

fn join_issues(issues: &[ReferenceIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors that can occur while compiling service maps
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A service entry is unusable as a whole
    #[error("Invalid service '{service}': {reason}")]
    InvalidService { service: String, reason: String },

    /// An argument uses the reference sigil without a valid id
    #[error("Invalid reference '{argument}' in service '{service}'")]
    InvalidReference { service: String, argument: String },

    /// Factory is not `[target, method]` or `"Class::method"`
    #[error("Invalid factory for service '{service}': {reason}")]
    InvalidFactory { service: String, reason: String },

    /// Decoration record is malformed
    #[error("Invalid decoration for service '{service}': {reason}")]
    InvalidDecoration { service: String, reason: String },

    /// One or more compiled services reference ids that do not exist
    #[error("Dangling service references: {}", join_issues(.issues))]
    DanglingReferences { issues: Vec<ReferenceIssue> },

    /// Service map document could not be parsed
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
