use std::path::PathBuf;

use crate::types::TaskId;

/// Result type alias for conversation-indexer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The core's error taxonomy (see the error-handling design notes).
///
/// Every surfaced error carries enough context (`component`, and usually a
/// `TaskId` or path) to be logged and reported without turning into an
/// opaque internal exception. Variants map onto the seven semantic classes:
/// input-invalid, resource-missing, parse-failed, persist-failed,
/// resource-limit, deadline-exceeded, configuration-invalid.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Class 1 — malformed input, a cycle attempt, or a call with arguments
    /// that can never succeed. No state change occurs.
    #[error("invalid input in {component}: {context}")]
    InputInvalid {
        component: &'static str,
        context: String,
    },

    /// Class 2 — a raw file vanished mid-scan. The affected task is skipped
    /// for this pass and retried on the next scan.
    #[error("resource missing for task {task_id:?}: {context}")]
    ResourceMissing {
        task_id: Option<TaskId>,
        context: String,
    },

    /// Class 3 — a corrupt assistant message or cached skeleton. The
    /// artifact is treated as absent and rebuilt.
    #[error("parse failed for task {task_id:?}: {context}")]
    ParseFailed {
        task_id: Option<TaskId>,
        context: String,
    },

    /// Class 4 — persisting a skeleton failed after the retry budget was
    /// exhausted. In-memory state is kept; the next scan reconciles.
    #[error("persist failed for task {task_id:?}: {context}")]
    PersistFailed { task_id: TaskId, context: String },

    /// Class 5 — the anti-leak ceiling was reached. Never surfaced as fatal;
    /// the eviction cascade handles it.
    #[error("resource limit reached in {component}: {context}")]
    ResourceLimit {
        component: &'static str,
        context: String,
    },

    /// Class 6 — reconstruction or a downstream I/O exceeded its deadline.
    /// Reported as a partial success with counts, not a rollback.
    #[error("deadline exceeded in {component}: {context}")]
    DeadlineExceeded {
        component: &'static str,
        context: String,
    },

    /// Class 7 — a required environment value is missing for an
    /// external-facing operation.
    #[error("configuration invalid for {key}: {context}")]
    ConfigurationInvalid { key: &'static str, context: String },

    /// A raw-file path could not be read or written for reasons the
    /// taxonomy above doesn't distinguish (permissions, disk full, etc).
    #[error("io error at {path:?}: {source}")]
    Io {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failure outside the parse-failed path (e.g.
    /// while building a `ScanReport`).
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error is eligible for the retry policy (§4.A / §9:
    /// "centralize the write-skeleton retry, no other layer retries I/O").
    ///
    /// Only transient, environment-shaped failures are recoverable:
    /// resource-missing (the file may reappear), and raw I/O. Parse and
    /// persist failures that have already exhausted retries, input
    /// validation failures, resource-limit, deadline, and configuration
    /// errors are never retried — retrying them cannot change the outcome.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::ResourceMissing { .. } | Error::Io { .. })
    }

    /// The semantic class name, for structured logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InputInvalid { .. } => "input-invalid",
            Error::ResourceMissing { .. } => "resource-missing",
            Error::ParseFailed { .. } => "parse-failed",
            Error::PersistFailed { .. } => "persist-failed",
            Error::ResourceLimit { .. } => "resource-limit",
            Error::DeadlineExceeded { .. } => "deadline-exceeded",
            Error::ConfigurationInvalid { .. } => "configuration-invalid",
            Error::Io { .. } => "io",
            Error::Serialization(_) => "serialization",
        }
    }

    /// Whether this error class is *surfaced* to the caller (classes 1, 6,
    /// 7) rather than *absorbed with structured logging* (classes 2, 3, 4,
    /// 5), per §7's propagation policy.
    #[must_use]
    pub fn is_surfaced(&self) -> bool {
        matches!(
            self,
            Error::InputInvalid { .. }
                | Error::DeadlineExceeded { .. }
                | Error::ConfigurationInvalid { .. }
        )
    }
}

impl crate::retry::Retryable for Error {
    fn is_recoverable(&self) -> bool {
        self.is_recoverable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_missing_and_io_are_recoverable() {
        assert!(Error::ResourceMissing {
            task_id: None,
            context: "gone".into()
        }
        .is_recoverable());
        assert!(Error::Io {
            path: None,
            source: std::io::Error::other("x"),
        }
        .is_recoverable());
    }

    #[test]
    fn resource_limit_is_absorbed_not_surfaced() {
        let e = Error::ResourceLimit {
            component: "cache",
            context: "ceiling reached".into(),
        };
        assert!(!e.is_recoverable());
        assert!(!e.is_surfaced());
    }

    #[test]
    fn deadline_exceeded_is_surfaced() {
        let e = Error::DeadlineExceeded {
            component: "hierarchy",
            context: "global deadline".into(),
        };
        assert!(e.is_surfaced());
    }
}
