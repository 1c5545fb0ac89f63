//! Error taxonomy for the search engine
//!
//! Errors fall into two groups: outcomes a Section can absorb (a missing
//! optional tool, a failing best-effort query) and outcomes that abort the
//! whole command. `ReconError::disposition` makes that split explicit so no
//! caller has to guess from the variant alone.

use serde::Serialize;
use thiserror::Error;

use crate::invoke::Tool;

/// Process exit code for a successful run (empty results included)
pub const EXIT_OK: i32 = 0;
/// Process exit code for engine or invocation failures
pub const EXIT_FAILURE: i32 = 1;
/// Process exit code for rejected user input
pub const EXIT_VALIDATION: i32 = 2;
/// Process exit code when a tool the command requires is not installed
pub const EXIT_TOOL_MISSING: i32 = 127;
/// Process exit code after Ctrl-C
pub const EXIT_INTERRUPTED: i32 = 130;

#[derive(Debug, Error)]
pub enum ReconError {
    /// User input failed a safety check before anything was spawned
    #[error("invalid input '{input}': {reason}")]
    Validation { input: String, reason: String },

    /// The external program is not installed or not on PATH
    #[error("{tool} not found - install it to enable this check")]
    ToolUnavailable { tool: Tool },

    /// The tool ran but reported a genuine failure
    #[error("{tool} failed ({code}): {message}")]
    Invocation {
        tool: Tool,
        code: String,
        message: String,
    },

    /// The process could not be started for a reason other than "not found"
    #[error("failed to start {tool}: {source}")]
    Spawn {
        tool: Tool,
        #[source]
        source: std::io::Error,
    },

    /// Aborted because a sibling producer failed or the command was stopped
    #[error("cancelled")]
    Cancelled,

    #[error("interrupted")]
    Interrupted,

    #[error("command timed out after {secs}s")]
    TimedOut { secs: u64 },

    /// A producer failed; wraps the underlying error with the Section title
    #[error("{name}: {source}")]
    Producer {
        name: String,
        #[source]
        source: Box<ReconError>,
    },

    #[error("configuration error: {0}")]
    Config(String),

    /// A bug in the engine itself, e.g. a producer task panicked
    #[error("internal error: {0}")]
    Internal(String),
}

/// What the engine should do with a producer error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Keep the command running and mark the Section as degraded
    Degrade,
    /// Abort the command
    Fatal,
}

/// Machine-readable error kind for JSON output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    ToolUnavailable,
    Invocation,
    Cancelled,
    Interrupted,
    Timeout,
    Config,
    Internal,
}

impl ReconError {
    pub fn validation(input: impl Into<String>, reason: impl Into<String>) -> Self {
        ReconError::Validation {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an error with the name of the producer it came from
    pub fn in_producer(self, name: &str) -> Self {
        match self {
            // Already attributed; keep the innermost name
            e @ ReconError::Producer { .. } => e,
            e => ReconError::Producer {
                name: name.to_string(),
                source: Box::new(e),
            },
        }
    }

    /// Innermost error, skipping producer attribution
    pub fn root(&self) -> &ReconError {
        match self {
            ReconError::Producer { source, .. } => source.root(),
            e => e,
        }
    }

    pub fn disposition(&self, best_effort: bool) -> Disposition {
        match self.root() {
            ReconError::ToolUnavailable { .. } => Disposition::Degrade,
            ReconError::Invocation { .. } if best_effort => Disposition::Degrade,
            _ => Disposition::Fatal,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), ReconError::Cancelled)
    }

    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            ReconError::Validation { .. } => ErrorKind::Validation,
            ReconError::ToolUnavailable { .. } => ErrorKind::ToolUnavailable,
            ReconError::Invocation { .. } | ReconError::Spawn { .. } => ErrorKind::Invocation,
            ReconError::Cancelled => ErrorKind::Cancelled,
            ReconError::Interrupted => ErrorKind::Interrupted,
            ReconError::TimedOut { .. } => ErrorKind::Timeout,
            ReconError::Config(_) => ErrorKind::Config,
            ReconError::Internal(_) | ReconError::Producer { .. } => ErrorKind::Internal,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.root() {
            ReconError::Validation { .. } => EXIT_VALIDATION,
            ReconError::ToolUnavailable { .. } => EXIT_TOOL_MISSING,
            ReconError::Interrupted => EXIT_INTERRUPTED,
            _ => EXIT_FAILURE,
        }
    }
}

/// Map an error surfaced through `anyhow` back to an exit code
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ReconError>())
        .map(ReconError::exit_code)
        .unwrap_or(EXIT_FAILURE)
}
