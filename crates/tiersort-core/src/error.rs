use thiserror::Error;

use crate::stage::Stage;

/// Canonical result for the engine.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or infeasible parameters, raised before any tuple is touched.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed data handed over by the relation source.
    #[error("input error at tuple {position}: {reason}")]
    Input { position: usize, reason: String },

    /// A worker task failed; the stage was aborted and produced no output.
    #[error("task failure in stage {stage}: {reason}")]
    Task { stage: Stage, reason: String },

    #[error("internal invariant failed: {0}")]
    Invariant(String),
}

/// Coarse taxonomy callers branch on. Retrying only makes sense for
/// [`ErrorKind::TaskFailure`], and then only from the beginning of the sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Input,
    TaskFailure,
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn task(stage: Stage, reason: impl Into<String>) -> Self {
        Error::Task {
            stage,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::Configuration,
            Error::Input { .. } => ErrorKind::Input,
            Error::Task { .. } | Error::Invariant(_) => ErrorKind::TaskFailure,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(format!("invalid configuration document: {e}"))
    }
}
