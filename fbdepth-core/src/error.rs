//! Error types for framebuffer reconciliation.

use std::io;

const EIO: i32 = 5;
const ENODEV: i32 = 19;
const EINVAL: i32 = 22;
const ERANGE: i32 = 34;
const ENOTSUP: i32 = 95;

/// Errors that can occur while probing, resolving or applying a framebuffer mode.
///
/// Every variant is fatal to a reconciliation run: nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum FbDepthError {
    /// A flag value could not be parsed.
    #[error("Invalid {what} '{value}'")]
    Parse {
        /// What was being parsed (e.g. "bitdepth").
        what: &'static str,
        /// The offending input.
        value: String,
    },

    /// The operation needs a capability this device family lacks.
    #[error("{0} is not supported on this device")]
    UnsupportedOperation(&'static str),

    /// Querying the framebuffer state failed.
    #[error("Failed to query {query}: {source}")]
    ProbeFailure {
        /// The query that failed (e.g. "FBIOGET_VSCREENINFO").
        query: &'static str,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Mutating the framebuffer state failed.
    #[error("Failed to {op}: {source}")]
    ApplyFailure {
        /// The operation that failed.
        op: &'static str,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// A native rotation code outside 0..3 reached the rotation mapper.
    #[error("Invalid native rotation {0} (expected 0-3)")]
    InvalidRotation(i64),

    /// The framebuffer device could not be opened or closed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl FbDepthError {
    pub(crate) fn parse(what: &'static str, value: &str) -> Self {
        Self::Parse {
            what,
            value: value.to_owned(),
        }
    }

    /// The positive C errno this error kind maps to.
    pub fn errno(&self) -> i32 {
        match self {
            Self::Parse { .. } => EINVAL,
            Self::UnsupportedOperation(_) => ENOTSUP,
            Self::ProbeFailure { .. } | Self::Io(_) => ENODEV,
            Self::ApplyFailure { .. } => EIO,
            Self::InvalidRotation(_) => ERANGE,
        }
    }

    /// Process exit code for this error: the negated errno.
    pub fn exit_code(&self) -> i32 {
        -self.errno()
    }

    /// Whether the caller should re-display usage alongside the diagnostic.
    pub fn wants_usage(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}
