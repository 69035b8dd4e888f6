//! Shared error type across mockex crates.

use thiserror::Error;

/// Stable error codes, used in logs and asserted by tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Snapshot line could not be parsed.
    Malformed,
    /// Supported family without the metadata it needs.
    MissingMetadata,
    /// TYPE token outside the exposition vocabulary.
    UnsupportedType,
    /// Sample value violates its family's constraints.
    InvalidSample,
    /// Two families with the same name.
    DuplicateFamily,
    /// Two series with the same label set in one family.
    DuplicateSeries,
    /// Invalid startup configuration.
    Config,
    /// Filesystem failure.
    Io,
    /// Not a single port of the range could be bound.
    NoListeners,
    /// Encoding the registry failed.
    Render,
    /// Anything else.
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Malformed => "MALFORMED",
            ErrorCode::MissingMetadata => "MISSING_METADATA",
            ErrorCode::UnsupportedType => "UNSUPPORTED_TYPE",
            ErrorCode::InvalidSample => "INVALID_SAMPLE",
            ErrorCode::DuplicateFamily => "DUPLICATE_FAMILY",
            ErrorCode::DuplicateSeries => "DUPLICATE_SERIES",
            ErrorCode::Config => "CONFIG",
            ErrorCode::Io => "IO",
            ErrorCode::NoListeners => "NO_LISTENERS",
            ErrorCode::Render => "RENDER",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MockError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum MockError {
    #[error("malformed snapshot line {line}: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("metric family {family} has no {field} line")]
    MissingMetadata { family: String, field: &'static str },
    #[error("metric family {family} declares unsupported type {token:?}")]
    UnsupportedType { family: String, token: String },
    #[error("invalid sample in {family}: {reason}")]
    InvalidSample { family: String, reason: String },
    #[error("duplicate metric family: {0}")]
    DuplicateFamily(String),
    #[error("duplicate series in {family}: {labels}")]
    DuplicateSeries { family: String, labels: String },
    #[error("invalid config: {0}")]
    Config(String),
    #[error("read {path} failed: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no port could be bound in {base}..{end}")]
    NoListeners { base: u16, end: u32 },
    #[error("render failed: {0}")]
    Render(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl MockError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            MockError::Malformed { .. } => ErrorCode::Malformed,
            MockError::MissingMetadata { .. } => ErrorCode::MissingMetadata,
            MockError::UnsupportedType { .. } => ErrorCode::UnsupportedType,
            MockError::InvalidSample { .. } => ErrorCode::InvalidSample,
            MockError::DuplicateFamily(_) => ErrorCode::DuplicateFamily,
            MockError::DuplicateSeries { .. } => ErrorCode::DuplicateSeries,
            MockError::Config(_) => ErrorCode::Config,
            MockError::Io { .. } => ErrorCode::Io,
            MockError::NoListeners { .. } => ErrorCode::NoListeners,
            MockError::Render(_) => ErrorCode::Render,
            MockError::Internal(_) => ErrorCode::Internal,
        }
    }

    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        MockError::Malformed {
            line,
            reason: reason.into(),
        }
    }
}
