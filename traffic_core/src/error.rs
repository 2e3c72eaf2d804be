use thiserror::Error;

/// Failure talking to one of the public APIs (camera directory, image host,
/// geocoder, router, messaging).
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Upstream unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),
    #[error("Upstream {url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("Malformed upstream payload: {0}")]
    Malformed(String),
}

impl UpstreamError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UpstreamError::Unreachable(e) if e.is_decode() => ErrorKind::Malformed,
            UpstreamError::Unreachable(_) | UpstreamError::Status { .. } => ErrorKind::Upstream,
            UpstreamError::Malformed(_) => ErrorKind::Malformed,
        }
    }
}

/// Coarse classification shared by both binaries when they log or recover
/// from a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Upstream,
    Malformed,
    OutOfRange,
    Configuration,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Upstream => "upstream",
            ErrorKind::Malformed => "malformed",
            ErrorKind::OutOfRange => "out_of_range",
            ErrorKind::Configuration => "configuration",
        }
    }

    /// Whether running the same operation again later can succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorKind::Upstream)
    }
}
