use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("request timed out after {0}s")]
    Timeout(u64),
    #[error("server returned HTTP {status}: {message}")]
    ServerError { status: u16, message: String },
    #[error("url schema not allowed")]
    SchemaNotAllowed,
    #[error("resource url '{0}' has no path component to derive a file name from")]
    NoFileName(String),
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("object storage error: {0}")]
    ObjectStorage(String),
    #[error("download was cancelled")]
    Cancelled,
}

impl DownloadError {
    /// Transient server issues are retryable; everything else (schema
    /// rejection, cancellation, malformed URLs) is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DownloadError::ServerError { .. } | DownloadError::Timeout(_))
    }
}
