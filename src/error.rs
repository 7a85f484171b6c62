// Sampling errors: counter source failures and vanished processes

/// Failure reading or parsing one counter source. Scoped to a single metric
/// stream for a single cycle; the next cycle retries from scratch.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    /// Counter file missing or unreadable.
    #[error("counter source {path} unavailable: {source}")]
    SourceUnavailable {
        path: String,
        source: std::io::Error,
    },

    /// Counter file read but its content is malformed or short.
    #[error("failed to parse {path}: {detail}")]
    Parse { path: String, detail: String },

    /// Read did not complete within the configured bound.
    #[error("read of {path} timed out")]
    Timeout { path: String },
}

impl SampleError {
    pub fn parse(path: impl Into<String>, detail: impl Into<String>) -> Self {
        SampleError::Parse {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

/// A process exited (or became unreadable) between listing and reading.
/// Expected under normal operation; the enumerator filters these out.
#[derive(Debug, thiserror::Error)]
#[error("process {pid} vanished during read")]
pub struct EphemeralProcess {
    pub pid: u32,
}

pub type SampleResult<T> = Result<T, SampleError>;
