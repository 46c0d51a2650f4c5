use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompareError>;

/// Terminal outcomes a comparison can fail with.
///
/// Every variant renders as a single human-readable message; callers are not
/// expected to branch on anything finer than the kind itself.
#[derive(Debug, Error)]
pub enum CompareError {
    /// A required audio input is missing or empty. Detected before any
    /// network activity, never retried.
    #[error("missing input: {0}")]
    Input(String),

    /// An audio input exists but could not be read. Never retried.
    #[error("audio read failed: {0}")]
    Io(#[from] std::io::Error),

    /// The remote comparison service failed: overload, network trouble, or an
    /// outright rejection. Transient cases are retried with linear backoff
    /// until the attempt budget runs out; this variant carries the last
    /// failure either way.
    #[error("comparison service failed: {0}")]
    Service(String),

    /// Transport succeeded but the model's reply did not contain a usable
    /// analysis. Never retried.
    #[error("could not decode analysis: {0}")]
    Decode(String),

    /// A comparison is already in flight; at most one runs at a time.
    #[error("a comparison is already in progress")]
    Busy,
}

impl CompareError {
    pub fn kind(&self) -> &'static str {
        match self {
            CompareError::Input(_) => "input",
            CompareError::Io(_) => "io",
            CompareError::Service(_) => "service",
            CompareError::Decode(_) => "decode",
            CompareError::Busy => "busy",
        }
    }
}
