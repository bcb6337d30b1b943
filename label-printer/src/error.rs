//! Error types for label rendering, submission and printing

use thiserror::Error;

/// How the dispatch queue should treat a failed print
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Worth retrying: the device is momentarily unavailable
    Transient,
    /// Retrying cannot help: the job itself is bad
    Fatal,
}

/// Printer adapter error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// Network connection error
    #[error("Connection failed: {0}")]
    Connection(String),

    /// IO error during printing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Printer is offline or busy
    #[error("Printer offline: {0}")]
    Offline(String),

    /// Timeout waiting for printer
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid printer configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// The label could not be turned into printer instructions
    #[error("Encoding failed: {0}")]
    Encoding(String),

    /// The printer rejected the instructions
    #[error("Rejected by printer: {0}")]
    Rejected(String),

    /// The adapter panicked while printing
    #[error("Printer adapter panicked: {0}")]
    AdapterPanic(String),
}

impl PrintError {
    /// Retry classification used by the dispatch queue
    pub fn kind(&self) -> FailureKind {
        match self {
            PrintError::Connection(_)
            | PrintError::Io(_)
            | PrintError::Offline(_)
            | PrintError::Timeout(_) => FailureKind::Transient,
            PrintError::InvalidConfig(_)
            | PrintError::Encoding(_)
            | PrintError::Rejected(_)
            | PrintError::AdapterPanic(_) => FailureKind::Fatal,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == FailureKind::Transient
    }
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;

/// Queue-level errors
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue was shut down and accepts no more jobs
    #[error("Print queue is shut down")]
    ShutDown,

    /// The queue was built outside a tokio runtime
    #[error("No async runtime available: {0}")]
    NoRuntime(String),
}

/// Rejections returned synchronously by a print submission
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Copies must be between 1 and {max}, got {requested}")]
    CopiesOutOfRange { requested: u32, max: u32 },

    #[error("Unknown label variant: {0}")]
    UnknownVariant(String),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl SubmitError {
    /// Whether the request itself was invalid (nothing reached the queue)
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            SubmitError::CopiesOutOfRange { .. } | SubmitError::UnknownVariant(_)
        )
    }
}

/// Result type for print submissions
pub type SubmitResult<T> = Result<T, SubmitError>;

/// Setup and encoding errors outside the render path
#[derive(Debug, Error)]
pub enum LabelError {
    #[error("Invalid font data: {0}")]
    Font(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}
