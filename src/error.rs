/// Errors that can occur in the grid core's fallible surfaces.
///
/// Grid mutations themselves are infallible: invariant violations are
/// programming errors (debug assertions + defensive clamps), and allocation
/// failure aborts the process.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transfer (clipboard/primary) I/O failed.
    #[error("transfer I/O error: {0}")]
    Transfer(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("config parse error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type alias for grid core operations.
pub type Result<T> = std::result::Result<T, Error>;
