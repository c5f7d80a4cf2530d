//! Error types for native sort backends

use thiserror::Error;

/// Errors raised while resolving a native sort primitive.
///
/// Sorting itself has no recoverable failure path; only setting up a backend
/// (opening a shared library, resolving a symbol) can fail.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SortError {
    /// A shared library could not be opened
    #[error("failed to load library '{path}': {reason}")]
    Load { path: String, reason: String },

    /// The library was opened but does not export the symbol
    #[error("symbol '{symbol}' not found in '{library}'")]
    SymbolNotFound { symbol: String, library: String },

    /// No file matching the library name exists on the search paths
    #[error("library not found: {0}")]
    LibraryNotFound(String),

    /// The requested primitive is not available on this platform
    #[error("unsupported on this platform: {0}")]
    Unsupported(String),
}

/// Result type for backend operations.
pub type SortResult<T> = Result<T, SortError>;
