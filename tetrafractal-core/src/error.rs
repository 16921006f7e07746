//! Error types for tetrafractal

use thiserror::Error;

/// Main error type for tetrafractal operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid subdivision depth {value}: expected an integer in 0..={max}")]
    InvalidDepth { value: String, max: u32 },

    #[error("Subdivision run was cancelled")]
    Cancelled,

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("Visualization error: {0}")]
    Visualization(String),
}

/// Result type alias for tetrafractal operations
pub type Result<T> = std::result::Result<T, Error>;
