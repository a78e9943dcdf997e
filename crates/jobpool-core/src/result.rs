//! Convenience result type alias for jobpool.

use crate::error::AppError;

/// A specialized `Result` type for jobpool operations.
pub type AppResult<T> = Result<T, AppError>;
