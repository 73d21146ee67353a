//! Convenience result type alias for gsad.

use crate::error::AppError;

/// A specialized `Result` type for daemon bootstrap and configuration.
pub type AppResult<T> = Result<T, AppError>;
