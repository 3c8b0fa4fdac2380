//! Result type alias shared across the workspace.
//!
//! Defaults the error type to `ClientError`, so functions can simply return `Result<T>`.
use crate::error::ClientError;

/// Workspace-wide `Result` alias with `ClientError` as the default error.
pub type Result<T, E = ClientError> = std::result::Result<T, E>;
