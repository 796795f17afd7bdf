use core::fmt::Debug;

use thiserror::Error;

/// Adapts errors that only implement `Debug` to the `std::error::Error`
/// world, so they can be carried by error types built on `thiserror` or
/// cross an `anyhow` boundary with `?`.
#[derive(Debug, PartialEq, Clone, Error)]
#[error("{0}")]
pub struct DebugAsError(String);

impl DebugAsError {
    pub fn new<E: Debug>(error: E) -> Self {
        Self(format!("{:?}", error))
    }
}
