use thiserror::Error;

/// Errors raised by the guidance core.
///
/// Only `Config` is fatal. `InvalidBox` is recovered per tick by treating the
/// tick as a no-detection tick. `ContractViolation` indicates a bug.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GuidanceError {
    #[error("invalid configuration: {param}: {reason}")]
    Config { param: &'static str, reason: String },

    #[error("degenerate bounding box ({x1},{y1})-({x2},{y2})")]
    InvalidBox { x1: i32, y1: i32, x2: i32, y2: i32 },

    #[error("contract violation: {0}")]
    ContractViolation(String),
}

impl GuidanceError {
    pub(crate) fn config(param: &'static str, reason: impl Into<String>) -> Self {
        GuidanceError::Config {
            param,
            reason: reason.into(),
        }
    }
}

pub type GuidanceResult<T> = Result<T, GuidanceError>;
