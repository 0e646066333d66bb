use thiserror::Error;

use crate::result::ResultCode;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// A failed component-model operation.
///
/// Always carries a failure-class [`ResultCode`]; building one from a
/// success-class code yields [`ResultCode::FAIL`] instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GemError {
    /// A bare failure code.
    #[error("{0}")]
    Code(ResultCode),

    /// A failure code annotated with a diagnostic message.
    #[error("{code}: {message}")]
    WithContext { code: ResultCode, message: String },
}

impl GemError {
    /// Wrap a failure code.
    pub fn new(code: ResultCode) -> Self {
        Self::Code(Self::failure_class(code))
    }

    /// Wrap a failure code with a diagnostic message.
    pub fn context(code: ResultCode, message: impl Into<String>) -> Self {
        Self::WithContext {
            code: Self::failure_class(code),
            message: message.into(),
        }
    }

    /// The failure code carried by this error.
    pub fn code(&self) -> ResultCode {
        match self {
            Self::Code(code) | Self::WithContext { code, .. } => *code,
        }
    }

    fn failure_class(code: ResultCode) -> ResultCode {
        if code.is_failure() {
            code
        } else {
            ResultCode::FAIL
        }
    }
}

impl From<ResultCode> for GemError {
    fn from(code: ResultCode) -> Self {
        Self::new(code)
    }
}

impl From<TypeError> for GemError {
    fn from(err: TypeError) -> Self {
        Self::context(ResultCode::INVALID_ARG, err.to_string())
    }
}

/// Result alias for component-model operations.
pub type GemResult<T> = Result<T, GemError>;
