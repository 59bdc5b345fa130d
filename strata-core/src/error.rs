//! Error types for block layout and HLSL wrapper generation.
//!
//! Layout arithmetic itself cannot fail: contract violations (unbalanced
//! enter/exit calls, encoding an opaque type) panic. The errors here cover
//! malformed input and the wrapper shapes the HLSL emitter does not implement.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompilerError>;

#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("Input error: {0}")]
    InputError(String),

    #[error("HLSL error: {0}")]
    HlslError(String),

    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[macro_export]
macro_rules! err_input {
    ($($arg:tt)*) => {
        $crate::error::CompilerError::InputError(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! bail_input {
    ($($arg:tt)*) => {
        return Err($crate::err_input!($($arg)*))
    };
}

#[macro_export]
macro_rules! err_hlsl {
    ($($arg:tt)*) => {
        $crate::error::CompilerError::HlslError(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! bail_hlsl {
    ($($arg:tt)*) => {
        return Err($crate::err_hlsl!($($arg)*))
    };
}

#[macro_export]
macro_rules! err_unsupported {
    ($($arg:tt)*) => {
        $crate::error::CompilerError::UnsupportedType(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! bail_unsupported {
    ($($arg:tt)*) => {
        return Err($crate::err_unsupported!($($arg)*))
    };
}
