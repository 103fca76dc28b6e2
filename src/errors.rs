//! Definition of errors.

use core::fmt;

use std::error::Error;

/// The error type for loglin.
#[derive(Debug)]
pub enum LogLinError {
    /// A configuration value or an input array is invalid.
    InvalidArgument(&'static str),

    /// The requested computation is not implemented for the given input.
    Unsupported(&'static str),

    /// The optimizer failed.
    #[cfg(feature = "train")]
    Optimization(String),
}

impl LogLinError {
    /// Creates a new [`LogLinError::InvalidArgument`].
    pub const fn invalid_argument(msg: &'static str) -> Self {
        Self::InvalidArgument(msg)
    }

    /// Creates a new [`LogLinError::Unsupported`].
    pub const fn unsupported(msg: &'static str) -> Self {
        Self::Unsupported(msg)
    }
}

impl fmt::Display for LogLinError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "InvalidArgumentError: {msg}"),
            Self::Unsupported(msg) => write!(f, "UnsupportedError: {msg}"),
            #[cfg(feature = "train")]
            Self::Optimization(msg) => write!(f, "OptimizationError: {msg}"),
        }
    }
}

impl Error for LogLinError {}

#[cfg(feature = "train")]
impl From<argmin::core::Error> for LogLinError {
    fn from(e: argmin::core::Error) -> Self {
        Self::Optimization(e.to_string())
    }
}

/// A specialized Result type.
pub type Result<T, E = LogLinError> = core::result::Result<T, E>;
