//! Error types for the sq-fitter library
//!
//! This module provides the main error and result types used throughout the library.
//! All errors use the `thiserror` crate for automatic trait implementations.

use crate::{
    core::CodecError, io::IoError, linalg::LinAlgError, observers::ObserverError,
    optimizer::OptimizerError,
};
use std::num::ParseFloatError;
use thiserror::Error;

/// Main result type used throughout the sq-fitter library
pub type SqFitResult<T> = Result<T, SqFitError>;

/// Main error type for the sq-fitter library
#[derive(Debug, Clone, Error)]
pub enum SqFitError {
    /// Linear algebra related errors
    #[error("Linear algebra error: {0}")]
    LinearAlgebra(String),

    /// IO related errors (point cloud loading, parsing, etc.)
    #[error("IO error: {0}")]
    Io(String),

    /// Parameter encoding/decoding errors
    #[error("Parameter codec error: {0}")]
    Codec(String),

    /// Solver related errors
    #[error("Solver error: {0}")]
    Solver(String),

    /// Observer (trace/report) errors
    #[error("Observer error: {0}")]
    Observer(String),

    /// Invalid input parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<std::io::Error> for SqFitError {
    fn from(err: std::io::Error) -> Self {
        SqFitError::Io(err.to_string())
    }
}

impl From<ParseFloatError> for SqFitError {
    fn from(err: ParseFloatError) -> Self {
        SqFitError::InvalidInput(format!("Failed to parse float: {err}"))
    }
}

// Convert module-specific errors to SqFitError

impl From<LinAlgError> for SqFitError {
    fn from(err: LinAlgError) -> Self {
        SqFitError::LinearAlgebra(err.to_string())
    }
}

impl From<OptimizerError> for SqFitError {
    fn from(err: OptimizerError) -> Self {
        match err {
            OptimizerError::EmptyPointCloud => SqFitError::InvalidInput(err.to_string()),
            other => SqFitError::Solver(other.to_string()),
        }
    }
}

impl From<CodecError> for SqFitError {
    fn from(err: CodecError) -> Self {
        SqFitError::Codec(err.to_string())
    }
}

impl From<IoError> for SqFitError {
    fn from(err: IoError) -> Self {
        SqFitError::Io(err.to_string())
    }
}

impl From<ObserverError> for SqFitError {
    fn from(err: ObserverError) -> Self {
        SqFitError::Observer(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn test_sq_fit_error_display() {
        let error = SqFitError::LinearAlgebra("Matrix is singular".to_string());
        assert_eq!(
            error.to_string(),
            "Linear algebra error: Matrix is singular"
        );
    }

    #[test]
    fn test_sq_fit_error_from_io() {
        let io_error = std::io::Error::new(ErrorKind::NotFound, "File not found");
        let error = SqFitError::from(io_error);

        match error {
            SqFitError::Io(msg) => assert!(msg.contains("File not found")),
            _ => panic!("Expected IO error"),
        }
    }

    #[test]
    fn test_empty_cloud_maps_to_invalid_input() {
        let error = SqFitError::from(OptimizerError::EmptyPointCloud);
        assert!(matches!(error, SqFitError::InvalidInput(_)));
    }

    #[test]
    fn test_codec_error_conversion() {
        let error = SqFitError::from(CodecError::WrongLength {
            expected: 11,
            actual: 3,
        });
        match error {
            SqFitError::Codec(msg) => assert!(msg.contains("11")),
            _ => panic!("Expected codec error"),
        }
    }

    #[test]
    fn test_parse_float_error_conversion() {
        let parsed: SqFitResult<f64> = "1.5x".parse::<f64>().map_err(SqFitError::from);
        match parsed {
            Err(SqFitError::InvalidInput(msg)) => assert!(msg.contains("parse float")),
            other => panic!("Expected invalid input, got {other:?}"),
        }
    }

    #[test]
    fn test_sq_fit_result_err() {
        let result: SqFitResult<i32> = Err(SqFitError::Solver("Test error".to_string()));
        assert!(result.is_err());
    }
}
