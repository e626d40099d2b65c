//! Error taxonomy for gridcheck operations.
//!
//! Argument-validation errors (`InvalidDimension`, `InvalidGroupShape`) are
//! raised before any device resource is touched. Device-resource errors are
//! fatal to the current operation; already-acquired buffers are rolled back
//! before they propagate. A failed verification is deliberately *not* an
//! error: the computation ran, only the numbers are wrong, so it is reported
//! through the harness result type instead.

use thiserror::Error;

/// Errors produced by planning, buffer management, and dispatch.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("invalid dimension: {0}")]
    InvalidDimension(String),

    #[error("invalid group shape: {0}")]
    InvalidGroupShape(String),

    #[error("device allocation failed: {0}")]
    AllocationFailure(String),

    #[error("transfer size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("geometry exceeds device limits: {0}")]
    GeometryExceedsDeviceLimits(String),

    #[error("host/device transfer failed: {0}")]
    TransferFailure(String),

    #[error("kernel dispatch failed: {0}")]
    DispatchFailure(String),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, GridError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_mismatch_display_includes_both_sizes() {
        let e = GridError::SizeMismatch { expected: 64, actual: 32 };
        let msg = format!("{e}");
        assert!(msg.contains("64"));
        assert!(msg.contains("32"));
    }

    #[test]
    fn invalid_dimension_display() {
        let e = GridError::InvalidDimension("extent must be >= 1".into());
        assert_eq!(format!("{e}"), "invalid dimension: extent must be >= 1");
    }

    #[test]
    fn dispatch_failure_display() {
        let e = GridError::DispatchFailure("missing operand".into());
        assert!(format!("{e}").contains("missing operand"));
    }
}
