//! Error handling for the movement feature engine
//!
//! Run-level failures (bad configuration, too little data) abort a pipeline.
//! Window-level failures are recovered by the assembler, which drops the
//! affected window and keeps going.

use thiserror::Error;

/// Result type alias for feature engine operations
pub type WamResult<T> = Result<T, WamError>;

/// Error type for all feature engine operations
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum WamError {
    /// Invalid cutoff, order, window or pipeline parameters
    #[error("Invalid configuration: {reason}")]
    Configuration {
        /// Description of the configuration error
        reason: String,
    },

    /// Stream too short to filter or segment; aborts the run
    #[error("Insufficient data for {context}: need {required} samples, got {actual}")]
    InsufficientData {
        /// Minimum number of samples required
        required: usize,
        /// Number of samples available
        actual: usize,
        /// Stage that rejected the stream
        context: &'static str,
    },

    /// A feature computation is structurally inapplicable to one window
    #[error("Not enough samples for {operation}: need {required}, got {actual}")]
    DataInsufficient {
        /// Feature computation that could not run
        operation: &'static str,
        /// Minimum number of samples required
        required: usize,
        /// Number of samples in the window
        actual: usize,
    },

    /// A window produced an undefined feature value and was dropped
    #[error("Window {window} is degenerate: {reason}")]
    WindowDegenerate {
        /// Zero-based window index
        window: usize,
        /// What made the window unusable
        reason: String,
    },

    /// A stage or feature referenced a channel that does not exist
    #[error("Unknown channel: {name}")]
    UnknownChannel {
        /// Display name of the missing channel
        name: String,
    },

    /// A table lookup named a feature column that does not exist
    #[error("Unknown feature column: {name}")]
    UnknownFeature {
        /// Display name of the missing column
        name: String,
    },

    /// Columns that must share a length do not
    #[error("Length mismatch: expected {expected} samples, got {actual}")]
    LengthMismatch {
        /// Expected column length
        expected: usize,
        /// Actual column length
        actual: usize,
    },

    /// Configuration or table (de)serialization failed
    #[error("Serialization error: {reason}")]
    Serialization {
        /// Serializer error description
        reason: String,
    },
}

impl WamError {
    /// Create a configuration error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Create an unknown channel error.
    pub fn unknown_channel(name: impl Into<String>) -> Self {
        Self::UnknownChannel { name: name.into() }
    }

    /// Whether the error only invalidates a single window.
    pub fn is_window_local(&self) -> bool {
        matches!(
            self,
            WamError::DataInsufficient { .. } | WamError::WindowDegenerate { .. }
        )
    }
}

/// Convenience macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::error::WamError::Configuration {
            reason: format!($($arg)*),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = WamError::InsufficientData {
            required: 11,
            actual: 4,
            context: "band-pass filter",
        };
        let display = error.to_string();
        assert!(display.contains("band-pass filter"));
        assert!(display.contains("11"));
        assert!(display.contains('4'));
    }

    #[test]
    fn test_config_error_macro() {
        let error = config_error!("order {} out of range", 12);
        assert_eq!(error, WamError::configuration("order 12 out of range"));
    }

    #[test]
    fn test_window_local_errors() {
        let local = WamError::DataInsufficient {
            operation: "autocorrelation",
            required: 2,
            actual: 1,
        };
        assert!(local.is_window_local());
        assert!(!WamError::configuration("bad").is_window_local());
    }
}
