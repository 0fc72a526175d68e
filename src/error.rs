//! Error handling for recon-plot
//!
//! This module defines the crate-wide error type and a Result alias. The
//! numeric helpers in [`crate::parse`] never produce these errors; they fall
//! back to caller supplied defaults instead.

use thiserror::Error;

/// Main error type for recon-plot operations
#[derive(Error, Debug)]
pub enum PlotError {
    /// File could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Container does not start with the expected magic constant
    #[error("Not a plot container (magic 0x{found:08X})")]
    BadMagic { found: u32 },

    /// Container format version is not supported
    #[error("Unsupported container version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Fewer bytes remain than the field layout requires
    #[error("Truncated container while reading {field}: need {needed} bytes, {remaining} left")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// Compressed payload could not be inflated
    #[error("Decompression failed: {0}")]
    Decompress(std::io::Error),

    /// Text import was cancelled through its cancel token
    #[error("Import cancelled")]
    Cancelled,

    /// Data row with the wrong number of fields; ends the data phase of an import
    #[error("Malformed row at line {line}: expected {expected} fields, found {found}")]
    MalformedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// Color string is not `#rrggbb`
    #[error("Invalid color: {0:?}")]
    InvalidColor(String),

    /// The dataset has no path with the canonical extension; use save-as
    #[error("Dataset must be saved under a new name")]
    RenameRequired,

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PlotError>,
    },
}

impl PlotError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PlotError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// True for bad magic or unsupported version, looking through context wrappers
    pub fn is_format_mismatch(&self) -> bool {
        match self {
            PlotError::BadMagic { .. } | PlotError::UnsupportedVersion { .. } => true,
            PlotError::WithContext { source, .. } => source.is_format_mismatch(),
            _ => false,
        }
    }

    /// True if this error (or the error it wraps) is a cancellation
    pub fn is_cancelled(&self) -> bool {
        match self {
            PlotError::Cancelled => true,
            PlotError::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

/// Result type alias for recon-plot operations
pub type Result<T> = std::result::Result<T, PlotError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlotError::UnsupportedVersion {
            found: 7,
            supported: 1,
        };
        assert_eq!(
            err.to_string(),
            "Unsupported container version 7 (supported: 1)"
        );
    }

    #[test]
    fn test_error_with_context() {
        let err = PlotError::BadMagic { found: 0xDEAD_BEEF };
        let with_ctx = err.with_context("Failed to open data.plot");
        assert!(with_ctx.to_string().contains("Failed to open data.plot"));
        assert!(with_ctx.to_string().contains("0xDEADBEEF"));
        assert!(with_ctx.is_format_mismatch());
    }

    #[test]
    fn test_error_classification() {
        assert!(PlotError::Cancelled.is_cancelled());
        assert!(!PlotError::Cancelled.is_format_mismatch());
        assert!(PlotError::Cancelled.with_context("import").is_cancelled());

        let truncated = PlotError::Truncated {
            field: "time_values",
            needed: 8,
            remaining: 3,
        };
        assert!(!truncated.is_format_mismatch());
        assert!(truncated.to_string().contains("time_values"));
    }
}
