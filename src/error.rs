//! Centralized error handling for tabcheck.
//!
//! The engine distinguishes failures that are fatal for a validation run
//! (an unreadable dataset, a malformed rule set) from failures that only
//! silence one detector. The former surface as [`TabcheckError`]; the latter
//! are logged and recorded on the outcome.
//!
//! ```
//! use tabcheck::error::TabcheckError;
//!
//! fn describe(err: &TabcheckError) -> &'static str {
//!     match err {
//!         TabcheckError::RuleSet(_) => "fix the rule file",
//!         TabcheckError::DataProcessing(_) => "check the dataset",
//!         _ => "unexpected failure",
//!     }
//! }
//! ```
//!
//! The `ResultExt` trait adds `.context()` to any `Result` whose error
//! converts into [`TabcheckError`]:
//!
//! ```no_run
//! use tabcheck::error::ResultExt as _;
//!
//! fn read_rules() -> tabcheck::error::Result<String> {
//!     std::fs::read_to_string("rules.json").context("Failed to read rules")
//! }
//! ```

use std::fmt;

/// Main error type for tabcheck operations.
#[derive(Debug)]
pub enum TabcheckError {
    /// I/O errors (file operations)
    Io(std::io::Error),

    /// Dataset could not be read or processed (Polars, parsing, etc.)
    DataProcessing(String),

    /// Rule set file exists but its content is malformed
    RuleSet(String),

    /// Settings file exists but its content is malformed
    Config(String),

    /// File not found, unsupported extension, or otherwise unusable path
    InvalidPath(String),

    /// Generic error with context
    Other(String),
}

impl fmt::Display for TabcheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::DataProcessing(msg) => write!(f, "Data processing error: {msg}"),
            Self::RuleSet(msg) => write!(f, "Malformed rule set: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::InvalidPath(msg) => write!(f, "Invalid path: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for TabcheckError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TabcheckError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<anyhow::Error> for TabcheckError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(format!("{err:#}"))
    }
}

impl From<serde_json::Error> for TabcheckError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

impl From<polars::error::PolarsError> for TabcheckError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::DataProcessing(err.to_string())
    }
}

/// Result type alias for tabcheck operations.
pub type Result<T> = std::result::Result<T, TabcheckError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<TabcheckError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| wrap(e.into(), msg.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| wrap(e.into(), f()))
    }
}

// Keeps the variant so callers can still match on the failure class.
fn wrap(err: TabcheckError, msg: String) -> TabcheckError {
    match err {
        TabcheckError::Io(e) => {
            TabcheckError::Io(std::io::Error::new(e.kind(), format!("{msg}: {e}")))
        }
        TabcheckError::DataProcessing(inner) => {
            TabcheckError::DataProcessing(format!("{msg}: {inner}"))
        }
        TabcheckError::RuleSet(inner) => TabcheckError::RuleSet(format!("{msg}: {inner}")),
        TabcheckError::Config(inner) => TabcheckError::Config(format!("{msg}: {inner}")),
        TabcheckError::InvalidPath(inner) => {
            TabcheckError::InvalidPath(format!("{msg}: {inner}"))
        }
        TabcheckError::Other(inner) => TabcheckError::Other(format!("{msg}: {inner}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TabcheckError::RuleSet("expected an object".to_owned());
        assert_eq!(err.to_string(), "Malformed rule set: expected an object");
    }

    #[test]
    fn test_result_context_keeps_variant() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "rules.json",
        ));

        let err = result.context("Failed to read rules").unwrap_err();
        assert!(matches!(err, TabcheckError::Io(_)), "variant should survive context");
        assert!(err.to_string().contains("Failed to read rules"));
    }

    #[test]
    fn test_serde_error_is_config() {
        let parsed: std::result::Result<u32, serde_json::Error> = serde_json::from_str("{");
        let err: TabcheckError = parsed.unwrap_err().into();
        assert!(matches!(err, TabcheckError::Config(_)));
    }
}
