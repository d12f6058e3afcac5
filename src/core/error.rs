use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by mapping, registry lookup and document generation.
///
/// Business-rule violations are not errors; they are reported as
/// [`RuleViolation`] values inside a validation result.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EInvoiceError {
    /// The format id is not in the registry (or not compiled in).
    #[error("unknown format: {0}")]
    UnknownFormat(String),

    /// The raw extraction record has a shape the mapper cannot read at all.
    #[error("mapping error: {0}")]
    Mapping(String),

    /// Serialization of a specific format failed.
    #[error("{format} generation failed: {message}")]
    Generation {
        /// Format id the generator was producing.
        format: String,
        /// What went wrong.
        message: String,
    },

    /// XML writing or reading error.
    #[error("XML error: {0}")]
    Xml(String),

    /// PDF rendering or embedding error.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl EInvoiceError {
    /// Wrap a lower-level error as a generation failure for `format`.
    pub fn generation(format: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Generation {
            format: format.into(),
            message: message.to_string(),
        }
    }
}

/// How serious a rule violation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Makes the invoice invalid for the profile.
    Error,
    /// Reported, but the invoice stays valid.
    Warning,
}

/// A single business-rule violation with rule id, message and location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleViolation {
    /// Rule identifier (e.g. "BR-06", "PEPPOL-EN16931-R010").
    pub rule_id: String,
    /// Human-readable description.
    pub message: String,
    /// Dot-separated path of the offending field (e.g. "buyer.electronicAddress").
    pub location: String,
    /// Error or warning.
    #[serde(default)]
    pub severity: Severity,
}

impl std::fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.rule_id, self.location, self.message)
    }
}

impl RuleViolation {
    /// Create an error-level violation.
    pub fn error(
        rule_id: impl Into<String>,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            message: message.into(),
            location: location.into(),
            severity: Severity::Error,
        }
    }

    /// Create a warning-level violation.
    pub fn warning(
        rule_id: impl Into<String>,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(rule_id, location, message)
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl Default for Severity {
    fn default() -> Self {
        Self::Error
    }
}
