use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::{DEFAULT_TOLERANCE, EInvoiceError};
use crate::formats::FormatId;
use crate::mapping::MapOptions;

/// Settings for a [`Pipeline`](super::Pipeline).
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use eformat::formats::FormatId;
/// use eformat::pipeline::PipelineConfig;
///
/// let config = PipelineConfig::from_json_str(r#"{"defaultFormat": "peppol-bis"}"#).unwrap();
/// assert_eq!(config.default_format, FormatId::PeppolBis);
/// assert!(config.detect_format);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Money comparison tolerance used by the mapper and the total rules.
    pub tolerance: Decimal,
    /// Used when neither the caller nor detection names a format.
    pub default_format: FormatId,
    /// Run format detection on records without an explicit format.
    pub detect_format: bool,
    /// Attach the missing-field analysis to each record report.
    pub include_missing_fields: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            default_format: FormatId::XRechnungCii,
            detect_format: true,
            include_missing_fields: true,
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from JSON. Unknown keys are ignored.
    pub fn from_json_str(json: &str) -> Result<Self, EInvoiceError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EInvoiceError::Config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), EInvoiceError> {
        if self.tolerance.is_sign_negative() {
            return Err(EInvoiceError::Config(format!(
                "tolerance must not be negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }

    pub(super) fn map_options(&self) -> MapOptions {
        MapOptions {
            tolerance: self.tolerance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.tolerance, dec!(0.02));
        assert_eq!(config.default_format, FormatId::XRechnungCii);
        assert!(config.detect_format);
        assert!(config.include_missing_fields);
        assert_eq!(PipelineConfig::from_json_str("{}").unwrap(), config);
    }

    #[test]
    fn reads_camel_case_keys() {
        let config = PipelineConfig::from_json_str(
            r#"{"tolerance": "0.05", "detectFormat": false, "includeMissingFields": false}"#,
        )
        .unwrap();
        assert_eq!(config.tolerance, dec!(0.05));
        assert!(!config.detect_format);
        assert!(!config.include_missing_fields);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            PipelineConfig::from_json_str(r#"{"defaultFormat": "ebics"}"#),
            Err(EInvoiceError::Config(_))
        ));
        assert!(matches!(
            PipelineConfig::from_json_str(r#"{"tolerance": "-1"}"#),
            Err(EInvoiceError::Config(_))
        ));
        assert!(matches!(
            PipelineConfig::from_json_str("not json"),
            Err(EInvoiceError::Config(_))
        ));
    }
}
