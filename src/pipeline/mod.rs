//! Batch orchestration: raw record → canonical invoice → validation or
//! generation, one independent report per record.
//!
//! A record that cannot be processed (not a JSON object, unknown format,
//! generation failure) becomes a failed entry in the batch report. The
//! remaining records are processed normally.
//!
//! ```
//! use eformat::pipeline::{Pipeline, PipelineConfig};
//! use serde_json::json;
//!
//! let pipeline = Pipeline::new(PipelineConfig::default());
//! let records = vec![
//!     json!({"invoiceNumber": "INV-1", "format": "xrechnung-cii"}),
//!     json!("not a record"),
//! ];
//! let report = pipeline.validate_records(&records, None);
//! assert_eq!(report.succeeded, 1);
//! assert_eq!(report.failed, 1);
//! ```

mod config;

pub use config::PipelineConfig;

use serde::Serialize;
use serde_json::Value;

use crate::core::{CanonicalInvoice, EInvoiceError};
use crate::formats::{FormatId, detect_format_from_data};
use crate::generate::{GenerationResult, GeneratorFactory};
use crate::mapping::{RawExtraction, compute_missing_fields, to_canonical_invoice_with};
use crate::validate::{ValidationResult, Validator, validator_for};

/// Result of processing a single record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordOutcome<T> {
    Completed(T),
    Failed(String),
}

/// Per-record entry of a [`BatchReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordReport<T> {
    /// Position of the record in the input batch.
    pub index: usize,
    /// Resolved format. `None` when resolution itself failed.
    pub format: Option<FormatId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    /// Required fields the raw record lacks. Empty when disabled.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,
    pub outcome: RecordOutcome<T>,
}

impl<T> RecordReport<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, RecordOutcome::Failed(_))
    }

    /// The result, if the record was processed.
    pub fn completed(&self) -> Option<&T> {
        match &self.outcome {
            RecordOutcome::Completed(value) => Some(value),
            RecordOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            RecordOutcome::Failed(message) => Some(message),
            RecordOutcome::Completed(_) => None,
        }
    }
}

/// All record reports of one batch, in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport<T> {
    pub records: Vec<RecordReport<T>>,
    pub succeeded: usize,
    pub failed: usize,
}

impl<T> BatchReport<T> {
    fn collect(records: Vec<RecordReport<T>>) -> Self {
        let failed = records.iter().filter(|r| r.is_failed()).count();
        Self {
            succeeded: records.len() - failed,
            failed,
            records,
        }
    }
}

pub type ValidationBatch = BatchReport<ValidationResult>;
pub type GenerationBatch = BatchReport<GenerationResult>;

/// A record after mapping.
#[derive(Debug, Clone)]
pub struct MappedRecord {
    pub format: FormatId,
    pub invoice: CanonicalInvoice,
    pub missing_fields: Vec<String>,
}

/// Stateless driver for the mapper, validators and generators.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Pick the output format for a record.
    ///
    /// An explicit format wins. Otherwise a `format` field in the record is
    /// used and must name a known id. Otherwise detection runs (if enabled),
    /// and the configured default applies last.
    pub fn resolve_format(
        &self,
        raw: &RawExtraction,
        explicit: Option<FormatId>,
    ) -> Result<FormatId, EInvoiceError> {
        if let Some(format) = explicit {
            return Ok(format);
        }
        if let Some(named) = raw.text("format") {
            return named.parse();
        }
        let detected = if self.config.detect_format {
            detect_format_from_data(raw)
        } else {
            None
        };
        Ok(detected.unwrap_or(self.config.default_format))
    }

    /// Map one raw record.
    pub fn map_record(
        &self,
        record: &Value,
        explicit: Option<FormatId>,
    ) -> Result<MappedRecord, EInvoiceError> {
        let raw = RawExtraction::from_value(record.clone())?;
        let format = self.resolve_format(&raw, explicit)?;
        let invoice = to_canonical_invoice_with(&raw, format, &self.config.map_options());
        let missing_fields = if self.config.include_missing_fields {
            compute_missing_fields(&raw, format)
        } else {
            Vec::new()
        };
        Ok(MappedRecord {
            format,
            invoice,
            missing_fields,
        })
    }

    /// Map and validate one record.
    pub fn validate_record(
        &self,
        index: usize,
        record: &Value,
        explicit: Option<FormatId>,
    ) -> RecordReport<ValidationResult> {
        self.process(index, record, explicit, |mapped| {
            let validator = validator_for(mapped.format);
            Ok(validator.validate_with_tolerance(&mapped.invoice, self.config.tolerance))
        })
    }

    /// Map and generate one record.
    pub fn generate_record(
        &self,
        index: usize,
        record: &Value,
        explicit: Option<FormatId>,
    ) -> RecordReport<GenerationResult> {
        self.process(index, record, explicit, |mapped| {
            GeneratorFactory::for_format(mapped.format)?
                .generate_with_tolerance(&mapped.invoice, self.config.tolerance)
        })
    }

    /// Validate every record. `format` overrides per-record resolution.
    pub fn validate_records(&self, records: &[Value], format: Option<FormatId>) -> ValidationBatch {
        let report = BatchReport::collect(
            records
                .iter()
                .enumerate()
                .map(|(index, record)| self.validate_record(index, record, format))
                .collect(),
        );
        let invalid = report
            .records
            .iter()
            .filter_map(RecordReport::completed)
            .filter(|result| !result.valid)
            .count();
        tracing::info!(
            records = records.len(),
            succeeded = report.succeeded,
            failed = report.failed,
            invalid,
            "validation batch finished"
        );
        report
    }

    /// Generate a document for every record. `format` overrides per-record
    /// resolution.
    pub fn generate_records(&self, records: &[Value], format: Option<FormatId>) -> GenerationBatch {
        let report = BatchReport::collect(
            records
                .iter()
                .enumerate()
                .map(|(index, record)| self.generate_record(index, record, format))
                .collect(),
        );
        let invalid = report
            .records
            .iter()
            .filter_map(RecordReport::completed)
            .filter(|result| !result.is_valid())
            .count();
        tracing::info!(
            records = records.len(),
            succeeded = report.succeeded,
            failed = report.failed,
            invalid,
            "generation batch finished"
        );
        report
    }

    fn process<T>(
        &self,
        index: usize,
        record: &Value,
        explicit: Option<FormatId>,
        run: impl FnOnce(&MappedRecord) -> Result<T, EInvoiceError>,
    ) -> RecordReport<T> {
        let mapped = match self.map_record(record, explicit) {
            Ok(mapped) => mapped,
            Err(err) => {
                tracing::warn!(index, error = %err, "record could not be mapped");
                return RecordReport {
                    index,
                    format: None,
                    invoice_number: None,
                    missing_fields: Vec::new(),
                    outcome: RecordOutcome::Failed(err.to_string()),
                };
            }
        };

        let outcome = match run(&mapped) {
            Ok(value) => RecordOutcome::Completed(value),
            Err(err) => {
                tracing::warn!(index, format = %mapped.format, error = %err, "record failed");
                RecordOutcome::Failed(err.to_string())
            }
        };

        let number = mapped.invoice.invoice_number;
        RecordReport {
            index,
            format: Some(mapped.format),
            invoice_number: (!number.is_empty()).then_some(number),
            missing_fields: mapped.missing_fields,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn complete_record() -> Value {
        json!({
            "invoiceNumber": "RE-77",
            "invoiceDate": "2024-03-01",
            "currency": "EUR",
            "buyerReference": "04011000-12345-67",
            "sellerName": "Muster GmbH",
            "sellerAddress": "Hauptstr. 1",
            "sellerCity": "Berlin",
            "sellerPostalCode": "10115",
            "sellerCountryCode": "DE",
            "sellerVatId": "DE123456789",
            "sellerEmail": "rechnung@muster.de",
            "sellerContactName": "Erika Muster",
            "sellerPhone": "+49 30 1234567",
            "sellerIban": "DE89370400440532013000",
            "buyerName": "Stadt Beispiel",
            "buyerAddress": "Rathausplatz 2",
            "buyerCity": "Köln",
            "buyerPostalCode": "50667",
            "buyerCountryCode": "DE",
            "buyerEmail": "eingang@beispiel.de",
            "lineItems": [{"description": "Beratung", "quantity": 2, "unitPrice": 100, "taxRate": 19}]
        })
    }

    #[test]
    fn explicit_format_wins_over_record_and_detection() {
        let pipeline = Pipeline::default();
        let raw = RawExtraction::from_value(json!({"format": "ksef", "sellerCountryCode": "IT"}))
            .unwrap();
        assert_eq!(
            pipeline.resolve_format(&raw, Some(FormatId::Nlcius)).unwrap(),
            FormatId::Nlcius
        );
        assert_eq!(pipeline.resolve_format(&raw, None).unwrap(), FormatId::Ksef);
    }

    #[test]
    fn unknown_record_format_is_an_error() {
        let raw = RawExtraction::from_value(json!({"format": "edifact"})).unwrap();
        assert!(matches!(
            Pipeline::default().resolve_format(&raw, None),
            Err(EInvoiceError::UnknownFormat(_))
        ));
    }

    #[test]
    fn default_format_without_detection() {
        let pipeline = Pipeline::new(PipelineConfig {
            detect_format: false,
            default_format: FormatId::PeppolBis,
            ..PipelineConfig::default()
        });
        let raw = RawExtraction::from_value(json!({"sellerCountryCode": "PL"})).unwrap();
        assert_eq!(pipeline.resolve_format(&raw, None).unwrap(), FormatId::PeppolBis);
    }

    #[test]
    fn failed_records_do_not_stop_the_batch() {
        let records = vec![
            json!([1, 2, 3]),
            complete_record(),
            json!({"invoiceNumber": "X", "format": "edifact"}),
            json!({"format": "xrechnung-cii"}),
        ];
        let report = Pipeline::default().validate_records(&records, None);

        assert_eq!(report.records.len(), 4);
        assert_eq!(report.failed, 2);
        assert_eq!(report.succeeded, 2);
        assert!(report.records[0].error().unwrap().contains("JSON object"));
        assert!(report.records[2].error().unwrap().contains("edifact"));

        let complete = report.records[1].completed().unwrap();
        assert!(complete.valid, "{:?}", complete.errors);
        assert_eq!(report.records[1].invoice_number.as_deref(), Some("RE-77"));
        assert!(report.records[1].missing_fields.is_empty());

        let sparse = &report.records[3];
        assert!(!sparse.completed().unwrap().valid);
        assert!(sparse.missing_fields.contains(&"sellerName".to_string()));
    }

    #[test]
    fn missing_fields_can_be_switched_off() {
        let pipeline = Pipeline::new(PipelineConfig {
            include_missing_fields: false,
            ..PipelineConfig::default()
        });
        let report = pipeline.validate_record(0, &json!({"format": "ksef"}), None);
        assert!(report.missing_fields.is_empty());
    }

    #[test]
    fn generation_failure_is_per_record() {
        let records = vec![json!({"format": "xrechnung-ubl"}), complete_record()];
        let report = Pipeline::default().generate_records(&records, Some(FormatId::XRechnungUbl));

        assert!(report.records[0].error().unwrap().contains("invoice number is empty"));
        let generated = report.records[1].completed().unwrap();
        assert_eq!(generated.file_name, "RE-77_xrechnung_ubl.xml");
        assert!(generated.xml_content.contains("RE-77"));
    }

    #[test]
    fn report_serializes_outcome_by_status() {
        let report = Pipeline::default().validate_record(3, &json!(null), None);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["index"], 3);
        assert!(value["outcome"]["failed"].is_string());
        assert!(value.get("missingFields").is_none());
    }
}
