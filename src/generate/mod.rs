//! Document generation: one [`Generator`] per format, looked up through
//! [`GeneratorFactory`].
//!
//! Generators are stateless. The factory hands out shared instances from
//! a registry built once per process, so callers on any thread may keep
//! and reuse them.
//!
//! # Example
//!
//! ```rust
//! use eformat::generate::GeneratorFactory;
//! use eformat::mapping::{RawExtraction, to_canonical_invoice};
//! use serde_json::json;
//!
//! let raw = RawExtraction::from_value(json!({
//!     "invoiceNumber": "INV-1",
//!     "currency": "EUR",
//!     "lineItems": [{"unitPrice": 100, "quantity": 2, "taxRate": 19}],
//! }))
//! .unwrap();
//!
//! let generator = GeneratorFactory::create("xrechnung-cii").unwrap();
//! let invoice = to_canonical_invoice(&raw, generator.format_id());
//! let result = generator.generate(&invoice).unwrap();
//! assert!(result.xml_content.contains("238.00"));
//! assert_eq!(result.file_name, "INV-1_xrechnung_cii.xml");
//! ```

pub(crate) mod cii;
pub(crate) mod fatturapa;
pub(crate) mod ksef;
mod structure;
mod ubl;
pub(crate) mod xml_utils;

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::{CanonicalInvoice, DEFAULT_TOLERANCE, EInvoiceError};
use crate::formats::{FormatId, format_metadata};
use crate::validate::{Validator, validator_for};

pub use cii::CiiGenerator;
pub use fatturapa::FatturaPaGenerator;
pub use ksef::KsefGenerator;
pub use structure::StructuralCheck;
pub use ubl::UblGenerator;

/// XRechnung 3.0 specification identifier (BT-24).
pub const XRECHNUNG_CUSTOMIZATION_ID: &str =
    "urn:cen.eu:en16931:2017#compliant#urn:xeinkauf.de:kosit:xrechnung_3.0";

/// Peppol BIS Billing 3.0 specification identifier (BT-24).
pub const PEPPOL_CUSTOMIZATION_ID: &str =
    "urn:cen.eu:en16931:2017#compliant#urn:fdc:peppol.eu:2017:poacc:billing:3.0";

/// Peppol BIS Billing 3.0 business process identifier (BT-23).
pub const PEPPOL_PROFILE_ID: &str = "urn:fdc:peppol.eu:2017:poacc:billing:01:1.0";

/// SI-UBL 2.0 (NLCIUS) specification identifier.
pub const NLCIUS_CUSTOMIZATION_ID: &str =
    "urn:cen.eu:en16931:2017#compliant#urn:fdc:nen.nl:nlcius:v1.0";

/// CIUS-RO specification identifier.
pub const CIUS_RO_CUSTOMIZATION_ID: &str =
    "urn:cen.eu:en16931:2017#compliant#urn:efactura.mfinante.ro:CIUS-RO:1.0.1";

/// Factur-X EN 16931 (Comfort) guideline identifier.
pub const FACTURX_EN16931_GUIDELINE: &str = "urn:cen.eu:en16931:2017";

/// Factur-X Basic guideline identifier.
pub const FACTURX_BASIC_GUIDELINE: &str =
    "urn:cen.eu:en16931:2017#compliant#urn:factur-x.eu:1p0:basic";

/// UBL 2.1 namespace URIs.
pub mod ubl_ns {
    pub const INVOICE: &str = "urn:oasis:names:specification:ubl:schema:xsd:Invoice-2";
    pub const CREDIT_NOTE: &str = "urn:oasis:names:specification:ubl:schema:xsd:CreditNote-2";
    pub const CAC: &str =
        "urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2";
    pub const CBC: &str = "urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2";
}

/// CII namespace URIs.
pub mod cii_ns {
    pub const RSM: &str = "urn:un:unece:uncefact:data:standard:CrossIndustryInvoice:100";
    pub const RAM: &str =
        "urn:un:unece:uncefact:data:standard:ReusableAggregateBusinessInformationEntity:100";
    pub const QDT: &str = "urn:un:unece:uncefact:data:standard:QualifiedDataType:100";
    pub const UDT: &str = "urn:un:unece:uncefact:data:standard:UnqualifiedDataType:100";
}

/// Overall outcome recorded on a [`GenerationResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Valid,
    Invalid,
}

/// Output of one generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    /// The serialized XML. For hybrid formats this is the embedded document.
    pub xml_content: String,
    /// The PDF for hybrid formats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_content: Option<Vec<u8>>,
    /// `<invoiceNumber>_<suffix>.<ext>`, safe to use as a file name.
    pub file_name: String,
    /// Size in bytes of the primary artifact (PDF when present, else XML).
    pub file_size: usize,
    pub mime_type: String,
    pub validation_status: ValidationStatus,
    pub validation_errors: Vec<String>,
    pub validation_warnings: Vec<String>,
}

impl GenerationResult {
    pub fn is_valid(&self) -> bool {
        self.validation_status == ValidationStatus::Valid
    }
}

/// A format-specific document generator.
///
/// Implementors supply the serialization and the structural element list;
/// [`generate`](Generator::generate) assembles the result and runs both the
/// structural check and the profile validator.
pub trait Generator: Send + Sync {
    /// The format this generator produces.
    fn format_id(&self) -> FormatId;

    /// Serialize the invoice to the format's XML.
    fn to_xml(&self, invoice: &CanonicalInvoice) -> Result<String, EInvoiceError>;

    /// Local element names a well-formed document of this format must contain.
    fn required_elements(&self) -> &'static [&'static str];

    /// Render the visual PDF carrying `xml`. Only hybrid formats do this.
    fn render_pdf(
        &self,
        _invoice: &CanonicalInvoice,
        _xml: &str,
    ) -> Result<Option<Vec<u8>>, EInvoiceError> {
        Ok(None)
    }

    /// Cheap structural check: well-formed, and every required element present.
    fn validate(&self, xml: &str) -> StructuralCheck {
        structure::check(xml, self.required_elements())
    }

    /// Serialize, check and package the invoice.
    fn generate(&self, invoice: &CanonicalInvoice) -> Result<GenerationResult, EInvoiceError> {
        self.generate_with_tolerance(invoice, DEFAULT_TOLERANCE)
    }

    /// Like [`generate`](Generator::generate), with the profile validator
    /// comparing totals within `tolerance`.
    fn generate_with_tolerance(
        &self,
        invoice: &CanonicalInvoice,
        tolerance: Decimal,
    ) -> Result<GenerationResult, EInvoiceError> {
        let format = self.format_id();
        if invoice.invoice_number.trim().is_empty() {
            return Err(EInvoiceError::generation(format.as_str(), "invoice number is empty"));
        }

        let xml = self.to_xml(invoice).map_err(|e| as_generation_error(format, e))?;
        let pdf = self
            .render_pdf(invoice, &xml)
            .map_err(|e| as_generation_error(format, e))?;

        let structural = self.validate(&xml);
        let profile = validator_for(format).validate_with_tolerance(invoice, tolerance);

        let mut validation_errors = structural.errors;
        validation_errors.extend(profile.errors.iter().map(ToString::to_string));
        let validation_warnings: Vec<String> =
            profile.warnings.iter().map(ToString::to_string).collect();
        let validation_status = if validation_errors.is_empty() {
            ValidationStatus::Valid
        } else {
            ValidationStatus::Invalid
        };

        let meta = format_metadata(format);
        let file_size = pdf.as_ref().map_or(xml.len(), Vec::len);

        tracing::debug!(
            format = %format,
            invoice = %invoice.invoice_number,
            bytes = file_size,
            errors = validation_errors.len(),
            "document generated"
        );

        Ok(GenerationResult {
            file_name: file_name(&invoice.invoice_number, format),
            file_size,
            mime_type: meta.mime_type.to_string(),
            xml_content: xml,
            pdf_content: pdf,
            validation_status,
            validation_errors,
            validation_warnings,
        })
    }
}

fn as_generation_error(format: FormatId, err: EInvoiceError) -> EInvoiceError {
    match err {
        EInvoiceError::Generation { .. } => err,
        other => EInvoiceError::generation(format.as_str(), other),
    }
}

/// `<invoiceNumber>_<suffix>.<ext>` with path separators, reserved
/// characters and whitespace in the number replaced by `_`.
pub fn file_name(invoice_number: &str, format: FormatId) -> String {
    let number: String = invoice_number
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        })
        .collect();
    let number = match number.as_str() {
        "." | ".." => "_".to_string(),
        _ => number,
    };
    format!(
        "{number}_{}.{}",
        format.file_suffix(),
        format_metadata(format).file_extension
    )
}

static REGISTRY: LazyLock<HashMap<FormatId, Arc<dyn Generator>>> = LazyLock::new(|| {
    #[allow(unused_mut)]
    let mut generators: Vec<Arc<dyn Generator>> = vec![
        Arc::new(CiiGenerator::new(FormatId::XRechnungCii)),
        Arc::new(UblGenerator::new(FormatId::XRechnungUbl)),
        Arc::new(UblGenerator::new(FormatId::PeppolBis)),
        Arc::new(FatturaPaGenerator),
        Arc::new(KsefGenerator),
        Arc::new(UblGenerator::new(FormatId::Nlcius)),
        Arc::new(UblGenerator::new(FormatId::CiusRo)),
    ];
    #[cfg(feature = "facturx")]
    {
        use crate::facturx::FacturxGenerator;
        generators.push(Arc::new(FacturxGenerator::new(FormatId::FacturxEn16931)));
        generators.push(Arc::new(FacturxGenerator::new(FormatId::FacturxBasic)));
    }
    generators
        .into_iter()
        .map(|g| (g.format_id(), g))
        .collect()
});

/// Registry of shared generator instances keyed by format id.
pub struct GeneratorFactory;

impl GeneratorFactory {
    /// Generator for a format id string.
    pub fn create(format: &str) -> Result<Arc<dyn Generator>, EInvoiceError> {
        Self::for_format(format.parse()?)
    }

    /// Generator for a parsed format id. Hybrid formats are unavailable
    /// when the `facturx` feature is off.
    pub fn for_format(format: FormatId) -> Result<Arc<dyn Generator>, EInvoiceError> {
        REGISTRY
            .get(&format)
            .cloned()
            .ok_or_else(|| EInvoiceError::UnknownFormat(format.to_string()))
    }

    /// Formats with a registered generator, in registry order.
    pub fn supported_formats() -> Vec<FormatId> {
        FormatId::ALL
            .into_iter()
            .filter(|id| REGISTRY.contains_key(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn invoice(format: FormatId) -> CanonicalInvoice {
        InvoiceBuilder::new("RE 2024/001", format)
            .invoice_date(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
            .add_line(LineItemBuilder::new("Beratung", dec!(2), dec!(100)).tax_rate(dec!(19)).build())
            .build()
    }

    #[test]
    fn file_name_is_sanitised() {
        assert_eq!(
            file_name("RE 2024/001", FormatId::XRechnungUbl),
            "RE_2024_001_xrechnung_ubl.xml"
        );
        let name = file_name("A:B*C?\"<>|\\", FormatId::Ksef);
        assert!(name.starts_with("A_B_C_"));
        assert!(name.ends_with("_ksef.xml"));
        assert!(!name.contains(['/', '\\', ':', '*', '?', '"', '<', '>', '|']));
        assert_eq!(file_name("..", FormatId::PeppolBis), "__peppol.xml");
    }

    #[test]
    fn factory_returns_matching_generator() {
        for id in GeneratorFactory::supported_formats() {
            assert_eq!(GeneratorFactory::for_format(id).unwrap().format_id(), id);
        }
        assert!(matches!(
            GeneratorFactory::create("edifact"),
            Err(EInvoiceError::UnknownFormat(_))
        ));
    }

    #[test]
    fn factory_shares_instances() {
        let a = GeneratorFactory::create("ksef").unwrap();
        let b = GeneratorFactory::create("KSEF").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn empty_invoice_number_is_a_generation_error() {
        let mut inv = invoice(FormatId::XRechnungCii);
        inv.invoice_number = "  ".into();
        let generator = GeneratorFactory::for_format(FormatId::XRechnungCii).unwrap();
        assert!(matches!(
            generator.generate(&inv),
            Err(EInvoiceError::Generation { .. })
        ));
    }

    #[test]
    fn result_serializes_camel_case_without_pdf() {
        let generator = GeneratorFactory::for_format(FormatId::XRechnungUbl).unwrap();
        let result = generator.generate(&invoice(FormatId::XRechnungUbl)).unwrap();
        assert_eq!(result.file_size, result.xml_content.len());
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("pdfContent").is_none());
        assert_eq!(json["mimeType"], "application/xml");
        assert_eq!(json["validationStatus"], "invalid");
        assert!(json["validationErrors"].as_array().unwrap().len() > 0);
    }
}
