//! Factur-X / ZUGFeRD hybrid invoices.
//!
//! The invoice is rendered as an A4 PDF and the CII XML is attached as
//! `factur-x.xml` with PDF/A-3 metadata. Both supported profiles share the
//! CII serializer; they differ in the guideline id, the XMP conformance
//! level and the rule set applied by the validator.
//!
//! | Profile | Format id | Conformance |
//! |---------|-----------|-------------|
//! | EN 16931 | `facturx-en16931` | `EN 16931` |
//! | Basic | `facturx-basic` | `BASIC` |

mod extract;
mod pdf;
mod xmp;

use crate::core::{CanonicalInvoice, EInvoiceError};
use crate::formats::FormatId;
use crate::generate::cii::{CII_REQUIRED, to_cii_xml};
use crate::generate::{FACTURX_BASIC_GUIDELINE, FACTURX_EN16931_GUIDELINE, Generator};

pub use extract::extract_from_pdf;
pub use pdf::{render_hybrid_pdf, render_invoice_pdf};
pub use xmp::build_xmp;

/// The embedded XML filename per Factur-X 1.0+.
pub const FACTURX_FILENAME: &str = "factur-x.xml";

/// Factur-X conformance profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacturxProfile {
    /// Basic: line items without the full EN 16931 data set.
    Basic,
    /// Full European norm.
    En16931,
}

impl FacturxProfile {
    /// Profile of a hybrid format id.
    pub fn from_format(format: FormatId) -> Option<Self> {
        match format {
            FormatId::FacturxEn16931 => Some(Self::En16931),
            FormatId::FacturxBasic => Some(Self::Basic),
            _ => None,
        }
    }

    pub fn format_id(&self) -> FormatId {
        match self {
            Self::En16931 => FormatId::FacturxEn16931,
            Self::Basic => FormatId::FacturxBasic,
        }
    }

    /// Guideline id written to `GuidelineSpecifiedDocumentContextParameter`.
    pub fn urn(&self) -> &'static str {
        match self {
            Self::En16931 => FACTURX_EN16931_GUIDELINE,
            Self::Basic => FACTURX_BASIC_GUIDELINE,
        }
    }

    /// The XMP ConformanceLevel value.
    pub fn conformance_level(&self) -> &'static str {
        match self {
            Self::En16931 => "EN 16931",
            Self::Basic => "BASIC",
        }
    }

    /// AFRelationship of the embedded file.
    pub fn af_relationship(&self) -> &'static str {
        "Alternative"
    }
}

/// Generator for both Factur-X profiles: CII XML plus the hybrid PDF.
#[derive(Debug, Clone, Copy)]
pub struct FacturxGenerator {
    profile: FacturxProfile,
}

impl FacturxGenerator {
    /// Non-hybrid format ids fall back to the EN 16931 profile.
    pub fn new(format: FormatId) -> Self {
        Self {
            profile: FacturxProfile::from_format(format).unwrap_or(FacturxProfile::En16931),
        }
    }

    pub fn profile(&self) -> FacturxProfile {
        self.profile
    }
}

impl Generator for FacturxGenerator {
    fn format_id(&self) -> FormatId {
        self.profile.format_id()
    }

    fn to_xml(&self, invoice: &CanonicalInvoice) -> Result<String, EInvoiceError> {
        to_cii_xml(invoice, self.profile.urn(), None)
    }

    fn required_elements(&self) -> &'static [&'static str] {
        CII_REQUIRED
    }

    fn render_pdf(
        &self,
        invoice: &CanonicalInvoice,
        xml: &str,
    ) -> Result<Option<Vec<u8>>, EInvoiceError> {
        render_hybrid_pdf(invoice, self.profile, xml).map(Some)
    }
}
