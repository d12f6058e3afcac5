//! Format registry: static metadata for the nine supported e-invoice
//! formats, plus the advisory detection heuristic.
//!
//! | Id | Syntax | Countries |
//! |----|--------|-----------|
//! | `xrechnung-cii` | CII | DE |
//! | `xrechnung-ubl` | UBL | DE |
//! | `peppol-bis` | UBL | EU |
//! | `facturx-en16931` | CII in PDF/A-3 | FR, DE |
//! | `facturx-basic` | CII in PDF/A-3 | FR, DE |
//! | `fatturapa` | FatturaPA | IT |
//! | `ksef` | KSeF FA(2) | PL |
//! | `nlcius` | UBL | NL |
//! | `cius-ro` | UBL | RO |

mod detect;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::EInvoiceError;

pub use detect::detect_format_from_data;

/// Identifier of one supported output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FormatId {
    #[serde(rename = "xrechnung-cii")]
    XRechnungCii,
    #[serde(rename = "xrechnung-ubl")]
    XRechnungUbl,
    #[serde(rename = "peppol-bis")]
    PeppolBis,
    #[serde(rename = "facturx-en16931")]
    FacturxEn16931,
    #[serde(rename = "facturx-basic")]
    FacturxBasic,
    #[serde(rename = "fatturapa")]
    FatturaPa,
    #[serde(rename = "ksef")]
    Ksef,
    #[serde(rename = "nlcius")]
    Nlcius,
    #[serde(rename = "cius-ro")]
    CiusRo,
}

impl FormatId {
    pub const ALL: [FormatId; 9] = [
        Self::XRechnungCii,
        Self::XRechnungUbl,
        Self::PeppolBis,
        Self::FacturxEn16931,
        Self::FacturxBasic,
        Self::FatturaPa,
        Self::Ksef,
        Self::Nlcius,
        Self::CiusRo,
    ];

    /// The registry id string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::XRechnungCii => "xrechnung-cii",
            Self::XRechnungUbl => "xrechnung-ubl",
            Self::PeppolBis => "peppol-bis",
            Self::FacturxEn16931 => "facturx-en16931",
            Self::FacturxBasic => "facturx-basic",
            Self::FatturaPa => "fatturapa",
            Self::Ksef => "ksef",
            Self::Nlcius => "nlcius",
            Self::CiusRo => "cius-ro",
        }
    }

    /// Output is a PDF with the XML embedded.
    pub fn is_hybrid(&self) -> bool {
        matches!(self, Self::FacturxEn16931 | Self::FacturxBasic)
    }

    /// Suffix used in generated file names (`<number>_<suffix>.<ext>`).
    pub fn file_suffix(&self) -> &'static str {
        match self {
            Self::XRechnungCii => "xrechnung_cii",
            Self::XRechnungUbl => "xrechnung_ubl",
            Self::PeppolBis => "peppol",
            Self::FacturxEn16931 => "facturx_en16931",
            Self::FacturxBasic => "facturx_basic",
            Self::FatturaPa => "fatturapa",
            Self::Ksef => "ksef",
            Self::Nlcius => "nlcius",
            Self::CiusRo => "cius_ro",
        }
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatId {
    type Err = EInvoiceError;

    /// Case-insensitive; `_` is accepted in place of `-`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| EInvoiceError::UnknownFormat(s.to_string()))
    }
}

/// Serialization syntax family of a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyntaxType {
    /// UN/CEFACT Cross Industry Invoice.
    Cii,
    /// OASIS UBL 2.1.
    Ubl,
    /// Italian FatturaPA 1.2 schema.
    FatturaPa,
    /// Polish KSeF FA(2) schema.
    Ksef,
}

/// Static description of a format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatMetadata {
    pub id: FormatId,
    pub display_name: &'static str,
    pub description: &'static str,
    pub countries: &'static [&'static str],
    pub mime_type: &'static str,
    pub file_extension: &'static str,
    pub syntax_type: SyntaxType,
    pub spec_version: &'static str,
    #[serde(rename = "isEU")]
    pub is_eu: bool,
}

const EU_COUNTRIES: &[&str] = &[
    "AT", "BE", "BG", "CY", "CZ", "DE", "DK", "EE", "ES", "FI", "FR", "GR", "HR", "HU", "IE", "IT",
    "LT", "LU", "LV", "MT", "NL", "PL", "PT", "RO", "SE", "SI", "SK",
];

static FORMATS: [FormatMetadata; 9] = [
    FormatMetadata {
        id: FormatId::XRechnungCii,
        display_name: "XRechnung (CII)",
        description: "German CIUS of EN 16931 in UN/CEFACT CII syntax",
        countries: &["DE"],
        mime_type: "application/xml",
        file_extension: "xml",
        syntax_type: SyntaxType::Cii,
        spec_version: "3.0",
        is_eu: true,
    },
    FormatMetadata {
        id: FormatId::XRechnungUbl,
        display_name: "XRechnung (UBL)",
        description: "German CIUS of EN 16931 in UBL 2.1 syntax",
        countries: &["DE"],
        mime_type: "application/xml",
        file_extension: "xml",
        syntax_type: SyntaxType::Ubl,
        spec_version: "3.0",
        is_eu: true,
    },
    FormatMetadata {
        id: FormatId::PeppolBis,
        display_name: "Peppol BIS Billing",
        description: "Peppol BIS Billing 3.0 UBL invoice for cross-border network delivery",
        countries: EU_COUNTRIES,
        mime_type: "application/xml",
        file_extension: "xml",
        syntax_type: SyntaxType::Ubl,
        spec_version: "3.0",
        is_eu: true,
    },
    FormatMetadata {
        id: FormatId::FacturxEn16931,
        display_name: "Factur-X / ZUGFeRD (EN 16931)",
        description: "Hybrid PDF/A-3 with embedded CII XML, EN 16931 profile",
        countries: &["FR", "DE"],
        mime_type: "application/pdf",
        file_extension: "pdf",
        syntax_type: SyntaxType::Cii,
        spec_version: "1.07",
        is_eu: true,
    },
    FormatMetadata {
        id: FormatId::FacturxBasic,
        display_name: "Factur-X / ZUGFeRD (Basic)",
        description: "Hybrid PDF/A-3 with embedded CII XML, Basic profile",
        countries: &["FR", "DE"],
        mime_type: "application/pdf",
        file_extension: "pdf",
        syntax_type: SyntaxType::Cii,
        spec_version: "1.07",
        is_eu: true,
    },
    FormatMetadata {
        id: FormatId::FatturaPa,
        display_name: "FatturaPA",
        description: "Italian electronic invoice for the Sistema di Interscambio (SdI)",
        countries: &["IT"],
        mime_type: "application/xml",
        file_extension: "xml",
        syntax_type: SyntaxType::FatturaPa,
        spec_version: "1.2.2",
        is_eu: true,
    },
    FormatMetadata {
        id: FormatId::Ksef,
        display_name: "KSeF FA(2)",
        description: "Polish National e-Invoice System structured invoice, schema FA(2)",
        countries: &["PL"],
        mime_type: "application/xml",
        file_extension: "xml",
        syntax_type: SyntaxType::Ksef,
        spec_version: "FA(2) 1-0E",
        is_eu: true,
    },
    FormatMetadata {
        id: FormatId::Nlcius,
        display_name: "NLCIUS",
        description: "Dutch CIUS of EN 16931 (SI-UBL 2.0)",
        countries: &["NL"],
        mime_type: "application/xml",
        file_extension: "xml",
        syntax_type: SyntaxType::Ubl,
        spec_version: "2.0",
        is_eu: true,
    },
    FormatMetadata {
        id: FormatId::CiusRo,
        display_name: "CIUS-RO",
        description: "Romanian CIUS of EN 16931 for RO e-Factura",
        countries: &["RO"],
        mime_type: "application/xml",
        file_extension: "xml",
        syntax_type: SyntaxType::Ubl,
        spec_version: "1.0.9",
        is_eu: true,
    },
];

/// Metadata for a known format.
pub fn format_metadata(id: FormatId) -> &'static FormatMetadata {
    // FORMATS is laid out in declaration order of FormatId
    &FORMATS[id as usize]
}

/// Metadata by id string; fails with [`EInvoiceError::UnknownFormat`].
pub fn get_format_metadata(id: &str) -> Result<&'static FormatMetadata, EInvoiceError> {
    let id: FormatId = id.parse()?;
    Ok(format_metadata(id))
}

/// All nine formats in registry order.
pub fn get_all_formats() -> &'static [FormatMetadata] {
    &FORMATS
}

/// Formats applicable to an ISO country (case-insensitive). Empty for
/// countries outside the EU.
pub fn get_formats_by_country(country: &str) -> Vec<&'static FormatMetadata> {
    let country = country.trim().to_ascii_uppercase();
    FORMATS
        .iter()
        .filter(|m| m.countries.contains(&country.as_str()))
        .collect()
}
