//! Missing-field analysis for the "please fill in" hint shown to users.
//!
//! Driven by a declarative table per format. It has no effect on validity.

use serde::{Deserialize, Serialize};

use super::raw::RawExtraction;
use crate::formats::FormatId;

/// How a field is presented for a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Required,
    Optional,
    Hidden,
}

use Visibility::{Hidden, Optional, Required};

/// Fields that stand in for a required field, as each format's rules
/// accept them.
type Alternatives = &'static [(&'static str, &'static [&'static str])];

// BR-CO-26
static COMMON_ALTERNATIVES: Alternatives = &[
    ("sellerVatId", &["sellerTaxId", "sellerTaxNumber"]),
    ("buyerVatId", &["buyerTaxId", "buyerTaxNumber"]),
];

// BR-DE-16; BT-10 itself stays mandatory (BR-DE-15)
static XRECHNUNG_ALTERNATIVES: Alternatives = &[
    ("sellerVatId", &["sellerTaxNumber"]),
    ("buyerVatId", &["buyerTaxId", "buyerTaxNumber"]),
];

// PEPPOL-EN16931-R003
static PEPPOL_ALTERNATIVES: Alternatives = &[
    ("sellerVatId", &["sellerTaxId", "sellerTaxNumber"]),
    ("buyerVatId", &["buyerTaxId", "buyerTaxNumber"]),
    ("buyerReference", &["purchaseOrderReference"]),
];

// seller partita IVA is mandatory; buyer codice fiscale replaces it
static FATTURAPA_ALTERNATIVES: Alternatives = &[("buyerVatId", &["buyerTaxId"])];

// NIP from either identifier; CUI for Romania
static NIP_OR_CUI_ALTERNATIVES: Alternatives = &[
    ("sellerVatId", &["sellerTaxId"]),
    ("buyerVatId", &["buyerTaxId", "buyerTaxNumber"]),
];

static COMMON_FIELDS: &[(&str, Visibility)] = &[
    ("invoiceNumber", Required),
    ("invoiceDate", Required),
    ("currency", Optional),
    ("sellerName", Required),
    ("sellerAddress", Required),
    ("sellerCity", Required),
    ("sellerPostalCode", Required),
    ("sellerCountryCode", Required),
    ("sellerVatId", Required),
    ("buyerName", Required),
    ("buyerAddress", Optional),
    ("buyerCity", Optional),
    ("buyerPostalCode", Optional),
    ("buyerCountryCode", Required),
    ("buyerVatId", Optional),
    ("lineItems", Required),
    ("iban", Optional),
    ("paymentTerms", Optional),
    ("dueDate", Optional),
    ("buyerReference", Optional),
    ("sellerElectronicAddress", Hidden),
    ("buyerElectronicAddress", Hidden),
    ("sellerContactName", Hidden),
    ("sellerPhone", Hidden),
    ("sellerEmail", Optional),
];

static XRECHNUNG_FIELDS: &[(&str, Visibility)] = &[
    ("buyerReference", Required),
    ("buyerAddress", Required),
    ("buyerCity", Required),
    ("buyerPostalCode", Required),
    ("sellerContactName", Required),
    ("sellerPhone", Required),
    ("sellerEmail", Required),
    ("iban", Required),
    ("sellerElectronicAddress", Optional),
    ("buyerElectronicAddress", Optional),
];

static PEPPOL_FIELDS: &[(&str, Visibility)] = &[
    ("buyerReference", Required),
    ("sellerElectronicAddress", Required),
    ("buyerElectronicAddress", Required),
];

static FACTURX_FIELDS: &[(&str, Visibility)] = &[("buyerAddress", Optional)];

static FATTURAPA_FIELDS: &[(&str, Visibility)] = &[
    ("buyerAddress", Required),
    ("buyerCity", Required),
    ("buyerPostalCode", Required),
    ("buyerVatId", Required),
    ("buyerElectronicAddress", Optional),
];

static KSEF_FIELDS: &[(&str, Visibility)] = &[
    ("sellerPostalCode", Optional),
    ("sellerCity", Optional),
    ("buyerVatId", Optional),
];

static NLCIUS_FIELDS: &[(&str, Visibility)] = &[
    ("buyerAddress", Required),
    ("buyerCity", Required),
    ("buyerPostalCode", Required),
    ("sellerTaxId", Required),
];

static CIUS_RO_FIELDS: &[(&str, Visibility)] = &[
    ("buyerAddress", Required),
    ("buyerCity", Required),
    ("buyerPostalCode", Required),
];

/// Resolved field table for a format: common fields with the format's
/// overrides applied, in table order.
pub fn field_requirements(format: FormatId) -> Vec<(&'static str, Visibility)> {
    let overrides: &[(&str, Visibility)] = match format {
        FormatId::XRechnungCii | FormatId::XRechnungUbl => XRECHNUNG_FIELDS,
        FormatId::PeppolBis => PEPPOL_FIELDS,
        FormatId::FacturxEn16931 | FormatId::FacturxBasic => FACTURX_FIELDS,
        FormatId::FatturaPa => FATTURAPA_FIELDS,
        FormatId::Ksef => KSEF_FIELDS,
        FormatId::Nlcius => NLCIUS_FIELDS,
        FormatId::CiusRo => CIUS_RO_FIELDS,
    };

    let mut table: Vec<(&'static str, Visibility)> = COMMON_FIELDS.to_vec();
    for (field, visibility) in overrides {
        match table.iter_mut().find(|(name, _)| name == field) {
            Some(entry) => entry.1 = *visibility,
            None => table.push((*field, *visibility)),
        }
    }
    table
}

fn alternatives(format: FormatId) -> Alternatives {
    match format {
        FormatId::XRechnungCii | FormatId::XRechnungUbl => XRECHNUNG_ALTERNATIVES,
        FormatId::PeppolBis => PEPPOL_ALTERNATIVES,
        FormatId::FatturaPa => FATTURAPA_ALTERNATIVES,
        FormatId::Ksef | FormatId::CiusRo => NIP_OR_CUI_ALTERNATIVES,
        FormatId::FacturxEn16931 | FormatId::FacturxBasic | FormatId::Nlcius => COMMON_ALTERNATIVES,
    }
}

/// Required fields of `format` that the raw record does not provide,
/// under any alias or accepted alternative. Deduplicated, table order.
pub fn compute_missing_fields(raw: &RawExtraction, format: FormatId) -> Vec<String> {
    let mut missing: Vec<String> = Vec::new();

    for (field, visibility) in field_requirements(format) {
        if visibility != Required || raw.has(field) {
            continue;
        }
        let satisfied_by_alternative = alternatives(format)
            .iter()
            .filter(|(required, _)| *required == field)
            .any(|(_, alts)| alts.iter().any(|alt| raw.has(alt)));
        if satisfied_by_alternative {
            continue;
        }
        if !missing.iter().any(|m| m == field) {
            missing.push(field.to_string());
        }
    }

    missing
}
