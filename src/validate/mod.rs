//! Profile validation: EN 16931 business rules plus the national and
//! network rules of each format.
//!
//! Each rule is a small pure function `fn(&CanonicalInvoice) -> Option<RuleViolation>`.
//! A profile is a fixed list of rule sets, and every rule runs on every
//! call, so one pass reports all violations. Validators never mutate the
//! invoice and do not depend on generation.
//!
//! ```rust
//! use eformat::core::*;
//! use eformat::formats::FormatId;
//! use eformat::validate::{Validator, validator_for};
//! use rust_decimal_macros::dec;
//!
//! let invoice = InvoiceBuilder::new("INV-1", FormatId::PeppolBis)
//!     .add_line(LineItemBuilder::new("Widget", dec!(1), dec!(10)).tax_rate(dec!(21)).build())
//!     .build();
//!
//! let result = validator_for(FormatId::PeppolBis).validate(&invoice);
//! assert!(!result.valid);
//! assert!(result.has_rule("PEPPOL-EN16931-R010"));
//! ```

mod ciusro;
pub(crate) mod eas;
mod en16931;
mod facturx;
mod fatturapa;
pub(crate) mod ksef;
mod nlcius;
mod peppol;
mod xrechnung;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::{CanonicalInvoice, DEFAULT_TOLERANCE, EInvoiceError, RuleViolation};
use crate::formats::FormatId;

pub use eas::{EAS_SCHEMES, EasScheme, eas_scheme_for_country, is_known_eas_code};
pub use ksef::{nip_checksum_valid, normalize_nip};

/// A single business rule.
pub type Rule = fn(&CanonicalInvoice) -> Option<RuleViolation>;

/// A rule comparing amounts within a money tolerance.
pub type AmountRule = fn(&CanonicalInvoice, Decimal) -> Option<RuleViolation>;

/// Outcome of validating one invoice against one profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True when no error-severity rule fired. Warnings do not count.
    pub valid: bool,
    pub errors: Vec<RuleViolation>,
    pub warnings: Vec<RuleViolation>,
}

impl ValidationResult {
    /// Whether any error or warning carries `rule_id`.
    pub fn has_rule(&self, rule_id: &str) -> bool {
        self.errors
            .iter()
            .chain(&self.warnings)
            .any(|v| v.rule_id == rule_id)
    }

    /// Rule ids of the errors, in rule order.
    pub fn error_ids(&self) -> Vec<&str> {
        self.errors.iter().map(|v| v.rule_id.as_str()).collect()
    }
}

/// A profile validator.
pub trait Validator: Send + Sync {
    /// The format whose rules this validator enforces.
    fn format_id(&self) -> FormatId;

    /// Rule sets in evaluation order.
    fn rule_sets(&self) -> &'static [&'static [Rule]];

    /// Run every rule and split the violations by severity.
    fn validate(&self, invoice: &CanonicalInvoice) -> ValidationResult {
        self.validate_with_tolerance(invoice, DEFAULT_TOLERANCE)
    }

    /// Like [`validate`](Validator::validate), comparing totals (BR-CO-10,
    /// BR-CO-15) within `tolerance`.
    fn validate_with_tolerance(
        &self,
        invoice: &CanonicalInvoice,
        tolerance: Decimal,
    ) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let rules = self.rule_sets().iter().flat_map(|set| set.iter()).map(|rule| rule(invoice));
        let amounts = en16931::AMOUNTS.iter().map(|rule| rule(invoice, tolerance));
        for violation in rules.chain(amounts).flatten() {
            if violation.is_error() {
                errors.push(violation);
            } else {
                warnings.push(violation);
            }
        }

        ValidationResult {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

/// A validator defined entirely by its static rule list.
#[derive(Debug)]
pub struct ProfileValidator {
    format: FormatId,
    rule_sets: &'static [&'static [Rule]],
}

impl Validator for ProfileValidator {
    fn format_id(&self) -> FormatId {
        self.format
    }

    fn rule_sets(&self) -> &'static [&'static [Rule]] {
        self.rule_sets
    }
}

const fn profile(format: FormatId, rule_sets: &'static [&'static [Rule]]) -> ProfileValidator {
    ProfileValidator { format, rule_sets }
}

static XRECHNUNG_CII: ProfileValidator = profile(FormatId::XRechnungCii, xrechnung::RULE_SETS);
static XRECHNUNG_UBL: ProfileValidator = profile(FormatId::XRechnungUbl, xrechnung::RULE_SETS);
static PEPPOL_BIS: ProfileValidator = profile(FormatId::PeppolBis, peppol::RULE_SETS);
static FACTURX_EN16931: ProfileValidator =
    profile(FormatId::FacturxEn16931, facturx::EN16931_RULE_SETS);
static FACTURX_BASIC: ProfileValidator = profile(FormatId::FacturxBasic, facturx::BASIC_RULE_SETS);
static FATTURAPA: ProfileValidator = profile(FormatId::FatturaPa, fatturapa::RULE_SETS);
static KSEF: ProfileValidator = profile(FormatId::Ksef, ksef::RULE_SETS);
static NLCIUS: ProfileValidator = profile(FormatId::Nlcius, nlcius::RULE_SETS);
static CIUS_RO: ProfileValidator = profile(FormatId::CiusRo, ciusro::RULE_SETS);

/// The validator for a format. Every registered format has one.
pub fn validator_for(format: FormatId) -> &'static ProfileValidator {
    match format {
        FormatId::XRechnungCii => &XRECHNUNG_CII,
        FormatId::XRechnungUbl => &XRECHNUNG_UBL,
        FormatId::PeppolBis => &PEPPOL_BIS,
        FormatId::FacturxEn16931 => &FACTURX_EN16931,
        FormatId::FacturxBasic => &FACTURX_BASIC,
        FormatId::FatturaPa => &FATTURAPA,
        FormatId::Ksef => &KSEF,
        FormatId::Nlcius => &NLCIUS,
        FormatId::CiusRo => &CIUS_RO,
    }
}

/// Lookup of profile validators by format id string.
pub struct ValidatorFactory;

impl ValidatorFactory {
    pub fn create(format: &str) -> Result<&'static dyn Validator, EInvoiceError> {
        let format: FormatId = format.parse()?;
        Ok(validator_for(format))
    }
}

/// Validate an invoice against the profile of its own output format.
pub fn validate_invoice(invoice: &CanonicalInvoice) -> ValidationResult {
    validator_for(invoice.output_format).validate(invoice)
}

/// `prefix[idx]` locations of the items for which `failing` holds.
pub(crate) fn collect_locations<T>(
    items: &[T],
    prefix: &str,
    mut failing: impl FnMut(&T) -> bool,
) -> Vec<String> {
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| failing(item))
        .map(|(idx, _)| format!("{prefix}[{idx}]"))
        .collect()
}

/// True when the optional text is missing or blank.
pub(crate) fn blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn every_format_has_a_matching_validator() {
        for id in FormatId::ALL {
            assert_eq!(validator_for(id).format_id(), id);
            assert_eq!(ValidatorFactory::create(id.as_str()).unwrap().format_id(), id);
        }
        assert!(ValidatorFactory::create("nope").is_err());
    }

    #[test]
    fn all_rules_run_without_short_circuit() {
        let empty = InvoiceBuilder::new("", FormatId::XRechnungCii).build();
        let result = validator_for(FormatId::XRechnungCii).validate(&empty);
        let ids = result.error_ids();
        for expected in ["BR-02", "BR-03", "BR-06", "BR-07", "BR-16", "BR-DE-15"] {
            assert!(ids.contains(&expected), "missing {expected} in {ids:?}");
        }
    }

    #[test]
    fn warnings_do_not_invalidate() {
        let invoice = InvoiceBuilder::new("FV/1", FormatId::Ksef)
            .currency("PLN")
            .invoice_date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
            .seller(PartyBuilder::new("Firma").vat_id("5260250274").build())
            .buyer(PartyBuilder::new("Klient").build())
            .add_line(LineItemBuilder::new("X", dec!(1), dec!(100)).tax_rate(dec!(19)).build())
            .build();
        let result = validate_invoice(&invoice);
        assert!(result.valid, "{:?}", result.errors);
        assert!(result.has_rule("KSEF-VAT-01"));
    }

    #[test]
    fn result_serializes_rule_fields() {
        let invoice = InvoiceBuilder::new("", FormatId::FacturxBasic).build();
        let json = serde_json::to_value(validate_invoice(&invoice)).unwrap();
        assert_eq!(json["valid"], false);
        let first = &json["errors"][0];
        assert!(first.get("ruleId").is_some());
        assert!(first.get("message").is_some());
        assert!(first.get("location").is_some());
        assert_eq!(first["severity"], "error");
    }

    #[test]
    fn warnings_survive_a_json_round_trip() {
        let invoice = InvoiceBuilder::new("FV/2", FormatId::Ksef)
            .currency("PLN")
            .invoice_date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
            .seller(PartyBuilder::new("Firma").vat_id("5260250274").build())
            .buyer(PartyBuilder::new("Klient").build())
            .add_line(LineItemBuilder::new("X", dec!(1), dec!(100)).tax_rate(dec!(19)).build())
            .build();
        let result = validate_invoice(&invoice);
        assert!(!result.warnings.is_empty());

        let json = serde_json::to_string(&result).unwrap();
        let back: ValidationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
        assert!(back.warnings.iter().all(|w| !w.is_error()));
    }
}
