//! XRechnung (German CIUS) rules, BR-DE-*.
//!
//! Shared by the CII and UBL syntaxes.

use super::en16931::{BUYER_ADDRESS, COMMON, CREDIT_NOTE, EN16931};
use super::{Rule, blank};
use crate::core::{CanonicalInvoice, RuleViolation};

pub(super) const RULE_SETS: &[&[Rule]] = &[COMMON, EN16931, BUYER_ADDRESS, CREDIT_NOTE, XRECHNUNG];

const XRECHNUNG: &[Rule] = &[
    br_de_1_iban,
    br_de_5_contact_name,
    br_de_6_contact_phone,
    br_de_7_contact_email,
    br_de_15_buyer_reference,
    br_de_16_seller_tax_id,
    br_de_currency,
    br_de_leitweg_shape,
];

/// EAS code of the Leitweg-ID.
const LEITWEG_SCHEME: &str = "0204";

// BR-DE-1: Payment instructions (BG-16) should carry a credit transfer account
fn br_de_1_iban(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    blank(&inv.payment.iban).then(|| {
        RuleViolation::warning(
            "BR-DE-1",
            "payment.iban",
            "XRechnung payment instructions should carry an IBAN (BT-84)",
        )
    })
}

// BR-DE-5: Seller contact name (BT-41)
fn br_de_5_contact_name(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    blank(&inv.seller.contact_name).then(|| {
        RuleViolation::error(
            "BR-DE-5",
            "seller.contactName",
            "XRechnung requires seller contact name (BT-41)",
        )
    })
}

// BR-DE-6: Seller contact telephone (BT-42)
fn br_de_6_contact_phone(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    blank(&inv.seller.phone).then(|| {
        RuleViolation::error(
            "BR-DE-6",
            "seller.phone",
            "XRechnung requires seller contact telephone (BT-42)",
        )
    })
}

// BR-DE-7: Seller contact email (BT-43)
fn br_de_7_contact_email(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    blank(&inv.seller.email).then(|| {
        RuleViolation::error(
            "BR-DE-7",
            "seller.email",
            "XRechnung requires seller contact email (BT-43)",
        )
    })
}

// BR-DE-15: Buyer reference (BT-10 / Leitweg-ID) must be provided
fn br_de_15_buyer_reference(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    blank(&inv.buyer_reference).then(|| {
        RuleViolation::error(
            "BR-DE-15",
            "buyerReference",
            "XRechnung requires buyer reference / Leitweg-ID (BT-10)",
        )
    })
}

// BR-DE-16: At least one of seller VAT ID (BT-31) or tax number (BT-32)
fn br_de_16_seller_tax_id(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    (blank(&inv.seller.vat_id) && blank(&inv.seller.tax_number)).then(|| {
        RuleViolation::error(
            "BR-DE-16",
            "seller.vatId",
            "XRechnung requires seller VAT ID (BT-31) or tax number (BT-32)",
        )
    })
}

fn br_de_currency(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    let currency = inv.currency.trim();
    (!currency.is_empty() && currency != "EUR").then(|| {
        RuleViolation::error(
            "BR-DE-EUR",
            "currency",
            format!("XRechnung invoices must be issued in EUR, got '{currency}'"),
        )
    })
}

/// Checked when the buyer routes by Leitweg-ID, or the reference starts
/// like one (digits followed by a dash). Free-text B2B references are left alone.
fn br_de_leitweg_shape(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    let reference = inv.buyer_reference.as_deref()?.trim();
    let routed_by_leitweg = inv
        .buyer
        .electronic_address_scheme
        .as_deref()
        .is_some_and(|s| s.trim() == LEITWEG_SCHEME);
    let looks_like_leitweg = reference.starts_with(|c: char| c.is_ascii_digit())
        && reference.contains('-');

    ((routed_by_leitweg || looks_like_leitweg) && !is_leitweg_id(reference)).then(|| {
        RuleViolation::warning(
            "BR-DE-LEITWEG",
            "buyerReference",
            format!("buyer reference '{reference}' is not a well-formed Leitweg-ID"),
        )
    })
}

/// Leitweg-ID: coarse address (2-12 digits), optional fine address (up
/// to 30 alphanumerics), check digits (2 digits), separated by dashes.
pub(crate) fn is_leitweg_id(value: &str) -> bool {
    let parts: Vec<&str> = value.split('-').collect();
    let (coarse, fine, check) = match parts.as_slice() {
        [coarse, check] => (*coarse, None, *check),
        [coarse, fine, check] => (*coarse, Some(*fine), *check),
        _ => return false,
    };

    let coarse_ok = (2..=12).contains(&coarse.len()) && coarse.chars().all(|c| c.is_ascii_digit());
    let fine_ok = fine.is_none_or(|f| {
        (1..=30).contains(&f.len()) && f.chars().all(|c| c.is_ascii_alphanumeric())
    });
    let check_ok = check.len() == 2 && check.chars().all(|c| c.is_ascii_digit());

    coarse_ok && fine_ok && check_ok
}
