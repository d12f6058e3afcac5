//! KSeF FA(2) rules: seller NIP, Polish VAT rate buckets and
//! correction invoices.

use std::collections::BTreeSet;

use super::en16931::COMMON;
use super::{Rule, blank};
use crate::core::{CanonicalInvoice, RuleViolation};
use crate::generate::ksef::RateBucket;

pub(super) const RULE_SETS: &[&[Rule]] = &[COMMON, KSEF];

const KSEF: &[Rule] = &[nip_format, nip_checksum, statutory_rates, correction_reference];

const NIP_WEIGHTS: [u32; 9] = [6, 5, 7, 2, 3, 4, 5, 6, 7];

/// Strip an optional `PL` prefix, spaces and dashes from a NIP.
///
/// Returns the 10 digits, or `None` when anything else remains.
///
/// ```
/// use eformat::validate::normalize_nip;
///
/// assert_eq!(normalize_nip("PL 526-025-02-74").as_deref(), Some("5260250274"));
/// assert_eq!(normalize_nip("DE123456789"), None);
/// ```
pub fn normalize_nip(value: &str) -> Option<String> {
    let value = value.trim();
    let value = match value.get(..2) {
        Some(prefix) if prefix.eq_ignore_ascii_case("PL") => &value[2..],
        _ => value,
    };
    let digits: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    (digits.len() == 10 && digits.chars().all(|c| c.is_ascii_digit())).then_some(digits)
}

/// Weighted mod-11 check of a normalized 10-digit NIP.
pub fn nip_checksum_valid(nip: &str) -> bool {
    let digits: Vec<u32> = nip.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 10 {
        return false;
    }
    let sum: u32 = digits.iter().zip(NIP_WEIGHTS).map(|(d, w)| d * w).sum();
    let check = sum % 11;
    check != 10 && check == digits[9]
}

fn seller_nip_source(inv: &CanonicalInvoice) -> Option<&str> {
    [&inv.seller.vat_id, &inv.seller.tax_id]
        .into_iter()
        .filter_map(|id| id.as_deref())
        .find(|id| !id.trim().is_empty())
}

fn nip_format(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    match seller_nip_source(inv) {
        None => Some(RuleViolation::error(
            "KSEF-NIP-01",
            "seller.vatId",
            "KSeF requires the seller NIP",
        )),
        Some(raw) if normalize_nip(raw).is_none() => Some(RuleViolation::error(
            "KSEF-NIP-01",
            "seller.vatId",
            format!("seller NIP '{raw}' must be 10 digits"),
        )),
        Some(_) => None,
    }
}

fn nip_checksum(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    let nip = seller_nip_source(inv).and_then(normalize_nip)?;
    (!nip_checksum_valid(&nip)).then(|| {
        RuleViolation::warning(
            "KSEF-NIP-02",
            "seller.vatId",
            format!("seller NIP {nip} fails the checksum"),
        )
    })
}

fn statutory_rates(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    let lines = inv
        .line_items
        .iter()
        .map(|l| ("lineItems.taxRate", l.category_code(), l.tax_rate));
    // unrated allowances/charges are spread over the line rates
    let allowance_charges = inv
        .allowance_charges
        .iter()
        .filter(|ac| ac.tax_rate.is_some())
        .map(|ac| ("allowanceCharges.taxRate", ac.category_code(), ac.rate()));

    let mut locations = BTreeSet::new();
    let mut odd = BTreeSet::new();
    for (location, category, rate) in lines.chain(allowance_charges) {
        if RateBucket::classify(&category, rate) == RateBucket::Other {
            locations.insert(location);
            odd.insert(rate.normalize().to_string());
        }
    }

    (!odd.is_empty()).then(|| {
        let listed: Vec<String> = odd
            .iter()
            .map(|r| format!("rate {r}% is not a standard Polish VAT rate (23%, 8%, 5%, 0%)"))
            .collect();
        RuleViolation::warning(
            "KSEF-VAT-01",
            locations.into_iter().collect::<Vec<_>>().join(", "),
            format!("{}; amount reported under P_13_5", listed.join("; ")),
        )
    })
}

fn correction_reference(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    (inv.is_credit_note() && blank(&inv.preceding_invoice_reference)).then(|| {
        RuleViolation::error(
            "KSEF-KOR-01",
            "precedingInvoiceReference",
            "KOR correction invoice must reference the corrected invoice",
        )
    })
}
