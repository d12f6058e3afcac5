//! NLCIUS (SI-UBL 2.0) rules for Dutch suppliers and buyers.

use super::en16931::{BUYER_ADDRESS, COMMON, CREDIT_NOTE, EN16931};
use super::{Rule, blank};
use crate::core::{CanonicalInvoice, Party, RuleViolation};

pub(super) const RULE_SETS: &[&[Rule]] = &[COMMON, EN16931, BUYER_ADDRESS, CREDIT_NOTE, NLCIUS];

const NLCIUS: &[Rule] = &[br_nl_1_registration, br_nl_3_seller_address, br_nl_10_buyer_address];

fn is_dutch(party: &Party) -> bool {
    party.country().as_deref() == Some("NL")
}

fn missing_address_parts(party: &Party, prefix: &str) -> Vec<String> {
    [
        ("address", &party.address),
        ("city", &party.city),
        ("postalCode", &party.postal_code),
    ]
    .into_iter()
    .filter(|(_, value)| blank(value))
    .map(|(field, _)| format!("{prefix}.{field}"))
    .collect()
}

// BR-NL-1: A Dutch supplier shall carry its KvK or OIN number
fn br_nl_1_registration(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    (is_dutch(&inv.seller) && blank(&inv.seller.tax_id)).then(|| {
        RuleViolation::error(
            "BR-NL-1",
            "seller.taxId",
            "Dutch supplier requires a KvK or OIN registration number (BT-30)",
        )
    })
}

// BR-NL-3: A Dutch supplier address shall contain street, city and postcode
fn br_nl_3_seller_address(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    if !is_dutch(&inv.seller) {
        return None;
    }
    let missing = missing_address_parts(&inv.seller, "seller");
    (!missing.is_empty()).then(|| {
        RuleViolation::error(
            "BR-NL-3",
            missing.join(", "),
            "Dutch supplier address requires street, city and postcode",
        )
    })
}

// BR-NL-10: A Dutch buyer address shall contain street, city and postcode
fn br_nl_10_buyer_address(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    if !is_dutch(&inv.buyer) {
        return None;
    }
    let missing = missing_address_parts(&inv.buyer, "buyer");
    (!missing.is_empty()).then(|| {
        RuleViolation::error(
            "BR-NL-10",
            missing.join(", "),
            "Dutch buyer address requires street, city and postcode",
        )
    })
}
