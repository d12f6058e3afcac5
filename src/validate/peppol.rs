//! Peppol BIS Billing 3.0 rules on top of EN 16931.

use super::en16931::{BUYER_ADDRESS, COMMON, CREDIT_NOTE, EN16931};
use super::eas::is_known_eas_code;
use super::{Rule, blank};
use crate::core::{CanonicalInvoice, Party, RuleViolation};

pub(super) const RULE_SETS: &[&[Rule]] = &[COMMON, EN16931, BUYER_ADDRESS, CREDIT_NOTE, PEPPOL];

const PEPPOL: &[Rule] = &[r003_reference, r010_buyer_endpoint, r020_seller_endpoint, cl008_scheme];

// PEPPOL-EN16931-R003: A buyer reference or purchase order reference MUST be provided
fn r003_reference(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    (blank(&inv.buyer_reference) && blank(&inv.purchase_order_reference)).then(|| {
        RuleViolation::error(
            "PEPPOL-EN16931-R003",
            "buyerReference",
            "a buyer reference (BT-10) or purchase order reference (BT-13) is required",
        )
    })
}

// PEPPOL-EN16931-R010: Buyer electronic address MUST be provided
fn r010_buyer_endpoint(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    endpoint_gap(&inv.buyer, "buyer").map(|location| {
        RuleViolation::error(
            "PEPPOL-EN16931-R010",
            location,
            "buyer electronic address (BT-49) with scheme is required",
        )
    })
}

// PEPPOL-EN16931-R020: Seller electronic address MUST be provided
fn r020_seller_endpoint(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    endpoint_gap(&inv.seller, "seller").map(|location| {
        RuleViolation::error(
            "PEPPOL-EN16931-R020",
            location,
            "seller electronic address (BT-34) with scheme is required",
        )
    })
}

fn endpoint_gap(party: &Party, prefix: &str) -> Option<String> {
    if blank(&party.electronic_address) {
        Some(format!("{prefix}.electronicAddress"))
    } else if blank(&party.electronic_address_scheme) {
        Some(format!("{prefix}.electronicAddressScheme"))
    } else {
        None
    }
}

// PEPPOL-EN16931-CL008: Electronic address identifier scheme MUST be from the EAS code list
fn cl008_scheme(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    let bad: Vec<String> = [("seller", &inv.seller), ("buyer", &inv.buyer)]
        .into_iter()
        .filter_map(|(prefix, party)| {
            party
                .electronic_address_scheme
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty() && !is_known_eas_code(s))
                .map(|s| format!("{prefix}.electronicAddressScheme ('{s}')"))
        })
        .collect();

    (!bad.is_empty()).then(|| {
        RuleViolation::error(
            "PEPPOL-EN16931-CL008",
            bad.join(", "),
            "electronic address scheme is not in the EAS code list",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::*;
    use crate::formats::FormatId;
    use crate::validate::{Validator, validator_for};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn peppol_invoice() -> CanonicalInvoice {
        InvoiceBuilder::new("INV-77", FormatId::PeppolBis)
            .invoice_date(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap())
            .buyer_reference("PO-4711")
            .seller(
                PartyBuilder::new("Lieferant BV")
                    .address("Damrak 1", "Amsterdam", "1012 LG", "NL")
                    .vat_id("NL123456789B01")
                    .electronic_address("0106", "12345678")
                    .build(),
            )
            .buyer(
                PartyBuilder::new("Acheteur SA")
                    .address("Rue de la Loi 16", "Bruxelles", "1000", "BE")
                    .electronic_address("0208", "0123456789")
                    .build(),
            )
            .add_line(LineItemBuilder::new("Hosting", dec!(1), dec!(50)).tax_rate(dec!(21)).build())
            .build()
    }

    #[test]
    fn complete_peppol_invoice_is_valid() {
        let result = validator_for(FormatId::PeppolBis).validate(&peppol_invoice());
        assert!(result.valid, "{:?}", result.errors);
    }

    #[test]
    fn endpoint_needs_scheme_too() {
        let mut inv = peppol_invoice();
        inv.buyer.electronic_address_scheme = None;
        let v = r010_buyer_endpoint(&inv).unwrap();
        assert_eq!(v.location, "buyer.electronicAddressScheme");
        inv.seller.electronic_address = Some(" ".into());
        assert_eq!(r020_seller_endpoint(&inv).unwrap().location, "seller.electronicAddress");
    }

    #[test]
    fn unknown_scheme() {
        let mut inv = peppol_invoice();
        inv.buyer.electronic_address_scheme = Some("1234".into());
        let v = cl008_scheme(&inv).unwrap();
        assert!(v.location.starts_with("buyer."));
        assert!(r010_buyer_endpoint(&inv).is_none());
    }

    #[test]
    fn order_reference_satisfies_r003() {
        let mut inv = peppol_invoice();
        inv.buyer_reference = None;
        assert!(r003_reference(&inv).is_some());
        inv.purchase_order_reference = Some("4500012345".into());
        assert!(r003_reference(&inv).is_none());
    }
}
