//! CIUS-RO rules for RO e-Factura.

use super::en16931::{BUYER_ADDRESS, COMMON, CREDIT_NOTE, EN16931};
use super::{Rule, blank};
use crate::core::{CanonicalInvoice, RuleViolation};

pub(super) const RULE_SETS: &[&[Rule]] = &[COMMON, EN16931, BUYER_ADDRESS, CREDIT_NOTE, CIUS_RO];

const CIUS_RO: &[Rule] = &[br_ro_010_number_digit, seller_tax_id, street_lines];

// BR-RO-010: The invoice number shall contain at least one digit
fn br_ro_010_number_digit(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    let number = inv.invoice_number.trim();
    (!number.is_empty() && !number.chars().any(|c| c.is_ascii_digit())).then(|| {
        RuleViolation::error(
            "BR-RO-010",
            "invoiceNumber",
            "invoice number must contain at least one digit",
        )
    })
}

fn seller_tax_id(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    (blank(&inv.seller.vat_id) && blank(&inv.seller.tax_id)).then(|| {
        RuleViolation::error(
            "BR-RO-TAXID",
            "seller.vatId",
            "seller requires a VAT ID (RO...) or a CUI registration code",
        )
    })
}

fn street_lines(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    let missing: Vec<&str> = [
        ("seller.address", &inv.seller.address),
        ("buyer.address", &inv.buyer.address),
    ]
    .into_iter()
    .filter(|(_, street)| blank(street))
    .map(|(location, _)| location)
    .collect();

    (!missing.is_empty()).then(|| {
        RuleViolation::error(
            "BR-RO-ADDRESS",
            missing.join(", "),
            "CIUS-RO requires a street line for seller and buyer",
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

    fn factura() -> CanonicalInvoice {
        InvoiceBuilder::new("RO-0001", FormatId::CiusRo)
            .currency("RON")
            .invoice_date(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap())
            .seller(
                PartyBuilder::new("Furnizor SRL")
                    .address("Str. Victoriei 10", "Bucuresti", "010061", "RO")
                    .vat_id("RO1234567")
                    .build(),
            )
            .buyer(
                PartyBuilder::new("Client SA")
                    .address("Bd. Eroilor 5", "Cluj-Napoca", "400129", "RO")
                    .tax_id("7654321")
                    .build(),
            )
            .add_line(LineItemBuilder::new("Servicii", dec!(4), dec!(25)).tax_rate(dec!(19)).build())
            .build()
    }

    #[test]
    fn complete_factura_is_valid() {
        let result = validator_for(FormatId::CiusRo).validate(&factura());
        assert!(result.valid, "{:?}", result.errors);
    }

    #[test]
    fn number_without_digit() {
        let mut inv = factura();
        inv.invoice_number = "FACT-A".into();
        assert_eq!(br_ro_010_number_digit(&inv).unwrap().rule_id, "BR-RO-010");
    }

    #[test]
    fn cui_satisfies_tax_id() {
        let mut inv = factura();
        inv.seller.vat_id = None;
        assert!(seller_tax_id(&inv).is_some());
        inv.seller.tax_id = Some("1234567".into());
        assert!(seller_tax_id(&inv).is_none());
    }

    #[test]
    fn both_streets_required() {
        let mut inv = factura();
        inv.seller.address = None;
        inv.buyer.address = Some("".into());
        assert_eq!(street_lines(&inv).unwrap().location, "seller.address, buyer.address");
    }
}
