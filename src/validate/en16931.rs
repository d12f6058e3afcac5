//! EN 16931 core rules shared by the profiles.
//!
//! `COMMON` runs for every format, including the non-EN 16931 national
//! schemas. `EN16931` adds the party, identifier and VAT category rules of
//! the European norm; `BUYER_ADDRESS` and `CREDIT_NOTE` are split out
//! because not every CIUS enforces them.

use rust_decimal::Decimal;

use super::{AmountRule, Rule, blank, collect_locations};
use crate::core::codes::{
    is_known_country_code, is_known_currency_code, is_known_unit_code,
};
use crate::core::money::{money_equal, totals_consistent};
use crate::core::{CanonicalInvoice, Party, RuleViolation, TaxCategory};

/// BT-1 length limit.
const MAX_INVOICE_NUMBER_LEN: usize = 256;

pub(super) const COMMON: &[Rule] = &[
    br_02_invoice_number,
    br_03_issue_date,
    br_05_currency,
    br_cl_04_currency_code,
    br_06_seller_name,
    br_07_buyer_name,
    br_16_lines,
    br_cl_14_country_codes,
    br_cl_18_tax_categories,
    br_cl_23_unit_codes,
];

pub(super) const EN16931: &[Rule] = &[
    br_08_seller_address,
    br_09_seller_country,
    br_11_buyer_country,
    br_co_26_seller_identifier,
    br_co_09_vat_prefix,
    br_s_05_standard_rate,
    br_z_05_zero_rate,
    br_e_05_exempt_rate,
    br_ae_05_reverse_charge_rate,
];

/// Arithmetic checks, run by every profile with the caller's tolerance.
pub(super) const AMOUNTS: &[AmountRule] = &[br_co_10_line_sum, br_co_15_total];

pub(super) const BUYER_ADDRESS: &[Rule] = &[br_10_buyer_address];

pub(super) const CREDIT_NOTE: &[Rule] = &[br_55_preceding_invoice];

// BR-02: An Invoice shall have an Invoice number
fn br_02_invoice_number(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    let number = inv.invoice_number.trim();
    if number.is_empty() {
        return Some(RuleViolation::error(
            "BR-02",
            "invoiceNumber",
            "invoice number must not be empty",
        ));
    }
    if number.chars().count() > MAX_INVOICE_NUMBER_LEN {
        return Some(RuleViolation::error(
            "BR-02",
            "invoiceNumber",
            format!("invoice number must not exceed {MAX_INVOICE_NUMBER_LEN} characters"),
        ));
    }
    None
}

// BR-03: An Invoice shall have an Invoice issue date
fn br_03_issue_date(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    inv.invoice_date.is_none().then(|| {
        RuleViolation::error("BR-03", "invoiceDate", "invoice issue date (BT-2) is required")
    })
}

// BR-05: An Invoice shall have an Invoice currency code
fn br_05_currency(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    inv.currency.trim().is_empty().then(|| {
        RuleViolation::error("BR-05", "currency", "currency code must not be empty")
    })
}

fn br_cl_04_currency_code(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    let code = inv.currency.trim();
    (!code.is_empty() && !is_known_currency_code(code)).then(|| {
        RuleViolation::error(
            "BR-CL-04",
            "currency",
            format!("currency code '{code}' is not a known ISO 4217 code"),
        )
    })
}

// BR-06: An Invoice shall contain the Seller name
fn br_06_seller_name(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    inv.seller.name.trim().is_empty().then(|| {
        RuleViolation::error("BR-06", "seller.name", "seller name (BT-27) is required")
    })
}

// BR-07: An Invoice shall contain the Buyer name
fn br_07_buyer_name(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    inv.buyer.name.trim().is_empty().then(|| {
        RuleViolation::error("BR-07", "buyer.name", "buyer name (BT-44) is required")
    })
}

// BR-08: An Invoice shall contain the Seller postal address
fn br_08_seller_address(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    postal_address_gap(&inv.seller, "seller").map(|(location, what)| {
        RuleViolation::error("BR-08", location, format!("seller postal address requires {what}"))
    })
}

// BR-09: The Seller postal address shall contain a country code
fn br_09_seller_country(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    inv.seller.country().is_none().then(|| {
        RuleViolation::error(
            "BR-09",
            "seller.countryCode",
            "seller country code (BT-40) is required",
        )
    })
}

// BR-10: An Invoice shall contain the Buyer postal address
fn br_10_buyer_address(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    postal_address_gap(&inv.buyer, "buyer").map(|(location, what)| {
        RuleViolation::error("BR-10", location, format!("buyer postal address requires {what}"))
    })
}

// BR-11: The Buyer postal address shall contain a country code
fn br_11_buyer_country(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    inv.buyer.country().is_none().then(|| {
        RuleViolation::error(
            "BR-11",
            "buyer.countryCode",
            "buyer country code (BT-55) is required",
        )
    })
}

fn postal_address_gap(party: &Party, prefix: &str) -> Option<(String, &'static str)> {
    match (blank(&party.city), blank(&party.postal_code)) {
        (false, false) => None,
        (true, false) => Some((format!("{prefix}.city"), "a city")),
        (false, true) => Some((format!("{prefix}.postalCode"), "a postal code")),
        (true, true) => Some((format!("{prefix}.address"), "a city and a postal code")),
    }
}

// BR-16: An Invoice shall have at least one Invoice line
fn br_16_lines(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    inv.line_items.is_empty().then(|| {
        RuleViolation::error("BR-16", "lineItems", "invoice must have at least one line item")
    })
}

// BR-CO-10: Sum of Invoice line net amount = Σ Invoice line net amount
fn br_co_10_line_sum(inv: &CanonicalInvoice, tolerance: Decimal) -> Option<RuleViolation> {
    let line_sum: Decimal = inv.line_items.iter().map(|l| l.total_price).sum();
    (!money_equal(line_sum, inv.totals.subtotal, tolerance)).then(|| {
        RuleViolation::error(
            "BR-CO-10",
            "totals.subtotal",
            format!(
                "sum of line net amounts ({line_sum}) does not match subtotal ({})",
                inv.totals.subtotal
            ),
        )
    })
}

// BR-CO-15: Invoice total amount with VAT = net total + VAT total
fn br_co_15_total(inv: &CanonicalInvoice, tolerance: Decimal) -> Option<RuleViolation> {
    let t = &inv.totals;
    (!totals_consistent(t, tolerance)).then(|| {
        RuleViolation::error(
            "BR-CO-15",
            "totals.totalAmount",
            format!(
                "total amount ({}) does not equal subtotal ({}) - allowances ({}) + charges ({}) + tax ({})",
                t.total_amount, t.subtotal, t.allowance_total, t.charge_total, t.tax_amount
            ),
        )
    })
}

// BR-CO-26: The Seller shall be identified by a VAT identifier, legal
// registration identifier or tax registration number
fn br_co_26_seller_identifier(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    (!inv.seller.has_tax_identifier()).then(|| {
        RuleViolation::error(
            "BR-CO-26",
            "seller.vatId",
            "seller must have a VAT ID (BT-31), legal registration id (BT-30) or tax number (BT-32)",
        )
    })
}

// BR-CO-09: VAT identifiers shall be prefixed with an ISO 3166-1 alpha-2
// country code (Greece may use EL)
fn br_co_09_vat_prefix(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    let bad: Vec<&str> = [("seller.vatId", &inv.seller), ("buyer.vatId", &inv.buyer)]
        .into_iter()
        .filter(|(_, party)| {
            party
                .vat_id
                .as_deref()
                .map(str::trim)
                .is_some_and(|id| !id.is_empty() && !has_country_prefix(id))
        })
        .map(|(location, _)| location)
        .collect();

    (!bad.is_empty()).then(|| {
        RuleViolation::error(
            "BR-CO-09",
            bad.join(", "),
            "VAT ID must start with a 2-letter country code (e.g. DE, FR, NL)",
        )
    })
}

fn has_country_prefix(vat_id: &str) -> bool {
    vat_id
        .get(..2)
        .is_some_and(|p| p == "EL" || is_known_country_code(p))
        && vat_id.len() > 2
}

fn rate_rule(
    inv: &CanonicalInvoice,
    rule_id: &str,
    category: &str,
    rate_ok: fn(Decimal) -> bool,
    expectation: &str,
) -> Option<RuleViolation> {
    let lines = collect_locations(&inv.line_items, "lineItems", |l| {
        l.category_code() == category && !rate_ok(l.tax_rate)
    });
    let acs = collect_locations(&inv.allowance_charges, "allowanceCharges", |ac| {
        ac.tax_rate.is_some_and(|rate| {
            ac.tax_category_code
                .as_deref()
                .is_some_and(|c| c.trim().eq_ignore_ascii_case(category))
                && !rate_ok(rate)
        })
    });
    let locations: Vec<String> = lines.into_iter().chain(acs).collect();

    (!locations.is_empty()).then(|| {
        RuleViolation::error(
            rule_id,
            locations.join(", "),
            format!("VAT category '{category}' requires {expectation}"),
        )
    })
}

// BR-S-05: Standard rated lines shall have a rate greater than zero
fn br_s_05_standard_rate(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    rate_rule(inv, "BR-S-05", "S", |r| r > Decimal::ZERO, "a rate greater than 0")
}

// BR-Z-05: Zero rated lines shall have a rate of 0
fn br_z_05_zero_rate(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    rate_rule(inv, "BR-Z-05", "Z", |r| r.is_zero(), "a rate of 0")
}

// BR-E-05: Exempt lines shall have a rate of 0
fn br_e_05_exempt_rate(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    rate_rule(inv, "BR-E-05", "E", |r| r.is_zero(), "a rate of 0")
}

// BR-AE-05: Reverse charge lines shall have a rate of 0
fn br_ae_05_reverse_charge_rate(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    rate_rule(inv, "BR-AE-05", "AE", |r| r.is_zero(), "a rate of 0")
}

fn br_cl_14_country_codes(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    let bad: Vec<String> = [("seller", &inv.seller), ("buyer", &inv.buyer)]
        .into_iter()
        .filter_map(|(prefix, party)| {
            party
                .country()
                .filter(|c| !is_known_country_code(c))
                .map(|c| format!("{prefix}.countryCode ('{c}')"))
        })
        .collect();

    (!bad.is_empty()).then(|| {
        RuleViolation::error(
            "BR-CL-14",
            bad.join(", "),
            "country code is not in ISO 3166-1 alpha-2",
        )
    })
}

fn br_cl_18_tax_categories(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    let unknown = |code: &Option<String>| {
        code.as_deref()
            .map(str::trim)
            .is_some_and(|c| !c.is_empty() && TaxCategory::from_code(c).is_none())
    };
    let lines = collect_locations(&inv.line_items, "lineItems", |l| {
        unknown(&l.tax_category_code)
    });
    let acs = collect_locations(&inv.allowance_charges, "allowanceCharges", |ac| {
        unknown(&ac.tax_category_code)
    });
    let locations: Vec<String> = lines.into_iter().chain(acs).collect();

    (!locations.is_empty()).then(|| {
        RuleViolation::error(
            "BR-CL-18",
            locations.join(", "),
            "tax category code is not in UNTDID 5305",
        )
    })
}

fn br_cl_23_unit_codes(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    let locations = collect_locations(&inv.line_items, "lineItems", |l| {
        !is_known_unit_code(l.unit_code.trim())
    });
    (!locations.is_empty()).then(|| {
        RuleViolation::warning(
            "BR-CL-23",
            locations.join(", "),
            "unit code is not a known UN/ECE Rec 20 code",
        )
    })
}

// BR-55: A credit note shall reference the preceding invoice
fn br_55_preceding_invoice(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    (inv.is_credit_note() && blank(&inv.preceding_invoice_reference)).then(|| {
        RuleViolation::error(
            "BR-55",
            "precedingInvoiceReference",
            "credit note must reference the preceding invoice (BT-25)",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::*;
    use crate::formats::FormatId;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn complete() -> CanonicalInvoice {
        InvoiceBuilder::new("INV-1", FormatId::PeppolBis)
            .invoice_date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
            .seller(
                PartyBuilder::new("Seller BV")
                    .address("Keizersgracht 1", "Amsterdam", "1015 CJ", "NL")
                    .vat_id("NL123456789B01")
                    .build(),
            )
            .buyer(
                PartyBuilder::new("Buyer GmbH")
                    .address("Hauptstr. 1", "Berlin", "10115", "DE")
                    .build(),
            )
            .add_line(LineItemBuilder::new("Service", dec!(2), dec!(100)).tax_rate(dec!(21)).build())
            .build()
    }

    fn fired(rules: &[Rule], inv: &CanonicalInvoice) -> Vec<String> {
        rules.iter().filter_map(|r| r(inv)).map(|v| v.rule_id).collect()
    }

    #[test]
    fn complete_invoice_passes_all_sets() {
        let inv = complete();
        for set in [COMMON, EN16931, BUYER_ADDRESS, CREDIT_NOTE] {
            assert!(fired(set, &inv).is_empty(), "{:?}", fired(set, &inv));
        }
    }

    #[test]
    fn invoice_number_length() {
        let mut inv = complete();
        inv.invoice_number = "X".repeat(256);
        assert!(br_02_invoice_number(&inv).is_none());
        inv.invoice_number = "X".repeat(257);
        assert!(br_02_invoice_number(&inv).is_some());
        inv.invoice_number = "   ".into();
        assert!(br_02_invoice_number(&inv).is_some());
    }

    #[test]
    fn tampered_totals_break_consistency() {
        let tolerance = crate::core::DEFAULT_TOLERANCE;
        let mut inv = complete();
        inv.totals.total_amount += dec!(0.02);
        assert!(br_co_15_total(&inv, tolerance).is_none());
        inv.totals.total_amount += dec!(0.01);
        assert_eq!(br_co_15_total(&inv, tolerance).unwrap().rule_id, "BR-CO-15");
        assert!(br_co_15_total(&inv, dec!(0.05)).is_none());

        let mut inv = complete();
        inv.totals.subtotal = dec!(150);
        assert!(br_co_10_line_sum(&inv, tolerance).is_some());
    }

    #[test]
    fn category_rate_combinations() {
        let inv = InvoiceBuilder::new("1", FormatId::PeppolBis)
            .add_line(LineItemBuilder::new("a", dec!(1), dec!(1)).tax_category("S").build())
            .add_line(LineItemBuilder::new("b", dec!(1), dec!(1)).tax_rate(dec!(7)).tax_category("Z").build())
            .add_line(LineItemBuilder::new("c", dec!(1), dec!(1)).tax_rate(dec!(19)).tax_category("AE").build())
            .add_line(LineItemBuilder::new("d", dec!(1), dec!(1)).tax_category("E").build())
            .build();
        assert_eq!(br_s_05_standard_rate(&inv).unwrap().location, "lineItems[0]");
        assert_eq!(br_z_05_zero_rate(&inv).unwrap().location, "lineItems[1]");
        assert_eq!(br_ae_05_reverse_charge_rate(&inv).unwrap().location, "lineItems[2]");
        assert!(br_e_05_exempt_rate(&inv).is_none());
    }

    #[test]
    fn code_lists() {
        let mut inv = complete();
        inv.buyer.country_code = Some("XX".into());
        inv.line_items[0].tax_category_code = Some("Q".into());
        inv.line_items[0].unit_code = "BOGUS".into();
        inv.currency = "EURO".into();

        assert!(br_cl_14_country_codes(&inv).unwrap().location.contains("buyer.countryCode"));
        assert_eq!(br_cl_18_tax_categories(&inv).unwrap().location, "lineItems[0]");
        let unit = br_cl_23_unit_codes(&inv).unwrap();
        assert!(!unit.is_error());
        assert!(br_cl_04_currency_code(&inv).is_some());
    }

    #[test]
    fn vat_prefix() {
        let mut inv = complete();
        inv.seller.vat_id = Some("123456789".into());
        assert_eq!(br_co_09_vat_prefix(&inv).unwrap().location, "seller.vatId");
        inv.seller.vat_id = Some("EL123456789".into());
        assert!(br_co_09_vat_prefix(&inv).is_none());
    }

    #[test]
    fn address_gaps_name_the_missing_part() {
        let mut inv = complete();
        inv.buyer.postal_code = None;
        assert_eq!(br_10_buyer_address(&inv).unwrap().location, "buyer.postalCode");
        inv.seller.city = Some(" ".into());
        assert_eq!(br_08_seller_address(&inv).unwrap().location, "seller.city");
    }

    #[test]
    fn credit_note_needs_reference() {
        let mut inv = complete();
        inv.document_type_code = DocumentType::CreditNote;
        assert_eq!(br_55_preceding_invoice(&inv).unwrap().rule_id, "BR-55");
        inv.preceding_invoice_reference = Some("INV-0".into());
        assert!(br_55_preceding_invoice(&inv).is_none());
    }
}
