//! Factur-X / ZUGFeRD profiles. Plain EN 16931 with no currency or
//! Leitweg restriction; BASIC does not enforce the buyer postal address.

use super::Rule;
use super::en16931::{BUYER_ADDRESS, COMMON, CREDIT_NOTE, EN16931};

pub(super) const EN16931_RULE_SETS: &[&[Rule]] = &[COMMON, EN16931, BUYER_ADDRESS, CREDIT_NOTE];

pub(super) const BASIC_RULE_SETS: &[&[Rule]] = &[COMMON, EN16931, CREDIT_NOTE];

#[cfg(test)]
mod tests {
    use crate::core::*;
    use crate::formats::FormatId;
    use crate::validate::{Validator, validator_for};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn facture(format: FormatId) -> CanonicalInvoice {
        InvoiceBuilder::new("F-2024-12", format)
            .currency("USD")
            .invoice_date(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap())
            .seller(
                PartyBuilder::new("Société Exemple SARL")
                    .address("1 rue de Rivoli", "Paris", "75001", "FR")
                    .vat_id("FR32123456789")
                    .build(),
            )
            .buyer(PartyBuilder::new("Client SAS").build())
            .add_line(LineItemBuilder::new("Prestation", dec!(3), dec!(80)).tax_rate(dec!(20)).build())
            .build()
    }

    #[test]
    fn basic_skips_buyer_address() {
        let mut inv = facture(FormatId::FacturxBasic);
        inv.buyer.country_code = Some("FR".into());

        let basic = validator_for(FormatId::FacturxBasic).validate(&inv);
        assert!(basic.valid, "{:?}", basic.errors);

        let full = validator_for(FormatId::FacturxEn16931).validate(&inv);
        assert_eq!(full.error_ids(), vec!["BR-10"]);
    }

    #[test]
    fn no_currency_or_buyer_reference_restriction() {
        let mut inv = facture(FormatId::FacturxEn16931);
        inv.buyer = PartyBuilder::new("Client SAS")
            .address("2 place Bellecour", "Lyon", "69002", "FR")
            .build();
        let result = validator_for(FormatId::FacturxEn16931).validate(&inv);
        assert!(result.valid, "{:?}", result.errors);
    }
}
