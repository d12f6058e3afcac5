use chrono::NaiveDate;
use eformat::core::{InvoiceBuilder, LineItemBuilder, PartyBuilder};
use eformat::formats::FormatId;
use eformat::generate::GeneratorFactory;
use eformat::mapping::{RawExtraction, compute_missing_fields, to_canonical_invoice};
use eformat::validate::{Validator, validator_for};
use quick_xml::Reader;
use quick_xml::events::Event;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Value, json};

fn raw(value: Value) -> RawExtraction {
    RawExtraction::from_value(value).unwrap()
}

fn minimal_record() -> Value {
    json!({
        "invoiceNumber": "INV-1",
        "lineItems": [{"unitPrice": 100, "quantity": 2, "taxRate": 19}],
        "currency": "EUR",
        "format": "xrechnung-cii"
    })
}

/// The minimal record plus everything XRechnung asks for.
fn completed_record() -> Value {
    let mut record = minimal_record();
    let extra = json!({
        "invoiceDate": "15.06.2024",
        "buyerReference": "991-01234-44",
        "sellerName": "Muster GmbH",
        "sellerAddress": "Hauptstr. 1",
        "sellerCity": "Berlin",
        "sellerPostalCode": "10115",
        "sellerCountryCode": "DE",
        "sellerVatId": "DE123456789",
        "sellerContactName": "Erika Muster",
        "sellerPhone": "+49 30 1234567",
        "sellerEmail": "rechnung@muster.de",
        "buyerName": "Kunde AG",
        "buyerAddress": "Marienplatz 1",
        "buyerCity": "München",
        "buyerPostalCode": "80331",
        "buyerCountryCode": "DE",
        "iban": "DE89 3704 0044 0532 0130 00"
    });
    if let (Some(target), Some(source)) = (record.as_object_mut(), extra.as_object()) {
        target.extend(source.clone());
    }
    record
}

#[test]
fn minimal_record_totals_and_xml() {
    let invoice = to_canonical_invoice(&raw(minimal_record()), FormatId::XRechnungCii);
    assert_eq!(invoice.totals.subtotal, dec!(200.00));
    assert_eq!(invoice.totals.tax_amount, dec!(38.00));
    assert_eq!(invoice.totals.total_amount, dec!(238.00));

    let result = GeneratorFactory::create("xrechnung-cii")
        .unwrap()
        .generate(&invoice)
        .unwrap();
    assert!(result.xml_content.contains("INV-1"));
    assert!(result.xml_content.contains("200.00"));
    assert!(result.xml_content.contains("238.00"));
    assert!(!result.is_valid());
    assert_eq!(result.file_name, "INV-1_xrechnung_cii.xml");
}

#[test]
fn minimal_record_fails_with_deterministic_rule_ids() {
    let invoice = to_canonical_invoice(&raw(minimal_record()), FormatId::XRechnungCii);
    let validator = validator_for(FormatId::XRechnungCii);

    let first = validator.validate(&invoice);
    let second = validator.validate(&invoice);
    assert!(!first.valid);
    assert_eq!(first, second);

    let ids = first.error_ids();
    for expected in ["BR-03", "BR-06", "BR-07", "BR-08", "BR-09", "BR-11", "BR-CO-26", "BR-DE-15"] {
        assert!(ids.contains(&expected), "{expected} missing from {ids:?}");
    }
}

#[test]
fn completed_record_passes() {
    let record = raw(completed_record());
    assert!(compute_missing_fields(&record, FormatId::XRechnungCii).is_empty());

    let invoice = to_canonical_invoice(&record, FormatId::XRechnungCii);
    assert_eq!(invoice.payment.iban.as_deref(), Some("DE89370400440532013000"));

    let result = validator_for(FormatId::XRechnungCii).validate(&invoice);
    assert!(result.valid, "{:?}", result.errors);
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);

    let generated = GeneratorFactory::for_format(FormatId::XRechnungCii)
        .unwrap()
        .generate(&invoice)
        .unwrap();
    assert!(generated.is_valid(), "{:?}", generated.validation_errors);
}

#[test]
fn every_supported_format_produces_a_document() {
    let record = raw(completed_record());
    for format in GeneratorFactory::supported_formats() {
        let invoice = to_canonical_invoice(&record, format);
        let result = GeneratorFactory::for_format(format)
            .unwrap()
            .generate(&invoice)
            .unwrap();

        assert!(!result.xml_content.is_empty(), "{format}");
        assert!(result.xml_content.contains("INV-1"), "{format}");
        assert!(result.file_name.starts_with("INV-1_"), "{format}");
        assert!(result.file_size > 0, "{format}");
        assert_eq!(result.pdf_content.is_some(), format.is_hybrid(), "{format}");
    }
}

#[test]
fn unknown_format_is_rejected_by_both_factories() {
    assert!(GeneratorFactory::create("ubl-2.1").is_err());
    assert!(eformat::ValidatorFactory::create("ubl-2.1").is_err());
}

#[test]
fn credit_note_without_reference_fails_br_55_everywhere() {
    let mut record = completed_record();
    record["documentTypeCode"] = json!("381");
    let record = raw(record);

    for format in [
        FormatId::XRechnungCii,
        FormatId::XRechnungUbl,
        FormatId::PeppolBis,
        FormatId::FacturxEn16931,
        FormatId::FacturxBasic,
        FormatId::Nlcius,
        FormatId::CiusRo,
    ] {
        let invoice = to_canonical_invoice(&record, format);
        let result = validator_for(format).validate(&invoice);
        assert!(result.error_ids().contains(&"BR-55"), "{format}: {:?}", result.error_ids());
    }

    let ksef = validator_for(FormatId::Ksef).validate(&to_canonical_invoice(&record, FormatId::Ksef));
    assert!(ksef.has_rule("KSEF-KOR-01"));

    let fpa = validator_for(FormatId::FatturaPa)
        .validate(&to_canonical_invoice(&record, FormatId::FatturaPa));
    assert!(fpa.warnings.iter().any(|w| w.rule_id == "FPA-TD04"));
}

#[test]
fn credit_note_with_reference_clears_br_55() {
    let mut record = completed_record();
    record["documentTypeCode"] = json!("381");
    record["precedingInvoiceReference"] = json!("INV-0");
    let invoice = to_canonical_invoice(&raw(record), FormatId::XRechnungUbl);

    let result = validator_for(FormatId::XRechnungUbl).validate(&invoice);
    assert!(!result.has_rule("BR-55"));

    let xml = GeneratorFactory::for_format(FormatId::XRechnungUbl)
        .unwrap()
        .to_xml(&invoice)
        .unwrap();
    assert!(xml.contains("<ubl:CreditNote"));
    assert!(xml.contains("INV-0"));
}

/// Decimal text of every element with the given local name.
fn amounts(xml: &str, local: &[u8]) -> Vec<Decimal> {
    let mut reader = Reader::from_str(xml);
    let mut found = Vec::new();
    let mut inside = false;
    loop {
        match reader.read_event().unwrap() {
            Event::Start(e) => inside = e.local_name().as_ref() == local,
            Event::Text(t) if inside => {
                found.push(t.unescape().unwrap().trim().parse().unwrap());
                inside = false;
            }
            Event::End(_) => inside = false,
            Event::Eof => break,
            _ => {}
        }
    }
    found
}

fn three_rate_invoice(format: FormatId) -> eformat::CanonicalInvoice {
    let mut builder = InvoiceBuilder::new("MIX-1", format)
        .invoice_date(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
        .buyer_reference("991-01234-44")
        .seller(
            PartyBuilder::new("Muster GmbH")
                .address("Hauptstr. 1", "Berlin", "10115", "DE")
                .vat_id("DE123456789")
                .build(),
        )
        .buyer(PartyBuilder::new("Kunde AG").address("Marienplatz 1", "München", "80331", "DE").build());
    for rate in [dec!(19), dec!(7), dec!(10)] {
        builder = builder.add_line(LineItemBuilder::new("item", dec!(1), dec!(100)).tax_rate(rate).build());
    }
    builder.add_allowance(dec!(10), "Rabatt").build()
}

#[test]
fn unrated_discount_keeps_vat_bases_on_the_tax_basis_total() {
    let invoice = three_rate_invoice(FormatId::XRechnungCii);
    assert_eq!(invoice.net_total(), dec!(290.00));

    let xml = GeneratorFactory::for_format(FormatId::XRechnungCii)
        .unwrap()
        .to_xml(&invoice)
        .unwrap();
    let bases: Decimal = amounts(&xml, b"BasisAmount").iter().sum();
    assert_eq!(bases, amounts(&xml, b"TaxBasisTotalAmount")[0]);
    assert_eq!(bases, dec!(290.00));

    // one allowance per VAT group, each labelled with that group's rate
    assert_eq!(amounts(&xml, b"ActualAmount"), [dec!(3.33), dec!(3.33), dec!(3.34)]);
    let rates = amounts(&xml, b"RateApplicablePercent");
    assert_eq!(&rates[rates.len() - 3..], [dec!(7), dec!(10), dec!(19)]);
}

#[test]
fn unrated_discount_in_ubl_matches_tax_exclusive_amount() {
    let invoice = three_rate_invoice(FormatId::XRechnungUbl);
    let xml = GeneratorFactory::for_format(FormatId::XRechnungUbl)
        .unwrap()
        .to_xml(&invoice)
        .unwrap();

    let bases: Decimal = amounts(&xml, b"TaxableAmount").iter().sum();
    assert_eq!(bases, amounts(&xml, b"TaxExclusiveAmount")[0]);
    assert_eq!(amounts(&xml, b"AllowanceTotalAmount"), [dec!(10.00)]);
    let parts: Decimal = amounts(&xml, b"Amount").iter().sum();
    assert_eq!(parts, dec!(10.00));
}
