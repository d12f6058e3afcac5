#![cfg(feature = "facturx")]

use chrono::NaiveDate;
use eformat::core::*;
use eformat::facturx::{
    FACTURX_FILENAME, FacturxProfile, extract_from_pdf, render_hybrid_pdf, render_invoice_pdf,
};
use eformat::formats::FormatId;
use eformat::generate::{FACTURX_BASIC_GUIDELINE, FACTURX_EN16931_GUIDELINE, GeneratorFactory};
use lopdf::{Document, Object};
use rust_decimal_macros::dec;

fn facture(format: FormatId, lines: usize) -> CanonicalInvoice {
    let mut builder = InvoiceBuilder::new("FA-2024-0042", format)
        .invoice_date(NaiveDate::from_ymd_opt(2024, 10, 1).unwrap())
        .note("Paiement à 30 jours")
        .seller(
            PartyBuilder::new("Boulangerie Martin SARL")
                .address("8 avenue Jean Jaurès", "Lyon", "69007", "FR")
                .vat_id("FR40303265045")
                .build(),
        )
        .buyer(
            PartyBuilder::new("Hôtel du Parc")
                .address("2 place Bellecour", "Lyon", "69002", "FR")
                .vat_id("FR82542065479")
                .build(),
        );
    for i in 0..lines {
        builder = builder.add_line(
            LineItemBuilder::new(format!("Viennoiserie lot {i}"), dec!(12), dec!(1.45))
                .tax_rate(dec!(5.5))
                .build(),
        );
    }
    builder.build()
}

fn catalog_has(doc: &Document, key: &[u8]) -> bool {
    doc.catalog().map(|c| c.get(key).is_ok()).unwrap_or(false)
}

#[test]
fn en16931_pdf_reopens_with_embedded_xml() {
    let invoice = facture(FormatId::FacturxEn16931, 3);
    let result = GeneratorFactory::create("facturx-en16931")
        .unwrap()
        .generate(&invoice)
        .unwrap();

    assert!(result.is_valid(), "{:?}", result.validation_errors);
    assert_eq!(result.file_name, "FA-2024-0042_facturx_en16931.pdf");

    let pdf = result.pdf_content.as_deref().unwrap();
    let doc = Document::load_mem(pdf).unwrap();
    assert!(catalog_has(&doc, b"AF"));
    assert!(catalog_has(&doc, b"Metadata"));
    assert!(catalog_has(&doc, b"Names"));
    assert!(!doc.get_pages().is_empty());

    let xml = extract_from_pdf(pdf).unwrap();
    assert_eq!(xml, result.xml_content);
    assert!(xml.contains(FACTURX_EN16931_GUIDELINE));
    assert!(xml.contains("FA-2024-0042"));
}

#[test]
fn embedded_file_is_tagged_alternative() {
    let invoice = facture(FormatId::FacturxBasic, 1);
    let result = GeneratorFactory::for_format(FormatId::FacturxBasic)
        .unwrap()
        .generate(&invoice)
        .unwrap();
    let doc = Document::load_mem(result.pdf_content.as_deref().unwrap()).unwrap();

    let af = doc.catalog().unwrap().get(b"AF").unwrap().as_array().unwrap();
    let Object::Reference(id) = af[0] else {
        panic!("AF entry is not a reference");
    };
    let filespec = doc.get_dictionary(id).unwrap();
    assert_eq!(filespec.get(b"AFRelationship").unwrap().as_name().unwrap(), b"Alternative");
    match filespec.get(b"UF").unwrap() {
        Object::String(bytes, _) => assert_eq!(bytes.as_slice(), FACTURX_FILENAME.as_bytes()),
        other => panic!("unexpected UF entry {other:?}"),
    }

    assert!(result.xml_content.contains(FACTURX_BASIC_GUIDELINE));
}

#[test]
fn long_invoices_paginate() {
    let short = facture(FormatId::FacturxEn16931, 2);
    let long = facture(FormatId::FacturxEn16931, 120);

    let pages = |inv: &CanonicalInvoice| {
        let bytes = render_invoice_pdf(inv, FacturxProfile::En16931).unwrap();
        Document::load_mem(&bytes).unwrap().get_pages().len()
    };
    assert_eq!(pages(&short), 1);
    assert!(pages(&long) > 1);
}

#[test]
fn attaching_xml_keeps_the_visual_pages() {
    let invoice = facture(FormatId::FacturxEn16931, 60);
    let plain = render_invoice_pdf(&invoice, FacturxProfile::En16931).unwrap();
    let page_count = Document::load_mem(&plain).unwrap().get_pages().len();
    assert!(extract_from_pdf(&plain).is_err());

    let xml = GeneratorFactory::for_format(FormatId::FacturxEn16931)
        .unwrap()
        .to_xml(&invoice)
        .unwrap();
    let hybrid = render_hybrid_pdf(&invoice, FacturxProfile::En16931, &xml).unwrap();

    let doc = Document::load_mem(&hybrid).unwrap();
    assert_eq!(doc.get_pages().len(), page_count);
    assert!(catalog_has(&doc, b"MarkInfo"));
    assert_eq!(extract_from_pdf(&hybrid).unwrap(), xml);
}
