//! KSeF FA(2) structured invoice for the Polish National e-Invoice System.
//!
//! Tax is summarised per statutory rate bucket (`P_13_x` net, `P_14_x` tax).
//! Rates outside 23/8/5/0% and exemption land in the "other rate" bucket
//! `P_13_5`/`P_14_5`. Corrections (`KOR`) carry negated amounts.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::Generator;
use super::xml_utils::{XmlResult, XmlWriter, format_decimal, format_money};
use crate::core::codes::is_eu_country;
use crate::core::*;
use crate::formats::FormatId;
use crate::validate::ksef::normalize_nip;

const FA2_NS: &str = "http://crd.gov.pl/wzor/2023/06/29/12648/";

const REQUIRED: &[&str] = &[
    "Faktura",
    "Naglowek",
    "KodFormularza",
    "Podmiot1",
    "NIP",
    "Podmiot2",
    "Fa",
    "KodWaluty",
    "P_1",
    "P_2",
    "P_15",
    "Adnotacje",
    "RodzajFaktury",
    "FaWiersz",
];

/// Summary bucket of the `Fa` element, in schema order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum RateBucket {
    /// 23%
    Standard,
    /// 8%
    Reduced,
    /// 5%
    SuperReduced,
    /// Any non-statutory rate.
    Other,
    /// 0%
    Zero,
    /// Exempt (`zw`).
    Exempt,
}

impl RateBucket {
    pub(crate) fn classify(category: &str, rate: Decimal) -> Self {
        if category == "E" {
            return Self::Exempt;
        }
        match rate.normalize() {
            r if r == dec!(23) => Self::Standard,
            r if r == dec!(8) => Self::Reduced,
            r if r == dec!(5) => Self::SuperReduced,
            r if r.is_zero() => Self::Zero,
            _ => Self::Other,
        }
    }

    fn net_field(&self) -> &'static str {
        match self {
            Self::Standard => "P_13_1",
            Self::Reduced => "P_13_2",
            Self::SuperReduced => "P_13_3",
            Self::Other => "P_13_5",
            Self::Zero => "P_13_6_1",
            Self::Exempt => "P_13_7",
        }
    }

    fn tax_field(&self) -> Option<&'static str> {
        match self {
            Self::Standard => Some("P_14_1"),
            Self::Reduced => Some("P_14_2"),
            Self::SuperReduced => Some("P_14_3"),
            Self::Other => Some("P_14_5"),
            Self::Zero | Self::Exempt => None,
        }
    }
}

/// `P_12` rate marker of a line.
fn rate_marker(line: &LineItem) -> String {
    match RateBucket::classify(&line.category_code(), line.tax_rate) {
        RateBucket::Exempt => "zw".to_string(),
        RateBucket::Zero => "0".to_string(),
        _ => line.tax_rate.normalize().to_string(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KsefGenerator;

impl Generator for KsefGenerator {
    fn format_id(&self) -> FormatId {
        FormatId::Ksef
    }

    fn to_xml(&self, invoice: &CanonicalInvoice) -> Result<String, EInvoiceError> {
        to_ksef_xml(invoice)
    }

    fn required_elements(&self) -> &'static [&'static str] {
        REQUIRED
    }
}

fn to_ksef_xml(invoice: &CanonicalInvoice) -> XmlResult {
    let correction = invoice.is_credit_note();
    let sign = if correction { Decimal::NEGATIVE_ONE } else { Decimal::ONE };
    let money = |d: Decimal| format_money(d * sign);

    let mut buckets: BTreeMap<RateBucket, (Decimal, Decimal)> = BTreeMap::new();
    for group in tax_breakdown(&invoice.line_items, &invoice.allowance_charges) {
        let bucket = RateBucket::classify(&group.category_code, group.rate);
        if bucket == RateBucket::Other {
            tracing::debug!(rate = %group.rate, "non-statutory rate booked under P_13_5");
        }
        let entry = buckets.entry(bucket).or_insert((Decimal::ZERO, Decimal::ZERO));
        entry.0 += group.taxable_amount;
        entry.1 += group.tax_amount;
    }

    let mut w = XmlWriter::new()?;
    w.start_element_with_attrs("Faktura", &[("xmlns", FA2_NS)])?;

    w.start_element("Naglowek")?;
    w.text_element_with_attrs(
        "KodFormularza",
        "FA",
        &[("kodSystemowy", "FA (2)"), ("wersjaSchemy", "1-0E")],
    )?;
    w.text_element("WariantFormularza", "2")?;
    if let Some(date) = &invoice.invoice_date {
        w.text_element("DataWytworzeniaFa", &format!("{}T00:00:00Z", date))?;
    }
    w.text_element("SystemInfo", env!("CARGO_PKG_NAME"))?;
    w.end_element("Naglowek")?;

    // seller
    w.start_element("Podmiot1")?;
    w.start_element("DaneIdentyfikacyjne")?;
    if let Some(nip) = invoice.seller.vat_id.as_deref().and_then(normalize_nip) {
        w.text_element("NIP", &nip)?;
    }
    w.text_element("Nazwa", &invoice.seller.name)?;
    w.end_element("DaneIdentyfikacyjne")?;
    write_adres(&mut w, &invoice.seller)?;
    w.end_element("Podmiot1")?;

    // buyer
    w.start_element("Podmiot2")?;
    w.start_element("DaneIdentyfikacyjne")?;
    write_buyer_identity(&mut w, &invoice.buyer)?;
    w.text_element("Nazwa", &invoice.buyer.name)?;
    w.end_element("DaneIdentyfikacyjne")?;
    write_adres(&mut w, &invoice.buyer)?;
    w.end_element("Podmiot2")?;

    w.start_element("Fa")?;
    w.text_element("KodWaluty", &invoice.currency)?;
    if let Some(date) = &invoice.invoice_date {
        w.text_element("P_1", &date.to_string())?;
    }
    w.text_element("P_2", invoice.invoice_number.trim())?;
    for (bucket, (net, tax)) in &buckets {
        w.text_element(bucket.net_field(), &money(*net))?;
        if let Some(tax_field) = bucket.tax_field() {
            w.text_element(tax_field, &money(*tax))?;
        }
    }
    w.text_element(
        "P_15",
        &money(invoice.net_total() + invoice.totals.tax_amount),
    )?;

    write_adnotacje(&mut w, buckets.contains_key(&RateBucket::Exempt))?;

    w.text_element("RodzajFaktury", if correction { "KOR" } else { "VAT" })?;
    if correction {
        w.optional_text_element("PrzyczynaKorekty", invoice.notes.first().map(String::as_str))?;
        w.text_element("TypKorekty", "2")?;
        if let Some(preceding) = &invoice.preceding_invoice_reference {
            w.start_element("DaneFaKorygowanej")?;
            w.text_element("NrFaKorygowanej", preceding)?;
            // corrected invoice issued outside KSeF
            w.text_element("NrKSeFN", "1")?;
            w.end_element("DaneFaKorygowanej")?;
        }
    }

    for (idx, line) in invoice.line_items.iter().enumerate() {
        w.start_element("FaWiersz")?;
        w.text_element("NrWierszaFa", &(idx + 1).to_string())?;
        w.text_element("P_7", &line.description)?;
        w.text_element("P_8A", &line.unit_code)?;
        w.text_element("P_8B", &format_decimal(line.quantity))?;
        w.text_element("P_9A", &format_decimal(line.unit_price))?;
        w.text_element("P_11", &money(line.total_price))?;
        w.text_element("P_12", &rate_marker(line))?;
        w.end_element("FaWiersz")?;
    }

    if invoice.payment.iban.is_some() || invoice.payment.due_date.is_some() {
        w.start_element("Platnosc")?;
        if let Some(due) = &invoice.payment.due_date {
            w.start_element("TerminPlatnosci")?;
            w.text_element("Termin", &due.to_string())?;
            w.end_element("TerminPlatnosci")?;
        }
        if let Some(iban) = &invoice.payment.iban {
            // 6 = bank transfer
            w.text_element("FormaPlatnosci", "6")?;
            w.start_element("RachunekBankowy")?;
            w.text_element("NrRB", iban)?;
            w.optional_text_element("SWIFT", invoice.payment.bic.as_deref())?;
            w.end_element("RachunekBankowy")?;
        }
        w.end_element("Platnosc")?;
    }

    w.end_element("Fa")?;
    w.end_element("Faktura")?;
    w.into_string()
}

fn write_adres(w: &mut XmlWriter, party: &Party) -> Result<(), EInvoiceError> {
    w.start_element("Adres")?;
    w.text_element("KodKraju", &party.country().unwrap_or_else(|| "PL".to_string()))?;
    w.text_element("AdresL1", party.address.as_deref().unwrap_or(&party.name))?;
    let line2 = [party.postal_code.as_deref(), party.city.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    if !line2.is_empty() {
        w.text_element("AdresL2", &line2)?;
    }
    w.end_element("Adres")?;
    Ok(())
}

fn write_buyer_identity(w: &mut XmlWriter, buyer: &Party) -> Result<(), EInvoiceError> {
    let vat_id = buyer.vat_id.as_deref().map(str::trim).unwrap_or_default();
    let foreign_prefix = vat_id
        .get(..2)
        .filter(|p| *p != "PL" && is_eu_country(p));

    if let Some(nip) = normalize_nip(vat_id).filter(|_| foreign_prefix.is_none()) {
        w.text_element("NIP", &nip)?;
    } else if let Some(prefix) = foreign_prefix {
        w.text_element("KodUE", prefix)?;
        w.text_element("NrVatUE", &vat_id[2..])?;
    } else {
        w.text_element("BrakID", "1")?;
    }
    Ok(())
}

fn write_adnotacje(w: &mut XmlWriter, has_exempt: bool) -> Result<(), EInvoiceError> {
    // 1 = applies, 2 = does not apply
    w.start_element("Adnotacje")?;
    w.text_element("P_16", "2")?;
    w.text_element("P_17", "2")?;
    w.text_element("P_18", "2")?;
    w.text_element("P_18A", "2")?;
    w.start_element("Zwolnienie")?;
    if has_exempt {
        w.text_element("P_19", "1")?;
        w.text_element("P_19A", "Zwolnienie z podatku VAT")?;
    } else {
        w.text_element("P_19N", "1")?;
    }
    w.end_element("Zwolnienie")?;
    w.start_element("NoweSrodkiTransportu")?;
    w.text_element("P_22N", "1")?;
    w.end_element("NoweSrodkiTransportu")?;
    w.text_element("P_23", "2")?;
    w.start_element("PMarzy")?;
    w.text_element("P_PMarzyN", "1")?;
    w.end_element("PMarzy")?;
    w.end_element("Adnotacje")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> CanonicalInvoice {
        InvoiceBuilder::new("FV/1/2024", FormatId::Ksef)
            .currency("PLN")
            .invoice_date(NaiveDate::from_ymd_opt(2024, 2, 10).unwrap())
            .seller(
                PartyBuilder::new("Firma Sp. z o.o.")
                    .address("ul. Prosta 1", "Warszawa", "00-001", "PL")
                    .vat_id("PL5260250274")
                    .build(),
            )
            .buyer(
                PartyBuilder::new("Kunde GmbH")
                    .address("Hauptstr. 1", "Berlin", "10115", "DE")
                    .vat_id("DE123456789")
                    .build(),
            )
            .add_line(LineItemBuilder::new("Usługa", dec!(1), dec!(100)).tax_rate(dec!(23)).build())
            .add_line(LineItemBuilder::new("Książka", dec!(2), dec!(50)).tax_rate(dec!(5)).build())
            .build()
    }

    #[test]
    fn buckets_and_grand_total() {
        let xml = KsefGenerator.to_xml(&sample()).unwrap();
        assert!(xml.contains(r#"kodSystemowy="FA (2)""#));
        assert!(xml.contains("<NIP>5260250274</NIP>"));
        assert!(xml.contains("<KodUE>DE</KodUE>"));
        assert!(xml.contains("<NrVatUE>123456789</NrVatUE>"));
        assert!(xml.contains("<P_13_1>100.00</P_13_1>"));
        assert!(xml.contains("<P_14_1>23.00</P_14_1>"));
        assert!(xml.contains("<P_13_3>100.00</P_13_3>"));
        assert!(xml.contains("<P_14_3>5.00</P_14_3>"));
        assert!(xml.contains("<P_15>228.00</P_15>"));
        assert!(xml.contains("<RodzajFaktury>VAT</RodzajFaktury>"));
        assert!(xml.contains("<P_12>23</P_12>"));
        assert!(KsefGenerator.validate(&xml).valid);

        // P_13_1 precedes P_13_3, which precedes P_15
        let p13_1 = xml.find("<P_13_1>").unwrap();
        let p13_3 = xml.find("<P_13_3>").unwrap();
        let p15 = xml.find("<P_15>").unwrap();
        assert!(p13_1 < p13_3 && p13_3 < p15);
    }

    #[test]
    fn non_statutory_rate_goes_to_other_bucket() {
        let inv = InvoiceBuilder::new("FV/2/2024", FormatId::Ksef)
            .add_line(LineItemBuilder::new("Import", dec!(1), dec!(100)).tax_rate(dec!(19)).build())
            .build();
        let xml = KsefGenerator.to_xml(&inv).unwrap();
        assert!(xml.contains("<P_13_5>100.00</P_13_5>"));
        assert!(xml.contains("<P_14_5>19.00</P_14_5>"));
        assert!(xml.contains("<P_15>119.00</P_15>"));
        assert!(xml.contains("<P_12>19</P_12>"));
    }

    #[test]
    fn correction_negates_amounts() {
        let mut inv = sample();
        inv.document_type_code = DocumentType::CreditNote;
        inv.preceding_invoice_reference = Some("FV/0/2024".into());
        let xml = KsefGenerator.to_xml(&inv).unwrap();
        assert!(xml.contains("<RodzajFaktury>KOR</RodzajFaktury>"));
        assert!(xml.contains("<NrFaKorygowanej>FV/0/2024</NrFaKorygowanej>"));
        assert!(xml.contains("<P_13_1>-100.00</P_13_1>"));
        assert!(xml.contains("<P_15>-228.00</P_15>"));
        assert!(xml.contains("<P_11>-100.00</P_11>"));
    }

    #[test]
    fn classify_buckets() {
        assert_eq!(RateBucket::classify("S", dec!(23.00)), RateBucket::Standard);
        assert_eq!(RateBucket::classify("S", dec!(8)), RateBucket::Reduced);
        assert_eq!(RateBucket::classify("Z", dec!(0)), RateBucket::Zero);
        assert_eq!(RateBucket::classify("E", dec!(0)), RateBucket::Exempt);
        assert_eq!(RateBucket::classify("S", dec!(7)), RateBucket::Other);
    }
}
