use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::xml_utils::{XmlResult, XmlWriter, format_decimal};
use super::{
    FACTURX_BASIC_GUIDELINE, FACTURX_EN16931_GUIDELINE, Generator, PEPPOL_PROFILE_ID,
    XRECHNUNG_CUSTOMIZATION_ID, cii_ns,
};
use crate::core::*;
use crate::formats::FormatId;

/// Elements every generated CII document must carry.
pub(crate) const CII_REQUIRED: &[&str] = &[
    "CrossIndustryInvoice",
    "ExchangedDocumentContext",
    "GuidelineSpecifiedDocumentContextParameter",
    "ExchangedDocument",
    "ID",
    "TypeCode",
    "IssueDateTime",
    "SupplyChainTradeTransaction",
    "ApplicableHeaderTradeAgreement",
    "SellerTradeParty",
    "BuyerTradeParty",
    "ApplicableHeaderTradeDelivery",
    "ApplicableHeaderTradeSettlement",
    "InvoiceCurrencyCode",
    "SpecifiedTradeSettlementHeaderMonetarySummation",
    "GrandTotalAmount",
    "DuePayableAmount",
];

/// UN/CEFACT CII generator. Serves XRechnung CII directly and supplies
/// the embedded XML of both Factur-X profiles.
#[derive(Debug, Clone, Copy)]
pub struct CiiGenerator {
    format: FormatId,
}

impl CiiGenerator {
    pub fn new(format: FormatId) -> Self {
        Self { format }
    }

    /// BT-24 guideline identifier written for this generator's format.
    pub fn guideline_id(&self) -> &'static str {
        match self.format {
            FormatId::FacturxEn16931 => FACTURX_EN16931_GUIDELINE,
            FormatId::FacturxBasic => FACTURX_BASIC_GUIDELINE,
            _ => XRECHNUNG_CUSTOMIZATION_ID,
        }
    }
}

impl Generator for CiiGenerator {
    fn format_id(&self) -> FormatId {
        self.format
    }

    fn to_xml(&self, invoice: &CanonicalInvoice) -> Result<String, EInvoiceError> {
        let business_process = match self.format {
            FormatId::XRechnungCii => Some(PEPPOL_PROFILE_ID),
            _ => None,
        };
        to_cii_xml(invoice, self.guideline_id(), business_process)
    }

    fn required_elements(&self) -> &'static [&'static str] {
        CII_REQUIRED
    }
}

/// Serialize an invoice as CII with the given guideline (BT-24) and
/// optional business process (BT-23) identifiers.
pub(crate) fn to_cii_xml(
    invoice: &CanonicalInvoice,
    guideline: &str,
    business_process: Option<&str>,
) -> XmlResult {
    let currency = invoice.currency.as_str();
    let totals = &invoice.totals;
    let breakdown = tax_breakdown(&invoice.line_items, &invoice.allowance_charges);
    let mut w = XmlWriter::new()?;

    w.start_element_with_attrs(
        "rsm:CrossIndustryInvoice",
        &[
            ("xmlns:rsm", cii_ns::RSM),
            ("xmlns:ram", cii_ns::RAM),
            ("xmlns:qdt", cii_ns::QDT),
            ("xmlns:udt", cii_ns::UDT),
        ],
    )?;

    // --- ExchangedDocumentContext ---
    w.start_element("rsm:ExchangedDocumentContext")?;
    if let Some(bp) = business_process {
        w.start_element("ram:BusinessProcessSpecifiedDocumentContextParameter")?;
        w.text_element("ram:ID", bp)?;
        w.end_element("ram:BusinessProcessSpecifiedDocumentContextParameter")?;
    }
    w.start_element("ram:GuidelineSpecifiedDocumentContextParameter")?;
    w.text_element("ram:ID", guideline)?;
    w.end_element("ram:GuidelineSpecifiedDocumentContextParameter")?;
    w.end_element("rsm:ExchangedDocumentContext")?;

    // --- ExchangedDocument ---
    w.start_element("rsm:ExchangedDocument")?;
    w.text_element("ram:ID", invoice.invoice_number.trim())?;
    w.text_element("ram:TypeCode", &invoice.document_type_code.code().to_string())?;
    if let Some(date) = &invoice.invoice_date {
        write_cii_date(&mut w, "ram:IssueDateTime", date)?;
    }
    for note in &invoice.notes {
        w.start_element("ram:IncludedNote")?;
        w.text_element("ram:Content", note)?;
        w.end_element("ram:IncludedNote")?;
    }
    w.end_element("rsm:ExchangedDocument")?;

    // --- SupplyChainTradeTransaction ---
    w.start_element("rsm:SupplyChainTradeTransaction")?;

    for (idx, line) in invoice.line_items.iter().enumerate() {
        write_cii_line(&mut w, idx + 1, line)?;
    }

    w.start_element("ram:ApplicableHeaderTradeAgreement")?;
    if let Some(br) = &invoice.buyer_reference {
        w.text_element("ram:BuyerReference", br)?;
    }
    write_cii_party(&mut w, &invoice.seller, "ram:SellerTradeParty")?;
    write_cii_party(&mut w, &invoice.buyer, "ram:BuyerTradeParty")?;
    if let Some(po) = &invoice.purchase_order_reference {
        w.start_element("ram:BuyerOrderReferencedDocument")?;
        w.text_element("ram:IssuerAssignedID", po)?;
        w.end_element("ram:BuyerOrderReferencedDocument")?;
    }
    w.end_element("ram:ApplicableHeaderTradeAgreement")?;

    w.start_element("ram:ApplicableHeaderTradeDelivery")?;
    w.end_element("ram:ApplicableHeaderTradeDelivery")?;

    // --- ApplicableHeaderTradeSettlement ---
    w.start_element("ram:ApplicableHeaderTradeSettlement")?;
    w.text_element("ram:InvoiceCurrencyCode", currency)?;

    if let Some(iban) = &invoice.payment.iban {
        w.start_element("ram:SpecifiedTradeSettlementPaymentMeans")?;
        w.text_element("ram:TypeCode", "58")?;
        w.start_element("ram:PayeePartyCreditorFinancialAccount")?;
        w.text_element("ram:IBANID", iban)?;
        w.end_element("ram:PayeePartyCreditorFinancialAccount")?;
        if let Some(bic) = &invoice.payment.bic {
            w.start_element("ram:PayeeSpecifiedCreditorFinancialInstitution")?;
            w.text_element("ram:BICID", bic)?;
            w.end_element("ram:PayeeSpecifiedCreditorFinancialInstitution")?;
        }
        w.end_element("ram:SpecifiedTradeSettlementPaymentMeans")?;
    }

    for group in &breakdown {
        w.start_element("ram:ApplicableTradeTax")?;
        w.text_element("ram:CalculatedAmount", &format_decimal(group.tax_amount))?;
        w.text_element("ram:TypeCode", "VAT")?;
        w.text_element("ram:BasisAmount", &format_decimal(group.taxable_amount))?;
        w.text_element("ram:CategoryCode", &group.category_code)?;
        w.text_element("ram:RateApplicablePercent", &format_decimal(group.rate))?;
        w.end_element("ram:ApplicableTradeTax")?;
    }

    for ac in &book_allowance_charges(&invoice.line_items, &invoice.allowance_charges) {
        write_cii_allowance_charge(&mut w, ac)?;
    }

    if invoice.payment.payment_terms.is_some() || invoice.payment.due_date.is_some() {
        w.start_element("ram:SpecifiedTradePaymentTerms")?;
        w.optional_text_element("ram:Description", invoice.payment.payment_terms.as_deref())?;
        if let Some(due) = &invoice.payment.due_date {
            write_cii_date(&mut w, "ram:DueDateDateTime", due)?;
        }
        w.end_element("ram:SpecifiedTradePaymentTerms")?;
    }

    if let Some(preceding) = &invoice.preceding_invoice_reference {
        w.start_element("ram:InvoiceReferencedDocument")?;
        w.text_element("ram:IssuerAssignedID", preceding)?;
        w.end_element("ram:InvoiceReferencedDocument")?;
    }

    w.start_element("ram:SpecifiedTradeSettlementHeaderMonetarySummation")?;
    w.text_element("ram:LineTotalAmount", &format_decimal(totals.subtotal))?;
    if totals.charge_total > Decimal::ZERO {
        w.text_element("ram:ChargeTotalAmount", &format_decimal(totals.charge_total))?;
    }
    if totals.allowance_total > Decimal::ZERO {
        w.text_element("ram:AllowanceTotalAmount", &format_decimal(totals.allowance_total))?;
    }
    w.text_element("ram:TaxBasisTotalAmount", &format_decimal(invoice.net_total()))?;
    w.text_element_with_attrs(
        "ram:TaxTotalAmount",
        &format_decimal(totals.tax_amount),
        &[("currencyID", currency)],
    )?;
    w.text_element("ram:GrandTotalAmount", &format_decimal(totals.total_amount))?;
    w.text_element("ram:DuePayableAmount", &format_decimal(totals.total_amount))?;
    w.end_element("ram:SpecifiedTradeSettlementHeaderMonetarySummation")?;

    w.end_element("ram:ApplicableHeaderTradeSettlement")?;
    w.end_element("rsm:SupplyChainTradeTransaction")?;
    w.end_element("rsm:CrossIndustryInvoice")?;

    w.into_string()
}

fn write_cii_date(w: &mut XmlWriter, element: &str, date: &NaiveDate) -> Result<(), EInvoiceError> {
    w.start_element(element)?;
    w.text_element_with_attrs(
        "udt:DateTimeString",
        &date.format("%Y%m%d").to_string(),
        &[("format", "102")],
    )?;
    w.end_element(element)?;
    Ok(())
}

fn write_cii_party(w: &mut XmlWriter, party: &Party, element: &str) -> Result<(), EInvoiceError> {
    // TradeParty order: Name, SpecifiedLegalOrganization, DefinedTradeContact,
    // PostalTradeAddress, URIUniversalCommunication, SpecifiedTaxRegistration
    w.start_element(element)?;
    w.text_element("ram:Name", &party.name)?;

    if let Some(reg_id) = &party.tax_id {
        w.start_element("ram:SpecifiedLegalOrganization")?;
        w.text_element("ram:ID", reg_id)?;
        w.end_element("ram:SpecifiedLegalOrganization")?;
    }

    if party.contact_name.is_some() || party.phone.is_some() || party.email.is_some() {
        w.start_element("ram:DefinedTradeContact")?;
        w.optional_text_element("ram:PersonName", party.contact_name.as_deref())?;
        if let Some(phone) = &party.phone {
            w.start_element("ram:TelephoneUniversalCommunication")?;
            w.text_element("ram:CompleteNumber", phone)?;
            w.end_element("ram:TelephoneUniversalCommunication")?;
        }
        if let Some(email) = &party.email {
            w.start_element("ram:EmailURIUniversalCommunication")?;
            w.text_element("ram:URIID", email)?;
            w.end_element("ram:EmailURIUniversalCommunication")?;
        }
        w.end_element("ram:DefinedTradeContact")?;
    }

    let has_address = party.address.is_some()
        || party.city.is_some()
        || party.postal_code.is_some()
        || party.country_code.is_some();
    if has_address {
        w.start_element("ram:PostalTradeAddress")?;
        w.optional_text_element("ram:PostcodeCode", party.postal_code.as_deref())?;
        w.optional_text_element("ram:LineOne", party.address.as_deref())?;
        w.optional_text_element("ram:CityName", party.city.as_deref())?;
        w.optional_text_element("ram:CountryID", party.country().as_deref())?;
        w.end_element("ram:PostalTradeAddress")?;
    }

    if let Some(endpoint) = &party.electronic_address {
        let scheme = endpoint_scheme(party);
        w.start_element("ram:URIUniversalCommunication")?;
        w.text_element_with_attrs("ram:URIID", endpoint, &[("schemeID", scheme)])?;
        w.end_element("ram:URIUniversalCommunication")?;
    }

    if let Some(vat_id) = &party.vat_id {
        w.start_element("ram:SpecifiedTaxRegistration")?;
        w.text_element_with_attrs("ram:ID", vat_id, &[("schemeID", "VA")])?;
        w.end_element("ram:SpecifiedTaxRegistration")?;
    }
    if let Some(tax_num) = &party.tax_number {
        w.start_element("ram:SpecifiedTaxRegistration")?;
        w.text_element_with_attrs("ram:ID", tax_num, &[("schemeID", "FC")])?;
        w.end_element("ram:SpecifiedTaxRegistration")?;
    }

    w.end_element(element)?;
    Ok(())
}

/// Scheme of a party endpoint: the explicit one, `EM` for mail addresses.
pub(crate) fn endpoint_scheme(party: &Party) -> &str {
    match party.electronic_address_scheme.as_deref().map(str::trim) {
        Some(scheme) if !scheme.is_empty() => scheme,
        _ => "EM",
    }
}

fn write_cii_line(w: &mut XmlWriter, line_id: usize, line: &LineItem) -> Result<(), EInvoiceError> {
    w.start_element("ram:IncludedSupplyChainTradeLineItem")?;

    w.start_element("ram:AssociatedDocumentLineDocument")?;
    w.text_element("ram:LineID", &line_id.to_string())?;
    w.end_element("ram:AssociatedDocumentLineDocument")?;

    w.start_element("ram:SpecifiedTradeProduct")?;
    w.text_element("ram:Name", &line.description)?;
    w.end_element("ram:SpecifiedTradeProduct")?;

    w.start_element("ram:SpecifiedLineTradeAgreement")?;
    w.start_element("ram:NetPriceProductTradePrice")?;
    w.text_element("ram:ChargeAmount", &format_decimal(line.unit_price))?;
    w.end_element("ram:NetPriceProductTradePrice")?;
    w.end_element("ram:SpecifiedLineTradeAgreement")?;

    w.start_element("ram:SpecifiedLineTradeDelivery")?;
    w.text_element_with_attrs(
        "ram:BilledQuantity",
        &format_decimal(line.quantity),
        &[("unitCode", line.unit_code.as_str())],
    )?;
    w.end_element("ram:SpecifiedLineTradeDelivery")?;

    w.start_element("ram:SpecifiedLineTradeSettlement")?;
    w.start_element("ram:ApplicableTradeTax")?;
    w.text_element("ram:TypeCode", "VAT")?;
    w.text_element("ram:CategoryCode", &line.category_code())?;
    w.text_element("ram:RateApplicablePercent", &format_decimal(line.tax_rate))?;
    w.end_element("ram:ApplicableTradeTax")?;
    w.start_element("ram:SpecifiedTradeSettlementLineMonetarySummation")?;
    w.text_element("ram:LineTotalAmount", &format_decimal(line.total_price))?;
    w.end_element("ram:SpecifiedTradeSettlementLineMonetarySummation")?;
    w.end_element("ram:SpecifiedLineTradeSettlement")?;

    w.end_element("ram:IncludedSupplyChainTradeLineItem")?;
    Ok(())
}

fn write_cii_allowance_charge(
    w: &mut XmlWriter,
    ac: &AllowanceCharge,
) -> Result<(), EInvoiceError> {
    w.start_element("ram:SpecifiedTradeAllowanceCharge")?;
    w.start_element("ram:ChargeIndicator")?;
    w.text_element(
        "udt:Indicator",
        if ac.charge_indicator { "true" } else { "false" },
    )?;
    w.end_element("ram:ChargeIndicator")?;
    w.text_element("ram:ActualAmount", &format_decimal(ac.amount))?;
    w.optional_text_element("ram:Reason", ac.reason.as_deref())?;
    w.start_element("ram:CategoryTradeTax")?;
    w.text_element("ram:TypeCode", "VAT")?;
    w.text_element("ram:CategoryCode", &ac.category_code())?;
    w.text_element("ram:RateApplicablePercent", &format_decimal(ac.rate()))?;
    w.end_element("ram:CategoryTradeTax")?;
    w.end_element("ram:SpecifiedTradeAllowanceCharge")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample(format: FormatId) -> CanonicalInvoice {
        InvoiceBuilder::new("RE-2024-001", format)
            .invoice_date(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
            .buyer_reference("04011000-12345-34")
            .seller(
                PartyBuilder::new("ACME GmbH")
                    .address("Hauptstr. 1", "Berlin", "10115", "DE")
                    .vat_id("DE123456789")
                    .electronic_address("EM", "rechnung@acme.de")
                    .build(),
            )
            .buyer(
                PartyBuilder::new("Kunde AG")
                    .address("Marienplatz 1", "München", "80331", "de")
                    .build(),
            )
            .add_line(
                LineItemBuilder::new("Beratung", dec!(10), dec!(150))
                    .tax_rate(dec!(19))
                    .unit("HUR")
                    .build(),
            )
            .add_allowance(dec!(100), "Rabatt")
            .build()
    }

    #[test]
    fn xrechnung_cii_header_and_totals() {
        let generator = CiiGenerator::new(FormatId::XRechnungCii);
        let xml = generator.to_xml(&sample(FormatId::XRechnungCii)).unwrap();

        assert!(xml.contains(XRECHNUNG_CUSTOMIZATION_ID));
        assert!(xml.contains(PEPPOL_PROFILE_ID));
        assert!(xml.contains("<ram:ID>RE-2024-001</ram:ID>"));
        assert!(xml.contains(r#"<udt:DateTimeString format="102">20240615</udt:DateTimeString>"#));
        assert!(xml.contains("<ram:BuyerReference>04011000-12345-34</ram:BuyerReference>"));
        assert!(xml.contains(r#"<ram:BilledQuantity unitCode="HUR">10.00</ram:BilledQuantity>"#));
        assert!(xml.contains("<ram:LineTotalAmount>1500.00</ram:LineTotalAmount>"));
        assert!(xml.contains("<ram:AllowanceTotalAmount>100.00</ram:AllowanceTotalAmount>"));
        assert!(xml.contains("<ram:TaxBasisTotalAmount>1400.00</ram:TaxBasisTotalAmount>"));
        assert!(xml.contains(r#"<ram:TaxTotalAmount currencyID="EUR">266.00</ram:TaxTotalAmount>"#));
        assert!(xml.contains("<ram:GrandTotalAmount>1666.00</ram:GrandTotalAmount>"));
        assert!(xml.contains("<ram:CountryID>DE</ram:CountryID>"));
        assert!(xml.contains(r#"<ram:URIID schemeID="EM">rechnung@acme.de</ram:URIID>"#));

        assert!(generator.validate(&xml).valid);
    }

    #[test]
    fn facturx_guidelines_replace_xrechnung_context() {
        let basic = CiiGenerator::new(FormatId::FacturxBasic)
            .to_xml(&sample(FormatId::FacturxBasic))
            .unwrap();
        assert!(basic.contains(FACTURX_BASIC_GUIDELINE));
        assert!(!basic.contains(PEPPOL_PROFILE_ID));

        let comfort = CiiGenerator::new(FormatId::FacturxEn16931)
            .to_xml(&sample(FormatId::FacturxEn16931))
            .unwrap();
        assert!(comfort.contains("<ram:ID>urn:cen.eu:en16931:2017</ram:ID>"));
    }

    #[test]
    fn credit_note_references_preceding_invoice() {
        let mut inv = sample(FormatId::XRechnungCii);
        inv.document_type_code = DocumentType::CreditNote;
        inv.preceding_invoice_reference = Some("RE-2024-000".into());
        let xml = CiiGenerator::new(FormatId::XRechnungCii).to_xml(&inv).unwrap();
        assert!(xml.contains("<ram:TypeCode>381</ram:TypeCode>"));
        assert!(xml.contains("<ram:IssuerAssignedID>RE-2024-000</ram:IssuerAssignedID>"));
    }

    #[test]
    fn missing_issue_date_fails_structural_check() {
        let mut inv = sample(FormatId::XRechnungCii);
        inv.invoice_date = None;
        let generator = CiiGenerator::new(FormatId::XRechnungCii);
        let check = generator.validate(&generator.to_xml(&inv).unwrap());
        assert!(!check.valid);
        assert!(check.errors.iter().any(|e| e.contains("IssueDateTime")));
    }
}
