use rust_decimal::Decimal;

use super::cii::endpoint_scheme;
use super::xml_utils::{XmlResult, XmlWriter, format_decimal};
use super::{
    CIUS_RO_CUSTOMIZATION_ID, Generator, NLCIUS_CUSTOMIZATION_ID, PEPPOL_CUSTOMIZATION_ID,
    PEPPOL_PROFILE_ID, XRECHNUNG_CUSTOMIZATION_ID, ubl_ns,
};
use crate::core::*;
use crate::formats::FormatId;

const UBL_REQUIRED: &[&str] = &[
    "CustomizationID",
    "ProfileID",
    "ID",
    "IssueDate",
    "DocumentCurrencyCode",
    "AccountingSupplierParty",
    "AccountingCustomerParty",
    "TaxTotal",
    "LegalMonetaryTotal",
    "PayableAmount",
];

/// OASIS UBL 2.1 generator shared by the UBL-based profiles (XRechnung UBL,
/// Peppol BIS, NLCIUS, CIUS-RO); they differ in the customization id.
#[derive(Debug, Clone, Copy)]
pub struct UblGenerator {
    format: FormatId,
}

impl UblGenerator {
    pub fn new(format: FormatId) -> Self {
        Self { format }
    }

    /// BT-24 customization id written for this generator's format.
    pub fn customization_id(&self) -> &'static str {
        match self.format {
            FormatId::PeppolBis => PEPPOL_CUSTOMIZATION_ID,
            FormatId::Nlcius => NLCIUS_CUSTOMIZATION_ID,
            FormatId::CiusRo => CIUS_RO_CUSTOMIZATION_ID,
            _ => XRECHNUNG_CUSTOMIZATION_ID,
        }
    }
}

impl Generator for UblGenerator {
    fn format_id(&self) -> FormatId {
        self.format
    }

    fn to_xml(&self, invoice: &CanonicalInvoice) -> Result<String, EInvoiceError> {
        to_ubl_xml(invoice, self.customization_id())
    }

    fn required_elements(&self) -> &'static [&'static str] {
        UBL_REQUIRED
    }
}

/// Element names that differ between the Invoice and CreditNote documents.
struct DocumentNames {
    root: &'static str,
    namespace: &'static str,
    type_code: &'static str,
    line: &'static str,
    quantity: &'static str,
}

const INVOICE_NAMES: DocumentNames = DocumentNames {
    root: "ubl:Invoice",
    namespace: ubl_ns::INVOICE,
    type_code: "cbc:InvoiceTypeCode",
    line: "cac:InvoiceLine",
    quantity: "cbc:InvoicedQuantity",
};

const CREDIT_NOTE_NAMES: DocumentNames = DocumentNames {
    root: "ubl:CreditNote",
    namespace: ubl_ns::CREDIT_NOTE,
    type_code: "cbc:CreditNoteTypeCode",
    line: "cac:CreditNoteLine",
    quantity: "cbc:CreditedQuantity",
};

fn to_ubl_xml(invoice: &CanonicalInvoice, customization_id: &str) -> XmlResult {
    let names = if invoice.is_credit_note() {
        &CREDIT_NOTE_NAMES
    } else {
        &INVOICE_NAMES
    };
    let currency = invoice.currency.as_str();
    let totals = &invoice.totals;
    let breakdown = tax_breakdown(&invoice.line_items, &invoice.allowance_charges);
    let mut w = XmlWriter::new()?;

    w.start_element_with_attrs(
        names.root,
        &[
            ("xmlns:ubl", names.namespace),
            ("xmlns:cac", ubl_ns::CAC),
            ("xmlns:cbc", ubl_ns::CBC),
        ],
    )?;

    // BT-24 / BT-23
    w.text_element("cbc:CustomizationID", customization_id)?;
    w.text_element("cbc:ProfileID", PEPPOL_PROFILE_ID)?;
    w.text_element("cbc:ID", invoice.invoice_number.trim())?;
    if let Some(date) = &invoice.invoice_date {
        w.text_element("cbc:IssueDate", &date.to_string())?;
    }
    // Credit notes carry the due date under PaymentMeans instead.
    if !invoice.is_credit_note() {
        if let Some(due) = &invoice.payment.due_date {
            w.text_element("cbc:DueDate", &due.to_string())?;
        }
    }
    w.text_element(names.type_code, &invoice.document_type_code.code().to_string())?;
    for note in &invoice.notes {
        w.text_element("cbc:Note", note)?;
    }
    w.text_element("cbc:DocumentCurrencyCode", currency)?;
    w.optional_text_element("cbc:BuyerReference", invoice.buyer_reference.as_deref())?;

    if let Some(po) = &invoice.purchase_order_reference {
        w.start_element("cac:OrderReference")?;
        w.text_element("cbc:ID", po)?;
        w.end_element("cac:OrderReference")?;
    }

    // BG-3
    if let Some(preceding) = &invoice.preceding_invoice_reference {
        w.start_element("cac:BillingReference")?;
        w.start_element("cac:InvoiceDocumentReference")?;
        w.text_element("cbc:ID", preceding)?;
        w.end_element("cac:InvoiceDocumentReference")?;
        w.end_element("cac:BillingReference")?;
    }

    write_ubl_party(&mut w, &invoice.seller, "cac:AccountingSupplierParty")?;
    write_ubl_party(&mut w, &invoice.buyer, "cac:AccountingCustomerParty")?;

    // BG-16
    if let Some(iban) = &invoice.payment.iban {
        w.start_element("cac:PaymentMeans")?;
        w.text_element("cbc:PaymentMeansCode", "58")?;
        if invoice.is_credit_note() {
            if let Some(due) = &invoice.payment.due_date {
                w.text_element("cbc:PaymentDueDate", &due.to_string())?;
            }
        }
        w.start_element("cac:PayeeFinancialAccount")?;
        w.text_element("cbc:ID", iban)?;
        if let Some(bic) = &invoice.payment.bic {
            w.start_element("cac:FinancialInstitutionBranch")?;
            w.text_element("cbc:ID", bic)?;
            w.end_element("cac:FinancialInstitutionBranch")?;
        }
        w.end_element("cac:PayeeFinancialAccount")?;
        w.end_element("cac:PaymentMeans")?;
    }

    if let Some(terms) = &invoice.payment.payment_terms {
        w.start_element("cac:PaymentTerms")?;
        w.text_element("cbc:Note", terms)?;
        w.end_element("cac:PaymentTerms")?;
    }

    // BG-20 / BG-21
    for ac in &book_allowance_charges(&invoice.line_items, &invoice.allowance_charges) {
        write_ubl_allowance_charge(&mut w, ac, currency)?;
    }

    // BG-23
    w.start_element("cac:TaxTotal")?;
    w.amount_element("cbc:TaxAmount", totals.tax_amount, currency)?;
    for group in &breakdown {
        w.start_element("cac:TaxSubtotal")?;
        w.amount_element("cbc:TaxableAmount", group.taxable_amount, currency)?;
        w.amount_element("cbc:TaxAmount", group.tax_amount, currency)?;
        write_tax_category(&mut w, "cac:TaxCategory", &group.category_code, group.rate)?;
        w.end_element("cac:TaxSubtotal")?;
    }
    w.end_element("cac:TaxTotal")?;

    // BG-22
    w.start_element("cac:LegalMonetaryTotal")?;
    w.amount_element("cbc:LineExtensionAmount", totals.subtotal, currency)?;
    w.amount_element("cbc:TaxExclusiveAmount", invoice.net_total(), currency)?;
    w.amount_element("cbc:TaxInclusiveAmount", totals.total_amount, currency)?;
    if totals.allowance_total > Decimal::ZERO {
        w.amount_element("cbc:AllowanceTotalAmount", totals.allowance_total, currency)?;
    }
    if totals.charge_total > Decimal::ZERO {
        w.amount_element("cbc:ChargeTotalAmount", totals.charge_total, currency)?;
    }
    w.amount_element("cbc:PayableAmount", totals.total_amount, currency)?;
    w.end_element("cac:LegalMonetaryTotal")?;

    // BG-25
    for (idx, line) in invoice.line_items.iter().enumerate() {
        write_ubl_line(&mut w, names, idx + 1, line, currency)?;
    }

    w.end_element(names.root)?;
    w.into_string()
}

fn write_ubl_party(w: &mut XmlWriter, party: &Party, wrapper: &str) -> Result<(), EInvoiceError> {
    w.start_element(wrapper)?;
    w.start_element("cac:Party")?;

    // BT-34 / BT-49
    if let Some(endpoint) = &party.electronic_address {
        w.text_element_with_attrs(
            "cbc:EndpointID",
            endpoint,
            &[("schemeID", endpoint_scheme(party))],
        )?;
    }

    w.start_element("cac:PartyName")?;
    w.text_element("cbc:Name", &party.name)?;
    w.end_element("cac:PartyName")?;

    w.start_element("cac:PostalAddress")?;
    w.optional_text_element("cbc:StreetName", party.address.as_deref())?;
    w.optional_text_element("cbc:CityName", party.city.as_deref())?;
    w.optional_text_element("cbc:PostalZone", party.postal_code.as_deref())?;
    if let Some(country) = party.country() {
        w.start_element("cac:Country")?;
        w.text_element("cbc:IdentificationCode", &country)?;
        w.end_element("cac:Country")?;
    }
    w.end_element("cac:PostalAddress")?;

    // BT-31 / BT-48
    if let Some(vat_id) = &party.vat_id {
        write_party_tax_scheme(w, vat_id, "VAT")?;
    }
    // BT-32: national tax number
    if let Some(tax_num) = &party.tax_number {
        write_party_tax_scheme(w, tax_num, "FC")?;
    }

    // BT-27 / BT-30
    w.start_element("cac:PartyLegalEntity")?;
    w.text_element("cbc:RegistrationName", &party.name)?;
    w.optional_text_element("cbc:CompanyID", party.tax_id.as_deref())?;
    w.end_element("cac:PartyLegalEntity")?;

    if party.contact_name.is_some() || party.phone.is_some() || party.email.is_some() {
        w.start_element("cac:Contact")?;
        w.optional_text_element("cbc:Name", party.contact_name.as_deref())?;
        w.optional_text_element("cbc:Telephone", party.phone.as_deref())?;
        w.optional_text_element("cbc:ElectronicMail", party.email.as_deref())?;
        w.end_element("cac:Contact")?;
    }

    w.end_element("cac:Party")?;
    w.end_element(wrapper)?;
    Ok(())
}

fn write_party_tax_scheme(w: &mut XmlWriter, id: &str, scheme: &str) -> Result<(), EInvoiceError> {
    w.start_element("cac:PartyTaxScheme")?;
    w.text_element("cbc:CompanyID", id)?;
    w.start_element("cac:TaxScheme")?;
    w.text_element("cbc:ID", scheme)?;
    w.end_element("cac:TaxScheme")?;
    w.end_element("cac:PartyTaxScheme")?;
    Ok(())
}

fn write_tax_category(
    w: &mut XmlWriter,
    element: &str,
    category: &str,
    rate: Decimal,
) -> Result<(), EInvoiceError> {
    w.start_element(element)?;
    w.text_element("cbc:ID", category)?;
    w.text_element("cbc:Percent", &format_decimal(rate))?;
    w.start_element("cac:TaxScheme")?;
    w.text_element("cbc:ID", "VAT")?;
    w.end_element("cac:TaxScheme")?;
    w.end_element(element)?;
    Ok(())
}

fn write_ubl_allowance_charge(
    w: &mut XmlWriter,
    ac: &AllowanceCharge,
    currency: &str,
) -> Result<(), EInvoiceError> {
    w.start_element("cac:AllowanceCharge")?;
    w.text_element(
        "cbc:ChargeIndicator",
        if ac.charge_indicator { "true" } else { "false" },
    )?;
    w.optional_text_element("cbc:AllowanceChargeReason", ac.reason.as_deref())?;
    w.amount_element("cbc:Amount", ac.amount, currency)?;
    write_tax_category(w, "cac:TaxCategory", &ac.category_code(), ac.rate())?;
    w.end_element("cac:AllowanceCharge")?;
    Ok(())
}

fn write_ubl_line(
    w: &mut XmlWriter,
    names: &DocumentNames,
    line_id: usize,
    line: &LineItem,
    currency: &str,
) -> Result<(), EInvoiceError> {
    w.start_element(names.line)?;
    w.text_element("cbc:ID", &line_id.to_string())?;
    w.quantity_element(names.quantity, line.quantity, &line.unit_code)?;
    w.amount_element("cbc:LineExtensionAmount", line.total_price, currency)?;

    w.start_element("cac:Item")?;
    w.text_element("cbc:Name", &line.description)?;
    write_tax_category(w, "cac:ClassifiedTaxCategory", &line.category_code(), line.tax_rate)?;
    w.end_element("cac:Item")?;

    w.start_element("cac:Price")?;
    w.amount_element("cbc:PriceAmount", line.unit_price, currency)?;
    w.end_element("cac:Price")?;

    w.end_element(names.line)?;
    Ok(())
}
