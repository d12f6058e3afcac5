//! FatturaPA 1.2 (FPR12) for the Italian Sistema di Interscambio.

use super::Generator;
use super::xml_utils::{XmlResult, XmlWriter, format_decimal, format_money};
use crate::core::*;
use crate::formats::FormatId;

const FATTURAPA_NS: &str = "http://ivaservizi.agenziaentrate.gov.it/docs/xsd/fatture/v1.2";
const XMLDSIG_NS: &str = "http://www.w3.org/2000/09/xmldsig#";

/// CodiceDestinatario used when the buyer is reached by PEC or is a consumer.
pub(crate) const NO_RECIPIENT_CODE: &str = "0000000";

const REQUIRED: &[&str] = &[
    "FatturaElettronica",
    "FatturaElettronicaHeader",
    "DatiTrasmissione",
    "CodiceDestinatario",
    "CedentePrestatore",
    "CessionarioCommittente",
    "FatturaElettronicaBody",
    "DatiGeneraliDocumento",
    "TipoDocumento",
    "Data",
    "Numero",
    "DatiBeniServizi",
    "DettaglioLinee",
    "DatiRiepilogo",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct FatturaPaGenerator;

impl Generator for FatturaPaGenerator {
    fn format_id(&self) -> FormatId {
        FormatId::FatturaPa
    }

    fn to_xml(&self, invoice: &CanonicalInvoice) -> Result<String, EInvoiceError> {
        to_fatturapa_xml(invoice)
    }

    fn required_elements(&self) -> &'static [&'static str] {
        REQUIRED
    }
}

/// Natura code for a zero-rated line, by UNTDID 5305 category.
pub(crate) fn natura_for(category: &str) -> Option<&'static str> {
    match category {
        "Z" => Some("N3.5"),
        "E" => Some("N4"),
        "AE" => Some("N6.9"),
        "K" => Some("N3.2"),
        "G" => Some("N3.1"),
        "O" => Some("N2.2"),
        _ => None,
    }
}

/// TD01 invoice, TD04 credit note, TD02 prepayment.
fn tipo_documento(doc_type: DocumentType) -> &'static str {
    match doc_type {
        DocumentType::CreditNote => "TD04",
        DocumentType::Prepayment => "TD02",
        _ => "TD01",
    }
}

/// Split a VAT id into country prefix and code; unprefixed ids get `default_country`.
pub(crate) fn split_vat_id<'a>(vat_id: &'a str, default_country: &'a str) -> (&'a str, &'a str) {
    let vat_id = vat_id.trim();
    match vat_id.get(..2) {
        Some(prefix) if prefix.chars().all(|c| c.is_ascii_alphabetic()) => (prefix, &vat_id[2..]),
        _ => (default_country, vat_id),
    }
}

/// The SdI recipient code: a 7-character buyer endpoint, else `0000000`.
pub(crate) fn recipient_code(buyer: &Party) -> &str {
    match buyer.electronic_address.as_deref().map(str::trim) {
        Some(code) if code.len() == 7 && code.chars().all(|c| c.is_ascii_alphanumeric()) => code,
        _ => NO_RECIPIENT_CODE,
    }
}

fn progressivo_invio(number: &str) -> String {
    let alnum: Vec<char> = number.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if alnum.is_empty() {
        return "1".to_string();
    }
    alnum[alnum.len().saturating_sub(10)..].iter().collect()
}

fn to_fatturapa_xml(invoice: &CanonicalInvoice) -> XmlResult {
    let breakdown = tax_breakdown(&invoice.line_items, &invoice.allowance_charges);
    let seller_country = invoice.seller.country().unwrap_or_else(|| "IT".to_string());
    let mut w = XmlWriter::new()?;

    w.start_element_with_attrs(
        "p:FatturaElettronica",
        &[
            ("versione", "FPR12"),
            ("xmlns:p", FATTURAPA_NS),
            ("xmlns:ds", XMLDSIG_NS),
        ],
    )?;

    w.start_element("FatturaElettronicaHeader")?;

    w.start_element("DatiTrasmissione")?;
    let (id_paese, id_codice) = split_vat_id(
        invoice.seller.vat_id.as_deref().unwrap_or_default(),
        &seller_country,
    );
    w.start_element("IdTrasmittente")?;
    w.text_element("IdPaese", id_paese)?;
    w.text_element("IdCodice", id_codice)?;
    w.end_element("IdTrasmittente")?;
    w.text_element("ProgressivoInvio", &progressivo_invio(&invoice.invoice_number))?;
    w.text_element("FormatoTrasmissione", "FPR12")?;
    let code = recipient_code(&invoice.buyer);
    w.text_element("CodiceDestinatario", code)?;
    if code == NO_RECIPIENT_CODE {
        w.optional_text_element("PECDestinatario", invoice.buyer.email.as_deref())?;
    }
    w.end_element("DatiTrasmissione")?;

    w.start_element("CedentePrestatore")?;
    write_anagrafica(&mut w, &invoice.seller, &seller_country, true)?;
    write_sede(&mut w, &invoice.seller, &seller_country)?;
    w.end_element("CedentePrestatore")?;

    let buyer_country = invoice.buyer.country().unwrap_or_else(|| "IT".to_string());
    w.start_element("CessionarioCommittente")?;
    write_anagrafica(&mut w, &invoice.buyer, &buyer_country, false)?;
    write_sede(&mut w, &invoice.buyer, &buyer_country)?;
    w.end_element("CessionarioCommittente")?;

    w.end_element("FatturaElettronicaHeader")?;

    w.start_element("FatturaElettronicaBody")?;

    w.start_element("DatiGenerali")?;
    w.start_element("DatiGeneraliDocumento")?;
    w.text_element("TipoDocumento", tipo_documento(invoice.document_type_code))?;
    w.text_element("Divisa", &invoice.currency)?;
    if let Some(date) = &invoice.invoice_date {
        w.text_element("Data", &date.to_string())?;
    }
    w.text_element("Numero", invoice.invoice_number.trim())?;
    for ac in &invoice.allowance_charges {
        w.start_element("ScontoMaggiorazione")?;
        w.text_element("Tipo", if ac.charge_indicator { "MG" } else { "SC" })?;
        w.text_element("Importo", &format_money(ac.amount))?;
        w.end_element("ScontoMaggiorazione")?;
    }
    w.text_element("ImportoTotaleDocumento", &format_money(invoice.totals.total_amount))?;
    for note in &invoice.notes {
        w.text_element("Causale", note)?;
    }
    w.end_element("DatiGeneraliDocumento")?;
    if let Some(po) = &invoice.purchase_order_reference {
        w.start_element("DatiOrdineAcquisto")?;
        w.text_element("IdDocumento", po)?;
        w.end_element("DatiOrdineAcquisto")?;
    }
    if let Some(preceding) = &invoice.preceding_invoice_reference {
        w.start_element("DatiFattureCollegate")?;
        w.text_element("IdDocumento", preceding)?;
        w.end_element("DatiFattureCollegate")?;
    }
    w.end_element("DatiGenerali")?;

    w.start_element("DatiBeniServizi")?;
    for (idx, line) in invoice.line_items.iter().enumerate() {
        w.start_element("DettaglioLinee")?;
        w.text_element("NumeroLinea", &(idx + 1).to_string())?;
        w.text_element("Descrizione", &line.description)?;
        w.text_element("Quantita", &format_decimal(line.quantity))?;
        w.text_element("UnitaMisura", &line.unit_code)?;
        w.text_element("PrezzoUnitario", &format_decimal(line.unit_price))?;
        w.text_element("PrezzoTotale", &format_money(line.total_price))?;
        w.text_element("AliquotaIVA", &format_money(line.tax_rate))?;
        if line.tax_rate.is_zero() {
            w.optional_text_element("Natura", natura_for(&line.category_code()))?;
        }
        w.end_element("DettaglioLinee")?;
    }
    for group in &breakdown {
        w.start_element("DatiRiepilogo")?;
        w.text_element("AliquotaIVA", &format_money(group.rate))?;
        if group.rate.is_zero() {
            w.optional_text_element("Natura", natura_for(&group.category_code))?;
        }
        w.text_element("ImponibileImporto", &format_money(group.taxable_amount))?;
        w.text_element("Imposta", &format_money(group.tax_amount))?;
        w.text_element("EsigibilitaIVA", "I")?;
        w.end_element("DatiRiepilogo")?;
    }
    w.end_element("DatiBeniServizi")?;

    if invoice.payment.iban.is_some() || invoice.payment.due_date.is_some() {
        w.start_element("DatiPagamento")?;
        w.text_element("CondizioniPagamento", "TP02")?;
        w.start_element("DettaglioPagamento")?;
        // MP05 bank transfer, MP01 cash
        let modalita = if invoice.payment.iban.is_some() { "MP05" } else { "MP01" };
        w.text_element("ModalitaPagamento", modalita)?;
        if let Some(due) = &invoice.payment.due_date {
            w.text_element("DataScadenzaPagamento", &due.to_string())?;
        }
        w.text_element("ImportoPagamento", &format_money(invoice.totals.total_amount))?;
        w.optional_text_element("IBAN", invoice.payment.iban.as_deref())?;
        w.optional_text_element("BIC", invoice.payment.bic.as_deref())?;
        w.end_element("DettaglioPagamento")?;
        w.end_element("DatiPagamento")?;
    }

    w.end_element("FatturaElettronicaBody")?;
    w.end_element("p:FatturaElettronica")?;
    w.into_string()
}

fn write_anagrafica(
    w: &mut XmlWriter,
    party: &Party,
    country: &str,
    is_seller: bool,
) -> Result<(), EInvoiceError> {
    w.start_element("DatiAnagrafici")?;
    if let Some(vat_id) = party.vat_id.as_deref().filter(|v| !v.trim().is_empty()) {
        let (id_paese, id_codice) = split_vat_id(vat_id, country);
        w.start_element("IdFiscaleIVA")?;
        w.text_element("IdPaese", id_paese)?;
        w.text_element("IdCodice", id_codice)?;
        w.end_element("IdFiscaleIVA")?;
    }
    w.optional_text_element("CodiceFiscale", party.tax_id.as_deref())?;
    w.start_element("Anagrafica")?;
    w.text_element("Denominazione", &party.name)?;
    w.end_element("Anagrafica")?;
    if is_seller {
        // ordinary regime
        w.text_element("RegimeFiscale", "RF01")?;
    }
    w.end_element("DatiAnagrafici")?;
    Ok(())
}

fn write_sede(w: &mut XmlWriter, party: &Party, country: &str) -> Result<(), EInvoiceError> {
    w.start_element("Sede")?;
    w.optional_text_element("Indirizzo", party.address.as_deref())?;
    w.optional_text_element("CAP", party.postal_code.as_deref())?;
    w.optional_text_element("Comune", party.city.as_deref())?;
    w.text_element("Nazione", country)?;
    w.end_element("Sede")?;
    Ok(())
}
