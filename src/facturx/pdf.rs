//! Visual rendition of an invoice with lopdf: A4 pages, the standard
//! Helvetica fonts, WinAnsi text. Hybrid output carries the CII XML as an
//! associated file plus the PDF/A-3 XMP packet.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

use super::{FACTURX_FILENAME, FacturxProfile, xmp};
use crate::core::{CanonicalInvoice, EInvoiceError, Party, tax_breakdown};
use crate::generate::xml_utils::{format_decimal, format_money};

// Layout in points (1pt = 1/72 inch)
const PAGE_WIDTH_PT: f32 = 595.0;
const PAGE_HEIGHT_PT: f32 = 842.0;
const MARGIN_LEFT: f32 = 57.0;
const MARGIN_RIGHT: f32 = 57.0;
const MARGIN_TOP: f32 = 57.0;
const MARGIN_BOTTOM: f32 = 57.0;
const FONT_SIZE_TITLE: f32 = 18.0;
const FONT_SIZE_HEADER: f32 = 12.0;
const FONT_SIZE_NORMAL: f32 = 10.0;
const FONT_SIZE_SMALL: f32 = 8.0;
const LINE_HEIGHT: f32 = 14.0;

const BUYER_COLUMN: f32 = 320.0;
const COL_QTY: f32 = 300.0;
const COL_PRICE: f32 = 360.0;
const COL_RATE: f32 = 435.0;
const COL_NET: f32 = 480.0;
const DESCRIPTION_CHARS: usize = 44;

const REGULAR: &str = "F1";
const BOLD: &str = "F2";

/// Render the invoice as a PDF without any attachment.
pub fn render_invoice_pdf(
    invoice: &CanonicalInvoice,
    profile: FacturxProfile,
) -> Result<Vec<u8>, EInvoiceError> {
    build_document(invoice, profile, None).and_then(save)
}

/// Render the invoice with `xml` attached as `factur-x.xml`.
///
/// The catalog gets the `AF` array, the `EmbeddedFiles` name tree and the
/// XMP metadata stream, so the result reads as a PDF/A-3 hybrid.
pub fn render_hybrid_pdf(
    invoice: &CanonicalInvoice,
    profile: FacturxProfile,
    xml: &str,
) -> Result<Vec<u8>, EInvoiceError> {
    build_document(invoice, profile, Some(xml)).and_then(save)
}

fn save(mut doc: Document) -> Result<Vec<u8>, EInvoiceError> {
    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| EInvoiceError::Pdf(format!("failed to save PDF: {e}")))?;
    Ok(output)
}

fn build_document(
    invoice: &CanonicalInvoice,
    profile: FacturxProfile,
    xml: Option<&str>,
) -> Result<Document, EInvoiceError> {
    let pages = layout(invoice, profile);
    let title = document_title(invoice);

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let regular_id = add_font(&mut doc, "Helvetica");
    let bold_id = add_font(&mut doc, "Helvetica-Bold");
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            REGULAR => Object::Reference(regular_id),
            BOLD => Object::Reference(bold_id),
        },
    });

    let mut kids = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations }
            .encode()
            .map_err(|e| EInvoiceError::Pdf(format!("failed to encode page content: {e}")))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH_PT.into(), PAGE_HEIGHT_PT.into()],
            "Contents" => Object::Reference(content_id),
            "Resources" => Object::Reference(resources_id),
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let mut catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    };
    if let Some(xml) = xml {
        attach_invoice_xml(&mut doc, &mut catalog, xml, profile, &title)?;
    }
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(win_ansi(&title)),
        "Author" => Object::string_literal(win_ansi(&invoice.seller.name)),
        "Producer" => Object::string_literal(concat!("eformat ", env!("CARGO_PKG_VERSION"))),
    });
    doc.trailer.set("Info", Object::Reference(info_id));

    Ok(doc)
}

/// Store `xml` as the document's associated file and describe it in the
/// catalog. The name tree is kept inline; readers accept both forms.
fn attach_invoice_xml(
    doc: &mut Document,
    catalog: &mut Dictionary,
    xml: &str,
    profile: FacturxProfile,
    title: &str,
) -> Result<(), EInvoiceError> {
    let file_name = || Object::string_literal(FACTURX_FILENAME);

    let data_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "EmbeddedFile",
            "Subtype" => Object::Name(b"text/xml".to_vec()),
            "Params" => dictionary! { "Size" => xml.len() as i64 },
        },
        xml.as_bytes().to_vec(),
    ));
    let filespec_id = doc.add_object(dictionary! {
        "Type" => "Filespec",
        "F" => file_name(),
        "UF" => file_name(),
        "Desc" => Object::string_literal(win_ansi(&format!(
            "{title}, Factur-X {}",
            profile.conformance_level()
        ))),
        "AFRelationship" => Object::Name(profile.af_relationship().as_bytes().to_vec()),
        "EF" => dictionary! {
            "F" => Object::Reference(data_id),
            "UF" => Object::Reference(data_id),
        },
    });

    // PDF/A forbids compressing the metadata stream
    let packet = xmp::build_xmp(profile, title)?;
    let metadata_id = doc.add_object(
        Stream::new(dictionary! { "Type" => "Metadata", "Subtype" => "XML" }, packet.into_bytes())
            .with_compression(false),
    );

    catalog.set("AF", vec![Object::Reference(filespec_id)]);
    catalog.set(
        "Names",
        dictionary! {
            "EmbeddedFiles" => dictionary! {
                "Names" => vec![file_name(), Object::Reference(filespec_id)],
            },
        },
    );
    catalog.set("Metadata", Object::Reference(metadata_id));
    catalog.set("MarkInfo", dictionary! { "Marked" => true });

    tracing::debug!(
        bytes = xml.len(),
        conformance = profile.conformance_level(),
        title,
        "attached invoice XML"
    );
    Ok(())
}

fn add_font(doc: &mut Document, base_font: &str) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
        "Encoding" => "WinAnsiEncoding",
    })
}

fn document_title(invoice: &CanonicalInvoice) -> String {
    let kind = if invoice.is_credit_note() { "Credit note" } else { "Invoice" };
    format!("{kind} {}", invoice.invoice_number.trim())
}

/// Page-breaking text cursor.
struct Layout {
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            ops: Vec::new(),
            y: PAGE_HEIGHT_PT - MARGIN_TOP,
        }
    }

    fn text(&mut self, font: &str, size: f32, x: f32, text: &str) {
        self.ops.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(font.as_bytes().to_vec()), size.into()]),
            Operation::new("Td", vec![x.into(), self.y.into()]),
            Operation::new("Tj", vec![Object::string_literal(win_ansi(text))]),
            Operation::new("ET", vec![]),
        ]);
    }

    fn line(&mut self, font: &str, size: f32, text: &str) {
        self.text(font, size, MARGIN_LEFT, text);
        self.advance(LINE_HEIGHT);
    }

    fn rule(&mut self) {
        let y = self.y + LINE_HEIGHT / 2.0;
        self.ops.extend([
            Operation::new("w", vec![0.5_f32.into()]),
            Operation::new("m", vec![MARGIN_LEFT.into(), y.into()]),
            Operation::new("l", vec![(PAGE_WIDTH_PT - MARGIN_RIGHT).into(), y.into()]),
            Operation::new("S", vec![]),
        ]);
    }

    fn advance(&mut self, by: f32) {
        self.y -= by;
    }

    /// Start a new page when fewer than `needed` points remain.
    fn reserve(&mut self, needed: f32) {
        if self.y - needed < MARGIN_BOTTOM {
            self.pages.push(std::mem::take(&mut self.ops));
            self.y = PAGE_HEIGHT_PT - MARGIN_TOP;
        }
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        self.pages.push(self.ops);
        self.pages
    }
}

fn layout(invoice: &CanonicalInvoice, profile: FacturxProfile) -> Vec<Vec<Operation>> {
    let currency = invoice.currency.trim();
    let mut page = Layout::new();

    // Header
    let title = if invoice.is_credit_note() { "CREDIT NOTE" } else { "INVOICE" };
    page.text(BOLD, FONT_SIZE_TITLE, MARGIN_LEFT, title);
    page.advance(FONT_SIZE_TITLE + 6.0);
    page.line(REGULAR, FONT_SIZE_NORMAL, &format!("No. {}", invoice.invoice_number.trim()));
    if let Some(date) = invoice.invoice_date {
        page.line(REGULAR, FONT_SIZE_NORMAL, &format!("Date: {}", date.format("%Y-%m-%d")));
    }
    if let Some(due) = invoice.payment.due_date {
        page.line(REGULAR, FONT_SIZE_NORMAL, &format!("Due: {}", due.format("%Y-%m-%d")));
    }
    if let Some(reference) = invoice.preceding_invoice_reference.as_deref() {
        page.line(REGULAR, FONT_SIZE_NORMAL, &format!("Corrects invoice: {reference}"));
    }
    if let Some(reference) = invoice.buyer_reference.as_deref() {
        page.line(REGULAR, FONT_SIZE_NORMAL, &format!("Buyer reference: {reference}"));
    }
    page.advance(LINE_HEIGHT);

    // Parties side by side
    let seller = party_lines(&invoice.seller);
    let buyer = party_lines(&invoice.buyer);
    page.text(BOLD, FONT_SIZE_HEADER, MARGIN_LEFT, "Seller");
    page.text(BOLD, FONT_SIZE_HEADER, BUYER_COLUMN, "Buyer");
    page.advance(LINE_HEIGHT + 2.0);
    for row in 0..seller.len().max(buyer.len()) {
        if let Some(text) = seller.get(row) {
            page.text(REGULAR, FONT_SIZE_NORMAL, MARGIN_LEFT, text);
        }
        if let Some(text) = buyer.get(row) {
            page.text(REGULAR, FONT_SIZE_NORMAL, BUYER_COLUMN, text);
        }
        page.advance(LINE_HEIGHT);
    }
    page.advance(LINE_HEIGHT);

    // Line table
    table_header(&mut page);
    for line in &invoice.line_items {
        page.reserve(LINE_HEIGHT);
        if page.ops.is_empty() {
            table_header(&mut page);
        }
        page.text(REGULAR, FONT_SIZE_NORMAL, MARGIN_LEFT, &truncate(&line.description));
        let quantity = format!("{} {}", format_decimal(line.quantity), line.unit_code);
        page.text(REGULAR, FONT_SIZE_NORMAL, COL_QTY, &quantity);
        page.text(REGULAR, FONT_SIZE_NORMAL, COL_PRICE, &format_decimal(line.unit_price));
        page.text(REGULAR, FONT_SIZE_NORMAL, COL_RATE, &format!("{}%", line.tax_rate.normalize()));
        page.text(REGULAR, FONT_SIZE_NORMAL, COL_NET, &format_money(line.total_price));
        page.advance(LINE_HEIGHT);
    }
    for ac in &invoice.allowance_charges {
        page.reserve(LINE_HEIGHT);
        let label = match (ac.charge_indicator, ac.reason.as_deref()) {
            (true, Some(reason)) => format!("Charge: {reason}"),
            (true, None) => "Charge".to_string(),
            (false, Some(reason)) => format!("Allowance: {reason}"),
            (false, None) => "Allowance".to_string(),
        };
        let amount = if ac.charge_indicator { ac.amount } else { -ac.amount };
        page.text(REGULAR, FONT_SIZE_NORMAL, MARGIN_LEFT, &truncate(&label));
        page.text(REGULAR, FONT_SIZE_NORMAL, COL_NET, &format_money(amount));
        page.advance(LINE_HEIGHT);
    }
    page.rule();
    page.advance(LINE_HEIGHT / 2.0);

    // Totals and VAT breakdown
    let totals = &invoice.totals;
    let breakdown = tax_breakdown(&invoice.line_items, &invoice.allowance_charges);
    page.reserve(LINE_HEIGHT * (5 + breakdown.len()) as f32);
    let total_row = |page: &mut Layout, font: &str, label: &str, amount: String| {
        page.text(font, FONT_SIZE_NORMAL, COL_PRICE, label);
        page.text(font, FONT_SIZE_NORMAL, COL_NET, &format!("{amount} {currency}"));
        page.advance(LINE_HEIGHT);
    };
    total_row(&mut page, REGULAR, "Subtotal", format_money(totals.subtotal));
    if !totals.allowance_total.is_zero() {
        total_row(&mut page, REGULAR, "Allowances", format_money(-totals.allowance_total));
    }
    if !totals.charge_total.is_zero() {
        total_row(&mut page, REGULAR, "Charges", format_money(totals.charge_total));
    }
    for group in &breakdown {
        let label = format!("VAT {} {}%", group.category_code, group.rate.normalize());
        total_row(&mut page, REGULAR, &label, format_money(group.tax_amount));
    }
    total_row(&mut page, BOLD, "Total", format_money(totals.total_amount));
    page.advance(LINE_HEIGHT);

    // Payment and notes
    if let Some(iban) = invoice.payment.iban.as_deref() {
        page.reserve(LINE_HEIGHT * 2.0);
        let bic = invoice
            .payment
            .bic
            .as_deref()
            .map(|b| format!("  BIC {b}"))
            .unwrap_or_default();
        page.line(REGULAR, FONT_SIZE_NORMAL, &format!("IBAN {iban}{bic}"));
    }
    if let Some(terms) = invoice.payment.payment_terms.as_deref() {
        page.reserve(LINE_HEIGHT);
        page.line(REGULAR, FONT_SIZE_NORMAL, terms);
    }
    for note in &invoice.notes {
        page.reserve(LINE_HEIGHT);
        page.line(REGULAR, FONT_SIZE_SMALL, note);
    }

    page.reserve(LINE_HEIGHT * 2.0);
    page.advance(LINE_HEIGHT);
    page.line(
        REGULAR,
        FONT_SIZE_SMALL,
        &format!(
            "Factur-X {} - structured data embedded as {}",
            profile.conformance_level(),
            super::FACTURX_FILENAME
        ),
    );

    page.finish()
}

fn table_header(page: &mut Layout) {
    page.text(BOLD, FONT_SIZE_NORMAL, MARGIN_LEFT, "Description");
    page.text(BOLD, FONT_SIZE_NORMAL, COL_QTY, "Qty");
    page.text(BOLD, FONT_SIZE_NORMAL, COL_PRICE, "Unit price");
    page.text(BOLD, FONT_SIZE_NORMAL, COL_RATE, "VAT");
    page.text(BOLD, FONT_SIZE_NORMAL, COL_NET, "Net");
    page.advance(LINE_HEIGHT);
    page.rule();
}

fn party_lines(party: &Party) -> Vec<String> {
    let mut lines = vec![party.name.trim().to_string()];
    lines.extend(party.address.clone());
    let locality = [party.postal_code.as_deref(), party.city.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    if !locality.trim().is_empty() {
        lines.push(locality);
    }
    lines.extend(party.country());
    if let Some(vat_id) = party.vat_id.as_deref() {
        lines.push(format!("VAT ID {vat_id}"));
    } else if let Some(tax_number) = party.tax_number.as_deref() {
        lines.push(format!("Tax no. {tax_number}"));
    }
    lines.retain(|l| !l.trim().is_empty());
    lines
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= DESCRIPTION_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(DESCRIPTION_CHARS - 3).collect();
    format!("{cut}...")
}

/// Encode for the WinAnsi standard fonts. Latin-1 maps directly; the euro
/// sign has its own slot; anything else becomes `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '€' => 0x80,
            c if c.is_control() => b' ',
            c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}
