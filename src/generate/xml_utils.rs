//! Streaming XML output and the number formats shared by every codec.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use rust_decimal::Decimal;

use crate::core::{EInvoiceError, round_money};

pub type XmlResult = Result<String, EInvoiceError>;

const INDENT: usize = 2;

/// Indented XML writer. Every method returns `&mut Self` so codecs can
/// chain leaf elements.
pub struct XmlWriter {
    writer: Writer<Vec<u8>>,
}

impl XmlWriter {
    /// Writer that starts with the UTF-8 XML declaration.
    pub fn new() -> Result<Self, EInvoiceError> {
        let mut w = Self::fragment();
        w.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(w)
    }

    /// Writer without the XML declaration, for packets embedded elsewhere.
    pub fn fragment() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', INDENT),
        }
    }

    pub fn into_string(self) -> XmlResult {
        String::from_utf8(self.writer.into_inner())
            .map_err(|e| EInvoiceError::Xml(format!("output is not UTF-8: {e}")))
    }

    fn emit(&mut self, event: Event<'_>) -> Result<&mut Self, EInvoiceError> {
        self.writer
            .write_event(event)
            .map_err(|e| EInvoiceError::Xml(format!("write error: {e}")))?;
        Ok(self)
    }

    pub fn processing_instruction(&mut self, content: &str) -> Result<&mut Self, EInvoiceError> {
        self.emit(Event::PI(BytesPI::new(content)))
    }

    pub fn start_element(&mut self, name: &str) -> Result<&mut Self, EInvoiceError> {
        self.start_element_with_attrs(name, &[])
    }

    pub fn start_element_with_attrs(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
    ) -> Result<&mut Self, EInvoiceError> {
        let tag = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.emit(Event::Start(tag))
    }

    pub fn end_element(&mut self, name: &str) -> Result<&mut Self, EInvoiceError> {
        self.emit(Event::End(BytesEnd::new(name)))
    }

    pub fn text_element(&mut self, name: &str, text: &str) -> Result<&mut Self, EInvoiceError> {
        self.text_element_with_attrs(name, text, &[])
    }

    pub fn text_element_with_attrs(
        &mut self,
        name: &str,
        text: &str,
        attrs: &[(&str, &str)],
    ) -> Result<&mut Self, EInvoiceError> {
        self.start_element_with_attrs(name, attrs)?;
        self.emit(Event::Text(BytesText::new(text)))?;
        self.end_element(name)
    }

    /// Write `name` only when `text` is present and non-blank.
    pub fn optional_text_element(
        &mut self,
        name: &str,
        text: Option<&str>,
    ) -> Result<&mut Self, EInvoiceError> {
        match text.map(str::trim).filter(|t| !t.is_empty()) {
            Some(t) => self.text_element(name, t),
            None => Ok(self),
        }
    }

    /// UBL-style amount: `<name currencyID="EUR">12.50</name>`.
    pub fn amount_element(
        &mut self,
        name: &str,
        amount: Decimal,
        currency: &str,
    ) -> Result<&mut Self, EInvoiceError> {
        self.text_element_with_attrs(name, &format_decimal(amount), &[("currencyID", currency)])
    }

    pub fn quantity_element(
        &mut self,
        name: &str,
        qty: Decimal,
        unit: &str,
    ) -> Result<&mut Self, EInvoiceError> {
        self.text_element_with_attrs(name, &format_decimal(qty), &[("unitCode", unit)])
    }
}

/// At least two decimal places; further places only when significant.
pub fn format_decimal(d: Decimal) -> String {
    let mut n = d.normalize();
    if n.scale() < 2 {
        n.rescale(2);
    }
    n.to_string()
}

/// Amount rounded to exactly two places, as the summary fields of the
/// national schemas expect.
pub fn format_money(d: Decimal) -> String {
    format!("{:.2}", round_money(d))
}
