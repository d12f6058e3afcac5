use super::{FACTURX_FILENAME, FacturxProfile};
use crate::core::EInvoiceError;
use crate::generate::xml_utils::XmlWriter;

const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const FX_NS: &str = "urn:factur-x:pdfa:CrossIndustryDocument:invoice:1p0#";

/// Properties declared in the PDF/A extension schema for the `fx` namespace.
const FX_PROPERTIES: [(&str, &str); 4] = [
    ("DocumentFileName", "name of the embedded XML invoice file"),
    ("DocumentType", "INVOICE"),
    ("Version", "The actual version of the Factur-X XML schema"),
    ("ConformanceLevel", "The conformance level of the embedded Factur-X data"),
];

/// Build the XMP packet of a Factur-X PDF/A-3 document.
///
/// Carries the PDF/A identification (part 3, conformance B), the title,
/// the extension schema describing the `fx` properties, and the `fx`
/// values themselves.
pub fn build_xmp(profile: FacturxProfile, title: &str) -> Result<String, EInvoiceError> {
    let mut w = XmlWriter::fragment();
    w.processing_instruction("xpacket begin=\"\u{FEFF}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"")?;
    w.start_element_with_attrs("x:xmpmeta", &[("xmlns:x", "adobe:ns:meta/")])?;
    w.start_element_with_attrs("rdf:RDF", &[("xmlns:rdf", RDF_NS)])?;

    description(&mut w, &[("xmlns:pdfaid", "http://www.aiim.org/pdfa/ns/id/")])?;
    w.text_element("pdfaid:part", "3")?;
    w.text_element("pdfaid:conformance", "B")?;
    w.end_element("rdf:Description")?;

    description(&mut w, &[("xmlns:dc", "http://purl.org/dc/elements/1.1/")])?;
    w.start_element("dc:title")?;
    w.start_element("rdf:Alt")?;
    w.text_element_with_attrs("rdf:li", title, &[("xml:lang", "x-default")])?;
    w.end_element("rdf:Alt")?;
    w.end_element("dc:title")?;
    w.end_element("rdf:Description")?;

    description(&mut w, &[("xmlns:pdf", "http://ns.adobe.com/pdf/1.3/")])?;
    w.text_element("pdf:Producer", env!("CARGO_PKG_NAME"))?;
    w.end_element("rdf:Description")?;

    description(
        &mut w,
        &[
            ("xmlns:pdfaExtension", "http://www.aiim.org/pdfa/ns/extension/"),
            ("xmlns:pdfaSchema", "http://www.aiim.org/pdfa/ns/schema#"),
            ("xmlns:pdfaProperty", "http://www.aiim.org/pdfa/ns/property#"),
        ],
    )?;
    w.start_element("pdfaExtension:schemas")?;
    w.start_element("rdf:Bag")?;
    w.start_element_with_attrs("rdf:li", &[("rdf:parseType", "Resource")])?;
    w.text_element("pdfaSchema:schema", "Factur-X PDFA Extension Schema")?;
    w.text_element("pdfaSchema:namespaceURI", FX_NS)?;
    w.text_element("pdfaSchema:prefix", "fx")?;
    w.start_element("pdfaSchema:property")?;
    w.start_element("rdf:Seq")?;
    for (name, what) in FX_PROPERTIES {
        w.start_element_with_attrs("rdf:li", &[("rdf:parseType", "Resource")])?;
        w.text_element("pdfaProperty:name", name)?;
        w.text_element("pdfaProperty:valueType", "Text")?;
        w.text_element("pdfaProperty:category", "external")?;
        w.text_element("pdfaProperty:description", what)?;
        w.end_element("rdf:li")?;
    }
    w.end_element("rdf:Seq")?;
    w.end_element("pdfaSchema:property")?;
    w.end_element("rdf:li")?;
    w.end_element("rdf:Bag")?;
    w.end_element("pdfaExtension:schemas")?;
    w.end_element("rdf:Description")?;

    description(&mut w, &[("xmlns:fx", FX_NS)])?;
    w.text_element("fx:DocumentType", "INVOICE")?;
    w.text_element("fx:DocumentFileName", FACTURX_FILENAME)?;
    w.text_element("fx:Version", "1.0")?;
    w.text_element("fx:ConformanceLevel", profile.conformance_level())?;
    w.end_element("rdf:Description")?;

    w.end_element("rdf:RDF")?;
    w.end_element("x:xmpmeta")?;
    w.processing_instruction("xpacket end=\"w\"")?;
    w.into_string()
}

fn description(w: &mut XmlWriter, namespaces: &[(&str, &str)]) -> Result<(), EInvoiceError> {
    let mut attrs = vec![("rdf:about", "")];
    attrs.extend_from_slice(namespaces);
    w.start_element_with_attrs("rdf:Description", &attrs)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::Reader;
    use quick_xml::events::Event;

    #[test]
    fn conformance_level_per_profile() {
        assert!(build_xmp(FacturxProfile::En16931, "t")
            .unwrap()
            .contains("<fx:ConformanceLevel>EN 16931</fx:ConformanceLevel>"));
        assert!(build_xmp(FacturxProfile::Basic, "t")
            .unwrap()
            .contains("<fx:ConformanceLevel>BASIC</fx:ConformanceLevel>"));
    }

    #[test]
    fn packet_wrapper_and_escaping() {
        let xmp = build_xmp(FacturxProfile::Basic, "Invoice A&B <1>").unwrap();
        assert!(xmp.starts_with("<?xpacket begin=\"\u{FEFF}\""));
        assert!(xmp.trim_end().ends_with("<?xpacket end=\"w\"?>"));
        assert!(xmp.contains("Invoice A&amp;B &lt;1&gt;"));
        assert!(!xmp.contains("<?xml"));
    }

    #[test]
    fn declares_every_fx_property() {
        let xmp = build_xmp(FacturxProfile::En16931, "t").unwrap();
        let mut reader = Reader::from_str(&xmp);
        let mut declared = Vec::new();
        let mut in_name = false;
        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => in_name = e.name().as_ref() == b"pdfaProperty:name",
                Ok(Event::Text(t)) if in_name => {
                    declared.push(t.unescape().unwrap().into_owned());
                    in_name = false;
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => panic!("malformed XMP: {e}"),
            }
        }
        let expected: Vec<&str> = FX_PROPERTIES.iter().map(|(name, _)| *name).collect();
        assert_eq!(declared, expected);
        assert!(xmp.contains("<pdfaid:part>3</pdfaid:part>"));
        assert!(xmp.contains("<fx:DocumentFileName>factur-x.xml</fx:DocumentFileName>"));
    }
}
