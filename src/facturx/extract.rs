use lopdf::{Dictionary, Document, Object};

use crate::core::EInvoiceError;

/// Read the embedded Factur-X XML back out of a PDF.
///
/// Candidates come from the `EmbeddedFiles` name tree first and the
/// catalog `AF` array second; the first one named `factur-x.xml` (or a
/// legacy ZUGFeRD name) is decoded.
pub fn extract_from_pdf(pdf_bytes: &[u8]) -> Result<String, EInvoiceError> {
    let doc = Document::load_mem(pdf_bytes).map_err(|e| pdf_error("failed to load PDF", e))?;
    let catalog = doc
        .catalog()
        .map_err(|e| pdf_error("failed to read catalog", e))?;

    let (name, filespec) = name_tree_entries(&doc, catalog)
        .into_iter()
        .chain(af_entries(&doc, catalog))
        .find(|(name, _)| is_facturx_filename(name))
        .ok_or_else(|| EInvoiceError::Pdf("no Factur-X XML found in PDF".to_string()))?;

    tracing::debug!(attachment = %name, "found embedded invoice");
    read_filespec(&doc, filespec)
}

/// `[name1, ref1, name2, ref2, ...]` of the `EmbeddedFiles` name tree.
fn name_tree_entries<'a>(doc: &'a Document, catalog: &'a Dictionary) -> Vec<(String, &'a Dictionary)> {
    let entries = catalog
        .get(b"Names")
        .ok()
        .and_then(|names| resolve_dict(doc, names))
        .and_then(|names| names.get(b"EmbeddedFiles").ok())
        .and_then(|tree| resolve_dict(doc, tree))
        .and_then(|tree| tree.get(b"Names").and_then(Object::as_array).ok());

    entries
        .map(|entries| {
            entries
                .chunks_exact(2)
                .filter_map(|pair| Some((obj_to_string(&pair[0])?, resolve_dict(doc, &pair[1])?)))
                .collect()
        })
        .unwrap_or_default()
}

fn af_entries<'a>(doc: &'a Document, catalog: &'a Dictionary) -> Vec<(String, &'a Dictionary)> {
    let Ok(af) = catalog.get(b"AF").and_then(Object::as_array) else {
        return Vec::new();
    };
    af.iter()
        .filter_map(|obj| resolve_dict(doc, obj))
        .filter_map(|filespec| {
            let name = filespec
                .get(b"UF")
                .or_else(|_| filespec.get(b"F"))
                .ok()
                .and_then(obj_to_string)?;
            Some((name, filespec))
        })
        .collect()
}

fn read_filespec(doc: &Document, filespec: &Dictionary) -> Result<String, EInvoiceError> {
    let stream = filespec
        .get(b"EF")
        .ok()
        .and_then(|ef| resolve_dict(doc, ef))
        .and_then(|ef| ef.get(b"F").ok())
        .and_then(|f| match f {
            Object::Reference(id) => doc.get_object(*id).ok(),
            other => Some(other),
        })
        .and_then(|obj| obj.as_stream().ok())
        .ok_or_else(|| EInvoiceError::Pdf("file specification has no embedded stream".to_string()))?;

    // decompressed_content() fails on streams without a Filter
    let content = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());
    String::from_utf8(content).map_err(|e| pdf_error("embedded XML is not UTF-8", e))
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(d) => Some(d),
        _ => None,
    }
}

fn obj_to_string(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => String::from_utf8(bytes.clone()).ok(),
        _ => None,
    }
}

fn is_facturx_filename(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("factur-x") || lower.contains("zugferd")
}

fn pdf_error(context: &str, err: impl std::fmt::Display) -> EInvoiceError {
    EInvoiceError::Pdf(format!("{context}: {err}"))
}
