use super::FormatId;
use crate::mapping::RawExtraction;

/// Guess the intended format of a raw record.
///
/// Advisory only; an explicit format passed by the caller always wins.
/// Checked in priority order:
///
/// 1. an explicit `format` field in the record naming a known id;
/// 2. a Polish NIP-shaped seller VAT id, or a Polish seller ⇒ `ksef`;
/// 3. an Italian seller ⇒ `fatturapa`;
/// 4. a Romanian seller ⇒ `cius-ro`;
/// 5. an electronic address on either party, with no German party ⇒ `peppol-bis`;
/// 6. a Dutch seller ⇒ `nlcius`;
/// 7. a French seller ⇒ `facturx-en16931`;
/// 8. anything else ⇒ `xrechnung-cii`.
///
/// Returns `None` only for an empty record.
pub fn detect_format_from_data(raw: &RawExtraction) -> Option<FormatId> {
    if raw.is_empty() {
        return None;
    }

    if let Some(id) = raw.text("format").and_then(|f| f.parse::<FormatId>().ok()) {
        tracing::debug!(format = %id, "format named in record");
        return Some(id);
    }

    let seller_country = country(raw, "sellerCountryCode");
    let buyer_country = country(raw, "buyerCountryCode");
    let seller_vat = raw.text("sellerVatId").unwrap_or_default();
    let vat_prefix = seller_vat
        .get(..2)
        .map(|p| p.to_ascii_uppercase())
        .filter(|p| p.chars().all(|c| c.is_ascii_alphabetic()));
    let seller_is = |code: &str| {
        seller_country.as_deref() == Some(code) || vat_prefix.as_deref() == Some(code)
    };

    let detected = if is_nip_shaped(&seller_vat) || seller_is("PL") {
        FormatId::Ksef
    } else if seller_is("IT") {
        FormatId::FatturaPa
    } else if seller_is("RO") {
        FormatId::CiusRo
    } else if has_endpoint(raw)
        && seller_country.as_deref() != Some("DE")
        && buyer_country.as_deref() != Some("DE")
    {
        FormatId::PeppolBis
    } else if seller_is("NL") {
        FormatId::Nlcius
    } else if seller_is("FR") {
        FormatId::FacturxEn16931
    } else {
        FormatId::XRechnungCii
    };

    tracing::debug!(format = %detected, "format detected from record contents");
    Some(detected)
}

/// Ten digits, optionally prefixed with `PL` and separated by `-` or spaces.
pub(crate) fn is_nip_shaped(vat_id: &str) -> bool {
    let compact: String = vat_id
        .chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .collect();
    let digits = compact
        .strip_prefix("PL")
        .or_else(|| compact.strip_prefix("pl"))
        .unwrap_or(&compact);
    digits.len() == 10 && digits.chars().all(|c| c.is_ascii_digit())
}

fn country(raw: &RawExtraction, field: &str) -> Option<String> {
    raw.text(field).map(|c| c.to_ascii_uppercase())
}

fn has_endpoint(raw: &RawExtraction) -> bool {
    [
        "sellerElectronicAddress",
        "sellerElectronicAddressScheme",
        "buyerElectronicAddress",
        "buyerElectronicAddressScheme",
    ]
    .iter()
    .any(|field| raw.has(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn detect(value: Value) -> Option<FormatId> {
        detect_format_from_data(&RawExtraction::from_value(value).unwrap())
    }

    #[test]
    fn empty_record_is_undetected() {
        assert_eq!(detect(json!({})), None);
    }

    #[test]
    fn explicit_format_in_record() {
        assert_eq!(detect(json!({"format": "nlcius", "sellerVatId": "PL5260250274"})), Some(FormatId::Nlcius));
        // unknown names fall through to the heuristics
        assert_eq!(detect(json!({"format": "edi", "sellerCountryCode": "IT"})), Some(FormatId::FatturaPa));
    }

    #[test]
    fn nip_shaped_vat_means_ksef() {
        assert_eq!(detect(json!({"sellerVatId": "526-025-02-74"})), Some(FormatId::Ksef));
        assert_eq!(detect(json!({"sellerVatId": "PL5260250274"})), Some(FormatId::Ksef));
        assert!(!is_nip_shaped("DE123456789"));
    }

    #[test]
    fn endpoint_outside_germany_means_peppol() {
        assert_eq!(
            detect(json!({"sellerCountryCode": "BE", "buyerElectronicAddress": "0208:0123456789"})),
            Some(FormatId::PeppolBis)
        );
        assert_eq!(
            detect(json!({"sellerCountryCode": "DE", "buyerElectronicAddress": "x@y.de"})),
            Some(FormatId::XRechnungCii)
        );
    }

    #[test]
    fn country_heuristics() {
        assert_eq!(detect(json!({"sellerCountryCode": "ro"})), Some(FormatId::CiusRo));
        assert_eq!(detect(json!({"sellerCountryCode": "NL"})), Some(FormatId::Nlcius));
        assert_eq!(detect(json!({"sellerVatId": "FR12345678901"})), Some(FormatId::FacturxEn16931));
        assert_eq!(detect(json!({"invoiceNumber": "1"})), Some(FormatId::XRechnungCii));
    }
}
