//! Raw extraction records and field-name alias resolution.
//!
//! Extraction sources disagree on field names (`sellerAddress` vs
//! `sellerStreet`, `lineItems` vs `line_items`). Every canonical field has
//! a fixed, ordered alias list; lookup tries the canonical name first,
//! then each alias in order, and the first non-empty value wins. An alias
//! containing `.` addresses a nested object (`seller.name`).

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Map, Value};

use crate::core::EInvoiceError;

/// Ordered alias candidates per canonical field name.
pub static FIELD_ALIASES: &[(&str, &[&str])] = &[
    // document header
    ("invoiceNumber", &["invoice_number", "invoiceNo", "invoice_no", "number", "documentNumber"]),
    ("invoiceDate", &["invoice_date", "issueDate", "issue_date", "date"]),
    ("documentTypeCode", &["document_type_code", "typeCode", "type_code", "invoiceTypeCode"]),
    ("currency", &["currencyCode", "currency_code"]),
    ("buyerReference", &["buyer_reference", "leitwegId", "leitweg_id"]),
    ("purchaseOrderReference", &["purchase_order_reference", "orderReference", "order_reference", "poNumber"]),
    ("precedingInvoiceReference", &["preceding_invoice_reference", "originalInvoiceNumber", "original_invoice_number", "invoiceReference"]),
    ("notes", &["note", "remarks"]),
    ("format", &["outputFormat", "output_format"]),
    // seller
    ("sellerName", &["seller_name", "supplierName", "supplier_name", "vendorName", "seller.name"]),
    ("sellerEmail", &["seller_email", "supplierEmail", "seller.email"]),
    ("sellerAddress", &["sellerStreet", "seller_address", "seller_street", "supplierAddress", "seller.address", "seller.street"]),
    ("sellerCity", &["seller_city", "supplierCity", "seller.city"]),
    ("sellerPostalCode", &["seller_postal_code", "sellerZip", "sellerPostcode", "seller.postalCode"]),
    ("sellerCountryCode", &["seller_country_code", "sellerCountry", "seller_country", "seller.countryCode", "seller.country"]),
    ("sellerVatId", &["seller_vat_id", "sellerVatNumber", "supplierVatId", "seller.vatId"]),
    ("sellerTaxId", &["seller_tax_id", "sellerRegistrationId", "seller.taxId"]),
    ("sellerTaxNumber", &["seller_tax_number", "sellerSteuernummer", "seller.taxNumber"]),
    ("sellerElectronicAddress", &["seller_electronic_address", "sellerEndpointId", "seller.electronicAddress"]),
    ("sellerElectronicAddressScheme", &["seller_electronic_address_scheme", "sellerEndpointScheme", "seller.electronicAddressScheme"]),
    ("sellerContactName", &["seller_contact_name", "sellerContact", "seller.contactName"]),
    ("sellerPhone", &["seller_phone", "sellerTelephone", "seller.phone"]),
    // buyer
    ("buyerName", &["buyer_name", "customerName", "customer_name", "buyer.name"]),
    ("buyerEmail", &["buyer_email", "customerEmail", "buyer.email"]),
    ("buyerAddress", &["buyerStreet", "buyer_address", "buyer_street", "customerAddress", "buyer.address", "buyer.street"]),
    ("buyerCity", &["buyer_city", "customerCity", "buyer.city"]),
    ("buyerPostalCode", &["buyer_postal_code", "buyerZip", "buyerPostcode", "buyer.postalCode"]),
    ("buyerCountryCode", &["buyer_country_code", "buyerCountry", "buyer_country", "buyer.countryCode", "buyer.country"]),
    ("buyerVatId", &["buyer_vat_id", "buyerVatNumber", "customerVatId", "buyer.vatId"]),
    ("buyerTaxId", &["buyer_tax_id", "buyerRegistrationId", "buyer.taxId"]),
    ("buyerTaxNumber", &["buyer_tax_number", "buyer.taxNumber"]),
    ("buyerElectronicAddress", &["buyer_electronic_address", "buyerEndpointId", "buyer.electronicAddress"]),
    ("buyerElectronicAddressScheme", &["buyer_electronic_address_scheme", "buyerEndpointScheme", "buyer.electronicAddressScheme"]),
    ("buyerContactName", &["buyer_contact_name", "buyerContact", "buyer.contactName"]),
    ("buyerPhone", &["buyer_phone", "buyerTelephone", "buyer.phone"]),
    // payment
    ("iban", &["IBAN", "sellerIban", "seller_iban", "bankAccount", "payment.iban"]),
    ("bic", &["BIC", "swift", "sellerBic", "payment.bic"]),
    ("paymentTerms", &["payment_terms", "terms", "payment.paymentTerms"]),
    ("dueDate", &["due_date", "paymentDueDate", "payment.dueDate"]),
    // collections and totals
    ("lineItems", &["line_items", "items", "lines"]),
    ("allowanceCharges", &["allowance_charges", "allowances", "discounts"]),
    ("subtotal", &["subTotal", "sub_total", "netAmount", "net_amount", "totalNet", "totals.subtotal"]),
    ("taxAmount", &["tax_amount", "vatAmount", "vat_amount", "totalTax", "totals.taxAmount"]),
    ("totalAmount", &["total_amount", "grossAmount", "gross_amount", "total", "totals.totalAmount"]),
    // line item fields
    ("description", &["name", "itemName", "item_name", "item"]),
    ("quantity", &["qty"]),
    ("unitPrice", &["unit_price", "price", "netPrice"]),
    ("totalPrice", &["total_price", "lineTotal", "line_total", "netAmount", "amount"]),
    ("taxRate", &["tax_rate", "vatRate", "vat_rate", "vat"]),
    ("taxCategoryCode", &["tax_category_code", "taxCategory", "vatCategory"]),
    ("unitCode", &["unit_code", "unit", "uom"]),
    // allowance/charge fields
    ("chargeIndicator", &["charge_indicator", "isCharge", "is_charge"]),
    ("amount", &["value"]),
    ("reason", &["description"]),
];

/// Alias list for a canonical field name (empty when the name has none).
pub fn aliases_for(field: &str) -> &'static [&'static str] {
    FIELD_ALIASES
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, aliases)| *aliases)
        .unwrap_or(&[])
}

/// Largest amount magnitude the mapper accepts (10^11).
pub const MAX_AMOUNT: Decimal = dec!(100_000_000_000);

/// A raw extraction record: an open key/value object. Unknown keys are
/// ignored; values are read through typed accessors that treat
/// unparseable input as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawExtraction {
    fields: Map<String, Value>,
}

impl RawExtraction {
    /// Accept a JSON object. Anything else (array, string, number, null)
    /// is rejected.
    pub fn from_value(value: Value) -> Result<Self, EInvoiceError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(EInvoiceError::Mapping(format!(
                "extraction record must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, EInvoiceError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| EInvoiceError::Mapping(format!("invalid JSON: {e}")))?;
        Self::from_value(value)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Resolve a canonical field through its alias list. Returns the first
    /// non-empty value.
    pub fn resolve(&self, field: &str) -> Option<&Value> {
        std::iter::once(field)
            .chain(aliases_for(field).iter().copied())
            .filter_map(|key| self.lookup(key))
            .find(|v| !is_empty_value(v))
    }

    /// True when the field (or one of its aliases) carries a non-empty value.
    pub fn has(&self, field: &str) -> bool {
        self.resolve(field).is_some()
    }

    /// Trimmed text. Numbers and booleans are rendered as text.
    pub fn text(&self, field: &str) -> Option<String> {
        self.resolve(field).and_then(value_to_text)
    }

    /// Amounts beyond [`MAX_AMOUNT`] in magnitude count as unparseable.
    pub fn amount(&self, field: &str) -> Option<Decimal> {
        let value = self.resolve(field)?;
        let parsed = value_to_decimal(value).filter(|d| d.abs() <= MAX_AMOUNT);
        if parsed.is_none() {
            tracing::debug!(field, ?value, "unparseable amount treated as absent");
        }
        parsed
    }

    /// A percentage in `0..=100`. The sign is dropped; anything larger is absent.
    pub fn rate(&self, field: &str) -> Option<Decimal> {
        let rate = self.amount(field)?.abs();
        if rate > Decimal::ONE_HUNDRED {
            tracing::debug!(field, %rate, "tax rate above 100% treated as absent");
            return None;
        }
        Some(rate)
    }

    pub fn date(&self, field: &str) -> Option<NaiveDate> {
        let value = self.resolve(field)?;
        let parsed = value.as_str().and_then(parse_date);
        if parsed.is_none() {
            tracing::debug!(field, ?value, "unparseable date treated as absent");
        }
        parsed
    }

    pub fn flag(&self, field: &str) -> Option<bool> {
        match self.resolve(field)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|i| i != 0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" | "charge" => Some(true),
                "false" | "no" | "0" | "allowance" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// A list of text values; a single string counts as a one-element list.
    pub fn text_list(&self, field: &str) -> Vec<String> {
        match self.resolve(field) {
            Some(Value::Array(items)) => items.iter().filter_map(value_to_text).collect(),
            Some(other) => value_to_text(other).into_iter().collect(),
            None => Vec::new(),
        }
    }

    /// Nested records of an array field. Non-object entries are skipped.
    pub fn records(&self, field: &str) -> Vec<RawExtraction> {
        let Some(Value::Array(items)) = self.resolve(field) else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| match item {
                Value::Object(fields) => Some(RawExtraction {
                    fields: fields.clone(),
                }),
                other => {
                    tracing::debug!(field, kind = json_kind(other), "skipping non-object entry");
                    None
                }
            })
            .collect()
    }

    fn lookup(&self, key: &str) -> Option<&Value> {
        let mut parts = key.split('.');
        let first = parts.next()?;
        let mut current = self.fields.get(first)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }
}

impl From<Map<String, Value>> for RawExtraction {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let s = n.to_string();
            Decimal::from_str(&s)
                .or_else(|_| Decimal::from_scientific(&s))
                .ok()
        }
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

/// Parse a human-formatted amount: currency symbols and codes, spaces,
/// `1.234,56`, `1,234.56`, `1 234,56` and `-12,5`.
pub fn parse_amount(input: &str) -> Option<Decimal> {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '+'))
        .collect();
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');
    let normalized = match (last_dot, last_comma) {
        (Some(d), Some(c)) if c > d => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (None, Some(_)) if cleaned.matches(',').count() > 1 => cleaned.replace(',', ""),
        (None, Some(_)) => cleaned.replace(',', "."),
        (Some(_), None) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
        _ => cleaned,
    };

    Decimal::from_str(&normalized).ok()
}

/// Parse the date layouts extraction sources produce.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    // ISO datetime: keep the date part
    let date_part = input.split(['T', ' ']).next().unwrap_or(input);
    ["%Y-%m-%d", "%Y%m%d", "%d.%m.%Y", "%d/%m/%Y", "%Y/%m/%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn raw(value: Value) -> RawExtraction {
        RawExtraction::from_value(value).unwrap()
    }

    #[test]
    fn canonical_name_wins_over_alias() {
        let r = raw(json!({"sellerStreet": "Alias 1", "sellerAddress": "Canonical 2"}));
        assert_eq!(r.text("sellerAddress").as_deref(), Some("Canonical 2"));
    }

    #[test]
    fn first_non_empty_alias_wins() {
        let r = raw(json!({"sellerAddress": "  ", "sellerStreet": "", "seller_address": "Third 3"}));
        assert_eq!(r.text("sellerAddress").as_deref(), Some("Third 3"));
    }

    #[test]
    fn nested_alias() {
        let r = raw(json!({"seller": {"name": "Nested GmbH"}}));
        assert_eq!(r.text("sellerName").as_deref(), Some("Nested GmbH"));
    }

    #[test]
    fn keys_match_exactly() {
        let r = raw(json!({"SellerName": "Upper", "seller-name": "Dashed", "SUPPLIER_NAME": "Shout"}));
        assert_eq!(r.text("sellerName"), None);

        let r = raw(json!({"supplier_name": "Listed alias"}));
        assert_eq!(r.text("sellerName").as_deref(), Some("Listed alias"));
    }

    #[test]
    fn rejects_non_objects() {
        assert!(matches!(
            RawExtraction::from_value(json!([1, 2])),
            Err(EInvoiceError::Mapping(_))
        ));
        assert!(RawExtraction::from_json_str("{not json").is_err());
    }

    #[test]
    fn amounts() {
        assert_eq!(parse_amount("1.234,56 €"), Some(dec!(1234.56)));
        assert_eq!(parse_amount("1,234.56"), Some(dec!(1234.56)));
        assert_eq!(parse_amount("1 234,56 PLN"), Some(dec!(1234.56)));
        assert_eq!(parse_amount("-12,5"), Some(dec!(-12.5)));
        assert_eq!(parse_amount("1.000.000"), Some(dec!(1000000)));
        assert_eq!(parse_amount("n/a"), None);

        let r = raw(json!({"subtotal": 100.019, "taxAmount": "abc", "totalAmount": "238"}));
        assert_eq!(r.amount("subtotal"), Some(dec!(100.019)));
        assert_eq!(r.amount("taxAmount"), None);
        assert_eq!(r.amount("totalAmount"), Some(dec!(238)));
    }

    #[test]
    fn out_of_range_numbers_are_absent() {
        let r = raw(json!({"subtotal": 1e30, "totalAmount": "99999999999", "taxRate": 250}));
        assert_eq!(r.amount("subtotal"), None);
        assert_eq!(r.amount("totalAmount"), Some(dec!(99999999999)));
        assert_eq!(r.rate("taxRate"), None);

        let r = raw(json!({"taxRate": "-19"}));
        assert_eq!(r.rate("taxRate"), Some(dec!(19)));
    }

    #[test]
    fn dates() {
        let expected = NaiveDate::from_ymd_opt(2024, 6, 15);
        assert_eq!(parse_date("2024-06-15"), expected);
        assert_eq!(parse_date("20240615"), expected);
        assert_eq!(parse_date("15.06.2024"), expected);
        assert_eq!(parse_date("15/06/2024"), expected);
        assert_eq!(parse_date("2024-06-15T10:00:00Z"), expected);
        assert_eq!(parse_date("June 15th"), None);
    }

    #[test]
    fn records_skip_non_objects() {
        let r = raw(json!({"line_items": [{"description": "a"}, 42, {"description": "b"}]}));
        let items = r.records("lineItems");
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].text("description").as_deref(), Some("b"));
    }

    #[test]
    fn flags_and_lists() {
        let r = raw(json!({"isCharge": "charge", "notes": ["a", " ", "b"], "note": "x"}));
        assert_eq!(r.flag("chargeIndicator"), Some(true));
        assert_eq!(r.text_list("notes"), vec!["a".to_string(), "b".to_string()]);
    }
}
