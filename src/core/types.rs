use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::formats::FormatId;

/// The single internal invoice representation every generator and
/// validator consumes.
///
/// Built fresh by the mapper (or [`InvoiceBuilder`](super::InvoiceBuilder))
/// for each call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalInvoice {
    /// Target format the invoice was mapped for.
    pub output_format: FormatId,
    /// BT-3: UNTDID 1001 document type.
    pub document_type_code: DocumentType,
    /// BT-1: Invoice number.
    pub invoice_number: String,
    /// BT-2: Issue date.
    pub invoice_date: Option<NaiveDate>,
    /// BT-5: ISO 4217 currency code.
    pub currency: String,
    /// BT-10: Buyer reference (Leitweg-ID for German public buyers).
    pub buyer_reference: Option<String>,
    /// BT-13: Purchase order reference.
    pub purchase_order_reference: Option<String>,
    /// BT-25: Preceding invoice reference, mandatory for credit notes.
    pub preceding_invoice_reference: Option<String>,
    /// BT-22: Free-text notes.
    pub notes: Vec<String>,
    /// BG-4: Seller.
    pub seller: Party,
    /// BG-7: Buyer.
    pub buyer: Party,
    /// BG-16: Payment instructions.
    pub payment: PaymentInfo,
    /// BG-25: Invoice lines, in document order.
    pub line_items: Vec<LineItem>,
    /// BG-20 / BG-21: Document-level allowances and charges.
    pub allowance_charges: Vec<AllowanceCharge>,
    /// BG-22: Document totals.
    pub totals: Totals,
}

impl CanonicalInvoice {
    pub fn is_credit_note(&self) -> bool {
        self.document_type_code == DocumentType::CreditNote
    }

    /// BT-109: Sum of line net amounts minus allowances plus charges.
    pub fn net_total(&self) -> Decimal {
        self.totals.subtotal - self.totals.allowance_total + self.totals.charge_total
    }

    pub fn allowances(&self) -> impl Iterator<Item = &AllowanceCharge> {
        self.allowance_charges.iter().filter(|ac| !ac.charge_indicator)
    }

    pub fn charges(&self) -> impl Iterator<Item = &AllowanceCharge> {
        self.allowance_charges.iter().filter(|ac| ac.charge_indicator)
    }
}

/// BG-4 / BG-7: Seller or buyer.
///
/// `vat_id`, `tax_id` and `tax_number` are alternative identifiers; most
/// profiles require at least one of them for the seller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    /// BT-27 / BT-44
    pub name: String,
    pub email: Option<String>,
    /// BT-35 / BT-50: Street line.
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    /// ISO 3166-1 alpha-2.
    pub country_code: Option<String>,
    /// BT-31 / BT-48: VAT identifier with country prefix.
    pub vat_id: Option<String>,
    /// BT-30 / BT-47: Legal registration id (KvK, codice fiscale, CUI, ...).
    pub tax_id: Option<String>,
    /// BT-32: National tax number.
    pub tax_number: Option<String>,
    /// BT-34 / BT-49: Routing endpoint.
    pub electronic_address: Option<String>,
    /// EAS scheme of the electronic address.
    pub electronic_address_scheme: Option<String>,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
}

impl Party {
    /// True when any tax identifier is present.
    pub fn has_tax_identifier(&self) -> bool {
        [&self.vat_id, &self.tax_id, &self.tax_number]
            .iter()
            .any(|id| id.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }

    /// Upper-cased country code, if present.
    pub fn country(&self) -> Option<String> {
        self.country_code
            .as_deref()
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
    }
}

/// BG-16: Payment instructions. The required subset depends on the profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    /// BT-84
    pub iban: Option<String>,
    /// BT-86
    pub bic: Option<String>,
    /// BT-20
    pub payment_terms: Option<String>,
    /// BT-9
    pub due_date: Option<NaiveDate>,
}

/// BG-25: Invoice line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// BT-153
    pub description: String,
    /// BT-129
    pub quantity: Decimal,
    /// BT-146: Net price per unit.
    pub unit_price: Decimal,
    /// BT-131: Net line amount.
    pub total_price: Decimal,
    /// BT-152: Percent.
    pub tax_rate: Decimal,
    /// BT-151: UNTDID 5305 code as extracted. May hold an unknown code,
    /// which the code-list rules report.
    pub tax_category_code: Option<String>,
    /// BT-130: UN/ECE Rec 20 unit of measure.
    pub unit_code: String,
}

impl LineItem {
    /// The category code to serialize: the explicit one, or `S`/`Z`
    /// derived from the rate.
    pub fn category_code(&self) -> String {
        effective_category(self.tax_category_code.as_deref(), self.tax_rate)
    }
}

/// BG-20 / BG-21: Document-level allowance (discount) or charge (surcharge).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowanceCharge {
    /// True = charge, false = allowance.
    pub charge_indicator: bool,
    pub amount: Decimal,
    pub reason: Option<String>,
    pub tax_rate: Option<Decimal>,
    pub tax_category_code: Option<String>,
}

impl AllowanceCharge {
    /// VAT rate, 0 when none is set.
    pub fn rate(&self) -> Decimal {
        self.tax_rate.unwrap_or(Decimal::ZERO)
    }

    /// The category code to serialize: the explicit one, or `S`/`Z`
    /// derived from the rate.
    pub fn category_code(&self) -> String {
        effective_category(self.tax_category_code.as_deref(), self.rate())
    }

    /// Amount with the sign it contributes to the taxable base.
    pub fn signed_amount(&self) -> Decimal {
        if self.charge_indicator { self.amount } else { -self.amount }
    }
}

/// BG-22: Document totals, rounded to two fraction digits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    /// BT-106: Sum of line net amounts.
    pub subtotal: Decimal,
    /// BT-107
    pub allowance_total: Decimal,
    /// BT-108
    pub charge_total: Decimal,
    /// BT-110
    pub tax_amount: Decimal,
    /// BT-112: subtotal - allowances + charges + tax.
    pub total_amount: Decimal,
}

/// BG-23: VAT breakdown for one (category, rate) group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxSubtotal {
    pub category_code: String,
    pub rate: Decimal,
    /// BT-116
    pub taxable_amount: Decimal,
    /// BT-117
    pub tax_amount: Decimal,
}

/// UNTDID 1001 document type (subset used across the supported formats).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u16", into = "u16")]
pub enum DocumentType {
    /// 380 — Commercial invoice.
    Invoice,
    /// 381 — Credit note.
    CreditNote,
    /// 384 — Corrected invoice.
    Corrected,
    /// 386 — Prepayment invoice.
    Prepayment,
    /// 326 — Partial invoice.
    Partial,
    /// Any other code value.
    Other(u16),
}

impl DocumentType {
    /// UNTDID 1001 numeric code.
    pub fn code(&self) -> u16 {
        match self {
            Self::Invoice => 380,
            Self::CreditNote => 381,
            Self::Corrected => 384,
            Self::Prepayment => 386,
            Self::Partial => 326,
            Self::Other(c) => *c,
        }
    }

    pub fn from_code(code: u16) -> Self {
        match code {
            380 => Self::Invoice,
            381 => Self::CreditNote,
            384 => Self::Corrected,
            386 => Self::Prepayment,
            326 => Self::Partial,
            c => Self::Other(c),
        }
    }
}

impl From<u16> for DocumentType {
    fn from(code: u16) -> Self {
        Self::from_code(code)
    }
}

impl From<DocumentType> for u16 {
    fn from(dt: DocumentType) -> Self {
        dt.code()
    }
}

/// Resolve the category code for a line or allowance/charge.
pub(crate) fn effective_category(code: Option<&str>, rate: Decimal) -> String {
    match code.map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) => c.to_ascii_uppercase(),
        None if rate.is_zero() => "Z".to_string(),
        None => "S".to_string(),
    }
}
