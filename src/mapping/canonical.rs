use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::raw::RawExtraction;
use crate::core::money::{
    DEFAULT_TOLERANCE, line_net, money_equal, recompute_totals, round_money, totals_consistent,
};
use crate::core::*;
use crate::formats::FormatId;

/// Options for [`to_canonical_invoice_with`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    /// Tolerance for accepting extracted amounts against recomputed ones.
    pub tolerance: Decimal,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Map a raw extraction record to a [`CanonicalInvoice`] with the default
/// 2-cent tolerance.
pub fn to_canonical_invoice(raw: &RawExtraction, format: FormatId) -> CanonicalInvoice {
    to_canonical_invoice_with(raw, format, &MapOptions::default())
}

/// Map a raw extraction record to a [`CanonicalInvoice`].
///
/// Unparseable values are treated as absent. Line items are reconciled
/// (`totalPrice` is authoritative when it disagrees with
/// `unitPrice × quantity`) and document totals are checked against a
/// recomputation; see [`reconcile_totals`] for the override policy.
pub fn to_canonical_invoice_with(
    raw: &RawExtraction,
    format: FormatId,
    options: &MapOptions,
) -> CanonicalInvoice {
    let document_type_code = map_document_type(raw);
    let credit_note = document_type_code == DocumentType::CreditNote;

    let line_items: Vec<LineItem> = raw
        .records("lineItems")
        .iter()
        .enumerate()
        .map(|(i, item)| map_line(item, i, credit_note, options.tolerance))
        .collect();

    let allowance_charges: Vec<AllowanceCharge> = raw
        .records("allowanceCharges")
        .iter()
        .filter_map(map_allowance_charge)
        .collect();

    let magnitude = |d: Decimal| if credit_note { d.abs() } else { d };
    let extracted = ExtractedTotals {
        subtotal: raw.amount("subtotal").map(magnitude),
        tax_amount: raw.amount("taxAmount").map(magnitude),
        total_amount: raw.amount("totalAmount").map(magnitude),
    };
    let totals = reconcile_totals(&extracted, &line_items, &allowance_charges, options.tolerance);

    CanonicalInvoice {
        output_format: format,
        document_type_code,
        invoice_number: raw.text("invoiceNumber").unwrap_or_default(),
        invoice_date: raw.date("invoiceDate"),
        currency: raw
            .text("currency")
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or_else(|| default_currency(format).to_string()),
        buyer_reference: raw.text("buyerReference"),
        purchase_order_reference: raw.text("purchaseOrderReference"),
        preceding_invoice_reference: raw.text("precedingInvoiceReference"),
        notes: raw.text_list("notes"),
        seller: map_party(raw, "seller"),
        buyer: map_party(raw, "buyer"),
        payment: PaymentInfo {
            iban: raw.text("iban").map(|s| s.replace(' ', "")),
            bic: raw.text("bic"),
            payment_terms: raw.text("paymentTerms"),
            due_date: raw.date("dueDate"),
        },
        line_items,
        allowance_charges,
        totals,
    }
}

/// Document totals as extracted, before reconciliation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedTotals {
    pub subtotal: Option<Decimal>,
    pub tax_amount: Option<Decimal>,
    pub total_amount: Option<Decimal>,
}

/// Reconcile extracted totals with a recomputation from the lines.
///
/// Missing components are filled from the recomputation. The extracted
/// numbers are then kept unless the total deviates from the recomputed
/// total beyond `tolerance` **and** the extracted numbers do not add up
/// among themselves; only then are all three replaced. Without line
/// items nothing can be recomputed and the extracted values are kept.
pub fn reconcile_totals(
    extracted: &ExtractedTotals,
    lines: &[LineItem],
    allowance_charges: &[AllowanceCharge],
    tolerance: Decimal,
) -> Totals {
    let recomputed = recompute_totals(lines, allowance_charges);

    if lines.is_empty() {
        let subtotal = round_money(extracted.subtotal.unwrap_or_default());
        let tax_amount = round_money(extracted.tax_amount.unwrap_or_default());
        let net = subtotal - recomputed.allowance_total + recomputed.charge_total;
        return Totals {
            subtotal,
            tax_amount,
            total_amount: round_money(extracted.total_amount.unwrap_or(net + tax_amount)),
            ..recomputed
        };
    }

    let merged = Totals {
        subtotal: round_money(extracted.subtotal.unwrap_or(recomputed.subtotal)),
        tax_amount: round_money(extracted.tax_amount.unwrap_or(recomputed.tax_amount)),
        total_amount: round_money(extracted.total_amount.unwrap_or(recomputed.total_amount)),
        ..recomputed.clone()
    };

    let deviates = !money_equal(merged.total_amount, recomputed.total_amount, tolerance);
    if deviates && !totals_consistent(&merged, tolerance) {
        tracing::debug!(
            extracted_total = %merged.total_amount,
            recomputed_total = %recomputed.total_amount,
            "extracted totals inconsistent, using recomputed totals"
        );
        return recomputed;
    }
    merged
}

fn map_document_type(raw: &RawExtraction) -> DocumentType {
    let Some(text) = raw.text("documentTypeCode") else {
        return DocumentType::Invoice;
    };
    match text.to_ascii_lowercase().replace(['_', '-', ' '], "").as_str() {
        "creditnote" | "credit" | "gutschrift" => DocumentType::CreditNote,
        "invoice" => DocumentType::Invoice,
        other => other
            .parse::<u16>()
            .map(DocumentType::from_code)
            .unwrap_or(DocumentType::Invoice),
    }
}

fn map_party(raw: &RawExtraction, role: &str) -> Party {
    let field = |suffix: &str| raw.text(&format!("{role}{suffix}"));
    Party {
        name: field("Name").unwrap_or_default(),
        email: field("Email"),
        address: field("Address"),
        city: field("City"),
        postal_code: field("PostalCode"),
        country_code: field("CountryCode").map(|c| c.to_ascii_uppercase()),
        vat_id: field("VatId").map(|v| v.replace(' ', "").to_ascii_uppercase()),
        tax_id: field("TaxId"),
        tax_number: field("TaxNumber"),
        electronic_address: field("ElectronicAddress"),
        electronic_address_scheme: field("ElectronicAddressScheme"),
        contact_name: field("ContactName"),
        phone: field("Phone"),
    }
}

fn map_line(item: &RawExtraction, index: usize, credit_note: bool, tolerance: Decimal) -> LineItem {
    let magnitude = |d: Decimal| if credit_note { d.abs() } else { d };
    let quantity = item.amount("quantity").map(magnitude);
    let unit_price = item.amount("unitPrice").map(magnitude);
    let total_price = item.amount("totalPrice").map(magnitude);

    let (quantity, unit_price, total_price) = match (quantity, unit_price, total_price) {
        (Some(q), Some(p), Some(t)) => {
            if money_equal(line_net(q, p), t, tolerance) {
                (q, p, round_money(t))
            } else {
                tracing::debug!(
                    line = index,
                    quantity = %q,
                    unit_price = %p,
                    total_price = %t,
                    "line total disagrees with unit price x quantity, keeping line total"
                );
                (q, unit_price_from(t, q), round_money(t))
            }
        }
        (q, Some(p), None) => {
            let q = q.unwrap_or(Decimal::ONE);
            (q, p, line_net(q, p))
        }
        (q, None, Some(t)) => {
            let q = q.unwrap_or(Decimal::ONE);
            (q, unit_price_from(t, q), round_money(t))
        }
        (None, Some(p), Some(t)) if !p.is_zero() && !money_equal(p, t, tolerance) => {
            (ratio(t, p).unwrap_or(Decimal::ONE), p, round_money(t))
        }
        (None, Some(p), Some(t)) => (Decimal::ONE, p, round_money(t)),
        (q, None, None) => (q.unwrap_or(Decimal::ONE), Decimal::ZERO, Decimal::ZERO),
    };

    LineItem {
        description: item.text("description").unwrap_or_default(),
        quantity,
        unit_price,
        total_price,
        tax_rate: item.rate("taxRate").unwrap_or_default(),
        tax_category_code: item.text("taxCategoryCode").map(|c| c.to_ascii_uppercase()),
        unit_code: item
            .text("unitCode")
            .map(|u| u.to_ascii_uppercase())
            .unwrap_or_else(|| "C62".to_string()),
    }
}

fn unit_price_from(total: Decimal, quantity: Decimal) -> Decimal {
    ratio(total, quantity).unwrap_or(total)
}

/// `a / b` to four places; `None` for a zero divisor or overflow.
fn ratio(a: Decimal, b: Decimal) -> Option<Decimal> {
    a.checked_div(b)
        .map(|r| r.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero))
}

fn map_allowance_charge(item: &RawExtraction) -> Option<AllowanceCharge> {
    let amount = item.amount("amount")?;
    Some(AllowanceCharge {
        charge_indicator: item.flag("chargeIndicator").unwrap_or(false),
        amount: round_money(amount.abs()),
        reason: item.text("reason"),
        tax_rate: item.rate("taxRate"),
        tax_category_code: item.text("taxCategoryCode").map(|c| c.to_ascii_uppercase()),
    })
}

fn default_currency(format: FormatId) -> &'static str {
    match format {
        FormatId::Ksef => "PLN",
        FormatId::CiusRo => "RON",
        _ => "EUR",
    }
}
