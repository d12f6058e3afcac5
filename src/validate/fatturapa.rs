//! FatturaPA checks mirroring the SdI rejection codes that can be
//! decided from the canonical invoice.

use super::en16931::COMMON;
use super::{Rule, blank, collect_locations};
use crate::core::{CanonicalInvoice, RuleViolation};
use crate::generate::fatturapa::{NO_RECIPIENT_CODE, natura_for, recipient_code};

pub(super) const RULE_SETS: &[&[Rule]] = &[COMMON, FATTURAPA];

const FATTURAPA: &[Rule] = &[
    cedente_vat,
    cedente_sede,
    cessionario_identifier,
    zero_rate_natura,
    destination,
    credit_note_link,
];

// CedentePrestatore/DatiAnagrafici/IdFiscaleIVA is mandatory
fn cedente_vat(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    blank(&inv.seller.vat_id).then(|| {
        RuleViolation::error(
            "FPA-CEDENTE-IVA",
            "seller.vatId",
            "FatturaPA requires the seller partita IVA (IdFiscaleIVA)",
        )
    })
}

// CedentePrestatore/Sede needs Indirizzo, CAP and Comune
fn cedente_sede(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    let seller = &inv.seller;
    let missing: Vec<&str> = [
        ("seller.address", &seller.address),
        ("seller.postalCode", &seller.postal_code),
        ("seller.city", &seller.city),
    ]
    .into_iter()
    .filter(|(_, value)| blank(value))
    .map(|(location, _)| location)
    .collect();

    (!missing.is_empty()).then(|| {
        RuleViolation::error(
            "FPA-SEDE",
            missing.join(", "),
            "FatturaPA seller Sede requires Indirizzo, CAP and Comune",
        )
    })
}

// 00417: CessionarioCommittente needs IdFiscaleIVA or CodiceFiscale
fn cessionario_identifier(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    (blank(&inv.buyer.vat_id) && blank(&inv.buyer.tax_id)).then(|| {
        RuleViolation::error(
            "FPA-00417",
            "buyer.vatId",
            "FatturaPA requires the buyer partita IVA or codice fiscale",
        )
    })
}

// 00400: a line with AliquotaIVA 0 needs a Natura
fn zero_rate_natura(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    let locations = collect_locations(&inv.line_items, "lineItems", |l| {
        l.tax_rate.is_zero() && natura_for(&l.category_code()).is_none()
    });
    (!locations.is_empty()).then(|| {
        RuleViolation::error(
            "FPA-00400",
            locations.join(", "),
            "zero-rate line has a tax category with no FatturaPA Natura code",
        )
    })
}

fn destination(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    (recipient_code(&inv.buyer) == NO_RECIPIENT_CODE && blank(&inv.buyer.email)).then(|| {
        RuleViolation::warning(
            "FPA-DEST",
            "buyer.electronicAddress",
            "no SdI recipient code or PEC address; the invoice goes to the buyer's cassetto fiscale",
        )
    })
}

fn credit_note_link(inv: &CanonicalInvoice) -> Option<RuleViolation> {
    (inv.is_credit_note() && blank(&inv.preceding_invoice_reference)).then(|| {
        RuleViolation::warning(
            "FPA-TD04",
            "precedingInvoiceReference",
            "TD04 credit note does not reference the original invoice (DatiFattureCollegate)",
        )
    })
}
