//! Raw extraction records and their normalization into the canonical model.
//!
//! - [`RawExtraction`] wraps the loosely typed record and resolves field
//!   aliases deterministically.
//! - [`to_canonical_invoice`] builds a [`CanonicalInvoice`](crate::core::CanonicalInvoice)
//!   and reconciles its totals.
//! - [`compute_missing_fields`] reports required fields the record lacks.

mod canonical;
mod missing;
mod raw;

pub use canonical::{
    ExtractedTotals, MapOptions, reconcile_totals, to_canonical_invoice, to_canonical_invoice_with,
};
pub use missing::{Visibility, compute_missing_fields, field_requirements};
pub use raw::{FIELD_ALIASES, MAX_AMOUNT, RawExtraction, aliases_for, parse_amount, parse_date};
