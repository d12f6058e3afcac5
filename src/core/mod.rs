//! Canonical invoice model, monetary engine and code lists.
//!
//! Everything else in the crate consumes [`CanonicalInvoice`]; the
//! monetary engine in [`money`] keeps its totals honest.

mod builder;
pub mod codes;
mod error;
pub mod money;
mod types;

pub use builder::*;
pub use codes::TaxCategory;
pub use error::*;
pub use money::{
    DEFAULT_TOLERANCE, book_allowance_charges, money_equal, recompute_totals, round_money, tax_breakdown,
};
pub use types::*;
