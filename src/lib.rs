//! # eformat
//!
//! Turns AI-extracted invoice data into European e-invoices: XRechnung
//! (CII and UBL), PEPPOL BIS Billing 3.0, Factur-X (EN 16931 and Basic),
//! FatturaPA, KSeF FA(2), NLCIUS and CIUS-RO.
//!
//! All monetary values use [`rust_decimal::Decimal`], never floating point.
//! The canonical model follows the
//! [EN 16931](https://standards.cencenelec.eu/dyn/www/f?p=205:110:0::::FSP_PROJECT:60602)
//! semantic model.
//!
//! ## Flow
//!
//! 1. A raw extraction record ([`mapping::RawExtraction`]) is mapped to a
//!    [`core::CanonicalInvoice`]; totals are reconciled against a
//!    recomputation from the line items.
//! 2. A [`validate::Validator`] runs the profile rules for the target format.
//! 3. A [`generate::Generator`] writes the XML (and, for Factur-X, the PDF).
//!
//! [`pipeline::Pipeline`] runs these steps over a batch of records.
//!
//! ## Quick Start
//!
//! ```rust
//! use eformat::generate::GeneratorFactory;
//! use eformat::mapping::{RawExtraction, to_canonical_invoice};
//! use eformat::validate::{Validator, validator_for};
//! use eformat::formats::FormatId;
//! use rust_decimal_macros::dec;
//! use serde_json::json;
//!
//! let raw = RawExtraction::from_value(json!({
//!     "invoiceNumber": "INV-1",
//!     "currency": "EUR",
//!     "lineItems": [{"unitPrice": 100, "quantity": 2, "taxRate": 19}],
//! }))
//! .unwrap();
//!
//! let invoice = to_canonical_invoice(&raw, FormatId::XRechnungCii);
//! assert_eq!(invoice.totals.subtotal, dec!(200.00));
//! assert_eq!(invoice.totals.total_amount, dec!(238.00));
//!
//! // No seller, buyer or date yet.
//! let result = validator_for(FormatId::XRechnungCii).validate(&invoice);
//! assert!(!result.valid);
//!
//! let doc = GeneratorFactory::create("xrechnung-cii").unwrap().generate(&invoice).unwrap();
//! assert!(doc.xml_content.contains("INV-1"));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `facturx` (default) | Factur-X PDF rendering and PDF/A-3 embedding via `lopdf` |

pub mod core;
pub mod formats;
pub mod generate;
pub mod mapping;
pub mod pipeline;
pub mod validate;

#[cfg(feature = "facturx")]
pub mod facturx;

pub use crate::core::{CanonicalInvoice, EInvoiceError, RuleViolation};
pub use crate::formats::FormatId;
pub use crate::generate::{GenerationResult, Generator, GeneratorFactory};
pub use crate::pipeline::{Pipeline, PipelineConfig};
pub use crate::validate::{ValidationResult, Validator, ValidatorFactory};
