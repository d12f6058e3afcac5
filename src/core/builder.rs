use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::money::{line_net, recompute_totals};
use super::types::*;
use crate::formats::FormatId;

/// Builder for constructing canonical invoices directly, without going
/// through a raw extraction record. Totals are recomputed on `build()`.
///
/// ```
/// use eformat::core::*;
/// use eformat::formats::FormatId;
/// use rust_decimal_macros::dec;
/// use chrono::NaiveDate;
///
/// let invoice = InvoiceBuilder::new("RE-2024-001", FormatId::XRechnungCii)
///     .invoice_date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
///     .seller(PartyBuilder::new("ACME GmbH").address("Hauptstr. 1", "Berlin", "10115", "DE")
///         .vat_id("DE123456789")
///         .build())
///     .buyer(PartyBuilder::new("Kunde AG").address("Marienplatz 1", "München", "80331", "DE").build())
///     .add_line(LineItemBuilder::new("Beratung", dec!(10), dec!(150.00)).tax_rate(dec!(19)).build())
///     .build();
///
/// assert_eq!(invoice.totals.total_amount, dec!(1785.00));
/// ```
pub struct InvoiceBuilder {
    invoice: CanonicalInvoice,
}

impl InvoiceBuilder {
    pub fn new(number: impl Into<String>, format: FormatId) -> Self {
        Self {
            invoice: CanonicalInvoice {
                output_format: format,
                document_type_code: DocumentType::Invoice,
                invoice_number: number.into(),
                invoice_date: None,
                currency: "EUR".to_string(),
                buyer_reference: None,
                purchase_order_reference: None,
                preceding_invoice_reference: None,
                notes: Vec::new(),
                seller: Party::default(),
                buyer: Party::default(),
                payment: PaymentInfo::default(),
                line_items: Vec::new(),
                allowance_charges: Vec::new(),
                totals: Totals::default(),
            },
        }
    }

    pub fn invoice_date(mut self, date: NaiveDate) -> Self {
        self.invoice.invoice_date = Some(date);
        self
    }

    pub fn document_type(mut self, document_type: DocumentType) -> Self {
        self.invoice.document_type_code = document_type;
        self
    }

    pub fn currency(mut self, code: impl Into<String>) -> Self {
        self.invoice.currency = code.into();
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.invoice.notes.push(note.into());
        self
    }

    pub fn buyer_reference(mut self, reference: impl Into<String>) -> Self {
        self.invoice.buyer_reference = Some(reference.into());
        self
    }

    pub fn purchase_order_reference(mut self, reference: impl Into<String>) -> Self {
        self.invoice.purchase_order_reference = Some(reference.into());
        self
    }

    pub fn preceding_invoice(mut self, reference: impl Into<String>) -> Self {
        self.invoice.preceding_invoice_reference = Some(reference.into());
        self
    }

    pub fn seller(mut self, party: Party) -> Self {
        self.invoice.seller = party;
        self
    }

    pub fn buyer(mut self, party: Party) -> Self {
        self.invoice.buyer = party;
        self
    }

    pub fn payment(mut self, payment: PaymentInfo) -> Self {
        self.invoice.payment = payment;
        self
    }

    pub fn add_line(mut self, line: LineItem) -> Self {
        self.invoice.line_items.push(line);
        self
    }

    pub fn add_allowance(mut self, amount: Decimal, reason: impl Into<String>) -> Self {
        self.invoice.allowance_charges.push(AllowanceCharge {
            charge_indicator: false,
            amount,
            reason: Some(reason.into()),
            tax_rate: None,
            tax_category_code: None,
        });
        self
    }

    pub fn add_charge(mut self, amount: Decimal, reason: impl Into<String>) -> Self {
        self.invoice.allowance_charges.push(AllowanceCharge {
            charge_indicator: true,
            amount,
            reason: Some(reason.into()),
            tax_rate: None,
            tax_category_code: None,
        });
        self
    }

    pub fn add_allowance_charge(mut self, ac: AllowanceCharge) -> Self {
        self.invoice.allowance_charges.push(ac);
        self
    }

    /// Finish the invoice, recomputing totals from lines and allowances.
    pub fn build(mut self) -> CanonicalInvoice {
        self.invoice.totals =
            recompute_totals(&self.invoice.line_items, &self.invoice.allowance_charges);
        self.invoice
    }

    /// Finish the invoice with explicit totals (as extracted), skipping
    /// recomputation.
    pub fn build_with_totals(mut self, totals: Totals) -> CanonicalInvoice {
        self.invoice.totals = totals;
        self.invoice
    }
}

/// Builder for [`Party`].
pub struct PartyBuilder {
    party: Party,
}

impl PartyBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            party: Party {
                name: name.into(),
                ..Party::default()
            },
        }
    }

    pub fn address(
        mut self,
        street: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
        country_code: impl Into<String>,
    ) -> Self {
        self.party.address = Some(street.into());
        self.party.city = Some(city.into());
        self.party.postal_code = Some(postal_code.into());
        self.party.country_code = Some(country_code.into());
        self
    }

    pub fn vat_id(mut self, id: impl Into<String>) -> Self {
        self.party.vat_id = Some(id.into());
        self
    }

    pub fn tax_id(mut self, id: impl Into<String>) -> Self {
        self.party.tax_id = Some(id.into());
        self
    }

    pub fn tax_number(mut self, number: impl Into<String>) -> Self {
        self.party.tax_number = Some(number.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.party.email = Some(email.into());
        self
    }

    pub fn electronic_address(mut self, scheme: impl Into<String>, value: impl Into<String>) -> Self {
        self.party.electronic_address_scheme = Some(scheme.into());
        self.party.electronic_address = Some(value.into());
        self
    }

    pub fn contact(
        mut self,
        name: impl Into<String>,
        phone: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        self.party.contact_name = Some(name.into());
        self.party.phone = Some(phone.into());
        self.party.email = Some(email.into());
        self
    }

    pub fn build(self) -> Party {
        self.party
    }
}

/// Builder for [`LineItem`]. The net amount is `quantity × unit_price`
/// unless set explicitly.
pub struct LineItemBuilder {
    line: LineItem,
    explicit_total: bool,
}

impl LineItemBuilder {
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            line: LineItem {
                description: description.into(),
                quantity,
                unit_price,
                total_price: Decimal::ZERO,
                tax_rate: Decimal::ZERO,
                tax_category_code: None,
                unit_code: "C62".to_string(),
            },
            explicit_total: false,
        }
    }

    pub fn tax_rate(mut self, rate: Decimal) -> Self {
        self.line.tax_rate = rate;
        self
    }

    pub fn tax_category(mut self, code: impl Into<String>) -> Self {
        self.line.tax_category_code = Some(code.into());
        self
    }

    pub fn unit(mut self, unit_code: impl Into<String>) -> Self {
        self.line.unit_code = unit_code.into();
        self
    }

    pub fn total_price(mut self, total: Decimal) -> Self {
        self.line.total_price = total;
        self.explicit_total = true;
        self
    }

    pub fn build(mut self) -> LineItem {
        if !self.explicit_total {
            self.line.total_price = line_net(self.line.quantity, self.line.unit_price);
        }
        self.line
    }
}
