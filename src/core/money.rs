//! Monetary engine: rounding, tolerance comparison and recomputation of
//! document totals from line items.
//!
//! All functions are pure. Rounding is half-away-from-zero on [`Decimal`],
//! so `.005` cases round the same way on every platform.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use super::types::{AllowanceCharge, LineItem, TaxSubtotal, Totals};

/// Default tolerance for comparing extracted and recomputed amounts (2 cents).
pub const DEFAULT_TOLERANCE: Decimal = dec!(0.02);

/// Round to two fraction digits, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// True when `|a - b| <= tolerance`.
pub fn money_equal(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    (a - b).abs() <= tolerance
}

/// Net line amount `quantity × unit_price`, rounded.
pub fn line_net(quantity: Decimal, unit_price: Decimal) -> Decimal {
    round_money(quantity * unit_price)
}

/// Book every allowance/charge on a single `(category, rate)` group.
///
/// Rated entries are returned as they are, with the category filled in.
/// An unrated entry is split over the line groups in proportion to each
/// group's share of the line net total; the last group takes the rounding
/// remainder, so the parts always add up to the original amount. Without
/// lines to share over, it lands on the first line group, or `Z` at 0%.
pub fn book_allowance_charges(
    lines: &[LineItem],
    allowance_charges: &[AllowanceCharge],
) -> Vec<AllowanceCharge> {
    let mut line_groups: BTreeMap<(String, Decimal), Decimal> = BTreeMap::new();
    for line in lines {
        *line_groups
            .entry((line.category_code(), line.tax_rate.normalize()))
            .or_insert(Decimal::ZERO) += line.total_price;
    }
    let line_total: Decimal = line_groups.values().copied().sum();

    let mut booked = Vec::with_capacity(allowance_charges.len());
    for ac in allowance_charges {
        if let Some(rate) = ac.tax_rate {
            booked.push(AllowanceCharge {
                tax_category_code: Some(ac.category_code()),
                tax_rate: Some(rate),
                ..ac.clone()
            });
            continue;
        }

        if line_total.is_zero() {
            let (category, rate) = line_groups
                .keys()
                .next()
                .cloned()
                .unwrap_or_else(|| ("Z".to_string(), Decimal::ZERO));
            booked.push(part_of(ac, ac.amount, category, rate));
            continue;
        }

        let mut remaining = ac.amount;
        let last = line_groups.len() - 1;
        for (i, ((category, rate), net)) in line_groups.iter().enumerate() {
            let part = if i == last {
                remaining
            } else {
                let share = net.checked_div(line_total).unwrap_or(Decimal::ZERO);
                round_money(ac.amount.checked_mul(share).unwrap_or(Decimal::ZERO))
            };
            remaining -= part;
            if !part.is_zero() {
                booked.push(part_of(ac, part, category.clone(), *rate));
            }
        }
    }
    booked
}

fn part_of(ac: &AllowanceCharge, amount: Decimal, category: String, rate: Decimal) -> AllowanceCharge {
    AllowanceCharge {
        charge_indicator: ac.charge_indicator,
        amount,
        reason: ac.reason.clone(),
        tax_rate: Some(rate),
        tax_category_code: Some(category),
    }
}

/// Group lines and allowances/charges by `(category, rate)` and compute
/// the taxable base and tax per group.
///
/// Allowances and charges are booked with [`book_allowance_charges`], so
/// the taxable bases add up to `subtotal - allowances + charges`.
pub fn tax_breakdown(lines: &[LineItem], allowance_charges: &[AllowanceCharge]) -> Vec<TaxSubtotal> {
    let mut groups: BTreeMap<(String, Decimal), Decimal> = BTreeMap::new();

    for line in lines {
        *groups
            .entry((line.category_code(), line.tax_rate.normalize()))
            .or_insert(Decimal::ZERO) += line.total_price;
    }

    for ac in book_allowance_charges(lines, allowance_charges) {
        *groups
            .entry((ac.category_code(), ac.rate().normalize()))
            .or_insert(Decimal::ZERO) += ac.signed_amount();
    }

    groups
        .into_iter()
        .map(|((category_code, rate), base)| {
            let taxable_amount = round_money(base);
            TaxSubtotal {
                tax_amount: round_money(taxable_amount * rate / dec!(100)),
                category_code,
                rate,
                taxable_amount,
            }
        })
        .collect()
}

/// Recompute subtotal, allowance/charge totals, tax and grand total from
/// the line items and document-level allowances/charges.
pub fn recompute_totals(lines: &[LineItem], allowance_charges: &[AllowanceCharge]) -> Totals {
    let subtotal = round_money(lines.iter().map(|l| l.total_price).sum());
    let allowance_total = round_money(
        allowance_charges
            .iter()
            .filter(|ac| !ac.charge_indicator)
            .map(|ac| ac.amount)
            .sum(),
    );
    let charge_total = round_money(
        allowance_charges
            .iter()
            .filter(|ac| ac.charge_indicator)
            .map(|ac| ac.amount)
            .sum(),
    );
    let tax_amount = round_money(
        tax_breakdown(lines, allowance_charges)
            .iter()
            .map(|g| g.tax_amount)
            .sum(),
    );

    Totals {
        subtotal,
        allowance_total,
        charge_total,
        tax_amount,
        total_amount: round_money(subtotal - allowance_total + charge_total + tax_amount),
    }
}

/// True when `total == subtotal - allowances + charges + tax` within tolerance.
pub fn totals_consistent(totals: &Totals, tolerance: Decimal) -> bool {
    money_equal(
        totals.total_amount,
        totals.subtotal - totals.allowance_total + totals.charge_total + totals.tax_amount,
        tolerance,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(net: Decimal, rate: Decimal) -> LineItem {
        LineItem {
            description: "item".into(),
            quantity: dec!(1),
            unit_price: net,
            total_price: net,
            tax_rate: rate,
            tax_category_code: None,
            unit_code: "C62".into(),
        }
    }

    fn allowance(amount: Decimal, rate: Option<Decimal>) -> AllowanceCharge {
        AllowanceCharge {
            charge_indicator: false,
            amount,
            reason: Some("discount".into()),
            tax_rate: rate,
            tax_category_code: None,
        }
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_money(dec!(2.675)), dec!(2.68));
        assert_eq!(round_money(dec!(0.125)), dec!(0.13));
        assert_eq!(round_money(dec!(-0.125)), dec!(-0.13));
        assert_eq!(round_money(dec!(1.004)), dec!(1.00));
    }

    #[test]
    fn money_equal_tolerance_edges() {
        assert!(money_equal(dec!(100.00), dec!(100.019), DEFAULT_TOLERANCE));
        assert!(money_equal(dec!(100.00), dec!(100.02), DEFAULT_TOLERANCE));
        assert!(!money_equal(dec!(100.00), dec!(100.03), DEFAULT_TOLERANCE));
        assert!(money_equal(dec!(5), dec!(5), Decimal::ZERO));
    }

    #[test]
    fn groups_by_rate() {
        let lines = [line(dec!(100), dec!(19)), line(dec!(50), dec!(7)), line(dec!(10), dec!(19))];
        let bd = tax_breakdown(&lines, &[]);
        assert_eq!(bd.len(), 2);
        let standard = bd.iter().find(|g| g.rate == dec!(19)).unwrap();
        assert_eq!(standard.taxable_amount, dec!(110.00));
        assert_eq!(standard.tax_amount, dec!(20.90));
        let reduced = bd.iter().find(|g| g.rate == dec!(7)).unwrap();
        assert_eq!(reduced.tax_amount, dec!(3.50));
    }

    #[test]
    fn recompute_simple_invoice() {
        let totals = recompute_totals(&[line(dec!(200), dec!(19))], &[]);
        assert_eq!(totals.subtotal, dec!(200.00));
        assert_eq!(totals.tax_amount, dec!(38.00));
        assert_eq!(totals.total_amount, dec!(238.00));
    }

    #[test]
    fn allowance_with_rate_reduces_its_group() {
        let totals = recompute_totals(
            &[line(dec!(100), dec!(19))],
            &[allowance(dec!(10), Some(dec!(19)))],
        );
        assert_eq!(totals.allowance_total, dec!(10.00));
        assert_eq!(totals.tax_amount, dec!(17.10));
        assert_eq!(totals.total_amount, dec!(107.10));
    }

    #[test]
    fn allowance_without_rate_is_spread_proportionally() {
        let lines = [line(dec!(100), dec!(20)), line(dec!(100), dec!(10))];
        let totals = recompute_totals(&lines, &[allowance(dec!(20), None)]);
        // 90 @ 20% + 90 @ 10%
        assert_eq!(totals.tax_amount, dec!(27.00));
        assert_eq!(totals.total_amount, dec!(207.00));
    }

    #[test]
    fn unrated_allowance_remainder_goes_to_last_group() {
        let lines = [line(dec!(100), dec!(19)), line(dec!(100), dec!(7)), line(dec!(100), dec!(10))];
        let discount = [allowance(dec!(10), None)];

        let booked = book_allowance_charges(&lines, &discount);
        let parts: Vec<(Decimal, Decimal)> = booked.iter().map(|ac| (ac.rate(), ac.amount)).collect();
        assert_eq!(parts, [(dec!(7), dec!(3.33)), (dec!(10), dec!(3.33)), (dec!(19), dec!(3.34))]);
        assert!(booked.iter().all(|ac| ac.tax_category_code.as_deref() == Some("S")));

        let bases: Decimal = tax_breakdown(&lines, &discount).iter().map(|g| g.taxable_amount).sum();
        assert_eq!(bases, dec!(290.00));
    }

    #[test]
    fn unrated_allowance_without_lines_lands_on_zero_rate() {
        let booked = book_allowance_charges(&[], &[allowance(dec!(5), None)]);
        assert_eq!(booked.len(), 1);
        assert_eq!(booked[0].category_code(), "Z");
        assert_eq!(booked[0].rate(), Decimal::ZERO);
        assert_eq!(booked[0].amount, dec!(5));
    }

    #[test]
    fn charge_increases_total() {
        let mut charge = allowance(dec!(5), Some(dec!(19)));
        charge.charge_indicator = true;
        let totals = recompute_totals(&[line(dec!(100), dec!(19))], &[charge]);
        assert_eq!(totals.charge_total, dec!(5.00));
        assert_eq!(totals.tax_amount, dec!(19.95));
        assert_eq!(totals.total_amount, dec!(124.95));
        assert!(totals_consistent(&totals, DEFAULT_TOLERANCE));
    }

    #[test]
    fn empty_input_is_zero() {
        let totals = recompute_totals(&[], &[]);
        assert_eq!(totals, Totals::default());
    }
}
