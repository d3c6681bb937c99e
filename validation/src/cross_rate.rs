//! Triangular arbitrage and duplicate/inverse consistency checks.

use std::collections::{BTreeSet, HashMap};

use fxrate_common::{Currency, CurrencyPair, RateRecord};
use rust_decimal::Decimal;

use crate::result::{ArbitrageOpportunity, CrossRateInconsistency, InconsistencyKind};

const BPS: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Direct quotes from a snapshot, first quote per pair wins.
pub struct QuoteBook {
    quotes: HashMap<(Currency, Currency), Decimal>,
    currencies: BTreeSet<Currency>,
}

impl QuoteBook {
    /// Index records that pass their sanity checks.
    pub fn new(records: &[RateRecord]) -> Self {
        let mut quotes = HashMap::new();
        let mut currencies = BTreeSet::new();

        for record in records.iter().filter(|r| r.check().is_ok() && !r.pair.is_degenerate()) {
            let key = (record.pair.base.clone(), record.pair.quote.clone());
            quotes.entry(key).or_insert(record.rate);
            currencies.insert(record.pair.base.clone());
            currencies.insert(record.pair.quote.clone());
        }

        Self { quotes, currencies }
    }

    /// Rate from `from` to `to`, direct or through the inverse quote.
    pub fn leg(&self, from: &Currency, to: &Currency) -> Option<Decimal> {
        if let Some(rate) = self.quotes.get(&(from.clone(), to.clone())) {
            return Some(*rate);
        }
        self.quotes
            .get(&(to.clone(), from.clone()))
            .and_then(|r| Decimal::ONE.checked_div(*r))
    }

    fn cycle(&self, path: [&Currency; 3]) -> Option<Decimal> {
        let ab = self.leg(path[0], path[1])?;
        let bc = self.leg(path[1], path[2])?;
        let ca = self.leg(path[2], path[0])?;
        ab.checked_mul(bc)?.checked_mul(ca)
    }

    pub fn currencies(&self) -> impl Iterator<Item = &Currency> {
        self.currencies.iter()
    }
}

/// Check every unordered triple of currencies for a round trip that
/// deviates from parity by more than `max_deviation`.
///
/// Each triple is reported at most once, in its profitable direction.
pub fn find_triangular_arbitrage(book: &QuoteBook, max_deviation: Decimal) -> Vec<ArbitrageOpportunity> {
    let currencies: Vec<&Currency> = book.currencies().collect();
    let mut found = Vec::new();

    for i in 0..currencies.len() {
        for j in (i + 1)..currencies.len() {
            for k in (j + 1)..currencies.len() {
                let (a, b, c) = (currencies[i], currencies[j], currencies[k]);
                // A cycle too large to represent is skipped.
                let Some(forward) = book.cycle([a, b, c]) else {
                    continue;
                };

                if (forward - Decimal::ONE).abs() <= max_deviation {
                    continue;
                }

                let (path, product) = if forward > Decimal::ONE {
                    ([a, b, c], forward)
                } else {
                    match book.cycle([a, c, b]) {
                        Some(reverse) if reverse > Decimal::ONE => ([a, c, b], reverse),
                        _ => continue,
                    }
                };

                found.push(ArbitrageOpportunity {
                    path: [path[0].clone(), path[1].clone(), path[2].clone()],
                    product,
                    profit_bps: (product - Decimal::ONE)
                        .checked_mul(BPS)
                        .unwrap_or(Decimal::MAX),
                });
            }
        }
    }

    found
}

/// Find duplicate quotes and inverse pairs that disagree by more than
/// `tolerance`.
pub fn find_inconsistencies(records: &[RateRecord], tolerance: Decimal) -> Vec<CrossRateInconsistency> {
    let mut first_seen: HashMap<&CurrencyPair, &RateRecord> = HashMap::new();
    let mut found = Vec::new();

    for record in records.iter().filter(|r| r.check().is_ok()) {
        match first_seen.get(&record.pair) {
            Some(first) => {
                if let Some(deviation) = relative_deviation(record.rate, first.rate) {
                    if deviation > tolerance {
                        found.push(CrossRateInconsistency {
                            kind: InconsistencyKind::Duplicate,
                            pair: record.pair.clone(),
                            other: first.pair.clone(),
                            expected: first.rate,
                            actual: record.rate,
                            deviation,
                        });
                    }
                }
            }
            None => {
                first_seen.insert(&record.pair, record);
            }
        }
    }

    let mut pairs: Vec<&&CurrencyPair> = first_seen.keys().collect();
    pairs.sort();

    for pair in pairs {
        if pair.base >= pair.quote {
            continue;
        }
        let inverse = pair.inverse();
        let (Some(direct), Some(reverse)) = (first_seen.get(*pair), first_seen.get(&inverse)) else {
            continue;
        };

        let Some(implied) = Decimal::ONE.checked_div(reverse.rate) else {
            continue;
        };
        if let Some(deviation) = relative_deviation(direct.rate, implied) {
            if deviation > tolerance {
                found.push(CrossRateInconsistency {
                    kind: InconsistencyKind::Inverse,
                    pair: (*pair).clone(),
                    other: inverse,
                    expected: implied,
                    actual: direct.rate,
                    deviation,
                });
            }
        }
    }

    found
}

/// `None` when `expected` is zero or the ratio does not fit a `Decimal`.
fn relative_deviation(actual: Decimal, expected: Decimal) -> Option<Decimal> {
    actual
        .checked_sub(expected)?
        .checked_div(expected)
        .map(|d| d.abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quote(base: &str, quote: &str, rate: Decimal) -> RateRecord {
        RateRecord::new(CurrencyPair::new(base, quote), rate)
    }

    fn sci(value: &str) -> Decimal {
        Decimal::from_scientific(value).unwrap()
    }

    #[test]
    fn test_triangular_arbitrage_detected() {
        let records = vec![
            quote("USD", "EUR", dec!(0.90)),
            quote("EUR", "GBP", dec!(0.85)),
            quote("GBP", "USD", dec!(1.35)),
        ];
        let book = QuoteBook::new(&records);

        let found = find_triangular_arbitrage(&book, dec!(0.001));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].product, dec!(1.03275));
        assert_eq!(found[0].profit_bps, dec!(327.5));
    }

    #[test]
    fn test_reverse_direction_is_reported_when_profitable() {
        // Forward cycle loses about 3%, so the reverse one gains.
        let records = vec![
            quote("USD", "EUR", dec!(0.90)),
            quote("EUR", "GBP", dec!(0.85)),
            quote("GBP", "USD", dec!(1.27)),
        ];
        let found = find_triangular_arbitrage(&QuoteBook::new(&records), dec!(0.001));

        assert_eq!(found.len(), 1);
        assert!(found[0].product > Decimal::ONE);
        assert_eq!(found[0].path[1], Currency::usd());
        assert!(found[0].profit_bps > dec!(290) && found[0].profit_bps < dec!(295));
    }

    #[test]
    fn test_consistent_triangle_is_quiet() {
        let records = vec![
            quote("USD", "EUR", dec!(0.90)),
            quote("EUR", "GBP", dec!(0.85)),
            quote("USD", "GBP", dec!(0.765)),
        ];
        assert!(find_triangular_arbitrage(&QuoteBook::new(&records), dec!(0.001)).is_empty());
    }

    #[test]
    fn test_inverse_inconsistency() {
        let records = vec![
            quote("EUR", "USD", dec!(1.10)),
            quote("USD", "EUR", dec!(0.95)),
        ];
        let found = find_inconsistencies(&records, dec!(0.001));

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, InconsistencyKind::Inverse);
        assert_eq!(found[0].pair, CurrencyPair::new("EUR", "USD"));
    }

    #[test]
    fn test_agreeing_inverse_is_consistent() {
        let records = vec![
            quote("EUR", "USD", dec!(1.25)),
            quote("USD", "EUR", dec!(0.8)),
        ];
        assert!(find_inconsistencies(&records, dec!(0.001)).is_empty());
    }

    #[test]
    fn test_duplicate_quotes_must_agree() {
        let records = vec![
            quote("USD", "JPY", dec!(150.0)),
            quote("USD", "JPY", dec!(150.1)),
            quote("USD", "JPY", dec!(152.0)),
        ];
        let found = find_inconsistencies(&records, dec!(0.001));

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, InconsistencyKind::Duplicate);
        assert_eq!(found[0].actual, dec!(152.0));
    }

    #[test]
    fn test_extreme_rates_do_not_overflow() {
        let records = vec![
            quote("AAA", "BBB", sci("1e9")),
            quote("BBB", "CCC", sci("1e9")),
            quote("CCC", "AAA", sci("1e9")),
        ];
        let found = find_triangular_arbitrage(&QuoteBook::new(&records), dec!(0.001));

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].product, sci("1e27"));
        assert_eq!(found[0].profit_bps, Decimal::MAX);

        // The cycle itself does not fit, so the triangle is skipped.
        let records = vec![
            quote("AAA", "BBB", sci("1e20")),
            quote("BBB", "CCC", sci("1e20")),
            quote("CCC", "AAA", dec!(0.5)),
        ];
        assert!(find_triangular_arbitrage(&QuoteBook::new(&records), dec!(0.001)).is_empty());
    }

    #[test]
    fn test_relative_deviation_overflow_is_none() {
        assert_eq!(relative_deviation(sci("1e27"), sci("1e-27")), None);
        assert_eq!(relative_deviation(dec!(1.1), dec!(0)), None);
        assert_eq!(relative_deviation(dec!(1.1), dec!(1.0)), Some(dec!(0.1)));
    }

    #[test]
    fn test_invalid_records_are_ignored() {
        let records = vec![
            quote("EUR", "USD", dec!(1.10)),
            quote("USD", "EUR", dec!(0)),
        ];
        assert!(find_inconsistencies(&records, dec!(0.001)).is_empty());
        assert!(QuoteBook::new(&records).leg(&Currency::usd(), &Currency::eur()).is_some());
    }
}
