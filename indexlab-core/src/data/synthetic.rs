//! Synthetic price provider for offline runs and tests.
//!
//! Produces a simple random walk from a starting price of 100.0 per symbol.
//! The walk is seeded from the symbol name, so the same request always yields
//! the same table.

use super::align::align_series;
use super::provider::{DataError, DateRange, Interval, PriceField, PriceProvider, SymbolSeries};
use crate::table::PriceTable;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

/// Deterministic random-walk provider.
#[derive(Debug, Clone, Default)]
pub struct SyntheticProvider {
    missing: HashSet<String>,
}

impl SyntheticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Symbols that come back as all-missing columns, the way a delisted
    /// ticker does from a live provider.
    pub fn with_missing<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.missing.extend(symbols.into_iter().map(Into::into));
        self
    }

    fn series(
        symbol: &str,
        range: DateRange,
        interval: Interval,
        field: PriceField,
    ) -> Vec<(NaiveDate, f64)> {
        // Deterministic seed from symbol name
        let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);

        let mut points = Vec::new();
        let mut price = 100.0_f64;
        let mut current = range.start();

        while current < range.end() {
            // Skip weekends (simple heuristic)
            if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
                current += Duration::days(1);
                continue;
            }

            let step_return: f64 = rng.gen_range(-0.03..0.03);
            let open = price;
            let close = price * (1.0 + step_return);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            let volume = rng.gen_range(500_000..5_000_000u64) as f64;

            let value = match field {
                PriceField::Open => open,
                PriceField::High => high,
                PriceField::Low => low,
                PriceField::Close | PriceField::AdjClose => close,
                PriceField::Volume => volume,
            };
            points.push((current, value));

            price = close;
            current += step(interval);
        }

        points
    }
}

fn step(interval: Interval) -> Duration {
    match interval {
        Interval::Daily => Duration::days(1),
        Interval::FiveDay => Duration::days(5),
        Interval::Weekly => Duration::weeks(1),
        Interval::Monthly => Duration::days(30),
        Interval::Quarterly => Duration::days(91),
    }
}

impl PriceProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_prices(
        &self,
        symbols: &[String],
        range: DateRange,
        interval: Interval,
        field: PriceField,
    ) -> Result<PriceTable, DataError> {
        let series = symbols
            .iter()
            .map(|symbol| SymbolSeries {
                symbol: symbol.clone(),
                points: if self.missing.contains(symbol) {
                    Vec::new()
                } else {
                    Self::series(symbol, range, interval, field)
                },
            })
            .collect();
        align_series(series)
    }
}
