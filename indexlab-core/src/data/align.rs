//! Multi-symbol time alignment.
//!
//! Given per-symbol series, align them to a common timeline.
//! Missing observations get strict NaN (no forward-fill of price data).

use super::provider::{DataError, SymbolSeries};
use crate::table::PriceTable;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

/// Align series to the union of their dates.
///
/// Column order follows the input order. A symbol with no observations
/// becomes an all-NaN column.
pub fn align_series(series: Vec<SymbolSeries>) -> Result<PriceTable, DataError> {
    let mut all_dates = BTreeSet::new();
    for s in &series {
        for (date, _) in &s.points {
            all_dates.insert(*date);
        }
    }
    let dates: Vec<NaiveDate> = all_dates.into_iter().collect();

    let mut symbols = Vec::with_capacity(series.len());
    let mut columns = Vec::with_capacity(series.len());

    for s in series {
        let by_date: HashMap<NaiveDate, f64> = s.points.into_iter().collect();
        let column = dates
            .iter()
            .map(|date| by_date.get(date).copied().unwrap_or(f64::NAN))
            .collect();
        symbols.push(s.symbol);
        columns.push(column);
    }

    PriceTable::new(dates, symbols, columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(symbol: &str, points: &[(&str, f64)]) -> SymbolSeries {
        SymbolSeries {
            symbol: symbol.into(),
            points: points
                .iter()
                .map(|(d, v)| (NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap(), *v))
                .collect(),
        }
    }

    #[test]
    fn align_fills_missing_with_nan() {
        let aligned = align_series(vec![
            series(
                "SPY",
                &[("2024-01-02", 100.0), ("2024-01-03", 101.0), ("2024-01-04", 102.0)],
            ),
            // QQQ missing 2024-01-03
            series("QQQ", &[("2024-01-02", 200.0), ("2024-01-04", 202.0)]),
        ])
        .unwrap();

        assert_eq!(aligned.n_rows(), 3);
        assert_eq!(aligned.symbols(), &["SPY".to_string(), "QQQ".to_string()]);
        assert_eq!(aligned.value(1, "SPY"), Some(101.0));
        assert!(aligned.value(1, "QQQ").unwrap().is_nan());
    }

    #[test]
    fn symbol_without_points_is_all_nan() {
        let aligned = align_series(vec![
            series("SPY", &[("2024-01-02", 100.0)]),
            series("DEAD", &[]),
        ])
        .unwrap();
        assert_eq!(aligned.n_rows(), 1);
        assert!(aligned.column("DEAD").unwrap().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn out_of_order_points_are_sorted() {
        let aligned = align_series(vec![series(
            "SPY",
            &[("2024-01-04", 102.0), ("2024-01-02", 100.0)],
        )])
        .unwrap();
        assert_eq!(aligned.column("SPY"), Some(&[100.0, 102.0][..]));
    }
}
