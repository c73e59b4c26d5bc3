//! Missing-data removal.

use crate::table::PriceTable;

/// Remove symbols and dates with missing data.
///
/// Steps run in this order, each on the result of the previous one:
/// 1. drop symbols missing on every date;
/// 2. drop dates missing for every remaining symbol;
/// 3. drop symbols still missing on any remaining date.
///
/// If step 3 removes every symbol, no dates are kept either.
///
/// The result has no NaN and is a fixed point:
/// `clean(&clean(t)) == clean(t)`.
pub fn clean(prices: &PriceTable) -> PriceTable {
    let step1 = prices.retain_columns(|col| col.iter().any(|v| !v.is_nan()));

    let columns: Vec<&[f64]> = step1.iter_columns().map(|(_, c)| c).collect();
    let step2 = step1.retain_rows(|row| columns.iter().any(|col| !col[row].is_nan()));

    let step3 = step2.retain_columns(|col| col.iter().all(|v| !v.is_nan()));
    if step3.n_cols() == 0 {
        return step3.retain_rows(|_| false);
    }
    step3
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const N: f64 = f64::NAN;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn table(cols: &[(&str, Vec<f64>)]) -> PriceTable {
        let n = cols.first().map(|(_, c)| c.len()).unwrap_or(0);
        PriceTable::new(
            (0..n as u32).map(|i| d(2 + i)).collect(),
            cols.iter().map(|(s, _)| s.to_string()).collect(),
            cols.iter().map(|(_, c)| c.clone()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn drops_all_missing_and_partially_missing_columns_only() {
        let t = table(&[
            ("GOOD", vec![1.0, 2.0, 3.0, 4.0]),
            ("DEAD", vec![N, N, N, N]),
            ("GAPPY", vec![1.0, N, 3.0, 4.0]),
            ("ALSO_GOOD", vec![5.0, 6.0, 7.0, 8.0]),
        ]);
        let c = clean(&t);
        assert_eq!(c.symbols(), &["GOOD".to_string(), "ALSO_GOOD".to_string()]);
        assert_eq!(c.n_rows(), 4);
    }

    #[test]
    fn all_missing_row_removed_before_column_filter() {
        // Row 1 is a holiday for everyone; without step 2 both symbols would go.
        let t = table(&[("AAA", vec![1.0, N, 3.0]), ("BBB", vec![4.0, N, 6.0])]);
        let c = clean(&t);
        assert_eq!(c.n_cols(), 2);
        assert_eq!(c.dates(), &[d(2), d(4)]);
        assert_eq!(c.column("BBB"), Some(&[4.0, 6.0][..]));
    }

    #[test]
    fn dead_column_does_not_block_row_removal() {
        // Without step 1, DEAD would keep row 1 from counting as all-missing.
        let t = table(&[("AAA", vec![1.0, N, 3.0]), ("DEAD", vec![N, N, N])]);
        let c = clean(&t);
        assert_eq!(c.symbols(), &["AAA".to_string()]);
        assert_eq!(c.n_rows(), 2);
    }

    #[test]
    fn idempotent() {
        let t = table(&[
            ("AAA", vec![1.0, N, 3.0, 4.0]),
            ("BBB", vec![N, N, N, N]),
            ("CCC", vec![1.0, N, 2.0, N]),
        ]);
        let once = clean(&t);
        assert_eq!(clean(&once), once);
    }

    #[test]
    fn every_symbol_gappy_leaves_no_dates() {
        let t = table(&[("AAA", vec![1.0, N, 1.0]), ("BBB", vec![N, 1.0, 1.0])]);
        let once = clean(&t);
        assert_eq!(once.n_cols(), 0);
        assert_eq!(once.n_rows(), 0);
        assert_eq!(clean(&once), once);
    }

    #[test]
    fn empty_table_stays_empty() {
        let c = clean(&PriceTable::empty());
        assert!(c.is_empty());
    }
}
