//! Log-returns.

use crate::table::PriceTable;

/// `r[t] = ln(p[t]) - ln(p[t-1])` per symbol.
///
/// The first row has no prior price and is dropped, so the result has one
/// row fewer than `prices` (zero rows for an input with fewer than two).
/// Missing prices propagate as NaN.
pub fn log_returns(prices: &PriceTable) -> PriceTable {
    if prices.n_rows() < 2 {
        return prices.retain_rows(|_| false);
    }

    let dates = prices.dates()[1..].to_vec();
    let symbols = prices.symbols().to_vec();
    let columns = prices
        .iter_columns()
        .map(|(_, col)| col.windows(2).map(|w| w[1].ln() - w[0].ln()).collect())
        .collect();

    PriceTable::from_parts(dates, symbols, columns)
}
