//! Date × symbol price table.
//!
//! Rows are calendar dates in ascending order, columns are symbols. Storage is
//! column-major: each column holds exactly one value per date. Missing values
//! are strict NaN (no forward-fill).

use crate::data::provider::DataError;
use chrono::NaiveDate;

#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    symbols: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl PriceTable {
    /// Build a table, checking that every column matches the date axis and
    /// that dates are strictly ascending.
    pub fn new(
        dates: Vec<NaiveDate>,
        symbols: Vec<String>,
        columns: Vec<Vec<f64>>,
    ) -> Result<Self, DataError> {
        if symbols.len() != columns.len() {
            return Err(DataError::Shape(format!(
                "{} symbols but {} columns",
                symbols.len(),
                columns.len()
            )));
        }
        if let Some((sym, col)) = symbols
            .iter()
            .zip(&columns)
            .find(|(_, col)| col.len() != dates.len())
        {
            return Err(DataError::Shape(format!(
                "column '{sym}' has {} values for {} dates",
                col.len(),
                dates.len()
            )));
        }
        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(DataError::Shape("dates must be strictly ascending".into()));
        }
        Ok(Self {
            dates,
            symbols,
            columns,
        })
    }

    /// Unchecked constructor for transforms that preserve the shape invariants.
    pub(crate) fn from_parts(
        dates: Vec<NaiveDate>,
        symbols: Vec<String>,
        columns: Vec<Vec<f64>>,
    ) -> Self {
        debug_assert!(columns.iter().all(|c| c.len() == dates.len()));
        Self {
            dates,
            symbols,
            columns,
        }
    }

    /// A table with no rows and no columns.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn n_cols(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() || self.symbols.is_empty()
    }

    /// Values for `symbol`, one per date.
    pub fn column(&self, symbol: &str) -> Option<&[f64]> {
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .map(|i| self.columns[i].as_slice())
    }

    pub fn value(&self, row: usize, symbol: &str) -> Option<f64> {
        self.column(symbol).and_then(|c| c.get(row).copied())
    }

    /// Iterate `(symbol, column)` pairs in column order.
    pub fn iter_columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.symbols
            .iter()
            .zip(&self.columns)
            .map(|(s, c)| (s.as_str(), c.as_slice()))
    }

    /// Keep only the columns for which `keep` returns true.
    pub(crate) fn retain_columns(&self, mut keep: impl FnMut(&[f64]) -> bool) -> Self {
        let (symbols, columns) = self
            .symbols
            .iter()
            .zip(&self.columns)
            .filter(|(_, col)| keep(col))
            .map(|(s, c)| (s.clone(), c.clone()))
            .unzip();
        Self {
            dates: self.dates.clone(),
            symbols,
            columns,
        }
    }

    /// Keep only the rows whose index satisfies `keep`.
    pub(crate) fn retain_rows(&self, mut keep: impl FnMut(usize) -> bool) -> Self {
        let rows: Vec<usize> = (0..self.n_rows()).filter(|&i| keep(i)).collect();
        Self {
            dates: rows.iter().map(|&i| self.dates[i]).collect(),
            symbols: self.symbols.clone(),
            columns: self
                .columns
                .iter()
                .map(|col| rows.iter().map(|&i| col[i]).collect())
                .collect(),
        }
    }

    /// Deterministic BLAKE3 fingerprint over dates, symbols and value bits.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for date in &self.dates {
            hasher.update(date.to_string().as_bytes());
        }
        for (symbol, col) in self.iter_columns() {
            hasher.update(symbol.as_bytes());
            for v in col {
                // canonical NaN so every missing value hashes the same
                let bits = if v.is_nan() { f64::NAN.to_bits() } else { v.to_bits() };
                hasher.update(&bits.to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Two NaNs at the same position compare equal.
impl PartialEq for PriceTable {
    fn eq(&self, other: &Self) -> bool {
        self.dates == other.dates
            && self.symbols == other.symbols
            && self.columns.iter().zip(&other.columns).all(|(a, b)| {
                a.iter()
                    .zip(b)
                    .all(|(x, y)| x == y || (x.is_nan() && y.is_nan()))
            })
    }
}
