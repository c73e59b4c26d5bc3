//! Dataset loader session tests.
//!
//! Uses an in-memory membership list and a scripted provider so no network
//! access is needed.

use chrono::NaiveDate;
use indexlab_core::data::{DataError, DateRange, Interval, PriceField, PriceProvider};
use indexlab_core::data::read_csv;
use indexlab_core::transform::{clean, log_returns};
use indexlab_core::{DatasetLoader, LoaderConfig, PriceRequest, PriceTable, SaveOptions};
use std::cell::{Cell, RefCell};
use std::path::Path;

const N: f64 = f64::NAN;

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

/// Provider that serves a fixed table, scaled by the call number so that
/// successive downloads are distinguishable.
struct ScriptedProvider {
    base: PriceTable,
    calls: Cell<usize>,
    requested: RefCell<Vec<String>>,
    fail: Cell<bool>,
}

impl ScriptedProvider {
    fn new(base: PriceTable) -> Self {
        Self {
            base,
            calls: Cell::new(0),
            requested: RefCell::new(Vec::new()),
            fail: Cell::new(false),
        }
    }
}

impl PriceProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch_prices(
        &self,
        symbols: &[String],
        _range: DateRange,
        _interval: Interval,
        _field: PriceField,
    ) -> Result<PriceTable, DataError> {
        if self.fail.get() {
            return Err(DataError::NetworkUnreachable("scripted outage".into()));
        }
        let n = self.calls.get() + 1;
        self.calls.set(n);
        *self.requested.borrow_mut() = symbols.to_vec();

        let columns = self
            .base
            .iter_columns()
            .map(|(_, col)| col.iter().map(|v| v * n as f64).collect())
            .collect();
        PriceTable::new(
            self.base.dates().to_vec(),
            self.base.symbols().to_vec(),
            columns,
        )
    }
}

/// MMM complete, DEAD never traded, GAPPY missing one day, SPY complete.
/// 2024-01-04 is missing for every symbol.
fn fixture() -> PriceTable {
    PriceTable::new(
        vec![d(2), d(3), d(4), d(5), d(8)],
        vec!["MMM".into(), "DEAD".into(), "GAPPY".into(), "SPY".into()],
        vec![
            vec![100.0, 101.0, N, 103.0, 104.0],
            vec![N, N, N, N, N],
            vec![50.0, N, N, 52.0, 53.0],
            vec![470.0, 472.0, N, 475.0, 476.0],
        ],
    )
    .unwrap()
}

fn config(dir: &Path) -> LoaderConfig {
    LoaderConfig {
        data_dir: dir.join("Data"),
        ..LoaderConfig::default()
    }
}

fn loader(dir: &Path) -> DatasetLoader<ScriptedProvider> {
    let members = || -> Result<Vec<String>, DataError> {
        Ok(vec!["MMM".into(), "DEAD".into(), "GAPPY".into()])
    };
    DatasetLoader::new(&config(dir), &members, ScriptedProvider::new(fixture())).unwrap()
}

fn request() -> PriceRequest {
    PriceRequest::new(d(1), d(9))
}

#[test]
fn construction_creates_data_dir_and_appends_benchmark() {
    let tmp = tempfile::tempdir().unwrap();
    let l = loader(tmp.path());

    assert!(tmp.path().join("Data").is_dir());
    assert_eq!(l.get_ticker_list(), vec!["MMM", "DEAD", "GAPPY", "SPY"]);
}

#[test]
fn construction_fails_when_membership_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let members = || -> Result<Vec<String>, DataError> {
        Err(DataError::MembershipParse("no table".into()))
    };
    let result = DatasetLoader::new(
        &config(tmp.path()),
        &members,
        ScriptedProvider::new(fixture()),
    );
    assert!(matches!(result, Err(DataError::MembershipParse(_))));
}

#[test]
fn construction_fails_when_data_dir_cannot_be_created() {
    let tmp = tempfile::tempdir().unwrap();
    let blocker = tmp.path().join("file");
    std::fs::write(&blocker, "not a directory").unwrap();

    let cfg = LoaderConfig {
        data_dir: blocker.join("Data"),
        ..LoaderConfig::default()
    };
    let members = || -> Result<Vec<String>, DataError> { Ok(vec!["MMM".into()]) };
    let result = DatasetLoader::new(&cfg, &members, ScriptedProvider::new(fixture()));
    assert!(matches!(result, Err(DataError::Environment(_))));
}

#[test]
fn live_session_fails_when_membership_page_unreachable() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = LoaderConfig {
        membership_url: "http://127.0.0.1:9/".into(),
        http_timeout_secs: 5,
        ..config(tmp.path())
    };
    assert!(matches!(
        DatasetLoader::from_config(&cfg),
        Err(DataError::NetworkUnreachable(_))
    ));
    assert!(tmp.path().join("Data").is_dir());
}

#[test]
fn inverted_range_fails_without_calling_provider() {
    let tmp = tempfile::tempdir().unwrap();
    let mut l = loader(tmp.path());

    let same_day = PriceRequest::new(d(5), d(5));
    assert!(matches!(
        l.download_prices(&same_day),
        Err(DataError::InvalidRange { .. })
    ));
    let inverted = PriceRequest::new(d(9), d(1));
    assert!(matches!(
        l.get_cleaned_returns(&inverted, SaveOptions::NONE),
        Err(DataError::InvalidRange { .. })
    ));

    assert_eq!(l.provider().calls.get(), 0);
    assert!(l.get_last_raw_prices(SaveOptions::NONE).unwrap().is_none());
    assert!(l.last_request().is_none());
}

#[test]
fn download_requests_every_ticker_in_one_call() {
    let tmp = tempfile::tempdir().unwrap();
    let mut l = loader(tmp.path());

    let table = l.download_prices(&request()).unwrap().clone();
    assert_eq!(table.n_rows(), 5);
    assert_eq!(l.provider().calls.get(), 1);
    assert_eq!(*l.provider().requested.borrow(), l.get_ticker_list());
    assert_eq!(l.last_request(), Some(&request()));
}

#[test]
fn last_accessors_empty_before_any_get() {
    let tmp = tempfile::tempdir().unwrap();
    let l = loader(tmp.path());

    assert!(l.get_last_raw_prices(SaveOptions::BOTH).unwrap().is_none());
    assert!(l.get_last_raw_returns(SaveOptions::BOTH).unwrap().is_none());
    assert!(l.get_last_cleaned_prices(SaveOptions::BOTH).unwrap().is_none());
    assert!(l.get_last_cleaned_returns(SaveOptions::BOTH).unwrap().is_none());

    // Nothing written for absent snapshots.
    assert_eq!(std::fs::read_dir(tmp.path().join("Data")).unwrap().count(), 0);
}

#[test]
fn raw_prices_match_provider_table() {
    let tmp = tempfile::tempdir().unwrap();
    let mut l = loader(tmp.path());

    let raw = l.get_raw_prices(&request(), SaveOptions::NONE).unwrap().clone();
    assert_eq!(raw, fixture());
    assert_eq!(l.get_last_raw_prices(SaveOptions::NONE).unwrap(), Some(&raw));
}

#[test]
fn raw_returns_have_one_fewer_row() {
    let tmp = tempfile::tempdir().unwrap();
    let mut l = loader(tmp.path());

    let returns = l.get_raw_returns(&request(), SaveOptions::NONE).unwrap().clone();
    assert_eq!(returns.n_rows(), fixture().n_rows() - 1);
    assert_eq!(returns.dates()[0], d(3));
    let mmm = returns.column("MMM").unwrap();
    assert!((mmm[0] - (101.0f64.ln() - 100.0f64.ln())).abs() < 1e-12);

    // Raw prices were refreshed as a dependency.
    assert_eq!(l.get_last_raw_prices(SaveOptions::NONE).unwrap(), Some(&fixture()));
}

#[test]
fn cleaned_prices_drop_dead_and_gappy_symbols_and_holiday_row() {
    let tmp = tempfile::tempdir().unwrap();
    let mut l = loader(tmp.path());

    let cleaned = l.get_cleaned_prices(&request(), SaveOptions::NONE).unwrap().clone();
    assert_eq!(cleaned.symbols(), &["MMM".to_string(), "SPY".to_string()]);
    assert_eq!(cleaned.dates(), &[d(2), d(3), d(5), d(8)]);
    assert!(cleaned
        .iter_columns()
        .all(|(_, col)| col.iter().all(|v| v.is_finite())));
}

#[test]
fn cleaned_returns_come_from_cleaned_prices() {
    let tmp = tempfile::tempdir().unwrap();
    let mut l = loader(tmp.path());

    let cleaned_returns = l
        .get_cleaned_returns(&request(), SaveOptions::NONE)
        .unwrap()
        .clone();
    let expected = log_returns(&clean(&fixture()));
    assert_eq!(cleaned_returns, expected);
    assert_eq!(cleaned_returns.n_rows(), 3);

    assert_eq!(
        l.get_last_cleaned_prices(SaveOptions::NONE).unwrap(),
        Some(&clean(&fixture()))
    );
    // Raw returns are not part of this chain.
    assert!(l.get_last_raw_returns(SaveOptions::NONE).unwrap().is_none());
}

#[test]
fn snapshot_unchanged_by_other_kinds() {
    let tmp = tempfile::tempdir().unwrap();
    let mut l = loader(tmp.path());

    let first_returns = l.get_raw_returns(&request(), SaveOptions::NONE).unwrap().clone();

    // Second download serves different (scaled) prices.
    l.get_cleaned_prices(&request(), SaveOptions::NONE).unwrap();
    assert_eq!(l.provider().calls.get(), 2);

    assert_eq!(
        l.get_last_raw_returns(SaveOptions::NONE).unwrap(),
        Some(&first_returns)
    );
    // Raw prices were overwritten by the second download.
    let raw = l.get_last_raw_prices(SaveOptions::NONE).unwrap().unwrap();
    assert_eq!(raw.value(0, "MMM"), Some(200.0));
}

#[test]
fn provider_error_propagates_and_keeps_previous_snapshot() {
    let tmp = tempfile::tempdir().unwrap();
    let mut l = loader(tmp.path());

    let raw = l.get_raw_prices(&request(), SaveOptions::NONE).unwrap().clone();
    l.provider().fail.set(true);

    assert!(matches!(
        l.get_raw_returns(&request(), SaveOptions::NONE),
        Err(DataError::NetworkUnreachable(_))
    ));
    assert_eq!(l.get_last_raw_prices(SaveOptions::NONE).unwrap(), Some(&raw));
    assert!(l.get_last_raw_returns(SaveOptions::NONE).unwrap().is_none());
}

#[test]
fn only_requested_kind_is_written_in_requested_formats() {
    let tmp = tempfile::tempdir().unwrap();
    let data = tmp.path().join("Data");
    let mut l = loader(tmp.path());

    let csv_only = SaveOptions {
        delimited: true,
        container: false,
    };
    let returns = l.get_raw_returns(&request(), csv_only).unwrap().clone();

    assert!(data.join("S&P500-raw_returns.csv").exists());
    assert!(!data.join("S&P500-raw_returns.parquet").exists());
    assert!(!data.join("S&P500-raw_prices.csv").exists());

    let back = read_csv(&data.join("S&P500-raw_returns.csv")).unwrap();
    assert_eq!(back.symbols(), returns.symbols());
    assert_eq!(back.dates(), returns.dates());
}

#[test]
fn last_accessor_writes_both_formats() {
    let tmp = tempfile::tempdir().unwrap();
    let data = tmp.path().join("Data");
    let mut l = loader(tmp.path());

    l.get_cleaned_prices(&request(), SaveOptions::NONE).unwrap();
    assert_eq!(std::fs::read_dir(&data).unwrap().count(), 0);

    l.get_last_cleaned_prices(SaveOptions::BOTH).unwrap().unwrap();
    assert!(data.join("S&P500-cleaned_prices.csv").exists());
    assert!(data.join("S&P500-cleaned_prices.parquet").exists());
    // No re-download.
    assert_eq!(l.provider().calls.get(), 1);
}
