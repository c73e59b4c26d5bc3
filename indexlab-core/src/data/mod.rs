//! Data acquisition and persistence

pub mod align;
pub mod membership;
pub mod provider;
pub mod store;
pub mod synthetic;
pub mod yahoo;

pub use align::align_series;
pub use membership::{
    parse_membership_table, MembershipSource, TickerDirectory, WikipediaMembership,
};
pub use provider::{
    DataError, DateRange, Interval, PriceField, PriceProvider, PriceRequest, SymbolSeries,
};
pub use store::{read_csv, read_parquet, read_table, TableFormat, TableWriter};
pub use synthetic::SyntheticProvider;
pub use yahoo::YahooProvider;
