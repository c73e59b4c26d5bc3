//! Table transforms: log-returns and missing-data cleaning.

pub mod clean;
pub mod returns;

pub use clean::clean;
pub use returns::log_returns;
