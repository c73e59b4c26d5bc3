//! Index membership and the ticker directory.
//!
//! The membership list comes from a reference web page behind the
//! [`MembershipSource`] trait, so the directory can be built offline in tests.

use super::provider::DataError;
use crate::config::LoaderConfig;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use tracing::info;

/// Something that can list the current members of an index.
pub trait MembershipSource {
    fn fetch_index_membership(&self) -> Result<Vec<String>, DataError>;
}

impl<F> MembershipSource for F
where
    F: Fn() -> Result<Vec<String>, DataError>,
{
    fn fetch_index_membership(&self) -> Result<Vec<String>, DataError> {
        self()
    }
}

/// Scrapes the constituents table of a Wikipedia list page.
///
/// Takes the first `wikitable sortable` table, skips its header row, and reads
/// the first cell of every remaining row as the symbol.
pub struct WikipediaMembership {
    client: reqwest::blocking::Client,
    url: String,
}

impl WikipediaMembership {
    pub fn new(config: &LoaderConfig) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| DataError::Environment(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: config.membership_url.clone(),
        })
    }
}

impl MembershipSource for WikipediaMembership {
    fn fetch_index_membership(&self) -> Result<Vec<String>, DataError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(format!("{}: {e}", self.url)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let body = resp
            .text()
            .map_err(|e| DataError::NetworkUnreachable(format!("{}: {e}", self.url)))?;
        parse_membership_table(&body)
    }
}

/// Extract first-column symbols from the first sortable wikitable in `html`.
pub fn parse_membership_table(html: &str) -> Result<Vec<String>, DataError> {
    let selector = |s: &str| {
        Selector::parse(s).map_err(|e| DataError::MembershipParse(format!("selector '{s}': {e}")))
    };
    let table_sel = selector("table.wikitable.sortable")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;

    let doc = Html::parse_document(html);
    let table = doc
        .select(&table_sel)
        .next()
        .ok_or_else(|| DataError::MembershipParse("no 'wikitable sortable' table found".into()))?;

    let symbols: Vec<String> = table
        .select(&row_sel)
        .skip(1)
        .filter_map(|row| row.select(&cell_sel).next())
        .map(|cell| cell.text().collect::<String>().replace('\n', "").trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if symbols.is_empty() {
        return Err(DataError::MembershipParse("table has no member rows".into()));
    }
    Ok(symbols)
}

/// Ordered, de-duplicated symbol list: index members plus one benchmark.
///
/// Built once and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerDirectory {
    symbols: Vec<String>,
    benchmark: String,
}

impl TickerDirectory {
    /// Fetch the membership from `source` and append `benchmark`.
    pub fn build(source: &dyn MembershipSource, benchmark: &str) -> Result<Self, DataError> {
        if benchmark.trim().is_empty() {
            return Err(DataError::Config("benchmark symbol must not be empty".into()));
        }
        let members = source.fetch_index_membership()?;
        let dir = Self::from_symbols(members, benchmark);
        info!(members = dir.len() - 1, benchmark, "ticker directory built");
        Ok(dir)
    }

    /// Build from an in-memory list. The benchmark always ends up last and
    /// exactly once, whatever `members` contains.
    pub fn from_symbols<I, S>(members: I, benchmark: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let benchmark = benchmark.trim().to_string();
        let mut seen = HashSet::new();
        let mut symbols: Vec<String> = members
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty() && *s != benchmark)
            .filter(|s| seen.insert(s.clone()))
            .collect();
        symbols.push(benchmark.clone());
        Self { symbols, benchmark }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn benchmark(&self) -> &str {
        &self.benchmark
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.symbols.clone()
    }
}
