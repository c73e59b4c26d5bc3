//! IndexLab CLI: fetch index constituent prices/returns and inspect saved tables.
//!
//! Commands:
//! - `tickers`: print the index members plus the benchmark
//! - `fetch`: download prices and produce one of the four table kinds
//! - `inspect`: summarize a saved `.csv` / `.parquet` table

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use indexlab_core::data::{
    read_table, MembershipSource, PriceProvider, SyntheticProvider, TableWriter,
    WikipediaMembership, YahooProvider,
};
use indexlab_core::{
    DatasetLoader, Interval, LoaderConfig, PriceField, PriceRequest, PriceTable, SaveOptions,
    TableKind, TickerDirectory,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "indexlab",
    about = "IndexLab CLI: index constituent prices and log-returns"
)]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the ticker directory (index members plus benchmark).
    Tickers {
        /// Use these members instead of scraping the reference page.
        #[arg(long, value_delimiter = ',')]
        symbols: Vec<String>,
    },
    /// Download prices and produce one table kind.
    Fetch {
        /// Which table to produce.
        #[arg(value_enum)]
        kind: KindArg,

        /// Start date (YYYY-MM-DD). Defaults to one year ago.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD, exclusive). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Sampling interval: 1d, 5d, 1wk, 1mo, 3mo.
        #[arg(long, default_value = "1d")]
        interval: String,

        /// Price field: Open, High, Low, Close, "Adj Close", Volume.
        #[arg(long, default_value = "Adj Close")]
        field: String,

        /// Write the result as CSV.
        #[arg(long, default_value_t = false)]
        csv: bool,

        /// Write the result as compressed Parquet.
        #[arg(long, default_value_t = false)]
        parquet: bool,

        /// Use these members instead of scraping the reference page.
        #[arg(long, value_delimiter = ',')]
        symbols: Vec<String>,

        /// Offline mode: deterministic synthetic prices instead of Yahoo Finance.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Output directory. Overrides the config file.
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Summarize a saved table.
    Inspect {
        /// A `.csv` or `.parquet` file written by `fetch`.
        path: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    RawPrices,
    RawReturns,
    CleanedPrices,
    CleanedReturns,
}

impl From<KindArg> for TableKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::RawPrices => TableKind::RawPrices,
            KindArg::RawReturns => TableKind::RawReturns,
            KindArg::CleanedPrices => TableKind::CleanedPrices,
            KindArg::CleanedReturns => TableKind::CleanedReturns,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => LoaderConfig::from_file(path)?,
        None => LoaderConfig::default(),
    };

    match cli.command {
        Commands::Tickers { symbols } => run_tickers(&config, symbols),
        Commands::Fetch {
            kind,
            start,
            end,
            interval,
            field,
            csv,
            parquet,
            symbols,
            synthetic,
            data_dir,
        } => {
            let mut config = config;
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            let request = build_request(start.as_deref(), end.as_deref(), &interval, &field)?;
            let save = SaveOptions {
                delimited: csv,
                container: parquet,
            };
            run_fetch(&config, kind.into(), &request, save, symbols, synthetic)
        }
        Commands::Inspect { path } => run_inspect(&path),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

fn build_request(
    start: Option<&str>,
    end: Option<&str>,
    interval: &str,
    field: &str,
) -> Result<PriceRequest> {
    let end_date = end
        .map(parse_date)
        .transpose()?
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let start_date = start
        .map(parse_date)
        .transpose()?
        .unwrap_or_else(|| end_date - chrono::Duration::days(365));

    Ok(PriceRequest::new(start_date, end_date)
        .with_interval(interval.parse::<Interval>()?)
        .with_field(field.parse::<PriceField>()?))
}

fn build_directory(config: &LoaderConfig, symbols: Vec<String>) -> Result<TickerDirectory> {
    if !symbols.is_empty() {
        return Ok(TickerDirectory::from_symbols(symbols, &config.benchmark));
    }
    let source = WikipediaMembership::new(config)?;
    Ok(TickerDirectory::build(&source as &dyn MembershipSource, &config.benchmark)?)
}

fn run_tickers(config: &LoaderConfig, symbols: Vec<String>) -> Result<()> {
    let dir = build_directory(config, symbols)?;
    for symbol in dir.symbols() {
        println!("{symbol}");
    }
    eprintln!("{} tickers (benchmark {})", dir.len(), dir.benchmark());
    Ok(())
}

fn run_fetch(
    config: &LoaderConfig,
    kind: TableKind,
    request: &PriceRequest,
    save: SaveOptions,
    symbols: Vec<String>,
    synthetic: bool,
) -> Result<()> {
    if !synthetic && symbols.is_empty() {
        let mut loader = DatasetLoader::from_config(config)?;
        return produce(&mut loader, kind, request, save);
    }

    let provider: Box<dyn PriceProvider> = if synthetic {
        Box::new(SyntheticProvider::new())
    } else {
        Box::new(YahooProvider::new(config)?)
    };
    let writer = TableWriter::new(&config.data_dir)?;
    let tickers = build_directory(config, symbols)?;
    let mut loader = DatasetLoader::with_tickers(tickers, provider, writer, &config.file_prefix);
    produce(&mut loader, kind, request, save)
}

fn produce<P: PriceProvider>(
    loader: &mut DatasetLoader<P>,
    kind: TableKind,
    request: &PriceRequest,
    save: SaveOptions,
) -> Result<()> {
    let table = match kind {
        TableKind::RawPrices => loader.get_raw_prices(request, save)?,
        TableKind::RawReturns => loader.get_raw_returns(request, save)?,
        TableKind::CleanedPrices => loader.get_cleaned_prices(request, save)?,
        TableKind::CleanedReturns => loader.get_cleaned_returns(request, save)?,
    };

    print_summary(kind.stem(), table);
    Ok(())
}

fn run_inspect(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("no such file: {}", path.display());
    }
    let table = read_table(path)?;
    print_summary(&path.display().to_string(), &table);
    Ok(())
}

fn print_summary(label: &str, table: &PriceTable) {
    let missing: usize = table
        .iter_columns()
        .map(|(_, col)| col.iter().filter(|v| v.is_nan()).count())
        .sum();

    println!("\n=== {label} ===");
    println!("Rows:     {}", table.n_rows());
    println!("Symbols:  {}", table.n_cols());
    match (table.dates().first(), table.dates().last()) {
        (Some(first), Some(last)) => println!("Span:     {first} .. {last}"),
        _ => println!("Span:     (empty)"),
    }
    println!("Missing:  {missing}");
    println!("Hash:     {}", table.content_hash());
}
