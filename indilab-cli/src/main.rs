//! IndiLab CLI: download, analyze and cache management commands.
//!
//! Commands:
//! - `download`: fetch daily bars from Yahoo Finance and cache them as Parquet
//! - `analyze`: compute SMA/RSI/OBV (and optional buy flags) for one symbol
//! - `cache status`: report cache size, symbols and date ranges
//! - `cache clean`: remove symbols not fetched recently

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use indilab_core::analysis::{analyze, AnalysisSummary};
use indilab_core::config::AppConfig;
use indilab_core::data::{
    download, load_bars, CacheStatus, CoverageResult, DataProvider, LoadOptions, LoadedData,
    ParquetCache, YahooProvider,
};
use indilab_core::export::{write_table_csv, write_table_parquet};

#[derive(Parser)]
#[command(
    name = "indilab",
    about = "IndiLab CLI: moving averages, RSI and OBV for one ticker"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download daily bars from Yahoo Finance and cache as Parquet.
    Download {
        /// Ticker symbol (e.g., AAPL).
        symbol: String,

        /// Start date (YYYY-MM-DD). Defaults to 2023-01-01.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to 2023-12-31.
        #[arg(long)]
        end: Option<String>,

        /// Force re-download even if cached.
        #[arg(long, default_value_t = false)]
        force: bool,

        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Compute indicators (and optionally buy flags) for one symbol.
    Analyze {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Symbol. Overrides the config file.
        #[arg(long)]
        symbol: Option<String>,

        /// Start date (YYYY-MM-DD). Overrides the config file.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Overrides the config file.
        #[arg(long)]
        end: Option<String>,

        /// Add the buy_oversold_reversal and buy_golden_cross flags.
        #[arg(long, default_value_t = false)]
        signals: bool,

        /// Offline mode: no network access.
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Use synthetic data as fallback.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Cache directory. Overrides the config file.
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Write the full table to this file.
        #[arg(long)]
        export: Option<PathBuf>,

        /// Export format. Inferred from the file extension when omitted.
        #[arg(long, value_enum)]
        format: Option<ExportFormat>,

        /// Print the summary as JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cache size, symbol count, and date ranges.
    Status {
        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Remove cached symbols not fetched within the given number of days.
    Clean {
        /// Remove symbols not fetched in this many days.
        #[arg(long)]
        unused_days: u64,

        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,

        /// Actually delete (without this flag, only previews what would be removed).
        #[arg(long, default_value_t = false)]
        confirm: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportFormat {
    Csv,
    Parquet,
}

impl ExportFormat {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("parquet") => ExportFormat::Parquet,
            _ => ExportFormat::Csv,
        }
    }
}

/// Options for `analyze` after clap parsing.
struct AnalyzeArgs {
    config: Option<PathBuf>,
    symbol: Option<String>,
    start: Option<String>,
    end: Option<String>,
    signals: bool,
    offline: bool,
    synthetic: bool,
    cache_dir: Option<PathBuf>,
    export: Option<PathBuf>,
    format: Option<ExportFormat>,
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Download {
            symbol,
            start,
            end,
            force,
            cache_dir,
        } => run_download(&symbol, start, end, force, cache_dir),
        Commands::Analyze {
            config,
            symbol,
            start,
            end,
            signals,
            offline,
            synthetic,
            cache_dir,
            export,
            format,
            json,
        } => run_analyze(AnalyzeArgs {
            config,
            symbol,
            start,
            end,
            signals,
            offline,
            synthetic,
            cache_dir,
            export,
            format,
            json,
        }),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
            CacheAction::Clean {
                unused_days,
                cache_dir,
                confirm,
            } => run_cache_clean(&cache_dir, unused_days, confirm),
        },
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
}

fn run_download(
    symbol: &str,
    start: Option<String>,
    end: Option<String>,
    force: bool,
    cache_dir: PathBuf,
) -> Result<()> {
    let defaults = AppConfig::default();
    let start_date = start
        .as_deref()
        .map(parse_date)
        .transpose()?
        .unwrap_or(defaults.data.start_date);
    let end_date = end
        .as_deref()
        .map(parse_date)
        .transpose()?
        .unwrap_or(defaults.data.end_date);
    if start_date > end_date {
        bail!("start date {start_date} is after end date {end_date}");
    }

    let symbol = symbol.to_uppercase();
    let cache = ParquetCache::new(cache_dir);

    if !force && cache.covers_range(&symbol, start_date, end_date) == CoverageResult::FullyCovered {
        println!("{symbol}: already cached for {start_date} to {end_date} (use --force to re-download)");
        return Ok(());
    }

    let provider = YahooProvider::new().context("failed to build HTTP client")?;
    let opts = LoadOptions {
        start: start_date,
        end: end_date,
        offline: false,
        synthetic: false,
        force,
    };
    let rows = download(&symbol, &cache, &provider, &opts)
        .with_context(|| format!("download failed for {symbol}"))?;

    println!(
        "{symbol}: cached {} bars ({} to {}) in {}",
        rows.len(),
        rows.first().map(|b| b.date).unwrap_or(start_date),
        rows.last().map(|b| b.date).unwrap_or(end_date),
        cache.symbol_dir(&symbol).display()
    );
    Ok(())
}

/// Config file (or defaults) with command-line overrides applied.
fn resolve_config(args: &AnalyzeArgs) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    };

    if let Some(symbol) = &args.symbol {
        config.data.symbol = symbol.clone();
    }
    config.data.symbol = config.data.symbol.to_uppercase();
    if let Some(start) = &args.start {
        config.data.start_date = parse_date(start)?;
    }
    if let Some(end) = &args.end {
        config.data.end_date = parse_date(end)?;
    }
    if let Some(dir) = &args.cache_dir {
        config.data.cache_dir = dir.clone();
    }
    if args.signals {
        config.signals.enabled = true;
    }

    config.validate()?;
    Ok(config)
}

fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let settings = config.analysis_settings();
    let symbol = config.data.symbol.as_str();

    let opts = LoadOptions {
        start: config.data.start_date,
        end: config.data.end_date,
        offline: args.offline,
        synthetic: args.synthetic,
        force: false,
    };

    let cache = ParquetCache::new(&config.data.cache_dir);
    let provider = if args.offline {
        None
    } else {
        Some(YahooProvider::new().context("failed to build HTTP client")?)
    };
    let provider_ref = provider.as_ref().map(|p| p as &dyn DataProvider);

    let loaded = load_bars(symbol, &cache, provider_ref, &opts)?;
    info!(symbol, rows = loaded.bars.len(), source = loaded.source.label(), "bars loaded");

    let source = loaded.source;
    let synthetic = loaded.is_synthetic();
    let LoadedData { bars, .. } = loaded;
    let table = analyze(bars, &settings)?;
    let summary = AnalysisSummary::from_table(&table, &settings);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary, source.label(), settings.signals.enabled);
    }
    if synthetic {
        println!("WARNING: Results based on SYNTHETIC data");
    }

    if let Some(path) = &args.export {
        match args.format.unwrap_or_else(|| ExportFormat::for_path(path)) {
            ExportFormat::Csv => write_table_csv(path, &table)?,
            ExportFormat::Parquet => write_table_parquet(path, &table)?,
        }
        println!("Table written to: {}", path.display());
    }

    Ok(())
}

fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(v) => format!("{v:.decimals$}"),
        None => "n/a".to_string(),
    }
}

fn print_summary(summary: &AnalysisSummary, source: &str, signals: bool) {
    println!();
    println!("=== {} ===", summary.symbol);
    println!(
        "Period:         {} to {}",
        summary.first_date, summary.last_date
    );
    println!("Rows:           {} (source: {source})", summary.rows);
    println!("Last price:     {:.2}", summary.last_price);
    println!();
    println!("--- Indicators (last row) ---");
    println!("SMA short:      {}", fmt_opt(summary.sma_short, 2));
    println!("SMA long:       {}", fmt_opt(summary.sma_long, 2));
    println!(
        "RSI:            {}{}",
        fmt_opt(summary.rsi, 1),
        summary
            .rsi_zone
            .map(|z| format!(" ({})", z.label()))
            .unwrap_or_default()
    );
    println!("OBV:            {}", fmt_opt(summary.obv, 0));

    if signals {
        println!();
        println!("--- Buy flags ---");
        for flag in &summary.flags {
            println!("{:<24} {} row(s)", flag.name, flag.count);
            for date in &flag.dates {
                println!("  {date}");
            }
        }
    }
    println!();
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let cache = ParquetCache::new(cache_dir);
    let symbols = cache.cached_symbols()?;
    if symbols.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    let rows = status_rows(&cache, &symbols);
    let total_size: u64 = rows.iter().map(|(_, size)| size).sum();

    println!("Cache: {}", cache_dir.display());
    println!("Symbols: {}", symbols.len());
    println!("Total size: {}", format_size(total_size));
    println!();
    println!("{:<8} {:<25} {:<12} {:>10}", "Symbol", "Date Range", "Bars", "Size");
    println!("{}", "-".repeat(58));
    for (status, size) in &rows {
        let range = match (status.start_date, status.end_date) {
            (Some(start), Some(end)) => format!("{start} to {end}"),
            _ => "(no meta)".to_string(),
        };
        let bars = status
            .bar_count
            .map_or_else(|| "-".to_string(), |n| format!("{n} bars"));
        println!(
            "{:<8} {:<25} {:<12} {:>10}",
            status.symbol,
            range,
            bars,
            format_size(*size)
        );
    }

    Ok(())
}

/// Cache status and on-disk size for each symbol.
fn status_rows(cache: &ParquetCache, symbols: &[String]) -> Vec<(CacheStatus, u64)> {
    let names: Vec<&str> = symbols.iter().map(String::as_str).collect();
    cache
        .status(&names)
        .into_iter()
        .map(|status| {
            let size = dir_size(&cache.symbol_dir(&status.symbol));
            (status, size)
        })
        .collect()
}

/// Symbols whose metadata says they were fetched before `cutoff`. Symbols
/// without readable metadata are kept.
fn stale_symbols(cache: &ParquetCache, cutoff: chrono::NaiveDateTime) -> Result<Vec<String>> {
    Ok(cache
        .cached_symbols()?
        .into_iter()
        .filter(|sym| {
            cache
                .get_meta(sym)
                .map(|meta| meta.cached_at < cutoff)
                .unwrap_or(false)
        })
        .collect())
}

fn run_cache_clean(cache_dir: &Path, unused_days: u64, confirm: bool) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let cache = ParquetCache::new(cache_dir);
    let cutoff = chrono::Local::now().naive_local() - chrono::Duration::days(unused_days as i64);
    let to_remove = stale_symbols(&cache, cutoff)?;

    if to_remove.is_empty() {
        println!("No symbols older than {unused_days} days to remove.");
        return Ok(());
    }

    println!(
        "Found {} symbol(s) not fetched in {unused_days} days:",
        to_remove.len()
    );
    for sym in &to_remove {
        println!("  {sym} ({})", format_size(dir_size(&cache.symbol_dir(sym))));
    }

    if !confirm {
        println!();
        println!("Dry run: pass --confirm to actually delete.");
        return Ok(());
    }

    for sym in &to_remove {
        std::fs::remove_dir_all(cache.symbol_dir(sym))
            .with_context(|| format!("failed to remove cached data for {sym}"))?;
        println!("Removed: {sym}");
    }

    println!("Done. Removed {} symbol(s).", to_remove.len());
    Ok(())
}

fn dir_size(path: &Path) -> u64 {
    let mut size = 0u64;
    if let Ok(entries) = std::fs::read_dir(path) {
        for entry in entries.flatten() {
            if let Ok(meta) = entry.metadata() {
                size += meta.len();
            }
        }
    }
    size
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indilab_core::data::{generate_synthetic_bars, DataSource};

    fn args() -> AnalyzeArgs {
        AnalyzeArgs {
            config: None,
            symbol: None,
            start: None,
            end: None,
            signals: false,
            offline: true,
            synthetic: true,
            cache_dir: None,
            export: None,
            format: None,
            json: false,
        }
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn analyze_flags_parse() {
        let cli = Cli::try_parse_from([
            "indilab", "analyze", "--symbol", "msft", "--signals", "--offline", "--format",
            "parquet",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze {
                symbol,
                signals,
                offline,
                format,
                ..
            } => {
                assert_eq!(symbol.as_deref(), Some("msft"));
                assert!(signals && offline);
                assert_eq!(format, Some(ExportFormat::Parquet));
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn overrides_beat_defaults() {
        let mut a = args();
        a.symbol = Some("msft".into());
        a.start = Some("2022-03-01".into());
        a.signals = true;
        let config = resolve_config(&a).unwrap();
        assert_eq!(config.data.symbol, "MSFT");
        assert_eq!(config.data.start_date, NaiveDate::from_ymd_opt(2022, 3, 1).unwrap());
        assert_eq!(config.data.end_date, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert!(config.signals.enabled);
    }

    #[test]
    fn overrides_beat_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("indilab.toml");
        std::fs::write(&path, "[data]\nsymbol = \"SPY\"\ncache_dir = \"bars\"\n").unwrap();

        let mut a = args();
        a.config = Some(path);
        assert_eq!(resolve_config(&a).unwrap().data.symbol, "SPY");

        a.symbol = Some("QQQ".into());
        a.cache_dir = Some(PathBuf::from("elsewhere"));
        let config = resolve_config(&a).unwrap();
        assert_eq!(config.data.symbol, "QQQ");
        assert_eq!(config.data.cache_dir, PathBuf::from("elsewhere"));
    }

    #[test]
    fn inverted_override_rejected() {
        let mut a = args();
        a.start = Some("2024-01-01".into());
        assert!(resolve_config(&a).is_err());
        a.start = Some("01/02/2023".into());
        assert!(resolve_config(&a).is_err());
    }

    #[test]
    fn export_format_from_extension() {
        assert_eq!(ExportFormat::for_path(Path::new("out.parquet")), ExportFormat::Parquet);
        assert_eq!(ExportFormat::for_path(Path::new("out.PARQUET")), ExportFormat::Parquet);
        assert_eq!(ExportFormat::for_path(Path::new("out.csv")), ExportFormat::Csv);
        assert_eq!(ExportFormat::for_path(Path::new("out")), ExportFormat::Csv);
    }

    #[test]
    fn stale_symbols_uses_fetch_time() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2023, 1, 31).unwrap();
        let raw = generate_synthetic_bars("AAPL", start, end);
        cache.write("AAPL", &raw, DataSource::YahooFinance).unwrap();

        let past = chrono::Local::now().naive_local() - chrono::Duration::days(1);
        assert!(stale_symbols(&cache, past).unwrap().is_empty());

        let future = chrono::Local::now().naive_local() + chrono::Duration::days(1);
        assert_eq!(stale_symbols(&cache, future).unwrap(), vec!["AAPL"]);
    }

    #[test]
    fn status_rows_cover_symbols_without_meta() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2023, 1, 31).unwrap();
        let raw = generate_synthetic_bars("AAPL", start, end);
        cache.write("AAPL", &raw, DataSource::YahooFinance).unwrap();
        std::fs::create_dir_all(cache.symbol_dir("MSFT")).unwrap();

        let symbols = cache.cached_symbols().unwrap();
        let rows = status_rows(&cache, &symbols);
        assert_eq!(rows.len(), 2);

        let (aapl, aapl_size) = &rows[0];
        assert_eq!(aapl.symbol, "AAPL");
        assert!(aapl.cached);
        assert_eq!(aapl.bar_count, Some(raw.len()));
        assert_eq!(aapl.start_date, Some(start));
        assert!(*aapl_size > 0);

        let (msft, msft_size) = &rows[1];
        assert_eq!(msft.symbol, "MSFT");
        assert!(!msft.cached);
        assert_eq!(msft.bar_count, None);
        assert_eq!(*msft_size, 0);
    }

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
