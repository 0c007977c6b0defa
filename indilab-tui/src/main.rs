//! IndiLab TUI: load one ticker, analyze it, then show three stacked charts.

use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use indilab_core::analysis::analyze;
use indilab_core::config::AppConfig;
use indilab_core::data::{load_bars, DataProvider, LoadOptions, ParquetCache, YahooProvider};
use indilab_tui::{handle_key, ui, App};

#[derive(Parser)]
#[command(
    name = "indilab-tui",
    about = "Price with SMAs, RSI and OBV for one ticker in the terminal"
)]
struct Args {
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

    /// Compute buy flags and show their markers.
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
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_path = init_logging();

    let app = load_app(&args)?;

    // Install a panic hook that restores the terminal before printing the panic.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stderr(), LeaveAlternateScreen);
        default_hook(info);
    }));

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Some(path) = log_path {
        eprintln!("Log written to {}", path.display());
    }
    result
}

/// Log to a file in the platform cache dir so the terminal stays clean.
/// Returns `None` (no logging) if the file cannot be created.
fn init_logging() -> Option<PathBuf> {
    let dir = dirs::cache_dir()?.join("indilab");
    std::fs::create_dir_all(&dir).ok()?;
    let path = dir.join("indilab-tui.log");
    let file = std::fs::File::create(&path).ok()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Some(path)
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
}

/// Resolve config, load bars and run the analysis, all before the terminal opens.
fn load_app(args: &Args) -> Result<App> {
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

    let symbol = config.data.symbol.as_str();
    eprintln!(
        "Loading {symbol} ({} to {})...",
        config.data.start_date, config.data.end_date
    );

    let cache = ParquetCache::new(&config.data.cache_dir);
    let provider = if args.offline {
        None
    } else {
        Some(YahooProvider::new().context("failed to build HTTP client")?)
    };
    let opts = LoadOptions {
        start: config.data.start_date,
        end: config.data.end_date,
        offline: args.offline,
        synthetic: args.synthetic,
        force: false,
    };
    let loaded = load_bars(
        symbol,
        &cache,
        provider.as_ref().map(|p| p as &dyn DataProvider),
        &opts,
    )?;

    let settings = config.analysis_settings();
    let source = loaded.source;
    let table = analyze(loaded.bars, &settings)?;
    info!(symbol, rows = table.len(), source = source.label(), "table ready");

    Ok(App::new(table, settings, source))
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, mut app: App) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, &app))?;

        if event::poll(Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                handle_key(&mut app, key);
            }
        }

        if !app.running {
            break;
        }
    }
    Ok(())
}
