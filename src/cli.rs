//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use crate::adapters::csv_source::CsvSourceDir;
use crate::adapters::ini_config::IniConfig;
use crate::adapters::sqlite_store::SqliteStore;
use crate::domain::error::ScreenerError;
use crate::domain::pipeline::{self, IngestOptions};
use crate::domain::reconcile;
use crate::domain::screen;
use crate::domain::screen_eval;
use crate::domain::snapshot::{index_one_year_return, symbol_overview};
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::PanelStore;

pub const DEFAULT_BENCHMARK: &str = "NIFTY 50";

#[derive(Parser, Debug)]
#[command(name = "fnoscreen", about = "F&O stock panel screener")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ingest the universe (or one symbol) from the primary source
    Ingest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Detect corporate-action artifacts and repair from the adjusted source
    Reconcile {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Run a screen against the latest trading date
    Screen {
        id: String,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List the screen catalog
    Screens,
    /// Show store statistics
    Stats {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range and indicator overview for a symbol
    Info {
        #[arg(long)]
        symbol: String,
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Ingest { config, symbol } => run_ingest(&config, symbol.as_deref()),
        Command::Reconcile { config } => run_reconcile(&config),
        Command::Screen { id, config } => run_screen(&id, &config),
        Command::Screens => run_screens(),
        Command::Stats { config } => run_stats(&config),
        Command::Info { symbol, config } => run_info(&symbol, &config),
    }
}

fn load_config(path: &PathBuf) -> Result<IniConfig, ExitCode> {
    IniConfig::load(path).map_err(|e| {
        let err = ScreenerError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn open_store(config: &IniConfig) -> Result<SqliteStore, ExitCode> {
    let store = SqliteStore::from_config(config).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })?;
    store.initialize_schema().map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })?;
    Ok(store)
}

fn open_source(config: &IniConfig) -> Result<CsvSourceDir, ExitCode> {
    match config.get_string("ingest", "data_dir") {
        Some(dir) => Ok(CsvSourceDir::new(PathBuf::from(dir))),
        None => {
            let err = ScreenerError::ConfigMissing {
                section: "ingest".into(),
                key: "data_dir".into(),
            };
            eprintln!("error: {err}");
            Err(ExitCode::from(&err))
        }
    }
}

pub fn benchmark_name(config: &dyn ConfigPort) -> String {
    config
        .get_string("benchmark", "index_name")
        .unwrap_or_else(|| DEFAULT_BENCHMARK.to_string())
}

pub fn ingest_options(config: &dyn ConfigPort) -> IngestOptions {
    let defaults = IngestOptions::default();
    IngestOptions {
        workers: config.get_int("ingest", "workers", defaults.workers as i64) as usize,
        request_delay: Duration::from_millis(config.get_int(
            "ingest",
            "request_delay_ms",
            defaults.request_delay.as_millis() as i64,
        ) as u64),
    }
}

pub fn cutover_date(config: &dyn ConfigPort) -> Result<NaiveDate, ScreenerError> {
    let raw = config
        .get_string("reconcile", "cutover_date")
        .ok_or_else(|| ScreenerError::ConfigMissing {
            section: "reconcile".into(),
            key: "cutover_date".into(),
        })?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| ScreenerError::ConfigInvalid {
        section: "reconcile".into(),
        key: "cutover_date".into(),
        reason: "invalid date format (expected YYYY-MM-DD)".into(),
    })
}

fn run_ingest(config_path: &PathBuf, symbol: Option<&str>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let store = match open_store(&config) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let source = match open_source(&config) {
        Ok(s) => s,
        Err(code) => return code,
    };

    if let Some(symbol) = symbol {
        let symbol = symbol.to_uppercase();
        eprintln!("Ingesting {symbol}...");
        return match pipeline::ingest_one(&source, &store, &symbol) {
            Ok(rows) => {
                eprintln!(
                    "{}: {} row(s) stored, {} dropped",
                    symbol,
                    rows.kept,
                    rows.dropped_unparsable + rows.dropped_series
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::from(&e)
            }
        };
    }

    let opts = ingest_options(&config);
    eprintln!("Ingesting universe ({} workers)...", opts.workers);
    match pipeline::run_ingest(&source, &store, &opts) {
        Ok(summary) => {
            eprintln!("\n=== Ingest Summary ===");
            eprintln!("Fetched:        {}", summary.fetched);
            eprintln!("Failed:         {}", summary.failed);
            eprintln!("Rows stored:    {}", summary.rows.kept);
            eprintln!("Rows dropped:   {}", summary.rows.dropped_unparsable);
            eprintln!("Series dropped: {}", summary.rows.dropped_series);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn run_reconcile(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let store = match open_store(&config) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let source = match open_source(&config) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let cutover = match cutover_date(&config) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };

    if config.get_bool("reconcile", "refresh_index", true) {
        let benchmark = benchmark_name(&config);
        eprintln!("Refreshing {benchmark} history...");
        match reconcile::refresh_benchmark(&store, &source, &benchmark, cutover) {
            Ok(n) => eprintln!("  {n} index bar(s) stored"),
            Err(e) => eprintln!("warning: index refresh failed ({e})"),
        }
    }

    eprintln!("Scanning for corporate-action artifacts...");
    match reconcile::reconcile(&store, &source, cutover) {
        Ok(report) => {
            eprintln!("\n=== Reconcile Report ===");
            eprintln!("Flagged:  {}", report.flagged.join(", "));
            eprintln!("Repaired: {}", report.repaired.join(", "));
            eprintln!("Failed:   {}", report.failed.join(", "));
            if report.remaining.is_empty() {
                eprintln!("No OHLC bounds violations remain");
            } else {
                for v in &report.remaining {
                    eprintln!("  {}: {} row(s) still out of bounds", v.symbol, v.rows);
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn run_screen(id: &str, config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let store = match open_store(&config) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let benchmark = benchmark_name(&config);

    let output = match screen_eval::run_screen(&store, id, &benchmark) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };

    eprintln!("{}: {} result(s)", output.screen, output.count);
    for row in &output.results {
        let mut line = format!(
            "{:<12} {:>10.2} {:>7.2}%",
            row.symbol, row.close, row.change_pct
        );
        if let Some(strength) = row.strength {
            line.push_str(&format!("  {strength}"));
        }
        if let Some(mult) = row.volume_mult {
            line.push_str(&format!("  {mult:.2}x vol"));
        }
        if let Some(rel) = row.relative_return {
            line.push_str(&format!("  {rel:.2}% rel"));
        }
        if let Some(mult) = row.delivery_mult {
            line.push_str(&format!("  {mult:.2}x dlv"));
        }
        println!("{line}");
    }
    ExitCode::SUCCESS
}

fn run_screens() -> ExitCode {
    for spec in screen::CATALOG {
        println!("{:<28} {}", spec.id, spec.title);
        println!("{:<28} {}", "", spec.description);
    }
    ExitCode::SUCCESS
}

fn run_stats(config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let store = match open_store(&config) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let result = (|| -> Result<(), ScreenerError> {
        println!("F&O Symbols:   {}", store.symbol_count()?);
        println!("Panel Rows:    {}", store.bar_count()?);
        match store.date_range()? {
            Some((min, max)) => println!("Date Range:    {min} to {max}"),
            None => println!("Date Range:    (empty)"),
        }
        if let Some(latest) = store.latest_date()? {
            println!("Advancing:     {}", store.positive_count(latest)?);
        }
        Ok(())
    })();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn run_info(symbol: &str, config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let store = match open_store(&config) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let symbol = symbol.to_uppercase();
    let benchmark = benchmark_name(&config);

    let result = (|| -> Result<(), ScreenerError> {
        let bars = store.fetch_series(&symbol)?;
        if bars.is_empty() {
            return Err(ScreenerError::NoData { symbol: symbol.clone() });
        }
        let meta = store
            .symbol_meta(&symbol)?
            .unwrap_or_else(|| crate::domain::bar::SymbolMeta {
                symbol: symbol.clone(),
                company_name: String::new(),
                lot_size: 0,
                last_updated: None,
            });
        let benchmark_1y = index_one_year_return(&store.fetch_index_series(&benchmark)?);

        println!(
            "{}: {} bar(s), {} to {}",
            symbol,
            bars.len(),
            bars.first().map(|b| b.date.to_string()).unwrap_or_default(),
            bars.last().map(|b| b.date.to_string()).unwrap_or_default(),
        );
        if !meta.company_name.is_empty() {
            println!("Company:       {} (lot {})", meta.company_name, meta.lot_size);
        }

        if let Some(ov) = symbol_overview(meta, &bars, benchmark_1y) {
            let snap = &ov.snapshot;
            println!("Close:         {:.2}", snap.bar.close);
            if let Some(chg) = snap.change_pct {
                println!("Change:        {chg:.2}%");
            }
            println!(
                "SMA 20/50/200: {:.2} / {:.2} / {:.2}",
                snap.sma_20, snap.sma_50, snap.sma_200
            );
            println!("ATR 14:        {:.2}", snap.atr_14);
            println!("52w High:      {:.2}", snap.high_52w);
            if let Some(delta) = snap.delta_52w_high {
                println!("From 52w High: {delta:.2}%");
            }
            for (label, value) in [
                ("YTD", snap.ytd_pct),
                ("1M", snap.pct_1m),
                ("1Y", snap.pct_1y),
                ("RS Rank", ov.rs_rank),
            ] {
                if let Some(v) = value {
                    println!("{label}:           {v:.2}%");
                }
            }
        }
        Ok(())
    })();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}
