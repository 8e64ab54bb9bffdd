//! Batch ingestion pipeline: bounded worker pool feeding a single store
//! writer.
//!
//! Fetching is the only parallel section. Workers pull symbols from a shared
//! queue, fetch against the rate-limited upstream and sleep a fixed delay
//! after every call regardless of outcome. Results funnel over a channel to
//! the calling thread, which normalizes and upserts serially — the store
//! never sees concurrent writers. One symbol's failure is counted and
//! isolated; there is no global abort.

use crate::domain::error::ScreenerError;
use crate::domain::ingest::{normalize_batch, NormalizeSummary, PRIMARY_FIELD_MAP};
use crate::ports::source_port::{PrimarySource, RawBatch};
use crate::ports::store_port::PanelStore;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    pub workers: usize,
    /// Blocking wait after every upstream call, local to each worker.
    pub request_delay: Duration,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            request_delay: DEFAULT_REQUEST_DELAY,
        }
    }
}

/// Outcome of one batch run. Failures are per-symbol counts, never aborts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub fetched: usize,
    pub failed: usize,
    pub rows: NormalizeSummary,
}

/// Fetch and store the whole universe: membership list first, then every
/// symbol's daily rows through the worker pool.
pub fn run_ingest(
    source: &(dyn PrimarySource + Sync),
    store: &dyn PanelStore,
    opts: &IngestOptions,
) -> Result<IngestSummary, ScreenerError> {
    let universe = source.fetch_universe()?;
    store.upsert_symbols(&universe)?;
    info!("universe stored: {} symbol(s)", universe.len());

    let symbols: Vec<String> = universe.into_iter().map(|m| m.symbol).collect();
    Ok(ingest_symbols(source, store, &symbols, opts))
}

/// Ingest daily rows for the given symbols through the worker pool.
pub fn ingest_symbols(
    source: &(dyn PrimarySource + Sync),
    store: &dyn PanelStore,
    symbols: &[String],
    opts: &IngestOptions,
) -> IngestSummary {
    if symbols.is_empty() {
        return IngestSummary::default();
    }

    let next = AtomicUsize::new(0);
    let delay = opts.request_delay;
    let workers = opts.workers.max(1).min(symbols.len());
    let (tx, rx) = mpsc::channel::<(String, Result<RawBatch, ScreenerError>)>();

    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let next = &next;
            scope.spawn(move || {
                loop {
                    let i = next.fetch_add(1, Ordering::Relaxed);
                    let Some(symbol) = symbols.get(i) else { break };
                    let result = source.fetch_daily(symbol);
                    thread::sleep(delay);
                    if tx.send((symbol.clone(), result)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        let mut summary = IngestSummary::default();
        for (symbol, result) in rx {
            match result {
                Ok(batch) if batch.is_empty() => {
                    warn!("no data returned for {symbol}");
                    summary.failed += 1;
                }
                Ok(batch) => {
                    let (bars, rows) = normalize_batch(&symbol, &batch, &PRIMARY_FIELD_MAP);
                    match store.upsert_bars(&bars) {
                        Ok(written) => {
                            debug!("stored {written} row(s) for {symbol}");
                            summary.fetched += 1;
                            summary.rows.merge(rows);
                        }
                        Err(e) => {
                            warn!("store write failed for {symbol}: {e}");
                            summary.failed += 1;
                        }
                    }
                }
                Err(e) => {
                    warn!("fetch failed for {symbol}: {e}");
                    summary.failed += 1;
                }
            }
        }
        summary
    })
}

/// Single-symbol ingest; errors propagate since the caller asked for exactly
/// this symbol.
pub fn ingest_one(
    source: &dyn PrimarySource,
    store: &dyn PanelStore,
    symbol: &str,
) -> Result<NormalizeSummary, ScreenerError> {
    let batch = source.fetch_daily(symbol)?;
    let (bars, summary) = normalize_batch(symbol, &batch, &PRIMARY_FIELD_MAP);
    store.upsert_bars(&bars)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite_store::SqliteStore;
    use crate::domain::bar::SymbolMeta;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MockPrimary {
        batches: HashMap<String, RawBatch>,
        errors: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    impl MockPrimary {
        fn new() -> Self {
            Self {
                batches: HashMap::new(),
                errors: Vec::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_batch(mut self, symbol: &str, dates: &[&str]) -> Self {
            let headers = vec!["Date".to_string(), "Series".to_string(), "ClosePrice".to_string()];
            let rows = dates
                .iter()
                .map(|d| vec![d.to_string(), "EQ".to_string(), "100.00".to_string()])
                .collect();
            self.batches
                .insert(symbol.to_string(), RawBatch { headers, rows });
            self
        }

        fn with_error(mut self, symbol: &str) -> Self {
            self.errors.push(symbol.to_string());
            self
        }
    }

    impl PrimarySource for MockPrimary {
        fn fetch_universe(&self) -> Result<Vec<SymbolMeta>, ScreenerError> {
            let mut symbols: Vec<String> = self
                .batches
                .keys()
                .cloned()
                .chain(self.errors.iter().cloned())
                .collect();
            symbols.sort();
            Ok(symbols
                .into_iter()
                .map(|s| SymbolMeta {
                    company_name: format!("{s} Ltd"),
                    symbol: s,
                    lot_size: 100,
                    last_updated: None,
                })
                .collect())
        }

        fn fetch_daily(&self, symbol: &str) -> Result<RawBatch, ScreenerError> {
            self.calls.lock().unwrap().push(symbol.to_string());
            if self.errors.iter().any(|s| s == symbol) {
                return Err(ScreenerError::Source {
                    symbol: symbol.to_string(),
                    reason: "connection reset".into(),
                });
            }
            Ok(self.batches.get(symbol).cloned().unwrap_or_default())
        }
    }

    fn fast_opts() -> IngestOptions {
        IngestOptions {
            workers: 3,
            request_delay: Duration::from_millis(0),
        }
    }

    #[test]
    fn ingests_universe_and_counts_rows() {
        let source = MockPrimary::new()
            .with_batch("AAA", &["16-Jun-2025", "17-Jun-2025"])
            .with_batch("BBB", &["16-Jun-2025"]);
        let store = SqliteStore::in_memory().unwrap();
        store.initialize_schema().unwrap();

        let summary = run_ingest(&source, &store, &fast_opts()).unwrap();
        assert_eq!(summary.fetched, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.rows.kept, 3);
        assert_eq!(store.bar_count().unwrap(), 3);
        assert_eq!(store.symbol_count().unwrap(), 2);
    }

    #[test]
    fn one_failing_symbol_does_not_abort_the_batch() {
        let source = MockPrimary::new()
            .with_batch("AAA", &["16-Jun-2025"])
            .with_error("BAD")
            .with_batch("CCC", &["16-Jun-2025"]);
        let store = SqliteStore::in_memory().unwrap();
        store.initialize_schema().unwrap();

        let summary = run_ingest(&source, &store, &fast_opts()).unwrap();
        assert_eq!(summary.fetched, 2);
        assert_eq!(summary.failed, 1);
        // All three symbols were attempted.
        assert_eq!(source.calls.lock().unwrap().len(), 3);
        assert_eq!(store.bar_count().unwrap(), 2);
    }

    #[test]
    fn empty_batch_counts_as_failure() {
        let source = MockPrimary::new().with_batch("AAA", &[]);
        let store = SqliteStore::in_memory().unwrap();
        store.initialize_schema().unwrap();

        let summary = run_ingest(&source, &store, &fast_opts()).unwrap();
        assert_eq!(summary.fetched, 0);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn empty_symbol_list_is_a_noop() {
        let source = MockPrimary::new();
        let store = SqliteStore::in_memory().unwrap();
        store.initialize_schema().unwrap();

        let summary = ingest_symbols(&source, &store, &[], &fast_opts());
        assert_eq!(summary, IngestSummary::default());
    }

    #[test]
    fn ingest_one_returns_row_summary() {
        let source = MockPrimary::new().with_batch("AAA", &["16-Jun-2025", "bad-date"]);
        let store = SqliteStore::in_memory().unwrap();
        store.initialize_schema().unwrap();

        let summary = ingest_one(&source, &store, "AAA").unwrap();
        assert_eq!(summary.kept, 1);
        assert_eq!(summary.dropped_unparsable, 1);
    }

    #[test]
    fn more_workers_than_symbols_is_fine() {
        let source = MockPrimary::new().with_batch("AAA", &["16-Jun-2025"]);
        let store = SqliteStore::in_memory().unwrap();
        store.initialize_schema().unwrap();

        let opts = IngestOptions {
            workers: 16,
            request_delay: Duration::from_millis(0),
        };
        let summary = ingest_symbols(&source, &store, &["AAA".to_string()], &opts);
        assert_eq!(summary.fetched, 1);
    }
}
