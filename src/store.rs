//! Series stores
//!
//! A store maps a ticker symbol to a [`Timeseries`]. All I/O happens here,
//! before the matching core is invoked.
//!
//! - [`CsvDirectoryStore`]: one CSV file per symbol in a directory
//! - [`MemoryStore`]: in-memory map, for tests and embedding

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::{MatchError, Timeseries};

// ============================================================
// ERRORS
// ============================================================

/// Errors raised while locating or loading a series
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("No data for symbol '{0}'")]
    NotFound(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Column '{column}' missing from {path}")]
    MissingColumn { column: String, path: PathBuf },

    #[error("Unparseable timestamp '{value}' on line {line} of {path}")]
    BadTimestamp {
        value: String,
        line: u64,
        path: PathBuf,
    },

    #[error("Unparseable value '{value}' on line {line} of {path}")]
    BadValue {
        value: String,
        line: u64,
        path: PathBuf,
    },

    #[error(transparent)]
    Series(#[from] MatchError),
}

// ============================================================
// STORE TRAIT
// ============================================================

/// Symbol -> series lookup
pub trait SeriesStore {
    /// Load the series for `symbol`; [`StoreError::NotFound`] when unknown.
    fn get(&self, symbol: &str) -> Result<Timeseries, StoreError>;

    /// Every symbol the store can serve
    fn list(&self) -> BTreeSet<String>;
}

// ============================================================
// TIMESTAMP PARSING
// ============================================================

const DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

// Integers above this are taken to be epoch milliseconds
const EPOCH_MS_THRESHOLD: i64 = 100_000_000_000;

/// Parse a CSV timestamp cell.
///
/// Accepts epoch seconds (or milliseconds), RFC 3339 (converted to UTC),
/// `YYYY-MM-DD HH:MM:SS[.fff]`, `YYYY-MM-DDTHH:MM:SS[.fff]`,
/// `YYYY-MM-DD HH:MM` and plain dates (midnight).
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(epoch) = raw.parse::<i64>() {
        let dt = if epoch.abs() >= EPOCH_MS_THRESHOLD {
            DateTime::from_timestamp_millis(epoch)
        } else {
            DateTime::from_timestamp(epoch, 0)
        };
        return dt.map(|d| d.naive_utc());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

// ============================================================
// CSV DIRECTORY STORE
// ============================================================

/// Every `<SYMBOL>.csv` file in a directory, read on demand.
#[derive(Debug, Clone)]
pub struct CsvDirectoryStore {
    dir: PathBuf,
    time_column: String,
    value_column: String,
    symbols: BTreeSet<String>,
}

impl CsvDirectoryStore {
    pub const DEFAULT_TIME_COLUMN: &'static str = "time";
    pub const DEFAULT_VALUE_COLUMN: &'static str = "open";

    /// Scan `dir` for CSV files. Files are not read until requested.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        let io_err = |source| StoreError::Io {
            path: dir.clone(),
            source,
        };

        let mut symbols = BTreeSet::new();
        for entry in fs::read_dir(&dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let is_csv = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if !is_csv || !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                symbols.insert(stem.to_string());
            }
        }

        log::debug!("{}: {} symbols", dir.display(), symbols.len());
        Ok(Self {
            dir,
            time_column: Self::DEFAULT_TIME_COLUMN.to_string(),
            value_column: Self::DEFAULT_VALUE_COLUMN.to_string(),
            symbols,
        })
    }

    /// Header of the timestamp column
    pub fn time_column(mut self, column: impl Into<String>) -> Self {
        self.time_column = column.into();
        self
    }

    /// Header of the value column (e.g. `open`, `close`)
    pub fn value_column(mut self, column: impl Into<String>) -> Self {
        self.value_column = column.into();
        self
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol))
    }

    fn column_index(&self, headers: &csv::StringRecord, column: &str, path: &Path) -> Result<usize, StoreError> {
        headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| StoreError::MissingColumn {
                column: column.to_string(),
                path: path.to_path_buf(),
            })
    }

    fn read(&self, path: &Path) -> Result<Timeseries, StoreError> {
        let csv_err = |source| StoreError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(csv_err)?;
        let headers = reader.headers().map_err(csv_err)?.clone();
        let time_idx = self.column_index(&headers, &self.time_column, path)?;
        let value_idx = self.column_index(&headers, &self.value_column, path)?;

        let mut timestamps = Vec::new();
        let mut values = Vec::new();
        let mut skipped = 0usize;

        for record in reader.records() {
            let record = record.map_err(csv_err)?;
            let line = record.position().map_or(0, |p| p.line());

            let raw_value = record.get(value_idx).unwrap_or_default();
            if raw_value.is_empty() {
                skipped += 1;
                continue;
            }
            let value = raw_value.parse::<f64>().map_err(|_| StoreError::BadValue {
                value: raw_value.to_string(),
                line,
                path: path.to_path_buf(),
            })?;

            let raw_time = record.get(time_idx).unwrap_or_default();
            let ts = parse_timestamp(raw_time).ok_or_else(|| StoreError::BadTimestamp {
                value: raw_time.to_string(),
                line,
                path: path.to_path_buf(),
            })?;

            timestamps.push(ts);
            values.push(value);
        }

        if skipped > 0 {
            log::warn!("{}: skipped {} rows with no '{}' value", path.display(), skipped, self.value_column);
        }

        Ok(Timeseries::new(timestamps, values)?)
    }
}

impl SeriesStore for CsvDirectoryStore {
    fn get(&self, symbol: &str) -> Result<Timeseries, StoreError> {
        if !self.symbols.contains(symbol) {
            return Err(StoreError::NotFound(symbol.to_string()));
        }
        let path = self.path_for(symbol);
        let series = self.read(&path)?;
        log::trace!("{}: loaded {} values from {}", symbol, series.len(), path.display());
        Ok(series)
    }

    fn list(&self) -> BTreeSet<String> {
        self.symbols.clone()
    }
}

// ============================================================
// MEMORY STORE
// ============================================================

/// Series held in memory, keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    series: BTreeMap<String, Timeseries>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: impl Into<String>, series: Timeseries) -> Option<Timeseries> {
        self.series.insert(symbol.into(), series)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Timeseries)> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = (S, Timeseries)>>(iter: I) -> Self {
        Self {
            series: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl SeriesStore for MemoryStore {
    fn get(&self, symbol: &str) -> Result<Timeseries, StoreError> {
        self.series
            .get(symbol)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(symbol.to_string()))
    }

    fn list(&self) -> BTreeSet<String> {
        self.series.keys().cloned().collect()
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(dir: &Path, name: &str, body: &str) {
        let mut f = fs::File::create(dir.join(name)).unwrap();
        f.write_all(body.as_bytes()).unwrap();
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let midnight = date(2021, 1, 4).and_hms_opt(0, 0, 0).unwrap();
        let nine = date(2021, 1, 4).and_hms_opt(9, 30, 0).unwrap();

        assert_eq!(parse_timestamp("1609718400"), Some(midnight));
        assert_eq!(parse_timestamp("1609718400000"), Some(midnight));
        assert_eq!(parse_timestamp("2021-01-04"), Some(midnight));
        assert_eq!(parse_timestamp("2021-01-04 09:30:00"), Some(nine));
        assert_eq!(parse_timestamp("2021-01-04T09:30:00"), Some(nine));
        assert_eq!(parse_timestamp("2021-01-04 09:30"), Some(nine));
        assert_eq!(parse_timestamp("2021-01-04T09:30:00Z"), Some(nine));
        assert_eq!(parse_timestamp("2021-01-04T10:30:00+01:00"), Some(nine));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_csv_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "AAA.csv",
            "time,open,close\n2021-01-04,10.0,11.0\n2021-01-05,10.5,10.0\n2021-01-06,11.0,12.0\n",
        );
        write(dir.path(), "BBB.csv", "time,open\n1609718400,1.0\n");
        write(dir.path(), "notes.txt", "ignored");

        let store = CsvDirectoryStore::open(dir.path()).unwrap();
        assert_eq!(
            store.list().into_iter().collect::<Vec<_>>(),
            vec!["AAA".to_string(), "BBB".to_string()]
        );

        let open = store.get("AAA").unwrap();
        assert_eq!(open.values(), &[10.0, 10.5, 11.0]);
        assert_eq!(open.timestamps()[0], date(2021, 1, 4).and_hms_opt(0, 0, 0).unwrap());

        let close = store.clone().value_column("close").get("AAA").unwrap();
        assert_eq!(close.values(), &[11.0, 10.0, 12.0]);
    }

    #[test]
    fn test_csv_store_errors() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "NOCOL.csv", "time,close\n2021-01-04,1.0\n");
        write(dir.path(), "BADTS.csv", "time,open\nsoon,1.0\n");
        write(dir.path(), "BADVAL.csv", "time,open\n2021-01-04,abc\n");
        write(dir.path(), "BACKWARDS.csv", "time,open\n2021-01-05,1.0\n2021-01-04,2.0\n");

        let store = CsvDirectoryStore::open(dir.path()).unwrap();
        assert!(matches!(store.get("NOPE"), Err(StoreError::NotFound(_))));
        assert!(matches!(store.get("NOCOL"), Err(StoreError::MissingColumn { .. })));
        assert!(matches!(store.get("BADTS"), Err(StoreError::BadTimestamp { line: 2, .. })));
        assert!(matches!(store.get("BADVAL"), Err(StoreError::BadValue { .. })));
        assert!(matches!(
            store.get("BACKWARDS"),
            Err(StoreError::Series(MatchError::NonMonotonicIndex { index: 1 }))
        ));
    }

    #[test]
    fn test_csv_store_skips_empty_values() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "GAP.csv", "time,open\n2021-01-04,1.0\n2021-01-05,\n2021-01-06,3.0\n");
        let store = CsvDirectoryStore::open(dir.path()).unwrap();
        assert_eq!(store.get("GAP").unwrap().values(), &[1.0, 3.0]);
    }

    #[test]
    fn test_open_missing_dir() {
        assert!(matches!(
            CsvDirectoryStore::open("/definitely/not/here"),
            Err(StoreError::Io { .. })
        ));
    }

    #[test]
    fn test_memory_store() {
        let t = date(2021, 1, 4).and_hms_opt(0, 0, 0).unwrap();
        let series = Timeseries::new(vec![t], vec![1.0]).unwrap();
        let store: MemoryStore = [("X", series.clone())].into_iter().collect();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("X").unwrap(), series);
        assert!(matches!(store.get("Y"), Err(StoreError::NotFound(_))));
        assert!(store.list().contains("X"));
    }
}
