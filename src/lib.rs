//! # shapefinder - chart-pattern search over historical price series
//!
//! Finds where a predefined shape (a triangle, wedge, rectangle, ...)
//! occurs in a price series under an offset-invariant, multi-scale
//! similarity measure, then collects what price did shortly afterwards.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{Duration, NaiveDate};
//! use shapefinder::prelude::*;
//!
//! // Daily series containing the bearish symmetric triangle at day 3
//! let t0 = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let mut prices = vec![100.0, 101.0, 99.5];
//! prices.extend(NamedPattern::SymTriangleBear.values().iter().map(|v| v * 98.0));
//! prices.extend([97.0, 96.0, 95.5]);
//! let times = (0..prices.len()).map(|i| t0 + Duration::days(i as i64)).collect();
//! let series = Timeseries::new(times, prices).unwrap();
//!
//! let engine = EngineBuilder::new()
//!     .named_pattern(NamedPattern::SymTriangleBear)
//!     .tolerance(0.0105)
//!     .scales([1])
//!     .scaled_steps(2)
//!     .build()
//!     .unwrap();
//!
//! let report = engine.analyse(&series).unwrap();
//! assert_eq!(report.matches[0].timestamp, t0 + Duration::days(3));
//! ```

pub mod aggregate;
pub mod matching;
pub mod patterns;
pub mod store;

pub mod prelude {
    pub use crate::{
        // Aggregation
        aggregate::{AggregateRow, AggregateView, Aggregator},
        // Core components
        matching::*,
        // Pattern library
        patterns::{rectangle, triangle, NamedPattern, Pattern, LONG_SCALES, SHORT_SCALES},
        // Parallel
        scan_parallel,
        // Series store
        store::{CsvDirectoryStore, MemoryStore, SeriesStore, StoreError},
        // Types
        Aftermath,
        // Engine
        EngineBuilder,
        EngineConfig,
        Match,
        // Errors
        MatchError,
        Result,
        Scale,
        ScaleOutcome,
        ScanError,
        ScanFailure,
        ScanResult,
        SearchEngine,
        SeriesReport,
        Timeseries,
        Tolerance,
    };
}

use chrono::NaiveDateTime;

use matching::{
    initial_diff_match, initial_diff_match_parallel, poi_afterwards, purge_date_repeats,
    DayBoundary, Timestamped,
};
use patterns::{NamedPattern, Pattern};

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, MatchError>;

/// Precondition failures: malformed input or configuration. Never retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatchError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: need {need} values, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Timestamp {0} not found in series")]
    TimestampNotFound(NaiveDateTime),

    #[error("Series index not strictly increasing at position {index}")]
    NonMonotonicIndex { index: usize },

    #[error("Series has {timestamps} timestamps but {values} values")]
    LengthMismatch { timestamps: usize, values: usize },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Half-width of the open acceptance band `(-tolerance, tolerance)`.
/// Finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Tolerance(f64);

impl Tolerance {
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(MatchError::InvalidValue(
                "Tolerance cannot be NaN or infinite",
            ));
        }
        if value < 0.0 {
            return Err(MatchError::OutOfRange {
                field: "Tolerance",
                value,
                min: 0.0,
                max: f64::MAX,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Tolerance {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Tolerance {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Tolerance::new(value).map_err(serde::de::Error::custom)
    }
}

/// Series timesteps per pattern segment (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Scale(usize);

impl Scale {
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(MatchError::InvalidValue("Scale must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Scale {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Scale {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Scale::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// TIMESERIES
// ============================================================

/// Values indexed by strictly increasing, unique timestamps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeseries {
    timestamps: Vec<NaiveDateTime>,
    values: Vec<f64>,
}

impl Timeseries {
    pub fn new(timestamps: Vec<NaiveDateTime>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(MatchError::LengthMismatch {
                timestamps: timestamps.len(),
                values: values.len(),
            });
        }
        if let Some(i) = timestamps.windows(2).position(|w| w[0] >= w[1]) {
            return Err(MatchError::NonMonotonicIndex { index: i + 1 });
        }
        Ok(Self { timestamps, values })
    }

    /// Copy with the natural log applied to every value (prices must be > 0).
    pub fn ln(&self) -> Result<Self> {
        if self.values.iter().any(|&v| !v.is_finite() || v <= 0.0) {
            return Err(MatchError::InvalidValue(
                "Cannot take the log of a non-positive or non-finite series value",
            ));
        }
        Ok(Self {
            timestamps: self.timestamps.clone(),
            values: self.values.iter().map(|v| v.ln()).collect(),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Index of `ts` in the series, if present.
    #[inline]
    pub fn position(&self, ts: NaiveDateTime) -> Option<usize> {
        self.timestamps.binary_search(&ts).ok()
    }

    pub fn get(&self, ts: NaiveDateTime) -> Option<f64> {
        self.position(ts).map(|i| self.values[i])
    }
}

// ============================================================
// MATCH / AFTERMATH - results of a search
// ============================================================

/// A window that stayed inside the tolerance band of the scaled pattern.
/// Scale is part of the identity: one timestamp may match at several scales.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Match {
    pub timestamp: NaiveDateTime,
    pub scale: Scale,
    /// Signed sum of (window - pattern) differences
    pub score: f64,
}

impl Timestamped for Match {
    #[inline]
    fn anchor(&self) -> NaiveDateTime {
        self.timestamp
    }
}

/// Series values starting at a point of interest.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Aftermath {
    pub anchor: NaiveDateTime,
    pub values: Vec<f64>,
}

impl Timestamped for Aftermath {
    #[inline]
    fn anchor(&self) -> NaiveDateTime {
        self.anchor
    }
}

/// Deduplicated matches of one scale and what followed each of them.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ScaleOutcome {
    pub scale: Scale,
    pub matches: Vec<Match>,
    pub aftermaths: Vec<Aftermath>,
}

/// Everything one series produced.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct SeriesReport {
    /// Raw matches over all scales, before deduplication
    pub matches: Vec<Match>,
    pub outcomes: Vec<ScaleOutcome>,
}

impl SeriesReport {
    pub fn aftermath_count(&self) -> usize {
        self.outcomes.iter().map(|o| o.aftermaths.len()).sum()
    }

    pub fn outcome(&self, scale: Scale) -> Option<&ScaleOutcome> {
        self.outcomes.iter().find(|o| o.scale == scale)
    }
}

// ============================================================
// SEARCH ENGINE
// ============================================================

/// Search configuration. Loadable from JSON; every field has a default.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pattern: NamedPattern,
    /// Search the log of the pattern rather than the raw values
    pub log_pattern: bool,
    /// Take the log of every series before searching it
    pub log_prices: bool,
    pub tolerance: Tolerance,
    pub scales: Vec<Scale>,
    /// Aftermath length in pattern segments; multiplied by the scale
    pub scaled_steps: usize,
    pub day_boundary: DayBoundary,
    /// Search the scales of one series in parallel
    pub parallel_scales: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pattern: NamedPattern::SymTriangleBear,
            log_pattern: true,
            log_prices: true,
            tolerance: Tolerance::new_const(0.0105),
            scales: patterns::LONG_SCALES.map(Scale::new_const).to_vec(),
            scaled_steps: 10,
            day_boundary: DayBoundary::naive(),
            parallel_scales: false,
        }
    }
}

/// Matcher, deduplicator and outcome extractor wired together for one
/// pattern and configuration.
#[derive(Debug, Clone)]
pub struct SearchEngine {
    pattern: Pattern,
    config: EngineConfig,
}

impl SearchEngine {
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        EngineBuilder::from_config(config).build()
    }

    /// The pattern exactly as searched (log-transformed when configured).
    #[inline]
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Raw matches over every configured scale. `series` is searched as-is.
    pub fn find_matches(&self, series: &Timeseries) -> Result<Vec<Match>> {
        let c = &self.config;
        if c.parallel_scales {
            initial_diff_match_parallel(series, self.pattern.values(), c.tolerance, &c.scales)
        } else {
            initial_diff_match(series, self.pattern.values(), c.tolerance, &c.scales)
        }
    }

    /// Full pipeline for one series: match, deduplicate per scale, extract
    /// aftermaths of `scaled_steps * scale` values.
    pub fn analyse(&self, series: &Timeseries) -> Result<SeriesReport> {
        let transformed;
        let series = if self.config.log_prices {
            transformed = series.ln()?;
            &transformed
        } else {
            series
        };

        let matches = self.find_matches(series)?;

        let mut outcomes = Vec::with_capacity(self.config.scales.len());
        for &scale in &self.config.scales {
            let at_scale: Vec<Match> = matches
                .iter()
                .filter(|m| m.scale == scale)
                .copied()
                .collect();
            let kept = purge_date_repeats(at_scale, self.config.day_boundary);
            let steps = self.config.scaled_steps.saturating_mul(scale.get());
            let aftermaths = poi_afterwards(series, &kept, steps)?;
            outcomes.push(ScaleOutcome {
                scale,
                matches: kept,
                aftermaths,
            });
        }

        Ok(SeriesReport { matches, outcomes })
    }

    /// Aggregator sized for this engine's scales and aftermath length.
    pub fn aggregator(&self) -> Result<aggregate::Aggregator> {
        aggregate::Aggregator::new(&self.config.scales, self.config.scaled_steps)
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for [`SearchEngine`]. Values are validated in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct EngineBuilder {
    config: EngineConfig,
    custom_pattern: Option<Pattern>,
    tolerance: f64,
    scales: Vec<usize>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::from_config(EngineConfig::default())
    }

    pub fn from_config(config: EngineConfig) -> Self {
        Self {
            tolerance: config.tolerance.get(),
            scales: config.scales.iter().map(|s| s.get()).collect(),
            custom_pattern: None,
            config,
        }
    }

    /// Search one of the library formations
    pub fn named_pattern(mut self, pattern: NamedPattern) -> Self {
        self.config.pattern = pattern;
        self.custom_pattern = None;
        self
    }

    /// Search an arbitrary sequence instead of a library formation
    pub fn pattern(mut self, pattern: Pattern) -> Self {
        self.custom_pattern = Some(pattern);
        self
    }

    pub fn log_pattern(mut self, enable: bool) -> Self {
        self.config.log_pattern = enable;
        self
    }

    pub fn log_prices(mut self, enable: bool) -> Self {
        self.config.log_prices = enable;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn scales(mut self, scales: impl IntoIterator<Item = usize>) -> Self {
        self.scales = scales.into_iter().collect();
        self
    }

    pub fn scaled_steps(mut self, steps: usize) -> Self {
        self.config.scaled_steps = steps;
        self
    }

    pub fn day_boundary(mut self, boundary: DayBoundary) -> Self {
        self.config.day_boundary = boundary;
        self
    }

    pub fn parallel_scales(mut self, enable: bool) -> Self {
        self.config.parallel_scales = enable;
        self
    }

    /// Validate and build the engine
    pub fn build(self) -> Result<SearchEngine> {
        let mut config = self.config;
        config.tolerance = Tolerance::new(self.tolerance)?;
        config.scales = patterns::scales(&self.scales)?;

        if config.scales.is_empty() {
            return Err(MatchError::InvalidConfig(
                "at least one scale is required".to_string(),
            ));
        }
        let mut seen = config.scales.clone();
        seen.sort_unstable();
        if let Some(w) = seen.windows(2).find(|w| w[0] == w[1]) {
            return Err(MatchError::InvalidConfig(format!(
                "scale {} listed twice",
                w[0].get()
            )));
        }
        if config.scaled_steps == 0 {
            return Err(MatchError::InvalidValue("scaled_steps must be >= 1"));
        }

        let pattern = match self.custom_pattern {
            Some(p) => p,
            None => config.pattern.pattern(),
        };
        let pattern = if config.log_pattern {
            pattern.ln()?
        } else {
            pattern
        };

        log::debug!(
            "engine: pattern {} ({} points), tolerance {}, scales {:?}",
            pattern.name(),
            pattern.len(),
            config.tolerance.get(),
            self.scales
        );

        Ok(SearchEngine { pattern, config })
    }
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

use rayon::prelude::*;
use store::{SeriesStore, StoreError};

/// Result of analysing a single symbol
#[derive(Debug)]
pub struct ScanResult {
    pub symbol: String,
    pub report: SeriesReport,
}

/// Why a single symbol could not be analysed
#[derive(Debug, thiserror::Error)]
pub enum ScanFailure {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Match(#[from] MatchError),
}

/// Error from analysing a single symbol
#[derive(Debug)]
pub struct ScanError {
    pub symbol: String,
    pub error: ScanFailure,
}

/// Load and analyse every symbol in parallel. One symbol failing does not
/// stop the others.
pub fn scan_parallel<S, I>(
    engine: &SearchEngine,
    store: &S,
    symbols: I,
) -> (Vec<ScanResult>, Vec<ScanError>)
where
    S: SeriesStore + Sync,
    I: IntoParallelIterator,
    I::Item: AsRef<str>,
{
    let results: Vec<_> = symbols
        .into_par_iter()
        .map(|symbol| {
            let symbol = symbol.as_ref();
            store
                .get(symbol)
                .map_err(ScanFailure::from)
                .and_then(|series| engine.analyse(&series).map_err(ScanFailure::from))
                .map(|report| ScanResult {
                    symbol: symbol.to_string(),
                    report,
                })
                .map_err(|error| ScanError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => {
                log::debug!(
                    "{}: {} matches, {} aftermaths",
                    r.symbol,
                    r.report.matches.len(),
                    r.report.aftermath_count()
                );
                successes.push(r)
            }
            Err(e) => {
                log::warn!("{}: skipped ({})", e.symbol, e.error);
                errors.push(e)
            }
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{Duration, NaiveDate};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn hourly(values: Vec<f64>) -> Timeseries {
        let ts = (0..values.len())
            .map(|i| t0() + Duration::hours(i as i64))
            .collect();
        Timeseries::new(ts, values).unwrap()
    }

    /// Flat price with the bearish symmetric triangle embedded at `at`.
    fn with_triangle(len: usize, at: usize) -> Vec<f64> {
        let mut v = vec![50.0; len];
        for (i, p) in NamedPattern::SymTriangleBear.values().iter().enumerate() {
            v[at + i] = 50.0 * p;
        }
        v
    }

    #[test]
    fn test_tolerance_validation() {
        assert!(Tolerance::new(0.0).is_ok());
        assert!(Tolerance::new(0.5).is_ok());
        assert!(Tolerance::new(-0.1).is_err());
        assert!(Tolerance::new(f64::NAN).is_err());
        assert!(Tolerance::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_scale_validation() {
        assert!(Scale::new(1).is_ok());
        assert!(Scale::new(60).is_ok());
        assert!(Scale::new(0).is_err());
    }

    #[test]
    fn test_timeseries_validation() {
        let a = t0();
        let b = t0() + Duration::hours(1);
        assert!(Timeseries::new(vec![a, b], vec![1.0, 2.0]).is_ok());
        assert!(matches!(
            Timeseries::new(vec![a, b], vec![1.0]),
            Err(MatchError::LengthMismatch { .. })
        ));
        assert!(matches!(
            Timeseries::new(vec![b, a], vec![1.0, 2.0]),
            Err(MatchError::NonMonotonicIndex { index: 1 })
        ));
        assert!(Timeseries::new(vec![a, a], vec![1.0, 2.0]).is_err());
        assert!(Timeseries::new(vec![], vec![]).unwrap().is_empty());
    }

    #[test]
    fn test_timeseries_lookup_and_log() {
        let s = hourly(vec![1.0, std::f64::consts::E]);
        assert_eq!(s.position(t0() + Duration::hours(1)), Some(1));
        assert_eq!(s.get(t0() + Duration::minutes(1)), None);
        let l = s.ln().unwrap();
        assert!((l.values()[1] - 1.0).abs() < 1e-12);
        assert!(hourly(vec![1.0, 0.0]).ln().is_err());
        assert!(hourly(vec![1.0, f64::NAN]).ln().is_err());
        assert!(hourly(vec![1.0, f64::INFINITY]).ln().is_err());
    }

    #[test]
    fn test_config_defaults() {
        let c = EngineConfig::default();
        assert_eq!(c.pattern, NamedPattern::SymTriangleBear);
        assert_eq!(c.tolerance.get(), 0.0105);
        assert_eq!(c.scaled_steps, 10);
        assert_eq!(c.scales.iter().map(|s| s.get()).collect::<Vec<_>>(), vec![20, 30, 40, 50, 60]);
        assert!(SearchEngine::from_config(c).is_ok());
    }

    #[test]
    fn test_builder_validation() {
        assert!(EngineBuilder::new().tolerance(-1.0).build().is_err());
        assert!(EngineBuilder::new().scales([]).build().is_err());
        assert!(EngineBuilder::new().scales([2, 0]).build().is_err());
        assert!(EngineBuilder::new().scales([2, 4, 2]).build().is_err());
        assert!(EngineBuilder::new().scaled_steps(0).build().is_err());
        // Log of a pattern crossing zero
        let p = Pattern::new("dip", vec![1.0, -1.0]).unwrap();
        assert!(EngineBuilder::new().pattern(p.clone()).build().is_err());
        assert!(EngineBuilder::new().pattern(p).log_pattern(false).build().is_ok());
    }

    #[test]
    fn test_engine_pattern_is_logged() {
        let engine = EngineBuilder::new().build().unwrap();
        let raw = NamedPattern::SymTriangleBear.values();
        assert_eq!(engine.pattern().values()[1], raw[1].ln());
    }

    #[test]
    fn test_analyse_finds_embedded_triangle() {
        let series = hourly(with_triangle(40, 10));
        let engine = EngineBuilder::new()
            .scales([1])
            .scaled_steps(5)
            .build()
            .unwrap();

        let report = engine.analyse(&series).unwrap();
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].timestamp, t0() + Duration::hours(10));
        assert!(report.matches[0].score.abs() < 1e-9);

        let outcome = report.outcome(Scale::new(1).unwrap()).unwrap();
        assert_eq!(outcome.aftermaths.len(), 1);
        assert_eq!(outcome.aftermaths[0].values.len(), 6);
        // Aftermath is taken from the log series
        assert!((outcome.aftermaths[0].values[0] - 50.0f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_analyse_dedups_same_day() {
        // Two triangles on the same day (hourly series), one the next day
        let mut v = with_triangle(60, 0);
        for (i, p) in NamedPattern::SymTriangleBear.values().iter().enumerate() {
            v[6 + i] = 50.0 * p;
            v[40 + i] = 50.0 * p;
        }
        let series = hourly(v);
        let engine = EngineBuilder::new()
            .scales([1])
            .scaled_steps(2)
            .build()
            .unwrap();

        let report = engine.analyse(&series).unwrap();
        assert_eq!(report.matches.len(), 3);
        let kept: Vec<_> = report.outcomes[0]
            .matches
            .iter()
            .map(|m| m.timestamp)
            .collect();
        assert_eq!(kept, vec![t0(), t0() + Duration::hours(40)]);
    }

    #[test]
    fn test_analyse_scale_longer_than_series() {
        let series = hourly(with_triangle(12, 2));
        let engine = EngineBuilder::new().scales([1, 20]).build().unwrap();
        let report = engine.analyse(&series).unwrap();
        assert_eq!(report.outcomes.len(), 2);
        assert!(report.outcome(Scale::new(20).unwrap()).unwrap().matches.is_empty());
    }

    #[test]
    fn test_analyse_huge_scale_is_absent() {
        let series = hourly(with_triangle(40, 10));
        let engine = EngineBuilder::new()
            .scales([1, usize::MAX / 2])
            .build()
            .unwrap();
        let report = engine.analyse(&series).unwrap();
        assert_eq!(report.matches.len(), 1);
        assert!(report.outcome(Scale::new(usize::MAX / 2).unwrap()).unwrap().matches.is_empty());
    }

    #[test]
    fn test_parallel_scales_same_report() {
        let series = hourly(with_triangle(80, 30));
        let seq = EngineBuilder::new().scales([1, 2, 3]).build().unwrap();
        let par = EngineBuilder::new()
            .scales([1, 2, 3])
            .parallel_scales(true)
            .build()
            .unwrap();
        assert_eq!(seq.analyse(&series).unwrap(), par.analyse(&series).unwrap());
    }

    #[test]
    fn test_scan_parallel() {
        let mut store = MemoryStore::new();
        store.insert("TRI", hourly(with_triangle(40, 10)));
        store.insert("FLAT", hourly(vec![50.0; 40]));
        store.insert("BAD", hourly(vec![-1.0; 40]));

        let engine = EngineBuilder::new().scales([1]).scaled_steps(3).build().unwrap();
        let symbols = vec!["TRI", "FLAT", "BAD", "MISSING"];
        let (results, errors) = scan_parallel(&engine, &store, symbols);

        assert_eq!(results.len(), 2);
        assert_eq!(errors.len(), 2);
        let tri = results.iter().find(|r| r.symbol == "TRI").unwrap();
        assert_eq!(tri.report.matches.len(), 1);
        assert!(errors
            .iter()
            .any(|e| e.symbol == "MISSING" && matches!(e.error, ScanFailure::Store(StoreError::NotFound(_)))));
        assert!(errors
            .iter()
            .any(|e| e.symbol == "BAD" && matches!(e.error, ScanFailure::Match(_))));
    }

    #[test]
    fn test_config_json() {
        let json = r#"{ "pattern": "RISE_WEDGE", "tolerance": 0.02, "scales": [2, 4] }"#;
        let c: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(c.pattern, NamedPattern::RiseWedge);
        assert_eq!(c.scales.len(), 2);
        assert_eq!(c.scaled_steps, 10);

        let bad = r#"{ "tolerance": -0.5 }"#;
        assert!(serde_json::from_str::<EngineConfig>(bad).is_err());
        let bad = r#"{ "scales": [0] }"#;
        assert!(serde_json::from_str::<EngineConfig>(bad).is_err());
    }
}
